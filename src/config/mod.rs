pub mod fwdproj;
