//! Physical quantities which appear at the edges of the system: configuration
//! files and command-line arguments. Inside the projector everything is a
//! plain `f32` in millimetres (see `todo`).

pub mod todo;

pub use uom::si::f32::Length;

mod units {
  pub use uom::si::length::millimeter;
}

// Making values from float literals is very long-winded, so provide some
// pithily-named convenience constructors.

/// Generate a function called NAME which returns QUANTITY by interpreting its
/// argument as UNIT
///
/// wrap!(NAME QUANTITY UNIT);
macro_rules! wrap {
  ($name:ident $quantity:ident $unit:ident ) => {
    pub fn $name(x: f32) -> $quantity { $quantity::new::<units::$unit>(x) }
  };
}

wrap!(mm Length millimeter);

// Reverse direction of the above
pub fn mm_(x: Length) -> f32 { x.get::<units::millimeter>() }
