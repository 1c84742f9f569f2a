/// Units which are simply type aliases for `f32` rather than having an
/// implementation as a `uom` `Quantity`.
///
/// The hot paths (engine batches, matrix rows, image voxels) work on plain
/// `f32`s in millimetres; these aliases leave some clues in the source as to
/// what they represent.

pub type Lengthf32    = f32;
pub type Weightf32    = f32;
pub type Intensityf32 = f32; // TODO uom Intensity
