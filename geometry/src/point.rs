use std::ops::{Add, Index, Neg, Sub};
use units::todo::Lengthf32;
use crate::Vector;

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Point {
    pub x: Lengthf32,
    pub y: Lengthf32,
    pub z: Lengthf32,
}

impl Point {
    pub fn new(x: Lengthf32, y: Lengthf32, z: Lengthf32) -> Self { Self { x, y, z } }
    pub fn origin() -> Self { Self::new(0.0, 0.0, 0.0) }
    pub fn to_array(self) -> [Lengthf32; 3] { [self.x, self.y, self.z] }
    pub fn to_vector(self) -> Vector { Vector::new(self.x, self.y, self.z) }
}

impl Sub for Point {
    type Output = Vector;
    fn sub(self, rhs: Self) -> Self::Output {
        Vector::new(self.x - rhs.x, self.y - rhs.y, self.z - rhs.z)
    }
}

impl Add<Vector> for Point {
    type Output = Self;
    fn add(self, rhs: Vector) -> Self::Output {
        Self::new(self.x + rhs.x, self.y + rhs.y, self.z + rhs.z)
    }
}

impl Sub<Vector> for Point {
    type Output = Self;
    fn sub(self, rhs: Vector) -> Self::Output {
        Self::new(self.x - rhs.x, self.y - rhs.y, self.z - rhs.z)
    }
}

/// Reflection through the origin
impl Neg for Point {
    type Output = Self;
    fn neg(self) -> Self::Output { Self::new(-self.x, -self.y, -self.z) }
}

impl Index<usize> for Point {
    type Output = Lengthf32;
    fn index(&self, index: usize) -> &Self::Output {
        match index {
            0 => &self.x,
            1 => &self.y,
            2 => &self.z,
            _ => panic!("index {index} is out of bounds [0,2]")
        }
    }
}
