use std::ops::{Add, Index, IndexMut, Mul, Neg, Sub};
use units::todo::Lengthf32;

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Vector {
    pub x: Lengthf32,
    pub y: Lengthf32,
    pub z: Lengthf32,
}

impl Vector {

    pub fn new(x: Lengthf32, y: Lengthf32, z: Lengthf32) -> Self { Self { x, y, z } }

    pub fn to_array(self) -> [Lengthf32; 3] { [self.x, self.y, self.z] }

    pub fn dot(self, other: Self) -> Lengthf32 {
        self.x * other.x + self.y * other.y + self.z * other.z
    }

    pub fn cross(self, other: Self) -> Self {
        Self::new(self.y * other.z - self.z * other.y,
                  self.z * other.x - self.x * other.z,
                  self.x * other.y - self.y * other.x)
    }

    pub fn norm(self) -> Lengthf32 { self.dot(self).sqrt() }

    /// Unit vector in the same direction. The zero vector is returned
    /// unchanged, rather than filled with NaNs.
    pub fn normalize(self) -> Self {
        let n = self.norm();
        if n == 0.0 { self } else { self * (1.0 / n) }
    }

}

impl Add for Vector {
    type Output = Self;
    fn add(self, rhs: Self) -> Self::Output {
        Self::new(self.x + rhs.x, self.y + rhs.y, self.z + rhs.z)
    }
}

impl Sub for Vector {
    type Output = Self;
    fn sub(self, rhs: Self) -> Self::Output {
        Self::new(self.x - rhs.x, self.y - rhs.y, self.z - rhs.z)
    }
}

impl Neg for Vector {
    type Output = Self;
    fn neg(self) -> Self::Output { Self::new(-self.x, -self.y, -self.z) }
}

impl Mul<f32> for Vector {
    type Output = Self;
    fn mul(self, rhs: f32) -> Self::Output {
        Self::new(self.x * rhs, self.y * rhs, self.z * rhs)
    }
}

impl Index<usize> for Vector {
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

impl IndexMut<usize> for Vector {
    fn index_mut(&mut self, index: usize) -> &mut Self::Output {
        match index {
            0 => &mut self.x,
            1 => &mut self.y,
            2 => &mut self.z,
            _ => panic!("index {index} is out of bounds [0,2]")
        }
    }
}
