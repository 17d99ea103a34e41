pub mod utils_2d;

pub use utils_2d::*;

pub const EPSILON: f64 = 1e-6;

pub trait ApproxEq {
    fn approx_eq(&self, other: &Self) -> bool;
}

impl ApproxEq for f64 {
    fn approx_eq(&self, other: &Self) -> bool {
        (self - other).abs() < EPSILON
    }
}

impl ApproxEq for [f64; 2] {
    fn approx_eq(&self, other: &Self) -> bool {
        points_equal(*self, *other)
    }
}
