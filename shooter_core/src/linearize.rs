//! Polynomial compensation of actuator nonlinearity.
//!
//! Both curves are odd: negative inputs are handled by rotating the positive branch
//! 180 degrees about the origin, so `apply(-x) == -apply(x)` exactly.

/// Inputs with magnitude below this map to zero on the conveyor curve.
pub const CONVEYOR_DEADBAND: f64 = 0.01;

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Linearizer {
    /// `a x^4 + b x^3 + c x^2 + d x`
    Quartic { a: f64, b: f64, c: f64, d: f64 },
    /// `a x^3 + b x^2 + c x + d`, with a deadband around zero.
    DeadbandCubic { a: f64, b: f64, c: f64, d: f64 },
}

impl Linearizer {
    pub fn quartic([a, b, c, d]: [f64; 4]) -> Self {
        Self::Quartic { a, b, c, d }
    }

    pub fn deadband_cubic([a, b, c, d]: [f64; 4]) -> Self {
        Self::DeadbandCubic { a, b, c, d }
    }

    /// Map a desired normalized output to the command that produces it.
    pub fn apply(&self, x: f64) -> f64 {
        if x < 0.0 {
            return -self.apply(-x);
        }
        match *self {
            Self::Quartic { a, b, c, d } => x * (d + x * (c + x * (b + x * a))),
            Self::DeadbandCubic { a, b, c, d } => {
                if x < CONVEYOR_DEADBAND {
                    0.0
                } else {
                    d + x * (c + x * (b + x * a))
                }
            }
        }
    }
}
