//! Discrete state-space observer and state-feedback regulator.
//!
//! State is `[position (rad), velocity (rad/s)]`, input is motor voltage, output is
//! measured position. Each update runs:
//!
//! ```text
//! x_hat += L * (y - C * x_hat)              measurement correction
//! u      = clamp(K * (r - x_hat), u_min, u_max)
//! x_hat  = A * x_hat + B * u                 time update for the next tick
//! ```
//!
//! Plant matrices come from a model tag fixed at construction.

use crate::error::ShooterError;

pub type Vector2 = [f64; 2];

/// Selects a fixed set of plant, observer and feedback coefficients.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ModelTag {
    /// Flywheel shooter discretized at 50 Hz.
    #[default]
    Shooter,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PlantCoefficients {
    pub a: [Vector2; 2],
    pub b: Vector2,
    pub c: Vector2,
    /// Observer gain.
    pub l: Vector2,
    /// Feedback gain row.
    pub k: Vector2,
    pub u_min: f64,
    pub u_max: f64,
    /// Estimate after `reset()`.
    pub x0: Vector2,
    /// Loop rate the matrices were discretized for.
    pub rate_hz: u32,
}

// Flywheel with tau = 0.5 s and 31.4 rad/s per volt, zero-order hold at T = 0.02 s.
// Regulator poles at 0.80 / 0.85, observer poles at 0.30 / 0.35.
const SHOOTER: PlantCoefficients = PlantCoefficients {
    a: [[1.0, 0.019605], [0.0, 0.960789]],
    b: [0.012400, 1.231800],
    c: [1.0, 0.0],
    l: [0.8907, 21.4266],
    k: [1.2177, 0.2400],
    u_min: -12.0,
    u_max: 12.0,
    x0: [0.0, 0.0],
    rate_hz: 50,
};

impl ModelTag {
    pub fn coefficients(self) -> PlantCoefficients {
        match self {
            ModelTag::Shooter => SHOOTER,
        }
    }

    /// The only loop rate this model's coefficients are valid at.
    pub fn rate_hz(self) -> u32 {
        self.coefficients().rate_hz
    }
}

#[derive(Debug, Clone)]
pub struct StateSpaceRegulator {
    model: ModelTag,
    coeffs: PlantCoefficients,
    x_hat: Vector2,
    u: f64,
    r: Vector2,
}

impl StateSpaceRegulator {
    pub fn new(model: ModelTag) -> Self {
        let coeffs = model.coefficients();
        Self {
            model,
            coeffs,
            x_hat: coeffs.x0,
            u: 0.0,
            r: [0.0; 2],
        }
    }

    /// Return the estimate to its initial value and clear the retained control and reference.
    pub fn reset(&mut self) {
        self.x_hat = self.coeffs.x0;
        self.u = 0.0;
        self.r = [0.0; 2];
    }

    /// Run one correction/regulation/prediction step and return the bounded control input.
    ///
    /// A non-finite result leaves the regulator reset and is reported as an error; the
    /// estimate never holds NaN or infinity.
    pub fn update(&mut self, r: Vector2, y: f64) -> Result<f64, ShooterError> {
        let PlantCoefficients {
            a, b, c, l, k, u_min, u_max, ..
        } = self.coeffs;

        let innovation = y - (c[0] * self.x_hat[0] + c[1] * self.x_hat[1]);
        let corrected = [
            self.x_hat[0] + l[0] * innovation,
            self.x_hat[1] + l[1] * innovation,
        ];

        let raw_u = k[0] * (r[0] - corrected[0]) + k[1] * (r[1] - corrected[1]);
        let u = raw_u.max(u_min).min(u_max);

        let next = [
            a[0][0] * corrected[0] + a[0][1] * corrected[1] + b[0] * u,
            a[1][0] * corrected[0] + a[1][1] * corrected[1] + b[1] * u,
        ];

        if !(raw_u.is_finite() && next[0].is_finite() && next[1].is_finite()) {
            self.reset();
            return Err(ShooterError::NonFinite("state-space regulator"));
        }

        self.x_hat = next;
        self.u = u;
        self.r = r;
        Ok(u)
    }

    /// Move the position estimate to a measured position, leaving velocity alone.
    pub fn seed_position(&mut self, position: f64) {
        if position.is_finite() {
            self.x_hat[0] = position;
        }
    }

    /// Shift the position estimate by `delta`, e.g. to absorb a sensor discontinuity.
    pub fn shift_position(&mut self, delta: f64) {
        if delta.is_finite() {
            self.x_hat[0] += delta;
        }
    }

    pub fn model(&self) -> ModelTag {
        self.model
    }

    pub fn coefficients(&self) -> &PlantCoefficients {
        &self.coeffs
    }

    pub fn x_hat(&self) -> Vector2 {
        self.x_hat
    }

    /// Control input from the last successful update.
    pub fn u(&self) -> f64 {
        self.u
    }

    /// Reference vector from the last successful update.
    pub fn reference(&self) -> Vector2 {
        self.r
    }
}
