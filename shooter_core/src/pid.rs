//! Proportional-integral-derivative accumulator.
//!
//! Auxiliary to the state-space regulator; selected with `ControlMode::Pid`.

/// PID gains, resolved from the tunables table at construction.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PidGains {
    pub kp: f64,
    pub ki: f64,
    pub kd: f64,
}

#[derive(Debug, Clone)]
pub struct Pid {
    gains: PidGains,
    integral: f64,
    prev_error: f64,
}

impl Pid {
    pub fn new(gains: PidGains) -> Self {
        Self {
            gains,
            integral: 0.0,
            prev_error: 0.0,
        }
    }

    /// One PID step. The integral accumulates `error * dt`; the derivative is the change in
    /// error since the previous call divided by `dt` (zero when `dt` is not positive).
    pub fn compute_output(&mut self, error: f64, dt: f64) -> f64 {
        let (integral_step, derivative) = if dt > 0.0 && dt.is_finite() {
            (error * dt, (error - self.prev_error) / dt)
        } else {
            (0.0, 0.0)
        };
        self.integral += integral_step;
        self.prev_error = error;
        self.gains.kp * error + self.gains.ki * self.integral + self.gains.kd * derivative
    }

    /// Clear accumulated and previous error; gains are untouched.
    pub fn reset_error(&mut self) {
        self.integral = 0.0;
        self.prev_error = 0.0;
    }

    pub fn gains(&self) -> PidGains {
        self.gains
    }

    pub fn integral(&self) -> f64 {
        self.integral
    }
}
