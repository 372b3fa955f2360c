//! Maps `Box<dyn Error>` from capability boundaries to typed `ShooterError`.
//!
//! The traits in `shooter_traits` use `Box<dyn Error + Send + Sync>` so any device
//! driver can plug in; this module converts those to our typed error enum, with an
//! optional feature-gated path for `shooter_hardware::HwError` downcasting.

use crate::error::ShooterError;

/// Map a capability-boundary error to a typed `ShooterError`.
///
/// Attempts to downcast known hardware error types first, then falls back
/// to string-based heuristics.
pub fn map_hw_error(e: &(dyn std::error::Error + 'static)) -> ShooterError {
    #[cfg(feature = "hardware-errors")]
    {
        if let Some(hw) = e.downcast_ref::<shooter_hardware::error::HwError>() {
            return match hw {
                shooter_hardware::error::HwError::SensorFault(msg) => {
                    ShooterError::SensorAnomaly(msg.clone())
                }
                other => ShooterError::Hardware(other.to_string()),
            };
        }
    }

    let s = e.to_string();
    if s.to_lowercase().contains("encoder") {
        ShooterError::SensorAnomaly(s)
    } else {
        ShooterError::Hardware(s)
    }
}
