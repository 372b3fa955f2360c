//! Named shooting speeds backed by tunables.

use shooter_config::{Tunables, names};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ShotPreset {
    Fender,
    FarFender,
    KeyClose,
    KeyFar,
    /// Autonomous shot from the key.
    AutoKey,
}

impl ShotPreset {
    pub const ALL: [ShotPreset; 5] = [
        ShotPreset::Fender,
        ShotPreset::FarFender,
        ShotPreset::KeyClose,
        ShotPreset::KeyFar,
        ShotPreset::AutoKey,
    ];

    pub fn tunable_name(self) -> &'static str {
        match self {
            ShotPreset::Fender => names::FENDER_SPEED,
            ShotPreset::FarFender => names::FAR_FENDER_SPEED,
            ShotPreset::KeyClose => names::KEY_CLOSE_SPEED,
            ShotPreset::KeyFar => names::KEY_FAR_SPEED,
            ShotPreset::AutoKey => names::AUTO_SHOOT_KEY_VEL,
        }
    }

    /// Target velocity in rev/s.
    pub fn speed(self, tunables: &Tunables) -> eyre::Result<f64> {
        tunables.require(self.tunable_name())
    }
}
