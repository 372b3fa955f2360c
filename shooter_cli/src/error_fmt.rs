//! Human-readable error descriptions, exit codes and structured JSON errors.

use serde_json::json;
use shooter_core::{BuildError, ShooterError};

/// Exit code for failures that are not otherwise classified.
pub const EXIT_FAILURE: i32 = 1;
/// Exit code for configuration problems (bad TOML, invalid values, missing tunables).
pub const EXIT_CONFIG: i32 = 3;
/// Exit code for hardware and sensor faults that ended a run.
pub const EXIT_HARDWARE: i32 = 4;

/// Map an eyre::Report to what happened, the likely cause and a fix hint.
pub fn humanize(err: &eyre::Report) -> String {
    if let Some(be) = err.downcast_ref::<BuildError>() {
        return match be {
            BuildError::MissingMotor => {
                "What happened: No shooter motors were provided to the controller.\nLikely causes: Motor outputs failed to initialize or were not passed to the builder.\nHow to fix: Pass both motors via with_motors(left, right).".to_string()
            }
            BuildError::MissingEncoder => {
                "What happened: No encoder was provided to the controller.\nLikely causes: The position sensor failed to initialize or was not passed to the builder.\nHow to fix: Pass the encoder via with_encoder(...).".to_string()
            }
            BuildError::MissingTunable(name) => format!(
                "What happened: Tunable '{name}' has no value.\nLikely causes: The tunables table was built without it.\nHow to fix: Add a line `{name} <value>` to the tunables override file."
            ),
            BuildError::InvalidConfig(msg) => format!(
                "What happened: Invalid configuration ({msg}).\nLikely causes: Out-of-range values in the run config.\nHow to fix: Edit the config file, then rerun."
            ),
        };
    }

    if let Some(se) = err.downcast_ref::<ShooterError>() {
        return match se {
            ShooterError::Config(msg) => format!(
                "What happened: Invalid configuration ({msg}).\nLikely causes: A command-line value or config entry is out of range.\nHow to fix: Correct the value and rerun."
            ),
            ShooterError::Hardware(msg) => format!(
                "What happened: A device reported an error ({msg}).\nLikely causes: Wiring, power or a device that is not attached.\nHow to fix: Check the device, or rerun with --log-level=debug for detail."
            ),
            ShooterError::SensorAnomaly(msg) => format!(
                "What happened: The encoder produced unusable readings ({msg}).\nLikely causes: Loose encoder cable, wrong counts_per_rev, or max_counts_per_tick set too low.\nHow to fix: Check the encoder and the [sensor] section of the config."
            ),
            ShooterError::NonFinite(what) => format!(
                "What happened: A non-finite value appeared in {what}.\nLikely causes: Extreme tunables (gains or curve coefficients).\nHow to fix: Review the tunables override file."
            ),
        };
    }

    if let Some(te) = err.downcast_ref::<toml::de::Error>() {
        return format!(
            "What happened: The config file is not valid TOML.\nLikely causes: A typo or an unknown value for an enum such as control.mode.\nHow to fix: Fix the file and rerun. Parser said: {}",
            te.message()
        );
    }

    let msg = err.to_string();
    let lower = msg.to_ascii_lowercase();

    if lower.starts_with("read config") {
        let cause = err
            .source()
            .map(|s| format!(" ({s})"))
            .unwrap_or_default();
        return format!(
            "What happened: Could not read the config file{cause}.\nLikely causes: Wrong --config path or missing permissions.\nHow to fix: Pass an existing file with --config. Original: {msg}"
        );
    }

    if ["loop.", "sensor.", "logging.", "sim."]
        .iter()
        .any(|section| lower.starts_with(section))
    {
        return format!(
            "What happened: Configuration is invalid ({msg}).\nLikely causes: Out-of-range values in the run config.\nHow to fix: Edit the TOML config and try again."
        );
    }

    let cause = err
        .source()
        .map(|src| format!(" Cause: {src}"))
        .unwrap_or_default();
    format!(
        "Something went wrong.{cause}\nHow to fix: Re-run with --log-level=debug for details. Original: {msg}"
    )
}

/// Stable exit code for `err`.
pub fn exit_code_for_error(err: &eyre::Report) -> i32 {
    if err.downcast_ref::<BuildError>().is_some() || err.downcast_ref::<toml::de::Error>().is_some()
    {
        return EXIT_CONFIG;
    }
    match err.downcast_ref::<ShooterError>() {
        Some(ShooterError::Config(_) | ShooterError::NonFinite(_)) => EXIT_CONFIG,
        Some(ShooterError::Hardware(_) | ShooterError::SensorAnomaly(_)) => EXIT_HARDWARE,
        None => {
            let lower = err.to_string().to_ascii_lowercase();
            if ["loop.", "sensor.", "logging.", "sim."]
                .iter()
                .any(|s| lower.starts_with(s))
            {
                EXIT_CONFIG
            } else {
                EXIT_FAILURE
            }
        }
    }
}

/// Short machine-readable name for the error class.
fn reason_name(err: &eyre::Report) -> &'static str {
    if let Some(be) = err.downcast_ref::<BuildError>() {
        return match be {
            BuildError::MissingMotor => "MissingMotor",
            BuildError::MissingEncoder => "MissingEncoder",
            BuildError::MissingTunable(_) => "MissingTunable",
            BuildError::InvalidConfig(_) => "Config",
        };
    }
    match err.downcast_ref::<ShooterError>() {
        Some(ShooterError::Config(_)) => "Config",
        Some(ShooterError::Hardware(_)) => "Hardware",
        Some(ShooterError::SensorAnomaly(_)) => "SensorAnomaly",
        Some(ShooterError::NonFinite(_)) => "NonFinite",
        None if exit_code_for_error(err) == EXIT_CONFIG => "Config",
        None => "Error",
    }
}

/// Structured JSON for errors when --json is enabled.
pub fn format_error_json(err: &eyre::Report) -> String {
    json!({
        "status": "error",
        "reason": reason_name(err),
        "exit_code": exit_code_for_error(err),
        "message": humanize(err),
    })
    .to_string()
}
