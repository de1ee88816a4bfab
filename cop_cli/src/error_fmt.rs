//! Human-readable error descriptions and structured JSON error formatting.

use cop_core::ConsoleError;

/// Map an eyre::Report to a human-readable explanation with likely causes and fix hints.
pub fn humanize(err: &eyre::Report) -> String {
    if let Some(ce) = err.downcast_ref::<ConsoleError>() {
        return match ce {
            ConsoleError::TransportOpen { port, reason } => format!(
                "What happened: Could not open {port} ({reason}).\nLikely causes: Wrong port name, the plate is unplugged, or another program holds the port.\nHow to fix: Run `copconsole ports`, close other serial monitors, then retry with --port."
            ),
            ConsoleError::TransportIo(detail) => format!(
                "What happened: Serial device disconnected ({detail}).\nLikely causes: USB cable pulled or the board reset.\nHow to fix: Reconnect the plate and run the command again."
            ),
            ConsoleError::InvalidCommandInput(text) => format!(
                "What happened: Invalid calibration weight {text:?}.\nLikely causes: The value is empty or not a number.\nHow to fix: Pass a plain number, e.g. `copconsole calibrate --weight 5`."
            ),
            ConsoleError::UnknownCommand(name) => format!(
                "What happened: Unknown command {name:?}.\nLikely causes: Typo in the command name.\nHow to fix: Use one of stream_weights, stream_cop, stop, tare, calibrate_trigger."
            ),
            ConsoleError::NotConnected => "What happened: Not connected.\nLikely causes: The port closed before the command was written.\nHow to fix: Check the connection and retry.".to_string(),
            ConsoleError::Config(msg) => format!(
                "What happened: Invalid configuration ({msg}).\nLikely causes: Missing or out-of-range values in the TOML.\nHow to fix: Edit the config file, then rerun."
            ),
            ConsoleError::Io(msg) => format!(
                "What happened: File operation failed ({msg}).\nLikely causes: Missing directory or insufficient permissions.\nHow to fix: Check data_log.dir and logging.file in the config."
            ),
        };
    }

    let msg = err.to_string();
    let lower = msg.to_ascii_lowercase();

    if lower.contains("invalid configuration") || lower.contains("toml parse error") {
        let mut cause = String::new();
        if let Some(src) = err.source() {
            cause = format!(" ({src})");
        }
        return format!(
            "What happened: Configuration is invalid{cause}.\nLikely causes: Misspelled key, wrong value type, or out-of-range value.\nHow to fix: Edit the TOML config and try again."
        );
    }

    if lower.contains("calibration prompt") {
        return format!(
            "What happened: {msg}.\nLikely causes: Firmware prompt text differs from calibration.prompt, or the plate did not receive the trigger.\nHow to fix: Check the prompt text printed by the firmware and update calibration.prompt."
        );
    }

    // Generic fallback
    let mut cause = String::new();
    if let Some(src) = err.source() {
        cause = format!(" Cause: {src}");
    }
    format!(
        "Something went wrong.{cause}\nHow to fix: Re-run with --log-level=debug for details. Original: {msg}"
    )
}

pub fn reason_name(err: &eyre::Report) -> &'static str {
    match err.downcast_ref::<ConsoleError>() {
        Some(ConsoleError::TransportOpen { .. }) => "TransportOpen",
        Some(ConsoleError::TransportIo(_)) => "TransportIo",
        Some(ConsoleError::InvalidCommandInput(_)) => "InvalidCommandInput",
        Some(ConsoleError::UnknownCommand(_)) => "UnknownCommand",
        Some(ConsoleError::NotConnected) => "NotConnected",
        Some(ConsoleError::Config(_)) => "Config",
        Some(ConsoleError::Io(_)) => "Io",
        None => "Error",
    }
}

/// Map typed console errors to stable exit codes; anything else returns 1.
pub fn exit_code_for_error(err: &eyre::Report) -> i32 {
    match err.downcast_ref::<ConsoleError>() {
        Some(ConsoleError::TransportOpen { .. }) => 3,
        Some(ConsoleError::TransportIo(_) | ConsoleError::NotConnected) => 4,
        Some(ConsoleError::InvalidCommandInput(_) | ConsoleError::UnknownCommand(_)) => 5,
        Some(ConsoleError::Config(_)) => 6,
        _ => 1,
    }
}

/// Structured JSON for errors when --json is enabled.
pub fn format_error_json(err: &eyre::Report) -> String {
    serde_json::json!({
        "reason": reason_name(err),
        "message": humanize(err),
    })
    .to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn typed_errors_get_stable_codes() {
        let r = eyre::Report::new(ConsoleError::UnknownCommand("x".into()));
        assert_eq!(exit_code_for_error(&r), 5);
        assert!(humanize(&r).contains("Unknown command"));

        let r = eyre::Report::new(ConsoleError::TransportOpen {
            port: "sim9".into(),
            reason: "unknown port".into(),
        });
        assert_eq!(exit_code_for_error(&r), 3);
        let v: serde_json::Value = serde_json::from_str(&format_error_json(&r)).unwrap();
        assert_eq!(v["reason"], "TransportOpen");
    }

    #[test]
    fn untyped_errors_fall_back() {
        let r = eyre::eyre!("boom");
        assert_eq!(exit_code_for_error(&r), 1);
        assert!(humanize(&r).starts_with("Something went wrong."));
    }
}
