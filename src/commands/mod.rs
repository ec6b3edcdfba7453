//! # Command System
//!
//! Routes inbound transport events: `/start`, free text that may carry a
//! time expression, and cadence button presses.
//!
//! - **Version**: 3.0.0
//! - **Since**: 0.2.0
//! - **Toggleable**: false
//!
//! ## Changelog
//! - 3.0.0: Text-triggered reminders replace slash commands
//! - 2.0.0: Remove bang commands, slash-only command system
//! - 1.0.0: Initial reorganization with modular command structure

pub mod remind;

pub use remind::RemindHandler;

/// Whether `text` invokes `/name`, allowing a `/name@botname` suffix
pub fn is_command(text: &str, name: &str) -> bool {
    let Some(first) = text.split_whitespace().next() else {
        return false;
    };
    let Some(command) = first.strip_prefix('/') else {
        return false;
    };
    let command = command.split('@').next().unwrap_or(command);
    command.eq_ignore_ascii_case(name)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_is_command() {
        assert!(is_command("/start", "start"));
        assert!(is_command("  /START please", "start"));
        assert!(is_command("/start@reminder_bot", "start"));
        assert!(!is_command("start", "start"));
        assert!(!is_command("/started", "start"));
        assert!(!is_command("", "start"));
    }
}
