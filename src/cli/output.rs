//! Dual-format command output: human-readable text or pretty JSON.

use serde::Serialize;

/// A command result that can render itself for terminals and for scripts.
/// The JSON form defaults to the type's serde representation.
pub trait CommandOutput: Serialize {
    fn to_human(&self) -> String;

    fn to_json(&self) -> serde_json::Value {
        serde_json::to_value(self).unwrap_or_default()
    }
}

/// Print a command result in the requested format.
pub fn output<T: CommandOutput>(result: &T, json_mode: bool) {
    if json_mode {
        let rendered =
            serde_json::to_string_pretty(&result.to_json()).unwrap_or_else(|_| "{}".to_string());
        println!("{rendered}");
    } else {
        println!("{}", result.to_human());
    }
}

/// Shorten long expressions for table cells, appending "..." when cut.
/// Cuts on a character boundary.
pub fn truncate(s: &str, max_chars: usize) -> String {
    if s.chars().count() <= max_chars {
        return s.to_string();
    }
    let kept: String = s.chars().take(max_chars.saturating_sub(3)).collect();
    format!("{kept}...")
}
