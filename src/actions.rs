//! Automation platform glue: action inputs and workflow commands.
//!
//! Inputs arrive as `INPUT_<NAME>` environment variables. Messages for the
//! platform are printed to stdout as `::command::message` lines, which the
//! runner turns into annotations.

use std::ffi::OsString;
use std::io::{self, Write};

/// Environment variable the runner sets when step debug logging is enabled.
const RUNNER_DEBUG_ENV_VAR: &str = "RUNNER_DEBUG";

// ---------------------------------------------------------------------------
// Inputs
// ---------------------------------------------------------------------------

/// Environment variable name the runner uses for the input `name`.
///
/// Upper-cased, with spaces replaced by underscores.
pub fn input_env_var(name: &str) -> String {
    format!("INPUT_{}", name.replace(' ', "_").to_uppercase())
}

/// Reads an action input through a variable lookup, usually `std::env::var_os`.
///
/// Missing inputs read as the empty string. Values are trimmed when they are
/// valid UTF-8; anything else is returned byte-for-byte.
pub fn get_input_with<F>(name: &str, lookup: F) -> OsString
where
    F: Fn(&str) -> Option<OsString>,
{
    match lookup(&input_env_var(name)) {
        Some(value) => match value.to_str() {
            Some(text) => OsString::from(text.trim()),
            None => value,
        },
        None => OsString::new(),
    }
}

// ---------------------------------------------------------------------------
// Workflow commands
// ---------------------------------------------------------------------------

/// Escapes a message so it survives the runner's command parser.
pub fn escape_data(message: &str) -> String {
    message
        .replace('%', "%25")
        .replace('\r', "%0D")
        .replace('\n', "%0A")
}

fn write_command(w: &mut dyn Write, command: &str, message: &str) -> io::Result<()> {
    writeln!(w, "::{command}::{}", escape_data(message))
}

pub fn notice_to(w: &mut dyn Write, message: &str) {
    let _ = write_command(w, "notice", message);
}

pub fn error_to(w: &mut dyn Write, message: &str) {
    let _ = write_command(w, "error", message);
}

pub fn debug_to(w: &mut dyn Write, message: &str) {
    let _ = write_command(w, "debug", message);
}

/// Emits an error annotation.
pub fn error(message: &str) {
    error_to(&mut io::stdout(), message);
}

/// Emits a debug line, visible only when step debug logging is enabled.
pub fn debug(message: &str) {
    if is_debug() {
        debug_to(&mut io::stdout(), message);
    }
}

/// Whether the runner has step debug logging turned on.
pub fn is_debug() -> bool {
    std::env::var(RUNNER_DEBUG_ENV_VAR).is_ok_and(|v| v == "1")
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup_from(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<OsString> + use<> {
        let map: HashMap<String, OsString> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), OsString::from(v)))
            .collect();
        move |key: &str| map.get(key).cloned()
    }

    #[test]
    fn input_env_var_uppercases() {
        assert_eq!(input_env_var("token"), "INPUT_TOKEN");
        assert_eq!(input_env_var("ref"), "INPUT_REF");
    }

    #[test]
    fn input_env_var_replaces_spaces() {
        assert_eq!(input_env_var("my input"), "INPUT_MY_INPUT");
    }

    #[test]
    fn get_input_reads_and_trims() {
        let lookup = lookup_from(&[("INPUT_INTERVAL", "  10s \n")]);
        assert_eq!(get_input_with("interval", lookup), "10s");
    }

    #[test]
    fn get_input_missing_is_empty() {
        let lookup = lookup_from(&[]);
        assert_eq!(get_input_with("timeout", lookup), "");
    }

    #[test]
    fn get_input_keeps_inner_quotes() {
        let lookup = lookup_from(&[("INPUT_SELF", r#"say "hi""#)]);
        assert_eq!(get_input_with("self", lookup), r#"say "hi""#);
    }

    #[cfg(unix)]
    #[test]
    fn get_input_keeps_non_utf8_bytes() {
        use std::os::unix::ffi::OsStringExt;

        let raw = OsString::from_vec(b" caf\xe9 ".to_vec());
        let lookup = move |key: &str| (key == "INPUT_SELF").then(|| raw.clone());
        let value = get_input_with("self", lookup);
        assert_eq!(value, OsString::from_vec(b" caf\xe9 ".to_vec()));
    }

    #[test]
    fn escape_data_encodes_percent_and_newlines() {
        assert_eq!(escape_data("100%"), "100%25");
        assert_eq!(escape_data("a\r\nb"), "a%0D%0Ab");
        assert_eq!(escape_data("plain"), "plain");
    }

    #[test]
    fn notice_writes_workflow_command() {
        let mut buf = Vec::new();
        notice_to(&mut buf, "Linux AMD64 binary selected");
        assert_eq!(
            String::from_utf8(buf).unwrap(),
            "::notice::Linux AMD64 binary selected\n"
        );
    }

    #[test]
    fn error_escapes_multiline_message() {
        let mut buf = Vec::new();
        error_to(&mut buf, "first\nsecond");
        assert_eq!(String::from_utf8(buf).unwrap(), "::error::first%0Asecond\n");
    }

    #[test]
    fn debug_writes_debug_command() {
        let mut buf = Vec::new();
        debug_to(&mut buf, "dir=/opt/action/dist");
        assert_eq!(
            String::from_utf8(buf).unwrap(),
            "::debug::dir=/opt/action/dist\n"
        );
    }
}
