//! Locating, invoking and exiting with the bundled `validate` binary.
//!
//! The binary is spawned directly with a discrete argument vector. No shell
//! is involved, so input values reach the child byte-for-byte whatever quotes
//! or metacharacters they contain.

use std::ffi::{OsStr, OsString};
use std::fmt;
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use std::process::{Command, ExitStatus, Stdio};

use crate::actions;
use crate::config::IndeterminateStatus;
use crate::error::LaunchError;
use crate::platform::{BinaryVariant, HostPlatform, select_binary};

/// File name of the launcher executable when it is the top-level entry point.
pub const LAUNCHER_NAME: &str = "invoke-binary";

/// Bundle subdirectory used when running as the top-level entry point.
pub const DIST_DIR_NAME: &str = "dist";

/// Subcommand passed to the bundled binary.
pub const VALIDATE_SUBCOMMAND: &str = "validate";

/// Placeholder shown instead of the token in rendered command lines.
const REDACTED: &str = "***";

/// Exit code used under the strict policy when the binary could not be found.
const EXIT_NOT_FOUND: i32 = 127;

/// Exit code used under the strict policy when the binary could not be executed.
const EXIT_CANNOT_EXECUTE: i32 = 126;

/// Base added to a signal number under the strict policy.
const EXIT_SIGNAL_BASE: i32 = 128;

// ---------------------------------------------------------------------------
// Binary directory
// ---------------------------------------------------------------------------

/// Whether `entry_point` is the launcher itself rather than some other
/// program sharing the same binary bundle.
pub fn is_launcher_entry_point(entry_point: &Path) -> bool {
    entry_point
        .file_name()
        .is_some_and(|name| name == LAUNCHER_NAME)
}

/// Directory holding the bundled binaries for a given entry point.
///
/// The launcher keeps them in `dist/` beside itself; any other entry point
/// finds them directly beside it.
pub fn resolve_binary_dir(entry_point: &Path) -> PathBuf {
    let parent = entry_point.parent().unwrap_or_else(|| Path::new("."));
    if is_launcher_entry_point(entry_point) {
        parent.join(DIST_DIR_NAME)
    } else {
        parent.to_path_buf()
    }
}

// ---------------------------------------------------------------------------
// Inputs
// ---------------------------------------------------------------------------

/// The action inputs forwarded to `validate`, passed through verbatim.
///
/// Values stay `OsString` so inputs that are not valid UTF-8 still reach the
/// child unchanged.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ValidateInputs {
    pub token: OsString,
    pub self_: OsString,
    pub interval: OsString,
    pub git_ref: OsString,
    pub timeout: OsString,
    pub ignored: OsString,
}

impl ValidateInputs {
    /// Reads every input from the runner environment.
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var_os(key))
    }

    pub fn from_lookup<F>(lookup: F) -> Self
    where
        F: Fn(&str) -> Option<OsString>,
    {
        Self {
            token: actions::get_input_with("token", &lookup),
            self_: actions::get_input_with("self", &lookup),
            interval: actions::get_input_with("interval", &lookup),
            git_ref: actions::get_input_with("ref", &lookup),
            timeout: actions::get_input_with("timeout", &lookup),
            ignored: actions::get_input_with("ignored", &lookup),
        }
    }

    /// Flag names paired with their values, in command-line order.
    pub fn flags(&self) -> [(&'static str, &OsStr); 6] {
        [
            ("token", self.token.as_os_str()),
            ("self", self.self_.as_os_str()),
            ("interval", self.interval.as_os_str()),
            ("ref", self.git_ref.as_os_str()),
            ("timeout", self.timeout.as_os_str()),
            ("ignored", self.ignored.as_os_str()),
        ]
    }
}

// ---------------------------------------------------------------------------
// Command line
// ---------------------------------------------------------------------------

/// A fully resolved invocation of the bundled binary.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommandLine {
    pub program: PathBuf,
    pub args: Vec<OsString>,
    display_args: Vec<String>,
}

impl CommandLine {
    /// Builds `<dir>/<binary> validate --token=<v> ... --ignored=<v>`.
    pub fn build(dir: &Path, variant: BinaryVariant, inputs: &ValidateInputs) -> Self {
        let mut args = vec![OsString::from(VALIDATE_SUBCOMMAND)];
        let mut display_args = vec![VALIDATE_SUBCOMMAND.to_string()];

        for (flag, value) in inputs.flags() {
            let mut arg = OsString::from(format!("--{flag}="));
            arg.push(value);
            args.push(arg);

            let shown = if flag == "token" {
                REDACTED.into()
            } else {
                value.to_string_lossy()
            };
            display_args.push(format!("--{flag}=\"{shown}\""));
        }

        Self {
            program: dir.join(variant.file_name()),
            args,
            display_args,
        }
    }

    /// A `std::process::Command` wired to the launcher's own stdio.
    pub fn to_command(&self) -> Command {
        let mut command = Command::new(&self.program);
        command
            .args(&self.args)
            .stdin(Stdio::inherit())
            .stdout(Stdio::inherit())
            .stderr(Stdio::inherit());
        command
    }
}

/// Shell-like rendering for diagnostics. Values are double-quoted without
/// escaping, the token is redacted and non-UTF-8 bytes are shown lossily.
impl fmt::Display for CommandLine {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.program.display())?;
        for arg in &self.display_args {
            write!(f, " {arg}")?;
        }
        Ok(())
    }
}

/// Resolves the binary directory and variant, announcing both as notices.
///
/// The `Running invoke-binary` notice depends only on the entry point's file
/// name. `bin_dir` overrides the entry-point based directory lookup. Fails before anything is
/// spawned when the platform has no bundled binary.
pub fn prepare(
    platform: &HostPlatform,
    entry_point: &Path,
    bin_dir: Option<&Path>,
    inputs: &ValidateInputs,
    notices: &mut dyn Write,
) -> Result<CommandLine, LaunchError> {
    if is_launcher_entry_point(entry_point) {
        actions::notice_to(notices, &format!("Running {LAUNCHER_NAME}"));
    }
    let dir = match bin_dir {
        Some(dir) => dir.to_path_buf(),
        None => resolve_binary_dir(entry_point),
    };

    let variant = select_binary(platform)?;
    actions::notice_to(notices, variant.selection_notice());

    Ok(CommandLine::build(&dir, variant, inputs))
}

// ---------------------------------------------------------------------------
// Running
// ---------------------------------------------------------------------------

/// How the child process ended.
#[derive(Debug)]
pub enum ChildOutcome {
    /// Exited normally with a status code.
    Exited(i32),
    /// Ended without a status code; carries the signal number when known.
    Terminated(Option<i32>),
    /// The binary could not be started at all.
    SpawnFailed(io::Error),
}

impl ChildOutcome {
    pub fn from_status(status: ExitStatus) -> Self {
        if let Some(code) = status.code() {
            return ChildOutcome::Exited(code);
        }
        ChildOutcome::Terminated(terminating_signal(&status))
    }

    /// Exit code the launcher should terminate with.
    pub fn exit_code(&self, policy: IndeterminateStatus) -> i32 {
        match (self, policy) {
            (ChildOutcome::Exited(code), _) => *code,
            (_, IndeterminateStatus::Success) => 0,
            (ChildOutcome::Terminated(signal), IndeterminateStatus::Strict) => {
                EXIT_SIGNAL_BASE + signal.unwrap_or(0)
            }
            (ChildOutcome::SpawnFailed(err), IndeterminateStatus::Strict) => {
                if err.kind() == io::ErrorKind::NotFound {
                    EXIT_NOT_FOUND
                } else {
                    EXIT_CANNOT_EXECUTE
                }
            }
        }
    }
}

#[cfg(unix)]
fn terminating_signal(status: &ExitStatus) -> Option<i32> {
    use std::os::unix::process::ExitStatusExt;
    status.signal()
}

#[cfg(not(unix))]
fn terminating_signal(_status: &ExitStatus) -> Option<i32> {
    None
}

/// Runs the command to completion, blocking until the child exits.
pub fn run(command_line: &CommandLine) -> ChildOutcome {
    match command_line.to_command().status() {
        Ok(status) => ChildOutcome::from_status(status),
        Err(err) => ChildOutcome::SpawnFailed(err),
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn sample_inputs() -> ValidateInputs {
        ValidateInputs {
            token: OsString::from("ghs_secret"),
            self_: OsString::from("build"),
            interval: OsString::from("10"),
            git_ref: OsString::from("refs/heads/main"),
            timeout: OsString::from("600"),
            ignored: OsString::from("lint,docs"),
        }
    }

    fn args_as_strings(cmd: &CommandLine) -> Vec<String> {
        cmd.args
            .iter()
            .map(|a| a.to_string_lossy().into_owned())
            .collect()
    }

    // -----------------------------------------------------------------------
    // Binary directory
    // -----------------------------------------------------------------------

    #[test]
    fn launcher_entry_point_uses_dist() {
        let dir = resolve_binary_dir(Path::new("/opt/action/invoke-binary"));
        assert_eq!(dir, PathBuf::from("/opt/action/dist"));
    }

    #[test]
    fn other_entry_point_uses_own_dir() {
        for name in ["main", "index", "invoke-binary-old", "invoke-binary.bak"] {
            let entry = Path::new("/opt/action/dist").join(name);
            assert_eq!(
                resolve_binary_dir(&entry),
                PathBuf::from("/opt/action/dist"),
                "{name} should not be treated as the launcher"
            );
        }
    }

    #[test]
    fn bare_entry_point_name_resolves_relative() {
        assert_eq!(
            resolve_binary_dir(Path::new("invoke-binary")),
            PathBuf::from("dist")
        );
    }

    // -----------------------------------------------------------------------
    // Inputs
    // -----------------------------------------------------------------------

    #[test]
    fn inputs_read_from_lookup() {
        let inputs = ValidateInputs::from_lookup(|key| match key {
            "INPUT_TOKEN" => Some(OsString::from("t")),
            "INPUT_SELF" => Some(OsString::from("s")),
            "INPUT_REF" => Some(OsString::from(" refs/tags/v1 ")),
            _ => None,
        });
        assert_eq!(inputs.token, "t");
        assert_eq!(inputs.self_, "s");
        assert_eq!(inputs.git_ref, "refs/tags/v1");
        assert_eq!(inputs.interval, "");
        assert_eq!(inputs.timeout, "");
        assert_eq!(inputs.ignored, "");
    }

    // -----------------------------------------------------------------------
    // Command line
    // -----------------------------------------------------------------------

    #[test]
    fn build_places_validate_and_all_flags_in_order() {
        let cmd = CommandLine::build(
            Path::new("/opt/action/dist"),
            BinaryVariant::LinuxAmd64,
            &sample_inputs(),
        );
        assert_eq!(
            cmd.program,
            PathBuf::from("/opt/action/dist/action-linux-amd64")
        );
        assert_eq!(
            args_as_strings(&cmd),
            vec![
                "validate",
                "--token=ghs_secret",
                "--self=build",
                "--interval=10",
                "--ref=refs/heads/main",
                "--timeout=600",
                "--ignored=lint,docs",
            ]
        );
    }

    #[test]
    fn build_passes_quotes_through_unmodified() {
        let inputs = ValidateInputs {
            token: OsString::from(r#"a"b"#),
            self_: OsString::from(r#""quoted""#),
            interval: OsString::from(r#"1" && echo pwned && ""#),
            git_ref: OsString::from("$(whoami)"),
            timeout: OsString::from("`id`"),
            ignored: OsString::from(r#"\""#),
        };
        let cmd = CommandLine::build(Path::new("/b"), BinaryVariant::LinuxArm64, &inputs);
        let args = args_as_strings(&cmd);

        assert_eq!(args[1], r#"--token=a"b"#);
        assert_eq!(args[2], r#"--self="quoted""#);
        assert_eq!(args[3], r#"--interval=1" && echo pwned && ""#);
        assert_eq!(args[4], "--ref=$(whoami)");
        assert_eq!(args[5], "--timeout=`id`");
        assert_eq!(args[6], r#"--ignored=\""#);
    }

    #[cfg(unix)]
    #[test]
    fn build_keeps_non_utf8_values() {
        use std::os::unix::ffi::{OsStrExt, OsStringExt};

        let inputs = ValidateInputs {
            self_: OsString::from_vec(b"caf\xe9".to_vec()),
            ..sample_inputs()
        };
        let cmd = CommandLine::build(Path::new("/b"), BinaryVariant::LinuxAmd64, &inputs);

        assert_eq!(cmd.args[2].as_bytes(), b"--self=caf\xe9");
        assert!(cmd.to_string().contains("--self=\"caf\u{FFFD}\""));
    }

    #[test]
    fn display_quotes_values_unescaped_and_redacts_token() {
        let inputs = ValidateInputs {
            self_: OsString::from(r#"x"y"#),
            ..sample_inputs()
        };
        let cmd = CommandLine::build(Path::new("/b"), BinaryVariant::LinuxAmd64, &inputs);
        let rendered = cmd.to_string();

        assert!(rendered.starts_with("/b/action-linux-amd64 validate "));
        assert!(rendered.contains(r#"--token="***""#));
        assert!(rendered.contains(r#"--self="x"y""#));
        assert!(rendered.contains(r#"--ignored="lint,docs""#));
        assert!(!rendered.contains("ghs_secret"));
    }

    // -----------------------------------------------------------------------
    // prepare
    // -----------------------------------------------------------------------

    #[test]
    fn prepare_from_launcher_announces_dist_and_variant() {
        let mut notices = Vec::new();
        let cmd = prepare(
            &HostPlatform::new("linux", "arm64"),
            Path::new("/opt/action/invoke-binary"),
            None,
            &sample_inputs(),
            &mut notices,
        )
        .unwrap();

        assert_eq!(
            cmd.program,
            PathBuf::from("/opt/action/dist/action-linux-arm64")
        );
        assert_eq!(
            String::from_utf8(notices).unwrap(),
            "::notice::Running invoke-binary\n::notice::Linux ARM64 binary selected\n"
        );
    }

    #[test]
    fn prepare_with_override_still_announces_launcher() {
        let mut notices = Vec::new();
        let cmd = prepare(
            &HostPlatform::new("linux", "x64"),
            Path::new("/opt/action/invoke-binary"),
            Some(Path::new("/custom")),
            &sample_inputs(),
            &mut notices,
        )
        .unwrap();

        assert_eq!(cmd.program, PathBuf::from("/custom/action-linux-amd64"));
        assert_eq!(
            String::from_utf8(notices).unwrap(),
            "::notice::Running invoke-binary\n::notice::Linux AMD64 binary selected\n"
        );
    }

    #[test]
    fn prepare_with_override_from_other_entry_point() {
        let mut notices = Vec::new();
        let cmd = prepare(
            &HostPlatform::new("linux", "x64"),
            Path::new("/opt/action/main"),
            Some(Path::new("/custom")),
            &sample_inputs(),
            &mut notices,
        )
        .unwrap();

        assert_eq!(cmd.program, PathBuf::from("/custom/action-linux-amd64"));
        assert_eq!(
            String::from_utf8(notices).unwrap(),
            "::notice::Linux AMD64 binary selected\n"
        );
    }

    #[test]
    fn prepare_rejects_unsupported_platform() {
        let mut notices = Vec::new();
        let err = prepare(
            &HostPlatform::new("darwin", "arm64"),
            Path::new("/opt/action/main"),
            None,
            &sample_inputs(),
            &mut notices,
        )
        .unwrap_err();
        assert!(matches!(err, LaunchError::UnsupportedPlatform { .. }));
        assert!(notices.is_empty());
    }

    // -----------------------------------------------------------------------
    // Exit codes
    // -----------------------------------------------------------------------

    #[test]
    fn exited_code_is_forwarded_under_both_policies() {
        for policy in [IndeterminateStatus::Success, IndeterminateStatus::Strict] {
            assert_eq!(ChildOutcome::Exited(3).exit_code(policy), 3);
            assert_eq!(ChildOutcome::Exited(0).exit_code(policy), 0);
        }
    }

    #[test]
    fn terminated_is_zero_by_default() {
        assert_eq!(
            ChildOutcome::Terminated(Some(9)).exit_code(IndeterminateStatus::Success),
            0
        );
    }

    #[test]
    fn terminated_is_signal_based_when_strict() {
        assert_eq!(
            ChildOutcome::Terminated(Some(15)).exit_code(IndeterminateStatus::Strict),
            143
        );
        assert_eq!(
            ChildOutcome::Terminated(None).exit_code(IndeterminateStatus::Strict),
            128
        );
    }

    #[test]
    fn spawn_failure_codes() {
        let not_found = ChildOutcome::SpawnFailed(io::Error::from(io::ErrorKind::NotFound));
        let denied = ChildOutcome::SpawnFailed(io::Error::from(io::ErrorKind::PermissionDenied));

        assert_eq!(not_found.exit_code(IndeterminateStatus::Success), 0);
        assert_eq!(not_found.exit_code(IndeterminateStatus::Strict), 127);
        assert_eq!(denied.exit_code(IndeterminateStatus::Strict), 126);
    }

    #[test]
    #[serial_test::serial(spawn)]
    fn run_missing_binary_is_spawn_failure() {
        let dir = TempDir::new().unwrap();
        let cmd = CommandLine::build(dir.path(), BinaryVariant::LinuxAmd64, &sample_inputs());
        assert!(matches!(run(&cmd), ChildOutcome::SpawnFailed(_)));
    }

    #[cfg(unix)]
    mod unix {
        use super::*;
        use serial_test::serial;
        use std::os::unix::fs::PermissionsExt;

        fn write_script(dir: &Path, variant: BinaryVariant, body: &str) {
            let path = dir.join(variant.file_name());
            std::fs::write(&path, format!("#!/bin/sh\n{body}\n")).unwrap();
            std::fs::set_permissions(&path, std::fs::Permissions::from_mode(0o755)).unwrap();
        }

        #[test]
        #[serial(spawn)]
        fn run_forwards_exit_code() {
            let dir = TempDir::new().unwrap();
            write_script(dir.path(), BinaryVariant::LinuxAmd64, "exit 3");
            let cmd =
                CommandLine::build(dir.path(), BinaryVariant::LinuxAmd64, &sample_inputs());

            let outcome = run(&cmd);
            assert!(matches!(outcome, ChildOutcome::Exited(3)));
            assert_eq!(outcome.exit_code(IndeterminateStatus::Success), 3);
        }

        #[test]
        #[serial(spawn)]
        fn run_signal_terminated_child() {
            let dir = TempDir::new().unwrap();
            write_script(dir.path(), BinaryVariant::LinuxArm64, "kill -TERM $$");
            let cmd =
                CommandLine::build(dir.path(), BinaryVariant::LinuxArm64, &sample_inputs());

            let outcome = run(&cmd);
            assert!(matches!(outcome, ChildOutcome::Terminated(Some(15))));
            assert_eq!(outcome.exit_code(IndeterminateStatus::Success), 0);
            assert_eq!(outcome.exit_code(IndeterminateStatus::Strict), 143);
        }

        #[test]
        #[serial(spawn)]
        fn run_passes_arguments_verbatim() {
            let dir = TempDir::new().unwrap();
            let capture = dir.path().join("argv.txt");
            write_script(
                dir.path(),
                BinaryVariant::LinuxAmd64,
                &format!(
                    "for a in \"$@\"; do printf '%s\\n' \"$a\" >> '{}'; done",
                    capture.display()
                ),
            );
            let inputs = ValidateInputs {
                self_: OsString::from(r#"he said "hi"; rm -rf /"#),
                ..sample_inputs()
            };
            let cmd = CommandLine::build(dir.path(), BinaryVariant::LinuxAmd64, &inputs);

            assert!(matches!(run(&cmd), ChildOutcome::Exited(0)));
            let lines: Vec<String> = std::fs::read_to_string(&capture)
                .unwrap()
                .lines()
                .map(str::to_string)
                .collect();
            assert_eq!(lines[0], "validate");
            assert_eq!(lines[2], r#"--self=he said "hi"; rm -rf /"#);
            assert_eq!(lines.len(), 7);
        }
    }
}
