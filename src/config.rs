//! Launcher settings.
//!
//! Settings are layered, highest precedence first: CLI flag, environment
//! variable, `invoke-binary.toml`, built-in default. Empty or whitespace-only
//! values at any layer fall through to the next one.
//!
//! The config file is optional. By default it is looked up next to the
//! launcher executable so that it ships inside the action bundle.

use anyhow::{Context, Result, bail};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Config file name looked up next to the launcher.
pub const CONFIG_FILE_NAME: &str = "invoke-binary.toml";

/// Environment variable naming an explicit config file.
pub const CONFIG_PATH_ENV_VAR: &str = "INVOKE_BINARY_CONFIG";

/// Environment variable overriding the binary directory.
pub const BIN_DIR_ENV_VAR: &str = "INVOKE_BINARY_BIN_DIR";

/// Environment variable selecting the indeterminate status policy.
pub const INDETERMINATE_STATUS_ENV_VAR: &str = "INVOKE_BINARY_INDETERMINATE_STATUS";

/// Environment variable enabling verbose diagnostics.
pub const VERBOSE_ENV_VAR: &str = "INVOKE_BINARY_VERBOSE";

/// How to exit when the child produced no exit code (killed by a signal,
/// or never started).
///
/// Config file values go through [`IndeterminateStatus::parse`], so they are
/// case-insensitive like the environment variable.
#[derive(Serialize, Deserialize, Debug, Clone, Copy, Default, PartialEq, Eq)]
#[serde(rename_all = "lowercase", try_from = "String")]
pub enum IndeterminateStatus {
    /// Exit 0 so the calling pipeline is not failed on an ambiguous status.
    #[default]
    Success,
    /// Exit `128 + signal` for signals, 127 when the binary was not found
    /// and 126 when it could not be executed.
    Strict,
}

impl TryFrom<String> for IndeterminateStatus {
    type Error = anyhow::Error;

    fn try_from(value: String) -> Result<Self> {
        Self::parse(&value)
    }
}

impl IndeterminateStatus {
    /// Parses `success` or `strict` (case-insensitive, trimmed).
    pub fn parse(value: &str) -> Result<Self> {
        match value.trim().to_ascii_lowercase().as_str() {
            "success" => Ok(Self::Success),
            "strict" => Ok(Self::Strict),
            other => bail!(
                "Invalid indeterminate status policy '{other}'. Expected 'success' or 'strict'"
            ),
        }
    }
}

/// Contents of `invoke-binary.toml`.
#[derive(Serialize, Deserialize, Debug, Clone, Default, PartialEq, Eq)]
pub struct LauncherConfig {
    /// Directory holding the `action-linux-*` binaries.
    pub bin_dir: Option<String>,
    /// Exit policy when the child status is unavailable.
    pub indeterminate_status: Option<IndeterminateStatus>,
    /// Print the resolved binary and command line before running.
    pub verbose: Option<bool>,
}

/// Overrides supplied on the command line.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CliOverrides {
    pub bin_dir: Option<PathBuf>,
    pub strict_status: bool,
    pub verbose: bool,
}

/// Effective settings after all layers are applied.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedSettings {
    /// Explicit binary directory; `None` means resolve from the entry point.
    pub bin_dir: Option<PathBuf>,
    pub indeterminate_status: IndeterminateStatus,
    pub verbose: bool,
}

impl LauncherConfig {
    /// Resolve the config file path.
    ///
    /// Precedence: `--config`, then `INVOKE_BINARY_CONFIG`, then
    /// `invoke-binary.toml` in `launcher_dir`.
    pub fn config_path(cli_path: Option<&Path>, launcher_dir: &Path) -> PathBuf {
        Self::config_path_with_env(
            cli_path,
            std::env::var(CONFIG_PATH_ENV_VAR).ok(),
            launcher_dir,
        )
    }

    fn config_path_with_env(
        cli_path: Option<&Path>,
        env_value: Option<String>,
        launcher_dir: &Path,
    ) -> PathBuf {
        if let Some(path) = cli_path {
            return path.to_path_buf();
        }
        match non_empty_trimmed(env_value) {
            Some(path) => PathBuf::from(path),
            None => launcher_dir.join(CONFIG_FILE_NAME),
        }
    }

    /// Load config from a specific path. Returns defaults if the file does not exist.
    ///
    /// Parse errors and I/O errors (other than file-not-found) are hard
    /// failures so a broken bundle is not silently run with defaults.
    pub fn load_from(path: &Path) -> Result<Self> {
        match std::fs::read_to_string(path) {
            Ok(contents) => toml::from_str(&contents)
                .with_context(|| format!("failed to parse config file at {}", path.display())),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(Self::default()),
            Err(e) => {
                Err(e).with_context(|| format!("failed to read config file at {}", path.display()))
            }
        }
    }

    /// Apply CLI and environment layers on top of this file config.
    pub fn resolve(&self, cli: &CliOverrides) -> Result<ResolvedSettings> {
        self.resolve_with_env(cli, |key| std::env::var(key).ok())
    }

    /// Internal resolver that takes the environment lookup as a parameter for testability.
    fn resolve_with_env<F>(&self, cli: &CliOverrides, env: F) -> Result<ResolvedSettings>
    where
        F: Fn(&str) -> Option<String>,
    {
        let bin_dir = cli
            .bin_dir
            .clone()
            .filter(|p| !p.as_os_str().is_empty())
            .or_else(|| non_empty_trimmed(env(BIN_DIR_ENV_VAR)).map(PathBuf::from))
            .or_else(|| non_empty_trimmed(self.bin_dir.clone()).map(PathBuf::from));

        let indeterminate_status = if cli.strict_status {
            IndeterminateStatus::Strict
        } else if let Some(value) = non_empty_trimmed(env(INDETERMINATE_STATUS_ENV_VAR)) {
            IndeterminateStatus::parse(&value)
                .with_context(|| format!("invalid {INDETERMINATE_STATUS_ENV_VAR}"))?
        } else {
            self.indeterminate_status.unwrap_or_default()
        };

        let verbose = cli.verbose
            || non_empty_trimmed(env(VERBOSE_ENV_VAR)).is_some_and(|v| is_truthy(&v))
            || self.verbose.unwrap_or(false);

        Ok(ResolvedSettings {
            bin_dir,
            indeterminate_status,
            verbose,
        })
    }
}

fn is_truthy(value: &str) -> bool {
    matches!(
        value.to_ascii_lowercase().as_str(),
        "1" | "true" | "yes" | "on"
    )
}

/// Return the trimmed value if non-empty after trimming, otherwise `None`.
fn non_empty_trimmed(value: Option<String>) -> Option<String> {
    value.and_then(|v| {
        let trimmed = v.trim().to_string();
        if trimmed.is_empty() {
            None
        } else {
            Some(trimmed)
        }
    })
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
