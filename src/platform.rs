//! Host platform detection and bundled binary selection.
//!
//! The platform descriptor is read once at startup and then passed explicitly
//! into [`select_binary`], which is a pure decision table over
//! (operating system, CPU architecture).

use std::fmt;

use crate::error::LaunchError;

/// Operating system identifiers recognised inside a target triple.
const KNOWN_OS: &[&str] = &["linux", "darwin", "windows", "freebsd", "netbsd", "android"];

// ---------------------------------------------------------------------------
// Platform descriptor
// ---------------------------------------------------------------------------

/// The (operating system, CPU architecture) pair the launcher runs on.
///
/// Identifiers are kept as reported by the host; normalization happens in
/// [`select_binary`] so the raw values can be shown in error messages.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HostPlatform {
    pub os: String,
    pub arch: String,
}

impl HostPlatform {
    pub fn new(os: impl Into<String>, arch: impl Into<String>) -> Self {
        Self {
            os: os.into(),
            arch: arch.into(),
        }
    }

    /// Detects the running platform from the compile-time target triple.
    pub fn detect() -> Self {
        Self::from_target_triple(build_target())
    }

    /// Splits a target triple such as `aarch64-unknown-linux-gnu` into a
    /// platform descriptor.
    ///
    /// The architecture is the first segment. The OS is the first segment
    /// matching a known OS identifier; triples without one fall back to the
    /// OS the standard library reports.
    pub fn from_target_triple(triple: &str) -> Self {
        let arch = triple.split('-').next().unwrap_or_default();
        let os = triple
            .split('-')
            .skip(1)
            .find(|segment| KNOWN_OS.contains(segment))
            .unwrap_or(std::env::consts::OS);
        Self::new(os, arch)
    }
}

impl fmt::Display for HostPlatform {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.os, self.arch)
    }
}

/// Returns the compile-time target triple (e.g., "x86_64-unknown-linux-gnu").
pub fn build_target() -> &'static str {
    env!("TARGET")
}

// ---------------------------------------------------------------------------
// Binary selection
// ---------------------------------------------------------------------------

/// One of the precompiled binaries shipped next to the launcher.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BinaryVariant {
    LinuxAmd64,
    LinuxArm64,
}

impl BinaryVariant {
    /// File name of the binary inside the bundle directory.
    pub fn file_name(self) -> &'static str {
        match self {
            BinaryVariant::LinuxAmd64 => "action-linux-amd64",
            BinaryVariant::LinuxArm64 => "action-linux-arm64",
        }
    }

    /// Notice text announcing that this variant was chosen.
    pub fn selection_notice(self) -> &'static str {
        match self {
            BinaryVariant::LinuxAmd64 => "Linux AMD64 binary selected",
            BinaryVariant::LinuxArm64 => "Linux ARM64 binary selected",
        }
    }
}

impl fmt::Display for BinaryVariant {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.file_name())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum CpuArch {
    X64,
    Arm64,
}

/// Maps both the Node.js (`x64`, `arm64`) and the Rust target
/// (`x86_64`, `aarch64`) vocabularies onto the two supported architectures.
fn normalize_arch(arch: &str) -> Option<CpuArch> {
    match arch.trim().to_ascii_lowercase().as_str() {
        "x64" | "x86_64" | "amd64" => Some(CpuArch::X64),
        "arm64" | "aarch64" => Some(CpuArch::Arm64),
        _ => None,
    }
}

fn is_linux(os: &str) -> bool {
    os.trim().eq_ignore_ascii_case("linux")
}

/// Chooses the bundled binary for a platform.
///
/// The OS is checked before the architecture, so a non-Linux host is always
/// reported as [`LaunchError::UnsupportedPlatform`] whatever its CPU.
pub fn select_binary(platform: &HostPlatform) -> Result<BinaryVariant, LaunchError> {
    if !is_linux(&platform.os) {
        return Err(LaunchError::UnsupportedPlatform {
            os: platform.os.clone(),
        });
    }

    match normalize_arch(&platform.arch) {
        Some(CpuArch::X64) => Ok(BinaryVariant::LinuxAmd64),
        Some(CpuArch::Arm64) => Ok(BinaryVariant::LinuxArm64),
        None => Err(LaunchError::UnsupportedArchitecture {
            arch: platform.arch.clone(),
        }),
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
