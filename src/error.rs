//! Typed failures raised before the bundled binary is spawned.
//!
//! Anything that happens after the spawn is not an error from the launcher's
//! point of view: the child's status is forwarded as-is.

use thiserror::Error;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum LaunchError {
    /// The host operating system has no bundled binary.
    #[error("Only linux is supported (detected '{os}')")]
    UnsupportedPlatform { os: String },

    /// The host CPU architecture has no bundled binary.
    #[error("Only x64 and arm64 are supported (detected '{arch}')")]
    UnsupportedArchitecture { arch: String },
}
