//! Error types for cirrus-lxd.

use thiserror::Error;

/// Result type alias for cirrus-lxd operations.
pub type Result<T> = std::result::Result<T, LxdError>;

/// Errors that can occur while driving LXD.
#[derive(Debug, Error)]
pub enum LxdError {
    /// External program could not be started
    #[error("failed to run {program}: {source}")]
    Spawn {
        program: String,
        #[source]
        source: std::io::Error,
    },

    /// External program exited unsuccessfully
    #[error("command `{command}` failed with status {status}: {stderr}")]
    CommandFailed {
        command: String,
        status: i32,
        stderr: String,
    },

    /// Release cannot be launched for this instance variant
    #[error("Release {release} is not supported for LXD{}", vm_suffix(.vm))]
    UnsupportedRelease { release: String, vm: bool },

    /// Image id names a remote that is neither the daily nor the releases remote
    #[error("Unknown remote: {0}")]
    UnknownRemote(String),

    /// User data was given both directly and through `user.user-data`
    #[error(
        "user data cannot be defined in the config mapping and also passed as user data; pick one"
    )]
    ConflictingUserData,

    /// Image metadata lacks the hash key needed to build an image reference
    #[error("image metadata for {image} has no '{key}' field")]
    MissingHashKey { image: String, key: String },

    /// No index record matched the lookup
    #[error("no image found for {0}")]
    NoImageFound(String),

    /// The external tool printed something we could not interpret
    #[error("unexpected output: {0}")]
    UnexpectedOutput(String),

    /// Configuration error
    #[error("configuration error: {0}")]
    Config(String),

    /// Image index error
    #[error("image index error: {0}")]
    Streams(#[from] cirrus_streams::StreamsError),

    /// I/O error
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

fn vm_suffix(vm: &bool) -> &'static str {
    if *vm {
        " vms"
    } else {
        ""
    }
}
