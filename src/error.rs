//! Failure taxonomy for request handling.
//!
//! Every variant's `Display` string is part of the wire contract: callers
//! grep for these messages, so they stay short and stable. Nothing here
//! carries stack traces or internal identifiers.

use crate::permissions::Capability;

#[derive(Debug, thiserror::Error)]
pub enum ActionError {
    /// Malformed request bytes; terminal for the request.
    #[error("decode error: {0}")]
    Decode(String),

    /// The global pause switch is set; no action was attempted.
    #[error("paused")]
    Paused,

    #[error("notification not authorized")]
    NotificationDenied,

    /// One or more requested capabilities remain unauthorized.
    #[error("missing permissions: {}", join_names(.0))]
    MissingPermissions(Vec<Capability>),

    #[error("screen-recording not authorized")]
    ScreenRecordingDenied,

    #[error("screenshot failed")]
    CaptureFailed,

    #[error("empty command")]
    EmptyCommand,

    #[error("failed to start: {0}")]
    Spawn(String),

    /// The child exceeded its deadline and was terminated.
    #[error("timeout")]
    Timeout,

    #[error("io error: {0}")]
    Io(String),
}

fn join_names(caps: &[Capability]) -> String {
    caps.iter()
        .map(Capability::as_str)
        .collect::<Vec<_>>()
        .join(", ")
}
