//! Error types
//!
//! Every fallible operation in the crate returns [`Result`]. The host-facing
//! lifecycle hooks on [`PcssLight`](crate::pcss::PcssLight) are the only place
//! these errors are turned into log events instead of being propagated.

use thiserror::Error;

use crate::pcss::config::PixelFormat;
use crate::pcss::resource::TargetHandle;

/// Errors produced while driving a PCSS light.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum PcssError {
    /// No light-like host object was attached when setup ran.
    #[error("no shadow-casting light is attached to the PCSS instance")]
    MissingHostObject,

    /// The host could not allocate the shadow render target.
    #[error(
        "failed to allocate {resolution}x{resolution} {format:?} shadow target \
         with {samples}x MSAA: {reason}"
    )]
    ResourceAllocation {
        /// Requested (normalized) edge length.
        resolution: u32,
        /// Requested color format.
        format: PixelFormat,
        /// Requested anti-aliasing sample count.
        samples: u32,
        /// Backend-provided reason.
        reason: String,
    },

    /// An update or destroy call arrived after teardown.
    #[error("`{operation}` called after the PCSS light was destroyed")]
    PostTeardownAccess {
        /// The rejected operation.
        operation: &'static str,
    },

    /// A per-frame call arrived before setup succeeded.
    #[error("`{operation}` called before the PCSS light was set up")]
    NotInitialized {
        /// The rejected operation.
        operation: &'static str,
    },

    /// A command or property update referenced a released render target.
    #[error("render target {0:?} is not live")]
    UnknownTarget(TargetHandle),

    /// A recorded command could not be replayed.
    #[error("command replay failed: {0}")]
    Command(String),
}

/// Result alias used across the crate.
pub type Result<T> = std::result::Result<T, PcssError>;
