//! Error types for the id compressor.

use thiserror::Error;

/// Errors produced by any fallible operation on a [`crate::compressor::Compressor`].
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum Error {
    /// An argument was out of range or otherwise malformed.
    #[error("invalid argument: {0}")]
    InvalidArgument(String),

    /// A finalization range or resumed state violated a protocol invariant
    /// (non-contiguous range, colliding session on resume).
    #[error("protocol violation: {0}")]
    Protocol(String),

    /// The requested id or stable id is not present in the cluster table.
    #[error("id not known to this compressor")]
    UnknownId,

    /// A foreign session's LocalId cannot be represented in session space
    /// because its owner has not yet finalized it.
    #[error("cannot normalize an unfinalized id from a foreign session")]
    UnfinalizedForeignId,

    /// The serialized blob's version tag does not match what this build
    /// knows how to read.
    #[error("unsupported serialized format version {found}, expected {expected}")]
    VersionMismatch {
        /// Version tag found in the blob.
        found: u32,
        /// Version tag this build knows how to read.
        expected: u32,
    },

    /// A counter or arithmetic operation would exceed its safe range.
    #[error("overflow: {0}")]
    Overflow(String),

    /// The operation was attempted on a disposed compressor.
    ///
    /// `Compressor` itself never produces this variant (see `DESIGN.md`); it
    /// exists so host bindings with an explicit native lifecycle can reuse
    /// this error type.
    #[error("operation attempted after dispose")]
    Disposed,
}

impl Error {
    pub(crate) fn invalid_argument(msg: impl Into<String>) -> Self {
        Self::InvalidArgument(msg.into())
    }

    pub(crate) fn protocol(msg: impl Into<String>) -> Self {
        Self::Protocol(msg.into())
    }

    pub(crate) fn overflow(msg: impl Into<String>) -> Self {
        Self::Overflow(msg.into())
    }
}

/// Convenience alias used throughout this crate.
pub type Result<T> = std::result::Result<T, Error>;
