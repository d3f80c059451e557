//! Error types shared by every component of the ring.
//!
//! One tagged enum instead of one type per failure kind. Replies carry these
//! across the wire verbatim, so the enum derives serde alongside `Error`.

use serde::{Deserialize, Serialize};

/// Result type alias for the core library.
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur in the core library.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error, Serialize, Deserialize)]
pub enum Error {
    /// Identifier falls outside the interval a table or node serves.
    #[error("identifier outside the responsible interval")]
    Range,
    /// Key absent from a table that is authoritative for it.
    #[error("key not present in table")]
    Key,
    /// State transition rejected because the node is already non-free.
    #[error("node busy with another join")]
    Busy,
    /// Privileged notification from a caller that is not the computed successor.
    #[error("notification from unverified caller")]
    Caller,
    /// Routing table exhausted without a matching arc. Unreachable for a
    /// finger table spanning the whole ring.
    #[error("no finger arc covers the identifier")]
    Find,
    /// Remote-call failure, propagated verbatim and never reclassified.
    #[error("transport error: {0}")]
    Transport(String),
}
