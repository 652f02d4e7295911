//! Centralized error types for the CueLab core library.
//!
//! Module-level error enums (`DecodeError`, `TableError`, `OrderError`)
//! stay close to the code that raises them; this module unifies them into
//! [`CuelabError`] for the host boundary and attaches machine-readable
//! codes via the [`ErrorCode`] trait.
//!
//! Propagation policy: transport failures are swallowed at the transport
//! boundary (logged, playback state still updates); decode failures drop
//! the datagram and keep the listener alive; command-table misses and order
//! file problems are fatal at session start, before any page is shown.

use thiserror::Error;

use crate::device::video::TableError;
use crate::order::OrderError;
use crate::osc::DecodeError;

/// Trait for error types that provide machine-readable error codes.
///
/// Implement this trait to provide consistent error codes across different
/// error conversion paths.
pub trait ErrorCode {
    /// Returns a machine-readable error code for host consumption.
    fn code(&self) -> &'static str;
}

impl ErrorCode for DecodeError {
    fn code(&self) -> &'static str {
        match self {
            Self::Truncated(_) => "datagram_truncated",
            Self::BadAddress(_) => "bad_address",
            Self::BadTypeTags => "bad_type_tags",
            Self::UnknownTypeTag(_) => "unknown_type_tag",
            Self::BadUtf8 => "bad_utf8",
        }
    }
}

impl ErrorCode for TableError {
    fn code(&self) -> &'static str {
        match self {
            Self::UnsupportedAction { .. } => "unsupported_action",
        }
    }
}

impl ErrorCode for OrderError {
    fn code(&self) -> &'static str {
        match self {
            Self::Io { .. } => "order_file_unreadable",
            Self::InvalidOrderFile { .. } => "invalid_order_file",
        }
    }
}

/// Application-wide error type for the CueLab core.
#[derive(Debug, Error)]
pub enum CuelabError {
    /// Socket creation or bind failed.
    #[error("Transport error: {0}")]
    Transport(String),

    /// An inbound datagram could not be decoded.
    #[error("Decode error: {0}")]
    Decode(String),

    /// A device command table has no mapping for a required action.
    #[error("Unsupported device action: {0}")]
    UnsupportedAction(String),

    /// The trial-order source is unusable; fatal at session start.
    #[error("Order error: {0}")]
    Order(String),

    /// Session configuration is inconsistent.
    #[error("Configuration error: {0}")]
    Configuration(String),
}

impl CuelabError {
    /// Returns a machine-readable error code for host consumption.
    #[must_use]
    pub fn code(&self) -> &'static str {
        match self {
            Self::Transport(_) => "transport_error",
            Self::Decode(_) => "decode_error",
            Self::UnsupportedAction(_) => "unsupported_action",
            Self::Order(_) => "order_error",
            Self::Configuration(_) => "configuration_error",
        }
    }
}

impl From<DecodeError> for CuelabError {
    fn from(err: DecodeError) -> Self {
        Self::Decode(err.to_string())
    }
}

impl From<TableError> for CuelabError {
    fn from(err: TableError) -> Self {
        Self::UnsupportedAction(err.to_string())
    }
}

impl From<OrderError> for CuelabError {
    fn from(err: OrderError) -> Self {
        Self::Order(err.to_string())
    }
}

impl From<std::io::Error> for CuelabError {
    fn from(err: std::io::Error) -> Self {
        Self::Transport(err.to_string())
    }
}

/// Convenient Result alias for core-wide operations.
pub type CuelabResult<T> = Result<T, CuelabError>;
