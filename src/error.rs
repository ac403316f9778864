//! Application-wide error types.

use thiserror::Error;

/// Client-input errors raised by the pack engine and its configuration.
///
/// Every variant maps to a 4xx response on the HTTP surface; none of them is
/// retried.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum PackError {
    #[error("invalid pack size: {0}")]
    InvalidPackSize(String),

    #[error("pack sizes must not be empty")]
    EmptyPackSizeSet,

    #[error("invalid amount: {0}")]
    InvalidAmount(String),

    #[error("no pack sizes configured")]
    NoPackSizesConfigured,
}

#[derive(Debug, Error)]
pub enum AppError {
    #[error("config error: {0}")]
    Config(String),

    #[error("logger error: {0}")]
    Logger(String),

    #[error("store error: {0}")]
    Store(String),

    #[error("server error: {0}")]
    Server(String),

    #[error(transparent)]
    Pack(#[from] PackError),

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}
