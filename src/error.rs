//! Error types for embedload operations.

use thiserror::Error;

use crate::models::DType;

/// All errors that can occur while fetching, decoding or importing data.
#[derive(Debug, Error)]
pub enum Error {
    /// I/O error from an underlying reader.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// The HTTP request or body stream failed.
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// The server answered with a non-success status.
    #[error("Failed to fetch '{url}': {status}")]
    HttpStatus {
        status: reqwest::StatusCode,
        url: String,
    },

    /// The header literal parsed but lacks a field or has one of the wrong type.
    #[error("Invalid .npy header: {0}")]
    InvalidHeader(String),

    /// The normalized header text could not be parsed.
    #[error("Invalid .npy header literal: {0}")]
    HeaderJson(#[source] serde_json::Error),

    /// The `descr` code has no entry in the dtype table.
    #[error("Unsupported dtype: {0}")]
    UnsupportedDType(String),

    /// Buffer ended before the preamble or declared header did.
    #[error("Unexpected end of buffer")]
    UnexpectedEof,

    /// Payload length is not a whole number of elements.
    #[error("Payload of {found} bytes is not a multiple of the {expected_multiple_of}-byte element width")]
    InconsistentDataSize {
        expected_multiple_of: usize,
        found: usize,
    },

    /// Encoded header would not fit the single-byte length field.
    #[error("Header of {len} bytes does not fit the single-byte length field (max 255)")]
    HeaderTooLong { len: usize },

    /// Tensor data representation does not fit its dtype.
    #[error("Cannot encode {representation} data as {dtype}")]
    DataMismatch {
        dtype: DType,
        representation: &'static str,
    },

    /// A JSONL line failed schema validation.
    #[error("Invalid record: {0}")]
    Record(#[source] serde_json::Error),

    /// The record or vector store rejected a write.
    #[error("Store error: {0}")]
    Store(#[from] StoreError),
}

/// Failure reported by a [`RecordStore`](crate::store::RecordStore) or
/// [`VectorStore`](crate::store::VectorStore) implementation.
#[derive(Debug, Clone, Error)]
pub enum StoreError {
    #[error("write rejected for key '{key}': {reason}")]
    Rejected { key: String, reason: String },

    #[error("store unavailable: {0}")]
    Unavailable(String),
}
