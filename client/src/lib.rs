pub use crate::error::{ErrorDetail, ResponseError};
pub use crate::params::Params;
pub use crate::query::{
    CollapseParams, DebugType, DefType, ExpandOptions, Facet, GroupParams, Hint, NullPolicy,
    Operator, Query, QueryError, ReadOptions, WriteOptions,
};
pub use crate::responses::*;

pub mod error;
pub mod http;
pub mod params;
pub mod query;
pub mod responses;
pub mod update;

#[derive(Debug, thiserror::Error)]
pub enum ClientError {
    #[error("HTTP request failed: {0}")]
    Http(String),
    #[error("Reqwest error: {0}")]
    Reqwest(reqwest::Error),
    #[error("JSON serialization/deserialization failed: {0}")]
    Json(#[from] serde_json::Error),
    #[error("Invalid URL: {0}")]
    InvalidUrl(String),
    #[error("invalid configuration: no host or core provided")]
    InvalidConfig,
    #[error("Invalid document: {0}")]
    InvalidDocument(String),
    #[error("Invalid query: {0}")]
    Validation(#[from] QueryError),
    #[error("API error: {0}")]
    Api(String),
    /// The server answered with an `error` object. The decoded envelope is
    /// kept for callers that want whatever else came back.
    #[error("{error}")]
    Server {
        error: ResponseError,
        response: Box<Response>,
    },
}

pub type Result<T> = std::result::Result<T, ClientError>;
