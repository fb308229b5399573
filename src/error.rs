//! Error types for identicon generation and its adapters.
//!
//! Every pipeline stage is total, so the only failures the library can
//! produce come from encoding and writing the final image.

use std::io;
use std::net::SocketAddr;
use std::num::ParseIntError;
use std::path::PathBuf;

/// Failures raised while emitting a rendered identicon.
#[derive(Debug, thiserror::Error)]
pub enum IdenticonError {
    /// PNG encoding failed, including when the sink rejected a write.
    #[error("failed encoding identicon image: {0}")]
    Encode(#[from] image::ImageError),

    /// The output file could not be created.
    #[error("failed creating output file {}: {source}", .path.display())]
    CreateOutput {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    /// Flushing buffered output failed.
    #[error("failed writing identicon image: {0}")]
    Io(#[from] io::Error),
}

impl IdenticonError {
    /// True when the failure happened before any output artifact existed.
    #[must_use]
    pub fn is_create_failure(&self) -> bool {
        matches!(self, Self::CreateOutput { .. })
    }
}

/// Invalid server configuration values.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("invalid port {value:?}: {source}")]
    InvalidPort {
        value: String,
        #[source]
        source: ParseIntError,
    },

    #[error("invalid worker count {value:?}: must be a positive integer")]
    InvalidWorkers { value: String },
}

/// Failures of the HTTP adapter.
#[derive(Debug, thiserror::Error)]
pub enum ServerError {
    #[error("failed resolving {addr}: {source}")]
    Resolve {
        addr: String,
        #[source]
        source: io::Error,
    },

    #[error("{addr} did not resolve to any address")]
    NoAddress { addr: String },

    #[error("failed listening on {addr}: {source}")]
    Bind {
        addr: SocketAddr,
        #[source]
        source: warp::Error,
    },

    #[error("configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("server I/O error: {0}")]
    Io(#[from] io::Error),
}

pub type Result<T, E = IdenticonError> = std::result::Result<T, E>;
