//! Deterministic identicons: a 5x5 mirrored pattern derived from the MD5
//! digest of an identity string, rendered as a 250x250 PNG.
//!
//! ```no_run
//! let identicon = identicon::Identicon::new("banner");
//! identicon.save(std::path::Path::new("."))?;
//! # Ok::<(), identicon::IdenticonError>(())
//! ```

pub mod config;
pub mod error;
pub mod identicon;
pub mod models;
pub mod render;
pub mod server;

pub use crate::config::ServerConfig;
pub use crate::error::{ConfigError, IdenticonError, Result, ServerError};
pub use crate::identicon::{Identicon, generate};
pub use crate::models::{CANVAS_SIZE, CELL_SIZE, GridCell, Point, Rectangle, Rgb};
