mod config;
mod emitter;
mod error;

pub use crate::config::*;
pub use crate::emitter::*;
pub use crate::error::ServerError;
