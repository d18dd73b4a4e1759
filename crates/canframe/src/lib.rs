mod error;
mod frame;
mod generator;
mod reader;
mod signal;

pub use crate::error::FrameError;
pub use crate::frame::*;
pub use crate::generator::*;
pub use crate::reader::FrameReader;
pub use crate::signal::*;
