use std::io;

use thiserror::Error;

#[derive(Error, Debug)]
pub enum FrameError {
    #[error("data length code {0} outside 1..=8")]
    InvalidDlc(u8),

    #[error("payload of {len} bytes is shorter than data length code {dlc}")]
    PayloadTooShort { dlc: u8, len: usize },

    #[error("payload bytes past data length code {dlc} are not zero")]
    NonZeroPadding { dlc: u8 },

    #[error("invalid identifier selection: {0}")]
    InvalidIdSelection(String),

    #[error("stream ended {0} bytes into a 21 byte record")]
    Truncated(usize),

    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    #[error("codec error: {0}")]
    Codec(#[from] binrw::Error),
}
