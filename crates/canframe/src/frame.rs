use std::fmt;
use std::io::{Cursor, Seek, Write};

use binrw::{BinRead, BinWrite};

use crate::error::FrameError;

/// Size of one serialized record: id (4) + dlc (1) + payload (8) + timestamp (8).
pub const FRAME_SIZE: usize = 21;
pub const PAYLOAD_SIZE: usize = 8;
pub const MIN_DLC: u8 = 1;
pub const MAX_DLC: u8 = 8;

/// A CAN-shaped record as it travels on the wire.
///
/// Integers are little-endian and the payload region is always
/// [`PAYLOAD_SIZE`] bytes, zero past `dlc`.
#[derive(BinRead, BinWrite, Debug, Clone, Copy, PartialEq, Eq)]
#[brw(little)]
pub struct CanFrame {
    pub id: u32,
    dlc: u8,
    data: [u8; PAYLOAD_SIZE],
    pub timestamp_us: u64,
}

impl CanFrame {
    pub fn new(id: u32, dlc: u8, payload: &[u8], timestamp_us: u64) -> Result<Self, FrameError> {
        if !(MIN_DLC..=MAX_DLC).contains(&dlc) {
            return Err(FrameError::InvalidDlc(dlc));
        }
        if payload.len() < dlc as usize {
            return Err(FrameError::PayloadTooShort {
                dlc,
                len: payload.len(),
            });
        }
        let mut data = [0u8; PAYLOAD_SIZE];
        data[..dlc as usize].copy_from_slice(&payload[..dlc as usize]);
        Ok(Self::from_parts(id, dlc, data, timestamp_us))
    }

    /// Caller guarantees `dlc` is in range and `data` is zero past it.
    pub(crate) fn from_parts(id: u32, dlc: u8, data: [u8; PAYLOAD_SIZE], timestamp_us: u64) -> Self {
        Self {
            id,
            dlc,
            data,
            timestamp_us,
        }
    }

    pub fn dlc(&self) -> u8 {
        self.dlc
    }

    /// The full 8 byte payload region, padding included.
    pub fn data(&self) -> &[u8; PAYLOAD_SIZE] {
        &self.data
    }

    pub fn payload(&self) -> &[u8] {
        &self.data[..self.dlc as usize]
    }

    pub fn write_to<W: Write + Seek>(&self, writer: &mut W) -> Result<(), FrameError> {
        self.write(writer)?;
        Ok(())
    }

    pub fn to_bytes(&self) -> Result<[u8; FRAME_SIZE], FrameError> {
        let mut buf = [0u8; FRAME_SIZE];
        self.write_to(&mut Cursor::new(&mut buf[..]))?;
        Ok(buf)
    }

    pub fn from_bytes(bytes: &[u8; FRAME_SIZE]) -> Result<Self, FrameError> {
        let frame = Self::read(&mut Cursor::new(&bytes[..]))?;
        frame.validate()?;
        Ok(frame)
    }

    fn validate(&self) -> Result<(), FrameError> {
        if !(MIN_DLC..=MAX_DLC).contains(&self.dlc) {
            return Err(FrameError::InvalidDlc(self.dlc));
        }
        if self.data[self.dlc as usize..].iter().any(|&b| b != 0) {
            return Err(FrameError::NonZeroPadding { dlc: self.dlc });
        }
        Ok(())
    }
}

impl fmt::Display for CanFrame {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} μs | {:03x} | [{}]", self.timestamp_us, self.id, self.dlc)?;
        for byte in self.payload() {
            write!(f, " {:02x}", byte)?;
        }
        Ok(())
    }
}
