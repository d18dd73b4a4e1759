use std::io::{self, Read};

use crate::error::FrameError;
use crate::frame::{CanFrame, FRAME_SIZE};

/// Splits a byte stream into back-to-back fixed size records.
pub struct FrameReader<R> {
    reader: R,
    buffer: [u8; FRAME_SIZE],
    finished: bool,
}

impl<R: Read> FrameReader<R> {
    pub fn new(reader: R) -> Self {
        Self {
            reader,
            buffer: [0; FRAME_SIZE],
            finished: false,
        }
    }

    pub fn into_inner(self) -> R {
        self.reader
    }
}

impl<R: Read> Iterator for FrameReader<R> {
    type Item = Result<CanFrame, FrameError>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.finished {
            return None;
        }
        let mut filled = 0;
        while filled < FRAME_SIZE {
            match self.reader.read(&mut self.buffer[filled..]) {
                Ok(0) => {
                    self.finished = true;
                    return match filled {
                        0 => None,
                        n => Some(Err(FrameError::Truncated(n))),
                    };
                }
                Ok(n) => filled += n,
                Err(e) if e.kind() == io::ErrorKind::Interrupted => (),
                Err(e) => {
                    self.finished = true;
                    return Some(Err(e.into()));
                }
            }
        }
        Some(CanFrame::from_bytes(&self.buffer))
    }
}

#[cfg(test)]
mod tests {
    use std::io::Cursor;

    use super::*;

    /// Hands out at most `chunk` bytes per read.
    struct Trickle<'a> {
        bytes: &'a [u8],
        chunk: usize,
    }

    impl Read for Trickle<'_> {
        fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
            let n = self.chunk.min(buf.len()).min(self.bytes.len());
            buf[..n].copy_from_slice(&self.bytes[..n]);
            self.bytes = &self.bytes[n..];
            Ok(n)
        }
    }

    fn stream() -> (Vec<CanFrame>, Vec<u8>) {
        let frames = vec![
            CanFrame::new(0x100, 1, &[0x11], 1_000).unwrap(),
            CanFrame::new(0x101, 8, &[1, 2, 3, 4, 5, 6, 7, 8], 1_050).unwrap(),
            CanFrame::new(0x100, 5, &[0xFF; 5], 1_100).unwrap(),
        ];
        let bytes = frames.iter().flat_map(|f| f.to_bytes().unwrap()).collect();
        (frames, bytes)
    }

    #[test]
    fn test_reads_records() {
        let (frames, bytes) = stream();
        let read: Vec<_> = FrameReader::new(Cursor::new(bytes))
            .collect::<Result<_, _>>()
            .unwrap();
        assert_eq!(read, frames);
    }

    #[test]
    fn test_short_reads() {
        let (frames, bytes) = stream();
        let reader = FrameReader::new(Trickle {
            bytes: &bytes,
            chunk: 5,
        });
        let read: Vec<_> = reader.collect::<Result<_, _>>().unwrap();
        assert_eq!(read, frames);
    }

    #[test]
    fn test_truncated() {
        let (_, mut bytes) = stream();
        bytes.truncate(FRAME_SIZE + 10);
        let mut reader = FrameReader::new(Cursor::new(bytes));
        assert!(reader.next().unwrap().is_ok());
        assert!(matches!(reader.next(), Some(Err(FrameError::Truncated(10)))));
        assert!(reader.next().is_none());
    }

    #[test]
    fn test_empty() {
        assert!(FrameReader::new(Cursor::new(Vec::new())).next().is_none());
    }
}
