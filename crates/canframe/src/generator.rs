use chrono::Utc;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use crate::error::FrameError;
use crate::frame::{CanFrame, MAX_DLC, MIN_DLC, PAYLOAD_SIZE};

pub const DEFAULT_IDS: [u32; 2] = [0x100, 0x101];

/// Source of frame timestamps, in microseconds since the Unix epoch.
pub trait Clock {
    fn now_us(&self) -> u64;
}

#[derive(Debug, Default, Clone, Copy)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now_us(&self) -> u64 {
        // A wall clock set before 1970 reads as zero.
        u64::try_from(Utc::now().timestamp_micros()).unwrap_or(0)
    }
}

/// How identifiers are drawn for generated frames.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum IdSelection {
    /// Uniform pick from a fixed set.
    Choice(Vec<u32>),
    /// Uniform pick from `min..=max`.
    Range { min: u32, max: u32 },
}

impl Default for IdSelection {
    fn default() -> Self {
        IdSelection::Choice(DEFAULT_IDS.to_vec())
    }
}

impl IdSelection {
    pub fn validate(&self) -> Result<(), FrameError> {
        match self {
            IdSelection::Choice(ids) if ids.is_empty() => Err(FrameError::InvalidIdSelection(
                "no identifiers to choose from".to_string(),
            )),
            IdSelection::Range { min, max } if min > max => Err(FrameError::InvalidIdSelection(
                format!("range start {:#x} is above range end {:#x}", min, max),
            )),
            _ => Ok(()),
        }
    }

    pub fn contains(&self, id: u32) -> bool {
        match self {
            IdSelection::Choice(ids) => ids.contains(&id),
            IdSelection::Range { min, max } => (*min..=*max).contains(&id),
        }
    }

    fn pick<R: Rng + ?Sized>(&self, rng: &mut R) -> u32 {
        match self {
            IdSelection::Choice(ids) => ids[rng.gen_range(0..ids.len())],
            IdSelection::Range { min, max } => rng.gen_range(*min..=*max),
        }
    }
}

/// Produces random frames with a uniformly chosen id, dlc and payload,
/// stamped with the current time.
pub struct FrameGenerator<R = StdRng, C = SystemClock> {
    rng: R,
    clock: C,
    ids: IdSelection,
    last_timestamp_us: u64,
}

impl FrameGenerator {
    pub fn new(ids: IdSelection) -> Result<Self, FrameError> {
        Self::with_rng_and_clock(ids, StdRng::from_entropy(), SystemClock)
    }
}

impl<R: Rng, C: Clock> FrameGenerator<R, C> {
    pub fn with_rng_and_clock(ids: IdSelection, rng: R, clock: C) -> Result<Self, FrameError> {
        ids.validate()?;
        Ok(Self {
            rng,
            clock,
            ids,
            last_timestamp_us: 0,
        })
    }

    pub fn ids(&self) -> &IdSelection {
        &self.ids
    }

    pub fn next_frame(&mut self) -> CanFrame {
        let id = self.ids.pick(&mut self.rng);
        let dlc = self.rng.gen_range(MIN_DLC..=MAX_DLC);
        let mut data = [0u8; PAYLOAD_SIZE];
        self.rng.fill(&mut data[..dlc as usize]);
        // Never step backwards, even if the wall clock does.
        let timestamp_us = self.clock.now_us().max(self.last_timestamp_us);
        self.last_timestamp_us = timestamp_us;
        CanFrame::from_parts(id, dlc, data, timestamp_us)
    }
}

impl<R: Rng, C: Clock> Iterator for FrameGenerator<R, C> {
    type Item = CanFrame;

    fn next(&mut self) -> Option<Self::Item> {
        Some(self.next_frame())
    }
}
