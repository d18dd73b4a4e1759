use crate::frame::CanFrame;

pub const SPEED_ID: u32 = 0x100;
pub const RPM_ID: u32 = 0x101;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ByteOrder {
    BigEndian,
    LittleEndian,
}

/// A byte-aligned unsigned signal: `value = raw * factor + offset`.
#[derive(Clone, Debug)]
pub struct Signal {
    pub name: String,
    pub start_byte: usize,
    pub byte_len: usize,
    pub byte_order: ByteOrder,
    pub factor: f64,
    pub offset: f64,
    pub unit: String,
}

impl Signal {
    pub fn vehicle_speed() -> Self {
        Self {
            name: "VehicleSpeed".to_string(),
            start_byte: 0,
            byte_len: 2,
            byte_order: ByteOrder::BigEndian,
            factor: 0.001,
            offset: 0.0,
            unit: "km/h".to_string(),
        }
    }

    pub fn engine_rpm() -> Self {
        Self {
            name: "EngineRPM".to_string(),
            start_byte: 2,
            byte_len: 2,
            byte_order: ByteOrder::LittleEndian,
            factor: 0.25,
            offset: 0.0,
            unit: "RPM".to_string(),
        }
    }

    /// Raw value, or `None` when the frame's payload does not cover the signal.
    pub fn raw(&self, frame: &CanFrame) -> Option<u64> {
        let end = self.start_byte + self.byte_len;
        let bytes = frame.payload().get(self.start_byte..end)?;
        let raw = match self.byte_order {
            ByteOrder::BigEndian => bytes.iter().fold(0u64, |acc, &b| (acc << 8) | b as u64),
            ByteOrder::LittleEndian => bytes.iter().rev().fold(0u64, |acc, &b| (acc << 8) | b as u64),
        };
        Some(raw)
    }

    pub fn decode(&self, frame: &CanFrame) -> DecodedSignal {
        DecodedSignal {
            name: self.name.clone(),
            value: self
                .raw(frame)
                .map(|raw| raw as f64 * self.factor + self.offset),
            unit: self.unit.clone(),
            timestamp_us: frame.timestamp_us,
        }
    }
}

#[derive(Clone, Debug, PartialEq)]
pub struct DecodedSignal {
    pub name: String,
    /// `None` when the frame is too short to carry the signal.
    pub value: Option<f64>,
    pub unit: String,
    pub timestamp_us: u64,
}

/// Maps frame identifiers to the signal each one carries.
#[derive(Clone, Debug)]
pub struct SignalDecoder {
    signals: Vec<(u32, Signal)>,
}

impl Default for SignalDecoder {
    fn default() -> Self {
        Self {
            signals: vec![
                (SPEED_ID, Signal::vehicle_speed()),
                (RPM_ID, Signal::engine_rpm()),
            ],
        }
    }
}

impl SignalDecoder {
    pub fn new(signals: Vec<(u32, Signal)>) -> Self {
        Self { signals }
    }

    pub fn signal(&self, id: u32) -> Option<&Signal> {
        self.signals
            .iter()
            .find(|(signal_id, _)| *signal_id == id)
            .map(|(_, signal)| signal)
    }

    /// `None` for identifiers no signal is registered for.
    pub fn decode(&self, frame: &CanFrame) -> Option<DecodedSignal> {
        self.signal(frame.id).map(|signal| signal.decode(frame))
    }
}
