use std::net::{IpAddr, Ipv4Addr, SocketAddr};
use std::time::Duration;

use canframe::IdSelection;
use clap::Parser;

use crate::error::ServerError;

pub const DEFAULT_PORT: u16 = 8888;
pub const DEFAULT_INTERVAL: Duration = Duration::from_millis(50);
pub const DEFAULT_PROGRESS_EVERY: u64 = 10;

#[derive(Debug, Clone)]
pub struct Config {
    pub addr: SocketAddr,
    /// Pause after each frame; the actual period also includes generation and write time.
    pub interval: Duration,
    pub ids: IdSelection,
    /// Log a progress line every this many frames.
    pub progress_every: u64,
    /// Stop after this many frames instead of running until disconnect.
    pub max_frames: Option<u64>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            addr: SocketAddr::new(IpAddr::V4(Ipv4Addr::UNSPECIFIED), DEFAULT_PORT),
            interval: DEFAULT_INTERVAL,
            ids: IdSelection::default(),
            progress_every: DEFAULT_PROGRESS_EVERY,
            max_frames: None,
        }
    }
}

impl Config {
    pub fn validate(&self) -> Result<(), ServerError> {
        if self.progress_every == 0 {
            return Err(ServerError::Config("progress interval must be at least 1".to_string()));
        }
        if self.max_frames == Some(0) {
            return Err(ServerError::Config("frame limit must be at least 1".to_string()));
        }
        self.ids.validate()?;
        Ok(())
    }
}

/// Stream random CAN-shaped frames to one TCP client.
#[derive(Parser, Debug)]
#[command(version, about, long_about = None)]
pub struct Args {
    /// Address to listen on
    #[arg(long, default_value_t = IpAddr::V4(Ipv4Addr::UNSPECIFIED))]
    pub host: IpAddr,

    /// TCP port to listen on
    #[arg(short, long, default_value_t = DEFAULT_PORT)]
    pub port: u16,

    /// Pause between frames, in milliseconds
    #[arg(short, long, default_value_t = 50)]
    pub interval_ms: u64,

    /// Identifier to choose from; repeat for several (hex with 0x prefix or decimal)
    #[arg(long = "id", value_parser = parse_id, conflicts_with_all = ["id_min", "id_max"])]
    pub ids: Vec<u32>,

    /// Lowest identifier of a random range
    #[arg(long, value_parser = parse_id, requires = "id_max")]
    pub id_min: Option<u32>,

    /// Highest identifier of a random range
    #[arg(long, value_parser = parse_id, requires = "id_min")]
    pub id_max: Option<u32>,

    /// Log progress every N frames
    #[arg(long, default_value_t = DEFAULT_PROGRESS_EVERY)]
    pub progress_every: u64,

    /// Stop after sending N frames
    #[arg(short = 'n', long)]
    pub max_frames: Option<u64>,
}

impl TryFrom<Args> for Config {
    type Error = ServerError;

    fn try_from(args: Args) -> Result<Self, Self::Error> {
        let ids = match (args.id_min, args.id_max) {
            (Some(min), Some(max)) => IdSelection::Range { min, max },
            _ if !args.ids.is_empty() => IdSelection::Choice(args.ids),
            _ => IdSelection::default(),
        };
        let config = Config {
            addr: SocketAddr::new(args.host, args.port),
            interval: Duration::from_millis(args.interval_ms),
            ids,
            progress_every: args.progress_every,
            max_frames: args.max_frames,
        };
        config.validate()?;
        Ok(config)
    }
}

fn parse_id(s: &str) -> Result<u32, String> {
    let parsed = match s.strip_prefix("0x").or_else(|| s.strip_prefix("0X")) {
        Some(hex) => u32::from_str_radix(hex, 16),
        None => s.parse::<u32>(),
    };
    parsed.map_err(|e| format!("invalid identifier '{}': {}", s, e))
}
