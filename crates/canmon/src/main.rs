use std::net::TcpStream;
use std::process;

use canframe::{CanFrame, FrameReader, SignalDecoder};
use clap::Parser;
use tracing::{debug, error, info, warn};
use tracing_subscriber::EnvFilter;

/// Print and decode frames streamed by a CAN mock server.
#[derive(Parser, Debug)]
#[command(version, about, long_about = None)]
struct Args {
    /// Server address
    #[arg(short, long, default_value = "127.0.0.1:8888")]
    addr: String,

    /// Stop after this many frames
    #[arg(short, long)]
    count: Option<usize>,
}

fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt().with_env_filter(filter).init();
}

fn process_frame(decoder: &SignalDecoder, frame: &CanFrame) {
    match decoder.decode(frame) {
        Some(signal) => match signal.value {
            Some(value) => info!("{}: {:.2} {}", signal.name, value, signal.unit),
            None => warn!(
                "Invalid {} signal! ID: {:03x}, DLC: {}",
                signal.name,
                frame.id,
                frame.dlc()
            ),
        },
        None => debug!("Unrecognized frame: ID={:03x}", frame.id),
    }
}

fn main() {
    let args = Args::parse();
    init_tracing();

    let stream = match TcpStream::connect(&args.addr) {
        Ok(stream) => stream,
        Err(e) => {
            error!("Error connecting to '{}': {}", args.addr, e);
            process::exit(1);
        }
    };
    info!("Connected to {}", args.addr);

    println!("timestamp (μs) | id | [dlc] data");
    println!("--------------------------------");

    let decoder = SignalDecoder::default();
    let frames = FrameReader::new(stream).take(args.count.unwrap_or(usize::MAX));
    for frame in frames {
        match frame {
            Ok(frame) => {
                println!("{}", frame);
                process_frame(&decoder, &frame);
            }
            Err(e) => {
                error!("Error reading frame: {}", e);
                process::exit(1);
            }
        }
    }
}
