#![forbid(unsafe_code)]

mod config;
mod dump;
mod hw;

use std::io::{self, Write};

use anyhow::{Context, Result};
use clap::Parser;
use pcie_tlp::RequesterId;
use tracing_subscriber::EnvFilter;

use config::{Args, Command, HexBytes};
use hw::CliBridge;

fn main() -> Result<()> {
    let args = Args::parse();

    let filter = match &args.log_level {
        Some(level) => EnvFilter::try_new(level).context("invalid --log-level filter")?,
        None => EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")),
    };
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(io::stderr)
        .init();

    let bridge = hw::open(&args.hw, args.bridge_config()).context("failed to open bridge")?;
    let stdout = io::stdout();
    run(&bridge, args.command, &mut stdout.lock())
}

fn run(bridge: &CliBridge, command: Command, out: &mut impl Write) -> Result<()> {
    match command {
        Command::DeviceId => {
            let raw = bridge.device_id();
            match RequesterId::from_status(raw) {
                Some(id) => writeln!(out, "0x{raw:08x} (requester {id})")?,
                None => writeln!(out, "0x{raw:08x} (not connected)")?,
            }
        }
        Command::Reset => {
            bridge.reset().context("channel reset failed")?;
            writeln!(out, "reset all channels")?;
        }
        Command::Read { address, len, raw } => {
            let mut buf = vec![0; len];
            bridge
                .read_bytes(address, &mut buf)
                .with_context(|| format!("read of {len} bytes at 0x{address:x} failed"))?;
            if raw {
                out.write_all(&buf)?;
            } else {
                out.write_all(dump::hexdump(address, &buf).as_bytes())?;
            }
        }
        Command::Write {
            address,
            data: HexBytes(data),
        } => {
            bridge
                .write_bytes(address, &data)
                .with_context(|| format!("write of {} bytes at 0x{address:x} failed", data.len()))?;
            writeln!(out, "wrote {} bytes at 0x{address:x}", data.len())?;
        }
        Command::ConfigRead { offset } => {
            let value = bridge
                .config_read(offset)
                .with_context(|| format!("config read at 0x{offset:x} failed"))?;
            writeln!(out, "0x{value:08x}")?;
        }
        Command::TlpSend { words } => {
            bridge.send_raw(&words).context("raw send failed")?;
            writeln!(out, "sent {} words", words.len())?;
        }
        Command::TlpRecv => {
            let words = bridge.receive_raw().context("raw receive failed")?;
            out.write_all(dump::describe_tlp(&words).as_bytes())?;
        }
    }
    out.flush()?;
    Ok(())
}
