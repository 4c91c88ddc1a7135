use std::path::PathBuf;
use std::time::Duration;

use clap::{Parser, Subcommand};
use tlp_bridge::{BridgeConfig, DmaConfig};

#[derive(Debug, Parser)]
#[command(
    name = "tlpctl",
    version,
    about = "Access a PCI Express endpoint's memory and configuration space through the AXI DMA TLP bridge"
)]
pub struct Args {
    #[command(flatten)]
    pub hw: HardwareArgs,

    /// Deadline for a single DMA transfer, in milliseconds.
    ///
    /// Environment variable: `TLPCTL_TIMEOUT_MS`.
    #[arg(long, env = "TLPCTL_TIMEOUT_MS", default_value_t = 1000)]
    pub timeout_ms: u64,

    /// Give up on a channel reset after this many milliseconds. Unbounded when unset.
    ///
    /// Environment variable: `TLPCTL_RESET_TIMEOUT_MS`.
    #[arg(long, env = "TLPCTL_RESET_TIMEOUT_MS")]
    pub reset_timeout_ms: Option<u64>,

    /// Log filter (tracing-subscriber EnvFilter syntax).
    ///
    /// Environment variable: `TLPCTL_LOG`.
    #[arg(long, env = "TLPCTL_LOG")]
    pub log_level: Option<String>,

    #[command(subcommand)]
    pub command: Command,
}

/// Where the bridge hardware lives.
#[derive(Debug, clap::Args)]
pub struct HardwareArgs {
    /// Run against the built-in simulated bridge and endpoint instead of real hardware.
    #[arg(long)]
    pub simulate: bool,

    /// Physical memory device to map registers and the DMA buffer from.
    ///
    /// Environment variable: `TLPCTL_MEM_DEV`.
    #[arg(long, env = "TLPCTL_MEM_DEV", default_value = "/dev/mem")]
    pub mem_dev: PathBuf,

    /// Physical base of the AXI DMA engine carrying memory TLPs.
    ///
    /// Environment variable: `TLPCTL_DMA0_BASE`.
    #[arg(long, env = "TLPCTL_DMA0_BASE", value_parser = parse_u64, required_unless_present = "simulate")]
    pub dma0_base: Option<u64>,

    /// Physical base of the AXI DMA engine wired to the configuration management port.
    ///
    /// Environment variable: `TLPCTL_DMA1_BASE`.
    #[arg(long, env = "TLPCTL_DMA1_BASE", value_parser = parse_u64, required_unless_present = "simulate")]
    pub dma1_base: Option<u64>,

    /// Physical address of the identity (requester ID) register.
    ///
    /// Environment variable: `TLPCTL_GPIO_BASE`.
    #[arg(long, env = "TLPCTL_GPIO_BASE", value_parser = parse_u64, required_unless_present = "simulate")]
    pub gpio_base: Option<u64>,

    /// Physical address of a DMA-coherent buffer reserved for the bridge.
    ///
    /// Environment variable: `TLPCTL_DMA_BUFFER`.
    #[arg(long, env = "TLPCTL_DMA_BUFFER", value_parser = parse_u64, required_unless_present = "simulate")]
    pub dma_buffer: Option<u64>,

    /// Length of the DMA buffer in bytes; at least two pages.
    ///
    /// Environment variable: `TLPCTL_DMA_BUFFER_LEN`.
    #[arg(long, env = "TLPCTL_DMA_BUFFER_LEN", value_parser = parse_usize, default_value = "0x2000")]
    pub dma_buffer_len: usize,
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Print the identity register and the requester ID it decodes to.
    DeviceId,
    /// Reset all four DMA channels.
    Reset,
    /// Read endpoint memory and hex-dump it.
    Read {
        #[arg(value_parser = parse_u64)]
        address: u64,
        #[arg(value_parser = parse_usize)]
        len: usize,
        /// Write the bytes to stdout unformatted.
        #[arg(long)]
        raw: bool,
    },
    /// Write bytes, given as a hex string, to endpoint memory.
    Write {
        #[arg(value_parser = parse_u64)]
        address: u64,
        #[arg(value_parser = parse_hex_bytes)]
        data: HexBytes,
    },
    /// Read one dword of the endpoint's configuration space.
    ConfigRead {
        #[arg(value_parser = parse_u32)]
        offset: u32,
    },
    /// Send raw TLP words on the memory channel pair.
    TlpSend {
        #[arg(value_parser = parse_u32, required = true)]
        words: Vec<u32>,
    },
    /// Receive one raw TLP from the memory channel pair and decode it if it is a completion.
    TlpRecv,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HexBytes(pub Vec<u8>);

impl Args {
    pub fn bridge_config(&self) -> BridgeConfig {
        BridgeConfig {
            dma: DmaConfig {
                timeout: Duration::from_millis(self.timeout_ms),
                reset_timeout: self.reset_timeout_ms.map(Duration::from_millis),
            },
            ..BridgeConfig::default()
        }
    }
}

pub fn parse_u64(s: &str) -> Result<u64, String> {
    let s = s.trim();
    let parsed = match s.strip_prefix("0x").or_else(|| s.strip_prefix("0X")) {
        Some(hex) => u64::from_str_radix(&hex.replace('_', ""), 16),
        None => s.replace('_', "").parse(),
    };
    parsed.map_err(|err| format!("invalid number `{s}`: {err}"))
}

pub fn parse_u32(s: &str) -> Result<u32, String> {
    let value = parse_u64(s)?;
    u32::try_from(value).map_err(|_| format!("`{s}` does not fit in 32 bits"))
}

pub fn parse_usize(s: &str) -> Result<usize, String> {
    let value = parse_u64(s)?;
    usize::try_from(value).map_err(|_| format!("`{s}` is too large"))
}

pub fn parse_hex_bytes(s: &str) -> Result<HexBytes, String> {
    let digits: String = s
        .trim()
        .trim_start_matches("0x")
        .chars()
        .filter(|c| !c.is_ascii_whitespace() && *c != ':' && *c != '_')
        .collect();
    if !digits.chars().all(|c| c.is_ascii_hexdigit()) {
        return Err(format!("`{s}` contains a non-hex digit"));
    }
    if digits.is_empty() || digits.len() % 2 != 0 {
        return Err(format!("`{s}` is not a whole number of hex bytes"));
    }
    let bytes = (0..digits.len())
        .step_by(2)
        .filter_map(|i| u8::from_str_radix(&digits[i..i + 2], 16).ok())
        .collect();
    Ok(HexBytes(bytes))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn numbers_accept_hex_and_decimal() {
        assert_eq!(parse_u64("0x1000"), Ok(0x1000));
        assert_eq!(parse_u64("0x8000_0000"), Ok(0x8000_0000));
        assert_eq!(parse_u64("4096"), Ok(4096));
        assert!(parse_u64("0xg").is_err());
        assert!(parse_u32("0x1_0000_0000").is_err());
    }

    #[test]
    fn hex_bytes() {
        assert_eq!(
            parse_hex_bytes("deadBEEF"),
            Ok(HexBytes(vec![0xde, 0xad, 0xbe, 0xef]))
        );
        assert_eq!(parse_hex_bytes("01:02 03"), Ok(HexBytes(vec![1, 2, 3])));
        assert!(parse_hex_bytes("abc").is_err());
        assert!(parse_hex_bytes("zz").is_err());
        assert!(parse_hex_bytes("").is_err());
    }

    #[test]
    fn hardware_addresses_are_required_unless_simulating() {
        assert!(Args::try_parse_from(["tlpctl", "device-id"]).is_err());

        let args = Args::try_parse_from(["tlpctl", "--simulate", "--timeout-ms", "5", "reset"])
            .unwrap();
        assert!(args.hw.simulate);
        assert_eq!(args.bridge_config().dma.timeout, Duration::from_millis(5));
        assert_eq!(args.bridge_config().dma.reset_timeout, None);
        assert!(matches!(args.command, Command::Reset));

        let args = Args::try_parse_from([
            "tlpctl",
            "--dma0-base",
            "0x40400000",
            "--dma1-base",
            "0x40410000",
            "--gpio-base",
            "0x41200000",
            "--dma-buffer",
            "0x3f000000",
            "write",
            "0x10",
            "a1b2c3d4",
        ])
        .unwrap();
        assert_eq!(args.hw.dma0_base, Some(0x4040_0000));
        assert_eq!(args.hw.dma_buffer_len, 0x2000);
        assert!(matches!(
            args.command,
            Command::Write { address: 0x10, data: HexBytes(ref bytes) } if bytes == &[0xa1, 0xb2, 0xc3, 0xd4]
        ));
    }
}
