//! The [`SpiDevice`] handle and its port backends.

mod ioctl;
mod node;
mod traits;

#[cfg(test)]
mod tests;

use std::fmt::Write as _;

use bytes::{Bytes, BytesMut};
use tracing::{debug, info, warn};

use crate::error::{Error, Result};

pub use node::SpidevNode;
pub use traits::SpiPort;

/// Longest supported transfer in bytes.
pub const MAX_TRANSFER_LENGTH: usize = 256;

/// Longest `/dev/spidevB.D` path the kernel hands out, NUL included.
const MAX_DEVICE_PATH: usize = 16;

/// Resolved clocking for one transfer segment.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TransferParams {
    pub speed_hz: u32,
    pub bits_per_word: u8,
    pub delay_usecs: u16,
}

/// Per-call overrides for a transfer.
///
/// Speed and word size fall back to whatever the node reported when it was
/// opened; the inter-segment delay defaults to none.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct TransferOptions {
    pub speed_hz: Option<u32>,
    pub bits_per_word: Option<u8>,
    pub delay_usecs: u16,
}

impl TransferOptions {
    pub fn with_speed_hz(mut self, speed_hz: u32) -> Self {
        self.speed_hz = Some(speed_hz);
        self
    }

    pub fn with_bits_per_word(mut self, bits_per_word: u8) -> Self {
        self.bits_per_word = Some(bits_per_word);
        self
    }

    pub fn with_delay_usecs(mut self, delay_usecs: u16) -> Self {
        self.delay_usecs = delay_usecs;
        self
    }
}

/// Format the device node path for a bus/chip-select pair.
///
/// The pair is rejected when the result would not fit a kernel node name.
pub fn device_path(bus: u32, device: u32) -> Result<String> {
    let path = format!("/dev/spidev{bus}.{device}");
    if path.len() >= MAX_DEVICE_PATH {
        return Err(Error::PathOverflow { bus, device });
    }
    Ok(path)
}

/// Parse a textual byte list, decimal or `0x`-prefixed hex, separated by
/// whitespace or commas.
///
/// Any element outside 0-255 is rejected before it can reach the bus.
pub fn parse_tx_bytes(input: &str) -> Result<Vec<u8>> {
    let mut out = Vec::new();
    let tokens = input
        .split(|c: char| c.is_whitespace() || c == ',')
        .filter(|t| !t.is_empty());
    for (index, token) in tokens.enumerate() {
        let value = match token.strip_prefix("0x").or_else(|| token.strip_prefix("0X")) {
            Some(hex) => i64::from_str_radix(hex, 16),
            None => token.parse::<i64>(),
        };
        match value {
            Ok(v) if (0..=255).contains(&v) => out.push(v as u8),
            _ => {
                return Err(Error::Value {
                    index,
                    token: token.to_string(),
                })
            }
        }
    }
    Ok(out)
}

/// Render bytes as an uppercase hex line, e.g. `9F 00 FF`.
pub fn hex_line(bytes: &[u8]) -> String {
    let mut out = String::with_capacity(bytes.len() * 3);
    for (i, byte) in bytes.iter().enumerate() {
        if i > 0 {
            out.push(' ');
        }
        let _ = write!(out, "{byte:02X}");
    }
    out
}

/// A handle on at most one spidev node.
///
/// The handle starts unopened, caches the node's mode, word size and clock
/// ceiling while open, and zeroes them again on close. All operations take
/// `&mut self`; sharing a handle across threads means wrapping it in a mutex
/// on the caller's side.
pub struct SpiDevice<P: SpiPort = SpidevNode> {
    port: Option<P>,
    mode: u8,
    bits_per_word: u8,
    max_speed_hz: u32,
}

impl<P: SpiPort> SpiDevice<P> {
    /// A handle with no node attached.
    pub fn unopened() -> SpiDevice<P> {
        SpiDevice {
            port: None,
            mode: 0,
            bits_per_word: 0,
            max_speed_hz: 0,
        }
    }

    pub fn is_open(&self) -> bool {
        self.port.is_some()
    }

    /// SPI mode flags reported by the node at open time.
    pub fn mode(&self) -> u8 {
        self.mode
    }

    /// Word size reported by the node at open time.
    pub fn bits_per_word(&self) -> u8 {
        self.bits_per_word
    }

    /// Clock ceiling reported by the node at open time.
    pub fn max_speed_hz(&self) -> u32 {
        self.max_speed_hz
    }

    /// Take ownership of an already open port and read its settings back.
    ///
    /// A port that fails any readback is shut down again before the error is
    /// returned, so the handle never keeps a half-initialized descriptor. An
    /// already attached port is released first.
    pub fn attach(&mut self, mut port: P) -> Result<()> {
        self.release();
        match Self::read_back(&mut port) {
            Ok((mode, bits_per_word, max_speed_hz)) => {
                self.mode = mode;
                self.bits_per_word = bits_per_word;
                self.max_speed_hz = max_speed_hz;
                self.port = Some(port);
                Ok(())
            }
            Err(e) => {
                if let Err(close_err) = port.shutdown() {
                    warn!(error = %close_err, "failed to release port after readback error");
                }
                Err(e)
            }
        }
    }

    fn read_back(port: &mut P) -> Result<(u8, u8, u32)> {
        let mode = port.query_mode().map_err(|source| Error::Query {
            setting: "mode",
            source,
        })?;
        let bits = port.query_bits_per_word().map_err(|source| Error::Query {
            setting: "bits per word",
            source,
        })?;
        let speed = port.query_max_speed_hz().map_err(|source| Error::Query {
            setting: "max speed hz",
            source,
        })?;
        Ok((mode, bits, speed))
    }

    /// Exchange `tx` for an equal number of received bytes, using the
    /// clocking read back at open time.
    pub fn transfer(&mut self, tx: &[u8]) -> Result<Bytes> {
        self.transfer_with(tx, 0, TransferOptions::default())
    }

    /// Exchange bytes with the peripheral in one full-duplex segment.
    ///
    /// The segment covers `max(tx.len(), min_response_len)` bytes; when the
    /// response is longer than `tx`, the remainder is clocked out as zeros so
    /// a peripheral can be read by sending dummy bytes. The returned buffer
    /// always spans the whole segment, in wire order.
    pub fn transfer_with(
        &mut self,
        tx: &[u8],
        min_response_len: usize,
        options: TransferOptions,
    ) -> Result<Bytes> {
        let transfer_len = tx.len().max(min_response_len);
        let port = self.port.as_mut().ok_or(Error::NotOpen)?;
        if transfer_len > MAX_TRANSFER_LENGTH {
            return Err(Error::BufferTooLarge {
                requested: transfer_len,
                max: MAX_TRANSFER_LENGTH,
            });
        }
        // A zero-length message would clock nothing and look like a failed
        // transfer to the ret < 1 check.
        if transfer_len == 0 {
            return Ok(Bytes::new());
        }

        let params = TransferParams {
            speed_hz: options.speed_hz.unwrap_or(self.max_speed_hz),
            bits_per_word: options.bits_per_word.unwrap_or(self.bits_per_word),
            delay_usecs: options.delay_usecs,
        };

        let mut tx_buf = BytesMut::zeroed(transfer_len);
        tx_buf[..tx.len()].copy_from_slice(tx);
        let mut rx_buf = BytesMut::zeroed(transfer_len);

        debug!(len = transfer_len, tx = %hex_line(&tx_buf), "spi transfer");
        port.transfer(&tx_buf, &mut rx_buf, params)
            .map_err(Error::Transfer)?;
        debug!(rx = %hex_line(&rx_buf), "spi transfer complete");

        Ok(rx_buf.freeze())
    }

    /// Detach and close the node.
    ///
    /// In-memory state is reset even when the close syscall fails, and
    /// closing an unopened handle is a no-op.
    pub fn close(&mut self) -> Result<()> {
        let res = match self.port.take() {
            Some(port) => port.shutdown().map_err(Error::Io),
            None => Ok(()),
        };
        self.mode = 0;
        self.bits_per_word = 0;
        self.max_speed_hz = 0;
        res
    }

    // Best-effort teardown used when a new port displaces an old one.
    fn release(&mut self) {
        if let Some(port) = self.port.take() {
            if let Err(e) = port.shutdown() {
                warn!(error = %e, "failed to release previous port");
            }
        }
        self.mode = 0;
        self.bits_per_word = 0;
        self.max_speed_hz = 0;
    }
}

impl<P: SpiPort> Default for SpiDevice<P> {
    fn default() -> Self {
        Self::unopened()
    }
}

impl SpiDevice<SpidevNode> {
    /// Open `/dev/spidev{bus}.{device}` and return a ready handle.
    pub fn connect(bus: u32, device: u32) -> Result<SpiDevice<SpidevNode>> {
        let mut spi = SpiDevice::unopened();
        spi.open(bus, device)?;
        Ok(spi)
    }

    /// Open `/dev/spidev{bus}.{device}` on this handle.
    ///
    /// An already open handle releases its previous node first.
    pub fn open(&mut self, bus: u32, device: u32) -> Result<()> {
        let path = device_path(bus, device)?;
        let node = SpidevNode::open(&path).map_err(|source| Error::Open {
            path: path.clone(),
            source,
        })?;
        self.attach(node)?;
        info!(
            %path,
            mode = self.mode,
            bits_per_word = self.bits_per_word,
            max_speed_hz = self.max_speed_hz,
            "spidev node ready"
        );
        Ok(())
    }
}
