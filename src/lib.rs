//! Talk to SPI peripherals through the Linux spidev character devices.
//!
//! The kernel exposes one chip select per `/dev/spidevB.D` node and owns all
//! electrical and timing semantics behind its ioctl surface. [`SpiDevice`]
//! opens a node, reads the configured mode, word size and clock ceiling
//! back, and runs zero-padded full-duplex transfers against it.
//!
//! Nodes are opened read-write and are usually root-owned, so callers
//! typically need elevated privileges or a udev rule.
//!
//! ```no_run
//! use spihost::SpiDevice;
//!
//! let mut spi = SpiDevice::connect(0, 0)?;
//! // Read a JEDEC id: one opcode byte, three dummy bytes clocked back.
//! let id = spi.transfer(&[0x9F, 0x00, 0x00, 0x00])?;
//! spi.close()?;
//! # Ok::<(), spihost::Error>(())
//! ```

pub mod device;
pub mod error;
pub mod logging;
pub mod settings;

pub use device::{
    SpiDevice, SpiPort, SpidevNode, TransferOptions, TransferParams, MAX_TRANSFER_LENGTH,
};
pub use error::{Error, Result};
