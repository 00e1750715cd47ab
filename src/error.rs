use std::io;

use thiserror::Error;

/// Everything a [`SpiDevice`](crate::device::SpiDevice) call can fail with.
///
/// Each failure is a per-call value; nothing is stashed in module state.
#[derive(Debug, Error)]
pub enum Error {
    /// The formatted `/dev/spidevB.D` path would exceed the kernel's node
    /// name length.
    #[error("bus {bus} and device {device} do not form a valid spidev path")]
    PathOverflow { bus: u32, device: u32 },

    /// The device node could not be opened read-write.
    #[error("can't open device {path}: {source}")]
    Open {
        path: String,
        #[source]
        source: io::Error,
    },

    /// A settings readback on a freshly opened node failed.
    #[error("can't get spi {setting}: {source}")]
    Query {
        setting: &'static str,
        #[source]
        source: io::Error,
    },

    /// The close syscall itself failed.
    #[error(transparent)]
    Io(#[from] io::Error),

    /// A transmit element at the textual boundary is not an 8-bit value.
    #[error("transmit byte {index} ({token:?}) is not valid 8-bit data")]
    Value { index: usize, token: String },

    /// The transfer would exceed the supported length.
    #[error("transfer of {requested} bytes exceeds the {max} byte limit")]
    BufferTooLarge { requested: usize, max: usize },

    /// The transfer ioctl failed or clocked nothing out.
    #[error("can't send spi message: {0}")]
    Transfer(#[source] io::Error),

    /// The operation needs an open device.
    #[error("spi device is not open")]
    NotOpen,
}

pub type Result<T> = std::result::Result<T, Error>;
