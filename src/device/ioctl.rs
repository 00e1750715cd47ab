//! spidev ioctl numbers and the transfer struct layout.
//!
//! Everything here mirrors `include/uapi/linux/spi/spidev.h`.

use std::mem::size_of;

use nix::ioctl_read;

const SPI_IOC_MAGIC: u8 = b'k';

const SPI_IOC_TYPE_MODE: u8 = 1;
const SPI_IOC_TYPE_BITS_PER_WORD: u8 = 3;
const SPI_IOC_TYPE_MAX_SPEED_HZ: u8 = 4;

ioctl_read!(spi_ioc_rd_mode, SPI_IOC_MAGIC, SPI_IOC_TYPE_MODE, u8);
ioctl_read!(
    spi_ioc_rd_bits_per_word,
    SPI_IOC_MAGIC,
    SPI_IOC_TYPE_BITS_PER_WORD,
    u8
);
ioctl_read!(
    spi_ioc_rd_max_speed_hz,
    SPI_IOC_MAGIC,
    SPI_IOC_TYPE_MAX_SPEED_HZ,
    u32
);

/// One segment of an `SPI_IOC_MESSAGE` ioctl, matching the kernel's
/// `struct spi_ioc_transfer` byte for byte.
#[repr(C)]
#[derive(Debug, Default, Clone)]
pub struct SpiIocTransfer {
    pub tx_buf: u64,
    pub rx_buf: u64,
    pub len: u32,
    pub speed_hz: u32,
    pub delay_usecs: u16,
    pub bits_per_word: u8,
    pub cs_change: u8,
    pub tx_nbits: u8,
    pub rx_nbits: u8,
    pub word_delay_usecs: u8,
    pub pad: u8,
}

/// `SPI_IOC_MESSAGE(n)`, i.e. `_IOW('k', 0, char[n * sizeof(spi_ioc_transfer)])`.
///
/// The request number encodes the message size, so it cannot be generated
/// with the fixed-size `ioctl_write_ptr!` macro.
pub fn spi_ioc_message(n: u8) -> libc::c_ulong {
    const IOC_WRITE: u32 = 1;
    let size = (n as usize * size_of::<SpiIocTransfer>()) as u32;
    ((IOC_WRITE << 30) | (size << 16) | ((SPI_IOC_MAGIC as u32) << 8)) as libc::c_ulong
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn it_keeps_the_transfer_struct_at_the_kernel_size() {
        assert_eq!(size_of::<SpiIocTransfer>(), 32);
    }

    #[test]
    fn it_computes_the_message_ioctl_number() {
        assert_eq!(spi_ioc_message(1), 0x4020_6b00);
        assert_eq!(spi_ioc_message(2), 0x4040_6b00);
    }
}
