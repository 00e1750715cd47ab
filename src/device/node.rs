use std::fs::{File, OpenOptions};
use std::io;
use std::os::unix::io::{AsRawFd, IntoRawFd};

use tracing::{debug, trace};

use super::ioctl::{self, SpiIocTransfer};
use super::traits::SpiPort;
use super::TransferParams;

/// An open `/dev/spidevB.D` character device.
///
/// Dropping the node closes the descriptor; go through
/// [`SpiPort::shutdown`] to observe the close result instead.
#[derive(Debug)]
pub struct SpidevNode {
    file: File,
}

impl SpidevNode {
    /// Open a spidev node read-write.
    ///
    /// The nodes are usually root-owned, so this tends to require elevated
    /// privileges or a udev rule granting the caller access.
    pub fn open(path: &str) -> io::Result<SpidevNode> {
        debug!(%path, "opening spidev node");
        let file = OpenOptions::new().read(true).write(true).open(path)?;
        Ok(SpidevNode { file })
    }
}

impl SpiPort for SpidevNode {
    fn query_mode(&mut self) -> io::Result<u8> {
        let mut mode = 0u8;
        unsafe { ioctl::spi_ioc_rd_mode(self.file.as_raw_fd(), &mut mode) }
            .map_err(|e| io::Error::from_raw_os_error(e as i32))?;
        Ok(mode)
    }

    fn query_bits_per_word(&mut self) -> io::Result<u8> {
        let mut bits = 0u8;
        unsafe { ioctl::spi_ioc_rd_bits_per_word(self.file.as_raw_fd(), &mut bits) }
            .map_err(|e| io::Error::from_raw_os_error(e as i32))?;
        Ok(bits)
    }

    fn query_max_speed_hz(&mut self) -> io::Result<u32> {
        let mut speed = 0u32;
        unsafe { ioctl::spi_ioc_rd_max_speed_hz(self.file.as_raw_fd(), &mut speed) }
            .map_err(|e| io::Error::from_raw_os_error(e as i32))?;
        Ok(speed)
    }

    fn transfer(&mut self, tx: &[u8], rx: &mut [u8], params: TransferParams) -> io::Result<()> {
        let segment = SpiIocTransfer {
            tx_buf: tx.as_ptr() as u64,
            rx_buf: rx.as_mut_ptr() as u64,
            len: tx.len() as u32,
            speed_hz: params.speed_hz,
            delay_usecs: params.delay_usecs,
            bits_per_word: params.bits_per_word,
            ..Default::default()
        };
        trace!(
            len = segment.len,
            speed_hz = segment.speed_hz,
            bits_per_word = segment.bits_per_word,
            delay_usecs = segment.delay_usecs,
            "issuing transfer ioctl"
        );

        let ret =
            unsafe { libc::ioctl(self.file.as_raw_fd(), ioctl::spi_ioc_message(1), &segment) };
        // The kernel reports the number of bytes clocked; below one means the
        // message never moved.
        if ret < 1 {
            return Err(io::Error::last_os_error());
        }
        Ok(())
    }

    fn shutdown(self) -> io::Result<()> {
        let fd = self.file.into_raw_fd();
        debug!(fd, "closing spidev node");
        if unsafe { libc::close(fd) } == -1 {
            return Err(io::Error::last_os_error());
        }
        Ok(())
    }
}
