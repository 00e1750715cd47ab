use std::io;

use mockall::automock;

use super::TransferParams;

/// Raw access to one spidev node.
///
/// [`SpiDevice`](super::SpiDevice) drives everything through this trait so
/// the open/close/transfer logic can run against a mock port in tests.
#[automock]
pub trait SpiPort {
    /// Read back the current SPI mode flags.
    fn query_mode(&mut self) -> io::Result<u8>;

    /// Read back the current word size in bits.
    fn query_bits_per_word(&mut self) -> io::Result<u8>;

    /// Read back the current clock ceiling in Hz.
    fn query_max_speed_hz(&mut self) -> io::Result<u32>;

    /// Clock `tx` out while filling `rx` in one full-duplex segment.
    ///
    /// Both slices have the same length.
    fn transfer(&mut self, tx: &[u8], rx: &mut [u8], params: TransferParams) -> io::Result<()>;

    /// Close the underlying descriptor, reporting the syscall result.
    fn shutdown(self) -> io::Result<()>;
}
