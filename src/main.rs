use anyhow::{Context, Result};
use argh::FromArgs;
use spihost::device::{hex_line, parse_tx_bytes, SpiDevice, TransferOptions};
use spihost::logging::setup_logging;
use spihost::settings::Settings;
use tracing::debug;

/// Exchange bytes with a peripheral behind a Linux spidev node and print
/// what it clocked back as a hex line.
#[derive(FromArgs)]
struct Args {
    /// SPI bus number (defaults to the configured port)
    #[argh(option, short = 'b')]
    bus: Option<u32>,

    /// chip-select number on the bus (defaults to the configured port)
    #[argh(option, short = 'd')]
    device: Option<u32>,

    /// minimum number of bytes to clock back
    #[argh(option, short = 'r', default = "0")]
    read: usize,

    /// clock speed in Hz for this transfer
    #[argh(option)]
    speed_hz: Option<u32>,

    /// word size in bits for this transfer
    #[argh(option)]
    bits_per_word: Option<u8>,

    /// delay in microseconds after the transfer segment
    #[argh(option)]
    delay_usecs: Option<u16>,

    /// bytes to transmit, decimal or 0x-prefixed hex
    #[argh(positional)]
    tx: Vec<String>,
}

fn main() -> Result<()> {
    let args: Args = argh::from_env();
    let settings = Settings::new().context("Unable to load settings")?;
    setup_logging(settings.loglevel, settings.json_logs);

    let bus = args.bus.unwrap_or(settings.port.bus);
    let device = args.device.unwrap_or(settings.port.device);
    let tx = parse_tx_bytes(&args.tx.join(" "))?;

    let mut spi = SpiDevice::connect(bus, device)
        .with_context(|| format!("Unable to open spidev {bus}.{device}"))?;
    debug!(
        mode = spi.mode(),
        bits_per_word = spi.bits_per_word(),
        max_speed_hz = spi.max_speed_hz(),
        "device settings"
    );

    let mut options = TransferOptions::default()
        .with_delay_usecs(args.delay_usecs.unwrap_or(settings.transfer.delay_usecs));
    if let Some(speed_hz) = args.speed_hz.or(settings.transfer.speed_hz) {
        options = options.with_speed_hz(speed_hz);
    }
    if let Some(bits) = args.bits_per_word.or(settings.transfer.bits_per_word) {
        options = options.with_bits_per_word(bits);
    }

    let rx = spi
        .transfer_with(&tx, args.read, options)
        .context("SPI transfer failed")?;
    println!("{}", hex_line(&rx));

    spi.close().context("Unable to close spidev node")?;
    Ok(())
}
