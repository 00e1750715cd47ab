use std::io;

use crate::device::traits::MockSpiPort;
use crate::device::{
    device_path, hex_line, parse_tx_bytes, SpiDevice, SpidevNode, TransferOptions, TransferParams,
    MAX_TRANSFER_LENGTH,
};
use crate::error::Error;

fn ready_port(mode: u8, bits_per_word: u8, max_speed_hz: u32) -> MockSpiPort {
    let mut port = MockSpiPort::new();
    port.expect_query_mode().return_once(move || Ok(mode));
    port.expect_query_bits_per_word()
        .return_once(move || Ok(bits_per_word));
    port.expect_query_max_speed_hz()
        .return_once(move || Ok(max_speed_hz));
    port
}

fn open_with(port: MockSpiPort) -> SpiDevice<MockSpiPort> {
    let mut spi = SpiDevice::unopened();
    spi.attach(port).expect("attach should succeed");
    spi
}

#[test]
fn it_starts_unopened_with_zeroed_settings() {
    let spi = SpiDevice::<MockSpiPort>::unopened();

    assert!(!spi.is_open());
    assert_eq!(spi.mode(), 0);
    assert_eq!(spi.bits_per_word(), 0);
    assert_eq!(spi.max_speed_hz(), 0);
}

#[test]
fn it_caches_the_settings_read_back_at_open() {
    let spi = open_with(ready_port(3, 8, 500_000));

    assert!(spi.is_open());
    assert_eq!(spi.mode(), 3);
    assert_eq!(spi.bits_per_word(), 8);
    assert_eq!(spi.max_speed_hz(), 500_000);
}

#[test]
fn it_releases_the_port_when_a_readback_fails() {
    let mut port = MockSpiPort::new();
    port.expect_query_mode().return_once(|| Ok(0));
    port.expect_query_bits_per_word()
        .return_once(|| Err(io::Error::from_raw_os_error(libc::EINVAL)));
    port.expect_shutdown().times(1).return_once(|| Ok(()));

    let mut spi = SpiDevice::unopened();
    let err = spi.attach(port).unwrap_err();

    assert!(matches!(
        err,
        Error::Query {
            setting: "bits per word",
            ..
        }
    ));
    assert!(!spi.is_open());
}

#[test]
fn it_resets_cached_settings_on_close() {
    let mut port = ready_port(1, 8, 1_000_000);
    port.expect_shutdown().times(1).return_once(|| Ok(()));

    let mut spi = open_with(port);
    spi.close().unwrap();

    assert!(!spi.is_open());
    assert_eq!(spi.mode(), 0);
    assert_eq!(spi.bits_per_word(), 0);
    assert_eq!(spi.max_speed_hz(), 0);
}

#[test]
fn it_treats_a_second_close_as_a_no_op() {
    let mut port = ready_port(0, 8, 1_000_000);
    port.expect_shutdown().times(1).return_once(|| Ok(()));

    let mut spi = open_with(port);
    spi.close().unwrap();
    spi.close().unwrap();
}

#[test]
fn it_still_resets_state_when_the_close_syscall_fails() {
    let mut port = ready_port(2, 8, 1_000_000);
    port.expect_shutdown()
        .return_once(|| Err(io::Error::from_raw_os_error(libc::EBADF)));

    let mut spi = open_with(port);
    let err = spi.close().unwrap_err();

    assert!(matches!(err, Error::Io(_)));
    assert!(!spi.is_open());
    assert_eq!(spi.max_speed_hz(), 0);
    // The handle no longer references the rejected descriptor.
    spi.close().unwrap();
}

#[test]
fn it_fails_transfers_before_open() {
    let mut spi = SpiDevice::<MockSpiPort>::unopened();

    let err = spi.transfer(&[0x01, 0x02]).unwrap_err();

    assert!(matches!(err, Error::NotOpen));
}

#[test]
fn it_returns_as_many_bytes_as_it_sends() {
    let mut port = ready_port(0, 8, 1_000_000);
    port.expect_transfer()
        .withf(|tx, _rx, _params| tx == [0xAA, 0xBB, 0xCC])
        .return_once(|tx, rx, _params| {
            rx.copy_from_slice(tx);
            Ok(())
        });

    let mut spi = open_with(port);
    let rx = spi.transfer(&[0xAA, 0xBB, 0xCC]).unwrap();

    assert_eq!(rx.as_ref(), [0xAA, 0xBB, 0xCC]);
}

#[test]
fn it_zero_pads_reads_past_the_transmit_data() {
    let mut port = ready_port(0, 8, 1_000_000);
    port.expect_transfer()
        .withf(|tx, _rx, _params| tx == [0x03, 0x10, 0x00, 0x00, 0x00, 0x00])
        .return_once(|tx, rx, _params| {
            // Echo device: proves the padding went over the wire as zeros.
            rx.copy_from_slice(tx);
            Ok(())
        });

    let mut spi = open_with(port);
    let rx = spi
        .transfer_with(&[0x03, 0x10], 6, TransferOptions::default())
        .unwrap();

    assert_eq!(rx.len(), 6);
    assert_eq!(&rx[..2], [0x03, 0x10]);
    assert!(rx[2..].iter().all(|b| *b == 0));
}

#[test]
fn it_clocks_transfers_with_the_cached_settings_by_default() {
    let mut port = ready_port(0, 16, 250_000);
    port.expect_transfer()
        .withf(|_tx, _rx, params| {
            *params
                == TransferParams {
                    speed_hz: 250_000,
                    bits_per_word: 16,
                    delay_usecs: 0,
                }
        })
        .return_once(|_tx, _rx, _params| Ok(()));

    let mut spi = open_with(port);
    spi.transfer(&[0x00]).unwrap();
}

#[test]
fn it_honours_per_call_clock_overrides() {
    let mut port = ready_port(0, 16, 250_000);
    port.expect_transfer()
        .withf(|_tx, _rx, params| {
            *params
                == TransferParams {
                    speed_hz: 1_000_000,
                    bits_per_word: 8,
                    delay_usecs: 5,
                }
        })
        .return_once(|_tx, _rx, _params| Ok(()));

    let options = TransferOptions::default()
        .with_speed_hz(1_000_000)
        .with_bits_per_word(8)
        .with_delay_usecs(5);

    let mut spi = open_with(port);
    spi.transfer_with(&[0x00], 0, options).unwrap();
}

#[test]
fn it_rejects_transfers_past_the_length_limit() {
    let mut spi = open_with(ready_port(0, 8, 1_000_000));

    let tx = vec![0u8; MAX_TRANSFER_LENGTH + 1];
    match spi.transfer(&tx).unwrap_err() {
        Error::BufferTooLarge { requested, max } => {
            assert_eq!(requested, MAX_TRANSFER_LENGTH + 1);
            assert_eq!(max, MAX_TRANSFER_LENGTH);
        }
        other => panic!("expected BufferTooLarge, got {other:?}"),
    }

    // An oversized response request is rejected the same way.
    let err = spi
        .transfer_with(&[0x00], MAX_TRANSFER_LENGTH * 2, TransferOptions::default())
        .unwrap_err();
    assert!(matches!(err, Error::BufferTooLarge { .. }));
}

#[test]
fn it_surfaces_transfer_failures() {
    let mut port = ready_port(0, 8, 1_000_000);
    port.expect_transfer()
        .return_once(|_tx, _rx, _params| Err(io::Error::from_raw_os_error(libc::EIO)));

    let mut spi = open_with(port);
    let err = spi.transfer(&[0x55]).unwrap_err();

    match err {
        Error::Transfer(source) => assert_eq!(source.raw_os_error(), Some(libc::EIO)),
        other => panic!("expected Transfer, got {other:?}"),
    }
}

#[test]
fn it_skips_the_bus_for_empty_transfers() {
    // No transfer expectation: touching the bus would panic the mock.
    let mut spi = open_with(ready_port(0, 8, 1_000_000));

    let rx = spi.transfer(&[]).unwrap();

    assert!(rx.is_empty());
}

#[test]
fn it_releases_the_previous_port_when_reopening() {
    let mut first = ready_port(0, 8, 1_000_000);
    first.expect_shutdown().times(1).return_once(|| Ok(()));

    let mut spi = open_with(first);
    spi.attach(ready_port(2, 8, 2_000_000)).unwrap();

    assert_eq!(spi.mode(), 2);
    assert_eq!(spi.max_speed_hz(), 2_000_000);
}

#[test]
fn it_stays_unopened_when_the_node_is_missing() {
    let mut spi = SpiDevice::<SpidevNode>::unopened();

    let err = spi.open(9, 9).unwrap_err();

    assert!(matches!(err, Error::Open { .. }));
    assert!(!spi.is_open());
}

#[test]
fn it_formats_device_paths() {
    assert_eq!(device_path(0, 0).unwrap(), "/dev/spidev0.0");
    assert_eq!(device_path(12, 3).unwrap(), "/dev/spidev12.3");
}

#[test]
fn it_rejects_paths_longer_than_kernel_node_names() {
    let err = device_path(12, 34).unwrap_err();
    assert!(matches!(err, Error::PathOverflow { bus: 12, device: 34 }));

    assert!(device_path(1234, 5).is_err());
}

#[test]
fn it_parses_mixed_decimal_and_hex_bytes() {
    let bytes = parse_tx_bytes("0x9F 0 255, 16").unwrap();
    assert_eq!(bytes, vec![0x9F, 0, 255, 16]);

    assert_eq!(parse_tx_bytes("").unwrap(), Vec::<u8>::new());
}

#[test]
fn it_rejects_bytes_outside_the_valid_range() {
    match parse_tx_bytes("1 300 2").unwrap_err() {
        Error::Value { index, token } => {
            assert_eq!(index, 1);
            assert_eq!(token, "300");
        }
        other => panic!("expected Value, got {other:?}"),
    }

    assert!(parse_tx_bytes("-1").is_err());
}

#[test]
fn it_rejects_tokens_that_are_not_numbers() {
    assert!(matches!(
        parse_tx_bytes("0xZZ").unwrap_err(),
        Error::Value { index: 0, .. }
    ));
    assert!(matches!(
        parse_tx_bytes("12 spi").unwrap_err(),
        Error::Value { index: 1, .. }
    ));
}

#[test]
fn it_renders_hex_lines() {
    assert_eq!(hex_line(&[0x00, 0x9F, 0xFF]), "00 9F FF");
    assert_eq!(hex_line(&[]), "");
}
