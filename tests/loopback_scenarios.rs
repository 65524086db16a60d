use serial_loopback::config::DeviceStatus;
use serial_loopback::serial::protocol::{CONFIGURE, STATUS};
use serial_loopback::{
    ControlRequest, ControlResponse, DeviceConfiguration, DeviceManager, SerialError,
};

#[test]
fn test_hello_round_trip() {
    let manager = DeviceManager::default();
    let session = manager.open("my_serial").expect("open");

    assert_eq!(session.write(b"hello").unwrap(), 5);
    let data = session.read(64).unwrap();
    assert_eq!(data, b"hello");

    let status = session.status().unwrap();
    assert_eq!(status, DeviceStatus { rx_bytes: 5, tx_bytes: 5 });
}

#[test]
fn test_round_trip_up_to_capacity() {
    let manager = DeviceManager::default();
    let session = manager.open("my_serial").unwrap();

    for len in [1usize, 17, 255, 4095, 4096] {
        let payload: Vec<u8> = (0..len).map(|i| (i * 31 % 251) as u8).collect();
        assert_eq!(session.write(&payload).unwrap(), len);
        assert_eq!(session.read(len).unwrap(), payload, "len {}", len);
    }
}

#[test]
fn test_overflow_drops_excess_until_read() {
    let manager = DeviceManager::default();
    let session = manager.open("my_serial").unwrap();

    let big = vec![0x5Au8; 5000];
    assert_eq!(session.write(&big).unwrap(), 4096);
    assert_eq!(session.write(b"x").unwrap(), 0);
    assert_eq!(session.write(b"x").unwrap(), 0);

    assert_eq!(session.read(10).unwrap().len(), 10);
    assert_eq!(session.write(b"xyz").unwrap(), 3);
    assert_eq!(session.write(b"0123456789").unwrap(), 7);

    let status = session.status().unwrap();
    assert_eq!(status.tx_bytes, 4096 + 3 + 7);
    assert_eq!(status.rx_bytes, 10);

    // the dropped bytes were never queued
    let rest = session.read(8192).unwrap();
    assert_eq!(rest.len(), 4096);
    assert!(rest[..4086].iter().all(|&b| b == 0x5A));
    assert_eq!(&rest[4086..], b"xyz0123456");
}

#[test]
fn test_write_never_exceeds_free_space() {
    let manager = DeviceManager::default();
    let session = manager.open("my_serial").unwrap();

    let mut queued = 0usize;
    for chunk in [100usize, 3000, 900, 500, 1] {
        let data = vec![1u8; chunk];
        let accepted = session.write(&data).unwrap();
        assert!(accepted <= chunk);
        assert!(accepted <= 4096 - queued);
        queued += accepted;
    }
    assert_eq!(queued, 4096);
}

#[test]
fn test_configure_then_status() {
    let manager = DeviceManager::default();
    let session = manager.open("my_serial").unwrap();
    session.write(b"abc").unwrap();
    let before = session.status().unwrap();

    let cfg = DeviceConfiguration::new(9600, 1, 2);
    let response = session.control(ControlRequest::Configure(cfg)).unwrap();
    assert_eq!(response, ControlResponse::Configured);
    assert_eq!(session.current_config().unwrap(), cfg);
    assert_eq!(session.status().unwrap(), before);
}

#[test]
fn test_configure_accepts_any_values() {
    let manager = DeviceManager::default();
    let session = manager.open("my_serial").unwrap();

    let odd = DeviceConfiguration {
        baud: 0,
        parity: 0xFF,
        stop_bits: 9,
        reserved: [0xCA, 0xFE],
    };
    session.control_raw(CONFIGURE, &odd.to_bytes()).unwrap();
    assert_eq!(session.current_config().unwrap(), odd);
}

#[test]
fn test_status_is_idempotent() {
    let manager = DeviceManager::default();
    let session = manager.open("my_serial").unwrap();
    session.write(b"0123456789").unwrap();
    session.read(4).unwrap();

    let first = session.control_raw(STATUS, &[]).unwrap();
    let second = session.control_raw(STATUS, &[]).unwrap();
    assert_eq!(first, second);
    assert_eq!(
        DeviceStatus::from_bytes(&first).unwrap(),
        DeviceStatus { rx_bytes: 4, tx_bytes: 10 }
    );
}

#[test]
fn test_unknown_opcode_leaves_state_alone() {
    let manager = DeviceManager::default();
    let session = manager.open("my_serial").unwrap();
    session.write(b"keep").unwrap();
    let status = session.status().unwrap();
    let cfg = session.current_config().unwrap();

    let err = session.control_raw(0x8008_4D03, &[]).unwrap_err();
    assert!(matches!(err, SerialError::UnsupportedRequest(0x8008_4D03)));

    let err = session.control_raw(CONFIGURE, &[0u8; 3]).unwrap_err();
    assert!(matches!(err, SerialError::InvalidRequest(_)));

    assert_eq!(session.status().unwrap(), status);
    assert_eq!(session.current_config().unwrap(), cfg);
    assert_eq!(session.read(64).unwrap(), b"keep");
}

#[test]
fn test_zero_length_requests() {
    let manager = DeviceManager::default();
    let session = manager.open("my_serial").unwrap();
    assert_eq!(session.write(&[]).unwrap(), 0);
    assert!(session.read(0).unwrap().is_empty());
    assert!(session.read(64).unwrap().is_empty());
    assert_eq!(session.status().unwrap(), DeviceStatus::default());
}
