use hex_literal::hex;
use tracing_core::LevelFilter;
use tracing_subscriber::{
    self,
    EnvFilter,
    fmt,
};

use crate::{
    ConfigRequest,
    EXTENDED_CONFIG_SPACE_SIZE,
    EcamBase,
    Error,
    LEGACY_CONFIG_SPACE_SIZE,
    Mediator,
    MmioRequest,
    OpCode,
    RoutingId,
    Session,
    read_extended,
    read_legacy,
    validate_access,
};

use mock_hardware::{
    LEGACY_SIZE,
    LoopbackChannel,
    MockConfigSpace,
    MockMapper,
    powered_down_region,
    sample_config,
    sample_region,
};


#[test]
fn bounds() {
    assert_eq!(validate_access(0, LEGACY_CONFIG_SPACE_SIZE, LEGACY_CONFIG_SPACE_SIZE), Ok(()));
    assert_eq!(validate_access(0xFF, 1, LEGACY_CONFIG_SPACE_SIZE), Ok(()));
    assert_eq!(validate_access(0x100, 0, LEGACY_CONFIG_SPACE_SIZE), Ok(()));

    assert_eq!(
        validate_access(0xF8, 0x10, LEGACY_CONFIG_SPACE_SIZE),
        Err(Error::OutOfRange {
            offset: 0xF8,
            length: 0x10,
            space_size: LEGACY_CONFIG_SPACE_SIZE,
        }),
    );

    // An overflowing `offset + length` is out of range,
    // not a silent wraparound into a small in-range value.
    assert_eq!(
        validate_access(u32::MAX, 2, EXTENDED_CONFIG_SPACE_SIZE),
        Err(Error::OutOfRange {
            offset: u32::MAX,
            length: 2,
            space_size: EXTENDED_CONFIG_SPACE_SIZE,
        }),
    );
}

#[test]
fn wire_layout() {
    let request = ConfigRequest::new(RoutingId::new(0x12, 0x03, 0x05), 0x60, 8);
    let mut buffer = [0; ConfigRequest::SIZE];
    request.encode(&mut buffer).unwrap();
    assert_eq!(buffer, hex!("1203056000000008000000"));
    assert_eq!(ConfigRequest::decode(&buffer).unwrap(), request);

    let request = MmioRequest::new(0xF811_3000, 0x100, 0x20);
    let mut buffer = [0; MmioRequest::SIZE];
    request.encode(&mut buffer).unwrap();
    assert_eq!(buffer, hex!("003011f8000000000001000020000000"));
    assert_eq!(MmioRequest::decode(&buffer).unwrap(), request);

    assert_eq!(
        ConfigRequest::decode(&buffer[.. ConfigRequest::SIZE - 1]),
        Err(Error::InvalidParameter),
    );
    assert_eq!(
        MmioRequest::decode(&buffer[.. MmioRequest::SIZE - 1]),
        Err(Error::InvalidParameter),
    );
}

#[test]
fn ecam_base() {
    assert_eq!(
        EcamBase::resolve(0x12_3456_7890).address(),
        0x12_3456_7890 & 0x0000_000F_FC00_0000,
    );
    assert_eq!(EcamBase::resolve(0xFC00_0001).address(), 0xFC00_0000);
}

#[test]
fn function_base() {
    let base = EcamBase::resolve(0xF800_0000);
    assert_eq!(base.address(), 0xF800_0000);

    assert_eq!(
        base.function_base(RoutingId::new(0x01, 0x02, 0x03)),
        0xF800_0000 + (1 << 20) + (2 << 15) + (3 << 12),
    );
    assert_eq!(base.function_base(RoutingId::new(0x01, 0x02, 0x03)), 0xF811_3000);
    assert_eq!(base.function_base(RoutingId::new(0, 0, 0)), 0xF800_0000);
}

#[test]
fn legacy_read() {
    let config_space = MockConfigSpace::new(sample_config());
    let routing_id = RoutingId::new(0, 2, 0);

    let mut buffer = [0; 0x20];
    let obtained = read_legacy(&mut &config_space, routing_id, 0x10, &mut buffer).unwrap();

    assert_eq!(obtained, buffer.len());
    assert_eq!(buffer, sample_config()[0x10 .. 0x30]);
    assert_eq!(config_space.read_count(), buffer.len());
}

#[test]
fn legacy_partial_read() {
    let config_space = MockConfigSpace::failing_from(sample_config(), 0x10);
    let routing_id = RoutingId::new(0, 2, 0);

    let mut buffer = [0; 0x10];
    let obtained = read_legacy(&mut &config_space, routing_id, 0x08, &mut buffer).unwrap();

    // The read stops at the first failed octet and reports
    // the prefix obtained so far, which stays valid.
    assert_eq!(obtained, 8);
    assert_eq!(buffer[.. 8], sample_config()[0x08 .. 0x10]);
    assert_eq!(config_space.read_count(), 9);

    let config_space = MockConfigSpace::failing_from(sample_config(), 0);
    let obtained = read_legacy(&mut &config_space, routing_id, 0, &mut buffer).unwrap();
    assert_eq!(obtained, 0);
}

#[test]
fn legacy_out_of_range() {
    let config_space = MockConfigSpace::new(sample_config());
    let routing_id = RoutingId::new(0, 2, 0);

    let mut buffer = [0; 0x10];
    assert_eq!(
        read_legacy(&mut &config_space, routing_id, 0xF8, &mut buffer),
        Err(Error::OutOfRange {
            offset: 0xF8,
            length: 0x10,
            space_size: LEGACY_CONFIG_SPACE_SIZE,
        }),
    );

    assert_eq!(config_space.read_count(), 0);
}

#[test]
fn extended_read() {
    let mapper = MockMapper::new(sample_region());

    let mut buffer = [0; 0x40];
    read_extended(&mut &mapper, 0xF811_3000, 0x100, &mut buffer).unwrap();

    assert_eq!(buffer, sample_region()[0x100 .. 0x140]);
    assert_eq!(mapper.last_base(), Some(0xF811_3000));
    assert_eq!(mapper.map_count(), 1);
    assert_eq!(mapper.unmap_count(), 1);
}

#[test]
fn extended_powered_down() {
    let mapper = MockMapper::new(powered_down_region());

    let mut buffer = [0xAA; 0x40];
    assert_eq!(
        read_extended(&mut &mapper, 0xF811_3000, 0x100, &mut buffer),
        Err(Error::DevicePoweredDown),
    );

    // No bytes are copied and the window is released exactly once.
    assert_eq!(buffer, [0xAA; 0x40]);
    assert_eq!(mapper.map_count(), 1);
    assert_eq!(mapper.unmap_count(), 1);
}

#[test]
fn extended_map_failure() {
    let mapper = MockMapper::failing();

    let mut buffer = [0; 0x40];
    assert_eq!(
        read_extended(&mut &mapper, 0xF811_3000, 0, &mut buffer),
        Err(Error::MapFailed),
    );

    assert_eq!(mapper.unmap_count(), 0);
}

#[test]
fn extended_out_of_range() {
    let mapper = MockMapper::new(sample_region());

    let mut buffer = [0; 0x10];
    assert_eq!(
        read_extended(&mut &mapper, 0xF811_3000, 0xFF8, &mut buffer),
        Err(Error::OutOfRange {
            offset: 0xFF8,
            length: 0x10,
            space_size: EXTENDED_CONFIG_SPACE_SIZE,
        }),
    );

    assert_eq!(mapper.map_count(), 0);
}

#[test]
fn dispatch_rejects() {
    let config_space = MockConfigSpace::new(sample_config());
    let mapper = MockMapper::new(sample_region());
    let mut mediator = Mediator::new(&config_space, &mapper);

    let request = ConfigRequest::new(RoutingId::new(0, 2, 0), 0, 0x10);
    let mut input = [0; ConfigRequest::SIZE];
    request.encode(&mut input).unwrap();
    let mut output = [0; ConfigRequest::SIZE + 0x10];

    assert_eq!(
        mediator.dispatch(OpCode::ConfigRead.into(), &input, &mut []),
        Err(Error::InvalidParameter),
    );
    assert_eq!(
        mediator.dispatch(OpCode::ConfigRead.into(), &[], &mut output),
        Err(Error::InvalidParameter),
    );

    assert_eq!(
        mediator.dispatch(0x9999, &input, &mut output),
        Err(Error::UnsupportedOperation(0x9999)),
    );

    // A truncated request header.
    assert_eq!(
        mediator.dispatch(OpCode::ConfigRead.into(), &input[.. ConfigRequest::SIZE - 1], &mut output),
        Err(Error::InvalidParameter),
    );

    // A response buffer capacity that does not match the declared length.
    assert_eq!(
        mediator.dispatch(OpCode::ConfigRead.into(), &input, &mut output[.. ConfigRequest::SIZE + 0x08]),
        Err(Error::InvalidParameter),
    );

    assert_eq!(config_space.read_count(), 0);
    assert_eq!(mapper.map_count(), 0);
}

#[test]
fn dispatch_config_read() {
    let config_space = MockConfigSpace::new(sample_config());
    let mapper = MockMapper::new(sample_region());
    let mut mediator = Mediator::new(&config_space, &mapper);

    let request = ConfigRequest::new(RoutingId::new(0, 2, 0), 0x20, 0x10);
    let mut input = [0; ConfigRequest::SIZE];
    request.encode(&mut input).unwrap();

    let mut output = [0; ConfigRequest::SIZE + 0x10];
    let written = mediator.dispatch(OpCode::ConfigRead.into(), &input, &mut output).unwrap();
    assert_eq!(written, output.len());

    let response = ConfigRequest::decode(&output[.. ConfigRequest::SIZE]).unwrap();
    assert_eq!(*response.length(), 0x10);
    assert_eq!(output[ConfigRequest::SIZE ..], sample_config()[0x20 .. 0x30]);
}

#[test]
fn session_lifecycle() {
    let config_space = MockConfigSpace::new(sample_config());
    let mapper = MockMapper::new(sample_region());
    let channel = LoopbackChannel::new(&config_space, &mapper);

    let mut session = Session::new(&channel);

    // Reads before initialization fail without touching the channel.
    let mut buffer = [0; 4];
    assert_eq!(
        session.read_config(RoutingId::new(0, 2, 0), 0, &mut buffer),
        Err(Error::NotInitialized),
    );
    assert_eq!(session.ecam_base(), Err(Error::NotInitialized));
    assert_eq!(channel.open_count(), 0);
    assert_eq!(channel.transact_count(), 0);

    session.initialize().unwrap();
    assert_eq!(session.ecam_base().unwrap().address(), 0xF800_0000);
    assert_eq!(channel.open_count(), 1);
    assert_eq!(channel.transact_count(), 1);

    let obtained = session.read_config(RoutingId::new(0, 2, 0), 0, &mut buffer).unwrap();
    assert_eq!(obtained, buffer.len());
    assert_eq!(buffer, sample_config()[.. 4]);

    // An out-of-range request is rejected before any channel call.
    assert_eq!(
        session.read_config(RoutingId::new(0, 2, 0), 0xF8, &mut [0; 0x10]),
        Err(Error::OutOfRange {
            offset: 0xF8,
            length: 0x10,
            space_size: LEGACY_CONFIG_SPACE_SIZE,
        }),
    );
    assert_eq!(channel.transact_count(), 2);

    session.shutdown();
    assert!(!channel.is_open());
    assert_eq!(
        session.read_config(RoutingId::new(0, 2, 0), 0, &mut buffer),
        Err(Error::NotInitialized),
    );
    assert_eq!(channel.transact_count(), 2);
}

#[test]
fn session_extended_read() {
    let config_space = MockConfigSpace::new(sample_config());
    let mapper = MockMapper::new(sample_region());
    let channel = LoopbackChannel::new(&config_space, &mapper);

    let mut session = Session::new(&channel);
    session.initialize().unwrap();

    let mut buffer = [0; 0x20];
    session.read_extended_config(RoutingId::new(0x01, 0x02, 0x03), 0x40, &mut buffer).unwrap();

    // The session computes the function window base from the cached
    // ECAM base itself, the caller never supplies it.
    assert_eq!(mapper.last_base(), Some(0xF811_3000));
    assert_eq!(buffer, sample_region()[0x40 .. 0x60]);

    assert_eq!(
        session.read_extended_config(RoutingId::new(0x01, 0x02, 0x03), 0xFFF, &mut [0; 2]),
        Err(Error::OutOfRange {
            offset: 0xFFF,
            length: 2,
            space_size: EXTENDED_CONFIG_SPACE_SIZE,
        }),
    );
    assert_eq!(mapper.map_count(), 1);
}

#[test]
fn session_direct_mmio_read() {
    let config_space = MockConfigSpace::new(sample_config());
    let mapper = MockMapper::new(sample_region());
    let channel = LoopbackChannel::new(&config_space, &mapper);

    let mut session = Session::new(&channel);
    session.initialize().unwrap();

    let mut buffer = [0; 0x10];
    session.read_mmio(0xABCD_E000, 0x200, &mut buffer).unwrap();

    assert_eq!(mapper.last_base(), Some(0xABCD_E000));
    assert_eq!(buffer, sample_region()[0x200 .. 0x210]);
}

#[test]
fn session_partial_read() {
    let config_space = MockConfigSpace::failing_from(sample_config(), 0x80);
    let mapper = MockMapper::new(sample_region());
    let channel = LoopbackChannel::new(&config_space, &mapper);

    let mut session = Session::new(&channel);
    session.initialize().unwrap();

    let mut buffer = [0xAA; 0x60];
    let obtained = session.read_config(RoutingId::new(0, 2, 0), 0x40, &mut buffer).unwrap();

    assert_eq!(obtained, 0x40);
    assert_eq!(buffer[.. 0x40], sample_config()[0x40 .. 0x80]);
}

#[test]
fn session_powered_down() {
    let config_space = MockConfigSpace::new(sample_config());
    let mapper = MockMapper::new(powered_down_region());
    let channel = LoopbackChannel::new(&config_space, &mapper);

    let mut session = Session::new(&channel);
    session.initialize().unwrap();

    let mut buffer = [0; 0x20];
    assert_eq!(
        session.read_extended_config(RoutingId::new(0, 2, 0), 0, &mut buffer),
        Err(Error::DevicePoweredDown),
    );
    assert_eq!(mapper.map_count(), 1);
    assert_eq!(mapper.unmap_count(), 1);
}

#[test]
fn session_initialization_failures() {
    let config_space = MockConfigSpace::new(sample_config());
    let mapper = MockMapper::new(sample_region());
    let channel = LoopbackChannel::unavailable(&config_space, &mapper);

    let mut session = Session::new(&channel);
    assert_eq!(session.initialize(), Err(Error::ChannelUnavailable));
    assert_eq!(session.ecam_base(), Err(Error::NotInitialized));

    // A device that answers only a prefix of the ECAM base register
    // leaves the session uninitialized and the channel closed.
    let config_space = MockConfigSpace::failing_from(sample_config(), 0x64);
    let channel = LoopbackChannel::new(&config_space, &mapper);

    let mut session = Session::new(&channel);
    assert_eq!(session.initialize(), Err(Error::HardwareAccess));
    assert_eq!(session.ecam_base(), Err(Error::NotInitialized));
    assert!(!channel.is_open());
}

#[test]
fn session_exclusive_channel() {
    let config_space = MockConfigSpace::new(sample_config());
    let mapper = MockMapper::new(sample_region());
    let channel = LoopbackChannel::new(&config_space, &mapper);

    let mut first = Session::new(&channel);
    let mut second = Session::new(&channel);

    first.initialize().unwrap();
    assert_eq!(second.initialize(), Err(Error::ChannelUnavailable));

    first.shutdown();
    second.initialize().unwrap();
}

#[test]
fn idempotent_reads() {
    let config_space = MockConfigSpace::new(sample_config());
    let mapper = MockMapper::new(sample_region());
    let channel = LoopbackChannel::new(&config_space, &mapper);

    let mut session = Session::new(&channel);
    session.initialize().unwrap();

    let routing_id = RoutingId::new(0, 2, 0);
    let mut first = [0; LEGACY_SIZE];
    let mut second = [0; LEGACY_SIZE];

    assert_eq!(session.read_config(routing_id, 0, &mut first).unwrap(), LEGACY_SIZE);
    assert_eq!(session.read_config(routing_id, 0, &mut second).unwrap(), LEGACY_SIZE);

    assert_eq!(first, second);
}

#[test]
fn row_by_row_round_trip() {
    let config_space = MockConfigSpace::new(sample_config());
    let mapper = MockMapper::new(sample_region());
    let channel = LoopbackChannel::new(&config_space, &mapper);

    let mut session = Session::new(&channel);
    session.initialize().unwrap();

    let routing_id = RoutingId::new(0, 2, 0);
    let mut bulk = [0; LEGACY_SIZE];
    assert_eq!(session.read_config(routing_id, 0, &mut bulk).unwrap(), LEGACY_SIZE);

    const ROW: usize = 0x10;
    let mut row_by_row = [0; LEGACY_SIZE];
    for row in 0 .. LEGACY_SIZE / ROW {
        let offset = row * ROW;
        let obtained = session
            .read_config(routing_id, offset as u32, &mut row_by_row[offset .. offset + ROW])
            .unwrap();
        assert_eq!(obtained, ROW);
    }

    assert_eq!(bulk, row_by_row);
}

#[ctor::ctor]
fn init() {
    let filter = EnvFilter::from_default_env().add_directive(LevelFilter::DEBUG.into());

    let format = fmt::format()
        .with_level(true)
        .with_target(false)
        .with_thread_ids(false)
        .with_thread_names(true)
        .compact();

    tracing_subscriber::fmt()
        .with_ansi(false)
        .event_format(format)
        .with_env_filter(filter)
        .init();
}
