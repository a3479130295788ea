use std::cell::RefCell;
use std::rc::Rc;

use zcl_data::cluster_library::ias_zone::ZoneStatus;
use zcl_data::cluster_library::time::TimeStatus;
use zcl_data::cluster_library::{
    basic, color_control, ias_zone, identify, level_control, on_off, time, AttributeValue,
    ClusterLibraryStatus, ClusterRole,
};
use zcl_data::{Address, ExtendedAddress, ShortAddress};

use zcl_service::binding::{BindingDestination, StaticBindingTable};
use zcl_service::clusters;
use zcl_service::config::{Config, StatusMode};
use zcl_service::core::Context;
use zcl_service::event::DeviceEvent;
use zcl_service::handler::{ClusterHandler, CommandOutcome};
use zcl_service::header::ParsedHeader;
use zcl_service::persist::MemoryStore;
use zcl_service::store::{Access, AttributeDefinition, ClusterDefinition, EndpointDefinition};
use zcl_service::transport::{ApsDataIndication, ConfirmStatus, DestinationAddress};
use zcl_service::ZclService;

const HOME_AUTOMATION: u16 = 0x0104;
const COORDINATOR: u16 = 0x0000;
const LOCAL: u16 = 0x1a2b;
const CIE_IEEE: u64 = 0x0011_2233_4455_6677;
const MANUFACTURER_CLUSTER: u16 = 0xfc00;
const TEXT_CLUSTER: u16 = 0xfc01;
const VERBOSE_CLUSTER: u16 = 0xfc02;

fn init_logger() {
    let _ = env_logger::builder().is_test(true).try_init();
}

struct Device {
    service: ZclService,
    events: Rc<RefCell<Vec<DeviceEvent>>>,
}

impl Device {
    fn new(config: Config, bindings: StaticBindingTable) -> Self {
        init_logger();
        let mut service = ZclService::new(
            config,
            ExtendedAddress::new(0x8899_aabb_ccdd_eeff),
            Box::new(bindings),
            Box::new(MemoryStore::new()),
        )
        .unwrap();
        service.register_default_handlers().unwrap();
        let events = Rc::new(RefCell::new(Vec::new()));
        let recorded = events.clone();
        service.set_device_callback(Box::new(move |event: &DeviceEvent| {
            recorded.borrow_mut().push(event.clone())
        }));
        Self { service, events }
    }

    fn endpoint(&mut self, clusters: Vec<ClusterDefinition>) {
        let mut definition = EndpointDefinition::new(1, HOME_AUTOMATION, 0x0102);
        for cluster in clusters {
            definition = definition.cluster(cluster);
        }
        self.service.register_endpoint(definition).unwrap();
    }

    fn receive(&mut self, cluster: u16, frame: &[u8]) {
        let indication = ApsDataIndication {
            source: Address::Short(ShortAddress::new(COORDINATOR)),
            source_ieee: None,
            source_endpoint: 1,
            destination: DestinationAddress::Short(ShortAddress::new(LOCAL)),
            destination_endpoint: 1,
            profile: HOME_AUTOMATION,
            cluster,
            secured: false,
            rssi: None,
        };
        self.service.receive(indication, frame).unwrap();
    }

    /// Frames queued for transmission, confirmed and released
    fn transmitted(&mut self) -> Vec<(u16, Vec<u8>)> {
        let mut frames = Vec::new();
        while let Some(frame) = self.service.poll_transmit() {
            let data = self.service.frame_data(frame.buffer).unwrap().to_vec();
            frames.push((frame.request.cluster, data));
            self.service.confirm(frame.buffer, ConfirmStatus::Success).unwrap();
        }
        frames
    }

    fn get(&self, cluster: u16, attribute: u16) -> Option<AttributeValue> {
        self.service.get_attribute(1, cluster, ClusterRole::Server, attribute)
    }
}

fn coordinator() -> BindingDestination {
    BindingDestination {
        address: DestinationAddress::Short(ShortAddress::new(COORDINATOR)),
        endpoint: 1,
    }
}

#[test]
fn on_command_is_reported_to_binding() {
    let mut bindings = StaticBindingTable::new();
    bindings.bind(1, on_off::CLUSTER, coordinator());
    let mut device = Device::new(Config::default(), bindings);
    device.endpoint(vec![clusters::on_off::server()]);
    device
        .service
        .start_reporting(1, on_off::CLUSTER, ClusterRole::Server, on_off::ATTR_ON_OFF)
        .unwrap();

    device.receive(on_off::CLUSTER, &[0x01, 0x05, on_off::CMD_ON]);
    assert_eq!(device.get(on_off::CLUSTER, on_off::ATTR_ON_OFF), Some(AttributeValue::Boolean(1)));
    assert_eq!(
        device.transmitted(),
        vec![(on_off::CLUSTER, vec![0x18, 0x05, 0x0b, on_off::CMD_ON, 0x00])]
    );
    assert!(device.events.borrow().contains(&DeviceEvent::SetAttributeValue {
        endpoint: 1,
        cluster: on_off::CLUSTER,
        attribute: on_off::ATTR_ON_OFF,
        value: AttributeValue::Boolean(1),
    }));

    device.service.poll(1000);
    assert!(device.transmitted().is_empty());
    device.service.poll(5000);
    assert_eq!(
        device.transmitted(),
        vec![(on_off::CLUSTER, vec![0x18, 0x01, 0x0a, 0x00, 0x00, 0x10, 0x01])]
    );

    // unchanged value, nothing to report
    device.service.poll(12000);
    assert!(device.transmitted().is_empty());
}

#[test]
fn configured_reporting_intervals() {
    let mut bindings = StaticBindingTable::new();
    bindings.bind(1, on_off::CLUSTER, coordinator());
    let mut device = Device::new(Config::default(), bindings);
    device.endpoint(vec![clusters::on_off::server()]);

    // OnOff, boolean, 1 s minimum, 60 s maximum
    device.receive(
        on_off::CLUSTER,
        &[0x00, 0x60, 0x06, 0x00, 0x00, 0x00, 0x10, 0x01, 0x00, 0x3c, 0x00],
    );
    assert_eq!(
        device.transmitted(),
        vec![(on_off::CLUSTER, vec![0x18, 0x60, 0x07, 0x00])]
    );

    device.service.poll(200);
    assert!(device.transmitted().is_empty());
    device.receive(on_off::CLUSTER, &[0x11, 0x61, on_off::CMD_ON]);
    assert_eq!(device.transmitted().len(), 0);

    device.service.poll(900);
    assert!(device.transmitted().is_empty());
    device.service.poll(1000);
    assert_eq!(
        device.transmitted(),
        vec![(on_off::CLUSTER, vec![0x18, 0x01, 0x0a, 0x00, 0x00, 0x10, 0x01])]
    );

    device.service.poll(30000);
    assert!(device.transmitted().is_empty());
    device.service.poll(61000);
    assert_eq!(
        device.transmitted(),
        vec![(on_off::CLUSTER, vec![0x18, 0x02, 0x0a, 0x00, 0x00, 0x10, 0x01])]
    );

    // both intervals 0xffff, the entry is removed
    device.receive(
        on_off::CLUSTER,
        &[0x00, 0x62, 0x06, 0x00, 0x00, 0x00, 0x10, 0xff, 0xff, 0xff, 0xff],
    );
    assert_eq!(
        device.transmitted(),
        vec![(on_off::CLUSTER, vec![0x18, 0x62, 0x07, 0x00])]
    );
    device.service.poll(200000);
    assert!(device.transmitted().is_empty());
}

#[test]
fn move_to_hue_transition() {
    let mut device = Device::new(Config::default(), StaticBindingTable::new());
    device.endpoint(vec![clusters::color_control::server()]);
    device
        .service
        .set_attribute(
            1,
            color_control::CLUSTER,
            ClusterRole::Server,
            color_control::ATTR_CURRENT_HUE,
            AttributeValue::Unsigned8(0x20),
        )
        .unwrap();

    // hue 128, shortest way, one second
    device.receive(color_control::CLUSTER, &[0x11, 0x07, 0x00, 128, 0x00, 10, 0x00]);
    assert_eq!(
        device.get(color_control::CLUSTER, color_control::ATTR_CURRENT_HUE),
        Some(AttributeValue::Unsigned8(0x20))
    );
    assert_eq!(
        device.get(color_control::CLUSTER, color_control::ATTR_REMAINING_TIME),
        Some(AttributeValue::Unsigned16(10))
    );

    let mut hues = Vec::new();
    for tick in 1..=10u32 {
        let next = device.service.poll(tick * 100);
        assert_eq!(next, if tick < 10 { Some(100) } else { None });
        match device.get(color_control::CLUSTER, color_control::ATTR_CURRENT_HUE) {
            Some(AttributeValue::Unsigned8(hue)) => hues.push(hue),
            other => panic!("unexpected hue {:?}", other),
        }
    }
    assert_eq!(hues, vec![41, 51, 60, 70, 80, 89, 99, 108, 118, 128]);
    assert_eq!(
        device.get(color_control::CLUSTER, color_control::ATTR_REMAINING_TIME),
        Some(AttributeValue::Unsigned16(0))
    );
    assert!(device.transmitted().is_empty());
}

#[test]
fn zone_enrollment() {
    let mut device = Device::new(Config::default(), StaticBindingTable::new());
    device.endpoint(vec![clusters::ias_zone::server(ias_zone::ZoneType::ContactSwitch)]);

    let mut write = vec![0x00, 0x10, 0x02, 0x10, 0x00, 0xf0];
    write.extend_from_slice(&CIE_IEEE.to_le_bytes());
    device.receive(ias_zone::CLUSTER, &write);
    assert_eq!(
        device.transmitted(),
        vec![
            (ias_zone::CLUSTER, vec![0x09, 0x01, ias_zone::CMD_ZONE_ENROLL_REQUEST, 0x15, 0x00, 0x00, 0x00]),
            (ias_zone::CLUSTER, vec![0x18, 0x10, 0x04, 0x00]),
        ]
    );

    device.receive(
        ias_zone::CLUSTER,
        &[0x01, 0x11, ias_zone::CMD_ZONE_ENROLL_RESPONSE, 0x00, 0x01],
    );
    assert_eq!(
        device.get(ias_zone::CLUSTER, ias_zone::ATTR_ZONE_STATE),
        Some(AttributeValue::Enumeration8(ias_zone::ZONE_STATE_ENROLLED))
    );
    assert_eq!(
        device.get(ias_zone::CLUSTER, ias_zone::ATTR_ZONE_ID),
        Some(AttributeValue::Unsigned8(1))
    );
    assert!(device
        .events
        .borrow()
        .contains(&DeviceEvent::ZoneEnrolled { endpoint: 1, zone_id: 1 }));
    assert_eq!(
        device.transmitted(),
        vec![(ias_zone::CLUSTER, vec![0x18, 0x11, 0x0b, ias_zone::CMD_ZONE_ENROLL_RESPONSE, 0x00])]
    );
}

#[test]
fn library_version_is_not_reportable() {
    let mut device = Device::new(Config::default(), StaticBindingTable::new());
    let information = clusters::basic::DeviceInformation::default();
    device.endpoint(vec![clusters::basic::server(&information)]);

    device.receive(
        basic::CLUSTER,
        &[0x00, 0x21, 0x06, 0x00, 0x00, 0x00, 0x20, 0x01, 0x00, 0x0a, 0x00, 0x01],
    );
    assert_eq!(
        device.transmitted(),
        vec![(basic::CLUSTER, vec![0x18, 0x21, 0x07, 0x8c, 0x00, 0x00, 0x00])]
    );
    assert_eq!(
        device
            .service
            .start_reporting(1, basic::CLUSTER, ClusterRole::Server, basic::ATTR_LIBRARY_VERSION),
        Err(zcl_service::Error::Status(ClusterLibraryStatus::UnreportableAttribute))
    );
}

#[test]
fn undivided_write_is_all_or_nothing() {
    let mut device = Device::new(Config::default(), StaticBindingTable::new());
    device.endpoint(vec![clusters::level_control::server()]);

    device.receive(
        level_control::CLUSTER,
        &[0x00, 0x30, 0x03, 0x10, 0x00, 0x21, 0x05, 0x00, 0x11, 0x00, 0x20, 0x00],
    );
    assert_eq!(
        device.transmitted(),
        vec![(level_control::CLUSTER, vec![0x18, 0x30, 0x04, 0x87, 0x11, 0x00])]
    );
    assert_eq!(
        device.get(level_control::CLUSTER, level_control::ATTR_ON_OFF_TRANSITION_TIME),
        Some(AttributeValue::Unsigned16(0))
    );

    // the same records, written one by one
    device.receive(
        level_control::CLUSTER,
        &[0x00, 0x31, 0x02, 0x10, 0x00, 0x21, 0x05, 0x00, 0x11, 0x00, 0x20, 0x00],
    );
    assert_eq!(
        device.transmitted(),
        vec![(level_control::CLUSTER, vec![0x18, 0x31, 0x04, 0x87, 0x11, 0x00])]
    );
    assert_eq!(
        device.get(level_control::CLUSTER, level_control::ATTR_ON_OFF_TRANSITION_TIME),
        Some(AttributeValue::Unsigned16(5))
    );
}

struct Counter;

impl ClusterHandler for Counter {
    fn cluster(&self) -> u16 {
        MANUFACTURER_CLUSTER
    }

    fn role(&self) -> ClusterRole {
        ClusterRole::Server
    }

    fn handle_command(
        &self,
        _ctx: &mut Context,
        _endpoint: u8,
        header: &ParsedHeader,
        _payload: &[u8],
    ) -> CommandOutcome {
        match header.command {
            0x00 => CommandOutcome::HandledErr(ClusterLibraryStatus::LimitReached),
            _ => CommandOutcome::NotHandled,
        }
    }

    fn received_commands(&self) -> &'static [u8] {
        &[0x00]
    }
}

fn limit_reached_status(mode: StatusMode) -> Vec<u8> {
    let config = Config {
        status_mode: mode,
        ..Config::default()
    };
    let mut device = Device::new(config, StaticBindingTable::new());
    device.service.register_handler(Box::new(Counter)).unwrap();
    device.endpoint(vec![ClusterDefinition::server(MANUFACTURER_CLUSTER)]);
    device.receive(MANUFACTURER_CLUSTER, &[0x01, 0x40, 0x00]);
    device.receive(MANUFACTURER_CLUSTER, &[0x01, 0x41, 0x05]);
    device
        .transmitted()
        .into_iter()
        .map(|(_, frame)| frame[4])
        .collect()
}

#[test]
fn status_codes_follow_status_mode() {
    assert_eq!(limit_reached_status(StatusMode::PreZcl8), vec![0xc4, 0x81]);
    assert_eq!(limit_reached_status(StatusMode::Zcl8), vec![0x00, 0x81]);
}

#[test]
fn discover_attributes_in_pages() {
    let mut device = Device::new(Config::default(), StaticBindingTable::new());
    device.endpoint(vec![clusters::on_off::server()]);

    device.receive(on_off::CLUSTER, &[0x00, 0x50, 0x0c, 0x00, 0x00, 0x03]);
    assert_eq!(
        device.transmitted(),
        vec![(
            on_off::CLUSTER,
            vec![0x18, 0x50, 0x0d, 0x00, 0x00, 0x00, 0x10, 0x00, 0x40, 0x10, 0x01, 0x40, 0x21]
        )]
    );

    device.receive(on_off::CLUSTER, &[0x00, 0x51, 0x0c, 0x02, 0x40, 0x10]);
    assert_eq!(
        device.transmitted(),
        vec![(
            on_off::CLUSTER,
            vec![0x18, 0x51, 0x0d, 0x01, 0x02, 0x40, 0x21, 0x03, 0x40, 0x30, 0xfd, 0xff, 0x21]
        )]
    );
}

#[test]
fn unknown_endpoint_is_dropped() {
    let mut device = Device::new(Config::default(), StaticBindingTable::new());
    device.endpoint(vec![clusters::on_off::server()]);
    let indication = ApsDataIndication {
        source: Address::Short(ShortAddress::new(COORDINATOR)),
        source_ieee: None,
        source_endpoint: 1,
        destination: DestinationAddress::Short(ShortAddress::new(LOCAL)),
        destination_endpoint: 9,
        profile: HOME_AUTOMATION,
        cluster: on_off::CLUSTER,
        secured: false,
        rssi: None,
    };
    device.service.receive(indication, &[0x01, 0x01, on_off::CMD_ON]).unwrap();
    assert!(device.transmitted().is_empty());
    assert_eq!(device.get(on_off::CLUSTER, on_off::ATTR_ON_OFF), Some(AttributeValue::Boolean(0)));
    assert_eq!(device.service.dropped(), 0);
}

fn text_cluster(access: Access) -> ClusterDefinition {
    ClusterDefinition::server(TEXT_CLUSTER)
        .attribute(AttributeDefinition::new(
            0x0001,
            access,
            AttributeValue::CharacterString(Some("x".repeat(100))),
        ))
        .attribute(AttributeDefinition::new(0x0002, Access::RO, AttributeValue::Unsigned8(7)))
        .attribute(AttributeDefinition::new(
            0x0003,
            Access::RO,
            AttributeValue::CharacterString(Some("a".repeat(40))),
        ))
        .attribute(AttributeDefinition::new(
            0x0004,
            Access::RO,
            AttributeValue::CharacterString(Some("b".repeat(40))),
        ))
}

#[test]
fn oversized_attribute_reads_as_insufficient_space() {
    let mut device = Device::new(Config::default(), StaticBindingTable::new());
    device.endpoint(vec![text_cluster(Access::RO)]);

    device.receive(TEXT_CLUSTER, &[0x00, 0x01, 0x00, 0x01, 0x00]);
    assert_eq!(
        device.transmitted(),
        vec![(TEXT_CLUSTER, vec![0x18, 0x01, 0x01, 0x01, 0x00, 0x89])]
    );

    device.receive(TEXT_CLUSTER, &[0x00, 0x02, 0x00, 0x01, 0x00, 0x02, 0x00]);
    assert_eq!(
        device.transmitted(),
        vec![(
            TEXT_CLUSTER,
            vec![0x18, 0x02, 0x01, 0x01, 0x00, 0x89, 0x02, 0x00, 0x00, 0x20, 0x07]
        )]
    );
}

#[test]
fn read_response_split_over_frames() {
    let mut device = Device::new(Config::default(), StaticBindingTable::new());
    device.endpoint(vec![text_cluster(Access::RO)]);

    device.receive(TEXT_CLUSTER, &[0x00, 0x03, 0x00, 0x03, 0x00, 0x04, 0x00, 0x02, 0x00]);
    let mut first = vec![0x18, 0x03, 0x01, 0x03, 0x00, 0x00, 0x42, 40];
    first.extend_from_slice(&[b'a'; 40]);
    let mut second = vec![0x18, 0x03, 0x01, 0x04, 0x00, 0x00, 0x42, 40];
    second.extend_from_slice(&[b'b'; 40]);
    second.extend_from_slice(&[0x02, 0x00, 0x00, 0x20, 0x07]);
    assert_eq!(
        device.transmitted(),
        vec![(TEXT_CLUSTER, first), (TEXT_CLUSTER, second)]
    );
}

#[test]
fn oversized_report_is_counted_as_dropped() {
    let mut bindings = StaticBindingTable::new();
    bindings.bind(1, TEXT_CLUSTER, coordinator());
    let mut device = Device::new(Config::default(), bindings);
    device.endpoint(vec![text_cluster(Access::RP)]);
    device
        .service
        .start_reporting(1, TEXT_CLUSTER, ClusterRole::Server, 0x0001)
        .unwrap();

    device.service.poll(5000);
    assert!(device.transmitted().is_empty());
    assert_eq!(device.service.dropped(), 1);
}

const fn command_list() -> [u8; 100] {
    let mut list = [0u8; 100];
    let mut n = 0;
    while n < list.len() {
        list[n] = n as u8;
        n += 1;
    }
    list
}

static VERBOSE_COMMANDS: [u8; 100] = command_list();

struct Verbose;

impl ClusterHandler for Verbose {
    fn cluster(&self) -> u16 {
        VERBOSE_CLUSTER
    }

    fn role(&self) -> ClusterRole {
        ClusterRole::Server
    }

    fn received_commands(&self) -> &'static [u8] {
        &VERBOSE_COMMANDS
    }
}

#[test]
fn discover_commands_fits_one_frame() {
    let mut device = Device::new(Config::default(), StaticBindingTable::new());
    device.service.register_handler(Box::new(Verbose)).unwrap();
    device.endpoint(vec![ClusterDefinition::server(VERBOSE_CLUSTER)]);

    device.receive(VERBOSE_CLUSTER, &[0x00, 0x52, 0x11, 0x00, 0xff]);
    let frames = device.transmitted();
    assert_eq!(frames.len(), 1);
    let (cluster, frame) = &frames[0];
    assert_eq!(*cluster, VERBOSE_CLUSTER);
    assert_eq!(frame[..4], [0x18, 0x52, 0x12, 0x00]);
    assert_eq!(frame[4..], VERBOSE_COMMANDS[..78]);
}

fn on_off_attribute(device: &Device, attribute: u16) -> Option<AttributeValue> {
    device.get(on_off::CLUSTER, attribute)
}

#[test]
fn on_with_timed_off() {
    let mut device = Device::new(Config::default(), StaticBindingTable::new());
    device.endpoint(vec![clusters::on_off::server()]);

    // on for 0.3 s, then 0.2 s off wait
    device.receive(
        on_off::CLUSTER,
        &[0x11, 0x20, on_off::CMD_ON_WITH_TIMED_OFF, 0x00, 0x03, 0x00, 0x02, 0x00],
    );
    assert_eq!(on_off_attribute(&device, on_off::ATTR_ON_OFF), Some(AttributeValue::Boolean(1)));
    assert_eq!(on_off_attribute(&device, on_off::ATTR_ON_TIME), Some(AttributeValue::Unsigned16(3)));
    assert_eq!(
        on_off_attribute(&device, on_off::ATTR_OFF_WAIT_TIME),
        Some(AttributeValue::Unsigned16(2))
    );

    assert_eq!(device.service.poll(100), Some(100));
    assert_eq!(on_off_attribute(&device, on_off::ATTR_ON_TIME), Some(AttributeValue::Unsigned16(2)));
    device.service.poll(200);
    assert_eq!(on_off_attribute(&device, on_off::ATTR_ON_TIME), Some(AttributeValue::Unsigned16(1)));
    assert_eq!(device.service.poll(300), None);
    assert_eq!(on_off_attribute(&device, on_off::ATTR_ON_OFF), Some(AttributeValue::Boolean(0)));
    assert_eq!(on_off_attribute(&device, on_off::ATTR_ON_TIME), Some(AttributeValue::Unsigned16(0)));
    assert_eq!(
        on_off_attribute(&device, on_off::ATTR_OFF_WAIT_TIME),
        Some(AttributeValue::Unsigned16(0))
    );

    // switched off early, the off wait time keeps counting
    device.service.poll(1000);
    device.receive(
        on_off::CLUSTER,
        &[0x11, 0x21, on_off::CMD_ON_WITH_TIMED_OFF, 0x00, 0x03, 0x00, 0x02, 0x00],
    );
    device.service.poll(1100);
    assert_eq!(on_off_attribute(&device, on_off::ATTR_ON_TIME), Some(AttributeValue::Unsigned16(2)));
    device.receive(on_off::CLUSTER, &[0x11, 0x22, on_off::CMD_OFF]);
    assert_eq!(on_off_attribute(&device, on_off::ATTR_ON_TIME), Some(AttributeValue::Unsigned16(0)));

    // while waiting, only the off wait time is shortened
    device.receive(
        on_off::CLUSTER,
        &[0x11, 0x23, on_off::CMD_ON_WITH_TIMED_OFF, 0x00, 0x05, 0x00, 0x01, 0x00],
    );
    assert_eq!(on_off_attribute(&device, on_off::ATTR_ON_OFF), Some(AttributeValue::Boolean(0)));
    assert_eq!(
        on_off_attribute(&device, on_off::ATTR_OFF_WAIT_TIME),
        Some(AttributeValue::Unsigned16(1))
    );
    assert_eq!(device.service.poll(1200), None);
    assert_eq!(
        on_off_attribute(&device, on_off::ATTR_OFF_WAIT_TIME),
        Some(AttributeValue::Unsigned16(0))
    );

    // accept only when on
    device.receive(
        on_off::CLUSTER,
        &[0x11, 0x24, on_off::CMD_ON_WITH_TIMED_OFF, 0x01, 0x0a, 0x00, 0x00, 0x00],
    );
    assert_eq!(on_off_attribute(&device, on_off::ATTR_ON_OFF), Some(AttributeValue::Boolean(0)));
    assert_eq!(on_off_attribute(&device, on_off::ATTR_ON_TIME), Some(AttributeValue::Unsigned16(0)));
    assert!(device.transmitted().is_empty());
}

fn level(device: &Device) -> Option<AttributeValue> {
    device.get(level_control::CLUSTER, level_control::ATTR_CURRENT_LEVEL)
}

fn set_level(device: &mut Device, value: u8) {
    device
        .service
        .set_attribute(
            1,
            level_control::CLUSTER,
            ClusterRole::Server,
            level_control::ATTR_CURRENT_LEVEL,
            AttributeValue::Unsigned8(value),
        )
        .unwrap();
}

#[test]
fn level_moves_stop_at_limits() {
    let mut device = Device::new(Config::default(), StaticBindingTable::new());
    device.endpoint(vec![clusters::level_control::server()]);

    // down at 100 per second
    set_level(&mut device, 20);
    device.receive(level_control::CLUSTER, &[0x11, 0x01, level_control::CMD_MOVE, 0x01, 100]);
    assert_eq!(level(&device), Some(AttributeValue::Unsigned8(20)));
    assert_eq!(device.service.poll(100), Some(100));
    assert_eq!(level(&device), Some(AttributeValue::Unsigned8(10)));
    assert_eq!(device.service.poll(200), None);
    assert_eq!(level(&device), Some(AttributeValue::Unsigned8(level_control::LEVEL_MIN)));

    // up to the maximum
    device.service.poll(1000);
    set_level(&mut device, 240);
    device.receive(level_control::CLUSTER, &[0x11, 0x02, level_control::CMD_MOVE, 0x00, 100]);
    device.service.poll(1100);
    assert_eq!(level(&device), Some(AttributeValue::Unsigned8(250)));
    assert_eq!(device.service.poll(1200), None);
    assert_eq!(level(&device), Some(AttributeValue::Unsigned8(level_control::LEVEL_MAX)));

    // step up at the maximum stays there
    device.receive(
        level_control::CLUSTER,
        &[0x11, 0x03, level_control::CMD_STEP, 0x00, 10, 0x00, 0x00],
    );
    assert_eq!(level(&device), Some(AttributeValue::Unsigned8(level_control::LEVEL_MAX)));

    // step down by 10 over 0.2 s
    device.service.poll(2000);
    set_level(&mut device, 100);
    device.receive(
        level_control::CLUSTER,
        &[0x11, 0x04, level_control::CMD_STEP, 0x01, 10, 0x02, 0x00],
    );
    assert_eq!(
        device.get(level_control::CLUSTER, level_control::ATTR_REMAINING_TIME),
        Some(AttributeValue::Unsigned16(2))
    );
    device.service.poll(2100);
    assert_eq!(level(&device), Some(AttributeValue::Unsigned8(95)));
    assert_eq!(device.service.poll(2200), None);
    assert_eq!(level(&device), Some(AttributeValue::Unsigned8(90)));
    assert_eq!(
        device.get(level_control::CLUSTER, level_control::ATTR_REMAINING_TIME),
        Some(AttributeValue::Unsigned16(0))
    );
    assert!(device.transmitted().is_empty());
}

#[test]
fn new_level_command_cancels_running_move() {
    let mut device = Device::new(Config::default(), StaticBindingTable::new());
    device.endpoint(vec![clusters::level_control::server()]);

    set_level(&mut device, 200);
    device.receive(level_control::CLUSTER, &[0x11, 0x01, level_control::CMD_MOVE, 0x01, 100]);
    device.service.poll(100);
    assert_eq!(level(&device), Some(AttributeValue::Unsigned8(190)));

    // move to 50 at once replaces the move
    device.receive(
        level_control::CLUSTER,
        &[0x11, 0x02, level_control::CMD_MOVE_TO_LEVEL, 50, 0x00, 0x00],
    );
    assert_eq!(level(&device), Some(AttributeValue::Unsigned8(50)));
    assert_eq!(device.service.poll(200), None);
    assert_eq!(level(&device), Some(AttributeValue::Unsigned8(50)));

    // stop ends a move where it is
    device.service.poll(1000);
    set_level(&mut device, 100);
    device.receive(level_control::CLUSTER, &[0x11, 0x03, level_control::CMD_MOVE, 0x00, 10]);
    device.service.poll(1100);
    assert_eq!(level(&device), Some(AttributeValue::Unsigned8(101)));
    device.receive(level_control::CLUSTER, &[0x11, 0x04, level_control::CMD_STOP]);
    assert_eq!(device.service.poll(1200), None);
    device.service.poll(3000);
    assert_eq!(level(&device), Some(AttributeValue::Unsigned8(101)));
}

#[test]
fn identify_counts_down() {
    let mut device = Device::new(Config::default(), StaticBindingTable::new());
    device.endpoint(vec![clusters::identify::server()]);

    device.receive(identify::CLUSTER, &[0x11, 0x40, identify::CMD_IDENTIFY, 0x03, 0x00]);
    device.receive(identify::CLUSTER, &[0x11, 0x41, identify::CMD_IDENTIFY_QUERY]);
    assert_eq!(
        device.transmitted(),
        vec![(
            identify::CLUSTER,
            vec![0x19, 0x41, identify::CMD_IDENTIFY_QUERY_RESPONSE, 0x03, 0x00]
        )]
    );

    assert_eq!(device.service.poll(999), Some(1));
    assert_eq!(device.service.poll(1000), Some(1000));
    assert_eq!(
        device.get(identify::CLUSTER, identify::ATTR_IDENTIFY_TIME),
        Some(AttributeValue::Unsigned16(2))
    );
    device.service.poll(2000);
    assert_eq!(device.service.poll(3000), None);
    assert_eq!(
        device.get(identify::CLUSTER, identify::ATTR_IDENTIFY_TIME),
        Some(AttributeValue::Unsigned16(0))
    );

    // no answer once identifying ended
    device.receive(identify::CLUSTER, &[0x11, 0x42, identify::CMD_IDENTIFY_QUERY]);
    assert!(device.transmitted().is_empty());

    let times: Vec<u16> = device
        .events
        .borrow()
        .iter()
        .filter_map(|e| match e {
            DeviceEvent::IdentifyTime { time, .. } => Some(*time),
            _ => None,
        })
        .collect();
    assert_eq!(times, vec![3, 2, 1, 0]);
}

fn enrolled_zone() -> Device {
    let mut device = Device::new(Config::default(), StaticBindingTable::new());
    device.endpoint(vec![clusters::ias_zone::server(ias_zone::ZoneType::ContactSwitch)]);
    let mut write = vec![0x00, 0x10, 0x02, 0x10, 0x00, 0xf0];
    write.extend_from_slice(&CIE_IEEE.to_le_bytes());
    device.receive(ias_zone::CLUSTER, &write);
    device.receive(
        ias_zone::CLUSTER,
        &[0x11, 0x11, ias_zone::CMD_ZONE_ENROLL_RESPONSE, 0x00, 0x01],
    );
    assert_eq!(device.transmitted().len(), 2);
    device
}

fn set_zone_status(device: &mut Device, status: ZoneStatus, delay: u16) {
    let mut ctx = device.service.context();
    clusters::ias_zone::set_zone_status(&mut ctx, 1, status, delay).unwrap();
}

#[test]
fn zone_status_change_is_debounced() {
    let mut device = enrolled_zone();

    // alarm after half a second
    set_zone_status(&mut device, ZoneStatus::ALARM1, 2);
    assert_eq!(device.service.poll(200), Some(300));
    assert!(device.transmitted().is_empty());

    // replaced by a newer change due a quarter second later
    set_zone_status(&mut device, ZoneStatus::ALARM1 | ZoneStatus::TAMPER, 1);
    assert_eq!(device.service.poll(449), Some(1));
    assert!(device.transmitted().is_empty());
    assert_eq!(device.service.poll(450), None);
    assert_eq!(
        device.transmitted(),
        vec![(
            ias_zone::CLUSTER,
            vec![
                0x09,
                0x02,
                ias_zone::CMD_ZONE_STATUS_CHANGE_NOTIFICATION,
                0x05,
                0x00,
                0x00,
                0x01,
                0x01,
                0x00
            ]
        )]
    );
    device.service.poll(1000);
    assert!(device.transmitted().is_empty());
    assert_eq!(
        device.get(ias_zone::CLUSTER, ias_zone::ATTR_ZONE_STATUS),
        Some(AttributeValue::Bitmap16(0x0005))
    );
}

#[test]
fn zone_test_mode_ends_after_duration() {
    let mut device = enrolled_zone();
    device.service.poll(1000);

    // three seconds at sensitivity 5
    device.receive(
        ias_zone::CLUSTER,
        &[0x11, 0x30, ias_zone::CMD_INITIATE_TEST_MODE, 0x03, 0x05],
    );
    assert_eq!(
        device.get(ias_zone::CLUSTER, ias_zone::ATTR_CURRENT_ZONE_SENSITIVITY_LEVEL),
        Some(AttributeValue::Unsigned8(5))
    );
    device.service.poll(1000);
    assert_eq!(
        device.transmitted(),
        vec![(
            ias_zone::CLUSTER,
            vec![0x09, 0x02, ias_zone::CMD_ZONE_STATUS_CHANGE_NOTIFICATION, 0x00, 0x01, 0x00, 0x01, 0x00, 0x00]
        )]
    );

    assert_eq!(device.service.poll(3999), Some(1));
    assert!(device.transmitted().is_empty());
    device.service.poll(4000);
    assert_eq!(
        device.transmitted(),
        vec![(
            ias_zone::CLUSTER,
            vec![0x09, 0x03, ias_zone::CMD_ZONE_STATUS_CHANGE_NOTIFICATION, 0x00, 0x00, 0x00, 0x01, 0x00, 0x00]
        )]
    );
    assert!(device
        .events
        .borrow()
        .contains(&DeviceEvent::InitiateNormalMode { endpoint: 1 }));
}

#[test]
fn time_writable_unless_master() {
    let mut device = Device::new(Config::default(), StaticBindingTable::new());
    device.endpoint(vec![clusters::time::server(TimeStatus::empty())]);

    device.receive(
        time::CLUSTER,
        &[0x00, 0x70, 0x02, 0x00, 0x00, 0xe2, 0xe8, 0x03, 0x00, 0x00],
    );
    assert_eq!(device.transmitted(), vec![(time::CLUSTER, vec![0x18, 0x70, 0x04, 0x00])]);
    assert_eq!(device.get(time::CLUSTER, time::ATTR_TIME), Some(AttributeValue::UtcTime(1000)));
    assert_eq!(
        device.get(time::CLUSTER, time::ATTR_LAST_SET_TIME),
        Some(AttributeValue::UtcTime(1000))
    );
    assert_eq!(
        device.get(time::CLUSTER, time::ATTR_STANDARD_TIME),
        Some(AttributeValue::Unsigned32(1000))
    );

    device
        .service
        .set_attribute(
            1,
            time::CLUSTER,
            ClusterRole::Server,
            time::ATTR_TIME_STATUS,
            AttributeValue::Bitmap8(TimeStatus::MASTER.bits()),
        )
        .unwrap();
    device.receive(
        time::CLUSTER,
        &[0x00, 0x71, 0x02, 0x00, 0x00, 0xe2, 0xd0, 0x07, 0x00, 0x00],
    );
    assert_eq!(
        device.transmitted(),
        vec![(time::CLUSTER, vec![0x18, 0x71, 0x04, 0x88, 0x00, 0x00])]
    );
    assert_eq!(device.get(time::CLUSTER, time::ATTR_TIME), Some(AttributeValue::UtcTime(1000)));
    assert_eq!(
        device.get(time::CLUSTER, time::ATTR_LAST_SET_TIME),
        Some(AttributeValue::UtcTime(1000))
    );
}
