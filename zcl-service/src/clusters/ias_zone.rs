//! IAS Zone cluster
//!
//! The server enrolls with the CIE whose address is written to it and
//! notifies zone status changes once enrolled. A change is sent after its
//! delay, counted in quarter seconds, unless a newer change supersedes it.
//! The client hands out zone identifiers to the zones asking for one.

use std::cell::RefCell;
use std::collections::HashMap;

use zcl_data::cluster_library::ias_zone::{
    EnrollResponseCode, IasZoneClientCommand, IasZoneCommand, ZoneStatus, ZoneType,
    ATTR_CURRENT_ZONE_SENSITIVITY_LEVEL, ATTR_IAS_CIE_ADDRESS, ATTR_ZONE_ID, ATTR_ZONE_STATE,
    ATTR_ZONE_STATUS, ATTR_ZONE_TYPE, CLUSTER, CMD_INITIATE_NORMAL_OPERATION_MODE,
    CMD_INITIATE_TEST_MODE, CMD_ZONE_ENROLL_REQUEST, CMD_ZONE_ENROLL_RESPONSE,
    CMD_ZONE_STATUS_CHANGE_NOTIFICATION, ZONE_ID_DEFAULT, ZONE_STATE_ENROLLED,
    ZONE_STATE_NOT_ENROLLED,
};
use zcl_data::cluster_library::{AttributeValue, ClusterLibraryStatus, ClusterRole, ENDPOINT_BROADCAST};
use zcl_data::{Address, ExtendedAddress, ShortAddress};

use super::parse;
use crate::binding::BindingDestination;
use crate::core::Context;
use crate::event::DeviceEvent;
use crate::handler::{ClusterHandler, CommandOutcome, WriteOrigin};
use crate::header::ParsedHeader;
use crate::scheduler::ClusterJob;
use crate::store::{Access, AttributeDefinition, ClusterDefinition};
use crate::transport::DestinationAddress;

/// Endpoint of the CIE, internal
pub const ATTR_CIE_ENDPOINT: u16 = 0xe001;
/// Short address of the CIE, internal
pub const ATTR_CIE_SHORT_ADDRESS: u16 = 0xe002;

const SHORT_ADDRESS_UNKNOWN: u16 = 0xffff;
const QUARTER_SECOND_MS: u32 = 250;
/// Generation slot of the test mode timer
const TEST_MODE_SLOT: u16 = 0x0001;
/// Generation slot of pending status notifications
const NOTIFY_SLOT: u16 = ATTR_ZONE_STATUS;

/// IAS zone server cluster of a zone of type `zone_type`
///
/// The enrollment is stored once for the device.
pub fn server(zone_type: ZoneType) -> ClusterDefinition {
    let enrollment = Access::RO | Access::SINGLETON;
    let internal = Access::RW | Access::INTERNAL | Access::SINGLETON;
    ClusterDefinition::server(CLUSTER)
        .attribute(AttributeDefinition::new(
            ATTR_ZONE_STATE,
            enrollment,
            AttributeValue::Enumeration8(ZONE_STATE_NOT_ENROLLED),
        ))
        .attribute(AttributeDefinition::new(
            ATTR_ZONE_TYPE,
            Access::RO,
            AttributeValue::Enumeration16(u16::from(zone_type)),
        ))
        .attribute(AttributeDefinition::new(
            ATTR_ZONE_STATUS,
            Access::RP,
            AttributeValue::Bitmap16(0),
        ))
        .attribute(AttributeDefinition::new(
            ATTR_IAS_CIE_ADDRESS,
            Access::RW | Access::SINGLETON,
            AttributeValue::IeeeAddress(0),
        ))
        .attribute(AttributeDefinition::new(
            ATTR_ZONE_ID,
            enrollment,
            AttributeValue::Unsigned8(ZONE_ID_DEFAULT),
        ))
        .attribute(AttributeDefinition::new(
            ATTR_CURRENT_ZONE_SENSITIVITY_LEVEL,
            Access::RW,
            AttributeValue::Unsigned8(0),
        ))
        .attribute(AttributeDefinition::new(
            ATTR_CIE_ENDPOINT,
            internal,
            AttributeValue::Unsigned8(ENDPOINT_BROADCAST),
        ))
        .attribute(AttributeDefinition::new(
            ATTR_CIE_SHORT_ADDRESS,
            internal,
            AttributeValue::Unsigned16(SHORT_ADDRESS_UNKNOWN),
        ))
}

/// IAS zone client cluster, as hosted by a CIE
pub fn client() -> ClusterDefinition {
    ClusterDefinition::client(CLUSTER)
}

fn get(ctx: &Context, endpoint: u8, attribute: u16) -> Option<i128> {
    ctx.get_integer(endpoint, CLUSTER, ClusterRole::Server, attribute)
}

fn set(ctx: &mut Context, endpoint: u8, attribute: u16, value: i128) -> Result<(), ClusterLibraryStatus> {
    if !ctx.has_attribute(endpoint, CLUSTER, ClusterRole::Server, attribute) {
        return Ok(());
    }
    ctx.set_integer(endpoint, CLUSTER, ClusterRole::Server, attribute, value)
}

/// Is the zone on the endpoint enrolled
pub fn is_enrolled(ctx: &Context, endpoint: u8) -> bool {
    get(ctx, endpoint, ATTR_ZONE_STATE) == Some(i128::from(ZONE_STATE_ENROLLED))
}

/// Current zone status of an endpoint
pub fn zone_status(ctx: &Context, endpoint: u8) -> ZoneStatus {
    get(ctx, endpoint, ATTR_ZONE_STATUS)
        .and_then(|v| u16::try_from(v).ok())
        .map(ZoneStatus::from_bits_retain)
        .unwrap_or_else(ZoneStatus::empty)
}

/// Where the CIE is reached
fn cie_destination(ctx: &Context, endpoint: u8) -> Option<BindingDestination> {
    let cie_endpoint = get(ctx, endpoint, ATTR_CIE_ENDPOINT)
        .and_then(|v| u8::try_from(v).ok())
        .unwrap_or(ENDPOINT_BROADCAST);
    let short = get(ctx, endpoint, ATTR_CIE_SHORT_ADDRESS)
        .and_then(|v| u16::try_from(v).ok())
        .unwrap_or(SHORT_ADDRESS_UNKNOWN);
    let address = if short != SHORT_ADDRESS_UNKNOWN {
        DestinationAddress::Short(ShortAddress::new(short))
    } else {
        let extended = ctx
            .get(endpoint, CLUSTER, ClusterRole::Server, ATTR_IAS_CIE_ADDRESS)
            .and_then(|v| v.as_unsigned())
            .unwrap_or(0);
        if extended == 0 {
            return None;
        }
        DestinationAddress::Extended(ExtendedAddress::new(extended))
    };
    Some(BindingDestination {
        address,
        endpoint: cie_endpoint,
    })
}

fn send_enroll_request(ctx: &mut Context, endpoint: u8) {
    let destination = match cie_destination(ctx, endpoint) {
        Some(destination) => destination,
        None => return,
    };
    let zone_type = get(ctx, endpoint, ATTR_ZONE_TYPE)
        .and_then(|v| u16::try_from(v).ok())
        .unwrap_or(u16::from(ZoneType::Invalid));
    let command = IasZoneClientCommand::ZoneEnrollRequest {
        zone_type,
        manufacturer_code: ctx.core.config.manufacturer_code,
    };
    log::info!("Zone {} enrolling with {}", endpoint, destination.address);
    if let Err(error) =
        ctx.send_cluster_command(endpoint, destination, CLUSTER, ClusterRole::Server, None, command, None)
    {
        log::warn!("Zone enroll request from {} failed, {}", endpoint, error);
    }
}

/// Change the zone status, the CIE is notified after `delay` quarter seconds
pub fn set_zone_status(
    ctx: &mut Context,
    endpoint: u8,
    status: ZoneStatus,
    delay: u16,
) -> Result<(), ClusterLibraryStatus> {
    if zone_status(ctx, endpoint) == status {
        return Ok(());
    }
    ctx.set(
        endpoint,
        CLUSTER,
        ClusterRole::Server,
        ATTR_ZONE_STATUS,
        AttributeValue::Bitmap16(status.bits()),
    )?;
    let generation = ctx.core.generations.begin(endpoint, CLUSTER, NOTIFY_SLOT);
    ctx.cancel_jobs(endpoint, CLUSTER, |j| matches!(j, ClusterJob::ZoneNotify { .. }));
    ctx.schedule_job(
        endpoint,
        CLUSTER,
        ClusterRole::Server,
        u32::from(delay) * QUARTER_SECOND_MS,
        ClusterJob::ZoneNotify { generation, delay },
    );
    Ok(())
}

/// Set bits of the zone status
pub fn set_zone_status_bits(
    ctx: &mut Context,
    endpoint: u8,
    bits: ZoneStatus,
    delay: u16,
) -> Result<(), ClusterLibraryStatus> {
    let status = zone_status(ctx, endpoint) | bits;
    set_zone_status(ctx, endpoint, status, delay)
}

/// Clear bits of the zone status
pub fn clear_zone_status_bits(
    ctx: &mut Context,
    endpoint: u8,
    bits: ZoneStatus,
    delay: u16,
) -> Result<(), ClusterLibraryStatus> {
    let status = zone_status(ctx, endpoint) - bits;
    set_zone_status(ctx, endpoint, status, delay)
}

fn notify_status(ctx: &mut Context, endpoint: u8, generation: u32, delay: u16) {
    if !ctx.core.generations.is_current(endpoint, CLUSTER, NOTIFY_SLOT, generation) {
        return;
    }
    if !is_enrolled(ctx, endpoint) {
        log::debug!("Zone {} not enrolled, status change not sent", endpoint);
        return;
    }
    let destination = match cie_destination(ctx, endpoint) {
        Some(destination) => destination,
        None => return,
    };
    let zone_id = get(ctx, endpoint, ATTR_ZONE_ID)
        .and_then(|v| u8::try_from(v).ok())
        .unwrap_or(ZONE_ID_DEFAULT);
    let command = IasZoneClientCommand::ZoneStatusChangeNotification {
        zone_status: zone_status(ctx, endpoint),
        extended_status: 0,
        zone_id,
        delay,
    };
    if let Err(error) =
        ctx.send_cluster_command(endpoint, destination, CLUSTER, ClusterRole::Server, None, command, None)
    {
        log::warn!("Zone status change from {} failed, {}", endpoint, error);
    }
}

fn enroll_response(
    ctx: &mut Context,
    endpoint: u8,
    header: &ParsedHeader,
    code: EnrollResponseCode,
    zone_id: u8,
) -> Result<(), ClusterLibraryStatus> {
    set(ctx, endpoint, ATTR_CIE_ENDPOINT, i128::from(header.source_endpoint))?;
    if let Some(short) = header.source.short() {
        set(ctx, endpoint, ATTR_CIE_SHORT_ADDRESS, i128::from(u16::from(short)))?;
    }
    if code != EnrollResponseCode::Success {
        log::warn!("Zone {} enrollment refused, {:?}", endpoint, code);
        set(ctx, endpoint, ATTR_ZONE_STATE, i128::from(ZONE_STATE_NOT_ENROLLED))?;
        return set(ctx, endpoint, ATTR_ZONE_ID, i128::from(ZONE_ID_DEFAULT));
    }
    set(ctx, endpoint, ATTR_ZONE_ID, i128::from(zone_id))?;
    set(ctx, endpoint, ATTR_ZONE_STATE, i128::from(ZONE_STATE_ENROLLED))?;
    log::info!("Zone {} enrolled as {}", endpoint, zone_id);
    ctx.notify(DeviceEvent::ZoneEnrolled { endpoint, zone_id });
    Ok(())
}

fn initiate_test_mode(
    ctx: &mut Context,
    endpoint: u8,
    duration: u8,
    sensitivity: u8,
) -> Result<(), ClusterLibraryStatus> {
    set(ctx, endpoint, ATTR_CURRENT_ZONE_SENSITIVITY_LEVEL, i128::from(sensitivity))?;
    set_zone_status_bits(ctx, endpoint, ZoneStatus::TEST, 0)?;
    let generation = ctx.core.generations.begin(endpoint, CLUSTER, TEST_MODE_SLOT);
    ctx.schedule_job(
        endpoint,
        CLUSTER,
        ClusterRole::Server,
        u32::from(duration) * 1000,
        ClusterJob::TestModeEnd { generation },
    );
    ctx.notify(DeviceEvent::InitiateTestMode {
        endpoint,
        duration,
        sensitivity,
    });
    Ok(())
}

fn initiate_normal_mode(ctx: &mut Context, endpoint: u8) -> Result<(), ClusterLibraryStatus> {
    ctx.core.generations.begin(endpoint, CLUSTER, TEST_MODE_SLOT);
    ctx.cancel_jobs(endpoint, CLUSTER, |j| matches!(j, ClusterJob::TestModeEnd { .. }));
    clear_zone_status_bits(ctx, endpoint, ZoneStatus::TEST, 0)?;
    ctx.notify(DeviceEvent::InitiateNormalMode { endpoint });
    Ok(())
}

/// IAS Zone cluster server
pub struct IasZoneServer;

impl ClusterHandler for IasZoneServer {
    fn cluster(&self) -> u16 {
        CLUSTER
    }

    fn role(&self) -> ClusterRole {
        ClusterRole::Server
    }

    fn write_hook(
        &self,
        ctx: &mut Context,
        endpoint: u8,
        attribute: u16,
        value: &AttributeValue,
        _manufacturer: Option<u16>,
        origin: &WriteOrigin,
    ) {
        if attribute != ATTR_IAS_CIE_ADDRESS {
            return;
        }
        let result = match origin {
            WriteOrigin::Remote { source, endpoint: cie_endpoint } => {
                let short = source
                    .short()
                    .map(u16::from)
                    .unwrap_or(SHORT_ADDRESS_UNKNOWN);
                set(ctx, endpoint, ATTR_CIE_ENDPOINT, i128::from(*cie_endpoint))
                    .and_then(|_| set(ctx, endpoint, ATTR_CIE_SHORT_ADDRESS, i128::from(short)))
            }
            WriteOrigin::Local => Ok(()),
        };
        if let Err(status) = result {
            log::warn!("CIE of zone {} not stored, {:?}", endpoint, status);
        }
        if value.as_unsigned().unwrap_or(0) != 0 && !is_enrolled(ctx, endpoint) {
            send_enroll_request(ctx, endpoint);
        }
    }

    fn handle_command(
        &self,
        ctx: &mut Context,
        endpoint: u8,
        header: &ParsedHeader,
        payload: &[u8],
    ) -> CommandOutcome {
        let command = match parse::<IasZoneCommand>(header, payload) {
            Ok(command) => command,
            Err(outcome) => return outcome,
        };
        let result = match command {
            IasZoneCommand::ZoneEnrollResponse { code, zone_id } => {
                enroll_response(ctx, endpoint, header, code, zone_id)
            }
            IasZoneCommand::InitiateNormalOperationMode => initiate_normal_mode(ctx, endpoint),
            IasZoneCommand::InitiateTestMode {
                duration,
                sensitivity,
            } => initiate_test_mode(ctx, endpoint, duration, sensitivity),
        };
        result.into()
    }

    fn received_commands(&self) -> &'static [u8] {
        &[
            CMD_ZONE_ENROLL_RESPONSE,
            CMD_INITIATE_NORMAL_OPERATION_MODE,
            CMD_INITIATE_TEST_MODE,
        ]
    }

    fn generated_commands(&self) -> &'static [u8] {
        &[CMD_ZONE_STATUS_CHANGE_NOTIFICATION, CMD_ZONE_ENROLL_REQUEST]
    }

    fn run_job(&self, ctx: &mut Context, endpoint: u8, job: ClusterJob) {
        match job {
            ClusterJob::ZoneNotify { generation, delay } => notify_status(ctx, endpoint, generation, delay),
            ClusterJob::TestModeEnd { generation } => {
                if ctx
                    .core
                    .generations
                    .is_current(endpoint, CLUSTER, TEST_MODE_SLOT, generation)
                {
                    if let Err(status) = initiate_normal_mode(ctx, endpoint) {
                        log::warn!("Zone {} test mode end failed, {:?}", endpoint, status);
                    }
                }
            }
            _ => (),
        }
    }
}

/// IAS Zone cluster client
#[derive(Default)]
pub struct IasZoneClient {
    /// Zone identifiers given out, per client endpoint and zone
    zones: RefCell<HashMap<(u8, Address), u8>>,
}

impl IasZoneClient {
    /// Zone identifier for a zone, the one given before or the lowest free
    fn allocate(&self, endpoint: u8, zone: Address) -> Option<u8> {
        let mut zones = self.zones.borrow_mut();
        if let Some(zone_id) = zones.get(&(endpoint, zone)) {
            return Some(*zone_id);
        }
        let zone_id = (0..ZONE_ID_DEFAULT).find(|id| !zones.iter().any(|((e, _), z)| *e == endpoint && z == id))?;
        zones.insert((endpoint, zone), zone_id);
        Some(zone_id)
    }
}

impl ClusterHandler for IasZoneClient {
    fn cluster(&self) -> u16 {
        CLUSTER
    }

    fn role(&self) -> ClusterRole {
        ClusterRole::Client
    }

    fn handle_command(
        &self,
        ctx: &mut Context,
        endpoint: u8,
        header: &ParsedHeader,
        payload: &[u8],
    ) -> CommandOutcome {
        let command = match parse::<IasZoneClientCommand>(header, payload) {
            Ok(command) => command,
            Err(outcome) => return outcome,
        };
        match command {
            IasZoneClientCommand::ZoneStatusChangeNotification {
                zone_status,
                zone_id,
                delay,
                ..
            } => {
                ctx.notify(DeviceEvent::ZoneStatusChange {
                    source: header.source,
                    endpoint,
                    zone_status: zone_status.bits(),
                    zone_id,
                    delay,
                });
                CommandOutcome::Handled
            }
            IasZoneClientCommand::ZoneEnrollRequest {
                zone_type,
                manufacturer_code,
            } => {
                let (code, zone_id) = match self.allocate(endpoint, header.source) {
                    Some(zone_id) => (EnrollResponseCode::Success, zone_id),
                    None => (EnrollResponseCode::TooManyZones, ZONE_ID_DEFAULT),
                };
                ctx.notify(DeviceEvent::ZoneEnrollRequest {
                    source: header.source,
                    endpoint,
                    zone_type,
                    manufacturer_code,
                    zone_id,
                });
                let response = IasZoneCommand::ZoneEnrollResponse { code, zone_id };
                match ctx.reply_cluster(header, endpoint, &response) {
                    Ok(()) => CommandOutcome::Handled,
                    Err(error) => {
                        log::warn!("Zone enroll response to {} failed, {}", header.source, error);
                        CommandOutcome::HandledErr(ClusterLibraryStatus::Failure)
                    }
                }
            }
        }
    }

    fn received_commands(&self) -> &'static [u8] {
        &[CMD_ZONE_STATUS_CHANGE_NOTIFICATION, CMD_ZONE_ENROLL_REQUEST]
    }

    fn generated_commands(&self) -> &'static [u8] {
        &[
            CMD_ZONE_ENROLL_RESPONSE,
            CMD_INITIATE_NORMAL_OPERATION_MODE,
            CMD_INITIATE_TEST_MODE,
        ]
    }
}
