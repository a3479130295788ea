//! # IAS Zone Cluster

use super::ClusterCommand;
use crate::utils::{Reader, Writer};
use crate::Error;

/// IAS zone cluster
pub const CLUSTER: u16 = 0x0500;
/// Cluster revision declared when nothing else is configured
pub const CLUSTER_REVISION: u16 = 2;

/// Zone state, enrolled or not
pub const ATTR_ZONE_STATE: u16 = 0x0000;
/// Zone type
pub const ATTR_ZONE_TYPE: u16 = 0x0001;
/// Zone status bitmap
pub const ATTR_ZONE_STATUS: u16 = 0x0002;
/// Address of the CIE the zone enrolls with
pub const ATTR_IAS_CIE_ADDRESS: u16 = 0x0010;
/// Zone identifier assigned by the CIE
pub const ATTR_ZONE_ID: u16 = 0x0011;
/// Number of sensitivity levels supported
pub const ATTR_NUMBER_OF_ZONE_SENSITIVITY_LEVELS: u16 = 0x0012;
/// Current sensitivity level
pub const ATTR_CURRENT_ZONE_SENSITIVITY_LEVEL: u16 = 0x0013;

/// Zone identifier before enrollment
pub const ZONE_ID_DEFAULT: u8 = 0xff;

/// Zone state, not enrolled
pub const ZONE_STATE_NOT_ENROLLED: u8 = 0x00;
/// Zone state, enrolled
pub const ZONE_STATE_ENROLLED: u8 = 0x01;

/// Zone enroll response, received by the server
pub const CMD_ZONE_ENROLL_RESPONSE: u8 = 0x00;
/// Initiate normal operation mode, received by the server
pub const CMD_INITIATE_NORMAL_OPERATION_MODE: u8 = 0x01;
/// Initiate test mode, received by the server
pub const CMD_INITIATE_TEST_MODE: u8 = 0x02;
/// Zone status change notification, received by the client
pub const CMD_ZONE_STATUS_CHANGE_NOTIFICATION: u8 = 0x00;
/// Zone enroll request, received by the client
pub const CMD_ZONE_ENROLL_REQUEST: u8 = 0x01;

bitflags! {
    /// Zone status
    #[derive(Clone, Copy, Debug, PartialEq, Eq)]
    pub struct ZoneStatus: u16 {
        /// Alarm 1
        const ALARM1 = 0x0001;
        /// Alarm 2
        const ALARM2 = 0x0002;
        /// Tampered
        const TAMPER = 0x0004;
        /// Low battery
        const BATTERY = 0x0008;
        /// Supervision reports are sent
        const SUPERVISION_REPORTS = 0x0010;
        /// Restore reports are sent
        const RESTORE_REPORTS = 0x0020;
        /// Trouble or failure
        const TROUBLE = 0x0040;
        /// AC mains fault
        const AC_MAINS = 0x0080;
        /// Sensor is in test mode
        const TEST = 0x0100;
        /// Battery defect
        const BATTERY_DEFECT = 0x0200;
    }
}

extended_enum!(
    /// Zone type
    ZoneType, u16,
    /// Standard CIE
    StandardCie => 0x0000,
    /// Motion sensor
    MotionSensor => 0x000d,
    /// Contact switch
    ContactSwitch => 0x0015,
    /// Fire sensor
    FireSensor => 0x0028,
    /// Water sensor
    WaterSensor => 0x002a,
    /// Carbon monoxide sensor
    CarbonMonoxideSensor => 0x002b,
    /// Personal emergency device
    PersonalEmergencyDevice => 0x002c,
    /// Vibration or movement sensor
    VibrationMovementSensor => 0x002d,
    /// Remote control
    RemoteControl => 0x010f,
    /// Key fob
    KeyFob => 0x0115,
    /// Keypad
    Keypad => 0x021d,
    /// Standard warning device
    StandardWarningDevice => 0x0225,
    /// Glass break sensor
    GlassBreakSensor => 0x0226,
    /// Security repeater
    SecurityRepeater => 0x0229,
    /// Invalid zone type
    Invalid => 0xffff,
);

extended_enum!(
    /// Zone enroll response code
    EnrollResponseCode, u8,
    /// Enrolled
    Success => 0x00,
    /// Zone type not supported
    NotSupported => 0x01,
    /// CIE does not permit new zones
    NoEnrollPermit => 0x02,
    /// CIE has reached its zone limit
    TooManyZones => 0x03,
);

/// Commands received by the IAS zone server
#[derive(Clone, Debug, PartialEq)]
pub enum IasZoneCommand {
    /// Answer to a zone enroll request
    ZoneEnrollResponse {
        /// Result
        code: EnrollResponseCode,
        /// Zone identifier assigned by the CIE
        zone_id: u8,
    },
    /// Leave test mode
    InitiateNormalOperationMode,
    /// Enter test mode
    InitiateTestMode {
        /// Duration in seconds
        duration: u8,
        /// Sensitivity level used while testing
        sensitivity: u8,
    },
}

impl ClusterCommand for IasZoneCommand {
    fn identifier(&self) -> u8 {
        match self {
            IasZoneCommand::ZoneEnrollResponse { .. } => CMD_ZONE_ENROLL_RESPONSE,
            IasZoneCommand::InitiateNormalOperationMode => CMD_INITIATE_NORMAL_OPERATION_MODE,
            IasZoneCommand::InitiateTestMode { .. } => CMD_INITIATE_TEST_MODE,
        }
    }

    fn pack(&self, data: &mut [u8]) -> Result<usize, Error> {
        let mut w = Writer::new(data);
        match self {
            IasZoneCommand::ZoneEnrollResponse { code, zone_id } => {
                w.u8(u8::from(*code))?;
                w.u8(*zone_id)?;
            }
            IasZoneCommand::InitiateNormalOperationMode => (),
            IasZoneCommand::InitiateTestMode {
                duration,
                sensitivity,
            } => {
                w.u8(*duration)?;
                w.u8(*sensitivity)?;
            }
        }
        Ok(w.used())
    }

    fn unpack(identifier: u8, data: &[u8]) -> Result<Self, Error> {
        let mut r = Reader::new(data);
        match identifier {
            CMD_ZONE_ENROLL_RESPONSE => Ok(IasZoneCommand::ZoneEnrollResponse {
                code: EnrollResponseCode::try_from(r.u8()?)?,
                zone_id: r.u8()?,
            }),
            CMD_INITIATE_NORMAL_OPERATION_MODE => Ok(IasZoneCommand::InitiateNormalOperationMode),
            CMD_INITIATE_TEST_MODE => Ok(IasZoneCommand::InitiateTestMode {
                duration: r.u8()?,
                sensitivity: r.u8()?,
            }),
            _ => Err(Error::UnknownCommand),
        }
    }
}

/// Commands received by the IAS zone client
#[derive(Clone, Debug, PartialEq)]
pub enum IasZoneClientCommand {
    /// The zone status changed
    ZoneStatusChangeNotification {
        /// New zone status
        zone_status: ZoneStatus,
        /// Extended status, reserved
        extended_status: u8,
        /// Zone identifier
        zone_id: u8,
        /// Time since the change, in quarter seconds
        delay: u16,
    },
    /// A zone asks to be enrolled
    ZoneEnrollRequest {
        /// Zone type
        zone_type: u16,
        /// Manufacturer of the zone device
        manufacturer_code: u16,
    },
}

impl ClusterCommand for IasZoneClientCommand {
    fn identifier(&self) -> u8 {
        match self {
            IasZoneClientCommand::ZoneStatusChangeNotification { .. } => {
                CMD_ZONE_STATUS_CHANGE_NOTIFICATION
            }
            IasZoneClientCommand::ZoneEnrollRequest { .. } => CMD_ZONE_ENROLL_REQUEST,
        }
    }

    fn pack(&self, data: &mut [u8]) -> Result<usize, Error> {
        let mut w = Writer::new(data);
        match self {
            IasZoneClientCommand::ZoneStatusChangeNotification {
                zone_status,
                extended_status,
                zone_id,
                delay,
            } => {
                w.u16(zone_status.bits())?;
                w.u8(*extended_status)?;
                w.u8(*zone_id)?;
                w.u16(*delay)?;
            }
            IasZoneClientCommand::ZoneEnrollRequest {
                zone_type,
                manufacturer_code,
            } => {
                w.u16(*zone_type)?;
                w.u16(*manufacturer_code)?;
            }
        }
        Ok(w.used())
    }

    fn unpack(identifier: u8, data: &[u8]) -> Result<Self, Error> {
        let mut r = Reader::new(data);
        match identifier {
            CMD_ZONE_STATUS_CHANGE_NOTIFICATION => {
                let zone_status = ZoneStatus::from_bits_retain(r.u16()?);
                let extended_status = r.u8()?;
                let zone_id = r.u8()?;
                // Older zones leave out the delay
                let delay = if r.remaining() >= 2 { r.u16()? } else { 0 };
                Ok(IasZoneClientCommand::ZoneStatusChangeNotification {
                    zone_status,
                    extended_status,
                    zone_id,
                    delay,
                })
            }
            CMD_ZONE_ENROLL_REQUEST => Ok(IasZoneClientCommand::ZoneEnrollRequest {
                zone_type: r.u16()?,
                manufacturer_code: r.u16()?,
            }),
            _ => Err(Error::UnknownCommand),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn enroll_response() {
        let cmd = IasZoneCommand::unpack(CMD_ZONE_ENROLL_RESPONSE, &[0x00, 0x01]).unwrap();
        assert_eq!(
            cmd,
            IasZoneCommand::ZoneEnrollResponse {
                code: EnrollResponseCode::Success,
                zone_id: 1
            }
        );
        assert_eq!(
            IasZoneCommand::unpack(CMD_ZONE_ENROLL_RESPONSE, &[0x07, 0x01]),
            Err(Error::InvalidValue)
        );
    }

    #[test]
    fn enroll_request() {
        let cmd = IasZoneClientCommand::ZoneEnrollRequest {
            zone_type: u16::from(ZoneType::ContactSwitch),
            manufacturer_code: 0x1234,
        };
        let mut data = [0u8; 8];
        let used = cmd.pack(&mut data).unwrap();
        assert_eq!(data[..used], [0x15, 0x00, 0x34, 0x12]);
        assert_eq!(
            IasZoneClientCommand::unpack(CMD_ZONE_ENROLL_REQUEST, &data[..used]).unwrap(),
            cmd
        );
    }

    #[test]
    fn status_change_notification() {
        let data = [0x05, 0x01, 0x00, 0x03, 0x04, 0x00];
        let cmd =
            IasZoneClientCommand::unpack(CMD_ZONE_STATUS_CHANGE_NOTIFICATION, &data).unwrap();
        assert_eq!(
            cmd,
            IasZoneClientCommand::ZoneStatusChangeNotification {
                zone_status: ZoneStatus::ALARM1 | ZoneStatus::TAMPER | ZoneStatus::TEST,
                extended_status: 0,
                zone_id: 3,
                delay: 4,
            }
        );
        let short =
            IasZoneClientCommand::unpack(CMD_ZONE_STATUS_CHANGE_NOTIFICATION, &data[..4]).unwrap();
        assert_eq!(short.identifier(), CMD_ZONE_STATUS_CHANGE_NOTIFICATION);
    }
}
