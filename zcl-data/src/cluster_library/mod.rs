//! # Cluster Library (ZCL)

mod attribute;
pub mod basic;
pub mod color_control;
pub mod commands;
mod frame;
pub mod ias_zone;
pub mod identify;
pub mod level_control;
pub mod on_off;
pub mod time;

pub use attribute::{
    AttributeDataType, AttributeValue, CompositeValue, DataTypeClass, UNKNOWN_REVISION,
};
pub use commands::{Command, GeneralCommandIdentifier};
pub use frame::{
    peek_sequence_and_command, ClusterLibraryHeader, Direction, FrameControl, FrameType,
    HEADER_SIZE, HEADER_SIZE_MANUFACTURER,
};

use crate::utils::{Reader, Writer};
use crate::Error;

/// 16-bit attribute identifier
pub type AttributeIdentifier = u16;

/// Global attribute, cluster revision, present in every cluster
pub const ATTR_CLUSTER_REVISION: AttributeIdentifier = 0xfffd;
/// Global attribute, attribute reporting status
pub const ATTR_REPORTING_STATUS: AttributeIdentifier = 0xfffe;

/// Manufacturer code used for attributes and commands that are not manufacturer specific
pub const MANUFACTURER_CODE_NONE: u16 = 0xffff;

/// Lowest cluster revision, used when nothing better is known
pub const CLUSTER_REVISION_MIN: u16 = 1;
/// Default cluster revision for clusters that do not declare one
pub const CLUSTER_REVISION_DEFAULT: u16 = 4;

/// Endpoint zero, reserved for the device profile
pub const ENDPOINT_NONE: u8 = 0x00;
/// Broadcast endpoint
pub const ENDPOINT_BROADCAST: u8 = 0xff;

extended_enum!(
    /// Cluster library status codes
    ClusterLibraryStatus, u8,
    /// Operation was successful.
    Success => 0x00,
    /// Operation was not successful.
    Failure => 0x01,
    /// The sender of the command does not have authorisation to carry out this command.
    NotAuthorised => 0x7e,
    /// A reserved field/subfield/bit contains a non-zero value.
    ReservedFieldNotZero => 0x7f,
    /// The command appears to contain the wrong fields. Command not carried out.
    MalformedCommand => 0x80,
    /// The specified cluster command is not supported on the device. Command not carried out.
    UnsupportedClusterCommand => 0x81,
    /// The specified general ZCL command is not supported on the device.
    UnsupportedGeneralCommand => 0x82,
    /// A manufacturer specific cluster command with an unknown manufacturer code, or not supported.
    UnsupportedManufacturerClusterCommand => 0x83,
    /// A manufacturer specific general command with an unknown manufacturer code, or not supported.
    UnsupportedManufacturerGeneralCommand => 0x84,
    /// At least one field of the command contains an incorrect value.
    InvalidField => 0x85,
    /// The specified attribute does not exist on the device.
    UnsupportedAttribute => 0x86,
    /// Out of range error, or set to a reserved value. Attribute keeps its old value.
    InvalidValue => 0x87,
    /// Attempt to write a read only attribute.
    ReadOnly => 0x88,
    /// An operation failed due to an insufficient amount of free space available.
    InsufficientSpace => 0x89,
    /// An attempt to create a table entry failed due to a duplicate entry already being present.
    DuplicateExists => 0x8a,
    /// The requested information (e.g., table entry) could not be found.
    NotFound => 0x8b,
    /// Periodic reports cannot be issued for this attribute.
    UnreportableAttribute => 0x8c,
    /// The data type given for an attribute is incorrect. Command not carried out.
    InvalidDataType => 0x8d,
    /// The selector for an attribute is incorrect.
    InvalidSelector => 0x8e,
    /// A request has been made to read an attribute that the requestor is not authorised to read.
    WriteOnly => 0x8f,
    /// Setting the requested values would put the device in an inconsistent state on startup.
    InconsistentStartupState => 0x90,
    /// An attempt has been made to write an attribute that is defined using an out-of-band method.
    DefinedOutOfBand => 0x91,
    /// The supplied values (e.g., contents of table cells) are inconsistent.
    Inconsistent => 0x92,
    /// The credentials presented by the device sending the command are not sufficient.
    ActionDenied => 0x93,
    /// The exchange was aborted due to excessive response time.
    Timeout => 0x94,
    /// Failed case when a client or a server decides to abort the upgrade process.
    Abort => 0x95,
    /// Invalid OTA upgrade image.
    InvalidImage => 0x96,
    /// Server does not have data block available yet.
    WaitForData => 0x97,
    /// No OTA upgrade image available for a particular client.
    NoImageAvailable => 0x98,
    /// The client still requires more OTA upgrade image files in order to successfully upgrade.
    RequireMoreImage => 0x99,
    /// The command has been received and is being processed.
    NotificationPending => 0x9a,
    /// An operation was unsuccessful due to a hardware failure.
    HardwareFailure => 0xc0,
    /// An operation was unsuccessful due to a software failure.
    SoftwareFailure => 0xc1,
    /// An error occurred during calibration.
    CalibrationError => 0xc2,
    /// The cluster is not supported.
    UnsupportedCluster => 0xc3,
    /// A limit has been reached.
    LimitReached => 0xc4,
);

impl ClusterLibraryStatus {
    /// Status is success
    pub fn is_success(self) -> bool {
        self == ClusterLibraryStatus::Success
    }
}

extended_enum!(
    /// Side of a cluster
    ClusterRole, u8,
    /// Server side, holds the attributes
    Server => 0x01,
    /// Client side, manipulates the server attributes
    Client => 0x02,
    /// Either side, only used for lookups
    Any => 0x03,
);

impl ClusterRole {
    /// The role that handles a frame sent in `direction`
    pub fn receiving(direction: Direction) -> Self {
        match direction {
            Direction::ToServer => ClusterRole::Server,
            Direction::ToClient => ClusterRole::Client,
        }
    }

    /// The direction used by frames this role sends
    pub fn sending_direction(self) -> Direction {
        match self {
            ClusterRole::Client => Direction::ToServer,
            ClusterRole::Server | ClusterRole::Any => Direction::ToClient,
        }
    }

    /// The role on the other side of the cluster
    pub fn opposite(self) -> Self {
        match self {
            ClusterRole::Server => ClusterRole::Client,
            ClusterRole::Client => ClusterRole::Server,
            ClusterRole::Any => ClusterRole::Any,
        }
    }

    /// Does this role match `other`, `Any` matches everything
    pub fn matches(self, other: ClusterRole) -> bool {
        self == other || self == ClusterRole::Any || other == ClusterRole::Any
    }
}

/// Cluster library destination, either end-point or group.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub enum Destination {
    /// End-point destination
    Endpoint(u8),
    /// Group destination
    Group(u16),
}

/// Cluster specific command payload
pub trait ClusterCommand: Sized {
    /// Command identifier
    fn identifier(&self) -> u8;
    /// Serialise the payload, returns the number of bytes used
    fn pack(&self, data: &mut [u8]) -> Result<usize, Error>;
    /// Parse the payload of command `identifier`
    fn unpack(identifier: u8, data: &[u8]) -> Result<Self, Error>;
}

/// Options mask and override carried by level and color commands
///
/// Peers using older cluster revisions do not send these fields.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct CommandOptions {
    /// Which option bits the override applies to
    pub mask: u8,
    /// Temporary values for the masked option bits
    pub overrides: u8,
}

impl CommandOptions {
    /// Apply the override to the options attribute value
    pub fn effective(options: Option<CommandOptions>, attribute: u8) -> u8 {
        match options {
            Some(o) => (attribute & !o.mask) | (o.overrides & o.mask),
            None => attribute,
        }
    }

    pub(crate) fn read(reader: &mut Reader) -> Result<Option<Self>, Error> {
        if reader.remaining() < 2 {
            return Ok(None);
        }
        Ok(Some(Self {
            mask: reader.u8()?,
            overrides: reader.u8()?,
        }))
    }

    pub(crate) fn write(options: &Option<Self>, writer: &mut Writer) -> Result<(), Error> {
        if let Some(o) = options {
            writer.u8(o.mask)?;
            writer.u8(o.overrides)?;
        }
        Ok(())
    }
}

/// Cluster identifiers known to this library
pub mod cluster {
    /// Basic
    pub const BASIC: u16 = 0x0000;
    /// Power configuration
    pub const POWER_CONFIGURATION: u16 = 0x0001;
    /// Identify
    pub const IDENTIFY: u16 = 0x0003;
    /// Groups
    pub const GROUPS: u16 = 0x0004;
    /// Scenes
    pub const SCENES: u16 = 0x0005;
    /// On/Off
    pub const ON_OFF: u16 = 0x0006;
    /// Level control
    pub const LEVEL_CONTROL: u16 = 0x0008;
    /// Time
    pub const TIME: u16 = 0x000a;
    /// OTA upgrade
    pub const OTA_UPGRADE: u16 = 0x0019;
    /// Color control
    pub const COLOR_CONTROL: u16 = 0x0300;
    /// Temperature measurement
    pub const TEMPERATURE_MEASUREMENT: u16 = 0x0402;
    /// IAS zone
    pub const IAS_ZONE: u16 = 0x0500;
    /// Metering
    pub const METERING: u16 = 0x0702;
    /// Diagnostics
    pub const DIAGNOSTICS: u16 = 0x0b05;
}

#[cfg(test)]
mod tests {
    use super::*;
    use core::convert::TryFrom;

    #[test]
    fn status_conversion() {
        assert_eq!(
            ClusterLibraryStatus::try_from(0xc4).unwrap(),
            ClusterLibraryStatus::LimitReached
        );
        assert_eq!(u8::from(ClusterLibraryStatus::UnsupportedAttribute), 0x86);
        assert_eq!(ClusterLibraryStatus::try_from(0x50), Err(crate::Error::InvalidValue));
        assert!(ClusterLibraryStatus::Success.is_success());
    }

    #[test]
    fn roles() {
        assert_eq!(ClusterRole::receiving(Direction::ToServer), ClusterRole::Server);
        assert_eq!(ClusterRole::receiving(Direction::ToClient), ClusterRole::Client);
        assert_eq!(ClusterRole::Server.sending_direction(), Direction::ToClient);
        assert_eq!(ClusterRole::Client.opposite(), ClusterRole::Server);
        assert!(ClusterRole::Any.matches(ClusterRole::Client));
        assert!(!ClusterRole::Server.matches(ClusterRole::Client));
    }
}
