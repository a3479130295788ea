//! Notifications to the application
//!
//! Things the runtime can not decide on its own, or that the application
//! must act upon, are raised as a `DeviceEvent` through the device callback.

use zcl_data::cluster_library::AttributeValue;
use zcl_data::Address;

/// Event raised to the device callback
#[derive(Clone, Debug, PartialEq)]
pub enum DeviceEvent {
    /// An attribute value changed
    SetAttributeValue {
        endpoint: u8,
        cluster: u16,
        attribute: u16,
        value: AttributeValue,
    },
    /// Run an identify effect
    SetEffect { endpoint: u8, effect: u8, variant: u8 },
    /// Run an off effect of the on/off cluster
    OffWithEffect { endpoint: u8, effect: u8, variant: u8 },
    /// Identify time started, changed or ended
    IdentifyTime { endpoint: u8, time: u16 },
    /// A peer answered an identify query
    IdentifyQueryResponse {
        source: Address,
        endpoint: u8,
        timeout: u16,
    },
    /// Enter zone test mode
    InitiateTestMode {
        endpoint: u8,
        duration: u8,
        sensitivity: u8,
    },
    /// Leave zone test mode
    InitiateNormalMode { endpoint: u8 },
    /// The endpoint was reset to its factory defaults
    ResetToFactoryDefaults { endpoint: u8 },
    /// A peer reported an attribute
    ReportReceived {
        source: Address,
        endpoint: u8,
        cluster: u16,
        attribute: u16,
        value: AttributeValue,
    },
    /// A peer did not report within the configured timeout
    NoReporting {
        endpoint: u8,
        cluster: u16,
        attribute: u16,
    },
    /// A default response was received
    DefaultResponse {
        source: Address,
        cluster: u16,
        command: u8,
        status: u8,
    },
    /// A zone asks to be enrolled, `zone_id` is the identifier given
    ZoneEnrollRequest {
        source: Address,
        endpoint: u8,
        zone_type: u16,
        manufacturer_code: u16,
        zone_id: u8,
    },
    /// A zone notified a status change
    ZoneStatusChange {
        source: Address,
        endpoint: u8,
        zone_status: u16,
        zone_id: u8,
        delay: u16,
    },
    /// The local zone has been enrolled
    ZoneEnrolled { endpoint: u8, zone_id: u8 },
}

/// Application callback for device events
pub type DeviceCallback = Box<dyn FnMut(&DeviceEvent)>;
