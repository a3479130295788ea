//! APS side of the runtime
//!
//! Inbound frames arrive as an `ApsDataIndication` plus payload, outbound
//! frames leave as an `OutgoingFrame`, a pool buffer together with the
//! `ApsDataRequest` describing where it goes.

use zcl_data::{Address, ExtendedAddress, ShortAddress};

use crate::buffer::BufferId;

/// Largest ZCL frame without IEEE addressing or APS security
pub const MAX_PAYLOAD: usize = 82;
/// Largest ZCL frame with IEEE addressing and APS security
pub const MAX_PAYLOAD_EXTENDED: usize = 66;

/// Number of outstanding send callbacks kept
pub const CALLBACK_SLOTS: usize = 8;

/// Destination of an APS frame
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub enum DestinationAddress {
    Short(ShortAddress),
    Extended(ExtendedAddress),
    Group(u16),
}

impl DestinationAddress {
    /// Is the destination a group
    pub fn is_group(&self) -> bool {
        matches!(self, DestinationAddress::Group(_))
    }

    /// Is the destination a broadcast address
    pub fn is_broadcast(&self) -> bool {
        match self {
            DestinationAddress::Short(address) => u16::from(*address) >= 0xfff8,
            _ => false,
        }
    }

    /// Address to reply to a frame from `source`
    pub fn reply_to(source: &Address) -> Option<Self> {
        match source {
            Address::Short(address) => Some(DestinationAddress::Short(*address)),
            Address::Extended(address) | Address::GreenPowerIeee(address, _) => {
                Some(DestinationAddress::Extended(*address))
            }
            Address::GreenPowerSource(_) => None,
        }
    }
}

impl core::fmt::Display for DestinationAddress {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        match self {
            DestinationAddress::Short(a) => write!(f, "{}", a),
            DestinationAddress::Extended(a) => write!(f, "{}", a),
            DestinationAddress::Group(g) => write!(f, "group {:04x}", g),
        }
    }
}

bitflags::bitflags! {
    /// APS transmit options
    #[derive(Clone, Copy, Debug, PartialEq, Eq)]
    pub struct TransmitOptions: u8 {
        /// Request an APS acknowledge
        const ACKNOWLEDGED = 0b0000_0001;
        /// Use APS security
        const SECURED = 0b0000_0010;
        /// The frame may be fragmented
        const FRAGMENTATION = 0b0000_0100;
    }
}

/// Frame received from the APS layer
#[derive(Clone, Debug, PartialEq)]
pub struct ApsDataIndication {
    pub source: Address,
    /// IEEE address of the sender, when known
    pub source_ieee: Option<ExtendedAddress>,
    pub source_endpoint: u8,
    pub destination: DestinationAddress,
    pub destination_endpoint: u8,
    pub profile: u16,
    pub cluster: u16,
    /// The frame was protected by APS security
    pub secured: bool,
    pub rssi: Option<i8>,
}

impl ApsDataIndication {
    /// IEEE address of the sender, from the address or the side information
    pub fn sender_ieee(&self) -> Option<ExtendedAddress> {
        self.source.extended().or(self.source_ieee)
    }
}

/// Frame handed to the APS layer
#[derive(Clone, Debug, PartialEq)]
pub struct ApsDataRequest {
    pub destination: DestinationAddress,
    pub destination_endpoint: u8,
    pub source_endpoint: u8,
    pub profile: u16,
    pub cluster: u16,
    pub options: TransmitOptions,
}

impl ApsDataRequest {
    /// Largest ZCL frame for the request, `fragmented` holds the cap of
    /// clusters allowed to fragment
    pub fn max_payload(&self, fragmented: Option<usize>) -> usize {
        if let Some(max) = fragmented {
            return max;
        }
        let extended = matches!(self.destination, DestinationAddress::Extended(_));
        if extended || self.options.contains(TransmitOptions::SECURED) {
            MAX_PAYLOAD_EXTENDED
        } else {
            MAX_PAYLOAD
        }
    }
}

/// Queued outgoing frame
#[derive(Clone, Debug, PartialEq)]
pub struct OutgoingFrame {
    /// Buffer holding the ZCL frame, released by `confirm`
    pub buffer: BufferId,
    pub request: ApsDataRequest,
}

/// Result of an APS transmission
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ConfirmStatus {
    Success,
    /// No APS acknowledge was received
    NoAcknowledge,
    /// Any other transport failure, with the APS status code
    TransportError(u8),
}

/// Called once when the transmission of a buffer is confirmed
pub type SendCallback = Box<dyn FnOnce(ConfirmStatus)>;

struct CallbackEntry {
    buffer: BufferId,
    sequence: u32,
    callback: SendCallback,
}

/// Fixed capacity map from buffer to send callback
///
/// When full, the oldest entry is dropped without being invoked.
pub struct CallbackRegistry {
    entries: heapless::Vec<CallbackEntry, CALLBACK_SLOTS>,
    sequence: u32,
}

impl Default for CallbackRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl CallbackRegistry {
    pub fn new() -> Self {
        Self {
            entries: heapless::Vec::new(),
            sequence: 0,
        }
    }

    /// Register `callback` for `buffer`, returns the buffer of an evicted entry
    pub fn register(&mut self, buffer: BufferId, callback: SendCallback) -> Option<BufferId> {
        let mut evicted = None;
        if let Some(index) = self.entries.iter().position(|e| e.buffer == buffer) {
            self.entries.swap_remove(index);
        }
        if self.entries.is_full() {
            let oldest = self
                .entries
                .iter()
                .enumerate()
                .min_by_key(|(_, e)| e.sequence)
                .map(|(n, _)| n);
            if let Some(index) = oldest {
                let entry = self.entries.swap_remove(index);
                log::error!("Send callback for buffer {} lost", entry.buffer);
                evicted = Some(entry.buffer);
            }
        }
        self.sequence = self.sequence.wrapping_add(1);
        let entry = CallbackEntry {
            buffer,
            sequence: self.sequence,
            callback,
        };
        if self.entries.push(entry).is_err() {
            log::error!("Send callback for buffer {} not registered", buffer);
        }
        evicted
    }

    /// Remove the callback of `buffer`
    pub fn take(&mut self, buffer: BufferId) -> Option<SendCallback> {
        let index = self.entries.iter().position(|e| e.buffer == buffer)?;
        Some(self.entries.swap_remove(index).callback)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::RefCell;
    use std::rc::Rc;

    #[test]
    fn payload_limits() {
        let mut request = ApsDataRequest {
            destination: DestinationAddress::Short(ShortAddress::new(0x1234)),
            destination_endpoint: 1,
            source_endpoint: 1,
            profile: 0x0104,
            cluster: 0x0006,
            options: TransmitOptions::ACKNOWLEDGED,
        };
        assert_eq!(request.max_payload(None), MAX_PAYLOAD);
        request.options |= TransmitOptions::SECURED;
        assert_eq!(request.max_payload(None), MAX_PAYLOAD_EXTENDED);
        request.options = TransmitOptions::empty();
        request.destination = DestinationAddress::Extended(ExtendedAddress::new(1));
        assert_eq!(request.max_payload(None), MAX_PAYLOAD_EXTENDED);
        assert_eq!(request.max_payload(Some(400)), 400);
    }

    #[test]
    fn reply_address() {
        let short = Address::Short(ShortAddress::new(0x0001));
        assert_eq!(
            DestinationAddress::reply_to(&short),
            Some(DestinationAddress::Short(ShortAddress::new(0x0001)))
        );
        assert_eq!(
            DestinationAddress::reply_to(&Address::GreenPowerSource(0x1234_5678)),
            None
        );
        assert!(DestinationAddress::Group(0x0010).is_group());
        assert!(DestinationAddress::Short(ShortAddress::new(0xfffd)).is_broadcast());
    }

    #[test]
    fn callbacks_run_once() {
        let calls = Rc::new(RefCell::new(Vec::new()));
        let mut registry = CallbackRegistry::new();
        let c = calls.clone();
        registry.register(BufferId::new(3), Box::new(move |s| c.borrow_mut().push(s)));
        assert_eq!(registry.len(), 1);
        let callback = registry.take(BufferId::new(3)).unwrap();
        callback(ConfirmStatus::NoAcknowledge);
        assert!(registry.take(BufferId::new(3)).is_none());
        assert_eq!(*calls.borrow(), vec![ConfirmStatus::NoAcknowledge]);
    }

    #[test]
    fn oldest_callback_evicted() {
        let mut registry = CallbackRegistry::new();
        for n in 0..CALLBACK_SLOTS {
            assert_eq!(registry.register(BufferId::new(n), Box::new(|_| ())), None);
        }
        let evicted = registry.register(BufferId::new(100), Box::new(|_| ()));
        assert_eq!(evicted, Some(BufferId::new(0)));
        assert_eq!(registry.len(), CALLBACK_SLOTS);
        assert!(registry.take(BufferId::new(0)).is_none());
        assert!(registry.take(BufferId::new(100)).is_some());
    }
}
