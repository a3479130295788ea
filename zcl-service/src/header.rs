//! Parsed frame header
//!
//! The ZCL header fields from `zcl_data` combined with the APS side
//! information of the indication that carried them.

use zcl_data::cluster_library::{
    ClusterLibraryHeader, ClusterRole, Direction, FrameControl, FrameType,
};
use zcl_data::pack::Pack;
use zcl_data::{Address, ExtendedAddress};

use crate::transport::{ApsDataIndication, ApsDataRequest, DestinationAddress, TransmitOptions};

/// Header of a received frame
#[derive(Clone, Debug, PartialEq)]
pub struct ParsedHeader {
    pub source: Address,
    pub source_ieee: Option<ExtendedAddress>,
    pub source_endpoint: u8,
    pub destination: DestinationAddress,
    pub destination_endpoint: u8,
    pub profile: u16,
    pub cluster: u16,
    pub frame_type: FrameType,
    pub direction: Direction,
    pub disable_default_response: bool,
    pub manufacturer: Option<u16>,
    pub transaction_sequence: u8,
    pub command: u8,
    pub secured: bool,
    pub rssi: Option<i8>,
}

impl ParsedHeader {
    /// Parse the ZCL header at the start of `data`, returns the header and
    /// its size
    pub fn parse(
        indication: &ApsDataIndication,
        data: &[u8],
    ) -> Result<(Self, usize), zcl_data::Error> {
        let (header, used) = ClusterLibraryHeader::unpack(data)?;
        Ok((
            Self {
                source: indication.source,
                source_ieee: indication.sender_ieee(),
                source_endpoint: indication.source_endpoint,
                destination: indication.destination,
                destination_endpoint: indication.destination_endpoint,
                profile: indication.profile,
                cluster: indication.cluster,
                frame_type: header.control.frame_type,
                direction: header.control.direction,
                disable_default_response: header.control.disable_default_response,
                manufacturer: header.manufacturer,
                transaction_sequence: header.transaction_sequence,
                command: header.command,
                secured: indication.secured,
                rssi: indication.rssi,
            },
            used,
        ))
    }

    /// The ZCL header as it was received
    pub fn zcl_header(&self) -> ClusterLibraryHeader {
        ClusterLibraryHeader {
            control: FrameControl {
                frame_type: self.frame_type,
                manufacturer_specific: self.manufacturer.is_some(),
                direction: self.direction,
                disable_default_response: self.disable_default_response,
            },
            manufacturer: self.manufacturer,
            transaction_sequence: self.transaction_sequence,
            command: self.command,
        }
    }

    /// Header of a reply, same sequence number and manufacturer, opposite
    /// direction
    pub fn reply_header(&self, frame_type: FrameType, command: u8) -> ClusterLibraryHeader {
        let mut header = ClusterLibraryHeader::new(
            frame_type,
            self.direction.reverse(),
            self.manufacturer,
            self.transaction_sequence,
            command,
        );
        header.control.disable_default_response = true;
        header
    }

    /// APS request sending a reply back to the sender from `endpoint`
    pub fn reply_request(&self, endpoint: u8) -> Option<ApsDataRequest> {
        let destination = DestinationAddress::reply_to(&self.source)?;
        let mut options = TransmitOptions::ACKNOWLEDGED;
        if self.secured {
            options |= TransmitOptions::SECURED;
        }
        Some(ApsDataRequest {
            destination,
            destination_endpoint: self.source_endpoint,
            source_endpoint: endpoint,
            profile: self.profile,
            cluster: self.cluster,
            options,
        })
    }

    pub fn is_cluster_specific(&self) -> bool {
        self.frame_type == FrameType::Local
    }

    /// Side of the cluster the frame is addressed to
    pub fn receiving_role(&self) -> ClusterRole {
        ClusterRole::receiving(self.direction)
    }

    /// Side of the cluster that sent the frame
    pub fn sending_role(&self) -> ClusterRole {
        ClusterRole::receiving(self.direction).opposite()
    }

    /// Was the frame sent to a group or broadcast address
    pub fn is_group(&self) -> bool {
        self.destination.is_group() || self.destination.is_broadcast()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use zcl_data::ShortAddress;

    fn indication() -> ApsDataIndication {
        ApsDataIndication {
            source: Address::Short(ShortAddress::new(0x0000)),
            source_ieee: Some(ExtendedAddress::new(0x0011_2233_4455_6677)),
            source_endpoint: 0x01,
            destination: DestinationAddress::Short(ShortAddress::new(0x1234)),
            destination_endpoint: 0x0a,
            profile: 0x0104,
            cluster: 0x0006,
            secured: false,
            rssi: Some(-40),
        }
    }

    #[test]
    fn parse_and_encode() {
        let frames: [&[u8]; 3] = [
            &[0x01, 0x10, 0x02],
            &[0x18, 0x42, 0x0b, 0x02, 0x00],
            &[0x05, 0x5f, 0x11, 0x07, 0x42, 0x01, 0x02],
        ];
        for frame in frames.iter() {
            let (header, used) = ParsedHeader::parse(&indication(), frame).unwrap();
            let mut output = [0u8; 8];
            let written = header.zcl_header().pack(&mut output).unwrap();
            assert_eq!(written, used);
            assert_eq!(output[..written], frame[..used]);
        }
    }

    #[test]
    fn reply() {
        let (header, _) = ParsedHeader::parse(&indication(), &[0x00, 0x33, 0x00]).unwrap();
        assert_eq!(header.receiving_role(), ClusterRole::Server);
        assert_eq!(header.sending_role(), ClusterRole::Client);
        let reply = header.reply_header(FrameType::Global, 0x01);
        assert_eq!(reply.control.direction, Direction::ToClient);
        assert_eq!(reply.transaction_sequence, 0x33);
        assert!(reply.control.disable_default_response);
        let request = header.reply_request(0x0a).unwrap();
        assert_eq!(request.destination_endpoint, 0x01);
        assert_eq!(request.source_endpoint, 0x0a);
        assert_eq!(
            request.destination,
            DestinationAddress::Short(ShortAddress::new(0x0000))
        );
        assert_eq!(header.source_ieee, Some(ExtendedAddress::new(0x0011_2233_4455_6677)));
    }

    #[test]
    fn reserved_bits_are_malformed() {
        assert_eq!(
            ParsedHeader::parse(&indication(), &[0x21, 0x00, 0x00]),
            Err(zcl_data::Error::ReservedBitsSet)
        );
    }
}
