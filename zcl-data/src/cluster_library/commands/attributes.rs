//! Read, write and report attribute commands

use core::convert::TryFrom;

use byteorder::{ByteOrder, LittleEndian};

use crate::cluster_library::{
    AttributeDataType, AttributeIdentifier, AttributeValue, ClusterLibraryStatus,
};
use crate::pack::Pack;
use crate::utils::check_length;
use crate::Error;

/// Read attributes request, a list of attribute identifiers
#[derive(Clone, Debug, PartialEq)]
pub struct ReadAttributes {
    /// Attributes to read, in order
    pub attributes: Vec<AttributeIdentifier>,
}

impl Pack<ReadAttributes, Error> for ReadAttributes {
    fn pack(&self, data: &mut [u8]) -> Result<usize, Error> {
        if data.len() < self.attributes.len() * 2 {
            return Err(Error::NotEnoughSpace);
        }
        let mut offset = 0;
        for attribute_id in self.attributes.iter() {
            LittleEndian::write_u16(&mut data[offset..offset + 2], *attribute_id);
            offset += 2;
        }
        Ok(offset)
    }

    fn unpack(data: &[u8]) -> Result<(Self, usize), Error> {
        if data.len() % 2 != 0 {
            return Err(Error::WrongNumberOfBytes);
        }
        let attributes: Vec<AttributeIdentifier> =
            data.chunks_exact(2).map(LittleEndian::read_u16).collect();
        Ok((Self { attributes }, data.len()))
    }
}

/// Status of a single attribute in a read attributes response
#[derive(Clone, Debug, PartialEq)]
pub struct AttributeStatus {
    /// Attribute identifier
    pub identifier: AttributeIdentifier,
    /// Read status
    pub status: ClusterLibraryStatus,
    /// Value, only present on success
    pub value: Option<AttributeValue>,
}

impl AttributeStatus {
    /// Successful read of `value`
    pub fn success(identifier: AttributeIdentifier, value: AttributeValue) -> Self {
        Self {
            identifier,
            status: ClusterLibraryStatus::Success,
            value: Some(value),
        }
    }

    /// Failed read
    pub fn failure(identifier: AttributeIdentifier, status: ClusterLibraryStatus) -> Self {
        Self {
            identifier,
            status,
            value: None,
        }
    }

    /// Number of bytes this record uses on the wire
    pub fn encoded_size(&self) -> usize {
        match &self.value {
            Some(value) => 4 + value.encoded_size(),
            None => 3,
        }
    }
}

impl Pack<AttributeStatus, Error> for AttributeStatus {
    fn pack(&self, data: &mut [u8]) -> Result<usize, Error> {
        if data.len() < 3 {
            return Err(Error::NotEnoughSpace);
        }
        LittleEndian::write_u16(&mut data[0..2], self.identifier);
        data[2] = u8::from(self.status);
        let used = match (&self.value, self.status) {
            (Some(value), ClusterLibraryStatus::Success) => value.pack_with_type(&mut data[3..])? + 3,
            _ => 3,
        };
        Ok(used)
    }

    fn unpack(data: &[u8]) -> Result<(Self, usize), Error> {
        check_length(data, 3)?;
        let identifier = LittleEndian::read_u16(&data[0..2]);
        let status = ClusterLibraryStatus::try_from(data[2])?;
        if status != ClusterLibraryStatus::Success {
            return Ok((Self::failure(identifier, status), 3));
        }
        let (value, used) = AttributeValue::unpack_with_type(&data[3..])?;
        Ok((Self::success(identifier, value), used + 3))
    }
}

/// Read attributes response
#[derive(Clone, Debug, PartialEq)]
pub struct ReadAttributesResponse {
    /// One record per requested attribute, in request order
    pub attributes: Vec<AttributeStatus>,
}

impl Pack<ReadAttributesResponse, Error> for ReadAttributesResponse {
    fn pack(&self, data: &mut [u8]) -> Result<usize, Error> {
        let mut offset = 0;
        for attribute in self.attributes.iter() {
            offset += attribute.pack(&mut data[offset..])?;
        }
        Ok(offset)
    }

    fn unpack(data: &[u8]) -> Result<(Self, usize), Error> {
        let mut offset = 0;
        let mut attributes: Vec<AttributeStatus> = Vec::new();
        while offset < data.len() {
            let (attribute_status, used) = AttributeStatus::unpack(&data[offset..])?;
            attributes.push(attribute_status);
            offset += used;
        }
        Ok((Self { attributes }, offset))
    }
}

/// Attribute identifier with a typed value, used by write and report
#[derive(Clone, Debug, PartialEq)]
pub struct AttributeRecord {
    /// Attribute identifier
    pub identifier: AttributeIdentifier,
    /// The value, carries its data type
    pub value: AttributeValue,
}

impl AttributeRecord {
    /// Create a record
    pub fn new(identifier: AttributeIdentifier, value: AttributeValue) -> Self {
        Self { identifier, value }
    }

    /// Number of bytes this record uses on the wire
    pub fn encoded_size(&self) -> usize {
        3 + self.value.encoded_size()
    }
}

impl Pack<AttributeRecord, Error> for AttributeRecord {
    fn pack(&self, data: &mut [u8]) -> Result<usize, Error> {
        if data.len() < 3 {
            return Err(Error::NotEnoughSpace);
        }
        LittleEndian::write_u16(&mut data[0..2], self.identifier);
        Ok(2 + self.value.pack_with_type(&mut data[2..])?)
    }

    fn unpack(data: &[u8]) -> Result<(Self, usize), Error> {
        check_length(data, 3)?;
        let identifier = LittleEndian::read_u16(&data[0..2]);
        let (value, used) = AttributeValue::unpack_with_type(&data[2..])?;
        Ok((Self { identifier, value }, used + 2))
    }
}

fn pack_records(records: &[AttributeRecord], data: &mut [u8]) -> Result<usize, Error> {
    let mut offset = 0;
    for record in records.iter() {
        offset += record.pack(&mut data[offset..])?;
    }
    Ok(offset)
}

fn unpack_records(data: &[u8]) -> Result<(Vec<AttributeRecord>, usize), Error> {
    let mut offset = 0;
    let mut records = Vec::new();
    while offset < data.len() {
        let (record, used) = AttributeRecord::unpack(&data[offset..])?;
        records.push(record);
        offset += used;
    }
    Ok((records, offset))
}

/// Write attributes request, also used for the undivided and no response variants
#[derive(Clone, Debug, PartialEq)]
pub struct WriteAttributes {
    /// Attributes to write
    pub attributes: Vec<AttributeRecord>,
}

impl Pack<WriteAttributes, Error> for WriteAttributes {
    fn pack(&self, data: &mut [u8]) -> Result<usize, Error> {
        pack_records(&self.attributes, data)
    }

    fn unpack(data: &[u8]) -> Result<(Self, usize), Error> {
        let (attributes, used) = unpack_records(data)?;
        Ok((Self { attributes }, used))
    }
}

/// Failed write of a single attribute
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct WriteAttributeStatus {
    /// Reason for the failure
    pub status: ClusterLibraryStatus,
    /// Attribute identifier
    pub identifier: AttributeIdentifier,
}

/// Write attributes response
///
/// An empty list of failures is sent as a single success status.
#[derive(Clone, Debug, PartialEq)]
pub struct WriteAttributesResponse {
    /// Failed writes
    pub failures: Vec<WriteAttributeStatus>,
}

impl WriteAttributesResponse {
    /// Every write succeeded
    pub fn is_success(&self) -> bool {
        self.failures.is_empty()
    }
}

impl Pack<WriteAttributesResponse, Error> for WriteAttributesResponse {
    fn pack(&self, data: &mut [u8]) -> Result<usize, Error> {
        if self.failures.is_empty() {
            if data.is_empty() {
                return Err(Error::NotEnoughSpace);
            }
            data[0] = u8::from(ClusterLibraryStatus::Success);
            return Ok(1);
        }
        if data.len() < self.failures.len() * 3 {
            return Err(Error::NotEnoughSpace);
        }
        let mut offset = 0;
        for failure in self.failures.iter() {
            data[offset] = u8::from(failure.status);
            LittleEndian::write_u16(&mut data[offset + 1..offset + 3], failure.identifier);
            offset += 3;
        }
        Ok(offset)
    }

    fn unpack(data: &[u8]) -> Result<(Self, usize), Error> {
        if data.len() == 1 && data[0] == u8::from(ClusterLibraryStatus::Success) {
            return Ok((Self { failures: Vec::new() }, 1));
        }
        if data.is_empty() || data.len() % 3 != 0 {
            return Err(Error::WrongNumberOfBytes);
        }
        let mut failures = Vec::with_capacity(data.len() / 3);
        for chunk in data.chunks_exact(3) {
            failures.push(WriteAttributeStatus {
                status: ClusterLibraryStatus::try_from(chunk[0])?,
                identifier: LittleEndian::read_u16(&chunk[1..3]),
            });
        }
        Ok((Self { failures }, data.len()))
    }
}

/// Report attributes
#[derive(Clone, Debug, PartialEq)]
pub struct ReportAttributes {
    /// Reported attributes
    pub attributes: Vec<AttributeRecord>,
}

impl Pack<ReportAttributes, Error> for ReportAttributes {
    fn pack(&self, data: &mut [u8]) -> Result<usize, Error> {
        pack_records(&self.attributes, data)
    }

    fn unpack(data: &[u8]) -> Result<(Self, usize), Error> {
        let (attributes, used) = unpack_records(data)?;
        Ok((Self { attributes }, used))
    }
}

/// Read a data type tag
pub(crate) fn data_type(value: u8) -> Result<AttributeDataType, Error> {
    AttributeDataType::try_from(value).map_err(|_| Error::UnsupportedAttributeValue)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unpack_read_attributes() {
        let data = [0x0b, 0x05, 0xfd, 0xff];
        let (cmd, used) = ReadAttributes::unpack(&data).unwrap();
        assert_eq!(used, 4);
        assert_eq!(cmd.attributes, vec![0x050b, 0xfffd]);

        assert_eq!(ReadAttributes::unpack(&data[..3]), Err(Error::WrongNumberOfBytes));
    }

    #[test]
    fn read_attributes_response() {
        let data = [
            0x00, 0x00, 0x00, 0x10, 0x01, // on/off, success, boolean true
            0x01, 0x40, 0x86, // unsupported attribute
            0xfd, 0xff, 0x00, 0x21, 0x02, 0x00, // cluster revision 2
        ];
        let (cmd, used) = ReadAttributesResponse::unpack(&data).unwrap();
        assert_eq!(used, data.len());
        assert_eq!(
            cmd.attributes,
            vec![
                AttributeStatus::success(0x0000, AttributeValue::Boolean(1)),
                AttributeStatus::failure(0x4001, ClusterLibraryStatus::UnsupportedAttribute),
                AttributeStatus::success(0xfffd, AttributeValue::Unsigned16(2)),
            ]
        );
        assert_eq!(cmd.attributes[0].encoded_size(), 5);
        assert_eq!(cmd.attributes[1].encoded_size(), 3);

        let mut out = [0u8; 32];
        let used = cmd.pack(&mut out).unwrap();
        assert_eq!(out[..used], data);
    }

    #[test]
    fn write_attributes() {
        let data = [0x10, 0x00, 0x21, 0x34, 0x12, 0x00, 0x40, 0x42, 0x02, b'o', b'k'];
        let (cmd, used) = WriteAttributes::unpack(&data).unwrap();
        assert_eq!(used, data.len());
        assert_eq!(cmd.attributes.len(), 2);
        assert_eq!(cmd.attributes[0], AttributeRecord::new(0x0010, AttributeValue::Unsigned16(0x1234)));
        assert_eq!(
            cmd.attributes[1].value,
            AttributeValue::CharacterString(Some("ok".to_string()))
        );

        // Truncated value
        assert_eq!(
            WriteAttributes::unpack(&data[..4]),
            Err(Error::WrongNumberOfBytes)
        );
    }

    #[test]
    fn write_attributes_response() {
        let mut out = [0u8; 8];
        let all_ok = WriteAttributesResponse { failures: vec![] };
        assert_eq!(all_ok.pack(&mut out).unwrap(), 1);
        assert_eq!(out[0], 0x00);

        let failed = WriteAttributesResponse {
            failures: vec![WriteAttributeStatus {
                status: ClusterLibraryStatus::InvalidValue,
                identifier: 0x0011,
            }],
        };
        let used = failed.pack(&mut out).unwrap();
        assert_eq!(out[..used], [0x87, 0x11, 0x00]);

        let (cmd, _) = WriteAttributesResponse::unpack(&[0x00]).unwrap();
        assert!(cmd.is_success());
        let (cmd, _) = WriteAttributesResponse::unpack(&[0x88, 0x00, 0x00]).unwrap();
        assert_eq!(cmd.failures[0].status, ClusterLibraryStatus::ReadOnly);
    }

    #[test]
    fn report_attributes() {
        let data = [0x00, 0x00, 0x10, 0x01, 0x00, 0x40, 0x18, 0x03];
        let (cmd, used) = ReportAttributes::unpack(&data).unwrap();
        assert_eq!(used, 8);
        assert_eq!(cmd.attributes[1], AttributeRecord::new(0x4000, AttributeValue::Bitmap8(3)));
        assert_eq!(cmd.attributes[1].encoded_size(), 4);
    }
}
