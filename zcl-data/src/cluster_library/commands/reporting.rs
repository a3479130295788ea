//! Configure reporting and read reporting configuration

use core::convert::TryFrom;

use byteorder::{ByteOrder, LittleEndian};

use super::attributes::data_type;
use crate::cluster_library::{
    AttributeDataType, AttributeIdentifier, AttributeValue, ClusterLibraryStatus,
};
use crate::pack::Pack;
use crate::utils::check_length;
use crate::Error;

/// Maximum interval that disables reporting of an attribute
pub const REPORTING_DISABLED: u16 = 0xffff;

extended_enum!(
    /// Direction of a reporting configuration record
    ReportingDirection, u8,
    /// The receiver of the configuration sends the reports
    Send => 0x00,
    /// The receiver of the configuration expects reports from the sender
    Receive => 0x01,
);

/// Reporting configuration of one attribute
#[derive(Clone, Debug, PartialEq)]
pub enum ReportingConfiguration {
    /// Reports are sent by the receiver of the configuration
    Send {
        /// Attribute identifier
        identifier: AttributeIdentifier,
        /// Data type of the attribute
        data_type: AttributeDataType,
        /// Minimum interval between reports, in seconds
        minimum_interval: u16,
        /// Maximum interval between reports, in seconds
        maximum_interval: u16,
        /// Change that triggers a report, only for analog data types
        reportable_change: Option<AttributeValue>,
    },
    /// Reports are expected by the receiver of the configuration
    Receive {
        /// Attribute identifier
        identifier: AttributeIdentifier,
        /// Longest expected silence, in seconds, zero for no timeout
        timeout: u16,
    },
}

impl ReportingConfiguration {
    /// Attribute identifier
    pub fn identifier(&self) -> AttributeIdentifier {
        match self {
            ReportingConfiguration::Send { identifier, .. }
            | ReportingConfiguration::Receive { identifier, .. } => *identifier,
        }
    }

    /// Direction of the record
    pub fn direction(&self) -> ReportingDirection {
        match self {
            ReportingConfiguration::Send { .. } => ReportingDirection::Send,
            ReportingConfiguration::Receive { .. } => ReportingDirection::Receive,
        }
    }

    /// Pack the fields following direction and identifier
    fn pack_fields(&self, data: &mut [u8]) -> Result<usize, Error> {
        match self {
            ReportingConfiguration::Send {
                data_type,
                minimum_interval,
                maximum_interval,
                reportable_change,
                ..
            } => {
                if data.len() < 5 {
                    return Err(Error::NotEnoughSpace);
                }
                data[0] = u8::from(*data_type);
                LittleEndian::write_u16(&mut data[1..3], *minimum_interval);
                LittleEndian::write_u16(&mut data[3..5], *maximum_interval);
                let mut used = 5;
                if data_type.is_analog() {
                    let change = match reportable_change {
                        Some(change) => change.clone(),
                        None => AttributeValue::default_for(*data_type),
                    };
                    if change.data_type() != *data_type {
                        return Err(Error::InvalidValue);
                    }
                    used += change.pack(&mut data[5..])?;
                }
                Ok(used)
            }
            ReportingConfiguration::Receive { timeout, .. } => {
                if data.len() < 2 {
                    return Err(Error::NotEnoughSpace);
                }
                LittleEndian::write_u16(&mut data[0..2], *timeout);
                Ok(2)
            }
        }
    }

    fn unpack_fields(
        data: &[u8],
        direction: ReportingDirection,
        identifier: AttributeIdentifier,
    ) -> Result<(Self, usize), Error> {
        match direction {
            ReportingDirection::Send => {
                check_length(data, 5)?;
                let data_type = data_type(data[0])?;
                let minimum_interval = LittleEndian::read_u16(&data[1..3]);
                let maximum_interval = LittleEndian::read_u16(&data[3..5]);
                let (reportable_change, used) = if data_type.is_analog() {
                    let (change, used) = AttributeValue::unpack(&data[5..], data_type)?;
                    (Some(change), used)
                } else {
                    (None, 0)
                };
                Ok((
                    ReportingConfiguration::Send {
                        identifier,
                        data_type,
                        minimum_interval,
                        maximum_interval,
                        reportable_change,
                    },
                    5 + used,
                ))
            }
            ReportingDirection::Receive => {
                check_length(data, 2)?;
                Ok((
                    ReportingConfiguration::Receive {
                        identifier,
                        timeout: LittleEndian::read_u16(&data[0..2]),
                    },
                    2,
                ))
            }
        }
    }
}

impl Pack<ReportingConfiguration, Error> for ReportingConfiguration {
    fn pack(&self, data: &mut [u8]) -> Result<usize, Error> {
        if data.len() < 3 {
            return Err(Error::NotEnoughSpace);
        }
        data[0] = u8::from(self.direction());
        LittleEndian::write_u16(&mut data[1..3], self.identifier());
        Ok(3 + self.pack_fields(&mut data[3..])?)
    }

    fn unpack(data: &[u8]) -> Result<(Self, usize), Error> {
        check_length(data, 3)?;
        let direction = ReportingDirection::try_from(data[0])?;
        let identifier = LittleEndian::read_u16(&data[1..3]);
        let (record, used) = Self::unpack_fields(&data[3..], direction, identifier)?;
        Ok((record, used + 3))
    }
}

/// Configure reporting request
#[derive(Clone, Debug, PartialEq)]
pub struct ConfigureReporting {
    /// Configuration records
    pub records: Vec<ReportingConfiguration>,
}

impl Pack<ConfigureReporting, Error> for ConfigureReporting {
    fn pack(&self, data: &mut [u8]) -> Result<usize, Error> {
        let mut offset = 0;
        for record in self.records.iter() {
            offset += record.pack(&mut data[offset..])?;
        }
        Ok(offset)
    }

    fn unpack(data: &[u8]) -> Result<(Self, usize), Error> {
        let mut offset = 0;
        let mut records = Vec::new();
        while offset < data.len() {
            let (record, used) = ReportingConfiguration::unpack(&data[offset..])?;
            records.push(record);
            offset += used;
        }
        Ok((Self { records }, offset))
    }
}

/// Status of one configuration record
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct ConfigureReportingStatus {
    /// Status of the record
    pub status: ClusterLibraryStatus,
    /// Direction of the record
    pub direction: ReportingDirection,
    /// Attribute identifier
    pub identifier: AttributeIdentifier,
}

/// Configure reporting response
///
/// Only failed records are listed, an empty list is sent as a single success
/// status.
#[derive(Clone, Debug, PartialEq)]
pub struct ConfigureReportingResponse {
    /// Failed records
    pub failures: Vec<ConfigureReportingStatus>,
}

impl Pack<ConfigureReportingResponse, Error> for ConfigureReportingResponse {
    fn pack(&self, data: &mut [u8]) -> Result<usize, Error> {
        if self.failures.is_empty() {
            if data.is_empty() {
                return Err(Error::NotEnoughSpace);
            }
            data[0] = u8::from(ClusterLibraryStatus::Success);
            return Ok(1);
        }
        if data.len() < self.failures.len() * 4 {
            return Err(Error::NotEnoughSpace);
        }
        let mut offset = 0;
        for failure in self.failures.iter() {
            data[offset] = u8::from(failure.status);
            data[offset + 1] = u8::from(failure.direction);
            LittleEndian::write_u16(&mut data[offset + 2..offset + 4], failure.identifier);
            offset += 4;
        }
        Ok(offset)
    }

    fn unpack(data: &[u8]) -> Result<(Self, usize), Error> {
        if data.len() == 1 {
            let status = ClusterLibraryStatus::try_from(data[0])?;
            if status.is_success() {
                return Ok((Self { failures: Vec::new() }, 1));
            }
            return Err(Error::WrongNumberOfBytes);
        }
        if data.is_empty() || data.len() % 4 != 0 {
            return Err(Error::WrongNumberOfBytes);
        }
        let mut failures = Vec::with_capacity(data.len() / 4);
        for chunk in data.chunks_exact(4) {
            failures.push(ConfigureReportingStatus {
                status: ClusterLibraryStatus::try_from(chunk[0])?,
                direction: ReportingDirection::try_from(chunk[1])?,
                identifier: LittleEndian::read_u16(&chunk[2..4]),
            });
        }
        Ok((Self { failures }, data.len()))
    }
}

/// Attribute selector in a read reporting configuration request
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct ReportingConfigurationSelector {
    /// Direction of the requested configuration
    pub direction: ReportingDirection,
    /// Attribute identifier
    pub identifier: AttributeIdentifier,
}

/// Read reporting configuration request
#[derive(Clone, Debug, PartialEq)]
pub struct ReadReportingConfiguration {
    /// Requested configurations
    pub records: Vec<ReportingConfigurationSelector>,
}

impl Pack<ReadReportingConfiguration, Error> for ReadReportingConfiguration {
    fn pack(&self, data: &mut [u8]) -> Result<usize, Error> {
        if data.len() < self.records.len() * 3 {
            return Err(Error::NotEnoughSpace);
        }
        let mut offset = 0;
        for record in self.records.iter() {
            data[offset] = u8::from(record.direction);
            LittleEndian::write_u16(&mut data[offset + 1..offset + 3], record.identifier);
            offset += 3;
        }
        Ok(offset)
    }

    fn unpack(data: &[u8]) -> Result<(Self, usize), Error> {
        if data.len() % 3 != 0 {
            return Err(Error::WrongNumberOfBytes);
        }
        let mut records = Vec::with_capacity(data.len() / 3);
        for chunk in data.chunks_exact(3) {
            records.push(ReportingConfigurationSelector {
                direction: ReportingDirection::try_from(chunk[0])?,
                identifier: LittleEndian::read_u16(&chunk[1..3]),
            });
        }
        Ok((Self { records }, data.len()))
    }
}

/// One record of a read reporting configuration response
#[derive(Clone, Debug, PartialEq)]
pub enum ReportingConfigurationRecord {
    /// The configuration was found
    Found(ReportingConfiguration),
    /// The configuration could not be read
    Failed {
        /// Reason
        status: ClusterLibraryStatus,
        /// Requested direction
        direction: ReportingDirection,
        /// Attribute identifier
        identifier: AttributeIdentifier,
    },
}

impl Pack<ReportingConfigurationRecord, Error> for ReportingConfigurationRecord {
    fn pack(&self, data: &mut [u8]) -> Result<usize, Error> {
        if data.len() < 4 {
            return Err(Error::NotEnoughSpace);
        }
        match self {
            ReportingConfigurationRecord::Found(configuration) => {
                data[0] = u8::from(ClusterLibraryStatus::Success);
                Ok(1 + configuration.pack(&mut data[1..])?)
            }
            ReportingConfigurationRecord::Failed {
                status,
                direction,
                identifier,
            } => {
                data[0] = u8::from(*status);
                data[1] = u8::from(*direction);
                LittleEndian::write_u16(&mut data[2..4], *identifier);
                Ok(4)
            }
        }
    }

    fn unpack(data: &[u8]) -> Result<(Self, usize), Error> {
        check_length(data, 4)?;
        let status = ClusterLibraryStatus::try_from(data[0])?;
        if status.is_success() {
            let (configuration, used) = ReportingConfiguration::unpack(&data[1..])?;
            return Ok((ReportingConfigurationRecord::Found(configuration), used + 1));
        }
        Ok((
            ReportingConfigurationRecord::Failed {
                status,
                direction: ReportingDirection::try_from(data[1])?,
                identifier: LittleEndian::read_u16(&data[2..4]),
            },
            4,
        ))
    }
}

/// Read reporting configuration response
#[derive(Clone, Debug, PartialEq)]
pub struct ReadReportingConfigurationResponse {
    /// One record per request
    pub records: Vec<ReportingConfigurationRecord>,
}

impl Pack<ReadReportingConfigurationResponse, Error> for ReadReportingConfigurationResponse {
    fn pack(&self, data: &mut [u8]) -> Result<usize, Error> {
        let mut offset = 0;
        for record in self.records.iter() {
            offset += record.pack(&mut data[offset..])?;
        }
        Ok(offset)
    }

    fn unpack(data: &[u8]) -> Result<(Self, usize), Error> {
        let mut offset = 0;
        let mut records = Vec::new();
        while offset < data.len() {
            let (record, used) = ReportingConfigurationRecord::unpack(&data[offset..])?;
            records.push(record);
            offset += used;
        }
        Ok((Self { records }, offset))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn configure_reporting_analog() {
        // Send, attribute 0x0000, unsigned 16, 1 s, 60 s, change 5
        let data = [0x00, 0x00, 0x00, 0x21, 0x01, 0x00, 0x3c, 0x00, 0x05, 0x00];
        let (cmd, used) = ConfigureReporting::unpack(&data).unwrap();
        assert_eq!(used, data.len());
        assert_eq!(
            cmd.records,
            vec![ReportingConfiguration::Send {
                identifier: 0x0000,
                data_type: AttributeDataType::Unsigned16,
                minimum_interval: 1,
                maximum_interval: 60,
                reportable_change: Some(AttributeValue::Unsigned16(5)),
            }]
        );
        let mut out = [0u8; 16];
        let used = cmd.pack(&mut out).unwrap();
        assert_eq!(out[..used], data);
    }

    #[test]
    fn configure_reporting_discrete_and_receive() {
        let data = [
            0x00, 0x00, 0x00, 0x10, 0x01, 0x00, 0x3c, 0x00, // boolean, no change field
            0x01, 0x00, 0x04, 0x78, 0x00, // receive, timeout 120 s
        ];
        let (cmd, used) = ConfigureReporting::unpack(&data).unwrap();
        assert_eq!(used, data.len());
        assert_eq!(cmd.records.len(), 2);
        assert_eq!(cmd.records[0].direction(), ReportingDirection::Send);
        assert_eq!(
            cmd.records[1],
            ReportingConfiguration::Receive {
                identifier: 0x0400,
                timeout: 120
            }
        );
    }

    #[test]
    fn configure_reporting_truncated() {
        let data = [0x00, 0x00, 0x00, 0x21, 0x01, 0x00, 0x3c, 0x00, 0x05];
        assert_eq!(
            ConfigureReporting::unpack(&data),
            Err(Error::WrongNumberOfBytes)
        );
        assert!(ConfigureReporting::unpack(&[0x02, 0x00, 0x00, 0x00, 0x00]).is_err());
    }

    #[test]
    fn configure_reporting_response() {
        let mut out = [0u8; 8];
        let response = ConfigureReportingResponse { failures: vec![] };
        assert_eq!(response.pack(&mut out).unwrap(), 1);
        let response = ConfigureReportingResponse {
            failures: vec![ConfigureReportingStatus {
                status: ClusterLibraryStatus::UnreportableAttribute,
                direction: ReportingDirection::Send,
                identifier: 0x0000,
            }],
        };
        let used = response.pack(&mut out).unwrap();
        assert_eq!(out[..used], [0x8c, 0x00, 0x00, 0x00]);
        let (parsed, _) = ConfigureReportingResponse::unpack(&out[..used]).unwrap();
        assert_eq!(parsed, response);
    }

    #[test]
    fn read_reporting_configuration() {
        let data = [0x00, 0x00, 0x00, 0x01, 0x02, 0x00];
        let (cmd, _) = ReadReportingConfiguration::unpack(&data).unwrap();
        assert_eq!(cmd.records[1].direction, ReportingDirection::Receive);
        assert_eq!(cmd.records[1].identifier, 0x0002);

        let response = ReadReportingConfigurationResponse {
            records: vec![
                ReportingConfigurationRecord::Found(ReportingConfiguration::Send {
                    identifier: 0x0000,
                    data_type: AttributeDataType::Boolean,
                    minimum_interval: 1,
                    maximum_interval: 60,
                    reportable_change: None,
                }),
                ReportingConfigurationRecord::Failed {
                    status: ClusterLibraryStatus::NotFound,
                    direction: ReportingDirection::Receive,
                    identifier: 0x0002,
                },
            ],
        };
        let mut out = [0u8; 32];
        let used = response.pack(&mut out).unwrap();
        assert_eq!(
            out[..used],
            [0x00, 0x00, 0x00, 0x00, 0x10, 0x01, 0x00, 0x3c, 0x00, 0x8b, 0x01, 0x02, 0x00]
        );
        let (parsed, _) = ReadReportingConfigurationResponse::unpack(&out[..used]).unwrap();
        assert_eq!(parsed, response);
    }
}
