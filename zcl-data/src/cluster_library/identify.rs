//! # Identify Cluster

use super::ClusterCommand;
use crate::utils::{Reader, Writer};
use crate::Error;

/// Identify cluster
pub const CLUSTER: u16 = 0x0003;
/// Cluster revision declared when nothing else is configured
pub const CLUSTER_REVISION: u16 = 2;

/// Remaining identify time in seconds
pub const ATTR_IDENTIFY_TIME: u16 = 0x0000;

/// Identify, sets the identify time
pub const CMD_IDENTIFY: u8 = 0x00;
/// Identify query
pub const CMD_IDENTIFY_QUERY: u8 = 0x01;
/// Trigger effect
pub const CMD_TRIGGER_EFFECT: u8 = 0x40;
/// Identify query response, sent by the server
pub const CMD_IDENTIFY_QUERY_RESPONSE: u8 = 0x00;

extended_enum!(
    /// Identify effects
    EffectIdentifier, u8,
    /// Light on and off once
    Blink => 0x00,
    /// Light on and off over one second, repeated 15 times
    Breathe => 0x01,
    /// Colored light goes green for one second
    Okay => 0x02,
    /// Colored light goes orange for eight seconds
    ChannelChange => 0x0b,
    /// Complete the current effect sequence before terminating
    FinishEffect => 0xfe,
    /// Terminate the effect as soon as possible
    StopEffect => 0xff,
);

/// Commands received by the identify server
#[derive(Clone, Debug, PartialEq)]
pub enum IdentifyCommand {
    /// Start or stop identifying
    Identify {
        /// Identify time in seconds, zero stops
        identify_time: u16,
    },
    /// Query if the device is identifying
    IdentifyQuery,
    /// Trigger a visual effect
    TriggerEffect {
        /// Effect to run
        effect: EffectIdentifier,
        /// Effect variant
        variant: u8,
    },
}

impl ClusterCommand for IdentifyCommand {
    fn identifier(&self) -> u8 {
        match self {
            IdentifyCommand::Identify { .. } => CMD_IDENTIFY,
            IdentifyCommand::IdentifyQuery => CMD_IDENTIFY_QUERY,
            IdentifyCommand::TriggerEffect { .. } => CMD_TRIGGER_EFFECT,
        }
    }

    fn pack(&self, data: &mut [u8]) -> Result<usize, Error> {
        let mut writer = Writer::new(data);
        match self {
            IdentifyCommand::Identify { identify_time } => writer.u16(*identify_time)?,
            IdentifyCommand::IdentifyQuery => (),
            IdentifyCommand::TriggerEffect { effect, variant } => {
                writer.u8(u8::from(*effect))?;
                writer.u8(*variant)?;
            }
        }
        Ok(writer.used())
    }

    fn unpack(identifier: u8, data: &[u8]) -> Result<Self, Error> {
        let mut reader = Reader::new(data);
        match identifier {
            CMD_IDENTIFY => Ok(IdentifyCommand::Identify {
                identify_time: reader.u16()?,
            }),
            CMD_IDENTIFY_QUERY => Ok(IdentifyCommand::IdentifyQuery),
            CMD_TRIGGER_EFFECT => Ok(IdentifyCommand::TriggerEffect {
                effect: EffectIdentifier::try_from(reader.u8()?)?,
                variant: reader.u8()?,
            }),
            _ => Err(Error::UnknownCommand),
        }
    }
}

/// Commands received by the identify client
#[derive(Clone, Debug, PartialEq)]
pub enum IdentifyResponse {
    /// The server is identifying
    IdentifyQueryResponse {
        /// Remaining identify time in seconds
        timeout: u16,
    },
}

impl ClusterCommand for IdentifyResponse {
    fn identifier(&self) -> u8 {
        CMD_IDENTIFY_QUERY_RESPONSE
    }

    fn pack(&self, data: &mut [u8]) -> Result<usize, Error> {
        let mut writer = Writer::new(data);
        match self {
            IdentifyResponse::IdentifyQueryResponse { timeout } => writer.u16(*timeout)?,
        }
        Ok(writer.used())
    }

    fn unpack(identifier: u8, data: &[u8]) -> Result<Self, Error> {
        let mut reader = Reader::new(data);
        match identifier {
            CMD_IDENTIFY_QUERY_RESPONSE => Ok(IdentifyResponse::IdentifyQueryResponse {
                timeout: reader.u16()?,
            }),
            _ => Err(Error::UnknownCommand),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn identify() {
        let cmd = IdentifyCommand::unpack(CMD_IDENTIFY, &[0x0a, 0x00]).unwrap();
        assert_eq!(cmd, IdentifyCommand::Identify { identify_time: 10 });
        assert_eq!(
            IdentifyCommand::unpack(CMD_IDENTIFY, &[0x0a]),
            Err(Error::WrongNumberOfBytes)
        );
    }

    #[test]
    fn trigger_effect() {
        let cmd = IdentifyCommand::unpack(CMD_TRIGGER_EFFECT, &[0x01, 0x00]).unwrap();
        assert_eq!(
            cmd,
            IdentifyCommand::TriggerEffect {
                effect: EffectIdentifier::Breathe,
                variant: 0
            }
        );
        let mut data = [0u8; 4];
        assert_eq!(cmd.pack(&mut data).unwrap(), 2);
        assert_eq!(
            IdentifyCommand::unpack(CMD_TRIGGER_EFFECT, &[0x05, 0x00]),
            Err(Error::InvalidValue)
        );
    }

    #[test]
    fn query_response() {
        let response = IdentifyResponse::IdentifyQueryResponse { timeout: 0x0102 };
        let mut data = [0u8; 2];
        assert_eq!(response.pack(&mut data).unwrap(), 2);
        assert_eq!(data, [0x02, 0x01]);
    }
}
