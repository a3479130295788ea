//! # On/Off Cluster

use super::ClusterCommand;
use crate::utils::{Reader, Writer};
use crate::Error;

/// On/off cluster
pub const CLUSTER: u16 = 0x0006;
/// Cluster revision declared when nothing else is configured
pub const CLUSTER_REVISION: u16 = 2;

/// On/off state, boolean
pub const ATTR_ON_OFF: u16 = 0x0000;
/// Global scene control, boolean
pub const ATTR_GLOBAL_SCENE_CONTROL: u16 = 0x4000;
/// On time, 1/10 s
pub const ATTR_ON_TIME: u16 = 0x4001;
/// Off wait time, 1/10 s
pub const ATTR_OFF_WAIT_TIME: u16 = 0x4002;
/// Start up on/off behaviour
pub const ATTR_START_UP_ON_OFF: u16 = 0x4003;

/// Off
pub const CMD_OFF: u8 = 0x00;
/// On
pub const CMD_ON: u8 = 0x01;
/// Toggle
pub const CMD_TOGGLE: u8 = 0x02;
/// Off with effect
pub const CMD_OFF_WITH_EFFECT: u8 = 0x40;
/// On with recall global scene
pub const CMD_ON_WITH_RECALL_GLOBAL_SCENE: u8 = 0x41;
/// On with timed off
pub const CMD_ON_WITH_TIMED_OFF: u8 = 0x42;

/// On with timed off control, only accept when on
pub const ACCEPT_ONLY_WHEN_ON: u8 = 0x01;

/// Commands received by the on/off server
#[derive(Clone, Debug, PartialEq)]
pub enum OnOffCommand {
    /// Turn off
    Off,
    /// Turn on
    On,
    /// Toggle
    Toggle,
    /// Turn off with an effect
    OffWithEffect {
        /// Effect identifier
        effect: u8,
        /// Effect variant
        variant: u8,
    },
    /// Turn on and recall the global scene
    OnWithRecallGlobalScene,
    /// Turn on for a period of time
    OnWithTimedOff {
        /// Control bits
        control: u8,
        /// On time in 1/10 s
        on_time: u16,
        /// Off wait time in 1/10 s
        off_wait_time: u16,
    },
}

impl ClusterCommand for OnOffCommand {
    fn identifier(&self) -> u8 {
        match self {
            OnOffCommand::Off => CMD_OFF,
            OnOffCommand::On => CMD_ON,
            OnOffCommand::Toggle => CMD_TOGGLE,
            OnOffCommand::OffWithEffect { .. } => CMD_OFF_WITH_EFFECT,
            OnOffCommand::OnWithRecallGlobalScene => CMD_ON_WITH_RECALL_GLOBAL_SCENE,
            OnOffCommand::OnWithTimedOff { .. } => CMD_ON_WITH_TIMED_OFF,
        }
    }

    fn pack(&self, data: &mut [u8]) -> Result<usize, Error> {
        let mut writer = Writer::new(data);
        match self {
            OnOffCommand::OffWithEffect { effect, variant } => {
                writer.u8(*effect)?;
                writer.u8(*variant)?;
            }
            OnOffCommand::OnWithTimedOff {
                control,
                on_time,
                off_wait_time,
            } => {
                writer.u8(*control)?;
                writer.u16(*on_time)?;
                writer.u16(*off_wait_time)?;
            }
            _ => (),
        }
        Ok(writer.used())
    }

    fn unpack(identifier: u8, data: &[u8]) -> Result<Self, Error> {
        let mut reader = Reader::new(data);
        match identifier {
            CMD_OFF => Ok(OnOffCommand::Off),
            CMD_ON => Ok(OnOffCommand::On),
            CMD_TOGGLE => Ok(OnOffCommand::Toggle),
            CMD_OFF_WITH_EFFECT => Ok(OnOffCommand::OffWithEffect {
                effect: reader.u8()?,
                variant: reader.u8()?,
            }),
            CMD_ON_WITH_RECALL_GLOBAL_SCENE => Ok(OnOffCommand::OnWithRecallGlobalScene),
            CMD_ON_WITH_TIMED_OFF => Ok(OnOffCommand::OnWithTimedOff {
                control: reader.u8()?,
                on_time: reader.u16()?,
                off_wait_time: reader.u16()?,
            }),
            _ => Err(Error::UnknownCommand),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn simple_commands() {
        assert_eq!(OnOffCommand::unpack(0x00, &[]).unwrap(), OnOffCommand::Off);
        assert_eq!(OnOffCommand::unpack(0x01, &[]).unwrap(), OnOffCommand::On);
        assert_eq!(OnOffCommand::unpack(0x02, &[]).unwrap(), OnOffCommand::Toggle);
        assert_eq!(OnOffCommand::unpack(0x03, &[]), Err(Error::UnknownCommand));
    }

    #[test]
    fn on_with_timed_off() {
        let data = [0x01, 0x32, 0x00, 0x0a, 0x00];
        let cmd = OnOffCommand::unpack(CMD_ON_WITH_TIMED_OFF, &data).unwrap();
        assert_eq!(
            cmd,
            OnOffCommand::OnWithTimedOff {
                control: ACCEPT_ONLY_WHEN_ON,
                on_time: 50,
                off_wait_time: 10
            }
        );
        let mut out = [0u8; 8];
        let used = cmd.pack(&mut out).unwrap();
        assert_eq!(out[..used], data);
        assert_eq!(
            OnOffCommand::unpack(CMD_ON_WITH_TIMED_OFF, &data[..4]),
            Err(Error::WrongNumberOfBytes)
        );
    }
}
