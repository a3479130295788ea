//! # Level Control Cluster

use super::{ClusterCommand, CommandOptions};
use crate::utils::{Reader, Writer};
use crate::Error;

/// Level control cluster
pub const CLUSTER: u16 = 0x0008;
/// Cluster revision declared when nothing else is configured
pub const CLUSTER_REVISION: u16 = 3;
/// First revision where commands carry options mask and override
pub const OPTIONS_REVISION: u16 = 2;

/// Current level
pub const ATTR_CURRENT_LEVEL: u16 = 0x0000;
/// Remaining transition time, 1/10 s
pub const ATTR_REMAINING_TIME: u16 = 0x0001;
/// Minimum level
pub const ATTR_MIN_LEVEL: u16 = 0x0002;
/// Maximum level
pub const ATTR_MAX_LEVEL: u16 = 0x0003;
/// Options bitmap
pub const ATTR_OPTIONS: u16 = 0x000f;
/// Transition time used by on/off commands, 1/10 s
pub const ATTR_ON_OFF_TRANSITION_TIME: u16 = 0x0010;
/// Level used when turned on
pub const ATTR_ON_LEVEL: u16 = 0x0011;
/// Move rate used when a move command carries 0xff
pub const ATTR_DEFAULT_MOVE_RATE: u16 = 0x0014;
/// Level at start up
pub const ATTR_START_UP_CURRENT_LEVEL: u16 = 0x4000;

/// Lowest level
pub const LEVEL_MIN: u8 = 0x01;
/// Highest level
pub const LEVEL_MAX: u8 = 0xfe;

/// Option bit, execute commands even when the device is off
pub const OPTION_EXECUTE_IF_OFF: u8 = 0x01;

/// Move to level
pub const CMD_MOVE_TO_LEVEL: u8 = 0x00;
/// Move
pub const CMD_MOVE: u8 = 0x01;
/// Step
pub const CMD_STEP: u8 = 0x02;
/// Stop
pub const CMD_STOP: u8 = 0x03;
/// Move to level, with on/off
pub const CMD_MOVE_TO_LEVEL_WITH_ON_OFF: u8 = 0x04;
/// Move, with on/off
pub const CMD_MOVE_WITH_ON_OFF: u8 = 0x05;
/// Step, with on/off
pub const CMD_STEP_WITH_ON_OFF: u8 = 0x06;
/// Stop, with on/off
pub const CMD_STOP_WITH_ON_OFF: u8 = 0x07;

extended_enum!(
    /// Direction of move and step commands
    MoveMode, u8,
    /// Towards higher levels
    Up => 0x00,
    /// Towards lower levels
    Down => 0x01,
);

/// Level control command payload
#[derive(Clone, Debug, PartialEq)]
pub enum LevelCommand {
    /// Move to a level over a transition time
    MoveToLevel {
        /// Target level
        level: u8,
        /// Transition time in 1/10 s, 0xffff uses the on/off transition time
        transition_time: u16,
        /// Options mask and override
        options: Option<CommandOptions>,
    },
    /// Move continuously
    Move {
        /// Direction
        mode: MoveMode,
        /// Rate in units per second, 0xff uses the default move rate
        rate: u8,
        /// Options mask and override
        options: Option<CommandOptions>,
    },
    /// Step by a fixed amount
    Step {
        /// Direction
        mode: MoveMode,
        /// Step size
        step_size: u8,
        /// Transition time in 1/10 s
        transition_time: u16,
        /// Options mask and override
        options: Option<CommandOptions>,
    },
    /// Stop any transition
    Stop {
        /// Options mask and override
        options: Option<CommandOptions>,
    },
}

/// Commands received by the level control server
#[derive(Clone, Debug, PartialEq)]
pub struct LevelControlCommand {
    /// The command
    pub command: LevelCommand,
    /// The with on/off variant, which also drives the on/off cluster
    pub with_on_off: bool,
}

impl LevelControlCommand {
    /// Command without on/off coupling
    pub fn new(command: LevelCommand) -> Self {
        Self {
            command,
            with_on_off: false,
        }
    }

    /// Options of the command
    pub fn options(&self) -> Option<CommandOptions> {
        match &self.command {
            LevelCommand::MoveToLevel { options, .. }
            | LevelCommand::Move { options, .. }
            | LevelCommand::Step { options, .. }
            | LevelCommand::Stop { options } => *options,
        }
    }

    /// Drop the options fields for peers using an older revision
    pub fn without_options(mut self) -> Self {
        match &mut self.command {
            LevelCommand::MoveToLevel { options, .. }
            | LevelCommand::Move { options, .. }
            | LevelCommand::Step { options, .. }
            | LevelCommand::Stop { options } => *options = None,
        }
        self
    }
}

impl ClusterCommand for LevelControlCommand {
    fn identifier(&self) -> u8 {
        let base = match self.command {
            LevelCommand::MoveToLevel { .. } => CMD_MOVE_TO_LEVEL,
            LevelCommand::Move { .. } => CMD_MOVE,
            LevelCommand::Step { .. } => CMD_STEP,
            LevelCommand::Stop { .. } => CMD_STOP,
        };
        if self.with_on_off {
            base + CMD_MOVE_TO_LEVEL_WITH_ON_OFF
        } else {
            base
        }
    }

    fn pack(&self, data: &mut [u8]) -> Result<usize, Error> {
        let mut writer = Writer::new(data);
        let options = match &self.command {
            LevelCommand::MoveToLevel {
                level,
                transition_time,
                options,
            } => {
                writer.u8(*level)?;
                writer.u16(*transition_time)?;
                options
            }
            LevelCommand::Move {
                mode,
                rate,
                options,
            } => {
                writer.u8(u8::from(*mode))?;
                writer.u8(*rate)?;
                options
            }
            LevelCommand::Step {
                mode,
                step_size,
                transition_time,
                options,
            } => {
                writer.u8(u8::from(*mode))?;
                writer.u8(*step_size)?;
                writer.u16(*transition_time)?;
                options
            }
            LevelCommand::Stop { options } => options,
        };
        CommandOptions::write(options, &mut writer)?;
        Ok(writer.used())
    }

    fn unpack(identifier: u8, data: &[u8]) -> Result<Self, Error> {
        let mut reader = Reader::new(data);
        let with_on_off = identifier >= CMD_MOVE_TO_LEVEL_WITH_ON_OFF;
        let command = match identifier {
            CMD_MOVE_TO_LEVEL | CMD_MOVE_TO_LEVEL_WITH_ON_OFF => {
                let level = reader.u8()?;
                let transition_time = reader.u16()?;
                LevelCommand::MoveToLevel {
                    level,
                    transition_time,
                    options: CommandOptions::read(&mut reader)?,
                }
            }
            CMD_MOVE | CMD_MOVE_WITH_ON_OFF => {
                let mode = MoveMode::try_from(reader.u8()?)?;
                let rate = reader.u8()?;
                LevelCommand::Move {
                    mode,
                    rate,
                    options: CommandOptions::read(&mut reader)?,
                }
            }
            CMD_STEP | CMD_STEP_WITH_ON_OFF => {
                let mode = MoveMode::try_from(reader.u8()?)?;
                let step_size = reader.u8()?;
                let transition_time = reader.u16()?;
                LevelCommand::Step {
                    mode,
                    step_size,
                    transition_time,
                    options: CommandOptions::read(&mut reader)?,
                }
            }
            CMD_STOP | CMD_STOP_WITH_ON_OFF => LevelCommand::Stop {
                options: CommandOptions::read(&mut reader)?,
            },
            _ => return Err(Error::UnknownCommand),
        };
        Ok(Self {
            command,
            with_on_off,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn move_to_level() {
        let cmd = LevelControlCommand::unpack(CMD_MOVE_TO_LEVEL, &[0x80, 0x0a, 0x00]).unwrap();
        assert_eq!(
            cmd,
            LevelControlCommand::new(LevelCommand::MoveToLevel {
                level: 0x80,
                transition_time: 10,
                options: None
            })
        );
        assert_eq!(cmd.identifier(), CMD_MOVE_TO_LEVEL);
    }

    #[test]
    fn with_on_off_and_options() {
        let data = [0x01, 0x05, 0x01, 0x01];
        let cmd = LevelControlCommand::unpack(CMD_MOVE_WITH_ON_OFF, &data).unwrap();
        assert!(cmd.with_on_off);
        assert_eq!(cmd.identifier(), CMD_MOVE_WITH_ON_OFF);
        assert_eq!(
            cmd.options(),
            Some(CommandOptions {
                mask: 0x01,
                overrides: 0x01
            })
        );
        let mut out = [0u8; 8];
        assert_eq!(cmd.pack(&mut out).unwrap(), 4);
        let short = cmd.without_options();
        assert_eq!(short.pack(&mut out).unwrap(), 2);
    }

    #[test]
    fn step_and_stop() {
        let cmd = LevelControlCommand::unpack(CMD_STEP, &[0x00, 0x10, 0x05, 0x00]).unwrap();
        match cmd.command {
            LevelCommand::Step {
                mode, step_size, ..
            } => {
                assert_eq!(mode, MoveMode::Up);
                assert_eq!(step_size, 0x10);
            }
            _ => panic!("not a step"),
        }
        let cmd = LevelControlCommand::unpack(CMD_STOP_WITH_ON_OFF, &[]).unwrap();
        assert_eq!(cmd.command, LevelCommand::Stop { options: None });
        assert_eq!(
            LevelControlCommand::unpack(CMD_MOVE, &[0x02, 0x01]),
            Err(Error::InvalidValue)
        );
        assert_eq!(
            LevelControlCommand::unpack(0x09, &[]),
            Err(Error::UnknownCommand)
        );
    }

    #[test]
    fn effective_options() {
        let options = Some(CommandOptions {
            mask: OPTION_EXECUTE_IF_OFF,
            overrides: OPTION_EXECUTE_IF_OFF,
        });
        assert_eq!(CommandOptions::effective(options, 0x00), 0x01);
        assert_eq!(CommandOptions::effective(None, 0x00), 0x00);
    }
}
