//! # Color Control Cluster
//!
//! Hue, saturation, CIE xy and color temperature commands. Every command may
//! carry an options mask and override, peers using cluster revisions before
//! `OPTIONS_REVISION` leave them out.

use super::{ClusterCommand, CommandOptions};
use crate::utils::{Reader, Writer};
use crate::Error;

/// Color control cluster
pub const CLUSTER: u16 = 0x0300;
/// Cluster revision declared when nothing else is configured
pub const CLUSTER_REVISION: u16 = 3;
/// First revision where commands carry options mask and override
pub const OPTIONS_REVISION: u16 = 2;

/// Current hue, 0 to 0xfe
pub const ATTR_CURRENT_HUE: u16 = 0x0000;
/// Current saturation, 0 to 0xfe
pub const ATTR_CURRENT_SATURATION: u16 = 0x0001;
/// Remaining transition time, 1/10 s
pub const ATTR_REMAINING_TIME: u16 = 0x0002;
/// CIE x
pub const ATTR_CURRENT_X: u16 = 0x0003;
/// CIE y
pub const ATTR_CURRENT_Y: u16 = 0x0004;
/// Color temperature in mireds
pub const ATTR_COLOR_TEMPERATURE: u16 = 0x0007;
/// Color mode
pub const ATTR_COLOR_MODE: u16 = 0x0008;
/// Options bitmap
pub const ATTR_OPTIONS: u16 = 0x000f;
/// Number of primaries
pub const ATTR_NUMBER_OF_PRIMARIES: u16 = 0x0010;
/// Enhanced current hue, 16-bit hue
pub const ATTR_ENHANCED_CURRENT_HUE: u16 = 0x4000;
/// Enhanced color mode
pub const ATTR_ENHANCED_COLOR_MODE: u16 = 0x4001;
/// Color loop active
pub const ATTR_COLOR_LOOP_ACTIVE: u16 = 0x4002;
/// Color loop direction, 0 decrement, 1 increment
pub const ATTR_COLOR_LOOP_DIRECTION: u16 = 0x4003;
/// Color loop time, seconds for a full loop
pub const ATTR_COLOR_LOOP_TIME: u16 = 0x4004;
/// Color loop start enhanced hue
pub const ATTR_COLOR_LOOP_START_ENHANCED_HUE: u16 = 0x4005;
/// Enhanced hue stored when the color loop started
pub const ATTR_COLOR_LOOP_STORED_ENHANCED_HUE: u16 = 0x4006;
/// Color capabilities
pub const ATTR_COLOR_CAPABILITIES: u16 = 0x400a;
/// Lowest physical color temperature
pub const ATTR_COLOR_TEMP_PHYSICAL_MIN_MIREDS: u16 = 0x400b;
/// Highest physical color temperature
pub const ATTR_COLOR_TEMP_PHYSICAL_MAX_MIREDS: u16 = 0x400c;
/// Color temperature at start up
pub const ATTR_START_UP_COLOR_TEMPERATURE_MIREDS: u16 = 0x4010;

/// Highest hue and saturation
pub const HUE_SATURATION_MAX: u8 = 0xfe;
/// Highest CIE x, y and color temperature
pub const COLOR_MAX: u16 = 0xfeff;

/// Move to hue
pub const CMD_MOVE_TO_HUE: u8 = 0x00;
/// Move hue
pub const CMD_MOVE_HUE: u8 = 0x01;
/// Step hue
pub const CMD_STEP_HUE: u8 = 0x02;
/// Move to saturation
pub const CMD_MOVE_TO_SATURATION: u8 = 0x03;
/// Move saturation
pub const CMD_MOVE_SATURATION: u8 = 0x04;
/// Step saturation
pub const CMD_STEP_SATURATION: u8 = 0x05;
/// Move to hue and saturation
pub const CMD_MOVE_TO_HUE_SATURATION: u8 = 0x06;
/// Move to color
pub const CMD_MOVE_TO_COLOR: u8 = 0x07;
/// Move color
pub const CMD_MOVE_COLOR: u8 = 0x08;
/// Step color
pub const CMD_STEP_COLOR: u8 = 0x09;
/// Move to color temperature
pub const CMD_MOVE_TO_COLOR_TEMPERATURE: u8 = 0x0a;
/// Enhanced move to hue
pub const CMD_ENHANCED_MOVE_TO_HUE: u8 = 0x40;
/// Enhanced move hue
pub const CMD_ENHANCED_MOVE_HUE: u8 = 0x41;
/// Enhanced step hue
pub const CMD_ENHANCED_STEP_HUE: u8 = 0x42;
/// Enhanced move to hue and saturation
pub const CMD_ENHANCED_MOVE_TO_HUE_SATURATION: u8 = 0x43;
/// Color loop set
pub const CMD_COLOR_LOOP_SET: u8 = 0x44;
/// Stop move step
pub const CMD_STOP_MOVE_STEP: u8 = 0x47;
/// Move color temperature
pub const CMD_MOVE_COLOR_TEMPERATURE: u8 = 0x4b;
/// Step color temperature
pub const CMD_STEP_COLOR_TEMPERATURE: u8 = 0x4c;

/// Commands received by the color control server, in discovery order
pub const RECEIVED_COMMANDS: [u8; 19] = [
    CMD_MOVE_TO_HUE,
    CMD_MOVE_HUE,
    CMD_STEP_HUE,
    CMD_MOVE_TO_SATURATION,
    CMD_MOVE_SATURATION,
    CMD_STEP_SATURATION,
    CMD_MOVE_TO_HUE_SATURATION,
    CMD_MOVE_TO_COLOR,
    CMD_MOVE_COLOR,
    CMD_STEP_COLOR,
    CMD_MOVE_TO_COLOR_TEMPERATURE,
    CMD_ENHANCED_MOVE_TO_HUE,
    CMD_ENHANCED_MOVE_HUE,
    CMD_ENHANCED_STEP_HUE,
    CMD_ENHANCED_MOVE_TO_HUE_SATURATION,
    CMD_COLOR_LOOP_SET,
    CMD_STOP_MOVE_STEP,
    CMD_MOVE_COLOR_TEMPERATURE,
    CMD_STEP_COLOR_TEMPERATURE,
];

extended_enum!(
    /// Color mode
    ColorMode, u8,
    /// Current hue and saturation
    HueSaturation => 0x00,
    /// Current x and y
    CurrentXy => 0x01,
    /// Color temperature
    ColorTemperature => 0x02,
    /// Enhanced current hue and saturation, only in the enhanced color mode
    EnhancedHueSaturation => 0x03,
);

extended_enum!(
    /// Direction of move to hue
    HueDirection, u8,
    /// Shortest distance
    Shortest => 0x00,
    /// Longest distance
    Longest => 0x01,
    /// Increasing hue
    Up => 0x02,
    /// Decreasing hue
    Down => 0x03,
);

extended_enum!(
    /// Mode of move commands
    MoveMode, u8,
    /// Stop moving
    Stop => 0x00,
    /// Increasing values
    Up => 0x01,
    /// Decreasing values
    Down => 0x03,
);

extended_enum!(
    /// Mode of step commands
    StepMode, u8,
    /// Increasing values
    Up => 0x01,
    /// Decreasing values
    Down => 0x03,
);

extended_enum!(
    /// Color loop action
    ColorLoopAction, u8,
    /// Stop the loop
    Deactivate => 0x00,
    /// Start from the color loop start enhanced hue
    ActivateFromStart => 0x01,
    /// Start from the enhanced current hue
    ActivateFromCurrent => 0x02,
);

bitflags! {
    /// Fields of color loop set that are applied
    #[derive(Clone, Copy, Debug, PartialEq, Eq)]
    pub struct ColorLoopUpdate: u8 {
        /// Apply the action
        const ACTION = 0b0000_0001;
        /// Apply the direction
        const DIRECTION = 0b0000_0010;
        /// Apply the time
        const TIME = 0b0000_0100;
        /// Apply the start hue
        const START_HUE = 0b0000_1000;
    }
}

/// Commands received by the color control server
#[derive(Clone, Debug, PartialEq)]
pub enum ColorControlCommand {
    MoveToHue {
        hue: u8,
        direction: HueDirection,
        transition_time: u16,
        options: Option<CommandOptions>,
    },
    MoveHue {
        mode: MoveMode,
        /// Hue steps per second
        rate: u8,
        options: Option<CommandOptions>,
    },
    StepHue {
        mode: StepMode,
        step_size: u8,
        /// 1/10 s, one byte
        transition_time: u8,
        options: Option<CommandOptions>,
    },
    MoveToSaturation {
        saturation: u8,
        transition_time: u16,
        options: Option<CommandOptions>,
    },
    MoveSaturation {
        mode: MoveMode,
        rate: u8,
        options: Option<CommandOptions>,
    },
    StepSaturation {
        mode: StepMode,
        step_size: u8,
        transition_time: u8,
        options: Option<CommandOptions>,
    },
    MoveToHueAndSaturation {
        hue: u8,
        saturation: u8,
        transition_time: u16,
        options: Option<CommandOptions>,
    },
    MoveToColor {
        x: u16,
        y: u16,
        transition_time: u16,
        options: Option<CommandOptions>,
    },
    MoveColor {
        rate_x: i16,
        rate_y: i16,
        options: Option<CommandOptions>,
    },
    StepColor {
        step_x: i16,
        step_y: i16,
        transition_time: u16,
        options: Option<CommandOptions>,
    },
    MoveToColorTemperature {
        mireds: u16,
        transition_time: u16,
        options: Option<CommandOptions>,
    },
    EnhancedMoveToHue {
        enhanced_hue: u16,
        direction: HueDirection,
        transition_time: u16,
        options: Option<CommandOptions>,
    },
    EnhancedMoveHue {
        mode: MoveMode,
        rate: u16,
        options: Option<CommandOptions>,
    },
    EnhancedStepHue {
        mode: StepMode,
        step_size: u16,
        transition_time: u16,
        options: Option<CommandOptions>,
    },
    EnhancedMoveToHueAndSaturation {
        enhanced_hue: u16,
        saturation: u8,
        transition_time: u16,
        options: Option<CommandOptions>,
    },
    ColorLoopSet {
        update: ColorLoopUpdate,
        action: ColorLoopAction,
        /// 0 decrement, 1 increment
        direction: u8,
        /// Seconds for a full loop
        time: u16,
        start_hue: u16,
        options: Option<CommandOptions>,
    },
    StopMoveStep {
        options: Option<CommandOptions>,
    },
    MoveColorTemperature {
        mode: MoveMode,
        rate: u16,
        minimum: u16,
        maximum: u16,
        options: Option<CommandOptions>,
    },
    StepColorTemperature {
        mode: StepMode,
        step_size: u16,
        transition_time: u16,
        minimum: u16,
        maximum: u16,
        options: Option<CommandOptions>,
    },
}

impl ColorControlCommand {
    fn options_mut(&mut self) -> &mut Option<CommandOptions> {
        match self {
            ColorControlCommand::MoveToHue { options, .. }
            | ColorControlCommand::MoveHue { options, .. }
            | ColorControlCommand::StepHue { options, .. }
            | ColorControlCommand::MoveToSaturation { options, .. }
            | ColorControlCommand::MoveSaturation { options, .. }
            | ColorControlCommand::StepSaturation { options, .. }
            | ColorControlCommand::MoveToHueAndSaturation { options, .. }
            | ColorControlCommand::MoveToColor { options, .. }
            | ColorControlCommand::MoveColor { options, .. }
            | ColorControlCommand::StepColor { options, .. }
            | ColorControlCommand::MoveToColorTemperature { options, .. }
            | ColorControlCommand::EnhancedMoveToHue { options, .. }
            | ColorControlCommand::EnhancedMoveHue { options, .. }
            | ColorControlCommand::EnhancedStepHue { options, .. }
            | ColorControlCommand::EnhancedMoveToHueAndSaturation { options, .. }
            | ColorControlCommand::ColorLoopSet { options, .. }
            | ColorControlCommand::StopMoveStep { options }
            | ColorControlCommand::MoveColorTemperature { options, .. }
            | ColorControlCommand::StepColorTemperature { options, .. } => options,
        }
    }

    /// Options of the command
    pub fn options(&self) -> Option<CommandOptions> {
        match self {
            ColorControlCommand::MoveToHue { options, .. }
            | ColorControlCommand::MoveHue { options, .. }
            | ColorControlCommand::StepHue { options, .. }
            | ColorControlCommand::MoveToSaturation { options, .. }
            | ColorControlCommand::MoveSaturation { options, .. }
            | ColorControlCommand::StepSaturation { options, .. }
            | ColorControlCommand::MoveToHueAndSaturation { options, .. }
            | ColorControlCommand::MoveToColor { options, .. }
            | ColorControlCommand::MoveColor { options, .. }
            | ColorControlCommand::StepColor { options, .. }
            | ColorControlCommand::MoveToColorTemperature { options, .. }
            | ColorControlCommand::EnhancedMoveToHue { options, .. }
            | ColorControlCommand::EnhancedMoveHue { options, .. }
            | ColorControlCommand::EnhancedStepHue { options, .. }
            | ColorControlCommand::EnhancedMoveToHueAndSaturation { options, .. }
            | ColorControlCommand::ColorLoopSet { options, .. }
            | ColorControlCommand::StopMoveStep { options }
            | ColorControlCommand::MoveColorTemperature { options, .. }
            | ColorControlCommand::StepColorTemperature { options, .. } => *options,
        }
    }

    /// Set, or clear, the options fields
    pub fn with_options(mut self, options: Option<CommandOptions>) -> Self {
        *self.options_mut() = options;
        self
    }
}

impl ClusterCommand for ColorControlCommand {
    fn identifier(&self) -> u8 {
        match self {
            ColorControlCommand::MoveToHue { .. } => CMD_MOVE_TO_HUE,
            ColorControlCommand::MoveHue { .. } => CMD_MOVE_HUE,
            ColorControlCommand::StepHue { .. } => CMD_STEP_HUE,
            ColorControlCommand::MoveToSaturation { .. } => CMD_MOVE_TO_SATURATION,
            ColorControlCommand::MoveSaturation { .. } => CMD_MOVE_SATURATION,
            ColorControlCommand::StepSaturation { .. } => CMD_STEP_SATURATION,
            ColorControlCommand::MoveToHueAndSaturation { .. } => CMD_MOVE_TO_HUE_SATURATION,
            ColorControlCommand::MoveToColor { .. } => CMD_MOVE_TO_COLOR,
            ColorControlCommand::MoveColor { .. } => CMD_MOVE_COLOR,
            ColorControlCommand::StepColor { .. } => CMD_STEP_COLOR,
            ColorControlCommand::MoveToColorTemperature { .. } => CMD_MOVE_TO_COLOR_TEMPERATURE,
            ColorControlCommand::EnhancedMoveToHue { .. } => CMD_ENHANCED_MOVE_TO_HUE,
            ColorControlCommand::EnhancedMoveHue { .. } => CMD_ENHANCED_MOVE_HUE,
            ColorControlCommand::EnhancedStepHue { .. } => CMD_ENHANCED_STEP_HUE,
            ColorControlCommand::EnhancedMoveToHueAndSaturation { .. } => {
                CMD_ENHANCED_MOVE_TO_HUE_SATURATION
            }
            ColorControlCommand::ColorLoopSet { .. } => CMD_COLOR_LOOP_SET,
            ColorControlCommand::StopMoveStep { .. } => CMD_STOP_MOVE_STEP,
            ColorControlCommand::MoveColorTemperature { .. } => CMD_MOVE_COLOR_TEMPERATURE,
            ColorControlCommand::StepColorTemperature { .. } => CMD_STEP_COLOR_TEMPERATURE,
        }
    }

    fn pack(&self, data: &mut [u8]) -> Result<usize, Error> {
        let mut w = Writer::new(data);
        match self {
            ColorControlCommand::MoveToHue {
                hue,
                direction,
                transition_time,
                ..
            } => {
                w.u8(*hue)?;
                w.u8(u8::from(*direction))?;
                w.u16(*transition_time)?;
            }
            ColorControlCommand::MoveHue { mode, rate, .. }
            | ColorControlCommand::MoveSaturation { mode, rate, .. } => {
                w.u8(u8::from(*mode))?;
                w.u8(*rate)?;
            }
            ColorControlCommand::StepHue {
                mode,
                step_size,
                transition_time,
                ..
            }
            | ColorControlCommand::StepSaturation {
                mode,
                step_size,
                transition_time,
                ..
            } => {
                w.u8(u8::from(*mode))?;
                w.u8(*step_size)?;
                w.u8(*transition_time)?;
            }
            ColorControlCommand::MoveToSaturation {
                saturation,
                transition_time,
                ..
            } => {
                w.u8(*saturation)?;
                w.u16(*transition_time)?;
            }
            ColorControlCommand::MoveToHueAndSaturation {
                hue,
                saturation,
                transition_time,
                ..
            } => {
                w.u8(*hue)?;
                w.u8(*saturation)?;
                w.u16(*transition_time)?;
            }
            ColorControlCommand::MoveToColor {
                x,
                y,
                transition_time,
                ..
            } => {
                w.u16(*x)?;
                w.u16(*y)?;
                w.u16(*transition_time)?;
            }
            ColorControlCommand::MoveColor { rate_x, rate_y, .. } => {
                w.i16(*rate_x)?;
                w.i16(*rate_y)?;
            }
            ColorControlCommand::StepColor {
                step_x,
                step_y,
                transition_time,
                ..
            } => {
                w.i16(*step_x)?;
                w.i16(*step_y)?;
                w.u16(*transition_time)?;
            }
            ColorControlCommand::MoveToColorTemperature {
                mireds,
                transition_time,
                ..
            } => {
                w.u16(*mireds)?;
                w.u16(*transition_time)?;
            }
            ColorControlCommand::EnhancedMoveToHue {
                enhanced_hue,
                direction,
                transition_time,
                ..
            } => {
                w.u16(*enhanced_hue)?;
                w.u8(u8::from(*direction))?;
                w.u16(*transition_time)?;
            }
            ColorControlCommand::EnhancedMoveHue { mode, rate, .. } => {
                w.u8(u8::from(*mode))?;
                w.u16(*rate)?;
            }
            ColorControlCommand::EnhancedStepHue {
                mode,
                step_size,
                transition_time,
                ..
            } => {
                w.u8(u8::from(*mode))?;
                w.u16(*step_size)?;
                w.u16(*transition_time)?;
            }
            ColorControlCommand::EnhancedMoveToHueAndSaturation {
                enhanced_hue,
                saturation,
                transition_time,
                ..
            } => {
                w.u16(*enhanced_hue)?;
                w.u8(*saturation)?;
                w.u16(*transition_time)?;
            }
            ColorControlCommand::ColorLoopSet {
                update,
                action,
                direction,
                time,
                start_hue,
                ..
            } => {
                w.u8(update.bits())?;
                w.u8(u8::from(*action))?;
                w.u8(*direction)?;
                w.u16(*time)?;
                w.u16(*start_hue)?;
            }
            ColorControlCommand::StopMoveStep { .. } => (),
            ColorControlCommand::MoveColorTemperature {
                mode,
                rate,
                minimum,
                maximum,
                ..
            } => {
                w.u8(u8::from(*mode))?;
                w.u16(*rate)?;
                w.u16(*minimum)?;
                w.u16(*maximum)?;
            }
            ColorControlCommand::StepColorTemperature {
                mode,
                step_size,
                transition_time,
                minimum,
                maximum,
                ..
            } => {
                w.u8(u8::from(*mode))?;
                w.u16(*step_size)?;
                w.u16(*transition_time)?;
                w.u16(*minimum)?;
                w.u16(*maximum)?;
            }
        }
        CommandOptions::write(&self.options(), &mut w)?;
        Ok(w.used())
    }

    fn unpack(identifier: u8, data: &[u8]) -> Result<Self, Error> {
        let mut r = Reader::new(data);
        let command = match identifier {
            CMD_MOVE_TO_HUE => ColorControlCommand::MoveToHue {
                hue: r.u8()?,
                direction: HueDirection::try_from(r.u8()?)?,
                transition_time: r.u16()?,
                options: None,
            },
            CMD_MOVE_HUE => ColorControlCommand::MoveHue {
                mode: MoveMode::try_from(r.u8()?)?,
                rate: r.u8()?,
                options: None,
            },
            CMD_STEP_HUE => ColorControlCommand::StepHue {
                mode: StepMode::try_from(r.u8()?)?,
                step_size: r.u8()?,
                transition_time: r.u8()?,
                options: None,
            },
            CMD_MOVE_TO_SATURATION => ColorControlCommand::MoveToSaturation {
                saturation: r.u8()?,
                transition_time: r.u16()?,
                options: None,
            },
            CMD_MOVE_SATURATION => ColorControlCommand::MoveSaturation {
                mode: MoveMode::try_from(r.u8()?)?,
                rate: r.u8()?,
                options: None,
            },
            CMD_STEP_SATURATION => ColorControlCommand::StepSaturation {
                mode: StepMode::try_from(r.u8()?)?,
                step_size: r.u8()?,
                transition_time: r.u8()?,
                options: None,
            },
            CMD_MOVE_TO_HUE_SATURATION => ColorControlCommand::MoveToHueAndSaturation {
                hue: r.u8()?,
                saturation: r.u8()?,
                transition_time: r.u16()?,
                options: None,
            },
            CMD_MOVE_TO_COLOR => ColorControlCommand::MoveToColor {
                x: r.u16()?,
                y: r.u16()?,
                transition_time: r.u16()?,
                options: None,
            },
            CMD_MOVE_COLOR => ColorControlCommand::MoveColor {
                rate_x: r.i16()?,
                rate_y: r.i16()?,
                options: None,
            },
            CMD_STEP_COLOR => ColorControlCommand::StepColor {
                step_x: r.i16()?,
                step_y: r.i16()?,
                transition_time: r.u16()?,
                options: None,
            },
            CMD_MOVE_TO_COLOR_TEMPERATURE => ColorControlCommand::MoveToColorTemperature {
                mireds: r.u16()?,
                transition_time: r.u16()?,
                options: None,
            },
            CMD_ENHANCED_MOVE_TO_HUE => ColorControlCommand::EnhancedMoveToHue {
                enhanced_hue: r.u16()?,
                direction: HueDirection::try_from(r.u8()?)?,
                transition_time: r.u16()?,
                options: None,
            },
            CMD_ENHANCED_MOVE_HUE => ColorControlCommand::EnhancedMoveHue {
                mode: MoveMode::try_from(r.u8()?)?,
                rate: r.u16()?,
                options: None,
            },
            CMD_ENHANCED_STEP_HUE => ColorControlCommand::EnhancedStepHue {
                mode: StepMode::try_from(r.u8()?)?,
                step_size: r.u16()?,
                transition_time: r.u16()?,
                options: None,
            },
            CMD_ENHANCED_MOVE_TO_HUE_SATURATION => {
                ColorControlCommand::EnhancedMoveToHueAndSaturation {
                    enhanced_hue: r.u16()?,
                    saturation: r.u8()?,
                    transition_time: r.u16()?,
                    options: None,
                }
            }
            CMD_COLOR_LOOP_SET => ColorControlCommand::ColorLoopSet {
                update: ColorLoopUpdate::from_bits_truncate(r.u8()?),
                action: ColorLoopAction::try_from(r.u8()?)?,
                direction: r.u8()?,
                time: r.u16()?,
                start_hue: r.u16()?,
                options: None,
            },
            CMD_STOP_MOVE_STEP => ColorControlCommand::StopMoveStep { options: None },
            CMD_MOVE_COLOR_TEMPERATURE => ColorControlCommand::MoveColorTemperature {
                mode: MoveMode::try_from(r.u8()?)?,
                rate: r.u16()?,
                minimum: r.u16()?,
                maximum: r.u16()?,
                options: None,
            },
            CMD_STEP_COLOR_TEMPERATURE => ColorControlCommand::StepColorTemperature {
                mode: StepMode::try_from(r.u8()?)?,
                step_size: r.u16()?,
                transition_time: r.u16()?,
                minimum: r.u16()?,
                maximum: r.u16()?,
                options: None,
            },
            _ => return Err(Error::UnknownCommand),
        };
        let options = CommandOptions::read(&mut r)?;
        Ok(command.with_options(options))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn move_to_hue() {
        let cmd = ColorControlCommand::unpack(CMD_MOVE_TO_HUE, &[0x80, 0x00, 0x0a, 0x00]).unwrap();
        assert_eq!(
            cmd,
            ColorControlCommand::MoveToHue {
                hue: 0x80,
                direction: HueDirection::Shortest,
                transition_time: 10,
                options: None,
            }
        );
        let with_options = ColorControlCommand::unpack(
            CMD_MOVE_TO_HUE,
            &[0x80, 0x00, 0x0a, 0x00, 0x01, 0x00],
        )
        .unwrap();
        assert_eq!(
            with_options.options(),
            Some(CommandOptions {
                mask: 0x01,
                overrides: 0x00
            })
        );
        let mut data = [0u8; 8];
        assert_eq!(with_options.pack(&mut data).unwrap(), 6);
        assert_eq!(with_options.with_options(None).pack(&mut data).unwrap(), 4);
    }

    #[test]
    fn enhanced_and_loop() {
        let cmd =
            ColorControlCommand::unpack(CMD_ENHANCED_MOVE_HUE, &[0x01, 0x00, 0x10]).unwrap();
        assert_eq!(
            cmd,
            ColorControlCommand::EnhancedMoveHue {
                mode: MoveMode::Up,
                rate: 0x1000,
                options: None
            }
        );
        let data = [0x0f, 0x01, 0x01, 0x1e, 0x00, 0x00, 0x20];
        let cmd = ColorControlCommand::unpack(CMD_COLOR_LOOP_SET, &data).unwrap();
        match cmd {
            ColorControlCommand::ColorLoopSet {
                update,
                action,
                time,
                start_hue,
                ..
            } => {
                assert_eq!(update, ColorLoopUpdate::all());
                assert_eq!(action, ColorLoopAction::ActivateFromStart);
                assert_eq!(time, 30);
                assert_eq!(start_hue, 0x2000);
            }
            _ => panic!("not color loop set"),
        }
        let mut out = [0u8; 16];
        assert_eq!(cmd.pack(&mut out).unwrap(), 7);
        assert_eq!(out[..7], data);
    }

    #[test]
    fn invalid_fields() {
        assert_eq!(
            ColorControlCommand::unpack(CMD_MOVE_HUE, &[0x02, 0x10]),
            Err(Error::InvalidValue)
        );
        assert_eq!(
            ColorControlCommand::unpack(CMD_STEP_COLOR, &[0x00, 0x01, 0x00]),
            Err(Error::WrongNumberOfBytes)
        );
        assert_eq!(ColorControlCommand::unpack(0x45, &[]), Err(Error::UnknownCommand));
    }

    #[test]
    fn signed_rates() {
        let cmd = ColorControlCommand::unpack(CMD_MOVE_COLOR, &[0xf6, 0xff, 0x0a, 0x00]).unwrap();
        assert_eq!(
            cmd,
            ColorControlCommand::MoveColor {
                rate_x: -10,
                rate_y: 10,
                options: None
            }
        );
        assert_eq!(cmd.identifier(), CMD_MOVE_COLOR);
    }
}
