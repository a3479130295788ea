//! Color Control cluster server
//!
//! Hue, saturation, xy and temperature transitions run on the shared
//! transition machines. Every command that changes the color also updates
//! ColorMode and EnhancedColorMode. While a color loop is active the other
//! transitions are ignored.

use zcl_data::cluster_library::color_control::{
    ColorControlCommand, ColorLoopAction, ColorLoopUpdate, ColorMode, HueDirection, MoveMode,
    StepMode, ATTR_COLOR_CAPABILITIES, ATTR_COLOR_LOOP_ACTIVE, ATTR_COLOR_LOOP_DIRECTION,
    ATTR_COLOR_LOOP_START_ENHANCED_HUE, ATTR_COLOR_LOOP_STORED_ENHANCED_HUE, ATTR_COLOR_LOOP_TIME,
    ATTR_COLOR_MODE, ATTR_COLOR_TEMPERATURE, ATTR_COLOR_TEMP_PHYSICAL_MAX_MIREDS,
    ATTR_COLOR_TEMP_PHYSICAL_MIN_MIREDS, ATTR_CURRENT_HUE, ATTR_CURRENT_SATURATION, ATTR_CURRENT_X,
    ATTR_CURRENT_Y, ATTR_ENHANCED_COLOR_MODE, ATTR_ENHANCED_CURRENT_HUE, ATTR_NUMBER_OF_PRIMARIES,
    ATTR_OPTIONS, ATTR_REMAINING_TIME, ATTR_START_UP_COLOR_TEMPERATURE_MIREDS, CLUSTER, COLOR_MAX,
    HUE_SATURATION_MAX, RECEIVED_COMMANDS,
};
use zcl_data::cluster_library::{
    AttributeValue, ClusterLibraryStatus, ClusterRole, CommandOptions,
};

use super::{on_off, parse};
use crate::core::Context;
use crate::handler::{ClusterHandler, CommandOutcome};
use crate::header::ParsedHeader;
use crate::scheduler::ClusterJob;
use crate::store::{Access, AttributeDefinition, ClusterDefinition};
use crate::transition::{
    self, hue_delta, ColorLoop, HueWay, Move, MoveChannel, MoveTo, MoveToChannel,
    ENHANCED_HUE_MODULUS, HUE_MODULUS,
};

const OPTION_EXECUTE_IF_OFF: u8 = 0x01;
/// Hue and saturation, enhanced hue, color loop, xy and color temperature
const CAPABILITIES: u16 = 0x001f;
const ENHANCED_HUE_MAX: i64 = 0xffff;
/// Start up temperature keeping the temperature of before the restart
const START_UP_PREVIOUS: u16 = 0xffff;

/// Color control server cluster
pub fn server() -> ClusterDefinition {
    let scene = Access::RP | Access::SCENE;
    ClusterDefinition::server(CLUSTER)
        .attribute(AttributeDefinition::new(ATTR_CURRENT_HUE, scene, AttributeValue::Unsigned8(0)))
        .attribute(AttributeDefinition::new(
            ATTR_CURRENT_SATURATION,
            scene,
            AttributeValue::Unsigned8(0),
        ))
        .attribute(AttributeDefinition::new(
            ATTR_REMAINING_TIME,
            Access::RO,
            AttributeValue::Unsigned16(0),
        ))
        .attribute(AttributeDefinition::new(ATTR_CURRENT_X, scene, AttributeValue::Unsigned16(0x616b)))
        .attribute(AttributeDefinition::new(ATTR_CURRENT_Y, scene, AttributeValue::Unsigned16(0x607d)))
        .attribute(AttributeDefinition::new(
            ATTR_COLOR_TEMPERATURE,
            scene,
            AttributeValue::Unsigned16(0x00fa),
        ))
        .attribute(AttributeDefinition::new(
            ATTR_COLOR_MODE,
            Access::RO,
            AttributeValue::Enumeration8(u8::from(ColorMode::CurrentXy)),
        ))
        .attribute(AttributeDefinition::new(ATTR_OPTIONS, Access::RW, AttributeValue::Bitmap8(0)))
        .attribute(AttributeDefinition::new(
            ATTR_NUMBER_OF_PRIMARIES,
            Access::RO,
            AttributeValue::Unsigned8(0),
        ))
        .attribute(AttributeDefinition::new(
            ATTR_ENHANCED_CURRENT_HUE,
            scene,
            AttributeValue::Unsigned16(0),
        ))
        .attribute(AttributeDefinition::new(
            ATTR_ENHANCED_COLOR_MODE,
            Access::RO,
            AttributeValue::Enumeration8(u8::from(ColorMode::CurrentXy)),
        ))
        .attribute(AttributeDefinition::new(
            ATTR_COLOR_LOOP_ACTIVE,
            Access::RO | Access::SCENE,
            AttributeValue::Unsigned8(0),
        ))
        .attribute(AttributeDefinition::new(
            ATTR_COLOR_LOOP_DIRECTION,
            Access::RO | Access::SCENE,
            AttributeValue::Unsigned8(0),
        ))
        .attribute(AttributeDefinition::new(
            ATTR_COLOR_LOOP_TIME,
            Access::RO | Access::SCENE,
            AttributeValue::Unsigned16(0x0019),
        ))
        .attribute(AttributeDefinition::new(
            ATTR_COLOR_LOOP_START_ENHANCED_HUE,
            Access::RO,
            AttributeValue::Unsigned16(0x2300),
        ))
        .attribute(AttributeDefinition::new(
            ATTR_COLOR_LOOP_STORED_ENHANCED_HUE,
            Access::RO,
            AttributeValue::Unsigned16(0),
        ))
        .attribute(AttributeDefinition::new(
            ATTR_COLOR_CAPABILITIES,
            Access::RO,
            AttributeValue::Bitmap16(CAPABILITIES),
        ))
        .attribute(AttributeDefinition::new(
            ATTR_COLOR_TEMP_PHYSICAL_MIN_MIREDS,
            Access::RO,
            AttributeValue::Unsigned16(0),
        ))
        .attribute(AttributeDefinition::new(
            ATTR_COLOR_TEMP_PHYSICAL_MAX_MIREDS,
            Access::RO,
            AttributeValue::Unsigned16(COLOR_MAX),
        ))
        .attribute(AttributeDefinition::new(
            ATTR_START_UP_COLOR_TEMPERATURE_MIREDS,
            Access::RW,
            AttributeValue::Unsigned16(START_UP_PREVIOUS),
        ))
}

fn get(ctx: &Context, endpoint: u8, attribute: u16) -> i64 {
    ctx.get_integer(endpoint, CLUSTER, ClusterRole::Server, attribute)
        .and_then(|v| i64::try_from(v).ok())
        .unwrap_or(0)
}

fn set(ctx: &mut Context, endpoint: u8, attribute: u16, value: i64) -> Result<(), ClusterLibraryStatus> {
    if !ctx.has_attribute(endpoint, CLUSTER, ClusterRole::Server, attribute) {
        return Ok(());
    }
    ctx.set_integer(endpoint, CLUSTER, ClusterRole::Server, attribute, i128::from(value))
}

fn set_mode(ctx: &mut Context, endpoint: u8, mode: ColorMode) -> Result<(), ClusterLibraryStatus> {
    let basic = match mode {
        ColorMode::EnhancedHueSaturation => ColorMode::HueSaturation,
        other => other,
    };
    set(ctx, endpoint, ATTR_COLOR_MODE, i64::from(u8::from(basic)))?;
    set(ctx, endpoint, ATTR_ENHANCED_COLOR_MODE, i64::from(u8::from(mode)))
}

fn hue_way(direction: HueDirection) -> HueWay {
    match direction {
        HueDirection::Shortest => HueWay::Shortest,
        HueDirection::Longest => HueWay::Longest,
        HueDirection::Up => HueWay::Up,
        HueDirection::Down => HueWay::Down,
    }
}

fn step_sign(mode: StepMode) -> i64 {
    match mode {
        StepMode::Up => 1,
        StepMode::Down => -1,
    }
}

/// Signed rate of a move, `None` for stop
fn move_rate(mode: MoveMode, rate: i64) -> Option<i64> {
    match mode {
        MoveMode::Stop => None,
        MoveMode::Up => Some(rate),
        MoveMode::Down => Some(-rate),
    }
}

fn loop_active(ctx: &Context, endpoint: u8) -> bool {
    get(ctx, endpoint, ATTR_COLOR_LOOP_ACTIVE) != 0
}

fn temperature_limits(ctx: &Context, endpoint: u8) -> (i64, i64) {
    let minimum = get(ctx, endpoint, ATTR_COLOR_TEMP_PHYSICAL_MIN_MIREDS);
    let maximum = if ctx.has_attribute(endpoint, CLUSTER, ClusterRole::Server, ATTR_COLOR_TEMP_PHYSICAL_MAX_MIREDS) {
        get(ctx, endpoint, ATTR_COLOR_TEMP_PHYSICAL_MAX_MIREDS)
    } else {
        i64::from(COLOR_MAX)
    };
    (minimum, maximum)
}

fn should_execute(ctx: &Context, endpoint: u8, options: Option<CommandOptions>) -> bool {
    if !on_off::is_present(ctx, endpoint) || on_off::is_on(ctx, endpoint) {
        return true;
    }
    let attribute = u8::try_from(get(ctx, endpoint, ATTR_OPTIONS)).unwrap_or(0);
    CommandOptions::effective(options, attribute) & OPTION_EXECUTE_IF_OFF != 0
}

/// Keep CurrentHue in step with the enhanced hue
fn sync_hue(ctx: &mut Context, endpoint: u8) -> Result<(), ClusterLibraryStatus> {
    let enhanced = get(ctx, endpoint, ATTR_ENHANCED_CURRENT_HUE);
    set(ctx, endpoint, ATTR_CURRENT_HUE, (enhanced >> 8).min(i64::from(HUE_SATURATION_MAX)))
}

/// Run one tick of a color transition
fn tick(ctx: &mut Context, endpoint: u8, job: ClusterJob) {
    let progress = transition::run(
        ctx,
        endpoint,
        CLUSTER,
        ClusterRole::Server,
        job,
        Some(ATTR_REMAINING_TIME),
    );
    let moved_enhanced = progress
        .map(|p| p.values.iter().any(|(a, _)| *a == ATTR_ENHANCED_CURRENT_HUE))
        .unwrap_or(false);
    if moved_enhanced {
        if let Err(status) = sync_hue(ctx, endpoint) {
            log::warn!("Hue of {} not updated, {:?}", endpoint, status);
        }
    }
}

fn move_to(ctx: &mut Context, endpoint: u8, transition_time: u16, channels: Vec<MoveToChannel>) {
    let generation = transition::restart(ctx, endpoint, CLUSTER);
    let mut job = MoveTo::new(generation, ctx.now(), transition_time);
    job.channels = channels;
    tick(ctx, endpoint, ClusterJob::MoveTo(job));
}

fn move_at(ctx: &mut Context, endpoint: u8, channels: Vec<MoveChannel>) {
    let generation = transition::restart(ctx, endpoint, CLUSTER);
    let mut job = Move::new(generation, ctx.now());
    job.channels = channels;
    tick(ctx, endpoint, ClusterJob::Move(job));
}

fn stop(ctx: &mut Context, endpoint: u8) -> Result<(), ClusterLibraryStatus> {
    transition::cancel(ctx, endpoint, CLUSTER);
    set(ctx, endpoint, ATTR_REMAINING_TIME, 0)
}

fn clamped(attribute: u16, start: i64, target: i64, minimum: i64, maximum: i64) -> MoveToChannel {
    MoveToChannel::new(attribute, start, target.clamp(minimum, maximum))
}

fn hue_to(ctx: &Context, endpoint: u8, target: i64, way: HueWay) -> MoveToChannel {
    let current = get(ctx, endpoint, ATTR_CURRENT_HUE);
    MoveToChannel::circular(
        ATTR_CURRENT_HUE,
        current,
        hue_delta(current, target, way, HUE_MODULUS),
        HUE_MODULUS,
    )
}

fn enhanced_hue_to(ctx: &Context, endpoint: u8, target: i64, way: HueWay) -> MoveToChannel {
    let current = get(ctx, endpoint, ATTR_ENHANCED_CURRENT_HUE);
    MoveToChannel::circular(
        ATTR_ENHANCED_CURRENT_HUE,
        current,
        hue_delta(current, target, way, ENHANCED_HUE_MODULUS),
        ENHANCED_HUE_MODULUS,
    )
}

fn saturation_to(ctx: &Context, endpoint: u8, target: i64) -> MoveToChannel {
    let current = get(ctx, endpoint, ATTR_CURRENT_SATURATION);
    clamped(ATTR_CURRENT_SATURATION, current, target, 0, i64::from(HUE_SATURATION_MAX))
}

fn color_loop_set(
    ctx: &mut Context,
    endpoint: u8,
    update: ColorLoopUpdate,
    action: ColorLoopAction,
    direction: u8,
    time: u16,
    start_hue: u16,
) -> Result<(), ClusterLibraryStatus> {
    if update.contains(ColorLoopUpdate::DIRECTION) {
        set(ctx, endpoint, ATTR_COLOR_LOOP_DIRECTION, i64::from(direction & 0x01))?;
    }
    if update.contains(ColorLoopUpdate::TIME) {
        set(ctx, endpoint, ATTR_COLOR_LOOP_TIME, i64::from(time))?;
    }
    if update.contains(ColorLoopUpdate::START_HUE) {
        set(ctx, endpoint, ATTR_COLOR_LOOP_START_ENHANCED_HUE, i64::from(start_hue))?;
    }
    let active = loop_active(ctx, endpoint);
    let start = if update.contains(ColorLoopUpdate::ACTION) {
        match action {
            ColorLoopAction::Deactivate => {
                if active {
                    transition::cancel(ctx, endpoint, CLUSTER);
                    set(ctx, endpoint, ATTR_COLOR_LOOP_ACTIVE, 0)?;
                    let stored = get(ctx, endpoint, ATTR_COLOR_LOOP_STORED_ENHANCED_HUE);
                    set(ctx, endpoint, ATTR_ENHANCED_CURRENT_HUE, stored)?;
                    sync_hue(ctx, endpoint)?;
                }
                return Ok(());
            }
            ColorLoopAction::ActivateFromStart => get(ctx, endpoint, ATTR_COLOR_LOOP_START_ENHANCED_HUE),
            ColorLoopAction::ActivateFromCurrent => get(ctx, endpoint, ATTR_ENHANCED_CURRENT_HUE),
        }
    } else if active {
        get(ctx, endpoint, ATTR_ENHANCED_CURRENT_HUE)
    } else {
        return Ok(());
    };
    if !active {
        let current = get(ctx, endpoint, ATTR_ENHANCED_CURRENT_HUE);
        set(ctx, endpoint, ATTR_COLOR_LOOP_STORED_ENHANCED_HUE, current)?;
        set(ctx, endpoint, ATTR_COLOR_LOOP_ACTIVE, 1)?;
    }
    set_mode(ctx, endpoint, ColorMode::EnhancedHueSaturation)?;
    let generation = transition::restart(ctx, endpoint, CLUSTER);
    let rotation = ColorLoop {
        generation,
        start_time: ctx.now(),
        start_hue: u16::try_from(start).unwrap_or(0),
        increment: get(ctx, endpoint, ATTR_COLOR_LOOP_DIRECTION) != 0,
        time: u16::try_from(get(ctx, endpoint, ATTR_COLOR_LOOP_TIME)).unwrap_or(0),
    };
    log::debug!("Color loop on {} {:?}", endpoint, rotation);
    tick(ctx, endpoint, ClusterJob::ColorLoop(rotation));
    Ok(())
}

fn execute(ctx: &mut Context, endpoint: u8, command: ColorControlCommand) -> Result<(), ClusterLibraryStatus> {
    let saturation_max = i64::from(HUE_SATURATION_MAX);
    let color_max = i64::from(COLOR_MAX);
    match command {
        ColorControlCommand::MoveToHue {
            hue,
            direction,
            transition_time,
            ..
        } => {
            if i64::from(hue) > saturation_max {
                return Err(ClusterLibraryStatus::InvalidValue);
            }
            set_mode(ctx, endpoint, ColorMode::HueSaturation)?;
            let channel = hue_to(ctx, endpoint, i64::from(hue), hue_way(direction));
            move_to(ctx, endpoint, transition_time, vec![channel]);
        }
        ColorControlCommand::MoveHue { mode, rate, .. } => {
            let rate = match move_rate(mode, i64::from(rate)) {
                Some(0) => return Err(ClusterLibraryStatus::InvalidField),
                Some(rate) => rate,
                None => return stop(ctx, endpoint),
            };
            set_mode(ctx, endpoint, ColorMode::HueSaturation)?;
            let current = get(ctx, endpoint, ATTR_CURRENT_HUE);
            let channel = MoveChannel::new(ATTR_CURRENT_HUE, current, rate, 0, saturation_max).wrapping();
            move_at(ctx, endpoint, vec![channel]);
        }
        ColorControlCommand::StepHue {
            mode,
            step_size,
            transition_time,
            ..
        } => {
            set_mode(ctx, endpoint, ColorMode::HueSaturation)?;
            let current = get(ctx, endpoint, ATTR_CURRENT_HUE);
            let channel = MoveToChannel::circular(
                ATTR_CURRENT_HUE,
                current,
                step_sign(mode) * i64::from(step_size),
                HUE_MODULUS,
            );
            move_to(ctx, endpoint, u16::from(transition_time), vec![channel]);
        }
        ColorControlCommand::MoveToSaturation {
            saturation,
            transition_time,
            ..
        } => {
            set_mode(ctx, endpoint, ColorMode::HueSaturation)?;
            let channel = saturation_to(ctx, endpoint, i64::from(saturation));
            move_to(ctx, endpoint, transition_time, vec![channel]);
        }
        ColorControlCommand::MoveSaturation { mode, rate, .. } => {
            let rate = match move_rate(mode, i64::from(rate)) {
                Some(0) => return Err(ClusterLibraryStatus::InvalidField),
                Some(rate) => rate,
                None => return stop(ctx, endpoint),
            };
            set_mode(ctx, endpoint, ColorMode::HueSaturation)?;
            let current = get(ctx, endpoint, ATTR_CURRENT_SATURATION);
            let channel = MoveChannel::new(ATTR_CURRENT_SATURATION, current, rate, 0, saturation_max);
            move_at(ctx, endpoint, vec![channel]);
        }
        ColorControlCommand::StepSaturation {
            mode,
            step_size,
            transition_time,
            ..
        } => {
            set_mode(ctx, endpoint, ColorMode::HueSaturation)?;
            let current = get(ctx, endpoint, ATTR_CURRENT_SATURATION);
            let target = current + step_sign(mode) * i64::from(step_size);
            let channel = saturation_to(ctx, endpoint, target);
            move_to(ctx, endpoint, u16::from(transition_time), vec![channel]);
        }
        ColorControlCommand::MoveToHueAndSaturation {
            hue,
            saturation,
            transition_time,
            ..
        } => {
            if i64::from(hue) > saturation_max {
                return Err(ClusterLibraryStatus::InvalidValue);
            }
            set_mode(ctx, endpoint, ColorMode::HueSaturation)?;
            let channels = vec![
                hue_to(ctx, endpoint, i64::from(hue), HueWay::Shortest),
                saturation_to(ctx, endpoint, i64::from(saturation)),
            ];
            move_to(ctx, endpoint, transition_time, channels);
        }
        ColorControlCommand::MoveToColor {
            x,
            y,
            transition_time,
            ..
        } => {
            set_mode(ctx, endpoint, ColorMode::CurrentXy)?;
            let channels = vec![
                clamped(ATTR_CURRENT_X, get(ctx, endpoint, ATTR_CURRENT_X), i64::from(x), 0, color_max),
                clamped(ATTR_CURRENT_Y, get(ctx, endpoint, ATTR_CURRENT_Y), i64::from(y), 0, color_max),
            ];
            move_to(ctx, endpoint, transition_time, channels);
        }
        ColorControlCommand::MoveColor { rate_x, rate_y, .. } => {
            if rate_x == 0 && rate_y == 0 {
                return stop(ctx, endpoint);
            }
            set_mode(ctx, endpoint, ColorMode::CurrentXy)?;
            let channels = vec![
                MoveChannel::new(ATTR_CURRENT_X, get(ctx, endpoint, ATTR_CURRENT_X), i64::from(rate_x), 0, color_max),
                MoveChannel::new(ATTR_CURRENT_Y, get(ctx, endpoint, ATTR_CURRENT_Y), i64::from(rate_y), 0, color_max),
            ];
            move_at(ctx, endpoint, channels);
        }
        ColorControlCommand::StepColor {
            step_x,
            step_y,
            transition_time,
            ..
        } => {
            set_mode(ctx, endpoint, ColorMode::CurrentXy)?;
            let x = get(ctx, endpoint, ATTR_CURRENT_X);
            let y = get(ctx, endpoint, ATTR_CURRENT_Y);
            let channels = vec![
                clamped(ATTR_CURRENT_X, x, x + i64::from(step_x), 0, color_max),
                clamped(ATTR_CURRENT_Y, y, y + i64::from(step_y), 0, color_max),
            ];
            move_to(ctx, endpoint, transition_time, channels);
        }
        ColorControlCommand::MoveToColorTemperature {
            mireds,
            transition_time,
            ..
        } => {
            set_mode(ctx, endpoint, ColorMode::ColorTemperature)?;
            let (minimum, maximum) = temperature_limits(ctx, endpoint);
            let current = get(ctx, endpoint, ATTR_COLOR_TEMPERATURE);
            let channel = clamped(ATTR_COLOR_TEMPERATURE, current, i64::from(mireds), minimum, maximum);
            move_to(ctx, endpoint, transition_time, vec![channel]);
        }
        ColorControlCommand::EnhancedMoveToHue {
            enhanced_hue,
            direction,
            transition_time,
            ..
        } => {
            set_mode(ctx, endpoint, ColorMode::EnhancedHueSaturation)?;
            let channel = enhanced_hue_to(ctx, endpoint, i64::from(enhanced_hue), hue_way(direction));
            move_to(ctx, endpoint, transition_time, vec![channel]);
        }
        ColorControlCommand::EnhancedMoveHue { mode, rate, .. } => {
            let rate = match move_rate(mode, i64::from(rate)) {
                Some(0) => return Err(ClusterLibraryStatus::InvalidField),
                Some(rate) => rate,
                None => return stop(ctx, endpoint),
            };
            set_mode(ctx, endpoint, ColorMode::EnhancedHueSaturation)?;
            let current = get(ctx, endpoint, ATTR_ENHANCED_CURRENT_HUE);
            let channel =
                MoveChannel::new(ATTR_ENHANCED_CURRENT_HUE, current, rate, 0, ENHANCED_HUE_MAX).wrapping();
            move_at(ctx, endpoint, vec![channel]);
        }
        ColorControlCommand::EnhancedStepHue {
            mode,
            step_size,
            transition_time,
            ..
        } => {
            set_mode(ctx, endpoint, ColorMode::EnhancedHueSaturation)?;
            let current = get(ctx, endpoint, ATTR_ENHANCED_CURRENT_HUE);
            let channel = MoveToChannel::circular(
                ATTR_ENHANCED_CURRENT_HUE,
                current,
                step_sign(mode) * i64::from(step_size),
                ENHANCED_HUE_MODULUS,
            );
            move_to(ctx, endpoint, transition_time, vec![channel]);
        }
        ColorControlCommand::EnhancedMoveToHueAndSaturation {
            enhanced_hue,
            saturation,
            transition_time,
            ..
        } => {
            set_mode(ctx, endpoint, ColorMode::EnhancedHueSaturation)?;
            let channels = vec![
                enhanced_hue_to(ctx, endpoint, i64::from(enhanced_hue), HueWay::Shortest),
                saturation_to(ctx, endpoint, i64::from(saturation)),
            ];
            move_to(ctx, endpoint, transition_time, channels);
        }
        ColorControlCommand::ColorLoopSet {
            update,
            action,
            direction,
            time,
            start_hue,
            ..
        } => color_loop_set(ctx, endpoint, update, action, direction, time, start_hue)?,
        ColorControlCommand::StopMoveStep { .. } => {
            if !loop_active(ctx, endpoint) {
                stop(ctx, endpoint)?;
            }
        }
        ColorControlCommand::MoveColorTemperature {
            mode,
            rate,
            minimum,
            maximum,
            ..
        } => {
            let rate = match move_rate(mode, i64::from(rate)) {
                Some(0) => return Err(ClusterLibraryStatus::InvalidField),
                Some(rate) => rate,
                None => return stop(ctx, endpoint),
            };
            set_mode(ctx, endpoint, ColorMode::ColorTemperature)?;
            let (physical_minimum, physical_maximum) = temperature_limits(ctx, endpoint);
            let minimum = if minimum == 0 { physical_minimum } else { i64::from(minimum).max(physical_minimum) };
            let maximum = if maximum == 0 { physical_maximum } else { i64::from(maximum).min(physical_maximum) };
            let current = get(ctx, endpoint, ATTR_COLOR_TEMPERATURE);
            let channel = MoveChannel::new(ATTR_COLOR_TEMPERATURE, current, rate, minimum, maximum);
            move_at(ctx, endpoint, vec![channel]);
        }
        ColorControlCommand::StepColorTemperature {
            mode,
            step_size,
            transition_time,
            minimum,
            maximum,
            ..
        } => {
            set_mode(ctx, endpoint, ColorMode::ColorTemperature)?;
            let (physical_minimum, physical_maximum) = temperature_limits(ctx, endpoint);
            let minimum = if minimum == 0 { physical_minimum } else { i64::from(minimum).max(physical_minimum) };
            let maximum = if maximum == 0 { physical_maximum } else { i64::from(maximum).min(physical_maximum) };
            let current = get(ctx, endpoint, ATTR_COLOR_TEMPERATURE);
            let target = current + step_sign(mode) * i64::from(step_size);
            let channel = clamped(ATTR_COLOR_TEMPERATURE, current, target, minimum, maximum);
            move_to(ctx, endpoint, transition_time, vec![channel]);
        }
    }
    Ok(())
}

/// Color Control cluster server
pub struct ColorControlServer;

impl ClusterHandler for ColorControlServer {
    fn cluster(&self) -> u16 {
        CLUSTER
    }

    fn role(&self) -> ClusterRole {
        ClusterRole::Server
    }

    fn init(&self, ctx: &mut Context, endpoint: u8) {
        let start_up = get(ctx, endpoint, ATTR_START_UP_COLOR_TEMPERATURE_MIREDS);
        if start_up != i64::from(START_UP_PREVIOUS) && start_up != 0 {
            let (minimum, maximum) = temperature_limits(ctx, endpoint);
            let result = set(ctx, endpoint, ATTR_COLOR_TEMPERATURE, start_up.clamp(minimum, maximum))
                .and_then(|_| set_mode(ctx, endpoint, ColorMode::ColorTemperature));
            if let Err(status) = result {
                log::warn!("Start up temperature of {} not applied, {:?}", endpoint, status);
            }
        }
        if loop_active(ctx, endpoint) {
            let result = color_loop_set(
                ctx,
                endpoint,
                ColorLoopUpdate::empty(),
                ColorLoopAction::ActivateFromCurrent,
                0,
                0,
                0,
            );
            if let Err(status) = result {
                log::warn!("Color loop of {} not resumed, {:?}", endpoint, status);
            }
        }
    }

    fn handle_command(
        &self,
        ctx: &mut Context,
        endpoint: u8,
        header: &ParsedHeader,
        payload: &[u8],
    ) -> CommandOutcome {
        let command = match parse::<ColorControlCommand>(header, payload) {
            Ok(command) => command,
            Err(outcome) => return outcome,
        };
        if !should_execute(ctx, endpoint, command.options()) {
            log::debug!("Color command {:02x} on {} ignored while off", header.command, endpoint);
            return CommandOutcome::Handled;
        }
        let loop_command = matches!(
            command,
            ColorControlCommand::ColorLoopSet { .. } | ColorControlCommand::StopMoveStep { .. }
        );
        if loop_active(ctx, endpoint) && !loop_command {
            log::debug!("Color command {:02x} on {} ignored during color loop", header.command, endpoint);
            return CommandOutcome::Handled;
        }
        execute(ctx, endpoint, command).into()
    }

    fn received_commands(&self) -> &'static [u8] {
        &RECEIVED_COMMANDS
    }

    fn run_job(&self, ctx: &mut Context, endpoint: u8, job: ClusterJob) {
        if matches!(
            job,
            ClusterJob::MoveTo(_) | ClusterJob::Move(_) | ClusterJob::ColorLoop(_)
        ) {
            tick(ctx, endpoint, job);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn move_modes() {
        assert_eq!(move_rate(MoveMode::Up, 10), Some(10));
        assert_eq!(move_rate(MoveMode::Down, 10), Some(-10));
        assert_eq!(move_rate(MoveMode::Stop, 10), None);
        assert_eq!(step_sign(StepMode::Down), -1);
    }

    #[test]
    fn hue_directions() {
        assert_eq!(hue_way(HueDirection::Longest), HueWay::Longest);
        assert_eq!(hue_way(HueDirection::Down), HueWay::Down);
    }
}
