//! Level Control cluster server

use zcl_data::cluster_library::level_control::{
    LevelCommand, LevelControlCommand, MoveMode, ATTR_CURRENT_LEVEL, ATTR_DEFAULT_MOVE_RATE,
    ATTR_MAX_LEVEL, ATTR_MIN_LEVEL, ATTR_ON_LEVEL, ATTR_ON_OFF_TRANSITION_TIME, ATTR_OPTIONS,
    ATTR_REMAINING_TIME, ATTR_START_UP_CURRENT_LEVEL, CLUSTER, CMD_MOVE, CMD_MOVE_TO_LEVEL,
    CMD_MOVE_TO_LEVEL_WITH_ON_OFF, CMD_MOVE_WITH_ON_OFF, CMD_STEP, CMD_STEP_WITH_ON_OFF, CMD_STOP,
    CMD_STOP_WITH_ON_OFF, LEVEL_MAX, LEVEL_MIN, OPTION_EXECUTE_IF_OFF,
};
use zcl_data::cluster_library::{
    AttributeValue, ClusterLibraryStatus, ClusterRole, CommandOptions,
};

use super::{on_off, parse};
use crate::core::Context;
use crate::handler::{CheckValue, ClusterHandler, CommandOutcome};
use crate::header::ParsedHeader;
use crate::scheduler::ClusterJob;
use crate::store::{Access, AttributeDefinition, ClusterDefinition};
use crate::transition::{self, Move, MoveChannel, MoveTo, MoveToChannel};

/// Transition time asking for the on/off transition time attribute
const USE_ON_OFF_TRANSITION_TIME: u16 = 0xffff;
/// Rate asking for the default move rate attribute
const USE_DEFAULT_MOVE_RATE: u8 = 0xff;
/// Start up level keeping the level of before the restart
const START_UP_PREVIOUS: u8 = 0xff;
const START_UP_MINIMUM: u8 = 0x00;
/// OnLevel value meaning that the previous level is used
const ON_LEVEL_UNUSED: u8 = 0xff;

/// Level control server cluster
pub fn server() -> ClusterDefinition {
    ClusterDefinition::server(CLUSTER)
        .attribute(AttributeDefinition::new(
            ATTR_CURRENT_LEVEL,
            Access::RP | Access::SCENE,
            AttributeValue::Unsigned8(LEVEL_MAX),
        ))
        .attribute(AttributeDefinition::new(
            ATTR_REMAINING_TIME,
            Access::RO,
            AttributeValue::Unsigned16(0),
        ))
        .attribute(AttributeDefinition::new(
            ATTR_MIN_LEVEL,
            Access::RO,
            AttributeValue::Unsigned8(LEVEL_MIN),
        ))
        .attribute(AttributeDefinition::new(
            ATTR_MAX_LEVEL,
            Access::RO,
            AttributeValue::Unsigned8(LEVEL_MAX),
        ))
        .attribute(AttributeDefinition::new(
            ATTR_OPTIONS,
            Access::RW,
            AttributeValue::Bitmap8(0),
        ))
        .attribute(AttributeDefinition::new(
            ATTR_ON_OFF_TRANSITION_TIME,
            Access::RW,
            AttributeValue::Unsigned16(0),
        ))
        .attribute(AttributeDefinition::new(
            ATTR_ON_LEVEL,
            Access::RW,
            AttributeValue::Unsigned8(ON_LEVEL_UNUSED),
        ))
        .attribute(AttributeDefinition::new(
            ATTR_DEFAULT_MOVE_RATE,
            Access::RW,
            AttributeValue::Unsigned8(USE_DEFAULT_MOVE_RATE),
        ))
        .attribute(AttributeDefinition::new(
            ATTR_START_UP_CURRENT_LEVEL,
            Access::RW,
            AttributeValue::Unsigned8(START_UP_PREVIOUS),
        ))
}

fn get_u8(ctx: &Context, endpoint: u8, attribute: u16, default: u8) -> u8 {
    ctx.get_integer(endpoint, CLUSTER, ClusterRole::Server, attribute)
        .and_then(|v| u8::try_from(v).ok())
        .unwrap_or(default)
}

fn limits(ctx: &Context, endpoint: u8) -> (u8, u8) {
    (
        get_u8(ctx, endpoint, ATTR_MIN_LEVEL, LEVEL_MIN),
        get_u8(ctx, endpoint, ATTR_MAX_LEVEL, LEVEL_MAX),
    )
}

/// Should a command run, given the on/off state and the options
fn should_execute(ctx: &Context, endpoint: u8, command: &LevelControlCommand) -> bool {
    if command.with_on_off || !on_off::is_present(ctx, endpoint) || on_off::is_on(ctx, endpoint) {
        return true;
    }
    let options = get_u8(ctx, endpoint, ATTR_OPTIONS, 0);
    CommandOptions::effective(command.options(), options) & OPTION_EXECUTE_IF_OFF != 0
}

/// Run one tick of a level transition, commands run the first one right away
fn tick(ctx: &mut Context, endpoint: u8, job: ClusterJob) {
    let off_when_done = match &job {
        ClusterJob::MoveTo(transition) => transition.off_when_done,
        ClusterJob::Move(transition) => transition.off_when_done,
        _ => false,
    };
    let progress = transition::run(
        ctx,
        endpoint,
        CLUSTER,
        ClusterRole::Server,
        job,
        Some(ATTR_REMAINING_TIME),
    );
    if let Some(progress) = progress {
        if progress.finished {
            finish(ctx, endpoint, off_when_done);
        }
    }
}

fn finish(ctx: &mut Context, endpoint: u8, off_when_done: bool) {
    if !off_when_done {
        return;
    }
    let (minimum, _) = limits(ctx, endpoint);
    if get_u8(ctx, endpoint, ATTR_CURRENT_LEVEL, minimum) <= minimum {
        if let Err(status) = on_off::set_on_off(ctx, endpoint, false) {
            log::warn!("Level on {} reached the minimum, off failed, {:?}", endpoint, status);
        }
    }
}

/// Move the current level to `level` over `transition_time` tenths of a second
pub fn move_to_level(
    ctx: &mut Context,
    endpoint: u8,
    level: u8,
    transition_time: u16,
    with_on_off: bool,
) -> Result<(), ClusterLibraryStatus> {
    let (minimum, maximum) = limits(ctx, endpoint);
    let target = level.clamp(minimum, maximum);
    let transition_time = if transition_time == USE_ON_OFF_TRANSITION_TIME {
        ctx.get_integer(endpoint, CLUSTER, ClusterRole::Server, ATTR_ON_OFF_TRANSITION_TIME)
            .and_then(|v| u16::try_from(v).ok())
            .unwrap_or(0)
    } else {
        transition_time
    };
    let current = get_u8(ctx, endpoint, ATTR_CURRENT_LEVEL, target);
    if with_on_off && target > minimum {
        on_off::set_on_off(ctx, endpoint, true)?;
    }
    let generation = transition::restart(ctx, endpoint, CLUSTER);
    let mut job = MoveTo::new(generation, ctx.now(), transition_time).channel(MoveToChannel::new(
        ATTR_CURRENT_LEVEL,
        i64::from(current),
        i64::from(target),
    ));
    job.off_when_done = with_on_off && target <= minimum;
    tick(ctx, endpoint, ClusterJob::MoveTo(job));
    Ok(())
}

fn move_level(
    ctx: &mut Context,
    endpoint: u8,
    mode: MoveMode,
    rate: u8,
    with_on_off: bool,
) -> Result<(), ClusterLibraryStatus> {
    let rate = if rate == USE_DEFAULT_MOVE_RATE {
        get_u8(ctx, endpoint, ATTR_DEFAULT_MOVE_RATE, USE_DEFAULT_MOVE_RATE)
    } else {
        rate
    };
    if rate == 0 {
        return Ok(());
    }
    let (minimum, maximum) = limits(ctx, endpoint);
    let current = get_u8(ctx, endpoint, ATTR_CURRENT_LEVEL, minimum);
    let rate = match mode {
        MoveMode::Up => i64::from(rate),
        MoveMode::Down => -i64::from(rate),
    };
    if with_on_off && mode == MoveMode::Up {
        on_off::set_on_off(ctx, endpoint, true)?;
    }
    let generation = transition::restart(ctx, endpoint, CLUSTER);
    let mut job = Move::new(generation, ctx.now()).channel(MoveChannel::new(
        ATTR_CURRENT_LEVEL,
        i64::from(current),
        rate,
        i64::from(minimum),
        i64::from(maximum),
    ));
    job.off_when_done = with_on_off && mode == MoveMode::Down;
    tick(ctx, endpoint, ClusterJob::Move(job));
    Ok(())
}

fn step(
    ctx: &mut Context,
    endpoint: u8,
    mode: MoveMode,
    step_size: u8,
    transition_time: u16,
    with_on_off: bool,
) -> Result<(), ClusterLibraryStatus> {
    let (minimum, maximum) = limits(ctx, endpoint);
    let current = get_u8(ctx, endpoint, ATTR_CURRENT_LEVEL, minimum);
    let target = match mode {
        MoveMode::Up => current.saturating_add(step_size).min(maximum),
        MoveMode::Down => current.saturating_sub(step_size).max(minimum),
    };
    move_to_level(ctx, endpoint, target, transition_time, with_on_off)
}

/// Stop the transition of the level
pub fn stop(ctx: &mut Context, endpoint: u8) -> Result<(), ClusterLibraryStatus> {
    transition::cancel(ctx, endpoint, CLUSTER);
    if ctx.has_attribute(endpoint, CLUSTER, ClusterRole::Server, ATTR_REMAINING_TIME) {
        ctx.set_integer(endpoint, CLUSTER, ClusterRole::Server, ATTR_REMAINING_TIME, 0)?;
    }
    Ok(())
}

/// Level Control cluster server
pub struct LevelControlServer;

impl ClusterHandler for LevelControlServer {
    fn cluster(&self) -> u16 {
        CLUSTER
    }

    fn role(&self) -> ClusterRole {
        ClusterRole::Server
    }

    fn init(&self, ctx: &mut Context, endpoint: u8) {
        let level = match get_u8(ctx, endpoint, ATTR_START_UP_CURRENT_LEVEL, START_UP_PREVIOUS) {
            START_UP_PREVIOUS => return,
            START_UP_MINIMUM => limits(ctx, endpoint).0,
            level => level,
        };
        let (minimum, maximum) = limits(ctx, endpoint);
        let level = i128::from(level.clamp(minimum, maximum));
        if let Err(status) = ctx.set_integer(endpoint, CLUSTER, ClusterRole::Server, ATTR_CURRENT_LEVEL, level) {
            log::warn!("Start up level of {} not applied, {:?}", endpoint, status);
        }
    }

    fn check_value(&self, ctx: &Context, endpoint: u8, attribute: u16, value: &AttributeValue) -> CheckValue {
        let level = match value.as_unsigned() {
            Some(level) => level,
            None => return CheckValue::Ok,
        };
        let (minimum, maximum) = limits(ctx, endpoint);
        let in_range = (u64::from(minimum)..=u64::from(maximum)).contains(&level);
        match attribute {
            ATTR_ON_LEVEL if level != u64::from(ON_LEVEL_UNUSED) && !in_range => CheckValue::OutOfRange,
            ATTR_START_UP_CURRENT_LEVEL
                if level != u64::from(START_UP_PREVIOUS)
                    && level != u64::from(START_UP_MINIMUM)
                    && !in_range =>
            {
                CheckValue::OutOfRange
            }
            _ => CheckValue::Ok,
        }
    }

    fn handle_command(
        &self,
        ctx: &mut Context,
        endpoint: u8,
        header: &ParsedHeader,
        payload: &[u8],
    ) -> CommandOutcome {
        let command = match parse::<LevelControlCommand>(header, payload) {
            Ok(command) => command,
            Err(outcome) => return outcome,
        };
        if !should_execute(ctx, endpoint, &command) {
            log::debug!("Level {:?} on {} ignored while off", command.command, endpoint);
            return CommandOutcome::Handled;
        }
        let with_on_off = command.with_on_off;
        let result = match command.command {
            LevelCommand::MoveToLevel {
                level,
                transition_time,
                ..
            } => move_to_level(ctx, endpoint, level, transition_time, with_on_off),
            LevelCommand::Move { mode, rate, .. } => move_level(ctx, endpoint, mode, rate, with_on_off),
            LevelCommand::Step {
                mode,
                step_size,
                transition_time,
                ..
            } => step(ctx, endpoint, mode, step_size, transition_time, with_on_off),
            LevelCommand::Stop { .. } => stop(ctx, endpoint),
        };
        result.into()
    }

    fn received_commands(&self) -> &'static [u8] {
        &[
            CMD_MOVE_TO_LEVEL,
            CMD_MOVE,
            CMD_STEP,
            CMD_STOP,
            CMD_MOVE_TO_LEVEL_WITH_ON_OFF,
            CMD_MOVE_WITH_ON_OFF,
            CMD_STEP_WITH_ON_OFF,
            CMD_STOP_WITH_ON_OFF,
        ]
    }

    fn run_job(&self, ctx: &mut Context, endpoint: u8, job: ClusterJob) {
        if matches!(job, ClusterJob::MoveTo(_) | ClusterJob::Move(_)) {
            tick(ctx, endpoint, job);
        }
    }
}
