//! On/Off cluster server
//!
//! On with timed off runs a 1/10 s countdown of OnTime while on and of
//! OffWaitTime while off. The countdown stops once both are exhausted.

use zcl_data::cluster_library::on_off::{
    OnOffCommand, ACCEPT_ONLY_WHEN_ON, ATTR_GLOBAL_SCENE_CONTROL, ATTR_OFF_WAIT_TIME, ATTR_ON_OFF,
    ATTR_ON_TIME, ATTR_START_UP_ON_OFF, CLUSTER, CMD_OFF, CMD_OFF_WITH_EFFECT, CMD_ON,
    CMD_ON_WITH_RECALL_GLOBAL_SCENE, CMD_ON_WITH_TIMED_OFF, CMD_TOGGLE,
};
use zcl_data::cluster_library::{AttributeValue, ClusterLibraryStatus, ClusterRole};

use super::parse;
use crate::core::Context;
use crate::event::DeviceEvent;
use crate::handler::{ClusterHandler, CommandOutcome, WriteOrigin};
use crate::header::ParsedHeader;
use crate::scheduler::{ClusterJob, Task};
use crate::store::{Access, AttributeDefinition, ClusterDefinition};

const TICK_MS: u32 = 100;
/// OnTime and OffWaitTime value that disables the countdown
const TIME_FOREVER: u16 = 0xffff;

const START_UP_OFF: u8 = 0x00;
const START_UP_ON: u8 = 0x01;
const START_UP_TOGGLE: u8 = 0x02;

/// On/off server cluster, the on/off state is kept across restarts
pub fn server() -> ClusterDefinition {
    ClusterDefinition::server(CLUSTER)
        .attribute(AttributeDefinition::new(
            ATTR_ON_OFF,
            Access::RP | Access::SCENE,
            false.into(),
        ))
        .attribute(AttributeDefinition::new(
            ATTR_GLOBAL_SCENE_CONTROL,
            Access::RO,
            true.into(),
        ))
        .attribute(AttributeDefinition::new(
            ATTR_ON_TIME,
            Access::RW,
            AttributeValue::Unsigned16(0),
        ))
        .attribute(AttributeDefinition::new(
            ATTR_OFF_WAIT_TIME,
            Access::RW,
            AttributeValue::Unsigned16(0),
        ))
        .attribute(AttributeDefinition::new(
            ATTR_START_UP_ON_OFF,
            Access::RW,
            AttributeValue::Enumeration8(0xff),
        ))
}

fn get_u16(ctx: &Context, endpoint: u8, attribute: u16) -> u16 {
    ctx.get_integer(endpoint, CLUSTER, ClusterRole::Server, attribute)
        .and_then(|v| u16::try_from(v).ok())
        .unwrap_or(0)
}

fn set_u16(ctx: &mut Context, endpoint: u8, attribute: u16, value: u16) -> Result<(), ClusterLibraryStatus> {
    if !ctx.has_attribute(endpoint, CLUSTER, ClusterRole::Server, attribute) {
        return Ok(());
    }
    ctx.set(
        endpoint,
        CLUSTER,
        ClusterRole::Server,
        attribute,
        AttributeValue::Unsigned16(value),
    )
}

fn set_flag(ctx: &mut Context, endpoint: u8, attribute: u16, value: bool) -> Result<(), ClusterLibraryStatus> {
    if !ctx.has_attribute(endpoint, CLUSTER, ClusterRole::Server, attribute) {
        return Ok(());
    }
    ctx.set(endpoint, CLUSTER, ClusterRole::Server, attribute, value.into())
}

/// Current on/off state of an endpoint
pub fn is_on(ctx: &Context, endpoint: u8) -> bool {
    ctx.get(endpoint, CLUSTER, ClusterRole::Server, ATTR_ON_OFF)
        .and_then(|v| v.as_bool())
        .unwrap_or(false)
}

/// Does the endpoint host an on/off server
pub fn is_present(ctx: &Context, endpoint: u8) -> bool {
    ctx.has_attribute(endpoint, CLUSTER, ClusterRole::Server, ATTR_ON_OFF)
}

/// Switch an endpoint on or off, applying the timed off rules
pub fn set_on_off(ctx: &mut Context, endpoint: u8, on: bool) -> Result<(), ClusterLibraryStatus> {
    if on {
        if get_u16(ctx, endpoint, ATTR_ON_TIME) == 0 {
            set_u16(ctx, endpoint, ATTR_OFF_WAIT_TIME, 0)?;
        }
        set_flag(ctx, endpoint, ATTR_GLOBAL_SCENE_CONTROL, true)?;
    } else {
        set_u16(ctx, endpoint, ATTR_ON_TIME, 0)?;
    }
    if is_on(ctx, endpoint) != on {
        set_flag(ctx, endpoint, ATTR_ON_OFF, on)?;
    }
    Ok(())
}

fn countdown_active(ctx: &Context, endpoint: u8) -> bool {
    let on_time = get_u16(ctx, endpoint, ATTR_ON_TIME);
    let off_wait_time = get_u16(ctx, endpoint, ATTR_OFF_WAIT_TIME);
    if is_on(ctx, endpoint) {
        on_time > 0 && on_time != TIME_FOREVER
    } else {
        off_wait_time > 0 && off_wait_time != TIME_FOREVER
    }
}

fn ensure_countdown(ctx: &mut Context, endpoint: u8) {
    let pending = ctx.core.scheduler.contains(|t| {
        matches!(t, Task::Cluster { endpoint: e, cluster: CLUSTER, job: ClusterJob::TimedOffTick, .. } if *e == endpoint)
    });
    if !pending && countdown_active(ctx, endpoint) {
        ctx.schedule_job(endpoint, CLUSTER, ClusterRole::Server, TICK_MS, ClusterJob::TimedOffTick);
    }
}

fn on_with_timed_off(
    ctx: &mut Context,
    endpoint: u8,
    control: u8,
    on_time: u16,
    off_wait_time: u16,
) -> Result<(), ClusterLibraryStatus> {
    let on = is_on(ctx, endpoint);
    if control & ACCEPT_ONLY_WHEN_ON != 0 && !on {
        log::debug!("On with timed off on {} ignored while off", endpoint);
        return Ok(());
    }
    let current_wait = get_u16(ctx, endpoint, ATTR_OFF_WAIT_TIME);
    if current_wait > 0 && !on {
        set_u16(ctx, endpoint, ATTR_OFF_WAIT_TIME, current_wait.min(off_wait_time))?;
    } else {
        let current_on = get_u16(ctx, endpoint, ATTR_ON_TIME);
        set_u16(ctx, endpoint, ATTR_ON_TIME, current_on.max(on_time))?;
        set_u16(ctx, endpoint, ATTR_OFF_WAIT_TIME, off_wait_time)?;
        set_flag(ctx, endpoint, ATTR_ON_OFF, true)?;
    }
    ensure_countdown(ctx, endpoint);
    Ok(())
}

fn countdown(ctx: &mut Context, endpoint: u8) -> Result<(), ClusterLibraryStatus> {
    if is_on(ctx, endpoint) {
        let on_time = get_u16(ctx, endpoint, ATTR_ON_TIME);
        if on_time == 0 || on_time == TIME_FOREVER {
            return Ok(());
        }
        set_u16(ctx, endpoint, ATTR_ON_TIME, on_time - 1)?;
        if on_time == 1 {
            set_u16(ctx, endpoint, ATTR_OFF_WAIT_TIME, 0)?;
            set_flag(ctx, endpoint, ATTR_ON_OFF, false)?;
        }
    } else {
        let off_wait_time = get_u16(ctx, endpoint, ATTR_OFF_WAIT_TIME);
        if off_wait_time == 0 || off_wait_time == TIME_FOREVER {
            return Ok(());
        }
        set_u16(ctx, endpoint, ATTR_OFF_WAIT_TIME, off_wait_time - 1)?;
    }
    Ok(())
}

/// On/Off cluster server
pub struct OnOffServer;

impl ClusterHandler for OnOffServer {
    fn cluster(&self) -> u16 {
        CLUSTER
    }

    fn role(&self) -> ClusterRole {
        ClusterRole::Server
    }

    fn init(&self, ctx: &mut Context, endpoint: u8) {
        let start_up = ctx
            .get_integer(endpoint, CLUSTER, ClusterRole::Server, ATTR_START_UP_ON_OFF)
            .and_then(|v| u8::try_from(v).ok());
        let on = match start_up {
            Some(START_UP_OFF) => false,
            Some(START_UP_ON) => true,
            Some(START_UP_TOGGLE) => !is_on(ctx, endpoint),
            _ => return,
        };
        if let Err(status) = set_flag(ctx, endpoint, ATTR_ON_OFF, on) {
            log::warn!("Start up state of {} not applied, {:?}", endpoint, status);
        }
    }

    fn write_hook(
        &self,
        ctx: &mut Context,
        endpoint: u8,
        attribute: u16,
        _value: &AttributeValue,
        _manufacturer: Option<u16>,
        _origin: &WriteOrigin,
    ) {
        if matches!(attribute, ATTR_ON_OFF | ATTR_ON_TIME | ATTR_OFF_WAIT_TIME) {
            ensure_countdown(ctx, endpoint);
        }
    }

    fn handle_command(
        &self,
        ctx: &mut Context,
        endpoint: u8,
        header: &ParsedHeader,
        payload: &[u8],
    ) -> CommandOutcome {
        let command = match parse::<OnOffCommand>(header, payload) {
            Ok(command) => command,
            Err(outcome) => return outcome,
        };
        log::debug!("On/off {} {:?}", endpoint, command);
        let result = match command {
            OnOffCommand::Off => set_on_off(ctx, endpoint, false),
            OnOffCommand::On => set_on_off(ctx, endpoint, true),
            OnOffCommand::Toggle => {
                let on = is_on(ctx, endpoint);
                set_on_off(ctx, endpoint, !on)
            }
            OnOffCommand::OffWithEffect { effect, variant } => {
                ctx.notify(DeviceEvent::OffWithEffect {
                    endpoint,
                    effect,
                    variant,
                });
                set_flag(ctx, endpoint, ATTR_GLOBAL_SCENE_CONTROL, false)
                    .and_then(|_| set_on_off(ctx, endpoint, false))
            }
            OnOffCommand::OnWithRecallGlobalScene => {
                let recalled = ctx
                    .get(endpoint, CLUSTER, ClusterRole::Server, ATTR_GLOBAL_SCENE_CONTROL)
                    .and_then(|v| v.as_bool())
                    .unwrap_or(true);
                if recalled {
                    Ok(())
                } else {
                    set_on_off(ctx, endpoint, true)
                }
            }
            OnOffCommand::OnWithTimedOff {
                control,
                on_time,
                off_wait_time,
            } => on_with_timed_off(ctx, endpoint, control, on_time, off_wait_time),
        };
        result.into()
    }

    fn received_commands(&self) -> &'static [u8] {
        &[
            CMD_OFF,
            CMD_ON,
            CMD_TOGGLE,
            CMD_OFF_WITH_EFFECT,
            CMD_ON_WITH_RECALL_GLOBAL_SCENE,
            CMD_ON_WITH_TIMED_OFF,
        ]
    }

    fn run_job(&self, ctx: &mut Context, endpoint: u8, job: ClusterJob) {
        if job != ClusterJob::TimedOffTick {
            return;
        }
        if let Err(status) = countdown(ctx, endpoint) {
            log::warn!("Timed off countdown on {} failed, {:?}", endpoint, status);
            return;
        }
        ensure_countdown(ctx, endpoint);
    }
}
