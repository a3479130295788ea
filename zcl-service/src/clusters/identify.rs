//! Identify cluster
//!
//! The server counts the identify time down once a second. Every change of
//! the identify time is raised to the application, which is expected to
//! blink or beep while it is non-zero.

use zcl_data::cluster_library::identify::{
    IdentifyCommand, IdentifyResponse, ATTR_IDENTIFY_TIME, CLUSTER, CMD_IDENTIFY,
    CMD_IDENTIFY_QUERY, CMD_IDENTIFY_QUERY_RESPONSE, CMD_TRIGGER_EFFECT,
};
use zcl_data::cluster_library::{AttributeValue, ClusterLibraryStatus, ClusterRole};

use super::parse;
use crate::core::Context;
use crate::event::DeviceEvent;
use crate::handler::{ClusterHandler, CommandOutcome, WriteOrigin};
use crate::header::ParsedHeader;
use crate::scheduler::ClusterJob;
use crate::store::{Access, AttributeDefinition, ClusterDefinition};

const TICK_MS: u32 = 1000;

/// Identify server cluster
pub fn server() -> ClusterDefinition {
    ClusterDefinition::server(CLUSTER).attribute(AttributeDefinition::new(
        ATTR_IDENTIFY_TIME,
        Access::RW,
        AttributeValue::Unsigned16(0),
    ))
}

/// Identify client cluster
pub fn client() -> ClusterDefinition {
    ClusterDefinition::client(CLUSTER)
}

fn identify_time(ctx: &Context, endpoint: u8) -> u16 {
    ctx.get_integer(endpoint, CLUSTER, ClusterRole::Server, ATTR_IDENTIFY_TIME)
        .and_then(|t| u16::try_from(t).ok())
        .unwrap_or(0)
}

fn set_identify_time(ctx: &mut Context, endpoint: u8, time: u16) -> Result<(), ClusterLibraryStatus> {
    ctx.set(
        endpoint,
        CLUSTER,
        ClusterRole::Server,
        ATTR_IDENTIFY_TIME,
        AttributeValue::Unsigned16(time),
    )
}

/// Identify cluster server
pub struct IdentifyServer;

impl ClusterHandler for IdentifyServer {
    fn cluster(&self) -> u16 {
        CLUSTER
    }

    fn role(&self) -> ClusterRole {
        ClusterRole::Server
    }

    fn init(&self, ctx: &mut Context, endpoint: u8) {
        if identify_time(ctx, endpoint) > 0 {
            ctx.schedule_job(endpoint, CLUSTER, ClusterRole::Server, TICK_MS, ClusterJob::IdentifyTick);
        }
    }

    fn write_hook(
        &self,
        ctx: &mut Context,
        endpoint: u8,
        attribute: u16,
        value: &AttributeValue,
        _manufacturer: Option<u16>,
        _origin: &WriteOrigin,
    ) {
        if attribute != ATTR_IDENTIFY_TIME {
            return;
        }
        let time = value.as_unsigned().and_then(|t| u16::try_from(t).ok()).unwrap_or(0);
        ctx.cancel_jobs(endpoint, CLUSTER, |j| matches!(j, ClusterJob::IdentifyTick));
        if time > 0 {
            ctx.schedule_job(endpoint, CLUSTER, ClusterRole::Server, TICK_MS, ClusterJob::IdentifyTick);
        }
        ctx.notify(DeviceEvent::IdentifyTime { endpoint, time });
    }

    fn handle_command(
        &self,
        ctx: &mut Context,
        endpoint: u8,
        header: &ParsedHeader,
        payload: &[u8],
    ) -> CommandOutcome {
        let command = match parse::<IdentifyCommand>(header, payload) {
            Ok(command) => command,
            Err(outcome) => return outcome,
        };
        match command {
            IdentifyCommand::Identify { identify_time } => {
                set_identify_time(ctx, endpoint, identify_time).into()
            }
            IdentifyCommand::IdentifyQuery => {
                let timeout = identify_time(ctx, endpoint);
                if timeout == 0 {
                    return CommandOutcome::HandledSilently;
                }
                let response = IdentifyResponse::IdentifyQueryResponse { timeout };
                match ctx.reply_cluster(header, endpoint, &response) {
                    Ok(()) => CommandOutcome::Handled,
                    Err(error) => {
                        log::warn!("Identify query response failed, {}", error);
                        CommandOutcome::HandledErr(ClusterLibraryStatus::Failure)
                    }
                }
            }
            IdentifyCommand::TriggerEffect { effect, variant } => {
                ctx.notify(DeviceEvent::SetEffect {
                    endpoint,
                    effect: u8::from(effect),
                    variant,
                });
                CommandOutcome::Handled
            }
        }
    }

    fn received_commands(&self) -> &'static [u8] {
        &[CMD_IDENTIFY, CMD_IDENTIFY_QUERY, CMD_TRIGGER_EFFECT]
    }

    fn generated_commands(&self) -> &'static [u8] {
        &[CMD_IDENTIFY_QUERY_RESPONSE]
    }

    fn run_job(&self, ctx: &mut Context, endpoint: u8, job: ClusterJob) {
        if job != ClusterJob::IdentifyTick {
            return;
        }
        let time = identify_time(ctx, endpoint);
        if time == 0 {
            return;
        }
        if let Err(status) = set_identify_time(ctx, endpoint, time - 1) {
            log::warn!("Identify countdown on {} failed, {:?}", endpoint, status);
        }
    }
}

/// Identify cluster client
pub struct IdentifyClient;

impl ClusterHandler for IdentifyClient {
    fn cluster(&self) -> u16 {
        CLUSTER
    }

    fn role(&self) -> ClusterRole {
        ClusterRole::Client
    }

    fn handle_command(
        &self,
        ctx: &mut Context,
        endpoint: u8,
        header: &ParsedHeader,
        payload: &[u8],
    ) -> CommandOutcome {
        match parse::<IdentifyResponse>(header, payload) {
            Ok(IdentifyResponse::IdentifyQueryResponse { timeout }) => {
                ctx.notify(DeviceEvent::IdentifyQueryResponse {
                    source: header.source,
                    endpoint,
                    timeout,
                });
                CommandOutcome::Handled
            }
            Err(outcome) => outcome,
        }
    }

    fn received_commands(&self) -> &'static [u8] {
        &[CMD_IDENTIFY_QUERY_RESPONSE]
    }

    fn generated_commands(&self) -> &'static [u8] {
        &[CMD_IDENTIFY, CMD_IDENTIFY_QUERY, CMD_TRIGGER_EFFECT]
    }
}
