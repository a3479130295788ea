//! Inbound frame dispatch
//!
//! A received frame is parsed once, then handed to the general command
//! engine or the cluster handler of every addressed endpoint. The dispatcher
//! decides on the default response from the outcome.

use zcl_data::cluster_library::commands::DefaultResponse;
use zcl_data::cluster_library::{
    peek_sequence_and_command, ClusterLibraryHeader, ClusterLibraryStatus, Command, FrameType,
    GeneralCommandIdentifier, ENDPOINT_BROADCAST,
};
use zcl_data::pack::Pack;
use zcl_data::Address;

use crate::buffer::{BufferId, StageContext};
use crate::core::Context;
use crate::general;
use crate::handler::CommandOutcome;
use crate::header::ParsedHeader;
use crate::transport::{ApsDataIndication, ApsDataRequest, DestinationAddress, TransmitOptions};
use crate::Error;

const DISABLE_DEFAULT_RESPONSE: u8 = 0x10;

/// Process the frame in `buffer`, the buffer is released when done
pub fn receive_buffer(ctx: &mut Context, buffer: BufferId) -> Result<(), Error> {
    let result = receive_inner(ctx, buffer);
    if let Err(error) = ctx.core.pool.release(buffer) {
        log::warn!("Release of {} failed, {}", buffer, error);
    }
    result
}

fn receive_inner(ctx: &mut Context, buffer: BufferId) -> Result<(), Error> {
    let indication = match ctx.core.pool.take_context(buffer)? {
        StageContext::Indication(indication) => indication,
        other => {
            log::warn!("Buffer {} holds no indication, {:?}", buffer, other);
            return Err(Error::InvalidBuffer);
        }
    };
    let data = ctx.core.pool.data(buffer)?.to_vec();

    if let (Address::Short(short), Some(extended)) = (indication.source, indication.source_ieee) {
        ctx.core.revisions.learn_address(short, extended);
    }

    let (header, used) = match ParsedHeader::parse(&indication, &data) {
        Ok(parsed) => parsed,
        Err(error) => {
            log::warn!("> {} malformed header, {}", indication.source, error);
            malformed_header(ctx, &indication, &data);
            return Ok(());
        }
    };
    log::info!(
        "> {} {} {:04x} {:?} {:?} tsn {} cmd {:02x}",
        header.source,
        header.source_endpoint,
        header.cluster,
        header.frame_type,
        header.direction,
        header.transaction_sequence,
        header.command
    );
    ctx.core
        .pool
        .set_context(buffer, StageContext::Parsed(header.clone()))?;
    let payload = &data[used..];

    let role = header.receiving_role();
    let endpoints = if header.destination.is_group() || header.destination_endpoint == ENDPOINT_BROADCAST {
        ctx.core.store.endpoints_with_cluster(header.cluster, role)
    } else if ctx.core.store.endpoint(header.destination_endpoint).is_some() {
        vec![header.destination_endpoint]
    } else {
        log::warn!(
            "> {} for unknown endpoint {}, dropped",
            header.source,
            header.destination_endpoint
        );
        return Ok(());
    };
    if endpoints.is_empty() {
        log::debug!("> No endpoint with cluster {:04x}", header.cluster);
    }
    for endpoint in endpoints {
        dispatch(ctx, endpoint, &header, payload);
    }
    Ok(())
}

/// Default response to a frame whose header could not be parsed
fn malformed_header(ctx: &mut Context, indication: &ApsDataIndication, data: &[u8]) {
    let first = match data.first() {
        Some(first) => *first,
        None => return,
    };
    if first & DISABLE_DEFAULT_RESPONSE != 0 || indication.destination.is_group() {
        return;
    }
    let (direction, sequence, command) = match peek_sequence_and_command(data) {
        Some(peeked) => peeked,
        None => return,
    };
    let destination = match DestinationAddress::reply_to(&indication.source) {
        Some(destination) => destination,
        None => return,
    };
    let request = ApsDataRequest {
        destination,
        destination_endpoint: indication.source_endpoint,
        source_endpoint: indication.destination_endpoint,
        profile: indication.profile,
        cluster: indication.cluster,
        options: TransmitOptions::ACKNOWLEDGED,
    };
    let mut reply = ClusterLibraryHeader::new(
        FrameType::Global,
        direction.reverse(),
        None,
        sequence,
        u8::from(GeneralCommandIdentifier::DefaultResponse),
    );
    reply.control.disable_default_response = true;
    let status = ctx
        .core
        .revisions
        .translate_status(ClusterLibraryStatus::MalformedCommand);
    let response = DefaultResponse::new(command, status);
    if let Err(error) = ctx.send_frame(request, &reply, |d| response.pack(d), None) {
        log::warn!("Default response failed, {}", error);
    }
}

fn unsupported_general(header: &ParsedHeader) -> ClusterLibraryStatus {
    if header.manufacturer.is_some() {
        ClusterLibraryStatus::UnsupportedManufacturerGeneralCommand
    } else {
        ClusterLibraryStatus::UnsupportedGeneralCommand
    }
}

fn unsupported_cluster_command(header: &ParsedHeader) -> ClusterLibraryStatus {
    if header.manufacturer.is_some() {
        ClusterLibraryStatus::UnsupportedManufacturerClusterCommand
    } else {
        ClusterLibraryStatus::UnsupportedClusterCommand
    }
}

/// Status of a general command to put in a default response, `None` for no
/// default response
fn dispatch_general(
    ctx: &mut Context,
    endpoint: u8,
    header: &ParsedHeader,
    payload: &[u8],
) -> Option<ClusterLibraryStatus> {
    let identifier = match GeneralCommandIdentifier::try_from(header.command) {
        Ok(identifier) => identifier,
        Err(_) => return Some(unsupported_general(header)),
    };
    let command = match Command::unpack(payload, identifier) {
        Ok((command, _)) => command,
        Err(zcl_data::Error::NotImplemented) => return Some(unsupported_general(header)),
        Err(error) => {
            log::warn!("> {:?} from {} malformed, {}", identifier, header.source, error);
            return Some(ClusterLibraryStatus::MalformedCommand);
        }
    };
    match general::handle(ctx, endpoint, header, command) {
        CommandOutcome::Handled if general::wants_default_response(identifier) => {
            Some(ClusterLibraryStatus::Success)
        }
        CommandOutcome::Handled | CommandOutcome::HandledSilently => None,
        CommandOutcome::HandledErr(status) => Some(status),
        CommandOutcome::NotHandled => Some(unsupported_general(header)),
    }
}

fn dispatch_cluster(
    ctx: &mut Context,
    endpoint: u8,
    header: &ParsedHeader,
    payload: &[u8],
) -> Option<ClusterLibraryStatus> {
    let handlers = ctx.handlers;
    let handler = match handlers.find(header.cluster, header.receiving_role()) {
        Some(handler) => handler,
        None => return Some(unsupported_cluster_command(header)),
    };
    match handler.handle_command(ctx, endpoint, header, payload) {
        CommandOutcome::Handled => Some(ClusterLibraryStatus::Success),
        CommandOutcome::HandledErr(status) => Some(status),
        CommandOutcome::HandledSilently => None,
        CommandOutcome::NotHandled => Some(unsupported_cluster_command(header)),
    }
}

/// Hand a parsed frame to one endpoint
pub fn dispatch(ctx: &mut Context, endpoint: u8, header: &ParsedHeader, payload: &[u8]) {
    ctx.core.replied = false;
    let status = if ctx
        .core
        .store
        .cluster(endpoint, header.cluster, header.receiving_role())
        .is_none()
    {
        log::debug!(
            "> Cluster {:04x} {:?} not on endpoint {}",
            header.cluster,
            header.receiving_role(),
            endpoint
        );
        Some(ClusterLibraryStatus::UnsupportedCluster)
    } else {
        match header.frame_type {
            FrameType::Global => dispatch_general(ctx, endpoint, header, payload),
            FrameType::Local => dispatch_cluster(ctx, endpoint, header, payload),
        }
    };
    let status = match status {
        Some(status) => status,
        None => return,
    };
    let is_default_response = header.frame_type == FrameType::Global
        && header.command == u8::from(GeneralCommandIdentifier::DefaultResponse);
    if header.disable_default_response || header.is_group() || ctx.core.replied || is_default_response {
        if !status.is_success() {
            log::debug!("> {:02x} from {} failed, {:?}", header.command, header.source, status);
        }
        return;
    }
    if let Err(error) = ctx.send_default_response(header, endpoint, status) {
        log::warn!("Default response to {} failed, {}", header.source, error);
    }
}
