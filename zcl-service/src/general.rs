//! General command engine
//!
//! Handles the foundation commands shared by every cluster: attribute read
//! and write, reporting configuration, attribute and command discovery and
//! the default response.

use zcl_data::cluster_library::commands::{
    AttributeAccessControl, AttributeInformation, AttributeStatus, DiscoverAttributes,
    DiscoverAttributesExtendedResponse, DiscoverAttributesResponse, DiscoverCommands,
    DiscoverCommandsResponse, ExtendedAttributeInformation, ReadAttributes,
    ReadAttributesResponse, WriteAttributeStatus, WriteAttributes, WriteAttributesResponse,
};
use zcl_data::cluster_library::{
    ClusterLibraryStatus, Command, GeneralCommandIdentifier, ATTR_CLUSTER_REVISION, HEADER_SIZE,
    HEADER_SIZE_MANUFACTURER,
};

use crate::core::{Context, WritePlan};
use crate::event::DeviceEvent;
use crate::handler::{CommandOutcome, WriteOrigin};
use crate::header::ParsedHeader;
use crate::reporting;
use crate::revision::PeerCluster;
use crate::store::Access;

/// Split `items` into groups whose sizes add up to at most `capacity`,
/// items larger than `capacity` on their own are returned separately
pub fn split_by_size<T, F>(items: Vec<T>, capacity: usize, size: F) -> (Vec<Vec<T>>, Vec<T>)
where
    F: Fn(&T) -> usize,
{
    let mut groups = Vec::new();
    let mut oversized = Vec::new();
    let mut current = Vec::new();
    let mut used = 0;
    for item in items {
        let length = size(&item);
        if length > capacity {
            oversized.push(item);
            continue;
        }
        if used + length > capacity && !current.is_empty() {
            groups.push(core::mem::take(&mut current));
            used = 0;
        }
        used += length;
        current.push(item);
    }
    if !current.is_empty() {
        groups.push(current);
    }
    (groups, oversized)
}

/// How a write request is applied
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum WriteMode {
    /// Every record on its own
    Plain,
    /// All records or none
    Undivided,
    /// Every record on its own, no response
    NoResponse,
}

fn reply_payload_capacity(ctx: &Context, header: &ParsedHeader, endpoint: u8) -> usize {
    let header_size = if header.manufacturer.is_some() {
        HEADER_SIZE_MANUFACTURER
    } else {
        HEADER_SIZE
    };
    match header.reply_request(endpoint) {
        Some(request) => ctx.payload_capacity(&request, header_size),
        None => 0,
    }
}

/// Status records of a Read Attributes command
pub fn read_attributes(
    ctx: &Context,
    endpoint: u8,
    header: &ParsedHeader,
    request: &ReadAttributes,
) -> Vec<AttributeStatus> {
    let role = header.receiving_role();
    let store = &ctx.core.store;
    request
        .attributes
        .iter()
        .map(|identifier| {
            let descriptor =
                match store.find(endpoint, header.cluster, role, *identifier, header.manufacturer) {
                    Some(descriptor) if !descriptor.is_internal() => descriptor,
                    _ => {
                        return AttributeStatus::failure(
                            *identifier,
                            ctx.core
                                .revisions
                                .translate_status(ClusterLibraryStatus::UnsupportedAttribute),
                        )
                    }
                };
            if !descriptor.is_readable() {
                return AttributeStatus::failure(
                    *identifier,
                    ctx.core.revisions.translate_status(ClusterLibraryStatus::WriteOnly),
                );
            }
            match store.value(descriptor) {
                Some(value) => AttributeStatus::success(*identifier, value.clone()),
                None => AttributeStatus::failure(*identifier, ClusterLibraryStatus::Failure),
            }
        })
        .collect()
}

fn write_failure(ctx: &Context, status: ClusterLibraryStatus, identifier: u16) -> WriteAttributeStatus {
    WriteAttributeStatus {
        status: ctx.core.revisions.translate_status(status),
        identifier,
    }
}

/// Apply a write request, returns the per record failures
pub fn write_attributes(
    ctx: &mut Context,
    endpoint: u8,
    header: &ParsedHeader,
    request: &WriteAttributes,
    mode: WriteMode,
) -> WriteAttributesResponse {
    let role = header.receiving_role();
    let origin = WriteOrigin::Remote {
        source: header.source,
        endpoint: header.source_endpoint,
    };
    let mut failures = Vec::new();
    if mode == WriteMode::Undivided {
        let mut plans: Vec<WritePlan> = Vec::with_capacity(request.attributes.len());
        for record in request.attributes.iter() {
            match ctx.validate_write(
                endpoint,
                header.cluster,
                role,
                record.identifier,
                header.manufacturer,
                &record.value,
                &origin,
            ) {
                Ok(plan) => plans.push(plan),
                Err(status) => failures.push(write_failure(ctx, status, record.identifier)),
            }
        }
        if !failures.is_empty() {
            log::debug!("Undivided write to {:04x} rejected, {:?}", header.cluster, failures);
            return WriteAttributesResponse { failures };
        }
        for (plan, record) in plans.into_iter().zip(request.attributes.iter()) {
            if let Err(status) = ctx.commit_write(plan, record.value.clone(), &origin) {
                failures.push(write_failure(ctx, status, record.identifier));
            }
        }
    } else {
        for record in request.attributes.iter() {
            if let Err(status) = ctx.write_attribute(
                endpoint,
                header.cluster,
                role,
                record.identifier,
                header.manufacturer,
                record.value.clone(),
                origin,
            ) {
                log::debug!(
                    "Write of {:04x}:{:04x} failed, {:?}",
                    header.cluster,
                    record.identifier,
                    status
                );
                failures.push(write_failure(ctx, status, record.identifier));
            }
        }
    }
    WriteAttributesResponse { failures }
}

fn discover_attributes(
    ctx: &Context,
    endpoint: u8,
    header: &ParsedHeader,
    request: &DiscoverAttributes,
    entry_size: usize,
) -> (bool, Vec<(u16, zcl_data::cluster_library::AttributeDataType, Access)>) {
    let capacity = reply_payload_capacity(ctx, header, endpoint).saturating_sub(1);
    let maximum = usize::from(request.maximum).min(capacity / entry_size);
    let cluster = match ctx
        .core
        .store
        .cluster(endpoint, header.cluster, header.receiving_role())
    {
        Some(cluster) => cluster,
        None => return (true, Vec::new()),
    };
    let mut candidates = cluster
        .attributes
        .iter()
        .filter(|a| !a.is_internal() && a.matches_manufacturer(header.manufacturer))
        .filter(|a| a.identifier >= request.start);
    let found: Vec<_> = candidates
        .by_ref()
        .take(maximum)
        .map(|a| (a.identifier, a.data_type, a.access))
        .collect();
    let complete = candidates.next().is_none();
    (complete, found)
}

fn discover_commands(
    ctx: &Context,
    endpoint: u8,
    header: &ParsedHeader,
    request: &DiscoverCommands,
    generated: bool,
) -> DiscoverCommandsResponse {
    let capacity = reply_payload_capacity(ctx, header, endpoint).saturating_sub(1);
    let maximum = usize::from(request.maximum).min(capacity);
    let handlers = ctx.handlers;
    let commands = match handlers.find(header.cluster, header.receiving_role()) {
        Some(handler) => match header.manufacturer {
            Some(code) => handler
                .discover_manufacturer_commands(code, generated)
                .unwrap_or_default(),
            None if generated => handler.generated_commands().to_vec(),
            None => handler.received_commands().to_vec(),
        },
        None => Vec::new(),
    };
    let mut candidates = commands.into_iter().filter(|c| *c >= request.start);
    let found: Vec<u8> = candidates
        .by_ref()
        .take(maximum)
        .collect();
    DiscoverCommandsResponse {
        complete: candidates.next().is_none(),
        commands: found,
    }
}

fn learn_revisions(ctx: &mut Context, header: &ParsedHeader, attributes: &[AttributeStatus]) {
    let address = match header.source_ieee {
        Some(address) => address,
        None => return,
    };
    for status in attributes.iter() {
        if status.identifier != ATTR_CLUSTER_REVISION || !status.status.is_success() {
            continue;
        }
        let revision = status
            .value
            .as_ref()
            .and_then(|v| v.as_integer())
            .and_then(|v| u16::try_from(v).ok());
        if let Some(revision) = revision {
            ctx.core.revisions.learn(
                PeerCluster {
                    address,
                    cluster: header.cluster,
                    role: header.sending_role(),
                    endpoint: header.source_endpoint,
                },
                revision,
            );
        }
    }
}

fn reply(ctx: &mut Context, header: &ParsedHeader, endpoint: u8, command: Command) -> CommandOutcome {
    if header.is_group() {
        return CommandOutcome::HandledSilently;
    }
    match ctx.reply_general(header, endpoint, &command) {
        Ok(()) => CommandOutcome::Handled,
        Err(error) => {
            log::warn!("Reply {:?} failed, {}", command.identifier(), error);
            CommandOutcome::HandledSilently
        }
    }
}

/// Handle a general command addressed to a local endpoint
pub fn handle(ctx: &mut Context, endpoint: u8, header: &ParsedHeader, command: Command) -> CommandOutcome {
    match command {
        Command::ReadAttributes(request) => {
            let capacity = reply_payload_capacity(ctx, header, endpoint);
            let insufficient = ctx
                .core
                .revisions
                .translate_status(ClusterLibraryStatus::InsufficientSpace);
            let records = read_attributes(ctx, endpoint, header, &request)
                .into_iter()
                .map(|record| {
                    if record.encoded_size() <= capacity {
                        return record;
                    }
                    log::warn!(
                        "Attribute {:04x}:{:04x} does not fit a response",
                        header.cluster,
                        record.identifier
                    );
                    AttributeStatus::failure(record.identifier, insufficient)
                })
                .collect();
            let (frames, oversized) = split_by_size(records, capacity, |r| r.encoded_size());
            if !oversized.is_empty() {
                log::warn!("No room for a read response to {}", header.source);
            }
            let mut outcome = CommandOutcome::Handled;
            for attributes in frames {
                let response = Command::ReadAttributesResponse(ReadAttributesResponse { attributes });
                outcome = reply(ctx, header, endpoint, response);
            }
            outcome
        }
        Command::WriteAttributes(request) => {
            let response = write_attributes(ctx, endpoint, header, &request, WriteMode::Plain);
            reply(ctx, header, endpoint, Command::WriteAttributesResponse(response))
        }
        Command::WriteAttributesUndivided(request) => {
            let response = write_attributes(ctx, endpoint, header, &request, WriteMode::Undivided);
            reply(ctx, header, endpoint, Command::WriteAttributesResponse(response))
        }
        Command::WriteAttributesNoResponse(request) => {
            write_attributes(ctx, endpoint, header, &request, WriteMode::NoResponse);
            CommandOutcome::HandledSilently
        }
        Command::ConfigureReporting(request) => {
            let response = reporting::configure(ctx, endpoint, header, &request);
            reply(ctx, header, endpoint, Command::ConfigureReportingResponse(response))
        }
        Command::ReadReportingConfiguration(request) => {
            let response = reporting::read_configuration(ctx, endpoint, header, &request);
            reply(ctx, header, endpoint, Command::ReadReportingConfigurationResponse(response))
        }
        Command::ReportAttributes(report) => {
            reporting::report_received(ctx, endpoint, header, &report);
            CommandOutcome::Handled
        }
        Command::DefaultResponse(response) => {
            ctx.notify(DeviceEvent::DefaultResponse {
                source: header.source,
                cluster: header.cluster,
                command: response.command,
                status: u8::from(response.status),
            });
            CommandOutcome::HandledSilently
        }
        Command::DiscoverAttributes(request) => {
            let (complete, found) = discover_attributes(ctx, endpoint, header, &request, 3);
            let attributes = found
                .into_iter()
                .map(|(identifier, data_type, _)| AttributeInformation {
                    identifier,
                    data_type,
                })
                .collect();
            let response = DiscoverAttributesResponse {
                complete,
                attributes,
            };
            reply(ctx, header, endpoint, Command::DiscoverAttributesResponse(response))
        }
        Command::DiscoverAttributesExtended(request) => {
            let (complete, found) = discover_attributes(ctx, endpoint, header, &request, 4);
            let attributes = found
                .into_iter()
                .map(|(identifier, data_type, access)| ExtendedAttributeInformation {
                    identifier,
                    data_type,
                    access: access_control(access),
                })
                .collect();
            let response = DiscoverAttributesExtendedResponse {
                complete,
                attributes,
            };
            reply(ctx, header, endpoint, Command::DiscoverAttributesExtendedResponse(response))
        }
        Command::DiscoverCommandsReceived(request) => {
            let response = discover_commands(ctx, endpoint, header, &request, false);
            reply(ctx, header, endpoint, Command::DiscoverCommandsReceivedResponse(response))
        }
        Command::DiscoverCommandsGenerated(request) => {
            let response = discover_commands(ctx, endpoint, header, &request, true);
            reply(ctx, header, endpoint, Command::DiscoverCommandsGeneratedResponse(response))
        }
        Command::ReadAttributesResponse(response) => {
            learn_revisions(ctx, header, &response.attributes);
            log::debug!("Read response from {} {:?}", header.source, response.attributes);
            CommandOutcome::Handled
        }
        other => {
            log::debug!("{:?} from {}", other.identifier(), header.source);
            CommandOutcome::Handled
        }
    }
}

fn access_control(access: Access) -> AttributeAccessControl {
    let mut control = AttributeAccessControl::empty();
    if access.contains(Access::READ) {
        control |= AttributeAccessControl::READ;
    }
    if access.intersects(Access::WRITE | Access::WRITE_OPTIONAL) {
        control |= AttributeAccessControl::WRITE;
    }
    if access.contains(Access::REPORTING) {
        control |= AttributeAccessControl::REPORT;
    }
    control
}

/// Does a general command expect a default response on success
pub fn wants_default_response(command: GeneralCommandIdentifier) -> bool {
    matches!(
        command,
        GeneralCommandIdentifier::ReportAttributes
            | GeneralCommandIdentifier::WriteAttributesResponse
            | GeneralCommandIdentifier::ConfigureReportingResponse
            | GeneralCommandIdentifier::ReadReportingConfigurationResponse
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn split_at_item_boundaries() {
        let (groups, oversized) = split_by_size(vec![3, 4, 2, 9, 5, 1], 8, |n| *n);
        assert_eq!(groups, vec![vec![3, 4], vec![2, 5, 1]]);
        assert_eq!(oversized, vec![9]);
        let (groups, oversized) = split_by_size(Vec::<usize>::new(), 8, |n| *n);
        assert!(groups.is_empty());
        assert!(oversized.is_empty());
    }

    #[test]
    fn access_flags() {
        assert_eq!(
            access_control(Access::RWP),
            AttributeAccessControl::READ | AttributeAccessControl::WRITE | AttributeAccessControl::REPORT
        );
        assert_eq!(
            access_control(Access::READ | Access::WRITE_OPTIONAL),
            AttributeAccessControl::READ | AttributeAccessControl::WRITE
        );
        assert_eq!(access_control(Access::RO), AttributeAccessControl::READ);
    }
}
