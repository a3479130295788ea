//! Attribute reporting
//!
//! The reporting table holds one entry per configured attribute and
//! direction. Send entries are checked on every reporting tick against their
//! minimum and maximum intervals and reportable change, due attributes of a
//! cluster are batched into Report Attributes commands for every bound
//! destination. Receive entries watch for peers going silent.

use zcl_data::cluster_library::commands::{
    AttributeRecord, ConfigureReporting, ConfigureReportingResponse, ConfigureReportingStatus,
    ReadReportingConfiguration, ReadReportingConfigurationResponse, ReportAttributes,
    ReportingConfiguration, ReportingConfigurationRecord, ReportingDirection, REPORTING_DISABLED,
};
use zcl_data::cluster_library::{
    AttributeValue, ClusterLibraryStatus, ClusterRole, Command, ATTR_CLUSTER_REVISION,
    HEADER_SIZE, HEADER_SIZE_MANUFACTURER,
};

use crate::core::Context;
use crate::event::DeviceEvent;
use crate::general::split_by_size;
use crate::header::ParsedHeader;
use crate::persist::StoredReporting;
use crate::revision::PeerCluster;
use crate::store::AttributeKey;
use crate::Error;

/// Minimum interval of reporting started locally, in seconds
pub const DEFAULT_MINIMUM_INTERVAL: u16 = 5;
/// Maximum interval of reporting started locally, zero for no periodic reports
pub const DEFAULT_MAXIMUM_INTERVAL: u16 = 0;

/// Reporting configuration and state of one attribute
#[derive(Clone, Debug, PartialEq)]
pub struct ReportingEntry {
    pub key: AttributeKey,
    pub direction: ReportingDirection,
    pub minimum_interval: u16,
    pub maximum_interval: u16,
    pub reportable_change: Option<AttributeValue>,
    /// Seconds a receive entry waits for a report
    pub timeout: u16,
    /// Value in the last report
    pub last_value: Option<AttributeValue>,
    /// Time of the last report
    pub last_time: u32,
}

impl ReportingEntry {
    pub fn send(key: AttributeKey, minimum_interval: u16, maximum_interval: u16) -> Self {
        Self {
            key,
            direction: ReportingDirection::Send,
            minimum_interval,
            maximum_interval,
            reportable_change: None,
            timeout: 0,
            last_value: None,
            last_time: 0,
        }
    }

    pub fn receive(key: AttributeKey, timeout: u16) -> Self {
        Self {
            key,
            direction: ReportingDirection::Receive,
            minimum_interval: 0,
            maximum_interval: 0,
            reportable_change: None,
            timeout,
            last_value: None,
            last_time: 0,
        }
    }

    /// Should `current` be reported at `now`
    pub fn is_due(&self, current: &AttributeValue, now: u32) -> bool {
        let elapsed = now.wrapping_sub(self.last_time);
        if self.maximum_interval != 0 && elapsed >= u32::from(self.maximum_interval) * 1000 {
            return true;
        }
        if elapsed < u32::from(self.minimum_interval) * 1000 {
            return false;
        }
        let last = match &self.last_value {
            Some(last) => last,
            None => return true,
        };
        if current == last {
            return false;
        }
        if current.data_type().is_analog() {
            match &self.reportable_change {
                Some(change) => current.change_reaches(last, change).unwrap_or(true),
                None => true,
            }
        } else {
            true
        }
    }

    fn stored(&self) -> StoredReporting {
        StoredReporting {
            key: self.key,
            direction: self.direction,
            minimum_interval: self.minimum_interval,
            maximum_interval: self.maximum_interval,
            reportable_change: self.reportable_change.clone(),
            timeout: self.timeout,
        }
    }
}

/// Reporting entries in order of registration
#[derive(Clone, Debug, Default)]
pub struct ReportingTable {
    entries: Vec<ReportingEntry>,
}

impl ReportingTable {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn entries(&self) -> &[ReportingEntry] {
        &self.entries
    }

    pub fn find(&self, key: &AttributeKey, direction: ReportingDirection) -> Option<&ReportingEntry> {
        self.entries
            .iter()
            .find(|e| e.key == *key && e.direction == direction)
    }

    pub fn find_mut(
        &mut self,
        key: &AttributeKey,
        direction: ReportingDirection,
    ) -> Option<&mut ReportingEntry> {
        self.entries
            .iter_mut()
            .find(|e| e.key == *key && e.direction == direction)
    }

    pub fn has_send_entry(&self, key: &AttributeKey) -> bool {
        self.find(key, ReportingDirection::Send).is_some()
    }

    /// Add or replace an entry, a replaced entry keeps its place
    pub fn upsert(&mut self, entry: ReportingEntry) {
        match self.find_mut(&entry.key, entry.direction) {
            Some(existing) => *existing = entry,
            None => self.entries.push(entry),
        }
    }

    pub fn remove(&mut self, key: &AttributeKey, direction: ReportingDirection) -> bool {
        let before = self.entries.len();
        self.entries
            .retain(|e| !(e.key == *key && e.direction == direction));
        before != self.entries.len()
    }

    /// Remove every entry of an endpoint
    pub fn remove_endpoint(&mut self, endpoint: u8) {
        self.entries.retain(|e| e.key.endpoint != endpoint);
    }

    /// Configuration in the form kept by a persistent store
    pub fn stored(&self) -> Vec<StoredReporting> {
        self.entries.iter().map(|e| e.stored()).collect()
    }
}

/// Save the reporting configuration
pub fn persist(ctx: &mut Context) {
    let stored = ctx.core.reporting.stored();
    ctx.core.persistent.save_reporting(&stored);
}

/// Load the saved configuration of an endpoint
pub fn restore(ctx: &mut Context, endpoint: u8) -> usize {
    let now = ctx.now();
    let stored = ctx.core.persistent.load_reporting();
    let mut count = 0;
    for entry in stored.into_iter().filter(|e| e.key.endpoint == endpoint) {
        let key = entry.key;
        let current = ctx
            .core
            .store
            .get(key.endpoint, key.cluster, key.role, key.attribute, key.manufacturer())
            .cloned();
        if entry.direction == ReportingDirection::Send && current.is_none() {
            log::warn!("Saved reporting for missing attribute {}", key);
            continue;
        }
        ctx.core.reporting.upsert(ReportingEntry {
            key,
            direction: entry.direction,
            minimum_interval: entry.minimum_interval,
            maximum_interval: entry.maximum_interval,
            reportable_change: entry.reportable_change,
            timeout: entry.timeout,
            last_value: current,
            last_time: now,
        });
        count += 1;
    }
    if count > 0 {
        ctx.ensure_reporting_tick();
    }
    count
}

/// Start reporting an attribute with the default intervals, an existing
/// configuration is kept
pub fn start_reporting(
    ctx: &mut Context,
    endpoint: u8,
    cluster: u16,
    role: ClusterRole,
    attribute: u16,
    manufacturer: Option<u16>,
) -> Result<(), Error> {
    let store = &ctx.core.store;
    let descriptor = store
        .find(endpoint, cluster, role, attribute, manufacturer)
        .ok_or(Error::Status(ClusterLibraryStatus::UnsupportedAttribute))?;
    if !descriptor.is_reportable() {
        return Err(Error::Status(ClusterLibraryStatus::UnreportableAttribute));
    }
    let key = store
        .key(endpoint, cluster, role, attribute, manufacturer)
        .ok_or(Error::NotFound)?;
    if ctx.core.reporting.has_send_entry(&key) {
        return Ok(());
    }
    let mut entry = ReportingEntry::send(key, DEFAULT_MINIMUM_INTERVAL, DEFAULT_MAXIMUM_INTERVAL);
    entry.last_time = ctx.now();
    ctx.core.reporting.upsert(entry);
    log::debug!("Reporting of {} started", key);
    persist(ctx);
    ctx.ensure_reporting_tick();
    Ok(())
}

/// Stop reporting an attribute
pub fn stop_reporting(
    ctx: &mut Context,
    endpoint: u8,
    cluster: u16,
    role: ClusterRole,
    attribute: u16,
    manufacturer: Option<u16>,
) -> Result<(), Error> {
    let key = ctx
        .core
        .store
        .key(endpoint, cluster, role, attribute, manufacturer)
        .ok_or(Error::NotFound)?;
    if !ctx.core.reporting.remove(&key, ReportingDirection::Send) {
        return Err(Error::NotFound);
    }
    log::debug!("Reporting of {} stopped", key);
    persist(ctx);
    Ok(())
}

fn configure_send(
    ctx: &mut Context,
    endpoint: u8,
    header: &ParsedHeader,
    record: &ReportingConfiguration,
) -> Result<(), ClusterLibraryStatus> {
    let (identifier, data_type, minimum, maximum, change) = match record {
        ReportingConfiguration::Send {
            identifier,
            data_type,
            minimum_interval,
            maximum_interval,
            reportable_change,
        } => (
            *identifier,
            *data_type,
            *minimum_interval,
            *maximum_interval,
            reportable_change,
        ),
        ReportingConfiguration::Receive { .. } => return Err(ClusterLibraryStatus::InvalidField),
    };
    let role = header.receiving_role();
    let store = &ctx.core.store;
    let descriptor = store
        .find(endpoint, header.cluster, role, identifier, header.manufacturer)
        .filter(|d| !d.is_internal())
        .ok_or(ClusterLibraryStatus::UnsupportedAttribute)?;
    if !descriptor.is_reportable() {
        return Err(ClusterLibraryStatus::UnreportableAttribute);
    }
    if data_type != descriptor.data_type {
        return Err(ClusterLibraryStatus::InvalidDataType);
    }
    let key = store
        .key(endpoint, header.cluster, role, identifier, header.manufacturer)
        .ok_or(ClusterLibraryStatus::UnsupportedAttribute)?;
    if maximum == REPORTING_DISABLED {
        if ctx.core.reporting.remove(&key, ReportingDirection::Send) {
            log::debug!("Reporting of {} removed", key);
        }
        return Ok(());
    }
    if maximum != 0 && minimum > maximum {
        return Err(ClusterLibraryStatus::InvalidValue);
    }
    if let Some(change) = change {
        if change.data_type() != data_type {
            return Err(ClusterLibraryStatus::InvalidDataType);
        }
    }
    let current = store.value(descriptor).cloned();
    let entry = ReportingEntry {
        key,
        direction: ReportingDirection::Send,
        minimum_interval: minimum,
        maximum_interval: maximum,
        reportable_change: change.clone().filter(|_| data_type.is_analog()),
        timeout: 0,
        last_value: current,
        last_time: ctx.now(),
    };
    log::debug!(
        "Reporting of {} every {}..{} s, change {:?}",
        key,
        minimum,
        maximum,
        entry.reportable_change
    );
    ctx.core.reporting.upsert(entry);
    Ok(())
}

fn configure_receive(
    ctx: &mut Context,
    endpoint: u8,
    header: &ParsedHeader,
    identifier: u16,
    timeout: u16,
) -> Result<(), ClusterLibraryStatus> {
    let role = header.receiving_role();
    let cluster = ctx
        .core
        .store
        .cluster(endpoint, header.cluster, role)
        .ok_or(ClusterLibraryStatus::UnsupportedCluster)?;
    let key = AttributeKey {
        endpoint,
        cluster: header.cluster,
        role: cluster.role,
        attribute: identifier,
        manufacturer_code: header
            .manufacturer
            .unwrap_or(zcl_data::cluster_library::MANUFACTURER_CODE_NONE),
    };
    let mut entry = ReportingEntry::receive(key, timeout);
    entry.last_time = ctx.now();
    ctx.core.reporting.upsert(entry);
    Ok(())
}

/// Apply a Configure Reporting command
pub fn configure(
    ctx: &mut Context,
    endpoint: u8,
    header: &ParsedHeader,
    request: &ConfigureReporting,
) -> ConfigureReportingResponse {
    let mut failures = Vec::new();
    for record in request.records.iter() {
        let result = match record {
            ReportingConfiguration::Send { .. } => configure_send(ctx, endpoint, header, record),
            ReportingConfiguration::Receive {
                identifier,
                timeout,
            } => configure_receive(ctx, endpoint, header, *identifier, *timeout),
        };
        if let Err(status) = result {
            log::debug!(
                "Configure reporting of {:04x}:{:04x} failed, {:?}",
                header.cluster,
                record.identifier(),
                status
            );
            failures.push(ConfigureReportingStatus {
                status: ctx.core.revisions.translate_status(status),
                direction: record.direction(),
                identifier: record.identifier(),
            });
        }
    }
    persist(ctx);
    if !ctx.core.reporting.is_empty() {
        ctx.ensure_reporting_tick();
    }
    ConfigureReportingResponse { failures }
}

/// Answer a Read Reporting Configuration command
pub fn read_configuration(
    ctx: &Context,
    endpoint: u8,
    header: &ParsedHeader,
    request: &ReadReportingConfiguration,
) -> ReadReportingConfigurationResponse {
    let role = header.receiving_role();
    let store = &ctx.core.store;
    let records = request
        .records
        .iter()
        .map(|selector| {
            let failed = |status: ClusterLibraryStatus| ReportingConfigurationRecord::Failed {
                status: ctx.core.revisions.translate_status(status),
                direction: selector.direction,
                identifier: selector.identifier,
            };
            let descriptor =
                match store.find(endpoint, header.cluster, role, selector.identifier, header.manufacturer) {
                    Some(descriptor) if !descriptor.is_internal() => descriptor,
                    _ => return failed(ClusterLibraryStatus::UnsupportedAttribute),
                };
            if selector.direction == ReportingDirection::Send && !descriptor.is_reportable() {
                return failed(ClusterLibraryStatus::UnreportableAttribute);
            }
            let key = match store.key(endpoint, header.cluster, role, selector.identifier, header.manufacturer) {
                Some(key) => key,
                None => return failed(ClusterLibraryStatus::UnsupportedAttribute),
            };
            match ctx.core.reporting.find(&key, selector.direction) {
                Some(entry) if entry.direction == ReportingDirection::Send => {
                    ReportingConfigurationRecord::Found(ReportingConfiguration::Send {
                        identifier: selector.identifier,
                        data_type: descriptor.data_type,
                        minimum_interval: entry.minimum_interval,
                        maximum_interval: entry.maximum_interval,
                        reportable_change: entry.reportable_change.clone(),
                    })
                }
                Some(entry) => ReportingConfigurationRecord::Found(ReportingConfiguration::Receive {
                    identifier: selector.identifier,
                    timeout: entry.timeout,
                }),
                None => failed(ClusterLibraryStatus::NotFound),
            }
        })
        .collect();
    ReadReportingConfigurationResponse { records }
}

/// Key grouping attributes into one report
type Batch = (u8, u16, ClusterRole, u16);

/// Run the reporting engine
pub fn tick(ctx: &mut Context) {
    let now = ctx.now();
    let mut due: Vec<(Batch, AttributeRecord)> = Vec::new();
    let mut silent = Vec::new();
    {
        let core = &mut *ctx.core;
        let store = &core.store;
        for entry in core.reporting.entries.iter_mut() {
            let key = entry.key;
            match entry.direction {
                ReportingDirection::Send => {
                    let current = match store.get(
                        key.endpoint,
                        key.cluster,
                        key.role,
                        key.attribute,
                        key.manufacturer(),
                    ) {
                        Some(value) => value,
                        None => continue,
                    };
                    if entry.is_due(current, now) {
                        log::trace!("{:08} Report {} = {}", now, key, current);
                        entry.last_value = Some(current.clone());
                        entry.last_time = now;
                        due.push((
                            (key.endpoint, key.cluster, key.role, key.manufacturer_code),
                            AttributeRecord::new(key.attribute, current.clone()),
                        ));
                    }
                }
                ReportingDirection::Receive => {
                    let timeout = u32::from(entry.timeout) * 1000;
                    if entry.timeout != 0 && now.wrapping_sub(entry.last_time) >= timeout {
                        entry.last_time = now;
                        silent.push(key);
                    }
                }
            }
        }
    }
    for key in silent {
        log::warn!("{:08} No report for {} in time", now, key);
        ctx.notify(DeviceEvent::NoReporting {
            endpoint: key.endpoint,
            cluster: key.cluster,
            attribute: key.attribute,
        });
    }
    let mut batches: Vec<(Batch, Vec<AttributeRecord>)> = Vec::new();
    for (batch, record) in due {
        match batches.iter_mut().find(|(b, _)| *b == batch) {
            Some((_, records)) => records.push(record),
            None => batches.push((batch, vec![record])),
        }
    }
    for ((endpoint, cluster, role, manufacturer_code), records) in batches {
        let manufacturer = if manufacturer_code == zcl_data::cluster_library::MANUFACTURER_CODE_NONE {
            None
        } else {
            Some(manufacturer_code)
        };
        send_report(ctx, endpoint, cluster, role, manufacturer, records);
    }
    if !ctx.core.reporting.is_empty() {
        ctx.ensure_reporting_tick();
    }
}

/// Send Report Attributes with `records` to every bound destination, split
/// over several frames when needed
pub fn send_report(
    ctx: &mut Context,
    endpoint: u8,
    cluster: u16,
    role: ClusterRole,
    manufacturer: Option<u16>,
    records: Vec<AttributeRecord>,
) -> usize {
    let destinations = ctx.destinations(endpoint, cluster);
    if destinations.is_empty() {
        log::debug!("No binding for reports of {:04x} on {}", cluster, endpoint);
        return 0;
    }
    let header_size = if manufacturer.is_some() {
        HEADER_SIZE_MANUFACTURER
    } else {
        HEADER_SIZE
    };
    let mut sent = 0;
    for destination in destinations {
        let request = ctx.request_for(endpoint, destination, cluster);
        let capacity = ctx.payload_capacity(&request, header_size);
        let (frames, oversized) = split_by_size(records.clone(), capacity, |r| r.encoded_size());
        for record in oversized {
            log::warn!(
                "Report of {:04x}:{:04x} does not fit a frame, dropped",
                cluster,
                record.identifier
            );
            ctx.core.dropped = ctx.core.dropped.wrapping_add(1);
        }
        for attributes in frames {
            let command = Command::ReportAttributes(ReportAttributes { attributes });
            match ctx.send_general(endpoint, destination, cluster, role, manufacturer, &command, None) {
                Ok(_) => sent += 1,
                Err(error) => log::warn!("Report to {} failed, {}", destination.address, error),
            }
        }
    }
    sent
}

/// Handle an inbound Report Attributes command
pub fn report_received(ctx: &mut Context, endpoint: u8, header: &ParsedHeader, report: &ReportAttributes) {
    let role = header.receiving_role();
    let cluster_role = ctx
        .core
        .store
        .cluster(endpoint, header.cluster, role)
        .map(|c| c.role)
        .unwrap_or(role);
    let now = ctx.now();
    for record in report.attributes.iter() {
        if record.identifier == ATTR_CLUSTER_REVISION {
            if let (Some(address), Some(revision)) = (header.source_ieee, record.value.as_integer()) {
                if let Ok(revision) = u16::try_from(revision) {
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
        let key = AttributeKey {
            endpoint,
            cluster: header.cluster,
            role: cluster_role,
            attribute: record.identifier,
            manufacturer_code: header
                .manufacturer
                .unwrap_or(zcl_data::cluster_library::MANUFACTURER_CODE_NONE),
        };
        if let Some(entry) = ctx.core.reporting.find_mut(&key, ReportingDirection::Receive) {
            entry.last_time = now;
            entry.last_value = Some(record.value.clone());
        }
        ctx.notify(DeviceEvent::ReportReceived {
            source: header.source,
            endpoint,
            cluster: header.cluster,
            attribute: record.identifier,
            value: record.value.clone(),
        });
    }
}
