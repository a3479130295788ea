//! Runtime state shared by the command engines and cluster handlers
//!
//! `ZclCore` owns the buffers, attributes, timers and queues. A `Context`
//! pairs it with the handler table for the duration of one dispatch or one
//! scheduled task, cluster handlers receive the context and use it to write
//! attributes, schedule jobs and send frames.

use std::collections::VecDeque;

use zcl_data::cluster_library::commands::DefaultResponse;
use zcl_data::cluster_library::{
    AttributeValue, ClusterCommand, ClusterLibraryHeader, ClusterLibraryStatus, ClusterRole,
    Command, FrameType, ATTR_CLUSTER_REVISION, ENDPOINT_NONE,
};
use zcl_data::{ExtendedAddress, ProfileIdentifier};

use crate::binding::{BindingDestination, BindingTable};
use crate::buffer::{BufferId, BufferPool, StageContext};
use crate::config::Config;
use crate::event::{DeviceCallback, DeviceEvent};
use crate::handler::{CheckValue, HandlerTable, WriteOrigin};
use crate::header::ParsedHeader;
use crate::persist::PersistentStore;
use crate::reporting::ReportingTable;
use crate::revision::{local_default, PeerCluster, RevisionShape, RevisionTranslator};
use crate::scheduler::{ClusterJob, Scheduler, Task};
use crate::store::{Access, AttributeKey, AttributeStore};
use crate::transition::Generations;
use crate::transport::{
    ApsDataRequest, CallbackRegistry, DestinationAddress, OutgoingFrame, SendCallback,
    TransmitOptions,
};
use crate::Error;

/// Runtime state
pub struct ZclCore {
    pub config: Config,
    pub pool: BufferPool,
    pub store: AttributeStore,
    pub reporting: ReportingTable,
    pub scheduler: Scheduler,
    pub revisions: RevisionTranslator,
    pub generations: Generations,
    pub(crate) tx_queue: VecDeque<OutgoingFrame>,
    pub(crate) callbacks: CallbackRegistry,
    pub(crate) bindings: Box<dyn BindingTable>,
    pub(crate) persistent: Box<dyn PersistentStore>,
    pub(crate) device_callback: Option<DeviceCallback>,
    /// IEEE address of this device
    pub ieee: ExtendedAddress,
    sequence: u8,
    pub(crate) now: u32,
    /// A reply was queued for the frame being dispatched
    pub(crate) replied: bool,
    /// Frames dropped for lack of buffers and report records too large
    /// for a frame
    pub(crate) dropped: u32,
}

impl ZclCore {
    pub fn new(
        config: Config,
        ieee: ExtendedAddress,
        bindings: Box<dyn BindingTable>,
        persistent: Box<dyn PersistentStore>,
    ) -> Self {
        let pool = BufferPool::new(config.buffer_count, config.buffer_size, config.headroom);
        let revisions = RevisionTranslator::new(config.compatibility_mode, config.status_mode);
        Self {
            config,
            pool,
            store: AttributeStore::new(),
            reporting: ReportingTable::new(),
            scheduler: Scheduler::new(),
            revisions,
            generations: Generations::default(),
            tx_queue: VecDeque::new(),
            callbacks: CallbackRegistry::new(),
            bindings,
            persistent,
            device_callback: None,
            ieee,
            sequence: 0,
            now: 0,
            replied: false,
            dropped: 0,
        }
    }

    /// Transaction sequence number for a new request
    pub fn next_sequence(&mut self) -> u8 {
        self.sequence = self.sequence.wrapping_add(1);
        self.sequence
    }

    /// Revision declared by a local cluster
    pub fn local_revision(&self, endpoint: u8, cluster: u16, role: ClusterRole) -> u16 {
        self.store
            .get_integer(endpoint, cluster, role, ATTR_CLUSTER_REVISION)
            .and_then(|r| u16::try_from(r).ok())
            .unwrap_or_else(|| local_default(cluster))
    }

    /// IEEE address behind a destination, when known
    pub fn peer_address(&self, destination: &DestinationAddress) -> Option<ExtendedAddress> {
        match destination {
            DestinationAddress::Extended(address) => Some(*address),
            DestinationAddress::Short(address) => self.revisions.extended_address(*address),
            DestinationAddress::Group(_) => None,
        }
    }

    /// Number of frames and report records dropped
    pub fn dropped(&self) -> u32 {
        self.dropped
    }

    /// Key used to persist an attribute, singletons are shared by all
    /// endpoints
    pub fn persistent_key(key: &AttributeKey, access: Access) -> AttributeKey {
        let mut key = *key;
        if access.contains(Access::SINGLETON) {
            key.endpoint = ENDPOINT_NONE;
        }
        key
    }

    /// Load the persisted values of an endpoint
    pub fn restore_endpoint(&mut self, endpoint: u8) -> usize {
        let mut restored = Vec::new();
        if let Some(descriptor) = self.store.endpoint(endpoint) {
            for cluster in descriptor.clusters.iter() {
                for attribute in cluster.attributes.iter() {
                    if !attribute.access.is_persistent() {
                        continue;
                    }
                    let key = AttributeKey {
                        endpoint,
                        cluster: cluster.cluster,
                        role: cluster.role,
                        attribute: attribute.identifier,
                        manufacturer_code: attribute.manufacturer_code,
                    };
                    let key = Self::persistent_key(&key, attribute.access);
                    if let Some(value) = self.persistent.load_attribute(&key) {
                        if value.data_type() == attribute.data_type {
                            restored.push((attribute.slot, value));
                        } else {
                            log::warn!("Stored value for {} has the wrong type", key);
                        }
                    }
                }
            }
        }
        let count = restored.len();
        for (slot, value) in restored {
            if let Err(error) = self.store.commit(slot, value) {
                log::warn!("Restore failed, {}", error);
            }
        }
        count
    }
}

/// Checked write waiting to be committed
#[derive(Clone, Debug, PartialEq)]
pub enum WritePlan {
    Commit {
        slot: usize,
        key: AttributeKey,
        access: Access,
    },
    /// The cluster accepted the value without storing it
    Ignore,
}

/// Access to the runtime during a dispatch or a scheduled task
pub struct Context<'a> {
    pub core: &'a mut ZclCore,
    pub handlers: &'a HandlerTable,
}

impl<'a> Context<'a> {
    pub fn new(core: &'a mut ZclCore, handlers: &'a HandlerTable) -> Self {
        Self { core, handlers }
    }

    /// Milliseconds since start, wrapping
    pub fn now(&self) -> u32 {
        self.core.now
    }

    pub fn notify(&mut self, event: DeviceEvent) {
        log::debug!("{:08} Event {:?}", self.core.now, event);
        if let Some(callback) = self.core.device_callback.as_mut() {
            callback(&event);
        }
    }

    /// Run `job` of a cluster after `delay` milliseconds
    pub fn schedule_job(
        &mut self,
        endpoint: u8,
        cluster: u16,
        role: ClusterRole,
        delay: u32,
        job: ClusterJob,
    ) {
        let now = self.core.now;
        self.core.scheduler.post_after(
            now,
            delay,
            Task::Cluster {
                endpoint,
                cluster,
                role,
                job,
            },
        );
    }

    /// Remove scheduled jobs of a cluster matching `predicate`
    pub fn cancel_jobs<F>(&mut self, endpoint: u8, cluster: u16, predicate: F) -> usize
    where
        F: Fn(&ClusterJob) -> bool,
    {
        self.core.scheduler.cancel(|t| match t {
            Task::Cluster {
                endpoint: e,
                cluster: c,
                job,
                ..
            } => *e == endpoint && *c == cluster && predicate(job),
            Task::ReportingTick => false,
        })
    }

    pub fn has_attribute(&self, endpoint: u8, cluster: u16, role: ClusterRole, attribute: u16) -> bool {
        self.core
            .store
            .find(endpoint, cluster, role, attribute, None)
            .is_some()
    }

    /// Copy of an attribute value
    pub fn get(&self, endpoint: u8, cluster: u16, role: ClusterRole, attribute: u16) -> Option<AttributeValue> {
        self.core
            .store
            .get(endpoint, cluster, role, attribute, None)
            .cloned()
    }

    pub fn get_integer(&self, endpoint: u8, cluster: u16, role: ClusterRole, attribute: u16) -> Option<i128> {
        self.core.store.get_integer(endpoint, cluster, role, attribute)
    }

    /// Local write of an attribute
    pub fn set(
        &mut self,
        endpoint: u8,
        cluster: u16,
        role: ClusterRole,
        attribute: u16,
        value: AttributeValue,
    ) -> Result<(), ClusterLibraryStatus> {
        self.write_attribute(endpoint, cluster, role, attribute, None, value, WriteOrigin::Local)
    }

    /// Local write of an integer, converted to the type of the attribute
    pub fn set_integer(
        &mut self,
        endpoint: u8,
        cluster: u16,
        role: ClusterRole,
        attribute: u16,
        value: i128,
    ) -> Result<(), ClusterLibraryStatus> {
        let data_type = self
            .core
            .store
            .find(endpoint, cluster, role, attribute, None)
            .map(|d| d.data_type)
            .ok_or(ClusterLibraryStatus::UnsupportedAttribute)?;
        let value =
            AttributeValue::from_integer(data_type, value).ok_or(ClusterLibraryStatus::InvalidValue)?;
        self.set(endpoint, cluster, role, attribute, value)
    }

    /// Write an attribute through the access, type and cluster checks
    #[allow(clippy::too_many_arguments)]
    pub fn write_attribute(
        &mut self,
        endpoint: u8,
        cluster: u16,
        role: ClusterRole,
        attribute: u16,
        manufacturer: Option<u16>,
        value: AttributeValue,
        origin: WriteOrigin,
    ) -> Result<(), ClusterLibraryStatus> {
        let plan = self.validate_write(endpoint, cluster, role, attribute, manufacturer, &value, &origin)?;
        self.commit_write(plan, value, &origin)
    }

    /// Run the checks of a write without changing anything
    #[allow(clippy::too_many_arguments)]
    pub fn validate_write(
        &self,
        endpoint: u8,
        cluster: u16,
        role: ClusterRole,
        attribute: u16,
        manufacturer: Option<u16>,
        value: &AttributeValue,
        origin: &WriteOrigin,
    ) -> Result<WritePlan, ClusterLibraryStatus> {
        let cluster_descriptor = self
            .core
            .store
            .cluster(endpoint, cluster, role)
            .ok_or(ClusterLibraryStatus::UnsupportedAttribute)?;
        let descriptor = cluster_descriptor
            .attribute(attribute, manufacturer)
            .ok_or(ClusterLibraryStatus::UnsupportedAttribute)?;
        let handlers = self.handlers;
        let handler = handlers.find(cluster, cluster_descriptor.role);

        if origin.is_remote() {
            if descriptor.is_internal() {
                return Err(ClusterLibraryStatus::UnsupportedAttribute);
            }
            let writable = if descriptor.access.contains(Access::WRITE_OPTIONAL) {
                handler
                    .and_then(|h| h.is_writable(self, endpoint, attribute))
                    .unwrap_or_else(|| descriptor.access.contains(Access::WRITE))
            } else {
                descriptor.access.contains(Access::WRITE)
            };
            if !writable {
                return Err(ClusterLibraryStatus::ReadOnly);
            }
        }
        if value.data_type() != descriptor.data_type {
            return Err(ClusterLibraryStatus::InvalidDataType);
        }
        if let (Some(max), Some(length)) = (descriptor.max_length, string_length(value)) {
            if length > max {
                return Err(ClusterLibraryStatus::InvalidValue);
            }
        }
        if let AttributeValue::Boolean(b) = value {
            if *b > 1 {
                return Err(ClusterLibraryStatus::InvalidValue);
            }
        }
        if attribute == ATTR_CLUSTER_REVISION && value.as_integer() == Some(0) {
            return Err(ClusterLibraryStatus::InvalidValue);
        }
        let verdict = handler
            .map(|h| h.check_value(self, endpoint, attribute, value))
            .unwrap_or(CheckValue::Ok);
        match verdict {
            CheckValue::Ok => Ok(WritePlan::Commit {
                slot: descriptor.slot,
                key: AttributeKey {
                    endpoint,
                    cluster,
                    role: cluster_descriptor.role,
                    attribute,
                    manufacturer_code: descriptor.manufacturer_code,
                },
                access: descriptor.access,
            }),
            CheckValue::OutOfRange | CheckValue::Error => Err(ClusterLibraryStatus::InvalidValue),
            CheckValue::Ignore => Ok(WritePlan::Ignore),
        }
    }

    /// Store a checked value and run the side effects of the write
    pub fn commit_write(
        &mut self,
        plan: WritePlan,
        value: AttributeValue,
        origin: &WriteOrigin,
    ) -> Result<(), ClusterLibraryStatus> {
        let (slot, key, access) = match plan {
            WritePlan::Commit { slot, key, access } => (slot, key, access),
            WritePlan::Ignore => return Ok(()),
        };
        self.core
            .store
            .commit(slot, value.clone())
            .map_err(|_| ClusterLibraryStatus::Failure)?;
        log::trace!("{:08} Set {} {}", self.core.now, key, value);
        if access.is_persistent() {
            let stored = ZclCore::persistent_key(&key, access);
            self.core.persistent.save_attribute(&stored, &value);
        }
        self.notify(DeviceEvent::SetAttributeValue {
            endpoint: key.endpoint,
            cluster: key.cluster,
            attribute: key.attribute,
            value: value.clone(),
        });
        if self.core.reporting.has_send_entry(&key) {
            self.ensure_reporting_tick();
        }
        let handlers = self.handlers;
        if let Some(handler) = handlers.find(key.cluster, key.role) {
            handler.write_hook(self, key.endpoint, key.attribute, &value, key.manufacturer(), origin);
        }
        Ok(())
    }

    /// Make sure the reporting engine runs
    pub fn ensure_reporting_tick(&mut self) {
        let pending = self
            .core
            .scheduler
            .contains(|t| matches!(t, Task::ReportingTick));
        if !pending {
            let now = self.core.now;
            let tick = self.core.config.reporting_tick_ms;
            self.core.scheduler.post_after(now, tick, Task::ReportingTick);
        }
    }

    /// Bound destinations of a local cluster
    pub fn destinations(&self, endpoint: u8, cluster: u16) -> Vec<BindingDestination> {
        self.core.bindings.destinations(endpoint, cluster)
    }

    fn endpoint_profile(&self, endpoint: u8) -> u16 {
        self.core
            .store
            .endpoint(endpoint)
            .map(|e| e.profile)
            .unwrap_or_else(|| u16::from(ProfileIdentifier::HomeAutomation))
    }

    /// Largest ZCL frame for a request
    pub fn frame_limit(&self, request: &ApsDataRequest) -> usize {
        let config = &self.core.config;
        let fragmented = if request.options.contains(TransmitOptions::FRAGMENTATION)
            || config.fragmentation_allowed(request.profile, request.cluster)
        {
            Some(config.fragmentation.max_payload)
        } else {
            None
        };
        request
            .max_payload(fragmented)
            .min(config.buffer_size.saturating_sub(config.headroom))
    }

    /// Room for the payload of a frame with a header of `header_size` bytes
    pub fn payload_capacity(&self, request: &ApsDataRequest, header_size: usize) -> usize {
        self.frame_limit(request).saturating_sub(header_size)
    }

    /// Build a frame in a pool buffer and queue it for transmission
    pub fn send_frame<F>(
        &mut self,
        request: ApsDataRequest,
        header: &ClusterLibraryHeader,
        payload: F,
        callback: Option<SendCallback>,
    ) -> Result<BufferId, Error>
    where
        F: FnOnce(&mut [u8]) -> Result<usize, zcl_data::Error>,
    {
        let buffer = match self.core.pool.acquire() {
            Ok(buffer) => buffer,
            Err(error) => {
                log::error!(
                    "No buffer for {:02x} to {}, dropped",
                    header.command,
                    request.destination
                );
                self.core.dropped = self.core.dropped.wrapping_add(1);
                return Err(error);
            }
        };
        if let Err(error) = self.fill_frame(buffer, &request, header, payload) {
            log::warn!("Failed to build {:02x} to {}, {}", header.command, request.destination, error);
            let _ = self.core.pool.release(buffer);
            return Err(error);
        }
        if let Some(callback) = callback {
            self.core.callbacks.register(buffer, callback);
        }
        log::info!(
            "< {} {} {:04x} {:?} tsn {} cmd {:02x}",
            request.destination,
            request.destination_endpoint,
            request.cluster,
            header.control.frame_type,
            header.transaction_sequence,
            header.command
        );
        self.core.tx_queue.push_back(OutgoingFrame { buffer, request });
        Ok(buffer)
    }

    fn fill_frame<F>(
        &mut self,
        buffer: BufferId,
        request: &ApsDataRequest,
        header: &ClusterLibraryHeader,
        payload: F,
    ) -> Result<(), Error>
    where
        F: FnOnce(&mut [u8]) -> Result<usize, zcl_data::Error>,
    {
        let limit = self.frame_limit(request);
        let headroom = self.core.config.headroom;
        let pool = &mut self.core.pool;
        pool.reserve_headroom(buffer, headroom)?;
        let used = pool.append_with(buffer, limit, |data| {
            zcl_data::pack::Pack::pack(header, data)
        })?;
        pool.append_with(buffer, limit - used, payload)?;
        pool.set_context(buffer, StageContext::Outgoing(request.clone()))?;
        Ok(())
    }

    /// APS request from a local endpoint to a destination
    pub fn request_for(&self, endpoint: u8, destination: BindingDestination, cluster: u16) -> ApsDataRequest {
        let options = if destination.address.is_group() || destination.address.is_broadcast() {
            TransmitOptions::empty()
        } else {
            TransmitOptions::ACKNOWLEDGED
        };
        ApsDataRequest {
            destination: destination.address,
            destination_endpoint: destination.endpoint,
            source_endpoint: endpoint,
            profile: self.endpoint_profile(endpoint),
            cluster,
            options,
        }
    }

    /// Send a general command from the `role` side of a local cluster,
    /// returns the sequence number used
    #[allow(clippy::too_many_arguments)]
    pub fn send_general(
        &mut self,
        endpoint: u8,
        destination: BindingDestination,
        cluster: u16,
        role: ClusterRole,
        manufacturer: Option<u16>,
        command: &Command,
        callback: Option<SendCallback>,
    ) -> Result<u8, Error> {
        let request = self.request_for(endpoint, destination, cluster);
        let sequence = self.core.next_sequence();
        let identifier = command.identifier();
        let mut header = ClusterLibraryHeader::new(
            FrameType::Global,
            role.sending_direction(),
            manufacturer,
            sequence,
            u8::from(identifier),
        );
        header.control.disable_default_response = identifier.is_response()
            || matches!(command, Command::ReportAttributes(_));
        self.send_frame(request, &header, |data| command.pack(data).map(|(used, _)| used), callback)?;
        Ok(sequence)
    }

    /// Send a cluster specific command from the `role` side of a local
    /// cluster, shaped for the revision of the peer
    #[allow(clippy::too_many_arguments)]
    pub fn send_cluster_command<C>(
        &mut self,
        endpoint: u8,
        destination: BindingDestination,
        cluster: u16,
        role: ClusterRole,
        manufacturer: Option<u16>,
        command: C,
        callback: Option<SendCallback>,
    ) -> Result<u8, Error>
    where
        C: ClusterCommand + RevisionShape,
    {
        let local = self.core.local_revision(endpoint, cluster, role);
        let peer = self
            .core
            .peer_address(&destination.address)
            .map(|address| PeerCluster {
                address,
                cluster,
                role: role.opposite(),
                endpoint: destination.endpoint,
            });
        let command = self.core.revisions.shape(command, local, peer.as_ref());
        let request = self.request_for(endpoint, destination, cluster);
        let sequence = self.core.next_sequence();
        let header = ClusterLibraryHeader::new(
            FrameType::Local,
            role.sending_direction(),
            manufacturer,
            sequence,
            command.identifier(),
        );
        self.send_frame(request, &header, |data| command.pack(data), callback)?;
        Ok(sequence)
    }

    /// Reply to a received frame with a general command
    pub fn reply_general(&mut self, header: &ParsedHeader, endpoint: u8, command: &Command) -> Result<(), Error> {
        let request = header.reply_request(endpoint).ok_or(Error::NoRoute)?;
        let reply = header.reply_header(FrameType::Global, u8::from(command.identifier()));
        self.send_frame(request, &reply, |data| command.pack(data).map(|(used, _)| used), None)?;
        self.core.replied = true;
        Ok(())
    }

    /// Reply to a received frame with a cluster specific command
    pub fn reply_cluster<C: ClusterCommand>(
        &mut self,
        header: &ParsedHeader,
        endpoint: u8,
        command: &C,
    ) -> Result<(), Error> {
        let request = header.reply_request(endpoint).ok_or(Error::NoRoute)?;
        let reply = header.reply_header(FrameType::Local, command.identifier());
        self.send_frame(request, &reply, |data| command.pack(data), None)?;
        self.core.replied = true;
        Ok(())
    }

    /// Default response to a received frame, the status is translated for
    /// the configured status mode
    pub fn send_default_response(
        &mut self,
        header: &ParsedHeader,
        endpoint: u8,
        status: ClusterLibraryStatus,
    ) -> Result<(), Error> {
        let status = self.core.revisions.translate_status(status);
        let response = Command::DefaultResponse(DefaultResponse::new(header.command, status));
        self.reply_general(header, endpoint, &response)
    }
}

fn string_length(value: &AttributeValue) -> Option<usize> {
    match value {
        AttributeValue::OctetString(Some(v)) | AttributeValue::LongOctetString(Some(v)) => Some(v.len()),
        AttributeValue::CharacterString(Some(s)) | AttributeValue::LongCharacterString(Some(s)) => {
            Some(s.len())
        }
        _ => None,
    }
}
