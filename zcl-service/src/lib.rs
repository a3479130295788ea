//! # ZCL Service
//!
//! Zigbee Cluster Library endpoint runtime. Frames received from the APS
//! layer are parsed and dispatched to the general command engine or to the
//! cluster handlers, attribute reporting and time based state machines run
//! from a cooperative scheduler, and the frames to send are queued for the
//! application to hand to the APS layer.

pub mod binding;
pub mod buffer;
pub mod clusters;
pub mod config;
pub mod core;
pub mod dispatcher;
mod error;
pub mod event;
pub mod general;
pub mod handler;
pub mod header;
pub mod persist;
pub mod reporting;
pub mod revision;
pub mod scheduler;
pub mod store;
pub mod transition;
pub mod transport;

pub use error::Error;

use zcl_data::cluster_library::commands::{
    AttributeRecord, ConfigureReporting, ReadAttributes, ReportingConfiguration, WriteAttributes,
};
use zcl_data::cluster_library::{
    AttributeIdentifier, AttributeValue, ClusterCommand, ClusterLibraryStatus, ClusterRole, Command,
};
use zcl_data::ExtendedAddress;

use crate::binding::{BindingDestination, BindingTable};
use crate::buffer::{BufferId, BufferPool, StageContext};
use crate::config::Config;
use crate::core::{Context, ZclCore};
use crate::event::DeviceCallback;
use crate::handler::{ClusterHandler, HandlerTable, WriteOrigin};
use crate::persist::PersistentStore;
use crate::revision::{local_default, PeerRevisionLookup, RevisionShape};
use crate::scheduler::Task;
use crate::store::EndpointDefinition;
use crate::transport::{ApsDataIndication, ConfirmStatus, OutgoingFrame, SendCallback};

/// The endpoint runtime
pub struct ZclService {
    core: ZclCore,
    handlers: HandlerTable,
}

impl ZclService {
    /// Runtime for the device `ieee`, without any cluster handler
    pub fn new(
        config: Config,
        ieee: ExtendedAddress,
        bindings: Box<dyn BindingTable>,
        persistent: Box<dyn PersistentStore>,
    ) -> Result<Self, Error> {
        config.validate()?;
        Ok(Self {
            core: ZclCore::new(config, ieee, bindings, persistent),
            handlers: HandlerTable::new(),
        })
    }

    /// Add a cluster handler
    pub fn register_handler(&mut self, handler: Box<dyn ClusterHandler>) -> Result<(), Error> {
        self.handlers.register(handler)
    }

    /// Add the handlers of the built-in clusters
    pub fn register_default_handlers(&mut self) -> Result<(), Error> {
        for handler in clusters::default_handlers() {
            self.handlers.register(handler)?;
        }
        Ok(())
    }

    /// Add an endpoint, load its persisted values and reporting
    /// configuration and initialise its clusters
    pub fn register_endpoint(&mut self, definition: EndpointDefinition) -> Result<(), Error> {
        let endpoint = definition.endpoint;
        let config = &self.core.config;
        self.core.store.add_endpoint(definition, |cluster, role| {
            config
                .revision_override(cluster, role)
                .unwrap_or_else(|| local_default(cluster))
        })?;
        let restored = self.core.restore_endpoint(endpoint);
        let clusters: Vec<(u16, ClusterRole)> = self
            .core
            .store
            .endpoint(endpoint)
            .map(|e| e.clusters.iter().map(|c| (c.cluster, c.role)).collect())
            .unwrap_or_default();
        let mut ctx = Context::new(&mut self.core, &self.handlers);
        let reports = reporting::restore(&mut ctx, endpoint);
        for (cluster, role) in clusters {
            if let Some(handler) = self.handlers.find(cluster, role) {
                handler.init(&mut ctx, endpoint);
            }
        }
        log::info!(
            "Endpoint {} registered, {} values and {} reports restored",
            endpoint,
            restored,
            reports
        );
        Ok(())
    }

    /// Access the runtime the way a cluster handler does
    pub fn context(&mut self) -> Context<'_> {
        Context::new(&mut self.core, &self.handlers)
    }

    pub fn core(&self) -> &ZclCore {
        &self.core
    }

    pub fn pool(&mut self) -> &mut BufferPool {
        &mut self.core.pool
    }

    pub fn set_device_callback(&mut self, callback: DeviceCallback) {
        self.core.device_callback = Some(callback);
    }

    /// Install a lookup of peer cluster revisions, selects the compatibility
    /// mode
    pub fn set_peer_revision_lookup(&mut self, lookup: PeerRevisionLookup) {
        self.core.revisions.set_lookup(lookup);
    }

    /// Process a frame received from the APS layer
    pub fn receive(&mut self, indication: ApsDataIndication, payload: &[u8]) -> Result<(), Error> {
        let pool = &mut self.core.pool;
        let buffer = match pool.acquire() {
            Ok(buffer) => buffer,
            Err(error) => {
                log::error!("No buffer for frame from {}, dropped", indication.source);
                self.core.dropped = self.core.dropped.wrapping_add(1);
                return Err(error);
            }
        };
        let filled = pool
            .append(buffer, payload)
            .and_then(|_| pool.set_context(buffer, StageContext::Indication(indication)));
        if let Err(error) = filled {
            log::warn!("Frame of {} bytes does not fit, {}", payload.len(), error);
            let _ = pool.release(buffer);
            return Err(error);
        }
        self.receive_buffer(buffer)
    }

    /// Process a received frame already held by a pool buffer with an
    /// indication context, the buffer is released
    pub fn receive_buffer(&mut self, buffer: BufferId) -> Result<(), Error> {
        let mut ctx = Context::new(&mut self.core, &self.handlers);
        dispatcher::receive_buffer(&mut ctx, buffer)
    }

    /// Run the tasks due at `now`, returns the milliseconds until the next
    /// task, `None` when idle
    pub fn poll(&mut self, now: u32) -> Option<u32> {
        self.core.now = now;
        while let Some(task) = self.core.scheduler.next_ready(now) {
            let mut ctx = Context::new(&mut self.core, &self.handlers);
            match task {
                Task::ReportingTick => reporting::tick(&mut ctx),
                Task::Cluster {
                    endpoint,
                    cluster,
                    role,
                    job,
                } => match self.handlers.find(cluster, role) {
                    Some(handler) => handler.run_job(&mut ctx, endpoint, job),
                    None => log::warn!("No handler for job {:?} of {:04x}", job, cluster),
                },
            }
        }
        self.core.scheduler.next_timeout(now)
    }

    /// Next frame to hand to the APS layer
    pub fn poll_transmit(&mut self) -> Option<OutgoingFrame> {
        self.core.tx_queue.pop_front()
    }

    /// ZCL frame held by an outgoing buffer
    pub fn frame_data(&self, buffer: BufferId) -> Result<&[u8], Error> {
        self.core.pool.data(buffer)
    }

    /// Transmission of a buffer finished, runs its callback and releases it
    pub fn confirm(&mut self, buffer: BufferId, status: ConfirmStatus) -> Result<(), Error> {
        if status != ConfirmStatus::Success {
            log::warn!("Transmission of {} failed, {:?}", buffer, status);
        }
        if let Some(callback) = self.core.callbacks.take(buffer) {
            callback(status);
        }
        self.core.pool.release(buffer)
    }

    /// Number of frames and report records dropped
    pub fn dropped(&self) -> u32 {
        self.core.dropped()
    }

    pub fn get_attribute(
        &self,
        endpoint: u8,
        cluster: u16,
        role: ClusterRole,
        attribute: u16,
    ) -> Option<AttributeValue> {
        self.core
            .store
            .get(endpoint, cluster, role, attribute, None)
            .cloned()
    }

    /// Local write of an attribute, with the checks and side effects of a
    /// write from a peer except for the access rights
    pub fn set_attribute(
        &mut self,
        endpoint: u8,
        cluster: u16,
        role: ClusterRole,
        attribute: u16,
        value: AttributeValue,
    ) -> Result<(), ClusterLibraryStatus> {
        self.context()
            .write_attribute(endpoint, cluster, role, attribute, None, value, WriteOrigin::Local)
    }

    /// Report an attribute to the bound destinations with the default
    /// intervals
    pub fn start_reporting(
        &mut self,
        endpoint: u8,
        cluster: u16,
        role: ClusterRole,
        attribute: u16,
    ) -> Result<(), Error> {
        reporting::start_reporting(&mut self.context(), endpoint, cluster, role, attribute, None)
    }

    pub fn stop_reporting(
        &mut self,
        endpoint: u8,
        cluster: u16,
        role: ClusterRole,
        attribute: u16,
    ) -> Result<(), Error> {
        reporting::stop_reporting(&mut self.context(), endpoint, cluster, role, attribute, None)
    }

    /// Read attributes of a peer from the `role` side of a local cluster,
    /// returns the sequence number used
    pub fn send_read_attributes(
        &mut self,
        endpoint: u8,
        destination: BindingDestination,
        cluster: u16,
        role: ClusterRole,
        attributes: Vec<AttributeIdentifier>,
        callback: Option<SendCallback>,
    ) -> Result<u8, Error> {
        let command = Command::ReadAttributes(ReadAttributes { attributes });
        self.context()
            .send_general(endpoint, destination, cluster, role, None, &command, callback)
    }

    /// Write attributes of a peer
    pub fn send_write_attributes(
        &mut self,
        endpoint: u8,
        destination: BindingDestination,
        cluster: u16,
        role: ClusterRole,
        attributes: Vec<AttributeRecord>,
        callback: Option<SendCallback>,
    ) -> Result<u8, Error> {
        let command = Command::WriteAttributes(WriteAttributes { attributes });
        self.context()
            .send_general(endpoint, destination, cluster, role, None, &command, callback)
    }

    /// Configure the reporting of a peer
    pub fn send_configure_reporting(
        &mut self,
        endpoint: u8,
        destination: BindingDestination,
        cluster: u16,
        role: ClusterRole,
        records: Vec<ReportingConfiguration>,
        callback: Option<SendCallback>,
    ) -> Result<u8, Error> {
        let command = Command::ConfigureReporting(ConfigureReporting { records });
        self.context()
            .send_general(endpoint, destination, cluster, role, None, &command, callback)
    }

    /// Send a cluster specific command, shaped for the revision of the peer
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
        self.context().send_cluster_command(
            endpoint,
            destination,
            cluster,
            role,
            manufacturer,
            command,
            callback,
        )
    }
}
