//! Cluster handler table
//!
//! Cluster specific behaviour is attached to a (cluster, role) pair through
//! the `ClusterHandler` trait. Every hook has a default so a handler only
//! implements the capabilities of its cluster.

use zcl_data::cluster_library::{AttributeValue, ClusterLibraryStatus, ClusterRole};
use zcl_data::Address;

use crate::core::Context;
use crate::header::ParsedHeader;
use crate::scheduler::ClusterJob;
use crate::Error;

/// Verdict of a value check
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum CheckValue {
    /// Write the value
    Ok,
    /// Reject with invalid value
    OutOfRange,
    /// Reject with invalid value
    Error,
    /// Report success without writing
    Ignore,
}

/// Result of a cluster specific command
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum CommandOutcome {
    /// Processed, a default response reports success unless a reply was sent
    Handled,
    /// Processed with an error status
    HandledErr(ClusterLibraryStatus),
    /// Processed, no response of any kind
    HandledSilently,
    /// The command is not known to the handler
    NotHandled,
}

impl From<Result<(), ClusterLibraryStatus>> for CommandOutcome {
    fn from(result: Result<(), ClusterLibraryStatus>) -> Self {
        match result {
            Ok(()) => CommandOutcome::Handled,
            Err(status) => CommandOutcome::HandledErr(status),
        }
    }
}

/// Where a write came from
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum WriteOrigin {
    /// Write Attributes from a peer
    Remote { source: Address, endpoint: u8 },
    /// Write by the application or a cluster handler
    Local,
}

impl WriteOrigin {
    pub fn is_remote(&self) -> bool {
        matches!(self, WriteOrigin::Remote { .. })
    }
}

/// Behaviour of one side of a cluster
pub trait ClusterHandler {
    fn cluster(&self) -> u16;

    fn role(&self) -> ClusterRole;

    /// Called once for every endpoint hosting the cluster
    fn init(&self, _ctx: &mut Context, _endpoint: u8) {}

    /// Validate a value before it is written
    fn check_value(
        &self,
        _ctx: &Context,
        _endpoint: u8,
        _attribute: u16,
        _value: &AttributeValue,
    ) -> CheckValue {
        CheckValue::Ok
    }

    /// Called after a value was written
    fn write_hook(
        &self,
        _ctx: &mut Context,
        _endpoint: u8,
        _attribute: u16,
        _value: &AttributeValue,
        _manufacturer: Option<u16>,
        _origin: &WriteOrigin,
    ) {
    }

    /// Writability of a write optional attribute, computed from cluster state
    fn is_writable(&self, _ctx: &Context, _endpoint: u8, _attribute: u16) -> Option<bool> {
        None
    }

    /// Process a cluster specific command addressed to `endpoint`, `payload`
    /// follows the header
    fn handle_command(
        &self,
        _ctx: &mut Context,
        _endpoint: u8,
        _header: &ParsedHeader,
        _payload: &[u8],
    ) -> CommandOutcome {
        CommandOutcome::NotHandled
    }

    /// Identifiers of the commands the cluster side accepts
    fn received_commands(&self) -> &'static [u8] {
        &[]
    }

    /// Identifiers of the commands the cluster side sends
    fn generated_commands(&self) -> &'static [u8] {
        &[]
    }

    /// Manufacturer specific command discovery, `None` falls back to the
    /// standard lists
    fn discover_manufacturer_commands(&self, _manufacturer: u16, _generated: bool) -> Option<Vec<u8>> {
        None
    }

    /// Run a scheduled job
    fn run_job(&self, _ctx: &mut Context, _endpoint: u8, _job: ClusterJob) {}
}

/// Registered cluster handlers
#[derive(Default)]
pub struct HandlerTable {
    handlers: Vec<Box<dyn ClusterHandler>>,
}

impl HandlerTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a handler, one per cluster and role
    pub fn register(&mut self, handler: Box<dyn ClusterHandler>) -> Result<(), Error> {
        let cluster = handler.cluster();
        let role = handler.role();
        let exists = self
            .handlers
            .iter()
            .any(|h| h.cluster() == cluster && h.role().matches(role));
        if exists {
            log::warn!("Handler for {:04x} {:?} already registered", cluster, role);
            return Err(Error::AlreadyExists);
        }
        self.handlers.push(handler);
        Ok(())
    }

    /// Handler for the cluster side
    pub fn find(&self, cluster: u16, role: ClusterRole) -> Option<&dyn ClusterHandler> {
        self.handlers
            .iter()
            .find(|h| h.cluster() == cluster && h.role().matches(role))
            .map(|h| h.as_ref())
    }

    pub fn len(&self) -> usize {
        self.handlers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.handlers.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct Plain(u16, ClusterRole);

    impl ClusterHandler for Plain {
        fn cluster(&self) -> u16 {
            self.0
        }
        fn role(&self) -> ClusterRole {
            self.1
        }
    }

    #[test]
    fn register_once() {
        let mut table = HandlerTable::new();
        table.register(Box::new(Plain(0x0006, ClusterRole::Server))).unwrap();
        table.register(Box::new(Plain(0x0006, ClusterRole::Client))).unwrap();
        assert_eq!(
            table.register(Box::new(Plain(0x0006, ClusterRole::Server))),
            Err(Error::AlreadyExists)
        );
        assert_eq!(table.len(), 2);
        assert_eq!(table.find(0x0006, ClusterRole::Client).map(|h| h.role()), Some(ClusterRole::Client));
        assert!(table.find(0x0008, ClusterRole::Server).is_none());
    }

    #[test]
    fn outcome_from_result() {
        assert_eq!(CommandOutcome::from(Ok(())), CommandOutcome::Handled);
        assert_eq!(
            CommandOutcome::from(Err(ClusterLibraryStatus::InvalidField)),
            CommandOutcome::HandledErr(ClusterLibraryStatus::InvalidField)
        );
    }
}
