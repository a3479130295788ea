//! Cluster revision and status compatibility
//!
//! Picks the payload shape of outgoing commands from the local or the peer
//! cluster revision, and maps status codes merged by ZCL 8 when talking the
//! ZCL 8 status set.

use std::collections::HashMap;

use zcl_data::cluster_library::{
    basic, color_control, ias_zone, identify, level_control, on_off, time, ClusterLibraryStatus,
    ClusterRole, CommandOptions, CLUSTER_REVISION_DEFAULT, CLUSTER_REVISION_MIN, UNKNOWN_REVISION,
};
use zcl_data::{ExtendedAddress, ShortAddress};

use crate::config::{CompatibilityMode, StatusMode};

/// Number of short to IEEE address mappings kept
pub const ADDRESS_SLOTS: usize = 32;

/// Application lookup of the revision a peer implements
pub type PeerRevisionLookup = Box<dyn Fn(ExtendedAddress, u16, ClusterRole, u8) -> Option<u16>>;

/// Compiled in revision of the clusters implemented here
pub fn local_default(cluster: u16) -> u16 {
    match cluster {
        basic::CLUSTER => basic::CLUSTER_REVISION,
        identify::CLUSTER => identify::CLUSTER_REVISION,
        on_off::CLUSTER => on_off::CLUSTER_REVISION,
        level_control::CLUSTER => level_control::CLUSTER_REVISION,
        color_control::CLUSTER => color_control::CLUSTER_REVISION,
        ias_zone::CLUSTER => ias_zone::CLUSTER_REVISION,
        time::CLUSTER => time::CLUSTER_REVISION,
        _ => CLUSTER_REVISION_DEFAULT,
    }
}

/// Status as sent in the ZCL 8 status set
pub fn collapse_status(status: ClusterLibraryStatus) -> ClusterLibraryStatus {
    use ClusterLibraryStatus::*;
    match status {
        WriteOnly | ActionDenied => NotAuthorised,
        InconsistentStartupState | DefinedOutOfBand | HardwareFailure | SoftwareFailure => Failure,
        LimitReached | DuplicateExists => Success,
        MalformedCommand
        | UnsupportedGeneralCommand
        | UnsupportedManufacturerClusterCommand
        | UnsupportedManufacturerGeneralCommand => UnsupportedClusterCommand,
        other => other,
    }
}

/// Peer side of an outgoing command
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct PeerCluster {
    pub address: ExtendedAddress,
    pub cluster: u16,
    /// Role of the cluster at the peer
    pub role: ClusterRole,
    pub endpoint: u8,
}

/// Payloads that changed shape between cluster revisions
pub trait RevisionShape: Sized {
    /// The payload as sent to a peer using `revision`
    fn for_revision(self, _revision: u16) -> Self {
        self
    }
}

impl RevisionShape for level_control::LevelControlCommand {
    fn for_revision(self, revision: u16) -> Self {
        if revision < level_control::OPTIONS_REVISION {
            self.without_options()
        } else {
            self
        }
    }
}

impl RevisionShape for color_control::ColorControlCommand {
    fn for_revision(self, revision: u16) -> Self {
        if revision < color_control::OPTIONS_REVISION {
            self.with_options(None)
        } else if self.options().is_none() {
            self.with_options(Some(CommandOptions::default()))
        } else {
            self
        }
    }
}

impl RevisionShape for basic::BasicCommand {}
impl RevisionShape for identify::IdentifyCommand {}
impl RevisionShape for identify::IdentifyResponse {}
impl RevisionShape for on_off::OnOffCommand {}
impl RevisionShape for ias_zone::IasZoneCommand {}
impl RevisionShape for ias_zone::IasZoneClientCommand {}

/// Revision and status translation state
pub struct RevisionTranslator {
    mode: CompatibilityMode,
    status_mode: StatusMode,
    lookup: Option<PeerRevisionLookup>,
    learned: HashMap<PeerCluster, u16>,
    /// Least recently learned first
    addresses: heapless::Vec<(ShortAddress, ExtendedAddress), ADDRESS_SLOTS>,
}

impl RevisionTranslator {
    pub fn new(mode: CompatibilityMode, status_mode: StatusMode) -> Self {
        Self {
            mode,
            status_mode,
            lookup: None,
            learned: HashMap::new(),
            addresses: heapless::Vec::new(),
        }
    }

    pub fn mode(&self) -> CompatibilityMode {
        self.mode
    }

    pub fn set_mode(&mut self, mode: CompatibilityMode) {
        self.mode = mode;
    }

    pub fn status_mode(&self) -> StatusMode {
        self.status_mode
    }

    pub fn set_status_mode(&mut self, mode: StatusMode) {
        self.status_mode = mode;
    }

    /// Install the peer lookup, selects compatibility mode
    pub fn set_lookup(&mut self, lookup: PeerRevisionLookup) {
        self.lookup = Some(lookup);
        self.mode = CompatibilityMode::Compatibility;
    }

    /// Remember the IEEE address behind a short address, the least recently
    /// learned mapping is forgotten when the table is full
    pub fn learn_address(&mut self, short: ShortAddress, extended: ExtendedAddress) {
        if !extended.is_valid() {
            return;
        }
        if let Some(index) = self.addresses.iter().position(|(s, _)| *s == short) {
            self.addresses.remove(index);
        }
        if self.addresses.is_full() {
            let (forgotten, _) = self.addresses.remove(0);
            log::trace!("Address {} forgotten", forgotten);
        }
        if self.addresses.push((short, extended)).is_err() {
            log::warn!("Address {} not remembered", short);
        }
    }

    pub fn extended_address(&self, short: ShortAddress) -> Option<ExtendedAddress> {
        self.addresses
            .iter()
            .find(|(s, _)| *s == short)
            .map(|(_, e)| *e)
    }

    /// Remember a revision advertised by a peer
    pub fn learn(&mut self, peer: PeerCluster, revision: u16) {
        if revision == UNKNOWN_REVISION || revision < CLUSTER_REVISION_MIN {
            return;
        }
        if self.learned.insert(peer, revision) != Some(revision) {
            log::debug!(
                "Peer {} cluster {:04x} endpoint {} revision {}",
                peer.address,
                peer.cluster,
                peer.endpoint,
                revision
            );
        }
    }

    /// Revision of a peer cluster, the lookup takes precedence over learned
    /// revisions
    pub fn peer_revision(&self, peer: &PeerCluster) -> Option<u16> {
        self.lookup
            .as_ref()
            .and_then(|lookup| lookup(peer.address, peer.cluster, peer.role, peer.endpoint))
            .filter(|r| *r != UNKNOWN_REVISION)
            .or_else(|| self.learned.get(peer).copied())
    }

    /// Revision used for the shape of an outgoing command, `None` keeps the
    /// shape chosen by the caller
    pub fn outgoing_revision(&self, local: u16, peer: Option<&PeerCluster>) -> Option<u16> {
        match self.mode {
            CompatibilityMode::Legacy => None,
            CompatibilityMode::Auto => Some(local),
            CompatibilityMode::Compatibility => {
                let peer = peer.and_then(|p| self.peer_revision(p));
                Some(match peer {
                    Some(revision) => revision.min(local),
                    None => CLUSTER_REVISION_MIN,
                })
            }
        }
    }

    /// Shape a command for the peer
    pub fn shape<C: RevisionShape>(&self, command: C, local: u16, peer: Option<&PeerCluster>) -> C {
        match self.outgoing_revision(local, peer) {
            Some(revision) => command.for_revision(revision),
            None => command,
        }
    }

    /// Status as put on the wire
    pub fn translate_status(&self, status: ClusterLibraryStatus) -> ClusterLibraryStatus {
        match self.status_mode {
            StatusMode::PreZcl8 => status,
            StatusMode::Zcl8 => collapse_status(status),
        }
    }

    /// Status code as put on the wire, unknown codes pass through
    pub fn translate_raw(&self, status: u8) -> u8 {
        match ClusterLibraryStatus::try_from(status) {
            Ok(status) => u8::from(self.translate_status(status)),
            Err(_) => status,
        }
    }
}
