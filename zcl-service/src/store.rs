//! Attribute store
//!
//! Endpoints own ordered cluster lists, clusters own ordered attribute
//! descriptors. Values live in an arena indexed by the descriptor slot, an
//! attribute marked singleton shares one slot across all endpoints.
//! Declaration order is kept, it is the order used by discovery.

use std::collections::HashMap;

use zcl_data::cluster_library::{
    AttributeDataType, AttributeValue, ClusterLibraryStatus, ClusterRole, ATTR_CLUSTER_REVISION,
    CLUSTER_REVISION_MIN, ENDPOINT_BROADCAST, ENDPOINT_NONE, MANUFACTURER_CODE_NONE,
};

use crate::Error;

bitflags::bitflags! {
    /// Attribute access flags
    #[derive(Clone, Copy, Debug, PartialEq, Eq)]
    pub struct Access: u8 {
        const READ = 0x01;
        const WRITE = 0x02;
        const REPORTING = 0x04;
        /// Stored once for the device
        const SINGLETON = 0x08;
        /// Part of scenes, stored persistently
        const SCENE = 0x10;
        const MANUFACTURER_SPECIFIC = 0x20;
        /// Not visible to peers
        const INTERNAL = 0x40;
        /// Writable depending on the cluster state
        const WRITE_OPTIONAL = 0x80;
    }
}

impl Access {
    /// Read only
    pub const RO: Access = Access::READ;
    /// Read and write
    pub const RW: Access = Access::READ.union(Access::WRITE);
    /// Read only and reportable
    pub const RP: Access = Access::READ.union(Access::REPORTING);
    /// Read, write and reportable
    pub const RWP: Access = Access::RW.union(Access::REPORTING);

    /// Value survives a restart
    pub fn is_persistent(self) -> bool {
        self.intersects(Access::SINGLETON | Access::SCENE)
    }
}

/// Identity of an attribute instance
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct AttributeKey {
    pub endpoint: u8,
    pub cluster: u16,
    pub role: ClusterRole,
    pub attribute: u16,
    /// `MANUFACTURER_CODE_NONE` for standard attributes
    pub manufacturer_code: u16,
}

impl AttributeKey {
    pub fn new(endpoint: u8, cluster: u16, role: ClusterRole, attribute: u16) -> Self {
        Self {
            endpoint,
            cluster,
            role,
            attribute,
            manufacturer_code: MANUFACTURER_CODE_NONE,
        }
    }

    /// Manufacturer code as carried in a frame header
    pub fn manufacturer(&self) -> Option<u16> {
        if self.manufacturer_code == MANUFACTURER_CODE_NONE {
            None
        } else {
            Some(self.manufacturer_code)
        }
    }
}

impl core::fmt::Display for AttributeKey {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        write!(
            f,
            "{:02x}:{:04x}:{:?}:{:04x}",
            self.endpoint, self.cluster, self.role, self.attribute
        )?;
        if let Some(code) = self.manufacturer() {
            write!(f, ":{:04x}", code)?;
        }
        Ok(())
    }
}

/// Attribute as declared by an application
#[derive(Clone, Debug, PartialEq)]
pub struct AttributeDefinition {
    pub identifier: u16,
    pub access: Access,
    pub manufacturer_code: u16,
    /// Longest string or array content
    pub max_length: Option<usize>,
    /// Initial and factory default value, also gives the data type
    pub value: AttributeValue,
}

impl AttributeDefinition {
    pub fn new(identifier: u16, access: Access, value: AttributeValue) -> Self {
        Self {
            identifier,
            access,
            manufacturer_code: MANUFACTURER_CODE_NONE,
            max_length: None,
            value,
        }
    }

    /// Make the attribute specific to a manufacturer
    pub fn manufacturer(mut self, code: u16) -> Self {
        self.manufacturer_code = code;
        self.access |= Access::MANUFACTURER_SPECIFIC;
        self
    }

    pub fn max_length(mut self, length: usize) -> Self {
        self.max_length = Some(length);
        self
    }
}

/// Cluster as declared by an application
#[derive(Clone, Debug, PartialEq)]
pub struct ClusterDefinition {
    pub cluster: u16,
    pub role: ClusterRole,
    pub manufacturer_code: u16,
    pub attributes: Vec<AttributeDefinition>,
}

impl ClusterDefinition {
    pub fn new(cluster: u16, role: ClusterRole) -> Self {
        Self {
            cluster,
            role,
            manufacturer_code: MANUFACTURER_CODE_NONE,
            attributes: Vec::new(),
        }
    }

    pub fn server(cluster: u16) -> Self {
        Self::new(cluster, ClusterRole::Server)
    }

    pub fn client(cluster: u16) -> Self {
        Self::new(cluster, ClusterRole::Client)
    }

    pub fn manufacturer(mut self, code: u16) -> Self {
        self.manufacturer_code = code;
        self
    }

    pub fn attribute(mut self, attribute: AttributeDefinition) -> Self {
        self.attributes.push(attribute);
        self
    }
}

/// Endpoint as declared by an application
#[derive(Clone, Debug, PartialEq)]
pub struct EndpointDefinition {
    pub endpoint: u8,
    pub profile: u16,
    pub device: u16,
    pub clusters: Vec<ClusterDefinition>,
}

impl EndpointDefinition {
    pub fn new(endpoint: u8, profile: u16, device: u16) -> Self {
        Self {
            endpoint,
            profile,
            device,
            clusters: Vec::new(),
        }
    }

    pub fn cluster(mut self, cluster: ClusterDefinition) -> Self {
        self.clusters.push(cluster);
        self
    }
}

/// Registered attribute
#[derive(Clone, Debug, PartialEq)]
pub struct AttributeDescriptor {
    pub identifier: u16,
    pub data_type: AttributeDataType,
    pub access: Access,
    pub manufacturer_code: u16,
    pub max_length: Option<usize>,
    /// Index of the value in the store arena
    pub slot: usize,
    pub default: AttributeValue,
}

impl AttributeDescriptor {
    /// Does the descriptor match the manufacturer code of a request
    pub fn matches_manufacturer(&self, manufacturer: Option<u16>) -> bool {
        self.manufacturer_code == manufacturer.unwrap_or(MANUFACTURER_CODE_NONE)
    }

    pub fn is_readable(&self) -> bool {
        self.access.contains(Access::READ)
    }

    pub fn is_reportable(&self) -> bool {
        self.access.contains(Access::REPORTING)
    }

    pub fn is_internal(&self) -> bool {
        self.access.contains(Access::INTERNAL)
    }
}

/// Registered cluster
#[derive(Clone, Debug, PartialEq)]
pub struct ClusterDescriptor {
    pub cluster: u16,
    pub role: ClusterRole,
    pub manufacturer_code: u16,
    pub attributes: Vec<AttributeDescriptor>,
}

impl ClusterDescriptor {
    /// Attribute by identifier and manufacturer code
    pub fn attribute(&self, attribute: u16, manufacturer: Option<u16>) -> Option<&AttributeDescriptor> {
        self.attributes
            .iter()
            .find(|a| a.identifier == attribute && a.matches_manufacturer(manufacturer))
    }
}

/// Registered endpoint
#[derive(Clone, Debug, PartialEq)]
pub struct EndpointDescriptor {
    pub endpoint: u8,
    pub profile: u16,
    pub device: u16,
    pub clusters: Vec<ClusterDescriptor>,
}

impl EndpointDescriptor {
    pub fn cluster(&self, cluster: u16, role: ClusterRole) -> Option<&ClusterDescriptor> {
        self.clusters
            .iter()
            .find(|c| c.cluster == cluster && c.role.matches(role))
    }

    /// Is the cluster present in any role
    pub fn has_cluster(&self, cluster: u16) -> bool {
        self.clusters.iter().any(|c| c.cluster == cluster)
    }
}

type SingletonKey = (u16, ClusterRole, u16, u16);

/// Endpoint, cluster and attribute registry with value storage
#[derive(Default)]
pub struct AttributeStore {
    endpoints: Vec<EndpointDescriptor>,
    values: Vec<AttributeValue>,
    singletons: HashMap<SingletonKey, usize>,
}

impl AttributeStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register an endpoint, `revision` gives the cluster revision for
    /// clusters that do not declare attribute 0xfffd
    pub fn add_endpoint<F>(&mut self, definition: EndpointDefinition, revision: F) -> Result<(), Error>
    where
        F: Fn(u16, ClusterRole) -> u16,
    {
        if definition.endpoint == ENDPOINT_NONE || definition.endpoint == ENDPOINT_BROADCAST {
            return Err(Error::InvalidEndpoint);
        }
        if self.endpoint(definition.endpoint).is_some() {
            return Err(Error::AlreadyExists);
        }
        for (n, cluster) in definition.clusters.iter().enumerate() {
            let duplicate = definition.clusters[..n]
                .iter()
                .any(|c| c.cluster == cluster.cluster && c.role.matches(cluster.role));
            if duplicate {
                return Err(Error::AlreadyExists);
            }
            for (m, attribute) in cluster.attributes.iter().enumerate() {
                let duplicate = cluster.attributes[..m].iter().any(|a| {
                    a.identifier == attribute.identifier
                        && a.manufacturer_code == attribute.manufacturer_code
                });
                if duplicate {
                    return Err(Error::AlreadyExists);
                }
                if attribute.identifier == ATTR_CLUSTER_REVISION
                    && attribute.manufacturer_code == MANUFACTURER_CODE_NONE
                {
                    match attribute.value {
                        AttributeValue::Unsigned16(r) if r >= CLUSTER_REVISION_MIN => (),
                        _ => return Err(Error::Status(ClusterLibraryStatus::InvalidValue)),
                    }
                }
            }
        }

        let mut clusters = Vec::with_capacity(definition.clusters.len());
        for cluster in definition.clusters {
            let mut attributes = Vec::with_capacity(cluster.attributes.len() + 1);
            let has_revision = cluster.attributes.iter().any(|a| {
                a.identifier == ATTR_CLUSTER_REVISION && a.manufacturer_code == MANUFACTURER_CODE_NONE
            });
            let mut declared = cluster.attributes;
            if !has_revision {
                let local = revision(cluster.cluster, cluster.role).max(CLUSTER_REVISION_MIN);
                declared.push(AttributeDefinition::new(
                    ATTR_CLUSTER_REVISION,
                    Access::RO,
                    AttributeValue::Unsigned16(local),
                ));
            }
            for attribute in declared {
                let slot = self.allocate(cluster.cluster, cluster.role, &attribute);
                attributes.push(AttributeDescriptor {
                    identifier: attribute.identifier,
                    data_type: attribute.value.data_type(),
                    access: attribute.access,
                    manufacturer_code: attribute.manufacturer_code,
                    max_length: attribute.max_length,
                    slot,
                    default: attribute.value,
                });
            }
            clusters.push(ClusterDescriptor {
                cluster: cluster.cluster,
                role: cluster.role,
                manufacturer_code: cluster.manufacturer_code,
                attributes,
            });
        }
        log::debug!(
            "Endpoint {} profile {:04x} device {:04x} with {} clusters",
            definition.endpoint,
            definition.profile,
            definition.device,
            clusters.len()
        );
        self.endpoints.push(EndpointDescriptor {
            endpoint: definition.endpoint,
            profile: definition.profile,
            device: definition.device,
            clusters,
        });
        Ok(())
    }

    fn allocate(&mut self, cluster: u16, role: ClusterRole, attribute: &AttributeDefinition) -> usize {
        if attribute.access.contains(Access::SINGLETON) {
            let key = (cluster, role, attribute.identifier, attribute.manufacturer_code);
            if let Some(slot) = self.singletons.get(&key) {
                return *slot;
            }
            let slot = self.values.len();
            self.values.push(attribute.value.clone());
            self.singletons.insert(key, slot);
            return slot;
        }
        let slot = self.values.len();
        self.values.push(attribute.value.clone());
        slot
    }

    pub fn endpoint(&self, endpoint: u8) -> Option<&EndpointDescriptor> {
        self.endpoints.iter().find(|e| e.endpoint == endpoint)
    }

    pub fn endpoints(&self) -> impl Iterator<Item = &EndpointDescriptor> {
        self.endpoints.iter()
    }

    /// Endpoints hosting the cluster in the role, in registration order
    pub fn endpoints_with_cluster(&self, cluster: u16, role: ClusterRole) -> Vec<u8> {
        self.endpoints
            .iter()
            .filter(|e| e.cluster(cluster, role).is_some())
            .map(|e| e.endpoint)
            .collect()
    }

    pub fn cluster(&self, endpoint: u8, cluster: u16, role: ClusterRole) -> Option<&ClusterDescriptor> {
        self.endpoint(endpoint)?.cluster(cluster, role)
    }

    /// Look up an attribute
    pub fn find(
        &self,
        endpoint: u8,
        cluster: u16,
        role: ClusterRole,
        attribute: u16,
        manufacturer: Option<u16>,
    ) -> Option<&AttributeDescriptor> {
        self.cluster(endpoint, cluster, role)?
            .attribute(attribute, manufacturer)
    }

    /// Key of an attribute, the role is the one the cluster was declared with
    pub fn key(
        &self,
        endpoint: u8,
        cluster: u16,
        role: ClusterRole,
        attribute: u16,
        manufacturer: Option<u16>,
    ) -> Option<AttributeKey> {
        let descriptor = self.cluster(endpoint, cluster, role)?;
        let attribute = descriptor.attribute(attribute, manufacturer)?;
        Some(AttributeKey {
            endpoint,
            cluster,
            role: descriptor.role,
            attribute: attribute.identifier,
            manufacturer_code: attribute.manufacturer_code,
        })
    }

    pub fn value(&self, descriptor: &AttributeDescriptor) -> Option<&AttributeValue> {
        self.values.get(descriptor.slot)
    }

    /// Current value of an attribute
    pub fn get(
        &self,
        endpoint: u8,
        cluster: u16,
        role: ClusterRole,
        attribute: u16,
        manufacturer: Option<u16>,
    ) -> Option<&AttributeValue> {
        let descriptor = self.find(endpoint, cluster, role, attribute, manufacturer)?;
        self.value(descriptor)
    }

    /// Integer view of an attribute
    pub fn get_integer(&self, endpoint: u8, cluster: u16, role: ClusterRole, attribute: u16) -> Option<i128> {
        self.get(endpoint, cluster, role, attribute, None)?
            .as_integer()
    }

    /// Serialise the value of an attribute in its wire form
    pub fn read_wire(&self, descriptor: &AttributeDescriptor, data: &mut [u8]) -> Result<usize, Error> {
        let value = self.value(descriptor).ok_or(Error::NotFound)?;
        Ok(value.pack(data)?)
    }

    /// Replace the value in `slot`, no checks applied
    pub(crate) fn commit(&mut self, slot: usize, value: AttributeValue) -> Result<(), Error> {
        let stored = self.values.get_mut(slot).ok_or(Error::NotFound)?;
        *stored = value;
        Ok(())
    }

    /// Make a write optional attribute writable
    pub fn set_writable(&mut self, key: &AttributeKey) -> Result<(), Error> {
        let manufacturer = key.manufacturer();
        let endpoint = self
            .endpoints
            .iter_mut()
            .find(|e| e.endpoint == key.endpoint)
            .ok_or(Error::NotFound)?;
        let cluster = endpoint
            .clusters
            .iter_mut()
            .find(|c| c.cluster == key.cluster && c.role.matches(key.role))
            .ok_or(Error::NotFound)?;
        let attribute = cluster
            .attributes
            .iter_mut()
            .find(|a| a.identifier == key.attribute && a.matches_manufacturer(manufacturer))
            .ok_or(Error::NotFound)?;
        if !attribute.access.contains(Access::WRITE_OPTIONAL) {
            return Err(Error::Status(ClusterLibraryStatus::ReadOnly));
        }
        attribute.access |= Access::WRITE;
        Ok(())
    }

    /// Restore the default value of every attribute of the endpoint, returns
    /// the keys of the attributes that changed
    pub fn reset_endpoint(&mut self, endpoint: u8) -> Result<Vec<AttributeKey>, Error> {
        let descriptor = self
            .endpoints
            .iter()
            .find(|e| e.endpoint == endpoint)
            .ok_or(Error::InvalidEndpoint)?;
        let mut changed = Vec::new();
        for cluster in descriptor.clusters.iter() {
            for attribute in cluster.attributes.iter() {
                if let Some(value) = self.values.get_mut(attribute.slot) {
                    if *value != attribute.default {
                        *value = attribute.default.clone();
                        changed.push(AttributeKey {
                            endpoint,
                            cluster: cluster.cluster,
                            role: cluster.role,
                            attribute: attribute.identifier,
                            manufacturer_code: attribute.manufacturer_code,
                        });
                    }
                }
            }
        }
        Ok(changed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use zcl_data::cluster_library::cluster;

    fn light(endpoint: u8) -> EndpointDefinition {
        EndpointDefinition::new(endpoint, 0x0104, 0x0100)
            .cluster(
                ClusterDefinition::server(cluster::ON_OFF)
                    .attribute(AttributeDefinition::new(0x0000, Access::RP, false.into()))
                    .attribute(AttributeDefinition::new(
                        0x4001,
                        Access::RW,
                        AttributeValue::Unsigned16(0),
                    )),
            )
            .cluster(
                ClusterDefinition::server(cluster::BASIC)
                    .attribute(AttributeDefinition::new(
                        0x0000,
                        Access::RO | Access::SINGLETON,
                        AttributeValue::Unsigned8(8),
                    ))
                    .attribute(
                        AttributeDefinition::new(
                            0x0010,
                            Access::RW,
                            AttributeValue::CharacterString(Some(String::new())),
                        )
                        .max_length(16),
                    )
                    .attribute(
                        AttributeDefinition::new(0x0010, Access::RW, AttributeValue::Unsigned8(1))
                            .manufacturer(0x1234),
                    ),
            )
    }

    fn revision(_cluster: u16, _role: ClusterRole) -> u16 {
        3
    }

    #[test]
    fn cluster_revision_always_present() {
        let mut store = AttributeStore::new();
        store.add_endpoint(light(1), revision).unwrap();
        for cluster in store.endpoint(1).unwrap().clusters.iter() {
            let descriptor = cluster.attribute(ATTR_CLUSTER_REVISION, None).unwrap();
            assert_eq!(descriptor.data_type, AttributeDataType::Unsigned16);
            assert_eq!(store.value(descriptor), Some(&AttributeValue::Unsigned16(3)));
        }
    }

    #[test]
    fn declared_revision_is_kept() {
        let mut store = AttributeStore::new();
        let definition = EndpointDefinition::new(1, 0x0104, 0).cluster(
            ClusterDefinition::server(0x0402).attribute(AttributeDefinition::new(
                ATTR_CLUSTER_REVISION,
                Access::RO,
                AttributeValue::Unsigned16(2),
            )),
        );
        store.add_endpoint(definition, revision).unwrap();
        assert_eq!(
            store.get(1, 0x0402, ClusterRole::Server, ATTR_CLUSTER_REVISION, None),
            Some(&AttributeValue::Unsigned16(2))
        );
        let definition = EndpointDefinition::new(2, 0x0104, 0).cluster(
            ClusterDefinition::server(0x0402).attribute(AttributeDefinition::new(
                ATTR_CLUSTER_REVISION,
                Access::RO,
                AttributeValue::Unsigned16(0),
            )),
        );
        assert_eq!(
            store.add_endpoint(definition, revision),
            Err(Error::Status(ClusterLibraryStatus::InvalidValue))
        );
    }

    #[test]
    fn reserved_and_duplicate_endpoints() {
        let mut store = AttributeStore::new();
        assert_eq!(store.add_endpoint(light(0), revision), Err(Error::InvalidEndpoint));
        assert_eq!(store.add_endpoint(light(0xff), revision), Err(Error::InvalidEndpoint));
        store.add_endpoint(light(1), revision).unwrap();
        assert_eq!(store.add_endpoint(light(1), revision), Err(Error::AlreadyExists));
    }

    #[test]
    fn duplicate_attribute() {
        let mut store = AttributeStore::new();
        let definition = EndpointDefinition::new(1, 0x0104, 0).cluster(
            ClusterDefinition::server(cluster::ON_OFF)
                .attribute(AttributeDefinition::new(0x0000, Access::RP, false.into()))
                .attribute(AttributeDefinition::new(0x0000, Access::RO, true.into())),
        );
        assert_eq!(store.add_endpoint(definition, revision), Err(Error::AlreadyExists));
    }

    #[test]
    fn manufacturer_lookup() {
        let mut store = AttributeStore::new();
        store.add_endpoint(light(1), revision).unwrap();
        let standard = store
            .find(1, cluster::BASIC, ClusterRole::Server, 0x0010, None)
            .unwrap();
        assert_eq!(standard.data_type, AttributeDataType::CharacterString);
        assert_eq!(standard.max_length, Some(16));
        let specific = store
            .find(1, cluster::BASIC, ClusterRole::Server, 0x0010, Some(0x1234))
            .unwrap();
        assert_eq!(specific.data_type, AttributeDataType::Unsigned8);
        assert!(specific.access.contains(Access::MANUFACTURER_SPECIFIC));
        assert!(store
            .find(1, cluster::BASIC, ClusterRole::Server, 0x0010, Some(0x4321))
            .is_none());
        assert!(store
            .find(1, cluster::BASIC, ClusterRole::Client, 0x0010, None)
            .is_none());
    }

    #[test]
    fn singleton_shared_between_endpoints() {
        let mut store = AttributeStore::new();
        store.add_endpoint(light(1), revision).unwrap();
        store.add_endpoint(light(2), revision).unwrap();
        let one = store
            .find(1, cluster::BASIC, ClusterRole::Server, 0x0000, None)
            .unwrap()
            .slot;
        let two = store
            .find(2, cluster::BASIC, ClusterRole::Server, 0x0000, None)
            .unwrap()
            .slot;
        assert_eq!(one, two);
        let one = store
            .find(1, cluster::ON_OFF, ClusterRole::Server, 0x0000, None)
            .unwrap()
            .slot;
        let two = store
            .find(2, cluster::ON_OFF, ClusterRole::Server, 0x0000, None)
            .unwrap()
            .slot;
        assert_ne!(one, two);
        assert_eq!(store.endpoints_with_cluster(cluster::ON_OFF, ClusterRole::Server), vec![1, 2]);
    }

    #[test]
    fn wire_form_and_reset() {
        let mut store = AttributeStore::new();
        store.add_endpoint(light(1), revision).unwrap();
        let descriptor = store
            .find(1, cluster::ON_OFF, ClusterRole::Server, 0x4001, None)
            .unwrap()
            .clone();
        store.commit(descriptor.slot, AttributeValue::Unsigned16(0x1234)).unwrap();
        let mut data = [0u8; 4];
        assert_eq!(store.read_wire(&descriptor, &mut data).unwrap(), 2);
        assert_eq!(data[..2], [0x34, 0x12]);
        let changed = store.reset_endpoint(1).unwrap();
        assert_eq!(
            changed,
            vec![AttributeKey::new(1, cluster::ON_OFF, ClusterRole::Server, 0x4001)]
        );
        assert_eq!(store.value(&descriptor), Some(&AttributeValue::Unsigned16(0)));
        assert_eq!(store.reset_endpoint(9), Err(Error::InvalidEndpoint));
    }

    #[test]
    fn promote_write_optional() {
        let mut store = AttributeStore::new();
        let definition = EndpointDefinition::new(1, 0x0104, 0).cluster(
            ClusterDefinition::server(cluster::TIME).attribute(AttributeDefinition::new(
                0x0000,
                Access::READ | Access::WRITE_OPTIONAL,
                AttributeValue::UtcTime(0),
            )),
        );
        store.add_endpoint(definition, revision).unwrap();
        let key = AttributeKey::new(1, cluster::TIME, ClusterRole::Server, 0x0000);
        store.set_writable(&key).unwrap();
        let access = store
            .find(1, cluster::TIME, ClusterRole::Server, 0x0000, None)
            .unwrap()
            .access;
        assert!(access.contains(Access::WRITE));
        let revision_key = AttributeKey::new(1, cluster::TIME, ClusterRole::Server, ATTR_CLUSTER_REVISION);
        assert_eq!(
            store.set_writable(&revision_key),
            Err(Error::Status(ClusterLibraryStatus::ReadOnly))
        );
    }
}
