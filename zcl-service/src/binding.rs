//! Binding table
//!
//! Where reports and other unsolicited frames of a local cluster are sent.

use crate::transport::DestinationAddress;

/// Destination of a binding
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct BindingDestination {
    pub address: DestinationAddress,
    /// Endpoint at the destination, ignored for groups
    pub endpoint: u8,
}

/// Source of binding destinations
pub trait BindingTable {
    /// Destinations bound to `cluster` on the local `endpoint`
    fn destinations(&self, endpoint: u8, cluster: u16) -> Vec<BindingDestination>;
}

#[derive(Clone, Debug, PartialEq)]
struct Binding {
    endpoint: u8,
    cluster: u16,
    destination: BindingDestination,
}

/// Binding table held in memory
#[derive(Clone, Debug, Default)]
pub struct StaticBindingTable {
    bindings: Vec<Binding>,
}

impl StaticBindingTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Bind `cluster` on `endpoint` to `destination`, duplicates are ignored
    pub fn bind(&mut self, endpoint: u8, cluster: u16, destination: BindingDestination) {
        let binding = Binding {
            endpoint,
            cluster,
            destination,
        };
        if !self.bindings.contains(&binding) {
            self.bindings.push(binding);
        }
    }

    /// Remove a binding, returns true if it existed
    pub fn unbind(&mut self, endpoint: u8, cluster: u16, destination: BindingDestination) -> bool {
        let before = self.bindings.len();
        self.bindings.retain(|b| {
            !(b.endpoint == endpoint && b.cluster == cluster && b.destination == destination)
        });
        before != self.bindings.len()
    }
}

impl BindingTable for StaticBindingTable {
    fn destinations(&self, endpoint: u8, cluster: u16) -> Vec<BindingDestination> {
        self.bindings
            .iter()
            .filter(|b| b.endpoint == endpoint && b.cluster == cluster)
            .map(|b| b.destination)
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use zcl_data::ShortAddress;

    #[test]
    fn bind_and_unbind() {
        let mut table = StaticBindingTable::new();
        let coordinator = BindingDestination {
            address: DestinationAddress::Short(ShortAddress::new(0x0000)),
            endpoint: 1,
        };
        let group = BindingDestination {
            address: DestinationAddress::Group(0x0004),
            endpoint: 0xff,
        };
        table.bind(1, 0x0006, coordinator);
        table.bind(1, 0x0006, coordinator);
        table.bind(1, 0x0006, group);
        table.bind(2, 0x0006, coordinator);
        assert_eq!(table.destinations(1, 0x0006), vec![coordinator, group]);
        assert!(table.destinations(1, 0x0008).is_empty());
        assert!(table.unbind(1, 0x0006, coordinator));
        assert!(!table.unbind(1, 0x0006, coordinator));
        assert_eq!(table.destinations(1, 0x0006), vec![group]);
    }
}
