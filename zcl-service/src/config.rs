//! Process wide configuration
//!
//! Loaded from TOML, every field has a default so an empty document is a
//! valid configuration.
//!
//! ```toml
//! compatibility_mode = "compatibility"
//! status_mode = "pre-zcl8"
//! buffer_count = 16
//!
//! [fragmentation]
//! max_payload = 512
//! clusters = [{ profile = 0x0104, cluster = 0x0702 }]
//!
//! [[cluster_revisions]]
//! cluster = 0x0300
//! role = "server"
//! revision = 2
//! ```

use serde_derive::Deserialize;

use zcl_data::cluster_library::ClusterRole;

use crate::Error;

/// Largest frame on the air
pub const PHY_FRAME_MAX: usize = 127;

/// How outgoing payload shapes are chosen
#[derive(Clone, Copy, Debug, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "kebab-case")]
pub enum CompatibilityMode {
    /// The shape follows the API used by the caller
    Legacy,
    /// The shape follows the locally declared cluster revision
    Auto,
    /// The shape follows the peer revision, capped by the local revision
    Compatibility,
}

/// Which set of status codes is put on the wire
#[derive(Clone, Copy, Debug, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "kebab-case")]
pub enum StatusMode {
    /// Keep the richer status set of ZCL 6 and 7
    PreZcl8,
    /// Collapse merged statuses as ZCL 8 does
    Zcl8,
}

/// Cluster side named in the configuration file
#[derive(Clone, Copy, Debug, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum ConfiguredRole {
    Server,
    Client,
}

impl From<ConfiguredRole> for ClusterRole {
    fn from(role: ConfiguredRole) -> Self {
        match role {
            ConfiguredRole::Server => ClusterRole::Server,
            ConfiguredRole::Client => ClusterRole::Client,
        }
    }
}

/// A cluster allowed to use APS fragmentation
#[derive(Clone, Copy, Debug, Deserialize, PartialEq, Eq)]
pub struct FragmentedCluster {
    pub profile: u16,
    pub cluster: u16,
}

/// Fragmentation allowlist
#[derive(Clone, Debug, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct FragmentationConfig {
    /// ZCL frame size cap for the listed clusters
    pub max_payload: usize,
    pub clusters: Vec<FragmentedCluster>,
}

impl Default for FragmentationConfig {
    fn default() -> Self {
        Self {
            max_payload: 1024,
            clusters: Vec::new(),
        }
    }
}

/// Override of a compiled in cluster revision
#[derive(Clone, Copy, Debug, Deserialize, PartialEq, Eq)]
pub struct RevisionOverride {
    pub cluster: u16,
    pub role: ConfiguredRole,
    pub revision: u16,
}

/// Runtime configuration
#[derive(Clone, Debug, Deserialize, PartialEq)]
#[serde(default)]
pub struct Config {
    pub compatibility_mode: CompatibilityMode,
    pub status_mode: StatusMode,
    /// Number of buffers in the pool
    pub buffer_count: usize,
    /// Bytes per buffer
    pub buffer_size: usize,
    /// Room reserved in front of outgoing frames for lower layer headers
    pub headroom: usize,
    /// Resolution of the reporting engine in milliseconds
    pub reporting_tick_ms: u32,
    /// Tick of the transition state machines in milliseconds
    pub transition_tick_ms: u32,
    /// Manufacturer code announced by this device, e.g. in zone enroll requests
    pub manufacturer_code: u16,
    pub fragmentation: FragmentationConfig,
    pub cluster_revisions: Vec<RevisionOverride>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            compatibility_mode: CompatibilityMode::Auto,
            status_mode: StatusMode::Zcl8,
            buffer_count: 32,
            buffer_size: 256,
            headroom: 32,
            reporting_tick_ms: 100,
            transition_tick_ms: 100,
            manufacturer_code: 0x0000,
            fragmentation: FragmentationConfig::default(),
            cluster_revisions: Vec::new(),
        }
    }
}

impl Config {
    /// Parse and validate a TOML document
    pub fn from_toml(text: &str) -> Result<Config, Error> {
        let config: Config = toml::from_str(text).map_err(|e| Error::Config(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    /// Check that the sizes and intervals can be used
    pub fn validate(&self) -> Result<(), Error> {
        if self.buffer_count == 0 {
            return Err(Error::Config("buffer_count must be at least one".to_string()));
        }
        if self.buffer_size < self.headroom + PHY_FRAME_MAX {
            return Err(Error::Config(format!(
                "buffer_size {} can not hold headroom {} and a full frame",
                self.buffer_size, self.headroom
            )));
        }
        if self.reporting_tick_ms == 0 || self.transition_tick_ms == 0 {
            return Err(Error::Config("ticks must be non-zero".to_string()));
        }
        Ok(())
    }

    /// Is the cluster on the fragmentation allowlist
    pub fn fragmentation_allowed(&self, profile: u16, cluster: u16) -> bool {
        self.fragmentation
            .clusters
            .iter()
            .any(|c| c.profile == profile && c.cluster == cluster)
    }

    /// Configured revision for a cluster side, if any
    pub fn revision_override(&self, cluster: u16, role: ClusterRole) -> Option<u16> {
        self.cluster_revisions
            .iter()
            .find(|r| r.cluster == cluster && ClusterRole::from(r.role) == role)
            .map(|r| r.revision)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_document() {
        let config = Config::from_toml("").unwrap();
        assert_eq!(config, Config::default());
        assert_eq!(config.status_mode, StatusMode::Zcl8);
        assert_eq!(config.compatibility_mode, CompatibilityMode::Auto);
    }

    #[test]
    fn full_document() {
        let text = r#"
compatibility_mode = "compatibility"
status_mode = "pre-zcl8"
buffer_count = 8
reporting_tick_ms = 250
manufacturer_code = 0x115f

[fragmentation]
max_payload = 512
clusters = [{ profile = 0x0104, cluster = 0x0702 }]

[[cluster_revisions]]
cluster = 0x0300
role = "server"
revision = 2
"#;
        let config = Config::from_toml(text).unwrap();
        assert_eq!(config.compatibility_mode, CompatibilityMode::Compatibility);
        assert_eq!(config.status_mode, StatusMode::PreZcl8);
        assert_eq!(config.buffer_count, 8);
        assert_eq!(config.buffer_size, 256);
        assert_eq!(config.reporting_tick_ms, 250);
        assert_eq!(config.manufacturer_code, 0x115f);
        assert_eq!(config.fragmentation.max_payload, 512);
        assert!(config.fragmentation_allowed(0x0104, 0x0702));
        assert!(!config.fragmentation_allowed(0x0104, 0x0006));
        assert_eq!(config.revision_override(0x0300, ClusterRole::Server), Some(2));
        assert_eq!(config.revision_override(0x0300, ClusterRole::Client), None);
    }

    #[test]
    fn rejects_bad_values() {
        assert!(matches!(
            Config::from_toml("buffer_count = 0"),
            Err(Error::Config(_))
        ));
        assert!(matches!(
            Config::from_toml("buffer_size = 64"),
            Err(Error::Config(_))
        ));
        assert!(matches!(
            Config::from_toml("status_mode = \"zcl9\""),
            Err(Error::Config(_))
        ));
    }
}
