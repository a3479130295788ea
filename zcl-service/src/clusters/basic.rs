//! Basic cluster server

use zcl_data::cluster_library::basic::{
    BasicCommand, PowerSource, ATTR_APPLICATION_VERSION, ATTR_DATE_CODE, ATTR_DEVICE_ENABLED,
    ATTR_HARDWARE_VERSION, ATTR_LIBRARY_VERSION, ATTR_LOCATION_DESCRIPTION,
    ATTR_MANUFACTURER_NAME, ATTR_MODEL_IDENTIFIER, ATTR_PHYSICAL_ENVIRONMENT, ATTR_POWER_SOURCE,
    ATTR_SOFTWARE_BUILD_IDENTIFIER, ATTR_STACK_VERSION, CLUSTER, CMD_RESET_TO_FACTORY_DEFAULTS,
    LIBRARY_VERSION, LOCATION_MAX_LENGTH, NAME_MAX_LENGTH,
};
use zcl_data::cluster_library::{AttributeValue, ClusterLibraryStatus, ClusterRole};

use super::parse;
use crate::core::{Context, ZclCore};
use crate::event::DeviceEvent;
use crate::handler::{ClusterHandler, CommandOutcome};
use crate::header::ParsedHeader;
use crate::store::{Access, AttributeDefinition, ClusterDefinition};
use crate::transition;

const DATE_CODE_MAX_LENGTH: usize = 16;

/// Identity of the device, as presented by the basic cluster
#[derive(Clone, Debug, PartialEq)]
pub struct DeviceInformation {
    pub application_version: u8,
    pub stack_version: u8,
    pub hardware_version: u8,
    pub manufacturer_name: String,
    pub model_identifier: String,
    pub date_code: String,
    pub power_source: PowerSource,
    pub software_build: String,
}

impl Default for DeviceInformation {
    fn default() -> Self {
        Self {
            application_version: 0,
            stack_version: 0,
            hardware_version: 0,
            manufacturer_name: String::new(),
            model_identifier: String::new(),
            date_code: String::new(),
            power_source: PowerSource::Unknown,
            software_build: String::new(),
        }
    }
}

fn text(value: &str) -> AttributeValue {
    AttributeValue::CharacterString(Some(value.to_string()))
}

/// Basic server cluster with the attributes of `information`
///
/// The identification attributes are shared by all endpoints of the device.
pub fn server(information: &DeviceInformation) -> ClusterDefinition {
    let device = Access::RO | Access::SINGLETON;
    ClusterDefinition::server(CLUSTER)
        .attribute(AttributeDefinition::new(
            ATTR_LIBRARY_VERSION,
            device,
            AttributeValue::Unsigned8(LIBRARY_VERSION),
        ))
        .attribute(AttributeDefinition::new(
            ATTR_APPLICATION_VERSION,
            device,
            AttributeValue::Unsigned8(information.application_version),
        ))
        .attribute(AttributeDefinition::new(
            ATTR_STACK_VERSION,
            device,
            AttributeValue::Unsigned8(information.stack_version),
        ))
        .attribute(AttributeDefinition::new(
            ATTR_HARDWARE_VERSION,
            device,
            AttributeValue::Unsigned8(information.hardware_version),
        ))
        .attribute(
            AttributeDefinition::new(
                ATTR_MANUFACTURER_NAME,
                device,
                text(&information.manufacturer_name),
            )
            .max_length(NAME_MAX_LENGTH),
        )
        .attribute(
            AttributeDefinition::new(
                ATTR_MODEL_IDENTIFIER,
                device,
                text(&information.model_identifier),
            )
            .max_length(NAME_MAX_LENGTH),
        )
        .attribute(
            AttributeDefinition::new(ATTR_DATE_CODE, device, text(&information.date_code))
                .max_length(DATE_CODE_MAX_LENGTH),
        )
        .attribute(AttributeDefinition::new(
            ATTR_POWER_SOURCE,
            device,
            AttributeValue::Enumeration8(u8::from(information.power_source)),
        ))
        .attribute(
            AttributeDefinition::new(
                ATTR_LOCATION_DESCRIPTION,
                Access::RW | Access::SINGLETON,
                text(""),
            )
            .max_length(LOCATION_MAX_LENGTH),
        )
        .attribute(AttributeDefinition::new(
            ATTR_PHYSICAL_ENVIRONMENT,
            Access::RW | Access::SINGLETON,
            AttributeValue::Enumeration8(0),
        ))
        .attribute(AttributeDefinition::new(
            ATTR_DEVICE_ENABLED,
            Access::RW,
            true.into(),
        ))
        .attribute(
            AttributeDefinition::new(
                ATTR_SOFTWARE_BUILD_IDENTIFIER,
                device,
                text(&information.software_build),
            )
            .max_length(DATE_CODE_MAX_LENGTH),
        )
}

/// Restore the factory defaults of every attribute of an endpoint
pub fn reset_to_factory_defaults(ctx: &mut Context, endpoint: u8) -> Result<(), ClusterLibraryStatus> {
    let changed = ctx
        .core
        .store
        .reset_endpoint(endpoint)
        .map_err(|_| ClusterLibraryStatus::Failure)?;
    for key in changed.iter() {
        let (access, value) = match ctx.core.store.find(
            key.endpoint,
            key.cluster,
            key.role,
            key.attribute,
            key.manufacturer(),
        ) {
            Some(descriptor) => (descriptor.access, descriptor.default.clone()),
            None => continue,
        };
        if access.is_persistent() {
            let stored = ZclCore::persistent_key(key, access);
            ctx.core.persistent.save_attribute(&stored, &value);
        }
        ctx.notify(DeviceEvent::SetAttributeValue {
            endpoint,
            cluster: key.cluster,
            attribute: key.attribute,
            value,
        });
    }
    let clusters: Vec<u16> = ctx
        .core
        .store
        .endpoint(endpoint)
        .map(|e| e.clusters.iter().map(|c| c.cluster).collect())
        .unwrap_or_default();
    for cluster in clusters {
        transition::cancel(ctx, endpoint, cluster);
    }
    log::info!("Endpoint {} reset, {} attributes changed", endpoint, changed.len());
    ctx.notify(DeviceEvent::ResetToFactoryDefaults { endpoint });
    Ok(())
}

/// Basic cluster server
pub struct BasicServer;

impl ClusterHandler for BasicServer {
    fn cluster(&self) -> u16 {
        CLUSTER
    }

    fn role(&self) -> ClusterRole {
        ClusterRole::Server
    }

    fn handle_command(
        &self,
        ctx: &mut Context,
        endpoint: u8,
        header: &ParsedHeader,
        payload: &[u8],
    ) -> CommandOutcome {
        match parse::<BasicCommand>(header, payload) {
            Ok(BasicCommand::ResetToFactoryDefaults) => reset_to_factory_defaults(ctx, endpoint).into(),
            Err(outcome) => outcome,
        }
    }

    fn received_commands(&self) -> &'static [u8] {
        &[CMD_RESET_TO_FACTORY_DEFAULTS]
    }
}
