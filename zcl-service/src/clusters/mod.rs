//! Built-in cluster handlers
//!
//! Each module holds the handler of one cluster and a helper building the
//! attribute declaration of the cluster for an endpoint.

use zcl_data::cluster_library::{ClusterCommand, ClusterLibraryStatus};

use crate::handler::{ClusterHandler, CommandOutcome};
use crate::header::ParsedHeader;

pub mod basic;
pub mod color_control;
pub mod ias_zone;
pub mod identify;
pub mod level_control;
pub mod on_off;
pub mod time;

/// Parse the payload of a cluster specific command
///
/// Unknown commands map to `NotHandled`, payloads that do not parse to a
/// malformed command status.
pub fn parse<C: ClusterCommand>(header: &ParsedHeader, payload: &[u8]) -> Result<C, CommandOutcome> {
    match C::unpack(header.command, payload) {
        Ok(command) => Ok(command),
        Err(zcl_data::Error::UnknownCommand) => Err(CommandOutcome::NotHandled),
        Err(error) => {
            log::warn!(
                "> Command {:02x} of {:04x} malformed, {}",
                header.command,
                header.cluster,
                error
            );
            Err(CommandOutcome::HandledErr(ClusterLibraryStatus::MalformedCommand))
        }
    }
}

/// Handlers of every built-in cluster
pub fn default_handlers() -> Vec<Box<dyn ClusterHandler>> {
    vec![
        Box::new(basic::BasicServer),
        Box::new(identify::IdentifyServer),
        Box::new(identify::IdentifyClient),
        Box::new(on_off::OnOffServer),
        Box::new(level_control::LevelControlServer),
        Box::new(color_control::ColorControlServer),
        Box::new(ias_zone::IasZoneServer),
        Box::new(ias_zone::IasZoneClient::default()),
        Box::new(time::TimeServer),
    ]
}
