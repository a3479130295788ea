//! Default response to requests

use core::convert::TryFrom;

use crate::cluster_library::ClusterLibraryStatus;
use crate::pack::Pack;
use crate::Error;

/// Default response for request
#[derive(Clone, Debug, PartialEq)]
pub struct DefaultResponse {
    /// Command identifier from the request
    pub command: u8,
    /// Return status of the request
    pub status: ClusterLibraryStatus,
}

impl DefaultResponse {
    /// Create a default response to `command`
    pub fn new(command: u8, status: ClusterLibraryStatus) -> Self {
        Self { command, status }
    }
}

impl Pack<DefaultResponse, Error> for DefaultResponse {
    fn pack(&self, data: &mut [u8]) -> Result<usize, Error> {
        if data.len() < 2 {
            return Err(Error::NotEnoughSpace);
        }
        data[0] = self.command;
        data[1] = u8::from(self.status);
        Ok(2)
    }

    fn unpack(data: &[u8]) -> Result<(Self, usize), Error> {
        if data.len() < 2 {
            return Err(Error::WrongNumberOfBytes);
        }
        let status = ClusterLibraryStatus::try_from(data[1])?;
        Ok((
            Self {
                command: data[0],
                status,
            },
            2,
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_response() {
        let (cmd, used) = DefaultResponse::unpack(&[0x01, 0x81]).unwrap();
        assert_eq!(used, 2);
        assert_eq!(
            cmd,
            DefaultResponse::new(0x01, ClusterLibraryStatus::UnsupportedClusterCommand)
        );
        let mut out = [0u8; 1];
        assert_eq!(cmd.pack(&mut out), Err(Error::NotEnoughSpace));
        assert_eq!(crate::pack::pack_to_vec(&cmd, 8).unwrap(), vec![0x01, 0x81]);
    }
}
