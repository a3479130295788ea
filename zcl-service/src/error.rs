use zcl_data::cluster_library::ClusterLibraryStatus;

/// Errors
#[derive(Clone, Debug, PartialEq)]
pub enum Error {
    /// No free buffer in the pool
    PoolExhausted,
    /// The buffer identifier does not refer to an allocated buffer
    InvalidBuffer,
    /// Not enough room in the buffer
    NotEnoughSpace,
    /// An entry with the same key is already registered
    AlreadyExists,
    /// The requested entry does not exist
    NotFound,
    /// Endpoint identifier is reserved or unknown
    InvalidEndpoint,
    /// The frame can not be delivered to its destination
    NoRoute,
    /// Operation failed with a cluster library status
    Status(ClusterLibraryStatus),
    /// Wire level encoding or decoding failed
    Data(zcl_data::Error),
    /// Configuration could not be parsed or is inconsistent
    Config(String),
}

impl From<zcl_data::Error> for Error {
    fn from(error: zcl_data::Error) -> Self {
        Self::Data(error)
    }
}

impl From<ClusterLibraryStatus> for Error {
    fn from(status: ClusterLibraryStatus) -> Self {
        Self::Status(status)
    }
}

impl core::fmt::Display for Error {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        match self {
            Error::PoolExhausted => f.write_str("buffer pool exhausted"),
            Error::InvalidBuffer => f.write_str("invalid buffer"),
            Error::NotEnoughSpace => f.write_str("not enough space"),
            Error::AlreadyExists => f.write_str("already exists"),
            Error::NotFound => f.write_str("not found"),
            Error::InvalidEndpoint => f.write_str("invalid endpoint"),
            Error::NoRoute => f.write_str("no route to destination"),
            Error::Status(status) => write!(f, "status {:?}", status),
            Error::Data(error) => write!(f, "data error, {}", error),
            Error::Config(message) => write!(f, "configuration error, {}", message),
        }
    }
}

impl std::error::Error for Error {}
