//! # Traits for handling packing and unpacking
//!
//! Command payloads and header fields are serialised into, and read from,
//! plain byte slices. Multi-byte fields are little endian.

/// Packing of data of fixed size
pub trait PackFixed<T, E> {
    /// Serialise into buffer, returning if there was an error
    fn pack(&self, data: &mut [u8]) -> Result<(), E>;
    /// De-serialise from buffer, returning object or error
    fn unpack(data: &[u8]) -> Result<T, E>;
}

/// Packing of data with variable size
pub trait Pack<T, E> {
    /// Serialise into buffer, returning number of bytes written or error
    fn pack(&self, data: &mut [u8]) -> Result<usize, E>;
    /// De-serialise from buffer, returning object and number of bytes used
    /// or error
    fn unpack(data: &[u8]) -> Result<(T, usize), E>;
}

/// Serialise a variable sized object into a new vector
pub fn pack_to_vec<T, P>(value: &P, capacity: usize) -> Result<Vec<u8>, crate::Error>
where
    P: Pack<T, crate::Error>,
{
    let mut data = vec![0u8; capacity];
    let used = value.pack(&mut data[..])?;
    data.truncate(used);
    Ok(data)
}
