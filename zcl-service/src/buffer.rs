//! Buffer pool
//!
//! Fixed number of fixed size buffers. Each buffer holds a window
//! `[begin, end)` of valid data with headroom in front, and a stage context
//! carrying the typed parameters of the stage currently owning the buffer.

use crate::header::ParsedHeader;
use crate::transport::{ApsDataIndication, ApsDataRequest};
use crate::Error;

/// Handle to a pool buffer
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct BufferId(usize);

impl BufferId {
    pub fn new(index: usize) -> Self {
        Self(index)
    }

    pub fn index(self) -> usize {
        self.0
    }
}

impl core::fmt::Display for BufferId {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// Parameters attached to a buffer by the stage that owns it
#[derive(Clone, Debug, PartialEq)]
pub enum StageContext {
    Empty,
    /// Received frame, header not yet parsed
    Indication(ApsDataIndication),
    /// Received frame with parsed header, data starts at the payload
    Parsed(ParsedHeader),
    /// Frame waiting for transmission
    Outgoing(ApsDataRequest),
}

struct Slot {
    data: Vec<u8>,
    begin: usize,
    end: usize,
    allocated: bool,
    context: StageContext,
}

/// Pool of frame buffers
pub struct BufferPool {
    slots: Vec<Slot>,
    headroom: usize,
}

impl BufferPool {
    /// Pool of `count` buffers of `size` bytes, data starts after `headroom`
    pub fn new(count: usize, size: usize, headroom: usize) -> Self {
        let slots = (0..count)
            .map(|_| Slot {
                data: vec![0u8; size],
                begin: 0,
                end: 0,
                allocated: false,
                context: StageContext::Empty,
            })
            .collect();
        Self {
            slots,
            headroom: headroom.min(size),
        }
    }

    /// Take a free buffer
    pub fn acquire(&mut self) -> Result<BufferId, Error> {
        let headroom = self.headroom;
        let (index, slot) = self
            .slots
            .iter_mut()
            .enumerate()
            .find(|(_, s)| !s.allocated)
            .ok_or(Error::PoolExhausted)?;
        slot.allocated = true;
        slot.begin = headroom;
        slot.end = headroom;
        slot.context = StageContext::Empty;
        Ok(BufferId(index))
    }

    /// Return a buffer to the pool
    pub fn release(&mut self, buffer: BufferId) -> Result<(), Error> {
        let slot = self.slot_mut(buffer)?;
        slot.allocated = false;
        slot.context = StageContext::Empty;
        Ok(())
    }

    fn slot(&self, buffer: BufferId) -> Result<&Slot, Error> {
        match self.slots.get(buffer.0) {
            Some(slot) if slot.allocated => Ok(slot),
            _ => Err(Error::InvalidBuffer),
        }
    }

    fn slot_mut(&mut self, buffer: BufferId) -> Result<&mut Slot, Error> {
        match self.slots.get_mut(buffer.0) {
            Some(slot) if slot.allocated => Ok(slot),
            _ => Err(Error::InvalidBuffer),
        }
    }

    /// Set the headroom of an empty buffer
    pub fn reserve_headroom(&mut self, buffer: BufferId, headroom: usize) -> Result<(), Error> {
        let slot = self.slot_mut(buffer)?;
        if slot.begin != slot.end || headroom > slot.data.len() {
            return Err(Error::NotEnoughSpace);
        }
        slot.begin = headroom;
        slot.end = headroom;
        Ok(())
    }

    /// Add bytes after the data
    pub fn append(&mut self, buffer: BufferId, bytes: &[u8]) -> Result<(), Error> {
        let slot = self.slot_mut(buffer)?;
        let end = slot.end + bytes.len();
        if end > slot.data.len() {
            return Err(Error::NotEnoughSpace);
        }
        slot.data[slot.end..end].copy_from_slice(bytes);
        slot.end = end;
        Ok(())
    }

    /// Add bytes in front of the data, using the headroom
    pub fn prepend(&mut self, buffer: BufferId, bytes: &[u8]) -> Result<(), Error> {
        let slot = self.slot_mut(buffer)?;
        if bytes.len() > slot.begin {
            return Err(Error::NotEnoughSpace);
        }
        let begin = slot.begin - bytes.len();
        slot.data[begin..slot.begin].copy_from_slice(bytes);
        slot.begin = begin;
        Ok(())
    }

    /// Serialise directly after the data, at most `limit` bytes
    pub fn append_with<F>(&mut self, buffer: BufferId, limit: usize, write: F) -> Result<usize, Error>
    where
        F: FnOnce(&mut [u8]) -> Result<usize, zcl_data::Error>,
    {
        let slot = self.slot_mut(buffer)?;
        let start = slot.end;
        let available = (slot.data.len() - start).min(limit);
        let used = write(&mut slot.data[start..start + available])?;
        slot.end = start + used;
        Ok(used)
    }

    /// Drop `count` bytes from the front of the data
    pub fn cut_left(&mut self, buffer: BufferId, count: usize) -> Result<(), Error> {
        let slot = self.slot_mut(buffer)?;
        if count > slot.end - slot.begin {
            return Err(Error::NotEnoughSpace);
        }
        slot.begin += count;
        Ok(())
    }

    /// Number of valid bytes
    pub fn length(&self, buffer: BufferId) -> Result<usize, Error> {
        let slot = self.slot(buffer)?;
        Ok(slot.end - slot.begin)
    }

    /// Offset of the first valid byte
    pub fn begin(&self, buffer: BufferId) -> Result<usize, Error> {
        Ok(self.slot(buffer)?.begin)
    }

    /// Offset after the last valid byte
    pub fn end(&self, buffer: BufferId) -> Result<usize, Error> {
        Ok(self.slot(buffer)?.end)
    }

    /// Valid data of the buffer
    pub fn data(&self, buffer: BufferId) -> Result<&[u8], Error> {
        let slot = self.slot(buffer)?;
        Ok(&slot.data[slot.begin..slot.end])
    }

    /// Attach the parameters of the current stage
    pub fn set_context(&mut self, buffer: BufferId, context: StageContext) -> Result<(), Error> {
        self.slot_mut(buffer)?.context = context;
        Ok(())
    }

    /// Parameters of the current stage
    pub fn context(&self, buffer: BufferId) -> Result<&StageContext, Error> {
        Ok(&self.slot(buffer)?.context)
    }

    /// Detach the parameters, leaving the context empty
    pub fn take_context(&mut self, buffer: BufferId) -> Result<StageContext, Error> {
        let slot = self.slot_mut(buffer)?;
        Ok(core::mem::replace(&mut slot.context, StageContext::Empty))
    }

    /// Number of free buffers
    pub fn available(&self) -> usize {
        self.slots.iter().filter(|s| !s.allocated).count()
    }

    /// Total number of buffers
    pub fn capacity(&self) -> usize {
        self.slots.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn acquire_until_exhausted() {
        let mut pool = BufferPool::new(2, 64, 8);
        let a = pool.acquire().unwrap();
        let b = pool.acquire().unwrap();
        assert_ne!(a, b);
        assert_eq!(pool.available(), 0);
        assert_eq!(pool.acquire(), Err(Error::PoolExhausted));
        pool.release(a).unwrap();
        assert_eq!(pool.available(), 1);
        assert_eq!(pool.acquire().unwrap(), a);
        assert_eq!(pool.release(BufferId::new(7)), Err(Error::InvalidBuffer));
    }

    #[test]
    fn data_window() {
        let mut pool = BufferPool::new(1, 32, 4);
        let buffer = pool.acquire().unwrap();
        assert_eq!(pool.begin(buffer).unwrap(), 4);
        pool.append(buffer, &[1, 2, 3, 4, 5]).unwrap();
        pool.prepend(buffer, &[0xa0, 0xa1]).unwrap();
        assert_eq!(pool.data(buffer).unwrap(), &[0xa0, 0xa1, 1, 2, 3, 4, 5]);
        pool.cut_left(buffer, 3).unwrap();
        assert_eq!(pool.data(buffer).unwrap(), &[2, 3, 4, 5]);
        assert_eq!(pool.length(buffer).unwrap(), 4);
        assert_eq!(pool.end(buffer).unwrap(), 9);
        assert_eq!(pool.cut_left(buffer, 5), Err(Error::NotEnoughSpace));
        assert_eq!(pool.prepend(buffer, &[0; 8]), Err(Error::NotEnoughSpace));
        assert_eq!(pool.append(buffer, &[0; 24]), Err(Error::NotEnoughSpace));
    }

    #[test]
    fn headroom_only_on_empty_buffer() {
        let mut pool = BufferPool::new(1, 32, 4);
        let buffer = pool.acquire().unwrap();
        pool.reserve_headroom(buffer, 10).unwrap();
        assert_eq!(pool.begin(buffer).unwrap(), 10);
        pool.append(buffer, &[1]).unwrap();
        assert_eq!(pool.reserve_headroom(buffer, 2), Err(Error::NotEnoughSpace));
    }

    #[test]
    fn append_with_limit() {
        let mut pool = BufferPool::new(1, 32, 0);
        let buffer = pool.acquire().unwrap();
        let used = pool
            .append_with(buffer, 4, |data| {
                assert_eq!(data.len(), 4);
                data[0] = 0x55;
                Ok(1)
            })
            .unwrap();
        assert_eq!(used, 1);
        assert_eq!(pool.data(buffer).unwrap(), &[0x55]);
        let result = pool.append_with(buffer, 4, |_| Err(zcl_data::Error::NotEnoughSpace));
        assert_eq!(result, Err(Error::Data(zcl_data::Error::NotEnoughSpace)));
    }

    #[test]
    fn stage_context() {
        let mut pool = BufferPool::new(1, 32, 0);
        let buffer = pool.acquire().unwrap();
        assert_eq!(pool.context(buffer).unwrap(), &StageContext::Empty);
        let request = ApsDataRequest {
            destination: crate::transport::DestinationAddress::Group(1),
            destination_endpoint: 0xff,
            source_endpoint: 1,
            profile: 0x0104,
            cluster: 0x0006,
            options: crate::transport::TransmitOptions::empty(),
        };
        pool.set_context(buffer, StageContext::Outgoing(request.clone()))
            .unwrap();
        assert_eq!(
            pool.take_context(buffer).unwrap(),
            StageContext::Outgoing(request)
        );
        assert_eq!(pool.context(buffer).unwrap(), &StageContext::Empty);
    }
}
