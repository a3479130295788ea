//! # Time Cluster
//!
//! Time is counted in seconds since 2000-01-01 00:00 UTC.

/// Time cluster
pub const CLUSTER: u16 = 0x000a;
/// Cluster revision declared when nothing else is configured
pub const CLUSTER_REVISION: u16 = 2;

/// Current time, UTC
pub const ATTR_TIME: u16 = 0x0000;
/// Time status bitmap
pub const ATTR_TIME_STATUS: u16 = 0x0001;
/// Offset to UTC in seconds
pub const ATTR_TIME_ZONE: u16 = 0x0002;
/// Start of daylight saving time
pub const ATTR_DST_START: u16 = 0x0003;
/// End of daylight saving time
pub const ATTR_DST_END: u16 = 0x0004;
/// Daylight saving time shift in seconds
pub const ATTR_DST_SHIFT: u16 = 0x0005;
/// Standard time
pub const ATTR_STANDARD_TIME: u16 = 0x0006;
/// Local time
pub const ATTR_LOCAL_TIME: u16 = 0x0007;
/// Time of the last write of the time attribute
pub const ATTR_LAST_SET_TIME: u16 = 0x0008;
/// Time until which the time is considered valid
pub const ATTR_VALID_UNTIL_TIME: u16 = 0x0009;

/// Time that has never been set
pub const TIME_INVALID: u32 = 0xffff_ffff;

bitflags! {
    /// Time status
    #[derive(Clone, Copy, Debug, PartialEq, Eq)]
    pub struct TimeStatus: u8 {
        /// The device is a time master, the time is not writable
        const MASTER = 0b0000_0001;
        /// The time is synchronised
        const SYNCHRONIZED = 0b0000_0010;
        /// The time zone and daylight saving attributes are master values
        const MASTER_ZONE_DST = 0b0000_0100;
        /// The time supersedes other time sources
        const SUPERSEDING = 0b0000_1000;
    }
}

impl TimeStatus {
    /// The time attribute is writable when the device is not a master
    pub fn time_writable(self) -> bool {
        !self.contains(TimeStatus::MASTER)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn writable() {
        assert!(TimeStatus::empty().time_writable());
        assert!(TimeStatus::SYNCHRONIZED.time_writable());
        assert!(!(TimeStatus::MASTER | TimeStatus::SYNCHRONIZED).time_writable());
    }
}
