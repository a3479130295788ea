//! Time cluster server
//!
//! The time is writable by peers only while the device is not a time master.

use zcl_data::cluster_library::time::{
    TimeStatus, ATTR_DST_END, ATTR_DST_SHIFT, ATTR_DST_START, ATTR_LAST_SET_TIME, ATTR_LOCAL_TIME,
    ATTR_STANDARD_TIME, ATTR_TIME, ATTR_TIME_STATUS, ATTR_TIME_ZONE, ATTR_VALID_UNTIL_TIME, CLUSTER,
    TIME_INVALID,
};
use zcl_data::cluster_library::{AttributeValue, ClusterLibraryStatus, ClusterRole};

use crate::core::Context;
use crate::handler::{ClusterHandler, WriteOrigin};
use crate::store::{Access, AttributeDefinition, ClusterDefinition};

/// Time server cluster, `status` gives the initial time status
pub fn server(status: TimeStatus) -> ClusterDefinition {
    ClusterDefinition::server(CLUSTER)
        .attribute(AttributeDefinition::new(
            ATTR_TIME,
            Access::READ | Access::WRITE_OPTIONAL,
            AttributeValue::UtcTime(TIME_INVALID),
        ))
        .attribute(AttributeDefinition::new(
            ATTR_TIME_STATUS,
            Access::RW,
            AttributeValue::Bitmap8(status.bits()),
        ))
        .attribute(AttributeDefinition::new(ATTR_TIME_ZONE, Access::RW, AttributeValue::Signed32(0)))
        .attribute(AttributeDefinition::new(ATTR_DST_START, Access::RW, AttributeValue::Unsigned32(0)))
        .attribute(AttributeDefinition::new(ATTR_DST_END, Access::RW, AttributeValue::Unsigned32(0)))
        .attribute(AttributeDefinition::new(ATTR_DST_SHIFT, Access::RW, AttributeValue::Signed32(0)))
        .attribute(AttributeDefinition::new(
            ATTR_STANDARD_TIME,
            Access::RO,
            AttributeValue::Unsigned32(TIME_INVALID),
        ))
        .attribute(AttributeDefinition::new(
            ATTR_LOCAL_TIME,
            Access::RO,
            AttributeValue::Unsigned32(TIME_INVALID),
        ))
        .attribute(AttributeDefinition::new(
            ATTR_LAST_SET_TIME,
            Access::RO,
            AttributeValue::UtcTime(TIME_INVALID),
        ))
        .attribute(AttributeDefinition::new(
            ATTR_VALID_UNTIL_TIME,
            Access::RW,
            AttributeValue::UtcTime(TIME_INVALID),
        ))
}

fn get(ctx: &Context, endpoint: u8, attribute: u16) -> Option<i64> {
    ctx.get_integer(endpoint, CLUSTER, ClusterRole::Server, attribute)
        .and_then(|v| i64::try_from(v).ok())
}

/// Time status of an endpoint
pub fn time_status(ctx: &Context, endpoint: u8) -> TimeStatus {
    get(ctx, endpoint, ATTR_TIME_STATUS)
        .and_then(|v| u8::try_from(v).ok())
        .map(TimeStatus::from_bits_retain)
        .unwrap_or_else(TimeStatus::empty)
}

/// Standard and local time for a UTC time
pub fn local_times(time: u32, zone: i64, dst_start: i64, dst_end: i64, dst_shift: i64) -> (u32, u32) {
    if time == TIME_INVALID {
        return (TIME_INVALID, TIME_INVALID);
    }
    let standard = i64::from(time) + zone;
    let utc = i64::from(time);
    let local = if dst_start < dst_end && (dst_start..dst_end).contains(&utc) {
        standard + dst_shift
    } else {
        standard
    };
    let clamp = |t: i64| u32::try_from(t.max(0)).unwrap_or(TIME_INVALID - 1);
    (clamp(standard), clamp(local))
}

fn refresh(ctx: &mut Context, endpoint: u8, time: u32) -> Result<(), ClusterLibraryStatus> {
    let (standard, local) = local_times(
        time,
        get(ctx, endpoint, ATTR_TIME_ZONE).unwrap_or(0),
        get(ctx, endpoint, ATTR_DST_START).unwrap_or(0),
        get(ctx, endpoint, ATTR_DST_END).unwrap_or(0),
        get(ctx, endpoint, ATTR_DST_SHIFT).unwrap_or(0),
    );
    for (attribute, value) in [(ATTR_STANDARD_TIME, standard), (ATTR_LOCAL_TIME, local)] {
        if ctx.has_attribute(endpoint, CLUSTER, ClusterRole::Server, attribute) {
            ctx.set(endpoint, CLUSTER, ClusterRole::Server, attribute, AttributeValue::Unsigned32(value))?;
        }
    }
    Ok(())
}

/// Time cluster server
pub struct TimeServer;

impl ClusterHandler for TimeServer {
    fn cluster(&self) -> u16 {
        CLUSTER
    }

    fn role(&self) -> ClusterRole {
        ClusterRole::Server
    }

    fn is_writable(&self, ctx: &Context, endpoint: u8, attribute: u16) -> Option<bool> {
        match attribute {
            ATTR_TIME => Some(time_status(ctx, endpoint).time_writable()),
            _ => None,
        }
    }

    fn write_hook(
        &self,
        ctx: &mut Context,
        endpoint: u8,
        attribute: u16,
        value: &AttributeValue,
        _manufacturer: Option<u16>,
        _origin: &WriteOrigin,
    ) {
        let result = match attribute {
            ATTR_TIME => {
                let time = match value {
                    AttributeValue::UtcTime(time) => *time,
                    _ => return,
                };
                let stamped = if ctx.has_attribute(endpoint, CLUSTER, ClusterRole::Server, ATTR_LAST_SET_TIME) {
                    ctx.set(
                        endpoint,
                        CLUSTER,
                        ClusterRole::Server,
                        ATTR_LAST_SET_TIME,
                        AttributeValue::UtcTime(time),
                    )
                } else {
                    Ok(())
                };
                stamped.and_then(|_| refresh(ctx, endpoint, time))
            }
            ATTR_TIME_ZONE | ATTR_DST_START | ATTR_DST_END | ATTR_DST_SHIFT => {
                let time = get(ctx, endpoint, ATTR_TIME)
                    .and_then(|t| u32::try_from(t).ok())
                    .unwrap_or(TIME_INVALID);
                refresh(ctx, endpoint, time)
            }
            _ => Ok(()),
        };
        if let Err(status) = result {
            log::warn!("Time of {} not updated, {:?}", endpoint, status);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn daylight_saving_shift() {
        assert_eq!(local_times(1000, 3600, 0, 0, 0), (4600, 4600));
        assert_eq!(local_times(1000, 3600, 500, 2000, 3600), (4600, 8200));
        assert_eq!(local_times(3000, 3600, 500, 2000, 3600), (6600, 6600));
        assert_eq!(local_times(TIME_INVALID, 3600, 0, 0, 0), (TIME_INVALID, TIME_INVALID));
    }
}
