//! Time based state machines
//!
//! Move, move to and color loop transitions of level and color attributes.
//! Each state machine is a message owning its parameters, scheduled every
//! transition tick until it is done or superseded. A newer command for the
//! same cluster bumps the generation of the cluster, older messages notice
//! it on their next tick and stop.

use std::collections::HashMap;

use zcl_data::cluster_library::{ClusterLibraryStatus, ClusterRole};

use crate::core::Context;
use crate::scheduler::{ClusterJob, Task};

/// Generation slot used by the transitions of a cluster
pub const TRANSITION_SLOT: u16 = 0xffff;

/// Modulus of an 8-bit hue, 0 to 254
pub const HUE_MODULUS: i64 = 255;
/// Modulus of an enhanced hue
pub const ENHANCED_HUE_MODULUS: i64 = 65536;

/// Direction of a hue transition
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum HueWay {
    Shortest,
    Longest,
    Up,
    Down,
}

/// Signed distance from `current` to `target` on a circle of `modulus`
pub fn hue_delta(current: i64, target: i64, way: HueWay, modulus: i64) -> i64 {
    let difference = (target - current).rem_euclid(modulus);
    if difference == 0 {
        return 0;
    }
    let half = modulus / 2;
    match way {
        HueWay::Shortest if difference <= half => difference,
        HueWay::Shortest => difference - modulus,
        HueWay::Longest if difference > half => difference,
        HueWay::Longest => difference - modulus,
        HueWay::Up => difference,
        HueWay::Down => difference - modulus,
    }
}

/// Result of one state machine tick
#[derive(Clone, Debug, PartialEq)]
pub struct Progress {
    /// New values of the moved attributes
    pub values: Vec<(u16, i64)>,
    /// Remaining time in 1/10 s
    pub remaining: Option<u16>,
    pub finished: bool,
}

/// Attribute moving towards a target
#[derive(Clone, Debug, PartialEq)]
pub struct MoveToChannel {
    pub attribute: u16,
    pub start: i64,
    /// Signed distance to the target
    pub delta: i64,
    /// Values wrap around at this modulus
    pub modulus: Option<i64>,
}

impl MoveToChannel {
    pub fn new(attribute: u16, start: i64, target: i64) -> Self {
        Self {
            attribute,
            start,
            delta: target - start,
            modulus: None,
        }
    }

    /// Channel on a circle, moving `delta` from `start`
    pub fn circular(attribute: u16, start: i64, delta: i64, modulus: i64) -> Self {
        Self {
            attribute,
            start,
            delta,
            modulus: Some(modulus),
        }
    }

    fn value_at(&self, elapsed: u32, duration: u32) -> i64 {
        let moved = if duration == 0 || elapsed >= duration {
            self.delta
        } else {
            self.delta * i64::from(elapsed) / i64::from(duration)
        };
        let value = self.start + moved;
        match self.modulus {
            Some(modulus) => value.rem_euclid(modulus),
            None => value,
        }
    }
}

/// Linear transition over a fixed time
#[derive(Clone, Debug, PartialEq)]
pub struct MoveTo {
    pub generation: u32,
    pub channels: Vec<MoveToChannel>,
    pub start_time: u32,
    pub duration_ms: u32,
    /// Turn the on/off cluster off when done
    pub off_when_done: bool,
}

impl MoveTo {
    pub fn new(generation: u32, start_time: u32, transition_time: u16) -> Self {
        Self {
            generation,
            channels: Vec::new(),
            start_time,
            duration_ms: u32::from(transition_time) * 100,
            off_when_done: false,
        }
    }

    pub fn channel(mut self, channel: MoveToChannel) -> Self {
        self.channels.push(channel);
        self
    }

    /// Values at `now`
    pub fn progress(&self, now: u32) -> Progress {
        let elapsed = now.wrapping_sub(self.start_time).min(self.duration_ms);
        let values = self
            .channels
            .iter()
            .map(|c| (c.attribute, c.value_at(elapsed, self.duration_ms)))
            .collect();
        let left = self.duration_ms - elapsed;
        Progress {
            values,
            remaining: Some(((left + 99) / 100).min(0xfffe) as u16),
            finished: left == 0,
        }
    }
}

/// Attribute moving at a rate
#[derive(Clone, Debug, PartialEq)]
pub struct MoveChannel {
    pub attribute: u16,
    pub value: i64,
    /// Units per second, signed
    pub rate: i64,
    pub minimum: i64,
    pub maximum: i64,
    /// Wrap from maximum to minimum instead of stopping
    pub wrap: bool,
    /// Carry of unit fractions, in 1/1000 units
    pub remainder: i64,
}

impl MoveChannel {
    pub fn new(attribute: u16, value: i64, rate: i64, minimum: i64, maximum: i64) -> Self {
        Self {
            attribute,
            value,
            rate,
            minimum,
            maximum,
            wrap: false,
            remainder: 0,
        }
    }

    pub fn wrapping(mut self) -> Self {
        self.wrap = true;
        self
    }

    /// Advance by `elapsed` milliseconds, returns true when a limit was hit
    fn advance(&mut self, elapsed: u32) -> bool {
        if self.rate == 0 {
            return true;
        }
        let total = self.rate * i64::from(elapsed) + self.remainder;
        let step = total / 1000;
        self.remainder = total % 1000;
        let value = self.value + step;
        if self.wrap {
            let modulus = self.maximum - self.minimum + 1;
            self.value = self.minimum + (value - self.minimum).rem_euclid(modulus);
            return false;
        }
        if value >= self.maximum && self.rate > 0 {
            self.value = self.maximum;
            true
        } else if value <= self.minimum && self.rate < 0 {
            self.value = self.minimum;
            true
        } else {
            self.value = value;
            false
        }
    }
}

/// Continuous move until a limit is reached or the move is stopped
#[derive(Clone, Debug, PartialEq)]
pub struct Move {
    pub generation: u32,
    pub channels: Vec<MoveChannel>,
    pub last: u32,
    /// Turn the on/off cluster off when the minimum is reached
    pub off_when_done: bool,
}

impl Move {
    pub fn new(generation: u32, now: u32) -> Self {
        Self {
            generation,
            channels: Vec::new(),
            last: now,
            off_when_done: false,
        }
    }

    pub fn channel(mut self, channel: MoveChannel) -> Self {
        self.channels.push(channel);
        self
    }

    /// Move the channels to `now`
    pub fn advance(&mut self, now: u32) -> Progress {
        let elapsed = now.wrapping_sub(self.last);
        self.last = now;
        let mut finished = true;
        for channel in self.channels.iter_mut() {
            if !channel.advance(elapsed) {
                finished = false;
            }
        }
        Progress {
            values: self.channels.iter().map(|c| (c.attribute, c.value)).collect(),
            remaining: None,
            finished,
        }
    }
}

/// Rotation of the enhanced hue
#[derive(Clone, Debug, PartialEq)]
pub struct ColorLoop {
    pub generation: u32,
    pub start_time: u32,
    pub start_hue: u16,
    pub increment: bool,
    /// Seconds per full loop
    pub time: u16,
}

impl ColorLoop {
    /// Enhanced hue at `now`
    pub fn hue_at(&self, now: u32) -> u16 {
        if self.time == 0 {
            return self.start_hue;
        }
        let elapsed = u64::from(now.wrapping_sub(self.start_time));
        let moved = (elapsed * ENHANCED_HUE_MODULUS as u64 / (u64::from(self.time) * 1000))
            % ENHANCED_HUE_MODULUS as u64;
        let hue = if self.increment {
            u64::from(self.start_hue) + moved
        } else {
            u64::from(self.start_hue) + ENHANCED_HUE_MODULUS as u64 - moved
        };
        (hue % ENHANCED_HUE_MODULUS as u64) as u16
    }
}

/// Generation counters per endpoint, cluster and slot
#[derive(Clone, Debug, Default)]
pub struct Generations {
    counters: HashMap<(u8, u16, u16), u32>,
}

impl Generations {
    /// Start a new generation, invalidating older ones
    pub fn begin(&mut self, endpoint: u8, cluster: u16, slot: u16) -> u32 {
        let counter = self.counters.entry((endpoint, cluster, slot)).or_insert(0);
        *counter = counter.wrapping_add(1);
        *counter
    }

    pub fn is_current(&self, endpoint: u8, cluster: u16, slot: u16, generation: u32) -> bool {
        self.counters.get(&(endpoint, cluster, slot)).copied().unwrap_or(0) == generation
    }

    /// Invalidate every generation of the cluster
    pub fn cancel(&mut self, endpoint: u8, cluster: u16) {
        for ((e, c, _), counter) in self.counters.iter_mut() {
            if *e == endpoint && *c == cluster {
                *counter = counter.wrapping_add(1);
            }
        }
    }
}

/// Stop the transitions of a cluster and start a new generation
pub fn restart(ctx: &mut Context, endpoint: u8, cluster: u16) -> u32 {
    cancel(ctx, endpoint, cluster);
    ctx.core.generations.begin(endpoint, cluster, TRANSITION_SLOT)
}

/// Stop the transitions of a cluster
pub fn cancel(ctx: &mut Context, endpoint: u8, cluster: u16) {
    let now = ctx.now();
    let removed = ctx.core.scheduler.cancel(|t| match t {
        Task::Cluster {
            endpoint: e,
            cluster: c,
            job,
            ..
        } => {
            *e == endpoint
                && *c == cluster
                && matches!(
                    job,
                    ClusterJob::Move(_) | ClusterJob::MoveTo(_) | ClusterJob::ColorLoop(_)
                )
        }
        Task::ReportingTick => false,
    });
    ctx.core.generations.begin(endpoint, cluster, TRANSITION_SLOT);
    if removed > 0 {
        log::debug!(
            "{:08} Stopped {} transitions of {:04x} on {}",
            now,
            removed,
            cluster,
            endpoint
        );
    }
}

/// Schedule the next tick of a transition
pub fn schedule(ctx: &mut Context, endpoint: u8, cluster: u16, role: ClusterRole, job: ClusterJob) {
    let delay = ctx.core.config.transition_tick_ms;
    ctx.schedule_job(endpoint, cluster, role, delay, job);
}

/// Write the values of a tick
pub fn apply(
    ctx: &mut Context,
    endpoint: u8,
    cluster: u16,
    role: ClusterRole,
    progress: &Progress,
    remaining_attribute: Option<u16>,
) -> Result<(), ClusterLibraryStatus> {
    for (attribute, value) in progress.values.iter() {
        ctx.set_integer(endpoint, cluster, role, *attribute, i128::from(*value))?;
    }
    if let (Some(attribute), Some(remaining)) = (remaining_attribute, progress.remaining) {
        if ctx.has_attribute(endpoint, cluster, role, attribute) {
            ctx.set_integer(endpoint, cluster, role, attribute, i128::from(remaining))?;
        }
    }
    Ok(())
}

/// Run one tick of a transition job, returns the progress made, `None` when
/// the job was superseded
pub fn run(
    ctx: &mut Context,
    endpoint: u8,
    cluster: u16,
    role: ClusterRole,
    job: ClusterJob,
    remaining_attribute: Option<u16>,
) -> Option<Progress> {
    let now = ctx.now();
    let (progress, next) = match job {
        ClusterJob::MoveTo(transition) => {
            if !ctx
                .core
                .generations
                .is_current(endpoint, cluster, TRANSITION_SLOT, transition.generation)
            {
                return None;
            }
            let progress = transition.progress(now);
            (progress, ClusterJob::MoveTo(transition))
        }
        ClusterJob::Move(mut transition) => {
            if !ctx
                .core
                .generations
                .is_current(endpoint, cluster, TRANSITION_SLOT, transition.generation)
            {
                return None;
            }
            let progress = transition.advance(now);
            (progress, ClusterJob::Move(transition))
        }
        ClusterJob::ColorLoop(rotation) => {
            if !ctx
                .core
                .generations
                .is_current(endpoint, cluster, TRANSITION_SLOT, rotation.generation)
            {
                return None;
            }
            let hue = rotation.hue_at(now);
            let progress = Progress {
                values: vec![(
                    zcl_data::cluster_library::color_control::ATTR_ENHANCED_CURRENT_HUE,
                    i64::from(hue),
                )],
                remaining: None,
                finished: false,
            };
            (progress, ClusterJob::ColorLoop(rotation))
        }
        _ => return None,
    };
    log::trace!(
        "{:08} Transition {:04x} on {} {:?}",
        now,
        cluster,
        endpoint,
        progress.values
    );
    if let Err(status) = apply(ctx, endpoint, cluster, role, &progress, remaining_attribute) {
        log::warn!(
            "Transition of {:04x} on {} stopped, {:?}",
            cluster,
            endpoint,
            status
        );
        return Some(Progress {
            finished: true,
            ..progress
        });
    }
    if !progress.finished {
        schedule(ctx, endpoint, cluster, role, next);
    }
    Some(progress)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn hue_directions() {
        assert_eq!(hue_delta(32, 128, HueWay::Shortest, HUE_MODULUS), 96);
        assert_eq!(hue_delta(32, 128, HueWay::Longest, HUE_MODULUS), 96 - 255);
        assert_eq!(hue_delta(200, 10, HueWay::Shortest, HUE_MODULUS), 65);
        assert_eq!(hue_delta(200, 10, HueWay::Up, HUE_MODULUS), 65);
        assert_eq!(hue_delta(200, 10, HueWay::Down, HUE_MODULUS), -190);
        assert_eq!(hue_delta(10, 10, HueWay::Longest, HUE_MODULUS), 0);
        assert_eq!(hue_delta(0, 0x8000, HueWay::Shortest, ENHANCED_HUE_MODULUS), 0x8000);
    }

    #[test]
    fn move_to_is_linear() {
        let transition = MoveTo::new(1, 1000, 10).channel(MoveToChannel::new(0, 32, 128));
        let mut previous = 32;
        for tick in 1..=10u32 {
            let progress = transition.progress(1000 + tick * 100);
            let value = progress.values[0].1;
            assert!(value >= previous);
            previous = value;
            assert_eq!(progress.remaining, Some((10 - tick) as u16));
            assert_eq!(progress.finished, tick == 10);
        }
        assert_eq!(previous, 128);
        let progress = transition.progress(1000 + 150);
        assert_eq!(progress.values[0].1, 32 + 96 * 150 / 1000);
        assert_eq!(progress.remaining, Some(9));
    }

    #[test]
    fn move_to_wraps() {
        let transition = MoveTo::new(1, 0, 4).channel(MoveToChannel::circular(
            0,
            250,
            hue_delta(250, 5, HueWay::Shortest, HUE_MODULUS),
            HUE_MODULUS,
        ));
        assert_eq!(transition.progress(200).values[0].1, 252);
        assert_eq!(transition.progress(400).values[0].1, 5);
    }

    #[test]
    fn zero_time_finishes_at_once() {
        let transition = MoveTo::new(1, 0, 0).channel(MoveToChannel::new(0, 10, 20));
        let progress = transition.progress(0);
        assert!(progress.finished);
        assert_eq!(progress.values, vec![(0, 20)]);
        assert_eq!(progress.remaining, Some(0));
    }

    #[test]
    fn move_stops_at_limit() {
        let mut transition = Move::new(1, 0).channel(MoveChannel::new(0, 250, 30, 1, 254));
        let progress = transition.advance(100);
        assert_eq!(progress.values, vec![(0, 253)]);
        assert!(!progress.finished);
        let progress = transition.advance(200);
        assert_eq!(progress.values, vec![(0, 254)]);
        assert!(progress.finished);
    }

    #[test]
    fn move_carries_fractions() {
        let mut transition = Move::new(1, 0).channel(MoveChannel::new(0, 100, -5, 0, 254));
        for tick in 1..=10u32 {
            transition.advance(tick * 100);
        }
        assert_eq!(transition.channels[0].value, 95);
    }

    #[test]
    fn move_wraps_hue() {
        let mut transition =
            Move::new(1, 0).channel(MoveChannel::new(0, 250, 100, 0, 254).wrapping());
        let progress = transition.advance(100);
        assert_eq!(progress.values, vec![(0, 5)]);
        assert!(!progress.finished);
    }

    #[test]
    fn color_loop_rotation() {
        let rotation = ColorLoop {
            generation: 1,
            start_time: 0,
            start_hue: 0x1000,
            increment: true,
            time: 4,
        };
        assert_eq!(rotation.hue_at(0), 0x1000);
        assert_eq!(rotation.hue_at(1000), 0x5000);
        assert_eq!(rotation.hue_at(4000), 0x1000);
        let rotation = ColorLoop {
            increment: false,
            ..rotation
        };
        assert_eq!(rotation.hue_at(1000), 0xd000);
    }

    #[test]
    fn generations() {
        let mut generations = Generations::default();
        let first = generations.begin(1, 0x0008, TRANSITION_SLOT);
        assert!(generations.is_current(1, 0x0008, TRANSITION_SLOT, first));
        let second = generations.begin(1, 0x0008, TRANSITION_SLOT);
        assert!(!generations.is_current(1, 0x0008, TRANSITION_SLOT, first));
        generations.cancel(1, 0x0008);
        assert!(!generations.is_current(1, 0x0008, TRANSITION_SLOT, second));
        assert!(generations.is_current(2, 0x0008, TRANSITION_SLOT, 0));
    }
}
