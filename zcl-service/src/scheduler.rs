//! Cooperative scheduler
//!
//! Tasks are messages owning their parameters. Posted tasks run in FIFO
//! order, timed tasks join the FIFO when they are due. Time is a wrapping
//! millisecond counter supplied by the application.

use std::collections::VecDeque;

use zcl_data::cluster_library::ClusterRole;

use crate::transition::{ColorLoop, Move, MoveTo};

/// Work owned by a cluster handler
#[derive(Clone, Debug, PartialEq)]
pub enum ClusterJob {
    /// Transition towards a target value
    MoveTo(MoveTo),
    /// Continuous move at a rate
    Move(Move),
    /// Color loop rotation of the enhanced hue
    ColorLoop(ColorLoop),
    /// Send a zone status change notification, dropped when a newer change
    /// has been made
    ZoneNotify { generation: u32, delay: u16 },
    /// One second identify countdown
    IdentifyTick,
    /// 1/10 s on time and off wait time countdown
    TimedOffTick,
    /// Leave zone test mode
    TestModeEnd { generation: u32 },
}

/// Scheduled message
#[derive(Clone, Debug, PartialEq)]
pub enum Task {
    /// Run the reporting engine
    ReportingTick,
    /// Run a cluster job
    Cluster {
        endpoint: u8,
        cluster: u16,
        role: ClusterRole,
        job: ClusterJob,
    },
}

impl Task {
    /// Is the task a job of the cluster on the endpoint
    pub fn is_job_of(&self, endpoint: u8, cluster: u16) -> bool {
        match self {
            Task::Cluster {
                endpoint: e,
                cluster: c,
                ..
            } => *e == endpoint && *c == cluster,
            Task::ReportingTick => false,
        }
    }
}

struct Timer {
    due: u32,
    sequence: u64,
    task: Task,
}

/// Has the wrapping time `due` been reached at `now`
pub fn is_due(due: u32, now: u32) -> bool {
    (now.wrapping_sub(due) as i32) >= 0
}

/// Task queue with timers
#[derive(Default)]
pub struct Scheduler {
    queue: VecDeque<Task>,
    timers: Vec<Timer>,
    sequence: u64,
}

impl Scheduler {
    pub fn new() -> Self {
        Self::default()
    }

    /// Run `task` as soon as possible
    pub fn post(&mut self, task: Task) {
        self.queue.push_back(task);
    }

    /// Run `task` when the time reaches `due`
    pub fn post_at(&mut self, due: u32, task: Task) {
        self.sequence += 1;
        self.timers.push(Timer {
            due,
            sequence: self.sequence,
            task,
        });
    }

    /// Run `task` after `delay` milliseconds
    pub fn post_after(&mut self, now: u32, delay: u32, task: Task) {
        self.post_at(now.wrapping_add(delay), task);
    }

    /// Remove queued and timed tasks matching `predicate`, returns the number
    /// of removed tasks
    pub fn cancel<F>(&mut self, predicate: F) -> usize
    where
        F: Fn(&Task) -> bool,
    {
        let before = self.queue.len() + self.timers.len();
        self.queue.retain(|t| !predicate(t));
        self.timers.retain(|t| !predicate(&t.task));
        before - (self.queue.len() + self.timers.len())
    }

    /// Is any queued or timed task matching `predicate`
    pub fn contains<F>(&self, predicate: F) -> bool
    where
        F: Fn(&Task) -> bool,
    {
        self.queue.iter().any(&predicate) || self.timers.iter().any(|t| predicate(&t.task))
    }

    /// Next task to run at `now`
    pub fn next_ready(&mut self, now: u32) -> Option<Task> {
        self.promote(now);
        self.queue.pop_front()
    }

    // Move due timers to the queue, earliest first
    fn promote(&mut self, now: u32) {
        let mut due: Vec<Timer> = Vec::new();
        let mut n = 0;
        while n < self.timers.len() {
            if is_due(self.timers[n].due, now) {
                due.push(self.timers.swap_remove(n));
            } else {
                n += 1;
            }
        }
        due.sort_by_key(|t| (core::cmp::Reverse(now.wrapping_sub(t.due)), t.sequence));
        for timer in due {
            self.queue.push_back(timer.task);
        }
    }

    /// Milliseconds until the next timer, zero when work is queued, `None`
    /// when idle
    pub fn next_timeout(&self, now: u32) -> Option<u32> {
        if !self.queue.is_empty() {
            return Some(0);
        }
        self.timers
            .iter()
            .map(|t| {
                if is_due(t.due, now) {
                    0
                } else {
                    t.due.wrapping_sub(now)
                }
            })
            .min()
    }

    /// Number of queued and timed tasks
    pub fn pending(&self) -> usize {
        self.queue.len() + self.timers.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn job(endpoint: u8) -> Task {
        Task::Cluster {
            endpoint,
            cluster: 0x0003,
            role: ClusterRole::Server,
            job: ClusterJob::IdentifyTick,
        }
    }

    #[test]
    fn fifo_order() {
        let mut scheduler = Scheduler::new();
        scheduler.post(job(1));
        scheduler.post(Task::ReportingTick);
        scheduler.post(job(2));
        assert_eq!(scheduler.next_ready(0), Some(job(1)));
        assert_eq!(scheduler.next_ready(0), Some(Task::ReportingTick));
        assert_eq!(scheduler.next_ready(0), Some(job(2)));
        assert_eq!(scheduler.next_ready(0), None);
    }

    #[test]
    fn timers_fire_when_due() {
        let mut scheduler = Scheduler::new();
        scheduler.post_after(1000, 200, job(2));
        scheduler.post_after(1000, 100, job(1));
        assert_eq!(scheduler.next_timeout(1000), Some(100));
        assert_eq!(scheduler.next_ready(1050), None);
        assert_eq!(scheduler.next_timeout(1050), Some(50));
        assert_eq!(scheduler.next_ready(1250), Some(job(1)));
        assert_eq!(scheduler.next_ready(1250), Some(job(2)));
        assert_eq!(scheduler.next_timeout(1250), None);
    }

    #[test]
    fn timers_across_wrap() {
        let mut scheduler = Scheduler::new();
        scheduler.post_after(u32::MAX - 10, 20, job(1));
        assert_eq!(scheduler.next_ready(u32::MAX), None);
        assert_eq!(scheduler.next_ready(5), None);
        assert_eq!(scheduler.next_ready(9), Some(job(1)));
    }

    #[test]
    fn cancel_jobs() {
        let mut scheduler = Scheduler::new();
        scheduler.post(job(1));
        scheduler.post_after(0, 100, job(1));
        scheduler.post_after(0, 100, job(2));
        assert!(scheduler.contains(|t| t.is_job_of(1, 0x0003)));
        assert_eq!(scheduler.cancel(|t| t.is_job_of(1, 0x0003)), 2);
        assert!(!scheduler.contains(|t| t.is_job_of(1, 0x0003)));
        assert_eq!(scheduler.pending(), 1);
    }
}
