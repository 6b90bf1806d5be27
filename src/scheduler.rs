//! Frame callbacks and timers on a single cooperative clock.
//!
//! Nothing here runs on its own. The host advances the clock, pops due timer
//! tasks one at a time and drains the frame callbacks registered for the
//! current display frame. Handlers that request a new frame land in the next
//! display frame, which is what makes the per-frame update chains loops.

use std::time::Duration;

/// Who gets called back on the next display frame.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FrameTarget {
    Fireworks,
    Confetti,
}

/// Work carried by a timer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Task {
    /// First birthday check after the startup delay.
    InitialCheck,
    /// Once-a-minute birthday check.
    PeriodicCheck,
    /// Finite celebration duration elapsed.
    StopCelebration,
    /// Delayed restart after a resume.
    RestartCelebration,
    /// Next confetti burst.
    ConfettiBurst,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct FrameHandle(u64);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct TimerHandle(u64);

#[derive(Debug)]
struct Timer {
    id: u64,
    due: Duration,
    period: Option<Duration>,
    task: Task,
}

#[derive(Debug, Default)]
pub struct Scheduler {
    now: Duration,
    next_id: u64,
    frames: Vec<(FrameHandle, FrameTarget)>,
    timers: Vec<Timer>,
}

impl Scheduler {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn now(&self) -> Duration {
        self.now
    }

    fn next_id(&mut self) -> u64 {
        self.next_id += 1;
        self.next_id
    }

    pub fn request_frame(&mut self, target: FrameTarget) -> FrameHandle {
        let handle = FrameHandle(self.next_id());
        self.frames.push((handle, target));
        handle
    }

    pub fn cancel_frame(&mut self, handle: FrameHandle) {
        self.frames.retain(|(h, _)| *h != handle);
    }

    /// Drains every callback registered before this display frame.
    pub fn take_frames(&mut self) -> Vec<FrameTarget> {
        self.frames.drain(..).map(|(_, target)| target).collect()
    }

    pub fn pending_frames(&self, target: FrameTarget) -> usize {
        self.frames.iter().filter(|(_, t)| *t == target).count()
    }

    pub fn set_timeout(&mut self, delay: Duration, task: Task) -> TimerHandle {
        self.push_timer(delay, None, task)
    }

    pub fn set_interval(&mut self, period: Duration, task: Task) -> TimerHandle {
        // A zero period would fire forever within one pop_due loop.
        let period = period.max(Duration::from_millis(1));
        self.push_timer(period, Some(period), task)
    }

    fn push_timer(&mut self, delay: Duration, period: Option<Duration>, task: Task) -> TimerHandle {
        let id = self.next_id();
        self.timers.push(Timer {
            id,
            due: self.now + delay,
            period,
            task,
        });
        TimerHandle(id)
    }

    pub fn cancel_timer(&mut self, handle: TimerHandle) {
        self.timers.retain(|t| t.id != handle.0);
    }

    pub fn pending_timers(&self, task: Task) -> usize {
        self.timers.iter().filter(|t| t.task == task).count()
    }

    /// Pops the earliest timer due at or before `until`, moving the clock to
    /// its due time. Ties fire in creation order.
    pub fn pop_due(&mut self, until: Duration) -> Option<Task> {
        let index = self
            .timers
            .iter()
            .enumerate()
            .filter(|(_, t)| t.due <= until)
            .min_by_key(|(_, t)| (t.due, t.id))
            .map(|(i, _)| i)?;

        let due = self.timers[index].due;
        let task = self.timers[index].task;
        match self.timers[index].period {
            Some(period) => self.timers[index].due += period,
            None => {
                self.timers.remove(index);
            }
        }
        self.now = self.now.max(due);
        Some(task)
    }

    /// Moves the clock forward. The clock never runs backwards.
    pub fn advance(&mut self, until: Duration) {
        self.now = self.now.max(until);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn ms(n: u64) -> Duration {
        Duration::from_millis(n)
    }

    #[test]
    fn timers_fire_in_due_order() {
        let mut sched = Scheduler::new();
        sched.set_timeout(ms(500), Task::RestartCelebration);
        sched.set_timeout(ms(100), Task::InitialCheck);
        sched.set_timeout(ms(100), Task::ConfettiBurst);

        assert_eq!(sched.pop_due(ms(1000)), Some(Task::InitialCheck));
        assert_eq!(sched.now(), ms(100));
        assert_eq!(sched.pop_due(ms(1000)), Some(Task::ConfettiBurst));
        assert_eq!(sched.pop_due(ms(1000)), Some(Task::RestartCelebration));
        assert_eq!(sched.pop_due(ms(1000)), None);
    }

    #[test]
    fn interval_rearms_itself() {
        let mut sched = Scheduler::new();
        sched.set_interval(ms(60_000), Task::PeriodicCheck);

        assert_eq!(sched.pop_due(ms(59_999)), None);
        assert_eq!(sched.pop_due(ms(120_000)), Some(Task::PeriodicCheck));
        assert_eq!(sched.pop_due(ms(120_000)), Some(Task::PeriodicCheck));
        assert_eq!(sched.pop_due(ms(120_000)), None);
        assert_eq!(sched.pending_timers(Task::PeriodicCheck), 1);
    }

    #[test]
    fn cancelled_timer_never_fires() {
        let mut sched = Scheduler::new();
        let handle = sched.set_timeout(ms(10), Task::StopCelebration);
        sched.cancel_timer(handle);
        sched.cancel_timer(handle);
        assert_eq!(sched.pop_due(ms(100)), None);
    }

    #[test]
    fn frames_requested_during_a_frame_wait_for_the_next_one() {
        let mut sched = Scheduler::new();
        sched.request_frame(FrameTarget::Fireworks);
        let drained = sched.take_frames();
        assert_eq!(drained, vec![FrameTarget::Fireworks]);

        sched.request_frame(FrameTarget::Fireworks);
        assert_eq!(sched.pending_frames(FrameTarget::Fireworks), 1);
        assert_eq!(sched.pending_frames(FrameTarget::Confetti), 0);
    }

    #[test]
    fn cancel_frame_removes_only_that_callback() {
        let mut sched = Scheduler::new();
        let a = sched.request_frame(FrameTarget::Fireworks);
        sched.request_frame(FrameTarget::Confetti);
        sched.cancel_frame(a);
        assert_eq!(sched.take_frames(), vec![FrameTarget::Confetti]);
    }

    proptest! {
        #[test]
        fn clock_is_monotonic(steps in prop::collection::vec(0u64..5_000, 1..50)) {
            let mut sched = Scheduler::new();
            sched.set_interval(ms(700), Task::PeriodicCheck);
            sched.set_timeout(ms(1_500), Task::StopCelebration);
            let mut last = sched.now();
            for step in steps {
                let until = sched.now() + ms(step);
                while sched.pop_due(until).is_some() {
                    prop_assert!(sched.now() >= last);
                    last = sched.now();
                }
                sched.advance(until);
                prop_assert!(sched.now() >= last);
                last = sched.now();
            }
        }
    }
}
