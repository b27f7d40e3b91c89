//! Rest countdown between consecutive series

use std::time::{Duration, Instant};

use tracing::debug;

const TICK: Duration = Duration::from_secs(1);

/// Time source for the rest timer
pub trait Clock {
    fn now(&self) -> Instant;
}

#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> Instant {
        Instant::now()
    }
}

/// Result of advancing the timer by one second
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TimerEvent {
    /// Nothing is counting down
    Idle,
    Ticked { remaining: u32 },
    /// Reached zero and cleared itself
    Finished,
}

/// Single one-second-resolution countdown.
///
/// Starting while running replaces the current countdown. The timer never
/// gates anything; it is display state owned by the controller.
#[derive(Debug)]
pub struct RestTimer<C = SystemClock> {
    clock: C,
    remaining: u32,
    last_tick: Option<Instant>,
}

impl Default for RestTimer<SystemClock> {
    fn default() -> Self {
        Self::new(SystemClock)
    }
}

impl<C: Clock> RestTimer<C> {
    pub fn new(clock: C) -> Self {
        Self {
            clock,
            remaining: 0,
            last_tick: None,
        }
    }

    pub fn start(&mut self, seconds: u32) {
        if seconds == 0 {
            self.clear();
            return;
        }
        debug!("Rest timer started: {}s", seconds);
        self.remaining = seconds;
        self.last_tick = Some(self.clock.now());
    }

    pub fn tick(&mut self) -> TimerEvent {
        if self.remaining == 0 {
            return TimerEvent::Idle;
        }

        self.remaining -= 1;
        if self.remaining == 0 {
            self.last_tick = None;
            debug!("Rest timer finished");
            return TimerEvent::Finished;
        }

        if let Some(last) = self.last_tick.as_mut() {
            *last += TICK;
        }
        TimerEvent::Ticked {
            remaining: self.remaining,
        }
    }

    /// Apply every whole second elapsed on the clock since the last tick.
    /// Returns the last event produced, `Idle` when nothing was due.
    pub fn poll(&mut self) -> TimerEvent {
        let mut event = TimerEvent::Idle;
        while let Some(last) = self.last_tick {
            if self.clock.now().saturating_duration_since(last) < TICK {
                break;
            }
            event = self.tick();
        }
        event
    }

    /// User skipped the rest
    pub fn skip(&mut self) {
        if self.is_running() {
            debug!("Rest skipped with {}s left", self.remaining);
        }
        self.clear();
    }

    pub fn clear(&mut self) {
        self.remaining = 0;
        self.last_tick = None;
    }

    pub fn remaining(&self) -> u32 {
        self.remaining
    }

    pub fn is_running(&self) -> bool {
        self.remaining > 0
    }
}

/// Render seconds as `m:ss`
pub fn format_rest(seconds: u32) -> String {
    format!("{}:{:02}", seconds / 60, seconds % 60)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::Cell;
    use std::rc::Rc;

    #[derive(Clone)]
    struct ManualClock(Rc<Cell<Instant>>);

    impl ManualClock {
        fn new() -> Self {
            Self(Rc::new(Cell::new(Instant::now())))
        }

        fn advance(&self, secs: u64) {
            self.0.set(self.0.get() + Duration::from_secs(secs));
        }
    }

    impl Clock for ManualClock {
        fn now(&self) -> Instant {
            self.0.get()
        }
    }

    #[test]
    fn test_runs_exactly_s_ticks() {
        let mut timer = RestTimer::default();
        timer.start(3);

        assert_eq!(timer.tick(), TimerEvent::Ticked { remaining: 2 });
        assert_eq!(timer.tick(), TimerEvent::Ticked { remaining: 1 });
        assert_eq!(timer.tick(), TimerEvent::Finished);
        assert!(!timer.is_running());
        assert_eq!(timer.tick(), TimerEvent::Idle);
    }

    #[test]
    fn test_skip_stops_immediately() {
        let mut timer = RestTimer::default();
        timer.start(90);
        timer.tick();

        timer.skip();
        assert_eq!(timer.remaining(), 0);
        assert_eq!(timer.tick(), TimerEvent::Idle);
    }

    #[test]
    fn test_start_replaces_running_countdown() {
        let mut timer = RestTimer::default();
        timer.start(90);
        timer.tick();
        timer.start(30);
        assert_eq!(timer.remaining(), 30);
    }

    #[test]
    fn test_start_zero_is_noop() {
        let mut timer = RestTimer::default();
        timer.start(0);
        assert!(!timer.is_running());
    }

    #[test]
    fn test_poll_follows_clock() {
        let clock = ManualClock::new();
        let mut timer = RestTimer::new(clock.clone());
        timer.start(5);

        assert_eq!(timer.poll(), TimerEvent::Idle);
        clock.advance(2);
        assert_eq!(timer.poll(), TimerEvent::Ticked { remaining: 3 });
        clock.advance(10);
        assert_eq!(timer.poll(), TimerEvent::Finished);
        assert_eq!(timer.poll(), TimerEvent::Idle);
    }

    #[test]
    fn test_poll_after_skip_leaks_no_ticks() {
        let clock = ManualClock::new();
        let mut timer = RestTimer::new(clock.clone());
        timer.start(5);
        timer.skip();
        clock.advance(3);
        assert_eq!(timer.poll(), TimerEvent::Idle);
        assert_eq!(timer.remaining(), 0);
    }

    #[test]
    fn test_format_rest() {
        assert_eq!(format_rest(90), "1:30");
        assert_eq!(format_rest(5), "0:05");
    }
}
