use crate::types::TimeStamp;
use chrono::Duration;
use std::cell::Cell;

pub trait Clock {
    fn now(&self) -> TimeStamp;
}

#[derive(Debug, Default, Clone, Copy)]
pub struct SystemClock;

/// Clock that only moves when told to. Handy for reproducible timelines.
#[derive(Debug)]
pub struct ManualClock {
    current: Cell<TimeStamp>,
}

impl Clock for SystemClock {
    fn now(&self) -> TimeStamp {
        TimeStamp::new()
    }
}

impl ManualClock {
    pub fn new(start: TimeStamp) -> Self {
        Self {
            current: Cell::new(start),
        }
    }

    pub fn advance(&self, by: Duration) {
        let next = self.current.get().to_datetime_utc() + by;
        self.current.set(next.into());
    }
}

impl Clock for ManualClock {
    fn now(&self) -> TimeStamp {
        self.current.get()
    }
}

impl<C: Clock + ?Sized> Clock for &C {
    fn now(&self) -> TimeStamp {
        (**self).now()
    }
}
