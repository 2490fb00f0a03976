//! Event Scheduler
//!
//! A binary-heap event queue keyed by virtual timestamp. Events scheduled
//! for the same instant run in the order they were scheduled. The queue is
//! strictly single-threaded; callbacks may schedule further events while
//! running.

use crate::time::SimTime;
use std::cell::RefCell;
use std::cmp::{Ordering, Reverse};
use std::collections::BinaryHeap;
use std::rc::Rc;
use std::time::Duration;
use tracing::trace;

type Action = Box<dyn FnOnce()>;

struct Event {
    at: SimTime,
    seq: u64,
    action: Action,
}

impl PartialEq for Event {
    fn eq(&self, other: &Self) -> bool {
        self.at == other.at && self.seq == other.seq
    }
}

impl Eq for Event {}

impl PartialOrd for Event {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for Event {
    fn cmp(&self, other: &Self) -> Ordering {
        // Timestamp first, insertion sequence as the tie-breaker
        self.at.cmp(&other.at).then(self.seq.cmp(&other.seq))
    }
}

struct Queue {
    now: SimTime,
    next_seq: u64,
    events: BinaryHeap<Reverse<Event>>,
    stop_at: Option<SimTime>,
}

/// Single-threaded virtual-time event scheduler.
///
/// Handles are `Rc<Simulator>`; components keep a clone and schedule
/// closures that capture `Rc<RefCell<_>>` handles to their peers. Dropping
/// the simulator drops every pending closure, which is how scheduled-ahead
/// events are superseded on teardown.
pub struct Simulator {
    queue: RefCell<Queue>,
}

impl Simulator {
    /// Create a scheduler with the clock at zero
    pub fn new() -> Rc<Self> {
        Rc::new(Self {
            queue: RefCell::new(Queue {
                now: SimTime::ZERO,
                next_seq: 0,
                events: BinaryHeap::new(),
                stop_at: None,
            }),
        })
    }

    /// Current virtual time
    pub fn now(&self) -> SimTime {
        self.queue.borrow().now
    }

    /// Schedule `action` to run `delay` after the current virtual time
    pub fn schedule(&self, delay: Duration, action: impl FnOnce() + 'static) {
        let at = self.now() + delay;
        self.schedule_at(at, action);
    }

    /// Schedule `action` at the current virtual time, after all events
    /// already queued for this instant
    pub fn schedule_now(&self, action: impl FnOnce() + 'static) {
        self.schedule_at(self.now(), action);
    }

    /// Schedule `action` at an absolute virtual time.
    ///
    /// `at` must not precede the current time; the event queue only moves
    /// forward.
    pub fn schedule_at(&self, at: SimTime, action: impl FnOnce() + 'static) {
        let mut queue = self.queue.borrow_mut();
        assert!(at >= queue.now, "event scheduled in the past: {at} < {}", queue.now);
        let seq = queue.next_seq;
        queue.next_seq += 1;
        trace!("Scheduling event #{} at {}", seq, at);
        queue.events.push(Reverse(Event {
            at,
            seq,
            action: Box::new(action),
        }));
    }

    /// Do not execute events scheduled after `at`; `run` returns once the
    /// next pending event lies beyond it
    pub fn stop_at(&self, at: SimTime) {
        self.queue.borrow_mut().stop_at = Some(at);
    }

    /// Run events in timestamp order until the queue is empty or the stop
    /// time is reached
    pub fn run(&self) {
        loop {
            // The queue borrow is released before the action runs so the
            // callback can schedule follow-up events.
            let event = {
                let mut queue = self.queue.borrow_mut();
                let stop = queue.stop_at;
                match queue.events.peek() {
                    None => break,
                    Some(Reverse(head)) => {
                        if stop.is_some_and(|stop| head.at > stop) {
                            break;
                        }
                    }
                }
                match queue.events.pop() {
                    None => break,
                    Some(Reverse(event)) => {
                        queue.now = event.at;
                        event
                    }
                }
            };
            trace!("Running event #{} at {}", event.seq, event.at);
            (event.action)();
        }
    }

    /// Number of events still queued
    pub fn pending(&self) -> usize {
        self.queue.borrow().events.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::RefCell;
    use std::rc::Rc;

    #[test]
    fn test_runs_in_time_order() {
        let sim = Simulator::new();
        let log: Rc<RefCell<Vec<u32>>> = Rc::new(RefCell::new(Vec::new()));

        for (delay_ms, tag) in [(30u64, 3u32), (10, 1), (20, 2)] {
            let log = log.clone();
            sim.schedule(Duration::from_millis(delay_ms), move || {
                log.borrow_mut().push(tag);
            });
        }
        sim.run();

        assert_eq!(*log.borrow(), vec![1, 2, 3]);
        assert_eq!(sim.now(), SimTime::from_nanos(30_000_000));
    }

    #[test]
    fn test_ties_break_by_insertion_order() {
        let sim = Simulator::new();
        let log: Rc<RefCell<Vec<u32>>> = Rc::new(RefCell::new(Vec::new()));

        for tag in 0..5u32 {
            let log = log.clone();
            sim.schedule(Duration::from_millis(5), move || {
                log.borrow_mut().push(tag);
            });
        }
        sim.run();

        assert_eq!(*log.borrow(), vec![0, 1, 2, 3, 4]);
    }

    #[test]
    fn test_callbacks_can_schedule() {
        let sim = Simulator::new();
        let log: Rc<RefCell<Vec<&'static str>>> = Rc::new(RefCell::new(Vec::new()));

        {
            let sim2 = sim.clone();
            let log = log.clone();
            sim.schedule(Duration::from_millis(1), move || {
                log.borrow_mut().push("first");
                let log = log.clone();
                sim2.schedule(Duration::from_millis(1), move || {
                    log.borrow_mut().push("second");
                });
            });
        }
        sim.run();

        assert_eq!(*log.borrow(), vec!["first", "second"]);
        assert_eq!(sim.now(), SimTime::from_nanos(2_000_000));
    }

    #[test]
    fn test_stop_at_leaves_later_events_unrun() {
        let sim = Simulator::new();
        let log: Rc<RefCell<Vec<u32>>> = Rc::new(RefCell::new(Vec::new()));

        for delay_ms in [10u64, 20, 30] {
            let log = log.clone();
            sim.schedule(Duration::from_millis(delay_ms), move || {
                log.borrow_mut().push(delay_ms as u32);
            });
        }
        sim.stop_at(SimTime::from_nanos(20_000_000));
        sim.run();

        assert_eq!(*log.borrow(), vec![10, 20]);
        assert_eq!(sim.pending(), 1);
    }
}
