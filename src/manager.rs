//! The event manager: owns a queue and a clock, and drives dispatch.
//!
//! One thread calls [`EventManager::run`]; any number of other threads may
//! call `schedule`, `cancel_event`, `remove_event`, `update_event_time`, or
//! read/set the clock concurrently.
//!
//! ## Lock ordering (required to avoid deadlock)
//!
//! `state` (the manager's own mutex) must always be acquired before the
//! queue's internal mutex, never the reverse, in any code path that needs
//! both. The run loop's external-suspension check relies on this: the
//! "queue empty? mark suspended, wait" sequence happens under one
//! continuous hold of `state`, so a `schedule` on another thread can never
//! slip a wakeup into the gap between the check and the wait.
//!
//! This matters because [`Condvar`] (unlike a sticky event flag) delivers a
//! `notify` only to a thread already parked in `wait`; a `notify` sent
//! before anyone is waiting is lost. The check-then-wait sequence must
//! therefore be atomic with respect to `state`, which is exactly what
//! holding one guard across both steps guarantees.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Condvar, Mutex};
use std::thread;
use std::time::Duration;

use log::{debug, info, trace};

use crate::queue::{EventId, EventQueue};
use crate::time::{seconds_to_ticks, VTime};

/// A callback invoked when its event is dispatched. Receives the owning
/// manager (so it may reschedule or cancel other events), the event's
/// context, and its data.
pub type Handler<C, D> = Arc<dyn Fn(&EventManager<C, D>, &C, &D) + Send + Sync>;

struct Event<C, D> {
    context: C,
    data: D,
    handler: Handler<C, D>,
    cancelled: bool,
}

struct ManagerState {
    current_time: VTime,
    run_flag: bool,
    wallclock: bool,
    external: bool,
    suspended: bool,
    auto_pri: i64,
    last_event_id: EventId,
}

impl ManagerState {
    fn new() -> Self {
        ManagerState {
            current_time: VTime::zero(),
            run_flag: false,
            wallclock: false,
            external: false,
            suspended: false,
            auto_pri: 1,
            last_event_id: 0,
        }
    }
}

/// Owns an [`EventQueue`] and the manager's current virtual time, and drives
/// the dispatch loop.
///
/// `C` and `D` are the opaque context and payload types carried by
/// scheduled events; the manager never inspects either.
pub struct EventManager<C, D> {
    queue: EventQueue<Event<C, D>>,
    state: Mutex<ManagerState>,
    condvar: Condvar,
    dispatched_count: AtomicU64,
}

impl<C, D> Default for EventManager<C, D>
where
    C: Send + Sync + 'static,
    D: Send + Sync + 'static,
{
    fn default() -> Self {
        Self::new()
    }
}

impl<C, D> EventManager<C, D>
where
    C: Send + Sync + 'static,
    D: Send + Sync + 'static,
{
    pub fn new() -> Self {
        EventManager {
            queue: EventQueue::new(),
            state: Mutex::new(ManagerState::new()),
            condvar: Condvar::new(),
            dispatched_count: AtomicU64::new(0),
        }
    }

    /// Enable or disable queue-empty suspension in the dispatch loop.
    pub fn set_external(&self, external: bool) {
        let mut state = self.state.lock().unwrap();
        state.external = external;
    }

    /// Enable or disable real-time pacing of virtual time during dispatch.
    pub fn set_wallclock(&self, wallclock: bool) {
        let mut state = self.state.lock().unwrap();
        state.wallclock = wallclock;
    }

    /// Overwrite the manager's current time. Intended for use between `run`
    /// calls, not while a dispatch loop is active.
    pub fn set_time(&self, time: VTime) {
        let mut state = self.state.lock().unwrap();
        state.current_time = time;
    }

    pub fn current_time(&self) -> VTime {
        self.state.lock().unwrap().current_time
    }

    pub fn current_ticks(&self) -> i64 {
        self.current_time().ticks()
    }

    pub fn current_seconds(&self) -> f64 {
        self.current_time().seconds()
    }

    /// Number of events dispatched (handler actually invoked, not counting
    /// cancelled events skipped at pop time) across this manager's lifetime.
    pub fn dispatched_count(&self) -> u64 {
        self.dispatched_count.load(Ordering::SeqCst)
    }

    /// Schedule `handler(self, &context, &data)` to run at `current_time + offset`.
    ///
    /// If `offset`'s priority is `0`, it is replaced with an internally
    /// assigned, monotonically increasing priority, so independently
    /// scheduled events landing on the same tick still dispatch in
    /// submission order.
    ///
    /// Returns the new event's id and its resolved absolute time.
    pub fn schedule(&self, context: C, data: D, handler: Handler<C, D>, mut offset: VTime) -> (EventId, VTime) {
        let mut state = self.state.lock().unwrap();
        if offset.pri() == 0 {
            offset.set_pri(state.auto_pri);
            state.auto_pri += 1;
        }
        let mut absolute = state.current_time.plus(&offset);
        absolute.set_pri(offset.pri());

        let was_empty = self.queue.is_empty();
        let event = Event {
            context,
            data,
            handler,
            cancelled: false,
        };
        let id = self.queue.insert(event, absolute);
        trace!("scheduled event {id} for {absolute}");

        if state.external && state.suspended && was_empty {
            state.suspended = false;
            debug!("waking suspended dispatch loop for event {id}");
            self.condvar.notify_one();
        }

        (id, absolute)
    }

    /// Rewrite a live event's absolute dispatch time. Does not touch
    /// cancellation state. Returns `false` if `id` is unknown.
    pub fn update_event_time(&self, id: EventId, time: VTime) -> bool {
        self.queue.update_time(id, time)
    }

    /// Mark a live event cancelled; it stays queued but is skipped (without
    /// running its handler) when dispatched. Returns `false` if `id` is
    /// unknown.
    pub fn cancel_event(&self, id: EventId) -> bool {
        self.queue.get_item_mut(id, |event, _time| event.cancelled = true).is_some()
    }

    /// Remove a live event outright. Returns `false` if `id` is unknown.
    pub fn remove_event(&self, id: EventId) -> bool {
        self.queue.remove(id)
    }

    /// Request that the dispatch loop stop. Takes effect the next time the
    /// loop checks its run condition, i.e. after the in-flight handler (if
    /// any) returns.
    ///
    /// Does not signal the suspension condition variable: a loop already
    /// blocked waiting for an external event is woken only by a subsequent
    /// `schedule`, never by `stop` alone.
    pub fn stop(&self) {
        let mut state = self.state.lock().unwrap();
        state.run_flag = false;
    }

    /// Run the dispatch loop for up to `limit_seconds` of virtual time.
    ///
    /// Dispatches events in non-decreasing `(ticks, pri)` order until the
    /// queue empties or the next event would land beyond the limit, at
    /// which point the manager's clock is advanced to exactly the limit.
    /// If external-suspension mode is enabled, an empty queue blocks the
    /// loop instead of returning, until another thread schedules a new
    /// event.
    pub fn run(&self, limit_seconds: f64) {
        let limit_ticks = seconds_to_ticks(limit_seconds);
        {
            let mut state = self.state.lock().unwrap();
            state.run_flag = true;
        }
        info!("dispatch loop starting, limit={limit_ticks} ticks");

        let mut entry = true;
        loop {
            let (run_flag, current_time) = {
                let state = self.state.lock().unwrap();
                (state.run_flag, state.current_time)
            };
            let queue_len = self.queue.len();
            if !(run_flag && (entry || (queue_len > 0 && current_time.ticks() < limit_ticks))) {
                break;
            }
            entry = false;

            if queue_len > 0 {
                let next_time = self.queue.min_time();
                if limit_ticks < next_time.ticks() {
                    let mut state = self.state.lock().unwrap();
                    state.current_time = VTime::new(limit_ticks, 0);
                    break;
                }

                if self.is_wallclock() {
                    self.real_time_delay(current_time, next_time);
                }

                if let Some((id, time, event)) = self.queue.pop_if_due(VTime::new(limit_ticks, i64::MAX)) {
                    {
                        let mut state = self.state.lock().unwrap();
                        state.current_time = time;
                        state.last_event_id = id;
                    }
                    if !event.cancelled {
                        trace!("dispatching event {id} at {time}");
                        (event.handler)(self, &event.context, &event.data);
                        self.dispatched_count.fetch_add(1, Ordering::SeqCst);
                    } else {
                        trace!("skipping cancelled event {id}");
                    }
                }
            }

            let mut state = self.state.lock().unwrap();
            if state.external && self.queue.is_empty() {
                debug!("dispatch loop suspending, queue empty");
                state.suspended = true;
                state = self.condvar.wait_while(state, |s| s.suspended).unwrap();
                debug!("dispatch loop resumed");
            }
            drop(state);
        }

        let mut state = self.state.lock().unwrap();
        if state.run_flag && state.current_time.ticks() < limit_ticks {
            state.current_time = VTime::new(limit_ticks, 0);
        }
        state.last_event_id = 0;
        state.run_flag = false;
        info!("dispatch loop stopped at {}", state.current_time);
    }

    fn is_wallclock(&self) -> bool {
        self.state.lock().unwrap().wallclock
    }

    fn real_time_delay(&self, current_time: VTime, next_time: VTime) {
        let delay = next_time.seconds() - current_time.seconds();
        if delay > 0.0 {
            thread::sleep(Duration::from_secs_f64(delay));
        }
    }
}
