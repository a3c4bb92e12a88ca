//! # vrtime-engine
//!
//! A discrete-event simulation core: a virtual clock, a mutable-key event
//! queue ordered by that clock, and an event manager that dispatches
//! queued events in time order.
//!
//! ## Modules
//!
//! - [`time`]: virtual time values ([`time::VTime`]) and the process-wide
//!   tick-rate configuration.
//! - [`queue`]: [`queue::EventQueue`], a stable-identity min-heap over
//!   virtual time.
//! - [`manager`]: [`manager::EventManager`], which owns a queue and a clock
//!   and runs the dispatch loop.
//!
//! ## Example
//!
//! ```
//! use std::sync::Arc;
//! use vrtime_engine::manager::EventManager;
//! use vrtime_engine::time::VTime;
//!
//! let em: EventManager<(), &'static str> = EventManager::new();
//! em.schedule((), "hello", Arc::new(|_em, _ctx, data: &&str| println!("{data}")), VTime::new(5, 1));
//! em.run(1.0);
//! ```
//!
//! Handlers may call back into the manager (e.g. to schedule follow-up
//! events) since the manager's own state lock is always released before a
//! handler is invoked from the dispatch loop.

pub mod manager;
pub mod queue;
pub mod time;

pub use manager::{EventManager, Handler};
pub use queue::{EventId, EventQueue};
pub use time::VTime;
