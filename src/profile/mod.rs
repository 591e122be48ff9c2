//! Performance counter profiling.
//!
//! [`CounterConfigurator`] programs hardware counters for the requested
//! metric sets, [`poll_counters`] reads them back, and
//! [`release_counters`] stops everything and returns the reservations.
//! The three calls form one configure/poll/teardown cycle per session.

pub mod configurator;
pub mod payload;
pub mod poller;
pub mod ports;

pub use configurator::{
    release_counters, ConfiguredCounters, CounterConfigurator, CounterHandle, CounterRecord,
    ProfileTile,
};
pub use poller::{poll_counters, CounterSample, PollBatch};
pub use ports::PortHandle;
