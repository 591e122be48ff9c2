//! Event trace configuration.
//!
//! [`TraceConfigurator`] programs the trace units for the requested
//! metric sets, [`flush_trace`] pushes buffered packets out at the end
//! of a flush-style run, and [`release_trace`] stops everything and
//! returns the reservations. [`BroadcastNetwork`] adds the synchronized
//! start signal windowed runs need.

pub mod broadcast;
pub mod configurator;
pub mod tables;

pub use broadcast::BroadcastNetwork;
pub use configurator::{
    configure_combo_or, flush_trace, release_trace, ConfiguredTrace, FlushPlan,
    TraceConfigurator, TraceError, TraceHistograms, TraceParams, TraceTile, TraceTileRecord,
};
pub use tables::{CounterScheme, CoreTraceSet, InterfaceTraceSet, MemTileTraceSet, TraceMode};
