//! Performance counter and trace configuration engine for AMD XDNA AI
//! Engine arrays.
//!
//! The crate decodes binary configuration requests, programs hardware
//! performance counters and trace units across the 2-D tile array,
//! polls the counters back, and marshals results into the fixed wire
//! format the host-side post-processing tools consume.

pub mod config;
pub mod device;
pub mod messages;
pub mod metrics;
pub mod profile;
pub mod resources;
pub mod session;
pub mod settings;
pub mod trace;
pub mod wire;
