//! Device session and the typed configuration handles.
//!
//! One [`DeviceSession`] stands in for one open device: register
//! access, the resource pool matching the hardware generation, and the
//! architecture tables. Configuration follows the caller-driven
//! iteration protocol. Iteration 0 is [`DeviceSession::configure_profile`]
//! or [`DeviceSession::configure_trace`] and yields a handle; iteration 1
//! is [`ProfileSession::poll`] or [`TraceSession::flush`] on that handle;
//! iteration 2 is `release`, which consumes it. Polling a device that
//! was never configured is not expressible.

use crate::device::access::{AccessError, RegisterIo};
use crate::device::{arch_for, AieGen, ArchCaps};
use crate::messages::MessageLog;
use crate::profile::{
    poll_counters, release_counters, ConfiguredCounters, CounterConfigurator, CounterRecord,
};
use crate::resources::{pool_for, ResourcePool};
use crate::trace::configurator::TraceTileRecord;
use crate::trace::{flush_trace, release_trace, ConfiguredTrace, TraceConfigurator, TraceError};
use crate::wire::{self, RawProfileInput, WireError};
use log::{debug, warn};
use std::sync::Arc;
use thiserror::Error;

/// Top-level library error.
#[derive(Debug, Error)]
pub enum ProfError {
    #[error(transparent)]
    Wire(#[from] WireError),
    #[error(transparent)]
    Trace(#[from] TraceError),
    #[error(transparent)]
    Access(#[from] AccessError),
}

/// One open device.
pub struct DeviceSession {
    io: Box<dyn RegisterIo>,
    pool: Box<dyn ResourcePool>,
    arch: Arc<dyn ArchCaps>,
    gen: AieGen,
    /// Diagnostics of the most recent configure call, kept on the
    /// session so they survive a hard configuration failure.
    messages: MessageLog,
}

impl DeviceSession {
    pub fn new(gen: AieGen, io: Box<dyn RegisterIo>) -> Self {
        let arch = arch_for(gen);
        let pool = pool_for(arch.as_ref());
        Self { io, pool, arch, gen, messages: MessageLog::new() }
    }

    pub fn generation(&self) -> AieGen {
        self.gen
    }

    pub fn arch(&self) -> &Arc<dyn ArchCaps> {
        &self.arch
    }

    /// Diagnostics accumulated by the most recent configure call.
    pub fn messages(&self) -> &MessageLog {
        &self.messages
    }

    /// Serialize the most recent diagnostics into `out`.
    pub fn write_messages(&self, out: &mut [u8]) -> Result<usize, WireError> {
        wire::write_message_block(&self.messages, out)
    }

    /// Iteration 0 for profiling: decode the request and program every
    /// counter it names, best effort.
    pub fn configure_profile(&mut self, input: &[u8]) -> Result<ProfileSession, ProfError> {
        let request = wire::decode_profile_input(input)?;
        debug!("profiling {} tiles, row offset {}", request.tiles.len(), request.row_offset);

        let mut configurator = CounterConfigurator::new(
            self.io.as_mut(),
            self.pool.as_mut(),
            Arc::clone(&self.arch),
            request.row_offset,
        );
        let mut configured = configurator.configure(&request.tiles);
        self.messages = std::mem::take(&mut configured.messages);

        Ok(ProfileSession {
            configured,
            row_offset: request.row_offset,
            num_tiles: request.tiles.len(),
        })
    }

    /// Iteration 0 for trace: decode the request and configure every
    /// trace unit it names. Any per-tile failure rolls the whole call
    /// back; the diagnostics stay readable on the session either way.
    pub fn configure_trace(&mut self, input: &[u8]) -> Result<TraceSession, ProfError> {
        let request = wire::decode_trace_input(input)?;
        match AieGen::from_wire(request.hw_gen) {
            Some(gen) if gen != self.gen => {
                warn!("request names generation {:?}, session runs {:?}", gen, self.gen);
            }
            None => warn!("request names unknown generation {}", request.hw_gen),
            _ => {}
        }

        let mut configurator = TraceConfigurator::new(
            self.io.as_mut(),
            self.pool.as_mut(),
            Arc::clone(&self.arch),
            request.row_offset,
            request.params,
        );
        let result = configurator.configure(&request.tiles);
        self.messages = configurator.take_messages();
        Ok(TraceSession { configured: result? })
    }
}

/// Live profiling configuration. Dropping it without `release` leaves
/// the counters running, matching a host that never tears down.
pub struct ProfileSession {
    configured: ConfiguredCounters,
    row_offset: u8,
    num_tiles: usize,
}

impl ProfileSession {
    pub fn records(&self) -> &[CounterRecord] {
        &self.configured.records
    }

    /// Byte size of the configuration results block.
    pub fn configuration_size(&self) -> usize {
        let capacity = (self.num_tiles * RawProfileInput::NUM_CORE_COUNTERS)
            .max(self.configured.records.len());
        wire::profile_output_size(capacity)
    }

    /// Byte size of one poll's results block.
    pub fn poll_size(&self) -> usize {
        wire::profile_output_size(self.configured.records.len())
    }

    /// Write the configuration results block.
    pub fn write_configuration(&self, out: &mut [u8]) -> Result<usize, WireError> {
        wire::encode_configure_output(&self.configured, self.num_tiles, out)
    }

    /// Iteration 1: sample every configured counter and write the
    /// results block.
    pub fn poll(&self, device: &mut DeviceSession, out: &mut [u8]) -> Result<usize, ProfError> {
        let batch = poll_counters(device.io.as_mut(), &self.configured, self.row_offset)?;
        Ok(wire::encode_poll_output(&batch, out)?)
    }

    /// Iteration 2: stop every counter and hand the reservations back.
    pub fn release(self, device: &mut DeviceSession) {
        release_counters(device.io.as_mut(), device.pool.as_mut(), &self.configured);
    }
}

/// Live trace configuration.
pub struct TraceSession {
    configured: ConfiguredTrace,
}

impl TraceSession {
    pub fn records(&self) -> &[TraceTileRecord] {
        &self.configured.records
    }

    /// Byte size of the configuration results block.
    pub fn configuration_size(&self) -> usize {
        wire::trace_output_size(self.configured.records.len())
    }

    /// Write the configuration results block.
    pub fn write_configuration(&self, out: &mut [u8]) -> Result<usize, WireError> {
        wire::encode_trace_output(&self.configured, out)
    }

    /// Iteration 1: fire the stop events on every flush-marked tile.
    /// Repeat calls are no-ops; the plan empties after the first.
    pub fn flush(&mut self, device: &mut DeviceSession) -> Result<(), ProfError> {
        flush_trace(device.io.as_mut(), device.arch.as_ref(), &self.configured.flush)?;
        self.configured.flush.core.clear();
        self.configured.flush.mem_tile.clear();
        self.configured.flush.interface.clear();
        Ok(())
    }

    /// Iteration 2: stop every trace unit and hand all reservations
    /// back.
    pub fn release(self, device: &mut DeviceSession) {
        release_trace(device.io.as_mut(), device.pool.as_mut(), &self.configured);
    }
}
