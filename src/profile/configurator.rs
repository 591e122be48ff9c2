//! Performance counter configuration.
//!
//! Configuration runs as four passes over the request list, one per
//! module class, in a fixed order: core, memory, interface, mem tile.
//! Within a pass tiles are visited in (column, row, subtype) order, so
//! scarce counters go to the same tiles on every run.
//!
//! Failure stance is best effort: a tile that cannot get all the
//! counters its metric set asks for keeps the ones that fit, and a
//! hardware fault stops that tile's remaining counters without touching
//! counters already running. Nothing is rolled back; the host learns
//! about gaps from the diagnostic list and missing poll samples.

use crate::device::access::{AccessError, RegisterIo};
use crate::device::events::{self, core, mem, EventId};
use crate::device::registers::{
    self, core_module, mem_tile_module, memory_module, TileAddress, PERF_EVENT_MASK,
    PERF_START_SHIFT, PERF_STOP_SHIFT,
};
use crate::device::{ArchCaps, HwModule, ModuleKind, ShimSubtype, TileLoc, TileSpec};
use crate::messages::{MessageCode, MessageLog};
use crate::metrics::{tables, MetricSet};
use crate::profile::payload;
use crate::profile::ports::{self, PortHandle};
use crate::resources::{ResourceKind, ResourcePool};
use log::{debug, warn};
use smallvec::SmallVec;
use std::collections::BTreeMap;
use std::sync::Arc;

/// One tile's profiling request, as decoded from the input buffer.
#[derive(Debug, Clone)]
pub struct ProfileTile {
    pub spec: TileSpec,
    /// Configuration pass this request belongs to.
    pub pass: ModuleKind,
    /// Metric set id, interpreted against the tile's classified module
    /// kind.
    pub metric_id: u8,
    pub channel0: Option<u8>,
    pub channel1: Option<u8>,
}

impl ProfileTile {
    pub fn new(spec: TileSpec, pass: ModuleKind, metric_id: u8) -> Self {
        Self { spec, pass, metric_id, channel0: None, channel1: None }
    }
}

/// One configured counter, in the form reported back to the host.
///
/// Event ids are physical and carry the per-module counter base, so the
/// host can recover the module class from the bare number.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CounterRecord {
    pub counter_id: u16,
    pub col: u8,
    pub row: u8,
    pub counter_num: u8,
    pub start_event: u16,
    pub end_event: u16,
    pub reset_event: u8,
    pub payload: u32,
    /// Pass index (0 core, 1 memory, 2 interface, 3 mem tile).
    pub module: u8,
}

/// Live reservation of one hardware counter.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CounterHandle {
    pub loc: TileLoc,
    pub kind: ModuleKind,
    pub counter: u8,
}

/// Everything a configuration call produced.
#[derive(Debug, Default)]
pub struct ConfiguredCounters {
    pub records: Vec<CounterRecord>,
    pub counters: Vec<CounterHandle>,
    pub ports: Vec<PortHandle>,
    pub messages: MessageLog,
}

impl ConfiguredCounters {
    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }
}

/// Four-pass counter configuration engine.
pub struct CounterConfigurator<'a> {
    io: &'a mut dyn RegisterIo,
    pool: &'a mut dyn ResourcePool,
    arch: Arc<dyn ArchCaps>,
    /// Absolute row of the first AIE row, taken from the request header.
    /// Partition-relative layouts make this larger than the device
    /// default, so it is never derived from the architecture table.
    row_offset: u8,
}

impl<'a> CounterConfigurator<'a> {
    pub fn new(
        io: &'a mut dyn RegisterIo,
        pool: &'a mut dyn ResourcePool,
        arch: Arc<dyn ArchCaps>,
        row_offset: u8,
    ) -> Self {
        Self { io, pool, arch, row_offset }
    }

    /// Configure counters for every requested tile, best effort.
    pub fn configure(&mut self, tiles: &[ProfileTile]) -> ConfiguredCounters {
        let mut out = ConfiguredCounters::default();
        let mut counter_id: u16 = 0;

        for pass in ModuleKind::ALL {
            let module = pass.hw_module();

            let mut pass_tiles: BTreeMap<(u8, u8, ShimSubtype), &ProfileTile> = BTreeMap::new();
            for tile in tiles.iter().filter(|t| t.pass == pass) {
                pass_tiles.insert(tile.spec.key(), tile);
            }

            let mut pass_counters = 0usize;
            for request in pass_tiles.values() {
                pass_counters += self.configure_tile(request, module, &mut counter_id, &mut out);
            }
            if pass_counters > 0 {
                debug!("{} counters configured in {} pass", pass_counters, pass.name());
            }
        }
        out
    }

    fn configure_tile(
        &mut self,
        request: &ProfileTile,
        module: HwModule,
        counter_id: &mut u16,
        out: &mut ConfiguredCounters,
    ) -> usize {
        let gen = self.arch.gen();
        let tile = &request.spec;
        let loc = tile.loc;

        let kind = ModuleKind::classify(loc.row, self.row_offset, module);
        if !kind.accepts(module) {
            return 0;
        }
        // Modules the compiled design never placed code or buffers on
        // would only produce meaningless samples.
        match kind {
            ModuleKind::Core if !tile.active_core => return 0,
            ModuleKind::Dma if !tile.active_memory => return 0,
            _ => {}
        }

        let Some(set) = MetricSet::decode(kind, request.metric_id) else {
            warn!("unknown {} metric set id {} at {}", kind.name(), request.metric_id, loc);
            return 0;
        };

        let channel0 = request.channel0.unwrap_or(0);
        let channel1 = request.channel1.unwrap_or(1);

        let mut start_events: SmallVec<[EventId; 4]> =
            SmallVec::from_slice(tables::start_events(gen, set));
        let mut end_events: SmallVec<[EventId; 4]> =
            SmallVec::from_slice(tables::end_events(gen, set));
        tables::modify_events(gen, kind, tile.subtype, channel0, &mut start_events);
        tables::modify_events(gen, kind, tile.subtype, channel0, &mut end_events);

        if let Err(e) = self.config_event_selections(loc, kind, set, channel0, channel1) {
            warn!("DMA event selection failed at {}: {}", loc, e);
            return 0;
        }

        let free = self.pool.available(loc, kind, ResourceKind::PerfCounter);
        let wanted = start_events.len();
        let count = wanted.min(free);
        if count < wanted {
            warn!(
                "only {} of {} {} metrics available at {}, counters may be held by trace",
                count,
                wanted,
                kind.name(),
                loc
            );
            let code = match kind {
                ModuleKind::Core => MessageCode::NoCoreCounters,
                ModuleKind::Shim => MessageCode::NoResources,
                _ => MessageCode::NoMemoryCounters,
            };
            out.messages
                .push(code, [free as u32, wanted as u32, loc.col as u32, loc.row as u32]);
        }

        let mut configured = 0usize;
        for i in 0..count {
            let start = start_events[i];
            let end = end_events[i];
            let channel = if i == 0 { channel0 } else { channel1 };

            let (Some(phys_start), Some(phys_end)) =
                (self.arch.physical_event(start), self.arch.physical_event(end))
            else {
                debug!("event {} has no {} encoding, stopping at {}", start, gen, loc);
                break;
            };

            let Some(counter) = self.pool.acquire(loc, kind, ResourceKind::PerfCounter) else {
                break;
            };

            if let Err(e) =
                self.bind_counter(tile, kind, set, counter, start, phys_start, phys_end, i as u8, channel, out)
            {
                warn!("counter {} setup failed at {} {}: {}", counter, loc, kind.name(), e);
                self.pool.release(loc, kind, ResourceKind::PerfCounter, counter);
                break;
            }
            out.counters.push(CounterHandle { loc, kind, counter });

            let payload = match payload::counter_payload(
                self.io, gen, tile, kind, set, start, channel,
            ) {
                Ok(p) => p,
                Err(e) => {
                    warn!("payload read failed at {}: {}", loc, e);
                    0
                }
            };

            let base = events::counter_base(kind);
            out.records.push(CounterRecord {
                counter_id: *counter_id,
                col: loc.col,
                row: loc.row,
                counter_num: counter,
                start_event: phys_start as u16 + base,
                end_event: phys_end as u16 + base,
                reset_event: 0,
                payload,
                module: request.pass.wire_index(),
            });
            *counter_id += 1;
            configured += 1;
        }
        configured
    }

    /// Apply group masks, bind the monitor port if needed, then program
    /// the start/stop events. The counter is live once the control
    /// register write lands.
    #[allow(clippy::too_many_arguments)]
    fn bind_counter(
        &mut self,
        tile: &TileSpec,
        kind: ModuleKind,
        set: MetricSet,
        counter: u8,
        start: EventId,
        phys_start: u8,
        phys_end: u8,
        count_num: u8,
        channel: u8,
        out: &mut ConfiguredCounters,
    ) -> Result<(), AccessError> {
        let loc = tile.loc;

        if let (Some(reg), Some(mask)) = (group_enable_reg(start), events::group_event_mask(start))
        {
            self.io.write(TileAddress::new(loc.col, loc.row, reg), mask)?;
        }

        if let Some(port) = ports::configure_stream_port(
            self.io, self.pool, tile, kind, set, start, count_num, channel,
        )? {
            out.ports.push(port);
        }

        let (reg, shift) = registers::perf_control_reg(kind, counter);
        let value = ((phys_start as u32 & PERF_EVENT_MASK) << (PERF_START_SHIFT + shift))
            | ((phys_end as u32 & PERF_EVENT_MASK) << (PERF_STOP_SHIFT + shift));
        let mask = (PERF_EVENT_MASK << (PERF_START_SHIFT + shift))
            | (PERF_EVENT_MASK << (PERF_STOP_SHIFT + shift));
        self.io.mask_write(TileAddress::new(loc.col, loc.row, reg), mask, value)
    }

    /// Point the mem tile's DMA event selectors at the configured
    /// channels. Selector 0 follows channel0, selector 1 channel1; the
    /// direction comes from the metric set.
    fn config_event_selections(
        &mut self,
        loc: TileLoc,
        kind: ModuleKind,
        set: MetricSet,
        channel0: u8,
        channel1: u8,
    ) -> Result<(), AccessError> {
        if kind != ModuleKind::MemTile {
            return Ok(());
        }
        let MetricSet::MemTile(s) = set else {
            return Ok(());
        };
        let mm2s_bit = if s.is_input() { 0u32 } else { 0x80 };
        let addr = TileAddress::new(loc.col, loc.row, mem_tile_module::DMA_EVENT_CHANNEL_SELECTION);
        self.io.mask_write(addr, 0xFF, (channel0 as u32 & 0x1F) | mm2s_bit)?;
        self.io.mask_write(addr, 0xFF00, ((channel1 as u32 & 0x1F) | mm2s_bit) << 8)
    }
}

/// Stop every configured counter and hand all reservations back.
///
/// Teardown keeps going past individual faults so one dead tile cannot
/// pin resources on the rest of the array.
pub fn release_counters(
    io: &mut dyn RegisterIo,
    pool: &mut dyn ResourcePool,
    configured: &ConfiguredCounters,
) {
    for handle in &configured.counters {
        let (reg, shift) = registers::perf_control_reg(handle.kind, handle.counter);
        let mask = (PERF_EVENT_MASK << (PERF_START_SHIFT + shift))
            | (PERF_EVENT_MASK << (PERF_STOP_SHIFT + shift));
        let addr = TileAddress::new(handle.loc.col, handle.loc.row, reg);
        if let Err(e) = io.mask_write(addr, mask, 0) {
            warn!("failed to stop counter {} at {}: {}", handle.counter, handle.loc, e);
        }
        pool.release(handle.loc, handle.kind, ResourceKind::PerfCounter, handle.counter);
    }
    ports::release_stream_ports(pool, &configured.ports);
}

/// Group-enable register programmed alongside a group start event.
///
/// Only the five groups with fixed sub-event masks are ever touched; the
/// error-group enables belong to the driver's error handler.
fn group_enable_reg(event: EventId) -> Option<u32> {
    if event == mem::GROUP_DMA_ACTIVITY {
        Some(memory_module::EVENT_GROUP_DMA_ENABLE)
    } else if event == mem::GROUP_LOCK {
        Some(memory_module::EVENT_GROUP_LOCK_ENABLE)
    } else if event == mem::GROUP_MEMORY_CONFLICT {
        Some(memory_module::EVENT_GROUP_MEMORY_CONFLICT_ENABLE)
    } else if event == core::GROUP_CORE_STALL {
        Some(core_module::EVENT_GROUP_CORE_STALL_ENABLE)
    } else if event == core::GROUP_CORE_PROGRAM_FLOW {
        Some(core_module::EVENT_GROUP_CORE_PROGRAM_FLOW_ENABLE)
    } else {
        None
    }
}
