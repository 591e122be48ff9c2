//! Trace unit configuration.
//!
//! Every trace unit moves through the same stage order: scheme counters,
//! control events, reservation, slot binding, mode, packet shape, start.
//! A stage with nothing to do is skipped; the order itself is fixed and
//! debug builds assert it ([`TraceStage`]).
//!
//! Failure stance is the opposite of the counter engine: configuration
//! is all or nothing. The first tile that cannot reserve what its set
//! needs aborts the run and everything configured before it is stopped
//! and handed back, so a failed call leaves the array as it found it.
//! The diagnostic list records which tile fell short and why.

use crate::device::access::{AccessError, RegisterIo};
use crate::device::events::{self, core, mem, mem_tile, pl, EventId};
use crate::device::registers::{
    self, mem_tile_module, BlockDir, TileAddress, PERF_EVENT_MASK, PERF_START_SHIFT,
    PERF_STOP_SHIFT, SS_EVENT_PORT_ID_MASK, SS_EVENT_PORT_MASTER_BIT, TRACE_EVENT_MASK,
    TRACE_MODE_MASK, TRACE_MODE_SHIFT, TRACE_PACKET_TYPE_SHIFT, TRACE_START_EVENT_SHIFT,
    TRACE_STOP_EVENT_SHIFT,
};
use crate::device::{ArchCaps, HwModule, ModuleKind, ShimSubtype, TileLoc, TileSpec};
use crate::messages::{MessageCode, MessageLog};
use crate::profile::ports::{self, PortHandle, SHIM_SOUTH_PORT_BASE};
use crate::profile::CounterHandle;
use crate::resources::{ResourceKind, ResourcePool};
use crate::trace::broadcast::BroadcastNetwork;
use crate::trace::tables::{self, CoreTraceSet, InterfaceTraceSet, MemTileTraceSet, TraceMode};
use log::{debug, warn};
use smallvec::SmallVec;
use std::collections::BTreeMap;
use std::sync::Arc;
use thiserror::Error;

/// Trace event slots per module, bounding the per-tile histograms.
pub const TRACE_SLOTS: usize = 8;

/// Combo control opcode: output fires when either input does.
const COMBO_OR: u32 = 2;

/// One tile's trace request, as decoded from the input buffer.
#[derive(Debug, Clone)]
pub struct TraceTile {
    pub spec: TileSpec,
    /// Trace set id, interpreted against the tile's classified module
    /// kind.
    pub metric_id: u8,
    pub channel0: Option<u8>,
    pub channel1: Option<u8>,
}

impl TraceTile {
    pub fn new(spec: TileSpec, metric_id: u8) -> Self {
        Self { spec, metric_id, channel0: None, channel1: None }
    }
}

/// Request-wide trace knobs from the input header.
#[derive(Debug, Clone, Copy, Default)]
pub struct TraceParams {
    pub delay_cycles: u64,
    pub iteration_count: u32,
    pub use_user_control: bool,
    pub use_delay: bool,
    pub use_graph_iterator: bool,
    pub use_one_delay_counter: bool,
    pub counter_scheme: tables::CounterScheme,
}

impl TraceParams {
    /// Flush-style control: trace ends on a software-firable event so
    /// buffered packets can be pushed out at the end of the run.
    pub fn flush_enabled(&self) -> bool {
        self.use_user_control || self.use_graph_iterator || self.use_delay
    }
}

/// Configuration stages of one trace unit, in required order.
///
/// A unit may skip stages it has no work for (a tile without scheme
/// counters goes straight to its control events) but never moves
/// backwards.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum TraceStage {
    Idle,
    CountersConfigured,
    ComboEventsConfigured,
    StartStopEventSet,
    SlotsReserved,
    EventsBoundToSlots,
    ModeSelected,
    PacketConfigured,
    Started,
}

/// One heartbeat or start-scheduling counter, as reported to the host.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct TracePcRecord {
    pub start_event: u16,
    pub stop_event: u16,
    pub reset_event: u16,
    pub event_value: u32,
}

/// Core-module trace state of one AIE tile.
#[derive(Debug, Clone, Default)]
pub struct CoreTraceRecord {
    pub pc: [TracePcRecord; 4],
    pub traced_events: [u16; TRACE_SLOTS],
    /// Physical core event carried on each broadcast channel.
    pub internal_events_broadcast: [u16; 16],
    pub broadcast_mask_east: u32,
    pub broadcast_mask_west: u32,
    pub combo_event_input: [u16; 4],
    pub combo_event_control: [u16; 4],
    pub start_event: u16,
    pub stop_event: u16,
}

/// Memory-module trace state of one AIE tile.
#[derive(Debug, Clone, Default)]
pub struct MemoryTraceRecord {
    pub pc: [TracePcRecord; 2],
    pub traced_events: [u16; TRACE_SLOTS],
    pub start_event: u16,
    pub stop_event: u16,
    pub packet_type: u8,
}

/// Trace state of one mem tile. Interface tiles share the block, the
/// wire format carries both in the same field.
#[derive(Debug, Clone)]
pub struct MemTileTraceRecord {
    pub traced_events: [u16; TRACE_SLOTS],
    pub port_trace_ids: [u8; 2],
    pub port_trace_is_master: [u8; 2],
    pub s2mm_channels: [i8; 2],
    pub mm2s_channels: [i8; 2],
    pub start_event: u16,
    pub stop_event: u16,
    pub packet_type: u8,
}

impl Default for MemTileTraceRecord {
    fn default() -> Self {
        Self {
            traced_events: [0; TRACE_SLOTS],
            port_trace_ids: [0; 2],
            port_trace_is_master: [0; 2],
            s2mm_channels: [-1; 2],
            mm2s_channels: [-1; 2],
            start_event: 0,
            stop_event: 0,
            packet_type: 0,
        }
    }
}

/// Everything recorded about one configured tile, in the form reported
/// back to the host.
#[derive(Debug, Clone, Default)]
pub struct TraceTileRecord {
    pub col: u8,
    pub row: u8,
    /// Wire module type (0 core, 2 interface, 3 mem tile).
    pub module: u8,
    pub metric_id: u8,
    pub core: CoreTraceRecord,
    pub memory: MemoryTraceRecord,
    pub mem_tile: MemTileTraceRecord,
}

impl TraceTileRecord {
    fn new(loc: TileLoc, kind: ModuleKind, metric_id: u8) -> Self {
        Self {
            col: loc.col,
            row: loc.row,
            module: kind.wire_index(),
            metric_id,
            ..Self::default()
        }
    }
}

/// Tiles-by-slot-count histograms reported alongside the records.
#[derive(Debug, Clone, Default)]
pub struct TraceHistograms {
    pub core: [u32; TRACE_SLOTS + 1],
    pub memory: [u32; TRACE_SLOTS + 1],
    pub mem_tile: [u32; TRACE_SLOTS + 1],
}

/// Live reservation of one trace event slot.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SlotHandle {
    pub loc: TileLoc,
    pub kind: ModuleKind,
    pub slot: u8,
}

/// Live reservation of one broadcast channel.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BcHandle {
    pub loc: TileLoc,
    pub kind: ModuleKind,
    pub bc: u8,
}

/// Channels blocked toward one direction of a module's broadcast switch.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BlockHandle {
    pub loc: TileLoc,
    pub kind: ModuleKind,
    pub dir: BlockDir,
    pub mask: u32,
}

/// Tiles whose end events must be fired by software to drain the trace
/// stream, and the events to fire.
#[derive(Debug, Clone)]
pub struct FlushPlan {
    pub core: Vec<TileLoc>,
    pub mem_tile: Vec<TileLoc>,
    pub interface: Vec<TileLoc>,
    pub core_stop: EventId,
    pub mem_tile_stop: EventId,
    pub interface_stop: EventId,
}

impl Default for FlushPlan {
    fn default() -> Self {
        Self {
            core: Vec::new(),
            mem_tile: Vec::new(),
            interface: Vec::new(),
            core_stop: tables::flush_stop_event(ModuleKind::Core),
            mem_tile_stop: tables::flush_stop_event(ModuleKind::MemTile),
            interface_stop: tables::flush_stop_event(ModuleKind::Shim),
        }
    }
}

impl FlushPlan {
    pub fn is_empty(&self) -> bool {
        self.core.is_empty() && self.mem_tile.is_empty() && self.interface.is_empty()
    }
}

/// Everything a configuration call produced.
#[derive(Debug, Default)]
pub struct ConfiguredTrace {
    pub records: Vec<TraceTileRecord>,
    pub histograms: TraceHistograms,
    pub flush: FlushPlan,
    pub counters: Vec<CounterHandle>,
    pub slots: Vec<SlotHandle>,
    pub broadcasts: Vec<BcHandle>,
    pub blocks: Vec<BlockHandle>,
    pub ports: Vec<PortHandle>,
    /// Trace controls armed, in configuration order.
    pub controls: Vec<(TileLoc, ModuleKind)>,
}

impl ConfiguredTrace {
    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }
}

#[derive(Debug, Error)]
pub enum TraceError {
    #[error("tile {loc} lacks free trace resources")]
    Resources { loc: TileLoc },
    #[error("trace control reservation failed at {loc} ({kind})")]
    ControlReserve { loc: TileLoc, kind: ModuleKind },
    #[error("counter reservation failed at {loc}")]
    Counters { loc: TileLoc },
    #[error(transparent)]
    Access(#[from] AccessError),
}

/// Driver for one module's trace unit.
///
/// Owns the stage bookkeeping and the control register layout; the
/// configurator decides what to feed it. Control events are physical
/// bytes by the time they land here.
#[derive(Debug)]
struct TraceControl {
    loc: TileLoc,
    kind: ModuleKind,
    stage: TraceStage,
    start_field: u8,
    stop_field: u8,
    start_bc: Option<u8>,
    stop_bc: Option<u8>,
}

impl TraceControl {
    fn new(loc: TileLoc, kind: ModuleKind) -> Self {
        Self {
            loc,
            kind,
            stage: TraceStage::Idle,
            start_field: 0,
            stop_field: 0,
            start_bc: None,
            stop_bc: None,
        }
    }

    fn advance(&mut self, to: TraceStage) {
        debug_assert!(
            self.stage < to,
            "trace stage order violated at {} {}: {:?} -> {:?}",
            self.loc,
            self.kind,
            self.stage,
            to
        );
        self.stage = to;
    }

    fn addr(&self, reg: u32) -> TileAddress {
        TileAddress::new(self.loc.col, self.loc.row, reg)
    }

    fn note_counters(&mut self) {
        self.advance(TraceStage::CountersConfigured);
    }

    fn set_control_events(&mut self, start_phys: u8, stop_phys: u8) {
        self.advance(TraceStage::StartStopEventSet);
        self.start_field = start_phys;
        self.stop_field = stop_phys;
    }

    /// Claim the trace unit. A unit already armed by an earlier session
    /// shows a nonzero control word and is refused, not reprogrammed.
    ///
    /// `cross_module` units (memory trace gated by core events) also
    /// claim the two broadcast channels that carry the control pair
    /// across the module boundary and retarget the control fields at
    /// the incoming broadcast events.
    fn reserve(
        &mut self,
        io: &mut dyn RegisterIo,
        pool: &mut dyn ResourcePool,
        cross_module: bool,
    ) -> Result<bool, AccessError> {
        debug_assert!(self.stage == TraceStage::StartStopEventSet);
        if io.read(self.addr(registers::trace_control0_reg(self.kind)))? != 0 {
            return Ok(false);
        }
        if cross_module {
            let Some(b0) = pool.acquire(self.loc, ModuleKind::Core, ResourceKind::BroadcastChannel)
            else {
                return Ok(false);
            };
            let Some(b1) = pool.acquire(self.loc, ModuleKind::Core, ResourceKind::BroadcastChannel)
            else {
                pool.release(self.loc, ModuleKind::Core, ResourceKind::BroadcastChannel, b0);
                return Ok(false);
            };
            self.start_bc = Some(b0);
            self.stop_bc = Some(b1);
            self.start_field = events::broadcast_event(self.kind, b0).in_band() as u8;
            self.stop_field = events::broadcast_event(self.kind, b1).in_band() as u8;
        }
        self.advance(TraceStage::SlotsReserved);
        Ok(true)
    }

    fn bind_slot(&mut self, io: &mut dyn RegisterIo, slot: u8, phys: u8) -> Result<(), AccessError> {
        debug_assert!(
            self.stage == TraceStage::SlotsReserved || self.stage == TraceStage::EventsBoundToSlots
        );
        let (reg, shift) = registers::trace_event_slot_reg(self.kind, slot);
        io.mask_write(self.addr(reg), 0xFF << shift, (phys as u32) << shift)?;
        self.stage = TraceStage::EventsBoundToSlots;
        Ok(())
    }

    fn set_mode(&mut self, io: &mut dyn RegisterIo, mode: TraceMode) -> Result<(), AccessError> {
        debug_assert!(self.stage >= TraceStage::SlotsReserved);
        self.advance(TraceStage::ModeSelected);
        io.mask_write(
            self.addr(registers::trace_control0_reg(self.kind)),
            TRACE_MODE_MASK << TRACE_MODE_SHIFT,
            mode.bits() << TRACE_MODE_SHIFT,
        )
    }

    fn set_packet(&mut self, io: &mut dyn RegisterIo, packet_type: u8) -> Result<(), AccessError> {
        self.advance(TraceStage::PacketConfigured);
        io.write(
            self.addr(registers::trace_control1_reg(self.kind)),
            (packet_type as u32) << TRACE_PACKET_TYPE_SHIFT,
        )
    }

    /// Writing the start event is what arms the unit, so it comes last.
    fn start(&mut self, io: &mut dyn RegisterIo) -> Result<(), AccessError> {
        self.advance(TraceStage::Started);
        let mask = (TRACE_EVENT_MASK << TRACE_START_EVENT_SHIFT)
            | (TRACE_EVENT_MASK << TRACE_STOP_EVENT_SHIFT);
        let value = ((self.start_field as u32) << TRACE_START_EVENT_SHIFT)
            | ((self.stop_field as u32) << TRACE_STOP_EVENT_SHIFT);
        io.mask_write(self.addr(registers::trace_control0_reg(self.kind)), mask, value)
    }
}

/// Whole-array trace configuration engine.
pub struct TraceConfigurator<'a> {
    io: &'a mut dyn RegisterIo,
    pool: &'a mut dyn ResourcePool,
    arch: Arc<dyn ArchCaps>,
    /// Absolute row of the first AIE row, taken from the request header.
    row_offset: u8,
    params: TraceParams,
    /// Resolved AIE-tile control pair for this request.
    core_start: EventId,
    core_stop: EventId,
    /// Start substitutes for mem and interface tiles when a
    /// synchronized-start network drives the run.
    start_broadcast: Option<(EventId, EventId)>,
    messages: MessageLog,
}

impl<'a> TraceConfigurator<'a> {
    pub fn new(
        io: &'a mut dyn RegisterIo,
        pool: &'a mut dyn ResourcePool,
        arch: Arc<dyn ArchCaps>,
        row_offset: u8,
        params: TraceParams,
    ) -> Self {
        let core_start = if params.use_user_control {
            core::INSTR_EVENT_0
        } else {
            tables::default_start_event(ModuleKind::Core)
        };
        let core_stop = if params.flush_enabled() {
            tables::flush_stop_event(ModuleKind::Core)
        } else {
            tables::default_stop_event(ModuleKind::Core)
        };
        Self {
            io,
            pool,
            arch,
            row_offset,
            params,
            core_start,
            core_stop,
            start_broadcast: None,
            messages: MessageLog::new(),
        }
    }

    /// Start every trace unit on the event a synchronized-start network
    /// delivers instead of the per-module defaults. Memory modules need
    /// no substitute of their own: their control pair already follows
    /// the core module over the cross-module broadcast.
    pub fn set_start_broadcast(&mut self, net: &BroadcastNetwork) {
        self.core_start = net.start_event(ModuleKind::Core);
        self.start_broadcast =
            Some((net.start_event(ModuleKind::MemTile), net.start_event(ModuleKind::Shim)));
    }

    /// Diagnostics of the last configuration call. Survive a failed
    /// call, so the host still learns which tile fell short.
    pub fn messages(&self) -> &MessageLog {
        &self.messages
    }

    pub fn take_messages(&mut self) -> MessageLog {
        std::mem::take(&mut self.messages)
    }

    /// Configure trace for every requested tile.
    ///
    /// Tiles are visited in (column, row, subtype) order. The first
    /// failure rolls back everything this call configured and returns
    /// the error; diagnostics stay on the configurator.
    pub fn configure(&mut self, tiles: &[TraceTile]) -> Result<ConfiguredTrace, TraceError> {
        let mut out = ConfiguredTrace::default();

        if self.params.flush_enabled() {
            self.messages.push(MessageCode::TraceFlushEnabled, [0; 4]);
            debug!("trace flush enabled, stop events retargeted to firable events");
        }

        let mut ordered: BTreeMap<(u8, u8, ShimSubtype), &TraceTile> = BTreeMap::new();
        for tile in tiles {
            ordered.insert(tile.spec.key(), tile);
        }

        for req in ordered.values() {
            if let Err(e) = self.configure_tile(req, &mut out) {
                warn!("trace configuration failed at {}: {}, rolling back", req.spec.loc, e);
                release_trace(self.io, self.pool, &out);
                return Err(e);
            }
        }
        Ok(out)
    }

    fn configure_tile(&mut self, req: &TraceTile, out: &mut ConfiguredTrace) -> Result<(), TraceError> {
        let loc = req.spec.loc;
        match ModuleKind::classify(loc.row, self.row_offset, HwModule::Core) {
            ModuleKind::Shim => {
                let Some(set) = InterfaceTraceSet::from_wire(req.metric_id) else {
                    warn!("unknown interface trace set {} at {}, skipped", req.metric_id, loc);
                    return Ok(());
                };
                self.configure_interface_tile(req, set, out)
            }
            ModuleKind::MemTile => {
                let Some(set) = MemTileTraceSet::from_wire(req.metric_id) else {
                    warn!("unknown mem tile trace set {} at {}, skipped", req.metric_id, loc);
                    return Ok(());
                };
                self.configure_mem_tile(req, set, out)
            }
            _ => {
                let Some(set) = CoreTraceSet::from_wire(req.metric_id) else {
                    warn!("unknown core trace set {} at {}, skipped", req.metric_id, loc);
                    return Ok(());
                };
                self.configure_aie_tile(req, set, out)
            }
        }
    }

    fn phys(&self, event: EventId) -> Option<u8> {
        self.arch.physical_event(event)
    }

    // ------------------------------------------------------------------
    // AIE tiles
    // ------------------------------------------------------------------

    fn configure_aie_tile(
        &mut self,
        req: &TraceTile,
        set: CoreTraceSet,
        out: &mut ConfiguredTrace,
    ) -> Result<(), TraceError> {
        let loc = req.spec.loc;
        let gen = self.arch.gen();
        let mut rec = TraceTileRecord::new(loc, ModuleKind::Core, set.to_wire());

        if self.params.flush_enabled() {
            out.flush.core.push(loc);
        }

        if !self.aie_tile_has_resources(loc, set) {
            self.messages.push(MessageCode::NoResources, [0; 4]);
            return Err(TraceError::Resources { loc });
        }

        if set == CoreTraceSet::Execution {
            return self.configure_execution_trace(loc, out, rec);
        }

        let mut core_events: SmallVec<[EventId; TRACE_SLOTS]> =
            SmallVec::from_slice(tables::core_trace_events(set));
        let mut cross_events: SmallVec<[EventId; TRACE_SLOTS]> =
            SmallVec::from_slice(tables::memory_cross_events(set));
        let mut memory_events: SmallVec<[EventId; TRACE_SLOTS]> = SmallVec::new();

        // Heartbeat counters. Their counter events join the traced sets
        // so decoders can resynchronize timestamps on quiet streams.
        let core_plan = tables::core_trace_counters(gen, self.params.counter_scheme);
        let mem_plan = tables::memory_trace_counters(gen, self.params.counter_scheme);
        let mut core_got = 0usize;
        let mut mem_got = 0usize;
        for plan in core_plan {
            let Some((counter, event)) =
                self.raw_counter(loc, ModuleKind::Core, plan.start, plan.stop, plan.value, out)?
            else {
                break;
            };
            core_events.push(event);
            if mem_plan.is_empty() {
                cross_events.push(event);
            }
            rec.core.pc[counter as usize] = self.pc_record(plan, event);
            core_got += 1;
        }
        for plan in mem_plan {
            let Some((counter, event)) =
                self.raw_counter(loc, ModuleKind::Dma, plan.start, plan.stop, plan.value, out)?
            else {
                break;
            };
            memory_events.push(event);
            rec.memory.pc[counter as usize] = self.pc_record(plan, event);
            mem_got += 1;
        }
        if core_got < core_plan.len() || mem_got < mem_plan.len() {
            self.messages.push(
                MessageCode::CountersNotReserved,
                [core_plan.len() as u32, mem_plan.len() as u32, loc.col as u32, loc.row as u32],
            );
            return Err(TraceError::Counters { loc });
        }

        // Start scheduling claims its counters before the trace control
        // locks in the start event.
        let mut start = self.core_start;
        if self.params.use_graph_iterator {
            let scheduled = self.configure_start_iteration(loc, out)?;
            start = self.require_start_counter(scheduled, loc)?;
        } else if self.params.use_delay {
            let scheduled = self.configure_start_delay(loc, out)?;
            start = self.require_start_counter(scheduled, loc)?;
        }

        let (Some(start_phys), Some(stop_phys)) = (self.phys(start), self.phys(self.core_stop))
        else {
            warn!("trace control events not encodable on {:?} at {}", gen, loc);
            self.messages.push(
                MessageCode::CoreTraceNotReserved,
                [loc.col as u32, loc.row as u32, 0, 0],
            );
            return Err(TraceError::ControlReserve { loc, kind: ModuleKind::Core });
        };

        // Core module.
        let mut ctrl = TraceControl::new(loc, ModuleKind::Core);
        if core_got > 0 {
            ctrl.note_counters();
        }
        ctrl.set_control_events(start_phys, stop_phys);
        if !ctrl.reserve(self.io, self.pool, false)? {
            self.messages.push(
                MessageCode::CoreTraceNotReserved,
                [loc.col as u32, loc.row as u32, 0, 0],
            );
            return Err(TraceError::ControlReserve { loc, kind: ModuleKind::Core });
        }
        out.controls.push((loc, ModuleKind::Core));

        let mut num_core = 0usize;
        for event in &core_events {
            let Some(phys) = self.phys(*event) else {
                warn!("core trace event {} not encodable on {:?}, skipped", event, gen);
                continue;
            };
            let Some(slot) = self.pool.acquire(loc, ModuleKind::Core, ResourceKind::TraceSlot)
            else {
                break;
            };
            ctrl.bind_slot(self.io, slot, phys)?;
            out.slots.push(SlotHandle { loc, kind: ModuleKind::Core, slot });
            rec.core.traced_events[slot as usize] = phys as u16;
            num_core += 1;
        }
        rec.core.start_event = start_phys as u16;
        rec.core.stop_event = stop_phys as u16;
        out.histograms.core[num_core] += 1;

        ctrl.set_mode(self.io, TraceMode::EventPc)?;
        ctrl.set_packet(self.io, tables::packet_type(ModuleKind::Core))?;
        ctrl.start(self.io)?;

        // Memory module, gated by the same core-side control pair.
        let mut mem_ctrl = TraceControl::new(loc, ModuleKind::Dma);
        if mem_got > 0 {
            mem_ctrl.note_counters();
        }
        mem_ctrl.set_control_events(start_phys, stop_phys);
        if !mem_ctrl.reserve(self.io, self.pool, true)? {
            self.messages.push(
                MessageCode::MemoryTraceNotReserved,
                [loc.col as u32, loc.row as u32 + 1, 0, 0],
            );
            return Err(TraceError::ControlReserve { loc, kind: ModuleKind::Dma });
        }
        out.controls.push((loc, ModuleKind::Dma));

        let mut bc_mask: u32 = 0;
        if let (Some(b0), Some(b1)) = (mem_ctrl.start_bc, mem_ctrl.stop_bc) {
            self.broadcast_core_event(loc, b0, start_phys)?;
            self.broadcast_core_event(loc, b1, stop_phys)?;
            bc_mask |= (1 << b0) | (1 << b1);
            out.broadcasts.push(BcHandle { loc, kind: ModuleKind::Core, bc: b0 });
            out.broadcasts.push(BcHandle { loc, kind: ModuleKind::Core, bc: b1 });
            rec.core.internal_events_broadcast[b0 as usize] = start_phys as u16;
            rec.core.internal_events_broadcast[b1 as usize] = stop_phys as u16;
            rec.memory.start_event = mem_ctrl.start_field as u16;
            rec.memory.stop_event = mem_ctrl.stop_field as u16;
        }

        let mut num_mem = 0usize;
        for event in &cross_events {
            let Some(phys) = self.phys(*event) else {
                warn!("cross trace event {} not encodable on {:?}, skipped", event, gen);
                continue;
            };
            let Some(slot) = self.pool.acquire(loc, ModuleKind::Dma, ResourceKind::TraceSlot)
            else {
                break;
            };
            let Some(bc) = self.pool.acquire(loc, ModuleKind::Core, ResourceKind::BroadcastChannel)
            else {
                self.pool.release(loc, ModuleKind::Dma, ResourceKind::TraceSlot, slot);
                break;
            };
            self.broadcast_core_event(loc, bc, phys)?;
            bc_mask |= 1 << bc;
            let carried = events::broadcast_event(ModuleKind::Dma, bc).in_band() as u8;
            mem_ctrl.bind_slot(self.io, slot, carried)?;
            out.slots.push(SlotHandle { loc, kind: ModuleKind::Dma, slot });
            out.broadcasts.push(BcHandle { loc, kind: ModuleKind::Core, bc });
            rec.core.internal_events_broadcast[bc as usize] = phys as u16;
            rec.memory.traced_events[slot as usize] = carried as u16;
            num_mem += 1;
        }
        for event in &memory_events {
            let Some(phys) = self.phys(*event) else {
                warn!("memory trace event {} not encodable on {:?}, skipped", event, gen);
                continue;
            };
            let Some(slot) = self.pool.acquire(loc, ModuleKind::Dma, ResourceKind::TraceSlot)
            else {
                break;
            };
            mem_ctrl.bind_slot(self.io, slot, phys)?;
            out.slots.push(SlotHandle { loc, kind: ModuleKind::Dma, slot });
            rec.memory.traced_events[slot as usize] = phys as u16;
            num_mem += 1;
        }

        if loc.row % 2 == 1 {
            rec.core.broadcast_mask_east = bc_mask;
        } else {
            rec.core.broadcast_mask_west = bc_mask;
        }
        self.block_internal_broadcasts(loc, bc_mask, out)?;
        out.histograms.memory[num_mem] += 1;

        mem_ctrl.set_mode(self.io, TraceMode::Time)?;
        mem_ctrl.set_packet(self.io, tables::packet_type(ModuleKind::Dma))?;
        mem_ctrl.start(self.io)?;
        rec.memory.packet_type = tables::packet_type(ModuleKind::Dma);

        self.messages.push(
            MessageCode::AllTraceEventsReserved,
            [num_core as u32, num_mem as u32, loc.col as u32, loc.row as u32],
        );
        debug!("trace configured at {}: {} core events, {} memory events", loc, num_core, num_mem);
        out.records.push(rec);
        Ok(())
    }

    /// Raw instruction stream: no event selection beyond one always-true
    /// slot keeping the unit armed, and no memory-module trace at all.
    fn configure_execution_trace(
        &mut self,
        loc: TileLoc,
        out: &mut ConfiguredTrace,
        mut rec: TraceTileRecord,
    ) -> Result<(), TraceError> {
        let (Some(start_phys), Some(stop_phys)) =
            (self.phys(self.core_start), self.phys(self.core_stop))
        else {
            self.messages.push(
                MessageCode::CoreTraceNotReserved,
                [loc.col as u32, loc.row as u32, 0, 0],
            );
            return Err(TraceError::ControlReserve { loc, kind: ModuleKind::Core });
        };

        let mut ctrl = TraceControl::new(loc, ModuleKind::Core);
        ctrl.set_control_events(start_phys, stop_phys);
        if !ctrl.reserve(self.io, self.pool, false)? {
            self.messages.push(
                MessageCode::CoreTraceNotReserved,
                [loc.col as u32, loc.row as u32, 0, 0],
            );
            return Err(TraceError::ControlReserve { loc, kind: ModuleKind::Core });
        }
        out.controls.push((loc, ModuleKind::Core));

        let Some(slot) = self.pool.acquire(loc, ModuleKind::Core, ResourceKind::TraceSlot) else {
            self.messages.push(MessageCode::NoResources, [0; 4]);
            return Err(TraceError::Resources { loc });
        };
        let phys_true = self.phys(core::TRUE).unwrap_or(1);
        ctrl.bind_slot(self.io, slot, phys_true)?;
        out.slots.push(SlotHandle { loc, kind: ModuleKind::Core, slot });
        rec.core.traced_events[slot as usize] = phys_true as u16;
        rec.core.start_event = start_phys as u16;
        rec.core.stop_event = stop_phys as u16;
        out.histograms.core[1] += 1;

        ctrl.set_mode(self.io, TraceMode::InstExec)?;
        ctrl.set_packet(self.io, tables::packet_type(ModuleKind::Core))?;
        ctrl.start(self.io)?;

        self.messages.push(
            MessageCode::AllTraceEventsReserved,
            [1, 0, loc.col as u32, loc.row as u32],
        );
        out.records.push(rec);
        Ok(())
    }

    fn aie_tile_has_resources(&mut self, loc: TileLoc, set: CoreTraceSet) -> bool {
        let gen = self.arch.gen();
        let scheme = self.params.counter_scheme;
        let core_counters = tables::core_trace_counters(gen, scheme).len();
        let mem_counters = tables::memory_trace_counters(gen, scheme).len();
        let cross = tables::memory_cross_events(set).len();

        if set != CoreTraceSet::Execution {
            let available = self.pool.available(loc, ModuleKind::Dma, ResourceKind::PerfCounter);
            if available < mem_counters {
                self.messages.push(
                    MessageCode::NoMemoryCounters,
                    [available as u32, mem_counters as u32, 0, 0],
                );
                return false;
            }
            let available = self.pool.available(loc, ModuleKind::Dma, ResourceKind::TraceSlot);
            let required = mem_counters + cross;
            if available < required {
                self.messages.push(
                    MessageCode::NoMemoryTraceSlots,
                    [available as u32, required as u32, 0, 0],
                );
                return false;
            }
        }

        let mut extra = 0;
        if self.params.use_delay {
            extra += 1;
            if !self.params.use_one_delay_counter {
                extra += 1;
            }
        } else if self.params.use_graph_iterator {
            extra += 1;
        }
        let available = self.pool.available(loc, ModuleKind::Core, ResourceKind::PerfCounter);
        let required = core_counters + extra;
        if available < required {
            self.messages.push(
                MessageCode::NoCoreCounters,
                [available as u32, required as u32, 0, 0],
            );
            return false;
        }

        let available = self.pool.available(loc, ModuleKind::Core, ResourceKind::TraceSlot);
        let required = core_counters
            + if set == CoreTraceSet::Execution { 1 } else { tables::core_trace_events(set).len() };
        if available < required {
            self.messages.push(
                MessageCode::NoCoreTraceSlots,
                [available as u32, required as u32, 0, 0],
            );
            return false;
        }

        if set != CoreTraceSet::Execution {
            let available =
                self.pool.available(loc, ModuleKind::Core, ResourceKind::BroadcastChannel);
            let required = cross + 2;
            if available < required {
                self.messages.push(
                    MessageCode::NoCoreBroadcastChannels,
                    [available as u32, required as u32, 0, 0],
                );
                return false;
            }
        }
        true
    }

    fn pc_record(&self, plan: &tables::TraceCounter, counter_event: EventId) -> TracePcRecord {
        TracePcRecord {
            start_event: self.phys(plan.start).unwrap_or(0) as u16,
            stop_event: self.phys(plan.stop).unwrap_or(0) as u16,
            reset_event: self.phys(counter_event).unwrap_or(0) as u16,
            event_value: plan.value,
        }
    }

    /// Bind one self-resetting counter: counts `start`..`stop`, rolls
    /// over every `value` and fires its own counter event.
    fn raw_counter(
        &mut self,
        loc: TileLoc,
        kind: ModuleKind,
        start: EventId,
        stop: EventId,
        value: u32,
        out: &mut ConfiguredTrace,
    ) -> Result<Option<(u8, EventId)>, AccessError> {
        let Some(counter) = self.pool.acquire(loc, kind, ResourceKind::PerfCounter) else {
            return Ok(None);
        };
        let event = counter_event(kind, counter);
        let (Some(phys_start), Some(phys_stop), Some(phys_reset)) =
            (self.phys(start), self.phys(stop), self.phys(event))
        else {
            warn!("counter events not encodable at {} {}, counter skipped", loc, kind);
            self.pool.release(loc, kind, ResourceKind::PerfCounter, counter);
            return Ok(None);
        };

        self.io.write(
            TileAddress::new(loc.col, loc.row, registers::perf_event_value_reg(kind, counter)),
            value,
        )?;
        let (reg, shift) = registers::perf_reset_reg(kind, counter);
        self.io.mask_write(
            TileAddress::new(loc.col, loc.row, reg),
            PERF_EVENT_MASK << shift,
            (phys_reset as u32) << shift,
        )?;
        let (reg, shift) = registers::perf_control_reg(kind, counter);
        let ctrl_value = ((phys_start as u32 & PERF_EVENT_MASK) << (PERF_START_SHIFT + shift))
            | ((phys_stop as u32 & PERF_EVENT_MASK) << (PERF_STOP_SHIFT + shift));
        let ctrl_mask = (PERF_EVENT_MASK << (PERF_START_SHIFT + shift))
            | (PERF_EVENT_MASK << (PERF_STOP_SHIFT + shift));
        self.io.mask_write(TileAddress::new(loc.col, loc.row, reg), ctrl_mask, ctrl_value)?;

        out.counters.push(CounterHandle { loc, kind, counter });
        Ok(Some((counter, event)))
    }

    fn require_start_counter(
        &mut self,
        scheduled: Option<EventId>,
        loc: TileLoc,
    ) -> Result<EventId, TraceError> {
        match scheduled {
            Some(event) => Ok(event),
            None => {
                self.messages.push(
                    MessageCode::CountersNotReserved,
                    [1, 0, loc.col as u32, loc.row as u32],
                );
                Err(TraceError::Counters { loc })
            }
        }
    }

    /// Start after N iterations: a counter on the graph iteration event
    /// rolls over at the requested count and its counter event becomes
    /// the trace start.
    fn configure_start_iteration(
        &mut self,
        loc: TileLoc,
        out: &mut ConfiguredTrace,
    ) -> Result<Option<EventId>, AccessError> {
        let count = self.params.iteration_count;
        debug!("trace start scheduled after {} iterations at {}", count, loc);
        Ok(self
            .raw_counter(loc, ModuleKind::Core, core::INSTR_EVENT_0, core::INSTR_EVENT_0, count, out)?
            .map(|(_, event)| event))
    }

    /// Start after N cycles. One counter handles what fits in 32 bits;
    /// longer delays chain a second counter that counts the first one's
    /// rollovers.
    fn configure_start_delay(
        &mut self,
        loc: TileLoc,
        out: &mut ConfiguredTrace,
    ) -> Result<Option<EventId>, AccessError> {
        let delay = self.params.delay_cycles.max(1);
        let (high, low) = if self.params.use_one_delay_counter {
            (0u32, delay as u32)
        } else {
            let high = 1 + ((delay - 1) / u32::MAX as u64);
            (high as u32, (delay / high) as u32)
        };
        debug!("trace start delayed {} cycles at {} (low {}, high {})", delay, loc, low, high);

        let Some((_, first)) =
            self.raw_counter(loc, ModuleKind::Core, core::ACTIVE, core::DISABLED, low, out)?
        else {
            return Ok(None);
        };
        if self.params.use_one_delay_counter {
            return Ok(Some(first));
        }
        Ok(self
            .raw_counter(loc, ModuleKind::Core, first, first, high, out)?
            .map(|(_, event)| event))
    }

    /// Put a core event on a broadcast channel so the memory module can
    /// see it.
    fn broadcast_core_event(&mut self, loc: TileLoc, bc: u8, phys: u8) -> Result<(), AccessError> {
        let reg = registers::event_broadcast_reg(ModuleKind::Core, bc);
        self.io.write(TileAddress::new(loc.col, loc.row, reg), phys as u32)
    }

    /// Keep tile-internal broadcasts inside the tile. The core module
    /// forwards only toward its memory module (east on odd rows, west on
    /// even, following the checkerboard layout); the memory module
    /// forwards nowhere.
    fn block_internal_broadcasts(
        &mut self,
        loc: TileLoc,
        mask: u32,
        out: &mut ConfiguredTrace,
    ) -> Result<(), AccessError> {
        if mask == 0 {
            return Ok(());
        }
        let through = if loc.row % 2 == 1 { BlockDir::East } else { BlockDir::West };
        for dir in BlockDir::ALL {
            if dir != through {
                self.block(loc, ModuleKind::Core, dir, mask, out)?;
            }
            self.block(loc, ModuleKind::Dma, dir, mask, out)?;
        }
        Ok(())
    }

    fn block(
        &mut self,
        loc: TileLoc,
        kind: ModuleKind,
        dir: BlockDir,
        mask: u32,
        out: &mut ConfiguredTrace,
    ) -> Result<(), AccessError> {
        let reg = registers::broadcast_block_set_reg(kind, dir);
        self.io.write(TileAddress::new(loc.col, loc.row, reg), mask)?;
        out.blocks.push(BlockHandle { loc, kind, dir, mask });
        Ok(())
    }

    // ------------------------------------------------------------------
    // Mem tiles
    // ------------------------------------------------------------------

    fn configure_mem_tile(
        &mut self,
        req: &TraceTile,
        set: MemTileTraceSet,
        out: &mut ConfiguredTrace,
    ) -> Result<(), TraceError> {
        let loc = req.spec.loc;
        let gen = self.arch.gen();
        let mut rec = TraceTileRecord::new(loc, ModuleKind::MemTile, set.to_wire());

        // Mem tile stop events are user events nothing else fires, so
        // these tiles always need the software flush.
        out.flush.mem_tile.push(loc);

        if !self.mem_tile_has_resources(loc, set) {
            self.messages.push(MessageCode::NoResources, [0; 4]);
            return Err(TraceError::Resources { loc });
        }

        let start = match self.start_broadcast {
            Some((mem_tile_start, _)) => mem_tile_start,
            None => tables::default_start_event(ModuleKind::MemTile),
        };
        let stop = tables::flush_stop_event(ModuleKind::MemTile);
        let (Some(start_phys), Some(stop_phys)) = (self.phys(start), self.phys(stop)) else {
            self.messages.push(
                MessageCode::MemoryTraceNotReserved,
                [loc.col as u32, loc.row as u32 + 1, 0, 0],
            );
            return Err(TraceError::ControlReserve { loc, kind: ModuleKind::MemTile });
        };

        let mut ctrl = TraceControl::new(loc, ModuleKind::MemTile);
        ctrl.set_control_events(start_phys, stop_phys);
        if !ctrl.reserve(self.io, self.pool, false)? {
            self.messages.push(
                MessageCode::MemoryTraceNotReserved,
                [loc.col as u32, loc.row as u32 + 1, 0, 0],
            );
            return Err(TraceError::ControlReserve { loc, kind: ModuleKind::MemTile });
        }
        out.controls.push((loc, ModuleKind::MemTile));

        let channel0 = req.channel0.unwrap_or(0);
        let channel1 = req.channel1.unwrap_or(1);
        self.config_event_selections(loc, set, channel0, channel1)?;
        rec.mem_tile.port_trace_ids = [channel0, channel1];
        if set.is_input() {
            rec.mem_tile.port_trace_is_master = [1, 1];
            rec.mem_tile.s2mm_channels[0] = channel0 as i8;
            if channel0 != channel1 {
                rec.mem_tile.s2mm_channels[1] = channel1 as i8;
            }
        } else {
            rec.mem_tile.port_trace_is_master = [0, 0];
            rec.mem_tile.mm2s_channels[0] = channel0 as i8;
            if channel0 != channel1 {
                rec.mem_tile.mm2s_channels[1] = channel1 as i8;
            }
        }

        let mut num = 0usize;
        for event in tables::mem_tile_trace_events(set) {
            let Some(phys) = self.phys(*event) else {
                warn!("mem tile trace event {} not encodable on {:?}, skipped", event, gen);
                continue;
            };
            let Some(slot) = self.pool.acquire(loc, ModuleKind::MemTile, ResourceKind::TraceSlot)
            else {
                break;
            };
            ctrl.bind_slot(self.io, slot, phys)?;
            out.slots.push(SlotHandle { loc, kind: ModuleKind::MemTile, slot });
            rec.mem_tile.traced_events[slot as usize] = phys as u16;
            num += 1;
        }
        rec.mem_tile.start_event = start_phys as u16;
        rec.mem_tile.stop_event = stop_phys as u16;
        out.histograms.mem_tile[num] += 1;

        ctrl.set_mode(self.io, TraceMode::Time)?;
        ctrl.set_packet(self.io, tables::packet_type(ModuleKind::MemTile))?;
        ctrl.start(self.io)?;
        rec.mem_tile.packet_type = tables::packet_type(ModuleKind::MemTile);

        self.messages.push(
            MessageCode::AllTraceEventsReserved,
            [0, num as u32, loc.col as u32, loc.row as u32],
        );
        debug!("mem tile trace configured at {}: {} events", loc, num);
        out.records.push(rec);
        Ok(())
    }

    fn mem_tile_has_resources(&mut self, loc: TileLoc, set: MemTileTraceSet) -> bool {
        let available = self.pool.available(loc, ModuleKind::MemTile, ResourceKind::TraceSlot);
        let required = tables::mem_tile_trace_events(set).len();
        if available < required {
            self.messages.push(
                MessageCode::NoMemoryTraceSlots,
                [available as u32, required as u32, 0, 0],
            );
            return false;
        }
        true
    }

    /// Point the mem tile's DMA event selectors at the traced channels.
    fn config_event_selections(
        &mut self,
        loc: TileLoc,
        set: MemTileTraceSet,
        channel0: u8,
        channel1: u8,
    ) -> Result<(), AccessError> {
        let mm2s_bit = if set.is_input() { 0u32 } else { 0x80 };
        let addr = TileAddress::new(loc.col, loc.row, mem_tile_module::DMA_EVENT_CHANNEL_SELECTION);
        self.io.mask_write(addr, 0xFF, (channel0 as u32 & 0x1F) | mm2s_bit)?;
        self.io.mask_write(addr, 0xFF00, ((channel1 as u32 & 0x1F) | mm2s_bit) << 8)
    }

    // ------------------------------------------------------------------
    // Interface tiles
    // ------------------------------------------------------------------

    fn configure_interface_tile(
        &mut self,
        req: &TraceTile,
        set: InterfaceTraceSet,
        out: &mut ConfiguredTrace,
    ) -> Result<(), TraceError> {
        let loc = req.spec.loc;
        let gen = self.arch.gen();
        let mut rec = TraceTileRecord::new(loc, ModuleKind::Shim, set.to_wire());

        out.flush.interface.push(loc);

        let channel0 = req.channel0.unwrap_or(0);
        let channel1 = req.channel1.unwrap_or(1);
        let mut trace_events: SmallVec<[EventId; TRACE_SLOTS]> =
            SmallVec::from_slice(tables::interface_trace_events(set));
        tables::modify_interface_events(req.spec.subtype, set, channel0, &mut trace_events);

        rec.mem_tile.port_trace_ids = [channel0, channel1];
        if set.is_input() {
            // Interface tiles watch the array-bound side, so input moves
            // through MM2S and the monitored ports are slaves. The mem
            // tile designation is the other way around.
            rec.mem_tile.port_trace_is_master = [0, 0];
            rec.mem_tile.mm2s_channels[0] = channel0 as i8;
            if channel0 != channel1 {
                rec.mem_tile.mm2s_channels[1] = channel1 as i8;
            }
        } else {
            rec.mem_tile.port_trace_is_master = [1, 1];
            rec.mem_tile.s2mm_channels[0] = channel0 as i8;
            if channel0 != channel1 {
                rec.mem_tile.s2mm_channels[1] = channel1 as i8;
            }
        }

        self.configure_trace_switch_ports(&req.spec, &trace_events, out)?;

        let start = match self.start_broadcast {
            Some((_, shim_start)) => shim_start,
            None => tables::default_start_event(ModuleKind::Shim),
        };
        let stop = tables::flush_stop_event(ModuleKind::Shim);
        let (Some(start_phys), Some(stop_phys)) = (self.phys(start), self.phys(stop)) else {
            self.messages.push(
                MessageCode::NoResources,
                [loc.col as u32, loc.row as u32, 0, 0],
            );
            return Err(TraceError::ControlReserve { loc, kind: ModuleKind::Shim });
        };

        let mut ctrl = TraceControl::new(loc, ModuleKind::Shim);
        ctrl.set_control_events(start_phys, stop_phys);
        if !ctrl.reserve(self.io, self.pool, false)? {
            self.messages.push(
                MessageCode::NoResources,
                [loc.col as u32, loc.row as u32, 0, 0],
            );
            return Err(TraceError::ControlReserve { loc, kind: ModuleKind::Shim });
        }
        out.controls.push((loc, ModuleKind::Shim));

        let mut num = 0usize;
        for event in &trace_events {
            let Some(phys) = self.phys(*event) else {
                warn!("interface trace event {} not encodable on {:?}, skipped", event, gen);
                continue;
            };
            let Some(slot) = self.pool.acquire(loc, ModuleKind::Shim, ResourceKind::TraceSlot)
            else {
                break;
            };
            ctrl.bind_slot(self.io, slot, phys)?;
            out.slots.push(SlotHandle { loc, kind: ModuleKind::Shim, slot });
            rec.mem_tile.traced_events[slot as usize] = phys as u16;
            num += 1;
        }
        rec.mem_tile.start_event = start_phys as u16;
        rec.mem_tile.stop_event = stop_phys as u16;

        ctrl.set_mode(self.io, TraceMode::Time)?;
        ctrl.set_packet(self.io, tables::packet_type(ModuleKind::Shim))?;
        ctrl.start(self.io)?;
        rec.mem_tile.packet_type = tables::packet_type(ModuleKind::Shim);

        debug!("interface trace configured at {}: {} events", loc, num);
        out.records.push(rec);
        Ok(())
    }

    /// Bind one stream-switch monitor slot per distinct port behind the
    /// traced port events. The south port to watch and its direction
    /// come from the tile spec.
    fn configure_trace_switch_ports(
        &mut self,
        tile: &TileSpec,
        trace_events: &[EventId],
        out: &mut ConfiguredTrace,
    ) -> Result<(), AccessError> {
        let loc = tile.loc;
        let mut seen: u32 = 0;
        for event in trace_events {
            let Some(port) = events::monitor_port_number(*event) else {
                continue;
            };
            if seen & (1 << port) != 0 {
                continue;
            }
            seen |= 1 << port;

            let Some(slot) = self.pool.acquire(loc, ModuleKind::Shim, ResourceKind::StreamPort)
            else {
                break;
            };
            let master = tile.stream_col != 0;
            let port_id = SHIM_SOUTH_PORT_BASE + tile.stream_row as u8;
            let (reg, shift) = registers::ss_event_port_reg(ModuleKind::Shim, slot);
            let mut byte = port_id as u32 & SS_EVENT_PORT_ID_MASK;
            if master {
                byte |= SS_EVENT_PORT_MASTER_BIT;
            }
            self.io.mask_write(
                TileAddress::new(loc.col, loc.row, reg),
                0xFF << shift,
                byte << shift,
            )?;
            out.ports.push(PortHandle { loc, kind: ModuleKind::Shim, slot });
        }
        Ok(())
    }
}

/// Counter event fired when counter `counter` rolls over.
fn counter_event(kind: ModuleKind, counter: u8) -> EventId {
    let base = match kind {
        ModuleKind::Dma => mem::PERF_CNT_0,
        ModuleKind::Shim => pl::PERF_CNT_0,
        ModuleKind::MemTile => mem_tile::PERF_CNT_0,
        ModuleKind::Core => core::PERF_CNT_0,
    };
    EventId(base.0 + counter as u16)
}

/// Cascade the four input events into one: combo 0 ORs the first pair,
/// combo 1 the second, combo 2 ORs both combos. Returns the event that
/// fires when any input does; the inputs land in the record so host
/// decoders can name the sources behind it.
pub fn configure_combo_or(
    io: &mut dyn RegisterIo,
    arch: &dyn ArchCaps,
    loc: TileLoc,
    kind: ModuleKind,
    inputs: [EventId; 4],
    record: &mut CoreTraceRecord,
) -> Result<EventId, AccessError> {
    let mut word = 0u32;
    for (i, event) in inputs.iter().enumerate() {
        let phys = arch.physical_event(*event).unwrap_or(0);
        word |= (phys as u32) << (i * 8);
        record.combo_event_input[i] = phys as u16;
    }
    io.write(TileAddress::new(loc.col, loc.row, registers::combo_inputs_reg(kind)), word)?;

    let mut control = 0u32;
    for i in 0..3 {
        control |= COMBO_OR << (i * 8);
        record.combo_event_control[i] = COMBO_OR as u16;
    }
    io.write(TileAddress::new(loc.col, loc.row, registers::combo_control_reg(kind)), control)?;

    let combo = match kind {
        ModuleKind::Core => core::COMBO_EVENT_2,
        ModuleKind::Dma => mem::COMBO_EVENT_2,
        ModuleKind::Shim => pl::COMBO_EVENT_2,
        ModuleKind::MemTile => mem_tile::COMBO_EVENT_2,
    };
    Ok(combo)
}

/// Fire the stop events on every flush-marked tile so buffered trace
/// packets drain before the session ends.
pub fn flush_trace(
    io: &mut dyn RegisterIo,
    arch: &dyn ArchCaps,
    plan: &FlushPlan,
) -> Result<(), AccessError> {
    if plan.is_empty() {
        return Ok(());
    }
    let fire = |io: &mut dyn RegisterIo, loc: &TileLoc, kind: ModuleKind, event: EventId| {
        let Some(phys) = arch.physical_event(event) else {
            return Ok(());
        };
        let reg = registers::event_generate_reg(kind);
        io.write(TileAddress::new(loc.col, loc.row, reg), phys as u32)
    };
    for loc in &plan.core {
        fire(io, loc, ModuleKind::Core, plan.core_stop)?;
    }
    for loc in &plan.mem_tile {
        fire(io, loc, ModuleKind::MemTile, plan.mem_tile_stop)?;
    }
    for loc in &plan.interface {
        fire(io, loc, ModuleKind::Shim, plan.interface_stop)?;
    }
    debug!(
        "trace flushed: {} core, {} mem tile, {} interface tiles",
        plan.core.len(),
        plan.mem_tile.len(),
        plan.interface.len()
    );
    Ok(())
}

/// Stop every configured trace unit and hand all reservations back.
///
/// Teardown keeps going past individual faults so one dead tile cannot
/// pin resources on the rest of the array.
pub fn release_trace(
    io: &mut dyn RegisterIo,
    pool: &mut dyn ResourcePool,
    configured: &ConfiguredTrace,
) {
    for (loc, kind) in &configured.controls {
        for reg in [registers::trace_control0_reg(*kind), registers::trace_control1_reg(*kind)] {
            let addr = TileAddress::new(loc.col, loc.row, reg);
            if let Err(e) = io.write(addr, 0) {
                warn!("failed to stop trace control at {} {}: {}", loc, kind, e);
            }
        }
    }
    for handle in &configured.slots {
        let (reg, shift) = registers::trace_event_slot_reg(handle.kind, handle.slot);
        let addr = TileAddress::new(handle.loc.col, handle.loc.row, reg);
        if let Err(e) = io.mask_write(addr, 0xFF << shift, 0) {
            warn!("failed to unbind trace slot {} at {}: {}", handle.slot, handle.loc, e);
        }
        pool.release(handle.loc, handle.kind, ResourceKind::TraceSlot, handle.slot);
    }
    for handle in &configured.broadcasts {
        let reg = registers::event_broadcast_reg(handle.kind, handle.bc);
        let addr = TileAddress::new(handle.loc.col, handle.loc.row, reg);
        if let Err(e) = io.write(addr, 0) {
            warn!("failed to silence broadcast {} at {}: {}", handle.bc, handle.loc, e);
        }
        pool.release(handle.loc, handle.kind, ResourceKind::BroadcastChannel, handle.bc);
    }
    for handle in &configured.blocks {
        let reg = registers::broadcast_block_clr_reg(handle.kind, handle.dir);
        let addr = TileAddress::new(handle.loc.col, handle.loc.row, reg);
        if let Err(e) = io.write(addr, handle.mask) {
            warn!("failed to unblock broadcasts at {} {}: {}", handle.loc, handle.kind, e);
        }
    }
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

#[cfg(test)]
mod tests {
    use super::*;
    use crate::device::access::{FaultingIo, RegisterModel};
    use crate::device::{arch_for, AieGen};
    use crate::resources::TrackedPool;
    use crate::trace::tables::CounterScheme;

    fn aie_request(col: u8, row: u8, set: CoreTraceSet) -> TraceTile {
        TraceTile::new(TileSpec::new(col, row), set.to_wire())
    }

    #[test]
    fn test_functions_set_configures_both_modules() {
        let mut io = RegisterModel::new();
        let mut pool = TrackedPool::new();
        let arch = arch_for(AieGen::Aie2);
        let mut cfg =
            TraceConfigurator::new(&mut io, &mut pool, arch, 1, TraceParams::default());

        let out = cfg.configure(&[aie_request(0, 2, CoreTraceSet::Functions)]).unwrap();

        assert_eq!(out.records.len(), 1);
        let rec = &out.records[0];
        assert_eq!((rec.col, rec.row, rec.module), (0, 2, 0));

        // Core module: the set's two events, gated on active/disabled.
        assert_eq!(rec.core.traced_events[..2], [28, 29]);
        assert_eq!((rec.core.start_event, rec.core.stop_event), (21, 22));
        assert_eq!(out.histograms.core[2], 1);

        // Memory module sees everything through broadcasts: control pair
        // on channels 0/1, the two cross events on 2/3.
        assert_eq!((rec.memory.start_event, rec.memory.stop_event), (107, 108));
        assert_eq!(rec.memory.traced_events[..2], [109, 110]);
        assert_eq!(rec.core.internal_events_broadcast[..4], [21, 22, 28, 29]);
        assert_eq!(out.histograms.memory[2], 1);
        assert_eq!(rec.memory.packet_type, 1);

        // Even row: the memory module sits west of the core.
        assert_eq!(rec.core.broadcast_mask_west, 0xF);
        assert_eq!(rec.core.broadcast_mask_east, 0);

        assert!(cfg.messages().contains(MessageCode::AllTraceEventsReserved));

        let loc = TileLoc::new(0, 2);
        let ctrl0 = io.peek(TileAddress::new(0, 2, registers::trace_control0_reg(ModuleKind::Core)));
        assert_eq!(ctrl0, 21 | (22 << 16) | (1 << 24));
        let ctrl1 = io.peek(TileAddress::new(0, 2, registers::trace_control1_reg(ModuleKind::Core)));
        assert_eq!(ctrl1, 0);
        let mem0 = io.peek(TileAddress::new(0, 2, registers::trace_control0_reg(ModuleKind::Dma)));
        assert_eq!(mem0, 107 | (108 << 16));
        let mem1 = io.peek(TileAddress::new(0, 2, registers::trace_control1_reg(ModuleKind::Dma)));
        assert_eq!(mem1, 1);

        // Slot registers carry the physical event bytes.
        let (reg, _) = registers::trace_event_slot_reg(ModuleKind::Core, 0);
        assert_eq!(io.peek(TileAddress::new(0, 2, reg)), 28 | (29 << 8));
        let (reg, _) = registers::trace_event_slot_reg(ModuleKind::Dma, 0);
        assert_eq!(io.peek(TileAddress::new(0, 2, reg)), 109 | (110 << 8));

        // Broadcast regs carry the core-side sources.
        let bc0 = registers::event_broadcast_reg(ModuleKind::Core, 0);
        assert_eq!(io.peek(TileAddress::new(0, 2, bc0)), 21);
        let bc2 = registers::event_broadcast_reg(ModuleKind::Core, 2);
        assert_eq!(io.peek(TileAddress::new(0, 2, bc2)), 28);

        // Core forwards only west (even row); memory forwards nowhere.
        let south = registers::broadcast_block_set_reg(ModuleKind::Core, BlockDir::South);
        assert_eq!(io.peek(TileAddress::new(0, 2, south)), 0xF);
        let west = registers::broadcast_block_set_reg(ModuleKind::Core, BlockDir::West);
        assert_eq!(io.peek(TileAddress::new(0, 2, west)), 0);
        let mem_west = registers::broadcast_block_set_reg(ModuleKind::Dma, BlockDir::West);
        assert_eq!(io.peek(TileAddress::new(0, 2, mem_west)), 0xF);

        assert_eq!(out.controls, vec![(loc, ModuleKind::Core), (loc, ModuleKind::Dma)]);
        assert!(out.flush.core.is_empty());
    }

    #[test]
    fn test_all_stalls_set_crosses_four_stall_events() {
        let mut io = RegisterModel::new();
        let mut pool = TrackedPool::new();
        let arch = arch_for(AieGen::Aie2);
        let mut cfg =
            TraceConfigurator::new(&mut io, &mut pool, arch, 1, TraceParams::default());

        let out = cfg.configure(&[aie_request(1, 1, CoreTraceSet::AllStalls)]).unwrap();

        let rec = &out.records[0];
        // Control pair on channels 0/1, call/return on 2/3, then memory
        // stall, stream stall, cascade stall, lock stall on 4-7.
        assert_eq!(
            rec.memory.traced_events[..6],
            [109, 110, 111, 112, 113, 114]
        );
        assert_eq!(rec.core.internal_events_broadcast[2..8], [28, 29, 16, 17, 18, 19]);
        assert_eq!(out.histograms.memory[6], 1);
        // Odd row: the memory module sits east.
        assert_eq!(rec.core.broadcast_mask_east, 0xFF);
        let east = registers::broadcast_block_set_reg(ModuleKind::Core, BlockDir::East);
        assert_eq!(io.peek(TileAddress::new(1, 1, east)), 0);
        let north = registers::broadcast_block_set_reg(ModuleKind::Core, BlockDir::North);
        assert_eq!(io.peek(TileAddress::new(1, 1, north)), 0xFF);
    }

    #[test]
    fn test_aie1_heartbeat_counters_join_trace() {
        let mut io = RegisterModel::new();
        let mut pool = TrackedPool::new();
        let arch = arch_for(AieGen::Aie1);
        let params = TraceParams { counter_scheme: CounterScheme::Es1, ..Default::default() };
        let mut cfg = TraceConfigurator::new(&mut io, &mut pool, arch, 1, params);

        let out = cfg.configure(&[aie_request(0, 3, CoreTraceSet::Functions)]).unwrap();

        assert_eq!(out.counters.len(), 4);
        let rec = &out.records[0];
        // AIE1 renumbers the program-flow band up by seven.
        assert_eq!(rec.core.traced_events[..4], [35, 36, 5, 6]);
        assert_eq!(out.histograms.core[4], 1);
        assert_eq!(
            rec.core.pc[0],
            TracePcRecord { start_event: 28, stop_event: 29, reset_event: 5, event_value: 1020 }
        );
        assert_eq!(rec.core.pc[1].event_value, 1020 * 1020);
        assert_eq!(
            rec.memory.pc[0],
            TracePcRecord { start_event: 1, stop_event: 0, reset_event: 5, event_value: 1020 }
        );

        // Memory slots: cross events first, native counter events after.
        assert_eq!(rec.memory.traced_events[..4], [109, 110, 5, 6]);
        assert_eq!(out.histograms.memory[4], 1);
        assert_eq!(rec.core.broadcast_mask_east, 0xF);

        let thr0 = registers::perf_event_value_reg(ModuleKind::Core, 0);
        assert_eq!(io.peek(TileAddress::new(0, 3, thr0)), 1020);
        let thr1 = registers::perf_event_value_reg(ModuleKind::Core, 1);
        assert_eq!(io.peek(TileAddress::new(0, 3, thr1)), 1020 * 1020);
    }

    #[test]
    fn test_delay_chains_two_counters() {
        let mut io = RegisterModel::new();
        let mut pool = TrackedPool::new();
        let arch = arch_for(AieGen::Aie2);
        let params = TraceParams {
            use_delay: true,
            delay_cycles: 1 << 33,
            ..Default::default()
        };
        let mut cfg = TraceConfigurator::new(&mut io, &mut pool, arch, 1, params);

        let out = cfg.configure(&[aie_request(0, 1, CoreTraceSet::Functions)]).unwrap();

        assert_eq!(out.counters.len(), 2);
        let rec = &out.records[0];
        // Trace starts on the second counter's rollover event.
        assert_eq!(rec.core.start_event, 6);
        // Flush control retargets the stop at the firable instr event.
        assert_eq!(rec.core.stop_event, 27);
        assert_eq!(out.flush.core, vec![TileLoc::new(0, 1)]);
        assert!(cfg.messages().contains(MessageCode::TraceFlushEnabled));

        // 2^33 cycles split as high rollovers of a low-cycle counter.
        let high = 1 + (((1u64 << 33) - 1) / u32::MAX as u64) as u32;
        let low = ((1u64 << 33) / high as u64) as u32;
        let thr0 = registers::perf_event_value_reg(ModuleKind::Core, 0);
        assert_eq!(io.peek(TileAddress::new(0, 1, thr0)), low);
        let thr1 = registers::perf_event_value_reg(ModuleKind::Core, 1);
        assert_eq!(io.peek(TileAddress::new(0, 1, thr1)), high);

        // The second counter counts the first one's event.
        let (reg, shift) = registers::perf_control_reg(ModuleKind::Core, 1);
        let word = io.peek(TileAddress::new(0, 1, reg));
        assert_eq!((word >> (PERF_START_SHIFT + shift)) & PERF_EVENT_MASK, 5);
        assert_eq!((word >> (PERF_STOP_SHIFT + shift)) & PERF_EVENT_MASK, 5);
    }

    #[test]
    fn test_one_delay_counter_takes_truncated_cycles() {
        let mut io = RegisterModel::new();
        let mut pool = TrackedPool::new();
        let arch = arch_for(AieGen::Aie2);
        let params = TraceParams {
            use_delay: true,
            use_one_delay_counter: true,
            delay_cycles: 5000,
            ..Default::default()
        };
        let mut cfg = TraceConfigurator::new(&mut io, &mut pool, arch, 1, params);

        let out = cfg.configure(&[aie_request(0, 1, CoreTraceSet::Functions)]).unwrap();

        assert_eq!(out.counters.len(), 1);
        assert_eq!(out.records[0].core.start_event, 5);
        let thr0 = registers::perf_event_value_reg(ModuleKind::Core, 0);
        assert_eq!(io.peek(TileAddress::new(0, 1, thr0)), 5000);
    }

    #[test]
    fn test_graph_iterator_start() {
        let mut io = RegisterModel::new();
        let mut pool = TrackedPool::new();
        let arch = arch_for(AieGen::Aie2);
        let params = TraceParams {
            use_graph_iterator: true,
            iteration_count: 17,
            ..Default::default()
        };
        let mut cfg = TraceConfigurator::new(&mut io, &mut pool, arch, 1, params);

        let out = cfg.configure(&[aie_request(2, 4, CoreTraceSet::Functions)]).unwrap();

        let rec = &out.records[0];
        assert_eq!(rec.core.start_event, 5);
        let thr0 = registers::perf_event_value_reg(ModuleKind::Core, 0);
        assert_eq!(io.peek(TileAddress::new(2, 4, thr0)), 17);
        // The counter watches the iteration event on both edges.
        let (reg, shift) = registers::perf_control_reg(ModuleKind::Core, 0);
        let word = io.peek(TileAddress::new(2, 4, reg));
        assert_eq!((word >> (PERF_START_SHIFT + shift)) & PERF_EVENT_MASK, 26);
        assert_eq!((word >> (PERF_STOP_SHIFT + shift)) & PERF_EVENT_MASK, 26);
    }

    #[test]
    fn test_execution_set_streams_raw_instructions() {
        let mut io = RegisterModel::new();
        let mut pool = TrackedPool::new();
        let arch = arch_for(AieGen::Npu3);
        let mut cfg =
            TraceConfigurator::new(&mut io, &mut pool, arch, 1, TraceParams::default());

        let out = cfg.configure(&[aie_request(0, 1, CoreTraceSet::Execution)]).unwrap();

        let rec = &out.records[0];
        assert_eq!(rec.core.traced_events[0], 1);
        assert_eq!(out.histograms.core[1], 1);
        // No memory-module trace at all for execution streams.
        assert_eq!(rec.memory.start_event, 0);
        assert!(out.broadcasts.is_empty());
        assert_eq!(out.controls, vec![(TileLoc::new(0, 1), ModuleKind::Core)]);

        let ctrl0 = io.peek(TileAddress::new(0, 1, registers::trace_control0_reg(ModuleKind::Core)));
        assert_eq!(ctrl0, 21 | (22 << 16) | (2 << 24));
    }

    #[test]
    fn test_mem_tile_input_channels() {
        let mut io = RegisterModel::new();
        let mut pool = TrackedPool::new();
        let arch = arch_for(AieGen::Aie2);
        let mut cfg =
            TraceConfigurator::new(&mut io, &mut pool, arch, 2, TraceParams::default());

        let mut req = TraceTile::new(TileSpec::new(1, 1), MemTileTraceSet::InputChannels.to_wire());
        req.channel0 = Some(0);
        req.channel1 = Some(1);
        let out = cfg.configure(&[req]).unwrap();

        let rec = &out.records[0];
        assert_eq!(rec.module, 3);
        assert_eq!(rec.mem_tile.traced_events[..6], [19, 20, 23, 24, 27, 28]);
        assert_eq!(rec.mem_tile.port_trace_ids, [0, 1]);
        assert_eq!(rec.mem_tile.port_trace_is_master, [1, 1]);
        assert_eq!(rec.mem_tile.s2mm_channels, [0, 1]);
        assert_eq!(rec.mem_tile.mm2s_channels, [-1, -1]);
        assert_eq!((rec.mem_tile.start_event, rec.mem_tile.stop_event), (1, 160));
        assert_eq!(rec.mem_tile.packet_type, 3);
        assert_eq!(out.histograms.mem_tile[6], 1);

        let ctrl0 =
            io.peek(TileAddress::new(1, 1, registers::trace_control0_reg(ModuleKind::MemTile)));
        assert_eq!(ctrl0, 1 | (160 << 16));
        let ctrl1 =
            io.peek(TileAddress::new(1, 1, registers::trace_control1_reg(ModuleKind::MemTile)));
        assert_eq!(ctrl1, 3);
        let sel = io.peek(TileAddress::new(1, 1, mem_tile_module::DMA_EVENT_CHANNEL_SELECTION));
        assert_eq!(sel, 0x100);

        // Mem tiles always need the software flush.
        assert_eq!(out.flush.mem_tile, vec![TileLoc::new(1, 1)]);
    }

    #[test]
    fn test_mem_tile_output_channels_set_selector_direction() {
        let mut io = RegisterModel::new();
        let mut pool = TrackedPool::new();
        let arch = arch_for(AieGen::Aie2);
        let mut cfg =
            TraceConfigurator::new(&mut io, &mut pool, arch, 2, TraceParams::default());

        let mut req =
            TraceTile::new(TileSpec::new(0, 1), MemTileTraceSet::OutputChannels.to_wire());
        req.channel0 = Some(2);
        req.channel1 = Some(2);
        let out = cfg.configure(&[req]).unwrap();

        let rec = &out.records[0];
        assert_eq!(rec.mem_tile.port_trace_is_master, [0, 0]);
        // Same channel on both selectors: only the first is recorded.
        assert_eq!(rec.mem_tile.mm2s_channels, [2, -1]);
        assert_eq!(rec.mem_tile.s2mm_channels, [-1, -1]);
        let sel = io.peek(TileAddress::new(0, 1, mem_tile_module::DMA_EVENT_CHANNEL_SELECTION));
        assert_eq!(sel, 0x8282);
    }

    #[test]
    fn test_interface_gmio_channel_swap() {
        let mut io = RegisterModel::new();
        let mut pool = TrackedPool::new();
        let arch = arch_for(AieGen::Aie2);
        let mut cfg =
            TraceConfigurator::new(&mut io, &mut pool, arch, 1, TraceParams::default());

        let mut spec = TileSpec::new(2, 0);
        spec.subtype = ShimSubtype::Gmio;
        let mut req = TraceTile::new(spec, InterfaceTraceSet::InputPortsDetails.to_wire());
        req.channel0 = Some(1);
        req.channel1 = Some(1);
        let out = cfg.configure(&[req]).unwrap();

        let rec = &out.records[0];
        assert_eq!(rec.module, 2);
        // Channel 1 swaps every MM2S detail event to its _1 sibling.
        assert_eq!(rec.mem_tile.traced_events[..6], [17, 21, 25, 29, 33, 37]);
        assert_eq!(rec.mem_tile.port_trace_is_master, [0, 0]);
        assert_eq!(rec.mem_tile.mm2s_channels, [1, -1]);
        assert_eq!((rec.mem_tile.start_event, rec.mem_tile.stop_event), (1, 123));
        assert_eq!(rec.mem_tile.packet_type, 4);
        // DMA detail events watch no stream port.
        assert!(out.ports.is_empty());
        assert_eq!(out.flush.interface, vec![TileLoc::new(2, 0)]);
    }

    #[test]
    fn test_interface_ports_bind_monitor_slots() {
        let mut io = RegisterModel::new();
        let mut pool = TrackedPool::new();
        let arch = arch_for(AieGen::Aie2);
        let mut cfg =
            TraceConfigurator::new(&mut io, &mut pool, arch, 1, TraceParams::default());

        let mut spec = TileSpec::new(3, 0);
        spec.stream_row = 2;
        spec.stream_col = 1;
        let req = TraceTile::new(spec, InterfaceTraceSet::InputPorts.to_wire());
        let out = cfg.configure(&[req]).unwrap();

        let rec = &out.records[0];
        assert_eq!(rec.mem_tile.traced_events[..4], [74, 78, 82, 86]);
        assert_eq!(out.ports.len(), 4);
        // Every monitor slot watches south port 5 as a master.
        let (reg, _) = registers::ss_event_port_reg(ModuleKind::Shim, 0);
        assert_eq!(io.peek(TileAddress::new(3, 0, reg)), 0x25252525);
    }

    #[test]
    fn test_broadcast_start_substitutes_network_events() {
        let mut io = RegisterModel::new();
        let mut pool = TrackedPool::new();
        let arch = arch_for(AieGen::Aie2);
        let mut cfg =
            TraceConfigurator::new(&mut io, &mut pool, arch, 2, TraceParams::default());

        let locs = [TileLoc::new(0, 0), TileLoc::new(0, 1), TileLoc::new(0, 2)];
        let net = BroadcastNetwork::plan(0, 1, 6, 7, 2, &locs);
        cfg.set_start_broadcast(&net);

        let mut mem_tile =
            TraceTile::new(TileSpec::new(0, 1), MemTileTraceSet::InputChannels.to_wire());
        mem_tile.channel0 = Some(0);
        mem_tile.channel1 = Some(1);
        let tiles = [
            TraceTile::new(TileSpec::new(0, 0), InterfaceTraceSet::InputPorts.to_wire()),
            mem_tile,
            aie_request(0, 2, CoreTraceSet::Functions),
        ];
        let out = cfg.configure(&tiles).unwrap();

        // Shim tiles listen on channel 2, everything else on channel 1.
        let shim = out.records.iter().find(|r| r.module == 2).unwrap();
        assert_eq!(shim.mem_tile.start_event, 113);
        let mem = out.records.iter().find(|r| r.module == 3).unwrap();
        assert_eq!(mem.mem_tile.start_event, 149);
        let aie = out.records.iter().find(|r| r.module == 0).unwrap();
        assert_eq!(aie.core.start_event, 113);
        assert_eq!(aie.core.stop_event, 22);
        // The memory module still takes its pair from the core module's
        // control broadcast, not from the network.
        assert_eq!(aie.memory.start_event, 107);

        let core0 =
            io.peek(TileAddress::new(0, 2, registers::trace_control0_reg(ModuleKind::Core)));
        assert_eq!(core0, 113 | (22 << 16) | (1 << 24));
        let mem0 =
            io.peek(TileAddress::new(0, 1, registers::trace_control0_reg(ModuleKind::MemTile)));
        assert_eq!(mem0, 149 | (160 << 16));
        let shim0 =
            io.peek(TileAddress::new(0, 0, registers::trace_control0_reg(ModuleKind::Shim)));
        assert_eq!(shim0, 113 | (123 << 16));
    }

    #[test]
    fn test_precheck_stops_oversubscribed_tile() {
        let mut io = RegisterModel::new();
        let mut pool = TrackedPool::new();
        let arch = arch_for(AieGen::Aie2);
        let loc = TileLoc::new(0, 1);
        // Drain broadcast channels below what the control pair needs.
        for _ in 0..15 {
            pool.acquire(loc, ModuleKind::Core, ResourceKind::BroadcastChannel).unwrap();
        }
        let mut cfg =
            TraceConfigurator::new(&mut io, &mut pool, arch, 1, TraceParams::default());

        let err = cfg.configure(&[aie_request(0, 1, CoreTraceSet::Functions)]).unwrap_err();
        assert!(matches!(err, TraceError::Resources { .. }));
        assert!(cfg.messages().contains(MessageCode::NoCoreBroadcastChannels));
        assert!(cfg.messages().contains(MessageCode::NoResources));
        // Nothing was written before the check tripped.
        assert_eq!(io.written_count(), 0);
    }

    #[test]
    fn test_busy_memory_control_rolls_everything_back() {
        let mut io = RegisterModel::new();
        let mut pool = TrackedPool::new();
        let arch = arch_for(AieGen::Aie1);
        let loc = TileLoc::new(0, 3);
        // Another session owns the memory trace unit.
        io.poke(
            TileAddress::new(0, 3, registers::trace_control0_reg(ModuleKind::Dma)),
            0xDEAD,
        );
        let params = TraceParams {
            counter_scheme: CounterScheme::Es1,
            use_delay: true,
            use_one_delay_counter: true,
            delay_cycles: 100,
            ..Default::default()
        };
        let mut cfg = TraceConfigurator::new(&mut io, &mut pool, arch, 1, params);

        let err = cfg.configure(&[aie_request(0, 3, CoreTraceSet::Functions)]).unwrap_err();
        assert!(matches!(err, TraceError::ControlReserve { kind: ModuleKind::Dma, .. }));
        let failed = cfg
            .messages()
            .entries()
            .iter()
            .find(|e| e.code == MessageCode::MemoryTraceNotReserved)
            .unwrap();
        assert_eq!(failed.params, [0, 4, 0, 0]);

        // Every reservation came back: 2+1 core counters, 2 memory
        // counters, all slots, all broadcast channels.
        assert_eq!(pool.available(loc, ModuleKind::Core, ResourceKind::PerfCounter), 4);
        assert_eq!(pool.available(loc, ModuleKind::Dma, ResourceKind::PerfCounter), 2);
        assert_eq!(pool.available(loc, ModuleKind::Core, ResourceKind::TraceSlot), 8);
        assert_eq!(pool.available(loc, ModuleKind::Core, ResourceKind::BroadcastChannel), 16);

        // The core control was disarmed and its slots unbound.
        let ctrl0 = io.peek(TileAddress::new(0, 3, registers::trace_control0_reg(ModuleKind::Core)));
        assert_eq!(ctrl0, 0);
        let (reg, _) = registers::trace_event_slot_reg(ModuleKind::Core, 0);
        assert_eq!(io.peek(TileAddress::new(0, 3, reg)), 0);
        // The counters were stopped.
        let (reg, shift) = registers::perf_control_reg(ModuleKind::Core, 0);
        let word = io.peek(TileAddress::new(0, 3, reg));
        assert_eq!((word >> (PERF_START_SHIFT + shift)) & PERF_EVENT_MASK, 0);
        // The foreign session's control word was left alone.
        let mem0 = io.peek(TileAddress::new(0, 3, registers::trace_control0_reg(ModuleKind::Dma)));
        assert_eq!(mem0, 0xDEAD);
    }

    #[test]
    fn test_hardware_fault_rolls_back_reservations() {
        let io = RegisterModel::new();
        let mut faulting = FaultingIo::new(io, 4);
        let mut pool = TrackedPool::new();
        let arch = arch_for(AieGen::Aie2);
        let loc = TileLoc::new(0, 2);
        let mut cfg =
            TraceConfigurator::new(&mut faulting, &mut pool, arch, 1, TraceParams::default());

        let err = cfg.configure(&[aie_request(0, 2, CoreTraceSet::Functions)]).unwrap_err();
        assert!(matches!(err, TraceError::Access(_)));

        assert_eq!(pool.available(loc, ModuleKind::Core, ResourceKind::TraceSlot), 8);
        assert_eq!(pool.available(loc, ModuleKind::Core, ResourceKind::BroadcastChannel), 16);
        assert_eq!(pool.available(loc, ModuleKind::Dma, ResourceKind::TraceSlot), 8);
    }

    #[test]
    fn test_flush_fires_stop_events() {
        let mut io = RegisterModel::new();
        let mut pool = TrackedPool::new();
        let arch = arch_for(AieGen::Aie2);
        let params = TraceParams { use_user_control: true, ..Default::default() };
        let mut cfg = TraceConfigurator::new(&mut io, &mut pool, arch.clone(), 2, params);

        let shim = TraceTile::new(TileSpec::new(0, 0), InterfaceTraceSet::InputPorts.to_wire());
        let mem = TraceTile::new(TileSpec::new(0, 1), MemTileTraceSet::InputChannels.to_wire());
        let aie = aie_request(0, 2, CoreTraceSet::Functions);
        let out = cfg.configure(&[shim, mem, aie]).unwrap();

        // User control swaps the start to the firable instr event.
        let rec = out.records.iter().find(|r| r.module == 0).unwrap();
        assert_eq!((rec.core.start_event, rec.core.stop_event), (26, 27));
        assert_eq!(out.flush.core, vec![TileLoc::new(0, 2)]);
        assert_eq!(out.flush.mem_tile, vec![TileLoc::new(0, 1)]);
        assert_eq!(out.flush.interface, vec![TileLoc::new(0, 0)]);

        flush_trace(&mut io, arch.as_ref(), &out.flush).unwrap();
        let core_gen = io.peek(TileAddress::new(0, 2, registers::event_generate_reg(ModuleKind::Core)));
        assert_eq!(core_gen, 27);
        let mem_gen =
            io.peek(TileAddress::new(0, 1, registers::event_generate_reg(ModuleKind::MemTile)));
        assert_eq!(mem_gen, 160);
        let pl_gen = io.peek(TileAddress::new(0, 0, registers::event_generate_reg(ModuleKind::Shim)));
        assert_eq!(pl_gen, 123);
    }

    #[test]
    fn test_release_returns_all_reservations() {
        let mut io = RegisterModel::new();
        let mut pool = TrackedPool::new();
        let arch = arch_for(AieGen::Aie2);
        let loc = TileLoc::new(1, 2);
        let mut cfg =
            TraceConfigurator::new(&mut io, &mut pool, arch, 1, TraceParams::default());
        let out = cfg.configure(&[aie_request(1, 2, CoreTraceSet::Functions)]).unwrap();

        release_trace(&mut io, &mut pool, &out);

        assert_eq!(pool.available(loc, ModuleKind::Core, ResourceKind::TraceSlot), 8);
        assert_eq!(pool.available(loc, ModuleKind::Dma, ResourceKind::TraceSlot), 8);
        assert_eq!(pool.available(loc, ModuleKind::Core, ResourceKind::BroadcastChannel), 16);
        let ctrl0 = io.peek(TileAddress::new(1, 2, registers::trace_control0_reg(ModuleKind::Core)));
        assert_eq!(ctrl0, 0);
        let mem0 = io.peek(TileAddress::new(1, 2, registers::trace_control0_reg(ModuleKind::Dma)));
        assert_eq!(mem0, 0);
        let bc0 = registers::event_broadcast_reg(ModuleKind::Core, 0);
        assert_eq!(io.peek(TileAddress::new(1, 2, bc0)), 0);
        // Blocks cleared: the clear registers saw the channel mask.
        let clr = registers::broadcast_block_clr_reg(ModuleKind::Core, BlockDir::South);
        assert_eq!(io.peek(TileAddress::new(1, 2, clr)), 0xF);
    }

    #[test]
    fn test_combo_or_cascade() {
        let mut io = RegisterModel::new();
        let arch = arch_for(AieGen::Aie2);
        let loc = TileLoc::new(0, 1);
        let mut rec = CoreTraceRecord::default();

        let combo = configure_combo_or(
            &mut io,
            arch.as_ref(),
            loc,
            ModuleKind::Core,
            [core::PORT_IDLE_0, core::PORT_IDLE_1, core::PORT_RUNNING_0, core::PORT_RUNNING_1],
            &mut rec,
        )
        .unwrap();

        assert_eq!(combo, core::COMBO_EVENT_2);
        let inputs = io.peek(TileAddress::new(0, 1, registers::combo_inputs_reg(ModuleKind::Core)));
        assert_eq!(inputs, 74 | (78 << 8) | (75 << 16) | (79 << 24));
        let control = io.peek(TileAddress::new(0, 1, registers::combo_control_reg(ModuleKind::Core)));
        assert_eq!(control, 0x020202);
        assert_eq!(rec.combo_event_input, [74, 78, 75, 79]);
        assert_eq!(rec.combo_event_control, [2, 2, 2, 0]);
    }

    #[test]
    fn test_tiles_visit_in_column_row_order() {
        let mut io = RegisterModel::new();
        let mut pool = TrackedPool::new();
        let arch = arch_for(AieGen::Aie2);
        let mut cfg =
            TraceConfigurator::new(&mut io, &mut pool, arch, 1, TraceParams::default());

        let out = cfg
            .configure(&[
                aie_request(2, 1, CoreTraceSet::Functions),
                aie_request(0, 2, CoreTraceSet::Functions),
                aie_request(0, 1, CoreTraceSet::Functions),
            ])
            .unwrap();

        let visited: Vec<(u8, u8)> = out.records.iter().map(|r| (r.col, r.row)).collect();
        assert_eq!(visited, vec![(0, 1), (0, 2), (2, 1)]);
    }
}
