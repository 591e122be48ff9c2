//! Trace set catalogs.
//!
//! A trace set names the fixed bundle of events a tile streams out once
//! tracing starts. Slot N of the tile's trace unit binds event N of the
//! selected set, so list order is part of the external contract, exactly
//! as with the profiling tables.
//!
//! Unlike profiling sets, trace sets split by tile class rather than by
//! module: an AIE tile consumes a core set across both of its modules
//! (core events directly, stall events via the memory-module slots), mem
//! tiles and interface tiles each have their own catalog.

use crate::device::events::{core, mem, mem_tile, pl, EventId};
use crate::device::{AieGen, ModuleKind, ShimSubtype};
use std::fmt;

/// Trace unit capture mode, as written to the control register.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TraceMode {
    /// Timestamped event trace.
    Time,
    /// Program-counter trace on core events.
    EventPc,
    /// Raw instruction-execution trace.
    InstExec,
}

impl TraceMode {
    pub fn bits(self) -> u32 {
        match self {
            TraceMode::Time => 0,
            TraceMode::EventPc => 1,
            TraceMode::InstExec => 2,
        }
    }
}

/// First-generation counter scheme selector.
///
/// AIE1 trace units lose packets when the stream stays idle too long;
/// both schemes burn performance counters to heartbeat the trace. Later
/// generations need neither.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CounterScheme {
    Es1,
    Es2,
}

impl Default for CounterScheme {
    fn default() -> Self {
        CounterScheme::Es2
    }
}

impl CounterScheme {
    pub fn from_wire(id: u8) -> Option<Self> {
        match id {
            0 => Some(CounterScheme::Es1),
            1 => Some(CounterScheme::Es2),
            _ => None,
        }
    }

    pub fn to_wire(self) -> u8 {
        match self {
            CounterScheme::Es1 => 0,
            CounterScheme::Es2 => 1,
        }
    }

    pub fn from_name(name: &str) -> Option<Self> {
        match name {
            "es1" => Some(CounterScheme::Es1),
            "es2" => Some(CounterScheme::Es2),
            _ => None,
        }
    }
}

/// AIE tile trace sets.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CoreTraceSet {
    Functions,
    PartialStalls,
    AllStalls,
    All,
    Execution,
}

impl CoreTraceSet {
    pub fn from_wire(id: u8) -> Option<Self> {
        use CoreTraceSet::*;
        Some(match id {
            0 => Functions,
            1 => PartialStalls,
            2 => AllStalls,
            3 => All,
            4 => Execution,
            _ => return None,
        })
    }

    pub fn to_wire(self) -> u8 {
        use CoreTraceSet::*;
        match self {
            Functions => 0,
            PartialStalls => 1,
            AllStalls => 2,
            All => 3,
            Execution => 4,
        }
    }

    pub fn from_name(name: &str) -> Option<Self> {
        use CoreTraceSet::*;
        Some(match name {
            "functions" => Functions,
            "functions_partial_stalls" | "partial_stalls" => PartialStalls,
            "functions_all_stalls" | "all_stalls" => AllStalls,
            "all" => All,
            "execution" => Execution,
            _ => return None,
        })
    }

    pub fn name(self) -> &'static str {
        use CoreTraceSet::*;
        match self {
            Functions => "functions",
            PartialStalls => "functions_partial_stalls",
            AllStalls => "functions_all_stalls",
            All => "all",
            Execution => "execution",
        }
    }
}

impl fmt::Display for CoreTraceSet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Mem tile trace sets.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MemTileTraceSet {
    InputChannels,
    InputChannelsStalls,
    OutputChannels,
    OutputChannelsStalls,
    MemoryConflicts1,
    MemoryConflicts2,
}

impl MemTileTraceSet {
    pub fn from_wire(id: u8) -> Option<Self> {
        use MemTileTraceSet::*;
        Some(match id {
            0 => InputChannels,
            1 => InputChannelsStalls,
            2 => OutputChannels,
            3 => OutputChannelsStalls,
            4 => MemoryConflicts1,
            5 => MemoryConflicts2,
            _ => return None,
        })
    }

    pub fn to_wire(self) -> u8 {
        use MemTileTraceSet::*;
        match self {
            InputChannels => 0,
            InputChannelsStalls => 1,
            OutputChannels => 2,
            OutputChannelsStalls => 3,
            MemoryConflicts1 => 4,
            MemoryConflicts2 => 5,
        }
    }

    pub fn from_name(name: &str) -> Option<Self> {
        use MemTileTraceSet::*;
        Some(match name {
            "input_channels" | "s2mm_channels" => InputChannels,
            "input_channels_stalls" | "s2mm_channels_stalls" => InputChannelsStalls,
            "output_channels" | "mm2s_channels" => OutputChannels,
            "output_channels_stalls" | "mm2s_channels_stalls" => OutputChannelsStalls,
            "memory_conflicts1" => MemoryConflicts1,
            "memory_conflicts2" => MemoryConflicts2,
            _ => return None,
        })
    }

    pub fn name(self) -> &'static str {
        use MemTileTraceSet::*;
        match self {
            InputChannels => "input_channels",
            InputChannelsStalls => "input_channels_stalls",
            OutputChannels => "output_channels",
            OutputChannelsStalls => "output_channels_stalls",
            MemoryConflicts1 => "memory_conflicts1",
            MemoryConflicts2 => "memory_conflicts2",
        }
    }

    /// True for sets watching the S2MM (write-into-tile) side.
    pub fn is_input(self) -> bool {
        matches!(
            self,
            MemTileTraceSet::InputChannels | MemTileTraceSet::InputChannelsStalls
        )
    }
}

impl fmt::Display for MemTileTraceSet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Interface tile trace sets.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum InterfaceTraceSet {
    InputPorts,
    OutputPorts,
    InputPortsStalls,
    OutputPortsStalls,
    InputPortsDetails,
    OutputPortsDetails,
}

impl InterfaceTraceSet {
    pub fn from_wire(id: u8) -> Option<Self> {
        use InterfaceTraceSet::*;
        Some(match id {
            0 => InputPorts,
            1 => OutputPorts,
            2 => InputPortsStalls,
            3 => OutputPortsStalls,
            4 => InputPortsDetails,
            5 => OutputPortsDetails,
            _ => return None,
        })
    }

    pub fn to_wire(self) -> u8 {
        use InterfaceTraceSet::*;
        match self {
            InputPorts => 0,
            OutputPorts => 1,
            InputPortsStalls => 2,
            OutputPortsStalls => 3,
            InputPortsDetails => 4,
            OutputPortsDetails => 5,
        }
    }

    pub fn from_name(name: &str) -> Option<Self> {
        use InterfaceTraceSet::*;
        Some(match name {
            "input_ports" => InputPorts,
            "output_ports" => OutputPorts,
            "input_ports_stalls" => InputPortsStalls,
            "output_ports_stalls" => OutputPortsStalls,
            "input_ports_details" => InputPortsDetails,
            "output_ports_details" => OutputPortsDetails,
            _ => return None,
        })
    }

    pub fn name(self) -> &'static str {
        use InterfaceTraceSet::*;
        match self {
            InputPorts => "input_ports",
            OutputPorts => "output_ports",
            InputPortsStalls => "input_ports_stalls",
            OutputPortsStalls => "output_ports_stalls",
            InputPortsDetails => "input_ports_details",
            OutputPortsDetails => "output_ports_details",
        }
    }

    /// True for sets watching the MM2S (into-array) side.
    pub fn is_input(self) -> bool {
        matches!(
            self,
            InterfaceTraceSet::InputPorts
                | InterfaceTraceSet::InputPortsStalls
                | InterfaceTraceSet::InputPortsDetails
        )
    }
}

impl fmt::Display for InterfaceTraceSet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Events bound to core-module trace slots.
///
/// Every set traces function entry and exit; the stall detail lands in
/// the memory-module slots. Instruction-execution tracing captures the
/// PC stream itself and binds no event slots beyond the mandatory one
/// the configurator supplies.
pub fn core_trace_events(set: CoreTraceSet) -> &'static [EventId] {
    use CoreTraceSet::*;
    match set {
        Functions | PartialStalls | AllStalls | All => {
            &[core::INSTR_CALL, core::INSTR_RETURN]
        }
        Execution => &[],
    }
}

/// Core-module events bound to memory-module trace slots via broadcast.
pub fn memory_cross_events(set: CoreTraceSet) -> &'static [EventId] {
    use CoreTraceSet::*;
    match set {
        Functions => &[core::INSTR_CALL, core::INSTR_RETURN],
        PartialStalls => &[
            core::INSTR_CALL,
            core::INSTR_RETURN,
            core::STREAM_STALL,
            core::CASCADE_STALL,
            core::LOCK_STALL,
        ],
        AllStalls | All => &[
            core::INSTR_CALL,
            core::INSTR_RETURN,
            core::MEMORY_STALL,
            core::STREAM_STALL,
            core::CASCADE_STALL,
            core::LOCK_STALL,
        ],
        Execution => &[],
    }
}

/// Events bound to mem tile trace slots.
pub fn mem_tile_trace_events(set: MemTileTraceSet) -> &'static [EventId] {
    use MemTileTraceSet::*;
    match set {
        InputChannels => &[
            mem_tile::DMA_S2MM_SEL0_START_TASK,
            mem_tile::DMA_S2MM_SEL1_START_TASK,
            mem_tile::DMA_S2MM_SEL0_FINISHED_BD,
            mem_tile::DMA_S2MM_SEL1_FINISHED_BD,
            mem_tile::DMA_S2MM_SEL0_FINISHED_TASK,
            mem_tile::DMA_S2MM_SEL1_FINISHED_TASK,
        ],
        InputChannelsStalls => &[
            mem_tile::DMA_S2MM_SEL0_START_TASK,
            mem_tile::DMA_S2MM_SEL0_FINISHED_BD,
            mem_tile::DMA_S2MM_SEL0_FINISHED_TASK,
            mem_tile::DMA_S2MM_SEL0_STALLED_LOCK_ACQUIRE,
            mem_tile::EDGE_DETECTION_EVENT_0,
            mem_tile::EDGE_DETECTION_EVENT_1,
            mem_tile::DMA_S2MM_SEL0_MEMORY_BACKPRESSURE,
        ],
        OutputChannels => &[
            mem_tile::DMA_MM2S_SEL0_START_TASK,
            mem_tile::DMA_MM2S_SEL1_START_TASK,
            mem_tile::DMA_MM2S_SEL0_FINISHED_BD,
            mem_tile::DMA_MM2S_SEL1_FINISHED_BD,
            mem_tile::DMA_MM2S_SEL0_FINISHED_TASK,
            mem_tile::DMA_MM2S_SEL1_FINISHED_TASK,
        ],
        OutputChannelsStalls => &[
            mem_tile::DMA_MM2S_SEL0_START_TASK,
            mem_tile::DMA_MM2S_SEL0_FINISHED_BD,
            mem_tile::DMA_MM2S_SEL0_FINISHED_TASK,
            mem_tile::EDGE_DETECTION_EVENT_0,
            mem_tile::EDGE_DETECTION_EVENT_1,
            mem_tile::DMA_MM2S_SEL0_STREAM_BACKPRESSURE,
            mem_tile::DMA_MM2S_SEL0_MEMORY_STARVATION,
        ],
        MemoryConflicts1 => &[
            mem_tile::CONFLICT_DM_BANK_0,
            mem_tile::CONFLICT_DM_BANK_1,
            mem_tile::CONFLICT_DM_BANK_2,
            mem_tile::CONFLICT_DM_BANK_3,
            mem_tile::CONFLICT_DM_BANK_4,
            mem_tile::CONFLICT_DM_BANK_5,
            mem_tile::CONFLICT_DM_BANK_6,
            mem_tile::CONFLICT_DM_BANK_7,
        ],
        MemoryConflicts2 => &[
            mem_tile::CONFLICT_DM_BANK_8,
            mem_tile::CONFLICT_DM_BANK_9,
            mem_tile::CONFLICT_DM_BANK_10,
            mem_tile::CONFLICT_DM_BANK_11,
            mem_tile::CONFLICT_DM_BANK_12,
            mem_tile::CONFLICT_DM_BANK_13,
            mem_tile::CONFLICT_DM_BANK_14,
            mem_tile::CONFLICT_DM_BANK_15,
        ],
    }
}

/// Events bound to interface tile trace slots.
pub fn interface_trace_events(set: InterfaceTraceSet) -> &'static [EventId] {
    use InterfaceTraceSet::*;
    match set {
        InputPorts | OutputPorts => &[
            pl::PORT_RUNNING_0,
            pl::PORT_RUNNING_1,
            pl::PORT_RUNNING_2,
            pl::PORT_RUNNING_3,
        ],
        InputPortsStalls | OutputPortsStalls => &[
            pl::PORT_RUNNING_0,
            pl::PORT_STALLED_0,
            pl::PORT_RUNNING_1,
            pl::PORT_STALLED_1,
        ],
        InputPortsDetails => &[
            pl::DMA_MM2S_0_START_TASK,
            pl::DMA_MM2S_0_FINISHED_BD,
            pl::DMA_MM2S_0_FINISHED_TASK,
            pl::DMA_MM2S_0_STALLED_LOCK,
            pl::DMA_MM2S_0_STREAM_BACKPRESSURE,
            pl::DMA_MM2S_0_MEMORY_STARVATION,
        ],
        OutputPortsDetails => &[
            pl::DMA_S2MM_0_START_TASK,
            pl::DMA_S2MM_0_FINISHED_BD,
            pl::DMA_S2MM_0_FINISHED_TASK,
            pl::DMA_S2MM_0_STALLED_LOCK,
            pl::DMA_S2MM_0_STREAM_STARVATION,
            pl::DMA_S2MM_0_MEMORY_BACKPRESSURE,
        ],
    }
}

fn replace(events: &mut [EventId], from: EventId, to: EventId) {
    for e in events.iter_mut() {
        if *e == from {
            *e = to;
        }
    }
}

/// Retarget the channel-0 DMA detail events at channel 1.
///
/// Only meaningful on GMIO interface tiles watching a nonzero channel;
/// the port sets and all PLIO tiles trace unchanged.
pub fn modify_interface_events(
    subtype: ShimSubtype,
    set: InterfaceTraceSet,
    channel: u8,
    events: &mut [EventId],
) {
    if subtype != ShimSubtype::Gmio || channel == 0 {
        return;
    }

    if set.is_input() {
        replace(events, pl::DMA_MM2S_0_START_TASK, pl::DMA_MM2S_1_START_TASK);
        replace(events, pl::DMA_MM2S_0_FINISHED_BD, pl::DMA_MM2S_1_FINISHED_BD);
        replace(events, pl::DMA_MM2S_0_FINISHED_TASK, pl::DMA_MM2S_1_FINISHED_TASK);
        replace(events, pl::DMA_MM2S_0_STALLED_LOCK, pl::DMA_MM2S_1_STALLED_LOCK);
        replace(
            events,
            pl::DMA_MM2S_0_STREAM_BACKPRESSURE,
            pl::DMA_MM2S_1_STREAM_BACKPRESSURE,
        );
        replace(
            events,
            pl::DMA_MM2S_0_MEMORY_STARVATION,
            pl::DMA_MM2S_1_MEMORY_STARVATION,
        );
    } else {
        replace(events, pl::DMA_S2MM_0_START_TASK, pl::DMA_S2MM_1_START_TASK);
        replace(events, pl::DMA_S2MM_0_FINISHED_BD, pl::DMA_S2MM_1_FINISHED_BD);
        replace(events, pl::DMA_S2MM_0_FINISHED_TASK, pl::DMA_S2MM_1_FINISHED_TASK);
        replace(events, pl::DMA_S2MM_0_STALLED_LOCK, pl::DMA_S2MM_1_STALLED_LOCK);
        replace(
            events,
            pl::DMA_S2MM_0_STREAM_STARVATION,
            pl::DMA_S2MM_1_STREAM_STARVATION,
        );
        replace(
            events,
            pl::DMA_S2MM_0_MEMORY_BACKPRESSURE,
            pl::DMA_S2MM_1_MEMORY_BACKPRESSURE,
        );
    }
}

/// One heartbeat counter of an AIE1 counter scheme.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TraceCounter {
    pub start: EventId,
    pub stop: EventId,
    pub value: u32,
}

const fn tc(start: EventId, stop: EventId, value: u32) -> TraceCounter {
    TraceCounter { start, stop, value }
}

/// Core-module heartbeat counters for the selected scheme.
///
/// Each one fires its own counter event every `value` cycles of core
/// activity and is traced alongside the set events. Empty from AIE2 on.
pub fn core_trace_counters(gen: AieGen, scheme: CounterScheme) -> &'static [TraceCounter] {
    if gen != AieGen::Aie1 {
        return &[];
    }
    const ES1: [TraceCounter; 2] = [
        tc(core::ACTIVE, core::DISABLED, 1020),
        tc(core::ACTIVE, core::DISABLED, 1020 * 1020),
    ];
    const ES2: [TraceCounter; 1] = [tc(core::ACTIVE, core::DISABLED, 0x3FF00)];
    match scheme {
        CounterScheme::Es1 => &ES1,
        CounterScheme::Es2 => &ES2,
    }
}

/// Memory-module heartbeat counters for the selected scheme.
pub fn memory_trace_counters(gen: AieGen, scheme: CounterScheme) -> &'static [TraceCounter] {
    if gen != AieGen::Aie1 {
        return &[];
    }
    const ES1: [TraceCounter; 2] = [
        tc(mem::TRUE, mem::NONE, 1020),
        tc(mem::TRUE, mem::NONE, 1020 * 1020),
    ];
    const ES2: [TraceCounter; 1] = [tc(mem::TRUE, mem::NONE, 0x3FF00)];
    match scheme {
        CounterScheme::Es1 => &ES1,
        CounterScheme::Es2 => &ES2,
    }
}

/// Default trace start event per tile class.
///
/// AIE tiles gate on core state so trace spans exactly the region where
/// the core runs. Mem and interface tiles start unconditionally; their
/// stop events are user events nothing fires, so they trace until
/// flushed.
pub fn default_start_event(kind: ModuleKind) -> EventId {
    match kind {
        ModuleKind::Core | ModuleKind::Dma => core::ACTIVE,
        ModuleKind::MemTile => mem_tile::TRUE,
        ModuleKind::Shim => pl::TRUE,
    }
}

/// Default trace stop event per tile class.
pub fn default_stop_event(kind: ModuleKind) -> EventId {
    match kind {
        ModuleKind::Core | ModuleKind::Dma => core::DISABLED,
        ModuleKind::MemTile => mem_tile::USER_EVENT_1,
        ModuleKind::Shim => pl::USER_EVENT_1,
    }
}

/// Stop event substituted when the tile will be flushed at end of run.
///
/// The flush entry point generates this event explicitly, so it must be
/// one software can fire.
pub fn flush_stop_event(kind: ModuleKind) -> EventId {
    match kind {
        ModuleKind::Core | ModuleKind::Dma => core::INSTR_EVENT_1,
        ModuleKind::MemTile => mem_tile::USER_EVENT_1,
        ModuleKind::Shim => pl::USER_EVENT_1,
    }
}

/// Trace packet type per originating module, for host-side demuxing.
pub fn packet_type(kind: ModuleKind) -> u8 {
    match kind {
        ModuleKind::Core => 0,
        ModuleKind::Dma => 1,
        ModuleKind::MemTile => 3,
        ModuleKind::Shim => 4,
    }
}
