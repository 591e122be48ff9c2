//! Metric set event tables.
//!
//! One table per module class maps each named set to its ordered event
//! list. Counter N of a tile binds start/end event N of the selected
//! set, so list order is part of the external contract: hosts decode
//! poll output positionally.
//!
//! Start and end lists are identical for every profiling set (counters
//! free-run between counter start and stop); they are kept as separate
//! accessors because trace counter schemes do use distinct pairs.

use super::{CoreSet, InterfaceSet, MemTileSet, MemorySet, MetricSet};
use crate::device::events::{core, mem, mem_tile, pl, EventId};
use crate::device::{AieGen, ModuleKind, ShimSubtype};

/// Start events for a core module metric set.
pub fn core_events(gen: AieGen, set: CoreSet) -> &'static [EventId] {
    use CoreSet::*;
    match set {
        HeatMap => &[
            core::ACTIVE,
            core::GROUP_CORE_STALL,
            core::INSTR_VECTOR,
            core::GROUP_CORE_PROGRAM_FLOW,
        ],
        Stalls => &[
            core::MEMORY_STALL,
            core::STREAM_STALL,
            core::LOCK_STALL,
            core::CASCADE_STALL,
        ],
        Execution => &[
            core::INSTR_VECTOR,
            core::INSTR_LOAD,
            core::INSTR_STORE,
            core::GROUP_CORE_PROGRAM_FLOW,
        ],
        FloatingPoint => match gen {
            AieGen::Aie1 => &[
                core::FP_OVERFLOW,
                core::FP_UNDERFLOW,
                core::FP_INVALID,
                core::FP_DIV_BY_ZERO,
            ],
            _ => &[core::FP_HUGE, core::INT_FP_0, core::FP_INVALID, core::FP_INF],
        },
        StreamPutGet => &[
            core::INSTR_CASCADE_GET,
            core::INSTR_CASCADE_PUT,
            core::INSTR_STREAM_GET,
            core::INSTR_STREAM_PUT,
        ],
        WriteThroughputs => &[
            core::ACTIVE,
            core::INSTR_STREAM_PUT,
            core::INSTR_CASCADE_PUT,
            core::GROUP_CORE_STALL,
        ],
        ReadThroughputs => &[
            core::ACTIVE,
            core::INSTR_STREAM_GET,
            core::INSTR_CASCADE_GET,
            core::GROUP_CORE_STALL,
        ],
        S2mmThroughputs => &[core::PORT_RUNNING_0, core::PORT_STALLED_0],
        Mm2sThroughputs => &[core::PORT_RUNNING_0, core::PORT_STALLED_0],
        AieTrace => &[
            core::PORT_RUNNING_0,
            core::PORT_STALLED_0,
            core::PORT_RUNNING_1,
            core::PORT_STALLED_1,
        ],
        Events => &[
            core::INSTR_EVENT_0,
            core::INSTR_EVENT_1,
            core::USER_EVENT_0,
            core::USER_EVENT_1,
        ],
    }
}

/// Start events for a memory module metric set.
pub fn memory_events(gen: AieGen, set: MemorySet) -> &'static [EventId] {
    use MemorySet::*;
    match set {
        Conflicts => &[mem::GROUP_MEMORY_CONFLICT, mem::GROUP_ERRORS],
        DmaLocks => &[mem::GROUP_DMA_ACTIVITY, mem::GROUP_LOCK],
        DmaStallsS2mm => match gen {
            AieGen::Aie1 => &[
                mem::DMA_S2MM_0_STALLED_LOCK_ACQUIRE,
                mem::DMA_S2MM_1_STALLED_LOCK_ACQUIRE,
            ],
            _ => &[mem::DMA_S2MM_0_STALLED_LOCK, mem::DMA_S2MM_1_STALLED_LOCK],
        },
        DmaStallsMm2s => match gen {
            AieGen::Aie1 => &[
                mem::DMA_MM2S_0_STALLED_LOCK_ACQUIRE,
                mem::DMA_MM2S_1_STALLED_LOCK_ACQUIRE,
            ],
            _ => &[mem::DMA_MM2S_0_STALLED_LOCK, mem::DMA_MM2S_1_STALLED_LOCK],
        },
        S2mmThroughputs => match gen {
            AieGen::Aie1 => &[mem::DMA_S2MM_0_FINISHED_BD, mem::DMA_S2MM_1_FINISHED_BD],
            _ => &[mem::DMA_S2MM_0_STALLED_LOCK, mem::DMA_S2MM_0_MEMORY_BACKPRESSURE],
        },
        Mm2sThroughputs => match gen {
            AieGen::Aie1 => &[mem::DMA_MM2S_0_FINISHED_BD, mem::DMA_MM2S_1_FINISHED_BD],
            _ => &[
                mem::DMA_MM2S_0_STREAM_BACKPRESSURE,
                mem::DMA_MM2S_0_MEMORY_STARVATION,
            ],
        },
    }
}

/// Start events for an interface tile metric set.
///
/// Throughput sets lead with the DMA activity group; [`modify_events`]
/// swaps it for a port-stall event on PLIO designs and AIE1 devices,
/// which have no shim DMA.
pub fn interface_events(_gen: AieGen, set: InterfaceSet) -> &'static [EventId] {
    use InterfaceSet::*;
    match set {
        InputThroughputs => &[pl::GROUP_DMA_ACTIVITY, pl::PORT_RUNNING_0],
        OutputThroughputs => &[pl::GROUP_DMA_ACTIVITY, pl::PORT_RUNNING_0],
        Packets => &[pl::PORT_TLAST_0, pl::PORT_TLAST_1],
        InputStalls => &[
            pl::DMA_MM2S_0_STREAM_BACKPRESSURE,
            pl::DMA_MM2S_0_MEMORY_STARVATION,
        ],
        OutputStalls => &[
            pl::DMA_S2MM_0_MEMORY_BACKPRESSURE,
            pl::DMA_S2MM_0_STALLED_LOCK,
        ],
    }
}

/// Start events for a mem tile metric set.
pub fn mem_tile_events(_gen: AieGen, set: MemTileSet) -> &'static [EventId] {
    use MemTileSet::*;
    match set {
        InputChannels => &[
            mem_tile::PORT_RUNNING_0,
            mem_tile::PORT_STALLED_0,
            mem_tile::PORT_TLAST_0,
            mem_tile::DMA_S2MM_SEL0_FINISHED_BD,
        ],
        InputChannelsDetails => &[
            mem_tile::PORT_RUNNING_0,
            mem_tile::DMA_S2MM_SEL0_MEMORY_BACKPRESSURE,
            mem_tile::DMA_S2MM_SEL0_STALLED_LOCK_ACQUIRE,
            mem_tile::DMA_S2MM_SEL0_STREAM_STARVATION,
        ],
        OutputChannels => &[
            mem_tile::PORT_RUNNING_0,
            mem_tile::PORT_STALLED_0,
            mem_tile::PORT_TLAST_0,
            mem_tile::DMA_MM2S_SEL0_FINISHED_BD,
        ],
        OutputChannelsDetails => &[
            mem_tile::PORT_RUNNING_0,
            mem_tile::DMA_MM2S_SEL0_STREAM_BACKPRESSURE,
            mem_tile::DMA_MM2S_SEL0_MEMORY_STARVATION,
            mem_tile::DMA_MM2S_SEL0_STALLED_LOCK_ACQUIRE,
        ],
        MemoryStats => &[
            mem_tile::GROUP_MEMORY_CONFLICT,
            mem_tile::GROUP_ERRORS,
            mem_tile::GROUP_LOCK,
            mem_tile::GROUP_WATCHPOINT,
        ],
        MemTrace => &[
            mem_tile::PORT_RUNNING_0,
            mem_tile::PORT_STALLED_0,
            mem_tile::PORT_IDLE_0,
            mem_tile::PORT_TLAST_0,
        ],
        InputThroughputs => &[
            mem_tile::PORT_RUNNING_0,
            mem_tile::DMA_S2MM_SEL0_STREAM_STARVATION,
            mem_tile::DMA_S2MM_SEL0_MEMORY_BACKPRESSURE,
            mem_tile::DMA_S2MM_SEL0_STALLED_LOCK_ACQUIRE,
        ],
        OutputThroughputs => &[
            mem_tile::PORT_RUNNING_0,
            mem_tile::DMA_MM2S_SEL0_STREAM_BACKPRESSURE,
            mem_tile::DMA_MM2S_SEL0_MEMORY_STARVATION,
            mem_tile::DMA_MM2S_SEL0_STALLED_LOCK_ACQUIRE,
        ],
        ConflictStats1 => &[
            mem_tile::CONFLICT_DM_BANK_0,
            mem_tile::CONFLICT_DM_BANK_1,
            mem_tile::CONFLICT_DM_BANK_2,
            mem_tile::CONFLICT_DM_BANK_3,
        ],
        ConflictStats2 => &[
            mem_tile::CONFLICT_DM_BANK_4,
            mem_tile::CONFLICT_DM_BANK_5,
            mem_tile::CONFLICT_DM_BANK_6,
            mem_tile::CONFLICT_DM_BANK_7,
        ],
        ConflictStats3 => &[
            mem_tile::CONFLICT_DM_BANK_8,
            mem_tile::CONFLICT_DM_BANK_9,
            mem_tile::CONFLICT_DM_BANK_10,
            mem_tile::CONFLICT_DM_BANK_11,
        ],
        ConflictStats4 => &[
            mem_tile::CONFLICT_DM_BANK_12,
            mem_tile::CONFLICT_DM_BANK_13,
            mem_tile::CONFLICT_DM_BANK_14,
            mem_tile::CONFLICT_DM_BANK_15,
        ],
    }
}

/// Start events for any metric set.
pub fn start_events(gen: AieGen, set: MetricSet) -> &'static [EventId] {
    match set {
        MetricSet::Core(s) => core_events(gen, s),
        MetricSet::Memory(s) => memory_events(gen, s),
        MetricSet::Interface(s) => interface_events(gen, s),
        MetricSet::MemTile(s) => mem_tile_events(gen, s),
    }
}

/// End events for any metric set. Identical to the start list for every
/// profiling set.
pub fn end_events(gen: AieGen, set: MetricSet) -> &'static [EventId] {
    start_events(gen, set)
}

fn replace(events: &mut [EventId], from: EventId, to: EventId) {
    for e in events.iter_mut() {
        if *e == from {
            *e = to;
        }
    }
}

/// Retarget channel-0 event constants at the configured DMA channel.
///
/// Memory modules and GMIO interface tiles monitor one DMA channel per
/// counter pair; the tables are written against channel 0 and swapped
/// here when channel 1 is selected. PLIO designs and AIE1 devices also
/// trade the shim DMA activity group for a port-stall event, since their
/// interface traffic never passes a shim DMA.
pub fn modify_events(
    gen: AieGen,
    kind: ModuleKind,
    subtype: ShimSubtype,
    channel: u8,
    events: &mut [EventId],
) {
    if kind != ModuleKind::Dma && kind != ModuleKind::Shim {
        return;
    }

    if kind == ModuleKind::Dma && channel > 0 {
        replace(events, mem::DMA_S2MM_0_STALLED_LOCK, mem::DMA_S2MM_1_STALLED_LOCK);
        replace(
            events,
            mem::DMA_S2MM_0_MEMORY_BACKPRESSURE,
            mem::DMA_S2MM_1_MEMORY_BACKPRESSURE,
        );
        replace(
            events,
            mem::DMA_MM2S_0_STREAM_BACKPRESSURE,
            mem::DMA_MM2S_1_STREAM_BACKPRESSURE,
        );
        replace(
            events,
            mem::DMA_MM2S_0_MEMORY_STARVATION,
            mem::DMA_MM2S_1_MEMORY_STARVATION,
        );
    }

    if kind == ModuleKind::Shim && subtype == ShimSubtype::Gmio && channel > 0 {
        replace(
            events,
            pl::DMA_S2MM_0_MEMORY_BACKPRESSURE,
            pl::DMA_S2MM_1_MEMORY_BACKPRESSURE,
        );
        replace(events, pl::DMA_S2MM_0_STALLED_LOCK, pl::DMA_S2MM_1_STALLED_LOCK);
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
    }

    if subtype == ShimSubtype::Plio || gen == AieGen::Aie1 {
        replace(events, pl::GROUP_DMA_ACTIVITY, pl::PORT_STALLED_0);
    }
}
