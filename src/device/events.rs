//! Hardware event identifier space.
//!
//! Event numbering is derived from AMD documentation:
//! - AM020: Versal AI Engine ML (AIE-ML) Architecture Manual
//! - AM025: AIE-ML Register Reference (event enumeration tables)
//!
//! Logical identifiers are generation independent. Each tile module class
//! owns a band of 256 ids; the id within a band follows the AIE-ML
//! physical enumeration, so AIE-ML translation strips the band base and
//! AIE1 applies its renumbering on top (see [`physical_event`]).
//!
//! ```text
//! 0x000..0x0FF  core module      (AIE tile)
//! 0x100..0x1FF  memory module    (AIE tile)
//! 0x200..0x2FF  PL module        (shim tile)
//! 0x300..0x3FF  mem-tile module
//! ```
//!
//! Wire-format physical ids additionally carry a per-module counter base
//! (see [`counter_base`]) so host tooling can recover the module class
//! from a bare event number.

use super::{AieGen, ModuleKind};
use std::fmt;

/// Logical hardware event identifier.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct EventId(pub u16);

impl EventId {
    pub const NONE: EventId = EventId(0);

    /// Module band this event belongs to.
    pub fn band(self) -> ModuleKind {
        match self.0 >> 8 {
            0 => ModuleKind::Core,
            1 => ModuleKind::Dma,
            2 => ModuleKind::Shim,
            _ => ModuleKind::MemTile,
        }
    }

    /// Id within the module band.
    pub fn in_band(self) -> u16 {
        self.0 & 0xFF
    }

    #[inline]
    pub fn raw(self) -> u16 {
        self.0
    }
}

impl fmt::Display for EventId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.band().name(), self.in_band())
    }
}

const CORE_BASE: u16 = 0x000;
const MEM_BASE: u16 = 0x100;
const PL_BASE: u16 = 0x200;
const MEM_TILE_BASE: u16 = 0x300;

/// Base of each band, used to build events from raw in-band ids.
pub fn band_base(kind: ModuleKind) -> u16 {
    match kind {
        ModuleKind::Core => CORE_BASE,
        ModuleKind::Dma => MEM_BASE,
        ModuleKind::Shim => PL_BASE,
        ModuleKind::MemTile => MEM_TILE_BASE,
    }
}

// ============================================================================
// Core module events (AIE tile)
// ============================================================================

/// Core module events. In-band ids follow the AM025 core event enumeration:
/// control events first, stall group at 15, program-flow group at 25,
/// stream-switch port events 74-105, broadcasts from 107.
pub mod core {
    use super::{EventId, CORE_BASE};

    const fn ev(id: u16) -> EventId {
        EventId(CORE_BASE + id)
    }

    pub const NONE: EventId = ev(0);
    pub const TRUE: EventId = ev(1);
    pub const GROUP_0: EventId = ev(2);
    pub const TIMER_SYNC: EventId = ev(3);
    pub const TIMER_VALUE_REACHED: EventId = ev(4);
    pub const PERF_CNT_0: EventId = ev(5);
    pub const PERF_CNT_1: EventId = ev(6);
    pub const PERF_CNT_2: EventId = ev(7);
    pub const PERF_CNT_3: EventId = ev(8);
    pub const COMBO_EVENT_0: EventId = ev(9);
    pub const COMBO_EVENT_1: EventId = ev(10);
    pub const COMBO_EVENT_2: EventId = ev(11);
    pub const COMBO_EVENT_3: EventId = ev(12);
    pub const EDGE_DETECTION_EVENT_0: EventId = ev(13);
    pub const EDGE_DETECTION_EVENT_1: EventId = ev(14);
    pub const GROUP_CORE_STALL: EventId = ev(15);
    pub const MEMORY_STALL: EventId = ev(16);
    pub const STREAM_STALL: EventId = ev(17);
    pub const CASCADE_STALL: EventId = ev(18);
    pub const LOCK_STALL: EventId = ev(19);
    pub const DEBUG_HALTED: EventId = ev(20);
    pub const ACTIVE: EventId = ev(21);
    pub const DISABLED: EventId = ev(22);
    pub const ECC_ERROR_STALL: EventId = ev(23);
    pub const ECC_SCRUBBING_STALL: EventId = ev(24);
    pub const GROUP_CORE_PROGRAM_FLOW: EventId = ev(25);
    pub const INSTR_EVENT_0: EventId = ev(26);
    pub const INSTR_EVENT_1: EventId = ev(27);
    pub const INSTR_CALL: EventId = ev(28);
    pub const INSTR_RETURN: EventId = ev(29);
    pub const INSTR_VECTOR: EventId = ev(30);
    pub const INSTR_LOAD: EventId = ev(31);
    pub const INSTR_STORE: EventId = ev(32);
    pub const INSTR_STREAM_GET: EventId = ev(33);
    pub const INSTR_STREAM_PUT: EventId = ev(34);
    pub const INSTR_CASCADE_GET: EventId = ev(35);
    pub const INSTR_CASCADE_PUT: EventId = ev(36);
    pub const INSTR_LOCK_ACQUIRE_REQ: EventId = ev(37);
    pub const INSTR_LOCK_RELEASE_REQ: EventId = ev(38);
    pub const GROUP_ERRORS_0: EventId = ev(39);
    pub const GROUP_ERRORS_1: EventId = ev(40);

    // Floating-point flag events. The AIE-ML enumeration places these
    // behind the error group; AIE1 exposes a different flag set which is
    // renumbered by the generation translation.
    pub const INT_FP_0: EventId = ev(59);
    pub const FP_HUGE: EventId = ev(60);
    pub const FP_INVALID: EventId = ev(61);
    pub const FP_INF: EventId = ev(62);
    pub const FP_OVERFLOW: EventId = ev(63);
    pub const FP_UNDERFLOW: EventId = ev(64);
    pub const FP_DIV_BY_ZERO: EventId = ev(65);

    /// "Group stream switch" group event, lower boundary of the port band.
    pub const GROUP_STREAM_SWITCH: EventId = ev(73);
    pub const PORT_IDLE_0: EventId = ev(74);
    pub const PORT_RUNNING_0: EventId = ev(75);
    pub const PORT_STALLED_0: EventId = ev(76);
    pub const PORT_TLAST_0: EventId = ev(77);
    pub const PORT_IDLE_1: EventId = ev(78);
    pub const PORT_RUNNING_1: EventId = ev(79);
    pub const PORT_STALLED_1: EventId = ev(80);
    pub const PORT_TLAST_1: EventId = ev(81);
    /// Upper boundary of the port band; also the broadcast group event.
    pub const GROUP_BROADCAST: EventId = ev(106);
    /// "Broadcast event 0 of the core module is event number 107" (AM025).
    pub const BROADCAST_0: EventId = ev(107);
    pub const USER_EVENT_0: EventId = ev(123);
    pub const USER_EVENT_1: EventId = ev(124);
    pub const USER_EVENT_2: EventId = ev(125);
    pub const USER_EVENT_3: EventId = ev(126);
}

// ============================================================================
// Memory module events (AIE tile)
// ============================================================================

/// Memory module events. DMA activity children sit at 17-32 in AM025
/// order: finished-BD x4, stalled-lock x4, stream starvation/backpressure,
/// then memory backpressure/starvation.
pub mod mem {
    use super::{EventId, MEM_BASE};

    const fn ev(id: u16) -> EventId {
        EventId(MEM_BASE + id)
    }

    pub const NONE: EventId = ev(0);
    pub const TRUE: EventId = ev(1);
    pub const GROUP_0: EventId = ev(2);
    pub const TIMER_SYNC: EventId = ev(3);
    pub const TIMER_VALUE_REACHED: EventId = ev(4);
    pub const PERF_CNT_0: EventId = ev(5);
    pub const PERF_CNT_1: EventId = ev(6);
    pub const COMBO_EVENT_0: EventId = ev(7);
    pub const COMBO_EVENT_1: EventId = ev(8);
    pub const COMBO_EVENT_2: EventId = ev(9);
    pub const COMBO_EVENT_3: EventId = ev(10);
    pub const EDGE_DETECTION_EVENT_0: EventId = ev(11);
    pub const EDGE_DETECTION_EVENT_1: EventId = ev(12);
    pub const GROUP_WATCHPOINT: EventId = ev(13);
    pub const WATCHPOINT_0: EventId = ev(14);
    pub const WATCHPOINT_1: EventId = ev(15);
    pub const GROUP_DMA_ACTIVITY: EventId = ev(16);
    pub const DMA_S2MM_0_FINISHED_BD: EventId = ev(17);
    pub const DMA_S2MM_1_FINISHED_BD: EventId = ev(18);
    pub const DMA_MM2S_0_FINISHED_BD: EventId = ev(19);
    pub const DMA_MM2S_1_FINISHED_BD: EventId = ev(20);
    pub const DMA_S2MM_0_STALLED_LOCK: EventId = ev(21);
    pub const DMA_S2MM_1_STALLED_LOCK: EventId = ev(22);
    pub const DMA_MM2S_0_STALLED_LOCK: EventId = ev(23);
    pub const DMA_MM2S_1_STALLED_LOCK: EventId = ev(24);
    pub const DMA_S2MM_0_STREAM_STARVATION: EventId = ev(25);
    pub const DMA_S2MM_1_STREAM_STARVATION: EventId = ev(26);
    pub const DMA_MM2S_0_STREAM_BACKPRESSURE: EventId = ev(27);
    pub const DMA_MM2S_1_STREAM_BACKPRESSURE: EventId = ev(28);
    pub const DMA_S2MM_0_MEMORY_BACKPRESSURE: EventId = ev(29);
    pub const DMA_S2MM_1_MEMORY_BACKPRESSURE: EventId = ev(30);
    pub const DMA_MM2S_0_MEMORY_STARVATION: EventId = ev(31);
    pub const DMA_MM2S_1_MEMORY_STARVATION: EventId = ev(32);
    pub const GROUP_LOCK: EventId = ev(33);
    pub const GROUP_MEMORY_CONFLICT: EventId = ev(66);
    pub const CONFLICT_DM_BANK_0: EventId = ev(67);
    pub const GROUP_ERRORS: EventId = ev(75);
    pub const GROUP_BROADCAST: EventId = ev(106);
    /// Memory module broadcasts share the core module's base number.
    pub const BROADCAST_0: EventId = ev(107);
    pub const USER_EVENT_0: EventId = ev(123);
    pub const USER_EVENT_1: EventId = ev(124);

    // AIE1-only DMA stall flavor: lock-acquire stalls instead of the
    // AIE-ML stalled-lock events. Logical ids sit outside the AIE-ML
    // enumeration; the AIE1 translation renumbers them into 21-24.
    pub const DMA_S2MM_0_STALLED_LOCK_ACQUIRE: EventId = ev(90);
    pub const DMA_S2MM_1_STALLED_LOCK_ACQUIRE: EventId = ev(91);
    pub const DMA_MM2S_0_STALLED_LOCK_ACQUIRE: EventId = ev(92);
    pub const DMA_MM2S_1_STALLED_LOCK_ACQUIRE: EventId = ev(93);
}

// ============================================================================
// PL module events (shim tile)
// ============================================================================

/// PL module events. The DMA activity group mirrors the memory module
/// layout on shim DMA channels; stream-switch ports occupy 73-104 with
/// broadcast switch A behind them.
pub mod pl {
    use super::{EventId, PL_BASE};

    const fn ev(id: u16) -> EventId {
        EventId(PL_BASE + id)
    }

    pub const NONE: EventId = ev(0);
    pub const TRUE: EventId = ev(1);
    pub const GROUP_0: EventId = ev(2);
    pub const TIMER_SYNC: EventId = ev(3);
    pub const TIMER_VALUE_REACHED: EventId = ev(4);
    pub const PERF_CNT_0: EventId = ev(5);
    pub const PERF_CNT_1: EventId = ev(6);
    pub const COMBO_EVENT_0: EventId = ev(7);
    pub const COMBO_EVENT_1: EventId = ev(8);
    pub const COMBO_EVENT_2: EventId = ev(9);
    pub const COMBO_EVENT_3: EventId = ev(10);
    pub const EDGE_DETECTION_EVENT_0: EventId = ev(11);
    pub const EDGE_DETECTION_EVENT_1: EventId = ev(12);
    pub const GROUP_DMA_ACTIVITY: EventId = ev(13);
    pub const DMA_S2MM_0_START_TASK: EventId = ev(14);
    pub const DMA_S2MM_1_START_TASK: EventId = ev(15);
    pub const DMA_MM2S_0_START_TASK: EventId = ev(16);
    pub const DMA_MM2S_1_START_TASK: EventId = ev(17);
    pub const DMA_S2MM_0_FINISHED_BD: EventId = ev(18);
    pub const DMA_S2MM_1_FINISHED_BD: EventId = ev(19);
    pub const DMA_MM2S_0_FINISHED_BD: EventId = ev(20);
    pub const DMA_MM2S_1_FINISHED_BD: EventId = ev(21);
    pub const DMA_S2MM_0_FINISHED_TASK: EventId = ev(22);
    pub const DMA_S2MM_1_FINISHED_TASK: EventId = ev(23);
    pub const DMA_MM2S_0_FINISHED_TASK: EventId = ev(24);
    pub const DMA_MM2S_1_FINISHED_TASK: EventId = ev(25);
    pub const DMA_S2MM_0_STALLED_LOCK: EventId = ev(26);
    pub const DMA_S2MM_1_STALLED_LOCK: EventId = ev(27);
    pub const DMA_MM2S_0_STALLED_LOCK: EventId = ev(28);
    pub const DMA_MM2S_1_STALLED_LOCK: EventId = ev(29);
    pub const DMA_S2MM_0_STREAM_STARVATION: EventId = ev(30);
    pub const DMA_S2MM_1_STREAM_STARVATION: EventId = ev(31);
    pub const DMA_MM2S_0_STREAM_BACKPRESSURE: EventId = ev(32);
    pub const DMA_MM2S_1_STREAM_BACKPRESSURE: EventId = ev(33);
    pub const DMA_S2MM_0_MEMORY_BACKPRESSURE: EventId = ev(34);
    pub const DMA_S2MM_1_MEMORY_BACKPRESSURE: EventId = ev(35);
    pub const DMA_MM2S_0_MEMORY_STARVATION: EventId = ev(36);
    pub const DMA_MM2S_1_MEMORY_STARVATION: EventId = ev(37);
    pub const GROUP_LOCK: EventId = ev(38);
    pub const GROUP_ERRORS: EventId = ev(62);
    pub const GROUP_STREAM_SWITCH: EventId = ev(72);
    pub const PORT_IDLE_0: EventId = ev(73);
    pub const PORT_RUNNING_0: EventId = ev(74);
    pub const PORT_STALLED_0: EventId = ev(75);
    pub const PORT_TLAST_0: EventId = ev(76);
    pub const PORT_IDLE_1: EventId = ev(77);
    pub const PORT_RUNNING_1: EventId = ev(78);
    pub const PORT_STALLED_1: EventId = ev(79);
    pub const PORT_TLAST_1: EventId = ev(80);
    pub const PORT_RUNNING_2: EventId = ev(82);
    pub const PORT_RUNNING_3: EventId = ev(86);
    pub const GROUP_BROADCAST_A: EventId = ev(105);
    pub const BROADCAST_A_0: EventId = ev(106);
    pub const USER_EVENT_0: EventId = ev(122);
    pub const USER_EVENT_1: EventId = ev(123);
}

// ============================================================================
// Mem-tile module events
// ============================================================================

/// Mem-tile module events. DMA events are channel-selected (SEL0/SEL1
/// follow the event selection registers, not fixed channels); the port
/// band sits between the stream-switch group and the memory-conflict
/// group, which has 16 DM banks here.
pub mod mem_tile {
    use super::{EventId, MEM_TILE_BASE};

    const fn ev(id: u16) -> EventId {
        EventId(MEM_TILE_BASE + id)
    }

    pub const NONE: EventId = ev(0);
    pub const TRUE: EventId = ev(1);
    pub const GROUP_0: EventId = ev(2);
    pub const TIMER_SYNC: EventId = ev(3);
    pub const TIMER_VALUE_REACHED: EventId = ev(4);
    pub const PERF_CNT_0: EventId = ev(5);
    pub const PERF_CNT_1: EventId = ev(6);
    pub const PERF_CNT_2: EventId = ev(7);
    pub const PERF_CNT_3: EventId = ev(8);
    pub const COMBO_EVENT_0: EventId = ev(9);
    pub const COMBO_EVENT_1: EventId = ev(10);
    pub const COMBO_EVENT_2: EventId = ev(11);
    pub const COMBO_EVENT_3: EventId = ev(12);
    pub const EDGE_DETECTION_EVENT_0: EventId = ev(13);
    pub const EDGE_DETECTION_EVENT_1: EventId = ev(14);
    pub const GROUP_WATCHPOINT: EventId = ev(15);
    pub const WATCHPOINT_0: EventId = ev(16);
    pub const WATCHPOINT_1: EventId = ev(17);
    pub const GROUP_DMA_ACTIVITY: EventId = ev(18);
    pub const DMA_S2MM_SEL0_START_TASK: EventId = ev(19);
    pub const DMA_S2MM_SEL1_START_TASK: EventId = ev(20);
    pub const DMA_MM2S_SEL0_START_TASK: EventId = ev(21);
    pub const DMA_MM2S_SEL1_START_TASK: EventId = ev(22);
    pub const DMA_S2MM_SEL0_FINISHED_BD: EventId = ev(23);
    pub const DMA_S2MM_SEL1_FINISHED_BD: EventId = ev(24);
    pub const DMA_MM2S_SEL0_FINISHED_BD: EventId = ev(25);
    pub const DMA_MM2S_SEL1_FINISHED_BD: EventId = ev(26);
    pub const DMA_S2MM_SEL0_FINISHED_TASK: EventId = ev(27);
    pub const DMA_S2MM_SEL1_FINISHED_TASK: EventId = ev(28);
    pub const DMA_MM2S_SEL0_FINISHED_TASK: EventId = ev(29);
    pub const DMA_MM2S_SEL1_FINISHED_TASK: EventId = ev(30);
    pub const DMA_S2MM_SEL0_STALLED_LOCK_ACQUIRE: EventId = ev(31);
    pub const DMA_S2MM_SEL1_STALLED_LOCK_ACQUIRE: EventId = ev(32);
    pub const DMA_MM2S_SEL0_STALLED_LOCK_ACQUIRE: EventId = ev(33);
    pub const DMA_MM2S_SEL1_STALLED_LOCK_ACQUIRE: EventId = ev(34);
    pub const DMA_S2MM_SEL0_STREAM_STARVATION: EventId = ev(35);
    pub const DMA_S2MM_SEL1_STREAM_STARVATION: EventId = ev(36);
    pub const DMA_MM2S_SEL0_STREAM_BACKPRESSURE: EventId = ev(37);
    pub const DMA_MM2S_SEL1_STREAM_BACKPRESSURE: EventId = ev(38);
    pub const DMA_S2MM_SEL0_MEMORY_BACKPRESSURE: EventId = ev(39);
    pub const DMA_S2MM_SEL1_MEMORY_BACKPRESSURE: EventId = ev(40);
    pub const DMA_MM2S_SEL0_MEMORY_STARVATION: EventId = ev(41);
    pub const DMA_MM2S_SEL1_MEMORY_STARVATION: EventId = ev(42);
    pub const GROUP_LOCK: EventId = ev(43);
    pub const GROUP_STREAM_SWITCH: EventId = ev(76);
    pub const PORT_IDLE_0: EventId = ev(77);
    pub const PORT_RUNNING_0: EventId = ev(78);
    pub const PORT_STALLED_0: EventId = ev(79);
    pub const PORT_TLAST_0: EventId = ev(80);
    pub const PORT_IDLE_1: EventId = ev(81);
    pub const PORT_RUNNING_1: EventId = ev(82);
    pub const PORT_STALLED_1: EventId = ev(83);
    pub const PORT_TLAST_1: EventId = ev(84);
    pub const GROUP_MEMORY_CONFLICT: EventId = ev(109);
    pub const CONFLICT_DM_BANK_0: EventId = ev(110);
    pub const CONFLICT_DM_BANK_1: EventId = ev(111);
    pub const CONFLICT_DM_BANK_2: EventId = ev(112);
    pub const CONFLICT_DM_BANK_3: EventId = ev(113);
    pub const CONFLICT_DM_BANK_4: EventId = ev(114);
    pub const CONFLICT_DM_BANK_5: EventId = ev(115);
    pub const CONFLICT_DM_BANK_6: EventId = ev(116);
    pub const CONFLICT_DM_BANK_7: EventId = ev(117);
    pub const CONFLICT_DM_BANK_8: EventId = ev(118);
    pub const CONFLICT_DM_BANK_9: EventId = ev(119);
    pub const CONFLICT_DM_BANK_10: EventId = ev(120);
    pub const CONFLICT_DM_BANK_11: EventId = ev(121);
    pub const CONFLICT_DM_BANK_12: EventId = ev(122);
    pub const CONFLICT_DM_BANK_13: EventId = ev(123);
    pub const CONFLICT_DM_BANK_14: EventId = ev(124);
    pub const CONFLICT_DM_BANK_15: EventId = ev(125);
    pub const GROUP_ERRORS: EventId = ev(126);
    pub const GROUP_BROADCAST: EventId = ev(142);
    pub const BROADCAST_0: EventId = ev(143);
    pub const USER_EVENT_0: EventId = ev(159);
    pub const USER_EVENT_1: EventId = ev(160);
}

// ============================================================================
// Group event masks (architecture constants)
// ============================================================================

/// Sub-event enable mask for `mem::GROUP_DMA_ACTIVITY`: memory
/// backpressure and starvation children only.
pub const GROUP_DMA_MASK: u32 = 0x0000f000;

/// Sub-event enable mask for `mem::GROUP_LOCK`: every acquire event.
pub const GROUP_LOCK_MASK: u32 = 0x55555555;

/// Sub-event enable mask for `mem::GROUP_MEMORY_CONFLICT`: all 8 DM banks.
pub const GROUP_CONFLICT_MASK: u32 = 0x000000ff;

/// Sub-event enable mask for `core::GROUP_CORE_PROGRAM_FLOW`: load/store,
/// stream and cascade accesses, lock requests.
pub const GROUP_CORE_PROGRAM_FLOW_MASK: u32 = 0x00001FE0;

/// Sub-event enable mask for `core::GROUP_CORE_STALL`: all four stall
/// sources.
pub const GROUP_CORE_STALL_MASK: u32 = 0x0000000F;

// ============================================================================
// Counter base offsets (wire format)
// ============================================================================

pub const BASE_CORE_COUNTER: u16 = 0;
pub const BASE_MEMORY_COUNTER: u16 = 128;
pub const BASE_SHIM_COUNTER: u16 = 256;
pub const BASE_MEM_TILE_COUNTER: u16 = 384;

/// Per-module counter base added to physical event ids in output records.
pub fn counter_base(kind: ModuleKind) -> u16 {
    match kind {
        ModuleKind::Core => BASE_CORE_COUNTER,
        ModuleKind::Dma => BASE_MEMORY_COUNTER,
        ModuleKind::Shim => BASE_SHIM_COUNTER,
        ModuleKind::MemTile => BASE_MEM_TILE_COUNTER,
    }
}

/// Sub-event enable mask for the group events the configurators program.
///
/// Only these five groups are ever unmasked; the group-errors enable
/// register is managed by the error handler and left alone here.
pub fn group_event_mask(event: EventId) -> Option<u32> {
    if event == mem::GROUP_DMA_ACTIVITY {
        Some(GROUP_DMA_MASK)
    } else if event == mem::GROUP_LOCK {
        Some(GROUP_LOCK_MASK)
    } else if event == mem::GROUP_MEMORY_CONFLICT {
        Some(GROUP_CONFLICT_MASK)
    } else if event == core::GROUP_CORE_PROGRAM_FLOW {
        Some(GROUP_CORE_PROGRAM_FLOW_MASK)
    } else if event == core::GROUP_CORE_STALL {
        Some(GROUP_CORE_STALL_MASK)
    } else {
        None
    }
}

// ============================================================================
// Event predicates
// ============================================================================

/// True if the event originates from a stream-switch monitor port.
///
/// Closed-form range check against the group-event boundaries: the port
/// events of each module class occupy the open interval between its
/// stream-switch group event and the next group event.
pub fn is_stream_switch_port_event(event: EventId) -> bool {
    // AIE tiles
    if event > core::GROUP_STREAM_SWITCH && event < core::GROUP_BROADCAST {
        return true;
    }
    // Interface tiles
    if event > pl::GROUP_STREAM_SWITCH && event < pl::GROUP_BROADCAST_A {
        return true;
    }
    // Mem tiles
    if event > mem_tile::GROUP_STREAM_SWITCH && event < mem_tile::GROUP_MEMORY_CONFLICT {
        return true;
    }
    false
}

/// True if the event is a port-running event on any monitor port.
///
/// Port events are laid out port-major (idle, running, stalled, tlast per
/// port), so running events sit at offset 1 modulo 4 within the port band.
pub fn is_port_running_event(event: EventId) -> bool {
    if !is_stream_switch_port_event(event) {
        return false;
    }
    let first = match event.band() {
        ModuleKind::Core => core::PORT_IDLE_0,
        ModuleKind::Shim => pl::PORT_IDLE_0,
        ModuleKind::MemTile => mem_tile::PORT_IDLE_0,
        ModuleKind::Dma => return false,
    };
    (event.0 - first.0) % 4 == 1
}

/// Monitor port a stream-switch port event reports on.
pub fn monitor_port_number(event: EventId) -> Option<u8> {
    if !is_stream_switch_port_event(event) {
        return None;
    }
    let first = match event.band() {
        ModuleKind::Core => core::PORT_IDLE_0,
        ModuleKind::Shim => pl::PORT_IDLE_0,
        ModuleKind::MemTile => mem_tile::PORT_IDLE_0,
        ModuleKind::Dma => return None,
    };
    Some(((event.0 - first.0) / 4) as u8)
}

/// Broadcast event carried on channel `bc_id`, as seen by `kind` modules.
pub fn broadcast_event(kind: ModuleKind, bc_id: u8) -> EventId {
    let base = match kind {
        ModuleKind::Core => core::BROADCAST_0,
        ModuleKind::Dma => mem::BROADCAST_0,
        ModuleKind::Shim => pl::BROADCAST_A_0,
        ModuleKind::MemTile => mem_tile::BROADCAST_0,
    };
    EventId(base.0 + bc_id as u16)
}

// ============================================================================
// Physical translation
// ============================================================================

/// Translate a logical event to its physical id for one generation.
///
/// Pure function: per-generation table plus band stripping, no device
/// state involved. Returns `None` for events that do not exist on the
/// generation (e.g. AIE-ML FP flags on AIE1).
pub fn physical_event(gen: AieGen, event: EventId) -> Option<u8> {
    match gen {
        AieGen::Aie2 | AieGen::Aie2ps | AieGen::Npu3 => physical_aieml(event),
        AieGen::Aie1 => physical_aie1(event),
    }
}

/// AIE-ML family: in-band id is the physical enumeration.
fn physical_aieml(event: EventId) -> Option<u8> {
    let id = event.in_band();
    match event.band() {
        // AIE1-only logical events have no AIE-ML encoding
        ModuleKind::Core if (63..=65).contains(&id) => None,
        ModuleKind::Dma if (90..=93).contains(&id) => None,
        _ => Some(id as u8),
    }
}

/// AIE1: the core stall and program-flow bands sit 7 higher (AIE1 carries
/// four PC events and two PC-range events ahead of them), the FP flag set
/// differs, and DMA lock stalls are modeled as lock-acquire stalls.
fn physical_aie1(event: EventId) -> Option<u8> {
    let id = event.in_band();
    match event.band() {
        ModuleKind::Core => match id {
            // Control events are shared
            0..=12 => Some(id as u8),
            // Stall group through error groups shift by the PC events
            13..=40 => Some((id + 7) as u8),
            // AIE1 FP flags
            63 => Some(50), // overflow
            64 => Some(51), // underflow
            61 => Some(52), // invalid
            65 => Some(53), // divide by zero
            // AIE-ML-only FP flags
            59 | 60 | 62 => None,
            // Ports, broadcasts and user events line up across generations
            73..=126 => Some(id as u8),
            _ => None,
        },
        ModuleKind::Dma => match id {
            0..=20 => Some(id as u8),
            // Lock-acquire stalls take the stalled-lock slots
            90..=93 => Some((id - 69) as u8),
            // AIE-ML-only DMA backpressure/starvation events
            21..=32 => None,
            _ => Some(id as u8),
        },
        // AIE1 shim tiles route DMA through the NoC, so the PL module has
        // no DMA activity events
        ModuleKind::Shim => match id {
            13..=37 => None,
            _ => Some(id as u8),
        },
        // AIE1 has no mem tiles
        ModuleKind::MemTile => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_band_classification() {
        assert_eq!(core::ACTIVE.band(), ModuleKind::Core);
        assert_eq!(mem::GROUP_DMA_ACTIVITY.band(), ModuleKind::Dma);
        assert_eq!(pl::PORT_TLAST_0.band(), ModuleKind::Shim);
        assert_eq!(mem_tile::PORT_RUNNING_0.band(), ModuleKind::MemTile);
    }

    #[test]
    fn test_stream_switch_port_ranges() {
        // Port events inside each band
        assert!(is_stream_switch_port_event(core::PORT_IDLE_0));
        assert!(is_stream_switch_port_event(core::PORT_RUNNING_0));
        assert!(is_stream_switch_port_event(core::PORT_TLAST_1));
        assert!(is_stream_switch_port_event(pl::PORT_RUNNING_0));
        assert!(is_stream_switch_port_event(pl::PORT_TLAST_1));
        assert!(is_stream_switch_port_event(mem_tile::PORT_STALLED_0));

        // Boundary group events are excluded
        assert!(!is_stream_switch_port_event(core::GROUP_STREAM_SWITCH));
        assert!(!is_stream_switch_port_event(core::GROUP_BROADCAST));
        assert!(!is_stream_switch_port_event(pl::GROUP_STREAM_SWITCH));
        assert!(!is_stream_switch_port_event(pl::GROUP_BROADCAST_A));
        assert!(!is_stream_switch_port_event(mem_tile::GROUP_MEMORY_CONFLICT));

        // Unrelated events
        assert!(!is_stream_switch_port_event(core::ACTIVE));
        assert!(!is_stream_switch_port_event(mem::GROUP_DMA_ACTIVITY));
    }

    #[test]
    fn test_port_running_predicate() {
        assert!(is_port_running_event(core::PORT_RUNNING_0));
        assert!(is_port_running_event(core::PORT_RUNNING_1));
        assert!(is_port_running_event(pl::PORT_RUNNING_0));
        assert!(is_port_running_event(mem_tile::PORT_RUNNING_1));

        assert!(!is_port_running_event(core::PORT_IDLE_0));
        assert!(!is_port_running_event(core::PORT_STALLED_0));
        assert!(!is_port_running_event(pl::PORT_TLAST_0));
        assert!(!is_port_running_event(core::ACTIVE));
    }

    #[test]
    fn test_broadcast_event_arithmetic() {
        assert_eq!(broadcast_event(ModuleKind::Core, 0), core::BROADCAST_0);
        assert_eq!(
            broadcast_event(ModuleKind::Core, 9).in_band(),
            core::BROADCAST_0.in_band() + 9
        );
        assert_eq!(broadcast_event(ModuleKind::Shim, 2).in_band(), 108);
        assert_eq!(broadcast_event(ModuleKind::MemTile, 15).in_band(), 158);
    }

    #[test]
    fn test_physical_translation_aieml_identity() {
        assert_eq!(physical_event(AieGen::Aie2, core::ACTIVE), Some(21));
        assert_eq!(physical_event(AieGen::Aie2, core::PORT_RUNNING_0), Some(75));
        assert_eq!(physical_event(AieGen::Aie2, mem::DMA_S2MM_0_FINISHED_BD), Some(17));
        assert_eq!(physical_event(AieGen::Aie2, pl::PORT_TLAST_0), Some(76));
        assert_eq!(physical_event(AieGen::Aie2ps, mem_tile::PORT_RUNNING_0), Some(78));
    }

    #[test]
    fn test_physical_translation_is_pure() {
        for gen in [AieGen::Aie1, AieGen::Aie2, AieGen::Aie2ps, AieGen::Npu3] {
            for event in [
                core::ACTIVE,
                core::GROUP_CORE_STALL,
                mem::GROUP_DMA_ACTIVITY,
                pl::PORT_TLAST_1,
                mem_tile::PORT_RUNNING_0,
            ] {
                assert_eq!(physical_event(gen, event), physical_event(gen, event));
            }
        }
    }

    #[test]
    fn test_physical_translation_aie1_shifts() {
        // AIE1 renumbers the stall band by +7
        assert_eq!(physical_event(AieGen::Aie1, core::ACTIVE), Some(28));
        assert_eq!(physical_event(AieGen::Aie1, core::DISABLED), Some(29));
        assert_eq!(physical_event(AieGen::Aie1, core::GROUP_CORE_STALL), Some(22));
        assert_eq!(physical_event(AieGen::Aie1, core::INSTR_VECTOR), Some(37));

        // Control events and port events are stable
        assert_eq!(physical_event(AieGen::Aie1, core::PERF_CNT_0), Some(5));
        assert_eq!(physical_event(AieGen::Aie1, core::PORT_RUNNING_0), Some(75));
        assert_eq!(physical_event(AieGen::Aie1, core::BROADCAST_0), Some(107));

        // Generation-specific events
        assert_eq!(physical_event(AieGen::Aie1, core::FP_OVERFLOW), Some(50));
        assert_eq!(physical_event(AieGen::Aie1, core::FP_HUGE), None);
        assert_eq!(physical_event(AieGen::Aie2, core::FP_OVERFLOW), None);
        assert_eq!(
            physical_event(AieGen::Aie1, mem::DMA_S2MM_0_STALLED_LOCK_ACQUIRE),
            Some(21)
        );
        assert_eq!(physical_event(AieGen::Aie1, mem::DMA_S2MM_0_STALLED_LOCK), None);
        assert_eq!(physical_event(AieGen::Aie1, mem_tile::PORT_RUNNING_0), None);
        assert_eq!(physical_event(AieGen::Aie1, pl::GROUP_DMA_ACTIVITY), None);
        assert_eq!(physical_event(AieGen::Aie1, pl::PORT_RUNNING_0), Some(74));
    }

    #[test]
    fn test_counter_bases() {
        assert_eq!(counter_base(ModuleKind::Core), 0);
        assert_eq!(counter_base(ModuleKind::Dma), 128);
        assert_eq!(counter_base(ModuleKind::Shim), 256);
        assert_eq!(counter_base(ModuleKind::MemTile), 384);
    }

    #[test]
    fn test_group_masks() {
        assert_eq!(group_event_mask(mem::GROUP_DMA_ACTIVITY), Some(0x0000f000));
        assert_eq!(group_event_mask(mem::GROUP_LOCK), Some(0x55555555));
        assert_eq!(group_event_mask(mem::GROUP_MEMORY_CONFLICT), Some(0x000000ff));
        assert_eq!(group_event_mask(core::GROUP_CORE_PROGRAM_FLOW), Some(0x00001FE0));
        assert_eq!(group_event_mask(core::GROUP_CORE_STALL), Some(0x0000000F));

        // Non-group and unmanaged group events have no mask
        assert_eq!(group_event_mask(core::ACTIVE), None);
        assert_eq!(group_event_mask(mem::GROUP_ERRORS), None);
        assert_eq!(group_event_mask(mem_tile::GROUP_MEMORY_CONFLICT), None);
    }
}
