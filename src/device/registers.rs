//! AIE register addresses for profile and trace configuration.
//!
//! Addresses and bit field layouts derived from AMD AM025 (AIE-ML Register
//! Reference), with the AM020 architecture manual for the address encoding.
//! Only the event, performance and trace blocks are modeled here; the
//! profiling engine never touches program memory or stream routing tables.
//!
//! # Address Encoding
//!
//! AIE addresses encode tile location and register offset:
//! ```text
//! 32-bit address: [col:7][row:5][offset:20]
//!
//! COL_SHIFT = 25
//! ROW_SHIFT = 20
//! OFFSET_MASK = 0xFFFFF
//! ```
//!
//! Each tile module class maps to one register bank:
//! - core module of AIE tiles    (0x31xxx perf, 0x34xxx events)
//! - memory module of AIE tiles  (0x11xxx perf, 0x14xxx events)
//! - PL module of shim tiles     (0x31xxx perf, 0x34xxx events)
//! - mem tile module             (0x91xxx perf, 0x94xxx events)
//!
//! Shim tiles have no core module, so the PL module reuses the 0x3xxxx
//! block without a clash.

use super::ModuleKind;
use std::fmt;

/// Column shift for tile address encoding (bits 31:25)
pub const TILE_COL_SHIFT: u32 = 25;

/// Row shift for tile address encoding (bits 24:20)
pub const TILE_ROW_SHIFT: u32 = 20;

/// Offset mask for tile-local addresses (bits 19:0)
pub const TILE_OFFSET_MASK: u32 = 0xFFFFF;

/// Decoded tile address with column, row, and register offset.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct TileAddress {
    /// Column index
    pub col: u8,
    /// Row index
    pub row: u8,
    /// Register offset within tile (20-bit)
    pub offset: u32,
}

impl TileAddress {
    pub fn new(col: u8, row: u8, offset: u32) -> Self {
        Self { col, row, offset: offset & TILE_OFFSET_MASK }
    }

    /// Decode a 32-bit AIE address into tile coordinates and offset.
    pub fn decode(addr: u32) -> Self {
        Self {
            col: ((addr >> TILE_COL_SHIFT) & 0x7F) as u8,
            row: ((addr >> TILE_ROW_SHIFT) & 0x1F) as u8,
            offset: addr & TILE_OFFSET_MASK,
        }
    }

    /// Encode tile coordinates and offset into a 32-bit address.
    pub fn encode(self) -> u32 {
        ((self.col as u32) << TILE_COL_SHIFT)
            | ((self.row as u32) << TILE_ROW_SHIFT)
            | (self.offset & TILE_OFFSET_MASK)
    }
}

impl fmt::Display for TileAddress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "tile({},{}) @ 0x{:05X}", self.col, self.row, self.offset)
    }
}

// ============================================================================
// Core module (AIE tile, AM025 CORE_MODULE)
// ============================================================================

pub mod core_module {
    /// Performance control 0: Cnt0/Cnt1 start and stop events
    pub const PERF_CONTROL0: u32 = 0x31500;
    /// Performance control 1: Cnt2/Cnt3 start and stop events
    pub const PERF_CONTROL1: u32 = 0x31504;
    /// Performance control 2: reset events for Cnt0-Cnt3
    pub const PERF_CONTROL2: u32 = 0x31508;
    /// Performance counter 0 value (stride 4 through counter 3)
    pub const PERF_COUNTER0: u32 = 0x31520;
    /// Performance counter 0 event value (stride 4)
    pub const PERF_COUNTER0_EVENT_VALUE: u32 = 0x31580;

    pub const TIMER_CONTROL: u32 = 0x34000;
    pub const EVENT_GENERATE: u32 = 0x34008;
    /// Event broadcast 0 (stride 4 through broadcast 15)
    pub const EVENT_BROADCAST0: u32 = 0x34010;
    /// Broadcast block set, south direction (set/clr/value stride 4,
    /// direction stride 0x10: south, west, north, east)
    pub const EVENT_BROADCAST_BLOCK_SOUTH_SET: u32 = 0x34050;

    pub const TRACE_CONTROL0: u32 = 0x340D0;
    pub const TRACE_CONTROL1: u32 = 0x340D4;
    pub const TRACE_STATUS: u32 = 0x340D8;
    /// Trace event slots 0-3 (slots 4-7 at +4)
    pub const TRACE_EVENT0: u32 = 0x340E0;
    pub const TRACE_EVENT1: u32 = 0x340E4;

    pub const TIMER_TRIG_EVENT_LOW_VALUE: u32 = 0x340F0;
    pub const TIMER_TRIG_EVENT_HIGH_VALUE: u32 = 0x340F4;
    pub const TIMER_LOW: u32 = 0x340F8;
    pub const TIMER_HIGH: u32 = 0x340FC;

    /// Combo event inputs: eventA-eventD, 8 bits each
    pub const COMBO_EVENT_INPUTS: u32 = 0x34400;
    /// Combo event control: combo0/1/2 logic, 8 bits each
    pub const COMBO_EVENT_CONTROL: u32 = 0x34404;

    /// Group event sub-event enables (stall and program-flow groups)
    pub const EVENT_GROUP_CORE_STALL_ENABLE: u32 = 0x34508;
    pub const EVENT_GROUP_CORE_PROGRAM_FLOW_ENABLE: u32 = 0x3450C;
}

// ============================================================================
// Memory module (AIE tile, AM025 MEMORY_MODULE)
// ============================================================================

pub mod memory_module {
    /// Performance control 0: Cnt0/Cnt1 start and stop events
    pub const PERF_CONTROL0: u32 = 0x11000;
    /// Performance control 1: reset events for Cnt0/Cnt1
    pub const PERF_CONTROL1: u32 = 0x11008;
    pub const PERF_COUNTER0: u32 = 0x11020;
    pub const PERF_COUNTER0_EVENT_VALUE: u32 = 0x11080;

    pub const TIMER_CONTROL: u32 = 0x14000;
    pub const EVENT_GENERATE: u32 = 0x14008;
    pub const EVENT_BROADCAST0: u32 = 0x14010;
    pub const EVENT_BROADCAST_BLOCK_SOUTH_SET: u32 = 0x14050;

    pub const TRACE_CONTROL0: u32 = 0x140D0;
    pub const TRACE_CONTROL1: u32 = 0x140D4;
    pub const TRACE_STATUS: u32 = 0x140D8;
    pub const TRACE_EVENT0: u32 = 0x140E0;
    pub const TRACE_EVENT1: u32 = 0x140E4;

    pub const TIMER_TRIG_EVENT_LOW_VALUE: u32 = 0x140F0;
    pub const TIMER_TRIG_EVENT_HIGH_VALUE: u32 = 0x140F4;
    pub const TIMER_LOW: u32 = 0x140F8;
    pub const TIMER_HIGH: u32 = 0x140FC;

    pub const COMBO_EVENT_INPUTS: u32 = 0x14400;
    pub const COMBO_EVENT_CONTROL: u32 = 0x14404;

    /// Group event sub-event enables (DMA, lock and memory-conflict groups)
    pub const EVENT_GROUP_DMA_ENABLE: u32 = 0x14508;
    pub const EVENT_GROUP_LOCK_ENABLE: u32 = 0x1450C;
    pub const EVENT_GROUP_MEMORY_CONFLICT_ENABLE: u32 = 0x14510;

    /// DMA BD 0 control word (stride 0x20 through BD 7)
    pub const DMA_BD0_CONTROL: u32 = 0x1D018;
    pub const DMA_BD_STRIDE: u32 = 0x20;
    pub const DMA_BD_COUNT: usize = 8;
    /// BD control: transfer length field
    pub const DMA_BD_LEN_LSB: u32 = 0;
    pub const DMA_BD_LEN_MASK: u32 = 0x1FFF;
    /// BD control: valid bit
    pub const DMA_BD_VALID_MASK: u32 = 0x8000_0000;
}

// ============================================================================
// PL module (shim tile, AM025 PL_MODULE)
// ============================================================================

pub mod pl_module {
    /// Performance control 0: Cnt0/Cnt1 start and stop events
    pub const PERF_CONTROL0: u32 = 0x31000;
    /// Performance control 1: reset events for Cnt0/Cnt1
    pub const PERF_CONTROL1: u32 = 0x31008;
    pub const PERF_COUNTER0: u32 = 0x31020;
    pub const PERF_COUNTER0_EVENT_VALUE: u32 = 0x31080;

    pub const TIMER_CONTROL: u32 = 0x34000;
    pub const EVENT_GENERATE: u32 = 0x34008;
    pub const EVENT_BROADCAST0: u32 = 0x34010;
    /// Shim broadcast switch A block set, south direction
    pub const EVENT_BROADCAST_A_BLOCK_SOUTH_SET: u32 = 0x34050;

    pub const TRACE_CONTROL0: u32 = 0x340D0;
    pub const TRACE_CONTROL1: u32 = 0x340D4;
    pub const TRACE_STATUS: u32 = 0x340D8;
    pub const TRACE_EVENT0: u32 = 0x340E0;
    pub const TRACE_EVENT1: u32 = 0x340E4;

    pub const TIMER_TRIG_EVENT_LOW_VALUE: u32 = 0x340F0;
    pub const TIMER_TRIG_EVENT_HIGH_VALUE: u32 = 0x340F4;
    pub const TIMER_LOW: u32 = 0x340F8;
    pub const TIMER_HIGH: u32 = 0x340FC;

    pub const COMBO_EVENT_INPUTS: u32 = 0x34400;
    pub const COMBO_EVENT_CONTROL: u32 = 0x34404;
}

// ============================================================================
// Mem tile module (AM025 MEM_TILE_MODULE)
// ============================================================================

pub mod mem_tile_module {
    /// Performance control 0: Cnt0/Cnt1 start and stop events
    pub const PERF_CONTROL0: u32 = 0x91000;
    /// Performance control 1: Cnt2/Cnt3 start and stop events
    pub const PERF_CONTROL1: u32 = 0x91004;
    /// Performance control 2: reset events for Cnt0-Cnt3
    pub const PERF_CONTROL2: u32 = 0x91008;
    pub const PERF_COUNTER0: u32 = 0x91020;
    pub const PERF_COUNTER0_EVENT_VALUE: u32 = 0x91080;

    pub const TIMER_CONTROL: u32 = 0x94000;
    pub const EVENT_GENERATE: u32 = 0x94008;
    pub const EVENT_BROADCAST0: u32 = 0x94010;
    pub const EVENT_BROADCAST_BLOCK_SOUTH_SET: u32 = 0x94050;

    pub const TRACE_CONTROL0: u32 = 0x940D0;
    pub const TRACE_CONTROL1: u32 = 0x940D4;
    pub const TRACE_STATUS: u32 = 0x940D8;
    pub const TRACE_EVENT0: u32 = 0x940E0;
    pub const TRACE_EVENT1: u32 = 0x940E4;

    pub const TIMER_TRIG_EVENT_LOW_VALUE: u32 = 0x940F0;
    pub const TIMER_TRIG_EVENT_HIGH_VALUE: u32 = 0x940F4;
    pub const TIMER_LOW: u32 = 0x940F8;
    pub const TIMER_HIGH: u32 = 0x940FC;

    pub const COMBO_EVENT_INPUTS: u32 = 0x94400;
    pub const COMBO_EVENT_CONTROL: u32 = 0x94404;

    /// DMA event channel selection: sel0 in byte 0, sel1 in byte 1
    /// (channel [4:0], MM2S bit 7 per byte)
    pub const DMA_EVENT_CHANNEL_SELECTION: u32 = 0xA0600;

    /// Stream switch event port selection 0 (ports 0-3) and 1 (ports 4-7)
    pub const STREAM_SWITCH_EVENT_PORT_SELECTION_0: u32 = 0xB0F00;
    pub const STREAM_SWITCH_EVENT_PORT_SELECTION_1: u32 = 0xB0F04;
}

// ============================================================================
// Stream switch event ports (AIE and shim tiles)
// ============================================================================

/// Stream switch event port selection 0 (ports 0-3), AIE and shim tiles.
/// Per-port byte: port id [4:0], master bit [5].
pub const STREAM_SWITCH_EVENT_PORT_SELECTION_0: u32 = 0x3FF00;
/// Stream switch event port selection 1 (ports 4-7)
pub const STREAM_SWITCH_EVENT_PORT_SELECTION_1: u32 = 0x3FF04;

// ============================================================================
// Field layouts shared across banks
// ============================================================================

/// Performance control: one byte per counter within the register, start
/// event in the low halfword byte, stop event in the high halfword byte.
pub const PERF_START_SHIFT: u32 = 0;
pub const PERF_STOP_SHIFT: u32 = 16;
pub const PERF_EVENT_MASK: u32 = 0x7F;

/// Trace control 0: start event byte 0, stop event byte 2, mode [25:24].
/// Event fields are a full byte; mem tile events run past 127.
pub const TRACE_START_EVENT_SHIFT: u32 = 0;
pub const TRACE_STOP_EVENT_SHIFT: u32 = 16;
pub const TRACE_EVENT_MASK: u32 = 0xFF;
pub const TRACE_MODE_SHIFT: u32 = 24;
pub const TRACE_MODE_MASK: u32 = 0x3;
/// Trace control 1: packet type [2:0], packet ID [12:8].
pub const TRACE_PACKET_TYPE_SHIFT: u32 = 0;
pub const TRACE_PACKET_ID_SHIFT: u32 = 8;

/// Stream switch event port byte: id [4:0], master bit 5.
pub const SS_EVENT_PORT_ID_MASK: u32 = 0x1F;
pub const SS_EVENT_PORT_MASTER_BIT: u32 = 0x20;

/// Broadcast block register group directions, in register order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BlockDir {
    South,
    West,
    North,
    East,
}

impl BlockDir {
    pub const ALL: [BlockDir; 4] =
        [BlockDir::South, BlockDir::West, BlockDir::North, BlockDir::East];

    fn index(self) -> u32 {
        match self {
            BlockDir::South => 0,
            BlockDir::West => 1,
            BlockDir::North => 2,
            BlockDir::East => 3,
        }
    }
}

/// Number of performance counters in one module register bank.
pub fn perf_counter_count(kind: ModuleKind) -> usize {
    match kind {
        ModuleKind::Core => 4,
        ModuleKind::Dma => 2,
        ModuleKind::Shim => 2,
        ModuleKind::MemTile => 4,
    }
}

/// Performance control register and byte shift for one counter's
/// start/stop pair.
pub fn perf_control_reg(kind: ModuleKind, counter: u8) -> (u32, u32) {
    let c = counter as u32;
    match kind {
        ModuleKind::Core => (core_module::PERF_CONTROL0 + (c / 2) * 4, (c % 2) * 8),
        ModuleKind::Dma => (memory_module::PERF_CONTROL0, (c % 2) * 8),
        ModuleKind::Shim => (pl_module::PERF_CONTROL0, (c % 2) * 8),
        ModuleKind::MemTile => (mem_tile_module::PERF_CONTROL0 + (c / 2) * 4, (c % 2) * 8),
    }
}

/// Performance reset-event register and byte shift for one counter.
pub fn perf_reset_reg(kind: ModuleKind, counter: u8) -> (u32, u32) {
    let c = counter as u32;
    match kind {
        ModuleKind::Core => (core_module::PERF_CONTROL2, c * 8),
        ModuleKind::Dma => (memory_module::PERF_CONTROL1, c * 8),
        ModuleKind::Shim => (pl_module::PERF_CONTROL1, c * 8),
        ModuleKind::MemTile => (mem_tile_module::PERF_CONTROL2, c * 8),
    }
}

/// Performance counter value register.
pub fn perf_counter_reg(kind: ModuleKind, counter: u8) -> u32 {
    let base = match kind {
        ModuleKind::Core => core_module::PERF_COUNTER0,
        ModuleKind::Dma => memory_module::PERF_COUNTER0,
        ModuleKind::Shim => pl_module::PERF_COUNTER0,
        ModuleKind::MemTile => mem_tile_module::PERF_COUNTER0,
    };
    base + counter as u32 * 4
}

/// Performance counter event value register (counter match threshold).
pub fn perf_event_value_reg(kind: ModuleKind, counter: u8) -> u32 {
    let base = match kind {
        ModuleKind::Core => core_module::PERF_COUNTER0_EVENT_VALUE,
        ModuleKind::Dma => memory_module::PERF_COUNTER0_EVENT_VALUE,
        ModuleKind::Shim => pl_module::PERF_COUNTER0_EVENT_VALUE,
        ModuleKind::MemTile => mem_tile_module::PERF_COUNTER0_EVENT_VALUE,
    };
    base + counter as u32 * 4
}

pub fn event_generate_reg(kind: ModuleKind) -> u32 {
    match kind {
        ModuleKind::Core => core_module::EVENT_GENERATE,
        ModuleKind::Dma => memory_module::EVENT_GENERATE,
        ModuleKind::Shim => pl_module::EVENT_GENERATE,
        ModuleKind::MemTile => mem_tile_module::EVENT_GENERATE,
    }
}

/// Broadcast channel configuration register: the event to forward.
pub fn event_broadcast_reg(kind: ModuleKind, bc_id: u8) -> u32 {
    let base = match kind {
        ModuleKind::Core => core_module::EVENT_BROADCAST0,
        ModuleKind::Dma => memory_module::EVENT_BROADCAST0,
        ModuleKind::Shim => pl_module::EVENT_BROADCAST0,
        ModuleKind::MemTile => mem_tile_module::EVENT_BROADCAST0,
    };
    base + bc_id as u32 * 4
}

/// Broadcast block set register for one direction (write a channel mask
/// to block those channels toward the direction).
pub fn broadcast_block_set_reg(kind: ModuleKind, dir: BlockDir) -> u32 {
    let base = match kind {
        ModuleKind::Core => core_module::EVENT_BROADCAST_BLOCK_SOUTH_SET,
        ModuleKind::Dma => memory_module::EVENT_BROADCAST_BLOCK_SOUTH_SET,
        ModuleKind::Shim => pl_module::EVENT_BROADCAST_A_BLOCK_SOUTH_SET,
        ModuleKind::MemTile => mem_tile_module::EVENT_BROADCAST_BLOCK_SOUTH_SET,
    };
    base + dir.index() * 0x10
}

/// Broadcast block clear register for one direction.
pub fn broadcast_block_clr_reg(kind: ModuleKind, dir: BlockDir) -> u32 {
    broadcast_block_set_reg(kind, dir) + 4
}

pub fn trace_control0_reg(kind: ModuleKind) -> u32 {
    match kind {
        ModuleKind::Core => core_module::TRACE_CONTROL0,
        ModuleKind::Dma => memory_module::TRACE_CONTROL0,
        ModuleKind::Shim => pl_module::TRACE_CONTROL0,
        ModuleKind::MemTile => mem_tile_module::TRACE_CONTROL0,
    }
}

pub fn trace_control1_reg(kind: ModuleKind) -> u32 {
    trace_control0_reg(kind) + 4
}

pub fn trace_status_reg(kind: ModuleKind) -> u32 {
    trace_control0_reg(kind) + 8
}

/// Trace event slot register and byte shift. Slots 0-3 live in
/// TRACE_EVENT0, slots 4-7 in TRACE_EVENT1, one byte per slot.
pub fn trace_event_slot_reg(kind: ModuleKind, slot: u8) -> (u32, u32) {
    let base = match kind {
        ModuleKind::Core => core_module::TRACE_EVENT0,
        ModuleKind::Dma => memory_module::TRACE_EVENT0,
        ModuleKind::Shim => pl_module::TRACE_EVENT0,
        ModuleKind::MemTile => mem_tile_module::TRACE_EVENT0,
    };
    (base + (slot as u32 / 4) * 4, (slot as u32 % 4) * 8)
}

pub fn timer_control_reg(kind: ModuleKind) -> u32 {
    match kind {
        ModuleKind::Core => core_module::TIMER_CONTROL,
        ModuleKind::Dma => memory_module::TIMER_CONTROL,
        ModuleKind::Shim => pl_module::TIMER_CONTROL,
        ModuleKind::MemTile => mem_tile_module::TIMER_CONTROL,
    }
}

pub fn timer_low_reg(kind: ModuleKind) -> u32 {
    match kind {
        ModuleKind::Core => core_module::TIMER_LOW,
        ModuleKind::Dma => memory_module::TIMER_LOW,
        ModuleKind::Shim => pl_module::TIMER_LOW,
        ModuleKind::MemTile => mem_tile_module::TIMER_LOW,
    }
}

pub fn timer_high_reg(kind: ModuleKind) -> u32 {
    timer_low_reg(kind) + 4
}

pub fn timer_trig_low_reg(kind: ModuleKind) -> u32 {
    match kind {
        ModuleKind::Core => core_module::TIMER_TRIG_EVENT_LOW_VALUE,
        ModuleKind::Dma => memory_module::TIMER_TRIG_EVENT_LOW_VALUE,
        ModuleKind::Shim => pl_module::TIMER_TRIG_EVENT_LOW_VALUE,
        ModuleKind::MemTile => mem_tile_module::TIMER_TRIG_EVENT_LOW_VALUE,
    }
}

pub fn combo_inputs_reg(kind: ModuleKind) -> u32 {
    match kind {
        ModuleKind::Core => core_module::COMBO_EVENT_INPUTS,
        ModuleKind::Dma => memory_module::COMBO_EVENT_INPUTS,
        ModuleKind::Shim => pl_module::COMBO_EVENT_INPUTS,
        ModuleKind::MemTile => mem_tile_module::COMBO_EVENT_INPUTS,
    }
}

pub fn combo_control_reg(kind: ModuleKind) -> u32 {
    combo_inputs_reg(kind) + 4
}

/// Stream switch event port selection register and byte shift for one of
/// the 8 monitor slots.
pub fn ss_event_port_reg(kind: ModuleKind, port_idx: u8) -> (u32, u32) {
    let base = match kind {
        ModuleKind::MemTile => mem_tile_module::STREAM_SWITCH_EVENT_PORT_SELECTION_0,
        _ => STREAM_SWITCH_EVENT_PORT_SELECTION_0,
    };
    (base + (port_idx as u32 / 4) * 4, (port_idx as u32 % 4) * 8)
}

/// DMA buffer descriptor control word offset for the shim payload scan.
pub fn dma_bd_control_reg(bd: usize) -> u32 {
    memory_module::DMA_BD0_CONTROL + bd as u32 * memory_module::DMA_BD_STRIDE
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_address_roundtrip() {
        let addr = TileAddress::new(3, 4, 0x31520);
        let encoded = addr.encode();
        assert_eq!(encoded, (3 << 25) | (4 << 20) | 0x31520);
        assert_eq!(TileAddress::decode(encoded), addr);
    }

    #[test]
    fn test_address_masks_offset() {
        let addr = TileAddress::new(0, 0, 0xFFF_FFFF);
        assert_eq!(addr.offset, 0xFFFFF);
    }

    #[test]
    fn test_perf_control_layout() {
        // Core counters pair up two to a register
        assert_eq!(perf_control_reg(ModuleKind::Core, 0), (0x31500, 0));
        assert_eq!(perf_control_reg(ModuleKind::Core, 1), (0x31500, 8));
        assert_eq!(perf_control_reg(ModuleKind::Core, 2), (0x31504, 0));
        assert_eq!(perf_control_reg(ModuleKind::Core, 3), (0x31504, 8));
        // Memory and PL banks have a single control register
        assert_eq!(perf_control_reg(ModuleKind::Dma, 1), (0x11000, 8));
        assert_eq!(perf_control_reg(ModuleKind::Shim, 0), (0x31000, 0));
        assert_eq!(perf_control_reg(ModuleKind::MemTile, 3), (0x91004, 8));
    }

    #[test]
    fn test_counter_value_registers() {
        assert_eq!(perf_counter_reg(ModuleKind::Core, 2), 0x31528);
        assert_eq!(perf_counter_reg(ModuleKind::Dma, 1), 0x11024);
        assert_eq!(perf_counter_reg(ModuleKind::Shim, 0), 0x31020);
        assert_eq!(perf_counter_reg(ModuleKind::MemTile, 3), 0x9102C);
    }

    #[test]
    fn test_trace_slot_layout() {
        assert_eq!(trace_event_slot_reg(ModuleKind::Core, 0), (0x340E0, 0));
        assert_eq!(trace_event_slot_reg(ModuleKind::Core, 3), (0x340E0, 24));
        assert_eq!(trace_event_slot_reg(ModuleKind::Core, 4), (0x340E4, 0));
        assert_eq!(trace_event_slot_reg(ModuleKind::Dma, 7), (0x140E4, 24));
    }

    #[test]
    fn test_broadcast_block_directions() {
        assert_eq!(broadcast_block_set_reg(ModuleKind::Core, BlockDir::South), 0x34050);
        assert_eq!(broadcast_block_set_reg(ModuleKind::Core, BlockDir::West), 0x34060);
        assert_eq!(broadcast_block_set_reg(ModuleKind::Core, BlockDir::North), 0x34070);
        assert_eq!(broadcast_block_set_reg(ModuleKind::Core, BlockDir::East), 0x34080);
        assert_eq!(broadcast_block_clr_reg(ModuleKind::Dma, BlockDir::South), 0x14054);
    }

    #[test]
    fn test_bd_control_offsets() {
        assert_eq!(dma_bd_control_reg(0), 0x1D018);
        assert_eq!(dma_bd_control_reg(7), 0x1D018 + 7 * 0x20);
    }
}
