//! Counter payload extraction.
//!
//! Every counter record carries a payload word the host uses to turn raw
//! counts into throughput figures. Two encodings exist:
//!
//! - AIE1/AIE2 report the monitored stream id for interface port events
//!   and the largest armed DMA buffer descriptor for finished-BD events.
//! - AIE2PS/NPU3 pack routing information instead: master flag in bit 8,
//!   channel-vs-stream flag in bit 7, channel or stream id in the low
//!   bits. BD sizes are no longer scanned on these devices.

use crate::device::access::{AccessError, RegisterIo};
use crate::device::events::{self, mem, EventId};
use crate::device::registers::{self, memory_module, TileAddress};
use crate::device::{AieGen, ModuleKind, ShimSubtype, TileSpec};
use crate::metrics::{CoreSet, InterfaceSet, MemorySet, MetricSet};

/// Packed payload field positions (AIE2PS/NPU3 encoding).
pub const PAYLOAD_IS_MASTER_SHIFT: u32 = 8;
pub const PAYLOAD_IS_CHANNEL_SHIFT: u32 = 7;

/// Whether a metric set monitors the input (S2MM) side of a DMA.
fn is_input_set(set: MetricSet) -> bool {
    match set {
        MetricSet::Core(s) => s == CoreSet::S2mmThroughputs,
        MetricSet::Memory(s) => {
            matches!(s, MemorySet::S2mmThroughputs | MemorySet::DmaStallsS2mm)
        }
        MetricSet::Interface(s) => {
            matches!(s, InterfaceSet::InputThroughputs | InterfaceSet::InputStalls)
        }
        MetricSet::MemTile(s) => s.is_input(),
    }
}

/// Compute the payload for one configured counter.
pub fn counter_payload(
    io: &mut dyn RegisterIo,
    gen: AieGen,
    tile: &TileSpec,
    kind: ModuleKind,
    set: MetricSet,
    start_event: EventId,
    channel: u8,
) -> Result<u32, AccessError> {
    match gen {
        AieGen::Aie1 | AieGen::Aie2 => stream_or_bd_payload(io, tile, start_event),
        AieGen::Aie2ps | AieGen::Npu3 => Ok(packed_payload(tile, kind, set, channel)),
    }
}

/// AIE1/AIE2 payload: stream id for interface port events, max armed BD
/// size for finished-BD events, 0 otherwise.
fn stream_or_bd_payload(
    io: &mut dyn RegisterIo,
    tile: &TileSpec,
    start_event: EventId,
) -> Result<u32, AccessError> {
    // Interface port events report the monitored stream:
    // (master flag << 8) | stream id, both captured at tile construction.
    if start_event.band() == ModuleKind::Shim
        && events::is_stream_switch_port_event(start_event)
    {
        return Ok(((tile.stream_col as u32) << 8) | tile.stream_row as u32);
    }

    let finished_bd = [
        mem::DMA_S2MM_0_FINISHED_BD,
        mem::DMA_S2MM_1_FINISHED_BD,
        mem::DMA_MM2S_0_FINISHED_BD,
        mem::DMA_MM2S_1_FINISHED_BD,
    ];
    if !finished_bd.contains(&start_event) {
        return Ok(0);
    }

    // Finished-BD counters report the largest buffer descriptor currently
    // armed, so the host can convert BD completions into byte throughput.
    let mut payload = 0u32;
    for bd in 0..memory_module::DMA_BD_COUNT {
        let addr = TileAddress::new(tile.loc.col, tile.loc.row, registers::dma_bd_control_reg(bd));
        let value = io.read(addr)?;
        if value & memory_module::DMA_BD_VALID_MASK != 0 {
            let words = (value >> memory_module::DMA_BD_LEN_LSB) & memory_module::DMA_BD_LEN_MASK;
            payload = payload.max(4 * (words + 1));
        }
    }
    Ok(payload)
}

/// AIE2PS/NPU3 payload: packed DMA routing info.
fn packed_payload(tile: &TileSpec, kind: ModuleKind, set: MetricSet, channel: u8) -> u32 {
    match kind {
        ModuleKind::Shim => {
            // GMIO monitors a DMA channel, PLIO a south stream port.
            let is_master = (tile.stream_col != 0) as u32;
            let (is_channel, id) = match tile.subtype {
                ShimSubtype::Gmio => (1u32, channel as u32),
                ShimSubtype::Plio => (0u32, tile.stream_row as u32),
            };
            (is_master << PAYLOAD_IS_MASTER_SHIFT) | (is_channel << PAYLOAD_IS_CHANNEL_SHIFT) | id
        }
        _ => {
            let is_master = is_input_set(set) as u32;
            (is_master << PAYLOAD_IS_MASTER_SHIFT)
                | (1 << PAYLOAD_IS_CHANNEL_SHIFT)
                | channel as u32
        }
    }
}
