//! Trace request and results blocks.
//!
//! The results block mirrors the per-tile trace state: a core block, a
//! memory block and a mem-tile block per tile, present regardless of
//! the tile's module so the element stride stays fixed. Interface
//! tiles report through the mem-tile block.

use crate::device::TileSpec;
use crate::trace::configurator::{
    ConfiguredTrace, CoreTraceRecord, MemTileTraceRecord, MemoryTraceRecord, TracePcRecord,
    TraceTileRecord, TRACE_SLOTS,
};
use crate::trace::tables::CounterScheme;
use crate::trace::{TraceParams, TraceTile};
use crate::wire::{check_capacity, wire_size, WireError};
use log::warn;
use std::mem::size_of;
use zerocopy::{FromBytes, FromZeros, Immutable, IntoBytes, KnownLayout};

/// One tile's trace request (8 bytes)
#[derive(Debug, Clone, Copy, FromBytes, IntoBytes, KnownLayout, Immutable)]
#[repr(C)]
pub struct RawTraceTile {
    pub col: u8,
    pub row: u8,
    pub metric_set: u8,
    pub channel0: i8,       // -1 when the request carries no override
    pub channel1: i8,
    pub padding: [u8; 3],
}

/// Trace request header (32 bytes), one tile element inline
#[derive(Debug, Clone, Copy, FromBytes, IntoBytes, KnownLayout, Immutable)]
#[repr(C)]
pub struct RawTraceInput {
    pub num_tiles: u16,
    pub offset: u8,         // absolute row of the first AIE row
    pub hw_gen: u8,
    pub use_user_control: u8,
    pub use_delay: u8,
    pub use_graph_iterator: u8,
    pub use_one_delay_counter: u8,
    pub delay_cycles: u64,
    pub iteration_count: u32,
    pub counter_scheme: u8, // see CounterScheme::from_wire
    pub padding: [u8; 3],
    pub tiles: [RawTraceTile; 1],
}

/// One tracked program-counter range (12 bytes)
#[derive(Debug, Clone, Copy, FromBytes, IntoBytes, KnownLayout, Immutable)]
#[repr(C)]
pub struct RawTracePc {
    pub start_event: u16,
    pub stop_event: u16,
    pub reset_event: u16,
    pub padding: u16,
    pub event_value: u32,
}

/// Core-module trace state of one tile (124 bytes)
#[derive(Debug, Clone, Copy, FromBytes, IntoBytes, KnownLayout, Immutable)]
#[repr(C)]
pub struct RawCoreTraceConfig {
    pub pc: [RawTracePc; 4],
    pub traced_events: [u16; TRACE_SLOTS],
    pub internal_events_broadcast: [u16; 16],
    pub broadcast_mask_east: u32,
    pub broadcast_mask_west: u32,
    pub combo_event_input: [u16; 4],
    pub combo_event_control: [u16; 4],
    pub start_event: u16,
    pub stop_event: u16,
}

/// Memory-module trace state of one tile (48 bytes)
#[derive(Debug, Clone, Copy, FromBytes, IntoBytes, KnownLayout, Immutable)]
#[repr(C)]
pub struct RawMemoryTraceConfig {
    pub pc: [RawTracePc; 2],
    pub traced_events: [u16; TRACE_SLOTS],
    pub start_event: u16,
    pub stop_event: u16,
    pub packet_type: u8,
    pub padding: [u8; 3],
}

/// Mem-tile or interface-tile trace state (32 bytes)
#[derive(Debug, Clone, Copy, FromBytes, IntoBytes, KnownLayout, Immutable)]
#[repr(C)]
pub struct RawMemTileTraceConfig {
    pub traced_events: [u16; TRACE_SLOTS],
    pub port_trace_ids: [u8; 2],
    pub port_trace_is_master: [u8; 2],
    pub s2mm_channels: [i8; 2],
    pub mm2s_channels: [i8; 2],
    pub start_event: u16,
    pub stop_event: u16,
    pub packet_type: u8,
    pub padding: [u8; 3],
}

/// Full trace state of one tile (208 bytes)
#[derive(Debug, Clone, Copy, FromBytes, IntoBytes, KnownLayout, Immutable)]
#[repr(C)]
pub struct RawTileData {
    pub column: u8,
    pub row: u8,
    pub trace_metric_set: u8,
    pub padding: u8,
    pub core_trace_config: RawCoreTraceConfig,
    pub memory_trace_config: RawMemoryTraceConfig,
    pub memory_tile_trace_config: RawMemTileTraceConfig,
}

/// Trace results header (320 bytes), one tile element inline
#[derive(Debug, Clone, Copy, FromBytes, IntoBytes, KnownLayout, Immutable)]
#[repr(C)]
pub struct RawTraceOutput {
    pub num_tiles: u16,
    pub padding: [u8; 2],
    /// Tiles by number of reserved core trace events, 0 through all.
    pub num_tile_core_trace_events: [u32; TRACE_SLOTS + 1],
    pub num_tile_memory_trace_events: [u32; TRACE_SLOTS + 1],
    pub num_tile_mem_tile_trace_events: [u32; TRACE_SLOTS + 1],
    pub tiles: [RawTileData; 1],
}

/// Byte size of a request naming `num_tiles` tiles.
pub fn trace_input_size(num_tiles: usize) -> usize {
    wire_size(size_of::<RawTraceInput>(), size_of::<RawTraceTile>(), num_tiles)
}

/// Byte size of a results block covering `num_tiles` tiles.
pub fn trace_output_size(num_tiles: usize) -> usize {
    wire_size(size_of::<RawTraceOutput>(), size_of::<RawTileData>(), num_tiles)
}

/// Parsed trace request.
#[derive(Debug)]
pub struct TraceRequest {
    pub row_offset: u8,
    pub hw_gen: u8,
    pub params: TraceParams,
    pub tiles: Vec<TraceTile>,
}

/// Decoded trace results block.
#[derive(Debug)]
pub struct TraceOutput {
    pub tiles: Vec<RawTileData>,
    pub num_tile_core_trace_events: [u32; TRACE_SLOTS + 1],
    pub num_tile_memory_trace_events: [u32; TRACE_SLOTS + 1],
    pub num_tile_mem_tile_trace_events: [u32; TRACE_SLOTS + 1],
}

/// Serialize a trace request into `out`.
pub fn encode_trace_input(
    tiles: &[TraceTile],
    params: &TraceParams,
    row_offset: u8,
    hw_gen: u8,
    out: &mut [u8],
) -> Result<usize, WireError> {
    if tiles.is_empty() {
        return Err(WireError::EmptyConfiguration);
    }
    let need = trace_input_size(tiles.len());
    check_capacity(out, need)?;

    let mut header = RawTraceInput::new_zeroed();
    header.num_tiles = tiles.len() as u16;
    header.offset = row_offset;
    header.hw_gen = hw_gen;
    header.use_user_control = params.use_user_control as u8;
    header.use_delay = params.use_delay as u8;
    header.use_graph_iterator = params.use_graph_iterator as u8;
    header.use_one_delay_counter = params.use_one_delay_counter as u8;
    header.delay_cycles = params.delay_cycles;
    header.iteration_count = params.iteration_count;
    header.counter_scheme = params.counter_scheme.to_wire();
    header.tiles[0] = trace_tile_to_wire(&tiles[0]);

    let header_size = size_of::<RawTraceInput>();
    out[..header_size].copy_from_slice(header.as_bytes());
    let mut at = header_size;
    for tile in &tiles[1..] {
        let raw = trace_tile_to_wire(tile);
        out[at..at + size_of::<RawTraceTile>()].copy_from_slice(raw.as_bytes());
        at += size_of::<RawTraceTile>();
    }
    Ok(need)
}

/// Decode a trace request. A zero tile count is rejected before
/// anything else is looked at; an unknown counter-scheme id falls back
/// to the default scheme.
pub fn decode_trace_input(bytes: &[u8]) -> Result<TraceRequest, WireError> {
    let (header, mut rest) = RawTraceInput::read_from_prefix(bytes)
        .map_err(|_| WireError::Truncated { need: size_of::<RawTraceInput>(), got: bytes.len() })?;
    let count = header.num_tiles as usize;
    if count == 0 {
        return Err(WireError::EmptyConfiguration);
    }

    let counter_scheme = match CounterScheme::from_wire(header.counter_scheme) {
        Some(scheme) => scheme,
        None => {
            warn!("unknown counter scheme {}, using default", header.counter_scheme);
            CounterScheme::default()
        }
    };
    let params = TraceParams {
        delay_cycles: header.delay_cycles,
        iteration_count: header.iteration_count,
        use_user_control: header.use_user_control != 0,
        use_delay: header.use_delay != 0,
        use_graph_iterator: header.use_graph_iterator != 0,
        use_one_delay_counter: header.use_one_delay_counter != 0,
        counter_scheme,
    };

    let mut raw = Vec::with_capacity(count);
    raw.push(header.tiles[0]);
    while raw.len() < count {
        let (tile, tail) = RawTraceTile::read_from_prefix(rest)
            .map_err(|_| WireError::Truncated { need: trace_input_size(count), got: bytes.len() })?;
        raw.push(tile);
        rest = tail;
    }

    let tiles = raw.iter().map(trace_tile_from_wire).collect();
    Ok(TraceRequest { row_offset: header.offset, hw_gen: header.hw_gen, params, tiles })
}

/// Serialize the trace configuration results.
pub fn encode_trace_output(configured: &ConfiguredTrace, out: &mut [u8]) -> Result<usize, WireError> {
    let need = trace_output_size(configured.records.len());
    check_capacity(out, need)?;

    let mut header = RawTraceOutput::new_zeroed();
    header.num_tiles = configured.records.len() as u16;
    header.num_tile_core_trace_events = configured.histograms.core;
    header.num_tile_memory_trace_events = configured.histograms.memory;
    header.num_tile_mem_tile_trace_events = configured.histograms.mem_tile;
    if let Some(first) = configured.records.first() {
        header.tiles[0] = tile_to_wire(first);
    }

    let header_size = size_of::<RawTraceOutput>();
    out[..header_size].copy_from_slice(header.as_bytes());
    let mut at = header_size;
    for record in configured.records.iter().skip(1) {
        let raw = tile_to_wire(record);
        out[at..at + size_of::<RawTileData>()].copy_from_slice(raw.as_bytes());
        at += size_of::<RawTileData>();
    }
    Ok(need)
}

/// Decode a trace results block.
pub fn decode_trace_output(bytes: &[u8]) -> Result<TraceOutput, WireError> {
    let (header, mut rest) = RawTraceOutput::read_from_prefix(bytes)
        .map_err(|_| WireError::Truncated { need: size_of::<RawTraceOutput>(), got: bytes.len() })?;
    let count = header.num_tiles as usize;

    let mut tiles = Vec::with_capacity(count);
    if count > 0 {
        tiles.push(header.tiles[0]);
    }
    while tiles.len() < count {
        let (tile, tail) = RawTileData::read_from_prefix(rest)
            .map_err(|_| WireError::Truncated { need: trace_output_size(count), got: bytes.len() })?;
        tiles.push(tile);
        rest = tail;
    }
    Ok(TraceOutput {
        tiles,
        num_tile_core_trace_events: header.num_tile_core_trace_events,
        num_tile_memory_trace_events: header.num_tile_memory_trace_events,
        num_tile_mem_tile_trace_events: header.num_tile_mem_tile_trace_events,
    })
}

fn trace_tile_to_wire(tile: &TraceTile) -> RawTraceTile {
    RawTraceTile {
        col: tile.spec.loc.col,
        row: tile.spec.loc.row,
        metric_set: tile.metric_id,
        channel0: tile.channel0.map(|c| c as i8).unwrap_or(-1),
        channel1: tile.channel1.map(|c| c as i8).unwrap_or(-1),
        padding: [0; 3],
    }
}

fn trace_tile_from_wire(raw: &RawTraceTile) -> TraceTile {
    let mut tile = TraceTile::new(TileSpec::new(raw.col, raw.row), raw.metric_set);
    if raw.channel0 != -1 {
        tile.channel0 = Some(raw.channel0 as u8);
    }
    if raw.channel1 != -1 {
        tile.channel1 = Some(raw.channel1 as u8);
    }
    tile
}

fn tile_to_wire(record: &TraceTileRecord) -> RawTileData {
    RawTileData {
        column: record.col,
        row: record.row,
        trace_metric_set: record.metric_id,
        padding: 0,
        core_trace_config: core_to_wire(&record.core),
        memory_trace_config: memory_to_wire(&record.memory),
        memory_tile_trace_config: mem_tile_to_wire(&record.mem_tile),
    }
}

fn pc_to_wire(pc: &TracePcRecord) -> RawTracePc {
    RawTracePc {
        start_event: pc.start_event,
        stop_event: pc.stop_event,
        reset_event: pc.reset_event,
        padding: 0,
        event_value: pc.event_value,
    }
}

fn core_to_wire(rec: &CoreTraceRecord) -> RawCoreTraceConfig {
    RawCoreTraceConfig {
        pc: std::array::from_fn(|i| pc_to_wire(&rec.pc[i])),
        traced_events: rec.traced_events,
        internal_events_broadcast: rec.internal_events_broadcast,
        broadcast_mask_east: rec.broadcast_mask_east,
        broadcast_mask_west: rec.broadcast_mask_west,
        combo_event_input: rec.combo_event_input,
        combo_event_control: rec.combo_event_control,
        start_event: rec.start_event,
        stop_event: rec.stop_event,
    }
}

fn memory_to_wire(rec: &MemoryTraceRecord) -> RawMemoryTraceConfig {
    RawMemoryTraceConfig {
        pc: std::array::from_fn(|i| pc_to_wire(&rec.pc[i])),
        traced_events: rec.traced_events,
        start_event: rec.start_event,
        stop_event: rec.stop_event,
        packet_type: rec.packet_type,
        padding: [0; 3],
    }
}

fn mem_tile_to_wire(rec: &MemTileTraceRecord) -> RawMemTileTraceConfig {
    RawMemTileTraceConfig {
        traced_events: rec.traced_events,
        port_trace_ids: rec.port_trace_ids,
        port_trace_is_master: rec.port_trace_is_master,
        s2mm_channels: rec.s2mm_channels,
        mm2s_channels: rec.mm2s_channels,
        start_event: rec.start_event,
        stop_event: rec.stop_event,
        packet_type: rec.packet_type,
        padding: [0; 3],
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::trace::TraceHistograms;

    #[test]
    fn test_struct_sizes_pinned() {
        assert_eq!(size_of::<RawTraceTile>(), 8);
        assert_eq!(size_of::<RawTraceInput>(), 32);
        assert_eq!(size_of::<RawTracePc>(), 12);
        assert_eq!(size_of::<RawCoreTraceConfig>(), 124);
        assert_eq!(size_of::<RawMemoryTraceConfig>(), 48);
        assert_eq!(size_of::<RawMemTileTraceConfig>(), 32);
        assert_eq!(size_of::<RawTileData>(), 208);
        assert_eq!(size_of::<RawTraceOutput>(), 320);
    }

    #[test]
    fn test_input_size_formula() {
        assert_eq!(trace_input_size(1), size_of::<RawTraceInput>());
        assert_eq!(trace_input_size(4), size_of::<RawTraceInput>() + 3 * size_of::<RawTraceTile>());
    }

    fn request_params() -> TraceParams {
        TraceParams {
            delay_cycles: 1 << 33,
            iteration_count: 0,
            use_user_control: false,
            use_delay: true,
            use_graph_iterator: false,
            use_one_delay_counter: true,
            counter_scheme: CounterScheme::Es1,
        }
    }

    #[test]
    fn test_input_round_trip_recovers_request() {
        let mut mem_tile = TraceTile::new(TileSpec::new(1, 1), 0);
        mem_tile.channel0 = Some(0);
        mem_tile.channel1 = Some(1);
        let tiles = vec![TraceTile::new(TileSpec::new(0, 2), 1), mem_tile];

        let mut buf = vec![0u8; trace_input_size(tiles.len())];
        assert_eq!(encode_trace_input(&tiles, &request_params(), 2, 2, &mut buf).unwrap(), buf.len());

        let decoded = decode_trace_input(&buf).unwrap();
        assert_eq!(decoded.row_offset, 2);
        assert_eq!(decoded.hw_gen, 2);
        assert_eq!(decoded.params.delay_cycles, 1 << 33);
        assert!(decoded.params.use_delay);
        assert!(decoded.params.use_one_delay_counter);
        assert!(!decoded.params.use_user_control);
        assert_eq!(decoded.params.counter_scheme, CounterScheme::Es1);

        assert_eq!(decoded.tiles.len(), 2);
        assert_eq!(decoded.tiles[0].metric_id, 1);
        assert_eq!(decoded.tiles[0].channel0, None);
        assert_eq!(decoded.tiles[1].spec.loc.col, 1);
        assert_eq!(decoded.tiles[1].channel0, Some(0));
        assert_eq!(decoded.tiles[1].channel1, Some(1));
    }

    #[test]
    fn test_unknown_counter_scheme_defaults() {
        let tiles = vec![TraceTile::new(TileSpec::new(0, 2), 0)];
        let mut buf = vec![0u8; trace_input_size(1)];
        encode_trace_input(&tiles, &request_params(), 2, 2, &mut buf).unwrap();

        buf[20] = 7;
        let decoded = decode_trace_input(&buf).unwrap();
        assert_eq!(decoded.params.counter_scheme, CounterScheme::default());
    }

    #[test]
    fn test_zero_tiles_rejected() {
        assert!(matches!(
            encode_trace_input(&[], &request_params(), 2, 2, &mut [0u8; 64]),
            Err(WireError::EmptyConfiguration)
        ));

        let header = RawTraceInput::new_zeroed();
        assert!(matches!(
            decode_trace_input(header.as_bytes()),
            Err(WireError::EmptyConfiguration)
        ));
    }

    #[test]
    fn test_output_round_trip_crosses_records() {
        let mut record = TraceTileRecord::default();
        record.col = 3;
        record.row = 4;
        record.metric_id = 2;
        record.core.traced_events = [0x20, 0x21, 0x22, 0x23, 0x24, 0x25, 0x26, 0x27];
        record.core.internal_events_broadcast[2] = 0x58;
        record.core.broadcast_mask_east = 0x00FF_00FF;
        record.core.broadcast_mask_west = 0xFFFF_FF00;
        record.core.combo_event_input = [10, 11, 0, 0];
        record.core.combo_event_control = [2, 0, 0, 0];
        record.core.pc[1] =
            TracePcRecord { start_event: 16, stop_event: 17, reset_event: 0, event_value: 0x80 };
        record.core.start_event = 0x4B;
        record.core.stop_event = 0x4C;
        record.memory.packet_type = 1;
        record.memory.start_event = 0x76;
        record.mem_tile.s2mm_channels = [0, -1];
        record.mem_tile.mm2s_channels = [-1, -1];
        record.mem_tile.port_trace_ids = [5, 0];
        record.mem_tile.port_trace_is_master = [1, 0];

        let mut configured = ConfiguredTrace::default();
        configured.records.push(record);
        configured.histograms =
            TraceHistograms { core: [0, 0, 0, 0, 0, 0, 0, 0, 1], memory: [1; 9], mem_tile: [0; 9] };

        let mut buf = vec![0u8; trace_output_size(1)];
        assert_eq!(encode_trace_output(&configured, &mut buf).unwrap(), buf.len());

        let out = decode_trace_output(&buf).unwrap();
        assert_eq!(out.tiles.len(), 1);
        let tile = &out.tiles[0];
        assert_eq!(tile.column, 3);
        assert_eq!(tile.row, 4);
        assert_eq!(tile.trace_metric_set, 2);
        assert_eq!(tile.core_trace_config.traced_events[7], 0x27);
        assert_eq!(tile.core_trace_config.internal_events_broadcast[2], 0x58);
        assert_eq!(tile.core_trace_config.broadcast_mask_east, 0x00FF_00FF);
        assert_eq!(tile.core_trace_config.broadcast_mask_west, 0xFFFF_FF00);
        assert_eq!(tile.core_trace_config.combo_event_input[1], 11);
        assert_eq!(tile.core_trace_config.pc[1].stop_event, 17);
        assert_eq!(tile.core_trace_config.pc[1].event_value, 0x80);
        assert_eq!(tile.core_trace_config.start_event, 0x4B);
        assert_eq!(tile.memory_trace_config.packet_type, 1);
        assert_eq!(tile.memory_trace_config.start_event, 0x76);
        assert_eq!(tile.memory_tile_trace_config.s2mm_channels, [0, -1]);
        assert_eq!(tile.memory_tile_trace_config.port_trace_ids[0], 5);
        assert_eq!(tile.memory_tile_trace_config.port_trace_is_master[0], 1);
        assert_eq!(out.num_tile_core_trace_events[8], 1);
        assert_eq!(out.num_tile_memory_trace_events, [1; 9]);
    }

    #[test]
    fn test_undersized_output_left_untouched() {
        let mut configured = ConfiguredTrace::default();
        configured.records.push(TraceTileRecord::default());
        configured.records.push(TraceTileRecord::default());

        let mut buf = vec![0u8; trace_output_size(2) - 4];
        assert!(matches!(
            encode_trace_output(&configured, &mut buf),
            Err(WireError::Truncated { .. })
        ));
        assert!(buf.iter().all(|&b| b == 0));
    }
}
