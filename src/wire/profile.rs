//! Profiling request and results blocks.

use crate::device::{ModuleKind, TileSpec};
use crate::profile::{ConfiguredCounters, CounterRecord, PollBatch, ProfileTile};
use crate::wire::{check_capacity, wire_size, WireError};
use log::warn;
use std::mem::size_of;
use zerocopy::{FromBytes, FromZeros, Immutable, IntoBytes, KnownLayout};

/// One tile's profiling request (24 bytes)
#[derive(Debug, Clone, Copy, FromBytes, IntoBytes, KnownLayout, Immutable)]
#[repr(C)]
pub struct RawProfileTile {
    pub col: u8,
    pub row: u8,
    pub metric_set: u8,
    pub channel0: i8,       // -1 when the request carries no override
    pub channel1: i8,
    pub is_trigger: u8,
    pub tile_mod: u8,       // wire module index, see ModuleKind::wire_index
    pub padding: u8,
    pub itr_mem_row: u16,
    pub itr_mem_col: u16,
    pub padding1: [u8; 4],
    pub itr_mem_addr: u64,
}

/// Profiling request header (32 bytes), one tile element inline
#[derive(Debug, Clone, Copy, FromBytes, IntoBytes, KnownLayout, Immutable)]
#[repr(C)]
pub struct RawProfileInput {
    pub num_tiles: u16,
    pub offset: u8,         // absolute row of the first AIE row
    pub padding: [u8; 5],
    pub tiles: [RawProfileTile; 1],
}

impl RawProfileInput {
    pub const NUM_CORE_COUNTERS: usize = 4;
    pub const NUM_MEMORY_COUNTERS: usize = 2;
    pub const NUM_SHIM_COUNTERS: usize = 2;
    pub const NUM_MEM_TILE_COUNTERS: usize = 4;
}

/// One configured counter as reported back (40 bytes)
#[derive(Debug, Clone, Copy, FromBytes, IntoBytes, KnownLayout, Immutable)]
#[repr(C)]
pub struct RawCounterInfo {
    pub counter_id: u16,
    pub col: u8,
    pub row: u8,
    pub counter_num: u8,
    pub reset_event: u8,
    pub start_event: u16,
    pub end_event: u16,
    pub module: u8,         // pass index, see ModuleKind::wire_index
    pub padding: u8,
    pub payload: u32,
    pub counter_value: u32,
    pub padding1: [u8; 4],
    pub timer_value: u64,
    pub timestamp: u64,
}

/// Profiling results header (48 bytes), one counter element inline
#[derive(Debug, Clone, Copy, FromBytes, IntoBytes, KnownLayout, Immutable)]
#[repr(C)]
pub struct RawProfileOutput {
    pub num_counters: u16,
    pub padding: [u8; 6],
    pub counters: [RawCounterInfo; 1],
}

/// Byte size of a request naming `num_tiles` tiles.
pub fn profile_input_size(num_tiles: usize) -> usize {
    wire_size(size_of::<RawProfileInput>(), size_of::<RawProfileTile>(), num_tiles)
}

/// Byte size of a results block holding `num_counters` entries. At
/// configure time the count is not yet known and callers size for the
/// worst case, `num_tiles * NUM_CORE_COUNTERS`.
pub fn profile_output_size(num_counters: usize) -> usize {
    wire_size(size_of::<RawProfileOutput>(), size_of::<RawCounterInfo>(), num_counters)
}

/// Parsed profiling request.
#[derive(Debug)]
pub struct ProfileRequest {
    pub row_offset: u8,
    pub tiles: Vec<ProfileTile>,
}

/// Serialize a profiling request into `out`.
pub fn encode_profile_input(
    tiles: &[ProfileTile],
    row_offset: u8,
    out: &mut [u8],
) -> Result<usize, WireError> {
    if tiles.is_empty() {
        return Err(WireError::EmptyConfiguration);
    }
    let need = profile_input_size(tiles.len());
    check_capacity(out, need)?;

    let mut header = RawProfileInput::new_zeroed();
    header.num_tiles = tiles.len() as u16;
    header.offset = row_offset;
    header.tiles[0] = profile_tile_to_wire(&tiles[0]);

    let header_size = size_of::<RawProfileInput>();
    out[..header_size].copy_from_slice(header.as_bytes());
    let mut at = header_size;
    for tile in &tiles[1..] {
        let raw = profile_tile_to_wire(tile);
        out[at..at + size_of::<RawProfileTile>()].copy_from_slice(raw.as_bytes());
        at += size_of::<RawProfileTile>();
    }
    Ok(need)
}

/// Decode a profiling request.
///
/// A zero tile count is rejected before anything else is looked at.
/// Tiles naming an unknown module index are dropped with a warning;
/// no configuration pass could ever match them.
pub fn decode_profile_input(bytes: &[u8]) -> Result<ProfileRequest, WireError> {
    let (header, mut rest) = RawProfileInput::read_from_prefix(bytes)
        .map_err(|_| WireError::Truncated { need: size_of::<RawProfileInput>(), got: bytes.len() })?;
    let count = header.num_tiles as usize;
    if count == 0 {
        return Err(WireError::EmptyConfiguration);
    }

    let mut raw = Vec::with_capacity(count);
    raw.push(header.tiles[0]);
    while raw.len() < count {
        let (tile, tail) = RawProfileTile::read_from_prefix(rest)
            .map_err(|_| WireError::Truncated { need: profile_input_size(count), got: bytes.len() })?;
        raw.push(tile);
        rest = tail;
    }

    let tiles = raw.iter().filter_map(profile_tile_from_wire).collect();
    Ok(ProfileRequest { row_offset: header.offset, tiles })
}

/// Serialize the configuration results. Counter and timer values are
/// not sampled yet and stay zero; `num_tiles` sizes the block for the
/// worst-case counter count.
pub fn encode_configure_output(
    configured: &ConfiguredCounters,
    num_tiles: usize,
    out: &mut [u8],
) -> Result<usize, WireError> {
    let capacity =
        (num_tiles * RawProfileInput::NUM_CORE_COUNTERS).max(configured.records.len());
    let need = profile_output_size(capacity);
    check_capacity(out, need)?;
    let infos: Vec<RawCounterInfo> =
        configured.records.iter().map(|r| counter_to_wire(r, 0, 0, 0)).collect();
    write_output(&infos, need, out);
    Ok(need)
}

/// Serialize one poll's samples, all stamped with the batch timestamp.
pub fn encode_poll_output(batch: &PollBatch, out: &mut [u8]) -> Result<usize, WireError> {
    let need = profile_output_size(batch.samples.len());
    check_capacity(out, need)?;
    let infos: Vec<RawCounterInfo> = batch
        .samples
        .iter()
        .map(|s| counter_to_wire(&s.record, s.counter_value, s.timer_value, batch.timestamp_ms))
        .collect();
    write_output(&infos, need, out);
    Ok(need)
}

/// Decode a results block.
pub fn decode_profile_output(bytes: &[u8]) -> Result<Vec<RawCounterInfo>, WireError> {
    let (header, mut rest) = RawProfileOutput::read_from_prefix(bytes)
        .map_err(|_| WireError::Truncated { need: size_of::<RawProfileOutput>(), got: bytes.len() })?;
    let count = header.num_counters as usize;

    let mut infos = Vec::with_capacity(count);
    if count > 0 {
        infos.push(header.counters[0]);
    }
    while infos.len() < count {
        let (info, tail) = RawCounterInfo::read_from_prefix(rest)
            .map_err(|_| WireError::Truncated { need: profile_output_size(count), got: bytes.len() })?;
        infos.push(info);
        rest = tail;
    }
    Ok(infos)
}

fn write_output(infos: &[RawCounterInfo], need: usize, out: &mut [u8]) {
    let mut header = RawProfileOutput::new_zeroed();
    header.num_counters = infos.len() as u16;
    if let Some(first) = infos.first() {
        header.counters[0] = *first;
    }

    let header_size = size_of::<RawProfileOutput>();
    out[..header_size].copy_from_slice(header.as_bytes());
    let mut at = header_size;
    for info in infos.iter().skip(1) {
        out[at..at + size_of::<RawCounterInfo>()].copy_from_slice(info.as_bytes());
        at += size_of::<RawCounterInfo>();
    }
    // The block was sized before writing; zero the worst-case slack.
    out[at..need].fill(0);
}

fn profile_tile_to_wire(tile: &ProfileTile) -> RawProfileTile {
    RawProfileTile {
        col: tile.spec.loc.col,
        row: tile.spec.loc.row,
        metric_set: tile.metric_id,
        channel0: tile.channel0.map(|c| c as i8).unwrap_or(-1),
        channel1: tile.channel1.map(|c| c as i8).unwrap_or(-1),
        is_trigger: tile.spec.is_trigger as u8,
        tile_mod: tile.pass.wire_index(),
        padding: 0,
        itr_mem_row: tile.spec.stream_row,
        itr_mem_col: tile.spec.stream_col,
        padding1: [0; 4],
        itr_mem_addr: tile.spec.stream_addr,
    }
}

fn profile_tile_from_wire(raw: &RawProfileTile) -> Option<ProfileTile> {
    let Some(pass) = ModuleKind::from_wire_index(raw.tile_mod) else {
        warn!("dropping tile ({},{}) with unknown module index {}", raw.col, raw.row, raw.tile_mod);
        return None;
    };
    let mut spec = TileSpec::new(raw.col, raw.row);
    spec.stream_row = raw.itr_mem_row;
    spec.stream_col = raw.itr_mem_col;
    spec.stream_addr = raw.itr_mem_addr;
    spec.is_trigger = raw.is_trigger != 0;

    let mut tile = ProfileTile::new(spec, pass, raw.metric_set);
    if raw.channel0 != -1 {
        tile.channel0 = Some(raw.channel0 as u8);
    }
    if raw.channel1 != -1 {
        tile.channel1 = Some(raw.channel1 as u8);
    }
    Some(tile)
}

fn counter_to_wire(
    record: &CounterRecord,
    counter_value: u32,
    timer_value: u64,
    timestamp: u64,
) -> RawCounterInfo {
    RawCounterInfo {
        counter_id: record.counter_id,
        col: record.col,
        row: record.row,
        counter_num: record.counter_num,
        reset_event: record.reset_event,
        start_event: record.start_event,
        end_event: record.end_event,
        module: record.module,
        padding: 0,
        payload: record.payload,
        counter_value,
        padding1: [0; 4],
        timer_value,
        timestamp,
    }
}
