//! Broadcast network for synchronized trace starts.
//!
//! Windowed tracing needs every traced module in a column range to see
//! the same start signal in the same cycle neighborhood. A single
//! trigger injected at the start column's shim rides channel 2 east
//! along the shim row, hops onto channel 1 at every column, and climbs
//! north to the top requested row. Per tile, every direction the signal
//! must not take is blocked, so the network never leaks into columns or
//! rows outside the requested extent.
//!
//! [`BroadcastNetwork::reset`] undoes exactly the writes
//! [`BroadcastNetwork::build`] made, register for register. Callers pair
//! the two around a trace run and call `reset` on the error path too;
//! a stale block mask corrupts whatever broadcast claims the channel
//! next.

use crate::device::access::{AccessError, RegisterIo};
use crate::device::events::{self, EventId};
use crate::device::registers::{self, BlockDir, TileAddress};
use crate::device::{ArchCaps, ModuleKind, TileLoc};
use log::debug;

/// Two-channel broadcast route over a contiguous column range.
///
/// Channel 1 carries the trigger north within each column; channel 2
/// carries it east across the shim row. The channel ids come from the
/// caller's broadcast-channel reservations and stay fixed for the
/// lifetime of the network.
#[derive(Debug, Clone)]
pub struct BroadcastNetwork {
    start_col: u8,
    num_cols: u8,
    channel1: u8,
    channel2: u8,
    row_offset: u8,
    /// Highest requested row per column in the range. Columns nobody
    /// requested stop at the shim row.
    max_row: Vec<u8>,
}

impl BroadcastNetwork {
    /// Plan the route for a set of requested tiles.
    ///
    /// Tiles outside the column range do not extend the network; the
    /// caller picks the range, the tiles only raise the per-column
    /// height.
    pub fn plan(
        start_col: u8,
        num_cols: u8,
        channel1: u8,
        channel2: u8,
        row_offset: u8,
        tiles: &[TileLoc],
    ) -> Self {
        let mut max_row = vec![0u8; num_cols as usize];
        for loc in tiles {
            if loc.col < start_col || loc.col >= start_col + num_cols {
                continue;
            }
            let top = &mut max_row[(loc.col - start_col) as usize];
            *top = (*top).max(loc.row);
        }
        Self { start_col, num_cols, channel1, channel2, row_offset, max_row }
    }

    /// Trace start event a module of the given kind should arm while
    /// the network is up. Shim modules listen on the east-bound
    /// channel, everything else on the column channel.
    pub fn start_event(&self, kind: ModuleKind) -> EventId {
        match kind {
            ModuleKind::Shim => events::broadcast_event(ModuleKind::Shim, self.channel2),
            kind => events::broadcast_event(kind, self.channel1),
        }
    }

    /// Program the sources and block every stray direction.
    ///
    /// The trigger becomes the channel-2 source at the origin shim and
    /// the channel-1 source at the start column; every other column
    /// sources channel 1 from the channel-2 broadcast it receives.
    pub fn build(
        &self,
        io: &mut dyn RegisterIo,
        arch: &dyn ArchCaps,
        trigger: EventId,
    ) -> Result<(), AccessError> {
        if self.num_cols == 0 {
            return Ok(());
        }
        let hop = events::broadcast_event(ModuleKind::Shim, self.channel2);
        self.set_source(io, arch, TileLoc::new(self.start_col, 0), self.channel2, trigger)?;
        for col in self.columns() {
            let source = if col == self.start_col { trigger } else { hop };
            self.set_source(io, arch, TileLoc::new(col, 0), self.channel1, source)?;
        }
        self.route(io, registers::broadcast_block_set_reg)?;
        debug!(
            "broadcast network built: cols {}..={}, ch1 {}, ch2 {}",
            self.start_col,
            self.last_col(),
            self.channel1,
            self.channel2
        );
        Ok(())
    }

    /// Undo [`build`](Self::build): zero both source registers and
    /// clear every block mask it set, and nothing else.
    pub fn reset(&self, io: &mut dyn RegisterIo) -> Result<(), AccessError> {
        if self.num_cols == 0 {
            return Ok(());
        }
        self.clear_source(io, TileLoc::new(self.start_col, 0), self.channel2)?;
        for col in self.columns() {
            self.clear_source(io, TileLoc::new(col, 0), self.channel1)?;
        }
        self.route(io, registers::broadcast_block_clr_reg)?;
        debug!("broadcast network reset: cols {}..={}", self.start_col, self.last_col());
        Ok(())
    }

    /// Walk the range and write one mask per blocked direction.
    ///
    /// Build and reset share this walk and differ only in the register
    /// family, so the clear writes mirror the set writes exactly.
    fn route(
        &self,
        io: &mut dyn RegisterIo,
        block_reg: fn(ModuleKind, BlockDir) -> u32,
    ) -> Result<(), AccessError> {
        let column_mask = 1u32 << self.channel1;
        for col in self.columns() {
            let top = self.max_row_at(col);
            for row in 0..=top {
                let loc = TileLoc::new(col, row);
                let topmost = row == top;
                match self.kind_at(row) {
                    ModuleKind::Shim => {
                        let masks = self.shim_masks(topmost, col == self.last_col());
                        for (dir, mask) in masks {
                            let reg = block_reg(ModuleKind::Shim, dir);
                            io.write(TileAddress::new(loc.col, loc.row, reg), mask)?;
                        }
                    }
                    kind => {
                        for &dir in column_dirs(topmost) {
                            let reg = block_reg(kind, dir);
                            io.write(TileAddress::new(loc.col, loc.row, reg), column_mask)?;
                        }
                    }
                }
            }
        }
        Ok(())
    }

    /// Per-direction blocking for a shim tile, both channels folded
    /// into one mask. Channel 1 may only leave north, channel 2 only
    /// east; the topmost shim of a bare column closes north and the
    /// last column closes east.
    fn shim_masks(&self, topmost: bool, last_col: bool) -> [(BlockDir, u32); 4] {
        let m1 = 1u32 << self.channel1;
        let m2 = 1u32 << self.channel2;
        [
            (BlockDir::South, m1 | m2),
            (BlockDir::West, m1 | m2),
            (BlockDir::North, if topmost { m1 | m2 } else { m2 }),
            (BlockDir::East, if last_col { m1 | m2 } else { m1 }),
        ]
    }

    fn columns(&self) -> std::ops::Range<u8> {
        self.start_col..self.start_col + self.num_cols
    }

    fn last_col(&self) -> u8 {
        self.start_col + self.num_cols - 1
    }

    fn max_row_at(&self, col: u8) -> u8 {
        self.max_row[(col - self.start_col) as usize]
    }

    fn kind_at(&self, row: u8) -> ModuleKind {
        if row == 0 {
            ModuleKind::Shim
        } else if row < self.row_offset {
            ModuleKind::MemTile
        } else {
            ModuleKind::Core
        }
    }

    fn set_source(
        &self,
        io: &mut dyn RegisterIo,
        arch: &dyn ArchCaps,
        loc: TileLoc,
        channel: u8,
        event: EventId,
    ) -> Result<(), AccessError> {
        let Some(phys) = arch.physical_event(event) else {
            return Ok(());
        };
        let reg = registers::event_broadcast_reg(ModuleKind::Shim, channel);
        io.write(TileAddress::new(loc.col, loc.row, reg), phys as u32)
    }

    fn clear_source(
        &self,
        io: &mut dyn RegisterIo,
        loc: TileLoc,
        channel: u8,
    ) -> Result<(), AccessError> {
        let reg = registers::event_broadcast_reg(ModuleKind::Shim, channel);
        io.write(TileAddress::new(loc.col, loc.row, reg), 0)
    }
}

/// Column-channel blocking: the signal may only continue north, and not
/// even that from the topmost requested row.
fn column_dirs(topmost: bool) -> &'static [BlockDir] {
    if topmost {
        &[BlockDir::South, BlockDir::West, BlockDir::East, BlockDir::North]
    } else {
        &[BlockDir::South, BlockDir::West, BlockDir::East]
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::device::access::RegisterModel;
    use crate::device::events::pl;
    use crate::device::{arch_for, AieGen};

    fn network() -> BroadcastNetwork {
        // Columns 0..=2, requested tiles up to rows 3, 1, 2. The tile
        // at column 5 lies outside the range.
        let tiles =
            [TileLoc::new(0, 3), TileLoc::new(1, 1), TileLoc::new(2, 2), TileLoc::new(5, 4)];
        BroadcastNetwork::plan(0, 3, 6, 7, 2, &tiles)
    }

    fn set_reg(col: u8, row: u8, kind: ModuleKind, dir: BlockDir) -> TileAddress {
        TileAddress::new(col, row, registers::broadcast_block_set_reg(kind, dir))
    }

    fn clr_reg(col: u8, row: u8, kind: ModuleKind, dir: BlockDir) -> TileAddress {
        TileAddress::new(col, row, registers::broadcast_block_clr_reg(kind, dir))
    }

    #[test]
    fn test_build_routes_trigger_north_and_east() {
        let mut io = RegisterModel::new();
        let arch = arch_for(AieGen::Aie2);
        let net = network();
        net.build(&mut io, arch.as_ref(), pl::USER_EVENT_1).unwrap();

        // The trigger feeds channel 2 at the origin and channel 1 in
        // the start column; the other columns pick channel 1 up from
        // the channel-2 broadcast.
        let ch1 = registers::event_broadcast_reg(ModuleKind::Shim, 6);
        let ch2 = registers::event_broadcast_reg(ModuleKind::Shim, 7);
        assert_eq!(io.peek(TileAddress::new(0, 0, ch2)), 123);
        assert_eq!(io.peek(TileAddress::new(0, 0, ch1)), 123);
        assert_eq!(io.peek(TileAddress::new(1, 0, ch1)), 113);
        assert_eq!(io.peek(TileAddress::new(2, 0, ch1)), 113);

        // Shim row: both channels block south and west, channel 2 runs
        // east and stops at the last column, channel 1 climbs north.
        assert_eq!(io.peek(set_reg(0, 0, ModuleKind::Shim, BlockDir::South)), (1 << 6) | (1 << 7));
        assert_eq!(io.peek(set_reg(0, 0, ModuleKind::Shim, BlockDir::North)), 1 << 7);
        assert_eq!(io.peek(set_reg(0, 0, ModuleKind::Shim, BlockDir::East)), 1 << 6);
        assert_eq!(io.peek(set_reg(2, 0, ModuleKind::Shim, BlockDir::East)), (1 << 6) | (1 << 7));

        // Column channel above the shim: north stays open until the
        // top requested row of each column.
        assert_eq!(io.peek(set_reg(0, 1, ModuleKind::MemTile, BlockDir::East)), 1 << 6);
        assert_eq!(io.peek(set_reg(0, 1, ModuleKind::MemTile, BlockDir::North)), 0);
        assert_eq!(io.peek(set_reg(0, 2, ModuleKind::Core, BlockDir::North)), 0);
        assert_eq!(io.peek(set_reg(0, 3, ModuleKind::Core, BlockDir::North)), 1 << 6);
        assert_eq!(io.peek(set_reg(1, 1, ModuleKind::MemTile, BlockDir::North)), 1 << 6);
        assert_eq!(io.peek(set_reg(2, 2, ModuleKind::Core, BlockDir::North)), 1 << 6);
    }

    #[test]
    fn test_columns_without_tiles_stop_at_shim() {
        let mut io = RegisterModel::new();
        let arch = arch_for(AieGen::Aie2);
        let net = BroadcastNetwork::plan(0, 2, 6, 7, 2, &[TileLoc::new(1, 1)]);
        net.build(&mut io, arch.as_ref(), pl::USER_EVENT_1).unwrap();

        // Column 0 has no requested tiles: its shim is the topmost row
        // and nothing above it is touched.
        assert_eq!(io.peek(set_reg(0, 0, ModuleKind::Shim, BlockDir::North)), (1 << 6) | (1 << 7));
        assert_eq!(io.peek(set_reg(0, 1, ModuleKind::MemTile, BlockDir::East)), 0);
        assert_eq!(io.peek(set_reg(1, 1, ModuleKind::MemTile, BlockDir::North)), 1 << 6);
    }

    #[test]
    fn test_reset_mirrors_every_build_write() {
        let mut io = RegisterModel::new();
        let arch = arch_for(AieGen::Aie2);
        let net = network();
        net.build(&mut io, arch.as_ref(), pl::USER_EVENT_1).unwrap();
        let after_build = io.written_count();
        net.reset(&mut io).unwrap();

        // Both source registers go back to zero.
        let ch1 = registers::event_broadcast_reg(ModuleKind::Shim, 6);
        let ch2 = registers::event_broadcast_reg(ModuleKind::Shim, 7);
        assert_eq!(io.peek(TileAddress::new(0, 0, ch2)), 0);
        for col in 0..3 {
            assert_eq!(io.peek(TileAddress::new(col, 0, ch1)), 0);
        }

        // Every set register has a clear twin carrying the same mask.
        for (col, top) in [(0u8, 3u8), (1, 1), (2, 2)] {
            for row in 0..=top {
                let kind = net.kind_at(row);
                for dir in BlockDir::ALL {
                    assert_eq!(
                        io.peek(clr_reg(col, row, kind, dir)),
                        io.peek(set_reg(col, row, kind, dir)),
                        "col {col} row {row} {dir:?}"
                    );
                }
            }
        }
        // Reset reuses the four source addresses and adds exactly one
        // clear twin per set register.
        assert_eq!(io.written_count(), after_build * 2 - 4);
    }

    #[test]
    fn test_windowed_start_events_follow_channels() {
        let net = network();
        let core = net.start_event(ModuleKind::Core);
        assert_eq!(core.band(), ModuleKind::Core);
        assert_eq!(core.in_band(), 113);
        assert_eq!(net.start_event(ModuleKind::Dma).in_band(), 113);
        assert_eq!(net.start_event(ModuleKind::MemTile).in_band(), 149);
        let shim = net.start_event(ModuleKind::Shim);
        assert_eq!(shim.band(), ModuleKind::Shim);
        assert_eq!(shim.in_band(), 113);
    }

    #[test]
    fn test_empty_range_writes_nothing() {
        let mut io = RegisterModel::new();
        let arch = arch_for(AieGen::Aie2);
        let net = BroadcastNetwork::plan(4, 0, 0, 1, 2, &[]);
        net.build(&mut io, arch.as_ref(), pl::USER_EVENT_1).unwrap();
        net.reset(&mut io).unwrap();
        assert_eq!(io.written_count(), 0);
    }
}
