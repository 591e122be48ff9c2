//! Stream-switch monitor port configuration.
//!
//! Port events (running/stalled/idle/tlast) only fire once a monitor slot
//! of the tile's stream switch is pointed at the right port. Each slot is
//! a scarce resource; the reservation is handed back at teardown.

use crate::device::access::{AccessError, RegisterIo};
use crate::device::events::{self, core, EventId};
use crate::device::registers::{
    self, TileAddress, SS_EVENT_PORT_ID_MASK, SS_EVENT_PORT_MASTER_BIT,
};
use crate::device::{ModuleKind, TileLoc, TileSpec};
use crate::metrics::{MemTileSet, MetricSet};
use crate::resources::{ResourceKind, ResourcePool};

/// One reserved stream-switch monitor slot.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PortHandle {
    pub loc: TileLoc,
    pub kind: ModuleKind,
    pub slot: u8,
}

// Port interface ids written into the event port selection byte, following
// the AM025 stream switch port map of each tile class.
pub(crate) const AIE_TRACE_PORT: u8 = 23;
pub(crate) const SHIM_SOUTH_PORT_BASE: u8 = 3;
pub(crate) const MEM_TILE_DMA_PORT_BASE: u8 = 0;
pub(crate) const MEM_TILE_TRACE_PORT: u8 = 13;

/// Bind a monitor slot for one counter's port event.
///
/// Applies only to port events on the first two counters of a tile; all
/// other calls are no-ops. A tile out of monitor slots is skipped
/// silently, the counter still counts (it just never sees port activity).
pub fn configure_stream_port(
    io: &mut dyn RegisterIo,
    pool: &mut dyn ResourcePool,
    tile: &TileSpec,
    kind: ModuleKind,
    set: MetricSet,
    event: EventId,
    count_num: u8,
    channel: u8,
) -> Result<Option<PortHandle>, AccessError> {
    if !events::is_stream_switch_port_event(event) || count_num > 1 {
        return Ok(None);
    }

    let (master, port_id) = match kind {
        // Monitor the tile's own trace streams: select 0 is the core
        // trace port, anything else the memory trace port.
        ModuleKind::Core => {
            let trace_select = if event == core::PORT_RUNNING_0 { 0 } else { 1 };
            (false, AIE_TRACE_PORT + trace_select)
        }
        // The memory module has no stream switch of its own.
        ModuleKind::Dma => return Ok(None),
        // The tile records which south port to watch and its direction.
        ModuleKind::Shim => (
            tile.stream_col != 0,
            SHIM_SOUTH_PORT_BASE + tile.stream_row as u8,
        ),
        ModuleKind::MemTile => {
            let MetricSet::MemTile(s) = set else { return Ok(None) };
            if s == MemTileSet::MemTrace {
                (false, MEM_TILE_TRACE_PORT)
            } else {
                let master =
                    !matches!(s, MemTileSet::OutputChannels | MemTileSet::OutputChannelsDetails);
                (master, MEM_TILE_DMA_PORT_BASE + channel)
            }
        }
    };

    let Some(slot) = pool.acquire(tile.loc, kind, ResourceKind::StreamPort) else {
        return Ok(None);
    };

    let (reg, shift) = registers::ss_event_port_reg(kind, slot);
    let mut byte = port_id as u32 & SS_EVENT_PORT_ID_MASK;
    if master {
        byte |= SS_EVENT_PORT_MASTER_BIT;
    }
    let addr = TileAddress::new(tile.loc.col, tile.loc.row, reg);
    io.mask_write(addr, 0xFF << shift, byte << shift)?;

    Ok(Some(PortHandle { loc: tile.loc, kind, slot }))
}

/// Return monitor slots to the pool (teardown).
pub fn release_stream_ports(pool: &mut dyn ResourcePool, ports: &[PortHandle]) {
    for port in ports {
        pool.release(port.loc, port.kind, ResourceKind::StreamPort, port.slot);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::device::access::RegisterModel;
    use crate::device::events::{mem_tile, pl};
    use crate::metrics::{CoreSet, InterfaceSet};
    use crate::resources::TrackedPool;

    #[test]
    fn test_core_trace_port_selection() {
        let mut io = RegisterModel::new();
        let mut pool = TrackedPool::new();
        let tile = TileSpec::new(1, 2);
        let set = MetricSet::Core(CoreSet::AieTrace);

        let h0 = configure_stream_port(
            &mut io, &mut pool, &tile, ModuleKind::Core, set,
            core::PORT_RUNNING_0, 0, 0,
        )
        .unwrap()
        .unwrap();
        let h1 = configure_stream_port(
            &mut io, &mut pool, &tile, ModuleKind::Core, set,
            core::PORT_RUNNING_1, 1, 1,
        )
        .unwrap()
        .unwrap();
        assert_eq!((h0.slot, h1.slot), (0, 1));

        let (reg, _) = registers::ss_event_port_reg(ModuleKind::Core, 0);
        let word = io.peek(TileAddress::new(1, 2, reg));
        // Slot 0: core trace port, slave. Slot 1: memory trace port.
        assert_eq!(word & 0xFF, AIE_TRACE_PORT as u32);
        assert_eq!((word >> 8) & 0xFF, AIE_TRACE_PORT as u32 + 1);
    }

    #[test]
    fn test_shim_port_master_flag_and_stream_id() {
        let mut io = RegisterModel::new();
        let mut pool = TrackedPool::new();
        let mut tile = TileSpec::new(4, 0);
        tile.stream_col = 1;
        tile.stream_row = 2;
        let set = MetricSet::Interface(InterfaceSet::InputThroughputs);

        configure_stream_port(
            &mut io, &mut pool, &tile, ModuleKind::Shim, set,
            pl::PORT_RUNNING_0, 0, 0,
        )
        .unwrap()
        .unwrap();

        let (reg, _) = registers::ss_event_port_reg(ModuleKind::Shim, 0);
        let byte = io.peek(TileAddress::new(4, 0, reg)) & 0xFF;
        assert_eq!(byte & SS_EVENT_PORT_ID_MASK, (SHIM_SOUTH_PORT_BASE + 2) as u32);
        assert_ne!(byte & SS_EVENT_PORT_MASTER_BIT, 0);
    }

    #[test]
    fn test_shim_slave_when_stream_col_zero() {
        let mut io = RegisterModel::new();
        let mut pool = TrackedPool::new();
        let mut tile = TileSpec::new(0, 0);
        tile.stream_row = 5;
        let set = MetricSet::Interface(InterfaceSet::Packets);

        configure_stream_port(
            &mut io, &mut pool, &tile, ModuleKind::Shim, set,
            pl::PORT_TLAST_0, 0, 0,
        )
        .unwrap()
        .unwrap();

        let (reg, _) = registers::ss_event_port_reg(ModuleKind::Shim, 0);
        let byte = io.peek(TileAddress::new(0, 0, reg)) & 0xFF;
        assert_eq!(byte & SS_EVENT_PORT_MASTER_BIT, 0);
    }

    #[test]
    fn test_mem_tile_trace_vs_dma_port() {
        let mut io = RegisterModel::new();
        let mut pool = TrackedPool::new();
        let tile = TileSpec::new(2, 1);

        configure_stream_port(
            &mut io, &mut pool, &tile, ModuleKind::MemTile,
            MetricSet::MemTile(MemTileSet::MemTrace),
            mem_tile::PORT_RUNNING_0, 0, 0,
        )
        .unwrap()
        .unwrap();
        configure_stream_port(
            &mut io, &mut pool, &tile, ModuleKind::MemTile,
            MetricSet::MemTile(MemTileSet::OutputChannels),
            mem_tile::PORT_RUNNING_0, 1, 3,
        )
        .unwrap()
        .unwrap();

        let (reg, _) = registers::ss_event_port_reg(ModuleKind::MemTile, 0);
        let word = io.peek(TileAddress::new(2, 1, reg));
        assert_eq!(word & 0xFF, MEM_TILE_TRACE_PORT as u32);
        // Output channels watch the slave side of DMA channel 3.
        assert_eq!((word >> 8) & 0xFF, (MEM_TILE_DMA_PORT_BASE + 3) as u32);
    }

    #[test]
    fn test_mem_tile_input_set_is_master() {
        let mut io = RegisterModel::new();
        let mut pool = TrackedPool::new();
        let tile = TileSpec::new(0, 1);

        configure_stream_port(
            &mut io, &mut pool, &tile, ModuleKind::MemTile,
            MetricSet::MemTile(MemTileSet::InputChannels),
            mem_tile::PORT_RUNNING_0, 0, 1,
        )
        .unwrap()
        .unwrap();

        let (reg, _) = registers::ss_event_port_reg(ModuleKind::MemTile, 0);
        let byte = io.peek(TileAddress::new(0, 1, reg)) & 0xFF;
        assert_ne!(byte & SS_EVENT_PORT_MASTER_BIT, 0);
    }

    #[test]
    fn test_non_port_event_and_late_counters_skipped() {
        let mut io = RegisterModel::new();
        let mut pool = TrackedPool::new();
        let tile = TileSpec::new(1, 2);
        let set = MetricSet::Core(CoreSet::HeatMap);

        let none = configure_stream_port(
            &mut io, &mut pool, &tile, ModuleKind::Core, set,
            core::ACTIVE, 0, 0,
        )
        .unwrap();
        assert!(none.is_none());

        // Port event on counter index 2 is out of monitor range.
        let none = configure_stream_port(
            &mut io, &mut pool, &tile, ModuleKind::Core,
            MetricSet::Core(CoreSet::AieTrace), core::PORT_RUNNING_0, 2, 0,
        )
        .unwrap();
        assert!(none.is_none());
        assert_eq!(io.written_count(), 0);
    }

    #[test]
    fn test_slot_exhaustion_skips_silently() {
        let mut io = RegisterModel::new();
        let mut pool = TrackedPool::new();
        let tile = TileSpec::new(3, 0);
        let set = MetricSet::Interface(InterfaceSet::Packets);

        for _ in 0..8 {
            pool.acquire(tile.loc, ModuleKind::Shim, ResourceKind::StreamPort).unwrap();
        }
        let none = configure_stream_port(
            &mut io, &mut pool, &tile, ModuleKind::Shim, set,
            pl::PORT_TLAST_0, 0, 0,
        )
        .unwrap();
        assert!(none.is_none());
    }

    #[test]
    fn test_release_returns_slots() {
        let mut io = RegisterModel::new();
        let mut pool = TrackedPool::new();
        let tile = TileSpec::new(1, 0);
        let set = MetricSet::Interface(InterfaceSet::Packets);

        let handle = configure_stream_port(
            &mut io, &mut pool, &tile, ModuleKind::Shim, set,
            pl::PORT_TLAST_0, 0, 0,
        )
        .unwrap()
        .unwrap();
        assert_eq!(pool.available(tile.loc, ModuleKind::Shim, ResourceKind::StreamPort), 7);

        release_stream_ports(&mut pool, &[handle]);
        assert_eq!(pool.available(tile.loc, ModuleKind::Shim, ResourceKind::StreamPort), 8);
    }
}
