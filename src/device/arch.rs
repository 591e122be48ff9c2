//! Architecture capability trait and per-generation implementations.
//!
//! Instead of matching on `AieGen` throughout the configurators, code asks
//! an [`ArchCaps`] for the parameters that differ between generations:
//! array geometry, row layout, counter capacities and the logical-to-
//! physical event translation. New device variants slot in as new
//! implementations without touching the engine.

use super::events::{self, EventId};
use super::registers;
use super::{AieGen, HwModule, ModuleKind};
use std::sync::Arc;

/// Architecture parameters for one hardware generation.
pub trait ArchCaps: Send + Sync + std::fmt::Debug {
    /// Generation implemented by this capability table.
    fn gen(&self) -> AieGen;

    /// Number of columns in the tile array.
    fn columns(&self) -> u8;

    /// Number of rows in the tile array, shim row included.
    fn rows(&self) -> u8;

    /// Absolute row of the first AIE tile row.
    fn row_offset(&self) -> u8 {
        self.gen().row_offset()
    }

    fn has_mem_tiles(&self) -> bool {
        self.gen().has_mem_tiles()
    }

    fn is_valid_tile(&self, col: u8, row: u8) -> bool {
        col < self.columns() && row < self.rows()
    }

    /// Profiling classification of a (row, hardware module) pair.
    fn module_kind(&self, row: u8, module: HwModule) -> ModuleKind {
        ModuleKind::classify(row, self.row_offset(), module)
    }

    /// Performance counters available in one module register bank.
    fn counter_count(&self, kind: ModuleKind) -> usize {
        registers::perf_counter_count(kind)
    }

    /// Translate a logical event to this generation's physical id.
    fn physical_event(&self, event: EventId) -> Option<u8> {
        events::physical_event(self.gen(), event)
    }

    /// Counter reservations tracked per counter (slot ids handed back)
    /// rather than per module capacity. NPU3 moved reservation bookkeeping
    /// into the array microcontroller, leaving the host with plain counts.
    fn tracks_counter_slots(&self) -> bool {
        self.gen() != AieGen::Npu3
    }
}

/// AIE1 (Versal ACAP, e.g. VC1902): 50 columns, 8 AIE rows above the
/// shim row, no mem tiles.
#[derive(Debug, Clone, Copy, Default)]
pub struct Aie1Caps;

impl ArchCaps for Aie1Caps {
    fn gen(&self) -> AieGen {
        AieGen::Aie1
    }

    fn columns(&self) -> u8 {
        50
    }

    fn rows(&self) -> u8 {
        9
    }
}

/// AIE2 / AIE-ML (Phoenix NPU): 5 columns, shim + mem tile + 4 AIE rows.
#[derive(Debug, Clone, Copy, Default)]
pub struct Aie2Caps;

impl ArchCaps for Aie2Caps {
    fn gen(&self) -> AieGen {
        AieGen::Aie2
    }

    fn columns(&self) -> u8 {
        5
    }

    fn rows(&self) -> u8 {
        6
    }
}

/// AIE2PS (edge VE2): wider array, same row layout as AIE2.
#[derive(Debug, Clone, Copy, Default)]
pub struct Aie2psCaps;

impl ArchCaps for Aie2psCaps {
    fn gen(&self) -> AieGen {
        AieGen::Aie2ps
    }

    fn columns(&self) -> u8 {
        38
    }

    fn rows(&self) -> u8 {
        11
    }
}

/// NPU3 (Strix-class): 8 columns, microcontroller-managed resources.
#[derive(Debug, Clone, Copy, Default)]
pub struct Npu3Caps;

impl ArchCaps for Npu3Caps {
    fn gen(&self) -> AieGen {
        AieGen::Npu3
    }

    fn columns(&self) -> u8 {
        8
    }

    fn rows(&self) -> u8 {
        6
    }
}

/// Capability table for a generation.
pub fn arch_for(gen: AieGen) -> Arc<dyn ArchCaps> {
    match gen {
        AieGen::Aie1 => Arc::new(Aie1Caps),
        AieGen::Aie2 => Arc::new(Aie2Caps),
        AieGen::Aie2ps => Arc::new(Aie2psCaps),
        AieGen::Npu3 => Arc::new(Npu3Caps),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_arch_for_covers_all_generations() {
        for gen in [AieGen::Aie1, AieGen::Aie2, AieGen::Aie2ps, AieGen::Npu3] {
            let arch = arch_for(gen);
            assert_eq!(arch.gen(), gen);
            assert!(arch.columns() > 0);
            assert!(arch.rows() > arch.row_offset());
        }
    }

    #[test]
    fn test_aie2_row_layout() {
        let arch = arch_for(AieGen::Aie2);
        assert_eq!(arch.module_kind(0, HwModule::Pl), ModuleKind::Shim);
        assert_eq!(arch.module_kind(1, HwModule::Mem), ModuleKind::MemTile);
        assert_eq!(arch.module_kind(2, HwModule::Core), ModuleKind::Core);
        assert_eq!(arch.module_kind(2, HwModule::Mem), ModuleKind::Dma);
    }

    #[test]
    fn test_aie1_row_layout() {
        let arch = arch_for(AieGen::Aie1);
        assert!(!arch.has_mem_tiles());
        assert_eq!(arch.module_kind(1, HwModule::Mem), ModuleKind::Dma);
    }

    #[test]
    fn test_counter_capacities() {
        let arch = arch_for(AieGen::Aie2);
        assert_eq!(arch.counter_count(ModuleKind::Core), 4);
        assert_eq!(arch.counter_count(ModuleKind::Dma), 2);
        assert_eq!(arch.counter_count(ModuleKind::Shim), 2);
        assert_eq!(arch.counter_count(ModuleKind::MemTile), 4);
    }

    #[test]
    fn test_npu3_counts_instead_of_tracking() {
        assert!(arch_for(AieGen::Aie2).tracks_counter_slots());
        assert!(!arch_for(AieGen::Npu3).tracks_counter_slots());
    }
}
