//! Device model for AMD AI Engine arrays.
//!
//! This module provides:
//! - Hardware generation capability tables (AIE1, AIE2, AIE2PS, NPU3)
//! - Tile locations and profiling module classification
//! - Logical event identifiers and physical translation
//! - Register address maps for counter/trace/broadcast blocks
//! - The register access trait plus a sparse in-memory backend
//!
//! # Architecture Overview
//!
//! AI Engine devices are tile-based. Row 0 is the shim (interface) row,
//! rows above it up to the AIE row offset are memory tiles, and everything
//! from the offset upward is an AIE (core) tile:
//!
//! ```text
//!     Col 0    Col 1    Col 2    Col 3    Col 4
//!   +--------+--------+--------+--------+--------+
//! 3 |  AIE   |  AIE   |  AIE   |  AIE   |  AIE   |  <- core + memory module
//!   +--------+--------+--------+--------+--------+
//! 2 |  AIE   |  AIE   |  AIE   |  AIE   |  AIE   |  <- row offset = 2
//!   +--------+--------+--------+--------+--------+
//! 1 |MemTile |MemTile |MemTile |MemTile |MemTile |  <- mem-tile DMA
//!   +--------+--------+--------+--------+--------+
//! 0 | Shim   | Shim   | Shim   | Shim   | Shim   |  <- PLIO/GMIO interface
//!   +--------+--------+--------+--------+--------+
//! ```
//!
//! Each tile type carries different profiling hardware: AIE tiles have a
//! core module and a memory module (each with its own counters, trace unit
//! and broadcast block), mem tiles and shim tiles have a single module.
//!
//! # Example
//!
//! ```
//! use xdna_prof::device::{AieGen, ModuleKind, HwModule};
//!
//! let gen = AieGen::Aie2;
//! assert_eq!(gen.row_offset(), 2);
//!
//! // Row 0 is the shim row regardless of the requested hardware module.
//! let kind = ModuleKind::classify(0, gen.row_offset(), HwModule::Pl);
//! assert_eq!(kind, ModuleKind::Shim);
//! ```

pub mod access;
pub mod arch;
pub mod events;
pub mod registers;

pub use access::{RegisterIo, RegisterModel};
pub use arch::{ArchCaps, arch_for};
pub use events::EventId;
pub use registers::TileAddress;

use serde::{Deserialize, Serialize};
use std::fmt;

/// AI Engine hardware generation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AieGen {
    /// First generation AI Engine (Versal ACAP)
    Aie1,
    /// AIE-ML (Phoenix/HawkPoint NPUs, VE2802)
    Aie2,
    /// AIE-ML with PS integration (edge VE2)
    Aie2ps,
    /// NPU3 (Strix-class, microcontroller-managed)
    Npu3,
}

impl AieGen {
    /// Decode the generation number carried in wire headers.
    ///
    /// The numbering follows the runtime's `hw_gen` field: 1 = AIE,
    /// 2 = AIE-ML, 3 = AIE-ML/PS, 4 = NPU3.
    pub fn from_wire(hw_gen: u8) -> Option<Self> {
        match hw_gen {
            1 => Some(AieGen::Aie1),
            2 => Some(AieGen::Aie2),
            3 => Some(AieGen::Aie2ps),
            4 => Some(AieGen::Npu3),
            _ => None,
        }
    }

    /// Wire encoding of this generation.
    pub fn to_wire(self) -> u8 {
        match self {
            AieGen::Aie1 => 1,
            AieGen::Aie2 => 2,
            AieGen::Aie2ps => 3,
            AieGen::Npu3 => 4,
        }
    }

    /// Parse a generation name as it appears in config files.
    pub fn from_name(name: &str) -> Option<Self> {
        match name {
            "aie1" | "aie" => Some(AieGen::Aie1),
            "aie2" | "aieml" => Some(AieGen::Aie2),
            "aie2ps" => Some(AieGen::Aie2ps),
            "npu3" => Some(AieGen::Npu3),
            _ => None,
        }
    }

    /// Default absolute row of the first AIE tile row.
    ///
    /// Row 0 is always the shim row; mem-tile rows sit between the shim
    /// row and this offset. AIE1 devices have no mem tiles, so the offset
    /// is 1.
    pub fn row_offset(self) -> u8 {
        match self {
            AieGen::Aie1 => 1,
            AieGen::Aie2 | AieGen::Aie2ps | AieGen::Npu3 => 2,
        }
    }

    /// True for generations with mem tiles.
    pub fn has_mem_tiles(self) -> bool {
        !matches!(self, AieGen::Aie1)
    }
}

impl fmt::Display for AieGen {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AieGen::Aie1 => write!(f, "AIE1"),
            AieGen::Aie2 => write!(f, "AIE2"),
            AieGen::Aie2ps => write!(f, "AIE2PS"),
            AieGen::Npu3 => write!(f, "NPU3"),
        }
    }
}

/// Hardware module within a tile, as addressed by the register map.
///
/// AIE tiles contain a core module and a memory module; shim tiles expose
/// the PL module; mem tiles reuse the memory-module register layout at
/// their own base.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum HwModule {
    Core,
    Mem,
    Pl,
}

impl fmt::Display for HwModule {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            HwModule::Core => write!(f, "core_mod"),
            HwModule::Mem => write!(f, "mem_mod"),
            HwModule::Pl => write!(f, "pl_mod"),
        }
    }
}

/// Profiling classification of a (tile row, hardware module) pair.
///
/// This is the four-way split the configurators branch on: the same AIE
/// tile yields `Core` when profiled through its core module and `Dma`
/// through its memory module.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum ModuleKind {
    /// AIE tile, core module
    Core,
    /// AIE tile, memory module (DMA counters)
    Dma,
    /// Interface tile (PLIO/GMIO)
    Shim,
    /// Mem tile
    MemTile,
}

impl ModuleKind {
    /// Classify an absolute row + hardware module into a profiling kind.
    ///
    /// Row 0 is the shim row; rows below the AIE row offset are mem tiles;
    /// everything else is an AIE tile, split by the requested module.
    pub fn classify(abs_row: u8, row_offset: u8, module: HwModule) -> Self {
        if abs_row == 0 {
            return ModuleKind::Shim;
        }
        if abs_row < row_offset {
            return ModuleKind::MemTile;
        }
        if module == HwModule::Core {
            ModuleKind::Core
        } else {
            ModuleKind::Dma
        }
    }

    /// Whether a hardware module can service counters for this kind.
    ///
    /// Core-module events only exist on AIE tiles; memory-module events on
    /// AIE tiles and mem tiles; PL-module events only on shim tiles.
    /// Mismatches are skipped by the configurators, never errors.
    pub fn accepts(self, module: HwModule) -> bool {
        match module {
            HwModule::Core => matches!(self, ModuleKind::Core | ModuleKind::Dma),
            HwModule::Mem => matches!(self, ModuleKind::Dma | ModuleKind::MemTile),
            HwModule::Pl => self == ModuleKind::Shim,
        }
    }

    /// The hardware module whose register block backs this kind.
    pub fn hw_module(self) -> HwModule {
        match self {
            ModuleKind::Core => HwModule::Core,
            ModuleKind::Dma | ModuleKind::MemTile => HwModule::Mem,
            ModuleKind::Shim => HwModule::Pl,
        }
    }

    /// Wire index used in the `moduleName` output field (0..=3).
    pub fn wire_index(self) -> u8 {
        match self {
            ModuleKind::Core => 0,
            ModuleKind::Dma => 1,
            ModuleKind::Shim => 2,
            ModuleKind::MemTile => 3,
        }
    }

    pub fn from_wire_index(idx: u8) -> Option<Self> {
        match idx {
            0 => Some(ModuleKind::Core),
            1 => Some(ModuleKind::Dma),
            2 => Some(ModuleKind::Shim),
            3 => Some(ModuleKind::MemTile),
            _ => None,
        }
    }

    /// Human-readable name used in diagnostics and poll summaries.
    pub fn name(self) -> &'static str {
        match self {
            ModuleKind::Core => "core",
            ModuleKind::Dma => "memory",
            ModuleKind::Shim => "interface_tile",
            ModuleKind::MemTile => "memory_tile",
        }
    }

    /// All kinds in configuration order (the 4-module pass order).
    pub const ALL: [ModuleKind; 4] = [
        ModuleKind::Core,
        ModuleKind::Dma,
        ModuleKind::Shim,
        ModuleKind::MemTile,
    ];
}

impl fmt::Display for ModuleKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.name())
    }
}

/// Tile location within the array.
///
/// Rows are absolute (0 = shim row). Ordering is column-major so that
/// `BTreeMap<TileLoc, _>` iteration matches the deterministic
/// configuration order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct TileLoc {
    pub col: u8,
    pub row: u8,
}

impl TileLoc {
    pub fn new(col: u8, row: u8) -> Self {
        Self { col, row }
    }
}

impl fmt::Display for TileLoc {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "({},{})", self.col, self.row)
    }
}

/// Shim tile subtype: external-stream PLIO vs DMA-backed GMIO.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
pub enum ShimSubtype {
    #[default]
    Plio,
    Gmio,
}

impl ShimSubtype {
    pub fn from_wire(v: u8) -> Self {
        if v == 1 { ShimSubtype::Gmio } else { ShimSubtype::Plio }
    }

    pub fn to_wire(self) -> u8 {
        match self {
            ShimSubtype::Plio => 0,
            ShimSubtype::Gmio => 1,
        }
    }
}

/// One tile requested for profiling or tracing.
///
/// Built from the caller-supplied wire descriptors once per configuration
/// request and immutable afterwards. `stream_row`/`stream_col` record the
/// monitored stream port (slave flag and stream id for shim tiles);
/// `active_core`/`active_memory` tell whether the compiled design actually
/// placed code or buffers here.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TileSpec {
    pub loc: TileLoc,
    pub subtype: ShimSubtype,
    /// Stream id of the monitored port (shim tiles). Wire `itr_mem_row`.
    pub stream_row: u16,
    /// Master(1)/slave(0) flag of the monitored port. Wire `itr_mem_col`.
    pub stream_col: u16,
    /// Host address of the iteration memory, carried through untouched.
    pub stream_addr: u64,
    pub is_trigger: bool,
    pub active_core: bool,
    pub active_memory: bool,
}

impl TileSpec {
    pub fn new(col: u8, row: u8) -> Self {
        Self {
            loc: TileLoc::new(col, row),
            subtype: ShimSubtype::Plio,
            stream_row: 0,
            stream_col: 0,
            stream_addr: 0,
            is_trigger: false,
            active_core: true,
            active_memory: true,
        }
    }

    /// Ordering key: (col, row, subtype), matching the ordered-map layout.
    pub fn key(&self) -> (u8, u8, ShimSubtype) {
        (self.loc.col, self.loc.row, self.subtype)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_gen_wire_roundtrip() {
        for gen in [AieGen::Aie1, AieGen::Aie2, AieGen::Aie2ps, AieGen::Npu3] {
            assert_eq!(AieGen::from_wire(gen.to_wire()), Some(gen));
        }
        assert_eq!(AieGen::from_wire(0), None);
        assert_eq!(AieGen::from_wire(9), None);
    }

    #[test]
    fn test_module_classification() {
        let offset = AieGen::Aie2.row_offset();

        // Shim row wins regardless of module
        assert_eq!(ModuleKind::classify(0, offset, HwModule::Core), ModuleKind::Shim);
        assert_eq!(ModuleKind::classify(0, offset, HwModule::Pl), ModuleKind::Shim);

        // Rows below the offset are mem tiles
        assert_eq!(ModuleKind::classify(1, offset, HwModule::Mem), ModuleKind::MemTile);

        // AIE rows split by hardware module
        assert_eq!(ModuleKind::classify(2, offset, HwModule::Core), ModuleKind::Core);
        assert_eq!(ModuleKind::classify(2, offset, HwModule::Mem), ModuleKind::Dma);
        assert_eq!(ModuleKind::classify(5, offset, HwModule::Mem), ModuleKind::Dma);
    }

    #[test]
    fn test_classification_aie1_has_no_mem_tiles() {
        let offset = AieGen::Aie1.row_offset();
        assert_eq!(ModuleKind::classify(1, offset, HwModule::Mem), ModuleKind::Dma);
    }

    #[test]
    fn test_module_applicability_matrix() {
        assert!(ModuleKind::Core.accepts(HwModule::Core));
        assert!(ModuleKind::Dma.accepts(HwModule::Core));
        assert!(ModuleKind::Dma.accepts(HwModule::Mem));
        assert!(ModuleKind::MemTile.accepts(HwModule::Mem));
        assert!(ModuleKind::Shim.accepts(HwModule::Pl));

        assert!(!ModuleKind::Shim.accepts(HwModule::Core));
        assert!(!ModuleKind::Shim.accepts(HwModule::Mem));
        assert!(!ModuleKind::Core.accepts(HwModule::Mem));
        assert!(!ModuleKind::Core.accepts(HwModule::Pl));
        assert!(!ModuleKind::MemTile.accepts(HwModule::Core));
        assert!(!ModuleKind::MemTile.accepts(HwModule::Pl));
    }

    #[test]
    fn test_tile_loc_ordering() {
        let mut locs = vec![
            TileLoc::new(1, 3),
            TileLoc::new(0, 5),
            TileLoc::new(1, 0),
            TileLoc::new(0, 2),
        ];
        locs.sort();
        assert_eq!(
            locs,
            vec![
                TileLoc::new(0, 2),
                TileLoc::new(0, 5),
                TileLoc::new(1, 0),
                TileLoc::new(1, 3),
            ]
        );
    }

    #[test]
    fn test_wire_index_roundtrip() {
        for kind in ModuleKind::ALL {
            assert_eq!(ModuleKind::from_wire_index(kind.wire_index()), Some(kind));
        }
        assert_eq!(ModuleKind::from_wire_index(4), None);
    }
}
