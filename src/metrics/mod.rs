//! Named metric sets.
//!
//! A metric set bundles the hardware events that characterize one aspect
//! of performance for one module class. Callers name sets by string (the
//! runtime configuration surface) or by wire id (the binary interface);
//! [`tables`] maps each set to its per-generation event list.

pub mod tables;

use crate::device::ModuleKind;
use std::fmt;

/// Core module metric sets.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CoreSet {
    HeatMap,
    Stalls,
    Execution,
    FloatingPoint,
    StreamPutGet,
    WriteThroughputs,
    ReadThroughputs,
    S2mmThroughputs,
    Mm2sThroughputs,
    AieTrace,
    Events,
}

impl CoreSet {
    pub fn from_wire(id: u8) -> Option<Self> {
        use CoreSet::*;
        Some(match id {
            0 => HeatMap,
            1 => Stalls,
            2 => Execution,
            3 => FloatingPoint,
            4 => StreamPutGet,
            5 => WriteThroughputs,
            6 => ReadThroughputs,
            7 => S2mmThroughputs,
            8 => Mm2sThroughputs,
            9 => AieTrace,
            10 => Events,
            _ => return None,
        })
    }

    pub fn to_wire(self) -> u8 {
        use CoreSet::*;
        match self {
            HeatMap => 0,
            Stalls => 1,
            Execution => 2,
            FloatingPoint => 3,
            StreamPutGet => 4,
            WriteThroughputs => 5,
            ReadThroughputs => 6,
            S2mmThroughputs => 7,
            Mm2sThroughputs => 8,
            AieTrace => 9,
            Events => 10,
        }
    }

    pub fn from_name(name: &str) -> Option<Self> {
        use CoreSet::*;
        Some(match name {
            "heat_map" => HeatMap,
            "stalls" => Stalls,
            "execution" => Execution,
            "floating_point" => FloatingPoint,
            "stream_put_get" => StreamPutGet,
            "write_throughputs" | "write_bandwidths" => WriteThroughputs,
            "read_throughputs" | "read_bandwidths" => ReadThroughputs,
            "s2mm_throughputs" => S2mmThroughputs,
            "mm2s_throughputs" => Mm2sThroughputs,
            "aie_trace" => AieTrace,
            "events" => Events,
            _ => return None,
        })
    }

    pub fn name(self) -> &'static str {
        use CoreSet::*;
        match self {
            HeatMap => "heat_map",
            Stalls => "stalls",
            Execution => "execution",
            FloatingPoint => "floating_point",
            StreamPutGet => "stream_put_get",
            WriteThroughputs => "write_throughputs",
            ReadThroughputs => "read_throughputs",
            S2mmThroughputs => "s2mm_throughputs",
            Mm2sThroughputs => "mm2s_throughputs",
            AieTrace => "aie_trace",
            Events => "events",
        }
    }
}

/// Memory module (AIE tile DMA) metric sets.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MemorySet {
    Conflicts,
    DmaLocks,
    DmaStallsS2mm,
    DmaStallsMm2s,
    S2mmThroughputs,
    Mm2sThroughputs,
}

impl MemorySet {
    pub fn from_wire(id: u8) -> Option<Self> {
        use MemorySet::*;
        Some(match id {
            0 => Conflicts,
            1 => DmaLocks,
            2 => DmaStallsS2mm,
            3 => DmaStallsMm2s,
            4 => S2mmThroughputs,
            5 => Mm2sThroughputs,
            _ => return None,
        })
    }

    pub fn to_wire(self) -> u8 {
        use MemorySet::*;
        match self {
            Conflicts => 0,
            DmaLocks => 1,
            DmaStallsS2mm => 2,
            DmaStallsMm2s => 3,
            S2mmThroughputs => 4,
            Mm2sThroughputs => 5,
        }
    }

    pub fn from_name(name: &str) -> Option<Self> {
        use MemorySet::*;
        Some(match name {
            "conflicts" => Conflicts,
            "dma_locks" => DmaLocks,
            "dma_stalls_s2mm" => DmaStallsS2mm,
            "dma_stalls_mm2s" => DmaStallsMm2s,
            // Write traffic lands in memory via S2MM, reads leave via MM2S
            "s2mm_throughputs" | "write_throughputs" => S2mmThroughputs,
            "mm2s_throughputs" | "read_throughputs" => Mm2sThroughputs,
            _ => return None,
        })
    }

    pub fn name(self) -> &'static str {
        use MemorySet::*;
        match self {
            Conflicts => "conflicts",
            DmaLocks => "dma_locks",
            DmaStallsS2mm => "dma_stalls_s2mm",
            DmaStallsMm2s => "dma_stalls_mm2s",
            S2mmThroughputs => "s2mm_throughputs",
            Mm2sThroughputs => "mm2s_throughputs",
        }
    }
}

/// Interface (shim) tile metric sets.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum InterfaceSet {
    InputThroughputs,
    OutputThroughputs,
    Packets,
    InputStalls,
    OutputStalls,
}

impl InterfaceSet {
    pub fn from_wire(id: u8) -> Option<Self> {
        use InterfaceSet::*;
        Some(match id {
            0 => InputThroughputs,
            1 => OutputThroughputs,
            2 => Packets,
            3 => InputStalls,
            4 => OutputStalls,
            _ => return None,
        })
    }

    pub fn to_wire(self) -> u8 {
        use InterfaceSet::*;
        match self {
            InputThroughputs => 0,
            OutputThroughputs => 1,
            Packets => 2,
            InputStalls => 3,
            OutputStalls => 4,
        }
    }

    pub fn from_name(name: &str) -> Option<Self> {
        use InterfaceSet::*;
        Some(match name {
            // Input to the array is MM2S from the host's point of view
            "input_throughputs" | "input_bandwidths" | "mm2s_throughputs" => InputThroughputs,
            "output_throughputs" | "output_bandwidths" | "s2mm_throughputs" => OutputThroughputs,
            "packets" => Packets,
            "input_stalls" | "mm2s_stalls" => InputStalls,
            "output_stalls" | "s2mm_stalls" => OutputStalls,
            _ => return None,
        })
    }

    pub fn name(self) -> &'static str {
        use InterfaceSet::*;
        match self {
            InputThroughputs => "input_throughputs",
            OutputThroughputs => "output_throughputs",
            Packets => "packets",
            InputStalls => "input_stalls",
            OutputStalls => "output_stalls",
        }
    }
}

/// Mem tile metric sets.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MemTileSet {
    InputChannels,
    InputChannelsDetails,
    OutputChannels,
    OutputChannelsDetails,
    MemoryStats,
    MemTrace,
    InputThroughputs,
    OutputThroughputs,
    ConflictStats1,
    ConflictStats2,
    ConflictStats3,
    ConflictStats4,
}

impl MemTileSet {
    pub fn from_wire(id: u8) -> Option<Self> {
        use MemTileSet::*;
        Some(match id {
            0 => InputChannels,
            1 => InputChannelsDetails,
            2 => OutputChannels,
            3 => OutputChannelsDetails,
            4 => MemoryStats,
            5 => MemTrace,
            6 => InputThroughputs,
            7 => OutputThroughputs,
            8 => ConflictStats1,
            9 => ConflictStats2,
            10 => ConflictStats3,
            11 => ConflictStats4,
            _ => return None,
        })
    }

    pub fn to_wire(self) -> u8 {
        use MemTileSet::*;
        match self {
            InputChannels => 0,
            InputChannelsDetails => 1,
            OutputChannels => 2,
            OutputChannelsDetails => 3,
            MemoryStats => 4,
            MemTrace => 5,
            InputThroughputs => 6,
            OutputThroughputs => 7,
            ConflictStats1 => 8,
            ConflictStats2 => 9,
            ConflictStats3 => 10,
            ConflictStats4 => 11,
        }
    }

    pub fn from_name(name: &str) -> Option<Self> {
        use MemTileSet::*;
        Some(match name {
            "input_channels" | "s2mm_channels" => InputChannels,
            "input_channels_details" | "s2mm_channels_details" => InputChannelsDetails,
            "output_channels" | "mm2s_channels" => OutputChannels,
            "output_channels_details" | "mm2s_channels_details" => OutputChannelsDetails,
            "memory_stats" => MemoryStats,
            "mem_trace" => MemTrace,
            "input_throughputs" | "s2mm_throughputs" => InputThroughputs,
            "output_throughputs" | "mm2s_throughputs" => OutputThroughputs,
            "conflict_stats1" => ConflictStats1,
            "conflict_stats2" => ConflictStats2,
            "conflict_stats3" => ConflictStats3,
            "conflict_stats4" => ConflictStats4,
            _ => return None,
        })
    }

    pub fn name(self) -> &'static str {
        use MemTileSet::*;
        match self {
            InputChannels => "input_channels",
            InputChannelsDetails => "input_channels_details",
            OutputChannels => "output_channels",
            OutputChannelsDetails => "output_channels_details",
            MemoryStats => "memory_stats",
            MemTrace => "mem_trace",
            InputThroughputs => "input_throughputs",
            OutputThroughputs => "output_throughputs",
            ConflictStats1 => "conflict_stats1",
            ConflictStats2 => "conflict_stats2",
            ConflictStats3 => "conflict_stats3",
            ConflictStats4 => "conflict_stats4",
        }
    }

    /// S2MM-facing sets select input channels on the event selection
    /// registers; everything else watches MM2S.
    pub fn is_input(self) -> bool {
        matches!(
            self,
            MemTileSet::InputChannels
                | MemTileSet::InputChannelsDetails
                | MemTileSet::InputThroughputs
        )
    }
}

/// A metric set paired with the module class it applies to.
///
/// The wire format carries a bare id whose meaning depends on the tile's
/// classification; this enum is the decoded form.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MetricSet {
    Core(CoreSet),
    Memory(MemorySet),
    Interface(InterfaceSet),
    MemTile(MemTileSet),
}

impl MetricSet {
    /// Decode a wire metric-set id in the context of a module class.
    pub fn decode(kind: ModuleKind, id: u8) -> Option<Self> {
        match kind {
            ModuleKind::Core => CoreSet::from_wire(id).map(MetricSet::Core),
            ModuleKind::Dma => MemorySet::from_wire(id).map(MetricSet::Memory),
            ModuleKind::Shim => InterfaceSet::from_wire(id).map(MetricSet::Interface),
            ModuleKind::MemTile => MemTileSet::from_wire(id).map(MetricSet::MemTile),
        }
    }

    pub fn to_wire(self) -> u8 {
        match self {
            MetricSet::Core(s) => s.to_wire(),
            MetricSet::Memory(s) => s.to_wire(),
            MetricSet::Interface(s) => s.to_wire(),
            MetricSet::MemTile(s) => s.to_wire(),
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            MetricSet::Core(s) => s.name(),
            MetricSet::Memory(s) => s.name(),
            MetricSet::Interface(s) => s.name(),
            MetricSet::MemTile(s) => s.name(),
        }
    }

    /// Module class this set belongs to.
    pub fn kind(self) -> ModuleKind {
        match self {
            MetricSet::Core(_) => ModuleKind::Core,
            MetricSet::Memory(_) => ModuleKind::Dma,
            MetricSet::Interface(_) => ModuleKind::Shim,
            MetricSet::MemTile(_) => ModuleKind::MemTile,
        }
    }
}

impl fmt::Display for MetricSet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.kind().name(), self.name())
    }
}
