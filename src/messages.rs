//! Diagnostic message accumulation.
//!
//! Configuration runs in a context where free-text logging cannot cross
//! back to the caller, so outcomes are reported as fixed-size packets: a
//! message code plus four `u32` parameters. The caller decodes and logs
//! them after the configuration call returns. The list is bounded; pushes
//! past the cap are dropped without error.

use log::Level;

/// Upper bound on accumulated diagnostics per configuration call.
pub const MAX_MESSAGES: usize = 32;

/// Number of `u32` parameters carried by each message.
pub const MESSAGE_PARAMS: usize = 4;

// ============================================================================
// Message codes
// ============================================================================

/// Diagnostic message codes, stable across the wire boundary.
///
/// The parameter meaning depends on the code; see [`MessageEntry::render`]
/// for the decoded form of each.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum MessageCode {
    /// Not enough core performance counters. Params: available, required.
    NoCoreCounters = 0,
    /// Not enough core trace-event slots. Params: available, required.
    NoCoreTraceSlots = 1,
    /// Not enough core broadcast channels. Params: available, required.
    NoCoreBroadcastChannels = 2,
    /// Not enough memory performance counters. Params: available, required.
    NoMemoryCounters = 3,
    /// Not enough memory trace-event slots. Params: available, required.
    NoMemoryTraceSlots = 4,
    /// Tile lacks free resources for trace; its configuration was aborted.
    NoResources = 5,
    /// Counter reservation failed. Params: core count, memory count, col, row.
    CountersNotReserved = 6,
    /// Core trace control reservation failed. Params: col, row.
    CoreTraceNotReserved = 7,
    /// Core trace events reserved. Params: count, col, row.
    CoreTraceEventsReserved = 8,
    /// Memory trace control reservation failed. Params: col, row.
    MemoryTraceNotReserved = 9,
    /// Memory trace events reserved. Params: count, col, row.
    MemoryTraceEventsReserved = 10,
    /// Tile fully reserved. Params: core count, memory count, col, row.
    AllTraceEventsReserved = 11,
    /// Trace flush events were installed on this device.
    TraceFlushEnabled = 12,
}

impl MessageCode {
    pub fn from_wire(code: u8) -> Option<Self> {
        Some(match code {
            0 => Self::NoCoreCounters,
            1 => Self::NoCoreTraceSlots,
            2 => Self::NoCoreBroadcastChannels,
            3 => Self::NoMemoryCounters,
            4 => Self::NoMemoryTraceSlots,
            5 => Self::NoResources,
            6 => Self::CountersNotReserved,
            7 => Self::CoreTraceNotReserved,
            8 => Self::CoreTraceEventsReserved,
            9 => Self::MemoryTraceNotReserved,
            10 => Self::MemoryTraceEventsReserved,
            11 => Self::AllTraceEventsReserved,
            12 => Self::TraceFlushEnabled,
            _ => return None,
        })
    }

    pub fn to_wire(self) -> u8 {
        self as u8
    }

    /// Log level the decoded message should be emitted at.
    pub fn severity(self) -> Level {
        match self {
            Self::NoCoreCounters
            | Self::NoCoreTraceSlots
            | Self::NoCoreBroadcastChannels
            | Self::NoMemoryCounters
            | Self::NoMemoryTraceSlots
            | Self::TraceFlushEnabled => Level::Info,
            Self::NoResources
            | Self::CountersNotReserved
            | Self::CoreTraceNotReserved
            | Self::MemoryTraceNotReserved => Level::Warn,
            Self::CoreTraceEventsReserved
            | Self::MemoryTraceEventsReserved
            | Self::AllTraceEventsReserved => Level::Debug,
        }
    }
}

// ============================================================================
// Entries and the bounded log
// ============================================================================

/// One accumulated diagnostic.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MessageEntry {
    pub code: MessageCode,
    pub params: [u32; MESSAGE_PARAMS],
}

impl MessageEntry {
    /// Decode the packet into human-readable text.
    pub fn render(&self) -> String {
        let p = &self.params;
        match self.code {
            MessageCode::NoCoreCounters => format!(
                "core performance counters for trace: {} available, {} required",
                p[0], p[1]
            ),
            MessageCode::NoCoreTraceSlots => format!(
                "core trace slots: {} available, {} required",
                p[0], p[1]
            ),
            MessageCode::NoCoreBroadcastChannels => format!(
                "core broadcast channels: {} available, {} required",
                p[0], p[1]
            ),
            MessageCode::NoMemoryCounters => format!(
                "memory performance counters for trace: {} available, {} required",
                p[0], p[1]
            ),
            MessageCode::NoMemoryTraceSlots => format!(
                "memory trace slots: {} available, {} required",
                p[0], p[1]
            ),
            MessageCode::NoResources => {
                "tile lacks free resources for trace, aborting its configuration".to_string()
            }
            MessageCode::CountersNotReserved => format!(
                "unable to reserve {} core and {} memory counters for tile ({},{})",
                p[0], p[1], p[2], p[3]
            ),
            MessageCode::CoreTraceNotReserved => {
                format!("unable to reserve core trace control for tile ({},{})", p[0], p[1])
            }
            MessageCode::CoreTraceEventsReserved => {
                format!("reserved {} core trace events for tile ({},{})", p[0], p[1], p[2])
            }
            MessageCode::MemoryTraceNotReserved => {
                format!("unable to reserve memory trace control for tile ({},{})", p[0], p[1])
            }
            MessageCode::MemoryTraceEventsReserved => {
                format!("reserved {} memory trace events for tile ({},{})", p[0], p[1], p[2])
            }
            MessageCode::AllTraceEventsReserved => format!(
                "reserved {} core and {} memory trace events for tile ({},{})",
                p[0], p[1], p[2], p[3]
            ),
            MessageCode::TraceFlushEnabled => "trace flush enabled".to_string(),
        }
    }
}

/// Bounded diagnostic accumulator.
///
/// Holds at most [`MAX_MESSAGES`] entries; once full, further pushes are
/// discarded so a misbehaving configuration cannot grow the output buffer.
#[derive(Debug, Default)]
pub struct MessageLog {
    entries: Vec<MessageEntry>,
}

impl MessageLog {
    pub fn new() -> Self {
        Self { entries: Vec::new() }
    }

    /// Record a diagnostic. Silently dropped once the log is full.
    pub fn push(&mut self, code: MessageCode, params: [u32; MESSAGE_PARAMS]) {
        if self.entries.len() < MAX_MESSAGES {
            self.entries.push(MessageEntry { code, params });
        }
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn entries(&self) -> &[MessageEntry] {
        &self.entries
    }

    pub fn contains(&self, code: MessageCode) -> bool {
        self.entries.iter().any(|e| e.code == code)
    }

    /// Emit every accumulated entry through the logger at its mapped level.
    pub fn emit(&self) {
        for entry in &self.entries {
            log::log!(entry.code.severity(), "{}", entry.render());
        }
    }
}
