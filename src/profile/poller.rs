//! Counter readback.
//!
//! Polling is a read-only pass over the configured counter list. Values
//! come from the live reservation handles when the counters were set up
//! at runtime; designs whose counters were baked in by the compiler
//! carry no handles and are read straight from the record's tile and
//! counter number instead.

use crate::device::access::{AccessError, RegisterIo};
use crate::device::registers::{self, TileAddress};
use crate::device::{HwModule, ModuleKind};
use crate::profile::configurator::{ConfiguredCounters, CounterRecord};
use std::time::{SystemTime, UNIX_EPOCH};

/// One counter reading paired with its configuration record.
#[derive(Debug, Clone, Copy)]
pub struct CounterSample {
    pub record: CounterRecord,
    pub counter_value: u32,
    pub timer_value: u64,
}

/// All samples from one poll call, stamped with a single host clock
/// read so the whole batch shares a timestamp.
#[derive(Debug, Default)]
pub struct PollBatch {
    pub timestamp_ms: u64,
    pub samples: Vec<CounterSample>,
}

/// Read every configured counter once.
///
/// Records are already in tile order, so the 64-bit tile timer is read
/// when the (column, row) pair changes and reused for the counters that
/// follow on the same tile.
pub fn poll_counters(
    io: &mut dyn RegisterIo,
    configured: &ConfiguredCounters,
    row_offset: u8,
) -> Result<PollBatch, AccessError> {
    let paired = !configured.counters.is_empty()
        && configured.counters.len() == configured.records.len();

    let mut batch = PollBatch { timestamp_ms: epoch_millis(), samples: Vec::new() };
    let mut prev: Option<(u8, u8)> = None;
    let mut timer_value = 0u64;

    for (i, record) in configured.records.iter().enumerate() {
        let (kind, counter) = if paired {
            let handle = configured.counters[i];
            (handle.kind, handle.counter)
        } else {
            let kind = ModuleKind::from_wire_index(record.module).unwrap_or(ModuleKind::Core);
            (kind, record.counter_num)
        };

        let reg = registers::perf_counter_reg(kind, counter);
        let counter_value = io.read(TileAddress::new(record.col, record.row, reg))?;

        if prev != Some((record.col, record.row)) {
            prev = Some((record.col, record.row));
            let timer_kind = ModuleKind::classify(record.row, row_offset, HwModule::Core);
            timer_value = read_timer(io, record.col, record.row, timer_kind)?;
        }

        batch.samples.push(CounterSample { record: *record, counter_value, timer_value });
    }
    Ok(batch)
}

/// 64-bit timer read. The low word can wrap between the two halves, so
/// the high word is re-read until it comes back unchanged.
fn read_timer(
    io: &mut dyn RegisterIo,
    col: u8,
    row: u8,
    kind: ModuleKind,
) -> Result<u64, AccessError> {
    let high_reg = registers::timer_high_reg(kind);
    let low_reg = registers::timer_low_reg(kind);

    let mut high = io.read(TileAddress::new(col, row, high_reg))?;
    let mut low = io.read(TileAddress::new(col, row, low_reg))?;
    loop {
        let again = io.read(TileAddress::new(col, row, high_reg))?;
        if again == high {
            break;
        }
        high = again;
        low = io.read(TileAddress::new(col, row, low_reg))?;
    }
    Ok((high as u64) << 32 | low as u64)
}

fn epoch_millis() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map_or(0, |d| d.as_millis() as u64)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::device::access::RegisterModel;
    use crate::device::TileLoc;
    use crate::profile::configurator::CounterHandle;
    use std::collections::HashMap;

    /// Forwards to a [`RegisterModel`] while counting reads per address.
    #[derive(Debug, Default)]
    struct ReadCountingIo {
        model: RegisterModel,
        reads: HashMap<u32, u32>,
    }

    impl RegisterIo for ReadCountingIo {
        fn read(&mut self, addr: TileAddress) -> Result<u32, AccessError> {
            *self.reads.entry(addr.encode()).or_insert(0) += 1;
            self.model.read(addr)
        }

        fn write(&mut self, addr: TileAddress, value: u32) -> Result<(), AccessError> {
            self.model.write(addr, value)
        }
    }

    fn record(col: u8, row: u8, counter_num: u8, module: u8) -> CounterRecord {
        CounterRecord {
            counter_id: 0,
            col,
            row,
            counter_num,
            start_event: 28,
            end_event: 28,
            reset_event: 0,
            payload: 0,
            module,
        }
    }

    fn handle(col: u8, row: u8, kind: ModuleKind, counter: u8) -> CounterHandle {
        CounterHandle { loc: TileLoc::new(col, row), kind, counter }
    }

    #[test]
    fn test_poll_reads_values_and_shares_tile_timer() {
        let mut io = ReadCountingIo::default();
        let mut configured = ConfiguredCounters::default();
        configured.records = vec![
            record(0, 2, 0, 0),
            record(0, 2, 1, 0),
            record(1, 2, 0, 0),
        ];
        configured.counters = vec![
            handle(0, 2, ModuleKind::Core, 0),
            handle(0, 2, ModuleKind::Core, 1),
            handle(1, 2, ModuleKind::Core, 0),
        ];

        io.model.poke(TileAddress::new(0, 2, registers::perf_counter_reg(ModuleKind::Core, 0)), 111);
        io.model.poke(TileAddress::new(0, 2, registers::perf_counter_reg(ModuleKind::Core, 1)), 222);
        io.model.poke(TileAddress::new(1, 2, registers::perf_counter_reg(ModuleKind::Core, 0)), 333);
        io.model.poke(TileAddress::new(0, 2, registers::timer_low_reg(ModuleKind::Core)), 0x40);
        io.model.poke(TileAddress::new(1, 2, registers::timer_low_reg(ModuleKind::Core)), 0x50);
        io.model.poke(TileAddress::new(1, 2, registers::timer_high_reg(ModuleKind::Core)), 1);

        let batch = poll_counters(&mut io, &configured, 2).unwrap();
        assert_eq!(batch.samples.len(), 3);
        let values: Vec<u32> = batch.samples.iter().map(|s| s.counter_value).collect();
        assert_eq!(values, vec![111, 222, 333]);
        assert_eq!(batch.samples[0].timer_value, 0x40);
        assert_eq!(batch.samples[1].timer_value, 0x40);
        assert_eq!(batch.samples[2].timer_value, (1u64 << 32) | 0x50);
        assert!(batch.timestamp_ms > 0);

        // One timer read per distinct tile, not per counter.
        let low0 = TileAddress::new(0, 2, registers::timer_low_reg(ModuleKind::Core)).encode();
        assert_eq!(io.reads.get(&low0), Some(&1));
    }

    #[test]
    fn test_poll_without_handles_uses_record_module() {
        let mut io = RegisterModel::new();
        let mut configured = ConfiguredCounters::default();
        // Memory-module counter pre-configured by the compiler.
        configured.records = vec![record(3, 4, 1, 1)];

        io.poke(TileAddress::new(3, 4, registers::perf_counter_reg(ModuleKind::Dma, 1)), 77);
        // The core-module counter at the same index stays untouched, so
        // a wrong bank read would come back 0.
        let batch = poll_counters(&mut io, &configured, 2).unwrap();
        assert_eq!(batch.samples.len(), 1);
        assert_eq!(batch.samples[0].counter_value, 77);
    }

    #[test]
    fn test_poll_empty_configuration() {
        let mut io = RegisterModel::new();
        let configured = ConfiguredCounters::default();
        let batch = poll_counters(&mut io, &configured, 2).unwrap();
        assert!(batch.samples.is_empty());
    }

    #[test]
    fn test_shim_timer_read_from_pl_module() {
        let mut io = RegisterModel::new();
        let mut configured = ConfiguredCounters::default();
        configured.records = vec![record(0, 0, 0, 2)];

        io.poke(TileAddress::new(0, 0, registers::timer_low_reg(ModuleKind::Shim)), 9);
        let batch = poll_counters(&mut io, &configured, 2).unwrap();
        assert_eq!(batch.samples[0].timer_value, 9);
    }
}
