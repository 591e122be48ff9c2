//! Hardware resource bookkeeping.
//!
//! Counters, trace slots, broadcast channels and stream-switch monitor
//! ports are scarce per-module pools. The configurators only ever talk to
//! the [`ResourcePool`] trait; two implementations exist because the
//! hardware families manage reservations differently:
//!
//! - [`TrackedPool`] hands out specific slot ids and takes them back,
//!   mirroring the resource-manager path on AIE1/AIE2/AIE2PS devices.
//! - [`CountedPool`] keeps a plain used-count per pool. NPU3 moved slot
//!   assignment into the array microcontroller, so the host only knows
//!   how many it has consumed.
//!
//! Availability reflects reservations made earlier in the same pass, not
//! just hardware state at start, so repeated queries during one pass
//! decrease monotonically.

use crate::device::registers::perf_counter_count;
use crate::device::{ArchCaps, ModuleKind, TileLoc};
use std::collections::HashMap;

/// Kinds of per-module hardware resources.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ResourceKind {
    PerfCounter,
    TraceSlot,
    BroadcastChannel,
    StreamPort,
}

/// Pool capacity per module class.
pub fn capacity(kind: ModuleKind, rk: ResourceKind) -> usize {
    match rk {
        ResourceKind::PerfCounter => perf_counter_count(kind),
        ResourceKind::TraceSlot => 8,
        ResourceKind::BroadcastChannel => 16,
        ResourceKind::StreamPort => 8,
    }
}

type PoolKey = (TileLoc, ModuleKind, ResourceKind);

/// Availability oracle and allocator for one configuration session.
pub trait ResourcePool: std::fmt::Debug {
    /// Free resources of one kind at one module.
    fn available(&self, loc: TileLoc, kind: ModuleKind, rk: ResourceKind) -> usize;

    /// Reserve one resource, returning its slot id. `None` when the pool
    /// is exhausted.
    fn acquire(&mut self, loc: TileLoc, kind: ModuleKind, rk: ResourceKind) -> Option<u8>;

    /// Return one resource to the pool.
    fn release(&mut self, loc: TileLoc, kind: ModuleKind, rk: ResourceKind, id: u8);
}

/// Free-list pool: a bitmask of used slots per (tile, module, kind).
#[derive(Debug, Default)]
pub struct TrackedPool {
    used: HashMap<PoolKey, u16>,
}

impl TrackedPool {
    pub fn new() -> Self {
        Self::default()
    }
}

impl ResourcePool for TrackedPool {
    fn available(&self, loc: TileLoc, kind: ModuleKind, rk: ResourceKind) -> usize {
        let cap = capacity(kind, rk);
        let used = self.used.get(&(loc, kind, rk)).copied().unwrap_or(0);
        cap - used.count_ones() as usize
    }

    fn acquire(&mut self, loc: TileLoc, kind: ModuleKind, rk: ResourceKind) -> Option<u8> {
        let cap = capacity(kind, rk);
        let used = self.used.entry((loc, kind, rk)).or_insert(0);
        for id in 0..cap as u8 {
            if *used & (1 << id) == 0 {
                *used |= 1 << id;
                return Some(id);
            }
        }
        None
    }

    fn release(&mut self, loc: TileLoc, kind: ModuleKind, rk: ResourceKind, id: u8) {
        if let Some(used) = self.used.get_mut(&(loc, kind, rk)) {
            *used &= !(1 << id);
        }
    }
}

/// Counting pool: slot ids are handed out sequentially and not reusable
/// individually. Releases decrement the count; interleaving acquires and
/// releases may therefore recycle ids, which the microcontroller resolves
/// on its side.
#[derive(Debug, Default)]
pub struct CountedPool {
    used: HashMap<PoolKey, u8>,
}

impl CountedPool {
    pub fn new() -> Self {
        Self::default()
    }
}

impl ResourcePool for CountedPool {
    fn available(&self, loc: TileLoc, kind: ModuleKind, rk: ResourceKind) -> usize {
        let cap = capacity(kind, rk);
        let used = self.used.get(&(loc, kind, rk)).copied().unwrap_or(0) as usize;
        cap.saturating_sub(used)
    }

    fn acquire(&mut self, loc: TileLoc, kind: ModuleKind, rk: ResourceKind) -> Option<u8> {
        let cap = capacity(kind, rk) as u8;
        let used = self.used.entry((loc, kind, rk)).or_insert(0);
        if *used >= cap {
            return None;
        }
        let id = *used;
        *used += 1;
        Some(id)
    }

    fn release(&mut self, loc: TileLoc, kind: ModuleKind, rk: ResourceKind, _id: u8) {
        if let Some(used) = self.used.get_mut(&(loc, kind, rk)) {
            *used = used.saturating_sub(1);
        }
    }
}

/// Pool implementation matching how the hardware manages reservations.
pub fn pool_for(arch: &dyn ArchCaps) -> Box<dyn ResourcePool> {
    if arch.tracks_counter_slots() {
        Box::new(TrackedPool::new())
    } else {
        Box::new(CountedPool::new())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::device::{arch_for, AieGen};

    fn loc() -> TileLoc {
        TileLoc::new(1, 2)
    }

    #[test]
    fn test_tracked_pool_capacity() {
        let pool = TrackedPool::new();
        assert_eq!(pool.available(loc(), ModuleKind::Core, ResourceKind::PerfCounter), 4);
        assert_eq!(pool.available(loc(), ModuleKind::Dma, ResourceKind::PerfCounter), 2);
        assert_eq!(pool.available(loc(), ModuleKind::Core, ResourceKind::BroadcastChannel), 16);
        assert_eq!(pool.available(loc(), ModuleKind::Shim, ResourceKind::TraceSlot), 8);
    }

    #[test]
    fn test_tracked_acquire_release_roundtrip() {
        let mut pool = TrackedPool::new();
        let id0 = pool.acquire(loc(), ModuleKind::Core, ResourceKind::PerfCounter).unwrap();
        let id1 = pool.acquire(loc(), ModuleKind::Core, ResourceKind::PerfCounter).unwrap();
        assert_eq!((id0, id1), (0, 1));
        assert_eq!(pool.available(loc(), ModuleKind::Core, ResourceKind::PerfCounter), 2);

        pool.release(loc(), ModuleKind::Core, ResourceKind::PerfCounter, id0);
        assert_eq!(pool.available(loc(), ModuleKind::Core, ResourceKind::PerfCounter), 3);

        // Freed slot is handed out again
        assert_eq!(pool.acquire(loc(), ModuleKind::Core, ResourceKind::PerfCounter), Some(0));
    }

    #[test]
    fn test_tracked_exhaustion() {
        let mut pool = TrackedPool::new();
        for _ in 0..2 {
            pool.acquire(loc(), ModuleKind::Dma, ResourceKind::PerfCounter).unwrap();
        }
        assert_eq!(pool.acquire(loc(), ModuleKind::Dma, ResourceKind::PerfCounter), None);
        assert_eq!(pool.available(loc(), ModuleKind::Dma, ResourceKind::PerfCounter), 0);
    }

    #[test]
    fn test_availability_monotonic_within_pass() {
        let mut pool = TrackedPool::new();
        let mut last = pool.available(loc(), ModuleKind::Core, ResourceKind::PerfCounter);
        while pool.acquire(loc(), ModuleKind::Core, ResourceKind::PerfCounter).is_some() {
            let now = pool.available(loc(), ModuleKind::Core, ResourceKind::PerfCounter);
            assert!(now < last);
            last = now;
        }
        assert_eq!(last, 0);
    }

    #[test]
    fn test_pools_are_per_tile_and_module() {
        let mut pool = TrackedPool::new();
        pool.acquire(loc(), ModuleKind::Core, ResourceKind::PerfCounter).unwrap();
        assert_eq!(pool.available(TileLoc::new(3, 3), ModuleKind::Core, ResourceKind::PerfCounter), 4);
        assert_eq!(pool.available(loc(), ModuleKind::Dma, ResourceKind::PerfCounter), 2);
    }

    #[test]
    fn test_counted_pool_sequential_ids() {
        let mut pool = CountedPool::new();
        assert_eq!(pool.acquire(loc(), ModuleKind::MemTile, ResourceKind::PerfCounter), Some(0));
        assert_eq!(pool.acquire(loc(), ModuleKind::MemTile, ResourceKind::PerfCounter), Some(1));
        assert_eq!(pool.available(loc(), ModuleKind::MemTile, ResourceKind::PerfCounter), 2);

        pool.release(loc(), ModuleKind::MemTile, ResourceKind::PerfCounter, 1);
        pool.release(loc(), ModuleKind::MemTile, ResourceKind::PerfCounter, 0);
        assert_eq!(pool.available(loc(), ModuleKind::MemTile, ResourceKind::PerfCounter), 4);

        // Over-release saturates instead of wrapping
        pool.release(loc(), ModuleKind::MemTile, ResourceKind::PerfCounter, 0);
        assert_eq!(pool.available(loc(), ModuleKind::MemTile, ResourceKind::PerfCounter), 4);
    }

    #[test]
    fn test_pool_for_generation() {
        let mut tracked = pool_for(arch_for(AieGen::Aie2).as_ref());
        let mut counted = pool_for(arch_for(AieGen::Npu3).as_ref());
        // Both satisfy the same contract
        for pool in [&mut tracked, &mut counted] {
            let id = pool.acquire(loc(), ModuleKind::Core, ResourceKind::PerfCounter).unwrap();
            assert_eq!(id, 0);
            pool.release(loc(), ModuleKind::Core, ResourceKind::PerfCounter, id);
            assert_eq!(pool.available(loc(), ModuleKind::Core, ResourceKind::PerfCounter), 4);
        }
    }
}
