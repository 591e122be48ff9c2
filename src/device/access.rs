//! Register access backends.
//!
//! [`RegisterIo`] is the seam between the configuration engine and a
//! device. The in-memory [`RegisterModel`] backs tests and the demo
//! driver; a real deployment would implement the trait over the kernel
//! driver's read/write ioctls.

use super::registers::TileAddress;
use std::collections::HashMap;
use thiserror::Error;

/// Register access error.
#[derive(Debug, Error)]
pub enum AccessError {
    /// Backend rejected the access.
    #[error("Register access fault at {0}")]
    Fault(TileAddress),
}

/// 32-bit register read/write access to the tile array.
pub trait RegisterIo {
    fn read(&mut self, addr: TileAddress) -> Result<u32, AccessError>;

    fn write(&mut self, addr: TileAddress, value: u32) -> Result<(), AccessError>;

    /// Read-modify-write of the bits selected by `mask`.
    fn mask_write(&mut self, addr: TileAddress, mask: u32, value: u32) -> Result<(), AccessError> {
        let old = self.read(addr)?;
        self.write(addr, (old & !mask) | (value & mask))
    }
}

/// Sparse in-memory register file covering the whole tile array.
///
/// Registers hold 0 until written, matching hardware reset state for
/// every register the profiling engine touches. Keys are encoded tile
/// addresses, so one map covers all tiles.
#[derive(Debug, Default)]
pub struct RegisterModel {
    registers: HashMap<u32, u32>,
}

impl RegisterModel {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of registers that have been written at least once.
    pub fn written_count(&self) -> usize {
        self.registers.len()
    }

    /// Direct read without the trait's `&mut` requirement, for test
    /// assertions.
    pub fn peek(&self, addr: TileAddress) -> u32 {
        self.registers.get(&addr.encode()).copied().unwrap_or(0)
    }

    /// Preload a register value, e.g. a counter or BD state a test or
    /// demo wants the engine to observe.
    pub fn poke(&mut self, addr: TileAddress, value: u32) {
        self.registers.insert(addr.encode(), value);
    }
}

impl RegisterIo for RegisterModel {
    fn read(&mut self, addr: TileAddress) -> Result<u32, AccessError> {
        Ok(self.registers.get(&addr.encode()).copied().unwrap_or(0))
    }

    fn write(&mut self, addr: TileAddress, value: u32) -> Result<(), AccessError> {
        self.registers.insert(addr.encode(), value);
        Ok(())
    }
}

/// Backend wrapper that fails every write after a budget is exhausted.
///
/// Exercises the configuration error paths: partial-failure handling in
/// the counter plan and rollback in the trace state machine.
#[derive(Debug)]
pub struct FaultingIo<T> {
    inner: T,
    writes_left: u32,
}

impl<T> FaultingIo<T> {
    pub fn new(inner: T, allowed_writes: u32) -> Self {
        Self { inner, writes_left: allowed_writes }
    }

    pub fn into_inner(self) -> T {
        self.inner
    }

    pub fn inner(&self) -> &T {
        &self.inner
    }
}

impl<T: RegisterIo> RegisterIo for FaultingIo<T> {
    fn read(&mut self, addr: TileAddress) -> Result<u32, AccessError> {
        self.inner.read(addr)
    }

    fn write(&mut self, addr: TileAddress, value: u32) -> Result<(), AccessError> {
        if self.writes_left == 0 {
            return Err(AccessError::Fault(addr));
        }
        self.writes_left -= 1;
        self.inner.write(addr, value)
    }
}
