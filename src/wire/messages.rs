//! Diagnostic message block.
//!
//! Fixed-size block, no trailing array: the packet list is bounded at
//! [`MAX_MESSAGES`] on both ends of the wire.

use crate::messages::{MessageCode, MessageEntry, MessageLog, MAX_MESSAGES, MESSAGE_PARAMS};
use crate::wire::{check_capacity, WireError};
use log::warn;
use zerocopy::{FromBytes, FromZeros, Immutable, IntoBytes, KnownLayout};

/// One diagnostic packet (20 bytes)
#[derive(Debug, Clone, Copy, FromBytes, IntoBytes, KnownLayout, Immutable)]
#[repr(C)]
pub struct RawMessagePacket {
    pub message_code: u8,
    pub padding: [u8; 3],
    pub params: [u32; MESSAGE_PARAMS],
}

/// Message block header plus the full packet array (644 bytes)
#[derive(Debug, Clone, Copy, FromBytes, IntoBytes, KnownLayout, Immutable)]
#[repr(C)]
pub struct RawMessageBlock {
    pub num_messages: u32,
    pub packets: [RawMessagePacket; MAX_MESSAGES],
}

/// Byte size of the message block, fixed regardless of how many
/// packets are populated.
pub const MESSAGE_BLOCK_SIZE: usize = std::mem::size_of::<RawMessageBlock>();

/// Serialize the accumulated diagnostics into `out`.
pub fn write_message_block(log: &MessageLog, out: &mut [u8]) -> Result<usize, WireError> {
    check_capacity(out, MESSAGE_BLOCK_SIZE)?;

    let mut block = RawMessageBlock::new_zeroed();
    block.num_messages = log.len() as u32;
    for (packet, entry) in block.packets.iter_mut().zip(log.entries()) {
        packet.message_code = entry.code.to_wire();
        packet.params = entry.params;
    }
    out[..MESSAGE_BLOCK_SIZE].copy_from_slice(block.as_bytes());
    Ok(MESSAGE_BLOCK_SIZE)
}

/// Decode a message block. Packets with an unknown code are dropped,
/// the rest come back in wire order.
pub fn read_message_block(bytes: &[u8]) -> Result<Vec<MessageEntry>, WireError> {
    let (block, _) = RawMessageBlock::read_from_prefix(bytes)
        .map_err(|_| WireError::Truncated { need: MESSAGE_BLOCK_SIZE, got: bytes.len() })?;

    let count = (block.num_messages as usize).min(MAX_MESSAGES);
    let mut entries = Vec::with_capacity(count);
    for packet in &block.packets[..count] {
        let Some(code) = MessageCode::from_wire(packet.message_code) else {
            warn!("dropping message with unknown code {}", packet.message_code);
            continue;
        };
        entries.push(MessageEntry { code, params: packet.params });
    }
    Ok(entries)
}
