//! Binary wire formats exchanged with the host-side post-processing
//! tool.
//!
//! Every block is a fixed header followed by a trailing element array
//! whose first element is already counted inside the header, so the
//! allocation size is `size_of::<Header>() + size_of::<Element>() *
//! (count - 1)`. Encoders check the destination capacity up front and
//! write nothing when it falls short.

pub mod messages;
pub mod profile;
pub mod trace;

pub use messages::{read_message_block, write_message_block, MESSAGE_BLOCK_SIZE};
pub use profile::{
    decode_profile_input, decode_profile_output, encode_configure_output, encode_poll_output,
    encode_profile_input, profile_input_size, profile_output_size, ProfileRequest, RawCounterInfo,
    RawProfileInput, RawProfileOutput, RawProfileTile,
};
pub use trace::{
    decode_trace_input, decode_trace_output, encode_trace_input, encode_trace_output,
    trace_input_size, trace_output_size, RawTileData, RawTraceInput, RawTraceOutput, RawTraceTile,
    TraceOutput, TraceRequest,
};

use thiserror::Error;

/// Wire codec error.
#[derive(Debug, Error)]
pub enum WireError {
    /// Buffer smaller than the block requires.
    #[error("Buffer holds {got} bytes, need {need}")]
    Truncated { need: usize, got: usize },
    /// Request names zero tiles.
    #[error("Configuration carries no tiles")]
    EmptyConfiguration,
}

/// Total byte size of a block holding `count` trailing elements.
pub const fn wire_size(header: usize, element: usize, count: usize) -> usize {
    header + element * count.saturating_sub(1)
}

pub(crate) fn check_capacity(out: &[u8], need: usize) -> Result<(), WireError> {
    if out.len() < need {
        return Err(WireError::Truncated { need, got: out.len() });
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_wire_size_counts_first_element_in_header() {
        assert_eq!(wire_size(32, 24, 1), 32);
        assert_eq!(wire_size(32, 24, 3), 80);
        assert_eq!(wire_size(48, 40, 0), 48);
    }

    #[test]
    fn test_check_capacity_reports_shortfall() {
        let buf = [0u8; 16];
        assert!(check_capacity(&buf, 16).is_ok());
        let err = check_capacity(&buf, 24).unwrap_err();
        assert!(matches!(err, WireError::Truncated { need: 24, got: 16 }));
    }
}
