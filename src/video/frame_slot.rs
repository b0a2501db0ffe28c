//! Frame slot
//!
//! Holds the most recently decoded frame. Exactly one pixel buffer is alive at
//! a time: installing a frame releases the previous buffer.

use crate::source::{FrameData, SourceError};

/// Borrowed view of the frame in the slot
///
/// Only valid for the duration of the notification that receives it; copy
/// the pixels to keep them.
#[derive(Debug, Clone, Copy)]
pub struct FrameRef<'a> {
    /// 1-based frame index
    pub index: u64,
    /// Packed pixel data
    pub data: &'a [u8],
}

impl FrameRef<'_> {
    pub fn len(&self) -> usize {
        self.data.len()
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }
}

/// Single-buffer store for the latest decoded frame
#[derive(Debug, Default)]
pub struct FrameSlot {
    buffer: Option<Vec<u8>>,
    index: u64,
}

impl FrameSlot {
    pub fn new() -> Self {
        Self::default()
    }

    /// Copy `frame` into a fresh buffer and make it the current frame
    ///
    /// Row padding is dropped and planes are laid out back to back. On failure
    /// the slot keeps its previous frame.
    pub fn install(&mut self, frame: &FrameData<'_>, index: u64) -> Result<(), SourceError> {
        let len = frame.packed_len();
        let mut pixels = Vec::new();
        pixels
            .try_reserve_exact(len)
            .map_err(|_| SourceError::Allocation(len))?;

        for plane in &frame.planes {
            // If stride matches the row size, copy the plane directly
            if plane.stride == plane.row_bytes {
                pixels.extend_from_slice(&plane.data[..plane.packed_len()]);
            } else {
                // Need to remove padding
                for y in 0..plane.rows {
                    let row_start = y * plane.stride;
                    pixels.extend_from_slice(&plane.data[row_start..row_start + plane.row_bytes]);
                }
            }
        }

        // Old buffer is dropped here
        self.buffer = Some(pixels);
        self.index = index;
        Ok(())
    }

    /// Current frame, if one has been decoded
    pub fn frame(&self) -> Option<FrameRef<'_>> {
        self.buffer.as_deref().map(|data| FrameRef {
            index: self.index,
            data,
        })
    }

}
