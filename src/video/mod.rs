//! Video module
//!
//! Decode cycle and the frame slot it fills.
//!
//! # Usage
//!
//! ```rust,ignore
//! use video::{CycleOutcome, Decoder};
//!
//! let mut decoder = Decoder::new(source);
//! while decoder.run_cycle() == CycleOutcome::FrameReady {
//!     let frame = decoder.frame().unwrap();
//!     // Use the frame
//! }
//! ```

mod decode_cycle;
mod frame_slot;

pub use decode_cycle::{CycleOutcome, Decoder};
pub use frame_slot::{FrameRef, FrameSlot};
