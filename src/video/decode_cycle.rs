//! Decode cycle
//!
//! Drives a [`MediaSource`] through read -> decode -> flush, producing at most
//! one new frame per call. The whole [`Decoder`] is handed to the decode
//! worker for each cycle and handed back afterwards, so the frame slot only
//! ever has one owner.

use tracing::{debug, trace, warn};

use crate::source::{Decoded, MediaSource, PendingPacket, SourceError};

use super::frame_slot::{FrameRef, FrameSlot};

/// What one decode cycle achieved
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CycleOutcome {
    /// A new frame is in the slot
    FrameReady,
    /// No packets left and the decoder is drained
    EndOfStream,
    /// Decoding failed, see [`Decoder::take_error`]
    Failed,
}

/// Decode context: source, pending packet, frame slot and counters
pub struct Decoder<S: MediaSource> {
    source: S,
    /// Packet being consumed across decode calls
    pending: Option<S::Packet>,
    slot: FrameSlot,
    /// Frames produced so far (position of the stream, in frames)
    produced: u64,
    finished: bool,
    error: Option<SourceError>,
}

impl<S: MediaSource> Decoder<S> {
    pub fn new(source: S) -> Self {
        Self {
            source,
            pending: None,
            slot: FrameSlot::new(),
            produced: 0,
            finished: false,
            error: None,
        }
    }

    /// Run one decode cycle
    pub fn run_cycle(&mut self) -> CycleOutcome {
        // Drained decoders stay drained until a seek
        if self.finished {
            return CycleOutcome::EndOfStream;
        }

        let video_stream = self.source.video_stream_index();

        loop {
            // Read new packet if empty
            if self.pending.is_none() {
                match self.source.next_packet() {
                    Some(packet) => self.pending = Some(packet),
                    None => break,
                }
            }
            let Some(packet) = self.pending.as_mut() else {
                break;
            };

            // Skip packets of other streams
            if packet.stream_index() != video_stream {
                trace!("Discarding packet of stream {}", packet.stream_index());
                self.pending = None;
                continue;
            }

            loop {
                let installed = match self.source.decode(Some(&mut *packet)) {
                    Ok(Decoded::Frame(frame)) => Some(self.slot.install(&frame, self.produced + 1)),
                    Ok(Decoded::NeedsMorePackets) => None,
                    Err(e) => Some(Err(e)),
                };
                match installed {
                    Some(Ok(())) => {
                        self.produced += 1;
                        if packet.is_exhausted() {
                            self.pending = None;
                        }
                        return CycleOutcome::FrameReady;
                    }
                    Some(Err(e)) => return self.fail(e),
                    None if packet.is_exhausted() => break,
                    None => {}
                }
            }
            self.pending = None;
        }

        // Flush cached frames
        let flushed = match self.source.decode(None) {
            Ok(Decoded::Frame(frame)) => Some(self.slot.install(&frame, self.produced + 1)),
            Ok(Decoded::NeedsMorePackets) => None,
            Err(e) => Some(Err(e)),
        };
        match flushed {
            Some(Ok(())) => {
                self.produced += 1;
                CycleOutcome::FrameReady
            }
            Some(Err(e)) => self.fail(e),
            None => {
                debug!("Decoder drained after {} frames", self.produced);
                self.finished = true;
                CycleOutcome::EndOfStream
            }
        }
    }

    fn fail(&mut self, error: SourceError) -> CycleOutcome {
        warn!("Decode cycle failed: {}", error);
        self.pending = None;
        self.error = Some(error);
        CycleOutcome::Failed
    }

    /// Reposition on the keyframe at or before `seconds`
    ///
    /// The produced-frame counter becomes `seconds * frame_rate`. Nothing
    /// changes when the source rejects the seek.
    pub fn seek(&mut self, seconds: f64, frame_rate: f64) -> Result<(), SourceError> {
        if !seconds.is_finite() || seconds < 0.0 {
            return Err(SourceError::Seek(format!("invalid timestamp {seconds}")));
        }
        self.source.seek(seconds)?;
        self.pending = None;
        self.produced = (seconds * frame_rate) as u64;
        self.finished = false;
        Ok(())
    }

    /// Frame currently in the slot
    pub fn frame(&self) -> Option<FrameRef<'_>> {
        self.slot.frame()
    }

    pub fn produced(&self) -> u64 {
        self.produced
    }

    /// Consume the error recorded by the last failed cycle
    pub fn take_error(&mut self) -> Option<SourceError> {
        self.error.take()
    }
}
