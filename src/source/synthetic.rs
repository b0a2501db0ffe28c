//! Synthetic media source
//!
//! Generates a deterministic yuv420p stream in memory. Every luma byte of
//! stream frame `n` is `n % 251`, so a consumer can tell which frame it got.
//! Knobs cover the decoder behaviours the decode cycle has to cope with:
//! reordering delay, packets consumed over several calls, foreign-stream
//! packets, slow decodes and corrupt packets.

use std::collections::VecDeque;
use std::path::Path;
use std::time::Duration;

use tracing::debug;

use super::{Decoded, FrameData, MediaSource, Metadata, Opener, PendingPacket, PixelFormat, Plane, SourceError};

const VIDEO_STREAM: usize = 0;
const AUDIO_STREAM: usize = 1;
const PADDING_BYTE: u8 = 0xEE;

/// Shape of a synthetic stream
#[derive(Debug, Clone)]
pub struct SyntheticSpec {
    pub width: u32,
    pub height: u32,
    pub frame_count: u64,
    pub frame_rate: f64,
    /// Distance between keyframes, in frames
    pub keyframe_interval: u64,
    /// Frames held inside the decoder before the first one comes out
    pub reorder_delay: usize,
    /// Decode calls needed to consume one packet
    pub chunks_per_packet: usize,
    /// Emit a packet on a second (non-video) stream after this many video packets
    pub audio_every: Option<u64>,
    /// Time spent producing each frame
    pub decode_latency: Duration,
    /// Extra decode time for one stream frame
    pub stall: Option<(u64, Duration)>,
    /// Time spent discovering that no packets are left
    pub end_latency: Duration,
    /// Stream frame whose packet fails to decode
    pub corrupt_frame: Option<u64>,
    /// Alignment bytes appended to every row
    pub row_padding: usize,
}

impl Default for SyntheticSpec {
    fn default() -> Self {
        Self {
            width: 64,
            height: 36,
            frame_count: 300,
            frame_rate: 30.0,
            keyframe_interval: 10,
            reorder_delay: 2,
            chunks_per_packet: 2,
            audio_every: Some(3),
            decode_latency: Duration::ZERO,
            stall: None,
            end_latency: Duration::ZERO,
            corrupt_frame: None,
            row_padding: 16,
        }
    }
}

impl SyntheticSpec {
    /// Packed size of one frame
    pub fn frame_len(&self) -> usize {
        let (w, h) = (self.width as usize, self.height as usize);
        w * h + 2 * (w / 2) * (h / 2)
    }

    /// Opener that ignores the path and always yields this stream
    pub fn opener(self) -> Opener<SyntheticSource> {
        Box::new(move |path: &Path| {
            debug!("Opening synthetic stream for {}", path.display());
            Ok(SyntheticSource::new(self.clone()))
        })
    }
}

/// Packet produced by [`SyntheticSource`]
#[derive(Debug)]
pub struct SyntheticPacket {
    stream_index: usize,
    frame: u64,
    remaining_chunks: usize,
    drained: bool,
}

impl SyntheticPacket {
    /// Stream frame carried by this packet
    pub fn frame(&self) -> u64 {
        self.frame
    }
}

impl PendingPacket for SyntheticPacket {
    fn stream_index(&self) -> usize {
        self.stream_index
    }

    fn is_exhausted(&self) -> bool {
        self.remaining_chunks == 0 && self.drained
    }
}

/// In-memory source following a [`SyntheticSpec`]
pub struct SyntheticSource {
    spec: SyntheticSpec,
    metadata: Metadata,
    next_frame: u64,
    video_since_audio: u64,
    /// Frames fully received but not yet output
    reorder: VecDeque<u64>,
    y: Vec<u8>,
    u: Vec<u8>,
    v: Vec<u8>,
}

impl SyntheticSource {
    pub fn new(spec: SyntheticSpec) -> Self {
        let metadata = Metadata {
            width: spec.width,
            height: spec.height,
            num_frames: spec.frame_count as i64,
            frame_rate: spec.frame_rate,
            duration: spec.frame_count as f64 / spec.frame_rate,
            pixel_format: PixelFormat::Yuv420p,
        };
        Self {
            spec,
            metadata,
            next_frame: 0,
            video_since_audio: 0,
            reorder: VecDeque::new(),
            y: Vec::new(),
            u: Vec::new(),
            v: Vec::new(),
        }
    }

    fn render(&mut self, frame: u64) -> FrameData<'_> {
        if !self.spec.decode_latency.is_zero() {
            std::thread::sleep(self.spec.decode_latency);
        }
        if let Some((stalled, extra)) = self.spec.stall {
            if stalled == frame {
                debug!("Stalling {:?} on frame {}", extra, frame);
                std::thread::sleep(extra);
            }
        }

        let value = (frame % 251) as u8;
        let pad = self.spec.row_padding;
        let (w, h) = (self.spec.width as usize, self.spec.height as usize);
        let (cw, ch) = (w / 2, h / 2);

        fill_plane(&mut self.y, w, pad, h, value);
        fill_plane(&mut self.u, cw, pad, ch, 128);
        fill_plane(&mut self.v, cw, pad, ch, 128);

        FrameData {
            planes: vec![
                Plane { data: &self.y, stride: w + pad, row_bytes: w, rows: h },
                Plane { data: &self.u, stride: cw + pad, row_bytes: cw, rows: ch },
                Plane { data: &self.v, stride: cw + pad, row_bytes: cw, rows: ch },
            ],
        }
    }
}

fn fill_plane(buf: &mut Vec<u8>, row_bytes: usize, pad: usize, rows: usize, value: u8) {
    buf.clear();
    for _ in 0..rows {
        buf.extend(std::iter::repeat(value).take(row_bytes));
        buf.extend(std::iter::repeat(PADDING_BYTE).take(pad));
    }
}

impl MediaSource for SyntheticSource {
    type Packet = SyntheticPacket;

    fn metadata(&self) -> &Metadata {
        &self.metadata
    }

    fn video_stream_index(&self) -> usize {
        VIDEO_STREAM
    }

    fn next_packet(&mut self) -> Option<SyntheticPacket> {
        if let Some(every) = self.spec.audio_every {
            if every > 0 && self.video_since_audio >= every {
                self.video_since_audio = 0;
                return Some(SyntheticPacket {
                    stream_index: AUDIO_STREAM,
                    frame: self.next_frame,
                    remaining_chunks: 1,
                    drained: false,
                });
            }
        }

        if self.next_frame >= self.spec.frame_count {
            if !self.spec.end_latency.is_zero() {
                std::thread::sleep(self.spec.end_latency);
            }
            return None;
        }

        let frame = self.next_frame;
        self.next_frame += 1;
        self.video_since_audio += 1;
        Some(SyntheticPacket {
            stream_index: VIDEO_STREAM,
            frame,
            remaining_chunks: self.spec.chunks_per_packet.max(1),
            drained: false,
        })
    }

    fn decode(&mut self, packet: Option<&mut SyntheticPacket>) -> Result<Decoded<'_>, SourceError> {
        let Some(packet) = packet else {
            return Ok(match self.reorder.pop_front() {
                Some(frame) => Decoded::Frame(self.render(frame)),
                None => Decoded::NeedsMorePackets,
            });
        };

        if packet.stream_index != VIDEO_STREAM {
            packet.remaining_chunks = 0;
            packet.drained = true;
            return Ok(Decoded::NeedsMorePackets);
        }

        if self.spec.corrupt_frame == Some(packet.frame) {
            packet.remaining_chunks = 0;
            packet.drained = true;
            return Err(SourceError::Decode(format!("corrupt packet for frame {}", packet.frame)));
        }

        if packet.remaining_chunks > 0 {
            packet.remaining_chunks -= 1;
            if packet.remaining_chunks == 0 {
                self.reorder.push_back(packet.frame);
            }
        }

        if packet.remaining_chunks == 0 && self.reorder.len() > self.spec.reorder_delay {
            if let Some(frame) = self.reorder.pop_front() {
                return Ok(Decoded::Frame(self.render(frame)));
            }
        }

        if packet.remaining_chunks == 0 {
            packet.drained = true;
        }
        Ok(Decoded::NeedsMorePackets)
    }

    fn seek(&mut self, seconds: f64) -> Result<(), SourceError> {
        if !seconds.is_finite() || seconds < 0.0 || seconds > self.metadata.duration {
            return Err(SourceError::Seek(format!("timestamp {seconds} outside stream")));
        }

        let last = self.spec.frame_count.saturating_sub(1);
        let target = ((seconds * self.spec.frame_rate).floor() as u64).min(last);
        let gop = self.spec.keyframe_interval.max(1);
        self.next_frame = target / gop * gop;
        self.video_since_audio = 0;
        self.reorder.clear();
        debug!("Synthetic seek to {:.3}s -> keyframe {}", seconds, self.next_frame);
        Ok(())
    }
}
