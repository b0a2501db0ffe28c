//! FFmpeg media source
//!
//! Demuxes and decodes the best video stream of a container file using FFmpeg.

use std::path::Path;

use ffmpeg_next as ffmpeg;
use ffmpeg::ffi::{AVPixelFormat, AV_TIME_BASE};
use ffmpeg::format::Pixel;
use ffmpeg::media::Type;
use ffmpeg::util::frame::video::Video as VideoFrame;
use tracing::{debug, info, warn};

use super::{Decoded, FrameData, MediaSource, Metadata, Opener, PendingPacket, PixelFormat, Plane, SourceError};

/// Packet read from the container
pub struct FfmpegPacket {
    packet: ffmpeg::Packet,
    stream_index: usize,
    /// Handed to the decoder
    sent: bool,
    /// Decoder reported it needs new input since this packet was sent
    drained: bool,
}

impl PendingPacket for FfmpegPacket {
    fn stream_index(&self) -> usize {
        self.stream_index
    }

    fn is_exhausted(&self) -> bool {
        self.sent && self.drained
    }
}

/// Video source backed by an FFmpeg demuxer and decoder
pub struct FfmpegSource {
    /// FFmpeg format context
    input_ctx: ffmpeg::format::context::Input,
    /// Video stream index
    video_stream_index: usize,
    /// Video decoder
    decoder: ffmpeg::codec::decoder::Video,
    /// Decoder output, reused across calls
    frame: VideoFrame,
    /// Bytes per row of each plane once packed
    row_bytes: [usize; 4],
    metadata: Metadata,
    /// Flush packet already sent since the last seek
    eof_sent: bool,
}

// SAFETY: the FFmpeg contexts are only touched by whichever thread currently
// owns the source; no reference-counted handles to them escape `open`.
unsafe impl Send for FfmpegSource {}

impl FfmpegSource {
    /// Open a video file for decoding
    pub fn open(path: &Path) -> Result<Self, SourceError> {
        // Initialize FFmpeg (safe to call multiple times)
        ffmpeg::init().map_err(|_| SourceError::open_failed(path))?;

        // Open input file, probing stream info
        let input_ctx = ffmpeg::format::input(&path).map_err(|e| {
            warn!("avformat open failed for {}: {}", path.display(), e);
            match e {
                ffmpeg::Error::StreamNotFound => SourceError::no_stream_info(),
                _ => SourceError::open_failed(path),
            }
        })?;

        let (video_stream_index, time_base_rate, num_frames, parameters) = {
            let stream = input_ctx
                .streams()
                .best(Type::Video)
                .ok_or(SourceError::Stream)?;
            (stream.index(), stream.avg_frame_rate(), stream.frames(), stream.parameters())
        };

        let context_decoder = ffmpeg::codec::context::Context::from_parameters(parameters)
            .map_err(|_| SourceError::codec_open_failed())?;
        let decoder = context_decoder.decoder().video().map_err(|e| match e {
            ffmpeg::Error::DecoderNotFound => SourceError::codec_not_found(),
            _ => SourceError::codec_open_failed(),
        })?;

        let frame_rate = if time_base_rate.denominator() != 0 {
            f64::from(time_base_rate.numerator()) / f64::from(time_base_rate.denominator())
        } else {
            0.0
        };
        let duration = if input_ctx.duration() > 0 {
            input_ctx.duration() as f64 / f64::from(AV_TIME_BASE)
        } else {
            0.0
        };

        let metadata = Metadata {
            width: decoder.width(),
            height: decoder.height(),
            num_frames,
            frame_rate,
            duration,
            pixel_format: pixel_format_of(decoder.format()),
        };
        let row_bytes = packed_row_bytes(decoder.format(), decoder.width())?;

        info!(
            "Opened video: {}x{} @ {:.3}fps, {:.2}s, format: {}",
            metadata.width, metadata.height, metadata.frame_rate, metadata.duration, metadata.pixel_format
        );

        Ok(Self {
            input_ctx,
            video_stream_index,
            decoder,
            frame: VideoFrame::empty(),
            row_bytes,
            metadata,
            eof_sent: false,
        })
    }

    /// Opener for [`crate::Player::spawn`]
    pub fn opener() -> Opener<FfmpegSource> {
        Box::new(|path: &Path| FfmpegSource::open(path))
    }

    fn frame_data(&self) -> FrameData<'_> {
        let planes = (0..self.frame.planes())
            .take(self.row_bytes.len())
            .map(|i| Plane {
                data: self.frame.data(i),
                stride: self.frame.stride(i),
                row_bytes: self.row_bytes[i],
                rows: self.frame.plane_height(i) as usize,
            })
            .filter(|plane| plane.row_bytes > 0)
            .collect();
        FrameData { planes }
    }
}

/// Map the decoder's pixel format onto the names surfaced to subscribers
fn pixel_format_of(format: Pixel) -> PixelFormat {
    match format {
        Pixel::YUV420P => PixelFormat::Yuv420p,
        Pixel::RGB24 => PixelFormat::Rgb24,
        // RGB32 is a native-endian alias (BGRA on little endian)
        other if AVPixelFormat::from(other) == AVPixelFormat::from(Pixel::RGB32) => PixelFormat::Rgb32,
        _ => PixelFormat::Unknown,
    }
}

/// Row sizes of a tightly packed image (alignment 1)
fn packed_row_bytes(format: Pixel, width: u32) -> Result<[usize; 4], SourceError> {
    let mut linesizes = [0i32; 4];
    // SAFETY: av_image_fill_linesizes writes exactly four ints into the array.
    let ret = unsafe {
        ffmpeg::ffi::av_image_fill_linesizes(linesizes.as_mut_ptr(), format.into(), width as i32)
    };
    if ret < 0 {
        return Err(SourceError::codec_open_failed());
    }
    Ok(linesizes.map(|l| l.max(0) as usize))
}

fn is_again(error: &ffmpeg::Error) -> bool {
    matches!(error, ffmpeg::Error::Other { errno } if *errno == ffmpeg::util::error::EAGAIN)
}

impl MediaSource for FfmpegSource {
    type Packet = FfmpegPacket;

    fn metadata(&self) -> &Metadata {
        &self.metadata
    }

    fn video_stream_index(&self) -> usize {
        self.video_stream_index
    }

    fn next_packet(&mut self) -> Option<FfmpegPacket> {
        let mut packet = ffmpeg::Packet::empty();
        match packet.read(&mut self.input_ctx) {
            Ok(()) => Some(FfmpegPacket {
                stream_index: packet.stream(),
                packet,
                sent: false,
                drained: false,
            }),
            Err(ffmpeg::Error::Eof) => None,
            Err(e) => {
                warn!("Packet read failed, treating as end of stream: {}", e);
                None
            }
        }
    }

    fn decode(&mut self, mut packet: Option<&mut FfmpegPacket>) -> Result<Decoded<'_>, SourceError> {
        match packet.as_deref_mut() {
            Some(pending) if !pending.sent => match self.decoder.send_packet(&pending.packet) {
                Ok(()) => pending.sent = true,
                // Decoder output is full; drain a frame before resending
                Err(e) if is_again(&e) => {}
                Err(e) => return Err(SourceError::Decode(e.to_string())),
            },
            Some(_) => {}
            None => {
                if !self.eof_sent {
                    self.decoder
                        .send_eof()
                        .map_err(|e| SourceError::Decode(e.to_string()))?;
                    self.eof_sent = true;
                }
            }
        }

        match self.decoder.receive_frame(&mut self.frame) {
            Ok(()) => Ok(Decoded::Frame(self.frame_data())),
            Err(e) if is_again(&e) || matches!(e, ffmpeg::Error::Eof) => {
                if let Some(pending) = packet {
                    if pending.sent {
                        pending.drained = true;
                    }
                }
                Ok(Decoded::NeedsMorePackets)
            }
            Err(e) => Err(SourceError::Decode(e.to_string())),
        }
    }

    fn seek(&mut self, seconds: f64) -> Result<(), SourceError> {
        // Convert seconds to AV_TIME_BASE; lands on the keyframe at or before it
        let timestamp = (seconds * f64::from(AV_TIME_BASE)) as i64;
        self.input_ctx
            .seek(timestamp, ..timestamp)
            .map_err(|e| SourceError::Seek(e.to_string()))?;

        // Flush decoder
        self.decoder.flush();
        self.eof_sent = false;
        debug!("Seeked to {:.3}s", seconds);
        Ok(())
    }
}
