//! Player handle
//!
//! Thin control surface over the scheduler thread. Every control call is a
//! command plus a one-shot reply channel; event handlers run on the scheduler
//! thread, so they must not call back into the blocking control methods.

use std::path::Path;
use std::sync::Arc;
use std::thread::{self, JoinHandle};

use crossbeam_channel::{bounded, unbounded, Sender};
use parking_lot::Mutex;
use tracing::{debug, error};

use crate::config::PlayerConfig;
use crate::error::{PlayerError, Result};
use crate::events::{Event, EventKind};
use crate::source::{MediaSource, Metadata, Opener};

use super::scheduler::{run_worker, Command, Scheduler};
use super::state::{PlaybackState, Status};

/// Paced video player
///
/// Owns a scheduler thread and a decode worker thread; both are shut down
/// and joined on drop.
pub struct Player {
    commands: Sender<Command>,
    status: Arc<Mutex<Status>>,
    threads: Vec<JoinHandle<()>>,
}

impl Player {
    /// Start a player whose files are opened by `opener`
    pub fn spawn<S: MediaSource>(config: PlayerConfig, opener: Opener<S>) -> Result<Self> {
        let (command_tx, command_rx) = unbounded();
        let (job_tx, job_rx) = unbounded();
        let (done_tx, done_rx) = unbounded();
        let status = Arc::new(Mutex::new(Status::default()));

        let worker = thread::Builder::new()
            .name("videodemux-decode".to_string())
            .spawn(move || run_worker::<S>(job_rx, done_tx))?;

        let scheduler = Scheduler::new(config, opener, job_tx, Arc::clone(&status));
        let scheduler = thread::Builder::new()
            .name("videodemux-scheduler".to_string())
            .spawn(move || scheduler.run(command_rx, done_rx))?;

        debug!("Player threads started");
        Ok(Self {
            commands: command_tx,
            status,
            threads: vec![scheduler, worker],
        })
    }

    /// Start a player backed by FFmpeg
    #[cfg(feature = "ffmpeg")]
    pub fn with_ffmpeg(config: PlayerConfig) -> Result<Self> {
        Self::spawn(config, crate::source::FfmpegSource::opener())
    }

    /// Open `path`, closing any previous file. Emits `metadata` on success
    /// and `error` on failure.
    pub fn load(&self, path: impl AsRef<Path>) -> Result<Metadata> {
        let path = path.as_ref().to_path_buf();
        self.request(|reply| Command::Load { path, reply })
    }

    /// Begin or resume paced playback. No-op while already playing.
    pub fn start(&self) -> Result<()> {
        self.request(|reply| Command::Start { reply })
    }

    /// Halt the decode loop, keeping the position
    pub fn pause(&self) -> Result<()> {
        self.request(|reply| Command::Pause { reply })
    }

    /// Pause, rewind to the beginning and emit `end`
    pub fn stop(&self) -> Result<()> {
        self.request(|reply| Command::Stop { reply })
    }

    /// Reposition to `seconds` from the start of the stream
    pub fn seek(&self, seconds: f64) -> Result<()> {
        self.request(|reply| Command::Seek { seconds, reply })
    }

    /// Subscribe `handler` to `kind`, replacing any previous subscriber
    pub fn on<F>(&self, kind: EventKind, handler: F) -> Result<()>
    where
        F: FnMut(&Event<'_>) + Send + 'static,
    {
        self.send(Command::Subscribe {
            kind,
            handler: Box::new(handler),
        })
    }

    /// Remove the subscriber for `kind`
    pub fn off(&self, kind: EventKind) -> Result<()> {
        self.send(Command::Unsubscribe { kind })
    }

    /// Latest status published by the scheduler
    pub fn status(&self) -> Status {
        *self.status.lock()
    }

    pub fn state(&self) -> PlaybackState {
        self.status.lock().state
    }

    fn send(&self, command: Command) -> Result<()> {
        self.commands.send(command).map_err(|_| PlayerError::Disconnected)
    }

    fn request<T>(&self, build: impl FnOnce(Sender<Result<T>>) -> Command) -> Result<T> {
        let (reply_tx, reply_rx) = bounded(1);
        self.send(build(reply_tx))?;
        reply_rx.recv().map_err(|_| PlayerError::Disconnected)?
    }
}

impl Drop for Player {
    fn drop(&mut self) {
        let _ = self.commands.send(Command::Shutdown);
        for handle in self.threads.drain(..) {
            let name = handle.thread().name().unwrap_or("player").to_string();
            if handle.join().is_err() {
                error!("{} thread panicked", name);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::{Duration, Instant};

    use crossbeam_channel::Receiver;

    use crate::source::{Decoded, SourceError, SyntheticPacket, SyntheticSource, SyntheticSpec};

    const WAIT: Duration = Duration::from_secs(5);

    #[derive(Debug, Clone, PartialEq)]
    enum Seen {
        Error(String),
        Metadata(Metadata),
        Start,
        Frame { index: u64, luma: u8, len: usize },
        End,
    }

    impl Seen {
        fn frame_index(&self) -> Option<u64> {
            match self {
                Seen::Frame { index, .. } => Some(*index),
                _ => None,
            }
        }
    }

    fn spawn(spec: SyntheticSpec) -> Player {
        Player::spawn(PlayerConfig::default(), spec.opener()).unwrap()
    }

    /// Subscribe to every event kind, forwarding what arrives
    fn record(player: &Player) -> Receiver<(Instant, Seen)> {
        let (tx, rx) = unbounded();
        for kind in [
            EventKind::Error,
            EventKind::Metadata,
            EventKind::Start,
            EventKind::Frame,
            EventKind::End,
        ] {
            let tx = tx.clone();
            player
                .on(kind, move |event| {
                    let seen = match event {
                        Event::Error(message) => Seen::Error(message.to_string()),
                        Event::Metadata(metadata) => Seen::Metadata((*metadata).clone()),
                        Event::Start => Seen::Start,
                        Event::Frame(frame) => Seen::Frame {
                            index: frame.index,
                            luma: frame.data[0],
                            len: frame.len(),
                        },
                        Event::End => Seen::End,
                    };
                    let _ = tx.send((Instant::now(), seen));
                })
                .unwrap();
        }
        rx
    }

    fn until_end(events: &Receiver<(Instant, Seen)>) -> Vec<Seen> {
        let mut seen = Vec::new();
        loop {
            let (_, event) = events.recv_timeout(WAIT).expect("timed out waiting for end");
            let done = event == Seen::End;
            seen.push(event);
            if done {
                return seen;
            }
        }
    }

    fn next_frame(events: &Receiver<(Instant, Seen)>) -> (Instant, Seen) {
        loop {
            let (at, event) = events.recv_timeout(WAIT).expect("timed out waiting for a frame");
            if event.frame_index().is_some() {
                return (at, event);
            }
        }
    }

    fn drain(events: &Receiver<(Instant, Seen)>) -> Vec<Seen> {
        events.try_iter().map(|(_, event)| event).collect()
    }

    fn fast(frame_count: u64) -> SyntheticSpec {
        SyntheticSpec {
            frame_count,
            frame_rate: 200.0,
            ..Default::default()
        }
    }

    #[test]
    fn test_plays_to_end_in_order() {
        let spec = fast(20);
        let frame_len = spec.frame_len();
        let player = spawn(spec);
        let events = record(&player);

        let metadata = player.load("clip.mp4").unwrap();
        assert_eq!(metadata.num_frames, 20);
        assert_eq!(player.state(), PlaybackState::Loaded);
        player.start().unwrap();

        let seen = until_end(&events);
        assert_eq!(seen[0], Seen::Metadata(metadata));
        assert_eq!(seen[1], Seen::Start);

        let frames: Vec<&Seen> = seen.iter().filter(|e| e.frame_index().is_some()).collect();
        assert_eq!(frames.len(), 20);
        for (i, frame) in frames.iter().enumerate() {
            assert_eq!(
                **frame,
                Seen::Frame { index: i as u64 + 1, luma: i as u8, len: frame_len }
            );
        }
        assert!(!seen.iter().any(|e| matches!(e, Seen::Error(_))));

        // End is emitted once and playback stays finished
        thread::sleep(Duration::from_millis(100));
        assert!(drain(&events).is_empty());
        let status = player.status();
        assert_eq!(status.state, PlaybackState::Finished);
        assert_eq!(status.produced_frames, 20);
    }

    #[test]
    fn test_frames_are_paced() {
        let player = spawn(SyntheticSpec {
            frame_count: 25,
            frame_rate: 50.0,
            ..Default::default()
        });
        let events = record(&player);
        player.load("clip.mp4").unwrap();

        let started = Instant::now();
        player.start().unwrap();
        until_end(&events);

        // 25 frames at 50fps: about half a second, never a burst
        let elapsed = started.elapsed();
        assert!(elapsed >= Duration::from_millis(400), "too fast: {elapsed:?}");
        assert!(elapsed < Duration::from_millis(2000), "too slow: {elapsed:?}");
    }

    #[test]
    fn test_slow_decodes_keep_up() {
        let player = spawn(SyntheticSpec {
            frame_count: 20,
            frame_rate: 50.0,
            decode_latency: Duration::from_millis(15),
            ..Default::default()
        });
        let events = record(&player);
        player.load("clip.mp4").unwrap();

        let started = Instant::now();
        player.start().unwrap();
        let seen = until_end(&events);
        assert_eq!(seen.iter().filter(|e| e.frame_index().is_some()).count(), 20);

        // Decode cost is absorbed by the schedule instead of added to it
        let elapsed = started.elapsed();
        assert!(elapsed < Duration::from_millis(1200), "drifted: {elapsed:?}");
    }

    #[test]
    fn test_pause_halts_and_start_resumes() {
        let player = spawn(SyntheticSpec {
            frame_count: 1000,
            frame_rate: 100.0,
            ..Default::default()
        });
        let events = record(&player);
        player.load("clip.mp4").unwrap();
        player.start().unwrap();

        std::thread::sleep(Duration::from_millis(300));
        player.pause().unwrap();
        assert_eq!(player.state(), PlaybackState::Paused);

        // Pause is idempotent
        player.pause().unwrap();

        std::thread::sleep(Duration::from_millis(50));
        let before: Vec<u64> = drain(&events).iter().filter_map(Seen::frame_index).collect();
        std::thread::sleep(Duration::from_millis(200));
        assert!(drain(&events).is_empty(), "frames delivered while paused");

        let last = *before.last().unwrap();
        // 300ms at 100fps, plus the frame in flight when pausing
        assert!((25..=36).contains(&last), "unexpected frame count {last}");
        assert_eq!(player.status().produced_frames, last);

        player.start().unwrap();
        let (_, frame) = next_frame(&events);
        assert_eq!(frame.frame_index(), Some(last + 1));
    }

    #[test]
    fn test_start_while_playing_is_noop() {
        let player = spawn(fast(1000));
        let events = record(&player);
        player.load("clip.mp4").unwrap();
        player.start().unwrap();
        player.start().unwrap();
        std::thread::sleep(Duration::from_millis(50));
        player.pause().unwrap();

        let starts = drain(&events).iter().filter(|e| **e == Seen::Start).count();
        assert_eq!(starts, 1);
    }

    #[test]
    fn test_stop_rewinds_and_ends_once() {
        let player = spawn(SyntheticSpec {
            frame_count: 1000,
            frame_rate: 100.0,
            ..Default::default()
        });
        let events = record(&player);
        player.load("clip.mp4").unwrap();
        player.start().unwrap();
        thread::sleep(Duration::from_millis(100));

        player.stop().unwrap();
        thread::sleep(Duration::from_millis(100));
        let seen = drain(&events);
        assert_eq!(seen.iter().filter(|e| **e == Seen::End).count(), 1);
        assert_eq!(seen.last(), Some(&Seen::End));

        let status = player.status();
        assert_eq!(status.state, PlaybackState::Finished);
        assert_eq!(status.produced_frames, 0);
        assert_eq!(status.position, 0.0);

        // Playing again starts from the top
        player.start().unwrap();
        let (_, frame) = next_frame(&events);
        assert!(matches!(frame, Seen::Frame { index: 1, luma: 0, .. }));
    }

    #[test]
    fn test_seek_then_start() {
        let player = spawn(fast(300));
        let events = record(&player);
        player.load("clip.mp4").unwrap();

        // 200fps: 0.5s is frame 100, on a keyframe
        player.seek(0.5).unwrap();
        let status = player.status();
        assert_eq!(status.state, PlaybackState::Loaded);
        assert_eq!(status.produced_frames, 100);
        assert_eq!(status.position, 0.5);

        player.start().unwrap();
        let (_, frame) = next_frame(&events);
        assert!(matches!(frame, Seen::Frame { index: 101, luma: 100, .. }));
    }

    #[test]
    fn test_seek_round_trip_matches_fresh_load() {
        let player = spawn(fast(300));
        let events = record(&player);
        player.load("clip.mp4").unwrap();

        player.seek(1.0).unwrap();
        player.seek(0.0).unwrap();
        assert_eq!(player.status().produced_frames, 0);

        player.start().unwrap();
        let (_, frame) = next_frame(&events);
        assert!(matches!(frame, Seen::Frame { index: 1, luma: 0, .. }));
    }

    #[test]
    fn test_seek_while_playing_reanchors() {
        let player = spawn(SyntheticSpec {
            frame_count: 500,
            frame_rate: 50.0,
            ..Default::default()
        });
        let events = record(&player);
        player.load("clip.mp4").unwrap();
        player.start().unwrap();
        thread::sleep(Duration::from_millis(100));

        player.seek(4.0).unwrap();
        let sought = Instant::now();
        assert_eq!(player.state(), PlaybackState::Playing);

        // Skip frames decoded before the seek took effect
        let (at, frame) = loop {
            let (at, frame) = next_frame(&events);
            if frame.frame_index() > Some(100) {
                break (at, frame);
            }
        };
        assert!(matches!(frame, Seen::Frame { index: 201, luma: 200, .. }));
        assert!(at.saturating_duration_since(sought) < Duration::from_millis(500));
    }

    #[test]
    fn test_seek_from_finished_pauses() {
        let player = spawn(fast(10));
        let events = record(&player);
        player.load("clip.mp4").unwrap();
        player.start().unwrap();
        until_end(&events);

        player.seek(0.0).unwrap();
        assert_eq!(player.state(), PlaybackState::Paused);
    }

    #[test]
    fn test_invalid_seek_keeps_state() {
        let player = spawn(fast(300));
        let events = record(&player);
        player.load("clip.mp4").unwrap();
        player.seek(0.5).unwrap();

        let err = player.seek(-3.0).unwrap_err();
        assert!(matches!(err, PlayerError::Source(SourceError::Seek(_))));
        let status = player.status();
        assert_eq!(status.state, PlaybackState::Loaded);
        assert_eq!(status.produced_frames, 100);

        let seen = drain(&events);
        assert!(matches!(seen.last(), Some(Seen::Error(message)) if message.starts_with("could not seek")));
    }

    #[test]
    fn test_decode_error_is_reported_and_skipped() {
        let player = spawn(SyntheticSpec {
            corrupt_frame: Some(5),
            ..fast(20)
        });
        let events = record(&player);
        player.load("clip.mp4").unwrap();
        player.start().unwrap();

        let seen = until_end(&events);
        let errors: Vec<&Seen> = seen.iter().filter(|e| matches!(e, Seen::Error(_))).collect();
        assert_eq!(errors.len(), 1);
        assert!(matches!(errors[0], Seen::Error(message) if message.starts_with("could not decode video frame")));

        let indices: Vec<u64> = seen.iter().filter_map(Seen::frame_index).collect();
        assert_eq!(indices, (1..=19).collect::<Vec<_>>());
    }

    #[test]
    fn test_repeated_decode_errors_pause() {
        let config = PlayerConfig {
            max_consecutive_decode_errors: 1,
            ..Default::default()
        };
        let spec = SyntheticSpec {
            corrupt_frame: Some(5),
            ..fast(20)
        };
        let player = Player::spawn(config, spec.opener()).unwrap();
        let events = record(&player);
        player.load("clip.mp4").unwrap();
        player.start().unwrap();

        loop {
            let (_, event) = events.recv_timeout(WAIT).unwrap();
            if matches!(event, Seen::Error(_)) {
                break;
            }
        }
        thread::sleep(Duration::from_millis(100));
        assert_eq!(player.state(), PlaybackState::Paused);
        assert!(drain(&events).iter().all(|e| e.frame_index().is_none()));
    }

    #[test]
    fn test_load_failure() {
        let opener: Opener<SyntheticSource> = Box::new(|path: &Path| Err(SourceError::open_failed(path)));
        let player = Player::spawn(PlayerConfig::default(), opener).unwrap();
        let events = record(&player);

        let err = player.load("missing.mp4").unwrap_err();
        assert!(matches!(err, PlayerError::Source(SourceError::Open(_))));
        assert_eq!(player.state(), PlaybackState::Unloaded);

        let (_, event) = events.recv_timeout(WAIT).unwrap();
        assert!(matches!(event, Seen::Error(message) if message.contains("missing.mp4")));

        assert!(matches!(player.start(), Err(PlayerError::NotLoaded)));
        assert!(matches!(player.seek(1.0), Err(PlayerError::NotLoaded)));
    }

    #[test]
    fn test_reload_resets_session() {
        let player = spawn(SyntheticSpec {
            frame_count: 1000,
            frame_rate: 100.0,
            ..Default::default()
        });
        let events = record(&player);
        player.load("first.mp4").unwrap();
        player.start().unwrap();
        thread::sleep(Duration::from_millis(100));

        player.load("second.mp4").unwrap();
        let status = player.status();
        assert_eq!(status.state, PlaybackState::Loaded);
        assert_eq!(status.produced_frames, 0);

        // Nothing from the closed session arrives after the new metadata
        thread::sleep(Duration::from_millis(100));
        let seen = drain(&events);
        let metadata_at = seen
            .iter()
            .rposition(|e| matches!(e, Seen::Metadata(_)))
            .unwrap();
        assert!(seen[metadata_at + 1..].is_empty());
    }

    #[test]
    fn test_plays_without_subscribers() {
        let player = spawn(fast(10));
        player.load("clip.mp4").unwrap();
        player.start().unwrap();

        let deadline = Instant::now() + WAIT;
        while player.state() != PlaybackState::Finished {
            assert!(Instant::now() < deadline, "playback never finished");
            std::thread::sleep(Duration::from_millis(10));
        }
        assert_eq!(player.status().produced_frames, 10);
    }

    #[test]
    fn test_unsubscribe() {
        let player = spawn(fast(10));
        let events = record(&player);
        player.off(EventKind::Frame).unwrap();
        player.load("clip.mp4").unwrap();
        player.start().unwrap();

        let seen = until_end(&events);
        assert!(seen.iter().all(|e| e.frame_index().is_none()));
    }

    /// Synthetic stream whose container refuses to seek
    struct Unseekable(SyntheticSource);

    impl MediaSource for Unseekable {
        type Packet = SyntheticPacket;

        fn metadata(&self) -> &Metadata {
            self.0.metadata()
        }

        fn video_stream_index(&self) -> usize {
            self.0.video_stream_index()
        }

        fn next_packet(&mut self) -> Option<SyntheticPacket> {
            self.0.next_packet()
        }

        fn decode(&mut self, packet: Option<&mut SyntheticPacket>) -> Result<Decoded<'_>, SourceError> {
            self.0.decode(packet)
        }

        fn seek(&mut self, _seconds: f64) -> Result<(), SourceError> {
            Err(SourceError::Seek("stream is not seekable".to_string()))
        }
    }

    /// Three frames, then a slow search for packets that are not there
    fn slow_ending() -> SyntheticSpec {
        SyntheticSpec {
            frame_count: 3,
            frame_rate: 200.0,
            reorder_delay: 0,
            end_latency: Duration::from_millis(400),
            ..Default::default()
        }
    }

    /// Play until frame `index` arrives and the next cycle is under way
    fn play_until(player: &Player, events: &Receiver<(Instant, Seen)>, index: u64) {
        player.load("clip.mp4").unwrap();
        player.start().unwrap();
        while next_frame(events).1.frame_index() != Some(index) {}
        thread::sleep(Duration::from_millis(50));
    }

    fn frame_times(config: PlayerConfig, spec: SyntheticSpec) -> Vec<(Instant, u64)> {
        let player = Player::spawn(config, spec.opener()).unwrap();
        let events = record(&player);
        player.load("clip.mp4").unwrap();
        player.start().unwrap();

        let mut frames = Vec::new();
        loop {
            let (at, event) = events.recv_timeout(WAIT).expect("timed out waiting for end");
            match event {
                Seen::Frame { index, .. } => frames.push((at, index)),
                Seen::End => return frames,
                _ => {}
            }
        }
    }

    fn gap(frames: &[(Instant, u64)], from: u64, to: u64) -> Duration {
        let at = |index: u64| {
            frames
                .iter()
                .find(|(_, i)| *i == index)
                .map(|(t, _)| *t)
                .unwrap()
        };
        at(to).duration_since(at(from))
    }

    #[test]
    fn test_stop_during_final_cycle_ends_once() {
        let player = spawn(slow_ending());
        let events = record(&player);
        play_until(&player, &events, 3);

        player.stop().unwrap();
        assert_eq!(drain(&events), vec![Seen::End]);
        let status = player.status();
        assert_eq!(status.state, PlaybackState::Finished);
        assert_eq!(status.produced_frames, 0);

        thread::sleep(Duration::from_millis(100));
        assert!(drain(&events).is_empty());
    }

    #[test]
    fn test_seek_during_final_cycle_keeps_playing() {
        let player = spawn(slow_ending());
        let events = record(&player);
        play_until(&player, &events, 3);

        player.seek(0.0).unwrap();
        assert_eq!(player.state(), PlaybackState::Playing);

        // The stream replays from the top and ends exactly once
        let seen = until_end(&events);
        let indices: Vec<u64> = seen.iter().filter_map(Seen::frame_index).collect();
        assert_eq!(indices, vec![1, 2, 3]);
        assert_eq!(seen.iter().filter(|e| **e == Seen::End).count(), 1);
    }

    #[test]
    fn test_commands_wait_for_cycle_in_arrival_order() {
        let player = spawn(SyntheticSpec {
            frame_count: 1000,
            frame_rate: 100.0,
            decode_latency: Duration::from_millis(150),
            ..Default::default()
        });
        let events = record(&player);
        player.load("clip.mp4").unwrap();
        player.start().unwrap();
        assert_eq!(next_frame(&events).1.frame_index(), Some(1));

        // Frame 2 is being decoded: the seek waits for it, the pause waits behind the seek
        thread::scope(|scope| {
            let seeker = scope.spawn(|| player.seek(2.0));
            thread::sleep(Duration::from_millis(20));
            player.pause().unwrap();
            seeker.join().unwrap().unwrap();
        });

        // The seek restarted playback before the pause landed
        let (_, second) = next_frame(&events);
        assert_eq!(second.frame_index(), Some(2));
        let (_, after_seek) = next_frame(&events);
        assert!(matches!(after_seek, Seen::Frame { index: 201, luma: 200, .. }));

        thread::sleep(Duration::from_millis(300));
        assert!(drain(&events).iter().all(|e| e.frame_index().is_none()));
        let status = player.status();
        assert_eq!(status.state, PlaybackState::Paused);
        assert_eq!(status.produced_frames, 201);
    }

    #[test]
    fn test_stall_is_caught_up_back_to_back() {
        let spec = SyntheticSpec {
            frame_count: 40,
            frame_rate: 50.0,
            stall: Some((5, Duration::from_millis(500))),
            ..Default::default()
        };
        let frames = frame_times(PlayerConfig::default(), spec);
        assert_eq!(frames.len(), 40);

        // Ten frames after the stall arrive as a burst
        let burst = gap(&frames, 7, 17);
        assert!(burst < Duration::from_millis(100), "no catch-up burst: {burst:?}");
    }

    #[test]
    fn test_resync_threshold_forgives_stall() {
        let config = PlayerConfig {
            resync_threshold_ms: Some(100),
            ..Default::default()
        };
        let spec = SyntheticSpec {
            frame_count: 40,
            frame_rate: 50.0,
            stall: Some((5, Duration::from_millis(500))),
            ..Default::default()
        };
        let frames = frame_times(config, spec);
        assert_eq!(frames.len(), 40);

        // Re-anchored after the stall: ten frames take ten intervals again
        let paced = gap(&frames, 7, 17);
        assert!(paced >= Duration::from_millis(150), "frames burst after stall: {paced:?}");
    }

    #[test]
    fn test_stop_reports_failed_rewind() {
        let opener: Opener<Unseekable> =
            Box::new(|_: &Path| Ok(Unseekable(SyntheticSource::new(fast(100)))));
        let player = Player::spawn(PlayerConfig::default(), opener).unwrap();
        let events = record(&player);
        player.load("clip.mp4").unwrap();
        player.start().unwrap();
        next_frame(&events);
        next_frame(&events);

        let err = player.stop().unwrap_err();
        assert!(matches!(err, PlayerError::Source(SourceError::Seek(_))));

        let status = player.status();
        assert_eq!(status.state, PlaybackState::Finished);
        assert!(status.produced_frames >= 2);

        let seen = drain(&events);
        assert_eq!(seen.last(), Some(&Seen::End));
        assert_eq!(seen.iter().filter(|e| **e == Seen::End).count(), 1);
        assert!(seen.iter().any(|e| matches!(e, Seen::Error(m) if m.starts_with("could not seek"))));
    }
}
