//! Scheduler thread
//!
//! Owns the session, the subscriptions and the pacing timer. Control commands,
//! decode completions and timer expiries all arrive on this one thread, so
//! session state is never shared. The decoder travels to the decode worker
//! for each cycle and comes back with the completion.

use std::collections::VecDeque;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::{Duration, Instant};

use crossbeam_channel::{after, never, select, Receiver, Sender};
use parking_lot::Mutex;
use tracing::{debug, error, info, info_span, trace, warn};
use uuid::Uuid;

use crate::config::PlayerConfig;
use crate::error::{PlayerError, Result};
use crate::events::{Dispatcher, Event, EventKind, Handler};
use crate::source::{MediaSource, Metadata, Opener, SourceError};
use crate::video::{CycleOutcome, Decoder};

use super::pacing::{self, Pace, PlaybackClock};
use super::state::{PlaybackState, Status};

/// Requests sent by the [`crate::Player`] handle
pub(crate) enum Command {
    Load { path: PathBuf, reply: Sender<Result<Metadata>> },
    Start { reply: Sender<Result<()>> },
    Pause { reply: Sender<Result<()>> },
    Stop { reply: Sender<Result<()>> },
    Seek { seconds: f64, reply: Sender<Result<()>> },
    Subscribe { kind: EventKind, handler: Handler },
    Unsubscribe { kind: EventKind },
    Shutdown,
}

impl Command {
    /// Commands that operate on the decoder and must wait for it to come back
    fn needs_decoder(&self) -> bool {
        matches!(self, Command::Seek { .. } | Command::Stop { .. })
    }

    /// Commands that reposition the stream, overriding an end of stream
    /// reached by the cycle they waited for
    fn supersedes_end(&self) -> bool {
        self.needs_decoder()
    }

    /// Commands that only touch the subscription table
    fn is_subscription(&self) -> bool {
        matches!(self, Command::Subscribe { .. } | Command::Unsubscribe { .. })
    }
}

/// One decode cycle handed to the worker
pub(crate) struct Job<S: MediaSource> {
    session: Uuid,
    decoder: Box<Decoder<S>>,
}

/// A finished decode cycle handed back to the scheduler
pub(crate) struct Completion<S: MediaSource> {
    session: Uuid,
    decoder: Box<Decoder<S>>,
    outcome: CycleOutcome,
    took: Duration,
}

/// Decode worker loop: runs one cycle per job until the job channel closes
pub(crate) fn run_worker<S: MediaSource>(jobs: Receiver<Job<S>>, done: Sender<Completion<S>>) {
    debug!("Decode worker started");
    for Job { session, mut decoder } in jobs.iter() {
        let started = Instant::now();
        let outcome = decoder.run_cycle();
        let completion = Completion {
            session,
            decoder,
            outcome,
            took: started.elapsed(),
        };
        if done.send(completion).is_err() {
            break;
        }
    }
    debug!("Decode worker stopped");
}

/// One open file
struct Session<S: MediaSource> {
    id: Uuid,
    path: PathBuf,
    /// Frame rate used for pacing and seek positions
    frame_rate: f64,
    state: PlaybackState,
    clock: PlaybackClock,
    /// `None` while a decode cycle is in flight
    decoder: Option<Box<Decoder<S>>>,
    /// Frames produced, as of the last completed cycle or seek
    produced: u64,
    decode_errors: u32,
}

impl<S: MediaSource> Session<S> {
    fn status(&self) -> Status {
        Status {
            state: self.state,
            produced_frames: self.produced,
            position: self.produced as f64 / self.frame_rate,
        }
    }
}

pub(crate) struct Scheduler<S: MediaSource> {
    config: PlayerConfig,
    opener: Opener<S>,
    dispatcher: Dispatcher,
    session: Option<Session<S>>,
    /// Commands waiting for the in-flight cycle, in arrival order
    deferred: VecDeque<Command>,
    /// Armed one-shot pacing timer
    timer: Option<Receiver<Instant>>,
    jobs: Sender<Job<S>>,
    status: Arc<Mutex<Status>>,
}

impl<S: MediaSource> Scheduler<S> {
    pub(crate) fn new(
        config: PlayerConfig,
        opener: Opener<S>,
        jobs: Sender<Job<S>>,
        status: Arc<Mutex<Status>>,
    ) -> Self {
        Self {
            config,
            opener,
            dispatcher: Dispatcher::new(),
            session: None,
            deferred: VecDeque::new(),
            timer: None,
            jobs,
            status,
        }
    }

    /// Scheduler loop; returns on `Shutdown` or when every handle is gone
    pub(crate) fn run(mut self, commands: Receiver<Command>, completions: Receiver<Completion<S>>) {
        info!("Scheduler started");

        loop {
            let timer = self.timer.clone().unwrap_or_else(never);

            select! {
                recv(commands) -> msg => match msg {
                    Ok(Command::Shutdown) | Err(_) => break,
                    Ok(command) => self.handle(command),
                },
                recv(completions) -> msg => match msg {
                    Ok(completion) => self.on_cycle_complete(completion),
                    Err(_) => {
                        error!("Decode worker disconnected");
                        break;
                    }
                },
                recv(timer) -> _ => {
                    self.timer = None;
                    self.dispatch();
                },
            }

            self.publish_status();
        }

        info!("Scheduler stopped");
    }

    fn handle(&mut self, command: Command) {
        if !command.is_subscription()
            && (!self.deferred.is_empty() || (command.needs_decoder() && self.in_flight()))
        {
            debug!("Deferring command until the decode cycle returns");
            self.deferred.push_back(command);
            return;
        }
        self.execute(command);
    }

    fn execute(&mut self, command: Command) {
        match command {
            Command::Load { path, reply } => {
                let result = self.load(path);
                self.reply(reply, result);
            }
            Command::Start { reply } => {
                let result = self.start();
                self.reply(reply, result);
            }
            Command::Pause { reply } => {
                let result = self.pause();
                self.reply(reply, result);
            }
            Command::Stop { reply } => {
                let result = self.stop();
                self.reply(reply, result);
            }
            Command::Seek { seconds, reply } => {
                let result = self.seek(seconds);
                self.reply(reply, result);
            }
            Command::Subscribe { kind, handler } => {
                if self.dispatcher.subscribe(kind, handler).is_some() {
                    debug!("Replaced {} subscriber", kind.name());
                }
            }
            Command::Unsubscribe { kind } => {
                self.dispatcher.unsubscribe(kind);
            }
            Command::Shutdown => {}
        }
    }

    /// Publish the status, then answer the caller
    fn reply<T>(&self, reply: Sender<Result<T>>, result: Result<T>) {
        self.publish_status();
        if reply.send(result).is_err() {
            trace!("Caller went away before the reply");
        }
    }

    fn publish_status(&self) {
        let status = self.session.as_ref().map(Session::status).unwrap_or_default();
        *self.status.lock() = status;
    }

    fn in_flight(&self) -> bool {
        self.session.as_ref().is_some_and(|s| s.decoder.is_none())
    }

    fn load(&mut self, path: PathBuf) -> Result<Metadata> {
        self.timer = None;
        if let Some(old) = self.session.take() {
            info!(session = %old.id, "Closing {}", old.path.display());
        }

        let source = match (self.opener)(&path) {
            Ok(source) => source,
            Err(e) => {
                error!("Failed to load video '{}': {}", path.display(), e);
                self.dispatcher.notify(&Event::Error(&e.to_string()));
                return Err(e.into());
            }
        };

        let metadata = source.metadata().clone();
        let frame_rate = metadata.effective_frame_rate(self.config.fallback_frame_rate);
        let session = Session {
            id: Uuid::new_v4(),
            path,
            frame_rate,
            state: PlaybackState::Loaded,
            clock: PlaybackClock::new(frame_rate, Instant::now()),
            decoder: Some(Box::new(Decoder::new(source))),
            produced: 0,
            decode_errors: 0,
        };

        let span = info_span!("session", id = %session.id);
        let _enter = span.enter();
        info!(
            "Loaded {}: {}x{} @ {:.3}fps, {:.2}s, {}",
            session.path.display(),
            metadata.width,
            metadata.height,
            metadata.frame_rate,
            metadata.duration,
            metadata.pixel_format
        );
        if frame_rate != metadata.frame_rate {
            warn!("No usable frame rate in container, pacing at {}fps", frame_rate);
        }

        self.session = Some(session);
        self.dispatcher.notify(&Event::Metadata(&metadata));
        Ok(metadata)
    }

    fn start(&mut self) -> Result<()> {
        let session = self.session.as_mut().ok_or(PlayerError::NotLoaded)?;
        if !session.state.can_start() {
            debug!("Start ignored in state {}", session.state.display_name());
            return Ok(());
        }

        session.state = PlaybackState::Playing;
        session.clock.anchor(Instant::now(), session.produced);
        session.decode_errors = 0;
        info!(session = %session.id, "Playback started at frame {}", session.produced);

        self.dispatcher.notify(&Event::Start);
        self.dispatch();
        Ok(())
    }

    fn pause(&mut self) -> Result<()> {
        let session = self.session.as_mut().ok_or(PlayerError::NotLoaded)?;
        if session.state == PlaybackState::Playing {
            session.state = PlaybackState::Paused;
            self.timer = None;
            info!(session = %session.id, "Playback paused at frame {}", session.produced);
        }
        Ok(())
    }

    fn stop(&mut self) -> Result<()> {
        let session = self.session.as_mut().ok_or(PlayerError::NotLoaded)?;
        session.state = PlaybackState::Paused;
        self.timer = None;

        let rewound = self.seek(0.0);
        if let Err(e) = &rewound {
            warn!("Stop could not rewind: {}", e);
        }
        if let Some(session) = self.session.as_mut() {
            session.state = PlaybackState::Finished;
            info!(session = %session.id, "Playback stopped");
        }

        self.dispatcher.notify(&Event::End);
        rewound
    }

    fn seek(&mut self, seconds: f64) -> Result<()> {
        let session = self.session.as_mut().ok_or(PlayerError::NotLoaded)?;
        let Some(decoder) = session.decoder.as_mut() else {
            return Err(SourceError::Seek("decode cycle in flight".to_string()).into());
        };

        if let Err(e) = decoder.seek(seconds, session.frame_rate) {
            warn!(session = %session.id, "Seek to {:.3}s failed: {}", seconds, e);
            self.dispatcher.notify(&Event::Error(&e.to_string()));
            return Err(e.into());
        }

        // Disarm before re-anchoring so a stale delay cannot fire
        self.timer = None;
        session.produced = decoder.produced();
        session.state = session.state.after_seek();
        if session.state == PlaybackState::Playing {
            session.clock.anchor(Instant::now(), session.produced);
        }
        info!(session = %session.id, "Seeked to {:.3}s (frame {})", seconds, session.produced);

        self.dispatch();
        Ok(())
    }

    /// Hand the decoder to the worker if playing, idle and no timer is armed
    fn dispatch(&mut self) {
        let Some(session) = self.session.as_mut() else {
            return;
        };
        if session.state != PlaybackState::Playing || self.timer.is_some() {
            return;
        }
        let Some(decoder) = session.decoder.take() else {
            return;
        };

        trace!("Dispatching decode cycle");
        if let Err(e) = self.jobs.send(Job { session: session.id, decoder }) {
            error!("Decode worker is gone, pausing playback");
            session.decoder = Some(e.into_inner().decoder);
            session.state = PlaybackState::Paused;
        }
    }

    fn on_cycle_complete(&mut self, completion: Completion<S>) {
        let Completion { session: id, mut decoder, outcome, took } = completion;
        let Some(session) = self.session.as_mut().filter(|s| s.id == id) else {
            debug!(session = %id, "Dropping decode result of a closed session");
            return;
        };
        trace!(?outcome, ?took, "Decode cycle complete");
        session.produced = decoder.produced();

        match outcome {
            CycleOutcome::FrameReady => {
                session.decode_errors = 0;
                if let Some(frame) = decoder.frame() {
                    self.dispatcher.notify(&Event::Frame(frame));
                }
            }
            CycleOutcome::EndOfStream if self.deferred.iter().any(Command::supersedes_end) => {
                // The pending seek or stop decides where playback goes next
                debug!(session = %session.id, "End of stream superseded by a pending command");
            }
            CycleOutcome::EndOfStream => {
                session.state = PlaybackState::Finished;
                info!(session = %session.id, "End of stream after {} frames", session.produced);
                self.dispatcher.notify(&Event::End);
            }
            CycleOutcome::Failed => {
                let message = decoder
                    .take_error()
                    .map(|e| e.to_string())
                    .unwrap_or_else(|| "could not decode video frame".to_string());
                self.dispatcher.notify(&Event::Error(&message));

                session.decode_errors += 1;
                if session.state == PlaybackState::Playing
                    && session.decode_errors >= self.config.max_consecutive_decode_errors
                {
                    warn!(
                        session = %session.id,
                        "{} consecutive decode failures, pausing playback",
                        session.decode_errors
                    );
                    session.state = PlaybackState::Paused;
                }
            }
        }

        session.decoder = Some(decoder);
        self.replay_deferred();
        self.schedule_next();
    }

    fn replay_deferred(&mut self) {
        while let Some(command) = self.deferred.pop_front() {
            if command.needs_decoder() && self.in_flight() {
                self.deferred.push_front(command);
                break;
            }
            self.execute(command);
        }
    }

    /// Pacing decision after a completed cycle
    fn schedule_next(&mut self) {
        let Some(session) = self.session.as_mut() else {
            return;
        };
        if session.decoder.is_none() || self.timer.is_some() {
            return;
        }

        let now = Instant::now();
        let lag = session.clock.lag_ms(session.produced, now);
        match pacing::decide(session.state, lag, self.config.resync_threshold()) {
            Pace::Stop => {}
            Pace::Immediate => self.dispatch(),
            Pace::Resync => {
                debug!("Behind schedule by {:.1}ms, re-anchoring clock", -lag);
                session.clock.anchor(now, session.produced);
                self.dispatch();
            }
            Pace::Delay(delay) => {
                trace!("Next cycle in {:?}", delay);
                self.timer = Some(after(delay));
            }
        }
    }
}
