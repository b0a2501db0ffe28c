//! IPC Server module
//!
//! Drives a [`Player`] from JSON-lines commands on stdin and reports its
//! events on stdout. A dedicated writer thread owns the output, so event
//! handlers on the scheduler thread never block on I/O.

use std::io::{BufRead, Write};
use std::thread;

use anyhow::{anyhow, Result};
use crossbeam_channel::{unbounded, Receiver, Sender};
use tracing::{debug, error, info, warn};

use crate::error::PlayerError;
use crate::events::EventKind;
use crate::playback::Player;

use super::protocol::{error_codes, IpcMessage};

const EVENT_KINDS: [EventKind; 5] = [
    EventKind::Error,
    EventKind::Metadata,
    EventKind::Start,
    EventKind::Frame,
    EventKind::End,
];

/// IPC server for a controlling process
pub struct IpcServer {
    player: Player,
}

impl IpcServer {
    /// Create a new IPC server
    pub fn new(player: Player) -> Self {
        Self { player }
    }

    /// Run the server using stdin/stdout
    pub fn run_stdio(self) -> Result<()> {
        info!("Starting stdio IPC server");
        let stdin = std::io::stdin();
        self.run(stdin.lock(), std::io::stdout())
    }

    /// Serve commands from `input` until EOF or `shutdown`
    pub fn run<R, W>(self, input: R, output: W) -> Result<()>
    where
        R: BufRead,
        W: Write + Send + 'static,
    {
        let IpcServer { player } = self;
        let (out_tx, out_rx) = unbounded();
        let writer = thread::Builder::new()
            .name("videodemux-ipc-writer".to_string())
            .spawn(move || write_messages(out_rx, output))?;

        forward_events(&player, &out_tx)?;
        let _ = out_tx.send(IpcMessage::ready());

        for line in input.lines() {
            let line = match line {
                Ok(line) => line,
                Err(e) => {
                    error!("Failed to read from stdin: {}", e);
                    break;
                }
            };
            let line = line.trim();
            if line.is_empty() {
                continue;
            }

            debug!("Received: {}", line);

            match IpcMessage::from_json(line) {
                Ok(IpcMessage::Shutdown) => {
                    info!("Received shutdown command");
                    break;
                }
                Ok(msg) => {
                    if let Some(reply) = handle_message(&player, msg) {
                        let _ = out_tx.send(reply);
                    }
                }
                Err(e) => {
                    warn!("Failed to parse message: {}", e);
                    let _ = out_tx.send(IpcMessage::error(
                        error_codes::PARSE_ERROR,
                        format!("Parse error: {}", e),
                    ));
                }
            }
        }

        // The handlers hold senders too; the writer drains once all are gone
        drop(player);
        drop(out_tx);
        writer
            .join()
            .map_err(|_| anyhow!("IPC writer thread panicked"))??;

        info!("Stdio IPC server stopped");
        Ok(())
    }
}

/// Subscribe to every event kind, turning events into outgoing messages
pub fn forward_events(player: &Player, out: &Sender<IpcMessage>) -> Result<(), PlayerError> {
    for kind in EVENT_KINDS {
        let out = out.clone();
        player.on(kind, move |event| {
            let _ = out.send(IpcMessage::from_event(event));
        })?;
    }
    Ok(())
}

/// Apply one client message; returns the direct reply, if any
fn handle_message(player: &Player, msg: IpcMessage) -> Option<IpcMessage> {
    let result = match msg {
        IpcMessage::Load { path } => player.load(&path).map(|_| ()),
        IpcMessage::Start => player.start(),
        IpcMessage::Pause => player.pause(),
        IpcMessage::Stop => player.stop(),
        IpcMessage::Seek { timestamp } => player.seek(timestamp),
        IpcMessage::Status => return Some(IpcMessage::StateUpdate(player.status())),
        other => {
            warn!("Ignoring unexpected message: {:?}", other);
            return Some(IpcMessage::error(
                error_codes::UNEXPECTED_MESSAGE,
                "message is not a command",
            ));
        }
    };

    match result {
        Ok(()) => None,
        // Already reported through the error event
        Err(PlayerError::Source(_)) => None,
        Err(e) => Some(IpcMessage::error(error_codes::COMMAND_FAILED, e.to_string())),
    }
}

fn write_messages<W: Write>(messages: Receiver<IpcMessage>, mut output: W) -> Result<()> {
    for msg in messages {
        let json = msg.to_json()?;
        writeln!(output, "{}", json)?;
        output.flush()?;
    }
    Ok(())
}
