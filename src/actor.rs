//! Single-owner session thread.
//!
//! A `RecordingSession` is not shareable. Hosts with several producers (a
//! trigger detector on one thread, frame acquisition on another) move the
//! session into a `SessionActor`, which owns it on a dedicated thread and
//! serializes every call through one command queue.

use std::sync::mpsc::{self, Receiver, RecvTimeoutError, Sender};
use std::thread::JoinHandle;
use std::time::Duration;

use crate::clock::Clock;
use crate::encoder::FrameEncoder;
use crate::error::{RecorderError, Result};
use crate::frame::Frame;
use crate::session::{ClipSummary, FrameDisposition, RecordingSession, SessionState, SessionStats};

#[derive(Clone, Debug, Default)]
pub struct ActorConfig {
    /// Run `check_expiry` whenever the queue has been idle this long.
    /// `None` keeps expiry purely lazy.
    pub expiry_poll: Option<Duration>,
}

enum Command {
    Activate {
        duration: Option<Duration>,
        reply: Sender<Result<()>>,
    },
    Frame {
        frame: Frame,
        reply: Sender<Result<FrameDisposition>>,
    },
    Stop {
        reply: Sender<Option<ClipSummary>>,
    },
    State {
        reply: Sender<SessionState>,
    },
    Stats {
        reply: Sender<SessionStats>,
    },
    Shutdown,
}

pub struct SessionActor;

impl SessionActor {
    pub fn spawn<E, C>(
        session: RecordingSession<E, C>,
        config: ActorConfig,
    ) -> Result<(SessionHandle, ActorJoin)>
    where
        E: FrameEncoder + 'static,
        C: Clock + 'static,
    {
        let (tx, rx) = mpsc::channel();
        let thread = std::thread::Builder::new()
            .name("dvr-session".to_string())
            .spawn(move || run(session, rx, config))
            .map_err(RecorderError::ActorSpawn)?;
        Ok((
            SessionHandle { tx: tx.clone() },
            ActorJoin { tx, thread },
        ))
    }
}

fn run<E: FrameEncoder, C: Clock>(
    mut session: RecordingSession<E, C>,
    rx: Receiver<Command>,
    config: ActorConfig,
) -> SessionStats {
    loop {
        let command = match config.expiry_poll {
            Some(poll) => match rx.recv_timeout(poll) {
                Ok(command) => command,
                Err(RecvTimeoutError::Timeout) => {
                    session.check_expiry();
                    continue;
                }
                Err(RecvTimeoutError::Disconnected) => break,
            },
            None => match rx.recv() {
                Ok(command) => command,
                Err(_) => break,
            },
        };

        // Reply failures mean the caller gave up waiting; nothing to do.
        match command {
            Command::Activate { duration, reply } => {
                let _ = reply.send(session.activate(duration));
            }
            Command::Frame { frame, reply } => {
                let _ = reply.send(session.submit_frame(&frame));
            }
            Command::Stop { reply } => {
                let _ = reply.send(session.stop_recording());
            }
            Command::State { reply } => {
                let _ = reply.send(session.state());
            }
            Command::Stats { reply } => {
                let _ = reply.send(session.stats());
            }
            Command::Shutdown => break,
        }
    }

    session.stop_recording();
    log::debug!("session actor stopped");
    session.stats()
}

/// Cloneable handle for submitting work to a `SessionActor`.
#[derive(Clone)]
pub struct SessionHandle {
    tx: Sender<Command>,
}

impl SessionHandle {
    pub fn activate(&self, duration: Option<Duration>) -> Result<()> {
        self.request(|reply| Command::Activate { duration, reply })?
    }

    pub fn submit_frame(&self, frame: Frame) -> Result<FrameDisposition> {
        self.request(|reply| Command::Frame { frame, reply })?
    }

    pub fn stop_recording(&self) -> Result<Option<ClipSummary>> {
        self.request(|reply| Command::Stop { reply })
    }

    pub fn state(&self) -> Result<SessionState> {
        self.request(|reply| Command::State { reply })
    }

    pub fn stats(&self) -> Result<SessionStats> {
        self.request(|reply| Command::Stats { reply })
    }

    fn request<T>(&self, build: impl FnOnce(Sender<T>) -> Command) -> Result<T> {
        let (reply, response) = mpsc::channel();
        self.tx
            .send(build(reply))
            .map_err(|_| RecorderError::ActorGone)?;
        response.recv().map_err(|_| RecorderError::ActorGone)
    }
}

/// Owner of the actor thread. Dropping it without `shutdown` detaches the
/// thread, which exits once every handle is gone.
pub struct ActorJoin {
    tx: Sender<Command>,
    thread: JoinHandle<SessionStats>,
}

impl ActorJoin {
    /// Finalize any open clip, stop the thread and return its final stats.
    pub fn shutdown(self) -> Result<SessionStats> {
        // A send error means the thread already exited; join still reports it.
        let _ = self.tx.send(Command::Shutdown);
        self.thread.join().map_err(|_| RecorderError::ActorGone)
    }
}
