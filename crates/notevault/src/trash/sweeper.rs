//! Background expiry sweep.
//!
//! One worker thread per sweeper. It sweeps once on start and then every `interval`.
//! The host drives it through a [`SweeperHandle`]: pausing stops the timer while the
//! process is in the background, resuming sweeps straight away if a full interval
//! went by in the meantime. A missed sweep only means expired records linger a bit
//! longer.
//!
//! Dropping the handle stops the worker and joins it.

use super::Trash;
use crate::model::RetentionPolicy;
use crate::store::backend::StorageBackend;
use flume::{Receiver, RecvTimeoutError, Sender};
use log::{debug, info, warn};
use std::io;
use std::sync::Arc;
use std::thread;
use std::time::{Duration, Instant};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Command {
    Pause,
    Resume,
    SweepNow,
    Shutdown,
}

pub struct TrashSweeper<B> {
    trash: Arc<Trash<B>>,
    policy: RetentionPolicy,
    interval: Duration,
}

impl<B: StorageBackend + 'static> TrashSweeper<B> {
    pub fn new(trash: Arc<Trash<B>>, policy: RetentionPolicy, interval: Duration) -> Self {
        Self {
            trash,
            policy,
            interval,
        }
    }

    /// Starts the worker thread.
    pub fn spawn(
        trash: Arc<Trash<B>>,
        policy: RetentionPolicy,
        interval: Duration,
    ) -> io::Result<SweeperHandle> {
        let sweeper = Self::new(trash, policy, interval);
        let (commands, inbox) = flume::unbounded();
        let join = thread::Builder::new()
            .name("notevault-trash-sweeper".to_string())
            .spawn(move || sweeper.run(inbox))?;
        info!(
            "event=sweeper_started policy={:?} interval_secs={}",
            policy,
            interval.as_secs()
        );
        Ok(SweeperHandle {
            commands,
            join: Some(join),
        })
    }

    fn run(self, inbox: Receiver<Command>) {
        self.sweep();
        let mut last_sweep = Instant::now();
        let mut paused = false;

        loop {
            let next = if paused {
                inbox.recv().map_err(|_| RecvTimeoutError::Disconnected)
            } else {
                inbox.recv_timeout(self.interval.saturating_sub(last_sweep.elapsed()))
            };

            match next {
                Ok(Command::Pause) => {
                    debug!("event=sweeper_paused");
                    paused = true;
                }
                Ok(Command::Resume) => {
                    debug!("event=sweeper_resumed");
                    paused = false;
                    if last_sweep.elapsed() >= self.interval {
                        self.sweep();
                        last_sweep = Instant::now();
                    }
                }
                Ok(Command::SweepNow) | Err(RecvTimeoutError::Timeout) => {
                    self.sweep();
                    last_sweep = Instant::now();
                }
                Ok(Command::Shutdown) | Err(RecvTimeoutError::Disconnected) => break,
            }
        }
        debug!("event=sweeper_stopped");
    }

    fn sweep(&self) {
        if let Err(err) = self.trash.sweep_expired(self.policy) {
            warn!("event=sweep_failed error=\"{}\"", err);
        }
    }
}

/// Control handle for a running [`TrashSweeper`].
pub struct SweeperHandle {
    commands: Sender<Command>,
    join: Option<thread::JoinHandle<()>>,
}

impl SweeperHandle {
    pub fn pause(&self) {
        self.send(Command::Pause);
    }

    pub fn resume(&self) {
        self.send(Command::Resume);
    }

    pub fn sweep_now(&self) {
        self.send(Command::SweepNow);
    }

    /// Stops the worker and waits for an in-flight sweep to finish.
    pub fn shutdown(&mut self) {
        if let Some(join) = self.join.take() {
            self.send(Command::Shutdown);
            if join.join().is_err() {
                warn!("event=sweeper_panicked");
            }
        }
    }

    pub fn is_running(&self) -> bool {
        self.join.as_ref().is_some_and(|join| !join.is_finished())
    }

    fn send(&self, command: Command) {
        if self.commands.send(command).is_err() {
            debug!("event=sweeper_gone command={:?}", command);
        }
    }
}

impl Drop for SweeperHandle {
    fn drop(&mut self) {
        self.shutdown();
    }
}
