//! Tokio driver for a [`SyncSession`].
//!
//! Spawns one task that owns the session and its host environment, ticks it
//! on an interval and feeds it inbound chat lines and local commands.

use std::time::Duration;

use log::{debug, info};
use thiserror::Error;
use tokio::sync::{mpsc, oneshot};
use tokio::task::JoinHandle;
use tokio::time::{self, Instant, MissedTickBehavior};

use crate::core::{HostEnvironment, ToggleError};
use crate::server::ToggleOutcome;
use crate::session::{SyncSession, SyncStatus};
use crate::transport::Delivery;

/// Default tick period.
pub const DEFAULT_TICK: Duration = Duration::from_millis(100);

/// Capacity of the inbound line and command channels.
const CHANNEL_CAPACITY: usize = 64;

/// Errors from the driver handle.
#[derive(Debug, Error)]
pub enum DriverError {
    /// The driver task has stopped.
    #[error("driver stopped")]
    Stopped,

    /// The toggle was refused.
    #[error(transparent)]
    Toggle(#[from] ToggleError),

    /// The driver task panicked or was cancelled.
    #[error("driver task failed: {0}")]
    Join(#[from] tokio::task::JoinError),
}

enum Command {
    Toggle(oneshot::Sender<Result<ToggleOutcome, ToggleError>>),
    SendTest(String, oneshot::Sender<Delivery>),
    Status(oneshot::Sender<SyncStatus>),
}

/// Cloneable handle for pushing inbound chat lines into the driver.
#[derive(Debug, Clone)]
pub struct LineSender {
    tx: mpsc::Sender<String>,
}

impl LineSender {
    /// Deliver one inbound chat line.
    pub async fn send(&self, line: impl Into<String>) -> Result<(), DriverError> {
        self.tx
            .send(line.into())
            .await
            .map_err(|_| DriverError::Stopped)
    }
}

/// Handle to a running driver task.
///
/// Dropping the handle stops the task.
pub struct Driver<E> {
    lines: LineSender,
    commands: mpsc::Sender<Command>,
    shutdown_tx: Option<oneshot::Sender<()>>,
    task: Option<JoinHandle<(SyncSession, E)>>,
}

impl<E> Driver<E>
where
    E: HostEnvironment + Send + 'static,
{
    /// Spawn a driver ticking every [`DEFAULT_TICK`].
    pub fn spawn(session: SyncSession, env: E) -> Self {
        Self::spawn_with_tick(session, env, DEFAULT_TICK)
    }

    /// Spawn a driver ticking every `tick`.
    pub fn spawn_with_tick(session: SyncSession, env: E, tick: Duration) -> Self {
        let (line_tx, line_rx) = mpsc::channel(CHANNEL_CAPACITY);
        let (command_tx, command_rx) = mpsc::channel(CHANNEL_CAPACITY);
        let (shutdown_tx, shutdown_rx) = oneshot::channel();

        let task = tokio::spawn(run(session, env, tick, line_rx, command_rx, shutdown_rx));

        Self {
            lines: LineSender { tx: line_tx },
            commands: command_tx,
            shutdown_tx: Some(shutdown_tx),
            task: Some(task),
        }
    }

    /// Handle for delivering inbound chat lines.
    pub fn line_sender(&self) -> LineSender {
        self.lines.clone()
    }

    /// Deliver one inbound chat line.
    pub async fn receive_line(&self, line: impl Into<String>) -> Result<(), DriverError> {
        self.lines.send(line).await
    }

    /// Flip owner enforcement.
    pub async fn toggle_enforcement(&self) -> Result<ToggleOutcome, DriverError> {
        let (tx, rx) = oneshot::channel();
        self.command(Command::Toggle(tx)).await?;
        Ok(rx.await.map_err(|_| DriverError::Stopped)??)
    }

    /// Send a `TEST` line.
    pub async fn send_test(&self, payload: impl Into<String>) -> Result<Delivery, DriverError> {
        let (tx, rx) = oneshot::channel();
        self.command(Command::SendTest(payload.into(), tx)).await?;
        rx.await.map_err(|_| DriverError::Stopped)
    }

    /// Current session snapshot.
    pub async fn status(&self) -> Result<SyncStatus, DriverError> {
        let (tx, rx) = oneshot::channel();
        self.command(Command::Status(tx)).await?;
        rx.await.map_err(|_| DriverError::Stopped)
    }

    /// Stop the task and hand back the session and environment.
    pub async fn shutdown(mut self) -> Result<(SyncSession, E), DriverError> {
        if let Some(tx) = self.shutdown_tx.take() {
            let _ = tx.send(());
        }
        let task = self.task.take().ok_or(DriverError::Stopped)?;
        Ok(task.await?)
    }

    async fn command(&self, command: Command) -> Result<(), DriverError> {
        self.commands
            .send(command)
            .await
            .map_err(|_| DriverError::Stopped)
    }
}

impl<E> Drop for Driver<E> {
    fn drop(&mut self) {
        if let Some(tx) = self.shutdown_tx.take() {
            let _ = tx.send(());
        }
    }
}

async fn run<E: HostEnvironment>(
    mut session: SyncSession,
    mut env: E,
    tick: Duration,
    mut lines: mpsc::Receiver<String>,
    mut commands: mpsc::Receiver<Command>,
    mut shutdown_rx: oneshot::Receiver<()>,
) -> (SyncSession, E) {
    let mut interval = time::interval(tick);
    interval.set_missed_tick_behavior(MissedTickBehavior::Delay);
    info!("driver started (tick {tick:?})");

    loop {
        tokio::select! {
            _ = &mut shutdown_rx => break,
            _ = interval.tick() => {
                session.tick(Instant::now().into_std(), &mut env);
            }
            Some(line) = lines.recv() => {
                // decode failures are already logged by the session
                let _ = session.on_receive(&line, Instant::now().into_std(), &mut env);
            }
            Some(command) = commands.recv() => {
                let now = Instant::now().into_std();
                match command {
                    Command::Toggle(reply) => {
                        let _ = reply.send(session.toggle_enforcement(now, &mut env));
                    }
                    Command::SendTest(payload, reply) => {
                        let _ = reply.send(session.send_test(&payload, now, &mut env));
                    }
                    Command::Status(reply) => {
                        let _ = reply.send(session.status());
                    }
                }
            }
        }
    }

    debug!("driver stopped");
    (session, env)
}
