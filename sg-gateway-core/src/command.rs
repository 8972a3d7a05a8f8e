//! FIFO command buffer.
//!
//! Every major service funnels its work through one of these: callers enqueue
//! from any task without blocking, a single worker executes the commands in
//! arrival order, so a service's private state is only ever touched from one
//! task at a time.

use std::future::Future;
use std::pin::Pin;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tracing::{debug, trace};

type Command = Pin<Box<dyn Future<Output = ()> + Send>>;

/// Handle to a single-worker command queue. Clones push into the same queue.
#[derive(Clone)]
pub struct CommandBuffer {
    tx: mpsc::UnboundedSender<Command>,
    token: CancellationToken,
}

impl CommandBuffer {
    /// Create the queue and spawn its worker. The worker runs until `stop()`
    /// is called or every handle is dropped; commands still queued at stop
    /// time are discarded, the in-flight command completes.
    pub fn new() -> Self {
        let (tx, mut rx) = mpsc::unbounded_channel::<Command>();
        let token = CancellationToken::new();

        let worker_token = token.clone();
        tokio::spawn(async move {
            loop {
                tokio::select! {
                    _ = worker_token.cancelled() => {
                        debug!("Command buffer worker stopped");
                        break;
                    }
                    command = rx.recv() => match command {
                        Some(command) => command.await,
                        None => break,
                    },
                }
            }
        });

        Self { tx, token }
    }

    /// Enqueue a command. Never blocks; a command pushed after shutdown is
    /// silently dropped.
    pub fn push<F>(&self, command: F)
    where
        F: Future<Output = ()> + Send + 'static,
    {
        if self.tx.send(Box::pin(command)).is_err() {
            trace!("Command dropped: buffer is shut down");
        }
    }

    /// Stop the worker. Queued commands are discarded.
    pub fn stop(&self) {
        self.token.cancel();
    }
}

impl Default for CommandBuffer {
    fn default() -> Self {
        Self::new()
    }
}
