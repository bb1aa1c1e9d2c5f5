//! Serialized sync worker
//!
//! All mutating operations funnel through one background thread, so at most
//! one pass touches the config file and identity store at a time. Commands
//! queue in submission order; a queued command runs to completion before the
//! next starts.

use crate::engine::SyncEngine;
use crate::progress::{CancelToken, ProgressSink};
use std::sync::Arc;
use std::sync::mpsc::{self, Sender};
use std::thread::{self, JoinHandle};
use sunbridge_config::AppsRepository;
use sunbridge_library::{FilterProvider, GameId, GameLibrary};
use sunbridge_store::IdentityStore;

/// A unit of work for the sync thread.
#[derive(Debug, Clone, PartialEq)]
pub enum SyncCommand {
    /// Run a full reconciliation pass.
    FullSync,

    /// Re-read the config document and drop orphaned identity mappings.
    StoreSync,

    /// Export the given games, pinning them.
    Export(Vec<GameId>),

    /// Remove the given games.
    Remove(Vec<GameId>),

    Pin(Vec<GameId>),
    Unpin(Vec<GameId>),
}

/// Owns the background sync thread.
pub struct SyncWorker;

impl SyncWorker {
    /// Spawn the worker thread and hand back its control handle. The engine
    /// moves onto the thread; all further interaction goes through the
    /// handle's command queue.
    pub fn spawn<L, R, S>(
        mut engine: SyncEngine<L, R, S>,
        progress: Arc<dyn ProgressSink>,
    ) -> SyncHandle
    where
        L: GameLibrary + FilterProvider + Send + 'static,
        R: AppsRepository + Send + 'static,
        S: IdentityStore + Send + 'static,
    {
        let (tx, rx) = mpsc::channel::<SyncCommand>();
        let cancel = CancelToken::new();
        let worker_cancel = cancel.clone();

        let join = thread::spawn(move || {
            while let Ok(command) = rx.recv() {
                tracing::debug!("Sync worker picked up {:?}", command);
                match command {
                    SyncCommand::FullSync => {
                        engine.full_sync(progress.as_ref(), &worker_cancel);
                    }
                    SyncCommand::StoreSync => {
                        if let Err(e) = engine.sync_store() {
                            tracing::error!("Store sync failed: {}", e);
                        }
                    }
                    SyncCommand::Export(ids) => {
                        engine.export_games(&ids, progress.as_ref());
                    }
                    SyncCommand::Remove(ids) => {
                        engine.remove_games(&ids, progress.as_ref());
                    }
                    SyncCommand::Pin(ids) => {
                        engine.pin_games(&ids);
                    }
                    SyncCommand::Unpin(ids) => {
                        engine.unpin_games(&ids);
                    }
                }
                // A cancellation only applies to the command it interrupted.
                worker_cancel.reset();
            }
            tracing::debug!("Sync worker shutting down");
        });

        SyncHandle {
            tx: Some(tx),
            cancel,
            join: Some(join),
        }
    }
}

/// Handle for submitting commands to the worker and shutting it down.
pub struct SyncHandle {
    tx: Option<Sender<SyncCommand>>,
    cancel: CancelToken,
    join: Option<JoinHandle<()>>,
}

impl SyncHandle {
    /// Queue a command. Returns false if the worker has already shut down.
    pub fn submit(&self, command: SyncCommand) -> bool {
        match &self.tx {
            Some(tx) => tx.send(command).is_ok(),
            None => false,
        }
    }

    /// Ask the currently running pass to stop at its next checkpoint.
    /// Queued commands still run afterwards.
    pub fn cancel_current(&self) {
        self.cancel.cancel();
    }

    /// Drain the queue and wait for the worker thread to exit.
    pub fn shutdown(mut self) {
        self.shutdown_inner();
    }

    fn shutdown_inner(&mut self) {
        self.tx.take();
        if let Some(join) = self.join.take() {
            if join.join().is_err() {
                tracing::error!("Sync worker thread panicked");
            }
        }
    }
}

impl Drop for SyncHandle {
    fn drop(&mut self) {
        self.shutdown_inner();
    }
}
