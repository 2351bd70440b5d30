//! Startup ordering.
//!
//! Essential assets are decoded on a worker thread so the window keeps
//! redrawing; every notification crosses back over a channel and is handed to
//! the observer from [`LoadSequencer::poll`], on the frame-loop thread. Only
//! after `Ready` may the caller build entities and start background streaming.

use std::sync::Arc;
use std::thread;

use crossbeam_channel::{Receiver, TryRecvError};

use crate::assets::{load_essential, AssetSource, LoadError, LoadObserver, LoadProgress, LoadedAssets, ManifestItem};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LoadPhase {
    Idle,
    LoadingEssential,
    Ready,
    /// Terminal. Holds the error message naming the failed item.
    Failed(String),
}

impl LoadPhase {
    pub fn label(&self) -> &str {
        match self {
            Self::Idle => "idle",
            Self::LoadingEssential => "loading",
            Self::Ready => "ready",
            Self::Failed(_) => "failed",
        }
    }
}

enum LoadEvent {
    Progress(LoadProgress),
    Complete,
    Finished(Result<LoadedAssets, LoadError>),
}

/// Forwards observer calls from the worker thread.
struct ChannelObserver {
    tx: crossbeam_channel::Sender<LoadEvent>,
}

impl LoadObserver for ChannelObserver {
    fn on_progress(&mut self, progress: &LoadProgress) {
        let _ = self.tx.send(LoadEvent::Progress(progress.clone()));
    }

    fn on_complete(&mut self) {
        let _ = self.tx.send(LoadEvent::Complete);
    }
}

pub struct LoadSequencer {
    phase: LoadPhase,
    progress: Option<LoadProgress>,
    rx: Option<Receiver<LoadEvent>>,
}

impl LoadSequencer {
    pub fn new() -> Self {
        Self {
            phase: LoadPhase::Idle,
            progress: None,
            rx: None,
        }
    }

    pub fn phase(&self) -> &LoadPhase {
        &self.phase
    }

    /// Last progress seen by [`poll`](Self::poll).
    pub fn progress(&self) -> Option<&LoadProgress> {
        self.progress.as_ref()
    }

    /// Idle -> LoadingEssential. Ignored in any other phase.
    pub fn start(&mut self, source: Arc<dyn AssetSource>, manifest: Vec<ManifestItem>) {
        if self.phase != LoadPhase::Idle {
            log::warn!("Load sequence already started ({})", self.phase.label());
            return;
        }
        let (tx, rx) = crossbeam_channel::unbounded();
        let spawned = thread::Builder::new()
            .name("essential-loader".to_string())
            .spawn(move || {
                let mut observer = ChannelObserver { tx: tx.clone() };
                let result = load_essential(source.as_ref(), &manifest, &mut observer);
                let _ = tx.send(LoadEvent::Finished(result));
            });
        match spawned {
            Ok(_) => {
                log::info!("Loading essential assets");
                self.rx = Some(rx);
                self.phase = LoadPhase::LoadingEssential;
            }
            Err(err) => {
                log::error!("Failed to start essential loader: {}", err);
                self.phase = LoadPhase::Failed(err.to_string());
            }
        }
    }

    /// Drain pending events into `observer`. Returns the decoded assets on the
    /// one call that moves the sequence to `Ready`.
    pub fn poll(&mut self, observer: &mut dyn LoadObserver) -> Option<LoadedAssets> {
        loop {
            let rx = self.rx.as_ref()?;
            let event = match rx.try_recv() {
                Ok(event) => event,
                Err(TryRecvError::Empty) => return None,
                Err(TryRecvError::Disconnected) => {
                    log::error!("Essential loader exited without a result");
                    self.phase = LoadPhase::Failed("loader thread exited".to_string());
                    self.rx = None;
                    return None;
                }
            };
            match event {
                LoadEvent::Progress(progress) => {
                    observer.on_progress(&progress);
                    self.progress = Some(progress);
                }
                LoadEvent::Complete => observer.on_complete(),
                LoadEvent::Finished(result) => {
                    self.rx = None;
                    return match result {
                        Ok(assets) => {
                            log::info!("Essential assets ready ({} items)", assets.len());
                            self.phase = LoadPhase::Ready;
                            Some(assets)
                        }
                        Err(err) => {
                            log::error!("Startup halted: {}", err);
                            self.phase = LoadPhase::Failed(err.to_string());
                            None
                        }
                    };
                }
            }
        }
    }
}

impl Default for LoadSequencer {
    fn default() -> Self {
        Self::new()
    }
}
