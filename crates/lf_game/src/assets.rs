//! Asset loading: the essential set that gates startup, and best-effort
//! background streaming of decorative models.
//!
//! Both modes are plain blocking functions. Scheduling (which thread runs
//! them, how results reach the frame loop) belongs to the sequencer.

use std::collections::HashMap;
use std::io;
use std::ops::ControlFlow;
use std::path::PathBuf;
use std::sync::Arc;
use std::thread;
use std::time::Duration;

use crossbeam_channel::Receiver;

use crate::font::{decode_font, Font, FontError};
use crate::model::{decode_model, ModelData, ModelError};

#[derive(Debug, thiserror::Error)]
pub enum AssetError {
    #[error("failed to read '{path}': {source}")]
    Io {
        path: String,
        #[source]
        source: io::Error,
    },
    #[error("failed to decode model '{path}': {source}")]
    Model {
        path: String,
        #[source]
        source: ModelError,
    },
    #[error("failed to decode font '{path}': {source}")]
    Font {
        path: String,
        #[source]
        source: FontError,
    },
}

#[derive(Debug, thiserror::Error)]
pub enum LoadError {
    #[error("essential asset '{item}' failed to load: {source}")]
    Essential {
        item: String,
        #[source]
        source: AssetError,
    },
}

/// Where asset bytes come from.
pub trait AssetSource: Send + Sync {
    fn read(&self, path: &str) -> io::Result<Vec<u8>>;
}

/// Reads assets from a directory on disk.
pub struct FsAssetSource {
    root: PathBuf,
}

impl FsAssetSource {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }
}

impl AssetSource for FsAssetSource {
    fn read(&self, path: &str) -> io::Result<Vec<u8>> {
        std::fs::read(self.root.join(path))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AssetKind {
    Model,
    Font,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ManifestItem {
    pub name: String,
    pub kind: AssetKind,
    pub path: String,
}

impl ManifestItem {
    pub fn new(name: &str, kind: AssetKind, path: &str) -> Self {
        Self {
            name: name.to_string(),
            kind,
            path: path.to_string(),
        }
    }
}

#[derive(Debug, Clone)]
pub enum Asset {
    Model(ModelData),
    Font(Font),
}

/// Decoded essential assets keyed by manifest name.
#[derive(Debug, Default)]
pub struct LoadedAssets {
    items: HashMap<String, Asset>,
}

impl LoadedAssets {
    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn take_model(&mut self, name: &str) -> Option<ModelData> {
        match self.items.remove(name) {
            Some(Asset::Model(model)) => Some(model),
            Some(other) => {
                self.items.insert(name.to_string(), other);
                None
            }
            None => None,
        }
    }

    pub fn take_font(&mut self, name: &str) -> Option<Font> {
        match self.items.remove(name) {
            Some(Asset::Font(font)) => Some(font),
            Some(other) => {
                self.items.insert(name.to_string(), other);
                None
            }
            None => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LoadProgress {
    pub total: usize,
    pub loaded: usize,
    pub percentage: u32,
    /// Name of the most recently completed item.
    pub current_item: Option<String>,
}

/// Receives essential-load notifications.
pub trait LoadObserver {
    fn on_progress(&mut self, progress: &LoadProgress);
    fn on_complete(&mut self);
}

/// Counts finished items and guarantees a single completion signal.
#[derive(Debug)]
pub struct ProgressTracker {
    total: usize,
    loaded: usize,
    current_item: Option<String>,
    completed: bool,
}

impl ProgressTracker {
    pub fn new(total: usize) -> Self {
        Self {
            total,
            loaded: 0,
            current_item: None,
            completed: false,
        }
    }

    pub fn progress(&self) -> LoadProgress {
        // An empty manifest counts as fully loaded.
        let percentage = if self.total == 0 {
            100
        } else {
            (self.loaded as f64 / self.total as f64 * 100.0).round() as u32
        };
        LoadProgress {
            total: self.total,
            loaded: self.loaded,
            percentage,
            current_item: self.current_item.clone(),
        }
    }

    pub fn item_done(&mut self, name: &str) -> LoadProgress {
        self.loaded = (self.loaded + 1).min(self.total);
        self.current_item = Some(name.to_string());
        self.progress()
    }

    /// Fire `on_complete` once all items are in. Returns whether it fired now.
    pub fn try_complete(&mut self, observer: &mut dyn LoadObserver) -> bool {
        if self.completed || self.loaded < self.total {
            return false;
        }
        self.completed = true;
        observer.on_complete();
        true
    }
}

pub fn load_item(source: &dyn AssetSource, item: &ManifestItem) -> Result<Asset, AssetError> {
    let bytes = source.read(&item.path).map_err(|source| AssetError::Io {
        path: item.path.clone(),
        source,
    })?;
    match item.kind {
        AssetKind::Model => decode_model(&bytes).map(Asset::Model).map_err(|source| AssetError::Model {
            path: item.path.clone(),
            source,
        }),
        AssetKind::Font => decode_font(&bytes).map(Asset::Font).map_err(|source| AssetError::Font {
            path: item.path.clone(),
            source,
        }),
    }
}

/// Load every manifest item in order. Progress is reported after each item;
/// completion fires once, after the last. The first failure aborts the load.
pub fn load_essential(
    source: &dyn AssetSource,
    manifest: &[ManifestItem],
    observer: &mut dyn LoadObserver,
) -> Result<LoadedAssets, LoadError> {
    let mut tracker = ProgressTracker::new(manifest.len());
    let mut assets = LoadedAssets::default();

    for item in manifest {
        let asset = load_item(source, item).map_err(|source| {
            log::error!("Essential asset '{}' failed: {}", item.name, source);
            LoadError::Essential {
                item: item.name.clone(),
                source,
            }
        })?;
        assets.items.insert(item.name.clone(), asset);

        let progress = tracker.item_done(&item.name);
        log::debug!(
            "Loaded '{}' ({}/{}, {}%)",
            item.name,
            progress.loaded,
            progress.total,
            progress.percentage
        );
        observer.on_progress(&progress);
    }

    tracker.try_complete(observer);
    Ok(assets)
}

#[derive(Debug, Clone)]
pub struct BackgroundItem {
    pub index: usize,
    pub path: String,
    pub model: ModelData,
}

/// Load decorative models one at a time, waiting `stagger` between items.
/// Failures are logged and skipped. `on_each` may stop the run by returning
/// `Break`. Returns how many items were delivered.
pub fn load_background(
    source: &dyn AssetSource,
    paths: &[String],
    stagger: Duration,
    mut on_each: impl FnMut(BackgroundItem) -> ControlFlow<()>,
) -> usize {
    let mut delivered = 0;
    for (index, path) in paths.iter().enumerate() {
        if index > 0 && !stagger.is_zero() {
            thread::sleep(stagger);
        }
        let item = ManifestItem::new(path, AssetKind::Model, path);
        let model = match load_item(source, &item) {
            Ok(Asset::Model(model)) => model,
            Ok(Asset::Font(_)) => continue,
            Err(err) => {
                log::warn!("Background asset skipped: {}", err);
                continue;
            }
        };
        log::info!("Background asset loaded: {}", path);
        if on_each(BackgroundItem {
            index,
            path: path.clone(),
            model,
        })
        .is_break()
        {
            return delivered;
        }
        delivered += 1;
    }
    delivered
}

/// Run [`load_background`] on its own thread. Items arrive on the returned
/// channel; once the receiver is dropped the thread stops at the next item.
pub fn spawn_background(
    source: Arc<dyn AssetSource>,
    paths: Vec<String>,
    stagger: Duration,
) -> io::Result<Receiver<BackgroundItem>> {
    let (tx, rx) = crossbeam_channel::unbounded();
    thread::Builder::new()
        .name("background-loader".to_string())
        .spawn(move || {
            let delivered = load_background(source.as_ref(), &paths, stagger, |item| {
                match tx.send(item) {
                    Ok(()) => ControlFlow::Continue(()),
                    Err(err) => {
                        log::debug!("Background result for '{}' dropped after teardown", err.0.path);
                        ControlFlow::Break(())
                    }
                }
            });
            log::debug!("Background loader finished ({} of {} delivered)", delivered, paths.len());
        })?;
    Ok(rx)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fixtures::{self, MemorySource};

    #[derive(Default)]
    struct Recorder {
        progress: Vec<LoadProgress>,
        completions: usize,
        loaded_at_completion: Option<usize>,
    }

    impl LoadObserver for Recorder {
        fn on_progress(&mut self, progress: &LoadProgress) {
            self.progress.push(progress.clone());
        }

        fn on_complete(&mut self) {
            self.completions += 1;
            self.loaded_at_completion = self.progress.last().map(|p| p.loaded);
        }
    }

    fn manifest() -> Vec<ManifestItem> {
        vec![
            ManifestItem::new("character", AssetKind::Model, "models/soldier.glb"),
            ManifestItem::new("building", AssetKind::Model, "models/building.glb"),
            ManifestItem::new("font", AssetKind::Font, "fonts/bruno_ace_regular.json"),
        ]
    }

    #[test]
    fn progress_increases_by_one_and_completes_once() {
        let source = fixtures::scene_source();
        let mut recorder = Recorder::default();
        let mut assets = load_essential(&source, &manifest(), &mut recorder).unwrap();

        let loaded: Vec<usize> = recorder.progress.iter().map(|p| p.loaded).collect();
        let pct: Vec<u32> = recorder.progress.iter().map(|p| p.percentage).collect();
        assert_eq!(loaded, [1, 2, 3]);
        assert_eq!(pct, [33, 67, 100]);
        assert_eq!(recorder.progress[1].current_item.as_deref(), Some("building"));
        assert_eq!(recorder.completions, 1);
        assert_eq!(recorder.loaded_at_completion, Some(3));

        assert_eq!(assets.len(), 3);
        assert!(assets.take_font("font").is_some());
        assert!(assets.take_model("font").is_none());
        assert!(assets.take_model("character").is_some());
    }

    #[test]
    fn failed_item_is_named_and_completion_never_fires() {
        let mut source = fixtures::scene_source();
        source.insert("models/building.glb", b"broken".to_vec());
        let mut recorder = Recorder::default();

        let err = load_essential(&source, &manifest(), &mut recorder).unwrap_err();
        let LoadError::Essential { item, source } = &err;
        assert_eq!(item, "building");
        assert!(matches!(source, AssetError::Model { .. }));
        assert!(err.to_string().contains("'building'"));
        assert_eq!(recorder.progress.len(), 1);
        assert_eq!(recorder.completions, 0);
    }

    #[test]
    fn missing_file_is_an_io_error() {
        let source = MemorySource::default();
        let item = ManifestItem::new("font", AssetKind::Font, "fonts/none.json");
        assert!(matches!(load_item(&source, &item), Err(AssetError::Io { .. })));
    }

    #[test]
    fn empty_manifest_completes_immediately() {
        let source = MemorySource::default();
        let mut recorder = Recorder::default();
        let assets = load_essential(&source, &[], &mut recorder).unwrap();
        assert_eq!(assets.len(), 0);
        assert!(recorder.progress.is_empty());
        assert_eq!(recorder.completions, 1);
        assert_eq!(ProgressTracker::new(0).progress().percentage, 100);
    }

    #[test]
    fn tracker_completes_only_once() {
        let mut tracker = ProgressTracker::new(1);
        let mut recorder = Recorder::default();
        assert!(!tracker.try_complete(&mut recorder));
        tracker.item_done("a");
        assert!(tracker.try_complete(&mut recorder));
        assert!(!tracker.try_complete(&mut recorder));
        assert_eq!(recorder.completions, 1);
    }

    #[test]
    fn background_skips_failures_and_keeps_order() {
        let mut source = fixtures::scene_source();
        source.insert("models/tree1.glb", fixtures::box_model_glb(&[]));
        source.insert("models/tree3.glb", fixtures::box_model_glb(&[]));
        let paths: Vec<String> = ["models/tree1.glb", "models/tree2.glb", "models/tree3.glb"]
            .iter()
            .map(|s| s.to_string())
            .collect();

        let mut seen = Vec::new();
        let delivered = load_background(&source, &paths, Duration::ZERO, |item| {
            seen.push(item.index);
            ControlFlow::Continue(())
        });
        assert_eq!(delivered, 2);
        assert_eq!(seen, [0, 2]);
    }

    #[test]
    fn background_stops_when_consumer_breaks() {
        let mut source = MemorySource::default();
        source.insert("a.glb", fixtures::box_model_glb(&[]));
        source.insert("b.glb", fixtures::box_model_glb(&[]));
        let paths = vec!["a.glb".to_string(), "b.glb".to_string()];
        let mut calls = 0;
        let delivered = load_background(&source, &paths, Duration::ZERO, |_| {
            calls += 1;
            ControlFlow::Break(())
        });
        assert_eq!(calls, 1);
        assert_eq!(delivered, 0);
    }

    #[test]
    fn spawned_loader_survives_dropped_receiver() {
        let mut source = MemorySource::default();
        source.insert("a.glb", fixtures::box_model_glb(&[]));
        let rx = spawn_background(
            Arc::new(source),
            vec!["a.glb".to_string(), "a.glb".to_string()],
            Duration::from_millis(1),
        )
        .unwrap();
        let first = rx.recv_timeout(Duration::from_secs(5)).unwrap();
        assert_eq!(first.index, 0);
        drop(rx);
    }
}
