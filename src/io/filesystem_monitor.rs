//=========================================================================
// Filesystem Monitor
//=========================================================================
//
// Pump source that reports file creation, removal and update under one or
// more watched directories.
//
// Architecture:
//   notify watcher thread ──→ crossbeam channel ──→ poll() (bounded drain)
//                                                      ↓
//                                        ChangeTranslator → coalesce → post
//
// Translation:
//   Create                → FileCreation
//   Remove                → FileRemoval
//   Rename (from / to)    → FileRemoval(old) / FileCreation(new)
//   Modify (data, meta…)  → FileUpdate
//   Access / Any / Other  → ignored
//
// Names are reported relative to the watched root they fall under.
// Consecutive identical updates within one poll collapse into one.
//
//=========================================================================

//=== External Dependencies ===============================================

use std::fmt;
use std::path::{Path, PathBuf};

use crossbeam_channel::{unbounded, Receiver, TryRecvError};
use log::{debug, info, trace, warn};
use notify::event::{EventKind as NotifyKind, ModifyKind, RenameMode};
use notify::{RecommendedWatcher, RecursiveMode, Watcher};

//=== Internal Dependencies ===============================================

use super::event::{Event, FileCreation, FileRemoval, FileUpdate};
use super::message_pump::{EventSink, PollStatus, PumpSource};

//=== Constants ===========================================================

/// Upper bound on native notifications drained per poll.
const MAX_NOTIFICATIONS_PER_POLL: usize = 100;

type Notification = notify::Result<notify::Event>;

//=== MonitorError ========================================================

#[derive(Debug)]
pub enum MonitorError {
    /// The platform watcher could not be created.
    Create(notify::Error),

    /// A path could not be watched (missing, not a directory, no access).
    Watch { path: PathBuf, source: notify::Error },
}

impl fmt::Display for MonitorError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Create(e) => write!(f, "Filesystem watcher creation failed: {}", e),
            Self::Watch { path, source } => {
                write!(f, "Cannot watch '{}': {}", path.display(), source)
            }
        }
    }
}

impl std::error::Error for MonitorError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::Create(e) => Some(e),
            Self::Watch { source, .. } => Some(source),
        }
    }
}

//=== FilesystemMonitor ===================================================

/// Watches directories and forwards their changes into the pump.
pub struct FilesystemMonitor {
    watcher: RecommendedWatcher,
    receiver: Receiver<Notification>,
    translator: ChangeTranslator,
}

impl FilesystemMonitor {
    pub fn new() -> Result<Self, MonitorError> {
        let (sender, receiver) = unbounded();
        let watcher = notify::recommended_watcher(move |res: Notification| {
            // The receiver only goes away with the monitor itself.
            let _ = sender.send(res);
        })
        .map_err(MonitorError::Create)?;

        debug!(target: "fs_monitor", "Filesystem monitor created");

        Ok(Self {
            watcher,
            receiver,
            translator: ChangeTranslator::default(),
        })
    }

    /// Watches the direct children of `path`.
    ///
    /// On failure the watch stays inactive and nothing is reported for
    /// `path`.
    pub fn watch(&mut self, path: impl AsRef<Path>) -> Result<(), MonitorError> {
        self.watch_with(path.as_ref(), RecursiveMode::NonRecursive)
    }

    /// Watches `path` and everything below it.
    pub fn watch_recursive(&mut self, path: impl AsRef<Path>) -> Result<(), MonitorError> {
        self.watch_with(path.as_ref(), RecursiveMode::Recursive)
    }

    /// Stops watching `path`. Unknown paths are ignored.
    pub fn unwatch(&mut self, path: impl AsRef<Path>) {
        let root = canonical(path.as_ref());
        if self.translator.remove_root(&root) {
            if let Err(e) = self.watcher.unwatch(&root) {
                debug!(target: "fs_monitor", "Unwatch '{}' failed: {}", root.display(), e);
            }
            info!(target: "fs_monitor", "Stopped watching '{}'", root.display());
        }
    }

    pub fn roots(&self) -> &[PathBuf] {
        &self.translator.roots
    }

    fn watch_with(&mut self, path: &Path, mode: RecursiveMode) -> Result<(), MonitorError> {
        let root = canonical(path);

        if let Err(source) = self.watcher.watch(&root, mode) {
            warn!(target: "fs_monitor", "Cannot watch '{}': {}", path.display(), source);
            return Err(MonitorError::Watch {
                path: path.to_path_buf(),
                source,
            });
        }

        info!(target: "fs_monitor", "Watching '{}' ({:?})", root.display(), mode);
        self.translator.add_root(root);
        Ok(())
    }
}

impl PumpSource for FilesystemMonitor {
    fn poll(&mut self, sink: &mut dyn EventSink) -> PollStatus {
        drain(&self.receiver, &self.translator, sink)
    }
}

//=== Polling =============================================================

fn drain(receiver: &Receiver<Notification>, translator: &ChangeTranslator, sink: &mut dyn EventSink) -> PollStatus {
    let mut batch = ChangeBatch::default();
    let mut drained = 0;
    let mut status = PollStatus::Ready;

    while drained < MAX_NOTIFICATIONS_PER_POLL {
        match receiver.try_recv() {
            Ok(Ok(notification)) => {
                trace!(target: "fs_monitor", "Native {:?} {:?}", notification.kind, notification.paths);
                translator.translate(&notification, &mut batch);
                drained += 1;
            }
            Ok(Err(e)) => {
                warn!(target: "fs_monitor", "Watcher error: {}", e);
                drained += 1;
            }
            Err(TryRecvError::Empty) => break,
            Err(TryRecvError::Disconnected) => {
                status = PollStatus::EndOfStream;
                break;
            }
        }
    }

    if drained >= MAX_NOTIFICATIONS_PER_POLL {
        warn!(target: "fs_monitor", "Change backlog: drained {} notifications this poll", drained);
    }

    for event in batch.events {
        sink.post(event);
    }

    status
}

//=== ChangeBatch =========================================================

/// Events translated during one poll.
#[derive(Default)]
struct ChangeBatch {
    events: Vec<Event>,
}

impl ChangeBatch {
    /// Appends an event, dropping an update identical to the previous one.
    fn push(&mut self, event: Event) {
        if event.is::<FileUpdate>() && self.events.last() == Some(&event) {
            return;
        }
        self.events.push(event);
    }
}

//=== ChangeTranslator ====================================================

/// Maps native notifications onto file events relative to watched roots.
#[derive(Debug, Default)]
struct ChangeTranslator {
    roots: Vec<PathBuf>,
}

impl ChangeTranslator {
    fn add_root(&mut self, root: PathBuf) {
        if !self.roots.contains(&root) {
            self.roots.push(root);
        }
    }

    fn remove_root(&mut self, root: &Path) -> bool {
        let before = self.roots.len();
        self.roots.retain(|r| r != root);
        self.roots.len() != before
    }

    fn translate(&self, notification: &notify::Event, batch: &mut ChangeBatch) {
        match &notification.kind {
            NotifyKind::Create(_) => self.emit_all(notification, batch, created),
            NotifyKind::Remove(_) => self.emit_all(notification, batch, removed),
            NotifyKind::Modify(ModifyKind::Name(mode)) => self.rename(*mode, notification, batch),
            NotifyKind::Modify(_) => self.emit_all(notification, batch, updated),
            NotifyKind::Access(_) | NotifyKind::Any | NotifyKind::Other => {}
        }
    }

    fn rename(&self, mode: RenameMode, notification: &notify::Event, batch: &mut ChangeBatch) {
        match mode {
            RenameMode::From => self.emit_all(notification, batch, removed),
            RenameMode::To => self.emit_all(notification, batch, created),
            RenameMode::Both => {
                let mut paths = notification.paths.iter();
                if let Some(name) = paths.next().and_then(|p| self.relative(p)) {
                    batch.push(removed(name));
                }
                if let Some(name) = paths.next().and_then(|p| self.relative(p)) {
                    batch.push(created(name));
                }
            }
            // Direction unknown: decide by whether the path still exists.
            RenameMode::Any | RenameMode::Other => {
                for path in &notification.paths {
                    if let Some(name) = self.relative(path) {
                        batch.push(if path.exists() { created(name) } else { removed(name) });
                    }
                }
            }
        }
    }

    fn emit_all(&self, notification: &notify::Event, batch: &mut ChangeBatch, make: fn(PathBuf) -> Event) {
        for path in &notification.paths {
            if let Some(name) = self.relative(path) {
                batch.push(make(name));
            }
        }
    }

    /// Path relative to the deepest root containing it. The roots
    /// themselves, and paths under no current root, are not reported.
    fn relative(&self, path: &Path) -> Option<PathBuf> {
        let root = self
            .roots
            .iter()
            .filter(|root| path.starts_with(root))
            .max_by_key(|root| root.components().count())?;

        let name = path.strip_prefix(root).ok()?;
        if name.as_os_str().is_empty() {
            None
        } else {
            Some(name.to_path_buf())
        }
    }
}

fn created(name: PathBuf) -> Event {
    Event::from(FileCreation { name })
}

fn removed(name: PathBuf) -> Event {
    Event::from(FileRemoval { name })
}

fn updated(name: PathBuf) -> Event {
    Event::from(FileUpdate { name })
}

fn canonical(path: &Path) -> PathBuf {
    path.canonicalize().unwrap_or_else(|_| path.to_path_buf())
}

//=========================================================================
// Unit Tests
//=========================================================================
