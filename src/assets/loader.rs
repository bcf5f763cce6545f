use std::cell::RefCell;
use std::collections::{HashMap, VecDeque};
use std::path::{Path, PathBuf};
use std::rc::Rc;
use std::sync::mpsc;

use anyhow::Context;

use crate::assets::decode::{FrameImage, decode_frame, normalize_rel_path};
use crate::foundation::error::{ScrubError, ScrubResult};
use crate::sequence::template::Attempt;

/// One asynchronous fetch of a frame asset.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct LoadRequest {
    /// Frame index the asset belongs to.
    pub index: u32,
    /// Primary or fallback locator.
    pub attempt: Attempt,
    /// Locator produced by the sequence's path template.
    pub locator: String,
}

/// Result of a [`LoadRequest`], delivered back to the owner thread.
#[derive(Debug)]
pub struct LoadCompletion {
    /// The request this result answers.
    pub request: LoadRequest,
    /// Decoded frame or the reason it could not be produced.
    pub result: ScrubResult<FrameImage>,
}

/// Asset source backing a frame store.
///
/// `start` must not block; results are handed over only through `drain`, which the owner calls
/// from its own thread. A loader may complete requests in any order.
pub trait AssetLoader {
    /// Begin fetching `req`.
    fn start(&mut self, req: LoadRequest);
    /// Move every completion available right now into `out`.
    fn drain(&mut self, out: &mut Vec<LoadCompletion>);
    /// Number of started requests whose completion has not been drained yet.
    fn in_flight(&self) -> usize;
}

/// Reads frames from a directory and decodes them on a dedicated `rayon` pool.
pub struct FsLoader {
    root: PathBuf,
    pool: rayon::ThreadPool,
    tx: mpsc::Sender<LoadCompletion>,
    rx: mpsc::Receiver<LoadCompletion>,
    in_flight: usize,
}

impl FsLoader {
    /// Create a loader resolving locators relative to `root`.
    ///
    /// `threads` overrides the decode worker count; `None` uses rayon defaults.
    pub fn new(root: impl Into<PathBuf>, threads: Option<usize>) -> ScrubResult<Self> {
        if let Some(n) = threads
            && n == 0
        {
            return Err(ScrubError::validation(
                "loader 'threads' must be >= 1 when set",
            ));
        }
        let mut builder = rayon::ThreadPoolBuilder::new()
            .thread_name(|i| format!("framescrub-decode-{i}"));
        if let Some(n) = threads {
            builder = builder.num_threads(n);
        }
        let pool = builder.build().map_err(|e| {
            ScrubError::validation(format!("failed to build rayon thread pool: {e}"))
        })?;
        let (tx, rx) = mpsc::channel();
        Ok(Self {
            root: root.into(),
            pool,
            tx,
            rx,
            in_flight: 0,
        })
    }

    /// Root directory used when resolving locators.
    pub fn root(&self) -> &Path {
        &self.root
    }
}

impl AssetLoader for FsLoader {
    fn start(&mut self, req: LoadRequest) {
        let root = self.root.clone();
        let tx = self.tx.clone();
        self.in_flight += 1;
        self.pool.spawn(move || {
            let result = read_frame_file(&root, &req.locator);
            // receiver gone means the store was torn down; the result is discarded
            let _ = tx.send(LoadCompletion {
                request: req,
                result,
            });
        });
    }

    fn drain(&mut self, out: &mut Vec<LoadCompletion>) {
        while let Ok(done) = self.rx.try_recv() {
            self.in_flight = self.in_flight.saturating_sub(1);
            out.push(done);
        }
    }

    fn in_flight(&self) -> usize {
        self.in_flight
    }
}

/// Read and decode one frame file below `root`.
pub fn read_frame_file(root: &Path, locator: &str) -> ScrubResult<FrameImage> {
    let norm = normalize_rel_path(locator)?;
    let path = root.join(Path::new(&norm));
    let bytes = std::fs::read(&path)
        .with_context(|| format!("read frame bytes from '{}'", path.display()))
        .map_err(|e| ScrubError::load(format!("{e:#}")))?;
    decode_frame(&bytes)
}

/// Serves encoded frames from memory; requests complete on the next `drain`.
#[derive(Debug, Default)]
pub struct MemoryLoader {
    files: HashMap<String, Vec<u8>>,
    queued: VecDeque<LoadRequest>,
}

impl MemoryLoader {
    /// Create an empty loader.
    pub fn new() -> Self {
        Self::default()
    }

    /// Register encoded bytes under `locator`.
    pub fn insert(&mut self, locator: impl Into<String>, bytes: Vec<u8>) {
        self.files.insert(locator.into(), bytes);
    }
}

impl AssetLoader for MemoryLoader {
    fn start(&mut self, req: LoadRequest) {
        self.queued.push_back(req);
    }

    fn drain(&mut self, out: &mut Vec<LoadCompletion>) {
        while let Some(req) = self.queued.pop_front() {
            let result = match self.files.get(&req.locator) {
                Some(bytes) => decode_frame(bytes),
                None => Err(ScrubError::load(format!("no asset at '{}'", req.locator))),
            };
            out.push(LoadCompletion {
                request: req,
                result,
            });
        }
    }

    fn in_flight(&self) -> usize {
        self.queued.len()
    }
}

#[derive(Debug, Default)]
struct ManualState {
    started: Vec<LoadRequest>,
    pending: Vec<LoadRequest>,
    completed: Vec<LoadCompletion>,
}

/// Loader whose requests are resolved explicitly through a [`ManualLoaderHandle`].
///
/// Useful for hosts that fetch assets themselves and for deterministic tests.
#[derive(Debug, Default)]
pub struct ManualLoader {
    state: Rc<RefCell<ManualState>>,
}

/// Shared handle used to inspect and resolve a [`ManualLoader`]'s requests.
#[derive(Clone, Debug)]
pub struct ManualLoaderHandle {
    state: Rc<RefCell<ManualState>>,
}

impl ManualLoader {
    /// Create a loader and the handle that resolves its requests.
    pub fn new() -> (Self, ManualLoaderHandle) {
        let loader = Self::default();
        let handle = ManualLoaderHandle {
            state: Rc::clone(&loader.state),
        };
        (loader, handle)
    }
}

impl AssetLoader for ManualLoader {
    fn start(&mut self, req: LoadRequest) {
        let mut st = self.state.borrow_mut();
        st.started.push(req.clone());
        st.pending.push(req);
    }

    fn drain(&mut self, out: &mut Vec<LoadCompletion>) {
        out.append(&mut self.state.borrow_mut().completed);
    }

    fn in_flight(&self) -> usize {
        let st = self.state.borrow();
        st.pending.len() + st.completed.len()
    }
}

impl ManualLoaderHandle {
    /// Every request ever started, in order.
    pub fn started(&self) -> Vec<LoadRequest> {
        self.state.borrow().started.clone()
    }

    /// Requests started but not yet resolved.
    pub fn pending(&self) -> Vec<LoadRequest> {
        self.state.borrow().pending.clone()
    }

    /// Resolve the pending request for `(index, attempt)` with a decoded frame.
    ///
    /// Returns `false` when no such request is pending.
    pub fn succeed(&self, index: u32, attempt: Attempt, frame: FrameImage) -> bool {
        self.resolve(index, attempt, Ok(frame))
    }

    /// Resolve the pending request for `(index, attempt)` with a load error.
    pub fn fail(&self, index: u32, attempt: Attempt, reason: &str) -> bool {
        self.resolve(index, attempt, Err(ScrubError::load(reason)))
    }

    fn resolve(&self, index: u32, attempt: Attempt, result: ScrubResult<FrameImage>) -> bool {
        let mut st = self.state.borrow_mut();
        let Some(pos) = st
            .pending
            .iter()
            .position(|r| r.index == index && r.attempt == attempt)
        else {
            return false;
        };
        let request = st.pending.remove(pos);
        st.completed.push(LoadCompletion { request, result });
        true
    }
}

#[cfg(test)]
#[path = "../../tests/unit/assets/loader.rs"]
mod tests;
