//! Background song loader
//!
//! Requests go in over one channel, decoded songs come back over another.
//! The control loop drains results with [`SongLoader::try_recv`] once per tick.

use std::path::PathBuf;
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::mpsc::{self, Receiver, Sender};
use std::sync::Arc;
use std::thread::{self, JoinHandle};

use super::{load_song_dir, load_song_files, DecodeError};
use crate::transport::SongLoad;

/// What to load
#[derive(Debug, Clone)]
pub enum SongLoadRequest {
    /// Every stem in a folder, song named after the folder
    Directory(PathBuf),
    /// An explicit list of stems
    Files { name: String, paths: Vec<PathBuf> },
}

impl SongLoadRequest {
    pub fn label(&self) -> String {
        match self {
            SongLoadRequest::Directory(dir) => dir.display().to_string(),
            SongLoadRequest::Files { name, .. } => name.clone(),
        }
    }
}

pub struct SongLoadResult {
    /// Human-readable description of the request
    pub label: String,
    pub result: Result<SongLoad, DecodeError>,
}

pub struct SongLoader {
    request_tx: Sender<SongLoadRequest>,
    result_rx: Receiver<SongLoadResult>,
    /// Rate stems are decoded to (the output device rate)
    sample_rate: Arc<AtomicU32>,
    _handle: JoinHandle<()>,
}

impl SongLoader {
    /// Spawn the loader thread
    pub fn spawn(sample_rate: u32) -> std::io::Result<Self> {
        let (request_tx, request_rx) = mpsc::channel::<SongLoadRequest>();
        let (result_tx, result_rx) = mpsc::channel::<SongLoadResult>();
        let rate = Arc::new(AtomicU32::new(sample_rate));
        let thread_rate = rate.clone();

        let handle = thread::Builder::new()
            .name("song-loader".to_string())
            .spawn(move || loader_thread(request_rx, result_tx, thread_rate))?;

        log::info!("SongLoader spawned with sample rate: {} Hz", sample_rate);
        Ok(Self {
            request_tx,
            result_rx,
            sample_rate: rate,
            _handle: handle,
        })
    }

    pub fn set_sample_rate(&self, sample_rate: u32) {
        self.sample_rate.store(sample_rate, Ordering::SeqCst);
    }

    /// Queue a load (non-blocking)
    pub fn load(&self, request: SongLoadRequest) -> Result<(), String> {
        self.request_tx
            .send(request)
            .map_err(|e| format!("Loader thread disconnected: {}", e))
    }

    /// Take one finished load, if any
    pub fn try_recv(&self) -> Option<SongLoadResult> {
        self.result_rx.try_recv().ok()
    }
}

fn loader_thread(rx: Receiver<SongLoadRequest>, tx: Sender<SongLoadResult>, sample_rate: Arc<AtomicU32>) {
    log::info!("Song loader thread started");

    while let Ok(request) = rx.recv() {
        let rate = sample_rate.load(Ordering::SeqCst);
        let label = request.label();
        let start = std::time::Instant::now();

        let result = match request {
            SongLoadRequest::Directory(dir) => load_song_dir(&dir, rate),
            SongLoadRequest::Files { name, paths } => Ok(load_song_files(&name, &paths, rate)),
        };
        log::debug!("Loaded '{}' in {:?}", label, start.elapsed());

        if tx.send(SongLoadResult { label, result }).is_err() {
            break;
        }
    }

    log::info!("Song loader thread exiting");
}
