//! Deferred deallocation for decoded stems
//!
//! Decoded channel buffers are handed to the audio thread as
//! `basedrop::Shared<ChannelBuffer>`. When a channel node is destroyed on the
//! audio thread its buffer is not freed there: the drop only enqueues the
//! pointer, and a background collector thread releases the memory later.
//! A three-minute stereo stem is ~70MB, which is far too much to hand back to
//! the allocator inside a render callback.

use basedrop::{Collector, Handle};
use std::sync::mpsc;
use std::sync::OnceLock;
use std::thread;
use std::time::Duration;

/// How often the collector thread reclaims queued drops
const COLLECT_INTERVAL: Duration = Duration::from_millis(50);

static GC_HANDLE: OnceLock<Handle> = OnceLock::new();

fn init_gc() -> Handle {
    let (tx, rx) = mpsc::channel();

    let spawned = thread::Builder::new()
        .name("stagehand-gc".to_string())
        .spawn(move || {
            // Collector is !Sync, so it has to be created on the thread that runs it
            let mut collector = Collector::new();
            if tx.send(collector.handle()).is_err() {
                return;
            }
            log::info!("Buffer collector thread started");
            loop {
                collector.collect();
                thread::sleep(COLLECT_INTERVAL);
            }
        });

    match spawned.ok().and_then(|_| rx.recv().ok()) {
        Some(handle) => handle,
        None => {
            // Without a collector thread, dropped buffers are simply never reclaimed
            log::error!("Failed to start buffer collector thread; released stems will leak");
            let collector = Collector::new();
            let handle = collector.handle();
            std::mem::forget(collector);
            handle
        }
    }
}

/// Handle used to wrap buffers in `basedrop::Shared`
pub fn gc_handle() -> Handle {
    GC_HANDLE.get_or_init(init_gc).clone()
}
