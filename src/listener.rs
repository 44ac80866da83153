//! Listener plumbing (spec §6 "Listeners", expansion §2a).
//!
//! Grounded on the teacher's `display_level` callback convention
//! (`src/io/prefs.rs` in the teacher), generalized into a trait object the
//! pipeline can call without depending on any UI-formatting crate — the
//! excluded "progress listeners / UI formatting" collaborator only needs to
//! implement this trait.

use std::panic::{catch_unwind, AssertUnwindSafe};
use std::time::Duration;

/// Which checksum kind accompanies a `BlockInfo` event, if any.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HashKind {
    None,
    Xxh32,
    Xxh64,
}

/// Pipeline lifecycle events a [`Listener`] may observe (spec §6).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EventKind {
    BeforeTransform,
    AfterTransform,
    BeforeEntropy,
    AfterEntropy,
    CompressionStart,
    CompressionEnd,
    DecompressionStart,
    DecompressionEnd,
    AfterHeaderDecoding,
    BlockInfo,
}

/// Payload delivered with every listener callback.
#[derive(Debug, Clone)]
pub struct Event {
    pub kind: EventKind,
    pub block_id: u64,
    pub size: usize,
    pub hash: Option<u64>,
    pub hash_kind: HashKind,
    pub elapsed: Duration,
}

/// Capability implemented by progress/UI collaborators.
///
/// The pipeline calls `on_event` synchronously from whichever thread
/// produced the event (a worker thread for per-block events, the calling
/// thread for start/end events). A panicking listener must not abort
/// compression: [`notify`] catches unwinds and logs them instead, mirroring
/// the spec's "Listener exceptions are swallowed".
pub trait Listener: Send + Sync {
    fn on_event(&self, event: &Event);
}

/// Calls `listener.on_event(event)`, swallowing any panic raised inside.
pub fn notify(listener: &dyn Listener, event: &Event) {
    let result = catch_unwind(AssertUnwindSafe(|| listener.on_event(event)));
    if result.is_err() {
        log::warn!("listener panicked while handling {:?}; ignoring", event.kind);
    }
}

/// A listener that does nothing; the default when the caller supplies none.
pub struct NullListener;

impl Listener for NullListener {
    fn on_event(&self, _event: &Event) {}
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    struct CountingListener(AtomicUsize);

    impl Listener for CountingListener {
        fn on_event(&self, _event: &Event) {
            self.0.fetch_add(1, Ordering::SeqCst);
        }
    }

    struct PanickingListener;

    impl Listener for PanickingListener {
        fn on_event(&self, _event: &Event) {
            panic!("boom");
        }
    }

    fn sample_event() -> Event {
        Event {
            kind: EventKind::BlockInfo,
            block_id: 0,
            size: 16,
            hash: None,
            hash_kind: HashKind::None,
            elapsed: Duration::from_millis(1),
        }
    }

    #[test]
    fn null_listener_does_nothing() {
        notify(&NullListener, &sample_event());
    }

    #[test]
    fn counting_listener_observes_event() {
        let l = CountingListener(AtomicUsize::new(0));
        notify(&l, &sample_event());
        assert_eq!(l.0.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn panicking_listener_is_swallowed() {
        // Must not propagate the panic to the caller.
        notify(&PanickingListener, &sample_event());
    }
}
