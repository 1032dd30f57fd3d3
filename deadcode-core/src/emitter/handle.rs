//! Lifecycle hook handle shared with the host

use std::sync::{Arc, Mutex, MutexGuard};

use super::{EmitStats, Emitter, Transport};

/// Cloneable handle exposing the two host entry points.
///
/// The host registers `on_class_loaded` with its class loading hook and calls
/// `on_shutdown` once while terminating. Appends and flushes run under one
/// lock, so the buffered length stays consistent across threads.
pub struct EmitterHandle<T: Transport> {
    inner: Arc<Mutex<Emitter<T>>>,
}

impl<T: Transport> Clone for EmitterHandle<T> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

impl<T: Transport> EmitterHandle<T> {
    pub fn new(emitter: Emitter<T>) -> Self {
        Self {
            inner: Arc::new(Mutex::new(emitter)),
        }
    }

    /// Invoked once per first-time class resolution
    pub fn on_class_loaded(&self, class: &str) {
        self.lock().record_event(class);
    }

    /// Invoked once at process termination to send what is left
    pub fn on_shutdown(&self) {
        let mut emitter = self.lock();
        let pending = emitter.pending_count();
        emitter.flush();
        tracing::debug!(pending, "Emitter shut down");
    }

    pub fn stats(&self) -> EmitStats {
        self.lock().stats().clone()
    }

    pub fn pending_count(&self) -> usize {
        self.lock().pending_count()
    }

    // A panic elsewhere must not take the host down with it; keep using the
    // emitter state as-is.
    fn lock(&self) -> MutexGuard<'_, Emitter<T>> {
        self.inner
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}
