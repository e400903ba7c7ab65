// ── Reactive entity streams ──
//
// Subscription handle for a registry's entity views.

use std::pin::Pin;
use std::task::{Context, Poll};

use futures_core::Stream;
use tokio::sync::watch;
use tokio_stream::wrappers::WatchStream;

use crate::entity::EntityViews;

/// A subscription to one pool's entity views.
///
/// Provides both point-in-time snapshot access and reactive change
/// notification via [`changed()`](Self::changed) or by converting to a `Stream`.
pub struct MeasurementStream {
    current: EntityViews,
    receiver: watch::Receiver<EntityViews>,
}

impl MeasurementStream {
    pub(crate) fn new(receiver: watch::Receiver<EntityViews>) -> Self {
        let current = receiver.borrow().clone();
        Self { current, receiver }
    }

    /// The snapshot captured at creation (or at the last `changed()`).
    pub fn current(&self) -> &EntityViews {
        &self.current
    }

    /// The latest snapshot, which may be newer than `current()`.
    pub fn latest(&self) -> EntityViews {
        self.receiver.borrow().clone()
    }

    /// Wait for the next change. `None` once the registry is dropped.
    pub async fn changed(&mut self) -> Option<EntityViews> {
        self.receiver.changed().await.ok()?;
        let snap = self.receiver.borrow_and_update().clone();
        self.current = snap.clone();
        Some(snap)
    }

    pub fn into_stream(self) -> MeasurementWatchStream {
        MeasurementWatchStream {
            inner: WatchStream::new(self.receiver),
        }
    }
}

/// `Stream` adapter yielding a fresh view snapshot on every registry mutation.
pub struct MeasurementWatchStream {
    inner: WatchStream<EntityViews>,
}

impl Stream for MeasurementWatchStream {
    type Item = EntityViews;

    fn poll_next(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        Pin::new(&mut self.inner).poll_next(cx)
    }
}
