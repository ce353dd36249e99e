//! Availability event fan-out
//!
//! Every subscriber gets its own ordered view of the events published after
//! it subscribed. Buffers are bounded: a subscriber that falls more than
//! `buffer_size` events behind loses the oldest ones and resumes from the
//! oldest event still buffered. Availability is a latest-value-wins signal,
//! so clients that care can re-fetch the book.

use std::{
    pin::Pin,
    task::{ready, Context, Poll},
};

use tokio::sync::broadcast;
use tokio_stream::{
    wrappers::{errors::BroadcastStreamRecvError, BroadcastStream},
    Stream,
};

use crate::models::AvailabilityEvent;

/// Fan-out of availability changes. Only the inventory coordinator
/// publishes; everyone else subscribes.
///
/// ```compile_fail
/// use libris_server::services::availability::AvailabilityBroadcaster;
///
/// let broadcaster = AvailabilityBroadcaster::new(8);
/// broadcaster.publish(1, false);
/// ```
#[derive(Clone)]
pub struct AvailabilityBroadcaster {
    sender: broadcast::Sender<AvailabilityEvent>,
}

impl AvailabilityBroadcaster {
    pub fn new(buffer_size: usize) -> Self {
        let (sender, _) = broadcast::channel(buffer_size.max(1));
        Self { sender }
    }

    /// Queue the event for every current subscriber without waiting.
    /// Returns how many subscribers it was queued for.
    pub(crate) fn publish(&self, book_id: i64, available: bool) -> usize {
        let event = AvailabilityEvent::new(book_id, available);
        match self.sender.send(event) {
            Ok(receivers) => {
                tracing::debug!(book_id, available, receivers, "Availability change published");
                receivers
            }
            // No subscribers; nothing is retained
            Err(_) => 0,
        }
    }

    /// Start a new subscription; it sees only events published from now on
    pub fn subscribe(&self) -> AvailabilitySubscription {
        AvailabilitySubscription {
            inner: BroadcastStream::new(self.sender.subscribe()),
        }
    }

    pub fn subscriber_count(&self) -> usize {
        self.sender.receiver_count()
    }
}

/// Live stream of availability events; dropping it unsubscribes
pub struct AvailabilitySubscription {
    inner: BroadcastStream<AvailabilityEvent>,
}

impl Stream for AvailabilitySubscription {
    type Item = AvailabilityEvent;

    fn poll_next(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        let this = self.get_mut();
        loop {
            match ready!(Pin::new(&mut this.inner).poll_next(cx)) {
                Some(Ok(event)) => return Poll::Ready(Some(event)),
                Some(Err(BroadcastStreamRecvError::Lagged(skipped))) => {
                    tracing::warn!(skipped, "Availability subscriber lagged, oldest events dropped");
                }
                None => return Poll::Ready(None),
            }
        }
    }
}
