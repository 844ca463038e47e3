use crate::SessionEvent;

use futures::Stream;
use metrics::Counter;
use settlement_primitives::SessionId;
use std::{
    pin::Pin,
    task::{ready, Context, Poll},
};
use tokio::sync::broadcast;
use tokio_stream::wrappers::{errors::BroadcastStreamRecvError, BroadcastStream};

/// A stream of the events of a session.
///
/// Backed by a bounded broadcast channel: a subscriber lagging more than the buffer loses the
/// oldest events and resumes with the next retained one. The stream ends once the session
/// leaves `monitoring`, after its [`SessionEvent::SessionEnded`] event.
#[derive(Debug)]
pub struct SessionEventStream {
    session_id: SessionId,
    inner: Option<BroadcastStream<SessionEvent>>,
    dropped: Counter,
}

impl SessionEventStream {
    /// Returns a stream of the events sent after the receiver was created.
    pub(crate) fn new(
        session_id: SessionId,
        receiver: broadcast::Receiver<SessionEvent>,
        dropped: Counter,
    ) -> Self {
        Self { session_id, inner: Some(BroadcastStream::new(receiver)), dropped }
    }

    /// Returns a stream which is already terminated.
    pub(crate) fn closed(session_id: SessionId) -> Self {
        Self { session_id, inner: None, dropped: Counter::noop() }
    }

    /// Returns the session of the stream.
    pub const fn session_id(&self) -> SessionId {
        self.session_id
    }
}

impl Stream for SessionEventStream {
    type Item = SessionEvent;

    fn poll_next(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        let this = self.get_mut();
        let Some(inner) = this.inner.as_mut() else { return Poll::Ready(None) };

        loop {
            match ready!(Pin::new(&mut *inner).poll_next(cx)) {
                Some(Ok(event)) => return Poll::Ready(Some(event)),
                Some(Err(BroadcastStreamRecvError::Lagged(skipped))) => {
                    this.dropped.increment(skipped);
                    tracing::warn!(target: "settlement::coordinator", session = %this.session_id, skipped, "event subscriber lagging, dropped oldest events");
                }
                None => {
                    this.inner = None;
                    return Poll::Ready(None)
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::SessionEndedEvent;
    use futures::StreamExt;
    use settlement_primitives::SessionStatus;

    fn ended(session: u64) -> SessionEvent {
        SessionEvent::SessionEnded(SessionEndedEvent {
            session_id: SessionId(session),
            status: SessionStatus::Completed,
        })
    }

    #[tokio::test]
    async fn test_lagging_subscriber_keeps_newest_events() {
        let (tx, rx) = broadcast::channel(2);
        let mut stream = SessionEventStream::new(SessionId(1), rx, Counter::noop());

        for session in 1..=5 {
            tx.send(ended(session)).unwrap();
        }
        drop(tx);

        let events: Vec<_> = stream.by_ref().map(|event| event.session_id().0).collect().await;
        assert_eq!(events, vec![4, 5]);
        assert!(stream.next().await.is_none());
    }

    #[tokio::test]
    async fn test_closed_stream_is_empty() {
        let mut stream = SessionEventStream::closed(SessionId(9));
        assert_eq!(stream.session_id(), SessionId(9));
        assert!(stream.next().await.is_none());
    }
}
