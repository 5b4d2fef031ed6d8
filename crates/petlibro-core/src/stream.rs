// Change feeds for the device registry and the snapshot store.

use std::sync::Arc;

use futures_util::Stream;
use tokio::sync::watch;
use tokio_stream::wrappers::WatchStream;

/// Shared list published by the registry and the store.
pub type Published<T> = Arc<Vec<Arc<T>>>;

/// Follows one published list.
///
/// Holds the list it last saw, so a slow reader works from a stable
/// view while writers keep publishing. Intermediate lists may be
/// skipped; only the most recent one is ever delivered.
pub struct Subscription<T: Send + Sync + 'static> {
    seen: Published<T>,
    rx: watch::Receiver<Published<T>>,
}

impl<T: Send + Sync + 'static> Subscription<T> {
    pub(crate) fn new(rx: watch::Receiver<Published<T>>) -> Self {
        let seen = rx.borrow().clone();
        Self { seen, rx }
    }

    /// The list as of subscribing or the last [`changed`](Self::changed).
    pub fn current(&self) -> &Published<T> {
        &self.seen
    }

    /// Whatever is published right now, without marking it seen.
    pub fn latest(&self) -> Published<T> {
        self.rx.borrow().clone()
    }

    /// Next published list. `None` when the publisher is gone.
    pub async fn changed(&mut self) -> Option<Published<T>> {
        if self.rx.changed().await.is_err() {
            return None;
        }
        self.seen = self.rx.borrow_and_update().clone();
        Some(Arc::clone(&self.seen))
    }

    /// Yields the current list first, then each new one.
    pub fn into_stream(self) -> impl Stream<Item = Published<T>> {
        WatchStream::new(self.rx)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use futures_util::StreamExt;

    use super::*;

    fn list(values: &[u32]) -> Published<u32> {
        Arc::new(values.iter().copied().map(Arc::new).collect())
    }

    #[tokio::test]
    async fn changed_keeps_only_the_newest_list() {
        let (tx, rx) = watch::channel(list(&[1]));
        let mut sub = Subscription::new(rx);

        tx.send_replace(list(&[1, 2]));
        tx.send_replace(list(&[1, 2, 3]));
        assert_eq!(sub.current().len(), 1);
        assert_eq!(sub.latest().len(), 3);

        let next = sub.changed().await.unwrap();
        assert_eq!(next.len(), 3);
        assert_eq!(sub.current().len(), 3);

        drop(tx);
        assert!(sub.changed().await.is_none());
    }

    #[tokio::test]
    async fn stream_starts_with_the_current_list() {
        let (tx, rx) = watch::channel(list(&[7]));
        let mut stream = Box::pin(Subscription::new(rx).into_stream());

        assert_eq!(*stream.next().await.unwrap()[0], 7);
        tx.send_replace(list(&[8, 9]));
        assert_eq!(stream.next().await.unwrap().len(), 2);
        drop(tx);
        assert!(stream.next().await.is_none());
    }
}
