use std::{
    pin::Pin,
    sync::Arc,
    task::{Context, Poll},
};

use futures::Stream;
use parking_lot::Mutex;
use tokio::sync::mpsc;

/// Thread-safe holder of a value that is only ever replaced whole.
///
/// Readers get an `Arc` snapshot, so they see either the old or the new value.
/// Subscribers receive every published value in publish order.
pub struct Observable<T> {
    shared: Arc<Mutex<Shared<T>>>,
}

struct Shared<T> {
    value: Arc<T>,
    subscribers: Vec<mpsc::UnboundedSender<Arc<T>>>,
}

impl<T> Clone for Observable<T> {
    fn clone(&self) -> Self {
        Self {
            shared: Arc::clone(&self.shared),
        }
    }
}

impl<T: Default> Default for Observable<T> {
    fn default() -> Self {
        Self::new(T::default())
    }
}

impl<T> Observable<T> {
    /// Holder starting at `value`, with no subscribers.
    pub fn new(value: T) -> Self {
        Self {
            shared: Arc::new(Mutex::new(Shared {
                value: Arc::new(value),
                subscribers: Vec::new(),
            })),
        }
    }

    /// Current value.
    pub fn get(&self) -> Arc<T> {
        Arc::clone(&self.shared.lock().value)
    }

    /// Replace the value and notify subscribers.
    pub fn set(&self, value: T) {
        let mut shared = self.shared.lock();
        publish(&mut shared, Arc::new(value));
    }

    /// Replace the value with one derived from the current value.
    ///
    /// `f` runs while the holder is locked, so concurrent updates never see
    /// a stale input. It must not touch this holder itself.
    pub fn update(&self, f: impl FnOnce(&T) -> T) {
        let mut shared = self.shared.lock();
        let next = f(&shared.value);
        publish(&mut shared, Arc::new(next));
    }

    /// Like [`Observable::update`], but `f` may decline by returning `None`,
    /// in which case nothing is published. Returns whether a value was published.
    pub fn update_if(&self, f: impl FnOnce(&T) -> Option<T>) -> bool {
        let mut shared = self.shared.lock();
        match f(&shared.value) {
            Some(next) => {
                publish(&mut shared, Arc::new(next));
                true
            }
            None => false,
        }
    }

    /// Register a subscriber. The current value is delivered first.
    pub fn subscribe(&self) -> Subscription<T> {
        let (tx, rx) = mpsc::unbounded_channel();
        let mut shared = self.shared.lock();
        // receiver is alive, send cannot fail
        let _ = tx.send(Arc::clone(&shared.value));
        shared.subscribers.push(tx);
        Subscription { rx }
    }

    /// Number of live subscribers, as of the last publish.
    pub fn subscriber_count(&self) -> usize {
        self.shared.lock().subscribers.len()
    }
}

fn publish<T>(shared: &mut Shared<T>, value: Arc<T>) {
    shared.value = Arc::clone(&value);
    shared
        .subscribers
        .retain(|tx| tx.send(Arc::clone(&value)).is_ok());
}

/// Ordered feed of values published to an [`Observable`].
pub struct Subscription<T> {
    rx: mpsc::UnboundedReceiver<Arc<T>>,
}

impl<T> Subscription<T> {
    /// Next published value. Returns `None` once the holder is gone.
    pub async fn recv(&mut self) -> Option<Arc<T>> {
        self.rx.recv().await
    }

    /// Next value if one is already queued.
    pub fn try_recv(&mut self) -> Option<Arc<T>> {
        self.rx.try_recv().ok()
    }
}

impl<T> Stream for Subscription<T> {
    type Item = Arc<T>;

    fn poll_next(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        self.rx.poll_recv(cx)
    }
}
