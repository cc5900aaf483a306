//! Bounded FIFO queue with blocking pop and head reinsertion.
//!
//! Producers never block: [`BoundedQueue::push`] fails fast and hands the
//! item back when the queue is full, and [`BoundedQueue::push_timeout`] waits
//! for space. Consumers block in [`BoundedQueue::pop`] or
//! [`BoundedQueue::pop_where`] until an item arrives or their timeout
//! passes.
//!
//! Waiters register for a notification before inspecting the queue, so an
//! item pushed between the check and the wait is never missed.

use std::{collections::VecDeque, time::Duration};

use parking_lot::Mutex;
use tokio::{
    sync::Notify,
    time::{timeout_at, Instant},
};

/// A FIFO queue holding at most `capacity` items.
#[derive(Debug)]
pub struct BoundedQueue<T> {
    items: Mutex<VecDeque<T>>,
    capacity: usize,
    item_ready: Notify,
    space_ready: Notify,
}

impl<T> BoundedQueue<T> {
    /// Creates an empty queue. A capacity of zero rejects every push.
    pub fn new(capacity: usize) -> Self {
        Self {
            items: Mutex::new(VecDeque::with_capacity(capacity.min(4096))),
            capacity,
            item_ready: Notify::new(),
            space_ready: Notify::new(),
        }
    }

    /// Appends `item` at the tail, or returns it when the queue is full.
    pub fn push(&self, item: T) -> Result<(), T> {
        {
            let mut items = self.items.lock();
            if items.len() >= self.capacity {
                return Err(item);
            }
            items.push_back(item);
        }
        self.item_ready.notify_waiters();
        Ok(())
    }

    /// Inserts `item` at the head so it is the next one popped, or returns it
    /// when the queue is full.
    pub fn unshift(&self, item: T) -> Result<(), T> {
        {
            let mut items = self.items.lock();
            if items.len() >= self.capacity {
                return Err(item);
            }
            items.push_front(item);
        }
        self.item_ready.notify_waiters();
        Ok(())
    }

    /// Appends `item`, waiting up to `timeout` for space. `None` waits
    /// indefinitely.
    pub async fn push_timeout(&self, mut item: T, timeout: Option<Duration>) -> Result<(), T> {
        let deadline = timeout.map(|t| Instant::now() + t);
        loop {
            let space = self.space_ready.notified();
            tokio::pin!(space);
            space.as_mut().enable();

            match self.push(item) {
                Ok(()) => return Ok(()),
                Err(rejected) => item = rejected,
            }

            match deadline {
                None => space.await,
                Some(deadline) => {
                    if timeout_at(deadline, space).await.is_err() {
                        return Err(item);
                    }
                },
            }
        }
    }

    /// Removes the head item, waiting up to `timeout` for one to arrive.
    /// `None` waits indefinitely; a zero timeout only checks.
    pub async fn pop(&self, timeout: Option<Duration>) -> Option<T> {
        self.pop_where(|_| true, timeout).await
    }

    /// Removes the first item accepted by `matches`, waiting up to `timeout`
    /// for one to arrive.
    ///
    /// Items the predicate skips keep their exact position, as if they had
    /// been popped and put back at the head.
    pub async fn pop_where<F>(&self, matches: F, timeout: Option<Duration>) -> Option<T>
    where
        F: Fn(&T) -> bool,
    {
        let deadline = timeout.map(|t| Instant::now() + t);
        loop {
            let ready = self.item_ready.notified();
            tokio::pin!(ready);
            ready.as_mut().enable();

            if let Some(item) = self.take_first(&matches) {
                self.space_ready.notify_waiters();
                return Some(item);
            }

            match deadline {
                None => ready.await,
                Some(deadline) => {
                    if timeout_at(deadline, ready).await.is_err() {
                        return None;
                    }
                },
            }
        }
    }

    /// Wakes producers waiting for space.
    pub fn notify_space(&self) {
        self.space_ready.notify_waiters();
    }

    /// Current number of items.
    pub fn len(&self) -> usize {
        self.items.lock().len()
    }

    /// Whether the queue holds no items.
    pub fn is_empty(&self) -> bool {
        self.items.lock().is_empty()
    }

    /// Whether a push would fail right now.
    pub fn is_full(&self) -> bool {
        self.items.lock().len() >= self.capacity
    }

    /// Maximum number of items.
    pub fn capacity(&self) -> usize {
        self.capacity
    }

    fn take_first<F>(&self, matches: &F) -> Option<T>
    where
        F: Fn(&T) -> bool,
    {
        let mut items = self.items.lock();
        let index = items.iter().position(matches)?;
        items.remove(index)
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use super::*;

    #[test]
    fn push_fails_fast_at_capacity() {
        let queue = BoundedQueue::new(2);

        assert!(queue.push(1).is_ok());
        assert!(queue.push(2).is_ok());
        assert_eq!(queue.push(3), Err(3));
        assert_eq!(queue.unshift(0), Err(0));
        assert!(queue.is_full());
        assert_eq!(queue.len(), 2);
    }

    #[test]
    fn zero_capacity_rejects_everything() {
        let queue = BoundedQueue::new(0);
        assert_eq!(queue.push("x"), Err("x"));
        assert!(queue.is_empty());
    }

    #[tokio::test]
    async fn pops_in_fifo_order_with_unshifted_head() {
        let queue = BoundedQueue::new(4);
        queue.push(1).unwrap();
        queue.push(2).unwrap();
        queue.unshift(0).unwrap();

        let zero = Some(Duration::ZERO);
        assert_eq!(queue.pop(zero).await, Some(0));
        assert_eq!(queue.pop(zero).await, Some(1));
        assert_eq!(queue.pop(zero).await, Some(2));
        assert_eq!(queue.pop(zero).await, None);
    }

    #[tokio::test]
    async fn pop_where_leaves_skipped_items_in_place() {
        let queue = BoundedQueue::new(4);
        for n in [1, 2, 3, 4] {
            queue.push(n).unwrap();
        }

        assert_eq!(queue.pop_where(|n| n % 2 == 0, Some(Duration::ZERO)).await, Some(2));
        assert_eq!(queue.pop_where(|n| *n > 10, Some(Duration::ZERO)).await, None);

        let mut rest = Vec::new();
        while let Some(n) = queue.pop(Some(Duration::ZERO)).await {
            rest.push(n);
        }
        assert_eq!(rest, vec![1, 3, 4]);
    }

    #[tokio::test]
    async fn pop_times_out_on_empty_queue() {
        let queue: BoundedQueue<u8> = BoundedQueue::new(1);
        let started = Instant::now();

        assert_eq!(queue.pop(Some(Duration::from_millis(50))).await, None);
        assert!(started.elapsed() >= Duration::from_millis(50));
    }

    #[tokio::test]
    async fn blocked_pop_wakes_on_push() {
        let queue = Arc::new(BoundedQueue::new(1));
        let consumer = {
            let queue = queue.clone();
            tokio::spawn(async move { queue.pop(None).await })
        };

        tokio::time::sleep(Duration::from_millis(20)).await;
        queue.push("hello").unwrap();

        assert_eq!(consumer.await.unwrap(), Some("hello"));
    }

    #[tokio::test]
    async fn filtered_waiters_each_see_their_item() {
        let queue = Arc::new(BoundedQueue::new(4));
        let waiter = |wanted: &'static str| {
            let queue = queue.clone();
            tokio::spawn(async move {
                queue.pop_where(move |s: &&str| *s == wanted, Some(Duration::from_secs(5))).await
            })
        };
        let a = waiter("a");
        let b = waiter("b");

        tokio::time::sleep(Duration::from_millis(20)).await;
        queue.push("b").unwrap();
        queue.push("a").unwrap();

        assert_eq!(a.await.unwrap(), Some("a"));
        assert_eq!(b.await.unwrap(), Some("b"));
    }

    #[tokio::test]
    async fn push_timeout_waits_for_space() {
        let queue = Arc::new(BoundedQueue::new(1));
        queue.push(1).unwrap();

        let producer = {
            let queue = queue.clone();
            tokio::spawn(async move { queue.push_timeout(2, Some(Duration::from_secs(5))).await })
        };

        tokio::time::sleep(Duration::from_millis(20)).await;
        assert_eq!(queue.pop(Some(Duration::ZERO)).await, Some(1));

        assert_eq!(producer.await.unwrap(), Ok(()));
        assert_eq!(queue.pop(Some(Duration::ZERO)).await, Some(2));
    }

    #[tokio::test]
    async fn push_timeout_gives_item_back() {
        let queue = BoundedQueue::new(1);
        queue.push(1).unwrap();

        assert_eq!(queue.push_timeout(2, Some(Duration::from_millis(20))).await, Err(2));
    }
}
