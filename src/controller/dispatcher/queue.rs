//! # Work Queue
//!
//! Deduplicating, per-key-serializing queue.
//!
//! - An item waiting in the queue is never queued twice (`dirty`).
//! - An item being processed is not handed out again until [`WorkQueue::done`];
//!   adds during processing are remembered and replayed on `done`.
//! - Delayed adds keep the earliest deadline per item.

use std::collections::{HashMap, HashSet, VecDeque};
use std::hash::Hash;
use std::sync::Mutex;
use std::time::Duration;
use tokio::sync::Notify;
use tokio::time::Instant;

#[derive(Debug)]
struct State<T> {
    queue: VecDeque<T>,
    dirty: HashSet<T>,
    processing: HashSet<T>,
    scheduled: HashMap<T, Instant>,
    shutting_down: bool,
}

impl<T: Eq + Hash + Clone> State<T> {
    /// Returns true when a waiter should be woken
    fn add(&mut self, item: T) -> bool {
        if self.shutting_down || self.dirty.contains(&item) {
            return false;
        }
        self.scheduled.remove(&item);
        self.dirty.insert(item.clone());
        if self.processing.contains(&item) {
            return false;
        }
        self.queue.push_back(item);
        true
    }

    fn promote_due(&mut self, now: Instant) -> bool {
        let due: Vec<T> = self
            .scheduled
            .iter()
            .filter(|(_, at)| **at <= now)
            .map(|(item, _)| item.clone())
            .collect();
        let mut woke = false;
        for item in due {
            self.scheduled.remove(&item);
            woke |= self.add(item);
        }
        woke
    }

    fn next_deadline(&self) -> Option<Instant> {
        self.scheduled.values().min().copied()
    }
}

/// Work queue shared by the feed and the workers
#[derive(Debug)]
pub struct WorkQueue<T> {
    state: Mutex<State<T>>,
    notify: Notify,
}

impl<T: Eq + Hash + Clone> Default for WorkQueue<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T: Eq + Hash + Clone> WorkQueue<T> {
    pub fn new() -> Self {
        Self {
            state: Mutex::new(State {
                queue: VecDeque::new(),
                dirty: HashSet::new(),
                processing: HashSet::new(),
                scheduled: HashMap::new(),
                shutting_down: false,
            }),
            notify: Notify::new(),
        }
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, State<T>> {
        // A panic while holding the lock cannot leave the sets inconsistent
        self.state
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner)
    }

    /// Queue `item` for immediate processing
    pub fn add(&self, item: T) {
        let woke = self.lock().add(item);
        if woke {
            self.notify.notify_one();
        }
    }

    /// Queue `item` once `delay` has elapsed
    pub fn add_after(&self, item: T, delay: Duration) {
        if delay.is_zero() {
            self.add(item);
            return;
        }
        let at = Instant::now() + delay;
        {
            let mut state = self.lock();
            if state.shutting_down || state.dirty.contains(&item) {
                return;
            }
            let entry = state.scheduled.entry(item).or_insert(at);
            if at < *entry {
                *entry = at;
            }
        }
        // Let a sleeping worker recompute its deadline
        self.notify.notify_one();
    }

    /// Wait for the next item; `None` once the queue shuts down
    pub async fn next(&self) -> Option<T> {
        loop {
            let notified = self.notify.notified();
            tokio::pin!(notified);
            notified.as_mut().enable();

            let deadline = {
                let mut state = self.lock();
                if state.shutting_down {
                    return None;
                }
                state.promote_due(Instant::now());
                if let Some(item) = state.queue.pop_front() {
                    state.dirty.remove(&item);
                    state.processing.insert(item.clone());
                    let more = !state.queue.is_empty();
                    drop(state);
                    if more {
                        self.notify.notify_one();
                    }
                    return Some(item);
                }
                state.next_deadline()
            };

            match deadline {
                Some(at) => {
                    tokio::select! {
                        () = &mut notified => {}
                        () = tokio::time::sleep_until(at) => {}
                    }
                }
                None => notified.await,
            }
        }
    }

    /// Mark `item` finished; replays an add that arrived while it was processed
    pub fn done(&self, item: &T) {
        let woke = {
            let mut state = self.lock();
            state.processing.remove(item);
            if state.dirty.contains(item) && !state.shutting_down {
                state.queue.push_back(item.clone());
                true
            } else {
                false
            }
        };
        if woke {
            self.notify.notify_one();
        }
    }

    /// Stop handing out items; waiting workers return `None`
    pub fn shutdown(&self) {
        self.lock().shutting_down = true;
        self.notify.notify_waiters();
    }

    pub fn is_shutting_down(&self) -> bool {
        self.lock().shutting_down
    }

    /// Items ready for processing
    pub fn len(&self) -> usize {
        self.lock().queue.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Items waiting for a delayed add to fire
    pub fn scheduled_len(&self) -> usize {
        self.lock().scheduled.len()
    }
}
