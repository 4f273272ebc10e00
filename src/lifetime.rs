//! Cooperative cancellation.
//!
//! A [`Lifetime`] is the only cancellation primitive in the crate. Every
//! blocking operation on a pipe-family component selects on
//! [`Lifetime::done`] alongside its data channel, so cancelling wakes all of
//! them at once. Timeouts are layered by the caller: cancel after a deadline.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Weak};

use crossbeam::channel::{self, Receiver, Sender};
use parking_lot::Mutex;

/// A cloneable cancellation token.
///
/// Cancelling is irreversible and idempotent. Children created with
/// [`Lifetime::child`] are cancelled along with their parent, but not the
/// other way around.
#[derive(Clone, Debug)]
pub struct Lifetime {
    inner: Arc<Inner>,
}

#[derive(Debug)]
struct Inner {
    cancelled: AtomicBool,
    // Dropping the sender disconnects `done`, which wakes every `select!`
    // waiting on it. Nothing is ever sent.
    trigger: Mutex<Option<Sender<()>>>,
    done: Receiver<()>,
    children: Mutex<Vec<Weak<Inner>>>,
}

impl Inner {
    fn cancel(&self) {
        if self.cancelled.swap(true, Ordering::AcqRel) {
            return;
        }
        drop(self.trigger.lock().take());
        let children = std::mem::take(&mut *self.children.lock());
        for child in children.iter().filter_map(Weak::upgrade) {
            child.cancel();
        }
    }
}

impl Default for Lifetime {
    fn default() -> Self {
        Self::new()
    }
}

impl Lifetime {
    /// A fresh, live token.
    pub fn new() -> Self {
        let (trigger, done) = channel::bounded(0);
        Self {
            inner: Arc::new(Inner {
                cancelled: AtomicBool::new(false),
                trigger: Mutex::new(Some(trigger)),
                done,
                children: Mutex::new(Vec::new()),
            }),
        }
    }

    /// A token that is cancelled whenever `self` is.
    pub fn child(&self) -> Self {
        let child = Self::new();
        {
            let mut children = self.inner.children.lock();
            children.retain(|c| c.strong_count() > 0);
            children.push(Arc::downgrade(&child.inner));
        }
        // The parent may have been cancelled before the child registered.
        if self.is_cancelled() {
            child.cancel();
        }
        child
    }

    /// Fire the token. Safe to call any number of times.
    pub fn cancel(&self) {
        self.inner.cancel();
    }

    /// Whether [`Lifetime::cancel`] has been called.
    pub fn is_cancelled(&self) -> bool {
        self.inner.cancelled.load(Ordering::Acquire)
    }

    /// A channel that becomes disconnected once the token is cancelled.
    ///
    /// Use it as a `recv` arm of `crossbeam::select!`; the arm fires with
    /// `Err(RecvError)` on cancellation.
    pub fn done(&self) -> &Receiver<()> {
        &self.inner.done
    }

    /// Block until the token is cancelled.
    pub fn wait(&self) {
        // Only disconnection can end this; nothing is ever sent.
        let _ = self.inner.done.recv();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::thread;
    use std::time::Duration;

    #[test]
    fn test_cancel_wakes_waiters() {
        let lifetime = Lifetime::new();
        let waiter = {
            let lifetime = lifetime.clone();
            thread::spawn(move || lifetime.wait())
        };
        thread::sleep(Duration::from_millis(10));
        assert!(!lifetime.is_cancelled());
        lifetime.cancel();
        waiter.join().unwrap();
        assert!(lifetime.is_cancelled());
        // Idempotent.
        lifetime.cancel();
    }

    #[test]
    fn test_children_follow_parent() {
        let parent = Lifetime::new();
        let child = parent.child();
        let grandchild = child.child();
        child.cancel();
        assert!(!parent.is_cancelled());
        assert!(grandchild.is_cancelled());

        let other = parent.child();
        parent.cancel();
        assert!(other.is_cancelled());
        assert!(parent.child().is_cancelled());
    }

    #[test]
    fn test_done_is_selectable() {
        let lifetime = Lifetime::new();
        let (_tx, rx) = channel::bounded::<u32>(0);
        lifetime.cancel();
        crossbeam::select! {
            recv(rx) -> _ => panic!("data channel should stay idle"),
            recv(lifetime.done()) -> msg => assert!(msg.is_err()),
        }
    }
}
