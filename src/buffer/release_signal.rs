//! One-shot signal completed when a buffer is released.

use std::fmt;
use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;
use std::task::{Context, Poll, Waker};
use std::time::{Duration, Instant};

use parking_lot::{Condvar, Mutex};

type Callback = Box<dyn FnOnce() + Send + 'static>;

/// Completion handle for a buffer's release.
///
/// The buffer owner completes the signal by releasing (or dropping) the
/// buffer. Any number of cloned handles may wait on it from other threads,
/// register callbacks, or `.await` it. Completion happens once; later
/// completions are no-ops.
///
/// # Example
/// ```
/// use codecbuf::BufferAllocator;
///
/// let allocator = BufferAllocator::new();
/// let mut buffer = allocator.allocate_heap(16);
/// let signal = buffer.release_signal();
///
/// let waiter = std::thread::spawn(move || signal.wait());
/// buffer.release();
/// waiter.join().unwrap();
/// ```
#[derive(Clone)]
pub struct ReleaseSignal {
    inner: Arc<SignalInner>,
}

struct SignalInner {
    state: Mutex<SignalState>,
    released: Condvar,
}

#[derive(Default)]
struct SignalState {
    done: bool,
    wakers: Vec<Waker>,
    callbacks: Vec<Callback>,
}

impl ReleaseSignal {
    pub(crate) fn new() -> Self {
        Self {
            inner: Arc::new(SignalInner {
                state: Mutex::new(SignalState::default()),
                released: Condvar::new(),
            }),
        }
    }

    /// Complete the signal. Returns false if it was already complete.
    pub(crate) fn complete(&self) -> bool {
        let (wakers, callbacks) = {
            let mut state = self.inner.state.lock();
            if state.done {
                return false;
            }
            state.done = true;
            (
                std::mem::take(&mut state.wakers),
                std::mem::take(&mut state.callbacks),
            )
        };

        self.inner.released.notify_all();
        for waker in wakers {
            waker.wake();
        }
        for callback in callbacks {
            callback();
        }
        true
    }

    /// Whether the buffer has been released.
    pub fn is_released(&self) -> bool {
        self.inner.state.lock().done
    }

    /// Block the current thread until the buffer is released.
    pub fn wait(&self) {
        let mut state = self.inner.state.lock();
        while !state.done {
            self.inner.released.wait(&mut state);
        }
    }

    /// Block until released or `timeout` elapses.
    ///
    /// Returns true if the buffer was released.
    pub fn wait_timeout(&self, timeout: Duration) -> bool {
        let deadline = Instant::now() + timeout;
        let mut state = self.inner.state.lock();
        while !state.done {
            if self.inner.released.wait_until(&mut state, deadline).timed_out() {
                return state.done;
            }
        }
        true
    }

    /// Run `callback` once the buffer is released.
    ///
    /// Runs immediately on the calling thread if it already is; otherwise on
    /// the thread that releases the buffer.
    pub fn on_release<F>(&self, callback: F)
    where
        F: FnOnce() + Send + 'static,
    {
        let mut state = self.inner.state.lock();
        if state.done {
            drop(state);
            callback();
        } else {
            state.callbacks.push(Box::new(callback));
        }
    }
}

impl Future for ReleaseSignal {
    type Output = ();

    fn poll(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<()> {
        let mut state = self.inner.state.lock();
        if state.done {
            return Poll::Ready(());
        }
        if !state.wakers.iter().any(|w| w.will_wake(cx.waker())) {
            state.wakers.push(cx.waker().clone());
        }
        Poll::Pending
    }
}

impl fmt::Debug for ReleaseSignal {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ReleaseSignal")
            .field("released", &self.is_released())
            .finish()
    }
}
