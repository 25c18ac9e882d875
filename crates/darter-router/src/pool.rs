//! Reusable parameter-capture buffers.

use darter_core::Params;
use parking_lot::Mutex;

/// A pool of [`Params`] buffers sized for the router's widest route.
///
/// Buffers are acquired lazily, only when a lookup reaches its first
/// wildcard segment; a route without parameters never touches the pool.
/// Released buffers are logically truncated but keep their storage, so the
/// steady state captures parameters without allocating.
pub(crate) struct ParamsPool {
    free: Mutex<Vec<Params>>,
}

impl ParamsPool {
    pub(crate) fn new() -> Self {
        Self {
            free: Mutex::new(Vec::new()),
        }
    }

    /// Take a buffer able to hold `capacity` parameters.
    pub(crate) fn acquire(&self, capacity: usize) -> Params {
        let recycled = self.free.lock().pop();
        match recycled {
            Some(mut params) => {
                params.reserve(capacity);
                params
            }
            None => Params::with_capacity(capacity),
        }
    }

    /// Return a buffer to the pool.
    pub(crate) fn release(&self, mut params: Params) {
        params.reset();
        self.free.lock().push(params);
    }
}
