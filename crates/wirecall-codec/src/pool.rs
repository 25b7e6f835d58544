use std::collections::VecDeque;
use std::ops::{Deref, DerefMut};
use std::sync::{Condvar, Mutex};
use std::time::{Duration, Instant};

use bytes::BytesMut;

use crate::error::PoolError;

/// Default number of scratch buffers in circulation.
pub const DEFAULT_POOL_CAPACITY: usize = 100;

/// Default time an `acquire` waits before reporting exhaustion.
pub const DEFAULT_ACQUIRE_TIMEOUT: Duration = Duration::from_secs(60);

const BUFFER_CAPACITY: usize = 8 * 1024;

/// Largest allocation a returning buffer may keep. Anything bigger is
/// replaced with a fresh buffer so one burst of oversized frames cannot
/// pin that memory for the lifetime of the pool.
const MAX_RETAINED_CAPACITY: usize = 64 * 1024;

fn reset_for_shelf(mut buf: BytesMut) -> BytesMut {
    if buf.capacity() > MAX_RETAINED_CAPACITY {
        return BytesMut::with_capacity(BUFFER_CAPACITY);
    }
    buf.clear();
    buf
}

/// Bounded blocking pool of reusable serialization scratch buffers.
///
/// Capacity is fixed at construction. A buffer is exclusively owned by one
/// in-flight call at a time, and the total in circulation (in-pool plus
/// leased) never exceeds the capacity. `acquire` blocks until a buffer is
/// available or the timeout elapses; this is the single suspension point a
/// call passes through. Buffers are cleared on handout and on return, and a
/// buffer that grew well past its original allocation while leased comes
/// back at the baseline size; the pool never inspects contents.
#[derive(Debug)]
pub struct BufferPool {
    shelf: Mutex<VecDeque<BytesMut>>,
    returned: Condvar,
    capacity: usize,
}

impl BufferPool {
    /// Create a pool holding `capacity` pre-allocated buffers.
    pub fn new(capacity: usize) -> Self {
        let mut shelf = VecDeque::with_capacity(capacity);
        for _ in 0..capacity {
            shelf.push_back(BytesMut::with_capacity(BUFFER_CAPACITY));
        }
        Self {
            shelf: Mutex::new(shelf),
            returned: Condvar::new(),
            capacity,
        }
    }

    /// Fixed pool capacity.
    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Buffers currently on the shelf (not leased).
    pub fn available(&self) -> usize {
        self.shelf.lock().unwrap_or_else(|e| e.into_inner()).len()
    }

    /// Take exclusive ownership of a buffer, waiting up to `timeout`.
    ///
    /// The lease returns its buffer on drop, so release happens on every
    /// exit path. Past the timeout this fails with [`PoolError::Exhausted`];
    /// callers must surface that instead of allocating ad hoc.
    pub fn acquire(&self, timeout: Duration) -> Result<BufferLease<'_>, PoolError> {
        let deadline = Instant::now() + timeout;
        let mut shelf = self.shelf.lock().unwrap_or_else(|e| e.into_inner());

        loop {
            if let Some(mut buf) = shelf.pop_front() {
                buf.clear();
                return Ok(BufferLease {
                    pool: self,
                    buf: Some(buf),
                });
            }

            let now = Instant::now();
            if now >= deadline {
                return Err(PoolError::Exhausted { waited: timeout });
            }

            let (guard, wait) = self
                .returned
                .wait_timeout(shelf, deadline - now)
                .unwrap_or_else(|e| e.into_inner());
            shelf = guard;
            if wait.timed_out() && shelf.is_empty() {
                return Err(PoolError::Exhausted { waited: timeout });
            }
        }
    }

    /// Explicitly return a buffer, waiting up to `timeout` if the pool is
    /// transiently over-subscribed. Should not block in the steady state
    /// where acquire and release are paired one-to-one.
    pub fn release(&self, mut buf: BytesMut, timeout: Duration) -> Result<(), PoolError> {
        let deadline = Instant::now() + timeout;
        let mut shelf = self.shelf.lock().unwrap_or_else(|e| e.into_inner());

        loop {
            if shelf.len() < self.capacity {
                shelf.push_back(reset_for_shelf(buf));
                drop(shelf);
                self.returned.notify_one();
                return Ok(());
            }

            let now = Instant::now();
            if now >= deadline {
                return Err(PoolError::ReleaseTimedOut { waited: timeout });
            }

            let (guard, _) = self
                .returned
                .wait_timeout(shelf, deadline - now)
                .unwrap_or_else(|e| e.into_inner());
            shelf = guard;
        }
    }

    fn release_leased(&self, buf: BytesMut) {
        let buf = reset_for_shelf(buf);
        let mut shelf = self.shelf.lock().unwrap_or_else(|e| e.into_inner());
        // A leased buffer always has a reserved slot; this cannot overflow
        // the capacity bound.
        if shelf.len() < self.capacity {
            shelf.push_back(buf);
        }
        drop(shelf);
        self.returned.notify_one();
    }
}

/// Exclusive ownership of one pooled buffer for the duration of a call step.
#[derive(Debug)]
pub struct BufferLease<'a> {
    pool: &'a BufferPool,
    buf: Option<BytesMut>,
}

impl Deref for BufferLease<'_> {
    type Target = BytesMut;

    fn deref(&self) -> &BytesMut {
        self.buf.as_ref().expect("lease holds a buffer until drop")
    }
}

impl DerefMut for BufferLease<'_> {
    fn deref_mut(&mut self) -> &mut BytesMut {
        self.buf.as_mut().expect("lease holds a buffer until drop")
    }
}

impl Drop for BufferLease<'_> {
    fn drop(&mut self) {
        if let Some(buf) = self.buf.take() {
            self.pool.release_leased(buf);
        }
    }
}

#[cfg(test)]
mod tests {
    use std::sync::mpsc;
    use std::sync::Arc;
    use std::thread;

    use super::*;

    #[test]
    fn acquire_and_drop_restore_availability() {
        let pool = BufferPool::new(4);
        assert_eq!(pool.available(), 4);

        {
            let _a = pool.acquire(Duration::from_millis(100)).unwrap();
            let _b = pool.acquire(Duration::from_millis(100)).unwrap();
            assert_eq!(pool.available(), 2);
        }

        assert_eq!(pool.available(), 4);
    }

    #[test]
    fn handed_out_buffers_are_cleared() {
        let pool = BufferPool::new(1);
        {
            let mut lease = pool.acquire(Duration::from_millis(100)).unwrap();
            lease.extend_from_slice(b"leftover");
        }
        let lease = pool.acquire(Duration::from_millis(100)).unwrap();
        assert!(lease.is_empty());
    }

    #[test]
    fn oversized_buffers_shrink_on_return() {
        let pool = BufferPool::new(1);
        {
            let mut lease = pool.acquire(Duration::from_millis(100)).unwrap();
            lease.resize(4 * 1024 * 1024, 0);
        }
        let lease = pool.acquire(Duration::from_millis(100)).unwrap();
        assert!(lease.capacity() <= MAX_RETAINED_CAPACITY);
    }

    #[test]
    fn modestly_grown_buffers_keep_their_allocation() {
        let pool = BufferPool::new(1);
        {
            let mut lease = pool.acquire(Duration::from_millis(100)).unwrap();
            lease.resize(MAX_RETAINED_CAPACITY / 2, 0);
        }
        let lease = pool.acquire(Duration::from_millis(100)).unwrap();
        assert!(lease.capacity() >= MAX_RETAINED_CAPACITY / 2);
    }

    #[test]
    fn explicitly_released_oversized_buffer_shrinks_too() {
        let pool = BufferPool::new(1);
        let mut lease = pool.acquire(Duration::from_millis(100)).unwrap();
        let mut buf = lease.buf.take().unwrap();
        drop(lease);
        buf.resize(4 * 1024 * 1024, 0);

        pool.release(buf, Duration::from_millis(100)).unwrap();
        let lease = pool.acquire(Duration::from_millis(100)).unwrap();
        assert!(lease.capacity() <= MAX_RETAINED_CAPACITY);
    }

    #[test]
    fn exhausted_pool_times_out() {
        let pool = BufferPool::new(2);
        let _a = pool.acquire(Duration::from_millis(100)).unwrap();
        let _b = pool.acquire(Duration::from_millis(100)).unwrap();

        let err = pool.acquire(Duration::from_millis(25)).unwrap_err();
        assert!(matches!(err, PoolError::Exhausted { .. }));
    }

    #[test]
    fn blocked_acquire_wakes_on_release() {
        let pool = Arc::new(BufferPool::new(1));
        let lease = pool.acquire(Duration::from_millis(100)).unwrap();

        let (tx, rx) = mpsc::channel();
        let waiter = {
            let pool = Arc::clone(&pool);
            thread::spawn(move || {
                tx.send(()).unwrap();
                pool.acquire(Duration::from_secs(5)).map(|_| ())
            })
        };

        rx.recv().unwrap();
        thread::sleep(Duration::from_millis(20));
        drop(lease);

        waiter.join().unwrap().unwrap();
        assert_eq!(pool.available(), 1);
    }

    #[test]
    fn explicit_release_returns_buffer() {
        let pool = BufferPool::new(1);
        let mut lease = pool.acquire(Duration::from_millis(100)).unwrap();
        let buf = lease.buf.take().unwrap();
        drop(lease);

        assert_eq!(pool.available(), 0);
        pool.release(buf, Duration::from_millis(100)).unwrap();
        assert_eq!(pool.available(), 1);
    }

    #[test]
    fn over_return_times_out() {
        let pool = BufferPool::new(1);
        let err = pool
            .release(BytesMut::new(), Duration::from_millis(25))
            .unwrap_err();
        assert!(matches!(err, PoolError::ReleaseTimedOut { .. }));
    }

    #[test]
    fn concurrent_acquire_release_stays_bounded() {
        let pool = Arc::new(BufferPool::new(8));
        let threads: Vec<_> = (0..16)
            .map(|_| {
                let pool = Arc::clone(&pool);
                thread::spawn(move || {
                    for _ in 0..50 {
                        let mut lease = pool.acquire(Duration::from_secs(5)).unwrap();
                        lease.extend_from_slice(b"scratch");
                    }
                })
            })
            .collect();

        for t in threads {
            t.join().unwrap();
        }
        assert_eq!(pool.available(), 8);
    }
}
