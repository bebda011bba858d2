//! Recyclable buffer pool with per-worker caches.
//!
//! A [`RecordPool`] is the shared, mutex-protected free list. Each worker
//! owns a [`WorkerPool`] borrowing it: acquisitions are served from the
//! worker's local cache first and releases go back to it until the cache
//! holds [`LOCAL_CACHE_CEILING`] items, so the shared lock is only taken on
//! cache misses and overflows. Dropping a [`WorkerPool`] drains its cache
//! into the shared pool.
//!
//! With a hard cap, a worker waits for a release only while it holds no
//! items. A worker that already holds items (e.g. the reads of a region it
//! is still fetching) is allocated past the cap, since the release it would
//! wait for could only come from itself.
//!
//! Items whose [`Recycle::SHAREABLE`] is `false` are replaced by fresh ones
//! on their way to the shared pool, so only worker-local cache hits count as
//! reuse for them.

use std::sync::atomic::{
    AtomicUsize,
    Ordering,
};
use std::sync::{
    Condvar,
    Mutex,
    MutexGuard,
    PoisonError,
};

use log::debug;
use rust_htslib::bam;

pub const LOCAL_CACHE_CEILING: usize = 50;

/// Buffers that can be handed out again after use.
pub trait Recycle: Sized + Send {
    /// Whether items keep their buffers when passing through the shared
    /// pool. `false` when [`detach`](Recycle::detach) replaces them.
    const SHAREABLE: bool = true;

    fn allocate() -> Self;

    /// Clears every field a previous use may have set.
    fn reset(&mut self);

    /// Called before an item leaves its worker for the shared pool.
    fn detach(self) -> Self {
        self
    }
}

impl Recycle for bam::Record {
    const SHAREABLE: bool = false;

    fn allocate() -> Self {
        bam::Record::new()
    }

    fn reset(&mut self) {
        // `set` keeps the aux block, so tags are removed one by one.
        let tags = self
            .aux_iter()
            .filter_map(|entry| entry.ok().map(|(tag, _)| [tag[0], tag[1]]))
            .collect::<Vec<_>>();
        for tag in tags.iter() {
            self.remove_aux(tag).ok();
        }
        self.set(b"*", None, b"", b"");
        self.set_tid(-1);
        self.set_pos(-1);
        self.set_mtid(-1);
        self.set_mpos(-1);
        self.set_flags(0);
        self.set_mapq(0);
        self.set_insert_size(0);
    }

    // Records read from a file keep a reference-counted handle on the
    // reader's header, which must not be shared between threads.
    fn detach(self) -> Self {
        bam::Record::new()
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PoolStats {
    /// Items ever created by the pool.
    pub allocated: usize,
    /// Items currently in the shared free list.
    pub idle:      usize,
    /// Acquisitions served by a previously used buffer.
    pub reused:    usize,
    /// Items allocated past the hard cap for workers already holding items.
    pub overflow:  usize,
}

struct PoolState<T> {
    free:      Vec<T>,
    allocated: usize,
}

pub struct RecordPool<T: Recycle> {
    state:    Mutex<PoolState<T>>,
    released: Condvar,
    hard_cap: Option<usize>,
    waiting:  AtomicUsize,
    reused:   AtomicUsize,
    overflow: AtomicUsize,
}

impl<T: Recycle> RecordPool<T> {
    /// Pool pre-filled with `initial` items. Without a `hard_cap`, the
    /// pool allocates past its initial size instead of blocking.
    pub fn new(
        initial: usize,
        hard_cap: Option<usize>,
    ) -> Self {
        let initial = hard_cap.map_or(initial, |cap| initial.min(cap));
        let free = (0..initial).map(|_| T::allocate()).collect::<Vec<_>>();
        Self {
            state: Mutex::new(PoolState {
                free,
                allocated: initial,
            }),
            released: Condvar::new(),
            hard_cap,
            waiting: AtomicUsize::new(0),
            reused: AtomicUsize::new(0),
            overflow: AtomicUsize::new(0),
        }
    }

    fn lock(&self) -> MutexGuard<'_, PoolState<T>> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Takes an item from the shared pool, allocating when allowed and
    /// otherwise waiting for a release. The item is reset.
    pub fn acquire(&self) -> T {
        self.acquire_with(true)
    }

    /// Like [`acquire`](Self::acquire), but allocates past the hard cap
    /// instead of waiting.
    pub fn acquire_unblocked(&self) -> T {
        self.acquire_with(false)
    }

    fn acquire_with(
        &self,
        may_wait: bool,
    ) -> T {
        let mut state = self.lock();
        loop {
            if let Some(mut item) = state.free.pop() {
                drop(state);
                if T::SHAREABLE {
                    self.reused.fetch_add(1, Ordering::Relaxed);
                }
                item.reset();
                return item;
            }
            let below_cap = self.hard_cap.map_or(true, |cap| state.allocated < cap);
            if below_cap || !may_wait {
                state.allocated += 1;
                drop(state);
                if !below_cap {
                    self.overflow.fetch_add(1, Ordering::Relaxed);
                }
                return T::allocate();
            }
            self.waiting.fetch_add(1, Ordering::SeqCst);
            state = self
                .released
                .wait(state)
                .unwrap_or_else(PoisonError::into_inner);
            self.waiting.fetch_sub(1, Ordering::SeqCst);
        }
    }

    /// Returns items to the shared pool and wakes blocked acquirers.
    pub fn release_all<I: IntoIterator<Item = T>>(
        &self,
        items: I,
    ) {
        let detached = items.into_iter().map(T::detach).collect::<Vec<_>>();
        if detached.is_empty() {
            return;
        }
        self.lock().free.extend(detached);
        self.released.notify_all();
    }

    pub fn release(
        &self,
        item: T,
    ) {
        self.release_all(std::iter::once(item))
    }

    pub fn has_waiters(&self) -> bool {
        self.waiting.load(Ordering::SeqCst) > 0
    }

    pub fn stats(&self) -> PoolStats {
        let state = self.lock();
        PoolStats {
            allocated: state.allocated,
            idle:      state.free.len(),
            reused:    self.reused.load(Ordering::Relaxed),
            overflow:  self.overflow.load(Ordering::Relaxed),
        }
    }

    /// Per-worker view with a fresh local cache.
    pub fn worker(&self) -> WorkerPool<'_, T> {
        WorkerPool::new(self)
    }
}

/// Worker-owned cache in front of a shared [`RecordPool`]. Not shared
/// between threads.
pub struct WorkerPool<'a, T: Recycle> {
    global:  &'a RecordPool<T>,
    local:   Vec<T>,
    ceiling: usize,
    /// Items handed out and not yet released.
    held:    usize,
}

impl<'a, T: Recycle> WorkerPool<'a, T> {
    pub fn new(global: &'a RecordPool<T>) -> Self {
        Self {
            global,
            local: Vec::with_capacity(LOCAL_CACHE_CEILING),
            ceiling: LOCAL_CACHE_CEILING,
            held: 0,
        }
    }

    pub fn with_ceiling(
        mut self,
        ceiling: usize,
    ) -> Self {
        self.ceiling = ceiling;
        self
    }

    pub fn cached(&self) -> usize {
        self.local.len()
    }

    pub fn held(&self) -> usize {
        self.held
    }

    /// Serves from the local cache, then the shared pool. Waits on a full
    /// shared pool only when this worker holds nothing.
    pub fn acquire(&mut self) -> T {
        let item = match self.local.pop() {
            Some(mut item) => {
                self.global.reused.fetch_add(1, Ordering::Relaxed);
                item.reset();
                item
            },
            None if self.held == 0 => self.global.acquire(),
            None => self.global.acquire_unblocked(),
        };
        self.held += 1;
        item
    }

    /// Keeps the item locally unless the cache is full or another worker
    /// is blocked on the shared pool.
    pub fn release(
        &mut self,
        item: T,
    ) {
        self.held = self.held.saturating_sub(1);
        if self.local.len() < self.ceiling && !self.global.has_waiters() {
            self.local.push(item);
        }
        else {
            self.global.release(item);
        }
    }

    pub fn release_all<I: IntoIterator<Item = T>>(
        &mut self,
        items: I,
    ) {
        for item in items {
            self.release(item);
        }
    }
}

impl<T: Recycle> Drop for WorkerPool<'_, T> {
    fn drop(&mut self) {
        let drained = std::mem::take(&mut self.local);
        if !drained.is_empty() {
            debug!("Returning {} cached records to the shared pool", drained.len());
            self.global.release_all(drained);
        }
    }
}
