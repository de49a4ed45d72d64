//! Fixed-capacity object pool for reusable sprites.
//!
//! The pool front-loads all allocation: every slot is built by the alloc
//! callback at construction, so steady-state `acquire`/`release` never
//! allocates. `acquire` fails with [`Error::PoolExhausted`] once every slot
//! is live; callers degrade (skip the overlay) rather than grow the pool.
//!
//! The pool knows nothing about chat. It hands out `PoolHandle` indices and
//! runs the reset callback when a handle comes back.

use crate::error::{Error, Result};

/// Index into the pool's slot storage. Only valid against the pool that
/// issued it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct PoolHandle(usize);

impl PoolHandle {
    pub fn index(&self) -> usize {
        self.0
    }
}

/// A fixed-size pool of reusable objects.
pub struct ObjectPool<T> {
    slots: Vec<T>,
    /// Live flags; a slot with `live == false` sits on the free list.
    live: Vec<bool>,
    free: Vec<usize>,
    reset: Box<dyn FnMut(&mut T) + Send>,
}

impl<T> std::fmt::Debug for ObjectPool<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ObjectPool")
            .field("capacity", &self.slots.len())
            .field("in_use", &self.in_use())
            .finish()
    }
}

impl<T> ObjectPool<T> {
    /// Create a pool of `capacity` objects, building each one with `alloc`.
    pub fn new(
        capacity: usize,
        mut alloc: impl FnMut(usize) -> T,
        reset: impl FnMut(&mut T) + Send + 'static,
    ) -> Self {
        let slots = (0..capacity).map(&mut alloc).collect();
        Self {
            slots,
            live: vec![false; capacity],
            free: (0..capacity).rev().collect(),
            reset: Box::new(reset),
        }
    }

    pub fn capacity(&self) -> usize {
        self.slots.len()
    }

    /// Number of handles currently held by callers.
    pub fn in_use(&self) -> usize {
        self.slots.len() - self.free.len()
    }

    /// Take a free object out of the pool.
    pub fn acquire(&mut self) -> Result<PoolHandle> {
        match self.free.pop() {
            Some(idx) => {
                self.live[idx] = true;
                Ok(PoolHandle(idx))
            }
            None => Err(Error::PoolExhausted {
                capacity: self.slots.len(),
            }),
        }
    }

    /// Reset an object and return it to the free list.
    ///
    /// Releasing a handle that is already free (or out of range) is a no-op,
    /// so a caller cannot corrupt the free list by double-releasing.
    pub fn release(&mut self, handle: PoolHandle) {
        let idx = handle.0;
        if idx >= self.slots.len() || !self.live[idx] {
            return;
        }
        (self.reset)(&mut self.slots[idx]);
        self.live[idx] = false;
        self.free.push(idx);
    }

    /// Access a live object. Returns `None` for freed or foreign handles.
    pub fn get(&self, handle: PoolHandle) -> Option<&T> {
        if *self.live.get(handle.0)? {
            self.slots.get(handle.0)
        } else {
            None
        }
    }

    /// Mutable access to a live object.
    pub fn get_mut(&mut self, handle: PoolHandle) -> Option<&mut T> {
        if *self.live.get(handle.0)? {
            self.slots.get_mut(handle.0)
        } else {
            None
        }
    }
}
