//! Growable work-stealing deque.
//!
//! A Chase–Lev deque with a single owner and any number of thieves. The
//! owner pushes and pops at the `bottom` end (LIFO, keeps fresh work hot in
//! cache); thieves claim from the `top` end (FIFO, takes the oldest and most
//! independent work). Both indices are monotonic logical positions; the
//! physical slot is the logical index modulo the buffer capacity.
//!
//! Unlike the textbook bounded deque, the owner doubles the buffer when a
//! push finds it full. Replaced buffers are retired, not freed, until the
//! deque itself drops: a thief racing a growth may still read a slot through
//! the old buffer, and the compare-exchange on `top` is the only arbiter of
//! who owns the value it read.

use crossbeam_utils::CachePadded;
use std::cell::UnsafeCell;
use std::mem::{self, MaybeUninit};
use std::sync::atomic::{AtomicIsize, AtomicPtr, Ordering};

/// Initial slot count of a fresh deque.
const INITIAL_CAPACITY: usize = 1024;

/// A slot array plus its capacity. Capacity lives inside the buffer so a
/// single pointer store publishes both and a thief can never pair a new
/// buffer with a stale capacity.
struct Buffer<T> {
    capacity: usize,
    slots: Box<[UnsafeCell<MaybeUninit<T>>]>,
}

impl<T> Buffer<T> {
    fn alloc(capacity: usize) -> Box<Buffer<T>> {
        let slots = (0..capacity)
            .map(|_| UnsafeCell::new(MaybeUninit::uninit()))
            .collect();
        Box::new(Buffer { capacity, slots })
    }

    /// Read the value bits at a logical index.
    ///
    /// # Safety
    ///
    /// `index` must address an initialized slot, and the caller must either
    /// win the claim on it or `mem::forget` the returned value.
    unsafe fn read(&self, index: isize) -> T {
        let slot = &self.slots[index as usize % self.capacity];
        unsafe { slot.get().read().assume_init() }
    }

    /// Write a value at a logical index.
    ///
    /// # Safety
    ///
    /// `index` must address a slot that no other thread is allowed to claim.
    unsafe fn write(&self, index: isize, value: T) {
        let slot = &self.slots[index as usize % self.capacity];
        unsafe { (*slot.get()).write(value) };
    }
}

/// Single-owner, multi-thief work-stealing deque.
///
/// `push` and `pop` may only ever be called from one thread at a time (the
/// queue's owner); `steal` may be called from any thread, concurrently.
pub struct WorkDeque<T> {
    top: CachePadded<AtomicIsize>,
    bottom: CachePadded<AtomicIsize>,
    buffer: AtomicPtr<Buffer<T>>,
    /// Buffers replaced by `grow`. Mutated by the owner only; freed on drop
    /// so that racing thieves never observe a dangling buffer.
    retired: UnsafeCell<Vec<Box<Buffer<T>>>>,
}

// Safety: the slots only ever hand a value to the single claimant that won
// the compare-exchange on `top` (or to the owner popping an uncontended
// bottom slot), so the deque transfers `T: Send` values across threads but
// never shares them.
unsafe impl<T: Send> Send for WorkDeque<T> {}
unsafe impl<T: Send> Sync for WorkDeque<T> {}

impl<T> WorkDeque<T> {
    pub fn new() -> WorkDeque<T> {
        WorkDeque::with_capacity(INITIAL_CAPACITY)
    }

    pub(crate) fn with_capacity(capacity: usize) -> WorkDeque<T> {
        assert!(capacity > 0, "deque capacity must be positive");
        WorkDeque {
            top: CachePadded::new(AtomicIsize::new(0)),
            bottom: CachePadded::new(AtomicIsize::new(0)),
            buffer: AtomicPtr::new(Box::into_raw(Buffer::alloc(capacity))),
            retired: UnsafeCell::new(Vec::new()),
        }
    }

    /// Push a value at the bottom end. Owner only. Never fails; a full
    /// buffer is grown in place.
    pub fn push(&self, value: T) {
        let mut b = self.bottom.load(Ordering::Relaxed);
        let t = self.top.load(Ordering::Acquire);
        // Safety: only the owner swaps the buffer pointer, and we are the
        // owner, so the pointer is stable for the whole call.
        let mut buffer = unsafe { &*self.buffer.load(Ordering::Relaxed) };

        if b - t >= buffer.capacity as isize {
            self.grow(t, b);
            b = self.bottom.load(Ordering::Relaxed);
            buffer = unsafe { &*self.buffer.load(Ordering::Relaxed) };
        }

        // Safety: slot `b` is outside the live range `[top, bottom)` until
        // the release store below publishes it.
        unsafe { buffer.write(b, value) };
        self.bottom.store(b + 1, Ordering::Release);
    }

    /// Pop the most recently pushed value. Owner only.
    pub fn pop(&self) -> Option<T> {
        let b = self.bottom.load(Ordering::Relaxed) - 1;
        // Reserve the bottom slot before looking at `top`; thieves that load
        // `bottom` after this store will not touch slot `b`.
        self.bottom.store(b, Ordering::SeqCst);
        let t = self.top.load(Ordering::SeqCst);

        if t > b {
            // Empty. Undo the reservation.
            self.bottom.store(b + 1, Ordering::Relaxed);
            return None;
        }

        let buffer = unsafe { &*self.buffer.load(Ordering::Relaxed) };
        // Speculative: the value is only ours once the claim settles below.
        let value = unsafe { buffer.read(b) };

        if t == b {
            // Last element. Race any thieves for it via `top`.
            let won = self
                .top
                .compare_exchange(t, t + 1, Ordering::SeqCst, Ordering::Relaxed)
                .is_ok();
            self.bottom.store(b + 1, Ordering::Relaxed);
            if !won {
                // A thief claimed it; our read was a phantom copy.
                mem::forget(value);
                return None;
            }
        }

        Some(value)
    }

    /// Claim the least recently pushed value. Any thread. A lost race
    /// returns `None` without retrying; callers drive retries.
    pub fn steal(&self) -> Option<T> {
        let t = self.top.load(Ordering::Acquire);
        let b = self.bottom.load(Ordering::Acquire);
        if t >= b {
            return None;
        }

        // The buffer load is ordered after the `bottom` load: a bottom that
        // covers index `t` guarantees the buffer we see also covers it.
        let buffer = unsafe { &*self.buffer.load(Ordering::Acquire) };
        // Speculative: the value is only ours if the claim below wins.
        let value = unsafe { buffer.read(t) };

        if self
            .top
            .compare_exchange(t, t + 1, Ordering::SeqCst, Ordering::Relaxed)
            .is_ok()
        {
            Some(value)
        } else {
            mem::forget(value);
            None
        }
    }

    /// Approximate element count; momentarily inconsistent under
    /// concurrent mutation.
    pub fn len(&self) -> usize {
        let t = self.top.load(Ordering::Acquire);
        let b = self.bottom.load(Ordering::Acquire);
        if b > t { (b - t) as usize } else { 0 }
    }

    /// Approximate emptiness; see [`WorkDeque::len`].
    pub fn is_empty(&self) -> bool {
        let t = self.top.load(Ordering::Acquire);
        let b = self.bottom.load(Ordering::Acquire);
        t >= b
    }

    /// Double the capacity, preserving the live range `[top, bottom)` at
    /// unchanged logical indices. Owner only, called from `push`.
    fn grow(&self, t: isize, b: isize) {
        let old_ptr = self.buffer.load(Ordering::Relaxed);
        let old = unsafe { &*old_ptr };
        let new = Buffer::alloc(old.capacity * 2);

        for i in t..b {
            // Bit-copy: the old buffer keeps its (now dead) copies, which a
            // racing thief may still read; a stale read loses the
            // compare-exchange on `top` and is forgotten by the loser.
            unsafe { new.write(i, old.read(i)) };
        }

        self.buffer.store(Box::into_raw(new), Ordering::Release);
        // Safety: `retired` is owner-only state and we are the owner.
        unsafe { (*self.retired.get()).push(Box::from_raw(old_ptr)) };
    }
}

impl<T> Default for WorkDeque<T> {
    fn default() -> WorkDeque<T> {
        WorkDeque::new()
    }
}

impl<T> Drop for WorkDeque<T> {
    fn drop(&mut self) {
        let buffer = unsafe { Box::from_raw(*self.buffer.get_mut()) };
        let t = *self.top.get_mut();
        let b = *self.bottom.get_mut();
        for i in t..b {
            // Safety: `&mut self` means no claimant is racing us; the live
            // range holds exactly the unclaimed values.
            unsafe { drop(buffer.read(i)) };
        }
        // Retired buffers hold only dead bit-copies; dropping them frees
        // their storage without touching the slots.
    }
}
