//! Fixed-capacity ring buffer with a capacity chosen at runtime.
//!
//! Every bounded history in the crate (stage windows, candidate peaks, raw
//! sample spans) lives in a [`RingBuffer`]. Once full, pushing evicts the
//! oldest element, so memory never grows past the configured capacity.

use crate::error::ConfigError;
use alloc::boxed::Box;
use alloc::vec;

/// FIFO ring buffer that overwrites its oldest element when full.
///
/// Storage is allocated once in [`RingBuffer::new`]; `push` and `pop` never
/// allocate.
///
/// # Example
/// ```
/// use qrstream::RingBuffer;
///
/// let mut ring = RingBuffer::new(3);
/// ring.push(1);
/// ring.push(2);
/// ring.push(3);
/// assert_eq!(ring.push(4), Some(1));
/// assert_eq!(ring.oldest(), Some(2));
/// assert_eq!(ring.newest(), Some(4));
/// ```
#[derive(Debug, Clone)]
pub struct RingBuffer<T> {
    buffer: Box<[T]>,
    head: usize,
    tail: usize,
    len: usize,
}

impl<T: Copy + Default> RingBuffer<T> {
    /// Creates an empty ring holding at most `capacity` elements.
    ///
    /// # Panics
    /// Panics if `capacity` is zero. Capacities inside the crate come from
    /// validated configurations and are never zero; use
    /// [`try_new`](Self::try_new) for untrusted sizes.
    pub fn new(capacity: usize) -> Self {
        assert!(capacity > 0, "capacity must be at least 1");
        Self {
            buffer: vec![T::default(); capacity].into_boxed_slice(),
            head: 0,
            tail: 0,
            len: 0,
        }
    }

    /// Creates an empty ring, rejecting a zero capacity.
    pub fn try_new(capacity: usize) -> Result<Self, ConfigError> {
        if capacity == 0 {
            return Err(ConfigError::EmptyWindow {
                stage: "ring buffer",
            });
        }
        Ok(Self::new(capacity))
    }

    /// Appends `value`, returning the evicted oldest element if the ring was full.
    pub fn push(&mut self, value: T) -> Option<T> {
        let cap = self.buffer.len();
        let evicted = if self.len == cap {
            let old = self.buffer[self.tail];
            self.tail = (self.tail + 1) % cap;
            Some(old)
        } else {
            self.len += 1;
            None
        };

        self.buffer[self.head] = value;
        self.head = (self.head + 1) % cap;
        evicted
    }

    /// Removes and returns the oldest element.
    pub fn pop(&mut self) -> Option<T> {
        if self.len == 0 {
            return None;
        }

        let value = self.buffer[self.tail];
        self.tail = (self.tail + 1) % self.buffer.len();
        self.len -= 1;
        Some(value)
    }

    /// Removes and returns the newest element.
    pub fn pop_newest(&mut self) -> Option<T> {
        if self.len == 0 {
            return None;
        }

        let cap = self.buffer.len();
        self.head = (self.head + cap - 1) % cap;
        self.len -= 1;
        Some(self.buffer[self.head])
    }

    /// Element `index` positions after the oldest one.
    pub fn get(&self, index: usize) -> Option<T> {
        if index >= self.len {
            return None;
        }
        Some(self.buffer[(self.tail + index) % self.buffer.len()])
    }

    pub fn oldest(&self) -> Option<T> {
        self.get(0)
    }

    pub fn newest(&self) -> Option<T> {
        self.len.checked_sub(1).and_then(|i| self.get(i))
    }

    /// Iterates from oldest to newest.
    pub fn iter(&self) -> impl Iterator<Item = T> + '_ {
        (0..self.len).map(move |i| self.buffer[(self.tail + i) % self.buffer.len()])
    }

    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    pub fn is_full(&self) -> bool {
        self.len == self.buffer.len()
    }

    pub fn capacity(&self) -> usize {
        self.buffer.len()
    }

    /// Drops all elements; capacity is unchanged.
    pub fn clear(&mut self) {
        self.head = 0;
        self.tail = 0;
        self.len = 0;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use alloc::vec::Vec;

    #[test]
    fn test_ring_fills_then_evicts_oldest() {
        let mut ring = RingBuffer::new(3);
        assert!(ring.is_empty());
        assert_eq!(ring.push(1.0), None);
        assert_eq!(ring.push(2.0), None);
        assert_eq!(ring.push(3.0), None);
        assert!(ring.is_full());

        assert_eq!(ring.push(4.0), Some(1.0));
        assert_eq!(ring.len(), 3);
        assert_eq!(ring.iter().collect::<Vec<_>>(), [2.0, 3.0, 4.0]);
    }

    #[test]
    fn test_ring_pop_both_ends() {
        let mut ring = RingBuffer::new(4);
        for i in 0..6 {
            ring.push(i);
        }
        // holds 2, 3, 4, 5
        assert_eq!(ring.pop_newest(), Some(5));
        assert_eq!(ring.pop(), Some(2));
        assert_eq!(ring.iter().collect::<Vec<_>>(), [3, 4]);

        ring.push(9);
        ring.push(10);
        assert_eq!(ring.iter().collect::<Vec<_>>(), [3, 4, 9, 10]);
        assert_eq!(ring.push(11), Some(3));
    }

    #[test]
    fn test_ring_empty_accessors() {
        let mut ring: RingBuffer<usize> = RingBuffer::new(2);
        assert_eq!(ring.pop(), None);
        assert_eq!(ring.pop_newest(), None);
        assert_eq!(ring.oldest(), None);
        assert_eq!(ring.newest(), None);
        assert_eq!(ring.get(0), None);
    }

    #[test]
    fn test_ring_clear_keeps_capacity() {
        let mut ring = RingBuffer::new(5);
        for i in 0..7 {
            ring.push(i);
        }
        ring.clear();
        assert!(ring.is_empty());
        assert_eq!(ring.capacity(), 5);

        ring.push(42);
        assert_eq!(ring.oldest(), Some(42));
        assert_eq!(ring.newest(), Some(42));
    }

    #[test]
    fn test_ring_try_new() {
        assert_eq!(
            RingBuffer::<f64>::try_new(0).err(),
            Some(ConfigError::EmptyWindow {
                stage: "ring buffer"
            })
        );
        let ring = RingBuffer::<f64>::try_new(3).unwrap();
        assert_eq!(ring.capacity(), 3);
        assert!(ring.is_empty());
    }

    #[test]
    #[should_panic]
    fn test_ring_zero_capacity_panics() {
        let _ring: RingBuffer<f64> = RingBuffer::new(0);
    }
}
