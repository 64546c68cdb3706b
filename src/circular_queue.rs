use num_traits::ToPrimitive;
use std::collections::VecDeque;
use std::fmt;

/// Bounded history, newest element first.
///
/// Pushing into a full queue silently drops the oldest element, so `len()`
/// never exceeds `capacity()`.
pub struct CircularQueue<T> {
    deque: VecDeque<T>,
    capacity: usize,
}

impl<T: Clone> Clone for CircularQueue<T> {
    fn clone(&self) -> Self {
        Self {
            deque: self.deque.clone(),
            capacity: self.capacity,
        }
    }
}

impl<T: fmt::Debug> fmt::Debug for CircularQueue<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.deque.fmt(f)
    }
}

impl<T> CircularQueue<T> {
    #[inline]
    pub fn with_capacity(cap: usize) -> Self {
        Self {
            deque: VecDeque::with_capacity(cap),
            capacity: cap,
        }
    }

    /// Queue holding a single element.
    pub fn singleton(cap: usize, item: T) -> Self {
        let mut queue = Self::with_capacity(cap);
        queue.push(item);
        queue
    }

    #[inline]
    pub fn push(&mut self, item: T) -> Option<T> {
        if self.capacity == 0 {
            return Some(item);
        }

        let popped = if self.is_full() {
            self.deque.pop_back()
        } else {
            None
        };

        self.deque.push_front(item);

        popped
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.deque.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.deque.is_empty()
    }

    #[inline]
    pub fn is_full(&self) -> bool {
        self.deque.len() >= self.capacity
    }

    #[inline]
    pub fn capacity(&self) -> usize {
        self.capacity
    }

    #[inline]
    pub fn latest(&self) -> Option<&T> {
        self.deque.front()
    }

    /// Element pushed right before the latest one.
    #[inline]
    pub fn previous(&self) -> Option<&T> {
        self.deque.get(1)
    }

    /// Newest first.
    #[inline]
    pub fn iter(&self) -> impl Iterator<Item = &'_ T> {
        self.deque.iter()
    }

    /// Oldest first.
    #[inline]
    pub fn asc_iter(&self) -> impl Iterator<Item = &'_ T> {
        self.deque.iter().rev()
    }

    /// The `n` newest elements, oldest first.
    pub fn recent(&self, n: usize) -> impl Iterator<Item = &'_ T> {
        let n = n.min(self.deque.len());

        self.deque.iter().take(n).rev()
    }

    #[inline]
    pub fn count<P: Fn(&T) -> bool>(&self, pred: P) -> usize {
        self.deque.iter().filter(|x| pred(x)).count()
    }
}

impl<T: Copy + ToPrimitive> CircularQueue<T> {
    pub fn mean(&self) -> Option<f32> {
        if self.deque.is_empty() {
            return None;
        }

        let sum: f64 = self.deque.iter().filter_map(|x| x.to_f64()).sum();

        Some((sum / self.deque.len() as f64) as f32)
    }
}
