use std::collections::VecDeque;

/// Fixed-capacity window that evicts its oldest entry instead of growing.
#[derive(Debug, Clone)]
pub struct BoundedWindow<T> {
    values: VecDeque<T>,
    capacity: usize,
}

impl<T> BoundedWindow<T> {
    pub fn with_capacity(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        Self {
            values: VecDeque::with_capacity(capacity),
            capacity,
        }
    }

    /// Appends `value`, returning the evicted entry if the window was full.
    pub fn push(&mut self, value: T) -> Option<T> {
        let evicted = if self.values.len() >= self.capacity {
            self.values.pop_front()
        } else {
            None
        };
        self.values.push_back(value);
        evicted
    }

    /// Drops entries from the front while `stale` holds for them.
    pub fn evict_while<F: FnMut(&T) -> bool>(&mut self, mut stale: F) -> usize {
        let mut dropped = 0;
        while self.values.front().map_or(false, &mut stale) {
            self.values.pop_front();
            dropped += 1;
        }
        dropped
    }

    pub fn iter(&self) -> impl Iterator<Item = &T> {
        self.values.iter()
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn reset(&mut self) {
        self.values.clear();
    }
}

impl<T: Copy> BoundedWindow<T> {
    pub fn to_vec(&self) -> Vec<T> {
        self.values.iter().copied().collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn window_never_exceeds_capacity() {
        let mut window = BoundedWindow::with_capacity(3);
        for value in 0..10 {
            window.push(value);
            assert!(window.len() <= 3);
        }
        assert_eq!(window.to_vec(), vec![7, 8, 9]);
    }

    #[test]
    fn push_reports_eviction() {
        let mut window = BoundedWindow::with_capacity(2);
        assert_eq!(window.push(1), None);
        assert_eq!(window.push(2), None);
        assert_eq!(window.push(3), Some(1));
    }

    #[test]
    fn evict_while_stops_at_first_fresh_entry() {
        let mut window = BoundedWindow::with_capacity(8);
        for value in [1, 2, 5, 3] {
            window.push(value);
        }
        assert_eq!(window.evict_while(|v| *v < 4), 2);
        assert_eq!(window.to_vec(), vec![5, 3]);
        window.reset();
        assert!(window.is_empty());
    }
}
