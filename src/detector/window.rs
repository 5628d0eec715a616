use serde::{Deserialize, Serialize};

/// One measurement delivered by the ingestion side.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Sample {
    pub timestamp: f64,
    pub value: f64,
}

impl Sample {
    pub fn new(timestamp: f64, value: f64) -> Self {
        Self { timestamp, value }
    }
}

/// Fixed-capacity FIFO of the most recent sample values.
///
/// Storage is allocated once; pushing into a full window overwrites the oldest value.
pub struct SampleWindow {
    values: Box<[f64]>,
    // Index of the oldest value.
    head: usize,
    len: usize,
}

impl SampleWindow {
    pub fn new(capacity: usize) -> Self {
        Self {
            values: vec![0.0; capacity].into_boxed_slice(),
            head: 0,
            len: 0,
        }
    }

    pub fn capacity(&self) -> usize {
        self.values.len()
    }

    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    pub fn is_full(&self) -> bool {
        self.len == self.capacity()
    }

    /// Appends `value`, returning the evicted oldest value when the window was full.
    pub fn push(&mut self, value: f64) -> Option<f64> {
        let capacity = self.capacity();
        if capacity == 0 {
            return None;
        }
        if self.len < capacity {
            self.values[(self.head + self.len) % capacity] = value;
            self.len += 1;
            None
        } else {
            let evicted = std::mem::replace(&mut self.values[self.head], value);
            self.head = (self.head + 1) % capacity;
            Some(evicted)
        }
    }

    /// Contents as two slices, oldest first.
    pub fn as_slices(&self) -> (&[f64], &[f64]) {
        let capacity = self.capacity();
        let end = self.head + self.len;
        if end <= capacity {
            (&self.values[self.head..end], &[])
        } else {
            (&self.values[self.head..], &self.values[..end - capacity])
        }
    }

    pub fn iter(&self) -> impl Iterator<Item = f64> + '_ {
        let (a, b) = self.as_slices();
        a.iter().chain(b.iter()).copied()
    }

    /// Replaces the contents of `out` with the window in arrival order.
    pub fn copy_into(&self, out: &mut Vec<f64>) {
        let (a, b) = self.as_slices();
        out.clear();
        out.extend_from_slice(a);
        out.extend_from_slice(b);
    }

    pub fn clear(&mut self) {
        self.head = 0;
        self.len = 0;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fills_then_evicts_oldest() {
        let mut window = SampleWindow::new(3);
        assert!(window.is_empty());
        assert_eq!(window.push(1.0), None);
        assert_eq!(window.push(2.0), None);
        assert_eq!(window.push(3.0), None);
        assert!(window.is_full());
        assert_eq!(window.push(4.0), Some(1.0));
        assert_eq!(window.push(5.0), Some(2.0));
        assert_eq!(window.len(), 3);
        assert_eq!(window.iter().collect::<Vec<_>>(), vec![3.0, 4.0, 5.0]);
    }

    #[test]
    fn test_length_never_exceeds_capacity() {
        let mut window = SampleWindow::new(7);
        for i in 0..100usize {
            window.push(i as f64);
            assert!(window.len() <= 7);
            let contents: Vec<f64> = window.iter().collect();
            let first = (i + 1).saturating_sub(7);
            let expected: Vec<f64> = (first..=i).map(|v| v as f64).collect();
            assert_eq!(contents, expected, "order broken after {} pushes", i + 1);
        }
    }

    #[test]
    fn test_copy_into_reuses_buffer() {
        let mut window = SampleWindow::new(4);
        for v in [1.0, 2.0, 3.0, 4.0, 5.0, 6.0] {
            window.push(v);
        }
        let mut out = vec![9.0; 10];
        window.copy_into(&mut out);
        assert_eq!(out, vec![3.0, 4.0, 5.0, 6.0]);
    }

    #[test]
    fn test_clear() {
        let mut window = SampleWindow::new(2);
        window.push(1.0);
        window.push(2.0);
        window.push(3.0);
        window.clear();
        assert!(window.is_empty());
        window.push(4.0);
        assert_eq!(window.iter().collect::<Vec<_>>(), vec![4.0]);
    }
}
