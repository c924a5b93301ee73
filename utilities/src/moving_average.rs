use std::collections::VecDeque;

/// Fixed-window average over the most recent integer samples.
pub struct MovingAverage {
    values: VecDeque<i32>,
    max_size: usize,
}

impl MovingAverage {
    pub fn new(max_size: usize) -> Self {
        let max_size = max_size.max(1);

        Self {
            values: VecDeque::with_capacity(max_size),
            max_size,
        }
    }

    pub fn add(&mut self, value: i32) {
        if self.values.len() >= self.max_size {
            self.values.pop_front();
        }
        self.values.push_back(value);
    }

    pub fn clear(&mut self) {
        self.values.clear();
    }

    pub fn is_full(&self) -> bool {
        self.values.len() == self.max_size
    }

    /// Integer mean of the window, truncated toward zero. Zero when empty.
    pub fn mean(&self) -> i32 {
        if self.values.is_empty() {
            0
        } else {
            let sum: i64 = self.values.iter().map(|&v| v as i64).sum();
            (sum / self.values.len() as i64) as i32
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn mean_of_partial_window() {
        let mut avg = MovingAverage::new(3);
        assert_eq!(avg.mean(), 0);

        avg.add(500);
        avg.add(520);
        assert!(!avg.is_full());
        assert_eq!(avg.mean(), 510);
    }

    #[test]
    fn oldest_sample_is_evicted() {
        let mut avg = MovingAverage::new(3);
        for v in [100, 200, 300, 900] {
            avg.add(v);
        }

        assert!(avg.is_full());
        assert_eq!(avg.mean(), (200 + 300 + 900) / 3);

        avg.clear();
        assert_eq!(avg.mean(), 0);
    }
}
