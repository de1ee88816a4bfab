//! Bounded trail of recent CoP points.
use std::collections::VecDeque;
use std::num::NonZeroUsize;

pub type Point = (f64, f64);

/// FIFO of `(x, y)` points in arrival order. When bounded, pushing onto a full
/// window evicts the oldest point.
#[derive(Debug, Clone, Default)]
pub struct HistoryWindow {
    points: VecDeque<Point>,
    capacity: Option<NonZeroUsize>,
}

impl HistoryWindow {
    pub fn bounded(capacity: NonZeroUsize) -> Self {
        Self {
            points: VecDeque::with_capacity(capacity.get().min(4096)),
            capacity: Some(capacity),
        }
    }

    pub fn unbounded() -> Self {
        Self::default()
    }

    /// `0` selects the unbounded mode, matching `history.capacity` in config.
    pub fn with_capacity(capacity: usize) -> Self {
        NonZeroUsize::new(capacity).map_or_else(Self::unbounded, Self::bounded)
    }

    pub fn capacity(&self) -> Option<usize> {
        self.capacity.map(NonZeroUsize::get)
    }

    pub fn push(&mut self, point: Point) {
        if let Some(cap) = self.capacity {
            while self.points.len() >= cap.get() {
                self.points.pop_front();
            }
        }
        self.points.push_back(point);
    }

    pub fn snapshot(&self) -> Vec<Point> {
        self.points.iter().copied().collect()
    }

    pub fn latest(&self) -> Option<Point> {
        self.points.back().copied()
    }

    pub fn len(&self) -> usize {
        self.points.len()
    }

    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }
}
