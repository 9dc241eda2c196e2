//! [`HysteresisWindow`] – rolling agreement check over recent readings.
//!
//! The navigation policy records the state each cycle's assessment points
//! at, and is allowed to escalate only once the last *k* entries agree.  A
//! single spurious reading therefore never moves the robot.
//!
//! # Example
//!
//! ```rust
//! use hexnav_runtime::hysteresis::HysteresisWindow;
//!
//! let mut window = HysteresisWindow::new(2);
//!
//! assert!(!window.record("rotate"));
//! assert!(window.record("rotate")); // second agreeing reading → settled
//!
//! assert!(!window.record("advance")); // streak broken
//! window.reset();
//! assert!(!window.record("advance"));
//! ```

use std::collections::VecDeque;

/// Remembers the last `k` readings and reports when they all agree.
#[derive(Debug, Clone)]
pub struct HysteresisWindow<T> {
    /// Number of consecutive identical readings required.
    k: usize,
    history: VecDeque<T>,
}

impl<T: PartialEq> HysteresisWindow<T> {
    /// `k` of 0 is treated as 1 (every reading settles immediately).
    pub fn new(k: usize) -> Self {
        let k = k.max(1);
        Self {
            k,
            history: VecDeque::with_capacity(k),
        }
    }

    /// Push `reading` and return whether the window is now settled.
    pub fn record(&mut self, reading: T) -> bool {
        self.history.push_back(reading);
        while self.history.len() > self.k {
            self.history.pop_front();
        }
        self.is_settled()
    }

    /// `true` when the window is full and every entry is identical.
    pub fn is_settled(&self) -> bool {
        if self.history.len() < self.k {
            return false;
        }
        let first = &self.history[0];
        self.history.iter().all(|r| r == first)
    }

    /// Most recent reading.
    pub fn latest(&self) -> Option<&T> {
        self.history.back()
    }

    pub fn len(&self) -> usize {
        self.history.len()
    }

    pub fn is_empty(&self) -> bool {
        self.history.is_empty()
    }

    pub fn capacity(&self) -> usize {
        self.k
    }

    /// Forget all readings.
    pub fn reset(&mut self) {
        self.history.clear();
    }
}
