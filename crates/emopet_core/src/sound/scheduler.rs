//! Cancellable one-shot timers
//!
//! Deadlines are seconds on the engine clock. Nothing fires by itself: the
//! owner polls [`TimerQueue::pop_due`] from its `advance` step.

/// Handle for cancelling a scheduled timer
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct TimerId(u64);

#[derive(Debug)]
struct Entry<T> {
    id: TimerId,
    deadline: f64,
    payload: T,
}

/// A small set of pending timers, each carrying a payload
#[derive(Debug)]
pub struct TimerQueue<T> {
    entries: Vec<Entry<T>>,
    next_id: u64,
}

impl<T> TimerQueue<T> {
    pub fn new() -> Self {
        Self {
            entries: Vec::new(),
            next_id: 0,
        }
    }

    /// Arm a timer firing at `deadline`
    pub fn schedule(&mut self, deadline: f64, payload: T) -> TimerId {
        let id = TimerId(self.next_id);
        self.next_id += 1;
        self.entries.push(Entry {
            id,
            deadline,
            payload,
        });
        id
    }

    /// Disarm a timer; `false` if it already fired or was cancelled
    pub fn cancel(&mut self, id: TimerId) -> bool {
        let before = self.entries.len();
        self.entries.retain(|e| e.id != id);
        self.entries.len() != before
    }

    pub fn clear(&mut self) {
        self.entries.clear();
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn deadline(&self, id: TimerId) -> Option<f64> {
        self.entries.iter().find(|e| e.id == id).map(|e| e.deadline)
    }

    /// Earliest pending deadline
    pub fn next_deadline(&self) -> Option<f64> {
        self.entries.iter().map(|e| e.deadline).reduce(f64::min)
    }

    /// Remove and return the earliest timer due at `now`, if any
    pub fn pop_due(&mut self, now: f64) -> Option<(TimerId, T)> {
        let index = self
            .entries
            .iter()
            .enumerate()
            .filter(|(_, e)| e.deadline <= now)
            .min_by(|(_, a), (_, b)| a.deadline.total_cmp(&b.deadline))
            .map(|(i, _)| i)?;
        let entry = self.entries.remove(index);
        Some((entry.id, entry.payload))
    }
}

impl<T> Default for TimerQueue<T> {
    fn default() -> Self {
        Self::new()
    }
}
