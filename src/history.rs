//! Per-hand state storage shared by the detectors and the trajectory tracker

use crate::landmarks::HandId;
use std::collections::hash_map::Entry;
use std::collections::{HashMap, VecDeque};

/// Fixed-capacity FIFO; the oldest sample is dropped when full
#[derive(Debug, Clone)]
pub struct RollingHistory<T> {
    samples: VecDeque<T>,
    capacity: usize,
}

impl<T> RollingHistory<T> {
    pub fn new(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        Self {
            samples: VecDeque::with_capacity(capacity),
            capacity,
        }
    }

    pub fn push(&mut self, sample: T) {
        if self.samples.len() == self.capacity {
            self.samples.pop_front();
        }
        self.samples.push_back(sample);
    }

    pub fn len(&self) -> usize {
        self.samples.len()
    }

    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }

    pub fn is_full(&self) -> bool {
        self.samples.len() == self.capacity
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn clear(&mut self) {
        self.samples.clear();
    }

    /// Oldest first
    pub fn iter(&self) -> impl DoubleEndedIterator<Item = &T> + ExactSizeIterator {
        self.samples.iter()
    }

    pub fn newest(&self) -> Option<&T> {
        self.samples.back()
    }

    pub fn oldest(&self) -> Option<&T> {
        self.samples.front()
    }

    /// Everything except the newest sample
    pub fn baseline(&self) -> impl Iterator<Item = &T> {
        self.samples.iter().take(self.samples.len().saturating_sub(1))
    }

    /// The newest `n` samples, oldest first
    pub fn recent(&self, n: usize) -> impl Iterator<Item = &T> {
        self.samples.iter().skip(self.samples.len().saturating_sub(n))
    }
}

/// Arena of per-hand state for one detector.
///
/// State for a hand is created on first observation and only disappears
/// through [`HandStates::remove`] or [`HandStates::clear`].
#[derive(Debug, Clone)]
pub struct HandStates<S> {
    states: HashMap<HandId, S>,
}

impl<S> Default for HandStates<S> {
    fn default() -> Self {
        Self {
            states: HashMap::new(),
        }
    }
}

impl<S> HandStates<S> {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, hand_id: &HandId) -> Option<&S> {
        self.states.get(hand_id)
    }

    pub fn get_mut(&mut self, hand_id: &HandId) -> Option<&mut S> {
        self.states.get_mut(hand_id)
    }

    pub fn get_or_insert_with<F: FnOnce() -> S>(&mut self, hand_id: &HandId, init: F) -> &mut S {
        match self.states.entry(hand_id.clone()) {
            Entry::Occupied(entry) => entry.into_mut(),
            Entry::Vacant(entry) => entry.insert(init()),
        }
    }

    pub fn insert(&mut self, hand_id: HandId, state: S) -> Option<S> {
        self.states.insert(hand_id, state)
    }

    pub fn remove(&mut self, hand_id: &HandId) -> Option<S> {
        self.states.remove(hand_id)
    }

    pub fn clear(&mut self) {
        self.states.clear();
    }

    pub fn contains(&self, hand_id: &HandId) -> bool {
        self.states.contains_key(hand_id)
    }

    pub fn hand_ids(&self) -> impl Iterator<Item = &HandId> {
        self.states.keys()
    }

    pub fn iter_mut(&mut self) -> impl Iterator<Item = (&HandId, &mut S)> {
        self.states.iter_mut()
    }

    pub fn len(&self) -> usize {
        self.states.len()
    }

    pub fn is_empty(&self) -> bool {
        self.states.is_empty()
    }
}

impl<S: Default> HandStates<S> {
    pub fn state_mut(&mut self, hand_id: &HandId) -> &mut S {
        self.get_or_insert_with(hand_id, S::default)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_rolling_history_evicts_oldest() {
        let mut history = RollingHistory::new(3);
        for i in 1..=4 {
            history.push(i);
        }

        assert!(history.is_full());
        assert_eq!(history.iter().copied().collect::<Vec<_>>(), vec![2, 3, 4]);
        assert_eq!(history.newest(), Some(&4));
        assert_eq!(history.oldest(), Some(&2));
        assert_eq!(history.baseline().copied().collect::<Vec<_>>(), vec![2, 3]);
        assert_eq!(history.recent(2).copied().collect::<Vec<_>>(), vec![3, 4]);
        assert_eq!(history.recent(10).count(), 3);
    }

    #[test]
    fn test_rolling_history_zero_capacity_holds_one() {
        let mut history = RollingHistory::new(0);
        history.push("a");
        history.push("b");
        assert_eq!(history.capacity(), 1);
        assert_eq!(history.newest(), Some(&"b"));
        assert_eq!(history.baseline().count(), 0);
    }

    #[test]
    fn test_hand_states_lifecycle() {
        let mut states: HandStates<u32> = HandStates::new();
        let h0 = HandId::from_index(0);
        let h1 = HandId::from_index(1);

        *states.state_mut(&h0) += 2;
        *states.state_mut(&h0) += 1;
        states.get_or_insert_with(&h1, || 10);

        assert_eq!(states.get(&h0), Some(&3));
        assert_eq!(states.len(), 2);

        assert_eq!(states.remove(&h0), Some(3));
        assert!(!states.contains(&h0));
        assert!(states.contains(&h1));

        states.clear();
        assert!(states.is_empty());
    }
}
