//! Placeholder id allocation

use crate::node::NodeId;

/// Hands out placeholder ids for nodes the remote has not created yet
///
/// One allocator lives for one reconciliation pass. Ids count down from -1
/// so they can never collide with a permanent (positive) remote id.
#[derive(Debug)]
pub struct IdAllocator {
    next: i64,
}

impl IdAllocator {
    pub fn new() -> Self {
        Self { next: -1 }
    }

    /// Next unused placeholder
    pub fn next_id(&mut self) -> NodeId {
        let id = NodeId::new(self.next);
        self.next -= 1;
        id
    }

    /// Number of placeholders issued so far
    pub fn issued(&self) -> usize {
        (-1 - self.next) as usize
    }
}

impl Default for IdAllocator {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    #[test]
    fn test_seeded_at_minus_one() {
        let mut ids = IdAllocator::new();
        assert_eq!(ids.next_id(), NodeId::new(-1));
        assert_eq!(ids.next_id(), NodeId::new(-2));
        assert_eq!(ids.issued(), 2);
    }

    #[test]
    fn test_unique_and_placeholder() {
        let mut ids = IdAllocator::new();
        let seen: HashSet<_> = (0..500).map(|_| ids.next_id()).collect();
        assert_eq!(seen.len(), 500);
        assert!(seen.iter().all(|id| id.is_placeholder()));
    }

    #[test]
    fn test_passes_are_independent() {
        let mut first = IdAllocator::new();
        first.next_id();
        first.next_id();

        let mut second = IdAllocator::new();
        assert_eq!(second.next_id(), NodeId::new(-1));
    }
}
