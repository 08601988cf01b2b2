//! Per-worker survivor ring: a FIFO that holds just-allocated objects long
//! enough to prevent immediate reclamation, feeding the promotion
//! sub-protocol on overflow.

use std::collections::VecDeque;
use std::sync::Arc;

use membench_core::AllocatedObject;

pub struct SurvivorRing {
    capacity: usize,
    members: VecDeque<Arc<AllocatedObject>>,
}

impl SurvivorRing {
    pub fn new(capacity: usize) -> Self {
        Self {
            capacity: capacity.max(1),
            members: VecDeque::with_capacity(capacity),
        }
    }

    /// Push a freshly allocated object. Returns the evicted eldest member
    /// once the ring exceeds its configured length.
    pub fn push(&mut self, object: Arc<AllocatedObject>) -> Option<Arc<AllocatedObject>> {
        self.members.push_back(object);
        if self.members.len() > self.capacity {
            self.members.pop_front()
        } else {
            None
        }
    }

    pub fn len(&self) -> usize {
        self.members.len()
    }

    pub fn is_empty(&self) -> bool {
        self.members.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use membench_core::{Environment, ObjectFactory, ObjectVariant, OverheadMode};

    fn factory() -> ObjectFactory {
        ObjectFactory::new(Environment::new(OverheadMode::Compressed), ObjectVariant::Plain)
    }

    #[test]
    fn evicts_eldest_once_over_capacity() {
        let factory = factory();
        let mut ring = SurvivorRing::new(2);
        let a = factory.create(64, 65);
        let b = factory.create(64, 65);
        let c = factory.create(64, 65);

        assert!(ring.push(Arc::clone(&a)).is_none());
        assert!(ring.push(Arc::clone(&b)).is_none());
        let evicted = ring.push(Arc::clone(&c)).unwrap();
        assert!(Arc::ptr_eq(&evicted, &a));
        assert_eq!(ring.len(), 2);
    }

    #[test]
    fn zero_capacity_clamps_to_one() {
        let factory = factory();
        let mut ring = SurvivorRing::new(0);
        let a = factory.create(64, 65);
        let b = factory.create(64, 65);
        assert!(ring.push(a).is_none());
        assert!(ring.push(b).is_some());
    }
}
