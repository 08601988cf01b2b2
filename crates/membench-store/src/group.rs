//! A single layer of the long-lived object store.

use std::sync::Arc;

use membench_core::AllocatedObject;
use rand::Rng;

/// One layer of the store. Members may only hold a forward reference into
/// the next group (index + 1); callers are responsible for respecting that
/// when wiring `set_next`.
#[derive(Default)]
pub struct Group {
    members: Vec<Arc<AllocatedObject>>,
}

impl Group {
    pub fn len(&self) -> usize {
        self.members.len()
    }

    pub fn is_empty(&self) -> bool {
        self.members.is_empty()
    }

    pub fn is_full(&self, max_items: usize) -> bool {
        self.members.len() >= max_items
    }

    pub fn push(&mut self, object: Arc<AllocatedObject>) {
        self.members.push(object);
    }

    pub fn members(&self) -> &[Arc<AllocatedObject>] {
        &self.members
    }

    /// Pick a uniformly random member, bounded to the group's current
    /// length (never the nominal group capacity).
    pub fn random_member(&self) -> Option<&Arc<AllocatedObject>> {
        if self.members.is_empty() {
            return None;
        }
        let idx = rand::thread_rng().gen_range(0..self.members.len());
        Some(&self.members[idx])
    }

    /// Remove and return a uniformly random member.
    pub fn remove_random(&mut self) -> Option<Arc<AllocatedObject>> {
        if self.members.is_empty() {
            return None;
        }
        let idx = rand::thread_rng().gen_range(0..self.members.len());
        Some(self.members.swap_remove(idx))
    }

    /// Clear any member's forward reference that points at `victim`.
    pub fn clear_refs_to(&self, victim: &Arc<AllocatedObject>) {
        for member in &self.members {
            if let Some(next) = member.next() {
                if Arc::ptr_eq(&next, victim) {
                    member.set_next(None);
                }
            }
        }
    }
}
