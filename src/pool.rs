//! Thread-local scratch buffer pool for the matching hot path.
//!
//! Grounded on the teacher's `orderbook::pool::MatchingPool`: a per-thread
//! `RefCell<Vec<Vec<_>>>` free list, so the matching loop can borrow a
//! scratch `Vec<OrderId>` (filled-order ids to remove, STP cancellations)
//! without an allocation on every call, returning it when the match
//! completes.

use crate::types::OrderId;
use std::cell::RefCell;

#[derive(Default)]
pub struct MatchingPool {
    id_vecs: RefCell<Vec<Vec<OrderId>>>,
}

thread_local! {
    static MATCHING_POOL: MatchingPool = MatchingPool::default();
}

/// A pooled `Vec<OrderId>` that returns itself to the thread-local pool on drop.
pub struct PooledIds {
    inner: Option<Vec<OrderId>>,
}

impl PooledIds {
    pub fn take() -> Self {
        let inner = MATCHING_POOL.with(|pool| pool.id_vecs.borrow_mut().pop());
        Self {
            inner: Some(inner.unwrap_or_default()),
        }
    }
}

impl std::ops::Deref for PooledIds {
    type Target = Vec<OrderId>;
    fn deref(&self) -> &Self::Target {
        self.inner.as_ref().expect("pooled vec taken")
    }
}

impl std::ops::DerefMut for PooledIds {
    fn deref_mut(&mut self) -> &mut Self::Target {
        self.inner.as_mut().expect("pooled vec taken")
    }
}

impl Drop for PooledIds {
    fn drop(&mut self) {
        if let Some(mut v) = self.inner.take() {
            v.clear();
            MATCHING_POOL.with(|pool| pool.id_vecs.borrow_mut().push(v));
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn reused_across_acquisitions() {
        {
            let mut v = PooledIds::take();
            v.push(1);
            v.push(2);
        }
        let v = PooledIds::take();
        assert!(v.is_empty());
    }
}
