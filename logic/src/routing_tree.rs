use std::time::Instant;

use crate::bucket::{AddOutcome, Bucket};
use crate::id::Id;
use crate::node::Node;

/// The routing table's contact storage: an ordered, non-overlapping set of
/// [`Bucket`]s covering the full id space `[Id::MIN, Id::MAX]`.
///
/// Buckets only split when they are full *and* their range contains this
/// node's own id, so resolution is coarse far away from `self_id` and fine
/// close to it, the same shape the original implementation's bucket tree
/// maintains.
#[derive(Debug, Clone)]
pub struct RoutingTree {
    self_id: Id,
    bucket_size: usize,
    /// Sorted by `low` (equivalently by `high`, since ranges are
    /// non-overlapping and contiguous).
    buckets: Vec<Bucket>,
}

impl RoutingTree {
    pub fn new(self_id: Id, bucket_size: usize) -> Self {
        RoutingTree {
            self_id,
            bucket_size,
            buckets: vec![Bucket::new(Id::MIN, Id::MAX, bucket_size)],
        }
    }

    pub fn self_id(&self) -> Id {
        self.self_id
    }

    pub fn bucket_count(&self) -> usize {
        self.buckets.len()
    }

    pub fn size(&self) -> usize {
        self.buckets.iter().map(Bucket::len).sum()
    }

    pub fn buckets(&self) -> &[Bucket] {
        &self.buckets
    }

    /// Index of the (unique) bucket whose range contains `id`.
    ///
    /// Buckets are sorted and cover the id space without gaps or overlap,
    /// so the first bucket whose `high` is not below `id` is the owner.
    /// A linear scan would also be correct here (and is what the original
    /// implementation does); a partition point is the direct idiomatic-Rust
    /// equivalent once the buckets are known to be sorted.
    fn bucket_index(&self, id: &Id) -> usize {
        self.buckets.partition_point(|b| b.high() < *id)
    }

    pub fn find(&self, id: &Id) -> Option<&Node> {
        self.buckets[self.bucket_index(id)].find(id)
    }

    pub fn contains(&self, id: &Id) -> bool {
        self.find(id).is_some()
    }

    pub fn remove(&mut self, id: &Id) -> Option<Node> {
        let idx = self.bucket_index(id);
        self.buckets[idx].remove(id)
    }

    /// Attempts to split the bucket at `idx` in two. No-op (returns
    /// `false`) if the bucket's range cannot be subdivided further.
    fn split_bucket(&mut self, idx: usize) -> bool {
        match self.buckets[idx].split() {
            Some((left, right)) => {
                self.buckets.splice(idx..=idx, [left, right]);
                true
            }
            None => false,
        }
    }

    /// Adds (or refreshes) a contact.
    ///
    /// When the owning bucket is full, it is split only if it contains
    /// `self_id` (so resolution grows near our own id, not uniformly); the
    /// insert is then retried against whichever half now owns `node`'s id.
    /// If the bucket cannot be split (or does not contain `self_id`), the
    /// bucket stays full and [`AddOutcome::Full`] is returned so the caller
    /// can decide whether to probe the bucket's worst contact instead.
    pub fn add(&mut self, node: Node, now: Instant) -> AddOutcome {
        loop {
            let idx = self.bucket_index(&node.id());
            match self.buckets[idx].add(node, now) {
                AddOutcome::Full if self.buckets[idx].in_bounds(&self.self_id) => {
                    if !self.split_bucket(idx) {
                        return AddOutcome::Full;
                    }
                    // retry against whichever half now owns this id.
                }
                outcome => return outcome,
            }
        }
    }

    /// Evicts bad contacts from every bucket. Returns the total removed.
    pub fn evict_bad(&mut self, now: Instant) -> usize {
        self.buckets.iter_mut().map(|b| b.evict_bad(now)).sum()
    }

    /// Returns up to `count` contacts closest to `target` by XOR distance,
    /// nearest first.
    ///
    /// Starts at `target`'s owning bucket and walks outward to
    /// neighbouring buckets until enough candidates are collected (or the
    /// whole tree has been scanned), then sorts the candidates by distance.
    /// This avoids a full-tree scan in the common case where the owning
    /// bucket (and its immediate neighbours) already holds enough contacts.
    pub fn closest_nodes(&self, target: &Id, count: usize) -> Vec<Node> {
        if count == 0 || self.buckets.is_empty() {
            return Vec::new();
        }
        let start = self.bucket_index(target);
        let mut collected: Vec<Node> = self.buckets[start].contacts().to_vec();

        let mut lo = start;
        let mut hi = start;
        while collected.len() < count && (lo > 0 || hi + 1 < self.buckets.len()) {
            if lo > 0 {
                lo -= 1;
                collected.extend_from_slice(self.buckets[lo].contacts());
            }
            if hi + 1 < self.buckets.len() {
                hi += 1;
                collected.extend_from_slice(self.buckets[hi].contacts());
            }
        }

        collected.sort_by_key(|n| n.id().xor(target));
        collected.truncate(count);
        collected
    }
}
