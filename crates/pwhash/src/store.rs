use crate::{Digest, RequestId};
use dashmap::DashMap;

/// Concurrent map from [`RequestId`] to the finished [`Digest`].
///
/// The map is sharded, so writers on different keys rarely contend and
/// readers never block on an unrelated write. Each key has a single writer
/// (the deferred task that owns the request); a repeated `put` on the same key
/// replaces the value, but nothing in this crate does that.
///
/// A missing entry means "not computed yet". Unknown and pending IDs are
/// indistinguishable by design of the read path.
#[derive(Debug, Default)]
pub struct ResultStore {
    digests: DashMap<RequestId, Digest>,
}

impl ResultStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Publishes the digest for `id`.
    pub fn put(&self, id: RequestId, digest: Digest) {
        self.digests.insert(id, digest);
    }

    /// Returns a copy of the digest for `id`, or `None` if it has not been
    /// stored.
    pub fn get(&self, id: RequestId) -> Option<Digest> {
        self.digests.get(&id).map(|entry| entry.value().clone())
    }

    pub fn len(&self) -> usize {
        self.digests.len()
    }

    pub fn is_empty(&self) -> bool {
        self.digests.is_empty()
    }
}
