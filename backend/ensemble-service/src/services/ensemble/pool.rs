use std::sync::Arc;

use crate::models::{ResultSet, ResultSetId};

/// A result set together with its 1-based rank in the original score-sorted pool
#[derive(Debug, Clone)]
pub struct PoolEntry {
    rank: usize,
    result_set: Arc<ResultSet>,
}

impl PoolEntry {
    pub fn rank(&self) -> usize {
        self.rank
    }

    pub fn result_set(&self) -> &ResultSet {
        &self.result_set
    }

    pub fn id(&self) -> &ResultSetId {
        self.result_set.id()
    }

    pub fn score(&self) -> f64 {
        self.result_set.score()
    }
}

/// Candidates still available for selection.
///
/// A pool is an immutable snapshot: removing a member produces a new pool
/// and leaves the original untouched.
#[derive(Debug, Clone, Default)]
pub struct Pool {
    entries: Vec<PoolEntry>,
    full_size: usize,
}

impl Pool {
    /// Sort by score descending (stable) and assign ranks
    pub fn new(mut result_sets: Vec<ResultSet>) -> Self {
        result_sets.sort_by(|a, b| b.score().total_cmp(&a.score()));

        let entries: Vec<PoolEntry> = result_sets
            .into_iter()
            .enumerate()
            .map(|(i, rs)| PoolEntry {
                rank: i + 1,
                result_set: Arc::new(rs),
            })
            .collect();
        let full_size = entries.len();

        Self { entries, full_size }
    }

    pub fn entries(&self) -> &[PoolEntry] {
        &self.entries
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Size of the pool this snapshot was derived from
    pub fn full_size(&self) -> usize {
        self.full_size
    }

    pub fn result_sets(&self) -> impl Iterator<Item = &ResultSet> {
        self.entries.iter().map(PoolEntry::result_set)
    }

    /// Snapshot without `chosen`; without replacement, every other commit
    /// of the same `owner/repo` goes too.
    pub fn without(&self, chosen: &ResultSetId, allow_replacement: bool) -> Pool {
        let entries = self
            .entries
            .iter()
            .filter(|entry| {
                let id = entry.id();
                !(id == chosen || (!allow_replacement && id.same_repo(chosen)))
            })
            .cloned()
            .collect();

        Pool {
            entries,
            full_size: self.full_size,
        }
    }
}

/// Ordered, append-only list of chosen members
#[derive(Debug, Clone, Default)]
pub struct Ensemble {
    members: Vec<PoolEntry>,
    pool_size: usize,
}

impl Ensemble {
    pub fn new(pool_size: usize) -> Self {
        Self {
            members: Vec::new(),
            pool_size,
        }
    }

    pub fn push(&mut self, member: PoolEntry) {
        self.members.push(member);
    }

    pub fn members(&self) -> &[PoolEntry] {
        &self.members
    }

    pub fn last(&self) -> Option<&PoolEntry> {
        self.members.last()
    }

    pub fn len(&self) -> usize {
        self.members.len()
    }

    pub fn is_empty(&self) -> bool {
        self.members.is_empty()
    }

    /// Size of the original full pool, used by rank-based blending weights
    pub fn pool_size(&self) -> usize {
        self.pool_size
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::ResultSetMeta;

    fn rs(owner: &str, repo: &str, commit: &str, score: f64) -> ResultSet {
        ResultSet::new(&ResultSetMeta::new(owner, repo, commit, score), Vec::new())
    }

    #[test]
    fn test_pool_sorted_and_ranked() {
        let pool = Pool::new(vec![
            rs("a", "x", "c1", 80.0),
            rs("b", "y", "c1", 100.0),
            rs("c", "z", "c1", 90.0),
        ]);

        let owners: Vec<_> = pool.entries().iter().map(|e| e.id().owner.as_str()).collect();
        assert_eq!(owners, vec!["b", "c", "a"]);
        let ranks: Vec<_> = pool.entries().iter().map(PoolEntry::rank).collect();
        assert_eq!(ranks, vec![1, 2, 3]);
    }

    #[test]
    fn test_without_removes_whole_repo() {
        let pool = Pool::new(vec![
            rs("a", "x", "c1", 100.0),
            rs("a", "x", "c2", 95.0),
            rs("b", "y", "c1", 90.0),
        ]);
        let chosen = pool.entries()[0].id().clone();

        let next = pool.without(&chosen, false);
        assert_eq!(next.len(), 1);
        assert_eq!(next.entries()[0].id().owner, "b");
        assert_eq!(next.full_size(), 3);
        // Original snapshot untouched
        assert_eq!(pool.len(), 3);

        let with_replacement = pool.without(&chosen, true);
        assert_eq!(with_replacement.len(), 2);
        assert_eq!(with_replacement.entries()[0].id().commit, "c2");
    }
}
