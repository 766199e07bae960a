use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet};
use std::fmt;

/// A single `(user, item)` recommendation
pub type Pair = (String, String);

/// Identity of one submission: `(owner, repo, commit)`
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ResultSetId {
    pub owner: String,
    pub repo: String,
    pub commit: String,
}

impl ResultSetId {
    /// `owner/repo`, the identity used by no-replacement removal
    pub fn repo_key(&self) -> String {
        format!("{}/{}", self.owner, self.repo)
    }

    pub fn same_repo(&self, other: &ResultSetId) -> bool {
        self.owner == other.owner && self.repo == other.repo
    }
}

impl fmt::Display for ResultSetId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}/{}", self.owner, self.repo, self.commit)
    }
}

/// Submission metadata, cheap to obtain from a listing
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ResultSetMeta {
    pub owner: String,
    pub repo: String,
    pub commit: String,
    pub score: f64,
}

impl ResultSetMeta {
    pub fn new(owner: &str, repo: &str, commit: &str, score: f64) -> Self {
        Self {
            owner: owner.to_string(),
            repo: repo.to_string(),
            commit: commit.to_string(),
            score,
        }
    }

    pub fn id(&self) -> ResultSetId {
        ResultSetId {
            owner: self.owner.clone(),
            repo: self.repo.clone(),
            commit: self.commit.clone(),
        }
    }
}

impl fmt::Display for ResultSetMeta {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}, score: {}", self.owner, self.repo, self.score)
    }
}

/// One submission with its materialized recommendations.
///
/// Only available result sets are ever constructed; a submission whose
/// results could not be fetched stays a bare [`ResultSetMeta`] and never
/// reaches the pool.
#[derive(Debug, Clone)]
pub struct ResultSet {
    id: ResultSetId,
    score: f64,
    /// Pairs in production order, duplicates removed per user
    results: Vec<Pair>,
    lookup: HashSet<Pair>,
}

impl ResultSet {
    pub fn new(meta: &ResultSetMeta, pairs: impl IntoIterator<Item = Pair>) -> Self {
        let mut lookup = HashSet::new();
        let mut results = Vec::new();
        for pair in pairs {
            if lookup.insert(pair.clone()) {
                results.push(pair);
            }
        }

        Self {
            id: meta.id(),
            score: meta.score,
            results,
            lookup,
        }
    }

    pub fn id(&self) -> &ResultSetId {
        &self.id
    }

    pub fn score(&self) -> f64 {
        self.score
    }

    pub fn results(&self) -> &[Pair] {
        &self.results
    }

    /// The recommendations as a set, for similarity computation
    pub fn pair_set(&self) -> &HashSet<Pair> {
        &self.lookup
    }

    pub fn len(&self) -> usize {
        self.results.len()
    }

    pub fn is_empty(&self) -> bool {
        self.results.is_empty()
    }
}

impl fmt::Display for ResultSet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}, score: {}", self.id, self.score)
    }
}

/// An item recommended to a user with its accumulated vote weight
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScoredItem {
    pub item: String,
    pub weight: f64,
}

/// Blended output: user → ranked items, at most `repo_recommendations_per_user` each
#[derive(Debug, Clone, Default, PartialEq)]
pub struct UserRecommendations {
    by_user: HashMap<String, Vec<ScoredItem>>,
}

impl UserRecommendations {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, user: String, items: Vec<ScoredItem>) {
        self.by_user.insert(user, items);
    }

    /// Items for `user`; a user without votes yields an empty slice
    pub fn get(&self, user: &str) -> &[ScoredItem] {
        self.by_user.get(user).map(Vec::as_slice).unwrap_or(&[])
    }

    pub fn contains_user(&self, user: &str) -> bool {
        self.by_user.contains_key(user)
    }

    pub fn users(&self) -> impl Iterator<Item = &str> {
        self.by_user.keys().map(String::as_str)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &[ScoredItem])> {
        self.by_user
            .iter()
            .map(|(user, items)| (user.as_str(), items.as_slice()))
    }

    pub fn len(&self) -> usize {
        self.by_user.len()
    }

    pub fn is_empty(&self) -> bool {
        self.by_user.is_empty()
    }

    /// Flatten into the `(user, item)` set used as the similarity target
    pub fn pair_set(&self) -> HashSet<Pair> {
        self.by_user
            .iter()
            .flat_map(|(user, items)| {
                items
                    .iter()
                    .map(move |scored| (user.clone(), scored.item.clone()))
            })
            .collect()
    }
}
