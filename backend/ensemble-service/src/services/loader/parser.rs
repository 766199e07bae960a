use std::collections::HashSet;

use crate::models::Pair;

/// Parse `user:item1,item2,...` lines into `(user, item)` pairs.
///
/// Lines without a `:` or without items contribute nothing. Items are
/// trimmed, empty entries dropped and repeats within a user's line dropped
/// keeping the first occurrence.
pub fn parse_results(raw: &str) -> Vec<Pair> {
    let mut pairs = Vec::new();

    for line in raw.lines() {
        let Some((user, items)) = line.split_once(':') else {
            continue;
        };
        let user = user.trim();
        if user.is_empty() {
            continue;
        }

        let mut seen = HashSet::new();
        for item in items.split(',').map(str::trim).filter(|i| !i.is_empty()) {
            if seen.insert(item) {
                pairs.push((user.to_string(), item.to_string()));
            }
        }
    }

    pairs
}
