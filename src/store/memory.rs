//! In-process store for development and tests
//!
//! Keys live in a `DashMap`, so each primitive runs under that key's shard
//! lock and is atomic per key. Sorted sets sit behind a `parking_lot` lock.

use dashmap::DashMap;
use futures::future::{self, BoxFuture, FutureExt};
use parking_lot::RwLock;
use std::collections::HashMap;

use super::{ScoreStore, ScoredMember, StoreError};

/// One sorted set; insertion order breaks score ties
#[derive(Debug, Default)]
struct SortedSet {
    scores: HashMap<String, (f64, u64)>,
    next_seq: u64,
}

impl SortedSet {
    fn add_gt(&mut self, member: &str, score: f64) -> bool {
        match self.scores.get_mut(member) {
            Some((current, _)) if score <= *current => false,
            Some((current, _)) => {
                *current = score;
                true
            }
            None => {
                self.scores.insert(member.to_string(), (score, self.next_seq));
                self.next_seq += 1;
                true
            }
        }
    }

    fn range_rev(&self, start: usize, stop: usize) -> Vec<ScoredMember> {
        let mut all: Vec<(&String, &(f64, u64))> = self.scores.iter().collect();
        all.sort_by(|a, b| {
            b.1 .0
                .partial_cmp(&a.1 .0)
                .unwrap_or(std::cmp::Ordering::Equal)
                .then(a.1 .1.cmp(&b.1 .1))
        });
        all.into_iter()
            .skip(start)
            .take(stop.saturating_sub(start) + 1)
            .map(|(member, (score, _))| ScoredMember {
                member: member.clone(),
                score: *score,
            })
            .collect()
    }
}

/// Memory-backed [`ScoreStore`]
#[derive(Default)]
pub struct MemoryStore {
    strings: DashMap<String, String>,
    sorted: RwLock<HashMap<String, SortedSet>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Plain write, used to seed state
    pub fn set(&self, key: &str, value: impl Into<String>) {
        self.strings.insert(key.to_string(), value.into());
    }
}

impl ScoreStore for MemoryStore {
    fn get<'a>(&'a self, key: &'a str) -> BoxFuture<'a, Result<Option<String>, StoreError>> {
        let value = self.strings.get(key).map(|v| v.value().clone());
        future::ready(Ok(value)).boxed()
    }

    fn set_max<'a>(&'a self, key: &'a str, value: i64) -> BoxFuture<'a, Result<i64, StoreError>> {
        let mut entry = self.strings.entry(key.to_string()).or_insert_with(|| "0".to_string());
        let previous = entry.parse::<i64>().unwrap_or(0);
        if value > previous {
            *entry = value.to_string();
        }
        drop(entry);
        future::ready(Ok(previous)).boxed()
    }

    fn claim_window<'a>(
        &'a self,
        key: &'a str,
        now_ms: i64,
        window_ms: i64,
    ) -> BoxFuture<'a, Result<bool, StoreError>> {
        let claimed = match self.strings.entry(key.to_string()) {
            dashmap::mapref::entry::Entry::Occupied(mut slot) => {
                let last = slot.get().parse::<i64>().ok();
                match last {
                    Some(last) if now_ms - last < window_ms => false,
                    _ => {
                        slot.insert(now_ms.to_string());
                        true
                    }
                }
            }
            dashmap::mapref::entry::Entry::Vacant(slot) => {
                slot.insert(now_ms.to_string());
                true
            }
        };
        future::ready(Ok(claimed)).boxed()
    }

    fn z_range_rev<'a>(
        &'a self,
        key: &'a str,
        start: usize,
        stop: usize,
    ) -> BoxFuture<'a, Result<Vec<ScoredMember>, StoreError>> {
        let members = self
            .sorted
            .read()
            .get(key)
            .map(|set| set.range_rev(start, stop))
            .unwrap_or_default();
        future::ready(Ok(members)).boxed()
    }

    fn z_score<'a>(
        &'a self,
        key: &'a str,
        member: &'a str,
    ) -> BoxFuture<'a, Result<Option<f64>, StoreError>> {
        let score = self
            .sorted
            .read()
            .get(key)
            .and_then(|set| set.scores.get(member).map(|(score, _)| *score));
        future::ready(Ok(score)).boxed()
    }

    fn z_add_gt<'a>(
        &'a self,
        key: &'a str,
        member: &'a str,
        score: f64,
    ) -> BoxFuture<'a, Result<bool, StoreError>> {
        let written = self
            .sorted
            .write()
            .entry(key.to_string())
            .or_default()
            .add_gt(member, score);
        future::ready(Ok(written)).boxed()
    }
}
