use std::collections::HashMap;
use std::sync::Mutex;

use chrono::{DateTime, Utc};
use rand::seq::SliceRandom;
use rand::Rng;

/// Usage bookkeeping for one category.
#[derive(Debug, Clone, Default)]
pub struct CategoryUsageStat {
    pub global_uses: u64,
    pub chat_uses: HashMap<i64, u64>,
    pub last_used: Option<DateTime<Utc>>,
}

const BASE_WEIGHT: f64 = 100.0;
const USAGE_PENALTY_PER_USE: f64 = 4.0;
const USAGE_PENALTY_CAP: f64 = 60.0;
const CHAT_PENALTY_PER_USE: f64 = 2.0;
const CHAT_PENALTY_CAP: f64 = 20.0;
const RECENCY_BONUS_PER_DAY: f64 = 5.0;
const RECENCY_BONUS_CAP: f64 = 40.0;
const MIN_WEIGHT: f64 = 1.0;

/// Picks session categories with a bias towards rarely-used and
/// long-unused ones.
///
/// Sampling is weighted and without replacement. The random source is
/// supplied by the caller so selection can be reproduced in tests.
pub struct CategorySelector {
    stats: Mutex<HashMap<String, CategoryUsageStat>>,
}

impl Default for CategorySelector {
    fn default() -> Self {
        Self::new()
    }
}

impl CategorySelector {
    pub fn new() -> Self {
        Self {
            stats: Mutex::new(HashMap::new()),
        }
    }

    /// Returns `target_count` categories drawn from `candidates`, or all of
    /// them (order randomized) when the target meets or exceeds the pool.
    /// The chat id scopes the per-chat share of the usage penalty.
    pub fn pick<R: Rng>(
        &self,
        candidates: &[String],
        target_count: usize,
        chat_id: i64,
        rng: &mut R,
    ) -> Vec<String> {
        if candidates.is_empty() || target_count == 0 {
            return Vec::new();
        }

        let mut pool: Vec<String> = candidates.to_vec();
        if target_count >= pool.len() {
            pool.shuffle(rng);
            return pool;
        }

        let weights: HashMap<String, f64> = {
            let stats = self.stats.lock().unwrap_or_else(|p| p.into_inner());
            pool.iter()
                .map(|name| (name.clone(), Self::weight(stats.get(name), chat_id)))
                .collect()
        };

        let mut picked = Vec::with_capacity(target_count);
        while picked.len() < target_count && !pool.is_empty() {
            let total: f64 = pool.iter().map(|name| weights[name]).sum();
            let mut ticket = rng.random_range(0.0..total);
            let mut chosen = pool.len() - 1;
            for (i, name) in pool.iter().enumerate() {
                ticket -= weights[name];
                if ticket <= 0.0 {
                    chosen = i;
                    break;
                }
            }
            picked.push(pool.swap_remove(chosen));
        }
        picked
    }

    /// Records that the given categories were used for a session in `chat`.
    /// Called once per session start, not per answer.
    pub fn record_usage(&self, categories: &[String], chat_id: i64) {
        let now = Utc::now();
        let mut stats = self.stats.lock().unwrap_or_else(|p| p.into_inner());
        for name in categories {
            let entry = stats.entry(name.clone()).or_default();
            entry.global_uses += 1;
            *entry.chat_uses.entry(chat_id).or_insert(0) += 1;
            entry.last_used = Some(now);
        }
    }

    pub fn usage_of(&self, category: &str) -> CategoryUsageStat {
        let stats = self.stats.lock().unwrap_or_else(|p| p.into_inner());
        stats.get(category).cloned().unwrap_or_default()
    }

    fn weight(stat: Option<&CategoryUsageStat>, chat_id: i64) -> f64 {
        let Some(stat) = stat else {
            // Never used anywhere: base plus the full recency bonus.
            return BASE_WEIGHT + RECENCY_BONUS_CAP;
        };
        let global_penalty =
            (stat.global_uses as f64 * USAGE_PENALTY_PER_USE).min(USAGE_PENALTY_CAP);
        let chat_penalty = (stat.chat_uses.get(&chat_id).copied().unwrap_or(0) as f64
            * CHAT_PENALTY_PER_USE)
            .min(CHAT_PENALTY_CAP);
        let bonus = match stat.last_used {
            None => RECENCY_BONUS_CAP,
            Some(at) => {
                let days = (Utc::now() - at).num_hours().max(0) as f64 / 24.0;
                (days * RECENCY_BONUS_PER_DAY).min(RECENCY_BONUS_CAP)
            }
        };
        (BASE_WEIGHT - global_penalty - chat_penalty + bonus).max(MIN_WEIGHT)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn weight_floors_at_minimum() {
        let stat = CategoryUsageStat {
            global_uses: 1_000,
            chat_uses: HashMap::from([(1, 1_000)]),
            last_used: Some(Utc::now()),
        };
        assert!(CategorySelector::weight(Some(&stat), 1) >= MIN_WEIGHT);
    }

    #[test]
    fn unused_category_outweighs_heavily_used_one() {
        let heavy = CategoryUsageStat {
            global_uses: 50,
            chat_uses: HashMap::new(),
            last_used: Some(Utc::now()),
        };
        assert!(CategorySelector::weight(None, 1) > CategorySelector::weight(Some(&heavy), 1));
    }

    #[test]
    fn usage_in_the_same_chat_weighs_heavier_than_elsewhere() {
        let stat = CategoryUsageStat {
            global_uses: 5,
            chat_uses: HashMap::from([(1, 5)]),
            last_used: Some(Utc::now()),
        };
        assert!(CategorySelector::weight(Some(&stat), 2) > CategorySelector::weight(Some(&stat), 1));
    }

    #[test]
    fn record_usage_tracks_per_chat_counts() {
        let selector = CategorySelector::new();
        let cats = vec!["history".to_string()];
        selector.record_usage(&cats, 1);
        selector.record_usage(&cats, 1);
        selector.record_usage(&cats, 2);

        let stat = selector.usage_of("history");
        assert_eq!(stat.global_uses, 3);
        assert_eq!(stat.chat_uses[&1], 2);
        assert_eq!(stat.chat_uses[&2], 1);
        assert!(stat.last_used.is_some());
    }
}
