//! Cross-mineral dominance leaderboard entries.

use std::cmp::Ordering;
use std::collections::BTreeMap;

use serde::Serialize;

/// Rank at or below which a placement counts towards `top5_count`.
pub const TOP_TIER_RANK: usize = 5;

/// One entity's aggregate standing across every active mineral.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DominanceEntry {
    pub entity_code: String,
    pub display_name: String,
    /// Sum of `depth + 1 - rank` over every ranked mineral.
    pub score: u32,
    /// mineral → 1-based rank.
    pub ranks: BTreeMap<String, usize>,
    pub mineral_count: usize,
    pub top5_count: usize,
}

impl DominanceEntry {
    pub fn new(entity_code: &str, display_name: &str) -> Self {
        Self {
            entity_code: entity_code.to_string(),
            display_name: display_name.to_string(),
            score: 0,
            ranks: BTreeMap::new(),
            mineral_count: 0,
            top5_count: 0,
        }
    }

    /// Record a placement in one mineral's top list.
    pub fn award(&mut self, mineral: &str, rank: usize, depth: usize) {
        if rank == 0 || rank > depth {
            return;
        }
        let points = u32::try_from(depth - rank + 1).unwrap_or(u32::MAX);
        self.score = self.score.saturating_add(points);
        self.ranks.insert(mineral.to_string(), rank);
        self.mineral_count += 1;
        if rank <= TOP_TIER_RANK {
            self.top5_count += 1;
        }
    }

    /// Leaderboard order: score, then top-5 placements, descending; entity
    /// code ascending last.
    pub fn leaderboard_cmp(&self, other: &Self) -> Ordering {
        other
            .score
            .cmp(&self.score)
            .then_with(|| other.top5_count.cmp(&self.top5_count))
            .then_with(|| self.entity_code.cmp(&other.entity_code))
    }
}
