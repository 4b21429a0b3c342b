use super::lineup::{Lineup, LineupBatch};
use std::collections::{BTreeSet, HashMap};

pub type PairKey = (usize, usize);

pub fn pair_key(a: usize, b: usize) -> PairKey {
    if a <= b {
        (a, b)
    } else {
        (b, a)
    }
}

/// Unordered player pairs formed by one lineup's occupants.
pub fn lineup_pairs(players: &[usize]) -> BTreeSet<PairKey> {
    let mut pairs = BTreeSet::new();
    for (i, &a) in players.iter().enumerate() {
        for &b in &players[i + 1..] {
            pairs.insert(pair_key(a, b));
        }
    }
    pairs
}

/// Usage counts for players and player pairs across a batch.
///
/// Request-scoped: created empty for each request, grown as lineups are
/// accepted and rewritten in place by diversification.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ExposureLedger {
    usage: HashMap<usize, u32>,
    pairs: HashMap<PairKey, u32>,
    lineups: usize,
}

impl ExposureLedger {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_batch(batch: &LineupBatch) -> Self {
        let mut ledger = Self::new();
        for lineup in batch {
            ledger.record(lineup);
        }
        ledger
    }

    /// Counts a newly accepted lineup.
    pub fn record(&mut self, lineup: &Lineup) {
        for &player in lineup.players() {
            *self.usage.entry(player).or_default() += 1;
        }
        for pair in lineup_pairs(lineup.players()) {
            *self.pairs.entry(pair).or_default() += 1;
        }
        self.lineups += 1;
    }

    /// Moves the counts of one lineup from `before` to `after`.
    ///
    /// Pair sets are derived from both full occupant lists, so pairs present
    /// on both sides are left untouched.
    pub fn substitute(&mut self, before: &[usize], after: &[usize]) {
        for &player in before.iter().filter(|p| !after.contains(p)) {
            decrement(&mut self.usage, player);
        }
        for &player in after.iter().filter(|p| !before.contains(p)) {
            *self.usage.entry(player).or_default() += 1;
        }

        let old_pairs = lineup_pairs(before);
        let new_pairs = lineup_pairs(after);
        for &pair in old_pairs.difference(&new_pairs) {
            decrement(&mut self.pairs, pair);
        }
        for &pair in new_pairs.difference(&old_pairs) {
            *self.pairs.entry(pair).or_default() += 1;
        }
    }

    pub fn usage(&self, player: usize) -> u32 {
        self.usage.get(&player).copied().unwrap_or(0)
    }

    pub fn pair(&self, a: usize, b: usize) -> u32 {
        self.pairs.get(&pair_key(a, b)).copied().unwrap_or(0)
    }

    pub fn lineups(&self) -> usize {
        self.lineups
    }

    /// Fraction of lineups containing `player`.
    pub fn exposure(&self, player: usize) -> f64 {
        ratio(self.usage(player), self.lineups)
    }

    pub fn pair_exposure(&self, a: usize, b: usize) -> f64 {
        ratio(self.pair(a, b), self.lineups)
    }

    /// Players with non-zero usage.
    pub fn used_players(&self) -> impl Iterator<Item = (usize, u32)> + '_ {
        self.usage
            .iter()
            .filter(|(_, &count)| count > 0)
            .map(|(&player, &count)| (player, count))
    }

    /// Pairs with non-zero co-occurrence.
    pub fn used_pairs(&self) -> impl Iterator<Item = (PairKey, u32)> + '_ {
        self.pairs
            .iter()
            .filter(|(_, &count)| count > 0)
            .map(|(&pair, &count)| (pair, count))
    }
}

fn decrement<K: std::hash::Hash + Eq>(counts: &mut HashMap<K, u32>, key: K) {
    if let Some(count) = counts.get_mut(&key) {
        *count = count.saturating_sub(1);
        if *count == 0 {
            counts.remove(&key);
        }
    }
}

fn ratio(count: u32, lineups: usize) -> f64 {
    if lineups == 0 {
        0.0
    } else {
        count as f64 / lineups as f64
    }
}
