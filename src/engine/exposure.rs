use crate::domain::{ExposureLedger, Lineup, PlayerPool};
use std::collections::BTreeSet;
use tracing::debug;

const EPSILON: f64 = 1e-9;

/// Largest appearance count that keeps `usage / lineups` within `fraction`.
pub fn cap_count(fraction: f64, lineups: usize) -> u32 {
    (fraction * lineups as f64 + EPSILON).floor().max(0.0) as u32
}

/// Per-player usage gate for one generation batch.
///
/// A player is forced out of every remaining solve once one more appearance
/// would take it past its cap for the requested batch size. Usage never
/// decreases during generation, so the gate is one-way.
#[derive(Debug)]
pub struct ExposureTracker<'a> {
    pool: &'a PlayerPool,
    ledger: ExposureLedger,
    lineup_count: usize,
    max_exposure: f64,
    excluded: BTreeSet<usize>,
    locked: BTreeSet<usize>,
}

impl<'a> ExposureTracker<'a> {
    pub fn new(pool: &'a PlayerPool, lineup_count: usize, max_exposure: f64) -> Self {
        Self {
            pool,
            ledger: ExposureLedger::new(),
            lineup_count,
            max_exposure,
            excluded: BTreeSet::new(),
            locked: BTreeSet::new(),
        }
    }

    /// Players removed from the request up front.
    pub fn with_excluded(mut self, players: impl IntoIterator<Item = usize>) -> Self {
        self.excluded.extend(players);
        self
    }

    /// Players that must appear in every lineup while under their cap.
    pub fn with_locked(mut self, players: impl IntoIterator<Item = usize>) -> Self {
        self.locked.extend(players);
        self
    }

    /// Effective max exposure of a player.
    pub fn max_exposure_of(&self, player: usize) -> f64 {
        self.pool
            .get(player)
            .max_exposure
            .unwrap_or(self.max_exposure)
    }

    /// Appearance ceiling of a player within the requested batch.
    pub fn max_count(&self, player: usize) -> u32 {
        cap_count(self.max_exposure_of(player), self.lineup_count)
    }

    /// Gates every player that has reached its cap; returns the newly gated.
    pub fn refresh(&mut self) -> Vec<usize> {
        let newly: Vec<usize> = (0..self.pool.len())
            .filter(|p| !self.excluded.contains(p))
            .filter(|&p| self.ledger.usage(p) + 1 > self.max_count(p))
            .collect();
        for &p in &newly {
            debug!(
                event = "player_capped",
                player = %self.pool.get(p).id,
                usage = self.ledger.usage(p),
                lineups = self.ledger.lineups(),
            );
        }
        self.excluded.extend(&newly);
        newly
    }

    pub fn excluded(&self) -> &BTreeSet<usize> {
        &self.excluded
    }

    /// Players to force into the next solve.
    ///
    /// Locked players always; players with a minimum exposure once the
    /// lineups left are no more than their missing appearances. Best effort:
    /// the caller drops the set when it makes the solve infeasible.
    pub fn forced_in(&self) -> BTreeSet<usize> {
        let remaining = self.lineup_count.saturating_sub(self.ledger.lineups()) as u32;
        let behind_minimum = (0..self.pool.len()).filter(|&p| {
            self.pool.get(p).min_exposure.is_some_and(|min| {
                let wanted = (min * self.lineup_count as f64 - EPSILON).ceil().max(0.0) as u32;
                let missing = wanted.saturating_sub(self.ledger.usage(p));
                missing > 0 && missing >= remaining
            })
        });

        self.locked
            .iter()
            .copied()
            .chain(behind_minimum)
            .filter(|p| !self.excluded.contains(p))
            .collect()
    }

    /// Counts an accepted lineup.
    pub fn accept(&mut self, lineup: &Lineup) {
        self.ledger.record(lineup);
    }

    pub fn into_ledger(self) -> ExposureLedger {
        self.ledger
    }
}
