use crate::domain::{
    ExposureLedger, Lineup, LineupBatch, LineupConstraints, PlayerPool, RosterTemplate,
};
use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::{Rng, SeedableRng};
use serde::Serialize;
use std::collections::BTreeSet;
use tracing::{debug, info};

const EPSILON: f64 = 1e-9;

/// Targets and aggressiveness of a diversification pass
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DiversificationSettings {
    pub max_exposure: f64,
    pub max_pair_exposure: f64,
    /// Probability of attempting a replacement for an over-target slot.
    pub randomness: f64,
    pub seed: Option<u64>,
}

impl Default for DiversificationSettings {
    fn default() -> Self {
        Self {
            max_exposure: 1.0,
            max_pair_exposure: 1.0,
            randomness: 1.0,
            seed: None,
        }
    }
}

/// A slot left over target because no candidate passed every check.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct UnresolvedSlot {
    pub lineup: usize,
    pub slot: usize,
    pub player: usize,
    pub exposure: f64,
    pub pair_exposure: f64,
    pub candidates: usize,
}

/// A player, or a pair when `partner` is set, still above its exposure
/// target once a batch is final.
///
/// Reported as a warning, never raised as an error.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ExposureUnsatisfiable {
    pub player: usize,
    pub partner: Option<usize>,
    pub lineups: u32,
    pub exposure: f64,
    pub target: f64,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct DiversificationReport {
    /// Slots whose occupant was over a target when visited.
    pub over_target: usize,
    pub attempted: usize,
    /// Over-target slots left alone by the randomness draw or a pin.
    pub skipped: usize,
    pub substitutions: usize,
    pub unresolved: Vec<UnresolvedSlot>,
    /// Every player and pair still over target after the pass.
    pub residual: Vec<ExposureUnsatisfiable>,
}

/// Greedy randomized local search over a finished batch.
///
/// Visits every lineup then every slot once. An occupant over its exposure
/// or pair target is swapped for the first shuffled candidate that keeps the
/// lineup valid and stays within every target. Never backtracks. A batch
/// already within target is left untouched.
pub struct DiversificationEngine<'a> {
    pool: &'a PlayerPool,
    template: &'a RosterTemplate,
    constraints: &'a LineupConstraints,
    settings: DiversificationSettings,
    excluded: BTreeSet<usize>,
    pinned: BTreeSet<usize>,
}

impl<'a> DiversificationEngine<'a> {
    pub fn new(
        pool: &'a PlayerPool,
        template: &'a RosterTemplate,
        constraints: &'a LineupConstraints,
        settings: DiversificationSettings,
    ) -> Self {
        Self {
            pool,
            template,
            constraints,
            settings,
            excluded: BTreeSet::new(),
            pinned: BTreeSet::new(),
        }
    }

    /// Players that must never be brought in.
    pub fn with_excluded(mut self, players: impl IntoIterator<Item = usize>) -> Self {
        self.excluded.extend(players);
        self
    }

    /// Players that must never be swapped out.
    pub fn with_pinned(mut self, players: impl IntoIterator<Item = usize>) -> Self {
        self.pinned.extend(players);
        self
    }

    pub fn run(
        &self,
        batch: &mut LineupBatch,
        ledger: &mut ExposureLedger,
    ) -> DiversificationReport {
        let mut rng = match self.settings.seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_os_rng(),
        };
        self.run_with_rng(batch, ledger, &mut rng)
    }

    pub fn run_with_rng<R: Rng>(
        &self,
        batch: &mut LineupBatch,
        ledger: &mut ExposureLedger,
        rng: &mut R,
    ) -> DiversificationReport {
        let mut report = DiversificationReport::default();
        let size = batch.len();
        if size == 0 {
            return report;
        }
        let randomness = self.settings.randomness.clamp(0.0, 1.0);

        for index in 0..size {
            for slot in 0..self.template.len() {
                let Some(lineup) = batch.get(index) else {
                    continue;
                };
                let occupant = lineup.players()[slot];
                let exposure = ratio(ledger.usage(occupant), size);
                let pair_exposure = worst_pair(ledger, lineup, occupant, size);

                if exposure <= self.max_exposure_of(occupant) + EPSILON
                    && pair_exposure <= self.settings.max_pair_exposure + EPSILON
                {
                    continue;
                }
                report.over_target += 1;

                if self.pinned.contains(&occupant) || !rng.random_bool(randomness) {
                    report.skipped += 1;
                    continue;
                }
                report.attempted += 1;

                let mut candidates: Vec<usize> = (0..self.pool.len())
                    .filter(|&c| !lineup.contains(c) && !self.excluded.contains(&c))
                    .filter(|&c| self.template.slots[slot].accepts(self.pool.get(c)))
                    .collect();
                candidates.shuffle(rng);

                let replacement = candidates.iter().find_map(|&candidate| {
                    let proposal = lineup.with_substitution(self.pool, self.template, slot, candidate);
                    self.admits(batch, ledger, index, candidate, &proposal)
                        .then_some(proposal)
                });

                match replacement {
                    Some(proposal) => {
                        debug!(
                            event = "slot_substituted",
                            lineup = index,
                            slot = %self.template.slots[slot].name,
                            removed = %self.pool.get(occupant).id,
                            added = %self.pool.get(proposal.players()[slot]).id,
                        );
                        ledger.substitute(lineup.players(), proposal.players());
                        batch.replace(index, proposal);
                        report.substitutions += 1;
                    }
                    None => report.unresolved.push(UnresolvedSlot {
                        lineup: index,
                        slot,
                        player: occupant,
                        exposure,
                        pair_exposure,
                        candidates: candidates.len(),
                    }),
                }
            }
        }

        report.residual = residual_violations(self.pool, ledger, size, &self.settings);

        info!(
            event = "diversification_end",
            lineups = size,
            over_target = report.over_target,
            substitutions = report.substitutions,
            skipped = report.skipped,
            unresolved = report.unresolved.len(),
            residual = report.residual.len(),
        );
        report
    }

    fn max_exposure_of(&self, player: usize) -> f64 {
        self.pool
            .get(player)
            .max_exposure
            .unwrap_or(self.settings.max_exposure)
    }

    /// Whether swapping `candidate` into lineup `index` keeps every hard
    /// constraint and every target.
    fn admits(
        &self,
        batch: &LineupBatch,
        ledger: &ExposureLedger,
        index: usize,
        candidate: usize,
        proposal: &Lineup,
    ) -> bool {
        let size = batch.len();

        if ratio(ledger.usage(candidate) + 1, size) > self.max_exposure_of(candidate) + EPSILON {
            return false;
        }

        // Every pair the candidate forms is new to this lineup.
        let pairs_ok = proposal
            .players()
            .iter()
            .filter(|&&other| other != candidate)
            .all(|&other| {
                ratio(ledger.pair(candidate, other) + 1, size)
                    <= self.settings.max_pair_exposure + EPSILON
            });
        if !pairs_ok {
            return false;
        }

        if !self.constraints.is_valid(self.template, self.pool, proposal) {
            return false;
        }

        let others = batch
            .iter()
            .enumerate()
            .filter(|(i, _)| *i != index)
            .map(|(_, lineup)| lineup);
        self.constraints.respects_repeats(proposal, others)
    }
}

/// Scans a finished batch for players and pairs above their targets.
///
/// Exposure is measured against `size`, the number of lineups produced.
/// Players come first, most exposed first, then pairs.
pub fn residual_violations(
    pool: &PlayerPool,
    ledger: &ExposureLedger,
    size: usize,
    settings: &DiversificationSettings,
) -> Vec<ExposureUnsatisfiable> {
    if size == 0 {
        return Vec::new();
    }

    let mut players: Vec<ExposureUnsatisfiable> = ledger
        .used_players()
        .filter_map(|(player, lineups)| {
            let target = pool.get(player).max_exposure.unwrap_or(settings.max_exposure);
            let exposure = ratio(lineups, size);
            (exposure > target + EPSILON).then_some(ExposureUnsatisfiable {
                player,
                partner: None,
                lineups,
                exposure,
                target,
            })
        })
        .collect();

    let target = settings.max_pair_exposure;
    let mut pairs: Vec<ExposureUnsatisfiable> = ledger
        .used_pairs()
        .filter_map(|((player, partner), lineups)| {
            let exposure = ratio(lineups, size);
            (exposure > target + EPSILON).then_some(ExposureUnsatisfiable {
                player,
                partner: Some(partner),
                lineups,
                exposure,
                target,
            })
        })
        .collect();

    for group in [&mut players, &mut pairs] {
        group.sort_by(|a, b| {
            b.lineups
                .cmp(&a.lineups)
                .then(a.player.cmp(&b.player))
                .then(a.partner.cmp(&b.partner))
        });
    }
    players.extend(pairs);
    players
}

/// Highest pair exposure of `player` with the other occupants of `lineup`.
fn worst_pair(ledger: &ExposureLedger, lineup: &Lineup, player: usize, size: usize) -> f64 {
    lineup
        .players()
        .iter()
        .filter(|&&other| other != player)
        .map(|&other| ratio(ledger.pair(player, other), size))
        .fold(0.0, f64::max)
}

fn ratio(count: u32, size: usize) -> f64 {
    count as f64 / size as f64
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{positions, Player, RosterSlot};

    fn pool(n: usize) -> PlayerPool {
        PlayerPool::new(
            (0..n)
                .map(|i| {
                    Player::new(
                        format!("p{i}"),
                        format!("Player {i}"),
                        if i % 2 == 0 { "AAA" } else { "BBB" },
                        positions(["U"]),
                        1000 + 10 * i as u32,
                        20.0 - i as f64 * 0.1,
                    )
                })
                .collect(),
        )
        .unwrap()
    }

    fn template() -> RosterTemplate {
        RosterTemplate::new(
            vec![
                RosterSlot::new("U1", positions(["U"])),
                RosterSlot::new("U2", positions(["U"])),
            ],
            5_000,
        )
    }

    fn repeated(pool: &PlayerPool, players: Vec<usize>, n: usize) -> LineupBatch {
        LineupBatch::from(vec![Lineup::new(pool, &template(), players); n])
    }

    #[test]
    fn test_compliant_batch_is_untouched() {
        let pool = pool(8);
        let template = template();
        let constraints = LineupConstraints::new(0, 5_000);
        let mut batch = LineupBatch::from(vec![
            Lineup::new(&pool, &template, vec![0, 1]),
            Lineup::new(&pool, &template, vec![2, 3]),
            Lineup::new(&pool, &template, vec![4, 5]),
            Lineup::new(&pool, &template, vec![6, 7]),
        ]);
        let mut ledger = ExposureLedger::from_batch(&batch);
        let original = batch.clone();

        let settings = DiversificationSettings {
            max_exposure: 0.25,
            max_pair_exposure: 0.25,
            randomness: 1.0,
            seed: Some(3),
        };
        let engine = DiversificationEngine::new(&pool, &template, &constraints, settings);
        let report = engine.run(&mut batch, &mut ledger);

        assert_eq!(batch, original);
        assert_eq!(report.over_target, 0);
        assert_eq!(report.substitutions, 0);
    }

    #[test]
    fn test_overexposed_players_are_spread_without_drift() {
        let pool = pool(20);
        let template = template();
        let constraints = LineupConstraints::new(0, 5_000);
        let mut batch = repeated(&pool, vec![0, 1], 5);
        let mut ledger = ExposureLedger::from_batch(&batch);

        let settings = DiversificationSettings {
            max_exposure: 0.4,
            max_pair_exposure: 0.4,
            randomness: 1.0,
            seed: Some(11),
        };
        let engine = DiversificationEngine::new(&pool, &template, &constraints, settings);
        let report = engine.run(&mut batch, &mut ledger);

        assert!(report.substitutions > 0);
        assert!(report.unresolved.is_empty());
        assert_eq!(ledger, ExposureLedger::from_batch(&batch));
        for lineup in &batch {
            assert_eq!(lineup.salary(), template.total_salary(&pool, lineup.players()));
            assert!(constraints.is_valid(&template, &pool, lineup));
        }
        for p in 0..pool.len() {
            assert!(ledger.usage(p) <= 2, "player {p} in {} lineups", ledger.usage(p));
        }
    }

    #[test]
    fn test_zero_randomness_skips_every_slot() {
        let pool = pool(10);
        let template = template();
        let constraints = LineupConstraints::new(0, 5_000);
        let mut batch = repeated(&pool, vec![0, 1], 3);
        let mut ledger = ExposureLedger::from_batch(&batch);
        let original = batch.clone();

        let settings = DiversificationSettings {
            max_exposure: 0.5,
            randomness: 0.0,
            ..DiversificationSettings::default()
        };
        let engine = DiversificationEngine::new(&pool, &template, &constraints, settings);
        let report = engine.run(&mut batch, &mut ledger);

        assert_eq!(batch, original);
        assert_eq!(report.skipped, report.over_target);
        assert_eq!(report.attempted, 0);

        // Skipped slots still leave both players over target.
        let flagged: Vec<(usize, Option<usize>)> =
            report.residual.iter().map(|w| (w.player, w.partner)).collect();
        assert_eq!(flagged, vec![(0, None), (1, None)]);
        assert_eq!(report.residual[0].exposure, 1.0);
        assert_eq!(report.residual[0].target, 0.5);
    }

    #[test]
    fn test_residual_warnings_cover_every_violation_after_partial_pass() {
        let pool = pool(40);
        let template = template();
        let constraints = LineupConstraints::new(0, 5_000);
        let mut batch = repeated(&pool, vec![0, 1], 10);
        let mut ledger = ExposureLedger::from_batch(&batch);

        let settings = DiversificationSettings {
            max_exposure: 0.3,
            max_pair_exposure: 0.3,
            randomness: 0.15,
            seed: Some(1),
        };
        let engine = DiversificationEngine::new(&pool, &template, &constraints, settings);
        let report = engine.run(&mut batch, &mut ledger);
        assert!(report.skipped > 0);
        assert_eq!(ledger, ExposureLedger::from_batch(&batch));

        let over_players: Vec<usize> = (0..pool.len())
            .filter(|&p| ledger.usage(p) > 3)
            .collect();
        let over_pairs: Vec<(usize, usize)> = ledger
            .used_pairs()
            .filter(|&(_, count)| count > 3)
            .map(|(pair, _)| pair)
            .collect();
        assert!(!over_players.is_empty() || !over_pairs.is_empty());

        for &p in &over_players {
            assert!(
                report.residual.iter().any(|w| w.player == p && w.partner.is_none()),
                "player {p} at {} lineups has no warning",
                ledger.usage(p)
            );
        }
        for &(a, b) in &over_pairs {
            assert!(
                report.residual.iter().any(|w| (w.player, w.partner) == (a, Some(b))),
                "pair {a},{b} has no warning"
            );
        }
        assert_eq!(report.residual.len(), over_players.len() + over_pairs.len());
        assert_eq!(
            report.residual,
            residual_violations(&pool, &ledger, batch.len(), &settings)
        );
    }

    #[test]
    fn test_residual_scan_uses_player_overrides() {
        let mut players: Vec<Player> = pool(4).players().to_vec();
        players[2] = players[2].clone().with_max_exposure(0.25);
        players[0] = players[0].clone().with_max_exposure(1.0);
        let pool = PlayerPool::new(players).unwrap();
        let template = template();
        let batch = LineupBatch::from(vec![
            Lineup::new(&pool, &template, vec![0, 1]),
            Lineup::new(&pool, &template, vec![0, 2]),
            Lineup::new(&pool, &template, vec![0, 2]),
        ]);
        let ledger = ExposureLedger::from_batch(&batch);
        let settings = DiversificationSettings {
            max_exposure: 0.5,
            max_pair_exposure: 0.5,
            ..DiversificationSettings::default()
        };

        let residual = residual_violations(&pool, &ledger, batch.len(), &settings);
        let flagged: Vec<(usize, Option<usize>, u32)> = residual
            .iter()
            .map(|w| (w.player, w.partner, w.lineups))
            .collect();
        // Player 0 is allowed everywhere; player 2 is capped at a quarter.
        assert_eq!(flagged, vec![(2, None, 2), (0, Some(2), 2)]);
        assert_eq!(residual[0].target, 0.25);
        assert!(residual_violations(&pool, &ledger, 0, &settings).is_empty());
    }

    #[test]
    fn test_hard_constraints_block_candidates() {
        let pool = pool(6);
        let template = template();
        // Only players 0 and 1 fit under the cap together.
        let constraints = LineupConstraints::new(0, 2_010);
        let mut batch = repeated(&pool, vec![0, 1], 2);
        let mut ledger = ExposureLedger::from_batch(&batch);

        let settings = DiversificationSettings {
            max_exposure: 0.5,
            randomness: 1.0,
            seed: Some(1),
            ..DiversificationSettings::default()
        };
        let engine = DiversificationEngine::new(&pool, &template, &constraints, settings);
        let report = engine.run(&mut batch, &mut ledger);

        assert_eq!(report.substitutions, 0);
        assert_eq!(report.unresolved.len(), 4);
        assert_eq!(ledger, ExposureLedger::from_batch(&batch));
        assert_eq!(report.residual.len(), 2);
    }

    #[test]
    fn test_pair_target_breaks_up_repeated_pairs() {
        let pool = pool(8);
        let template = template();
        let constraints = LineupConstraints::new(0, 5_000);
        let mut batch = LineupBatch::from(vec![
            Lineup::new(&pool, &template, vec![0, 1]),
            Lineup::new(&pool, &template, vec![0, 1]),
            Lineup::new(&pool, &template, vec![2, 3]),
            Lineup::new(&pool, &template, vec![4, 5]),
        ]);
        let mut ledger = ExposureLedger::from_batch(&batch);

        let settings = DiversificationSettings {
            max_exposure: 0.5,
            max_pair_exposure: 0.25,
            randomness: 1.0,
            seed: Some(2),
        };
        let engine = DiversificationEngine::new(&pool, &template, &constraints, settings);
        let report = engine.run(&mut batch, &mut ledger);

        assert_eq!(report.substitutions, 1);
        assert_eq!(ledger.pair(0, 1), 1);
        for (_, count) in ledger.used_pairs() {
            assert!(count <= 1);
        }
        assert_eq!(ledger, ExposureLedger::from_batch(&batch));
    }

    #[test]
    fn test_excluded_and_pinned_players_are_respected() {
        let pool = pool(4);
        let template = template();
        let constraints = LineupConstraints::new(0, 5_000);
        let mut batch = repeated(&pool, vec![0, 1], 2);
        let mut ledger = ExposureLedger::from_batch(&batch);

        let settings = DiversificationSettings {
            max_exposure: 0.5,
            randomness: 1.0,
            seed: Some(5),
            ..DiversificationSettings::default()
        };
        let engine = DiversificationEngine::new(&pool, &template, &constraints, settings)
            .with_excluded([2])
            .with_pinned([0]);
        let report = engine.run(&mut batch, &mut ledger);

        for lineup in &batch {
            assert!(lineup.contains(0));
            assert!(!lineup.contains(2));
        }
        assert_eq!(ledger.usage(3), 1);

        // The pinned player stays over target and is reported.
        assert!(report.skipped > 0);
        assert_eq!(report.residual.len(), 1);
        assert_eq!(report.residual[0].player, 0);
        assert_eq!(report.residual[0].partner, None);
        assert_eq!(report.residual[0].lineups, 2);
    }
}
