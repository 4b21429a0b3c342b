// Serializable views of a finished request

use crate::domain::{ExposureLedger, Lineup, LineupBatch, PlayerPool, RosterTemplate};
use crate::engine::{DiversificationReport, ExposureUnsatisfiable, GenerationFailure};
use serde::Serialize;

/// One filled slot; salary and points include the slot multipliers.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SlotView {
    pub slot: String,
    pub player_id: String,
    pub name: String,
    pub team: String,
    pub salary: u64,
    pub projected_points: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct LineupView {
    pub index: usize,
    pub slots: Vec<SlotView>,
    pub salary: u64,
    pub projected_points: f64,
}

impl LineupView {
    pub fn new(index: usize, pool: &PlayerPool, template: &RosterTemplate, lineup: &Lineup) -> Self {
        let slots = template
            .slots
            .iter()
            .zip(lineup.players())
            .map(|(slot, &p)| {
                let player = pool.get(p);
                SlotView {
                    slot: slot.name.clone(),
                    player_id: player.id.clone(),
                    name: player.name.clone(),
                    team: player.team.clone(),
                    salary: slot.salary_of(player),
                    projected_points: slot.points_of(player),
                }
            })
            .collect();
        Self {
            index,
            slots,
            salary: lineup.salary(),
            projected_points: lineup.points(),
        }
    }

    pub fn for_batch(pool: &PlayerPool, template: &RosterTemplate, batch: &LineupBatch) -> Vec<Self> {
        batch
            .iter()
            .enumerate()
            .map(|(i, lineup)| Self::new(i, pool, template, lineup))
            .collect()
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PlayerExposure {
    pub player_id: String,
    pub lineups: u32,
    pub exposure: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PairExposure {
    pub first: String,
    pub second: String,
    pub lineups: u32,
    pub exposure: f64,
}

/// Exposure warning with players resolved to their ids.
///
/// `partner_id` is set when the warning is about a pair.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ExposureWarningView {
    pub player_id: String,
    pub partner_id: Option<String>,
    pub lineups: u32,
    pub exposure: f64,
    pub target: f64,
}

/// Summary of one request: counts, failures and realized exposure.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct GenerationReport {
    pub requested: usize,
    pub produced: usize,
    pub shortfall: usize,
    pub attempts: usize,
    pub failures: Vec<GenerationFailure>,
    /// Most used first.
    pub player_exposure: Vec<PlayerExposure>,
    /// Most frequent first.
    pub pair_exposure: Vec<PairExposure>,
    pub diversification: Option<DiversificationReport>,
    pub warnings: Vec<ExposureWarningView>,
}

impl GenerationReport {
    pub fn is_complete(&self) -> bool {
        self.shortfall == 0
    }

    pub(crate) fn exposure_of(pool: &PlayerPool, ledger: &ExposureLedger) -> Vec<PlayerExposure> {
        let mut used: Vec<(usize, u32)> = ledger.used_players().collect();
        used.sort_by(|a, b| b.1.cmp(&a.1).then(a.0.cmp(&b.0)));
        used.into_iter()
            .map(|(p, lineups)| PlayerExposure {
                player_id: pool.get(p).id.clone(),
                lineups,
                exposure: ledger.exposure(p),
            })
            .collect()
    }

    pub(crate) fn pairs_of(pool: &PlayerPool, ledger: &ExposureLedger) -> Vec<PairExposure> {
        let mut pairs: Vec<((usize, usize), u32)> = ledger.used_pairs().collect();
        pairs.sort_by(|a, b| b.1.cmp(&a.1).then(a.0.cmp(&b.0)));
        pairs
            .into_iter()
            .map(|((a, b), lineups)| PairExposure {
                first: pool.get(a).id.clone(),
                second: pool.get(b).id.clone(),
                lineups,
                exposure: ledger.pair_exposure(a, b),
            })
            .collect()
    }

    pub(crate) fn warnings_of(
        pool: &PlayerPool,
        residual: &[ExposureUnsatisfiable],
    ) -> Vec<ExposureWarningView> {
        residual
            .iter()
            .map(|w| ExposureWarningView {
                player_id: pool.get(w.player).id.clone(),
                partner_id: w.partner.map(|p| pool.get(p).id.clone()),
                lineups: w.lineups,
                exposure: w.exposure,
                target: w.target,
            })
            .collect()
    }
}
