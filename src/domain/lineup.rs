use super::player::{Player, PlayerPool};
use super::roster::RosterTemplate;
use super::stacking::StackingRule;
use std::collections::{BTreeMap, BTreeSet};

/// One complete roster assignment.
///
/// `players[i]` is the pool index of the player filling `template.slots[i]`.
/// Totals are always derived from the pool and the slot multipliers, never
/// accumulated.
#[derive(Debug, Clone, PartialEq)]
pub struct Lineup {
    players: Vec<usize>,
    salary: u64,
    points: f64,
}

impl Lineup {
    pub fn new(pool: &PlayerPool, template: &RosterTemplate, players: Vec<usize>) -> Self {
        let salary = template.total_salary(pool, &players);
        let points = template.total_points(pool, &players);
        Self {
            players,
            salary,
            points,
        }
    }

    pub fn players(&self) -> &[usize] {
        &self.players
    }

    pub fn salary(&self) -> u64 {
        self.salary
    }

    pub fn points(&self) -> f64 {
        self.points
    }

    pub fn contains(&self, player: usize) -> bool {
        self.players.contains(&player)
    }

    /// Number of players shared with `other`.
    pub fn overlap(&self, other: &Lineup) -> usize {
        self.players.iter().filter(|p| other.contains(**p)).count()
    }

    /// Copy of this lineup with `slot` refilled by `player`, totals recomputed.
    pub fn with_substitution(
        &self,
        pool: &PlayerPool,
        template: &RosterTemplate,
        slot: usize,
        player: usize,
    ) -> Self {
        let mut players = self.players.clone();
        players[slot] = player;
        Self::new(pool, template, players)
    }

    pub fn player_refs<'a>(&self, pool: &'a PlayerPool) -> Vec<&'a Player> {
        self.players.iter().map(|&p| pool.get(p)).collect()
    }
}

/// Ordered lineups produced for one request
#[derive(Debug, Clone, Default, PartialEq)]
pub struct LineupBatch {
    lineups: Vec<Lineup>,
}

impl LineupBatch {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, lineup: Lineup) {
        self.lineups.push(lineup);
    }

    pub fn len(&self) -> usize {
        self.lineups.len()
    }

    pub fn is_empty(&self) -> bool {
        self.lineups.is_empty()
    }

    pub fn get(&self, index: usize) -> Option<&Lineup> {
        self.lineups.get(index)
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Lineup> {
        self.lineups.iter()
    }

    pub fn as_slice(&self) -> &[Lineup] {
        &self.lineups
    }

    /// Replaces a whole lineup; used by diversification after a checked
    /// substitution.
    pub(crate) fn replace(&mut self, index: usize, lineup: Lineup) {
        self.lineups[index] = lineup;
    }
}

impl From<Vec<Lineup>> for LineupBatch {
    fn from(lineups: Vec<Lineup>) -> Self {
        Self { lineups }
    }
}

impl<'a> IntoIterator for &'a LineupBatch {
    type Item = &'a Lineup;
    type IntoIter = std::slice::Iter<'a, Lineup>;

    fn into_iter(self) -> Self::IntoIter {
        self.lineups.iter()
    }
}

/// Hard constraints every emitted lineup must satisfy
#[derive(Debug, Clone, PartialEq, Default)]
pub struct LineupConstraints {
    pub salary_floor: u32,
    pub salary_cap: u32,
    pub max_players_per_team: Option<usize>,
    pub stacking_rules: Vec<StackingRule>,
    /// Maximum number of players any two lineups of a batch may share.
    pub max_repeating_players: Option<usize>,
}

impl LineupConstraints {
    pub fn new(salary_floor: u32, salary_cap: u32) -> Self {
        Self {
            salary_floor,
            salary_cap,
            ..Self::default()
        }
    }

    pub fn with_max_players_per_team(mut self, max: Option<usize>) -> Self {
        self.max_players_per_team = max;
        self
    }

    pub fn with_rule(mut self, rule: StackingRule) -> Self {
        self.stacking_rules.push(rule);
        self
    }

    pub fn with_max_repeating_players(mut self, max: Option<usize>) -> Self {
        self.max_repeating_players = max;
        self
    }

    /// Returns every invariant the lineup breaks; empty when valid.
    pub fn violations(
        &self,
        template: &RosterTemplate,
        pool: &PlayerPool,
        lineup: &Lineup,
    ) -> Vec<String> {
        let mut problems = Vec::new();
        let players = lineup.players();

        if players.len() != template.len() {
            problems.push(format!(
                "lineup fills {} of {} slots",
                players.len(),
                template.len()
            ));
            return problems;
        }

        let distinct: BTreeSet<usize> = players.iter().copied().collect();
        if distinct.len() != players.len() {
            problems.push("lineup repeats a player".to_string());
        }

        for (slot, &player) in template.slots.iter().zip(players) {
            if !slot.accepts(pool.get(player)) {
                problems.push(format!(
                    "player '{}' is not eligible for slot {}",
                    pool.get(player).id,
                    slot.name
                ));
            }
        }

        let salary = template.total_salary(pool, players);
        if salary != lineup.salary() {
            problems.push(format!(
                "stored salary {} differs from recomputed {}",
                lineup.salary(),
                salary
            ));
        }
        if salary < u64::from(self.salary_floor) || salary > u64::from(self.salary_cap) {
            problems.push(format!(
                "salary {} outside [{}, {}]",
                salary, self.salary_floor, self.salary_cap
            ));
        }

        if let Some(max) = self.max_players_per_team {
            let mut per_team: BTreeMap<&str, usize> = BTreeMap::new();
            for &player in players {
                *per_team.entry(pool.get(player).team.as_str()).or_default() += 1;
            }
            for (team, count) in per_team.into_iter().filter(|(_, c)| *c > max) {
                problems.push(format!("{count} players from {team} exceeds {max}"));
            }
        }

        let refs = lineup.player_refs(pool);
        for rule in &self.stacking_rules {
            if !rule.is_satisfied(&refs) {
                problems.push(format!("stacking rule not satisfied: {rule:?}"));
            }
        }

        problems
    }

    pub fn is_valid(&self, template: &RosterTemplate, pool: &PlayerPool, lineup: &Lineup) -> bool {
        self.violations(template, pool, lineup).is_empty()
    }

    /// Whether `lineup` stays within the repeat limit against every lineup in
    /// `others`.
    pub fn respects_repeats<'a, I>(&self, lineup: &Lineup, others: I) -> bool
    where
        I: IntoIterator<Item = &'a Lineup>,
    {
        match self.max_repeating_players {
            Some(max) => others.into_iter().all(|other| lineup.overlap(other) <= max),
            None => true,
        }
    }
}
