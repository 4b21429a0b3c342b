// Lineup Model Compiler
//
// Decision variables are `x[p, s]`, one binary per available player `p` and
// slot `s` the player may fill. A player's selection `y[p]` is the sum of
// its `x` variables and is at most one. Salary and objective coefficients
// carry the slot multipliers. Team and repeat limits and every stacking rule
// are linear in `y`; stacks that need "some team" or "some game" add one
// indicator binary per candidate.

use crate::domain::stacking::MAX_STACK_POSITIONS;
use crate::domain::{
    ledger::lineup_pairs, Constraint, IntegerProgram, Lineup, LineupConstraints,
    OptimizationType, Player, PlayerPool, Position, RosterTemplate, SolverSettings,
    StackingRule, Variable,
};
use std::collections::BTreeSet;

pub type Terms = Vec<(usize, f64)>;

/// Everything one solve depends on besides the pool and template.
#[derive(Debug, Clone, Copy)]
pub struct ModelInput<'a> {
    pub constraints: &'a LineupConstraints,
    /// Objective coefficient per pool index (projections, possibly jittered).
    pub points: &'a [f64],
    pub excluded: &'a BTreeSet<usize>,
    pub forced: &'a BTreeSet<usize>,
    pub previous: &'a [Lineup],
    pub settings: &'a SolverSettings,
}

/// Integer program for one lineup plus the mapping back to players and slots
#[derive(Debug)]
pub struct ConstraintModel {
    pub program: IntegerProgram,
    /// `(player, slot, variable)` for every assignment variable.
    assignments: Vec<(usize, usize, usize)>,
    /// Assignment variables per pool index; empty for unavailable players.
    selection: Vec<Vec<usize>>,
    /// Set when a requirement has no candidate at all.
    infeasible: Option<String>,
}

impl ConstraintModel {
    pub fn build(pool: &PlayerPool, template: &RosterTemplate, input: ModelInput<'_>) -> Self {
        let mut model = Self {
            program: IntegerProgram::new(OptimizationType::Maximize)
                .with_name("lineup")
                .with_settings(input.settings.clone()),
            assignments: Vec::new(),
            selection: vec![Vec::new(); pool.len()],
            infeasible: None,
        };

        model.add_assignment_variables(pool, template, input);
        model.add_roster_constraints(pool, template, input);
        for rule in &input.constraints.stacking_rules {
            model.compile_rule(pool, rule);
        }
        model
    }

    /// Reason the model cannot be satisfied, found while compiling.
    pub fn infeasibility(&self) -> Option<&str> {
        self.infeasible.as_deref()
    }

    /// Reads the slot assignment out of a solved variable vector.
    pub fn decode(&self, slots: usize, values: &[f64]) -> Option<Vec<usize>> {
        let mut filled: Vec<Option<usize>> = vec![None; slots];
        for &(player, slot, var) in &self.assignments {
            if values.get(var).copied().unwrap_or(0.0) > 0.5 {
                if filled[slot].is_some() {
                    return None;
                }
                filled[slot] = Some(player);
            }
        }
        filled.into_iter().collect()
    }

    fn add_assignment_variables(
        &mut self,
        pool: &PlayerPool,
        template: &RosterTemplate,
        input: ModelInput<'_>,
    ) {
        for (p, player) in pool.players().iter().enumerate() {
            if input.excluded.contains(&p) {
                continue;
            }
            for (s, slot) in template.slots.iter().enumerate() {
                if slot.accepts(player) {
                    let var = self.program.add_variable(
                        Variable::binary(format!("x_{}_{}", player.id, slot.name)),
                        input.points[p] * slot.points_multiplier,
                    );
                    self.assignments.push((p, s, var));
                    self.selection[p].push(var);
                }
            }
        }
    }

    fn add_roster_constraints(
        &mut self,
        pool: &PlayerPool,
        template: &RosterTemplate,
        input: ModelInput<'_>,
    ) {
        for (s, slot) in template.slots.iter().enumerate() {
            let terms: Terms = self
                .assignments
                .iter()
                .filter(|(_, slot_index, _)| *slot_index == s)
                .map(|&(_, _, var)| (var, 1.0))
                .collect();
            if terms.is_empty() {
                self.mark_infeasible(format!("no available player for slot {}", slot.name));
            }
            self.program
                .add_constraint(Constraint::eq(terms, 1.0).with_name(format!("slot_{}", slot.name)));
        }

        for (p, vars) in self.selection.iter().enumerate() {
            if vars.len() > 1 {
                let terms = vars.iter().map(|&v| (v, 1.0)).collect();
                self.program.add_constraint(
                    Constraint::leq(terms, 1.0).with_name(format!("once_{}", pool.get(p).id)),
                );
            }
        }

        let salary: Terms = self
            .assignments
            .iter()
            .map(|&(p, s, var)| (var, template.slots[s].salary_of(pool.get(p)) as f64))
            .collect();
        self.program.add_constraint(
            Constraint::leq(salary.clone(), input.constraints.salary_cap as f64)
                .with_name("salary_cap"),
        );
        if input.constraints.salary_floor > 0 {
            self.program.add_constraint(
                Constraint::geq(salary, input.constraints.salary_floor as f64)
                    .with_name("salary_floor"),
            );
        }

        if let Some(max) = input.constraints.max_players_per_team {
            for team in pool.teams() {
                let terms = self.selection_of(pool, |player| player.team == team);
                if terms.len() > max {
                    self.program.add_constraint(
                        Constraint::leq(terms, max as f64).with_name(format!("team_{team}")),
                    );
                }
            }
        }

        for &p in input.forced.iter().filter(|p| !input.excluded.contains(p)) {
            let terms = self.selection_terms(p);
            if terms.is_empty() {
                self.mark_infeasible(format!("forced player '{}' fits no slot", pool.get(p).id));
            }
            self.program.add_constraint(
                Constraint::geq(terms, 1.0).with_name(format!("force_{}", pool.get(p).id)),
            );
        }

        if let Some(max) = input.constraints.max_repeating_players {
            for (i, lineup) in input.previous.iter().enumerate() {
                let terms: Terms = lineup
                    .players()
                    .iter()
                    .flat_map(|&p| self.selection_terms(p))
                    .collect();
                if terms.len() > max {
                    self.program.add_constraint(
                        Constraint::leq(terms, max as f64).with_name(format!("repeat_{i}")),
                    );
                }
            }
        }
    }

    fn compile_rule(&mut self, pool: &PlayerPool, rule: &StackingRule) {
        match rule {
            StackingRule::PositionPair { .. } | StackingRule::PositionsStack { .. } => {
                let required = rule.required_positions().unwrap_or_default();
                self.compile_positions_stack(pool, &required);
            }
            StackingRule::TeamStack { size, positions } => {
                let mut indicators = Vec::new();
                for team in pool.teams() {
                    let terms = self.selection_of(pool, |player| {
                        player.team == team
                            && positions
                                .as_ref()
                                .map_or(true, |allowed| player.has_any_position(allowed))
                    });
                    if terms.len() < *size {
                        continue;
                    }
                    let z = self.indicator(format!("team_stack_{team}"));
                    self.require_at_least(terms, *size, z);
                    indicators.push(z);
                }
                self.require_any(indicators, "team stack");
            }
            StackingRule::GameStack {
                size,
                min_from_each_side,
            } => {
                let mut indicators = Vec::new();
                for (a, b) in pool.games() {
                    let side_a = self.selection_of(pool, |player| player.team == a);
                    let side_b = self.selection_of(pool, |player| player.team == b);
                    if side_a.len() + side_b.len() < *size
                        || side_a.len() < *min_from_each_side
                        || side_b.len() < *min_from_each_side
                    {
                        continue;
                    }
                    let w = self.indicator(format!("game_stack_{a}_{b}"));
                    let both: Terms = side_a.iter().chain(&side_b).copied().collect();
                    self.require_at_least(both, *size, w);
                    if *min_from_each_side > 0 {
                        self.require_at_least(side_a, *min_from_each_side, w);
                        self.require_at_least(side_b, *min_from_each_side, w);
                    }
                    indicators.push(w);
                }
                self.require_any(indicators, "game stack");
            }
            StackingRule::SameTeamRestriction { first, second } => {
                self.forbid_pairs(pool, "same_team", |p, q| {
                    p.team == q.team
                        && ((p.has_position(first) && q.has_position(second))
                            || (p.has_position(second) && q.has_position(first)))
                });
            }
            StackingRule::OpposingTeamRestriction { first, second } => {
                self.forbid_pairs(pool, "opposing", |p, q| {
                    p.is_opponent_of(q)
                        && ((p.has_any_position(first) && q.has_any_position(second))
                            || (p.has_any_position(second) && q.has_any_position(first)))
                });
            }
            StackingRule::OpposingTeamRequirement { first, second } => {
                let mut indicators = Vec::new();
                for (team, opponent) in pool.matchups() {
                    let ours = self
                        .selection_of(pool, |player| player.team == team && player.has_position(first));
                    let theirs = self.selection_of(pool, |player| {
                        player.team == opponent && player.has_position(second)
                    });
                    if ours.is_empty() || theirs.is_empty() {
                        continue;
                    }
                    let v = self.indicator(format!("bring_back_{team}_{opponent}"));
                    self.require_at_least(ours, 1, v);
                    self.require_at_least(theirs, 1, v);
                    indicators.push(v);
                }
                self.require_any(indicators, "opposing team requirement");
            }
        }
    }

    /// One team must supply distinct players for every required position.
    ///
    /// For each set `S` of required position codes, the team's selected
    /// players eligible for some position in `S` must number at least the
    /// required entries that fall in `S`. By Hall's theorem this is exactly
    /// the condition for a matching of distinct players to requirements.
    fn compile_positions_stack(&mut self, pool: &PlayerPool, required: &[Position]) {
        let codes: Vec<&Position> = required
            .iter()
            .collect::<BTreeSet<_>>()
            .into_iter()
            .collect();
        if codes.len() > MAX_STACK_POSITIONS {
            self.mark_infeasible(format!(
                "position stack names {} distinct positions, at most {} are supported",
                codes.len(),
                MAX_STACK_POSITIONS
            ));
            return;
        }
        let subsets: Vec<(Vec<Position>, usize)> = (1u32..(1 << codes.len()))
            .map(|mask| {
                let subset: Vec<Position> = codes
                    .iter()
                    .enumerate()
                    .filter(|(i, _)| mask & (1 << *i) != 0)
                    .map(|(_, code)| (*code).clone())
                    .collect();
                let need = required.iter().filter(|p| subset.contains(p)).count();
                (subset, need)
            })
            .collect();

        let label = required
            .iter()
            .map(Position::as_str)
            .collect::<Vec<_>>()
            .join("_");
        let mut indicators = Vec::new();
        for team in pool.teams() {
            let groups: Vec<(Terms, usize)> = subsets
                .iter()
                .map(|(subset, need)| {
                    let terms = self.selection_of(pool, |player| {
                        player.team == team && player.has_any_position(subset)
                    });
                    (terms, *need)
                })
                .collect();
            if groups.iter().any(|(terms, need)| terms.len() < *need) {
                continue;
            }
            let z = self.indicator(format!("stack_{label}_{team}"));
            for (terms, need) in groups {
                self.require_at_least(terms, need, z);
            }
            indicators.push(z);
        }
        self.require_any(indicators, &format!("{label} stack"));
    }

    fn forbid_pairs<F>(&mut self, pool: &PlayerPool, label: &str, conflicts: F)
    where
        F: Fn(&Player, &Player) -> bool,
    {
        let available: Vec<usize> = (0..pool.len())
            .filter(|&p| !self.selection[p].is_empty())
            .collect();
        for (p, q) in lineup_pairs(&available) {
            if conflicts(pool.get(p), pool.get(q)) {
                let mut terms = self.selection_terms(p);
                terms.extend(self.selection_terms(q));
                self.program.add_constraint(
                    Constraint::leq(terms, 1.0)
                        .with_name(format!("{label}_{}_{}", pool.get(p).id, pool.get(q).id)),
                );
            }
        }
    }

    fn selection_terms(&self, player: usize) -> Terms {
        self.selection[player].iter().map(|&v| (v, 1.0)).collect()
    }

    fn selection_of<F>(&self, pool: &PlayerPool, matches: F) -> Terms
    where
        F: Fn(&Player) -> bool,
    {
        pool.players()
            .iter()
            .enumerate()
            .filter(|(_, player)| matches(player))
            .flat_map(|(p, _)| self.selection_terms(p))
            .collect()
    }

    fn indicator(&mut self, name: String) -> usize {
        self.program.add_variable(Variable::binary(name), 0.0)
    }

    /// `Σ terms ≥ count · indicator`
    fn require_at_least(&mut self, mut terms: Terms, count: usize, indicator: usize) {
        terms.push((indicator, -(count as f64)));
        self.program.add_constraint(Constraint::geq(terms, 0.0));
    }

    /// At least one indicator must be set.
    fn require_any(&mut self, indicators: Vec<usize>, what: &str) {
        if indicators.is_empty() {
            self.mark_infeasible(format!("no team or game can satisfy the {what}"));
            return;
        }
        let terms = indicators.into_iter().map(|v| (v, 1.0)).collect();
        self.program
            .add_constraint(Constraint::geq(terms, 1.0).with_name(format!("any_{what}")));
    }

    fn mark_infeasible(&mut self, reason: String) {
        self.infeasible.get_or_insert(reason);
    }
}
