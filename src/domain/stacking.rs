// Stacking Rules
//
// Correlation and anti-correlation requirements between the players of one
// lineup. Each rule is checked here against a concrete lineup; the solver
// compiles the same rules into linear constraints (`engine::model`).

use super::player::Player;
use super::value_objects::Position;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};

/// Most distinct position codes one position-based stack may name.
pub const MAX_STACK_POSITIONS: usize = 8;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum StackingRule {
    /// At least one same-team pair with positions `first` and `second`.
    PositionPair { first: Position, second: Position },

    /// Distinct players from one team covering every listed position,
    /// repeats included (`QB, WR, WR` needs two receivers).
    PositionsStack { positions: Vec<Position> },

    /// At least `size` players from one team, optionally counting only the
    /// listed positions.
    TeamStack {
        size: usize,
        #[serde(default)]
        positions: Option<Vec<Position>>,
    },

    /// At least `size` players from one game with `min_from_each_side`
    /// players from each of its two teams.
    GameStack {
        size: usize,
        #[serde(default)]
        min_from_each_side: usize,
    },

    /// No two players of one team holding positions `first` and `second`.
    SameTeamRestriction { first: Position, second: Position },

    /// No `first` player together with a `second` player from the scheduled
    /// opponent.
    OpposingTeamRestriction {
        first: Vec<Position>,
        second: Vec<Position>,
    },

    /// At least one `first` player with a `second` player from the opponent.
    OpposingTeamRequirement { first: Position, second: Position },
}

impl StackingRule {
    pub fn position_pair(first: impl Into<Position>, second: impl Into<Position>) -> Self {
        Self::PositionPair {
            first: first.into(),
            second: second.into(),
        }
    }

    pub fn team_stack(size: usize, positions: Option<Vec<Position>>) -> Self {
        Self::TeamStack { size, positions }
    }

    pub fn game_stack(size: usize, min_from_each_side: usize) -> Self {
        Self::GameStack {
            size,
            min_from_each_side,
        }
    }

    /// Number of distinct position codes a position-based stack names.
    pub fn distinct_positions(&self) -> usize {
        self.required_positions()
            .map_or(0, |required| required.iter().collect::<BTreeSet<_>>().len())
    }

    /// Positions a team must cover for the position-based stacks.
    pub fn required_positions(&self) -> Option<Vec<Position>> {
        match self {
            Self::PositionPair { first, second } => Some(vec![first.clone(), second.clone()]),
            Self::PositionsStack { positions } => Some(positions.clone()),
            _ => None,
        }
    }

    /// Evaluates the rule against the players of one lineup.
    pub fn is_satisfied(&self, lineup: &[&Player]) -> bool {
        match self {
            Self::PositionPair { .. } | Self::PositionsStack { .. } => {
                let required = self.required_positions().unwrap_or_default();
                by_team(lineup)
                    .values()
                    .any(|team| can_cover(team, &required))
            }
            Self::TeamStack { size, positions } => by_team(lineup).values().any(|team| {
                let counted = team
                    .iter()
                    .filter(|p| {
                        positions
                            .as_ref()
                            .map_or(true, |allowed| p.has_any_position(allowed))
                    })
                    .count();
                counted >= *size
            }),
            Self::GameStack {
                size,
                min_from_each_side,
            } => {
                let games: BTreeSet<(String, String)> =
                    lineup.iter().filter_map(|p| p.game()).collect();
                games.iter().any(|(a, b)| {
                    let from_a = lineup.iter().filter(|p| &p.team == a).count();
                    let from_b = lineup.iter().filter(|p| &p.team == b).count();
                    from_a + from_b >= *size
                        && from_a >= *min_from_each_side
                        && from_b >= *min_from_each_side
                })
            }
            Self::SameTeamRestriction { first, second } => !distinct_pairs(lineup).any(|(p, q)| {
                p.team == q.team
                    && ((p.has_position(first) && q.has_position(second))
                        || (p.has_position(second) && q.has_position(first)))
            }),
            Self::OpposingTeamRestriction { first, second } => {
                !distinct_pairs(lineup).any(|(p, q)| {
                    p.is_opponent_of(q)
                        && ((p.has_any_position(first) && q.has_any_position(second))
                            || (p.has_any_position(second) && q.has_any_position(first)))
                })
            }
            Self::OpposingTeamRequirement { first, second } => {
                distinct_pairs(lineup).any(|(p, q)| {
                    p.is_opponent_of(q)
                        && ((p.has_position(first) && q.has_position(second))
                            || (p.has_position(second) && q.has_position(first)))
                })
            }
        }
    }
}

fn by_team<'a>(lineup: &[&'a Player]) -> BTreeMap<&'a str, Vec<&'a Player>> {
    let mut teams: BTreeMap<&str, Vec<&Player>> = BTreeMap::new();
    for &player in lineup {
        teams.entry(player.team.as_str()).or_default().push(player);
    }
    teams
}

fn distinct_pairs<'a, 'b>(
    lineup: &'b [&'a Player],
) -> impl Iterator<Item = (&'a Player, &'a Player)> + 'b {
    lineup.iter().enumerate().flat_map(move |(i, &p)| {
        lineup[i + 1..].iter().map(move |&q| (p, q))
    })
}

/// Whether distinct players can be matched to every required position.
fn can_cover(players: &[&Player], required: &[Position]) -> bool {
    fn assign(players: &[&Player], required: &[Position], used: &mut [bool]) -> bool {
        let Some((position, rest)) = required.split_first() else {
            return true;
        };
        for (i, player) in players.iter().enumerate() {
            if !used[i] && player.has_position(position) {
                used[i] = true;
                if assign(players, rest, used) {
                    return true;
                }
                used[i] = false;
            }
        }
        false
    }

    let mut used = vec![false; players.len()];
    assign(players, required, &mut used)
}
