use super::errors::{LineupError, LineupResult};
use super::value_objects::Position;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeSet, HashMap};

/// Largest salary a single player record may carry.
pub const MAX_SALARY: u32 = 1_000_000;

/// A priced, position-tagged player available for selection
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Player {
    pub id: String,
    pub name: String,
    pub team: String,
    /// Scheduled opponent team; the game is the unordered {team, opponent} pair.
    #[serde(default)]
    pub opponent: Option<String>,
    pub positions: Vec<Position>,
    pub salary: u32,
    pub projected_points: f64,
    /// Overrides the request-wide max exposure for this player.
    #[serde(default)]
    pub max_exposure: Option<f64>,
    /// Best-effort minimum exposure for this player.
    #[serde(default)]
    pub min_exposure: Option<f64>,
}

impl Player {
    pub fn new(
        id: impl Into<String>,
        name: impl Into<String>,
        team: impl Into<String>,
        positions: Vec<Position>,
        salary: u32,
        projected_points: f64,
    ) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            team: team.into(),
            opponent: None,
            positions,
            salary,
            projected_points,
            max_exposure: None,
            min_exposure: None,
        }
    }

    pub fn with_opponent(mut self, opponent: impl Into<String>) -> Self {
        self.opponent = Some(opponent.into());
        self
    }

    pub fn with_max_exposure(mut self, exposure: f64) -> Self {
        self.max_exposure = Some(exposure);
        self
    }

    pub fn with_min_exposure(mut self, exposure: f64) -> Self {
        self.min_exposure = Some(exposure);
        self
    }

    pub fn has_position(&self, position: &Position) -> bool {
        self.positions.contains(position)
    }

    pub fn has_any_position(&self, positions: &[Position]) -> bool {
        self.positions.iter().any(|p| positions.contains(p))
    }

    /// The unordered team pair of this player's game, if the opponent is known.
    pub fn game(&self) -> Option<(String, String)> {
        self.opponent
            .as_ref()
            .map(|opponent| game_key(&self.team, opponent))
    }

    pub fn is_opponent_of(&self, other: &Player) -> bool {
        self.team != other.team
            && (self.opponent.as_deref() == Some(other.team.as_str())
                || other.opponent.as_deref() == Some(self.team.as_str()))
    }
}

pub fn game_key(team: &str, opponent: &str) -> (String, String) {
    if team <= opponent {
        (team.to_string(), opponent.to_string())
    } else {
        (opponent.to_string(), team.to_string())
    }
}

/// Validated, read-only set of players for one request.
///
/// Players are addressed by their index in the pool everywhere inside the
/// engine; ids are only needed at the edges.
#[derive(Debug, Clone)]
pub struct PlayerPool {
    players: Vec<Player>,
    index: HashMap<String, usize>,
}

impl PlayerPool {
    pub fn new(players: Vec<Player>) -> LineupResult<Self> {
        if players.is_empty() {
            return Err(LineupError::validation("player pool is empty"));
        }

        let mut errors = Vec::new();
        let mut index = HashMap::with_capacity(players.len());

        for (i, player) in players.iter().enumerate() {
            if index.insert(player.id.clone(), i).is_some() {
                errors.push(format!("duplicate player id '{}'", player.id));
            }
            if player.positions.is_empty() {
                errors.push(format!("player '{}' has no positions", player.id));
            }
            if player.salary == 0 {
                errors.push(format!("player '{}' has a non-positive salary", player.id));
            }
            if player.salary > MAX_SALARY {
                errors.push(format!(
                    "player '{}' has salary {} above {}",
                    player.id, player.salary, MAX_SALARY
                ));
            }
            if !player.projected_points.is_finite() || player.projected_points < 0.0 {
                errors.push(format!(
                    "player '{}' has invalid projected points {}",
                    player.id, player.projected_points
                ));
            }
            for (label, value) in [("max", player.max_exposure), ("min", player.min_exposure)] {
                if let Some(v) = value {
                    if !(0.0..=1.0).contains(&v) {
                        errors.push(format!(
                            "player '{}' has {} exposure {} outside [0, 1]",
                            player.id, label, v
                        ));
                    }
                }
            }
            if let (Some(min), Some(max)) = (player.min_exposure, player.max_exposure) {
                if min > max {
                    errors.push(format!(
                        "player '{}' has min exposure {} above max exposure {}",
                        player.id, min, max
                    ));
                }
            }
        }

        if errors.is_empty() {
            Ok(Self { players, index })
        } else {
            Err(LineupError::Validation(errors.join("; ")))
        }
    }

    pub fn len(&self) -> usize {
        self.players.len()
    }

    pub fn is_empty(&self) -> bool {
        self.players.is_empty()
    }

    pub fn get(&self, index: usize) -> &Player {
        &self.players[index]
    }

    pub fn players(&self) -> &[Player] {
        &self.players
    }

    pub fn index_of(&self, id: &str) -> Option<usize> {
        self.index.get(id).copied()
    }

    pub fn teams(&self) -> BTreeSet<&str> {
        self.players.iter().map(|p| p.team.as_str()).collect()
    }

    /// All scheduled games, as unordered team pairs.
    pub fn games(&self) -> BTreeSet<(String, String)> {
        self.players.iter().filter_map(Player::game).collect()
    }

    /// Ordered (team, opponent) pairs in both directions.
    pub fn matchups(&self) -> BTreeSet<(String, String)> {
        self.games()
            .into_iter()
            .flat_map(|(a, b)| [(a.clone(), b.clone()), (b, a)])
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::value_objects::positions;

    fn qb(id: &str, team: &str) -> Player {
        Player::new(id, id, team, positions(["QB"]), 6000, 20.0)
    }

    #[test]
    fn test_pool_indexes_players() {
        let pool = PlayerPool::new(vec![qb("a", "KC"), qb("b", "BUF")]).unwrap();
        assert_eq!(pool.len(), 2);
        assert_eq!(pool.index_of("b"), Some(1));
        assert_eq!(pool.teams().len(), 2);
    }

    #[test]
    fn test_pool_rejects_bad_records() {
        let mut broke = qb("c", "KC");
        broke.salary = 0;
        broke.positions.clear();
        let err = PlayerPool::new(vec![qb("a", "KC"), qb("a", "KC"), broke])
            .unwrap_err()
            .to_string();
        assert!(err.contains("duplicate player id 'a'"));
        assert!(err.contains("no positions"));
        assert!(err.contains("non-positive salary"));
    }

    #[test]
    fn test_pool_rejects_salaries_that_could_overflow_totals() {
        let mut rich = qb("a", "KC");
        rich.salary = u32::MAX;
        let err = PlayerPool::new(vec![rich]).unwrap_err().to_string();
        assert!(err.contains("above 1000000"), "{err}");

        let mut top = qb("b", "KC");
        top.salary = MAX_SALARY;
        assert!(PlayerPool::new(vec![top]).is_ok());
    }

    #[test]
    fn test_pool_rejects_inverted_exposure_bounds() {
        let player = qb("a", "KC").with_min_exposure(0.6).with_max_exposure(0.4);
        assert!(matches!(
            PlayerPool::new(vec![player]),
            Err(LineupError::Validation(_))
        ));
    }

    #[test]
    fn test_games_and_opponents() {
        let a = qb("a", "KC").with_opponent("BUF");
        let b = qb("b", "BUF").with_opponent("KC");
        let c = qb("c", "DAL");
        assert!(a.is_opponent_of(&b));
        assert!(!a.is_opponent_of(&c));

        let pool = PlayerPool::new(vec![a, b, c]).unwrap();
        assert_eq!(pool.games().len(), 1);
        assert_eq!(pool.matchups().len(), 2);
    }
}
