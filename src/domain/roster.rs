use super::player::{Player, PlayerPool};
use super::value_objects::{positions, Position};
use serde::{Deserialize, Serialize};
use std::fmt;

/// A named roster slot accepting any of `positions`
///
/// A player filling the slot counts `salary_multiplier` times their salary
/// against the cap and scores `points_multiplier` times their projection.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RosterSlot {
    pub name: String,
    pub positions: Vec<Position>,
    #[serde(default = "unit_multiplier")]
    pub salary_multiplier: f64,
    #[serde(default = "unit_multiplier")]
    pub points_multiplier: f64,
}

fn unit_multiplier() -> f64 {
    1.0
}

impl RosterSlot {
    pub fn new(name: impl Into<String>, allowed: Vec<Position>) -> Self {
        Self {
            name: name.into(),
            positions: allowed,
            salary_multiplier: 1.0,
            points_multiplier: 1.0,
        }
    }

    /// Slot accepting exactly the position it is named after.
    pub fn single(position: &str) -> Self {
        Self::new(position, positions([position]))
    }

    pub fn with_multipliers(mut self, salary: f64, points: f64) -> Self {
        self.salary_multiplier = salary;
        self.points_multiplier = points;
        self
    }

    pub fn accepts(&self, player: &Player) -> bool {
        player.has_any_position(&self.positions)
    }

    /// Salary charged for `player` in this slot, rounded to whole units.
    pub fn salary_of(&self, player: &Player) -> u64 {
        (f64::from(player.salary) * self.salary_multiplier).round() as u64
    }

    pub fn points_of(&self, player: &Player) -> f64 {
        player.projected_points * self.points_multiplier
    }

    fn is_subset_of(&self, other: &RosterSlot) -> bool {
        self.positions.iter().all(|p| other.positions.contains(p))
    }
}

/// Slot group that cannot be filled from the available players.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SlotShortage {
    pub slot: String,
    pub available: usize,
    pub required: usize,
}

/// Ordered slot layout plus the site defaults that come with it
#[derive(Debug, Clone, PartialEq)]
pub struct RosterTemplate {
    pub slots: Vec<RosterSlot>,
    pub salary_cap: u32,
    pub max_players_per_team: Option<usize>,
}

impl RosterTemplate {
    pub fn new(slots: Vec<RosterSlot>, salary_cap: u32) -> Self {
        Self {
            slots,
            salary_cap,
            max_players_per_team: None,
        }
    }

    pub fn with_max_players_per_team(mut self, max: usize) -> Self {
        self.max_players_per_team = Some(max);
        self
    }

    pub fn len(&self) -> usize {
        self.slots.len()
    }

    pub fn is_empty(&self) -> bool {
        self.slots.is_empty()
    }

    /// Salary of `players` filling the slots in order.
    pub fn total_salary(&self, pool: &PlayerPool, players: &[usize]) -> u64 {
        self.slots
            .iter()
            .zip(players)
            .map(|(slot, &p)| slot.salary_of(pool.get(p)))
            .sum()
    }

    pub fn total_points(&self, pool: &PlayerPool, players: &[usize]) -> f64 {
        self.slots
            .iter()
            .zip(players)
            .map(|(slot, &p)| slot.points_of(pool.get(p)))
            .sum()
    }

    /// Checks that every slot group can be staffed by distinct available players.
    ///
    /// For each slot, all slots whose allowed set is contained in its own set
    /// compete for the same players, so the pool must offer at least that many
    /// players eligible for the slot. The whole roster is checked the same way.
    pub fn check_availability<F>(&self, pool: &PlayerPool, is_available: F) -> Result<(), SlotShortage>
    where
        F: Fn(usize) -> bool,
    {
        let available: Vec<&Player> = (0..pool.len())
            .filter(|&i| is_available(i))
            .map(|i| pool.get(i))
            .collect();

        for slot in &self.slots {
            let required = self.slots.iter().filter(|s| s.is_subset_of(slot)).count();
            let eligible = available.iter().filter(|p| slot.accepts(p)).count();
            if eligible < required {
                return Err(SlotShortage {
                    slot: slot.name.clone(),
                    available: eligible,
                    required,
                });
            }
        }

        let eligible = available
            .iter()
            .filter(|p| self.slots.iter().any(|s| s.accepts(p)))
            .count();
        if eligible < self.slots.len() {
            return Err(SlotShortage {
                slot: "roster".to_string(),
                available: eligible,
                required: self.slots.len(),
            });
        }

        Ok(())
    }
}

/// Contest sites with a built-in roster layout
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Site {
    #[default]
    DraftkingsNfl,
    FanduelNfl,
    /// Showdown: one captain at 1.5x salary and points plus five flex.
    DraftkingsNflCaptain,
    DraftkingsNba,
    FanduelNba,
}

const CAPTAIN_MULTIPLIER: f64 = 1.5;

impl Site {
    pub fn roster(self) -> RosterTemplate {
        match self {
            Site::DraftkingsNfl => RosterTemplate::new(
                vec![
                    RosterSlot::single("QB"),
                    RosterSlot::new("RB1", positions(["RB"])),
                    RosterSlot::new("RB2", positions(["RB"])),
                    RosterSlot::new("WR1", positions(["WR"])),
                    RosterSlot::new("WR2", positions(["WR"])),
                    RosterSlot::new("WR3", positions(["WR"])),
                    RosterSlot::single("TE"),
                    RosterSlot::new("FLEX", positions(["RB", "WR", "TE"])),
                    RosterSlot::single("DST"),
                ],
                50_000,
            ),
            Site::FanduelNfl => RosterTemplate::new(
                vec![
                    RosterSlot::single("QB"),
                    RosterSlot::new("RB1", positions(["RB"])),
                    RosterSlot::new("RB2", positions(["RB"])),
                    RosterSlot::new("WR1", positions(["WR"])),
                    RosterSlot::new("WR2", positions(["WR"])),
                    RosterSlot::new("WR3", positions(["WR"])),
                    RosterSlot::single("TE"),
                    RosterSlot::new("FLEX", positions(["RB", "WR", "TE"])),
                    RosterSlot::single("D"),
                ],
                60_000,
            )
            .with_max_players_per_team(4),
            Site::DraftkingsNflCaptain => {
                let any = positions(["QB", "RB", "WR", "TE", "K", "DST"]);
                let mut slots = vec![RosterSlot::new("CPT", any.clone())
                    .with_multipliers(CAPTAIN_MULTIPLIER, CAPTAIN_MULTIPLIER)];
                slots.extend((1..=5).map(|i| RosterSlot::new(format!("FLEX{i}"), any.clone())));
                RosterTemplate::new(slots, 50_000)
            }
            Site::DraftkingsNba => RosterTemplate::new(
                vec![
                    RosterSlot::single("PG"),
                    RosterSlot::single("SG"),
                    RosterSlot::single("SF"),
                    RosterSlot::single("PF"),
                    RosterSlot::single("C"),
                    RosterSlot::new("G", positions(["PG", "SG"])),
                    RosterSlot::new("F", positions(["SF", "PF"])),
                    RosterSlot::new("UTIL", positions(["PG", "SG", "SF", "PF", "C"])),
                ],
                50_000,
            ),
            Site::FanduelNba => RosterTemplate::new(
                vec![
                    RosterSlot::new("PG1", positions(["PG"])),
                    RosterSlot::new("PG2", positions(["PG"])),
                    RosterSlot::new("SG1", positions(["SG"])),
                    RosterSlot::new("SG2", positions(["SG"])),
                    RosterSlot::new("SF1", positions(["SF"])),
                    RosterSlot::new("SF2", positions(["SF"])),
                    RosterSlot::new("PF1", positions(["PF"])),
                    RosterSlot::new("PF2", positions(["PF"])),
                    RosterSlot::single("C"),
                ],
                60_000,
            )
            .with_max_players_per_team(4),
        }
    }
}

impl fmt::Display for Site {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Site::DraftkingsNfl => write!(f, "DraftKings NFL"),
            Site::FanduelNfl => write!(f, "FanDuel NFL"),
            Site::DraftkingsNflCaptain => write!(f, "DraftKings NFL Captain"),
            Site::DraftkingsNba => write!(f, "DraftKings NBA"),
            Site::FanduelNba => write!(f, "FanDuel NBA"),
        }
    }
}
