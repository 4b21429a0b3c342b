// Domain module: players, rosters, lineups, stacking rules and the
// integer-program model the solver adapters consume

pub mod errors;
pub mod ledger;
pub mod lineup;
pub mod models;
pub mod player;
pub mod roster;
pub mod solver_service;
pub mod stacking;
pub mod value_objects;

pub use errors::{LineupError, LineupResult};
pub use ledger::ExposureLedger;
pub use lineup::{Lineup, LineupBatch, LineupConstraints};
pub use models::*;
pub use player::{Player, PlayerPool};
pub use roster::{RosterSlot, RosterTemplate, Site, SlotShortage};
pub use solver_service::*;
pub use stacking::StackingRule;
pub use value_objects::*;
