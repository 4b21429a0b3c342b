use lineupopt::{
    LineupError, LineupOptimizer, MipSolver, Player, PlayerPool, Position, RequestConfig,
};
use lineupopt::domain::{IntegerProgram, ProgramSolution, SolverError};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

fn player(id: &str, team: &str, opponent: &str, position: &str, salary: u32, points: f64) -> Player {
    Player::new(id, id.to_uppercase(), team, vec![Position::new(position)], salary, points)
        .with_opponent(opponent)
}

/// 20 players for the 9-slot DraftKings NFL roster.
fn small_nfl_pool() -> Vec<Player> {
    vec![
        player("qb1", "KC", "BUF", "QB", 6800, 22.0),
        player("qb2", "BUF", "KC", "QB", 6500, 21.0),
        player("qb3", "DAL", "PHI", "QB", 6000, 19.0),
        player("rb1", "KC", "BUF", "RB", 6000, 17.0),
        player("rb2", "BUF", "KC", "RB", 5500, 15.0),
        player("rb3", "DAL", "PHI", "RB", 5000, 13.0),
        player("rb4", "PHI", "DAL", "RB", 4500, 12.0),
        player("wr1", "KC", "BUF", "WR", 6200, 16.0),
        player("wr2", "BUF", "KC", "WR", 5800, 15.0),
        player("wr3", "DAL", "PHI", "WR", 5200, 13.0),
        player("wr4", "PHI", "DAL", "WR", 4800, 12.0),
        player("wr5", "KC", "BUF", "WR", 4000, 10.0),
        player("wr6", "PHI", "DAL", "WR", 3500, 9.0),
        player("te1", "KC", "BUF", "TE", 5000, 12.0),
        player("te2", "BUF", "KC", "TE", 4000, 9.0),
        player("te3", "PHI", "DAL", "TE", 3000, 7.0),
        player("dst1", "KC", "BUF", "DST", 3200, 9.0),
        player("dst2", "BUF", "KC", "DST", 3000, 8.0),
        player("dst3", "DAL", "PHI", "DST", 2800, 7.0),
        player("dst4", "PHI", "DAL", "DST", 2500, 6.0),
    ]
}

/// Two full games: per team one QB, two RBs, three WRs, one TE and a DST.
#[cfg_attr(not(feature = "highs"), allow(dead_code))]
fn full_nfl_pool() -> Vec<Player> {
    let teams = [("KC", "BUF"), ("BUF", "KC"), ("DAL", "PHI"), ("PHI", "DAL")];
    let mut players = Vec::new();
    for (t, (team, opponent)) in teams.iter().enumerate() {
        let bonus = t as f64;
        let lower = team.to_lowercase();
        players.push(player(&format!("{lower}_qb"), team, opponent, "QB", 6500, 20.0 + bonus));
        for i in 0..2 {
            let id = format!("{lower}_rb{i}");
            players.push(player(&id, team, opponent, "RB", 5200 - 400 * i, 14.0 - i as f64 + bonus));
        }
        for i in 0..3 {
            let id = format!("{lower}_wr{i}");
            players.push(player(&id, team, opponent, "WR", 5600 - 700 * i, 15.0 - 2.0 * i as f64 + bonus));
        }
        players.push(player(&format!("{lower}_te"), team, opponent, "TE", 4200, 10.0 + bonus));
        players.push(player(&format!("{lower}_dst"), team, opponent, "DST", 3000, 8.0 + bonus));
    }
    players
}

/// Backend that only counts how often it is asked to solve.
#[derive(Default)]
struct CountingSolver {
    calls: AtomicUsize,
}

impl MipSolver for CountingSolver {
    fn solve(&self, _program: &IntegerProgram) -> Result<ProgramSolution, SolverError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        Err(SolverError::ExecutionFailed("not a real solver".to_string()))
    }

    fn name(&self) -> &str {
        "counting"
    }

    fn supports_mip(&self) -> bool {
        true
    }
}

#[test]
fn short_pool_is_rejected_before_any_solve() {
    let players: Vec<Player> = small_nfl_pool()
        .into_iter()
        .filter(|p| ["qb1", "rb1", "rb2", "wr1", "wr2", "wr3", "te1", "dst1"].contains(&p.id.as_str()))
        .collect();
    assert_eq!(players.len(), 8);
    let pool = PlayerPool::new(players).unwrap();

    let backend = Arc::new(CountingSolver::default());
    let optimizer = LineupOptimizer::new(backend.clone());
    let err = optimizer.optimize(&pool, &RequestConfig::new(3)).unwrap_err();

    assert!(matches!(err, LineupError::Validation(_)), "{err}");
    assert_eq!(backend.calls.load(Ordering::SeqCst), 0);
}

#[test]
fn invalid_request_is_rejected_before_any_solve() {
    let pool = PlayerPool::new(small_nfl_pool()).unwrap();
    let backend = Arc::new(CountingSolver::default());
    let optimizer = LineupOptimizer::new(backend.clone());

    let request = RequestConfig {
        max_exposure: 2.0,
        ..RequestConfig::new(3)
    };
    let err = optimizer.optimize(&pool, &request).unwrap_err();
    assert!(matches!(err, LineupError::Validation(_)));
    assert_eq!(backend.calls.load(Ordering::SeqCst), 0);
}

#[cfg(feature = "highs")]
mod with_highs {
    use super::*;
    use lineupopt::engine::FailureKind;
    use lineupopt::{
        ExposureLedger, HighsSolver, LineupBatch, RosterSlot, RosterTemplate, Site, StackingRule,
    };
    use std::collections::BTreeMap;

    fn optimizer() -> LineupOptimizer {
        LineupOptimizer::new(Arc::new(HighsSolver::new()))
    }

    #[test]
    fn exposure_cap_limits_every_player() {
        let pool = PlayerPool::new(small_nfl_pool()).unwrap();
        let request = RequestConfig {
            salary_cap: Some(50_000),
            max_exposure: 0.3,
            randomness: 0.1,
            seed: Some(17),
            ..RequestConfig::new(10)
        };
        let outcome = optimizer().optimize(&pool, &request).unwrap();

        // Three QBs at three appearances each cannot fill ten lineups.
        assert!(outcome.batch.len() <= 9);
        assert!(!outcome.batch.is_empty());
        assert_eq!(outcome.report.shortfall, 10 - outcome.batch.len());

        let constraints = request.lineup_constraints();
        for lineup in &outcome.batch {
            assert!(lineup.salary() <= 50_000);
            assert!(constraints.is_valid(&outcome.template, &pool, lineup));
        }
        for p in 0..pool.len() {
            assert!(outcome.ledger.usage(p) <= 3, "{} overused", pool.get(p).id);
        }
        for exposure in &outcome.report.player_exposure {
            assert!(exposure.lineups <= 3);
        }
    }

    #[test]
    fn team_stack_only_one_team_can_supply() {
        let players = vec![
            player("qa", "AAA", "BBB", "QB", 5000, 10.0),
            player("wa", "AAA", "BBB", "WR", 5000, 5.0),
            player("ta", "AAA", "BBB", "TE", 5000, 3.0),
            player("qb", "BBB", "AAA", "QB", 5000, 20.0),
            player("wb", "BBB", "AAA", "WR", 5000, 15.0),
            player("wc", "CCC", "DDD", "WR", 5000, 14.0),
            player("tc", "CCC", "DDD", "TE", 5000, 12.0),
            player("wd", "DDD", "CCC", "WR", 5000, 13.0),
        ];
        let pool = PlayerPool::new(players).unwrap();
        let stack = StackingRule::team_stack(
            3,
            Some(vec![Position::new("QB"), Position::new("WR"), Position::new("TE")]),
        );
        let request = RequestConfig {
            roster: Some(vec![
                RosterSlot::single("QB"),
                RosterSlot::new("WR1", vec![Position::new("WR")]),
                RosterSlot::new("WR2", vec![Position::new("WR")]),
                RosterSlot::single("TE"),
            ]),
            salary_cap: Some(20_000),
            stacking_rules: vec![stack.clone()],
            randomness: 0.3,
            seed: Some(4),
            ..RequestConfig::new(3)
        };
        let outcome = optimizer().optimize(&pool, &request).unwrap();

        assert_eq!(outcome.batch.len(), 3);
        for lineup in &outcome.batch {
            for id in ["qa", "wa", "ta"] {
                assert!(lineup.contains(pool.index_of(id).unwrap()), "missing {id}");
            }
            assert!(stack.is_satisfied(&lineup.player_refs(&pool)));
        }

        let without_te = RequestConfig {
            excluded: vec!["ta".to_string()],
            ..request
        };
        let outcome = optimizer().optimize(&pool, &without_te).unwrap();
        assert!(outcome.batch.is_empty());
        assert_eq!(outcome.report.failures[0].kind, FailureKind::Infeasible);
    }

    #[test]
    fn dst_never_faces_its_opponents_offense() {
        let pool = PlayerPool::new(full_nfl_pool()).unwrap();
        let offense: Vec<Position> = ["QB", "RB", "WR", "TE"].map(Position::new).to_vec();
        let request = RequestConfig {
            stacking_rules: vec![StackingRule::OpposingTeamRestriction {
                first: vec![Position::new("DST")],
                second: offense.clone(),
            }],
            max_exposure: 0.6,
            randomness: 0.2,
            seed: Some(23),
            ..RequestConfig::new(5)
        };
        let outcome = optimizer().optimize(&pool, &request).unwrap();
        assert!(!outcome.batch.is_empty());

        for lineup in &outcome.batch {
            let players = lineup.player_refs(&pool);
            for dst in players.iter().filter(|p| p.has_position(&Position::new("DST"))) {
                for other in &players {
                    assert!(
                        !(other.team.as_str() == dst.opponent.as_deref().unwrap_or("")
                            && other.has_any_position(&offense)),
                        "{} faces {}",
                        dst.id,
                        other.id
                    );
                }
            }
        }
    }

    #[test]
    fn every_rule_holds_on_every_lineup() {
        let pool = PlayerPool::new(full_nfl_pool()).unwrap();
        let request = RequestConfig {
            stacking_rules: vec![
                StackingRule::position_pair("QB", "WR"),
                StackingRule::OpposingTeamRequirement {
                    first: Position::new("QB"),
                    second: Position::new("WR"),
                },
                StackingRule::game_stack(4, 1),
            ],
            max_exposure: 0.5,
            max_pair_exposure: 0.5,
            max_repeating_players: Some(6),
            randomness: 0.5,
            seed: Some(99),
            ..RequestConfig::new(6)
        };
        let outcome = optimizer().optimize(&pool, &request).unwrap();
        assert!(!outcome.batch.is_empty());

        let constraints = request.lineup_constraints();
        let lineups = outcome.batch.as_slice();
        for (i, lineup) in lineups.iter().enumerate() {
            assert!(
                constraints.is_valid(&outcome.template, &pool, lineup),
                "{:?}",
                constraints.violations(&outcome.template, &pool, lineup)
            );
            for other in &lineups[i + 1..] {
                assert!(lineup.overlap(other) <= 6);
            }
        }
        for p in 0..pool.len() {
            assert!(outcome.ledger.usage(p) as usize <= 3);
        }
    }

    fn assert_all_valid(
        request: &RequestConfig,
        pool: &PlayerPool,
        batch: &LineupBatch,
        template: &RosterTemplate,
    ) {
        let constraints = request.lineup_constraints();
        for lineup in batch {
            assert!(
                constraints.is_valid(template, pool, lineup),
                "{:?}",
                constraints.violations(template, pool, lineup)
            );
        }
    }

    fn per_team<'a>(players: &[&'a Player], position: &str) -> BTreeMap<&'a str, usize> {
        let mut counts = BTreeMap::new();
        for p in players.iter().filter(|p| p.has_position(&Position::new(position))) {
            *counts.entry(p.team.as_str()).or_default() += 1;
        }
        counts
    }

    #[test]
    fn same_team_running_backs_are_kept_apart() {
        let pool = PlayerPool::new(full_nfl_pool()).unwrap();
        let request = RequestConfig {
            stacking_rules: vec![StackingRule::SameTeamRestriction {
                first: Position::new("RB"),
                second: Position::new("RB"),
            }],
            max_exposure: 0.6,
            randomness: 0.2,
            seed: Some(31),
            ..RequestConfig::new(5)
        };
        let outcome = optimizer().optimize(&pool, &request).unwrap();
        assert!(!outcome.batch.is_empty());
        assert_all_valid(&request, &pool, &outcome.batch, &outcome.template);

        for lineup in &outcome.batch {
            let players = lineup.player_refs(&pool);
            for (team, count) in per_team(&players, "RB") {
                assert!(count <= 1, "{count} running backs from {team}");
            }
        }
    }

    #[test]
    fn quarterback_stacks_with_two_receivers() {
        let pool = PlayerPool::new(full_nfl_pool()).unwrap();
        let request = RequestConfig {
            stacking_rules: vec![StackingRule::PositionsStack {
                positions: ["QB", "WR", "WR"].map(Position::new).to_vec(),
            }],
            max_exposure: 0.6,
            randomness: 0.3,
            seed: Some(5),
            ..RequestConfig::new(5)
        };
        let outcome = optimizer().optimize(&pool, &request).unwrap();
        assert!(!outcome.batch.is_empty());
        assert_all_valid(&request, &pool, &outcome.batch, &outcome.template);

        for lineup in &outcome.batch {
            let players = lineup.player_refs(&pool);
            let qbs = per_team(&players, "QB");
            let wrs = per_team(&players, "WR");
            assert!(
                qbs.keys().any(|team| wrs.get(team).copied().unwrap_or(0) >= 2),
                "no team supplies a QB and two WRs"
            );
        }
    }

    #[test]
    fn team_stack_counts_any_position() {
        let pool = PlayerPool::new(full_nfl_pool()).unwrap();
        let request = RequestConfig {
            stacking_rules: vec![StackingRule::team_stack(5, None)],
            max_exposure: 0.6,
            randomness: 0.3,
            seed: Some(12),
            ..RequestConfig::new(5)
        };
        let outcome = optimizer().optimize(&pool, &request).unwrap();
        assert!(!outcome.batch.is_empty());
        assert_all_valid(&request, &pool, &outcome.batch, &outcome.template);

        for lineup in &outcome.batch {
            let mut teams: BTreeMap<&str, usize> = BTreeMap::new();
            for p in lineup.player_refs(&pool) {
                *teams.entry(p.team.as_str()).or_default() += 1;
            }
            assert!(teams.values().any(|&n| n >= 5), "{teams:?}");
        }
    }

    #[test]
    fn pair_exposure_report_agrees_with_the_ledger() {
        let pool = PlayerPool::new(full_nfl_pool()).unwrap();
        let request = RequestConfig {
            stacking_rules: vec![StackingRule::position_pair("QB", "WR")],
            max_exposure: 0.5,
            max_pair_exposure: 0.34,
            randomness: 0.4,
            seed: Some(8),
            ..RequestConfig::new(6)
        };
        let outcome = optimizer().optimize(&pool, &request).unwrap();
        let produced = outcome.batch.len();
        assert!(produced > 0);
        assert!(outcome.report.diversification.is_some());
        assert_all_valid(&request, &pool, &outcome.batch, &outcome.template);
        assert_eq!(outcome.ledger, ExposureLedger::from_batch(&outcome.batch));

        let listed: u32 = outcome.report.pair_exposure.iter().map(|pair| pair.lineups).sum();
        let counted: u32 = outcome.ledger.used_pairs().map(|(_, n)| n).sum();
        assert_eq!(listed, counted);

        for pair in &outcome.report.pair_exposure {
            let a = pool.index_of(&pair.first).unwrap();
            let b = pool.index_of(&pair.second).unwrap();
            assert_eq!(pair.lineups, outcome.ledger.pair(a, b));
            assert!((pair.exposure - pair.lineups as f64 / produced as f64).abs() < 1e-9);

            let warned = outcome.report.warnings.iter().any(|w| {
                w.player_id == pair.first && w.partner_id.as_deref() == Some(pair.second.as_str())
            });
            assert!(
                pair.exposure <= request.max_pair_exposure + 1e-9 || warned,
                "{pair:?} is over target without a warning"
            );
        }
    }

    #[test]
    fn captain_slot_scales_salary_and_points() {
        let pool = PlayerPool::new(full_nfl_pool()).unwrap();
        let request = RequestConfig {
            site: Site::DraftkingsNflCaptain,
            ..RequestConfig::new(1)
        };
        let outcome = optimizer().optimize(&pool, &request).unwrap();
        assert_eq!(outcome.batch.len(), 1);
        assert_all_valid(&request, &pool, &outcome.batch, &outcome.template);

        let lineup = &outcome.batch.as_slice()[0];
        // The best projection takes the 1.5x slot.
        assert_eq!(pool.get(lineup.players()[0]).id, "phi_qb");
        assert!((lineup.points() - 132.5).abs() < 1e-9, "{}", lineup.points());
        assert_eq!(
            lineup.salary(),
            outcome.template.total_salary(&pool, lineup.players())
        );

        let view = &outcome.lineup_views(&pool)[0];
        assert_eq!(view.slots[0].slot, "CPT");
        assert_eq!(view.slots[0].salary, 9_750);
        assert_eq!(view.slots[0].projected_points, 34.5);
        assert_eq!(view.salary, lineup.salary());
    }
}
