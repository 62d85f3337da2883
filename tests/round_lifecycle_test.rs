//! End-to-end checks of a round's lifecycle through the public API

use bingo_engine::games::board::{FREE_CELL_INDEX, WIN_LINES};
use bingo_engine::games::fairness::verify_call_log;
use bingo_engine::games::{RandomDrawer, ScriptedDrawer};
use bingo_engine::{
    Board, ConfigBuilder, EngineError, GameOutcome, MarkRejection, Round, RoundConfig,
    RoundStatus, WinReason,
};
use std::collections::HashSet;

fn rounds(min_players: usize) -> RoundConfig {
    ConfigBuilder::new()
        .min_players(min_players)
        .build()
        .expect("valid config")
        .rounds
}

#[test]
fn test_single_player_join_auto_starts() {
    let mut round = Round::new(1, 10, &rounds(1)).unwrap();
    let board = round.join(42, None).unwrap();

    assert_eq!(board.cells().len(), 25);
    assert_eq!(round.status(), RoundStatus::Active);
    assert_eq!(round.called_numbers().len(), 1);
    assert_eq!(round.pool(), 10);
}

#[test]
fn test_explicit_cartela_twice_is_taken() {
    let mut round = Round::new(1, 10, &rounds(1)).unwrap();
    let first = round.join(1, Some(5)).unwrap();
    assert_eq!(first, Board::derive(5));

    let err = round.join(2, Some(5)).unwrap_err();
    assert!(matches!(err, EngineError::CartelaTaken { cartela: 5, .. }));
    assert!(err.is_contention());
    assert_eq!(round.pool(), 10);
}

#[test]
fn test_marking_uncalled_number_leaves_marks_unchanged() {
    let mut round = Round::new(1, 10, &rounds(1))
        .unwrap()
        .with_drawer(ScriptedDrawer::new([1]));
    let board = round.join(7, Some(30)).unwrap();

    let uncalled = board
        .cells()
        .iter()
        .copied()
        .find(|&n| n != board.free_cell() && !round.called_numbers().contains(&n))
        .expect("board has uncalled numbers");
    let before = round.player(7).unwrap().marked().clone();

    assert_eq!(round.mark_number(7, uncalled), Err(MarkRejection::NotCalled));
    assert_eq!(round.player(7).unwrap().marked(), &before);
}

#[test]
fn test_row_zero_wins_after_five_calls() {
    let board = Board::from_cells([
        3, 17, 33, 50, 70, //
        6, 22, 40, 55, 66, //
        9, 25, 41, 58, 67, //
        11, 27, 42, 59, 71, //
        14, 29, 44, 60, 75,
    ])
    .unwrap();
    let mut round = Round::new(1, 10, &rounds(1))
        .unwrap()
        .with_drawer(ScriptedDrawer::new([3, 17, 33, 50, 70]));
    round.join_with_board(1, 12, board).unwrap();

    for _ in 0..4 {
        round.call_number().expect("active round draws");
    }
    assert_eq!(round.called_numbers(), &[3, 17, 33, 50, 70]);

    for n in [3, 17, 33, 50, 70] {
        round.mark_number(1, n).unwrap();
    }
    let check = round.check_winner(1);
    assert!(check.won);
    assert_eq!(check.reason.to_string(), "row");
}

#[test]
fn test_active_round_never_stalls_after_script_runs_out() {
    let mut round = Round::new(1, 10, &rounds(1))
        .unwrap()
        .with_drawer(ScriptedDrawer::new([5]));
    round.join(1, None).unwrap();

    let mut calls = 1;
    while round.status() == RoundStatus::Active {
        assert!(round.call_number().is_some(), "active round returned no call");
        calls += 1;
        assert!(calls <= 75);
    }
    assert_eq!(calls, 75);
    assert_eq!(round.status(), RoundStatus::Finished);
}

#[test]
fn test_exhausted_deck_returns_none_and_finishes() {
    let mut round = Round::new(1, 10, &rounds(1)).unwrap();
    round.join(1, None).unwrap();
    for _ in 0..74 {
        assert!(round.call_number().is_some());
    }
    assert_eq!(round.called_numbers().len(), 75);

    assert!(round.call_number().is_none());
    assert_eq!(round.status(), RoundStatus::Finished);

    let outcome = round.outcome().unwrap();
    assert_eq!(outcome.winner, None);
    assert!(outcome
        .results
        .iter()
        .all(|r| r.outcome == GameOutcome::Loss && r.payout == 0));
}

#[test]
fn test_claim_on_final_call_still_wins() {
    let mut round = Round::new(1, 10, &rounds(1))
        .unwrap()
        .with_drawer(RandomDrawer::seeded(99));
    round.join(1, Some(64)).unwrap();
    while round.call_number().is_some() {}
    assert_eq!(round.status(), RoundStatus::Finished);

    let board = *round.player(1).unwrap().board();
    for &n in board.cells() {
        round.mark_number(1, n).unwrap();
    }
    let check = round.claim(1).unwrap();
    assert_eq!(check.reason, WinReason::Row);
    assert_eq!(round.winner_id(), Some(1));
}

#[test]
fn test_call_sequence_properties_over_many_rounds() {
    for seed in 0..20u64 {
        let mut round = Round::new(seed, 20, &rounds(1))
            .unwrap()
            .with_drawer(RandomDrawer::seeded(seed));
        round.join(1, None).unwrap();

        let mut statuses = vec![round.status()];
        while round.call_number().is_some() {
            assert!(round.called_numbers().len() <= 75);
            statuses.push(round.status());
        }

        let unique: HashSet<u8> = round.called_numbers().iter().copied().collect();
        assert_eq!(unique.len(), 75);
        assert!(unique.iter().all(|n| (1..=75).contains(n)));
        assert!(statuses.windows(2).all(|w| w[0] <= w[1]));
        assert!(verify_call_log(
            seed,
            round.called_numbers(),
            &round.call_log_digest()
        ));
    }
}

#[test]
fn test_mark_succeeds_iff_on_board_and_called() {
    let mut round = Round::new(1, 10, &rounds(1))
        .unwrap()
        .with_drawer(RandomDrawer::seeded(5));
    let board = round.join(1, Some(77)).unwrap();
    for _ in 0..30 {
        round.call_number();
    }
    let called: HashSet<u8> = round.called_numbers().iter().copied().collect();

    for n in 1..=75u8 {
        let expected = n == board.free_cell() || (board.contains(n) && called.contains(&n));
        assert_eq!(round.mark_number(1, n).is_ok(), expected, "number {}", n);
    }
}

#[test]
fn test_win_iff_line_subset_of_marks() {
    let mut round = Round::new(1, 10, &rounds(1))
        .unwrap()
        .with_drawer(RandomDrawer::seeded(12));
    let board = round.join(1, Some(3)).unwrap();
    let first = round.called_numbers()[0];
    let _ = round.mark_number(1, first);

    let mut last_won = false;
    while let Some(call) = round.call_number() {
        let _ = round.mark_number(1, call.number);
        let marked = round.player(1).unwrap().marked().clone();

        let expected = WIN_LINES.iter().any(|(line, _)| {
            line.iter()
                .all(|&i| i == FREE_CELL_INDEX || marked.contains(&board.cells()[i]))
        });
        let check = round.check_winner(1);
        assert_eq!(check.won, expected);
        if check.won {
            last_won = true;
            break;
        }
    }
    assert!(last_won, "a full deck always completes a line");
}

#[test]
fn test_available_cartelas_shrink_as_players_join() {
    let mut round = Round::new(1, 100, &rounds(10)).unwrap();
    for player in 1..=3 {
        round.join(player, Some(player as u32 * 10)).unwrap();
    }
    assert_eq!(round.used_cartelas(), vec![10, 20, 30]);
    assert_eq!(round.available_cartelas().len(), 97);
    assert!(!round.available_cartelas().contains(&20));
}
