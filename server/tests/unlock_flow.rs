//! End-to-end walk of the unlock engine and answer matching, without a
//! database: a solve is the insertion the answer route performs once the
//! submission normalizes equal to the stored answer.

use std::collections::HashSet;

use chrono::{DateTime, Duration, Utc};
use gatehunt::game::GameState;
use gatehunt::models::{Gate, Puzzle};
use gatehunt::scoring::{BONUS_FIRST, BONUS_SECOND, SCORE_BASE, elapsed_seconds, score_for};
use gatehunt::utils::normalize_answer;

fn puzzle(id: i64, group_index: i32, order_index: i32, answer: &str) -> Puzzle {
    Puzzle {
        id,
        title: format!("Puzzle {id}"),
        clue: String::new(),
        answer: answer.to_string(),
        group_index,
        order_index,
        media_url: None,
        media_embed_html: None,
        custom_html: None,
        created_at: Utc::now(),
    }
}

fn gate(id: i64, group_index: i32, unlock_at: DateTime<Utc>) -> Gate {
    Gate {
        id,
        group_index,
        title: format!("Gate {group_index}"),
        content_html: "<p>Wait here.</p>".to_string(),
        unlock_at,
        created_at: Utc::now(),
    }
}

/// Submit an answer the way the answer route does: only an unlocked puzzle
/// is eligible, and the solve lands iff the normalized forms agree.
fn submit(
    puzzles: &[Puzzle],
    gates: &[Gate],
    solved: &mut HashSet<i64>,
    now: DateTime<Utc>,
    puzzle_id: i64,
    raw_answer: &str,
) -> bool {
    let state = GameState::compute(puzzles, gates, solved, now);
    let Some(status) = state.puzzle(puzzle_id) else {
        return false;
    };
    if !status.unlocked {
        return false;
    }
    if normalize_answer(&status.puzzle.answer) != normalize_answer(raw_answer) {
        return false;
    }
    solved.insert(puzzle_id);
    true
}

#[test]
fn two_puzzle_walkthrough() {
    let puzzles = vec![puzzle(1, 1, 1, "echo"), puzzle(2, 1, 2, "piano")];
    let mut solved = HashSet::new();
    let now = Utc::now();

    let state = GameState::compute(&puzzles, &[], &solved, now);
    assert!(state.puzzle(1).unwrap().unlocked);
    assert!(!state.puzzle(2).unwrap().unlocked);

    // Case and punctuation are forgiven.
    assert!(submit(&puzzles, &[], &mut solved, now, 1, "ECHO"));

    let state = GameState::compute(&puzzles, &[], &solved, now);
    assert!(state.puzzle(1).unwrap().solved);
    assert!(state.puzzle(2).unwrap().unlocked);
    assert!(!state.all_solved);

    // A wrong answer leaves everything untouched.
    assert!(!submit(&puzzles, &[], &mut solved, now, 2, "guitar"));
    let state = GameState::compute(&puzzles, &[], &solved, now);
    assert!(!state.puzzle(2).unwrap().solved);
    assert_eq!(state.next_puzzle.as_ref().unwrap().puzzle.id, 2);

    assert!(submit(&puzzles, &[], &mut solved, now, 2, "Piano!"));
    let state = GameState::compute(&puzzles, &[], &solved, now);
    assert!(state.all_solved);
    assert!(state.next_puzzle.is_none());
}

#[test]
fn locked_puzzle_rejects_even_a_correct_answer() {
    let puzzles = vec![puzzle(1, 1, 1, "echo"), puzzle(2, 1, 2, "piano")];
    let mut solved = HashSet::new();

    assert!(!submit(&puzzles, &[], &mut solved, Utc::now(), 2, "piano"));
    assert!(solved.is_empty());
}

#[test]
fn gate_holds_the_second_group_until_its_hour() {
    let now = Utc::now();
    let puzzles = vec![puzzle(1, 1, 1, "echo"), puzzle(2, 2, 1, "piano")];
    let gates = vec![gate(10, 2, now + Duration::minutes(30))];
    let mut solved = HashSet::new();

    assert!(submit(&puzzles, &gates, &mut solved, now, 1, "echo"));

    // Group 1 is done; the gate now fronts for group 2.
    let state = GameState::compute(&puzzles, &gates, &solved, now);
    let blocking = state.blocking_gate.as_ref().unwrap();
    assert_eq!(blocking.group_index, 2);
    assert!(blocking.locked);
    assert!(blocking.can_view);
    assert!(state.next_puzzle.is_none());
    assert!(!submit(&puzzles, &gates, &mut solved, now, 2, "piano"));

    // Once the clock passes, the gate opens and the group plays.
    let later = now + Duration::minutes(31);
    let state = GameState::compute(&puzzles, &gates, &solved, later);
    assert!(state.blocking_gate.is_none());
    assert!(submit(&puzzles, &gates, &mut solved, later, 2, "piano"));
    assert!(GameState::compute(&puzzles, &gates, &solved, later).all_solved);
}

#[test]
fn finish_order_decides_bonuses_not_speed() {
    let start = Utc::now();

    // First to finish took longer than the second; bonuses still follow
    // finish order.
    let first_elapsed = elapsed_seconds(start, start + Duration::seconds(900));
    let second_elapsed = elapsed_seconds(start, start + Duration::seconds(300));

    assert_eq!(score_for(1, first_elapsed), SCORE_BASE - 900 + BONUS_FIRST);
    assert_eq!(score_for(2, second_elapsed), SCORE_BASE - 300 + BONUS_SECOND);
}
