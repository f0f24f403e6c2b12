//! Unlock-state engine.
//!
//! Pure computation from (puzzle catalog, gate catalog, solved set, now) to
//! the per-item lock state the pages render. No I/O and no caching: solve
//! state and gate clocks both move between requests, so every handler
//! recomputes from scratch.

use std::collections::{BTreeMap, HashSet};

use chrono::{DateTime, Utc};

use crate::models::{Gate, Puzzle};

#[derive(Debug, Clone)]
pub struct GateStatus {
    pub id: i64,
    pub group_index: i32,
    pub title: String,
    pub content_html: String,
    pub unlock_at: DateTime<Utc>,
    /// The unlock timestamp is still in the future.
    pub locked: bool,
    /// All strictly-earlier groups are fully solved.
    pub can_view: bool,
    pub seconds_until_open: i64,
}

#[derive(Debug, Clone)]
pub struct PuzzleStatus {
    pub puzzle: Puzzle,
    pub solved: bool,
    pub unlocked: bool,
}

/// Sidebar entries in display order: each group's gate precedes its puzzles.
#[derive(Debug, Clone)]
pub enum SidebarItem {
    Gate(GateStatus),
    Puzzle(PuzzleStatus),
}

#[derive(Debug, Clone)]
pub struct GameState {
    pub items: Vec<SidebarItem>,
    /// First unlocked-but-unsolved puzzle, if any.
    pub next_puzzle: Option<PuzzleStatus>,
    /// First gate that is view-eligible but still time-locked.
    pub blocking_gate: Option<GateStatus>,
    pub all_solved: bool,
    pub solved_count: usize,
    pub total_count: usize,
}

impl GameState {
    /// Walk groups in ascending index order, carrying an "all previous
    /// groups solved" accumulator. Within a group, puzzles unlock strictly
    /// sequentially: the first unsolved puzzle in order-index order is
    /// unlocked, everything after it is not.
    pub fn compute(
        puzzles: &[Puzzle],
        gates: &[Gate],
        solved: &HashSet<i64>,
        now: DateTime<Utc>,
    ) -> Self {
        let mut by_group: BTreeMap<i32, Vec<&Puzzle>> = BTreeMap::new();
        for puzzle in puzzles {
            by_group.entry(puzzle.group_index).or_default().push(puzzle);
        }
        for group in by_group.values_mut() {
            group.sort_by_key(|p| (p.order_index, p.id));
        }

        let mut items = Vec::new();
        let mut next_puzzle: Option<PuzzleStatus> = None;
        let mut blocking_gate: Option<GateStatus> = None;
        let mut previous_solved = true;

        for (group_index, group) in &by_group {
            let gate = gates.iter().find(|g| g.group_index == *group_index);
            let gate_locked = gate.is_some_and(|g| g.unlock_at > now);

            if let Some(gate) = gate {
                let status = GateStatus {
                    id: gate.id,
                    group_index: gate.group_index,
                    title: gate.title.clone(),
                    content_html: gate.content_html.clone(),
                    unlock_at: gate.unlock_at,
                    locked: gate_locked,
                    can_view: previous_solved,
                    seconds_until_open: (gate.unlock_at - now).num_seconds().max(0),
                };
                if blocking_gate.is_none() && status.locked && status.can_view {
                    blocking_gate = Some(status.clone());
                }
                items.push(SidebarItem::Gate(status));
            }

            let group_accessible = previous_solved && !gate_locked;
            let mut unlock_next = true;
            let mut group_solved = true;

            for puzzle in group {
                let is_solved = solved.contains(&puzzle.id);
                let unlocked = group_accessible && (is_solved || unlock_next);
                if group_accessible && !is_solved && unlock_next {
                    unlock_next = false;
                }
                group_solved &= is_solved;

                let status = PuzzleStatus {
                    puzzle: (*puzzle).clone(),
                    solved: is_solved,
                    unlocked,
                };
                if next_puzzle.is_none() && unlocked && !is_solved {
                    next_puzzle = Some(status.clone());
                }
                items.push(SidebarItem::Puzzle(status));
            }

            previous_solved &= group_solved;
        }

        let total_count = puzzles.len();
        let solved_count = puzzles.iter().filter(|p| solved.contains(&p.id)).count();

        Self {
            items,
            next_puzzle,
            blocking_gate,
            all_solved: total_count > 0 && solved_count >= total_count,
            solved_count,
            total_count,
        }
    }

    pub fn puzzle(&self, id: i64) -> Option<&PuzzleStatus> {
        self.items.iter().find_map(|item| match item {
            SidebarItem::Puzzle(p) if p.puzzle.id == id => Some(p),
            _ => None,
        })
    }

    pub fn gate(&self, group_index: i32) -> Option<&GateStatus> {
        self.items.iter().find_map(|item| match item {
            SidebarItem::Gate(g) if g.group_index == group_index => Some(g),
            _ => None,
        })
    }
}

#[cfg(test)]
mod tests {
    use chrono::Duration;

    use super::*;

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
            content_html: String::new(),
            unlock_at,
            created_at: Utc::now(),
        }
    }

    fn solved(ids: &[i64]) -> HashSet<i64> {
        ids.iter().copied().collect()
    }

    #[test]
    fn first_puzzle_unlocked_rest_locked() {
        let puzzles = vec![puzzle(1, 1, 1, "echo"), puzzle(2, 1, 2, "piano")];
        let state = GameState::compute(&puzzles, &[], &solved(&[]), Utc::now());

        assert!(state.puzzle(1).unwrap().unlocked);
        assert!(!state.puzzle(2).unwrap().unlocked);
        assert_eq!(state.next_puzzle.as_ref().unwrap().puzzle.id, 1);
        assert!(!state.all_solved);
    }

    #[test]
    fn solving_first_unlocks_second() {
        let puzzles = vec![puzzle(1, 1, 1, "echo"), puzzle(2, 1, 2, "piano")];
        let state = GameState::compute(&puzzles, &[], &solved(&[1]), Utc::now());

        assert!(state.puzzle(1).unwrap().solved);
        assert!(state.puzzle(2).unwrap().unlocked);
        assert_eq!(state.next_puzzle.as_ref().unwrap().puzzle.id, 2);
    }

    #[test]
    fn no_puzzle_unlocks_past_an_unsolved_earlier_one() {
        // Solved ahead of its turn (e.g. admin reordered the catalog):
        // puzzle 3's solve never unlocks puzzle 2 while 1 is open.
        let puzzles = vec![
            puzzle(1, 1, 1, "a"),
            puzzle(2, 1, 2, "b"),
            puzzle(3, 1, 3, "c"),
        ];
        let state = GameState::compute(&puzzles, &[], &solved(&[3]), Utc::now());

        assert!(state.puzzle(1).unwrap().unlocked);
        assert!(!state.puzzle(2).unwrap().unlocked);
        assert!(state.puzzle(3).unwrap().solved);
        assert_eq!(state.next_puzzle.as_ref().unwrap().puzzle.id, 1);
    }

    #[test]
    fn later_group_locked_until_earlier_group_complete() {
        let puzzles = vec![puzzle(1, 1, 1, "a"), puzzle(2, 2, 1, "b")];

        let state = GameState::compute(&puzzles, &[], &solved(&[]), Utc::now());
        assert!(!state.puzzle(2).unwrap().unlocked);

        let state = GameState::compute(&puzzles, &[], &solved(&[1]), Utc::now());
        assert!(state.puzzle(2).unwrap().unlocked);
    }

    #[test]
    fn future_gate_blocks_group_and_is_reported() {
        let now = Utc::now();
        let puzzles = vec![puzzle(1, 1, 1, "a"), puzzle(2, 2, 1, "b")];
        let gates = vec![gate(10, 2, now + Duration::hours(1))];

        let state = GameState::compute(&puzzles, &gates, &solved(&[1]), now);

        let gate_status = state.gate(2).unwrap();
        assert!(gate_status.locked);
        assert!(gate_status.can_view);
        assert!(gate_status.seconds_until_open > 0);
        assert!(!state.puzzle(2).unwrap().unlocked);
        assert_eq!(state.blocking_gate.as_ref().unwrap().group_index, 2);
        assert!(state.next_puzzle.is_none());
    }

    #[test]
    fn gate_on_unreached_group_is_not_blocking() {
        let now = Utc::now();
        let puzzles = vec![puzzle(1, 1, 1, "a"), puzzle(2, 2, 1, "b")];
        let gates = vec![gate(10, 2, now + Duration::hours(1))];

        let state = GameState::compute(&puzzles, &gates, &solved(&[]), now);

        let gate_status = state.gate(2).unwrap();
        assert!(gate_status.locked);
        assert!(!gate_status.can_view);
        assert!(state.blocking_gate.is_none());
        assert_eq!(state.next_puzzle.as_ref().unwrap().puzzle.id, 1);
    }

    #[test]
    fn open_gate_lets_group_play() {
        let now = Utc::now();
        let puzzles = vec![puzzle(1, 1, 1, "a"), puzzle(2, 2, 1, "b")];
        let gates = vec![gate(10, 2, now - Duration::minutes(5))];

        let state = GameState::compute(&puzzles, &gates, &solved(&[1]), now);

        let gate_status = state.gate(2).unwrap();
        assert!(!gate_status.locked);
        assert_eq!(gate_status.seconds_until_open, 0);
        assert!(state.puzzle(2).unwrap().unlocked);
        assert!(state.blocking_gate.is_none());
    }

    #[test]
    fn all_solved_requires_nonempty_catalog() {
        let state = GameState::compute(&[], &[], &solved(&[]), Utc::now());
        assert!(!state.all_solved);

        let puzzles = vec![puzzle(1, 1, 1, "a"), puzzle(2, 1, 2, "b")];
        let state = GameState::compute(&puzzles, &[], &solved(&[1]), Utc::now());
        assert!(!state.all_solved);

        let state = GameState::compute(&puzzles, &[], &solved(&[1, 2]), Utc::now());
        assert!(state.all_solved);
        assert_eq!(state.solved_count, 2);
        assert_eq!(state.total_count, 2);
        assert!(state.next_puzzle.is_none());
    }

    #[test]
    fn sidebar_orders_gate_before_its_group() {
        let now = Utc::now();
        let puzzles = vec![puzzle(1, 1, 1, "a"), puzzle(2, 2, 1, "b")];
        let gates = vec![gate(10, 2, now - Duration::minutes(1))];

        let state = GameState::compute(&puzzles, &gates, &solved(&[]), now);

        let kinds: Vec<&str> = state
            .items
            .iter()
            .map(|item| match item {
                SidebarItem::Gate(_) => "gate",
                SidebarItem::Puzzle(_) => "puzzle",
            })
            .collect();
        assert_eq!(kinds, vec!["puzzle", "gate", "puzzle"]);
    }

    #[test]
    fn puzzles_order_by_order_index_within_group() {
        // Insertion order deliberately scrambled.
        let puzzles = vec![puzzle(7, 1, 3, "c"), puzzle(5, 1, 1, "a"), puzzle(6, 1, 2, "b")];
        let state = GameState::compute(&puzzles, &[], &solved(&[]), Utc::now());

        assert!(state.puzzle(5).unwrap().unlocked);
        assert!(!state.puzzle(6).unwrap().unlocked);
        assert!(!state.puzzle(7).unwrap().unlocked);
    }
}
