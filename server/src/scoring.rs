use chrono::{DateTime, Utc};

pub const SCORE_BASE: i32 = 100_000;
pub const BONUS_FIRST: i32 = 10_000;
pub const BONUS_SECOND: i32 = 5_000;
pub const BONUS_THIRD: i32 = 2_500;

/// Whole seconds from run start to now, floored, never below 1.
pub fn elapsed_seconds(start: DateTime<Utc>, now: DateTime<Utc>) -> i32 {
    (now - start).num_seconds().max(1) as i32
}

/// Score is the base minus elapsed time (floored at zero), plus a podium
/// bonus keyed on finish order alone.
pub fn score_for(rank: i32, total_seconds: i32) -> i32 {
    let mut score = (SCORE_BASE - total_seconds).max(0);
    score += match rank {
        1 => BONUS_FIRST,
        2 => BONUS_SECOND,
        3 => BONUS_THIRD,
        _ => 0,
    };
    score
}

#[cfg(test)]
mod tests {
    use chrono::Duration;

    use super::*;

    #[test]
    fn test_elapsed_floors_and_clamps() {
        let start = Utc::now();
        assert_eq!(elapsed_seconds(start, start), 1);
        assert_eq!(elapsed_seconds(start, start + Duration::milliseconds(400)), 1);
        assert_eq!(elapsed_seconds(start, start + Duration::milliseconds(2900)), 2);
        assert_eq!(elapsed_seconds(start, start + Duration::seconds(90)), 90);
    }

    #[test]
    fn test_podium_bonuses() {
        assert_eq!(score_for(1, 120), SCORE_BASE - 120 + BONUS_FIRST);
        assert_eq!(score_for(2, 120), SCORE_BASE - 120 + BONUS_SECOND);
        assert_eq!(score_for(3, 120), SCORE_BASE - 120 + BONUS_THIRD);
        assert_eq!(score_for(4, 120), SCORE_BASE - 120);
    }

    #[test]
    fn test_second_finisher_bonus_ignores_elapsed() {
        // A slower first finisher still keeps rank 1's bonus.
        assert_eq!(score_for(1, 5000), SCORE_BASE - 5000 + BONUS_FIRST);
        assert_eq!(score_for(2, 100), SCORE_BASE - 100 + BONUS_SECOND);
    }

    #[test]
    fn test_base_never_goes_negative() {
        assert_eq!(score_for(4, SCORE_BASE + 999), 0);
        assert_eq!(score_for(1, SCORE_BASE + 999), BONUS_FIRST);
    }

    #[test]
    fn test_score_is_deterministic() {
        // Finalize-twice safety rests on the finish_time guard; the score
        // itself is a pure function of (rank, elapsed).
        assert_eq!(score_for(2, 777), score_for(2, 777));
    }
}
