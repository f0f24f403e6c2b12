use chrono::{DateTime, Utc};
use sqlx::FromRow;

/// Fixed house enumeration. Registration rejects anything else and the house
/// scoreboard always reports all four, absent houses at zero.
pub const HOUSES: [&str; 4] = ["Athanasius", "Anselm", "Augustine", "Boniface"];

pub fn is_valid_house(house: &str) -> bool {
    HOUSES.contains(&house)
}

#[derive(Debug, Clone, FromRow)]
pub struct User {
    pub id: i64,
    pub username: String,
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub house: String,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, FromRow)]
pub struct Puzzle {
    pub id: i64,
    pub title: String,
    pub clue: String,
    pub answer: String,
    pub group_index: i32,
    pub order_index: i32,
    pub media_url: Option<String>,
    pub media_embed_html: Option<String>,
    pub custom_html: Option<String>,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, FromRow)]
pub struct Gate {
    pub id: i64,
    pub group_index: i32,
    pub title: String,
    pub content_html: String,
    pub unlock_at: DateTime<Utc>,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, FromRow)]
pub struct Run {
    pub user_id: i64,
    pub start_time: DateTime<Utc>,
    pub finish_time: Option<DateTime<Utc>>,
    pub total_seconds: Option<i32>,
    pub rank: Option<i32>,
    pub score: Option<i32>,
}

/// One finished run on the individual leaderboard.
#[derive(Debug, Clone, FromRow)]
pub struct LeaderboardRow {
    pub username: String,
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub house: String,
    pub total_seconds: i32,
    pub rank: i32,
    pub score: i32,
}

#[derive(Debug, Clone)]
pub struct HouseScore {
    pub house: String,
    pub total_score: i64,
}

/// Live-standing row used to compute a player's overall place while the
/// hunt is still running. Unfinished runs sort by their running clock.
#[derive(Debug, Clone, FromRow)]
pub struct StandingRow {
    pub user_id: i64,
    pub solved_count: i64,
    pub finished: bool,
    pub elapsed_seconds: i64,
}
