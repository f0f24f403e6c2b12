//! Postgres data layer.
//!
//! Every operation takes the pool explicitly; nothing here caches. The
//! schema is created idempotently at startup and a two-puzzle welcome
//! catalog is seeded the first time the table comes up empty.

use std::collections::HashSet;

use chrono::{DateTime, Utc};
use sqlx::{
    PgPool,
    postgres::PgPoolOptions,
};

use crate::{
    models::{Gate, HouseScore, LeaderboardRow, Puzzle, Run, StandingRow, User, HOUSES},
    scoring,
};

const SCHEMA: [&str; 10] = [
    "CREATE TABLE IF NOT EXISTS users (
        id BIGSERIAL PRIMARY KEY,
        username TEXT UNIQUE NOT NULL,
        first_name TEXT,
        last_name TEXT,
        house TEXT NOT NULL,
        created_at TIMESTAMPTZ NOT NULL
    )",
    "CREATE TABLE IF NOT EXISTS puzzles (
        id BIGSERIAL PRIMARY KEY,
        title TEXT NOT NULL,
        clue TEXT NOT NULL,
        answer TEXT NOT NULL,
        group_index INTEGER NOT NULL DEFAULT 1,
        order_index INTEGER NOT NULL,
        media_url TEXT,
        media_embed_html TEXT,
        custom_html TEXT,
        created_at TIMESTAMPTZ NOT NULL
    )",
    "CREATE TABLE IF NOT EXISTS gates (
        id BIGSERIAL PRIMARY KEY,
        group_index INTEGER UNIQUE NOT NULL,
        title TEXT NOT NULL,
        content_html TEXT NOT NULL,
        unlock_at TIMESTAMPTZ NOT NULL,
        created_at TIMESTAMPTZ NOT NULL
    )",
    "CREATE TABLE IF NOT EXISTS progress (
        user_id BIGINT NOT NULL,
        puzzle_id BIGINT NOT NULL,
        solved_at TIMESTAMPTZ NOT NULL,
        PRIMARY KEY (user_id, puzzle_id)
    )",
    "CREATE TABLE IF NOT EXISTS runs (
        user_id BIGINT PRIMARY KEY,
        start_time TIMESTAMPTZ NOT NULL,
        finish_time TIMESTAMPTZ,
        total_seconds INTEGER,
        rank INTEGER,
        score INTEGER
    )",
    "CREATE TABLE IF NOT EXISTS sessions (
        id BIGSERIAL PRIMARY KEY,
        user_id BIGINT NOT NULL,
        token TEXT UNIQUE NOT NULL,
        created_at TIMESTAMPTZ NOT NULL
    )",
    "CREATE TABLE IF NOT EXISTS admin_sessions (
        id BIGSERIAL PRIMARY KEY,
        token TEXT UNIQUE NOT NULL,
        created_at TIMESTAMPTZ NOT NULL
    )",
    "CREATE INDEX IF NOT EXISTS idx_progress_user_id ON progress(user_id)",
    "CREATE INDEX IF NOT EXISTS idx_progress_puzzle_id ON progress(puzzle_id)",
    "CREATE INDEX IF NOT EXISTS idx_puzzles_group_order ON puzzles(group_index, order_index)",
];

pub async fn init_pool(database_url: &str) -> PgPool {
    PgPoolOptions::new()
        .max_connections(5)
        .connect(database_url)
        .await
        .expect("Database unreachable!")
}

pub async fn init_db(pool: &PgPool) -> sqlx::Result<()> {
    init_schema(pool).await?;
    seed_welcome_puzzles(pool).await
}

pub async fn init_schema(pool: &PgPool) -> sqlx::Result<()> {
    for statement in SCHEMA {
        sqlx::query(statement).execute(pool).await?;
    }
    Ok(())
}

async fn seed_welcome_puzzles(pool: &PgPool) -> sqlx::Result<()> {
    let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM puzzles")
        .fetch_one(pool)
        .await?;
    if count > 0 {
        return Ok(());
    }

    sqlx::query(
        "INSERT INTO puzzles (title, clue, answer, group_index, order_index, created_at)
         VALUES ($1, $2, $3, $4, $5, NOW()), ($6, $7, $8, $9, $10, NOW())",
    )
    .bind("Welcome")
    .bind("I speak without a mouth and hear without ears. I have nobody, but I come alive with wind. What am I?")
    .bind("echo")
    .bind(1_i32)
    .bind(1_i32)
    .bind("Second")
    .bind("What has keys but can't open locks?")
    .bind("piano")
    .bind(1_i32)
    .bind(2_i32)
    .execute(pool)
    .await?;

    Ok(())
}

// -------------------- Users --------------------

pub async fn get_user_by_username(pool: &PgPool, username: &str) -> sqlx::Result<Option<User>> {
    sqlx::query_as::<_, User>("SELECT * FROM users WHERE LOWER(username) = LOWER($1)")
        .bind(username)
        .fetch_optional(pool)
        .await
}

pub async fn username_taken(pool: &PgPool, username: &str) -> sqlx::Result<bool> {
    let existing: Option<i64> = sqlx::query_scalar("SELECT id FROM users WHERE username = $1")
        .bind(username)
        .fetch_optional(pool)
        .await?;
    Ok(existing.is_some())
}

/// Derive a free username from the player's name, suffixing a counter on
/// collision and falling back to a timestamp if the namespace is saturated.
pub async fn generate_unique_username(
    pool: &PgPool,
    first_name: &str,
    last_name: &str,
) -> sqlx::Result<String> {
    let base = crate::utils::slugify_username(&format!("{first_name}{last_name}"));
    for i in 0..5000 {
        let candidate = if i == 0 {
            base.clone()
        } else {
            format!("{base}{i}")
        };
        if !username_taken(pool, &candidate).await? {
            return Ok(candidate);
        }
    }
    Ok(format!("{base}{}", Utc::now().timestamp_millis()))
}

pub async fn create_user(
    pool: &PgPool,
    username: &str,
    first_name: &str,
    last_name: &str,
    house: &str,
) -> sqlx::Result<User> {
    sqlx::query_as::<_, User>(
        "INSERT INTO users (username, first_name, last_name, house, created_at)
         VALUES ($1, $2, $3, $4, NOW())
         RETURNING *",
    )
    .bind(username)
    .bind(first_name)
    .bind(last_name)
    .bind(house)
    .fetch_one(pool)
    .await
}

pub async fn update_user(
    pool: &PgPool,
    id: i64,
    first_name: &str,
    last_name: &str,
    house: &str,
) -> sqlx::Result<User> {
    sqlx::query_as::<_, User>(
        "UPDATE users SET first_name = $1, last_name = $2, house = $3 WHERE id = $4 RETURNING *",
    )
    .bind(first_name)
    .bind(last_name)
    .bind(house)
    .bind(id)
    .fetch_one(pool)
    .await
}

pub async fn update_user_names(
    pool: &PgPool,
    id: i64,
    first_name: &str,
    last_name: &str,
) -> sqlx::Result<User> {
    sqlx::query_as::<_, User>(
        "UPDATE users SET first_name = $1, last_name = $2 WHERE id = $3 RETURNING *",
    )
    .bind(first_name)
    .bind(last_name)
    .bind(id)
    .fetch_one(pool)
    .await
}

// -------------------- Sessions --------------------

pub async fn create_session(pool: &PgPool, user_id: i64, token: &str) -> sqlx::Result<()> {
    sqlx::query("INSERT INTO sessions (user_id, token, created_at) VALUES ($1, $2, NOW())")
        .bind(user_id)
        .bind(token)
        .execute(pool)
        .await?;
    Ok(())
}

pub async fn session_user(pool: &PgPool, token: &str) -> sqlx::Result<Option<User>> {
    // Sessions expire after six hours; stale rows simply stop matching.
    sqlx::query_as::<_, User>(
        "SELECT users.* FROM sessions
         JOIN users ON users.id = sessions.user_id
         WHERE sessions.token = $1
           AND sessions.created_at > NOW() - INTERVAL '6 hours'",
    )
    .bind(token)
    .fetch_optional(pool)
    .await
}

pub async fn delete_session(pool: &PgPool, token: &str) -> sqlx::Result<()> {
    sqlx::query("DELETE FROM sessions WHERE token = $1")
        .bind(token)
        .execute(pool)
        .await?;
    Ok(())
}

pub async fn create_admin_session(pool: &PgPool, token: &str) -> sqlx::Result<()> {
    sqlx::query("INSERT INTO admin_sessions (token, created_at) VALUES ($1, NOW())")
        .bind(token)
        .execute(pool)
        .await?;
    Ok(())
}

pub async fn admin_session_valid(pool: &PgPool, token: &str) -> sqlx::Result<bool> {
    let found: Option<i64> = sqlx::query_scalar(
        "SELECT id FROM admin_sessions
         WHERE token = $1 AND created_at > NOW() - INTERVAL '6 hours'",
    )
    .bind(token)
    .fetch_optional(pool)
    .await?;
    Ok(found.is_some())
}

pub async fn delete_admin_session(pool: &PgPool, token: &str) -> sqlx::Result<()> {
    sqlx::query("DELETE FROM admin_sessions WHERE token = $1")
        .bind(token)
        .execute(pool)
        .await?;
    Ok(())
}

// -------------------- Catalog --------------------

pub async fn list_puzzles(pool: &PgPool) -> sqlx::Result<Vec<Puzzle>> {
    sqlx::query_as::<_, Puzzle>(
        "SELECT * FROM puzzles ORDER BY group_index ASC, order_index ASC, id ASC",
    )
    .fetch_all(pool)
    .await
}

pub struct PuzzleInput<'a> {
    pub title: &'a str,
    pub clue: &'a str,
    pub answer: &'a str,
    pub group_index: i32,
    pub order_index: i32,
    pub media_url: &'a str,
    pub media_embed_html: &'a str,
    pub custom_html: &'a str,
}

pub async fn create_puzzle(pool: &PgPool, input: &PuzzleInput<'_>) -> sqlx::Result<()> {
    sqlx::query(
        "INSERT INTO puzzles
         (title, clue, answer, group_index, order_index, media_url, media_embed_html, custom_html, created_at)
         VALUES ($1, $2, $3, $4, $5, NULLIF($6, ''), NULLIF($7, ''), NULLIF($8, ''), NOW())",
    )
    .bind(input.title)
    .bind(input.clue)
    .bind(input.answer)
    .bind(input.group_index)
    .bind(input.order_index)
    .bind(input.media_url)
    .bind(input.media_embed_html)
    .bind(input.custom_html)
    .execute(pool)
    .await?;
    Ok(())
}

pub async fn update_puzzle(pool: &PgPool, id: i64, input: &PuzzleInput<'_>) -> sqlx::Result<()> {
    sqlx::query(
        "UPDATE puzzles
         SET title = $1,
             clue = $2,
             answer = $3,
             group_index = $4,
             order_index = $5,
             media_url = NULLIF($6, ''),
             media_embed_html = NULLIF($7, ''),
             custom_html = NULLIF($8, '')
         WHERE id = $9",
    )
    .bind(input.title)
    .bind(input.clue)
    .bind(input.answer)
    .bind(input.group_index)
    .bind(input.order_index)
    .bind(input.media_url)
    .bind(input.media_embed_html)
    .bind(input.custom_html)
    .bind(id)
    .execute(pool)
    .await?;
    Ok(())
}

pub async fn delete_puzzle(pool: &PgPool, id: i64) -> sqlx::Result<()> {
    sqlx::query("DELETE FROM puzzles WHERE id = $1")
        .bind(id)
        .execute(pool)
        .await?;
    sqlx::query("DELETE FROM progress WHERE puzzle_id = $1")
        .bind(id)
        .execute(pool)
        .await?;
    Ok(())
}

pub async fn list_gates(pool: &PgPool) -> sqlx::Result<Vec<Gate>> {
    sqlx::query_as::<_, Gate>("SELECT * FROM gates ORDER BY group_index ASC")
        .fetch_all(pool)
        .await
}

pub async fn upsert_gate(
    pool: &PgPool,
    group_index: i32,
    title: &str,
    content_html: &str,
    unlock_at: DateTime<Utc>,
) -> sqlx::Result<()> {
    sqlx::query(
        "INSERT INTO gates (group_index, title, content_html, unlock_at, created_at)
         VALUES ($1, $2, $3, $4, NOW())
         ON CONFLICT (group_index)
         DO UPDATE SET title = EXCLUDED.title,
                       content_html = EXCLUDED.content_html,
                       unlock_at = EXCLUDED.unlock_at",
    )
    .bind(group_index)
    .bind(title)
    .bind(content_html)
    .bind(unlock_at)
    .execute(pool)
    .await?;
    Ok(())
}

pub async fn update_gate(
    pool: &PgPool,
    id: i64,
    group_index: i32,
    title: &str,
    content_html: &str,
    unlock_at: DateTime<Utc>,
) -> sqlx::Result<()> {
    sqlx::query(
        "UPDATE gates SET group_index = $1, title = $2, unlock_at = $3, content_html = $4 WHERE id = $5",
    )
    .bind(group_index)
    .bind(title)
    .bind(unlock_at)
    .bind(content_html)
    .bind(id)
    .execute(pool)
    .await?;
    Ok(())
}

pub async fn delete_gate(pool: &PgPool, id: i64) -> sqlx::Result<()> {
    sqlx::query("DELETE FROM gates WHERE id = $1")
        .bind(id)
        .execute(pool)
        .await?;
    Ok(())
}

// -------------------- Progress & runs --------------------

pub async fn solved_puzzle_ids(pool: &PgPool, user_id: i64) -> sqlx::Result<HashSet<i64>> {
    let ids: Vec<i64> = sqlx::query_scalar("SELECT puzzle_id FROM progress WHERE user_id = $1")
        .bind(user_id)
        .fetch_all(pool)
        .await?;
    Ok(ids.into_iter().collect())
}

/// Idempotent: a duplicate solve is a no-op.
pub async fn record_solve(pool: &PgPool, user_id: i64, puzzle_id: i64) -> sqlx::Result<()> {
    sqlx::query(
        "INSERT INTO progress (user_id, puzzle_id, solved_at)
         VALUES ($1, $2, NOW())
         ON CONFLICT (user_id, puzzle_id) DO NOTHING",
    )
    .bind(user_id)
    .bind(puzzle_id)
    .execute(pool)
    .await?;
    Ok(())
}

pub async fn ensure_run(pool: &PgPool, user_id: i64) -> sqlx::Result<Run> {
    sqlx::query(
        "INSERT INTO runs (user_id, start_time)
         VALUES ($1, NOW())
         ON CONFLICT (user_id) DO NOTHING",
    )
    .bind(user_id)
    .execute(pool)
    .await?;

    sqlx::query_as::<_, Run>("SELECT * FROM runs WHERE user_id = $1")
        .bind(user_id)
        .fetch_one(pool)
        .await
}

/// Finalize a finished run: elapsed time, finish-order rank, score.
///
/// Guarded by `finish_time`; a second call returns the stored run unchanged.
/// The finisher count and the update are two separate statements with no
/// isolation, so two users finishing in the same instant can observe the
/// same count. See DESIGN.md before "fixing" this.
pub async fn finalize_run(pool: &PgPool, user_id: i64, now: DateTime<Utc>) -> sqlx::Result<Run> {
    let run = sqlx::query_as::<_, Run>("SELECT * FROM runs WHERE user_id = $1")
        .bind(user_id)
        .fetch_one(pool)
        .await?;
    if run.finish_time.is_some() {
        return Ok(run);
    }

    let total_seconds = scoring::elapsed_seconds(run.start_time, now);
    let finished: i64 =
        sqlx::query_scalar("SELECT COUNT(*) FROM runs WHERE finish_time IS NOT NULL")
            .fetch_one(pool)
            .await?;
    let rank = (finished + 1) as i32;
    let score = scoring::score_for(rank, total_seconds);

    sqlx::query(
        "UPDATE runs
         SET finish_time = NOW(), total_seconds = $1, rank = $2, score = $3
         WHERE user_id = $4",
    )
    .bind(total_seconds)
    .bind(rank)
    .bind(score)
    .bind(user_id)
    .execute(pool)
    .await?;

    sqlx::query_as::<_, Run>("SELECT * FROM runs WHERE user_id = $1")
        .bind(user_id)
        .fetch_one(pool)
        .await
}

// -------------------- Standings --------------------

pub async fn leaderboard(pool: &PgPool) -> sqlx::Result<Vec<LeaderboardRow>> {
    sqlx::query_as::<_, LeaderboardRow>(
        "SELECT u.username, u.first_name, u.last_name, u.house,
                r.total_seconds, r.rank, r.score
         FROM runs r
         JOIN users u ON u.id = r.user_id
         WHERE r.finish_time IS NOT NULL
         ORDER BY r.score DESC, r.total_seconds ASC",
    )
    .fetch_all(pool)
    .await
}

/// Totals per house over finished runs, normalized over the fixed house
/// list so every house shows up even with no finishers.
pub async fn house_scores(pool: &PgPool) -> sqlx::Result<Vec<HouseScore>> {
    let rows: Vec<(String, i64)> = sqlx::query_as(
        "SELECT u.house, COALESCE(SUM(r.score), 0)::BIGINT AS total_score
         FROM users u
         LEFT JOIN runs r ON r.user_id = u.id AND r.finish_time IS NOT NULL
         GROUP BY u.house",
    )
    .fetch_all(pool)
    .await?;

    let mut scores: Vec<HouseScore> = HOUSES
        .iter()
        .map(|house| HouseScore {
            house: house.to_string(),
            total_score: rows
                .iter()
                .find(|(name, _)| name == house)
                .map(|(_, total)| *total)
                .unwrap_or(0),
        })
        .collect();
    scores.sort_by(|a, b| {
        b.total_score
            .cmp(&a.total_score)
            .then_with(|| a.house.cmp(&b.house))
    });
    Ok(scores)
}

/// 1-based live standing of a user across all players: most solves first,
/// finishers ahead of matching unfinished runs, then fastest clock, then
/// earliest signup. `None` if the user is unknown.
pub async fn overall_place(pool: &PgPool, user_id: i64) -> sqlx::Result<Option<i64>> {
    let rows: Vec<StandingRow> = sqlx::query_as::<_, StandingRow>(
        "SELECT u.id AS user_id,
                COALESCE(pc.solved_count, 0)::BIGINT AS solved_count,
                (r.finish_time IS NOT NULL) AS finished,
                COALESCE(r.total_seconds::BIGINT,
                         CAST(EXTRACT(EPOCH FROM (NOW() - r.start_time)) AS BIGINT),
                         99999999) AS elapsed_seconds
         FROM users u
         LEFT JOIN runs r ON r.user_id = u.id
         LEFT JOIN (
             SELECT user_id, COUNT(*) AS solved_count
             FROM progress
             GROUP BY user_id
         ) pc ON pc.user_id = u.id
         ORDER BY solved_count DESC, finished DESC, elapsed_seconds ASC, u.created_at ASC",
    )
    .fetch_all(pool)
    .await?;

    Ok(rows
        .iter()
        .position(|row| row.user_id == user_id)
        .map(|index| (index + 1) as i64))
}

// -------------------- Operator tooling --------------------

pub async fn reset_user_progress(pool: &PgPool, user_id: i64) -> sqlx::Result<u64> {
    let removed = sqlx::query("DELETE FROM progress WHERE user_id = $1")
        .bind(user_id)
        .execute(pool)
        .await?
        .rows_affected();
    sqlx::query("DELETE FROM runs WHERE user_id = $1")
        .bind(user_id)
        .execute(pool)
        .await?;
    Ok(removed)
}
