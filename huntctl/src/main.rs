//! Operator CLI: schema setup, catalog seeding, and per-player resets.

use std::{env, fs, path::PathBuf};

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use serde::Deserialize;

use gatehunt::database::{self, PuzzleInput};
use gatehunt::utils;

#[derive(Parser, Debug)]
#[command(author, version, about)]
struct Args {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Create the schema, plus the welcome catalog if no puzzles exist yet.
    Init,
    /// Bulk-load puzzles and gates from a JSON file.
    Seed { file: PathBuf },
    /// Delete a player's solves and run so they can start over.
    Reset { username: String },
}

#[derive(Deserialize)]
struct SeedFile {
    #[serde(default)]
    puzzles: Vec<SeedPuzzle>,
    #[serde(default)]
    gates: Vec<SeedGate>,
}

fn default_group() -> i32 {
    1
}

#[derive(Deserialize)]
struct SeedPuzzle {
    title: String,
    clue: String,
    answer: String,
    #[serde(default = "default_group")]
    group_index: i32,
    order_index: i32,
    #[serde(default)]
    media_url: String,
    #[serde(default)]
    media_embed_html: String,
    #[serde(default)]
    custom_html: String,
}

#[derive(Deserialize)]
struct SeedGate {
    group_index: i32,
    title: String,
    content_html: String,
    unlock_at: String,
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    let database_url = env::var("DATABASE_URL").context("DATABASE_URL is required")?;
    let pool = database::init_pool(&database_url).await;

    match args.command {
        Command::Init => {
            database::init_db(&pool).await?;
            println!("Schema ready.");
        }
        Command::Seed { file } => {
            let raw = fs::read_to_string(&file)
                .with_context(|| format!("Cannot read {}", file.display()))?;
            let seed: SeedFile =
                serde_json::from_str(&raw).context("Seed file is not valid JSON")?;

            database::init_schema(&pool).await?;
            for puzzle in &seed.puzzles {
                database::create_puzzle(
                    &pool,
                    &PuzzleInput {
                        title: &puzzle.title,
                        clue: &puzzle.clue,
                        answer: &puzzle.answer,
                        group_index: puzzle.group_index,
                        order_index: puzzle.order_index,
                        media_url: &puzzle.media_url,
                        media_embed_html: &puzzle.media_embed_html,
                        custom_html: &puzzle.custom_html,
                    },
                )
                .await?;
            }
            for gate in &seed.gates {
                let unlock_at = utils::parse_unlock_at(&gate.unlock_at).with_context(|| {
                    format!("Gate for group {}: bad unlock_at", gate.group_index)
                })?;
                database::upsert_gate(
                    &pool,
                    gate.group_index,
                    &gate.title,
                    &gate.content_html,
                    unlock_at,
                )
                .await?;
            }
            println!(
                "Seeded {} puzzles and {} gates.",
                seed.puzzles.len(),
                seed.gates.len()
            );
        }
        Command::Reset { username } => {
            let user = database::get_user_by_username(&pool, &username)
                .await?
                .with_context(|| format!("No user named {username}"))?;
            let removed = database::reset_user_progress(&pool, user.id).await?;
            println!("Cleared {removed} solves for {username}.");
        }
    }

    Ok(())
}
