use std::path::PathBuf;

use anyhow::{Context, Result};
use chrono::{Local, NaiveDate};
use rand::SeedableRng;
use rand::rngs::StdRng;

use clubdesk::config::{self, Settings};
use clubdesk::seed;
use clubdesk::store::Store;

const DEFAULT_ORG: &str = "demo";

fn main() -> Result<()> {
    config::load_dotenv();
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let db_path = match parse_db_path_arg() {
        Some(path) => path,
        None => Settings::from_env()
            .context("unable to resolve sqlite path")?
            .db_path,
    };
    let org_id = parse_value_arg("--org").unwrap_or_else(|| DEFAULT_ORG.to_string());
    let start = parse_value_arg("--start")
        .map(|raw| NaiveDate::parse_from_str(&raw, "%Y-%m-%d"))
        .transpose()
        .context("--start must be YYYY-MM-DD")?
        .unwrap_or_else(|| Local::now().date_naive());
    let mut rng = match parse_value_arg("--seed") {
        Some(raw) => StdRng::seed_from_u64(raw.parse::<u64>().context("--seed must be a number")?),
        None => StdRng::from_entropy(),
    };

    let store = Store::open(&db_path)?;
    let summary = seed::seed_demo(&store, &org_id, start, &mut rng)?;
    store.close()?;

    println!("Demo data seeded");
    println!("DB: {}", db_path.display());
    println!("Organization: {org_id}");
    println!("Players: {}", summary.players);
    println!(
        "Matches: {} (lineups {})",
        summary.matches, summary.lineups
    );
    println!("Evaluations: {}", summary.evaluations);
    println!(
        "Wellness: {}  Physical: {}  Medical: {}",
        summary.wellness, summary.physical, summary.medical
    );
    Ok(())
}

fn parse_db_path_arg() -> Option<PathBuf> {
    parse_value_arg("--db").map(PathBuf::from)
}

fn parse_value_arg(flag: &str) -> Option<String> {
    let args = std::env::args().skip(1).collect::<Vec<_>>();
    let prefix = format!("{flag}=");
    for (idx, arg) in args.iter().enumerate() {
        if let Some(value) = arg.strip_prefix(&prefix) {
            let trimmed = value.trim();
            if !trimmed.is_empty() {
                return Some(trimmed.to_string());
            }
        }
        if arg == flag {
            let Some(next) = args.get(idx + 1) else {
                continue;
            };
            if !next.trim().is_empty() {
                return Some(next.trim().to_string());
            }
        }
    }
    None
}
