use std::path::PathBuf;

use anyhow::{Result, anyhow};

use crate::notify::DEFAULT_NOTICE_LIMIT;

const APP_DIR: &str = "clubdesk";
const DB_FILE: &str = "clubdesk.sqlite";
const SESSION_FILE: &str = "session.json";
const MIN_NOTICE_LIMIT: usize = 10;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Settings {
    pub db_path: PathBuf,
    pub session_path: PathBuf,
    pub export_dir: PathBuf,
    pub notice_limit: usize,
}

/// Loads `.env.local` then `.env`; missing files are fine.
pub fn load_dotenv() {
    let _ = dotenvy::from_filename(".env.local");
    let _ = dotenvy::from_filename(".env");
}

impl Settings {
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let non_empty = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());
        let data_dir = app_data_dir(&lookup);

        let db_path = match non_empty("CLUBDESK_DB") {
            Some(path) => PathBuf::from(path),
            None => data_dir
                .as_ref()
                .map(|dir| dir.join(DB_FILE))
                .ok_or_else(|| anyhow!("set CLUBDESK_DB or HOME to locate the database"))?,
        };
        let session_path = match non_empty("CLUBDESK_SESSION") {
            Some(path) => PathBuf::from(path),
            None => data_dir
                .as_ref()
                .map(|dir| dir.join(SESSION_FILE))
                .unwrap_or_else(|| PathBuf::from(SESSION_FILE)),
        };
        let export_dir = non_empty("CLUBDESK_EXPORT_DIR")
            .map(PathBuf::from)
            .unwrap_or_else(|| PathBuf::from("."));
        let notice_limit = non_empty("CLUBDESK_NOTICE_LIMIT")
            .and_then(|v| v.trim().parse::<usize>().ok())
            .unwrap_or(DEFAULT_NOTICE_LIMIT)
            .max(MIN_NOTICE_LIMIT);

        Ok(Self {
            db_path,
            session_path,
            export_dir,
            notice_limit,
        })
    }
}

fn app_data_dir(lookup: &impl Fn(&str) -> Option<String>) -> Option<PathBuf> {
    // Prefer XDG data dir.
    if let Some(base) = lookup("XDG_DATA_HOME")
        && !base.trim().is_empty()
    {
        return Some(PathBuf::from(base).join(APP_DIR));
    }
    let home = lookup("HOME")?;
    if home.trim().is_empty() {
        return None;
    }
    Some(
        PathBuf::from(home)
            .join(".local")
            .join("share")
            .join(APP_DIR),
    )
}
