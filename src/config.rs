//! Startup configuration from process arguments.
//!
//! Besides the usual `--mode all`, the legacy spellings `-mode all` and
//! `mode=all` are understood. Tokens that are not recognized are dropped,
//! and a setting with an unusable value keeps its default.

use std::path::PathBuf;

use clap::{Parser, ValueEnum};
use tracing::warn;

use crate::index::{HomePolicy, IndexOptions};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, ValueEnum)]
pub enum QueryMode {
    /// Islands with a campfire.
    #[default]
    Fire,
    /// Islands with any home marker, crab homes included.
    All,
}

impl From<QueryMode> for HomePolicy {
    fn from(mode: QueryMode) -> Self {
        match mode {
            QueryMode::Fire => HomePolicy::Fire,
            QueryMode::All => HomePolicy::AnyDesignatedHome,
        }
    }
}

#[derive(Debug, Parser)]
#[command(name = "deeply-lost")]
#[command(about = "Find home islands in a Stranded Deep save and move the player to one")]
struct StartupArgs {
    /// Which objects make an island a home
    #[arg(long, value_enum, ignore_case = true)]
    mode: Option<QueryMode>,

    /// Added to every axis of the spawn position
    #[arg(long)]
    offset: Option<f32>,

    /// Save file to open (defaults to the remembered one)
    #[arg(long)]
    save: Option<PathBuf>,

    /// Remember --save for the next start
    #[arg(long)]
    remember: bool,

    /// Do not watch the save for external changes
    #[arg(long)]
    no_watch: bool,

    /// Keep aliases in memory only
    #[arg(long)]
    no_prefs: bool,
}

#[derive(Debug, Clone, PartialEq)]
pub struct StartupConfig {
    pub mode: QueryMode,
    pub spawn_offset: f32,
    pub save_path: Option<PathBuf>,
    pub remember: bool,
    pub watch: bool,
    pub use_preferences: bool,
}

impl Default for StartupConfig {
    fn default() -> Self {
        Self {
            mode: QueryMode::Fire,
            spawn_offset: 0.0,
            save_path: None,
            remember: false,
            watch: true,
            use_preferences: true,
        }
    }
}

const VALUE_KEYS: [&str; 3] = ["mode", "offset", "save"];
const FLAG_KEYS: [&str; 3] = ["remember", "no-watch", "no-prefs"];

impl StartupConfig {
    /// Parse the full argument list, program name first.
    ///
    /// Only `--help` produces an error, for the caller to print.
    pub fn from_args<I, T>(args: I) -> Result<Self, clap::Error>
    where
        I: IntoIterator<Item = T>,
        T: Into<String>,
    {
        let args = normalize_args(args.into_iter().map(Into::into));
        let parsed = match StartupArgs::try_parse_from(&args) {
            Ok(parsed) => parsed,
            Err(e) if e.kind() == clap::error::ErrorKind::DisplayHelp => return Err(e),
            Err(e) => {
                warn!(error = %e, "startup_arguments_ignored");
                return Ok(Self::default());
            }
        };

        let defaults = Self::default();
        Ok(Self {
            mode: parsed.mode.unwrap_or(defaults.mode),
            spawn_offset: parsed.offset.unwrap_or(defaults.spawn_offset),
            save_path: parsed.save,
            remember: parsed.remember,
            watch: !parsed.no_watch,
            use_preferences: !parsed.no_prefs,
        })
    }

    pub fn index_options(&self) -> IndexOptions {
        IndexOptions {
            policy: self.mode.into(),
            spawn_offset: self.spawn_offset,
        }
    }
}

/// Rewrite accepted spellings into `--key=value` / `--flag` and drop the rest.
fn normalize_args(mut args: impl Iterator<Item = String>) -> Vec<String> {
    let mut out: Vec<String> = args.next().into_iter().collect();
    if out.is_empty() {
        out.push("deeply-lost".to_string());
    }

    while let Some(token) = args.next() {
        if token == "-h" || token == "--help" {
            out.push(token);
            continue;
        }

        let dashed = token.starts_with('-');
        let trimmed = token.trim_start_matches('-');
        let (key, inline) = match trimmed.split_once('=') {
            Some((key, value)) => (key.replace('_', "-"), Some(value.to_string())),
            None => (trimmed.replace('_', "-"), None),
        };
        if !dashed && inline.is_none() {
            warn!(argument = %token, "unrecognized_argument");
            continue;
        }

        if FLAG_KEYS.contains(&key.as_str()) {
            out.push(format!("--{key}"));
        } else if VALUE_KEYS.contains(&key.as_str()) {
            let value = match inline {
                Some(value) => Some(value),
                None => args.next(),
            };
            match value {
                Some(value) if value_is_valid(&key, &value) => out.push(format!("--{key}={value}")),
                Some(value) => warn!(setting = %key, %value, "invalid_setting_ignored"),
                None => warn!(setting = %key, "setting_without_value"),
            }
        } else {
            warn!(argument = %token, "unrecognized_argument");
        }
    }
    out
}

fn value_is_valid(key: &str, value: &str) -> bool {
    match key {
        "mode" => QueryMode::from_str(value, true).is_ok(),
        "offset" => value.parse::<f32>().is_ok_and(f32::is_finite),
        _ => !value.is_empty(),
    }
}
