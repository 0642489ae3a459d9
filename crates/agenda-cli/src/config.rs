//! Configuration loading and management.

use std::fmt;
use std::path::{Path, PathBuf};

use agenda_core::{AgendaConfig, PluralTemplates, ResolverConfig};
use figment::Figment;
use figment::providers::{Env, Format, Serialized, Toml};
use serde::{Deserialize, Serialize};

/// Application configuration.
#[derive(Clone, Serialize, Deserialize)]
pub struct Config {
    /// Path to the database file.
    pub database_path: PathBuf,

    /// Whether the attendee is at the venue. Breaks are hidden otherwise.
    pub attendee_at_venue: bool,

    /// Count only live streamed sessions when filling free blocks.
    pub live_streamed_only: bool,

    /// Flag overlapping sessions in the agenda.
    pub check_conflicts: bool,

    /// Free block subtitle for exactly one session (`{count}` is replaced).
    pub subtitle_one: String,

    /// Free block subtitle for any other count.
    pub subtitle_other: String,
}

impl fmt::Debug for Config {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Config")
            .field("database_path", &self.database_path)
            .field("attendee_at_venue", &self.attendee_at_venue)
            .field("live_streamed_only", &self.live_streamed_only)
            .field("check_conflicts", &self.check_conflicts)
            .finish_non_exhaustive()
    }
}

impl Default for Config {
    fn default() -> Self {
        let data_dir = dirs_data_path().unwrap_or_else(|| PathBuf::from("."));
        let templates = PluralTemplates::default();
        Self {
            database_path: data_dir.join("agenda.db"),
            attendee_at_venue: true,
            live_streamed_only: false,
            check_conflicts: true,
            subtitle_one: templates.one,
            subtitle_other: templates.other,
        }
    }
}

impl Config {
    /// Loads configuration, optionally from a specific file.
    ///
    /// Later sources win: defaults, then `config.toml` in the platform config
    /// directory, then `config_path`, then `AGENDA_*` environment variables.
    #[expect(
        clippy::result_large_err,
        reason = "figment::Error is large but only returned at startup"
    )]
    pub fn load_from(config_path: Option<&Path>) -> Result<Self, figment::Error> {
        let mut figment = Figment::from(Serialized::defaults(Self::default()));

        // Load from default config location
        if let Some(config_dir) = dirs_config_path() {
            figment = figment.merge(Toml::file(config_dir.join("config.toml")));
        }

        // Load from specified config file
        if let Some(path) = config_path {
            figment = figment.merge(Toml::file(path));
        }

        // Load from environment variables (AGENDA_*)
        figment = figment.merge(Env::prefixed("AGENDA_"));

        figment.extract()
    }

    /// Builds the pipeline configuration from user settings.
    pub fn agenda_config(&self) -> AgendaConfig {
        AgendaConfig {
            resolver: ResolverConfig {
                check_conflicts: self.check_conflicts,
                ..ResolverConfig::default()
            },
            attendee_at_venue: self.attendee_at_venue,
            live_streamed_only: self.live_streamed_only,
            subtitles: PluralTemplates {
                one: self.subtitle_one.clone(),
                other: self.subtitle_other.clone(),
            },
        }
    }
}

/// Returns the platform-specific config directory for agenda.
fn dirs_config_path() -> Option<PathBuf> {
    dirs::config_dir().map(|p| p.join("agenda"))
}

/// Returns the platform-specific data directory for agenda.
///
/// On Linux: `~/.local/share/agenda`
pub fn dirs_data_path() -> Option<PathBuf> {
    dirs::data_dir().map(|p| p.join("agenda"))
}
