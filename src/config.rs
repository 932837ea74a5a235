//! Application-level configuration loading: stage binding, overlay parameters and store selection.

use std::{env, fs, io::ErrorKind, path::PathBuf};

use reqwest::Url;
use serde::{Deserialize, Serialize};
use tracing::{info, warn};
use utoipa::ToSchema;

use crate::{
    clock::ClockStyle,
    overlay::{OverlaySettings, Side},
};

/// Default location on disk where the binaries look for the JSON configuration.
const DEFAULT_CONFIG_PATH: &str = "config/scoreboard.json";
/// Environment variable that overrides [`DEFAULT_CONFIG_PATH`].
const CONFIG_PATH_ENV: &str = "SCOREBOARD_CONFIG_PATH";
/// Query string selecting the overlay parameters, e.g. `stage=2&cards=solo`.
const PARAMS_ENV: &str = "SCOREBOARD_PARAMS";
/// Store backend selector (`supabase` or `memory`).
const STORE_ENV: &str = "SCOREBOARD_STORE";
/// Shared secret the control surface requires in `X-Control-Token` when set.
const CONTROL_TOKEN_ENV: &str = "CONTROL_TOKEN";

const DEFAULT_STARTING_LIFE_POINTS: i64 = 8000;
const DEFAULT_NAME_MAX_WIDTH: u32 = 288;

/// How the card highlight area is laid out.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum CardsMode {
    /// Card area next to the player panels.
    #[default]
    Shown,
    /// No card area; highlight and flip columns are ignored.
    Hidden,
    /// Only the card area is rendered.
    Solo,
}

/// Load-time parameters of one overlay instance.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct OverlayParams {
    /// Stage number, at least 1.
    pub stage: u32,
    /// Card area layout.
    pub cards: CardsMode,
    /// Countdown rendering style.
    pub clock: ClockStyle,
}

impl Default for OverlayParams {
    fn default() -> Self {
        Self {
            stage: 1,
            cards: CardsMode::Shown,
            clock: ClockStyle::MinutesOnly,
        }
    }
}

impl OverlayParams {
    /// Parse a `stage=..&cards=..&clock=..` query string.
    ///
    /// Missing or invalid values fall back to their defaults; the stage is at
    /// least 1.
    pub fn from_query(query: &str) -> Self {
        let mut params = Self::default();
        let query = query.trim().trim_start_matches('?');
        let Ok(url) = Url::parse(&format!("http://overlay.local/?{query}")) else {
            return params;
        };

        for (key, value) in url.query_pairs() {
            let value = value.trim().to_ascii_lowercase();
            match key.as_ref() {
                "stage" => {
                    params.stage = value
                        .parse::<i64>()
                        .map_or(1, |stage| stage.clamp(1, i64::from(u32::MAX)) as u32);
                }
                "cards" => {
                    params.cards = match value.as_str() {
                        "hidden" | "off" | "false" | "0" => CardsMode::Hidden,
                        "solo" => CardsMode::Solo,
                        _ => CardsMode::Shown,
                    };
                }
                "clock" => {
                    params.clock = match value.as_str() {
                        "hours" | "hour" | "hms" => ClockStyle::HourAware,
                        _ => ClockStyle::MinutesOnly,
                    };
                }
                _ => {}
            }
        }
        params
    }
}

/// Table and row ids one overlay reads and the control surface writes.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, ToSchema)]
pub struct StageBinding {
    /// Table name.
    pub table: String,
    /// Left row first.
    pub row_ids: [i64; 2],
}

impl StageBinding {
    /// `Stage{n}Scoreboard` with rows `2n-1` and `2n`.
    pub fn for_stage(stage: u32) -> Self {
        let stage = i64::from(stage.max(1));
        Self {
            table: format!("Stage{stage}Scoreboard"),
            row_ids: [2 * stage - 1, 2 * stage],
        }
    }

    /// Row id written for `side`.
    pub fn row_id(&self, side: Side) -> i64 {
        match side {
            Side::Left => self.row_ids[0],
            Side::Right => self.row_ids[1],
        }
    }
}

/// Which row store implementation the binaries connect to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StoreKind {
    /// Hosted Supabase project.
    Supabase,
    /// In-process rows, not shared between processes.
    Memory,
}

impl Default for StoreKind {
    fn default() -> Self {
        if cfg!(feature = "supabase-store") {
            StoreKind::Supabase
        } else {
            StoreKind::Memory
        }
    }
}

impl StoreKind {
    fn parse(value: &str) -> Option<Self> {
        match value.trim().to_ascii_lowercase().as_str() {
            "supabase" => Some(StoreKind::Supabase),
            "memory" | "mem" => Some(StoreKind::Memory),
            _ => None,
        }
    }
}

#[derive(Debug, Clone)]
/// Immutable runtime configuration shared across the application.
pub struct AppConfig {
    /// Overlay load-time parameters.
    pub params: OverlayParams,
    /// Stage table and rows derived from `params.stage`.
    pub binding: StageBinding,
    /// Life points used for resets and empty inputs.
    pub starting_life_points: i64,
    /// Width budget for player names, in pixels.
    pub name_max_width: u32,
    /// Row store backend.
    pub store: StoreKind,
    /// Required `X-Control-Token` value; `None` leaves the control routes open.
    pub control_token: Option<String>,
}

impl AppConfig {
    /// Load the configuration from disk and the environment, falling back to built-in defaults.
    pub fn load() -> Self {
        let path = resolve_config_path();
        let raw = match fs::read_to_string(&path) {
            Ok(contents) => match serde_json::from_str::<RawConfig>(&contents) {
                Ok(raw) => {
                    info!(path = %path.display(), "loaded scoreboard config");
                    raw
                }
                Err(err) => {
                    warn!(
                        path = %path.display(),
                        error = %err,
                        "failed to parse config; falling back to defaults"
                    );
                    RawConfig::default()
                }
            },
            Err(err) if err.kind() == ErrorKind::NotFound => {
                info!(
                    path = %path.display(),
                    "config file not found; using built-in defaults"
                );
                RawConfig::default()
            }
            Err(err) => {
                warn!(
                    path = %path.display(),
                    error = %err,
                    "failed to read config; falling back to defaults"
                );
                RawConfig::default()
            }
        };

        let mut config = Self::from_raw(raw, env::var(PARAMS_ENV).ok(), env::var(STORE_ENV).ok());
        config.control_token = env::var(CONTROL_TOKEN_ENV)
            .ok()
            .filter(|token| !token.trim().is_empty());
        config
    }

    fn from_raw(raw: RawConfig, params_env: Option<String>, store_env: Option<String>) -> Self {
        let query = params_env
            .filter(|query| !query.trim().is_empty())
            .or(raw.params)
            .unwrap_or_default();
        let params = OverlayParams::from_query(&query);

        let mut binding = StageBinding::for_stage(params.stage);
        if let Some(table) = raw.table.filter(|table| !table.trim().is_empty()) {
            binding.table = table;
        }
        if let Some(row_ids) = raw.row_ids {
            binding.row_ids = row_ids;
        }

        let store = match store_env.as_deref() {
            Some(value) => StoreKind::parse(value).unwrap_or_else(|| {
                warn!(value, "unknown store selector; using configured default");
                raw.store.unwrap_or_default()
            }),
            None => raw.store.unwrap_or_default(),
        };

        Self {
            params,
            binding,
            starting_life_points: raw
                .starting_life_points
                .unwrap_or(DEFAULT_STARTING_LIFE_POINTS),
            name_max_width: raw.name_max_width.unwrap_or(DEFAULT_NAME_MAX_WIDTH),
            store,
            control_token: None,
        }
    }

    /// Presentation settings handed to the overlay engine.
    pub fn overlay_settings(&self) -> OverlaySettings {
        OverlaySettings {
            cards: self.params.cards,
            clock: self.params.clock,
            starting_life_points: self.starting_life_points,
            name_max_width: self.name_max_width,
        }
    }
}

impl Default for AppConfig {
    fn default() -> Self {
        Self::from_raw(RawConfig::default(), None, None)
    }
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
/// JSON representation of the configuration file located at [`DEFAULT_CONFIG_PATH`].
struct RawConfig {
    params: Option<String>,
    table: Option<String>,
    row_ids: Option<[i64; 2]>,
    starting_life_points: Option<i64>,
    name_max_width: Option<u32>,
    store: Option<StoreKind>,
}

/// Resolve the configuration path taking the environment override into account.
fn resolve_config_path() -> PathBuf {
    env::var_os(CONFIG_PATH_ENV)
        .map(PathBuf::from)
        .filter(|path| !path.as_os_str().is_empty())
        .unwrap_or_else(|| PathBuf::from(DEFAULT_CONFIG_PATH))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_overlay_query() {
        let params = OverlayParams::from_query("?stage=2&cards=solo&clock=hours");
        assert_eq!(params.stage, 2);
        assert_eq!(params.cards, CardsMode::Solo);
        assert_eq!(params.clock, ClockStyle::HourAware);
    }

    #[test]
    fn invalid_query_values_fall_back() {
        let params = OverlayParams::from_query("stage=0&cards=OFF&clock=weird");
        assert_eq!(params.stage, 1);
        assert_eq!(params.cards, CardsMode::Hidden);
        assert_eq!(params.clock, ClockStyle::MinutesOnly);

        assert_eq!(OverlayParams::from_query("stage=abc").stage, 1);
        assert_eq!(OverlayParams::from_query(""), OverlayParams::default());
    }

    #[test]
    fn stage_binding_pairs_row_ids() {
        let binding = StageBinding::for_stage(3);
        assert_eq!(binding.table, "Stage3Scoreboard");
        assert_eq!(binding.row_ids, [5, 6]);
        assert_eq!(binding.row_id(Side::Right), 6);
    }

    #[test]
    fn file_values_and_env_overrides_combine() {
        let raw: RawConfig = serde_json::from_str(
            r#"{ "params": "stage=2", "table": "bonus2Scoreboard", "rowIds": [5, 6], "store": "memory" }"#,
        )
        .unwrap();
        let config = AppConfig::from_raw(raw, Some("stage=4&cards=hidden".into()), None);
        assert_eq!(config.params.stage, 4);
        assert_eq!(config.params.cards, CardsMode::Hidden);
        assert_eq!(config.binding.table, "bonus2Scoreboard");
        assert_eq!(config.binding.row_ids, [5, 6]);
        assert_eq!(config.store, StoreKind::Memory);
        assert_eq!(config.starting_life_points, 8000);
    }

    #[test]
    fn store_env_wins_over_file() {
        let config = AppConfig::from_raw(RawConfig::default(), None, Some("memory".into()));
        assert_eq!(config.store, StoreKind::Memory);
    }
}
