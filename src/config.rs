use clap::{ArgAction, Parser, ValueHint};
use dirs_next::home_dir;
use serde::{Deserialize, Serialize};
use std::{
    fs,
    path::{Path, PathBuf},
};
use thiserror::Error;

use crate::fetch::FailurePolicy;

/// Error type for config loading/validation.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("YAML parse error: {0}")]
    Yaml(#[from] serde_yaml::Error),
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
    #[error("Validation error: {0}")]
    Validation(String),
}

const DEFAULT_I2C_BUS: &str = "/dev/i2c-1";
const DEFAULT_OWM_URL: &str = "https://api.openweathermap.org/data/2.5/weather";
// Whitley Bay; the original deployment's home
const DEFAULT_CITY_ID: u32 = 2634032;
const DEFAULT_LATITUDE: f64 = 55.03973;
const DEFAULT_LONGITUDE: f64 = -1.44713;
const DEFAULT_POLLEN_URL: &str =
    "https://www.metoffice.gov.uk/weather/warnings-and-advice/seasonal-advice/pollen-forecast";
const DEFAULT_REGION: &str = "ne";
const DEFAULT_WEATHER_INTERVAL_SECS: u64 = 600;
const DEFAULT_POLLEN_INTERVAL_SECS: u64 = 3600;
const DEFAULT_DWELL_SECS: u64 = 3;
const DEFAULT_SCROLL_TICK_MS: u64 = 50;
const DEFAULT_BRIGHTNESS: u8 = 128;
const DEFAULT_ROTATE_DEG: u16 = 180;

/// File-level configuration. All fields are Options so YAML and CLI can be
/// layered over the defaults, Option-by-Option.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct Config {
    pub log_level: Option<String>,
    pub i2c_bus: Option<String>,
    pub weather: Option<WeatherConfig>,
    pub pollen: Option<PollenConfig>,
    pub display: Option<DisplayConfig>,
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct WeatherConfig {
    pub base_url: Option<String>,
    pub api_key: Option<String>,
    pub city_id: Option<u32>,
    pub latitude: Option<f64>,
    pub longitude: Option<f64>,
    pub interval_secs: Option<u64>,
    pub on_failure: Option<FailurePolicy>,
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct PollenConfig {
    pub url: Option<String>,
    pub region: Option<String>,
    pub interval_secs: Option<u64>,
    pub on_failure: Option<FailurePolicy>,
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct DisplayConfig {
    pub brightness: Option<u8>,
    pub rotate_deg: Option<u16>,
    pub dwell_secs: Option<u64>,
    pub scroll_tick_ms: Option<u64>,
}

/// CLI overrides. Highest precedence in the merge.
#[derive(Debug, Parser, Clone)]
#[command(name = "databot", about = "Pressure, temperature and pollen on a Scroll pHAT HD")]
pub struct Cli {
    /// Path to a YAML config file (overrides search)
    #[arg(long, value_hint = ValueHint::FilePath)]
    pub config: Option<PathBuf>,
    /// Enable debug log level
    #[arg(short = 'v', long, alias = "verbose", action = ArgAction::SetTrue)]
    pub debug: bool,
    #[arg(long)]
    pub log_level: Option<String>,
    /// I2C bus device path for the hat (e.g., /dev/i2c-1)
    #[arg(long)]
    pub i2c_bus: Option<String>,
    /// OpenWeatherMap API key
    #[arg(long)]
    pub api_key: Option<String>,
    /// OpenWeatherMap city id
    #[arg(long)]
    pub city_id: Option<u32>,
    /// Pollen forecast region id (e.g., "ne")
    #[arg(long)]
    pub region: Option<String>,
    #[arg(long)]
    pub weather_interval_secs: Option<u64>,
    #[arg(long)]
    pub pollen_interval_secs: Option<u64>,
    /// What the weather cache shows after a failed fetch
    #[arg(long, value_enum)]
    pub weather_on_failure: Option<FailurePolicy>,
    /// What the pollen cache shows after a failed scrape
    #[arg(long, value_enum)]
    pub pollen_on_failure: Option<FailurePolicy>,
    #[arg(long)]
    pub dwell_secs: Option<u64>,
    #[arg(long)]
    pub brightness: Option<u8>,
    #[arg(long)]
    pub rotate_deg: Option<u16>,
    /// dump fully merged config (after overrides) and exit
    #[arg(long, action = ArgAction::SetTrue)]
    pub dump_config: bool,
}

/// Fully resolved settings the rest of the program runs on.
#[derive(Debug, Clone)]
pub struct Settings {
    pub log_level: String,
    pub i2c_bus: String,
    pub weather: WeatherSettings,
    pub pollen: PollenSettings,
    pub display: DisplaySettings,
}

#[derive(Debug, Clone)]
pub struct WeatherSettings {
    pub base_url: String,
    pub api_key: String,
    pub city_id: u32,
    // retained for the replaced coordinate-based pollen provider; the OWM
    // city-id query doesn't use them
    #[allow(dead_code)]
    pub latitude: f64,
    #[allow(dead_code)]
    pub longitude: f64,
    pub interval_secs: u64,
    pub on_failure: FailurePolicy,
}

#[derive(Debug, Clone)]
pub struct PollenSettings {
    pub url: String,
    pub region: String,
    pub interval_secs: u64,
    pub on_failure: FailurePolicy,
}

#[derive(Debug, Clone, Copy)]
pub struct DisplaySettings {
    pub brightness: u8,
    pub rotate_deg: u16,
    pub dwell_secs: u64,
    pub scroll_tick_ms: u64,
}

/// Public entry point: parse CLI, read YAML, merge, validate, resolve.
pub fn load() -> Result<Settings, ConfigError> {
    let cli = Cli::parse();

    // 1) defaults (from `Default` impl)
    let mut cfg = Config::default();

    // 2) YAML file (explicit path or search)
    if let Some(p) = cli.config.as_ref() {
        if p.exists() {
            let y = read_yaml(p)?;
            merge(&mut cfg, y);
        } else {
            return Err(ConfigError::Validation(format!(
                "Config file not found: {}",
                p.display()
            )));
        }
    } else if let Some(p) = find_config_file() {
        let y = read_yaml(&p)?;
        merge(&mut cfg, y);
    }

    // 3) CLI overrides (highest precedence)
    apply_cli_overrides(&mut cfg, &cli);

    if cli.dump_config {
        let s = serde_yaml::to_string(&cfg)?;
        println!("{s}");
        std::process::exit(0);
    }

    // 4) Resolve against defaults and validate
    let settings = resolve(&cfg, cli.debug);
    validate(&settings)?;
    Ok(settings)
}

/// Try common locations in order (first hit wins).
fn find_config_file() -> Option<PathBuf> {
    if let Some(home) = home_dir() {
        let p = home.join(".config/databot/config.yaml");
        if p.exists() {
            return Some(p);
        }
        let p = home.join(".config/databot.yaml");
        if p.exists() {
            return Some(p);
        }
    }
    for candidate in &["databot.yaml", "config.yaml"] {
        let p = PathBuf::from(candidate);
        if p.exists() {
            return Some(p);
        }
    }
    None
}

fn read_yaml(path: &Path) -> Result<Config, ConfigError> {
    let s = fs::read_to_string(path)?;
    let cfg: Config = serde_yaml::from_str(&s)?;
    Ok(cfg)
}

/// Shallow merge `src` into `dst`, Option-by-Option.
fn merge(dst: &mut Config, src: Config) {
    if src.log_level.is_some() {
        dst.log_level = src.log_level;
    }
    if src.i2c_bus.is_some() {
        dst.i2c_bus = src.i2c_bus;
    }
    match (&mut dst.weather, src.weather) {
        (None, Some(c)) => dst.weather = Some(c),
        (Some(d), Some(s)) => merge_weather(d, s),
        _ => {}
    }
    match (&mut dst.pollen, src.pollen) {
        (None, Some(c)) => dst.pollen = Some(c),
        (Some(d), Some(s)) => merge_pollen(d, s),
        _ => {}
    }
    match (&mut dst.display, src.display) {
        (None, Some(c)) => dst.display = Some(c),
        (Some(d), Some(s)) => merge_display(d, s),
        _ => {}
    }
}

fn merge_weather(dst: &mut WeatherConfig, src: WeatherConfig) {
    if src.base_url.is_some() {
        dst.base_url = src.base_url;
    }
    if src.api_key.is_some() {
        dst.api_key = src.api_key;
    }
    if src.city_id.is_some() {
        dst.city_id = src.city_id;
    }
    if src.latitude.is_some() {
        dst.latitude = src.latitude;
    }
    if src.longitude.is_some() {
        dst.longitude = src.longitude;
    }
    if src.interval_secs.is_some() {
        dst.interval_secs = src.interval_secs;
    }
    if src.on_failure.is_some() {
        dst.on_failure = src.on_failure;
    }
}

fn merge_pollen(dst: &mut PollenConfig, src: PollenConfig) {
    if src.url.is_some() {
        dst.url = src.url;
    }
    if src.region.is_some() {
        dst.region = src.region;
    }
    if src.interval_secs.is_some() {
        dst.interval_secs = src.interval_secs;
    }
    if src.on_failure.is_some() {
        dst.on_failure = src.on_failure;
    }
}

fn merge_display(dst: &mut DisplayConfig, src: DisplayConfig) {
    if src.brightness.is_some() {
        dst.brightness = src.brightness;
    }
    if src.rotate_deg.is_some() {
        dst.rotate_deg = src.rotate_deg;
    }
    if src.dwell_secs.is_some() {
        dst.dwell_secs = src.dwell_secs;
    }
    if src.scroll_tick_ms.is_some() {
        dst.scroll_tick_ms = src.scroll_tick_ms;
    }
}

fn apply_cli_overrides(cfg: &mut Config, cli: &Cli) {
    if cli.log_level.is_some() {
        cfg.log_level = cli.log_level.clone();
    }
    if cli.i2c_bus.is_some() {
        cfg.i2c_bus = cli.i2c_bus.clone();
    }

    if cli.api_key.is_some()
        || cli.city_id.is_some()
        || cli.weather_interval_secs.is_some()
        || cli.weather_on_failure.is_some()
    {
        let weather = cfg.weather.get_or_insert_with(WeatherConfig::default);
        if cli.api_key.is_some() {
            weather.api_key = cli.api_key.clone();
        }
        if cli.city_id.is_some() {
            weather.city_id = cli.city_id;
        }
        if cli.weather_interval_secs.is_some() {
            weather.interval_secs = cli.weather_interval_secs;
        }
        if cli.weather_on_failure.is_some() {
            weather.on_failure = cli.weather_on_failure;
        }
    }

    if cli.region.is_some() || cli.pollen_interval_secs.is_some() || cli.pollen_on_failure.is_some()
    {
        let pollen = cfg.pollen.get_or_insert_with(PollenConfig::default);
        if cli.region.is_some() {
            pollen.region = cli.region.clone();
        }
        if cli.pollen_interval_secs.is_some() {
            pollen.interval_secs = cli.pollen_interval_secs;
        }
        if cli.pollen_on_failure.is_some() {
            pollen.on_failure = cli.pollen_on_failure;
        }
    }

    if cli.brightness.is_some() || cli.rotate_deg.is_some() || cli.dwell_secs.is_some() {
        let display = cfg.display.get_or_insert_with(DisplayConfig::default);
        if cli.brightness.is_some() {
            display.brightness = cli.brightness;
        }
        if cli.rotate_deg.is_some() {
            display.rotate_deg = cli.rotate_deg;
        }
        if cli.dwell_secs.is_some() {
            display.dwell_secs = cli.dwell_secs;
        }
    }
}

fn resolve(cfg: &Config, debug: bool) -> Settings {
    let weather = cfg.weather.clone().unwrap_or_default();
    let pollen = cfg.pollen.clone().unwrap_or_default();
    let display = cfg.display.clone().unwrap_or_default();

    let log_level = cfg
        .log_level
        .clone()
        .unwrap_or_else(|| if debug { "debug" } else { "info" }.to_string());

    Settings {
        log_level,
        i2c_bus: cfg.i2c_bus.clone().unwrap_or_else(|| DEFAULT_I2C_BUS.to_string()),
        weather: WeatherSettings {
            base_url: weather.base_url.unwrap_or_else(|| DEFAULT_OWM_URL.to_string()),
            api_key: weather.api_key.unwrap_or_default(),
            city_id: weather.city_id.unwrap_or(DEFAULT_CITY_ID),
            latitude: weather.latitude.unwrap_or(DEFAULT_LATITUDE),
            longitude: weather.longitude.unwrap_or(DEFAULT_LONGITUDE),
            interval_secs: weather.interval_secs.unwrap_or(DEFAULT_WEATHER_INTERVAL_SECS),
            on_failure: weather.on_failure.unwrap_or(FailurePolicy::HoldLast),
        },
        pollen: PollenSettings {
            url: pollen.url.unwrap_or_else(|| DEFAULT_POLLEN_URL.to_string()),
            region: pollen.region.unwrap_or_else(|| DEFAULT_REGION.to_string()),
            interval_secs: pollen.interval_secs.unwrap_or(DEFAULT_POLLEN_INTERVAL_SECS),
            on_failure: pollen.on_failure.unwrap_or(FailurePolicy::ShowError),
        },
        display: DisplaySettings {
            brightness: display.brightness.unwrap_or(DEFAULT_BRIGHTNESS),
            rotate_deg: display.rotate_deg.unwrap_or(DEFAULT_ROTATE_DEG),
            dwell_secs: display.dwell_secs.unwrap_or(DEFAULT_DWELL_SECS),
            scroll_tick_ms: display.scroll_tick_ms.unwrap_or(DEFAULT_SCROLL_TICK_MS),
        },
    }
}

/// Put any invariants here (required fields, ranges, etc.)
fn validate(settings: &Settings) -> Result<(), ConfigError> {
    if settings.weather.api_key.is_empty() {
        return Err(ConfigError::Validation(
            "weather api_key is required (config file or --api-key)".into(),
        ));
    }
    match settings.display.rotate_deg {
        0 | 180 => {}
        other => {
            return Err(ConfigError::Validation(format!(
                "display rotate_deg must be 0|180, got {other}"
            )));
        }
    }
    if settings.weather.interval_secs == 0 || settings.pollen.interval_secs == 0 {
        return Err(ConfigError::Validation("refresh intervals must be > 0".into()));
    }
    if settings.display.dwell_secs == 0 {
        return Err(ConfigError::Validation("display dwell_secs must be > 0".into()));
    }
    if settings.display.scroll_tick_ms == 0 {
        return Err(ConfigError::Validation("display scroll_tick_ms must be > 0".into()));
    }
    // the region id lands inside a CSS selector, so keep it tame
    if settings.pollen.region.is_empty()
        || !settings
            .pollen
            .region
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_')
    {
        return Err(ConfigError::Validation(format!(
            "pollen region must be alphanumeric, got '{}'",
            settings.pollen.region
        )));
    }
    Ok(())
}
