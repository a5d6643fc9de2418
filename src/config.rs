use crate::cli::Cli;
use crate::error::BotResult;
use figment::{
    providers::{Env, Format, Serialized, Yaml},
    Figment,
};
use serde::Deserialize;
use std::path::Path;
use std::time::Duration;
use tracing::Level;

const TRACE_LEVELS: [&'static str; 5] = ["TRACE", "DEBUG", "INFO", "WARN", "ERROR"];
const LOCAL_SETTINGS_YAML_FILE: &str = ".env.local.yaml";

// All settings may be configured via environment variables. Example:
// SPEEDRUN_BASE_URL="http://localhost:8080/api/v1" would set speedrun_base_url.
// A local yaml file and the CLI flags are merged on top of the environment.
#[derive(Deserialize, Debug, Clone)]
pub struct Settings {
    #[serde(default = "default_trace_level")]
    pub trace_level: String,
    #[serde(default = "default_speedrun_base_url")]
    pub speedrun_base_url: String,
    #[serde(default = "default_speedrun_api_timeout_sec")]
    pub speedrun_api_timeout_sec: u64,
    #[serde(default = "default_user_agent")]
    pub user_agent: String,
    // Wait applied on a 429 when the server does not send a usable Retry-After
    #[serde(default = "default_retry_after_sec")]
    pub default_retry_after_sec: u64,
    #[serde(default = "default_max_throttle_retries")]
    pub max_throttle_retries: u32,
    #[serde(default = "default_max_transient_retries")]
    pub max_transient_retries: u32,
    // First backoff step for transport errors and 5xx, doubled on each attempt
    #[serde(default = "default_transient_backoff_ms")]
    pub transient_backoff_ms: u64,
    #[serde(default = "default_max_concurrent_requests")]
    pub max_concurrent_requests: usize,
    #[serde(default = "default_max_run_pages")]
    pub max_run_pages: usize,
    #[serde(default = "default_command_timeout_sec")]
    pub command_timeout_sec: u64,
}

impl Default for Settings {
    fn default() -> Self {
        Settings {
            trace_level: default_trace_level(),
            speedrun_base_url: default_speedrun_base_url(),
            speedrun_api_timeout_sec: default_speedrun_api_timeout_sec(),
            user_agent: default_user_agent(),
            default_retry_after_sec: default_retry_after_sec(),
            max_throttle_retries: default_max_throttle_retries(),
            max_transient_retries: default_max_transient_retries(),
            transient_backoff_ms: default_transient_backoff_ms(),
            max_concurrent_requests: default_max_concurrent_requests(),
            max_run_pages: default_max_run_pages(),
            command_timeout_sec: default_command_timeout_sec(),
        }
    }
}

impl Settings {
    pub fn new(cli: &Cli) -> BotResult<Self> {
        let mut figment = Figment::new().merge(Env::raw());
        if Path::new(LOCAL_SETTINGS_YAML_FILE).exists() {
            // Logging is not set up yet, as the trace level comes from these settings.
            eprintln!("Found '{LOCAL_SETTINGS_YAML_FILE}' file, loading local configuration.");
            figment = figment.merge(Yaml::file(LOCAL_SETTINGS_YAML_FILE));
        }
        let settings = figment.merge(Serialized::defaults(cli)).extract()?;
        Ok(settings)
    }

    pub fn get_trace_level(&self) -> Level {
        get_trace_level(&self.trace_level)
    }

    pub fn api_timeout(&self) -> Duration {
        Duration::from_secs(self.speedrun_api_timeout_sec)
    }

    pub fn command_timeout(&self) -> Duration {
        Duration::from_secs(self.command_timeout_sec)
    }
}

fn get_trace_level(level_str: &str) -> Level {
    match level_str.to_uppercase().as_str() {
        level if level == TRACE_LEVELS[0] => Level::TRACE,
        level if level == TRACE_LEVELS[1] => Level::DEBUG,
        level if level == TRACE_LEVELS[2] => Level::INFO,
        level if level == TRACE_LEVELS[3] => Level::WARN,
        level if level == TRACE_LEVELS[4] => Level::ERROR,
        // Default trace level
        _ => Level::INFO,
    }
}

fn default_trace_level() -> String {
    "INFO".to_string()
}

fn default_speedrun_base_url() -> String {
    "https://www.speedrun.com/api/v1".to_string()
}

fn default_speedrun_api_timeout_sec() -> u64 {
    10
}

fn default_user_agent() -> String {
    concat!(env!("CARGO_PKG_NAME"), "/", env!("CARGO_PKG_VERSION")).to_string()
}

fn default_retry_after_sec() -> u64 {
    5
}

fn default_max_throttle_retries() -> u32 {
    10
}

fn default_max_transient_retries() -> u32 {
    3
}

fn default_transient_backoff_ms() -> u64 {
    1000
}

fn default_max_concurrent_requests() -> usize {
    4
}

fn default_max_run_pages() -> usize {
    10
}

fn default_command_timeout_sec() -> u64 {
    300
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn trace_level_is_case_insensitive_with_info_fallback() {
        assert_eq!(get_trace_level("debug"), Level::DEBUG);
        assert_eq!(get_trace_level("WARN"), Level::WARN);
        assert_eq!(get_trace_level("verbose"), Level::INFO);
    }

    #[test]
    fn empty_figment_extracts_defaults() {
        let settings: Settings = Figment::new().extract().unwrap();
        assert_eq!(settings.speedrun_base_url, "https://www.speedrun.com/api/v1");
        assert_eq!(settings.default_retry_after_sec, 5);
        assert_eq!(settings.max_transient_retries, 3);
    }

    #[test]
    fn serialized_values_override_defaults() {
        let settings: Settings = Figment::new()
            .merge(Serialized::defaults(serde_json::json!({
                "speedrun_base_url": "http://127.0.0.1:9999/api/v1",
                "max_throttle_retries": 2,
            })))
            .extract()
            .unwrap();
        assert_eq!(settings.speedrun_base_url, "http://127.0.0.1:9999/api/v1");
        assert_eq!(settings.max_throttle_retries, 2);
        assert_eq!(settings.command_timeout(), Duration::from_secs(300));
    }

    #[test]
    fn local_yaml_and_cli_are_merged_over_environment() {
        use clap::Parser;

        figment::Jail::expect_with(|jail| {
            jail.set_env("MAX_CONCURRENT_REQUESTS", "2");
            jail.set_env("MAX_RUN_PAGES", "7");
            jail.create_file(
                LOCAL_SETTINGS_YAML_FILE,
                "max_run_pages: 3\nspeedrun_base_url: http://yaml.local/api/v1\n",
            )?;

            let cli = Cli::parse_from(["runboard", "--base-url", "http://cli.local/api/v1", "games"]);
            let settings = Settings::new(&cli).map_err(|e| e.to_string())?;

            assert_eq!(settings.max_concurrent_requests, 2);
            assert_eq!(settings.max_run_pages, 3);
            assert_eq!(settings.speedrun_base_url, "http://cli.local/api/v1");
            Ok(())
        });
    }
}
