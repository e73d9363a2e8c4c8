//! Env-driven configuration for the service, the CLI and the library.
//!
//! Values are read from the process environment; `dotenv` is loaded on demand
//! by the binaries. Every value has a default so a bare checkout runs, but the
//! upstream credentials must be supplied for real generations.
use std::env;
use std::str::FromStr;
use std::time::Duration;

pub const DEFAULT_UPSTREAM_URL: &str = "https://oi-server.onrender.com/chat/completions";
pub const DEFAULT_MODEL: &str = "replicate/black-forest-labs/flux-1.1-pro";
pub const DEFAULT_TIMEOUT_SECS: u64 = 300;
pub const DEFAULT_HISTORY_CAP: usize = 50;
pub const DEFAULT_SYSTEM_PROMPT: &str = "You are an AI image generation assistant. Create detailed, high-quality images based on user prompts. Focus on artistic composition, proper lighting, and visual appeal. Interpret prompts creatively while maintaining the core requested elements. Generate images that are visually striking and professionally composed.";

#[derive(Debug, Clone)]
pub struct Config {
    pub upstream_url: String,
    pub upstream_api_key: String,
    pub upstream_customer_id: String,
    pub upstream_model: String,
    pub upstream_timeout: Duration,
    pub system_prompt: String,
    pub history_dir: String,
    pub history_cap: usize,
    pub prompt_min_length: usize,
    pub api_host: String,
    pub api_port: String,
}

impl Default for Config {
    fn default() -> Self {
        Config {
            upstream_url: DEFAULT_UPSTREAM_URL.to_string(),
            upstream_api_key: String::new(),
            upstream_customer_id: String::new(),
            upstream_model: DEFAULT_MODEL.to_string(),
            upstream_timeout: Duration::from_secs(DEFAULT_TIMEOUT_SECS),
            system_prompt: DEFAULT_SYSTEM_PROMPT.to_string(),
            history_dir: "./data".to_string(),
            history_cap: DEFAULT_HISTORY_CAP,
            prompt_min_length: 3,
            api_host: "127.0.0.1".to_string(),
            api_port: "8189".to_string(),
        }
    }
}

impl Config {
    pub fn dotenv_load() {
        dotenv::dotenv().ok();
    }

    pub fn new() -> Result<Self, env::VarError> {
        let d = Config::default();
        let config = Config {
            upstream_url: env::var("UPSTREAM_URL").unwrap_or(d.upstream_url),
            upstream_api_key: env::var("UPSTREAM_API_KEY").unwrap_or(d.upstream_api_key),
            upstream_customer_id: env::var("UPSTREAM_CUSTOMER_ID").unwrap_or(d.upstream_customer_id),
            upstream_model: env::var("UPSTREAM_MODEL").unwrap_or(d.upstream_model),
            upstream_timeout: Duration::from_secs(parse_or("UPSTREAM_TIMEOUT_SECS", DEFAULT_TIMEOUT_SECS)),
            system_prompt: env::var("SYSTEM_PROMPT").unwrap_or(d.system_prompt),
            history_dir: env::var("HISTORY_DIR").unwrap_or(d.history_dir),
            history_cap: parse_or("HISTORY_CAP", d.history_cap),
            prompt_min_length: parse_or("PROMPT_MIN_LENGTH", d.prompt_min_length),
            api_host: env::var("API_HOST").unwrap_or(d.api_host),
            api_port: env::var("API_PORT").unwrap_or(d.api_port),
        };
        if config.upstream_api_key.is_empty() {
            tracing::warn!("UPSTREAM_API_KEY is not set; upstream calls will likely fail with 401");
        }
        Ok(config)
    }

    pub fn print_env_vars() {
        for key in [
            "UPSTREAM_URL",
            "UPSTREAM_CUSTOMER_ID",
            "UPSTREAM_MODEL",
            "UPSTREAM_TIMEOUT_SECS",
            "HISTORY_DIR",
            "HISTORY_CAP",
            "PROMPT_MIN_LENGTH",
            "API_HOST",
            "API_PORT",
        ] {
            println!("{}: {}", key, env::var(key).unwrap_or_else(|_| "<unset>".to_string()));
        }
        let key_state = if env::var("UPSTREAM_API_KEY").map(|k| !k.is_empty()).unwrap_or(false) {
            "<set>"
        } else {
            "<unset>"
        };
        println!("UPSTREAM_API_KEY: {}", key_state);
    }
}

fn parse_or<T: FromStr + std::fmt::Display + Copy>(key: &str, default: T) -> T {
    match env::var(key) {
        Ok(raw) => raw.trim().parse().unwrap_or_else(|_| {
            tracing::warn!("Invalid {} '{}', falling back to {}", key, raw, default);
            default
        }),
        Err(_) => default,
    }
}
