use std::env;
use std::str::FromStr;

use dotenvy::dotenv;

#[derive(Clone, Debug)]
pub struct Config {
    pub database_url: String,
    pub jwt_secret: String,
    pub server_addr: String,
    pub api_prefix: String,

    // Rate limiting
    pub rate_protected_per_min: u32,
    pub rate_preview_per_min: u32,

    // Monthly summary cache
    pub summary_cache_capacity: u64,
    pub summary_cache_ttl_secs: u64,
    /// How many recent payroll cycles to load into the cache at startup.
    pub summary_warmup_cycles: u32,

    pub log_dir: String,
}

fn var_or<T: FromStr>(key: &str, default: T) -> T {
    match env::var(key) {
        Ok(raw) => raw
            .parse()
            .unwrap_or_else(|_| panic!("{key} must be a valid number, got '{raw}'")),
        Err(_) => default,
    }
}

impl Config {
    pub fn from_env() -> Self {
        dotenv().ok();

        Self {
            server_addr: env::var("SERVER_ADDR").expect("SERVER_ADDR must be set"),
            database_url: env::var("DATABASE_URL").expect("DATABASE_URL must be set"),
            jwt_secret: env::var("JWT_SECRET").expect("JWT_SECRET must be set"),
            api_prefix: env::var("API_PREFIX").unwrap_or_else(|_| "/api".to_string()),

            rate_protected_per_min: var_or("RATE_PROTECTED_PER_MIN", 1000),
            rate_preview_per_min: var_or("RATE_PREVIEW_PER_MIN", 300),

            summary_cache_capacity: var_or("SUMMARY_CACHE_CAPACITY", 100_000),
            summary_cache_ttl_secs: var_or("SUMMARY_CACHE_TTL_SECS", 86_400),
            summary_warmup_cycles: var_or("SUMMARY_WARMUP_CYCLES", 2),

            log_dir: env::var("LOG_DIR").unwrap_or_else(|_| "logs".to_string()),
        }
    }
}
