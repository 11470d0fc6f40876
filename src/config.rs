use std::env;
use std::str::FromStr;

use anyhow::{Context, Result, anyhow};

#[derive(Clone, Debug)]
pub struct Config {
    pub database_url: String,
    pub jwt_secret: String,
    pub server_addr: String,
    pub access_token_ttl: usize,
    pub refresh_token_ttl: usize,

    // Rate limiting
    pub rate_login_per_min: u32,
    pub rate_register_per_min: u32,
    pub rate_refresh_per_min: u32,
    pub rate_identify_per_min: u32,
    pub rate_protected_per_min: u32,

    pub api_prefix: String,

    /// Maximum accepted embedding distance for a positive identification.
    pub match_threshold: f32,
    pub template_cache_ttl_secs: u64,

    pub db_max_connections: u32,
    pub run_migrations: bool,
    pub log_dir: String,
}

impl Config {
    pub fn from_env() -> Result<Self> {
        dotenvy::dotenv().ok();
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Builds the config from any key lookup; `from_env` passes the process
    /// environment.
    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let required = |key: &str| lookup(key).ok_or_else(|| anyhow!("{key} must be set"));

        fn parsed<T, F>(lookup: &F, key: &str, default: T) -> Result<T>
        where
            T: FromStr,
            T::Err: std::error::Error + Send + Sync + 'static,
            F: Fn(&str) -> Option<String>,
        {
            match lookup(key) {
                Some(raw) => raw
                    .trim()
                    .parse()
                    .with_context(|| format!("{key} has an invalid value '{raw}'")),
                None => Ok(default),
            }
        }

        let config = Self {
            server_addr: required("SERVER_ADDR")?,
            database_url: required("DATABASE_URL")?,
            jwt_secret: required("JWT_SECRET")?,
            access_token_ttl: parsed(&lookup, "ACCESS_TOKEN_TTL", 900)?, // 15 min
            refresh_token_ttl: parsed(&lookup, "REFRESH_TOKEN_TTL", 604_800)?, // 7 days

            rate_login_per_min: parsed(&lookup, "RATE_LOGIN_PER_MIN", 60)?,
            rate_register_per_min: parsed(&lookup, "RATE_REGISTER_PER_MIN", 30)?,
            rate_refresh_per_min: parsed(&lookup, "RATE_REFRESH_PER_MIN", 30)?,
            rate_identify_per_min: parsed(&lookup, "RATE_IDENTIFY_PER_MIN", 120)?,
            rate_protected_per_min: parsed(&lookup, "RATE_PROTECTED_PER_MIN", 1000)?,

            api_prefix: lookup("API_PREFIX").unwrap_or_else(|| "/api".to_string()),

            match_threshold: parsed(&lookup, "MATCH_THRESHOLD", 0.4)?,
            template_cache_ttl_secs: parsed(&lookup, "TEMPLATE_CACHE_TTL_SECS", 300)?,

            db_max_connections: parsed(&lookup, "DB_MAX_CONNECTIONS", 10)?,
            run_migrations: parsed(&lookup, "RUN_MIGRATIONS", false)?,
            log_dir: lookup("LOG_DIR").unwrap_or_else(|| "logs".to_string()),
        };

        if !config.match_threshold.is_finite() || config.match_threshold <= 0.0 {
            return Err(anyhow!(
                "MATCH_THRESHOLD must be a positive number, got {}",
                config.match_threshold
            ));
        }

        Ok(config)
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use std::collections::HashMap;

    /// Minimal valid config for handler tests.
    pub(crate) fn test_config() -> Config {
        Config::from_lookup(lookup_from(&BASE)).unwrap()
    }

    fn lookup_from(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    const BASE: [(&str, &str); 3] = [
        ("SERVER_ADDR", "127.0.0.1:3000"),
        ("DATABASE_URL", "mysql://root@localhost/asistencia"),
        ("JWT_SECRET", "secret"),
    ];

    #[test]
    fn applies_defaults() {
        let config = Config::from_lookup(lookup_from(&BASE)).unwrap();
        assert_eq!(config.access_token_ttl, 900);
        assert_eq!(config.api_prefix, "/api");
        assert!((config.match_threshold - 0.4).abs() < f32::EPSILON);
        assert!(!config.run_migrations);
        assert_eq!(config.log_dir, "logs");
    }

    #[test]
    fn missing_required_key_is_named() {
        let err = Config::from_lookup(lookup_from(&BASE[..2])).unwrap_err();
        assert!(err.to_string().contains("JWT_SECRET"));
    }

    #[test]
    fn overrides_and_bad_values() {
        let mut pairs = BASE.to_vec();
        pairs.push(("MATCH_THRESHOLD", "0.55"));
        pairs.push(("RUN_MIGRATIONS", "true"));
        let config = Config::from_lookup(lookup_from(&pairs)).unwrap();
        assert!((config.match_threshold - 0.55).abs() < f32::EPSILON);
        assert!(config.run_migrations);

        let mut pairs = BASE.to_vec();
        pairs.push(("RATE_LOGIN_PER_MIN", "lots"));
        let err = Config::from_lookup(lookup_from(&pairs)).unwrap_err();
        assert!(err.to_string().contains("RATE_LOGIN_PER_MIN"));

        let mut pairs = BASE.to_vec();
        pairs.push(("MATCH_THRESHOLD", "-1"));
        assert!(Config::from_lookup(lookup_from(&pairs)).is_err());
    }
}
