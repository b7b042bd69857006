use std::net::SocketAddr;
use std::path::PathBuf;

use thiserror::Error;

/// Placeholder JWT secrets that MUST NOT be used.
const PLACEHOLDER_SECRETS: &[&str] = &[
    "change-me",
    "change-me-to-a-random-string",
    "dev-secret-change-me",
    "secret",
];

#[derive(Debug, Error, PartialEq)]
pub enum ConfigError {
    #[error("SCHOLARIFY_JWT_SECRET is unset or still a placeholder")]
    MissingSecret,

    #[error("{name} has invalid value '{value}'")]
    Invalid { name: &'static str, value: String },
}

#[derive(Debug, Clone)]
pub struct Config {
    pub jwt_secret: String,
    pub db_path: PathBuf,
    pub host: String,
    pub port: u16,
    pub media_dir: PathBuf,
    pub token_ttl_days: i64,
    pub staff_users: Vec<String>,
    pub sweep_interval_secs: u64,
}

impl Config {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Builds the config from any variable source.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let var = |name: &str, default: &str| lookup(name).unwrap_or_else(|| default.to_string());

        let jwt_secret = lookup("SCHOLARIFY_JWT_SECRET").unwrap_or_default();
        if jwt_secret.trim().is_empty() || PLACEHOLDER_SECRETS.contains(&jwt_secret.as_str()) {
            return Err(ConfigError::MissingSecret);
        }

        let staff_users = var("SCHOLARIFY_STAFF_USERS", "")
            .split(',')
            .map(str::trim)
            .filter(|u| !u.is_empty())
            .map(str::to_string)
            .collect();

        let token_ttl_days: i64 = parse("SCHOLARIFY_TOKEN_TTL_DAYS", &var("SCHOLARIFY_TOKEN_TTL_DAYS", "30"))?;
        if token_ttl_days <= 0 {
            return Err(ConfigError::Invalid {
                name: "SCHOLARIFY_TOKEN_TTL_DAYS",
                value: token_ttl_days.to_string(),
            });
        }
        let sweep_interval_secs: u64 =
            parse("SCHOLARIFY_SWEEP_INTERVAL_SECS", &var("SCHOLARIFY_SWEEP_INTERVAL_SECS", "3600"))?;
        if sweep_interval_secs == 0 {
            return Err(ConfigError::Invalid {
                name: "SCHOLARIFY_SWEEP_INTERVAL_SECS",
                value: "0".into(),
            });
        }

        Ok(Self {
            jwt_secret,
            db_path: var("SCHOLARIFY_DB_PATH", "scholarify.db").into(),
            host: var("SCHOLARIFY_HOST", "0.0.0.0"),
            port: parse("SCHOLARIFY_PORT", &var("SCHOLARIFY_PORT", "8000"))?,
            media_dir: var("SCHOLARIFY_MEDIA_DIR", "./media").into(),
            token_ttl_days,
            staff_users,
            sweep_interval_secs,
        })
    }

    pub fn addr(&self) -> Result<SocketAddr, ConfigError> {
        let raw = format!("{}:{}", self.host, self.port);
        raw.parse().map_err(|_| ConfigError::Invalid {
            name: "SCHOLARIFY_HOST",
            value: self.host.clone(),
        })
    }
}

fn parse<T: std::str::FromStr>(name: &'static str, value: &str) -> Result<T, ConfigError> {
    value.trim().parse().map_err(|_| ConfigError::Invalid {
        name,
        value: value.to_string(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn config(vars: &[(&str, &str)]) -> Result<Config, ConfigError> {
        let map: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        Config::from_lookup(|name| map.get(name).cloned())
    }

    #[test]
    fn defaults_apply_when_only_secret_is_set() {
        let cfg = config(&[("SCHOLARIFY_JWT_SECRET", "a-real-secret")]).unwrap();
        assert_eq!(cfg.db_path, PathBuf::from("scholarify.db"));
        assert_eq!(cfg.port, 8000);
        assert_eq!(cfg.media_dir, PathBuf::from("./media"));
        assert_eq!(cfg.token_ttl_days, 30);
        assert_eq!(cfg.sweep_interval_secs, 3600);
        assert!(cfg.staff_users.is_empty());
        assert_eq!(cfg.addr().unwrap().port(), 8000);
    }

    #[test]
    fn placeholder_or_missing_secret_is_rejected() {
        assert_eq!(config(&[]).unwrap_err(), ConfigError::MissingSecret);
        assert_eq!(
            config(&[("SCHOLARIFY_JWT_SECRET", "dev-secret-change-me")]).unwrap_err(),
            ConfigError::MissingSecret
        );
    }

    #[test]
    fn invalid_numbers_are_errors() {
        let err = config(&[("SCHOLARIFY_JWT_SECRET", "s3"), ("SCHOLARIFY_PORT", "eighty")]).unwrap_err();
        assert!(matches!(err, ConfigError::Invalid { name: "SCHOLARIFY_PORT", .. }));
        let err = config(&[("SCHOLARIFY_JWT_SECRET", "s3"), ("SCHOLARIFY_TOKEN_TTL_DAYS", "0")]).unwrap_err();
        assert!(matches!(err, ConfigError::Invalid { name: "SCHOLARIFY_TOKEN_TTL_DAYS", .. }));
    }

    #[test]
    fn staff_users_are_split_and_trimmed() {
        let cfg = config(&[
            ("SCHOLARIFY_JWT_SECRET", "s3"),
            ("SCHOLARIFY_STAFF_USERS", " alice, ,bob "),
        ])
        .unwrap();
        assert_eq!(cfg.staff_users, vec!["alice", "bob"]);
    }
}
