use std::env;
use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("invalid value for {key}: {value:?}")]
    Invalid { key: &'static str, value: String },
}

#[derive(Debug, Clone)]
pub struct Config {
    pub server_host: String,
    pub server_port: u16,
    pub trust_proxy: bool,
    pub database: DatabaseConfig,
    pub rate_limit: RateLimitConfig,
}

#[derive(Debug, Clone)]
pub struct DatabaseConfig {
    pub path: PathBuf,
    pub max_connections: u32,
    pub busy_timeout: Duration,
}

/// 令牌桶参数
#[derive(Debug, Clone, PartialEq)]
pub struct RateLimitConfig {
    /// 桶容量
    pub max_tokens: u32,
    /// 每整秒补充的令牌数
    pub refill_rate: f64,
    /// 空闲超过该时长的桶会被清理
    pub idle_ttl: Duration,
    /// 两次清理之间的最短间隔
    pub sweep_interval: Duration,
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            path: PathBuf::from("data/metrics.db"),
            max_connections: 5,
            busy_timeout: Duration::from_millis(5000),
        }
    }
}

impl Default for RateLimitConfig {
    fn default() -> Self {
        Self {
            max_tokens: 10,
            refill_rate: 2.0,
            idle_ttl: Duration::from_secs(60),
            sweep_interval: Duration::from_secs(60),
        }
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            server_host: "0.0.0.0".to_string(),
            server_port: 3001,
            trust_proxy: false,
            database: DatabaseConfig::default(),
            rate_limit: RateLimitConfig::default(),
        }
    }
}

impl RateLimitConfig {
    /// 空桶补满所需的整秒数
    pub fn full_refill_window(&self) -> Duration {
        if self.refill_rate <= 0.0 {
            return Duration::MAX;
        }
        Duration::try_from_secs_f64((self.max_tokens as f64 / self.refill_rate).ceil())
            .unwrap_or(Duration::MAX)
    }

    pub fn validate(self) -> Result<Self, ConfigError> {
        if self.max_tokens < 1 {
            return Err(ConfigError::Invalid {
                key: "RATE_LIMIT_MAX_TOKENS",
                value: self.max_tokens.to_string(),
            });
        }
        if !self.refill_rate.is_finite() || self.refill_rate < 0.0 {
            return Err(ConfigError::Invalid {
                key: "RATE_LIMIT_REFILL_RATE",
                value: self.refill_rate.to_string(),
            });
        }
        Ok(self.clamp_idle_ttl())
    }

    /// 保证空闲清理时长不短于补满窗口
    pub fn clamp_idle_ttl(mut self) -> Self {
        // 清理早于补满窗口会改变限流结果
        let window = self.full_refill_window();
        if self.idle_ttl < window {
            tracing::warn!(
                idle_ttl = ?self.idle_ttl,
                window = ?window,
                "Idle TTL shorter than full refill window, raising it"
            );
            self.idle_ttl = window;
        }
        self
    }
}

impl Config {
    pub fn from_env() -> Result<Self, ConfigError> {
        dotenv::dotenv().ok();
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// 从任意变量来源构建配置，便于测试
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let defaults = Config::default();
        let db = DatabaseConfig::default();
        let rl = RateLimitConfig::default();

        let server_port = match lookup("SERVER_PORT") {
            Some(_) => parse_or(&lookup, "SERVER_PORT", defaults.server_port)?,
            None => parse_or(&lookup, "PORT", defaults.server_port)?,
        };

        let rate_limit = RateLimitConfig {
            max_tokens: parse_or(&lookup, "RATE_LIMIT_MAX_TOKENS", rl.max_tokens)?,
            refill_rate: parse_or(&lookup, "RATE_LIMIT_REFILL_RATE", rl.refill_rate)?,
            idle_ttl: Duration::from_secs(parse_or(
                &lookup,
                "RATE_LIMIT_IDLE_TTL_SECS",
                rl.idle_ttl.as_secs(),
            )?),
            sweep_interval: Duration::from_secs(parse_or(
                &lookup,
                "RATE_LIMIT_SWEEP_INTERVAL_SECS",
                rl.sweep_interval.as_secs(),
            )?),
        }
        .validate()?;

        Ok(Config {
            server_host: lookup("SERVER_HOST").unwrap_or(defaults.server_host),
            server_port,
            trust_proxy: parse_bool(&lookup, "TRUST_PROXY", defaults.trust_proxy)?,
            database: DatabaseConfig {
                path: lookup("DATABASE_PATH").map(PathBuf::from).unwrap_or(db.path),
                max_connections: parse_or(
                    &lookup,
                    "DATABASE_MAX_CONNECTIONS",
                    db.max_connections,
                )?,
                busy_timeout: Duration::from_millis(parse_or(
                    &lookup,
                    "DATABASE_BUSY_TIMEOUT_MS",
                    db.busy_timeout.as_millis() as u64,
                )?),
            },
            rate_limit,
        })
    }
}

fn parse_or<F, T>(lookup: &F, key: &'static str, default: T) -> Result<T, ConfigError>
where
    F: Fn(&str) -> Option<String>,
    T: FromStr,
{
    match lookup(key) {
        None => Ok(default),
        Some(raw) => raw
            .trim()
            .parse()
            .map_err(|_| ConfigError::Invalid { key, value: raw }),
    }
}

fn parse_bool<F>(lookup: &F, key: &'static str, default: bool) -> Result<bool, ConfigError>
where
    F: Fn(&str) -> Option<String>,
{
    match lookup(key) {
        None => Ok(default),
        Some(raw) => match raw.trim().to_ascii_lowercase().as_str() {
            "1" | "true" | "yes" | "on" => Ok(true),
            "0" | "false" | "no" | "off" | "" => Ok(false),
            _ => Err(ConfigError::Invalid { key, value: raw }),
        },
    }
}
