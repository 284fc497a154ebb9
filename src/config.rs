//! Command-line and environment configuration.
//!
//! Every flag falls back to an environment variable, and that to a built-in
//! default. An environment value that does not parse is ignored in favour of
//! the default; flags given on the command line are validated by clap.

use std::fmt;
use std::str::FromStr;
use std::time::Duration;

use clap::Parser;

/// Service configuration.
#[derive(Debug, Clone, Parser)]
#[command(name = "hello", version, about = "Birthday greeting HTTP service")]
pub struct Config {
    /// API server port [env: APP_PORT]
    #[arg(long, default_value_t = env_or("APP_PORT", 4000))]
    pub port: u16,

    /// Environment (development|staging|production) [env: ENVIRONMENT]
    #[arg(long, default_value_t = env_or("ENVIRONMENT", String::from("development")))]
    pub env: String,

    /// PostgreSQL DSN [env: DB_DSN]
    #[arg(long = "db-dsn", default_value_t = env_or("DB_DSN", String::new()))]
    pub db_dsn: String,

    /// PostgreSQL max open connections [env: DB_MAX_OPEN_CONNS]
    #[arg(long = "db-max-open-conns", default_value_t = env_or("DB_MAX_OPEN_CONNS", 25))]
    pub db_max_open_conns: u32,

    /// PostgreSQL connections kept open while idle [env: DB_MAX_IDLE_CONNS]
    #[arg(long = "db-max-idle-conns", default_value_t = env_or("DB_MAX_IDLE_CONNS", 25))]
    pub db_max_idle_conns: u32,

    /// PostgreSQL max connection idle time, e.g. `15m` [env: DB_MAX_IDLE_TIME]
    #[arg(
        long = "db-max-idle-time",
        default_value_t = env_or("DB_MAX_IDLE_TIME", IdleTime(Duration::from_secs(15 * 60)))
    )]
    pub db_max_idle_time: IdleTime,
}

impl Config {
    pub fn db(&self) -> DbConfig {
        DbConfig {
            dsn: self.db_dsn.clone(),
            max_open_conns: self.db_max_open_conns,
            max_idle_conns: self.db_max_idle_conns,
            max_idle_time: self.db_max_idle_time.0,
        }
    }
}

/// Connection pool settings.
#[derive(Debug, Clone)]
pub struct DbConfig {
    pub dsn: String,
    pub max_open_conns: u32,
    pub max_idle_conns: u32,
    pub max_idle_time: Duration,
}

/// Reads `key` from the environment, falling back to `default` when the
/// variable is unset or does not parse as `T`.
pub fn env_or<T: FromStr>(key: &str, default: T) -> T {
    std::env::var(key)
        .ok()
        .and_then(|value| value.parse().ok())
        .unwrap_or(default)
}

/// A duration written as an integer with a unit suffix: `ms`, `s`, `m` or `h`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct IdleTime(pub Duration);

#[derive(Debug, thiserror::Error)]
#[error("invalid duration `{0}`: expected a number followed by ms, s, m or h")]
pub struct ParseDurationError(String);

impl FromStr for IdleTime {
    type Err = ParseDurationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let invalid = || ParseDurationError(s.to_owned());
        let split = s.find(|c: char| !c.is_ascii_digit()).ok_or_else(invalid)?;
        let (amount, unit) = s.split_at(split);
        let amount: u64 = amount.parse().map_err(|_| invalid())?;
        let duration = match unit {
            "ms" => Duration::from_millis(amount),
            "s" => Duration::from_secs(amount),
            "m" => Duration::from_secs(amount.checked_mul(60).ok_or_else(invalid)?),
            "h" => Duration::from_secs(amount.checked_mul(3600).ok_or_else(invalid)?),
            _ => return Err(invalid()),
        };
        Ok(Self(duration))
    }
}

impl fmt::Display for IdleTime {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.0.subsec_millis() == 0 {
            write!(f, "{}s", self.0.as_secs())
        } else {
            write!(f, "{}ms", self.0.as_millis())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[test]
    fn flags_override_defaults() {
        let config = Config::try_parse_from([
            "hello",
            "--port", "8080",
            "--env", "production",
            "--db-dsn", "postgres://localhost/hello",
            "--db-max-idle-time", "30s",
        ])
        .unwrap();

        assert_eq!(config.port, 8080);
        assert_eq!(config.env, "production");
        assert_eq!(config.db().dsn, "postgres://localhost/hello");
        assert_eq!(config.db().max_idle_time, Duration::from_secs(30));
    }

    #[test]
    fn invalid_flag_is_rejected() {
        assert!(Config::try_parse_from(["hello", "--port", "not-a-port"]).is_err());
    }

    #[test]
    fn unset_env_falls_back_to_default() {
        assert_eq!(env_or("HELLO_TEST_SURELY_UNSET_VARIABLE", 4000_u16), 4000);
    }

    #[rstest]
    #[case("250ms", Duration::from_millis(250))]
    #[case("30s", Duration::from_secs(30))]
    #[case("15m", Duration::from_secs(900))]
    #[case("2h", Duration::from_secs(7200))]
    fn idle_time_parses_units(#[case] input: &str, #[case] expected: Duration) {
        assert_eq!(input.parse::<IdleTime>().unwrap(), IdleTime(expected));
    }

    #[rstest]
    #[case("")]
    #[case("15")]
    #[case("m")]
    #[case("15 m")]
    #[case("1.5h")]
    #[case("-1s")]
    fn idle_time_rejects_garbage(#[case] input: &str) {
        assert!(input.parse::<IdleTime>().is_err());
    }

    #[test]
    fn idle_time_display_round_trips() {
        for value in [IdleTime(Duration::from_secs(900)), IdleTime(Duration::from_millis(1500))] {
            assert_eq!(value.to_string().parse::<IdleTime>().unwrap(), value);
        }
    }
}
