use std::{env, time::Duration};

use log::*;

const DEFAULT_DATABASE_URL: &str = "sqlite://data/loyalty.db";
const DEFAULT_ACCRUAL_URL: &str = "http://localhost:8080";
const DEFAULT_POLL_INTERVAL: Duration = Duration::from_secs(1);
const DEFAULT_REQUEST_TIMEOUT: Duration = Duration::from_secs(10);

#[derive(Clone, Debug)]
pub struct ReconcilerConfig {
    pub database_url: String,
    /// Base URL of the external accrual service.
    pub accrual_url: String,
    /// How often the pipeline wakes up to sweep the unaccrued backlog.
    pub poll_interval: Duration,
    /// Upper bound on a single accrual lookup, so an unresponsive dependency cannot stall a fetch indefinitely.
    pub request_timeout: Duration,
}

impl Default for ReconcilerConfig {
    fn default() -> Self {
        Self {
            database_url: DEFAULT_DATABASE_URL.to_string(),
            accrual_url: DEFAULT_ACCRUAL_URL.to_string(),
            poll_interval: DEFAULT_POLL_INTERVAL,
            request_timeout: DEFAULT_REQUEST_TIMEOUT,
        }
    }
}

impl ReconcilerConfig {
    pub fn from_env_or_default() -> Self {
        let database_url = env::var("LPS_DATABASE_URL").ok().unwrap_or_else(|| DEFAULT_DATABASE_URL.into());
        let accrual_url = env::var("LPS_ACCRUAL_URL").ok().unwrap_or_else(|| DEFAULT_ACCRUAL_URL.into());
        let poll_interval = duration_from_env("LPS_POLL_INTERVAL_SECS", DEFAULT_POLL_INTERVAL);
        let request_timeout = duration_from_env("LPS_ACCRUAL_TIMEOUT_SECS", DEFAULT_REQUEST_TIMEOUT);
        Self { database_url, accrual_url, poll_interval, request_timeout }
    }
}

fn duration_from_env(var: &str, default: Duration) -> Duration {
    match env::var(var) {
        Ok(s) => match s.parse::<u64>() {
            Ok(secs) if secs > 0 => Duration::from_secs(secs),
            _ => {
                error!("🪛️ {s} is not a valid number of seconds for {var}. Using the default, {default:?}, instead.");
                default
            },
        },
        Err(_) => default,
    }
}

#[cfg(test)]
mod test {
    use std::time::Duration;

    use super::duration_from_env;

    #[test]
    fn invalid_durations_fall_back_to_the_default() {
        std::env::set_var("LPS_TEST_DURATION", "not-a-number");
        assert_eq!(duration_from_env("LPS_TEST_DURATION", Duration::from_secs(7)), Duration::from_secs(7));
        std::env::set_var("LPS_TEST_DURATION", "0");
        assert_eq!(duration_from_env("LPS_TEST_DURATION", Duration::from_secs(7)), Duration::from_secs(7));
        std::env::set_var("LPS_TEST_DURATION", "30");
        assert_eq!(duration_from_env("LPS_TEST_DURATION", Duration::from_secs(7)), Duration::from_secs(30));
        std::env::remove_var("LPS_TEST_DURATION");
    }
}
