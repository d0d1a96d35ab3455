// ============================================================================
// Configuration - Environment-Driven Settings
// ============================================================================
//
// All settings come from environment variables (or a `.env` file via
// `dotenvy`), loaded once at startup.
//
// ============================================================================

#[derive(Debug, Clone)]
pub struct FarmConfig {
    /// PostgreSQL connection string. When absent, the in-memory stores
    /// are used instead.
    pub database_url: Option<String>,

    /// Port the Prometheus /metrics exporter listens on.
    pub metrics_port: u16,

    /// Sender identity for outgoing notification mail.
    pub mail_sender: String,

    /// Attempts per command before a version conflict is given up on.
    pub command_retry_attempts: u32,
}

impl FarmConfig {
    /// Load configuration from environment variables, falling back to
    /// defaults when a variable is not set.
    pub fn from_env() -> Self {
        dotenvy::dotenv().ok();

        Self {
            database_url: std::env::var("DATABASE_URL").ok(),
            metrics_port: parse_env("METRICS_PORT", 9090),
            mail_sender: std::env::var("MAIL_SENDER")
                .unwrap_or_else(|_| "noreply@farmcore.local".to_string()),
            command_retry_attempts: parse_env("COMMAND_RETRY_ATTEMPTS", 2),
        }
    }
}

/// Parse an environment variable as `T`, returning `default` on missing
/// or invalid values.
fn parse_env<T: std::str::FromStr>(key: &str, default: T) -> T {
    std::env::var(key)
        .ok()
        .and_then(|v| v.parse().ok())
        .unwrap_or(default)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_env_falls_back_on_garbage() {
        std::env::set_var("FARMCORE_TEST_PORT", "not-a-number");
        let port: u16 = parse_env("FARMCORE_TEST_PORT", 9090);
        assert_eq!(port, 9090);
        std::env::remove_var("FARMCORE_TEST_PORT");
    }

    #[test]
    fn parse_env_reads_valid_values() {
        std::env::set_var("FARMCORE_TEST_ATTEMPTS", "5");
        let attempts: u32 = parse_env("FARMCORE_TEST_ATTEMPTS", 2);
        assert_eq!(attempts, 5);
        std::env::remove_var("FARMCORE_TEST_ATTEMPTS");
    }
}
