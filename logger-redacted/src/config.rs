// Logger configuration
use serde::{Deserialize, Serialize};
use tracing_subscriber::EnvFilter;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggerConfig {
    #[serde(default = "default_true")]
    pub redaction_enabled: bool,
    /// Emit JSON lines instead of the coloured development format
    #[serde(default)]
    pub json: bool,
    #[serde(default = "default_log_level")]
    pub log_level: String,
}

fn default_true() -> bool {
    true
}

fn default_log_level() -> String {
    "info".to_string()
}

impl Default for LoggerConfig {
    fn default() -> Self {
        Self {
            redaction_enabled: true,
            json: false,
            log_level: default_log_level(),
        }
    }
}

impl LoggerConfig {
    /// Production deployments (`APP_ENV=production`) log JSON
    pub fn for_environment(app_env: &str, verbose: bool) -> Self {
        Self {
            redaction_enabled: true,
            json: app_env.eq_ignore_ascii_case("production"),
            log_level: if verbose { "debug" } else { "info" }.to_string(),
        }
    }

    /// Filter directive covering the given crates at the configured level
    pub fn filter_directive(&self, crates: &[&str]) -> String {
        let mut directives: Vec<String> = crates
            .iter()
            .map(|name| format!("{}={}", name.replace('-', "_"), self.log_level))
            .collect();
        directives.push("tower_http=info".to_string());
        directives.push("sqlx=warn".to_string());
        directives.join(",")
    }

    /// `RUST_LOG` wins over the configured directive when set
    pub fn env_filter(&self, crates: &[&str]) -> EnvFilter {
        EnvFilter::try_from_default_env()
            .unwrap_or_else(|_| EnvFilter::new(self.filter_directive(crates)))
    }
}
