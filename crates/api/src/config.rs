//! Process configuration: environment-derived `AppConfig`.
//!
//! Grounded in the teacher's `main.rs` convention of reading a handful of
//! env vars with a logged insecure default (`JWT_SECRET` there,
//! `WEBHOOK_SECRET` here) rather than a config-file parser — this service
//! has few enough knobs that a dedicated format would be overkill.

use forgework_jobs::RetryPolicy;
use forgework_webhook::WebhookConfig;

/// Everything `main` needs to wire the process that isn't a port
/// implementation.
#[derive(Debug, Clone)]
pub struct AppConfig {
    pub bind_addr: String,
    pub max_concurrency: usize,
    pub max_queue_size: usize,
    pub retry_policy: RetryPolicy,
    pub webhook: WebhookConfig,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            bind_addr: "0.0.0.0:8080".to_string(),
            max_concurrency: 4,
            max_queue_size: 1024,
            retry_policy: RetryPolicy::default(),
            webhook: WebhookConfig::default(),
        }
    }
}

impl AppConfig {
    /// Reads recognized options from the process environment, falling back
    /// to the documented defaults for anything unset or unparseable.
    pub fn from_env() -> Self {
        let defaults = Self::default();

        let bind_addr = std::env::var("BIND_ADDR").unwrap_or(defaults.bind_addr);

        let max_concurrency = env_usize("MAX_CONCURRENCY").unwrap_or(defaults.max_concurrency);
        let max_queue_size = env_usize("MAX_QUEUE_SIZE").unwrap_or(defaults.max_queue_size);

        let webhook_secret = std::env::var("WEBHOOK_SECRET").unwrap_or_else(|_| {
            tracing::warn!("WEBHOOK_SECRET not set; webhook signature validation is disabled");
            String::new()
        });
        let activation_label =
            std::env::var("ACTIVATION_LABEL").unwrap_or(defaults.webhook.activation_label);

        Self {
            bind_addr,
            max_concurrency,
            max_queue_size,
            retry_policy: defaults.retry_policy,
            webhook: WebhookConfig {
                webhook_secret,
                activation_label,
            },
        }
    }
}

fn env_usize(key: &str) -> Option<usize> {
    std::env::var(key).ok().and_then(|v| v.parse().ok())
}
