//! Notification fan-out.
//!
//! Sends one message to every push token of an account. Each token is
//! delivered independently under its own timeout; at most
//! `max_concurrency` sends run at once. Nothing is retried.

use std::sync::Arc;
use std::time::Duration;

use serde::Serialize;
use shared::crypto::token_fingerprint;
use tokio::sync::Semaphore;
use tokio::task::JoinSet;

use crate::error::{DomainError, DomainResult};
use crate::repositories::PushTokenRepository;
use crate::services::notification::{DeliveryOutcome, NotificationSink, PushMessage};

/// Default per-send timeout.
pub const DEFAULT_SEND_TIMEOUT: Duration = Duration::from_secs(8);

/// Default number of sends in flight per fan-out call.
pub const DEFAULT_MAX_CONCURRENCY: usize = 8;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FanoutConfig {
    pub send_timeout: Duration,
    pub max_concurrency: usize,
}

impl Default for FanoutConfig {
    fn default() -> Self {
        Self {
            send_timeout: DEFAULT_SEND_TIMEOUT,
            max_concurrency: DEFAULT_MAX_CONCURRENCY,
        }
    }
}

/// A failed delivery. Tokens are identified by fingerprint only.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DeliveryFailure {
    pub token_fingerprint: String,
    pub reason: String,
}

/// Aggregate result of one fan-out call.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct FanoutResult {
    pub attempted: usize,
    pub succeeded: usize,
    pub failed: usize,
    /// Invalid tokens removed after delivery.
    #[serde(skip)]
    pub pruned: usize,
    #[serde(skip)]
    pub failures: Vec<DeliveryFailure>,
}

pub struct NotificationFanout {
    push_tokens: Arc<dyn PushTokenRepository>,
    sink: Arc<dyn NotificationSink>,
    config: FanoutConfig,
}

impl NotificationFanout {
    pub fn new(
        push_tokens: Arc<dyn PushTokenRepository>,
        sink: Arc<dyn NotificationSink>,
        config: FanoutConfig,
    ) -> Self {
        Self {
            push_tokens,
            sink,
            config,
        }
    }

    pub fn provider(&self) -> &'static str {
        self.sink.provider()
    }

    pub fn is_configured(&self) -> bool {
        self.sink.ensure_configured().is_ok()
    }

    /// Deliver `message` to every token of the account.
    ///
    /// Only an unconfigured sink or a failure to load the tokens is an error.
    /// Per-token failures, including timeouts, are counted in the result.
    pub async fn notify_account(
        &self,
        user_code: &str,
        message: &PushMessage,
    ) -> DomainResult<FanoutResult> {
        if let Err(e) = self.sink.ensure_configured() {
            tracing::error!(
                provider = self.sink.provider(),
                user_code = %user_code,
                operational = true,
                error = %e,
                "Notification provider unavailable"
            );
            return Err(DomainError::Configuration(e.to_string()));
        }

        let tokens = self.push_tokens.list_for_account(user_code).await?;
        if tokens.is_empty() {
            tracing::info!(user_code = %user_code, "No push tokens registered, nothing to send");
            return Ok(FanoutResult::default());
        }

        let mut result = FanoutResult {
            attempted: tokens.len(),
            ..FanoutResult::default()
        };
        let semaphore = Arc::new(Semaphore::new(self.config.max_concurrency.max(1)));
        let message = Arc::new(message.clone());
        let send_timeout = self.config.send_timeout;
        let mut join_set = JoinSet::new();

        for push_token in tokens {
            // Acquiring before spawning keeps the number of live tasks bounded.
            let permit = semaphore.clone().acquire_owned().await.map_err(|_| {
                DomainError::Configuration("fan-out semaphore closed".to_string())
            })?;
            let sink = self.sink.clone();
            let message = message.clone();

            join_set.spawn(async move {
                let token = push_token.token;
                let outcome =
                    match tokio::time::timeout(send_timeout, sink.send(&token, &message)).await {
                        Ok(outcome) => outcome,
                        Err(_) => DeliveryOutcome::failed(format!(
                            "timed out after {}ms",
                            send_timeout.as_millis()
                        )),
                    };
                drop(permit);
                (token, outcome)
            });
        }

        let mut invalid_tokens = Vec::new();
        while let Some(joined) = join_set.join_next().await {
            match joined {
                Ok((token, outcome)) if outcome.delivered => {
                    result.succeeded += 1;
                    tracing::debug!(token = %token_fingerprint(&token), "Push delivered");
                }
                Ok((token, outcome)) => {
                    let fingerprint = token_fingerprint(&token);
                    let reason = outcome
                        .error_reason
                        .unwrap_or_else(|| "unknown error".to_string());
                    tracing::warn!(
                        user_code = %user_code,
                        token = %fingerprint,
                        reason = %reason,
                        token_invalid = outcome.token_invalid,
                        "Push delivery failed"
                    );
                    result.failed += 1;
                    result.failures.push(DeliveryFailure {
                        token_fingerprint: fingerprint,
                        reason,
                    });
                    if outcome.token_invalid {
                        invalid_tokens.push(token);
                    }
                }
                Err(e) => {
                    tracing::error!(user_code = %user_code, error = %e, "Push delivery task failed");
                    result.failed += 1;
                    result.failures.push(DeliveryFailure {
                        token_fingerprint: "unknown".to_string(),
                        reason: e.to_string(),
                    });
                }
            }
        }

        for token in invalid_tokens {
            match self.push_tokens.delete(&token).await {
                Ok(true) => result.pruned += 1,
                Ok(false) => {}
                Err(e) => tracing::warn!(
                    token = %token_fingerprint(&token),
                    error = %e,
                    "Failed to prune invalid push token"
                ),
            }
        }

        tracing::info!(
            user_code = %user_code,
            notification_type = %message.notification_type,
            attempted = result.attempted,
            succeeded = result.succeeded,
            failed = result.failed,
            pruned = result.pruned,
            "Notification fan-out complete"
        );

        Ok(result)
    }
}
