//! Event router and handler registry (spec section 4.2): maps a delivered
//! event to zero or more registered handlers and runs each in isolation.

use async_trait::async_trait;
use github_bot_sdk::auth::{AuthenticationProvider, InstallationAccessToken, InstallationId};
use serde_json::Value;
use std::sync::Arc;
use tracing::{error, info_span, warn, Instrument};

use crate::error::RouterError;
use crate::metrics::Metrics;
use crate::model::HandlerRegistration;

/// Repository info extracted from a payload, when present.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RepositoryInfo {
    pub owner: String,
    pub name: String,
    pub id: u64,
    pub full_name: String,
}

/// An issue reference extracted from a payload's `issue` object.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IssueRef {
    pub number: u64,
    pub title: String,
}

/// A pull-request reference extracted from a payload's `pull_request` object.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PullRequestRef {
    pub number: u64,
    pub title: String,
}

/// Opaque carrier passed to handlers: delivery identity, the parsed payload,
/// an installation-authenticated path to outbound GitHub calls, and a
/// dry-run flag.
pub struct HandlerContext {
    pub delivery_id: String,
    pub event_name: String,
    pub event_action: Option<String>,
    pub payload: Value,
    pub installation_id: Option<InstallationId>,
    pub dry_run: bool,
    auth: Option<Arc<dyn AuthenticationProvider>>,
}

impl HandlerContext {
    pub fn new(
        delivery_id: impl Into<String>,
        event_name: impl Into<String>,
        event_action: Option<String>,
        payload: Value,
        installation_id: Option<InstallationId>,
        auth: Option<Arc<dyn AuthenticationProvider>>,
        dry_run: bool,
    ) -> Self {
        Self {
            delivery_id: delivery_id.into(),
            event_name: event_name.into(),
            event_action,
            payload,
            installation_id,
            dry_run,
            auth,
        }
    }

    /// Mint (or reuse a cached) installation access token for this
    /// delivery's installation, for handlers that need to call GitHub.
    pub async fn installation_token(
        &self,
    ) -> Result<InstallationAccessToken, RouterError> {
        let installation_id = self.installation_id.ok_or_else(|| RouterError::MissingField {
            field: "installation_id".to_string(),
        })?;
        let auth = self.auth.as_ref().ok_or_else(|| RouterError::MissingField {
            field: "installation_auth".to_string(),
        })?;
        auth.installation_token(installation_id)
            .await
            .map_err(|e| RouterError::HandlerFailed {
                handler: "installation_token".to_string(),
                message: e.to_string(),
            })
    }

    /// Extracts `payload.repository`, failing with a clear message when the
    /// needed fields are absent.
    pub fn repo(&self) -> Result<RepositoryInfo, RouterError> {
        let repo = self.payload.get("repository").ok_or_else(|| RouterError::MissingField {
            field: "repository".to_string(),
        })?;
        let full_name = repo
            .get("full_name")
            .and_then(Value::as_str)
            .ok_or_else(|| RouterError::MissingField {
                field: "repository.full_name".to_string(),
            })?
            .to_string();
        let (owner, name) = full_name.split_once('/').ok_or_else(|| RouterError::MissingField {
            field: "repository.full_name".to_string(),
        })?;
        let id = repo
            .get("id")
            .and_then(Value::as_u64)
            .ok_or_else(|| RouterError::MissingField {
                field: "repository.id".to_string(),
            })?;
        Ok(RepositoryInfo {
            owner: owner.to_string(),
            name: name.to_string(),
            id,
            full_name: full_name.clone(),
        })
    }

    /// Extracts `payload.issue`, failing with a clear message when absent.
    pub fn issue(&self) -> Result<IssueRef, RouterError> {
        let issue = self.payload.get("issue").ok_or_else(|| RouterError::MissingField {
            field: "issue".to_string(),
        })?;
        let number = issue
            .get("number")
            .and_then(Value::as_u64)
            .ok_or_else(|| RouterError::MissingField {
                field: "issue.number".to_string(),
            })?;
        let title = issue
            .get("title")
            .and_then(Value::as_str)
            .unwrap_or_default()
            .to_string();
        Ok(IssueRef { number, title })
    }

    /// Extracts `payload.pull_request`, failing with a clear message when absent.
    pub fn pull_request(&self) -> Result<PullRequestRef, RouterError> {
        let pr = self
            .payload
            .get("pull_request")
            .ok_or_else(|| RouterError::MissingField {
                field: "pull_request".to_string(),
            })?;
        let number = pr
            .get("number")
            .and_then(Value::as_u64)
            .ok_or_else(|| RouterError::MissingField {
                field: "pull_request.number".to_string(),
            })?;
        let title = pr.get("title").and_then(Value::as_str).unwrap_or_default().to_string();
        Ok(PullRequestRef { number, title })
    }

    /// Run `side_effect` for real, or log it and return `stand_in` when
    /// `dry_run` is set. `description` and `params` are logged verbatim; they
    /// should describe the action about to be taken.
    pub async fn dry_run_execute<T, F, Fut>(
        &self,
        description: &str,
        params: &Value,
        stand_in: T,
        side_effect: F,
    ) -> T
    where
        F: FnOnce() -> Fut,
        Fut: std::future::Future<Output = T>,
    {
        if self.dry_run {
            tracing::info!(
                delivery_id = %self.delivery_id,
                action = description,
                params = %params,
                "dry-run: action not executed"
            );
            stand_in
        } else {
            side_effect().await
        }
    }
}

/// Anything that can handle a routed delivery.
#[async_trait]
pub trait Handler: Send + Sync {
    async fn handle(&self, context: &HandlerContext) -> Result<(), RouterError>;
}

/// A registered handler bound to its matching patterns. `factory` is
/// resolved once per dispatch, giving each invocation a fresh instance if
/// the factory chooses to build one (the "fresh dependency scope" of
/// spec section 4.2).
struct Registered {
    registration: HandlerRegistration,
    factory: Arc<dyn Fn() -> Arc<dyn Handler> + Send + Sync>,
}

/// Registration-ordered, pattern-matched dispatcher. Handlers are
/// independent: a failure in one does not prevent the others from running.
#[derive(Default)]
pub struct EventRouter {
    handlers: Vec<Registered>,
}

impl EventRouter {
    pub fn new() -> Self {
        Self { handlers: Vec::new() }
    }

    /// Registers a handler factory under `event_pattern`/`action_pattern`.
    /// Registration order is preserved and is the dispatch order.
    pub fn register<F>(
        &mut self,
        name: &'static str,
        event_pattern: impl Into<String>,
        action_pattern: Option<String>,
        factory: F,
    ) where
        F: Fn() -> Arc<dyn Handler> + Send + Sync + 'static,
    {
        self.handlers.push(Registered {
            registration: HandlerRegistration {
                event_pattern: event_pattern.into(),
                action_pattern,
                name,
            },
            factory: Arc::new(factory),
        });
    }

    /// Number of registrations matching `event_pattern` verbatim (used by the
    /// service's readiness check, not by dispatch matching).
    pub fn handler_count(&self, event_pattern: &str) -> usize {
        self.handlers
            .iter()
            .filter(|r| r.registration.event_pattern == event_pattern)
            .count()
    }

    pub fn is_empty(&self) -> bool {
        self.handlers.is_empty()
    }

    /// Dispatches `context` to every matching handler, in registration
    /// order. Handler errors are logged and metered, never propagated:
    /// once a delivery is persisted it must be considered "processed" from
    /// the sender's view.
    pub async fn dispatch(&self, context: &HandlerContext, metrics: &dyn Metrics) {
        for registered in &self.handlers {
            if !event_matches(&registered.registration.event_pattern, &context.event_name) {
                continue;
            }
            if !action_matches(registered.registration.action_pattern.as_deref(), context.event_action.as_deref()) {
                continue;
            }

            let handler = (registered.factory)();
            let span = info_span!(
                "handler.dispatch",
                handler = registered.registration.name,
                delivery_id = %context.delivery_id,
                event = %context.event_name,
            );
            let result = handler.handle(context).instrument(span).await;

            match result {
                Ok(()) => {}
                Err(err) => {
                    error!(
                        handler = registered.registration.name,
                        delivery_id = %context.delivery_id,
                        error = %err,
                        "handler failed"
                    );
                    metrics.increment_counter(
                        "webhook.routing_error",
                        &[("handler", registered.registration.name)],
                    );
                }
            }
        }
        if self.handlers.iter().all(|r| {
            !(event_matches(&r.registration.event_pattern, &context.event_name)
                && action_matches(r.registration.action_pattern.as_deref(), context.event_action.as_deref()))
        }) {
            warn!(event = %context.event_name, "no handler matched delivery");
        }
    }
}

/// `*` matches any event; `X.*` matches `event_name == X`; otherwise
/// case-insensitive equality.
fn event_matches(pattern: &str, event_name: &str) -> bool {
    if pattern == "*" {
        return true;
    }
    if let Some(prefix) = pattern.strip_suffix(".*") {
        return prefix.eq_ignore_ascii_case(event_name);
    }
    pattern.eq_ignore_ascii_case(event_name)
}

/// `None` or `*` matches any action, including a null/absent action;
/// otherwise case-insensitive equality (no match if `action` is `None` and
/// the pattern is specific).
fn action_matches(pattern: Option<&str>, action: Option<&str>) -> bool {
    match pattern {
        None => true,
        Some("*") => true,
        Some(p) => action.map(|a| a.eq_ignore_ascii_case(p)).unwrap_or(false),
    }
}

#[cfg(test)]
#[path = "router_tests.rs"]
mod tests;
