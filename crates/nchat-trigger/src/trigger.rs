//! A trigger definition: what kind of event starts a workflow, and which
//! conditions must hold for it to actually fire.

use chrono::{DateTime, Utc};
use nchat_crypto::verify_hmac;
use serde::{Deserialize, Serialize};

use crate::condition::Condition;
use crate::context::Context;

/// What kind of signal this trigger listens for. Schedule triggers are
/// matched by `nchat-cron`, not here — this enum exists so a
/// `TriggerDefinition` can describe itself uniformly regardless of
/// source.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum TriggerKind {
    /// Fires when a named internal event occurs.
    Event {
        /// The event name to listen for, e.g. `"message.received"`.
        event_type: String,
        /// If non-empty, the event must originate from one of these
        /// channels.
        #[serde(default)]
        channel_ids: Vec<String>,
        /// If non-empty, the event must be attributed to one of these
        /// users.
        #[serde(default)]
        user_ids: Vec<String>,
    },
    /// Fires on an inbound webhook call.
    Webhook {
        /// HTTP methods this webhook accepts.
        methods: Vec<String>,
        /// If set, inbound requests must carry a valid
        /// `HMAC-SHA256(secret, body)` signature.
        #[serde(default)]
        secret: Option<String>,
    },
    /// Fires only when a user explicitly invokes the workflow.
    Manual {
        /// If non-empty, only these users may invoke the workflow.
        #[serde(default)]
        allowed_user_ids: Vec<String>,
        /// If non-empty, only users holding one of these roles may
        /// invoke the workflow.
        #[serde(default)]
        allowed_roles: Vec<String>,
    },
    /// Fires on a cron schedule. The expression itself is registered
    /// with `nchat_cron::Scheduler` separately; `should_fire` always
    /// returns `false` for this kind.
    Schedule {
        /// The 5-field cron expression.
        cron_expression: String,
        /// IANA timezone name the expression is evaluated in, e.g.
        /// `"America/New_York"`.
        timezone: String,
        /// The schedule does not fire before this instant, if set.
        #[serde(default)]
        start_date: Option<DateTime<Utc>>,
        /// The schedule auto-deactivates at this instant, if set.
        #[serde(default)]
        end_date: Option<DateTime<Utc>>,
    },
}

/// The concrete signal a caller is asking a [`TriggerDefinition`] to
/// evaluate against. Each variant carries exactly what that trigger kind
/// needs to decide whether it matches; a signal only ever matches a
/// `TriggerKind` of the same shape.
#[derive(Debug, Clone)]
pub enum TriggerSignal<'a> {
    /// An internal event was emitted.
    Event {
        /// The event's type name.
        event_type: &'a str,
        /// The channel the event originated from, if any.
        channel_id: Option<&'a str>,
        /// The user the event is attributed to, if any.
        user_id: Option<&'a str>,
    },
    /// An inbound webhook request arrived.
    Webhook {
        /// The HTTP method of the request.
        method: &'a str,
        /// The raw request body, used to verify `secret` if set.
        body: &'a [u8],
        /// The signature supplied by the caller (e.g. from an
        /// `X-Signature` header), if any.
        signature: Option<&'a [u8]>,
    },
    /// A user explicitly invoked the workflow.
    Manual {
        /// The invoking user's ID.
        user_id: &'a str,
        /// Roles held by the invoking user.
        roles: &'a [String],
    },
}

/// A trigger: a kind of signal, gated by zero or more conditions that
/// must ALL hold (conjunction) for the trigger to fire.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TriggerDefinition {
    /// What this trigger listens for.
    pub kind: TriggerKind,
    /// Conditions evaluated against the event payload. Empty means the
    /// trigger fires unconditionally whenever its kind matches.
    #[serde(default)]
    pub conditions: Vec<Condition>,
}

impl TriggerDefinition {
    /// Whether this trigger should fire given `signal` and `context`:
    /// the signal must match this trigger's kind, the kind's own
    /// matching rule must hold, and every condition must hold.
    ///
    /// `Schedule` triggers are matched by the cron scheduler, not here,
    /// and always return `false`.
    pub fn should_fire(&self, signal: &TriggerSignal<'_>, context: &Context) -> bool {
        let kind_matches = match (&self.kind, signal) {
            (
                TriggerKind::Event {
                    event_type,
                    channel_ids,
                    user_ids,
                },
                TriggerSignal::Event {
                    event_type: signal_type,
                    channel_id,
                    user_id,
                },
            ) => {
                event_type == signal_type
                    && (channel_ids.is_empty()
                        || channel_id.map(|id| channel_ids.iter().any(|c| c == id)).unwrap_or(false))
                    && (user_ids.is_empty()
                        || user_id.map(|id| user_ids.iter().any(|u| u == id)).unwrap_or(false))
            }
            (
                TriggerKind::Webhook { methods, secret },
                TriggerSignal::Webhook {
                    method,
                    body,
                    signature,
                },
            ) => {
                methods.iter().any(|m| m.eq_ignore_ascii_case(method))
                    && match secret {
                        None => true,
                        Some(secret) => signature
                            .map(|sig| verify_hmac(secret.as_bytes(), body, sig))
                            .unwrap_or(false),
                    }
            }
            (
                TriggerKind::Manual {
                    allowed_user_ids,
                    allowed_roles,
                },
                TriggerSignal::Manual { user_id, roles },
            ) => {
                (allowed_user_ids.is_empty() && allowed_roles.is_empty())
                    || allowed_user_ids.iter().any(|u| u == user_id)
                    || roles.iter().any(|r| allowed_roles.contains(r))
            }
            (TriggerKind::Schedule { .. }, _) => false,
            _ => false,
        };

        kind_matches && self.conditions.iter().all(|c| c.evaluate(context))
    }
}
