// SPDX-FileCopyrightText: 2026 Guestlink Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Routing rule evaluation for verified inbound events.
//!
//! Rules run strictly by ascending priority. Each matching rule contributes
//! its action set to the outcome; a matching rule with the stop flag halts
//! further evaluation. Match counters and last-matched timestamps are
//! updated for observability.

use chrono::Utc;
use guestlink_core::GuestlinkError;
use guestlink_storage::models::now_rfc3339;
use guestlink_storage::queries::rules;
use guestlink_storage::{Database, RoutingRuleRecord};
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

/// An action contributed by a matched rule.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum RuleAction {
    /// Forward the event to a named target.
    Forward { target: String },
    /// Attach a tag to the event.
    Tag { tag: String },
    /// Trigger a named side effect.
    SideEffect { name: String },
}

/// One matched rule and the actions it contributed.
#[derive(Debug, Clone)]
pub struct RuleOutcome {
    pub rule_id: String,
    pub actions: Vec<RuleAction>,
    /// Whether this rule halted further evaluation.
    pub stopped: bool,
}

/// Priority-ordered rule evaluation over persisted routing rules.
#[derive(Clone)]
pub struct RuleEngine {
    db: Database,
}

impl RuleEngine {
    pub fn new(db: Database) -> Self {
        Self { db }
    }

    /// Persist a rule.
    pub async fn add_rule(&self, rule: &RoutingRuleRecord) -> Result<(), GuestlinkError> {
        serde_json::from_str::<Vec<RuleAction>>(&rule.actions).map_err(|e| {
            GuestlinkError::Validation(format!("rule actions are not valid: {e}"))
        })?;
        if rule.predicate == "regex" {
            regex::Regex::new(&rule.pattern).map_err(|e| {
                GuestlinkError::Validation(format!("rule pattern is not a valid regex: {e}"))
            })?;
        }
        rules::insert_rule(&self.db, rule).await
    }

    /// Evaluate all enabled rules against a verified event.
    pub async fn evaluate(
        &self,
        event: &serde_json::Value,
    ) -> Result<Vec<RuleOutcome>, GuestlinkError> {
        let all = rules::list_enabled_rules(&self.db).await?;
        let now = now_rfc3339(Utc::now());

        let mut outcomes = Vec::new();
        for rule in all {
            if !rule_matches(&rule, event) {
                continue;
            }
            let actions: Vec<RuleAction> = match serde_json::from_str(&rule.actions) {
                Ok(actions) => actions,
                Err(e) => {
                    warn!(rule_id = %rule.id, error = %e, "rule has undecodable actions; skipping");
                    continue;
                }
            };
            rules::record_match(&self.db, &rule.id, &now).await?;
            debug!(rule_id = %rule.id, stop = rule.stop_processing, "routing rule matched");

            let stopped = rule.stop_processing;
            outcomes.push(RuleOutcome {
                rule_id: rule.id,
                actions,
                stopped,
            });
            if stopped {
                break;
            }
        }
        Ok(outcomes)
    }
}

/// Apply one rule's predicate to the event.
///
/// The field is looked up as a dotted path into the event JSON. A missing
/// field, a non-scalar value, or an invalid regex all count as non-match.
fn rule_matches(rule: &RoutingRuleRecord, event: &serde_json::Value) -> bool {
    let pointer = format!("/{}", rule.field.replace('.', "/"));
    let Some(value) = event.pointer(&pointer) else {
        return false;
    };
    let text = match value {
        serde_json::Value::String(s) => s.clone(),
        serde_json::Value::Number(n) => n.to_string(),
        serde_json::Value::Bool(b) => b.to_string(),
        _ => return false,
    };

    match rule.predicate.as_str() {
        "equals" => text == rule.pattern,
        "contains" => text.contains(&rule.pattern),
        "regex" => match regex::Regex::new(&rule.pattern) {
            Ok(re) => re.is_match(&text),
            Err(e) => {
                warn!(rule_id = %rule.id, error = %e, "rule has an invalid regex; treating as non-match");
                false
            }
        },
        other => {
            warn!(rule_id = %rule.id, predicate = %other, "unknown predicate; treating as non-match");
            false
        }
    }
}
