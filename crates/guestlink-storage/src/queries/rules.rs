// SPDX-FileCopyrightText: 2026 Guestlink Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Routing rule storage and match bookkeeping.

use guestlink_core::GuestlinkError;
use rusqlite::params;

use crate::database::{map_tr_err, Database};
use crate::models::RoutingRuleRecord;

/// Persist a routing rule.
pub async fn insert_rule(db: &Database, rule: &RoutingRuleRecord) -> Result<(), GuestlinkError> {
    let rule = rule.clone();
    db.connection()
        .call(move |conn| {
            conn.execute(
                "INSERT INTO routing_rules (id, priority, field, predicate, pattern, actions,
                     stop_processing, enabled, match_count, last_matched_at)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10)",
                params![
                    rule.id,
                    rule.priority,
                    rule.field,
                    rule.predicate,
                    rule.pattern,
                    rule.actions,
                    rule.stop_processing,
                    rule.enabled,
                    rule.match_count,
                    rule.last_matched_at,
                ],
            )?;
            Ok(())
        })
        .await
        .map_err(map_tr_err)
}

/// List enabled rules in evaluation order (ascending priority).
pub async fn list_enabled_rules(
    db: &Database,
) -> Result<Vec<RoutingRuleRecord>, GuestlinkError> {
    db.connection()
        .call(|conn| -> Result<Vec<RoutingRuleRecord>, rusqlite::Error> {
            let mut stmt = conn.prepare(
                "SELECT id, priority, field, predicate, pattern, actions, stop_processing,
                        enabled, match_count, last_matched_at
                 FROM routing_rules WHERE enabled = 1 ORDER BY priority ASC",
            )?;
            let rows = stmt.query_map([], |row| {
                Ok(RoutingRuleRecord {
                    id: row.get(0)?,
                    priority: row.get(1)?,
                    field: row.get(2)?,
                    predicate: row.get(3)?,
                    pattern: row.get(4)?,
                    actions: row.get(5)?,
                    stop_processing: row.get(6)?,
                    enabled: row.get(7)?,
                    match_count: row.get(8)?,
                    last_matched_at: row.get(9)?,
                })
            })?;
            let mut rules = Vec::new();
            for row in rows {
                rules.push(row?);
            }
            Ok(rules)
        })
        .await
        .map_err(map_tr_err)
}

/// Record a rule match for observability.
pub async fn record_match(db: &Database, id: &str, now: &str) -> Result<(), GuestlinkError> {
    let id = id.to_string();
    let now = now.to_string();
    db.connection()
        .call(move |conn| {
            conn.execute(
                "UPDATE routing_rules
                 SET match_count = match_count + 1, last_matched_at = ?2
                 WHERE id = ?1",
                params![id, now],
            )?;
            Ok(())
        })
        .await
        .map_err(map_tr_err)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::now_rfc3339;
    use chrono::Utc;

    fn make_rule(id: &str, priority: i64) -> RoutingRuleRecord {
        RoutingRuleRecord {
            id: id.to_string(),
            priority,
            field: "event_type".to_string(),
            predicate: "equals".to_string(),
            pattern: "delivery.failed".to_string(),
            actions: r#"[{"type":"tag","tag":"failed"}]"#.to_string(),
            stop_processing: false,
            enabled: true,
            match_count: 0,
            last_matched_at: None,
        }
    }

    #[tokio::test]
    async fn rules_are_listed_in_priority_order() {
        let db = Database::open_in_memory().await.unwrap();
        insert_rule(&db, &make_rule("r-low", 20)).await.unwrap();
        insert_rule(&db, &make_rule("r-high", 5)).await.unwrap();

        let mut disabled = make_rule("r-off", 1);
        disabled.enabled = false;
        insert_rule(&db, &disabled).await.unwrap();

        let rules = list_enabled_rules(&db).await.unwrap();
        assert_eq!(rules.len(), 2);
        assert_eq!(rules[0].id, "r-high");
        assert_eq!(rules[1].id, "r-low");
    }

    #[tokio::test]
    async fn record_match_updates_counters() {
        let db = Database::open_in_memory().await.unwrap();
        insert_rule(&db, &make_rule("r1", 1)).await.unwrap();

        let now = now_rfc3339(Utc::now());
        record_match(&db, "r1", &now).await.unwrap();
        record_match(&db, "r1", &now).await.unwrap();

        let rules = list_enabled_rules(&db).await.unwrap();
        assert_eq!(rules[0].match_count, 2);
        assert_eq!(rules[0].last_matched_at.as_deref(), Some(now.as_str()));
    }
}
