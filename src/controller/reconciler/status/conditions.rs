//! # Condition State Machine
//!
//! Ordered, type-keyed condition list. Updating an existing type mutates it in
//! place; a new type is appended. `lastTransitionTime` moves only when the
//! status of a condition flips.

use crate::constants::READY_MESSAGE;
use crate::crd::{condition_types, reasons, Condition, ConditionStatus};
use chrono::{DateTime, SecondsFormat, Utc};
use std::collections::HashMap;

/// Outcome of a reconcile pass, as far as status is concerned
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ReconcileOutcome {
    /// Every desired object was applied
    Ready,
    /// The storage configuration is invalid; `message` is the aggregated error
    Degraded { reason: String, message: String },
}

impl ReconcileOutcome {
    /// Degraded outcome for a storage secret that failed validation
    pub fn invalid_storage(message: String) -> Self {
        ReconcileOutcome::Degraded {
            reason: reasons::INVALID_STORAGE_CONFIG.to_string(),
            message,
        }
    }
}

/// Condition list with an index by type
#[derive(Debug, Clone, Default)]
pub struct ConditionSet {
    conditions: Vec<Condition>,
    index: HashMap<String, usize>,
}

impl ConditionSet {
    pub fn from_conditions(conditions: Vec<Condition>) -> Self {
        let mut set = Self::default();
        for condition in conditions {
            // Later duplicates of a type replace the earlier entry
            match set.index.get(&condition.r#type) {
                Some(&i) => set.conditions[i] = condition,
                None => {
                    set.index
                        .insert(condition.r#type.clone(), set.conditions.len());
                    set.conditions.push(condition);
                }
            }
        }
        set
    }

    pub fn get(&self, condition_type: &str) -> Option<&Condition> {
        self.index
            .get(condition_type)
            .map(|&i| &self.conditions[i])
    }

    pub fn len(&self) -> usize {
        self.conditions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.conditions.is_empty()
    }

    /// Insert or update a condition
    ///
    /// Reason and message are always replaced. The transition time changes
    /// only when the status differs from the stored one.
    pub fn upsert(
        &mut self,
        condition_type: &str,
        status: ConditionStatus,
        reason: &str,
        message: &str,
        now: DateTime<Utc>,
    ) {
        match self.index.get(condition_type) {
            Some(&i) => {
                let existing = &mut self.conditions[i];
                if existing.status != status {
                    existing.status = status;
                    existing.last_transition_time = format_timestamp(now);
                }
                existing.reason = reason.to_string();
                existing.message = message.to_string();
            }
            None => {
                self.index
                    .insert(condition_type.to_string(), self.conditions.len());
                self.conditions.push(Condition {
                    r#type: condition_type.to_string(),
                    status,
                    reason: reason.to_string(),
                    message: message.to_string(),
                    last_transition_time: format_timestamp(now),
                });
            }
        }
    }

    /// Set an existing condition to False, keeping its reason and message
    ///
    /// Absent types are left absent.
    pub fn mark_false(&mut self, condition_type: &str, now: DateTime<Utc>) {
        if let Some(&i) = self.index.get(condition_type) {
            let existing = &mut self.conditions[i];
            if existing.status != ConditionStatus::False {
                existing.status = ConditionStatus::False;
                existing.last_transition_time = format_timestamp(now);
            }
        }
    }

    pub fn into_conditions(self) -> Vec<Condition> {
        self.conditions
    }
}

/// Apply the outcome of a pass to the current condition list
///
/// Success drives `Ready=True` and resolves `Degraded`; an invalid storage
/// configuration drives `Degraded=True` and resolves `Ready`. A resolved
/// condition keeps the reason and message it had while active.
pub fn apply_outcome(
    current: &[Condition],
    outcome: &ReconcileOutcome,
    now: DateTime<Utc>,
) -> Vec<Condition> {
    let mut set = ConditionSet::from_conditions(current.to_vec());
    match outcome {
        ReconcileOutcome::Ready => {
            set.upsert(
                condition_types::READY,
                ConditionStatus::True,
                reasons::READY,
                READY_MESSAGE,
                now,
            );
            set.mark_false(condition_types::DEGRADED, now);
        }
        ReconcileOutcome::Degraded { reason, message } => {
            set.upsert(
                condition_types::DEGRADED,
                ConditionStatus::True,
                reason,
                message,
                now,
            );
            set.mark_false(condition_types::READY, now);
        }
    }
    set.into_conditions()
}

/// Condition timestamps are stored with second precision
pub fn format_timestamp(time: DateTime<Utc>) -> String {
    time.to_rfc3339_opts(SecondsFormat::Secs, true)
}
