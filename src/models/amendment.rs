//! Amendment history records.
//!
//! History entries are immutable once appended. Approvals and rejections are
//! stored as separate dispositions that point at the entry they decide on;
//! the rendered view folds a rejection back onto its entry.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use uuid::Uuid;

use crate::entities::booking_item_amendment;
use crate::errors::ServiceError;
use crate::models::AmendStatus;

/// Keys carrying this prefix are point-in-time snapshots, not requested changes.
pub const SNAPSHOT_PREFIX: &str = "current_";

const SYSTEM_ACTOR: &str = "System";

/// The user performing an amendment operation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Actor {
    pub id: Option<Uuid>,
    pub name: String,
}

impl Actor {
    pub fn new(id: Uuid, name: impl Into<String>) -> Self {
        Self {
            id: Some(id),
            name: name.into(),
        }
    }

    /// Actor used when no authenticated user is present.
    pub fn system() -> Self {
        Self {
            id: None,
            name: SYSTEM_ACTOR.to_string(),
        }
    }
}

/// A `changes` submission: a JSON object, or a string holding an encoded object.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ChangesPayload(pub Value);

impl ChangesPayload {
    pub fn decode(self) -> Result<Map<String, Value>, ServiceError> {
        let value = match self.0 {
            Value::String(encoded) => serde_json::from_str::<Value>(&encoded).map_err(|e| {
                ServiceError::ValidationError(format!("changes is not valid JSON: {}", e))
            })?,
            other => other,
        };

        match value {
            Value::Object(map) => Ok(map),
            other => Err(ServiceError::ValidationError(format!(
                "changes must be a JSON object, got {}",
                json_kind(&other)
            ))),
        }
    }
}

impl From<Value> for ChangesPayload {
    fn from(value: Value) -> Self {
        ChangesPayload(value)
    }
}

fn json_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}

/// A decoded submission split into the requested delta and the snapshot of
/// prior values.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ChangeSet {
    pub changes: Map<String, Value>,
    pub previous_values: Map<String, Value>,
}

impl ChangeSet {
    pub fn split(payload: Map<String, Value>) -> Self {
        let mut set = ChangeSet::default();
        for (key, value) in payload {
            if key.starts_with(SNAPSHOT_PREFIX) {
                set.previous_values.insert(key, value);
            } else {
                set.changes.insert(key, value);
            }
        }
        set
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AmendmentEntry {
    pub requested_at: DateTime<Utc>,
    pub changes: Map<String, Value>,
    #[serde(default)]
    pub previous_values: Map<String, Value>,
    pub requested_by: Option<Uuid>,
    pub requested_by_name: String,
}

impl AmendmentEntry {
    pub fn new(set: ChangeSet, actor: &Actor, requested_at: DateTime<Utc>) -> Self {
        Self {
            requested_at,
            changes: set.changes,
            previous_values: set.previous_values,
            requested_by: actor.id,
            requested_by_name: actor.name.clone(),
        }
    }
}

/// An approval or rejection of a history entry.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Disposition {
    pub status: AmendStatus,
    /// Index into the history; `None` when the history was empty.
    pub entry_index: Option<usize>,
    pub reason: Option<String>,
    pub decided_by: Option<Uuid>,
    pub decided_by_name: String,
    pub decided_at: DateTime<Utc>,
}

impl Disposition {
    /// A disposition on the most recent entry of a history of `history_len` entries.
    pub fn on_latest(
        status: AmendStatus,
        history_len: usize,
        reason: Option<String>,
        actor: &Actor,
        decided_at: DateTime<Utc>,
    ) -> Self {
        Self {
            status,
            entry_index: history_len.checked_sub(1),
            reason,
            decided_by: actor.id,
            decided_by_name: actor.name.clone(),
            decided_at,
        }
    }
}

pub fn decode_history(value: &Value) -> Result<Vec<AmendmentEntry>, ServiceError> {
    decode_list(value, "amend_history")
}

pub fn decode_dispositions(value: &Value) -> Result<Vec<Disposition>, ServiceError> {
    decode_list(value, "dispositions")
}

fn decode_list<T: for<'de> Deserialize<'de>>(
    value: &Value,
    field: &str,
) -> Result<Vec<T>, ServiceError> {
    if value.is_null() {
        return Ok(Vec::new());
    }
    serde_json::from_value(value.clone())
        .map_err(|e| ServiceError::SerializationError(format!("corrupt {}: {}", field, e)))
}

/// History entry as presented to clients.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RenderedEntry {
    #[serde(flatten)]
    pub entry: AmendmentEntry,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub rejected_reason: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub rejected_by: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub rejected_at: Option<DateTime<Utc>>,
}

/// Folds the latest rejection of each entry onto it.
pub fn render_history(
    history: Vec<AmendmentEntry>,
    dispositions: &[Disposition],
) -> Vec<RenderedEntry> {
    history
        .into_iter()
        .enumerate()
        .map(|(index, entry)| {
            let rejection = dispositions
                .iter()
                .rev()
                .find(|d| d.status == AmendStatus::Rejected && d.entry_index == Some(index));
            RenderedEntry {
                entry,
                rejected_reason: rejection.and_then(|d| d.reason.clone()),
                rejected_by: rejection.map(|d| d.decided_by_name.clone()),
                rejected_at: rejection.map(|d| d.decided_at),
            }
        })
        .collect()
}

/// Full amendment record view.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AmendmentView {
    pub id: Uuid,
    pub booking_item_id: Uuid,
    pub amend_history: Vec<RenderedEntry>,
    pub dispositions: Vec<Disposition>,
    pub amend_request: bool,
    pub amend_mail_sent: bool,
    pub amend_approve: bool,
    pub amend_status: AmendStatus,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl TryFrom<booking_item_amendment::Model> for AmendmentView {
    type Error = ServiceError;

    fn try_from(model: booking_item_amendment::Model) -> Result<Self, Self::Error> {
        let history = decode_history(&model.amend_history)?;
        let dispositions = decode_dispositions(&model.dispositions)?;
        Ok(Self {
            id: model.id,
            booking_item_id: model.booking_item_id,
            amend_history: render_history(history, &dispositions),
            dispositions,
            amend_request: model.amend_request,
            amend_mail_sent: model.amend_mail_sent,
            amend_approve: model.amend_approve,
            amend_status: model.amend_status,
            created_at: model.created_at,
            updated_at: model.updated_at,
        })
    }
}
