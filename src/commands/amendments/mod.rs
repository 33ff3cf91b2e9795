//! Commands on the amendment log of a booking item.

use chrono::{DateTime, Utc};
use sea_orm::{ActiveModelTrait, ConnectionTrait, Set};
use serde_json::Value;
use tracing::debug;
use uuid::Uuid;

use crate::{
    entities::booking_item_amendment,
    errors::ServiceError,
    models::{
        amendment::{decode_dispositions, decode_history},
        Actor, AmendStatus, AmendmentEntry, Disposition,
    },
    repositories::{amendment_repository::amendment_of_item, booking_repository::find_item},
};

pub mod approve_amendment_command;
pub mod reject_amendment_command;
pub mod submit_amendment_command;
pub mod update_amendment_command;

pub use approve_amendment_command::ApproveAmendmentCommand;
pub use reject_amendment_command::RejectAmendmentCommand;
pub use submit_amendment_command::SubmitAmendmentCommand;
pub use update_amendment_command::UpdateAmendmentCommand;

fn to_json<T: serde::Serialize>(value: &T) -> Result<Value, ServiceError> {
    Ok(serde_json::to_value(value)?)
}

/// Appends `entry` to the item's amendment record, creating the record when
/// the item has none. Flags the record as a fresh, unmailed request.
pub(crate) async fn append_entry<C: ConnectionTrait>(
    conn: &C,
    booking_item_id: Uuid,
    entry: AmendmentEntry,
    status: AmendStatus,
    now: DateTime<Utc>,
) -> Result<booking_item_amendment::Model, ServiceError> {
    find_item(conn, booking_item_id).await?;

    match amendment_of_item(conn, booking_item_id).await? {
        Some(record) => {
            let mut history = decode_history(&record.amend_history)?;
            history.push(entry);
            debug!(amendment_id = %record.id, entries = history.len(), "Appending amendment entry");

            let mut active: booking_item_amendment::ActiveModel = record.into();
            active.amend_history = Set(to_json(&history)?);
            active.amend_request = Set(true);
            active.amend_mail_sent = Set(false);
            active.amend_status = Set(status);
            active.updated_at = Set(now);
            Ok(active.update(conn).await?)
        }
        None => {
            let record = booking_item_amendment::ActiveModel {
                id: Set(Uuid::new_v4()),
                booking_item_id: Set(booking_item_id),
                amend_history: Set(to_json(&vec![entry])?),
                dispositions: Set(Value::Array(Vec::new())),
                amend_request: Set(true),
                amend_mail_sent: Set(false),
                amend_approve: Set(false),
                amend_status: Set(status),
                created_at: Set(now),
                updated_at: Set(now),
            };
            Ok(record.insert(conn).await?)
        }
    }
}

/// Records an approval or rejection of the latest entry. History entries are
/// left as they are.
pub(crate) async fn decide<C: ConnectionTrait>(
    conn: &C,
    record: booking_item_amendment::Model,
    status: AmendStatus,
    reason: Option<String>,
    actor: &Actor,
    now: DateTime<Utc>,
) -> Result<booking_item_amendment::Model, ServiceError> {
    let history_len = decode_history(&record.amend_history)?.len();
    let mut dispositions = decode_dispositions(&record.dispositions)?;
    dispositions.push(Disposition::on_latest(
        status,
        history_len,
        reason,
        actor,
        now,
    ));

    let mut active: booking_item_amendment::ActiveModel = record.into();
    active.dispositions = Set(to_json(&dispositions)?);
    active.amend_approve = Set(status == AmendStatus::Approved);
    active.amend_status = Set(status);
    active.updated_at = Set(now);
    Ok(active.update(conn).await?)
}
