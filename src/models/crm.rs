//! Human-readable CRM identifiers.
//!
//! Bookings are numbered `{prefix}{NNNNN}`; their items are numbered
//! `{booking_crm_id}_{NNN}` with the sequence starting at 1 in submission order.
//! Both formats appear on customer documents and must stay stable.

const BOOKING_SEQUENCE_WIDTH: usize = 5;
const ITEM_SEQUENCE_WIDTH: usize = 3;

pub fn booking_crm_id(prefix: &str, sequence: u64) -> String {
    format!("{}{:0width$}", prefix, sequence, width = BOOKING_SEQUENCE_WIDTH)
}

pub fn item_crm_id(booking_crm_id: &str, sequence: u32) -> String {
    format!(
        "{}_{:0width$}",
        booking_crm_id,
        sequence,
        width = ITEM_SEQUENCE_WIDTH
    )
}

/// Sequence number of an item CRM id, if it has the `{parent}_{NNN}` shape.
pub fn item_sequence(crm_id: &str) -> Option<u32> {
    let (parent, sequence) = crm_id.rsplit_once('_')?;
    if parent.is_empty() || sequence.is_empty() || !sequence.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    sequence.parse().ok()
}

/// First sequence after the given ones; 1 for an empty booking.
pub fn next_item_sequence<I>(existing: I) -> u32
where
    I: IntoIterator<Item = u32>,
{
    existing.into_iter().max().map_or(1, |max| max + 1)
}

/// Stored form of an item sequence high-water mark.
pub fn sequence_column(sequence: u32) -> i32 {
    i32::try_from(sequence).unwrap_or(i32::MAX)
}

/// Reads back a stored high-water mark; negative values count as unset.
pub fn sequence_from_column(value: i32) -> u32 {
    u32::try_from(value).unwrap_or(0)
}
