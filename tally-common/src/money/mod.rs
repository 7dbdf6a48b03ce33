//! Helpers for amounts stored as integer cents.

/// The per-person share of a split, with the requester included in the head
/// count. Rounds half up to the nearest cent.
pub fn split_share_cents(total_cents: i64, other_participant_count: u32) -> i64 {
    let divisor = i64::from(other_participant_count) + 1;

    (total_cents + divisor / 2) / divisor
}

/// Renders cents as a human-readable amount, e.g. `42.50 USD`.
pub fn format_cents(amount_cents: i64, currency: &str) -> String {
    let sign = if amount_cents < 0 { "-" } else { "" };
    let magnitude = amount_cents.unsigned_abs();

    format!(
        "{}{}.{:02} {}",
        sign,
        magnitude / 100,
        magnitude % 100,
        currency
    )
}
