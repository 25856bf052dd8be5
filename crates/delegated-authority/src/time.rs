//! Time utilities.
//!
//! Ledger time is a logical clock (`u64`) advanced explicitly by the host.
//! Wall-clock microseconds are only used to stamp batch receipts.

/// Return the current time as microseconds since Unix epoch.
pub fn now_micros() -> u64 {
    std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .map(|d| d.as_micros() as u64)
        .unwrap_or(0)
}

/// Convert microseconds to an RFC 3339 string.
pub fn micros_to_rfc3339(micros: u64) -> String {
    let secs = (micros / 1_000_000) as i64;
    let nsecs = ((micros % 1_000_000) * 1000) as u32;
    let dt = chrono::DateTime::from_timestamp(secs, nsecs).unwrap_or(chrono::DateTime::UNIX_EPOCH);
    dt.to_rfc3339()
}

/// Start of the fixed-size window containing `now`.
///
/// A zero `window_size` degenerates to a single window starting at zero.
pub fn window_start(now: u64, window_size: u64) -> u64 {
    if window_size == 0 {
        return 0;
    }
    now - now % window_size
}
