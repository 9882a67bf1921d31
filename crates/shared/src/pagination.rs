//! Limit handling for list endpoints.

/// Default number of alarm history entries returned when no limit is given.
pub const DEFAULT_HISTORY_LIMIT: i64 = 50;

/// Upper bound on alarm history entries returned in one response.
pub const MAX_HISTORY_LIMIT: i64 = 500;

/// Resolves a caller-supplied limit into a value safe to hand to a query.
///
/// Missing or non-positive limits fall back to `default`; oversized limits
/// are capped at `max`.
pub fn clamp_limit(requested: Option<i64>, default: i64, max: i64) -> i64 {
    match requested {
        Some(limit) if limit > 0 => limit.min(max),
        _ => default,
    }
}

/// Clamp a limit for the alarm history endpoint.
pub fn history_limit(requested: Option<i64>) -> i64 {
    clamp_limit(requested, DEFAULT_HISTORY_LIMIT, MAX_HISTORY_LIMIT)
}
