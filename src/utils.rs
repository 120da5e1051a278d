use chrono::{FixedOffset, Local, TimeZone, Utc};
use tracing::warn;
use tracing_subscriber::{fmt, EnvFilter};

/// Initialize the `tracing` subscriber. `RUST_LOG` overrides the default
/// `info` level.
pub fn init_logging() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    fmt::Subscriber::builder()
        .with_env_filter(filter)
        .with_target(false)
        .init();
}

/// Next funding settlement assuming settlements at UTC hour boundaries
/// every `interval_hours` (00:00, 08:00, 16:00 for the usual 8h cycle).
/// Used by venues whose ticker omits the settlement timestamp.
pub fn next_aligned_funding_ms(interval_hours: i64) -> i64 {
    next_aligned_from(Utc::now().timestamp_millis(), interval_hours)
}

fn next_aligned_from(now_ms: i64, interval_hours: i64) -> i64 {
    let interval_ms = interval_hours * 3_600_000;
    (now_ms / interval_ms + 1) * interval_ms
}

/// `HH:MM:SS` until `target_ms`, clamped to zero once the moment passed.
/// Hours are not wrapped at 24 so long waits stay readable.
pub fn countdown(now_ms: i64, target_ms: i64) -> String {
    let left = (target_ms - now_ms).max(0) / 1000;
    let hours = left / 3600;
    let minutes = (left % 3600) / 60;
    let seconds = left % 60;
    format!("{hours:02}:{minutes:02}:{seconds:02}")
}

/// Parses a display offset like `+03:00` or `-05:30`. IANA zone names are
/// not supported; anything unparsable logs a warning and yields `None`,
/// which callers treat as "use local time".
pub fn parse_display_offset(raw: &str) -> Option<FixedOffset> {
    let parsed = parse_offset_secs(raw).and_then(FixedOffset::east_opt);
    if parsed.is_none() {
        warn!("unsupported time zone {:?}, falling back to local time", raw);
    }
    parsed
}

fn parse_offset_secs(raw: &str) -> Option<i32> {
    let raw = raw.trim();
    let (sign, rest) = match raw.strip_prefix('+') {
        Some(rest) => (1, rest),
        None => (-1, raw.strip_prefix('-')?),
    };
    let (hours, minutes) = rest.split_once(':')?;
    let hours: i32 = hours.parse().ok()?;
    let minutes: i32 = minutes.parse().ok()?;
    if hours > 14 || minutes > 59 {
        return None;
    }
    Some(sign * (hours * 3600 + minutes * 60))
}

/// Formats an epoch-ms timestamp for display, in the given offset when one
/// was supplied and parses, otherwise in local time.
pub fn format_ts(ms: i64, offset: Option<FixedOffset>) -> String {
    match offset {
        Some(offset) => match offset.timestamp_millis_opt(ms) {
            chrono::LocalResult::Single(dt) => dt.format("%Y-%m-%d %H:%M:%S %:z").to_string(),
            _ => String::new(),
        },
        None => match Local.timestamp_millis_opt(ms) {
            chrono::LocalResult::Single(dt) => dt.format("%Y-%m-%d %H:%M:%S").to_string(),
            _ => String::new(),
        },
    }
}

pub fn now_ms() -> i64 {
    Utc::now().timestamp_millis()
}
