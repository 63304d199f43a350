use chrono::{DateTime, FixedOffset, Local, NaiveDateTime, Offset, TimeZone};
use thiserror::Error;
use tracing::{debug, info};

pub type CaptureTime = DateTime<FixedOffset>;

const OFFSET_LAYOUT: &str = "%Y:%m:%d %H:%M:%S%:z";
const LOCAL_LAYOUT: &str = "%Y:%m:%d %H:%M:%S";
// `9` is any ASCII digit, `+` is a sign.
const OFFSET_SHAPE: &str = "9999:99:99 99:99:99+99:99";
const LOCAL_SHAPE: &str = "9999:99:99 99:99:99";

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum TimestampError {
    #[error("撮影日時を解析できませんでした: {0}")]
    NoParseMatch(String),
}

pub fn parse_capture_time(raw: &str) -> Result<CaptureTime, TimestampError> {
    let normalized = raw.trim();

    if has_shape(normalized, OFFSET_SHAPE) {
        if let Ok(dt) = DateTime::parse_from_str(normalized, OFFSET_LAYOUT) {
            debug!(raw = normalized, "オフセット付き日時として解析");
            return Ok(dt);
        }
    }

    if has_shape(normalized, LOCAL_SHAPE) {
        if let Ok(naive) = NaiveDateTime::parse_from_str(normalized, LOCAL_LAYOUT) {
            info!(
                raw = normalized,
                "タイムゾーン情報がないためローカルタイムゾーンとして解釈します"
            );
            return Ok(attach_local_offset(naive));
        }
    }

    Err(TimestampError::NoParseMatch(normalized.to_string()))
}

/// chrono accepts unpadded fields and loose offsets, so the exact layout is checked first.
fn has_shape(input: &str, shape: &str) -> bool {
    input.len() == shape.len()
        && input
            .bytes()
            .zip(shape.bytes())
            .all(|(actual, expected)| match expected {
                b'9' => actual.is_ascii_digit(),
                b'+' => actual == b'+' || actual == b'-',
                _ => actual == expected,
            })
}

/// Keeps the written wall clock even when it falls into a DST gap.
fn attach_local_offset(naive: NaiveDateTime) -> CaptureTime {
    if let Some(local) = Local.from_local_datetime(&naive).earliest() {
        return local.fixed_offset();
    }

    let offset = Local.offset_from_utc_datetime(&naive).fix();
    naive
        .and_local_timezone(offset)
        .earliest()
        .unwrap_or_else(|| naive.and_utc().fixed_offset())
}
