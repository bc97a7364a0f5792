//! Processing timestamps written to the merge status column.

use chrono::{DateTime, FixedOffset, Local};

/// Source of the current time.
pub trait Clock {
    fn now(&self) -> DateTime<FixedOffset>;
}

/// Wall clock in the local timezone.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> DateTime<FixedOffset> {
        Local::now().fixed_offset()
    }
}

/// A clock stopped at one instant.
#[derive(Debug, Clone, Copy)]
pub struct FixedClock(pub DateTime<FixedOffset>);

impl Clock for FixedClock {
    fn now(&self) -> DateTime<FixedOffset> {
        self.0
    }
}

/// Format as `YYYY/MM/DD HH:MM GMT±HH`.
///
/// The offset is truncated to whole hours, so `+05:30` prints as `GMT+05`.
#[must_use]
pub fn format_processed_timestamp(at: &DateTime<FixedOffset>) -> String {
    let offset_minutes = at.offset().local_minus_utc() / 60;
    let sign = if offset_minutes >= 0 { '+' } else { '-' };
    let offset_hours = offset_minutes.unsigned_abs() / 60;
    format!(
        "{} GMT{}{:02}",
        at.format("%Y/%m/%d %H:%M"),
        sign,
        offset_hours
    )
}

/// Text of the merge status cell for a row completed at `at`.
#[must_use]
pub fn merge_status_text(at: &DateTime<FixedOffset>) -> String {
    format!("Done\nProcessed on: {}", format_processed_timestamp(at))
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn at(offset_secs: i32) -> DateTime<FixedOffset> {
        FixedOffset::east_opt(offset_secs)
            .unwrap()
            .with_ymd_and_hms(2024, 3, 7, 9, 5, 0)
            .unwrap()
    }

    #[test]
    fn formats_positive_offset() {
        assert_eq!(format_processed_timestamp(&at(2 * 3600)), "2024/03/07 09:05 GMT+02");
    }

    #[test]
    fn formats_utc_as_plus_zero() {
        assert_eq!(format_processed_timestamp(&at(0)), "2024/03/07 09:05 GMT+00");
    }

    #[test]
    fn truncates_partial_hours() {
        assert_eq!(
            format_processed_timestamp(&at(5 * 3600 + 1800)),
            "2024/03/07 09:05 GMT+05"
        );
        assert_eq!(
            format_processed_timestamp(&at(-(3 * 3600 + 1800))),
            "2024/03/07 09:05 GMT-03"
        );
    }

    #[test]
    fn status_text_has_two_lines() {
        let clock = FixedClock(at(-8 * 3600));
        assert_eq!(
            merge_status_text(&clock.now()),
            "Done\nProcessed on: 2024/03/07 09:05 GMT-08"
        );
    }
}
