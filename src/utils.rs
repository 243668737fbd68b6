/// Timestamp helpers for logging and the database sink
use time::format_description::well_known::Rfc3339;
use time::macros::format_description;
use time::OffsetDateTime;

/// Format a timestamp for human-readable logging
///
/// Converts an OffsetDateTime to DD.MM.YYYY - HH:MM:SS format.
/// Falls back to default string representation if formatting fails.
pub fn format_datetime(dt: &OffsetDateTime) -> String {
    let format = format_description!("[day].[month].[year] - [hour]:[minute]:[second]");
    dt.format(&format).unwrap_or_else(|_| dt.to_string())
}

/// RFC 3339 rendering used for sink timestamps
pub fn format_rfc3339(dt: &OffsetDateTime) -> String {
    dt.format(&Rfc3339).unwrap_or_else(|_| dt.to_string())
}

/// Seconds since the Unix epoch with sub-second precision
pub fn unix_seconds(dt: &OffsetDateTime) -> f64 {
    dt.unix_timestamp_nanos() as f64 / 1e9
}

#[cfg(test)]
mod tests {
    use super::*;
    use time::macros::datetime;

    #[test]
    fn formats_log_datetime() {
        let dt = datetime!(2024-03-05 07:08:09 UTC);
        assert_eq!(format_datetime(&dt), "05.03.2024 - 07:08:09");
    }

    #[test]
    fn formats_rfc3339() {
        let dt = datetime!(2024-03-05 07:08:09.5 UTC);
        assert_eq!(format_rfc3339(&dt), "2024-03-05T07:08:09.5Z");
    }

    #[test]
    fn unix_seconds_keeps_fraction() {
        let dt = datetime!(1970-01-01 00:00:01.25 UTC);
        assert_eq!(unix_seconds(&dt), 1.25);
    }
}
