// FILETIME/LDAP timestamp decoding: 100ns ticks since 1601-01-01 UTC.
use time::OffsetDateTime;

use crate::core::error::{Error, ErrorKind};

/// Seconds between 1601-01-01 and 1970-01-01, via the day-count formula the
/// WebCache tooling has always used (integer division throughout). Evaluates
/// to 11_644_473_600.
pub const FILETIME_UNIX_OFFSET_SECS: i64 = ((1970 - 1601) * 365 - 3 + (1970 - 1601) / 4) * 86_400;

/// Render a FILETIME tick count as a sortable UTC string,
/// `YYYY-MM-DD HH:MM:SS.mmm`.
///
/// `ticks == 0` renders as the 1601 epoch; whether that means "not set" is a
/// policy decision made by the caller, not here.
pub fn filetime_to_utc(ticks: u64) -> Result<String, Error> {
    let millis = (ticks / 10_000) as i128;
    let unix_millis = millis - i128::from(FILETIME_UNIX_OFFSET_SECS) * 1_000;
    let datetime =
        OffsetDateTime::from_unix_timestamp_nanos(unix_millis * 1_000_000).map_err(|err| {
            Error::new(ErrorKind::Corrupt)
                .with_message(format!("timestamp out of range: {ticks} ticks"))
                .with_source(err)
        })?;
    Ok(format!(
        "{:04}-{:02}-{:02} {:02}:{:02}:{:02}.{:03}",
        datetime.year(),
        u8::from(datetime.month()),
        datetime.day(),
        datetime.hour(),
        datetime.minute(),
        datetime.second(),
        datetime.millisecond(),
    ))
}

#[cfg(test)]
mod tests {
    use super::{FILETIME_UNIX_OFFSET_SECS, filetime_to_utc};

    #[test]
    fn offset_matches_day_count_formula() {
        assert_eq!(FILETIME_UNIX_OFFSET_SECS, 11_644_473_600);
    }

    #[test]
    fn zero_ticks_is_the_epoch() {
        assert_eq!(filetime_to_utc(0).unwrap(), "1601-01-01 00:00:00.000");
    }

    #[test]
    fn unix_epoch_round_trips() {
        let ticks = FILETIME_UNIX_OFFSET_SECS as u64 * 10_000_000;
        assert_eq!(filetime_to_utc(ticks).unwrap(), "1970-01-01 00:00:00.000");
    }

    #[test]
    fn known_modern_timestamp() {
        // 2020-01-01T00:00:00Z = 1_577_836_800 Unix seconds.
        let ticks = (1_577_836_800 + FILETIME_UNIX_OFFSET_SECS as u64) * 10_000_000;
        assert_eq!(filetime_to_utc(ticks).unwrap(), "2020-01-01 00:00:00.000");
        // 1234 extra milliseconds land in the sub-second field.
        let ticks = ticks + 1_234 * 10_000;
        assert_eq!(filetime_to_utc(ticks).unwrap(), "2020-01-01 00:00:01.234");
    }

    #[test]
    fn output_is_lexicographically_monotonic() {
        let samples: [u64; 6] = [
            0,
            1,
            10_000_000,
            11_644_473_600 * 10_000_000,
            132_223_104_000_000_000,
            132_223_104_001_234_567,
        ];
        let mut previous = None;
        for ticks in samples {
            let formatted = filetime_to_utc(ticks).unwrap();
            if let Some(prev) = previous {
                assert!(prev <= formatted, "{prev} > {formatted}");
            }
            previous = Some(formatted);
        }
    }

    #[test]
    fn far_future_ticks_are_rejected() {
        assert!(filetime_to_utc(u64::MAX).is_err());
    }
}
