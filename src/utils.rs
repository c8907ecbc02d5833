//! Calendar and offset-string helpers.

use crate::instant::{Instant, MS_PER_DAY, MS_PER_HOUR, MS_PER_MINUTE, MS_PER_SECOND};

/// Returns the epoch day number for January 1st of the given year.
pub(crate) fn epoch_days_for_year(y: i64) -> i64 {
    365 * (y - 1970) + (y - 1969).div_euclid(4) - (y - 1901).div_euclid(100)
        + (y - 1601).div_euclid(400)
}

fn is_leap_year(y: i64) -> bool {
    (y % 4 == 0 && y % 100 != 0) || y % 400 == 0
}

/// 00:00:00Z on January 1st of the given year.
pub(crate) fn year_start_instant(year: i64) -> Instant {
    Instant::from_epoch_millis(epoch_days_for_year(year) * MS_PER_DAY)
}

/// 12:00:00Z on July 2nd of the year following the given year.
///
/// Used as the sampling point for offset validation: a point in the future
/// with respect to the data, half way through the year, so that regeneration
/// from the same inputs is repeatable.
pub(crate) fn offset_sample_instant(iana_year: i64) -> Instant {
    let year = iana_year + 1;
    // Days from Jan 1 to Jul 2 of the same year: six full months plus one day.
    let june_end = 181 + if is_leap_year(year) { 1 } else { 0 };
    let days = epoch_days_for_year(year) + june_end + 1;
    Instant::from_epoch_millis(days * MS_PER_DAY + 12 * MS_PER_HOUR)
}

/// Extracts the year from an IANA version string such as `"2021a"`.
pub(crate) fn iana_version_year(version: &str) -> Option<i64> {
    version.get(0..4)?.parse::<i64>().ok()
}

/// Parses a `[-]H:mm` / `[-]HH:mm[:ss]` UTC offset string to milliseconds.
pub fn parse_utc_offset(s: &str) -> Option<i64> {
    let (s, sign) = match s.strip_prefix('-') {
        Some(stripped) => (stripped, -1),
        None => (s, 1),
    };
    let mut parts = s.split(':');
    let hours = parts.next()?.parse::<i64>().ok()?;
    let minutes = parts.next()?.parse::<i64>().ok()?;
    let seconds = match parts.next() {
        Some(sec) => sec.parse::<i64>().ok()?,
        None => 0,
    };
    if parts.next().is_some() || !(0..24).contains(&hours) || !(0..60).contains(&minutes) {
        return None;
    }
    Some(sign * (hours * MS_PER_HOUR + minutes * MS_PER_MINUTE + seconds * MS_PER_SECOND))
}

/// Renders an offset in milliseconds as `[-]HH:mm`.
pub fn to_utc_offset_string(offset_ms: i64) -> String {
    let sign = if offset_ms < 0 { "-" } else { "" };
    let abs = offset_ms.abs();
    let hours = abs / MS_PER_HOUR;
    let minutes = (abs % MS_PER_HOUR) / MS_PER_MINUTE;
    format!("{sign}{hours:02}:{minutes:02}")
}

/// True if every element occurs exactly once.
pub(crate) fn all_unique<T: Eq + core::hash::Hash>(items: impl IntoIterator<Item = T>) -> bool {
    let mut seen = hashbrown::HashSet::new();
    items.into_iter().all(|item| seen.insert(item))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn year_starts() {
        assert_eq!(year_start_instant(1970), Instant::EPOCH);
        // 2021-01-01T00:00:00Z
        assert_eq!(
            year_start_instant(2021).as_epoch_millis(),
            1_609_459_200_000
        );
    }

    #[test]
    fn sample_instant_mid_year() {
        // For 2021 data: 2022-07-02T12:00:00Z.
        assert_eq!(
            offset_sample_instant(2021).as_epoch_millis(),
            1_656_763_200_000
        );
    }

    #[test]
    fn version_year() {
        assert_eq!(iana_version_year("2021a"), Some(2021));
        assert_eq!(iana_version_year("21a"), None);
    }

    #[test]
    fn offset_parsing() {
        assert_eq!(parse_utc_offset("1:00"), Some(3_600_000));
        assert_eq!(parse_utc_offset("-5:00"), Some(-18_000_000));
        assert_eq!(parse_utc_offset("13:45"), Some(49_500_000));
        assert_eq!(parse_utc_offset("0:00"), Some(0));
        assert_eq!(parse_utc_offset("24:00"), None);
        assert_eq!(parse_utc_offset("bogus"), None);
    }

    #[test]
    fn offset_formatting() {
        assert_eq!(to_utc_offset_string(3_600_000), "01:00");
        assert_eq!(to_utc_offset_string(-18_000_000), "-05:00");
        assert_eq!(to_utc_offset_string(0), "00:00");
    }
}
