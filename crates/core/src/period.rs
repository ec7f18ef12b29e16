//! Named calendar windows and timezone-aware date ranges.
//!
//! A [`Mode`] is what the HTTP caller selects; it expands into one or more
//! [`Period`]s, each of which resolves against "today" in the store's
//! timezone to an inclusive [`DateRange`] of calendar days.
//!
//! Timezone policy: the store's IANA timezone drives both what "today" means
//! and the UTC offset attached to the day boundaries sent to the orders API.
//! Offsets are derived per day by probing local noon, which sidesteps the
//! midnight ambiguity on DST transition days.

use chrono::{
    DateTime, Datelike, Days, Duration, FixedOffset, LocalResult, NaiveDate, NaiveTime, Offset,
    SecondsFormat, TimeZone, Utc,
};
use chrono_tz::Tz;
use thiserror::Error;

/// Report mode selected by the HTTP caller.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Mode {
    /// Week-to-date, month-to-date, and year-to-date in one run.
    Current,
    /// The immediately preceding Monday-Sunday week.
    LastWeek,
    /// The full previous calendar month.
    LastMonth,
    /// The full previous calendar year.
    LastYear,
}

/// Error returned when a `mode` query value is not recognized.
#[derive(Debug, Error)]
#[error("unknown mode '{0}' (expected current, lastWeek, lastMonth, or lastYear)")]
pub struct ModeParseError(pub String);

impl Mode {
    /// Parse a `mode` query parameter value.
    ///
    /// # Errors
    ///
    /// Returns [`ModeParseError`] for anything other than the four known
    /// mode names.
    pub fn parse(value: &str) -> Result<Self, ModeParseError> {
        match value {
            "current" => Ok(Self::Current),
            "lastWeek" => Ok(Self::LastWeek),
            "lastMonth" => Ok(Self::LastMonth),
            "lastYear" => Ok(Self::LastYear),
            other => Err(ModeParseError(other.to_string())),
        }
    }

    /// The wire name of this mode.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Current => "current",
            Self::LastWeek => "lastWeek",
            Self::LastMonth => "lastMonth",
            Self::LastYear => "lastYear",
        }
    }

    /// The periods computed in one run of this mode.
    #[must_use]
    pub const fn periods(self) -> &'static [Period] {
        match self {
            Self::Current => &[Period::Week, Period::Month, Period::Year],
            Self::LastWeek => &[Period::LastWeek],
            Self::LastMonth => &[Period::LastMonth],
            Self::LastYear => &[Period::LastYear],
        }
    }
}

impl std::fmt::Display for Mode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A named calendar window, resolved relative to "today".
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Period {
    /// Monday of the current ISO week through today.
    Week,
    /// First calendar day of the current month through today.
    Month,
    /// January 1 of the current year through today.
    Year,
    /// The immediately preceding Monday-Sunday.
    LastWeek,
    /// First through last calendar day of the previous month.
    LastMonth,
    /// The full previous calendar year.
    LastYear,
}

impl Period {
    /// Resolve this period against `today` into an inclusive date range.
    #[must_use]
    pub fn resolve(self, today: NaiveDate) -> DateRange {
        let monday = today - Days::new(u64::from(today.weekday().num_days_from_monday()));
        let first_of_month = today - Days::new(u64::from(today.day0()));
        let jan_first = today - Days::new(u64::from(today.ordinal0()));

        match self {
            Self::Week => DateRange::new(monday, today),
            Self::Month => DateRange::new(first_of_month, today),
            Self::Year => DateRange::new(jan_first, today),
            Self::LastWeek => DateRange::new(monday - Days::new(7), monday - Days::new(1)),
            Self::LastMonth => {
                let last = first_of_month - Days::new(1);
                let first = last - Days::new(u64::from(last.day0()));
                DateRange::new(first, last)
            }
            Self::LastYear => {
                let dec_last = jan_first - Days::new(1);
                let first = dec_last - Days::new(u64::from(dec_last.ordinal0()));
                DateRange::new(first, dec_last)
            }
        }
    }
}

/// An inclusive range of calendar days.
///
/// Invariant: `since <= until`. Boundaries are inclusive in the timezone the
/// range was resolved for.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DateRange {
    pub since: NaiveDate,
    pub until: NaiveDate,
}

/// Seconds from local midnight to 23:59:59.
const END_OF_DAY_SECS: i64 = 86_399;

impl DateRange {
    /// Create a range. `since` must not be after `until`.
    #[must_use]
    pub fn new(since: NaiveDate, until: NaiveDate) -> Self {
        debug_assert!(since <= until, "date range inverted: {since} > {until}");
        Self { since, until }
    }

    /// Whether `date` falls inside the range (boundaries inclusive).
    #[must_use]
    pub fn contains(&self, date: NaiveDate) -> bool {
        self.since <= date && date <= self.until
    }

    /// Start of the first day as a UTC instant, using `tz`-local midnight.
    #[must_use]
    pub fn start_instant(&self, tz: Tz) -> DateTime<Utc> {
        to_utc(self.since.and_time(NaiveTime::MIN), zone_offset_on(self.since, tz))
    }

    /// End of the last day (23:59:59 local) as a UTC instant.
    #[must_use]
    pub fn end_instant(&self, tz: Tz) -> DateTime<Utc> {
        let local = self.until.and_time(NaiveTime::MIN) + Duration::seconds(END_OF_DAY_SECS);
        to_utc(local, zone_offset_on(self.until, tz))
    }

    /// RFC 3339 start bound with explicit offset, e.g. `2024-05-06T00:00:00-04:00`.
    #[must_use]
    pub fn start_timestamp(&self, tz: Tz) -> String {
        let offset = zone_offset_on(self.since, tz);
        let local = self.since.and_time(NaiveTime::MIN);
        DateTime::<FixedOffset>::from_naive_utc_and_offset(
            local - offset_duration(offset),
            offset,
        )
        .to_rfc3339_opts(SecondsFormat::Secs, false)
    }

    /// RFC 3339 end bound with explicit offset, e.g. `2024-05-12T23:59:59-04:00`.
    #[must_use]
    pub fn end_timestamp(&self, tz: Tz) -> String {
        let offset = zone_offset_on(self.until, tz);
        let local = self.until.and_time(NaiveTime::MIN) + Duration::seconds(END_OF_DAY_SECS);
        DateTime::<FixedOffset>::from_naive_utc_and_offset(
            local - offset_duration(offset),
            offset,
        )
        .to_rfc3339_opts(SecondsFormat::Secs, false)
    }
}

impl std::fmt::Display for DateRange {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}..{}", self.since, self.until)
    }
}

/// UTC offset of `tz` on `date`, probed at local noon.
///
/// Noon is never skipped or repeated by a DST transition, so the result is
/// unambiguous for every real timezone rule.
#[must_use]
pub fn zone_offset_on(date: NaiveDate, tz: Tz) -> FixedOffset {
    let noon = date.and_time(NaiveTime::MIN) + Duration::hours(12);
    match tz.from_local_datetime(&noon) {
        LocalResult::Single(dt) | LocalResult::Ambiguous(dt, _) => dt.offset().fix(),
        // Unreachable for noon probes; fall back to the offset the zone has
        // when interpreting the naive value as UTC.
        LocalResult::None => tz.offset_from_utc_datetime(&noon).fix(),
    }
}

fn offset_duration(offset: FixedOffset) -> Duration {
    Duration::seconds(i64::from(offset.local_minus_utc()))
}

fn to_utc(local: chrono::NaiveDateTime, offset: FixedOffset) -> DateTime<Utc> {
    Utc.from_utc_datetime(&(local - offset_duration(offset)))
}
