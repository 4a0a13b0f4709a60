use crate::{HexI256, HexU256};
use chrono::{DateTime, Datelike, Duration, TimeZone, Timelike, Utc};
use serde::{Deserialize, Serialize};

/// Which calendar granularity a [`CalendarBucket`] covers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CalendarPeriod {
    /// One UTC hour.
    Hour,
    /// One UTC day.
    Day,
    /// One UTC calendar month.
    Month,
}

impl CalendarPeriod {
    /// Truncate `ts` (seconds since epoch) down to the start of the
    /// enclosing period, in UTC.
    pub fn truncate(self, ts: u64) -> u64 {
        let dt = Utc.timestamp_opt(ts as i64, 0).single().expect("valid unix timestamp");
        let truncated = match self {
            CalendarPeriod::Hour => dt.date_naive().and_hms_opt(dt.hour(), 0, 0).expect("hour() is always 0..=23"),
            CalendarPeriod::Day => dt.date_naive().and_hms_opt(0, 0, 0).expect("midnight is always valid"),
            CalendarPeriod::Month => dt
                .date_naive()
                .with_day(1)
                .expect("day 1 is always valid")
                .and_hms_opt(0, 0, 0)
                .expect("midnight is always valid"),
        };
        Utc.from_utc_datetime(&truncated).timestamp() as u64
    }

    /// The start of the period immediately following `period_start`.
    pub fn next(self, period_start: u64) -> u64 {
        let dt: DateTime<Utc> =
            Utc.timestamp_opt(period_start as i64, 0).single().expect("valid unix timestamp");
        let next = match self {
            CalendarPeriod::Hour => dt + Duration::hours(1),
            CalendarPeriod::Day => dt + Duration::days(1),
            CalendarPeriod::Month => {
                let (year, month) = if dt.month() == 12 { (dt.year() + 1, 1) } else { (dt.year(), dt.month() + 1) };
                Utc.with_ymd_and_hms(year, month, 1, 0, 0, 0).single().expect("month is always 1..=12")
            }
        };
        next.timestamp() as u64
    }
}

/// Base-fee percentile summary attached to each [`CalendarBucket`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BaseFeePercentiles {
    /// Minimum base fee (Gwei) observed in the bucket.
    pub minimum: u64,
    /// Median base fee (Gwei) in the bucket.
    pub median: u64,
    /// 90th percentile base fee (Gwei) in the bucket.
    pub ninetieth: u64,
    /// Maximum base fee (Gwei) observed in the bucket.
    pub maximum: u64,
}

/// One hour/day/month aggregate. The bucket covering the newest block is
/// mutable and refreshed on every new block; older buckets are frozen.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CalendarBucket {
    /// Which granularity this bucket covers.
    pub period: CalendarPeriod,
    /// Inclusive start of the bucket, seconds since epoch.
    pub period_start: u64,
    /// Exclusive end of the bucket, seconds since epoch.
    pub period_end: u64,
    /// Wei burned within the bucket.
    pub burned: HexU256,
    /// Issuance (`rewards - burned`) within the bucket, signed: a busy
    /// bucket routinely burns more than it issues.
    pub issuance: HexI256,
    /// Rewards issued within the bucket.
    pub rewards: HexU256,
    /// Tips paid within the bucket.
    pub tips: HexU256,
    /// Bucket length, in seconds (equal to `period_end - period_start`
    /// once the bucket is frozen; shorter while still in progress).
    pub duration: u64,
    /// Base-fee percentile summary across every block in the bucket.
    pub base_fee_percentiles: BaseFeePercentiles,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn hour_truncation_zeroes_minutes_and_seconds() {
        // 2021-08-05 12:34:56 UTC
        let ts = 1_628_166_822u64 + 4200;
        let truncated = CalendarPeriod::Hour.truncate(ts);
        assert_eq!(truncated % 3600, 0);
        assert!(truncated <= ts);
    }

    #[test]
    fn month_next_crosses_year_boundary() {
        let dec_1_2021 = Utc.with_ymd_and_hms(2021, 12, 1, 0, 0, 0).unwrap().timestamp() as u64;
        let jan_1_2022 = CalendarPeriod::Month.next(dec_1_2021);
        let expected = Utc.with_ymd_and_hms(2022, 1, 1, 0, 0, 0).unwrap().timestamp() as u64;
        assert_eq!(jan_1_2022, expected);
    }
}
