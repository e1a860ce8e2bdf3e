// src/market/clock.rs
//! Exchange-local market clock over a fixed UTC offset.
//!
//! Two jobs: gate the polling loop to the trading window, and resolve the
//! "latest complete session" close used as the anchor for lookback windows.

use chrono::{DateTime, Datelike, Duration, FixedOffset, NaiveTime, Timelike, Utc, Weekday};

use crate::config::MarketHoursConfig;

#[derive(Debug, Clone, Copy)]
pub struct MarketClock {
    offset: FixedOffset,
    open_hour: u32,
    open_minute: u32,
    close_hour: u32,
}

impl MarketClock {
    pub fn from_config(cfg: &MarketHoursConfig) -> Self {
        let offset = FixedOffset::east_opt(cfg.utc_offset_hours * 3600)
            .unwrap_or_else(|| FixedOffset::east_opt(0).expect("zero offset is valid"));
        Self {
            offset,
            open_hour: cfg.open_hour,
            open_minute: cfg.open_minute,
            close_hour: cfg.close_hour,
        }
    }

    /// True when the exchange-local instant is a trading weekday inside
    /// [open, close). The open boundary is inside the window, the close
    /// boundary outside.
    pub fn is_market_hours(&self, now_utc: DateTime<Utc>) -> bool {
        let local = now_utc.with_timezone(&self.offset);
        if is_weekend(local.weekday()) {
            return false;
        }
        let minute_of_day = local.hour() * 60 + local.minute();
        let open = self.open_hour * 60 + self.open_minute;
        let close = self.close_hour * 60;
        minute_of_day >= open && minute_of_day < close
    }

    /// Close instant of the latest complete session: today's close if it has
    /// already passed, otherwise the previous trading day's, rolled back
    /// across weekends.
    pub fn latest_session_close(&self, now_utc: DateTime<Utc>) -> DateTime<FixedOffset> {
        let local = now_utc.with_timezone(&self.offset);
        let close = NaiveTime::from_hms_opt(self.close_hour, 0, 0)
            .unwrap_or_else(|| NaiveTime::from_hms_opt(16, 0, 0).expect("valid fallback time"));
        let mut date = local.date_naive();
        if local.time() < close {
            date = date - Duration::days(1);
        }
        while is_weekend(date.weekday()) {
            date = date - Duration::days(1);
        }
        date.and_time(close)
            .and_local_timezone(self.offset)
            .single()
            .expect("fixed offset is unambiguous")
    }

    /// Lookback window ending at the latest complete session close.
    pub fn session_window(
        &self,
        now_utc: DateTime<Utc>,
        hours: u32,
    ) -> (DateTime<FixedOffset>, DateTime<FixedOffset>) {
        let end = self.latest_session_close(now_utc);
        (end - Duration::hours(i64::from(hours)), end)
    }
}

fn is_weekend(day: Weekday) -> bool {
    matches!(day, Weekday::Sat | Weekday::Sun)
}
