use chrono::{Local, NaiveDate};

/// Seconds since the start of a service day.
///
/// GTFS clocks may run past `24:00:00` for trips that continue after
/// midnight, so the value is not bounded to a single calendar day.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Time(u32);

impl From<u32> for Time {
    fn from(value: u32) -> Self {
        Self(value)
    }
}

impl Time {
    pub const fn from_seconds(secs: u32) -> Self {
        Self(secs)
    }

    pub const fn from_minutes(minutes: u32) -> Self {
        Self(minutes.saturating_mul(60))
    }

    pub const fn as_seconds(&self) -> u32 {
        self.0
    }

    /// Whole minutes since midnight. Seconds are dropped, not rounded.
    pub const fn as_minutes(&self) -> u32 {
        self.0 / 60
    }

    pub fn to_hms_string(&self) -> String {
        let h = self.0 / 3600;
        let m = (self.0 % 3600) / 60;
        let s = self.0 % 60;
        format!("{:02}:{:02}:{:02}", h, m, s)
    }

    pub fn from_hms(time: &str) -> Option<Self> {
        const HOUR_TO_SEC: u32 = 60 * 60;
        const MINUTE_TO_SEC: u32 = 60;
        let mut split = time.trim().split(':');
        let hours: u32 = split.next()?.parse().ok()?;
        let minutes: u32 = split.next()?.parse().ok()?;
        let seconds: u32 = split.next()?.parse().ok()?;
        if split.next().is_some() || minutes >= 60 || seconds >= 60 {
            return None;
        }
        let seconds = hours
            .checked_mul(HOUR_TO_SEC)?
            .checked_add(minutes * MINUTE_TO_SEC + seconds)?;
        Some(Self(seconds))
    }
}

/// Renders minutes since midnight as `HH:MM:SS`.
/// Negative input falls back to `00:00:00`.
pub fn minutes_to_clock(minutes: i64) -> String {
    match u32::try_from(minutes) {
        Ok(minutes) => Time::from_minutes(minutes).to_hms_string(),
        Err(_) => Time::default().to_hms_string(),
    }
}

/// Number of days from `start` to `date`, negative when `date` is earlier.
pub fn day_offset(start: NaiveDate, date: NaiveDate) -> i64 {
    (date - start).num_days()
}

pub fn today() -> NaiveDate {
    Local::now().date_naive()
}

#[test]
fn parse_unparse_1() {
    let time = "00:00:00";
    let stime = Time::from_hms(time).unwrap();
    assert_eq!(time, stime.to_hms_string())
}

#[test]
fn parse_unparse_2() {
    let time = "12:30:30";
    let stime = Time::from_hms(time).unwrap();
    assert_eq!(time, stime.to_hms_string())
}

#[test]
fn parse_after_midnight() {
    let time = Time::from_hms("25:10:00").unwrap();
    assert_eq!(time.as_minutes(), 1510);
    assert_eq!(time.to_hms_string(), "25:10:00");
    assert_eq!(Time::from_hms("24:30:00").unwrap().as_minutes(), 1470);
}

#[test]
fn minutes_drop_seconds() {
    assert_eq!(Time::from_hms("06:41:59").unwrap().as_minutes(), 401);
}

#[test]
fn negative_minutes_fall_back_to_midnight() {
    assert_eq!(minutes_to_clock(-5), "00:00:00");
    assert_eq!(minutes_to_clock(404), "06:44:00");
}

#[test]
fn invalid_time_test() {
    assert!(Time::from_hms("00:00:0a").is_none());
    assert!(Time::from_hms("00:00").is_none());
    assert!(Time::from_hms("-1:00:00").is_none());
    assert!(Time::from_hms("10:75:00").is_none());
}

#[test]
fn day_offset_counts_calendar_days() {
    let start = NaiveDate::from_ymd_opt(2024, 2, 27).unwrap();
    let date = NaiveDate::from_ymd_opt(2024, 3, 1).unwrap();
    assert_eq!(day_offset(start, date), 3);
    assert_eq!(day_offset(date, start), -3);
}
