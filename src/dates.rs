use chrono::{DateTime, Datelike, Days, NaiveDate, Utc};

/// First day covered by the APOD archive.
pub const DATASET_EPOCH: (i32, u32, u32) = (1995, 6, 16);

/// Number of extra days after the start date; the window spans nine days.
pub const WINDOW_EXTRA_DAYS: u64 = 8;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DateBounds {
    pub min: NaiveDate,
    pub max: NaiveDate,
}

impl DateBounds {
    /// Bounds for a session started on `today`: the dataset epoch up to
    /// October 1st of the same year.
    pub fn for_today(today: NaiveDate) -> Self {
        let (y, m, d) = DATASET_EPOCH;
        let min = NaiveDate::from_ymd_opt(y, m, d).unwrap_or(NaiveDate::MIN);
        let max = NaiveDate::from_ymd_opt(today.year(), 10, 1).unwrap_or(today);
        Self { min, max }
    }

    pub fn clamp(&self, day: NaiveDate) -> NaiveDate {
        day.clamp(self.min, self.max)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DateRange {
    bounds: DateBounds,
    start: NaiveDate,
    end: NaiveDate,
}

impl DateRange {
    pub fn new(today: NaiveDate) -> Self {
        let bounds = DateBounds::for_today(today);
        let end = bounds.max;
        let start = bounds.clamp(
            end.checked_sub_days(Days::new(WINDOW_EXTRA_DAYS))
                .unwrap_or(bounds.min),
        );
        Self { bounds, start, end }
    }

    pub fn from_system_clock() -> Self {
        Self::new(Utc::now().date_naive())
    }

    pub fn bounds(&self) -> DateBounds {
        self.bounds
    }

    pub fn start(&self) -> NaiveDate {
        self.start
    }

    pub fn end(&self) -> NaiveDate {
        self.end
    }

    /// Moves the start and drags the end along so the window stays nine days
    /// wide, except where the upper bound cuts it short.
    pub fn on_start_changed(&mut self, start: NaiveDate) {
        let start = self.bounds.clamp(start);
        let end = start
            .checked_add_days(Days::new(WINDOW_EXTRA_DAYS))
            .unwrap_or(self.bounds.max);
        self.start = start;
        self.end = end.min(self.bounds.max);
    }

    pub fn set_end(&mut self, end: NaiveDate) {
        self.end = self.bounds.clamp(end);
    }

    /// Inclusive number of calendar days covered.
    pub fn span_days(&self) -> i64 {
        (self.end - self.start).num_days() + 1
    }
}

/// Parses a calendar day the way the dataset writes them (`YYYY-MM-DD`).
/// Unpadded components and full RFC 3339 timestamps are accepted too.
pub fn parse_day(raw: &str) -> Option<NaiveDate> {
    let raw = raw.trim();
    if raw.is_empty() {
        return None;
    }
    if let Ok(day) = NaiveDate::parse_from_str(raw, "%Y-%m-%d") {
        return Some(day);
    }
    if let Ok(stamp) = DateTime::parse_from_rfc3339(raw) {
        return Some(stamp.date_naive());
    }

    let mut parts = raw.splitn(3, '-');
    let year = parts.next()?.trim().parse::<i32>().ok()?;
    let month = parts.next()?.trim().parse::<u32>().ok()?;
    let day = parts.next()?.trim().parse::<u32>().ok()?;
    NaiveDate::from_ymd_opt(year, month, day)
}

pub fn format_day(day: NaiveDate) -> String {
    day.format("%Y-%m-%d").to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn day(s: &str) -> NaiveDate {
        parse_day(s).unwrap()
    }

    #[test]
    fn default_window_ends_on_october_first() {
        let range = DateRange::new(day("2026-10-17"));
        assert_eq!(range.bounds().min, day("1995-06-16"));
        assert_eq!(range.bounds().max, day("2026-10-01"));
        assert_eq!(range.end(), day("2026-10-01"));
        assert_eq!(range.start(), day("2026-09-23"));
        assert_eq!(range.span_days(), 9);
    }

    #[test]
    fn max_bound_ignores_current_month() {
        let range = DateRange::new(day("2025-02-03"));
        assert_eq!(range.bounds().max, day("2025-10-01"));
    }

    #[test]
    fn start_change_keeps_nine_day_window() {
        let mut range = DateRange::new(day("2024-12-01"));
        range.on_start_changed(day("2024-02-25"));
        assert_eq!(range.start(), day("2024-02-25"));
        assert_eq!(range.end(), day("2024-03-04"));
        assert_eq!(range.span_days(), 9);
    }

    #[test]
    fn start_change_near_upper_bound_shrinks_window() {
        let mut range = DateRange::new(day("2024-12-01"));
        range.on_start_changed(day("2024-09-28"));
        assert_eq!(range.end(), day("2024-10-01"));
        assert_eq!(range.span_days(), 4);
    }

    #[test]
    fn start_before_epoch_is_clamped() {
        let mut range = DateRange::new(day("2024-12-01"));
        range.on_start_changed(day("1990-01-01"));
        assert_eq!(range.start(), day("1995-06-16"));
        assert_eq!(range.end(), day("1995-06-24"));
    }

    #[test]
    fn end_is_clamped_to_bounds() {
        let mut range = DateRange::new(day("2024-12-01"));
        range.set_end(day("2030-01-01"));
        assert_eq!(range.end(), day("2024-10-01"));
    }

    #[test]
    fn parse_day_accepts_common_shapes() {
        assert_eq!(parse_day("2024-6-3"), Some(day("2024-06-03")));
        assert_eq!(
            parse_day("2024-06-03T23:30:00-05:00"),
            Some(day("2024-06-03"))
        );
        assert_eq!(
            parse_day("2024-06-04T00:30:00+09:00"),
            Some(day("2024-06-04"))
        );
        assert_eq!(parse_day(""), None);
        assert_eq!(parse_day("yesterday"), None);
        assert_eq!(parse_day("2024-02-30"), None);
    }
}
