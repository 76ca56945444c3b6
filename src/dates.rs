use chrono::{Datelike, Days, Duration, Local, NaiveDate, Timelike};

pub fn format_date(date: NaiveDate) -> String {
    date.format("%m/%d/%Y").to_string()
}

pub fn format_date_range(start: NaiveDate, end: NaiveDate) -> String {
    format!("{} - {}", format_date(start), format_date(end))
}

pub fn format_time(hour: u32, minute: u32) -> String {
    let (display_hour, suffix) = match hour {
        0 => (12, "AM"),
        1..=11 => (hour, "AM"),
        12 => (12, "PM"),
        _ => (hour - 12, "PM"),
    };

    format!("{display_hour:02}:{minute:02} {suffix}")
}

pub fn format_clock(datetime: &chrono::DateTime<Local>) -> String {
    format_time(datetime.hour(), datetime.minute())
}

/// Sunday through Saturday of the week containing `today`.
pub fn current_week(today: NaiveDate) -> (NaiveDate, NaiveDate) {
    let back = i64::from(today.weekday().num_days_from_sunday());
    let start = today - Duration::days(back);

    (start, start + Duration::days(6))
}

pub fn last_two_weeks(today: NaiveDate) -> (NaiveDate, NaiveDate) {
    (today - Duration::days(14), today)
}

/// Fiscal year and quarter (1-4) for a date given the fiscal year start.
/// `start_month` is 1-based.
pub fn fiscal_quarter(date: NaiveDate, start_month: u32, start_day: u32) -> (i32, u32) {
    let mut fiscal_year = date.year();
    if date.month() < start_month || (date.month() == start_month && date.day() < start_day) {
        fiscal_year -= 1;
    }

    let mut months_after_start = date.month() as i32 - start_month as i32;
    if months_after_start < 0 {
        months_after_start += 12;
    }

    (fiscal_year, (months_after_start / 3) as u32 + 1)
}

pub fn fiscal_quarter_label(
    date: NaiveDate,
    start_month: u32,
    start_day: u32,
    format: &str,
) -> String {
    let (fiscal_year, quarter) = fiscal_quarter(date, start_month, start_day);

    let fy = match format {
        "FY-YYYY" => format!("FY-{fiscal_year}"),
        "FYXX" => format!("FY{:02}", fiscal_year.rem_euclid(100)),
        _ => format!("FY-{:02}", fiscal_year.rem_euclid(100)),
    };

    format!("{fy}-Q{quarter}")
}

/// First and last day of the fiscal quarter containing `date`.
pub fn fiscal_quarter_range(
    date: NaiveDate,
    start_month: u32,
    start_day: u32,
) -> (NaiveDate, NaiveDate) {
    let (fiscal_year, quarter) = fiscal_quarter(date, start_month, start_day);

    let start = quarter_start(fiscal_year, start_month, start_day, quarter);
    let end = quarter_start(fiscal_year, start_month, start_day, quarter + 1) - Duration::days(1);

    (start, end)
}

fn quarter_start(fiscal_year: i32, start_month: u32, start_day: u32, quarter: u32) -> NaiveDate {
    let months_from_start = (start_month as i32 - 1) + (quarter as i32 - 1) * 3;
    let year = fiscal_year + months_from_start.div_euclid(12);
    let month = months_from_start.rem_euclid(12) as u32 + 1;

    clamped_date(year, month, start_day)
}

// Falls back to the last day of the month when `day` overflows it.
fn clamped_date(year: i32, month: u32, day: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(year, month, day.max(1)).unwrap_or_else(|| {
        let first = NaiveDate::from_ymd_opt(year, month, 1)
            .unwrap_or_else(|| NaiveDate::from_ymd_opt(year, 1, 1).unwrap_or_default());
        let next_month = first
            .checked_add_days(Days::new(31))
            .unwrap_or(first)
            .with_day(1)
            .unwrap_or(first);

        next_month - Duration::days(1)
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn date(year: i32, month: u32, day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(year, month, day).expect("valid date")
    }

    #[test]
    fn formats_dates_as_mm_dd_yyyy() {
        assert_eq!(format_date(date(2024, 1, 1)), "01/01/2024");
        assert_eq!(
            format_date_range(date(2024, 1, 1), date(2024, 1, 14)),
            "01/01/2024 - 01/14/2024"
        );
    }

    #[test]
    fn formats_twelve_hour_clock() {
        assert_eq!(format_time(0, 5), "12:05 AM");
        assert_eq!(format_time(9, 30), "09:30 AM");
        assert_eq!(format_time(12, 0), "12:00 PM");
        assert_eq!(format_time(17, 45), "05:45 PM");
    }

    #[test]
    fn current_week_runs_sunday_through_saturday() {
        // 2026-08-19 is a Wednesday.
        let (start, end) = current_week(date(2026, 8, 19));
        assert_eq!(start, date(2026, 8, 16));
        assert_eq!(end, date(2026, 8, 22));

        // A Sunday is its own week start.
        let (start, end) = current_week(date(2026, 8, 16));
        assert_eq!(start, date(2026, 8, 16));
        assert_eq!(end, date(2026, 8, 22));
    }

    #[test]
    fn last_two_weeks_ends_today() {
        let (start, end) = last_two_weeks(date(2026, 8, 19));
        assert_eq!(start, date(2026, 8, 5));
        assert_eq!(end, date(2026, 8, 19));
    }

    #[test]
    fn fiscal_quarter_with_january_start() {
        assert_eq!(fiscal_quarter(date(2026, 1, 1), 1, 1), (2026, 1));
        assert_eq!(fiscal_quarter(date(2026, 3, 31), 1, 1), (2026, 1));
        assert_eq!(fiscal_quarter(date(2026, 4, 1), 1, 1), (2026, 2));
        assert_eq!(fiscal_quarter(date(2026, 12, 31), 1, 1), (2026, 4));
    }

    #[test]
    fn fiscal_quarter_with_february_start() {
        // Before the fiscal year starts, the previous fiscal year applies.
        assert_eq!(fiscal_quarter(date(2026, 1, 15), 2, 1), (2025, 4));
        assert_eq!(fiscal_quarter(date(2026, 2, 1), 2, 1), (2026, 1));
        assert_eq!(fiscal_quarter(date(2027, 1, 31), 2, 1), (2026, 4));
    }

    #[test]
    fn fiscal_label_formats() {
        let day = date(2026, 8, 19);
        assert_eq!(fiscal_quarter_label(day, 1, 1, "FY-YY"), "FY-26-Q3");
        assert_eq!(fiscal_quarter_label(day, 1, 1, "FY-YYYY"), "FY-2026-Q3");
        assert_eq!(fiscal_quarter_label(day, 1, 1, "FYXX"), "FY26-Q3");
    }

    #[test]
    fn quarter_range_covers_three_months() {
        let (start, end) = fiscal_quarter_range(date(2026, 8, 19), 1, 1);
        assert_eq!(start, date(2026, 7, 1));
        assert_eq!(end, date(2026, 9, 30));

        // Fiscal year crossing a calendar year boundary.
        let (start, end) = fiscal_quarter_range(date(2027, 1, 15), 2, 1);
        assert_eq!(start, date(2026, 11, 1));
        assert_eq!(end, date(2027, 1, 31));
    }

    #[test]
    fn quarter_start_day_clamps_to_month_length() {
        // Fiscal year starting Jan 31: Q2 starts in April, which has 30 days.
        let (start, _) = fiscal_quarter_range(date(2026, 5, 10), 1, 31);
        assert_eq!(start, date(2026, 4, 30));
    }
}
