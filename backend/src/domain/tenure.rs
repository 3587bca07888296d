//! Human-readable tenure derived from a start date.

use chrono::{Datelike, NaiveDate};

use super::StartDate;

const MONTHS_IN_YEAR: i32 = 12;
const NEW_STARTER: &str = "New starter";

/// Describe the time between `start` and `today`.
///
/// Returns an empty string for future or unknown start dates, `New starter`
/// for less than a whole month, and otherwise `N year(s), M month(s)` with
/// zero components omitted.
///
/// # Examples
/// ```
/// use chrono::NaiveDate;
/// use org_directory::domain::{describe_tenure, StartDate};
///
/// let today = NaiveDate::from_ymd_opt(2023, 3, 20).expect("valid date");
/// assert_eq!(describe_tenure(StartDate::parse("2020-01-15"), today), "3 years, 2 months");
/// ```
#[must_use]
pub fn describe_tenure(start: StartDate, today: NaiveDate) -> String {
    let Some(start) = start.to_naive_date() else {
        return String::new();
    };
    if start > today {
        return String::new();
    }

    let mut years = today.year() - start.year();
    let mut months = month_index(today) - month_index(start);
    if today.day() < start.day() {
        months -= 1;
    }
    if months < 0 {
        years -= 1;
        months += MONTHS_IN_YEAR;
    }

    if years == 0 && months == 0 {
        return NEW_STARTER.to_owned();
    }

    let parts = [(years, "year"), (months, "month")]
        .into_iter()
        .filter(|(count, _)| *count > 0)
        .map(|(count, unit)| {
            let plural = if count == 1 { "" } else { "s" };
            format!("{count} {unit}{plural}")
        })
        .collect::<Vec<_>>();
    parts.join(", ")
}

fn month_index(date: NaiveDate) -> i32 {
    i32::try_from(date.month0()).unwrap_or_default()
}
