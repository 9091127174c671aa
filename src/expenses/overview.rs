//! Per-category spending totals for a calendar window.
//!
//! The store does the grouping; this module owns the window arithmetic and
//! the percentage math so both the Postgres and in-memory stores agree.

use std::{cmp::Ordering, str::FromStr};

use serde::Serialize;
use sqlx::FromRow;
use thiserror::Error;
use time::{Date, Month, OffsetDateTime};

use super::dto::cents_to_display;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum OverviewError {
    #[error("Invalid period: {0}. Use today, month or year")]
    InvalidPeriod(String),

    #[error("Date is out of range")]
    OutOfRange,

    #[error("overview total does not fit in 64 bits")]
    TotalOverflow,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Period {
    Today,
    Month,
    Year,
}

impl FromStr for Period {
    type Err = OverviewError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "today" => Ok(Period::Today),
            "month" => Ok(Period::Month),
            "year" => Ok(Period::Year),
            other => Err(OverviewError::InvalidPeriod(other.to_string())),
        }
    }
}

/// Half-open `[start, end)` range in UTC.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Window {
    pub start: OffsetDateTime,
    pub end: OffsetDateTime,
}

impl Window {
    pub fn day(date: Date) -> Result<Self, OverviewError> {
        let end = date.next_day().ok_or(OverviewError::OutOfRange)?;
        Ok(Self::between(date, end))
    }

    #[cfg(test)]
    pub fn contains(&self, at: OffsetDateTime) -> bool {
        self.start <= at && at < self.end
    }

    fn between(start: Date, end: Date) -> Self {
        Self {
            start: start.midnight().assume_utc(),
            end: end.midnight().assume_utc(),
        }
    }
}

impl Period {
    pub fn window(self, date: Date) -> Result<Window, OverviewError> {
        match self {
            Period::Today => Window::day(date),
            Period::Month => {
                let start = first_of(date.year(), date.month())?;
                let (year, month) = match date.month() {
                    Month::December => (date.year() + 1, Month::January),
                    m => (date.year(), m.next()),
                };
                Ok(Window::between(start, first_of(year, month)?))
            }
            Period::Year => {
                let start = first_of(date.year(), Month::January)?;
                Ok(Window::between(start, first_of(date.year() + 1, Month::January)?))
            }
        }
    }
}

fn first_of(year: i32, month: Month) -> Result<Date, OverviewError> {
    Date::from_calendar_date(year, month, 1).map_err(|_| OverviewError::OutOfRange)
}

/// One grouped row as it comes out of the store. `total_amount` is in cents.
#[derive(Debug, Clone, PartialEq, Eq, FromRow)]
pub struct CategoryTotal {
    pub category_id: i64,
    pub category_name: String,
    pub total_amount: i64,
    pub count: i64,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CategoryOverview {
    pub category_id: i64,
    pub category_name: String,
    pub total_amount: f64,
    pub count: i64,
    pub percentage: f64,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct OverviewMeta {
    pub period: Period,
    /// cents
    pub total_amount: i64,
    pub total_count: i64,
}

#[derive(Debug, Clone, Serialize)]
pub struct Overview {
    pub data: Vec<CategoryOverview>,
    pub meta: OverviewMeta,
}

pub(crate) fn by_total_desc(a: &CategoryTotal, b: &CategoryTotal) -> Ordering {
    b.total_amount
        .cmp(&a.total_amount)
        .then(a.category_id.cmp(&b.category_id))
}

pub fn summarize(period: Period, mut rows: Vec<CategoryTotal>) -> Result<Overview, OverviewError> {
    rows.sort_by(by_total_desc);

    let mut total_amount: i64 = 0;
    let mut total_count: i64 = 0;
    for r in &rows {
        total_amount = total_amount
            .checked_add(r.total_amount)
            .ok_or(OverviewError::TotalOverflow)?;
        total_count = total_count
            .checked_add(r.count)
            .ok_or(OverviewError::TotalOverflow)?;
    }

    let data = rows
        .into_iter()
        .map(|r| {
            let percentage = if total_amount > 0 {
                r.total_amount as f64 / total_amount as f64 * 100.0
            } else {
                0.0
            };
            CategoryOverview {
                category_id: r.category_id,
                category_name: r.category_name,
                total_amount: cents_to_display(r.total_amount),
                count: r.count,
                percentage,
            }
        })
        .collect();

    Ok(Overview {
        data,
        meta: OverviewMeta {
            period,
            total_amount,
            total_count,
        },
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use time::macros::{date, datetime};

    fn row(id: i64, name: &str, cents: i64, count: i64) -> CategoryTotal {
        CategoryTotal {
            category_id: id,
            category_name: name.into(),
            total_amount: cents,
            count,
        }
    }

    #[test]
    fn parses_known_periods_only() {
        assert_eq!("today".parse::<Period>(), Ok(Period::Today));
        assert_eq!("month".parse::<Period>(), Ok(Period::Month));
        assert_eq!("year".parse::<Period>(), Ok(Period::Year));
        assert_eq!(
            "week".parse::<Period>(),
            Err(OverviewError::InvalidPeriod("week".into()))
        );
        assert!("Today".parse::<Period>().is_err());
    }

    #[test]
    fn windows_are_half_open_utc() {
        let w = Period::Today.window(date!(2024 - 03 - 15)).unwrap();
        assert_eq!(w.start, datetime!(2024-03-15 0:00 UTC));
        assert_eq!(w.end, datetime!(2024-03-16 0:00 UTC));
        assert!(w.contains(datetime!(2024-03-15 23:59:59 UTC)));
        assert!(!w.contains(datetime!(2024-03-16 0:00 UTC)));

        let w = Period::Month.window(date!(2024 - 12 - 31)).unwrap();
        assert_eq!(w.start, datetime!(2024-12-01 0:00 UTC));
        assert_eq!(w.end, datetime!(2025-01-01 0:00 UTC));

        let w = Period::Month.window(date!(2024 - 02 - 10)).unwrap();
        assert_eq!(w.end, datetime!(2024-03-01 0:00 UTC));

        let w = Period::Year.window(date!(2024 - 07 - 04)).unwrap();
        assert_eq!(w.start, datetime!(2024-01-01 0:00 UTC));
        assert_eq!(w.end, datetime!(2025-01-01 0:00 UTC));
    }

    #[test]
    fn two_categories_split_by_share() {
        let overview = summarize(
            Period::Month,
            vec![row(2, "Transport", 500, 1), row(1, "Food", 6000, 3)],
        )
        .unwrap();

        assert_eq!(overview.meta.total_amount, 6500);
        assert_eq!(overview.meta.total_count, 4);
        assert_eq!(overview.meta.period, Period::Month);

        let food = &overview.data[0];
        assert_eq!(food.category_id, 1);
        assert_eq!(food.total_amount, 60.0);
        assert_eq!(food.count, 3);
        assert!((food.percentage - 92.3077).abs() < 1e-3);

        let transport = &overview.data[1];
        assert_eq!(transport.total_amount, 5.0);
        assert!((transport.percentage - 7.6923).abs() < 1e-3);
    }

    #[test]
    fn ties_order_by_category_id() {
        let overview = summarize(
            Period::Today,
            vec![row(9, "B", 100, 1), row(3, "A", 100, 2)],
        )
        .unwrap();
        let ids: Vec<i64> = overview.data.iter().map(|c| c.category_id).collect();
        assert_eq!(ids, vec![3, 9]);
    }

    #[test]
    fn no_expenses_gives_empty_overview() {
        let overview = summarize(Period::Year, Vec::new()).unwrap();
        assert!(overview.data.is_empty());
        assert_eq!(overview.meta.total_amount, 0);
        assert_eq!(overview.meta.total_count, 0);
    }

    #[test]
    fn zero_total_keeps_percentage_at_zero() {
        let overview = summarize(Period::Today, vec![row(1, "Free", 0, 2)]).unwrap();
        assert_eq!(overview.data[0].percentage, 0.0);
        assert_eq!(overview.meta.total_count, 2);
    }

    #[test]
    fn total_overflow_is_an_error() {
        let half = i64::MAX / 2 + 1;
        let err = summarize(Period::Year, vec![row(1, "A", half, 1), row(2, "B", half, 1)])
            .unwrap_err();
        assert_eq!(err, OverviewError::TotalOverflow);
    }
}
