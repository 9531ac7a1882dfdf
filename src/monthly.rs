//! Monthly totals of controlling time

use std::{collections::BTreeMap, fmt::Display};

use chrono::{Datelike, Days, Months, NaiveDate};
use thiserror::Error;

use crate::sessions::AtcSession;

/// A calendar month, represented by its first day.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Month(NaiveDate);

impl Month {
    /// The month `date` falls in.
    pub fn containing(date: NaiveDate) -> Self {
        Self(date - Days::new(u64::from(date.day0())))
    }

    pub fn first_day(self) -> NaiveDate {
        self.0
    }

    /// The month after this one.
    pub fn succ(self) -> Self {
        Self(self.0 + Months::new(1))
    }
}

impl Display for Month {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        self.0.format("%Y-%m").fmt(f)
    }
}

/// Hours controlled within one month.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct MonthlyTotal {
    pub month: Month,
    pub total_hours: f64,
}

/// Returned when asking for the busiest month of someone who never controlled.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Error)]
#[error("no months with ATC activity")]
pub struct NoActivity;

/// Controlling hours per month, ascending by month. Months without sessions are absent.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct MonthlyTotals {
    /// Invariant: strictly ascending by `month`
    months: Vec<MonthlyTotal>,
}

impl MonthlyTotals {
    pub fn iter(&self) -> impl Iterator<Item = &MonthlyTotal> {
        self.months.iter()
    }

    pub fn is_empty(&self) -> bool {
        self.months.is_empty()
    }

    /// Sum over all months.
    pub fn total_hours(&self) -> f64 {
        self.months.iter().map(|month| month.total_hours).sum()
    }

    /// The month with the most hours. The earliest one wins a tie.
    pub fn peak(&self) -> Result<MonthlyTotal, NoActivity> {
        self.months
            .iter()
            .copied()
            .reduce(|best, month| {
                if month.total_hours > best.total_hours {
                    month
                } else {
                    best
                }
            })
            .ok_or(NoActivity)
    }
}

impl FromIterator<AtcSession> for MonthlyTotals {
    fn from_iter<T: IntoIterator<Item = AtcSession>>(sessions: T) -> Self {
        let mut by_month = BTreeMap::<Month, f64>::new();
        for session in sessions {
            *by_month
                .entry(Month::containing(session.start.date_naive()))
                .or_default() += session.duration_hours;
        }

        Self {
            months: by_month
                .into_iter()
                .map(|(month, total_hours)| MonthlyTotal { month, total_hours })
                .collect(),
        }
    }
}
