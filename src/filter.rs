//! Row filtering for the dashboard view.
//!
//! Filters run in a fixed order: the inclusive date range first, then one
//! inclusion set per categorical field (segment, region, channel, product).
//! Every step works on the output of the previous one, so the steps AND
//! together. An empty selection for a field leaves that field unfiltered.

use std::collections::{BTreeMap, BTreeSet};

use anyhow::{Result, anyhow};
use chrono::{NaiveDate, NaiveDateTime};
use itertools::{Itertools, MinMaxResult};
use log::debug;

use crate::{
    data::{Value, parse_lenient_datetime},
    error::DashboardError,
    frame::Frame,
    mapping::StandardField,
};

/// Inclusive calendar-day range.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DateRange {
    pub start: NaiveDate,
    pub end: NaiveDate,
}

impl DateRange {
    pub fn new(start: NaiveDate, end: NaiveDate) -> Self {
        Self { start, end }
    }

    /// Both endpoints are required; a half-entered range means no filter yet.
    pub fn from_endpoints(start: Option<NaiveDate>, end: Option<NaiveDate>) -> Option<Self> {
        match (start, end) {
            (Some(start), Some(end)) => Some(Self::new(start, end)),
            (None, None) => None,
            _ => {
                debug!("Ignoring partial date range {start:?}..{end:?}");
                None
            }
        }
    }

    pub fn contains(&self, moment: &NaiveDateTime) -> bool {
        let day = moment.date();
        self.start <= day && day <= self.end
    }
}

/// The user's current filter choices.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct FilterSelection {
    pub date_range: Option<DateRange>,
    categories: BTreeMap<StandardField, BTreeSet<String>>,
}

impl FilterSelection {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_date_range(mut self, range: Option<DateRange>) -> Self {
        self.date_range = range;
        self
    }

    /// Adds `values` to the inclusion set for `field`.
    pub fn select<I, S>(&mut self, field: StandardField, values: I) -> Result<(), DashboardError>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        if !field.is_categorical() {
            return Err(DashboardError::NotCategorical(field.to_string()));
        }
        self.categories
            .entry(field)
            .or_default()
            .extend(values.into_iter().map(Into::into));
        Ok(())
    }

    pub fn selected(&self, field: StandardField) -> Option<&BTreeSet<String>> {
        self.categories.get(&field).filter(|set| !set.is_empty())
    }

    pub fn is_empty(&self) -> bool {
        self.date_range.is_none() && self.categories.values().all(BTreeSet::is_empty)
    }
}

/// Applies every active filter to `dataset`, returning a new view.
pub fn apply_filters(dataset: &Frame, selection: &FilterSelection) -> Frame {
    let mut view = match selection.date_range {
        Some(range) => apply_date_range(dataset, &range),
        None => dataset.clone(),
    };
    for field in StandardField::CATEGORICAL {
        if let Some(selected) = selection.selected(field) {
            view = apply_category(&view, field, selected);
        }
    }
    debug!("Filters kept {} of {} row(s)", view.len(), dataset.len());
    view
}

/// Rows whose `date` falls inside `range`; a table without `date` passes through.
pub fn apply_date_range(frame: &Frame, range: &DateRange) -> Frame {
    let Some(idx) = frame.column_index(StandardField::Date.as_str()) else {
        return frame.clone();
    };
    frame.filter_rows(|row| {
        row[idx]
            .as_ref()
            .and_then(Value::as_datetime)
            .is_some_and(|moment| range.contains(&moment))
    })
}

/// Rows whose `field` value is in `selected`. An empty set is the identity.
pub fn apply_category(frame: &Frame, field: StandardField, selected: &BTreeSet<String>) -> Frame {
    let Some(idx) = frame.column_index(field.as_str()) else {
        return frame.clone();
    };
    if selected.is_empty() {
        return frame.clone();
    }
    frame.filter_rows(|row| {
        row[idx]
            .as_ref()
            .is_some_and(|value| selected.contains(&value.as_display()))
    })
}

/// Sorted distinct non-missing values of `field` in the unfiltered dataset.
pub fn candidate_values(dataset: &Frame, field: StandardField) -> Vec<String> {
    let Some(cells) = dataset.column(field.as_str()) else {
        return Vec::new();
    };
    cells
        .flatten()
        .sorted()
        .dedup()
        .map(Value::as_display)
        .collect()
}

/// Earliest and latest `date` in the dataset, used as the default range.
pub fn date_bounds(dataset: &Frame) -> Option<(NaiveDate, NaiveDate)> {
    let cells = dataset.column(StandardField::Date.as_str())?;
    let days = cells
        .flatten()
        .filter_map(Value::as_datetime)
        .map(|dt| dt.date());
    match days.minmax() {
        MinMaxResult::NoElements => None,
        MinMaxResult::OneElement(day) => Some((day, day)),
        MinMaxResult::MinMax(first, last) => Some((first, last)),
    }
}

/// Parses a date given on the command line with the same rules as the data.
pub fn parse_date_arg(raw: &str) -> Result<NaiveDate> {
    parse_lenient_datetime(raw)
        .map(|dt| dt.date())
        .ok_or_else(|| anyhow!("Failed to parse '{raw}' as a date"))
}

/// Splits repeatable, comma-separated selections into a set of trimmed values.
pub fn parse_selection(raw: &[String]) -> BTreeSet<String> {
    raw.iter()
        .flat_map(|entry| entry.split(','))
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn dt(y: i32, m: u32, d: u32, h: u32) -> Option<Value> {
        Some(Value::DateTime(
            NaiveDate::from_ymd_opt(y, m, d)
                .unwrap()
                .and_hms_opt(h, 0, 0)
                .unwrap(),
        ))
    }

    fn text(s: &str) -> Option<Value> {
        Some(Value::Text(s.to_string()))
    }

    fn dataset() -> Frame {
        Frame::from_rows(
            vec!["date".into(), "region".into(), "channel".into()],
            vec![
                vec![dt(2024, 1, 1, 0), text("North"), text("Online")],
                vec![dt(2024, 1, 2, 9), text("South"), text("Store")],
                vec![dt(2024, 1, 3, 0), text("North"), text("Store")],
                vec![None, text("East"), None],
            ],
        )
        .unwrap()
    }

    fn day(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[test]
    fn date_range_is_inclusive_at_both_ends() {
        let range = DateRange::new(day(2024, 1, 1), day(2024, 1, 3));
        let view = apply_date_range(&dataset(), &range);
        assert_eq!(view.len(), 3);

        let single = DateRange::new(day(2024, 1, 2), day(2024, 1, 2));
        let view = apply_date_range(&dataset(), &single);
        assert_eq!(view.len(), 1);
        assert_eq!(view.rows()[0][1], text("South"));
    }

    #[test]
    fn partial_range_is_no_filter() {
        assert_eq!(DateRange::from_endpoints(Some(day(2024, 1, 1)), None), None);
        let selection = FilterSelection::new()
            .with_date_range(DateRange::from_endpoints(None, Some(day(2024, 1, 1))));
        assert_eq!(apply_filters(&dataset(), &selection), dataset());
    }

    #[test]
    fn empty_category_selection_is_identity() {
        let view = apply_category(&dataset(), StandardField::Region, &BTreeSet::new());
        assert_eq!(view, dataset());
    }

    #[test]
    fn category_selection_keeps_only_members() {
        let selected = BTreeSet::from(["North".to_string()]);
        let view = apply_category(&dataset(), StandardField::Region, &selected);
        assert_eq!(view.len(), 2);
        assert!(view.rows().iter().all(|row| row[1] == text("North")));
    }

    #[test]
    fn filters_compose_with_and() {
        let mut selection = FilterSelection::new()
            .with_date_range(Some(DateRange::new(day(2024, 1, 1), day(2024, 1, 2))));
        selection
            .select(StandardField::Channel, ["Store"])
            .unwrap();
        let view = apply_filters(&dataset(), &selection);
        assert_eq!(view.len(), 1);
        assert_eq!(view.rows()[0][1], text("South"));
    }

    #[test]
    fn selecting_a_numeric_field_is_rejected() {
        let mut selection = FilterSelection::new();
        assert!(selection.select(StandardField::Revenue, ["1"]).is_err());
        assert!(selection.is_empty());
    }

    #[test]
    fn candidates_come_from_the_unfiltered_dataset() {
        assert_eq!(
            candidate_values(&dataset(), StandardField::Region),
            vec!["East", "North", "South"]
        );
        assert_eq!(
            candidate_values(&dataset(), StandardField::Channel),
            vec!["Online", "Store"]
        );
        assert!(candidate_values(&dataset(), StandardField::Product).is_empty());
    }

    #[test]
    fn date_bounds_ignore_missing_dates() {
        assert_eq!(
            date_bounds(&dataset()),
            Some((day(2024, 1, 1), day(2024, 1, 3)))
        );
    }

    #[test]
    fn selection_arguments_split_on_commas() {
        let parsed = parse_selection(&["North, South".to_string(), "East,".to_string()]);
        assert_eq!(
            parsed.into_iter().collect::<Vec<_>>(),
            vec!["East", "North", "South"]
        );
        assert_eq!(parse_date_arg("2024-01-02").unwrap(), day(2024, 1, 2));
        assert!(parse_date_arg("soon").is_err());
    }
}
