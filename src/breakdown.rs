//! Grouped aggregates behind the dashboard charts and the report tables.

use std::collections::BTreeMap;

use serde::Serialize;

use crate::{
    data::{Value, format_amount},
    frame::Frame,
    kpi::sales_field,
    mapping::StandardField,
};

/// Rows kept per breakdown on screen.
pub const SCREEN_TOP_N: usize = 10;
/// Rows kept per breakdown in the exported deck.
pub const REPORT_TOP_N: usize = 5;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AggregateRow {
    pub key: Value,
    pub total: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Aggregate {
    pub dimension: StandardField,
    pub metric: StandardField,
    pub rows: Vec<AggregateRow>,
}

impl Aggregate {
    pub fn headers(&self) -> Vec<String> {
        vec![self.dimension.to_string(), self.metric.to_string()]
    }

    pub fn display_rows(&self) -> Vec<Vec<String>> {
        self.rows
            .iter()
            .map(|row| vec![row.key.as_display(), format_amount(row.total)])
            .collect()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }
}

/// Sums `metric` per distinct value of `dimension`. Rows missing the key are
/// skipped; a missing metric cell counts as zero.
fn group_sums(frame: &Frame, dimension: StandardField, metric: StandardField) -> Option<BTreeMap<Value, f64>> {
    let key_idx = frame.column_index(dimension.as_str())?;
    let metric_idx = frame.column_index(metric.as_str())?;
    let mut totals = BTreeMap::new();
    for row in frame.rows() {
        let Some(key) = &row[key_idx] else {
            continue;
        };
        let amount = row[metric_idx].as_ref().and_then(Value::as_number).unwrap_or(0.0);
        *totals.entry(key.clone()).or_insert(0.0) += amount;
    }
    Some(totals)
}

/// Metric per date, ascending by date.
pub fn time_series(frame: &Frame, metric: StandardField) -> Option<Aggregate> {
    let totals = group_sums(frame, StandardField::Date, metric)?;
    Some(Aggregate {
        dimension: StandardField::Date,
        metric,
        rows: totals
            .into_iter()
            .map(|(key, total)| AggregateRow { key, total })
            .collect(),
    })
}

/// Sales metric per date; `None` without a date or sales column.
pub fn sales_over_time(frame: &Frame) -> Option<Aggregate> {
    time_series(frame, sales_field(frame)?)
}

pub fn orders_over_time(frame: &Frame) -> Option<Aggregate> {
    time_series(frame, StandardField::Orders)
}

/// Top `top` groups of `dimension` by `metric`, largest first. Equal totals
/// are ordered by key so the output is deterministic.
pub fn breakdown(
    frame: &Frame,
    dimension: StandardField,
    metric: StandardField,
    top: usize,
) -> Option<Aggregate> {
    let totals = group_sums(frame, dimension, metric)?;
    let mut rows = totals
        .into_iter()
        .map(|(key, total)| AggregateRow { key, total })
        .collect::<Vec<_>>();
    // BTreeMap iteration already yields ascending keys; a stable sort keeps
    // that order among equal totals.
    rows.sort_by(|a, b| b.total.total_cmp(&a.total));
    rows.truncate(top);
    Some(Aggregate {
        dimension,
        metric,
        rows,
    })
}

/// Every chart the dashboard draws for one filtered view.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct ChartSet {
    pub sales_over_time: Option<Aggregate>,
    pub orders_over_time: Option<Aggregate>,
    pub breakdowns: Vec<Aggregate>,
}

pub fn build_charts(frame: &Frame, top: usize) -> ChartSet {
    let metric = sales_field(frame);
    let breakdowns = match metric {
        Some(metric) => StandardField::CATEGORICAL
            .into_iter()
            .filter_map(|dimension| breakdown(frame, dimension, metric, top))
            .collect(),
        None => Vec::new(),
    };
    ChartSet {
        sales_over_time: sales_over_time(frame),
        orders_over_time: orders_over_time(frame),
        breakdowns,
    }
}

impl ChartSet {
    pub fn breakdown_for(&self, dimension: StandardField) -> Option<&Aggregate> {
        self.breakdowns.iter().find(|agg| agg.dimension == dimension)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    fn text(s: &str) -> Option<Value> {
        Some(Value::Text(s.to_string()))
    }

    fn num(n: f64) -> Option<Value> {
        Some(Value::Number(n))
    }

    fn day(d: u32) -> Option<Value> {
        Some(Value::DateTime(
            NaiveDate::from_ymd_opt(2024, 3, d)
                .unwrap()
                .and_hms_opt(0, 0, 0)
                .unwrap(),
        ))
    }

    fn frame() -> Frame {
        Frame::from_rows(
            vec!["date".into(), "region".into(), "orders".into(), "gmv".into()],
            vec![
                vec![day(2), text("North"), num(2.0), num(50.0)],
                vec![day(1), text("South"), num(1.0), num(80.0)],
                vec![day(2), text("East"), num(4.0), num(30.0)],
                vec![day(1), text("North"), None, num(30.0)],
                vec![day(3), None, num(1.0), num(999.0)],
                vec![day(3), text("West"), num(1.0), None],
            ],
        )
        .unwrap()
    }

    #[test]
    fn breakdown_sorts_descending_with_key_tie_break() {
        let agg = breakdown(&frame(), StandardField::Region, StandardField::Gmv, 10).unwrap();
        let keys = agg
            .rows
            .iter()
            .map(|r| (r.key.as_display(), r.total))
            .collect::<Vec<_>>();
        assert_eq!(
            keys,
            vec![
                ("North".to_string(), 80.0),
                ("South".to_string(), 80.0),
                ("East".to_string(), 30.0),
                ("West".to_string(), 0.0),
            ]
        );
    }

    #[test]
    fn breakdown_truncates_to_top_n() {
        let agg = breakdown(&frame(), StandardField::Region, StandardField::Gmv, 2).unwrap();
        assert_eq!(agg.rows.len(), 2);
        assert!(breakdown(&frame(), StandardField::Channel, StandardField::Gmv, 2).is_none());
    }

    #[test]
    fn time_series_is_ascending_by_date() {
        let series = sales_over_time(&frame()).unwrap();
        let totals = series.rows.iter().map(|r| r.total).collect::<Vec<_>>();
        assert_eq!(totals, vec![110.0, 80.0, 999.0]);
        assert_eq!(series.rows[0].key, day(1).unwrap());

        let orders = orders_over_time(&frame()).unwrap();
        assert_eq!(
            orders.rows.iter().map(|r| r.total).collect::<Vec<_>>(),
            vec![1.0, 6.0, 2.0]
        );
    }

    #[test]
    fn charts_use_revenue_when_present() {
        let frame = Frame::from_rows(
            vec!["channel".into(), "gmv".into(), "revenue".into()],
            vec![
                vec![text("Online"), num(100.0), num(10.0)],
                vec![text("Store"), num(1.0), num(20.0)],
            ],
        )
        .unwrap();
        let charts = build_charts(&frame, SCREEN_TOP_N);
        assert!(charts.sales_over_time.is_none());
        let channels = charts.breakdown_for(StandardField::Channel).unwrap();
        assert_eq!(channels.metric, StandardField::Revenue);
        assert_eq!(channels.rows[0].key, Value::Text("Store".into()));
        assert!(charts.breakdown_for(StandardField::Region).is_none());
    }

    #[test]
    fn numeric_keys_group_signed_zeros_together() {
        let frame = Frame::from_rows(
            vec!["product".into(), "gmv".into()],
            vec![
                vec![num(0.0), num(5.0)],
                vec![num(-0.0), num(7.0)],
                vec![num(1.0), num(2.0)],
            ],
        )
        .unwrap();
        let agg = breakdown(&frame, StandardField::Product, StandardField::Gmv, 10).unwrap();
        let totals = agg.rows.iter().map(|r| r.total).collect::<Vec<_>>();
        assert_eq!(totals, vec![12.0, 2.0]);
    }

    #[test]
    fn display_rows_format_amounts() {
        let agg = breakdown(&frame(), StandardField::Region, StandardField::Gmv, 1).unwrap();
        assert_eq!(agg.headers(), vec!["region", "gmv"]);
        assert_eq!(agg.display_rows(), vec![vec!["North".to_string(), "80".to_string()]]);
    }
}
