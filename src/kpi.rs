//! Headline metrics for a filtered view.
//!
//! A [`KpiSet`] is recomputed from scratch for every view. Absent columns
//! contribute zero to the sum-based metrics, while `Customers` and the margin
//! pair stay unknown when their inputs are missing.

use std::collections::HashSet;

use serde::Serialize;

use crate::{
    data::{Value, format_thousands},
    frame::Frame,
    mapping::StandardField,
};

pub const PLACEHOLDER: &str = "—";

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct Margin {
    pub gross_margin: f64,
    pub gm_percent: f64,
    /// Sales summed to exactly zero and were replaced by 1 for the ratio.
    pub zero_sales_guard: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct KpiSet {
    pub revenue: f64,
    pub orders: f64,
    pub units: f64,
    pub customers: Option<usize>,
    pub margin: Option<Margin>,
}

/// The sales column metrics are computed from: `revenue`, else `gmv`.
pub fn sales_field(frame: &Frame) -> Option<StandardField> {
    [StandardField::Revenue, StandardField::Gmv]
        .into_iter()
        .find(|field| frame.has_column(field.as_str()))
}

impl KpiSet {
    pub fn compute(frame: &Frame) -> Self {
        let sales = sales_field(frame);
        let sales_total = sales.and_then(|f| frame.sum(f.as_str()));
        let margin = match (sales_total, frame.sum(StandardField::Cost.as_str())) {
            (Some(sales_total), Some(cost_total)) => Some(margin(sales_total, cost_total)),
            _ => None,
        };
        KpiSet {
            revenue: sales_total.unwrap_or(0.0),
            orders: frame.sum(StandardField::Orders.as_str()).unwrap_or(0.0),
            units: frame.sum(StandardField::Units.as_str()).unwrap_or(0.0),
            customers: distinct_count(frame, StandardField::Customers),
            margin,
        }
    }

    /// Metric lookup by display name.
    pub fn get(&self, name: &str) -> Option<f64> {
        match name {
            "Revenue" => Some(self.revenue),
            "Orders" => Some(self.orders),
            "Units" => Some(self.units),
            "Customers" => self.customers.map(|c| c as f64),
            "Gross Margin" => self.margin.map(|m| m.gross_margin),
            "GM %" => self.margin.map(|m| m.gm_percent),
            _ => None,
        }
    }

    /// `(name, rendered value)` pairs for the dashboard's KPI strip.
    pub fn display_rows(&self) -> Vec<(&'static str, String)> {
        vec![
            ("Revenue", format_thousands(self.revenue)),
            ("Orders", format_thousands(self.orders)),
            ("Units", format_thousands(self.units)),
            (
                "Customers",
                self.customers
                    .map(|c| format_thousands(c as f64))
                    .unwrap_or_else(|| PLACEHOLDER.to_string()),
            ),
            (
                "Gross Margin",
                self.margin
                    .map(|m| format_thousands(m.gross_margin))
                    .unwrap_or_else(|| PLACEHOLDER.to_string()),
            ),
            ("GM %", self.gm_percent_label()),
        ]
    }

    pub fn gm_percent_label(&self) -> String {
        match self.margin {
            Some(m) if m.zero_sales_guard => format!("{:.2}% (zero sales)", m.gm_percent),
            Some(m) => format!("{:.2}%", m.gm_percent),
            None => PLACEHOLDER.to_string(),
        }
    }
}

fn margin(sales_total: f64, cost_total: f64) -> Margin {
    let zero_sales_guard = sales_total == 0.0;
    let denominator = if zero_sales_guard { 1.0 } else { sales_total };
    Margin {
        gross_margin: sales_total - cost_total,
        gm_percent: round2(100.0 * (1.0 - cost_total / denominator)),
        zero_sales_guard,
    }
}

fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}

fn distinct_count(frame: &Frame, field: StandardField) -> Option<usize> {
    let cells = frame.column(field.as_str())?;
    let mut seen = HashSet::new();
    for value in cells.flatten() {
        let key = match value {
            // +0.0 and -0.0 are the same customer count.
            Value::Number(n) if *n == 0.0 => 0f64.to_bits().to_string(),
            Value::Number(n) => n.to_bits().to_string(),
            other => other.as_display(),
        };
        seen.insert(key);
    }
    Some(seen.len())
}
