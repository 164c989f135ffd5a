//! Advisory data-quality checks. Nothing here blocks the pipeline; callers
//! print the issues and carry on.

use std::fmt;

use serde::Serialize;

use crate::{
    frame::Frame,
    mapping::{ColumnMapping, MappingConflict, StandardField},
};

const MISSING_THRESHOLD: f64 = 0.5;

#[derive(Debug, Clone, PartialEq)]
pub enum Issue {
    MissingDate,
    MissingSales,
    HighMissingness { column: String, fraction: f64 },
    MappingConflict(MappingConflict),
}

impl fmt::Display for Issue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Issue::MissingDate => f.write_str("Missing required column: date"),
            Issue::MissingSales => f.write_str("Need at least one of: revenue or gmv"),
            Issue::HighMissingness { column, .. } => {
                write!(f, "Column '{column}' has >50% missing values")
            }
            Issue::MappingConflict(conflict) => write!(f, "{conflict}"),
        }
    }
}

impl Serialize for Issue {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

/// Checks the dataset for structural problems, in a fixed order: required
/// columns, then per-column missingness, then mapping conflicts.
pub fn validate(frame: &Frame, mapping: Option<&ColumnMapping>) -> Vec<Issue> {
    let mut issues = Vec::new();
    if !frame.has_column(StandardField::Date.as_str()) {
        issues.push(Issue::MissingDate);
    }
    if !frame.has_column(StandardField::Revenue.as_str())
        && !frame.has_column(StandardField::Gmv.as_str())
    {
        issues.push(Issue::MissingSales);
    }
    for (idx, column) in frame.columns().iter().enumerate() {
        if let Some(fraction) = frame.missing_fraction(idx)
            && fraction > MISSING_THRESHOLD
        {
            issues.push(Issue::HighMissingness {
                column: column.clone(),
                fraction,
            });
        }
    }
    if let Some(mapping) = mapping {
        issues.extend(mapping.conflicts.iter().cloned().map(Issue::MappingConflict));
    }
    issues
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::Value;

    fn messages(issues: &[Issue]) -> Vec<String> {
        issues.iter().map(ToString::to_string).collect()
    }

    #[test]
    fn reports_missing_required_columns() {
        let frame = Frame::new(vec!["region".into()]);
        assert_eq!(
            messages(&validate(&frame, None)),
            vec![
                "Missing required column: date",
                "Need at least one of: revenue or gmv"
            ]
        );
    }

    #[test]
    fn gmv_alone_satisfies_the_sales_requirement() {
        let frame = Frame::new(vec!["date".into(), "gmv".into()]);
        assert!(validate(&frame, None).is_empty());
    }

    #[test]
    fn flags_columns_more_than_half_missing() {
        let frame = Frame::from_rows(
            vec!["date".into(), "revenue".into(), "cost".into()],
            vec![
                vec![None, Some(Value::Number(1.0)), None],
                vec![None, None, Some(Value::Number(2.0))],
                vec![Some(Value::Text("x".into())), Some(Value::Number(3.0)), None],
            ],
        )
        .unwrap();
        // revenue is exactly one third missing, date and cost two thirds.
        assert_eq!(
            messages(&validate(&frame, None)),
            vec![
                "Column 'date' has >50% missing values",
                "Column 'cost' has >50% missing values"
            ]
        );
    }

    #[test]
    fn exactly_half_missing_is_not_flagged() {
        let frame = Frame::from_rows(
            vec!["date".into(), "gmv".into()],
            vec![
                vec![None, Some(Value::Number(1.0))],
                vec![Some(Value::Text("d".into())), Some(Value::Number(1.0))],
            ],
        )
        .unwrap();
        assert!(validate(&frame, None).is_empty());
    }

    #[test]
    fn mapping_conflicts_become_issues() {
        let mapping = ColumnMapping {
            assignments: Default::default(),
            conflicts: vec![MappingConflict {
                source: "Sales".into(),
                kept: StandardField::Gmv,
                dropped: StandardField::Revenue,
            }],
        };
        let frame = Frame::new(vec!["date".into(), "gmv".into()]);
        assert_eq!(
            messages(&validate(&frame, Some(&mapping))),
            vec!["Column 'Sales' matches both gmv and revenue; kept gmv"]
        );
    }
}
