//! Standard fields and the synonym table used to find them in arbitrary exports.
//!
//! The [`MappingTable`] lists, per [`StandardField`], the source column names
//! that may carry it. [`map_columns`] renames the first matching source column
//! of each field (case-insensitive, synonyms tried in order) and records the
//! outcome in a [`ColumnMapping`].
//!
//! Fields are processed in declaration order. When a later field's winning
//! synonym names a column an earlier field already claimed, the earlier field
//! keeps it and the clash is reported as a [`MappingConflict`].

use std::{
    collections::{BTreeMap, HashMap},
    fmt,
    fs,
    path::Path,
    str::FromStr,
};

use anyhow::{Context, Result};
use log::{debug, warn};
use serde::{Deserialize, Serialize};

use crate::{
    error::{DashboardError, DashboardResult},
    frame::Frame,
};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StandardField {
    Date,
    Segment,
    Region,
    Channel,
    Product,
    Orders,
    Units,
    Gmv,
    Revenue,
    Cost,
    Customers,
}

impl StandardField {
    pub const ALL: [StandardField; 11] = [
        StandardField::Date,
        StandardField::Segment,
        StandardField::Region,
        StandardField::Channel,
        StandardField::Product,
        StandardField::Orders,
        StandardField::Units,
        StandardField::Gmv,
        StandardField::Revenue,
        StandardField::Cost,
        StandardField::Customers,
    ];

    pub const NUMERIC: [StandardField; 6] = [
        StandardField::Orders,
        StandardField::Units,
        StandardField::Gmv,
        StandardField::Revenue,
        StandardField::Cost,
        StandardField::Customers,
    ];

    /// Filterable dimensions, in the order filters are applied.
    pub const CATEGORICAL: [StandardField; 4] = [
        StandardField::Segment,
        StandardField::Region,
        StandardField::Channel,
        StandardField::Product,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            StandardField::Date => "date",
            StandardField::Segment => "segment",
            StandardField::Region => "region",
            StandardField::Channel => "channel",
            StandardField::Product => "product",
            StandardField::Orders => "orders",
            StandardField::Units => "units",
            StandardField::Gmv => "gmv",
            StandardField::Revenue => "revenue",
            StandardField::Cost => "cost",
            StandardField::Customers => "customers",
        }
    }

    pub fn is_numeric(self) -> bool {
        Self::NUMERIC.contains(&self)
    }

    pub fn is_categorical(self) -> bool {
        Self::CATEGORICAL.contains(&self)
    }

    fn default_synonyms(self) -> &'static [&'static str] {
        match self {
            StandardField::Date => &["date", "Date", "txn_date"],
            StandardField::Segment => &["segment", "customer_segment"],
            StandardField::Region => &["region", "state", "zone"],
            StandardField::Channel => &["channel", "sales_channel"],
            StandardField::Product => &["product", "sku", "item_name"],
            StandardField::Orders => &["orders", "order_count"],
            StandardField::Units => &["units", "qty", "quantity"],
            StandardField::Gmv => &["gmv", "gross_sales", "sales_value"],
            StandardField::Revenue => &["revenue", "net_sales"],
            StandardField::Cost => &["cost", "cogs", "expenses"],
            StandardField::Customers => &["customers", "unique_customers", "active_users"],
        }
    }
}

impl fmt::Display for StandardField {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for StandardField {
    type Err = DashboardError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let wanted = s.trim();
        StandardField::ALL
            .into_iter()
            .find(|field| field.as_str().eq_ignore_ascii_case(wanted))
            .ok_or_else(|| DashboardError::UnknownField(wanted.to_string()))
    }
}

/// Standard field → ordered synonyms. Serialized as a JSON object.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct MappingTable {
    synonyms: BTreeMap<StandardField, Vec<String>>,
}

impl Default for MappingTable {
    fn default() -> Self {
        let synonyms = StandardField::ALL
            .into_iter()
            .map(|field| {
                let names = field
                    .default_synonyms()
                    .iter()
                    .map(|s| s.to_string())
                    .collect();
                (field, names)
            })
            .collect();
        Self { synonyms }
    }
}

impl MappingTable {
    pub fn empty() -> Self {
        Self {
            synonyms: BTreeMap::new(),
        }
    }

    pub fn synonyms(&self, field: StandardField) -> &[String] {
        self.synonyms.get(&field).map(Vec::as_slice).unwrap_or(&[])
    }

    pub fn set_synonyms<I, S>(&mut self, field: StandardField, names: I)
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.synonyms
            .insert(field, names.into_iter().map(Into::into).collect());
    }

    pub fn iter(&self) -> impl Iterator<Item = (StandardField, &[String])> + '_ {
        self.synonyms
            .iter()
            .map(|(field, names)| (*field, names.as_slice()))
    }

    /// Parses a mapping document. Keys that are not standard fields are
    /// skipped with a warning; fields left out have no synonyms.
    pub fn from_json_str(raw: &str) -> DashboardResult<Self> {
        let parsed: BTreeMap<String, Vec<String>> = serde_json::from_str(raw)
            .map_err(|err| DashboardError::InvalidMapping(err.to_string()))?;
        let mut table = Self::empty();
        for (key, names) in parsed {
            match key.parse::<StandardField>() {
                Ok(field) => table.set_synonyms(field, names),
                Err(_) => warn!("Ignoring mapping entry for unknown field '{key}'"),
            }
        }
        Ok(table)
    }

    pub fn to_json_string(&self) -> Result<String> {
        serde_json::to_string_pretty(self).context("Serializing mapping JSON")
    }

    pub fn load(path: &Path) -> Result<Self> {
        let raw = fs::read_to_string(path)
            .with_context(|| format!("Opening mapping file {path:?}"))?;
        let table = Self::from_json_str(&raw)
            .with_context(|| format!("Parsing mapping file {path:?}"))?;
        Ok(table)
    }

    pub fn save(&self, path: &Path) -> Result<()> {
        let json = self.to_json_string()?;
        fs::write(path, json + "\n").with_context(|| format!("Writing mapping file {path:?}"))
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MappingConflict {
    pub source: String,
    pub kept: StandardField,
    pub dropped: StandardField,
}

impl fmt::Display for MappingConflict {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "Column '{}' matches both {} and {}; kept {}",
            self.source, self.kept, self.dropped, self.kept
        )
    }
}

/// Which source column, if any, satisfied each standard field.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ColumnMapping {
    pub assignments: BTreeMap<StandardField, Option<String>>,
    pub conflicts: Vec<MappingConflict>,
}

impl ColumnMapping {
    pub fn source_for(&self, field: StandardField) -> Option<&str> {
        self.assignments.get(&field).and_then(|s| s.as_deref())
    }

    pub fn mapped_count(&self) -> usize {
        self.assignments.values().filter(|s| s.is_some()).count()
    }
}

/// Renames matched source columns to their standard field names. Columns
/// nobody claims pass through unchanged and keep their position.
pub fn map_columns(mut frame: Frame, mapping: &MappingTable) -> (Frame, ColumnMapping) {
    // Lower-cased name → first column carrying it.
    let mut lookup: HashMap<String, usize> = HashMap::new();
    for (idx, name) in frame.columns().iter().enumerate() {
        lookup.entry(name.to_lowercase()).or_insert(idx);
    }

    let mut outcome = ColumnMapping::default();
    let mut claimed: BTreeMap<usize, StandardField> = BTreeMap::new();
    for field in StandardField::ALL {
        let hit = mapping
            .synonyms(field)
            .iter()
            .find_map(|candidate| lookup.get(&candidate.to_lowercase()).copied());
        let assigned = match hit {
            Some(idx) => match claimed.get(&idx) {
                Some(owner) => {
                    let conflict = MappingConflict {
                        source: frame.columns()[idx].clone(),
                        kept: *owner,
                        dropped: field,
                    };
                    warn!("{conflict}");
                    outcome.conflicts.push(conflict);
                    None
                }
                None => {
                    claimed.insert(idx, field);
                    Some(frame.columns()[idx].clone())
                }
            },
            None => None,
        };
        outcome.assignments.insert(field, assigned);
    }

    for (idx, field) in &claimed {
        let target = field.as_str();
        let shadowed = frame
            .columns()
            .iter()
            .enumerate()
            .filter(|(other, name)| !claimed.contains_key(other) && name.as_str() == target)
            .map(|(other, _)| other)
            .collect::<Vec<_>>();
        for other in shadowed {
            let renamed = free_column_name(frame.columns(), target);
            warn!(
                "Unmapped column '{target}' renamed to '{renamed}'; {field} is read from '{}'",
                frame.columns()[*idx]
            );
            frame.rename_column(other, &renamed);
        }
        frame.rename_column(*idx, target);
    }
    debug!(
        "Mapped {} of {} standard field(s)",
        outcome.mapped_count(),
        StandardField::ALL.len()
    );
    (frame, outcome)
}

/// First `<base>.N` not already used by `columns`.
fn free_column_name(columns: &[String], base: &str) -> String {
    (1..)
        .map(|n| format!("{base}.{n}"))
        .find(|name| !columns.contains(name))
        .unwrap_or_else(|| base.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::Value;

    fn frame_with(columns: &[&str]) -> Frame {
        let row = columns
            .iter()
            .map(|c| Some(Value::Text(format!("{c}-value"))))
            .collect();
        Frame::from_rows(columns.iter().map(|c| c.to_string()).collect(), vec![row]).unwrap()
    }

    #[test]
    fn synonyms_match_case_insensitively() {
        let table = MappingTable::from_json_str(r#"{"region": ["region", "state"]}"#).unwrap();
        let (mapped, outcome) = map_columns(frame_with(&["State", "Notes"]), &table);
        assert_eq!(mapped.columns(), ["region", "Notes"]);
        assert_eq!(outcome.source_for(StandardField::Region), Some("State"));
        assert_eq!(outcome.source_for(StandardField::Date), None);
    }

    #[test]
    fn first_listed_synonym_wins() {
        let (mapped, outcome) = map_columns(
            frame_with(&["Zone", "State"]),
            &MappingTable::default(),
        );
        assert_eq!(outcome.source_for(StandardField::Region), Some("State"));
        assert_eq!(mapped.columns(), ["Zone", "region"]);
    }

    #[test]
    fn default_mapping_standardizes_common_export() {
        let (mapped, _) = map_columns(
            frame_with(&["Date", "Region", "Sales_Value", "Qty"]),
            &MappingTable::default(),
        );
        assert_eq!(mapped.columns(), ["date", "region", "gmv", "units"]);
    }

    #[test]
    fn remapping_a_standardized_table_is_identity() {
        let (once, _) = map_columns(
            frame_with(&["Date", "SKU", "Net_Sales", "COGS", "extra"]),
            &MappingTable::default(),
        );
        let (twice, _) = map_columns(once.clone(), &MappingTable::default());
        assert_eq!(once, twice);
    }

    #[test]
    fn colliding_fields_keep_the_first_declared() {
        let mut table = MappingTable::default();
        table.set_synonyms(StandardField::Revenue, ["sales_value"]);
        let (mapped, outcome) = map_columns(frame_with(&["Sales_Value"]), &table);
        assert_eq!(mapped.columns(), ["gmv"]);
        assert_eq!(outcome.source_for(StandardField::Gmv), Some("Sales_Value"));
        assert_eq!(outcome.source_for(StandardField::Revenue), None);
        assert_eq!(
            outcome.conflicts,
            vec![MappingConflict {
                source: "Sales_Value".into(),
                kept: StandardField::Gmv,
                dropped: StandardField::Revenue,
            }]
        );
    }

    #[test]
    fn unlisted_column_with_a_standard_name_is_moved_aside() {
        let table = MappingTable::from_json_str(r#"{"revenue": ["net_sales"]}"#).unwrap();
        let (mapped, outcome) = map_columns(frame_with(&["revenue", "Net_Sales"]), &table);
        assert_eq!(mapped.columns(), ["revenue.1", "revenue"]);
        assert_eq!(mapped.column_index("revenue"), Some(1));
        assert_eq!(outcome.source_for(StandardField::Revenue), Some("Net_Sales"));
        assert!(outcome.conflicts.is_empty());
    }

    #[test]
    fn zero_matches_is_not_an_error() {
        let (mapped, outcome) = map_columns(frame_with(&["foo"]), &MappingTable::default());
        assert_eq!(mapped.columns(), ["foo"]);
        assert_eq!(outcome.mapped_count(), 0);
    }

    #[test]
    fn mapping_json_round_trips_and_rejects_malformed_input() {
        let table = MappingTable::default();
        let json = table.to_json_string().unwrap();
        assert!(json.starts_with("{\n  \"date\""));
        assert_eq!(MappingTable::from_json_str(&json).unwrap(), table);
        assert!(matches!(
            MappingTable::from_json_str("{not json"),
            Err(DashboardError::InvalidMapping(_))
        ));
    }

    #[test]
    fn unknown_mapping_keys_are_ignored() {
        let table =
            MappingTable::from_json_str(r#"{"profit": ["margin"], "cost": ["spend"]}"#).unwrap();
        assert_eq!(table.synonyms(StandardField::Cost), ["spend"]);
        assert_eq!(table.iter().count(), 1);
    }

    #[test]
    fn field_names_parse_case_insensitively() {
        assert_eq!("GMV".parse::<StandardField>().unwrap(), StandardField::Gmv);
        assert!("profit".parse::<StandardField>().is_err());
        assert!(StandardField::Region.is_categorical());
        assert!(!StandardField::Date.is_numeric());
    }
}
