use log::{debug, warn};
use serde::Serialize;
use std::collections::{BTreeMap, HashMap, HashSet};

use crate::config::{DuplicateKeyPolicy, ShapeError};
use crate::table::{RawTable, RowView};

/// Declares how a raw table maps to entity records.
///
/// ```
/// use edu_stats::{parse, shape, FieldSpec};
///
/// let table = parse("country,math_score,bullying\nFinland,520,-0.4\nUSA,,-0.3")?;
/// let spec = FieldSpec::new("country").same_name_fields(&["math_score", "bullying"]);
/// let entities = shape(&table, &spec)?;
/// assert_eq!(entities.get("Finland").and_then(|e| e.get("math_score")), Some(520.0));
/// assert_eq!(entities.get("USA").and_then(|e| e.get("math_score")), None);
/// # Ok::<(), Box<dyn std::error::Error>>(())
/// ```
#[derive(Eq, PartialEq, Debug, Clone)]
pub struct FieldSpec {
    pub key_column: String,
    /// (field name, source column)
    pub fields: Vec<(String, String)>,
    pub allow_list: Option<Vec<String>>,
    pub duplicates: DuplicateKeyPolicy,
}

impl FieldSpec {
    pub fn new(key_column: &str) -> FieldSpec {
        FieldSpec {
            key_column: key_column.to_string(),
            fields: Vec::new(),
            allow_list: None,
            duplicates: DuplicateKeyPolicy::default(),
        }
    }

    pub fn field(mut self, name: &str, column: &str) -> FieldSpec {
        self.fields.push((name.to_string(), column.to_string()));
        self
    }

    /// Adds numeric fields named after their source column.
    pub fn same_name_fields(mut self, columns: &[&str]) -> FieldSpec {
        for c in columns {
            self.fields.push((c.to_string(), c.to_string()));
        }
        self
    }

    /// Only keeps the rows whose key is in the list.
    pub fn allow(mut self, keys: &[String]) -> FieldSpec {
        self.allow_list = Some(keys.to_vec());
        self
    }

    pub fn duplicates(mut self, policy: DuplicateKeyPolicy) -> FieldSpec {
        self.duplicates = policy;
        self
    }

    /// Declares every header other than the key and the excluded columns
    /// as a numeric field, in header order.
    pub fn all_columns_except(table: &RawTable, key_column: &str, excluded: &[&str]) -> FieldSpec {
        let columns: Vec<&str> = table
            .headers()
            .iter()
            .map(|h| h.as_str())
            .filter(|h| *h != key_column && !excluded.contains(h))
            .collect();
        FieldSpec::new(key_column).same_name_fields(&columns)
    }
}

/// One entity with its named numeric fields. None marks a missing value.
#[derive(PartialEq, Debug, Clone, Serialize)]
pub struct EntityRecord {
    pub key: String,
    pub fields: BTreeMap<String, Option<f64>>,
}

impl EntityRecord {
    /// The value of a field, None if missing or not declared.
    pub fn get(&self, field: &str) -> Option<f64> {
        self.fields.get(field).copied().flatten()
    }
}

/// Entity records with unique keys, in order of first appearance.
#[derive(PartialEq, Debug, Clone, Default)]
pub struct EntityTable {
    records: Vec<EntityRecord>,
    index: HashMap<String, usize>,
}

impl EntityTable {
    pub fn get(&self, key: &str) -> Option<&EntityRecord> {
        self.index.get(key).map(|idx| &self.records[*idx])
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &EntityRecord> {
        self.records.iter()
    }

    pub fn keys(&self) -> Vec<&str> {
        self.records.iter().map(|r| r.key.as_str()).collect()
    }

    pub fn into_records(self) -> Vec<EntityRecord> {
        self.records
    }

    // Returns true if the record was stored.
    fn insert(&mut self, record: EntityRecord, policy: DuplicateKeyPolicy) -> Result<bool, ShapeError> {
        match (self.index.get(&record.key).copied(), policy) {
            (None, _) => {
                self.index.insert(record.key.clone(), self.records.len());
                self.records.push(record);
                Ok(true)
            }
            (Some(idx), DuplicateKeyPolicy::LastWriteWins) => {
                warn!("shape: key {:?} seen again, replacing the earlier row", record.key);
                self.records[idx] = record;
                Ok(true)
            }
            (Some(_), DuplicateKeyPolicy::KeepFirst) => {
                warn!("shape: key {:?} seen again, keeping the earlier row", record.key);
                Ok(false)
            }
            (Some(_), DuplicateKeyPolicy::Reject) => Err(ShapeError::DuplicateKey {
                key: record.key,
            }),
        }
    }
}

/// Reads a cell as a number.
///
/// Absent, empty and unparseable cells are missing. Infinities and NaN are
/// missing too.
pub fn coerce_number(raw: Option<&str>) -> Option<f64> {
    let s = raw?.trim();
    if s.is_empty() {
        return None;
    }
    s.parse::<f64>().ok().filter(|x| x.is_finite())
}

/// The trimmed entity key of a row, None when it is blank.
pub fn row_key(row: &RowView<'_>, key_column: &str) -> Option<String> {
    row.get(key_column)
        .map(|s| s.trim())
        .filter(|s| !s.is_empty())
        .map(|s| s.to_string())
}

/// Turns raw rows into entity records as declared by the [FieldSpec].
///
/// Rows with a blank key, or a key outside the allow-list, are dropped.
/// Cells are coerced with [coerce_number], which never fails.
pub fn shape(table: &RawTable, spec: &FieldSpec) -> Result<EntityTable, ShapeError> {
    if !table.has_column(&spec.key_column) {
        return Err(ShapeError::MissingKeyColumn {
            column: spec.key_column.clone(),
        });
    }
    let allowed: Option<HashSet<&str>> = spec
        .allow_list
        .as_ref()
        .map(|l| l.iter().map(|s| s.as_str()).collect());

    let mut res = EntityTable::default();
    for (idx, row) in table.rows().enumerate() {
        let key = match row_key(&row, &spec.key_column) {
            Some(k) => k,
            None => {
                debug!("shape: row {}: blank key, skipping", idx);
                continue;
            }
        };
        if let Some(allowed) = &allowed {
            if !allowed.contains(key.as_str()) {
                debug!("shape: row {}: key {:?} not in the allow-list", idx, key);
                continue;
            }
        }
        let fields: BTreeMap<String, Option<f64>> = spec
            .fields
            .iter()
            .map(|(name, column)| (name.clone(), coerce_number(row.get(column))))
            .collect();
        res.insert(EntityRecord { key, fields }, spec.duplicates)?;
    }
    debug!("shape: {} entities from {} rows", res.len(), table.len());
    Ok(res)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::table::parse;

    const EXAMPLE: &str = "country,math_score,bullying\nFinland,520,-0.4\nUSA,,-0.3\n";

    fn init_logs() {
        let _ = env_logger::builder().is_test(true).try_init();
    }

    fn example_spec() -> FieldSpec {
        FieldSpec::new("country").same_name_fields(&["math_score", "bullying"])
    }

    #[test]
    fn end_to_end_example() {
        let res = shape(&parse(EXAMPLE).unwrap(), &example_spec()).unwrap();
        assert_eq!(res.keys(), vec!["Finland", "USA"]);
        let fin = res.get("Finland").unwrap();
        assert_eq!(fin.fields.get("math_score"), Some(&Some(520.0)));
        assert_eq!(fin.fields.get("bullying"), Some(&Some(-0.4)));
        let usa = res.get("USA").unwrap();
        assert_eq!(usa.fields.get("math_score"), Some(&None));
        assert_eq!(usa.fields.get("bullying"), Some(&Some(-0.3)));
    }

    #[test]
    fn shaping_twice_gives_the_same_result() {
        let a = shape(&parse(EXAMPLE).unwrap(), &example_spec()).unwrap();
        let b = shape(&parse(EXAMPLE).unwrap(), &example_spec()).unwrap();
        assert_eq!(a, b);
    }

    #[test]
    fn coercion() {
        assert_eq!(coerce_number(None), None);
        assert_eq!(coerce_number(Some("")), None);
        assert_eq!(coerce_number(Some("  ")), None);
        assert_eq!(coerce_number(Some("abc")), None);
        assert_eq!(coerce_number(Some("NaN")), None);
        assert_eq!(coerce_number(Some("inf")), None);
        assert_eq!(coerce_number(Some(" 1.5 ")), Some(1.5));
        assert_eq!(coerce_number(Some("-2e1")), Some(-20.0));
    }

    #[test]
    fn bad_cells_and_absent_columns_are_missing() {
        let t = parse("country,math_score\nJapan,n/a").unwrap();
        let spec = FieldSpec::new("country")
            .field("math", "math_score")
            .field("escs", "ESCS");
        let res = shape(&t, &spec).unwrap();
        let jp = res.get("Japan").unwrap();
        assert_eq!(jp.get("math"), None);
        assert_eq!(jp.fields.get("escs"), Some(&None));
        assert!(jp.fields.values().all(|v| v.map_or(true, |x| !x.is_nan())));
    }

    #[test]
    fn blank_keys_are_skipped() {
        let t = parse("country,x\n,1\n  ,2\nBrazil,3").unwrap();
        let res = shape(&t, &FieldSpec::new("country").same_name_fields(&["x"])).unwrap();
        assert_eq!(res.keys(), vec!["Brazil"]);
    }

    #[test]
    fn missing_key_column() {
        let t = parse("name,x\nBrazil,3").unwrap();
        let err = shape(&t, &FieldSpec::new("country")).unwrap_err();
        assert_eq!(
            err,
            ShapeError::MissingKeyColumn {
                column: "country".to_string()
            }
        );
    }

    #[test]
    fn allow_list_filters() {
        let t = parse("country,x\nBrazil,3\nJapan,4\nChile,5").unwrap();
        let spec = FieldSpec::new("country")
            .same_name_fields(&["x"])
            .allow(&["Japan".to_string(), "Brazil".to_string()]);
        let res = shape(&t, &spec).unwrap();
        assert_eq!(res.keys(), vec!["Brazil", "Japan"]);
    }

    #[test]
    fn duplicate_policies() {
        init_logs();
        let t = parse("country,x\nJapan,1\nBrazil,2\nJapan,3").unwrap();
        let spec = FieldSpec::new("country").same_name_fields(&["x"]);

        let last = shape(&t, &spec).unwrap();
        assert_eq!(last.keys(), vec!["Japan", "Brazil"]);
        assert_eq!(last.get("Japan").unwrap().get("x"), Some(3.0));

        let first = shape(&t, &spec.clone().duplicates(DuplicateKeyPolicy::KeepFirst)).unwrap();
        assert_eq!(first.get("Japan").unwrap().get("x"), Some(1.0));

        let err = shape(&t, &spec.duplicates(DuplicateKeyPolicy::Reject)).unwrap_err();
        assert_eq!(
            err,
            ShapeError::DuplicateKey {
                key: "Japan".to_string()
            }
        );
    }

    #[test]
    fn dynamic_columns() {
        let t = parse("Country Name,Country Code,Reading,Math\nFinland,FIN,1,2").unwrap();
        let spec = FieldSpec::all_columns_except(&t, "Country Name", &["Country Code"]);
        let names: Vec<&str> = spec.fields.iter().map(|(n, _)| n.as_str()).collect();
        assert_eq!(names, vec!["Reading", "Math"]);
    }
}
