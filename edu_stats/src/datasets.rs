/*!
Typed records for each of the classroom datasets.

Every dataset is a CSV file keyed by country. The builders here go through
[crate::shape] for the numeric columns, so the same rules apply everywhere:
blank keys are dropped and bad cells become missing values.
*/

use log::{debug, warn};
use serde::Serialize;
use std::cmp::Ordering;
use std::collections::{BTreeMap, HashSet};

use crate::clock::ClockSchedule;
use crate::config::{DuplicateKeyPolicy, ShapeError, SortOrder};
use crate::score::FieldLookup;
use crate::shaper::{coerce_number, row_key, shape, FieldSpec};
use crate::table::RawTable;

pub const SPIDER_KEY: &str = "Country Name";
pub const SPIDER_CODE: &str = "Country Code";
pub const COUNTRY: &str = "country";

/// Records keyed by a country name.
pub trait CountryKeyed {
    fn country(&self) -> &str;
}

/// Keeps the records of the selected countries. An empty selection keeps everything.
pub fn filter_countries<T: CountryKeyed>(records: Vec<T>, selected: &[String]) -> Vec<T> {
    if selected.is_empty() {
        return records;
    }
    let selected: HashSet<&str> = selected.iter().map(|s| s.as_str()).collect();
    records
        .into_iter()
        .filter(|r| selected.contains(r.country()))
        .collect()
}

// ******** Spider (radar) statistics *********

#[derive(PartialEq, Debug, Clone, Serialize)]
pub struct SpiderStats {
    pub country: String,
    pub code: Option<String>,
    pub stats: BTreeMap<String, Option<f64>>,
}

#[derive(PartialEq, Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SpiderDataset {
    /// The stat columns, in file order.
    pub stat_columns: Vec<String>,
    pub countries: Vec<SpiderStats>,
}

/// Every column other than the country name and code is a stat.
pub fn spider_stats(
    table: &RawTable,
    countries: Option<&[String]>,
    duplicates: DuplicateKeyPolicy,
) -> Result<SpiderDataset, ShapeError> {
    let mut spec =
        FieldSpec::all_columns_except(table, SPIDER_KEY, &[SPIDER_CODE]).duplicates(duplicates);
    if let Some(allowed) = countries {
        spec = spec.allow(allowed);
    }
    let stat_columns: Vec<String> = spec.fields.iter().map(|(n, _)| n.clone()).collect();
    let shaped = shape(table, &spec)?;

    // The code is text, so it is read from the rows directly, from the same
    // row as the stats.
    let mut codes: BTreeMap<String, Option<String>> = BTreeMap::new();
    for row in table.rows() {
        let key = match row_key(&row, SPIDER_KEY) {
            Some(k) => k,
            None => continue,
        };
        let code = row
            .get(SPIDER_CODE)
            .filter(|c| !c.is_empty())
            .map(|c| c.to_string());
        match duplicates {
            DuplicateKeyPolicy::KeepFirst => {
                codes.entry(key).or_insert(code);
            }
            // A repeated key already failed the shaping under `Reject`.
            DuplicateKeyPolicy::LastWriteWins | DuplicateKeyPolicy::Reject => {
                codes.insert(key, code);
            }
        }
    }

    let countries = shaped
        .into_records()
        .into_iter()
        .map(|r| SpiderStats {
            code: codes.get(&r.key).cloned().flatten(),
            country: r.key,
            stats: r.fields,
        })
        .collect();
    Ok(SpiderDataset {
        stat_columns,
        countries,
    })
}

impl CountryKeyed for SpiderStats {
    fn country(&self) -> &str {
        &self.country
    }
}

// ******** Well-being metrics (histogram) *********

#[derive(Eq, PartialEq, Debug, Clone, Copy, Serialize)]
pub enum WellbeingMetric {
    #[serde(rename = "BELONG")]
    Belong,
    #[serde(rename = "BULLIED")]
    Bullied,
    #[serde(rename = "FEELSAFE")]
    FeelSafe,
}

impl WellbeingMetric {
    pub const ALL: [WellbeingMetric; 3] = [
        WellbeingMetric::Belong,
        WellbeingMetric::Bullied,
        WellbeingMetric::FeelSafe,
    ];

    pub fn column(&self) -> &'static str {
        match self {
            WellbeingMetric::Belong => "BELONG",
            WellbeingMetric::Bullied => "BULLIED",
            WellbeingMetric::FeelSafe => "FEELSAFE",
        }
    }

    pub fn from_column(name: &str) -> Option<WellbeingMetric> {
        WellbeingMetric::ALL
            .iter()
            .copied()
            .find(|m| m.column() == name)
    }
}

#[derive(PartialEq, Debug, Clone, Serialize)]
pub struct WellbeingMetrics {
    pub country: String,
    #[serde(rename = "BELONG")]
    pub belong: Option<f64>,
    #[serde(rename = "BULLIED")]
    pub bullied: Option<f64>,
    #[serde(rename = "FEELSAFE")]
    pub feelsafe: Option<f64>,
}

impl WellbeingMetrics {
    pub fn metric(&self, metric: WellbeingMetric) -> Option<f64> {
        match metric {
            WellbeingMetric::Belong => self.belong,
            WellbeingMetric::Bullied => self.bullied,
            WellbeingMetric::FeelSafe => self.feelsafe,
        }
    }
}

impl CountryKeyed for WellbeingMetrics {
    fn country(&self) -> &str {
        &self.country
    }
}

pub fn wellbeing_metrics(
    table: &RawTable,
    duplicates: DuplicateKeyPolicy,
) -> Result<Vec<WellbeingMetrics>, ShapeError> {
    let columns: Vec<&str> = WellbeingMetric::ALL.iter().map(|m| m.column()).collect();
    let spec = FieldSpec::new(COUNTRY)
        .same_name_fields(&columns)
        .duplicates(duplicates);
    Ok(shape(table, &spec)?
        .iter()
        .map(|r| WellbeingMetrics {
            country: r.key.clone(),
            belong: r.get("BELONG"),
            bullied: r.get("BULLIED"),
            feelsafe: r.get("FEELSAFE"),
        })
        .collect())
}

/// Sorts by one metric. Missing values always go last, whatever the order.
/// The sort is stable.
pub fn sort_wellbeing(records: &mut [WellbeingMetrics], metric: WellbeingMetric, order: SortOrder) {
    records.sort_by(|a, b| match (a.metric(metric), b.metric(metric)) {
        (None, None) => Ordering::Equal,
        (None, Some(_)) => Ordering::Greater,
        (Some(_), None) => Ordering::Less,
        (Some(x), Some(y)) => match order {
            SortOrder::Ascending => x.total_cmp(&y),
            SortOrder::Descending => y.total_cmp(&x),
        },
    });
}

// ******** Socioeconomic statistics *********

#[derive(PartialEq, Debug, Clone, Serialize)]
pub struct SocioeconomicStats {
    pub country: String,
    #[serde(rename = "ESCS")]
    pub escs: Option<f64>,
    #[serde(rename = "HISCED")]
    pub hisced: Option<f64>,
    #[serde(rename = "HISEI")]
    pub hisei: Option<f64>,
    /// Average math score of the bottom ESCS quartile.
    #[serde(rename = "lowEscsMath")]
    pub low_escs_math: Option<f64>,
    /// Average math score of the top ESCS quartile.
    #[serde(rename = "highEscsMath")]
    pub high_escs_math: Option<f64>,
}

impl SocioeconomicStats {
    /// The math score gap between the top and bottom ESCS quartiles.
    pub fn resource_gap(&self) -> Option<f64> {
        Some(self.high_escs_math? - self.low_escs_math?)
    }
}

impl CountryKeyed for SocioeconomicStats {
    fn country(&self) -> &str {
        &self.country
    }
}

pub fn socioeconomic_stats(
    table: &RawTable,
    duplicates: DuplicateKeyPolicy,
) -> Result<Vec<SocioeconomicStats>, ShapeError> {
    let spec = FieldSpec::new(COUNTRY)
        .same_name_fields(&["ESCS", "HISCED", "HISEI", "low_escs_math", "high_escs_math"])
        .duplicates(duplicates);
    Ok(shape(table, &spec)?
        .iter()
        .map(|r| SocioeconomicStats {
            country: r.key.clone(),
            escs: r.get("ESCS"),
            hisced: r.get("HISCED"),
            hisei: r.get("HISEI"),
            low_escs_math: r.get("low_escs_math"),
            high_escs_math: r.get("high_escs_math"),
        })
        .collect())
}

// ******** Country education summary (report cards) *********

pub const SUMMARY_FIELDS: [&str; 7] = [
    "math_score",
    "ESCS",
    "HISEI",
    "HISCED",
    "sense_of_belonging",
    "bullying",
    "feeling_safe",
];

#[derive(PartialEq, Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CountryEducationStats {
    pub country: String,
    pub math_score: Option<f64>,
    #[serde(rename = "ESCS")]
    pub escs: Option<f64>,
    #[serde(rename = "HISEI")]
    pub hisei: Option<f64>,
    #[serde(rename = "HISCED")]
    pub hisced: Option<f64>,
    pub sense_of_belonging: Option<f64>,
    pub bullying: Option<f64>,
    pub feeling_safe: Option<f64>,
}

impl CountryKeyed for CountryEducationStats {
    fn country(&self) -> &str {
        &self.country
    }
}

impl FieldLookup for CountryEducationStats {
    fn key(&self) -> &str {
        &self.country
    }

    fn value(&self, field: &str) -> Option<f64> {
        match field {
            "math_score" => self.math_score,
            "ESCS" => self.escs,
            "HISEI" => self.hisei,
            "HISCED" => self.hisced,
            "sense_of_belonging" => self.sense_of_belonging,
            "bullying" => self.bullying,
            "feeling_safe" => self.feeling_safe,
            _ => None,
        }
    }
}

pub fn country_summaries(
    table: &RawTable,
    duplicates: DuplicateKeyPolicy,
) -> Result<Vec<CountryEducationStats>, ShapeError> {
    let spec = FieldSpec::new(COUNTRY)
        .same_name_fields(&SUMMARY_FIELDS)
        .duplicates(duplicates);
    Ok(shape(table, &spec)?
        .iter()
        .map(|r| CountryEducationStats {
            country: r.key.clone(),
            math_score: r.get("math_score"),
            escs: r.get("ESCS"),
            hisei: r.get("HISEI"),
            hisced: r.get("HISCED"),
            sense_of_belonging: r.get("sense_of_belonging"),
            bullying: r.get("bullying"),
            feeling_safe: r.get("feeling_safe"),
        })
        .collect())
}

// ******** Country facts (slide deck) *********

#[derive(Eq, PartialEq, Debug, Clone, Serialize)]
pub struct CountryFact {
    pub country: String,
    pub ranking: u32,
    pub fact1: String,
    pub fact2: String,
    pub fact3: String,
}

impl CountryKeyed for CountryFact {
    fn country(&self) -> &str {
        &self.country
    }
}

/// Reads the ranked facts, best ranking first.
///
/// Rows without a country or without a whole, non-negative ranking are dropped.
pub fn country_facts(table: &RawTable) -> Result<Vec<CountryFact>, ShapeError> {
    if !table.has_column(COUNTRY) {
        return Err(ShapeError::MissingKeyColumn {
            column: COUNTRY.to_string(),
        });
    }
    let mut res: Vec<CountryFact> = Vec::new();
    for (idx, row) in table.rows().enumerate() {
        let country = match row_key(&row, COUNTRY) {
            Some(c) => c,
            None => continue,
        };
        let ranking = match coerce_number(row.get("ranking")) {
            Some(r) if r >= 0.0 && r.fract() == 0.0 && r <= u32::MAX as f64 => r as u32,
            x => {
                debug!("country_facts: row {}: dropping {:?} (ranking {:?})", idx, country, x);
                continue;
            }
        };
        let text = |c: &str| row.get(c).unwrap_or("").to_string();
        res.push(CountryFact {
            country,
            ranking,
            fact1: text("fact1"),
            fact2: text("fact2"),
            fact3: text("fact3"),
        });
    }
    res.sort_by(|a, b| a.ranking.cmp(&b.ranking).then_with(|| a.country.cmp(&b.country)));
    Ok(res)
}

// ******** School day schedules (clock) *********

/// Separator between the sessions of one day, as in `7;13`.
pub const SESSION_SEPARATOR: char = ';';

fn parse_times(raw: Option<&str>) -> Option<Vec<f64>> {
    let raw = raw?.trim();
    if raw.is_empty() {
        return Some(vec![]);
    }
    raw.split(SESSION_SEPARATOR)
        .map(|s| coerce_number(Some(s)))
        .collect()
}

/// Reads one schedule per country.
///
/// Columns: `country`, `start_time`, `end_time` (session lists), and
/// optionally `cram_school_start_time`, `cram_school_end_time`. Rows with an
/// unreadable session list are dropped. The first row wins for a repeated country.
pub fn clock_schedules(table: &RawTable) -> Result<Vec<ClockSchedule>, ShapeError> {
    if !table.has_column(COUNTRY) {
        return Err(ShapeError::MissingKeyColumn {
            column: COUNTRY.to_string(),
        });
    }
    let mut seen: HashSet<String> = HashSet::new();
    let mut res: Vec<ClockSchedule> = Vec::new();
    for (idx, row) in table.rows().enumerate() {
        let country = match row_key(&row, COUNTRY) {
            Some(c) => c,
            None => continue,
        };
        let (start_time, end_time) = match (
            parse_times(row.get("start_time")),
            parse_times(row.get("end_time")),
        ) {
            (Some(s), Some(e)) => (s, e),
            _ => {
                warn!("clock_schedules: row {}: unreadable sessions for {:?}", idx, country);
                continue;
            }
        };
        if !seen.insert(country.clone()) {
            warn!("clock_schedules: row {}: {:?} seen again, ignoring", idx, country);
            continue;
        }
        res.push(ClockSchedule {
            country,
            start_time,
            end_time,
            cram_school_start_time: coerce_number(row.get("cram_school_start_time")),
            cram_school_end_time: coerce_number(row.get("cram_school_end_time")),
        });
    }
    Ok(res)
}

impl CountryKeyed for ClockSchedule {
    fn country(&self) -> &str {
        &self.country
    }
}
