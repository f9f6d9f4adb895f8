// Reading the CSV datasets from disk.

use std::fs;
use std::path::Path;

use edu_stats::datasets::*;
use serde::Serialize;

use crate::classroom::*;

/// Reads a whole CSV file into a table.
pub fn read_table(path: &Path) -> ClassroomResult<RawTable> {
    let path_s = path.display().to_string();
    let text = fs::read_to_string(path).context(OpeningFileSnafu { path: &path_s })?;
    let table = parse(&text).context(ParsingCsvSnafu { path: &path_s })?;
    debug!(
        "read_table: {:?}: {} columns, {} rows",
        path_s,
        table.headers().len(),
        table.len()
    );
    Ok(table)
}

/// A clock schedule with its breakdown, or no breakdown when the schedule is invalid.
#[derive(PartialEq, Debug, Clone, Serialize)]
pub struct ClockEntry {
    #[serde(flatten)]
    pub schedule: ClockSchedule,
    pub breakdown: Option<DayBreakdown>,
}

/// All the datasets loaded at start. Kinds that are not configured stay empty.
#[derive(PartialEq, Debug, Clone, Default)]
pub struct Datasets {
    pub spider: Option<SpiderDataset>,
    pub wellbeing: Option<Vec<WellbeingMetrics>>,
    pub socioeconomic: Option<Vec<SocioeconomicStats>>,
    pub summary: Option<Vec<CountryEducationStats>>,
    pub facts: Option<Vec<CountryFact>>,
    pub clock: Option<Vec<ClockEntry>>,
}

fn clock_entries(schedules: Vec<ClockSchedule>) -> Vec<ClockEntry> {
    schedules
        .into_iter()
        .map(|schedule| {
            let breakdown = match day_breakdown(&schedule) {
                Ok(b) => Some(b),
                Err(e) => {
                    warn!("clock_entries: {}", e);
                    None
                }
            };
            ClockEntry {
                schedule,
                breakdown,
            }
        })
        .collect()
}

fn load_dataset(
    datasets: &mut Datasets,
    source: &DatasetSource,
    duplicates: DuplicateKeyPolicy,
) -> ClassroomResult<()> {
    let path = &source.file_path;
    let table = read_table(Path::new(path))?;
    let countries = source.countries.as_deref();
    match source.kind {
        DatasetKind::Spider => {
            let ds = spider_stats(&table, countries, duplicates).context(ShapingSnafu { path })?;
            info!("load_dataset: spider: {} countries", ds.countries.len());
            datasets.spider = Some(ds);
        }
        DatasetKind::Wellbeing => {
            let ds = wellbeing_metrics(&table, duplicates).context(ShapingSnafu { path })?;
            info!("load_dataset: wellbeing: {} countries", ds.len());
            datasets.wellbeing = Some(ds);
        }
        DatasetKind::Socioeconomic => {
            let ds = socioeconomic_stats(&table, duplicates).context(ShapingSnafu { path })?;
            info!("load_dataset: socioeconomic: {} countries", ds.len());
            datasets.socioeconomic = Some(ds);
        }
        DatasetKind::Summary => {
            let ds = country_summaries(&table, duplicates).context(ShapingSnafu { path })?;
            info!("load_dataset: summary: {} countries", ds.len());
            datasets.summary = Some(ds);
        }
        DatasetKind::Facts => {
            let ds = country_facts(&table).context(ShapingSnafu { path })?;
            info!("load_dataset: facts: {} countries", ds.len());
            datasets.facts = Some(ds);
        }
        DatasetKind::Clock => {
            let ds = clock_schedules(&table).context(ShapingSnafu { path })?;
            info!("load_dataset: clock: {} countries", ds.len());
            datasets.clock = Some(clock_entries(ds));
        }
    }
    Ok(())
}

/// Loads every configured dataset. A kind listed twice keeps the last file.
pub fn load_datasets(
    sources: &[DatasetSource],
    duplicates: DuplicateKeyPolicy,
) -> ClassroomResult<Datasets> {
    let mut datasets = Datasets::default();
    for source in sources.iter() {
        info!("load_datasets: {:?} from {:?}", source.kind, source.file_path);
        load_dataset(&mut datasets, source, duplicates)?;
    }
    Ok(datasets)
}

impl Datasets {
    /// The dataset of this kind as JSON, if it was loaded.
    pub fn to_json(&self, kind: DatasetKind) -> ClassroomResult<Option<JSValue>> {
        let js = match kind {
            DatasetKind::Spider => self.spider.as_ref().map(serde_json::to_value),
            DatasetKind::Wellbeing => self.wellbeing.as_ref().map(serde_json::to_value),
            DatasetKind::Socioeconomic => self.socioeconomic.as_ref().map(serde_json::to_value),
            DatasetKind::Summary => self.summary.as_ref().map(serde_json::to_value),
            DatasetKind::Facts => self.facts.as_ref().map(serde_json::to_value),
            DatasetKind::Clock => self.clock.as_ref().map(serde_json::to_value),
        };
        js.transpose().context(SerializingJsonSnafu)
    }

    /// The ranking of the country summary, if it was loaded.
    pub fn ranking(&self, model: &ScoreModel) -> Option<Ranking> {
        self.summary.as_ref().map(|s| rank(s.iter(), model))
    }
}
