pub mod config_reader;
pub mod io_csv;
pub mod opinions;
pub mod server;

use log::{debug, info, warn};

use edu_stats::*;
use snafu::{prelude::*, Snafu};

use std::fs;
use std::path::{Path, PathBuf};

use serde_json::json;
use serde_json::Value as JSValue;
use text_diff::print_diff;

use crate::args::{RankArgs, ServeArgs};
use crate::classroom::config_reader::*;

#[derive(Debug, Snafu)]
pub enum ClassroomError {
    #[snafu(display("Error opening file {path}"))]
    OpeningFile {
        source: std::io::Error,
        path: String,
    },
    #[snafu(display("Error writing file {path}"))]
    WritingFile {
        source: std::io::Error,
        path: String,
    },
    #[snafu(display("Error parsing JSON in {path}"))]
    ParsingJson {
        source: serde_json::Error,
        path: String,
    },
    #[snafu(display("Error serializing JSON"))]
    SerializingJson { source: serde_json::Error },
    #[snafu(display("Error reading CSV file {path}"))]
    ParsingCsv {
        source: edu_stats::ParseError,
        path: String,
    },
    #[snafu(display("Error reading dataset {path}"))]
    Shaping {
        source: edu_stats::ShapeError,
        path: String,
    },
    #[snafu(display("Invalid opinion: {message}"))]
    Validation { message: String },
    #[snafu(display("Error accessing the opinion ledger {path}"))]
    LedgerIo {
        source: std::io::Error,
        path: String,
    },
    #[snafu(display("Error reading or writing a row of the opinion ledger {path}"))]
    LedgerCsv { source: csv::Error, path: String },
    #[snafu(display("Error running the HTTP server on {address}"))]
    Server {
        source: std::io::Error,
        address: String,
    },

    #[snafu(whatever, display("{message}"))]
    Whatever {
        message: String,
        #[snafu(source(from(Box<dyn std::error::Error + Send + Sync>, Some)))]
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },
}

pub type ClassroomResult<T> = Result<T, ClassroomError>;

impl ClassroomError {
    /// True for errors caused by the caller's input rather than by the service.
    pub fn is_validation(&self) -> bool {
        matches!(self, ClassroomError::Validation { .. })
    }
}

/// Reads the configuration file, if any, and returns it with the directory that
/// relative paths are resolved against.
fn load_config(config_path: &Option<String>) -> ClassroomResult<(ClassroomConfig, PathBuf)> {
    match config_path {
        Some(p) => {
            let config = read_config(p)?;
            let root = Path::new(p)
                .parent()
                .map(|d| d.to_path_buf())
                .unwrap_or_default();
            Ok((config, root))
        }
        None => Ok((ClassroomConfig::default(), PathBuf::new())),
    }
}

// Three decimals are enough to compare with a reference and print back identically.
fn round_score(score: f64) -> f64 {
    (score * 1000.0).round() / 1000.0
}

fn build_summary_js(input: &str, model: &ScoreModel, ranking: &Ranking) -> JSValue {
    let results: Vec<JSValue> = ranking
        .all
        .iter()
        .map(|e| json!({"rank": e.rank, "country": e.key, "score": round_score(e.score)}))
        .collect();
    json!({
        "config": {
            "input": input,
            "missingValues": model.missing_values(),
        },
        "best": ranking.best.as_ref().map(|e| e.key.clone()),
        "lowest": ranking.lowest.as_ref().map(|e| e.key.clone()),
        "results": results,
    })
}

fn read_summary(path: &str) -> ClassroomResult<JSValue> {
    let contents = fs::read_to_string(path).context(OpeningFileSnafu { path })?;
    debug!("read_summary: read content: {:?}", contents);
    serde_json::from_str(contents.as_str()).context(ParsingJsonSnafu { path })
}

/// Ranks the countries of a summary file and optionally checks the result against a
/// reference summary.
pub fn run_rank(args: &RankArgs) -> ClassroomResult<()> {
    let (config, _) = load_config(&args.config)?;
    let scoring = config.scoring.unwrap_or_default();
    let model = ScoreModel::country_summary().with_missing_values(scoring.missing_values());

    let table = io_csv::read_table(Path::new(&args.input))?;
    let summaries = datasets::country_summaries(&table, scoring.duplicate_keys())
        .context(ShapingSnafu { path: &args.input })?;
    info!("run_rank: {} countries in {:?}", summaries.len(), args.input);

    let ranking = rank(summaries.iter(), &model);
    for e in ranking.all.iter() {
        info!("{:>3} {:>8.3} {}", e.rank, e.score, e.key);
    }

    let result_js = build_summary_js(&args.input, &model, &ranking);
    let pretty_js_stats = serde_json::to_string_pretty(&result_js).context(SerializingJsonSnafu)?;

    match args.out.as_deref() {
        None | Some("stdout") => println!("{}", pretty_js_stats),
        Some("") => {}
        Some(out_path) => {
            info!("run_rank: writing summary to {:?}", out_path);
            fs::write(out_path, &pretty_js_stats).context(WritingFileSnafu { path: out_path })?;
        }
    }

    // The reference summary, if provided for comparison
    if let Some(summary_p) = &args.reference {
        let summary_ref = read_summary(summary_p)?;
        let pretty_js_summary_ref =
            serde_json::to_string_pretty(&summary_ref).context(SerializingJsonSnafu)?;
        if pretty_js_summary_ref != pretty_js_stats {
            warn!("Found differences with the reference string");
            print_diff(
                pretty_js_summary_ref.as_str(),
                pretty_js_stats.as_ref(),
                "\n",
            );
            whatever!("Difference detected between calculated ranking and reference ranking")
        }
    }
    Ok(())
}

/// Loads the datasets and serves them, with the opinion ledger, over HTTP.
pub fn run_server(args: &ServeArgs) -> ClassroomResult<()> {
    let (config, root) = load_config(&args.config)?;
    let settings = resolve_settings(&config, &root, args);
    info!("run_server: settings: {:?}", settings);

    let datasets = io_csv::load_datasets(&settings.datasets, settings.duplicate_keys)?;
    let model = ScoreModel::country_summary().with_missing_values(settings.missing_values);
    let state = server::AppState { datasets, model };
    let ledger = opinions::OpinionLedger::open(settings.ledger_path.clone());

    actix_web::rt::System::new().block_on(server::serve(
        settings.host.clone(),
        settings.port,
        state,
        ledger,
    ))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    const SUMMARY: &str =
        "country,math_score,ESCS,HISEI,HISCED,sense_of_belonging,bullying,feeling_safe\n\
         Finland,484,0.35,78,8,0.1,-0.39,0.37\n\
         Cambodia,336,-1.2,40,4,-0.4,-0.1,-0.6\n\
         Singapore,575,0.55,80,8,0.25,-0.2,0.18\n";

    fn write_file(dir: &Path, name: &str, content: &str) -> String {
        let p = dir.join(name);
        let mut f = fs::File::create(&p).unwrap();
        f.write_all(content.as_bytes()).unwrap();
        p.display().to_string()
    }

    fn rank_args(input: String, out: Option<String>, reference: Option<String>) -> RankArgs {
        RankArgs {
            input,
            reference,
            out,
            config: None,
        }
    }

    #[test]
    fn rank_writes_a_summary() {
        let dir = tempfile::tempdir().unwrap();
        let input = write_file(dir.path(), "summary.csv", SUMMARY);
        let out = dir.path().join("out.json").display().to_string();
        run_rank(&rank_args(input, Some(out.clone()), None)).unwrap();

        let js: JSValue = serde_json::from_str(&fs::read_to_string(&out).unwrap()).unwrap();
        assert_eq!(js["best"], json!("Singapore"));
        assert_eq!(js["lowest"], json!("Cambodia"));
        assert_eq!(js["results"].as_array().unwrap().len(), 3);
        assert_eq!(js["config"]["missingValues"], json!("neutralMidpoint"));
    }

    #[test]
    fn rank_checks_the_reference() {
        let dir = tempfile::tempdir().unwrap();
        let input = write_file(dir.path(), "summary.csv", SUMMARY);
        let out = dir.path().join("out.json").display().to_string();
        run_rank(&rank_args(input.clone(), Some(out.clone()), None)).unwrap();

        // The output of a run is a valid reference for the same input.
        run_rank(&rank_args(input.clone(), Some(String::new()), Some(out))).unwrap();

        let wrong = write_file(dir.path(), "wrong.json", "{\"best\": \"Cambodia\"}");
        let err = run_rank(&rank_args(input, Some(String::new()), Some(wrong))).unwrap_err();
        assert!(matches!(err, ClassroomError::Whatever { .. }));
    }

    #[test]
    fn rank_of_a_missing_file() {
        let err = run_rank(&rank_args("/nonexistent/summary.csv".to_string(), None, None)).unwrap_err();
        assert!(matches!(err, ClassroomError::OpeningFile { .. }));
    }
}
