use crate::args::ServeArgs;
use crate::classroom::*;

use edu_stats::{DuplicateKeyPolicy, MissingValuePolicy};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

pub const DEFAULT_HOST: &str = "127.0.0.1";
pub const DEFAULT_PORT: u16 = 8080;
pub const DEFAULT_LEDGER_PATH: &str = "data/opinions.csv";

#[derive(Eq, PartialEq, Debug, Clone, Serialize, Deserialize, Default)]
pub struct ServerSettings {
    pub host: Option<String>,
    pub port: Option<u16>,
}

#[derive(Eq, PartialEq, Debug, Clone, Copy, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum DatasetKind {
    Spider,
    Wellbeing,
    Socioeconomic,
    Summary,
    Facts,
    Clock,
}

impl DatasetKind {
    pub const ALL: [DatasetKind; 6] = [
        DatasetKind::Spider,
        DatasetKind::Wellbeing,
        DatasetKind::Socioeconomic,
        DatasetKind::Summary,
        DatasetKind::Facts,
        DatasetKind::Clock,
    ];

    /// The name used in the configuration file and in the URLs.
    pub fn name(&self) -> &'static str {
        match self {
            DatasetKind::Spider => "spider",
            DatasetKind::Wellbeing => "wellbeing",
            DatasetKind::Socioeconomic => "socioeconomic",
            DatasetKind::Summary => "summary",
            DatasetKind::Facts => "facts",
            DatasetKind::Clock => "clock",
        }
    }

    pub fn from_name(name: &str) -> Option<DatasetKind> {
        DatasetKind::ALL.into_iter().find(|k| k.name() == name)
    }
}

#[derive(Eq, PartialEq, Debug, Clone, Serialize, Deserialize)]
pub struct DatasetSource {
    pub kind: DatasetKind,
    #[serde(rename = "filePath")]
    pub file_path: String,
    /// Only used by the spider dataset.
    pub countries: Option<Vec<String>>,
}

#[derive(Eq, PartialEq, Debug, Clone, Serialize, Deserialize, Default)]
pub struct ScoringSettings {
    #[serde(rename = "missingValues")]
    pub missing_values: Option<MissingValuePolicy>,
    #[serde(rename = "duplicateKeys")]
    pub duplicate_keys: Option<DuplicateKeyPolicy>,
}

impl ScoringSettings {
    pub fn missing_values(&self) -> MissingValuePolicy {
        self.missing_values.unwrap_or_default()
    }

    pub fn duplicate_keys(&self) -> DuplicateKeyPolicy {
        self.duplicate_keys.unwrap_or_default()
    }
}

#[derive(Eq, PartialEq, Debug, Clone, Serialize, Deserialize, Default)]
pub struct ClassroomConfig {
    pub server: Option<ServerSettings>,
    #[serde(rename = "ledgerPath")]
    pub ledger_path: Option<String>,
    pub datasets: Option<Vec<DatasetSource>>,
    pub scoring: Option<ScoringSettings>,
}

/// The configuration after defaults, command line overrides and path resolution.
#[derive(PartialEq, Debug, Clone)]
pub struct ResolvedSettings {
    pub host: String,
    pub port: u16,
    pub ledger_path: PathBuf,
    pub datasets: Vec<DatasetSource>,
    pub missing_values: MissingValuePolicy,
    pub duplicate_keys: DuplicateKeyPolicy,
}

pub fn read_config(path: &str) -> ClassroomResult<ClassroomConfig> {
    let config_str = std::fs::read_to_string(path).context(OpeningFileSnafu { path })?;
    let config: ClassroomConfig =
        serde_json::from_str(&config_str).context(ParsingJsonSnafu { path })?;
    debug!("read_config: {:?}", config);
    Ok(config)
}

fn resolve_path(root: &Path, p: &str) -> PathBuf {
    let path = Path::new(p);
    if path.is_absolute() {
        path.to_path_buf()
    } else {
        root.join(path)
    }
}

/// Applies the defaults and the command line overrides. Relative paths of the
/// configuration file are resolved against `root`, the ones passed on the command
/// line are kept as they are.
pub fn resolve_settings(config: &ClassroomConfig, root: &Path, args: &ServeArgs) -> ResolvedSettings {
    let server = config.server.clone().unwrap_or_default();
    let scoring = config.scoring.clone().unwrap_or_default();

    let ledger_path = match (&args.ledger, &config.ledger_path) {
        (Some(p), _) => PathBuf::from(p),
        (None, Some(p)) => resolve_path(root, p),
        (None, None) => resolve_path(root, DEFAULT_LEDGER_PATH),
    };

    let datasets = config
        .datasets
        .clone()
        .unwrap_or_default()
        .into_iter()
        .map(|ds| DatasetSource {
            file_path: resolve_path(root, &ds.file_path).display().to_string(),
            ..ds
        })
        .collect();

    ResolvedSettings {
        host: args
            .host
            .clone()
            .or(server.host)
            .unwrap_or_else(|| DEFAULT_HOST.to_string()),
        port: args.port.or(server.port).unwrap_or(DEFAULT_PORT),
        ledger_path,
        datasets,
        missing_values: scoring.missing_values(),
        duplicate_keys: scoring.duplicate_keys(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn serve_args() -> ServeArgs {
        ServeArgs {
            config: None,
            host: None,
            port: None,
            ledger: None,
        }
    }

    #[test]
    fn full_config() {
        let js = r#"{
            "server": {"host": "0.0.0.0", "port": 3000},
            "ledgerPath": "votes/opinions.csv",
            "datasets": [
                {"kind": "summary", "filePath": "data/country_education_summary.csv"},
                {"kind": "spider", "filePath": "/srv/spiderplot.csv", "countries": ["Finland"]}
            ],
            "scoring": {"missingValues": "exclude", "duplicateKeys": "reject"}
        }"#;
        let config: ClassroomConfig = serde_json::from_str(js).unwrap();
        let s = resolve_settings(&config, Path::new("/etc/classroom"), &serve_args());
        assert_eq!(s.host, "0.0.0.0");
        assert_eq!(s.port, 3000);
        assert_eq!(s.ledger_path, PathBuf::from("/etc/classroom/votes/opinions.csv"));
        assert_eq!(s.datasets.len(), 2);
        assert_eq!(s.datasets[0].kind, DatasetKind::Summary);
        assert_eq!(
            s.datasets[0].file_path,
            "/etc/classroom/data/country_education_summary.csv"
        );
        assert_eq!(s.datasets[1].file_path, "/srv/spiderplot.csv");
        assert_eq!(s.datasets[1].countries, Some(vec!["Finland".to_string()]));
        assert_eq!(s.missing_values, MissingValuePolicy::Exclude);
        assert_eq!(s.duplicate_keys, DuplicateKeyPolicy::Reject);
    }

    #[test]
    fn empty_config() {
        let config: ClassroomConfig = serde_json::from_str("{}").unwrap();
        let s = resolve_settings(&config, Path::new(""), &serve_args());
        assert_eq!(s.host, DEFAULT_HOST);
        assert_eq!(s.port, DEFAULT_PORT);
        assert_eq!(s.ledger_path, PathBuf::from(DEFAULT_LEDGER_PATH));
        assert!(s.datasets.is_empty());
        assert_eq!(s.missing_values, MissingValuePolicy::NeutralMidpoint);
        assert_eq!(s.duplicate_keys, DuplicateKeyPolicy::LastWriteWins);
    }

    #[test]
    fn command_line_overrides() {
        let config: ClassroomConfig =
            serde_json::from_str(r#"{"server": {"port": 3000}, "ledgerPath": "a.csv"}"#).unwrap();
        let args = ServeArgs {
            config: None,
            host: Some("localhost".to_string()),
            port: Some(9000),
            ledger: Some("b.csv".to_string()),
        };
        let s = resolve_settings(&config, Path::new("/etc"), &args);
        assert_eq!(s.host, "localhost");
        assert_eq!(s.port, 9000);
        assert_eq!(s.ledger_path, PathBuf::from("b.csv"));
    }

    #[test]
    fn unknown_dataset_kind() {
        let js = r#"{"datasets": [{"kind": "radar", "filePath": "x.csv"}]}"#;
        assert!(serde_json::from_str::<ClassroomConfig>(js).is_err());
    }

    #[test]
    fn kind_names() {
        for k in DatasetKind::ALL {
            assert_eq!(DatasetKind::from_name(k.name()), Some(k));
            assert_eq!(serde_json::to_value(k).unwrap(), serde_json::json!(k.name()));
        }
        assert_eq!(DatasetKind::from_name("radar"), None);
    }

    #[test]
    fn missing_config_file() {
        let err = read_config("/nonexistent/classroom.json").unwrap_err();
        assert!(matches!(err, ClassroomError::OpeningFile { .. }));
    }
}
