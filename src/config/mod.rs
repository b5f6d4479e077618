//! Train definition parsing and credential loading.
//!
//! The train definition lives in `.pr-train.yml` at the repository root:
//!
//! ```yaml
//! prs:
//!   main-branch-name: main
//!   merge-branch-name: develop   # optional, defaults to main-branch-name
//!   remote: origin               # optional
//! trains:
//!   my feature:
//!     - part-1
//!     - part-2:
//!         merged: true
//! ```
//!
//! Parsing is read-only. Edits to the file go through
//! [`crate::persistence::DefinitionFile`], which preserves formatting.

use std::collections::{BTreeMap, HashMap, HashSet};
use std::path::{Path, PathBuf};

use serde::Deserialize;
use thiserror::Error;

/// Name of the train definition file at the repository root.
pub const DEFINITION_FILE_NAME: &str = ".pr-train.yml";

/// Default remote name when the settings do not specify one.
pub const DEFAULT_REMOTE: &str = "origin";

/// Environment variable consulted for the review-host token.
pub const TOKEN_ENV_VAR: &str = "GITHUB_TOKEN";

/// Configuration errors. All of these are fatal and occur before any mutation.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("no {} found at {}", DEFINITION_FILE_NAME, .0.display())]
    MissingDefinition(PathBuf),

    #[error("failed to read {}: {source}", path.display())]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("malformed train definition: {0}")]
    Malformed(String),

    #[error("missing required setting `prs.{0}`")]
    MissingSetting(&'static str),

    #[error("train {train:?} lists branch {branch:?} more than once")]
    DuplicateBranch { train: String, branch: String },

    #[error("train {train:?} lists the upstream branch {branch:?} as a train member")]
    UpstreamInTrain { train: String, branch: String },

    #[error("no train named {0:?}")]
    TrainNotFound(String),

    #[error("branch {branch:?} is not in exactly one train (found in: {})", format_trains(.trains))]
    AmbiguousOrUnknownBranch { branch: String, trains: Vec<String> },

    #[error(
        "no review-host token: pass --token, set {}, or write one to {}",
        TOKEN_ENV_VAR,
        .0.display()
    )]
    MissingToken(PathBuf),

    #[error("cannot determine owner/repo from remote URL {0:?}")]
    UnrecognisedRemote(String),
}

fn format_trains(trains: &[String]) -> String {
    if trains.is_empty() {
        "none".to_string()
    } else {
        trains.join(", ")
    }
}

/// The `prs` settings section.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Settings {
    /// The shared upstream branch every train is compared against.
    pub upstream_branch: String,

    /// Where the first branch of a train is proposed for merging. May differ
    /// from `upstream_branch`.
    pub merge_branch: String,

    /// Remote holding every branch's counterpart.
    pub remote: String,
}

/// One entry in a train's ordered branch list.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TrainEntry {
    pub branch: String,
    pub merged: bool,
}

/// A named, ordered train as written in the definition file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TrainSpec {
    pub name: String,
    pub entries: Vec<TrainEntry>,
}

impl TrainSpec {
    pub fn contains(&self, branch: &str) -> bool {
        self.entries.iter().any(|e| e.branch == branch)
    }
}

/// The parsed train definition.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TrainDefinition {
    pub settings: Settings,
    pub trains: Vec<TrainSpec>,
}

impl TrainDefinition {
    /// Reads and parses the definition file.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        if !path.exists() {
            return Err(ConfigError::MissingDefinition(path.to_path_buf()));
        }
        let content = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        Self::parse(&content)
    }

    /// Parses definition YAML.
    pub fn parse(content: &str) -> Result<Self, ConfigError> {
        let raw: RawDefinition =
            serde_yaml::from_str(content).map_err(|e| ConfigError::Malformed(e.to_string()))?;

        let settings = raw.prs.unwrap_or_default().into_settings()?;
        let trains = raw
            .trains
            .unwrap_or_default()
            .into_iter()
            .map(|(name, entries)| build_train(name, entries.unwrap_or_default(), &settings))
            .collect::<Result<Vec<_>, _>>()?;

        Ok(TrainDefinition { settings, trains })
    }

    /// Finds a train by name.
    pub fn train(&self, name: &str) -> Result<&TrainSpec, ConfigError> {
        self.trains
            .iter()
            .find(|t| t.name == name)
            .ok_or_else(|| ConfigError::TrainNotFound(name.to_string()))
    }

    /// Selects the one train containing `branch`.
    ///
    /// Fails when the branch is in no train, or in several.
    pub fn select_train(&self, branch: &str) -> Result<&TrainSpec, ConfigError> {
        let matches: Vec<&TrainSpec> = self.trains.iter().filter(|t| t.contains(branch)).collect();
        match matches.as_slice() {
            [only] => Ok(only),
            _ => Err(ConfigError::AmbiguousOrUnknownBranch {
                branch: branch.to_string(),
                trains: matches.iter().map(|t| t.name.clone()).collect(),
            }),
        }
    }
}

/// The file as written. Trains come back sorted by name.
#[derive(Debug, Deserialize)]
struct RawDefinition {
    prs: Option<RawSettings>,
    trains: Option<BTreeMap<String, Option<Vec<RawEntry>>>>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "kebab-case")]
struct RawSettings {
    main_branch_name: Option<Scalar>,
    merge_branch_name: Option<Scalar>,
    remote: Option<Scalar>,
}

impl RawSettings {
    fn into_settings(self) -> Result<Settings, ConfigError> {
        let upstream_branch = self
            .main_branch_name
            .map(String::from)
            .ok_or(ConfigError::MissingSetting("main-branch-name"))?;
        Ok(Settings {
            merge_branch: self
                .merge_branch_name
                .map_or_else(|| upstream_branch.clone(), String::from),
            remote: self
                .remote
                .map_or_else(|| DEFAULT_REMOTE.to_string(), String::from),
            upstream_branch,
        })
    }
}

/// Branch names YAML may read as numbers or booleans.
#[derive(Debug, Clone, PartialEq, Hash, Deserialize)]
#[serde(untagged)]
enum Scalar {
    Text(String),
    Number(serde_yaml::Number),
    Flag(bool),
}

// `serde_yaml::Number`'s equality is total (NaN == NaN) but it doesn't implement `Eq`.
impl Eq for Scalar {}

impl From<Scalar> for String {
    fn from(scalar: Scalar) -> Self {
        match scalar {
            Scalar::Text(s) => s,
            Scalar::Number(n) => n.to_string(),
            Scalar::Flag(b) => b.to_string(),
        }
    }
}

/// `- branch`, `- branch:` with an indented `merged:`, or `- branch: {merged: true}`.
#[derive(Debug, Deserialize)]
#[serde(untagged, expecting = "a branch name or `branch: {merged: true}`")]
enum RawEntry {
    Bare(Scalar),
    Annotated(HashMap<Scalar, Option<EntryOptions>>),
}

#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
struct EntryOptions {
    merged: Option<bool>,
}

impl RawEntry {
    fn into_entry(self, train: &str) -> Result<TrainEntry, ConfigError> {
        match self {
            RawEntry::Bare(branch) => Ok(TrainEntry {
                branch: branch.into(),
                merged: false,
            }),
            RawEntry::Annotated(map) => {
                let count = map.len();
                let mut pairs = map.into_iter();
                match (pairs.next(), pairs.next()) {
                    (Some((branch, options)), None) => Ok(TrainEntry {
                        branch: branch.into(),
                        merged: options.and_then(|o| o.merged).unwrap_or(false),
                    }),
                    _ => Err(ConfigError::Malformed(format!(
                        "train {:?} has an entry naming {} branches at once",
                        train, count
                    ))),
                }
            }
        }
    }
}

fn build_train(
    name: String,
    raw: Vec<RawEntry>,
    settings: &Settings,
) -> Result<TrainSpec, ConfigError> {
    let mut seen = HashSet::new();
    let mut entries = Vec::with_capacity(raw.len());
    for item in raw {
        let entry = item.into_entry(&name)?;
        if entry.branch == settings.upstream_branch {
            return Err(ConfigError::UpstreamInTrain {
                train: name,
                branch: entry.branch,
            });
        }
        if !seen.insert(entry.branch.clone()) {
            return Err(ConfigError::DuplicateBranch {
                train: name,
                branch: entry.branch,
            });
        }
        entries.push(entry);
    }

    Ok(TrainSpec { name, entries })
}

/// Default location of the token file: `~/.graft/token`.
pub fn default_token_path() -> Option<PathBuf> {
    dirs::home_dir().map(|home| home.join(".graft").join("token"))
}

/// Resolves the review-host token from, in order: an explicit value, the
/// environment value, then the token file.
pub fn resolve_token(
    explicit: Option<String>,
    from_env: Option<String>,
    token_file: Option<&Path>,
) -> Result<String, ConfigError> {
    let non_empty = |s: String| {
        let trimmed = s.trim().to_string();
        (!trimmed.is_empty()).then_some(trimmed)
    };

    if let Some(token) = explicit.and_then(non_empty) {
        return Ok(token);
    }
    if let Some(token) = from_env.and_then(non_empty) {
        return Ok(token);
    }
    if let Some(path) = token_file
        && let Ok(content) = std::fs::read_to_string(path)
        && let Some(token) = non_empty(content)
    {
        return Ok(token);
    }

    Err(ConfigError::MissingToken(
        token_file
            .map(Path::to_path_buf)
            .unwrap_or_else(|| PathBuf::from("~/.graft/token")),
    ))
}

/// Loads the token from `--token`, the environment, or `~/.graft/token`.
pub fn load_token(explicit: Option<String>) -> Result<String, ConfigError> {
    let token_file = default_token_path();
    resolve_token(
        explicit,
        std::env::var(TOKEN_ENV_VAR).ok(),
        token_file.as_deref(),
    )
}
