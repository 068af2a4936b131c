//! Project configuration
//!
//! A Recast project is a directory holding:
//!
//! - `recast.yaml` - project settings (execution, preview, logging)
//! - `transforms/*.yaml` - one transform definition per file
//! - `data/` - sample input, by convention

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use crate::definition::TransformDefinition;
use crate::error::{Error, Result};
use crate::executor::DEFAULT_PREVIEW_SAMPLES;

/// Name of the project file inside a project directory
pub const PROJECT_FILE: &str = "recast.yaml";

/// Root project configuration from `recast.yaml`
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProjectConfig {
    /// Project name
    pub name: String,

    /// Project version
    #[serde(default = "default_version")]
    pub version: String,

    /// Batch execution settings
    #[serde(default)]
    pub execution: ExecutionConfig,

    /// Preview settings
    #[serde(default)]
    pub preview: PreviewConfig,

    /// Log output settings
    #[serde(default)]
    pub logging: LoggingConfig,
}

fn default_version() -> String {
    "0.1.0".to_string()
}

/// Batch execution settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExecutionConfig {
    /// Validate outputs against the target schema unless told otherwise
    #[serde(default = "default_true")]
    pub validate_output: bool,

    /// Concurrent chunk workers
    #[serde(default = "default_workers")]
    pub workers: usize,

    /// Records per chunk
    #[serde(default = "default_chunk_size")]
    pub chunk_size: usize,

    /// Abort a run after this many seconds
    #[serde(default)]
    pub timeout_secs: Option<u64>,
}

impl Default for ExecutionConfig {
    fn default() -> Self {
        Self {
            validate_output: true,
            workers: default_workers(),
            chunk_size: default_chunk_size(),
            timeout_secs: None,
        }
    }
}

fn default_true() -> bool {
    true
}

fn default_workers() -> usize {
    1
}

fn default_chunk_size() -> usize {
    500
}

/// Preview settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PreviewConfig {
    /// Samples processed per preview
    #[serde(default = "default_max_samples")]
    pub max_samples: usize,
}

impl Default for PreviewConfig {
    fn default() -> Self {
        Self {
            max_samples: default_max_samples(),
        }
    }
}

fn default_max_samples() -> usize {
    DEFAULT_PREVIEW_SAMPLES
}

/// Log output settings
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct LoggingConfig {
    /// Output format
    #[serde(default)]
    pub format: LogFormat,
}

/// Log output format
#[derive(Debug, Clone, Copy, Serialize, Deserialize, Default, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    /// Human-readable lines
    #[default]
    Text,
    /// One JSON object per line
    Json,
}

impl ProjectConfig {
    /// Reject settings the runtime cannot honour
    pub fn validate(&self) -> Result<()> {
        if self.execution.workers == 0 {
            return Err(Error::ConfigInvalid {
                message: "execution.workers must be at least 1".to_string(),
            });
        }
        if self.execution.chunk_size == 0 {
            return Err(Error::ConfigInvalid {
                message: "execution.chunk_size must be at least 1".to_string(),
            });
        }
        if self.preview.max_samples == 0 {
            return Err(Error::ConfigInvalid {
                message: "preview.max_samples must be at least 1".to_string(),
            });
        }
        Ok(())
    }
}

/// Main configuration container
#[derive(Debug, Clone)]
pub struct Config {
    /// Project configuration
    pub project: ProjectConfig,

    /// Base path of the project
    pub base_path: PathBuf,
}

impl Config {
    /// Load configuration from a directory or a `recast.yaml` path
    ///
    /// # Example
    ///
    /// ```rust,ignore
    /// let config = Config::load("./my-project")?;
    /// println!("Project: {}", config.project.name);
    /// ```
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();

        let (config_path, base_path) = if path.is_dir() {
            (path.join(PROJECT_FILE), path.to_path_buf())
        } else {
            (
                path.to_path_buf(),
                path.parent().unwrap_or(Path::new(".")).to_path_buf(),
            )
        };

        if !config_path.exists() {
            return Err(Error::ConfigNotFound {
                path: config_path.display().to_string(),
            });
        }

        let contents = std::fs::read_to_string(&config_path)?;
        let project: ProjectConfig = serde_yaml::from_str(&contents)?;
        project.validate()?;

        tracing::debug!("Loaded project '{}' from {}", project.name, config_path.display());
        Ok(Self { project, base_path })
    }

    /// Directory holding transform definitions
    pub fn transforms_dir(&self) -> PathBuf {
        self.base_path.join("transforms")
    }

    /// Load all definitions from `transforms/*.yaml`, sorted by path.
    /// Fails on the first file that does not parse.
    pub fn load_definitions(&self) -> Result<Vec<TransformDefinition>> {
        self.definition_files()?
            .into_iter()
            .map(|file| file.definition)
            .collect()
    }

    /// Every file in `transforms/`, sorted by path, each with its own parse
    /// outcome. Only a failure to list the directory is returned as `Err`.
    pub fn definition_files(&self) -> Result<Vec<DefinitionFile>> {
        let dir = self.transforms_dir();
        if !dir.exists() {
            return Ok(vec![]);
        }

        let mut paths: Vec<_> = std::fs::read_dir(&dir)?
            .filter_map(|e| e.ok())
            .map(|e| e.path())
            .filter(|path| {
                path.extension()
                    .is_some_and(|ext| ext == "yaml" || ext == "yml")
            })
            .collect();
        paths.sort();

        Ok(paths.into_iter().map(DefinitionFile::read).collect())
    }

    /// Find a definition by name or id.
    ///
    /// Files that fail to parse are skipped unless they claim the requested
    /// name (by `name`, `id` or file stem), in which case their error is
    /// returned.
    pub fn find_definition(&self, name: &str) -> Result<TransformDefinition> {
        let mut broken = None;
        for file in self.definition_files()? {
            if !file.matches(name) {
                if let Err(e) = &file.definition {
                    tracing::debug!("Skipping {}: {}", file.path.display(), e);
                }
                continue;
            }
            match file.definition {
                Ok(definition) => return Ok(definition),
                Err(e) => {
                    broken.get_or_insert(e);
                }
            }
        }
        Err(broken.unwrap_or_else(|| Error::TransformNotFound {
            name: name.to_string(),
        }))
    }

    /// Resolve a path relative to the project directory
    pub fn resolve(&self, path: impl AsRef<Path>) -> PathBuf {
        let path = path.as_ref();
        if path.is_absolute() {
            path.to_path_buf()
        } else {
            self.base_path.join(path)
        }
    }
}

/// A definition file and its parse outcome
#[derive(Debug)]
pub struct DefinitionFile {
    /// Path of the file
    pub path: PathBuf,
    /// The parsed definition, or why it could not be read
    pub definition: Result<TransformDefinition>,
    /// Names a broken file still answers to
    claims: Vec<String>,
}

impl DefinitionFile {
    fn read(path: PathBuf) -> Self {
        let mut claims: Vec<String> = path
            .file_stem()
            .map(|stem| stem.to_string_lossy().into_owned())
            .into_iter()
            .collect();

        let definition = match std::fs::read_to_string(&path) {
            Ok(contents) => serde_yaml::from_str::<TransformDefinition>(&contents).map_err(|e| {
                if let Ok(serde_yaml::Value::Mapping(raw)) = serde_yaml::from_str(&contents) {
                    claims.extend(
                        ["name", "id"]
                            .into_iter()
                            .filter_map(|key| raw.get(key).and_then(|v| v.as_str()))
                            .map(str::to_string),
                    );
                }
                Error::ConfigInvalid {
                    message: format!("{}: {}", path.display(), e),
                }
            }),
            Err(e) => Err(e.into()),
        };

        Self {
            path,
            definition,
            claims,
        }
    }

    /// Whether this file is the one meant by `name`
    pub fn matches(&self, name: &str) -> bool {
        match &self.definition {
            Ok(definition) => definition.name == name || definition.id == name,
            Err(_) => self.claims.iter().any(|claim| claim == name),
        }
    }
}
