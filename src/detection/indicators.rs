//! Signal tables
//!
//! The port, environment, and manifest tables are plain data. The built-in
//! defaults can be replaced wholesale by a TOML, YAML, or JSON file with the
//! same shape, e.g.:
//!
//! ```toml
//! [scores]
//! port = 0.3
//! environment = 0.4
//! filesystem = 0.6
//!
//! [[ports]]
//! port = 5000
//! framework = "flask"
//!
//! [[environment]]
//! name = "FLASK_APP"
//! framework = "flask"
//!
//! [[files]]
//! path = "requirements.txt"
//!
//! [[files.matches]]
//! framework = "flask"
//! contains = "flask"
//! version_pattern = '(?im)^[ \t]*flask[ \t]*[=><~!]+[ \t]*(\d+\.\d+(?:\.\d+)?)'
//! ```

use super::combiner::Weights;
use super::types::Axis;
use crate::stack::{FrameworkId, LanguageId};
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum IndicatorError {
    #[error("Failed to read indicator file {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to parse indicator file {path}: {message}")]
    Parse { path: PathBuf, message: String },

    #[error("Unsupported indicator file format: {0} (expected .toml, .yaml, .yml or .json)")]
    UnsupportedFormat(PathBuf),

    #[error("Invalid indicator table: {0}")]
    Invalid(String),
}

/// Raw contribution of one matching probe, per axis
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SignalScores {
    pub port: f64,
    pub environment: f64,
    pub filesystem: f64,
}

impl Default for SignalScores {
    fn default() -> Self {
        Self {
            port: 0.3,
            environment: 0.4,
            filesystem: 0.6,
        }
    }
}

impl SignalScores {
    pub fn for_axis(&self, axis: Axis) -> f64 {
        match axis {
            Axis::Port => self.port,
            Axis::Environment => self.environment,
            Axis::Filesystem => self.filesystem,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PortIndicator {
    pub port: u16,
    pub framework: FrameworkId,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EnvIndicator {
    pub name: String,
    pub framework: FrameworkId,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ContentMatch {
    pub framework: FrameworkId,
    /// Matched case-insensitively against the manifest
    pub contains: String,
    /// Regex whose first capture group is the framework version
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub version_pattern: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FileIndicator {
    /// Path inside the container, relative to its working directory unless absolute
    pub path: String,
    pub matches: Vec<ContentMatch>,
}

/// All signal tables consulted by the collectors
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IndicatorTable {
    #[serde(default)]
    pub scores: SignalScores,
    #[serde(default)]
    pub ports: Vec<PortIndicator>,
    #[serde(default)]
    pub environment: Vec<EnvIndicator>,
    #[serde(default)]
    pub files: Vec<FileIndicator>,
}

impl Default for IndicatorTable {
    fn default() -> Self {
        Self::builtin()
    }
}

fn port(port: u16, framework: FrameworkId) -> PortIndicator {
    PortIndicator { port, framework }
}

fn env(name: &str, framework: FrameworkId) -> EnvIndicator {
    EnvIndicator {
        name: name.to_string(),
        framework,
    }
}

fn content(framework: FrameworkId, contains: &str, version_pattern: Option<&str>) -> ContentMatch {
    ContentMatch {
        framework,
        contains: contains.to_string(),
        version_pattern: version_pattern.map(str::to_string),
    }
}

/// Version pin in requirements.txt, Pipfile, or pyproject style.
///
/// Anchored to the start of a requirement line so comments and other
/// packages' pins are never read as the version.
fn python_package(framework: FrameworkId, package: &str) -> ContentMatch {
    ContentMatch {
        framework,
        contains: package.to_string(),
        version_pattern: Some(format!(
            r#"(?im)^[ \t]*["']?{}(?:\[[^\]\n]*\])?["']?[ \t]*=?[ \t]*["']?[=><~!^]*[ \t]*(\d+\.\d+(?:\.\d+)?)"#,
            regex::escape(package)
        )),
    }
}

fn file(path: &str, matches: Vec<ContentMatch>) -> FileIndicator {
    FileIndicator {
        path: path.to_string(),
        matches,
    }
}

impl IndicatorTable {
    /// The tables shipped with the crate.
    pub fn builtin() -> Self {
        use FrameworkId::*;

        let python = |manifest: &str| {
            file(
                manifest,
                vec![
                    python_package(Flask, "flask"),
                    python_package(Django, "django"),
                    python_package(FastApi, "fastapi"),
                ],
            )
        };

        Self {
            scores: SignalScores::default(),
            ports: vec![
                port(5000, Flask),
                port(8000, Django),
                port(8080, SpringBoot),
                port(3000, Express),
                port(4000, Express),
            ],
            environment: vec![
                env("FLASK_APP", Flask),
                env("FLASK_ENV", Flask),
                env("DJANGO_SETTINGS_MODULE", Django),
                env("FASTAPI_ENV", FastApi),
                env("NODE_ENV", Express),
                env("SPRING_PROFILES_ACTIVE", SpringBoot),
                env("GIN_MODE", Gin),
            ],
            files: vec![
                python("requirements.txt"),
                python("Pipfile"),
                file(
                    "package.json",
                    vec![
                        content(
                            Express,
                            "\"express\"",
                            Some(r#""express"\s*:\s*"[^"\d]*(\d+\.\d+(?:\.\d+)?)"#),
                        ),
                        content(
                            NestJs,
                            "@nestjs/core",
                            Some(r#""@nestjs/core"\s*:\s*"[^"\d]*(\d+\.\d+(?:\.\d+)?)"#),
                        ),
                        content(NestJs, "@nestjs/common", None),
                    ],
                ),
                file(
                    "pom.xml",
                    vec![content(
                        SpringBoot,
                        "spring-boot",
                        Some(r"(?:<spring-boot\.version>|spring-boot-starter-parent</artifactId>\s*<version>)\s*(\d+\.\d+(?:\.\d+)?)"),
                    )],
                ),
                file(
                    "build.gradle",
                    vec![content(
                        SpringBoot,
                        "spring-boot",
                        Some(r#"org\.springframework\.boot['"]?\s*version\s*['"](\d+\.\d+(?:\.\d+)?)"#),
                    )],
                ),
                file(
                    "go.mod",
                    vec![content(
                        Gin,
                        "github.com/gin-gonic/gin",
                        Some(r"github\.com/gin-gonic/gin\s+v(\d+\.\d+(?:\.\d+)?)"),
                    )],
                ),
            ],
        }
    }

    /// An empty table with default scores, for building synthetic tables.
    pub fn empty() -> Self {
        Self {
            scores: SignalScores::default(),
            ports: Vec::new(),
            environment: Vec::new(),
            files: Vec::new(),
        }
    }

    pub fn with_scores(mut self, scores: SignalScores) -> Self {
        self.scores = scores;
        self
    }

    pub fn with_port(mut self, port_number: u16, framework: FrameworkId) -> Self {
        self.ports.push(port(port_number, framework));
        self
    }

    pub fn with_env(mut self, name: &str, framework: FrameworkId) -> Self {
        self.environment.push(env(name, framework));
        self
    }

    pub fn with_file(mut self, path: &str, matches: Vec<ContentMatch>) -> Self {
        self.files.push(file(path, matches));
        self
    }

    /// Loads a table from disk, choosing the format by file extension.
    pub fn load(path: &Path) -> Result<Self, IndicatorError> {
        let raw = std::fs::read_to_string(path).map_err(|source| IndicatorError::Io {
            path: path.to_path_buf(),
            source,
        })?;

        let extension = path
            .extension()
            .and_then(|ext| ext.to_str())
            .map(str::to_ascii_lowercase);

        let parse_error = |message: String| IndicatorError::Parse {
            path: path.to_path_buf(),
            message,
        };

        let table: IndicatorTable = match extension.as_deref() {
            Some("toml") => toml::from_str(&raw).map_err(|e| parse_error(e.to_string()))?,
            Some("yaml") | Some("yml") => {
                serde_yaml::from_str(&raw).map_err(|e| parse_error(e.to_string()))?
            }
            Some("json") => serde_json::from_str(&raw).map_err(|e| parse_error(e.to_string()))?,
            _ => return Err(IndicatorError::UnsupportedFormat(path.to_path_buf())),
        };

        table.validate()?;
        Ok(table)
    }

    pub fn validate(&self) -> Result<(), IndicatorError> {
        for (axis, score) in [
            (Axis::Port, self.scores.port),
            (Axis::Environment, self.scores.environment),
            (Axis::Filesystem, self.scores.filesystem),
        ] {
            if !score.is_finite() || score < 0.0 {
                return Err(IndicatorError::Invalid(format!(
                    "{} score must be a non-negative number, got {}",
                    axis, score
                )));
            }
        }

        for indicator in &self.ports {
            reject_unknown(indicator.framework, &format!("port {}", indicator.port))?;
        }

        for indicator in &self.environment {
            if indicator.name.trim().is_empty() {
                return Err(IndicatorError::Invalid(
                    "environment indicator with empty name".to_string(),
                ));
            }
            reject_unknown(indicator.framework, &indicator.name)?;
        }

        for indicator in &self.files {
            if indicator.path.trim().is_empty() {
                return Err(IndicatorError::Invalid(
                    "file indicator with empty path".to_string(),
                ));
            }
            for matcher in &indicator.matches {
                reject_unknown(matcher.framework, &indicator.path)?;
                if matcher.contains.is_empty() {
                    return Err(IndicatorError::Invalid(format!(
                        "empty substring for {} in {}",
                        matcher.framework.id(),
                        indicator.path
                    )));
                }
                if let Some(pattern) = &matcher.version_pattern {
                    Regex::new(pattern).map_err(|e| {
                        IndicatorError::Invalid(format!(
                            "bad version pattern for {} in {}: {}",
                            matcher.framework.id(),
                            indicator.path,
                            e
                        ))
                    })?;
                }
            }
        }

        Ok(())
    }

    /// Frameworks named anywhere in the tables.
    pub fn frameworks(&self) -> Vec<FrameworkId> {
        let mut frameworks: Vec<FrameworkId> = self
            .ports
            .iter()
            .map(|p| p.framework)
            .chain(self.environment.iter().map(|e| e.framework))
            .chain(
                self.files
                    .iter()
                    .flat_map(|f| f.matches.iter().map(|m| m.framework)),
            )
            .collect();
        frameworks.sort();
        frameworks.dedup();
        frameworks
    }
}

fn reject_unknown(framework: FrameworkId, context: &str) -> Result<(), IndicatorError> {
    if framework.is_unknown() {
        return Err(IndicatorError::Invalid(format!(
            "indicator '{}' maps to the unknown framework",
            context
        )));
    }
    Ok(())
}

/// Catalog entry describing a recognizable framework
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FrameworkInfo {
    pub id: FrameworkId,
    pub name: &'static str,
    pub language: LanguageId,
    pub description: &'static str,
}

impl From<FrameworkId> for FrameworkInfo {
    fn from(id: FrameworkId) -> Self {
        Self {
            id,
            name: id.name(),
            language: id.language(),
            description: id.description(),
        }
    }
}

/// Everything the detector consults, independent of any container
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct IndicatorSnapshot {
    pub weights: Weights,
    pub scores: SignalScores,
    pub ports: Vec<PortIndicator>,
    pub environment: Vec<EnvIndicator>,
    pub files: Vec<FileIndicator>,
    pub frameworks: Vec<FrameworkInfo>,
}

impl IndicatorSnapshot {
    pub fn new(table: &IndicatorTable, weights: Weights) -> Self {
        Self {
            weights,
            scores: table.scores,
            ports: table.ports.clone(),
            environment: table.environment.clone(),
            files: table.files.clone(),
            frameworks: FrameworkId::known().map(FrameworkInfo::from).collect(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    fn write_temp(suffix: &str, contents: &str) -> NamedTempFile {
        let mut file = tempfile::Builder::new().suffix(suffix).tempfile().unwrap();
        file.write_all(contents.as_bytes()).unwrap();
        file
    }

    #[test]
    fn test_builtin_table_is_valid() {
        let table = IndicatorTable::builtin();
        assert!(table.validate().is_ok());
        assert_eq!(table.scores, SignalScores::default());
    }

    #[test]
    fn test_builtin_covers_every_known_framework() {
        let covered = IndicatorTable::builtin().frameworks();
        for framework in FrameworkId::known() {
            assert!(covered.contains(&framework), "{} has no indicators", framework);
        }
    }

    #[test]
    fn test_builtin_version_patterns_capture() {
        let table = IndicatorTable::builtin();
        let pattern = |path: &str, framework: FrameworkId| {
            let indicator = table.files.iter().find(|f| f.path == path).unwrap();
            let matcher = indicator
                .matches
                .iter()
                .find(|m| m.framework == framework)
                .unwrap();
            Regex::new(matcher.version_pattern.as_deref().unwrap()).unwrap()
        };

        let capture = |re: Regex, text: &str| {
            re.captures(text)
                .and_then(|c| c.get(1))
                .map(|m| m.as_str().to_string())
        };

        assert_eq!(
            capture(pattern("requirements.txt", FrameworkId::Flask), "Flask==2.3.2\n"),
            Some("2.3.2".to_string())
        );
        assert_eq!(
            capture(pattern("Pipfile", FrameworkId::Django), "django = \">=4.2\"\n"),
            Some("4.2".to_string())
        );
        assert_eq!(
            capture(
                pattern("requirements.txt", FrameworkId::Flask),
                "# upgraded flask 2.3 -> 3.0\nflask==3.0.0\n"
            ),
            Some("3.0.0".to_string())
        );
        assert_eq!(
            capture(
                pattern("requirements.txt", FrameworkId::Flask),
                "flask-cors==4.0.0\nflask[async]~=3.0.1\n"
            ),
            Some("3.0.1".to_string())
        );
        assert_eq!(
            capture(
                pattern("requirements.txt", FrameworkId::Flask),
                "flask\n2.0\n"
            ),
            None
        );
        assert_eq!(
            capture(
                pattern("requirements.txt", FrameworkId::Django),
                "dependencies = [\n    \"django>=4.2\",\n]\n"
            ),
            Some("4.2".to_string())
        );
        assert_eq!(
            capture(
                pattern("package.json", FrameworkId::Express),
                r#"{"dependencies": {"express": "^4.18.2"}}"#
            ),
            Some("4.18.2".to_string())
        );
        assert_eq!(
            capture(
                pattern("go.mod", FrameworkId::Gin),
                "require github.com/gin-gonic/gin v1.9.1\n"
            ),
            Some("1.9.1".to_string())
        );
        assert_eq!(
            capture(
                pattern("pom.xml", FrameworkId::SpringBoot),
                "<spring-boot.version>3.2.0</spring-boot.version>"
            ),
            Some("3.2.0".to_string())
        );
    }

    #[test]
    fn test_express_needle_ignores_nest_platform() {
        let table = IndicatorTable::builtin();
        let package = table.files.iter().find(|f| f.path == "package.json").unwrap();
        let express = package
            .matches
            .iter()
            .find(|m| m.framework == FrameworkId::Express)
            .unwrap();
        let manifest = r#"{"dependencies": {"@nestjs/platform-express": "^10.0.0"}}"#;
        assert!(!manifest.to_lowercase().contains(&express.contains.to_lowercase()));
    }

    #[test]
    fn test_load_toml() {
        let file = write_temp(
            ".toml",
            r#"
[scores]
port = 1.0
environment = 1.0
filesystem = 1.0

[[ports]]
port = 9000
framework = "gin"

[[files]]
path = "go.mod"

[[files.matches]]
framework = "gin"
contains = "gin-gonic"
"#,
        );

        let table = IndicatorTable::load(file.path()).unwrap();
        assert_eq!(table.scores.port, 1.0);
        assert_eq!(table.ports, vec![port(9000, FrameworkId::Gin)]);
        assert!(table.environment.is_empty());
        assert_eq!(table.files[0].matches[0].version_pattern, None);
    }

    #[test]
    fn test_load_yaml_defaults_scores() {
        let file = write_temp(
            ".yaml",
            "environment:\n  - name: FLASK_APP\n    framework: flask\n",
        );

        let table = IndicatorTable::load(file.path()).unwrap();
        assert_eq!(table.scores, SignalScores::default());
        assert_eq!(table.environment, vec![env("FLASK_APP", FrameworkId::Flask)]);
    }

    #[test]
    fn test_load_rejects_unknown_framework_id() {
        let file = write_temp(".json", r#"{"ports": [{"port": 80, "framework": "rails"}]}"#);
        assert!(matches!(
            IndicatorTable::load(file.path()),
            Err(IndicatorError::Parse { .. })
        ));
    }

    #[test]
    fn test_load_rejects_sentinel() {
        let file = write_temp(".json", r#"{"ports": [{"port": 80, "framework": "unknown"}]}"#);
        assert!(matches!(
            IndicatorTable::load(file.path()),
            Err(IndicatorError::Invalid(_))
        ));
    }

    #[test]
    fn test_load_unsupported_extension() {
        let file = write_temp(".ini", "ports = []");
        assert!(matches!(
            IndicatorTable::load(file.path()),
            Err(IndicatorError::UnsupportedFormat(_))
        ));
    }

    #[test]
    fn test_load_missing_file() {
        let result = IndicatorTable::load(Path::new("/nonexistent/indicators.toml"));
        assert!(matches!(result, Err(IndicatorError::Io { .. })));
    }

    #[test]
    fn test_validate_rejects_negative_score() {
        let table = IndicatorTable::empty().with_scores(SignalScores {
            port: -0.1,
            environment: 0.4,
            filesystem: 0.6,
        });
        assert!(table.validate().is_err());
    }

    #[test]
    fn test_validate_rejects_bad_regex() {
        let table = IndicatorTable::empty().with_file(
            "requirements.txt",
            vec![content(FrameworkId::Flask, "flask", Some("(unclosed"))],
        );
        assert!(table.validate().is_err());
    }

    #[test]
    fn test_snapshot_lists_catalog() {
        let snapshot = IndicatorSnapshot::new(&IndicatorTable::builtin(), Weights::default());
        assert_eq!(snapshot.frameworks.len(), FrameworkId::known().count());
        assert!(snapshot
            .frameworks
            .iter()
            .any(|f| f.id == FrameworkId::SpringBoot && f.language == LanguageId::Java));
    }
}
