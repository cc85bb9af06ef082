//! Versioned publication of compaction artifacts.
//!
//! Layout under the output root:
//!
//! ```text
//! current.json                 pointer to the live version
//! <version>/manifest.json
//! <version>/schedules/<slug>.json
//! <version>/patterns/<slug>.json
//! ```
//!
//! A version directory only appears once all of its files are written, and
//! `current.json` is swapped last. Readers that resolve the pointer first
//! never pair files from two different runs.

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize, de::DeserializeOwned};
use std::{
    fs::{self, File},
    io::{self, BufReader, BufWriter, Write},
    path::{Path, PathBuf},
    time::Instant,
};
use thiserror::Error;
use tracing::{debug, info};

use crate::schedule::encode::{self, Artifacts, PatternFile, ScheduleFile};

const POINTER_FILE: &str = "current.json";
const MANIFEST_FILE: &str = "manifest.json";
const STAGING_PREFIX: &str = ".staging-";

#[derive(Error, Debug)]
pub enum Error {
    #[error("IO error: {0}")]
    Io(#[from] io::Error),
    #[error("Json error: {0}")]
    Json(#[from] serde_json::Error),
    #[error("Artifacts failed verification: {0}")]
    Verify(#[from] encode::Error),
    #[error("Invalid version name {0:?}")]
    InvalidVersion(String),
    #[error("Invalid station slug {0:?}")]
    InvalidSlug(String),
    #[error("Version {0} has already been published")]
    VersionExists(String),
    #[error("Nothing has been published yet")]
    NothingPublished,
    #[error("Version {version} has no station {slug}")]
    UnknownStation { version: String, slug: String },
}

#[derive(Debug, Clone)]
pub struct Config {
    pub output_dir: PathBuf,
    /// Published versions kept on disk, the live one included.
    pub keep_versions: usize,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            output_dir: PathBuf::from("public"),
            keep_versions: 3,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Manifest {
    pub version: String,
    pub format_version: String,
    pub start_date: NaiveDate,
    pub day_count: u32,
    pub generated_at: DateTime<Utc>,
    pub origins: Vec<String>,
}

/// Contents of `current.json`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Pointer {
    pub version: String,
    pub published_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Default)]
pub struct Publisher {
    config: Config,
}

impl Publisher {
    pub fn new<P: Into<PathBuf>>(output_dir: P) -> Self {
        Self {
            config: Config {
                output_dir: output_dir.into(),
                ..Default::default()
            },
        }
    }

    pub fn with_config(mut self, config: Config) -> Self {
        self.config = config;
        self
    }

    pub fn output_dir(&self) -> &Path {
        &self.config.output_dir
    }

    /// Writes `artifacts` as `version` and makes it the live version.
    ///
    /// Nothing is written when verification fails. An error before the pointer
    /// swap leaves the previous version live.
    pub fn publish(&self, artifacts: &Artifacts, version: &str) -> Result<Manifest, self::Error> {
        validate_version(version)?;
        artifacts.verify()?;

        let root = &self.config.output_dir;
        let target = root.join(version);
        if target.exists() {
            return Err(Error::VersionExists(version.to_string()));
        }

        debug!("Writing version {version}...");
        let now = Instant::now();
        let staging = root.join(format!("{STAGING_PREFIX}{version}"));
        if staging.exists() {
            fs::remove_dir_all(&staging)?;
        }
        fs::create_dir_all(staging.join("schedules"))?;
        fs::create_dir_all(staging.join("patterns"))?;
        for station in artifacts.stations.iter() {
            let file = format!("{}.json", station.slug);
            write_json(&staging.join("schedules").join(&file), &station.schedule)?;
            write_json(&staging.join("patterns").join(&file), &station.patterns)?;
        }
        let manifest = Manifest {
            version: version.to_string(),
            format_version: artifacts.format_version.clone(),
            start_date: artifacts.start_date,
            day_count: artifacts.day_count,
            generated_at: Utc::now(),
            origins: artifacts.origins().map(String::from).collect(),
        };
        write_json(&staging.join(MANIFEST_FILE), &manifest)?;
        fs::rename(&staging, &target)?;
        debug!("Writing version {version} took {:?}", now.elapsed());

        let pointer = Pointer {
            version: version.to_string(),
            published_at: manifest.generated_at,
        };
        let pointer_path = root.join(POINTER_FILE);
        let temp_path = root.join(format!("{POINTER_FILE}.tmp"));
        write_json(&temp_path, &pointer)?;
        fs::rename(temp_path, pointer_path)?;
        info!(
            "Published {} stations as version {version}",
            manifest.origins.len()
        );

        self.prune(version)?;
        Ok(manifest)
    }

    /// The live pointer, `None` before the first publication.
    pub fn current(&self) -> Result<Option<Pointer>, self::Error> {
        let path = self.config.output_dir.join(POINTER_FILE);
        if !path.exists() {
            return Ok(None);
        }
        Ok(Some(read_json(&path)?))
    }

    pub fn manifest(&self, version: &str) -> Result<Manifest, self::Error> {
        validate_version(version)?;
        read_json(&self.config.output_dir.join(version).join(MANIFEST_FILE))
    }

    /// Published versions, newest first.
    pub fn versions(&self) -> Result<Vec<Manifest>, self::Error> {
        let root = &self.config.output_dir;
        if !root.exists() {
            return Ok(Vec::new());
        }
        let mut manifests = Vec::new();
        for entry in fs::read_dir(root)? {
            let entry = entry?;
            let name = entry.file_name();
            let Some(name) = name.to_str() else {
                continue;
            };
            let path = entry.path().join(MANIFEST_FILE);
            if name.starts_with('.') || !path.is_file() {
                continue;
            }
            manifests.push(read_json::<Manifest>(&path)?);
        }
        manifests.sort_by(|a, b| {
            b.generated_at
                .cmp(&a.generated_at)
                .then_with(|| b.version.cmp(&a.version))
        });
        Ok(manifests)
    }

    /// Reads the schedule and pattern file of `slug` from one version.
    pub fn load_station(
        &self,
        version: &str,
        slug: &str,
    ) -> Result<(ScheduleFile, PatternFile), self::Error> {
        validate_version(version)?;
        validate_slug(slug)?;
        let dir = self.config.output_dir.join(version);
        let file = format!("{slug}.json");
        let schedule_path = dir.join("schedules").join(&file);
        let patterns_path = dir.join("patterns").join(&file);
        if !schedule_path.is_file() || !patterns_path.is_file() {
            return Err(Error::UnknownStation {
                version: version.to_string(),
                slug: slug.to_string(),
            });
        }
        Ok((read_json(&schedule_path)?, read_json(&patterns_path)?))
    }

    /// Like [`Publisher::load_station`] for whatever version is live.
    pub fn load_current_station(
        &self,
        slug: &str,
    ) -> Result<(ScheduleFile, PatternFile), self::Error> {
        let pointer = self.current()?.ok_or(Error::NothingPublished)?;
        self.load_station(&pointer.version, slug)
    }

    fn prune(&self, live: &str) -> Result<(), self::Error> {
        let keep = self.config.keep_versions.max(1);
        let stale = self
            .versions()?
            .into_iter()
            .filter(|manifest| manifest.version != live)
            .skip(keep - 1);
        for manifest in stale {
            debug!("Removing version {}", manifest.version);
            fs::remove_dir_all(self.config.output_dir.join(&manifest.version))?;
        }
        Ok(())
    }
}

fn validate_version(version: &str) -> Result<(), self::Error> {
    let valid = !version.is_empty()
        && !version.starts_with('.')
        && version != POINTER_FILE
        && version
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || matches!(c, '-' | '_' | '.'));
    if valid {
        Ok(())
    } else {
        Err(Error::InvalidVersion(version.to_string()))
    }
}

/// Slugs are upper-case words joined by `_`, so anything else cannot name a
/// published station.
fn validate_slug(slug: &str) -> Result<(), self::Error> {
    if !slug.is_empty() && slug.chars().all(|c| c.is_alphanumeric() || c == '_') {
        Ok(())
    } else {
        Err(Error::InvalidSlug(slug.to_string()))
    }
}

fn write_json<T: Serialize>(path: &Path, value: &T) -> Result<(), self::Error> {
    let mut writer = BufWriter::new(File::create(path)?);
    serde_json::to_writer(&mut writer, value)?;
    writer.flush()?;
    Ok(())
}

fn read_json<T: DeserializeOwned>(path: &Path) -> Result<T, self::Error> {
    let reader = BufReader::new(File::open(path)?);
    Ok(serde_json::from_reader(reader)?)
}
