//! Timestamped result files under `<base>/<graphs|reports|metrics>/`.

use std::collections::{BTreeMap, BTreeSet};
use std::fs::{self, File, OpenOptions};
use std::io::{self, BufWriter, Write};
use std::path::{Path, PathBuf};
use std::time::{Duration, SystemTime};

use chrono::{Local, NaiveDateTime, TimeDelta};
use walkdir::WalkDir;

use crate::export::{self, ExportData, ExportFormat};

/// chrono format of the run stamp, e.g. `20250101_120000_000001`.
pub const STAMP_FORMAT: &str = "%Y%m%d_%H%M%S_%6f";

/// Projects listed in [`OutputSummary::recent_projects`].
const RECENT_PROJECTS: usize = 5;

/// Stamps tried before a run gives up on finding free file names.
const MAX_ATTEMPTS: usize = 1000;

const SECONDS_PER_DAY: u64 = 24 * 60 * 60;

/// Errors raised while writing or maintaining output files.
#[derive(Debug, thiserror::Error)]
pub enum WriteError {
    #[error("Failed to create directory {}: {source}", .path.display())]
    CreateDir {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("Failed to write {}: {source}", .path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("No free output file name for '{project}' after {attempts} attempts")]
    Exhausted { project: String, attempts: usize },

    #[error("Invalid project name '{0}'")]
    InvalidProjectName(String),
}

/// Files written by one run. All three share the same stamp.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RunFiles {
    pub stamp: String,
    pub graph: PathBuf,
    pub report: PathBuf,
    pub metrics: PathBuf,
}

impl RunFiles {
    pub fn paths(&self) -> [&Path; 3] {
        [&self.graph, &self.report, &self.metrics]
    }
}

/// Overview of everything under the base directory.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OutputSummary {
    pub base_directory: PathBuf,
    pub total_projects: usize,
    /// File count per category directory
    pub files_per_category: BTreeMap<&'static str, usize>,
    /// Most recently written projects, newest first
    pub recent_projects: Vec<String>,
}

/// Organizes result files by category and run stamp.
///
/// Earlier runs are never overwritten: stamps strictly increase for one
/// manager and every file is opened with `create_new`.
#[derive(Debug)]
pub struct OutputManager {
    base: PathBuf,
    last_stamp: Option<NaiveDateTime>,
}

impl OutputManager {
    /// Creates a manager rooted at `base`. Nothing is created on disk until
    /// the first run is written.
    pub fn new(base: impl Into<PathBuf>) -> Self {
        Self {
            base: base.into(),
            last_stamp: None,
        }
    }

    pub fn base_directory(&self) -> &Path {
        &self.base
    }

    /// Writes the graph JSON, report JSON and metrics CSV of one analysis.
    pub fn write_run(&mut self, data: &ExportData) -> Result<RunFiles, WriteError> {
        self.write_run_at(data, Local::now().naive_local())
    }

    fn write_run_at(&mut self, data: &ExportData, now: NaiveDateTime) -> Result<RunFiles, WriteError> {
        let project = sanitize_project_name(&data.project_name)?;

        for format in ExportFormat::ALL {
            let dir = self.base.join(format.category());
            fs::create_dir_all(&dir).map_err(|source| WriteError::CreateDir { path: dir, source })?;
        }

        let mut stamp = self.next_stamp(now);
        for attempt in 0..MAX_ATTEMPTS {
            let label = stamp.format(STAMP_FORMAT).to_string();
            match self.try_write(data, &project, &label)? {
                Some(files) => {
                    tracing::info!(
                        project = %project,
                        stamp = %label,
                        base = %self.base.display(),
                        "wrote analysis outputs"
                    );
                    self.last_stamp = Some(stamp);
                    return Ok(files);
                }
                None => {
                    tracing::debug!(stamp = %label, attempt, "output name taken, bumping stamp");
                    stamp += TimeDelta::microseconds(1);
                }
            }
        }

        Err(WriteError::Exhausted {
            project,
            attempts: MAX_ATTEMPTS,
        })
    }

    /// The stamp for the next run: `now`, or one microsecond past the last
    /// stamp when the clock has not moved forward.
    fn next_stamp(&self, now: NaiveDateTime) -> NaiveDateTime {
        match self.last_stamp {
            Some(last) if now <= last => last + TimeDelta::microseconds(1),
            _ => now,
        }
    }

    /// Creates the three files of a run. Returns `None` when one of the
    /// names already exists; files created by this attempt are removed.
    fn try_write(
        &self,
        data: &ExportData,
        project: &str,
        stamp: &str,
    ) -> Result<Option<RunFiles>, WriteError> {
        let mut created: Vec<PathBuf> = Vec::with_capacity(ExportFormat::ALL.len());

        for format in ExportFormat::ALL {
            let path = self.path_for(format, project, stamp);
            let file = match OpenOptions::new().write(true).create_new(true).open(&path) {
                Ok(file) => file,
                Err(err) if err.kind() == io::ErrorKind::AlreadyExists => {
                    remove_all(&created);
                    return Ok(None);
                }
                Err(source) => {
                    remove_all(&created);
                    return Err(WriteError::Io { path, source });
                }
            };
            created.push(path.clone());

            if let Err(source) = write_format(file, format, data) {
                remove_all(&created);
                return Err(WriteError::Io { path, source });
            }
        }

        let mut paths = created.into_iter();
        match (paths.next(), paths.next(), paths.next()) {
            (Some(graph), Some(report), Some(metrics)) => Ok(Some(RunFiles {
                stamp: stamp.to_string(),
                graph,
                report,
                metrics,
            })),
            _ => Ok(None),
        }
    }

    fn path_for(&self, format: ExportFormat, project: &str, stamp: &str) -> PathBuf {
        self.base
            .join(format.category())
            .join(format!("{}_{}.{}", project, stamp, format.extension()))
    }

    /// Output files directly inside one category directory, sorted by name.
    fn category_files(&self, category: &str) -> Vec<PathBuf> {
        let dir = self.base.join(category);
        if !dir.is_dir() {
            return Vec::new();
        }

        WalkDir::new(&dir)
            .min_depth(1)
            .max_depth(1)
            .sort_by_file_name()
            .into_iter()
            .filter_map(|e| e.ok())
            .filter(|e| e.file_type().is_file())
            .map(|e| e.into_path())
            .collect()
    }

    /// `(project, stamp)` of every recognized output file.
    fn runs(&self) -> Vec<(String, String)> {
        ExportFormat::ALL
            .iter()
            .flat_map(|format| self.category_files(format.category()))
            .filter_map(|path| split_output_name(&path))
            .collect()
    }

    /// Names of all projects with at least one output file, sorted.
    pub fn list_projects(&self) -> Vec<String> {
        self.runs()
            .into_iter()
            .map(|(project, _)| project)
            .collect::<BTreeSet<_>>()
            .into_iter()
            .collect()
    }

    /// Output files of one project, per category, oldest first.
    pub fn project_files(&self, project: &str) -> BTreeMap<&'static str, Vec<PathBuf>> {
        ExportFormat::ALL
            .iter()
            .map(|format| {
                let files = self
                    .category_files(format.category())
                    .into_iter()
                    .filter(|path| {
                        split_output_name(path).is_some_and(|(name, _)| name == project)
                    })
                    .collect();
                (format.category(), files)
            })
            .collect()
    }

    /// File counts per category and the most recently written projects.
    pub fn summary(&self) -> OutputSummary {
        let files_per_category = ExportFormat::ALL
            .iter()
            .map(|format| (format.category(), self.category_files(format.category()).len()))
            .collect();

        let mut latest: BTreeMap<String, String> = BTreeMap::new();
        for (project, stamp) in self.runs() {
            let entry = latest.entry(project).or_default();
            if stamp > *entry {
                *entry = stamp;
            }
        }

        let total_projects = latest.len();
        let mut by_recency: Vec<(String, String)> = latest.into_iter().collect();
        by_recency.sort_by(|a, b| b.1.cmp(&a.1).then_with(|| a.0.cmp(&b.0)));

        OutputSummary {
            base_directory: self.base.clone(),
            total_projects,
            files_per_category,
            recent_projects: by_recency
                .into_iter()
                .take(RECENT_PROJECTS)
                .map(|(project, _)| project)
                .collect(),
        }
    }

    /// Deletes files under the base directory last modified more than
    /// `days` days ago. Returns the removed paths.
    pub fn cleanup_older_than(&self, days: u64) -> Result<Vec<PathBuf>, WriteError> {
        // An age beyond the representable past matches no file
        let Some(cutoff) = days
            .checked_mul(SECONDS_PER_DAY)
            .and_then(|secs| SystemTime::now().checked_sub(Duration::from_secs(secs)))
        else {
            return Ok(Vec::new());
        };
        if !self.base.is_dir() {
            return Ok(Vec::new());
        }

        let mut removed = Vec::new();
        for entry in WalkDir::new(&self.base).sort_by_file_name() {
            let entry = match entry {
                Ok(entry) => entry,
                Err(err) => {
                    tracing::warn!(error = %err, "skipping unreadable output entry");
                    continue;
                }
            };
            if !entry.file_type().is_file() {
                continue;
            }

            let modified = entry
                .metadata()
                .ok()
                .and_then(|m| m.modified().ok());
            if modified.is_some_and(|m| m < cutoff) {
                let path = entry.into_path();
                fs::remove_file(&path).map_err(|source| WriteError::Io {
                    path: path.clone(),
                    source,
                })?;
                tracing::info!(path = %path.display(), "removed old output file");
                removed.push(path);
            }
        }

        Ok(removed)
    }
}

fn write_format(file: File, format: ExportFormat, data: &ExportData) -> io::Result<()> {
    let mut writer = BufWriter::new(file);
    export::export(format, data, &mut writer)?;
    writer.flush()
}

fn remove_all(paths: &[PathBuf]) {
    for path in paths {
        if let Err(err) = fs::remove_file(path) {
            tracing::warn!(path = %path.display(), error = %err, "failed to remove partial output");
        }
    }
}

/// Replaces characters that cannot appear in a file name.
fn sanitize_project_name(name: &str) -> Result<String, WriteError> {
    let cleaned: String = name
        .trim()
        .chars()
        .map(|c| match c {
            '/' | '\\' | ':' | '*' | '?' | '"' | '<' | '>' | '|' => '-',
            c if c.is_whitespace() || c.is_control() => '-',
            c => c,
        })
        .collect();

    if cleaned.is_empty() || cleaned.chars().all(|c| c == '.') {
        return Err(WriteError::InvalidProjectName(name.to_string()));
    }
    Ok(cleaned)
}

/// Splits `<project>_<YYYYmmdd>_<HHMMSS>_<ffffff>.<ext>` into project and
/// stamp. Files that do not follow the pattern are ignored.
fn split_output_name(path: &Path) -> Option<(String, String)> {
    let stem = path.file_stem()?.to_str()?;
    let mut parts = stem.rsplitn(4, '_');
    let micros = parts.next()?;
    let time = parts.next()?;
    let date = parts.next()?;
    let project = parts.next()?;

    let digits = |s: &str, len: usize| s.len() == len && s.bytes().all(|b| b.is_ascii_digit());
    if project.is_empty() || !digits(date, 8) || !digits(time, 6) || !digits(micros, 6) {
        return None;
    }

    Some((project.to_string(), format!("{}_{}_{}", date, time, micros)))
}
