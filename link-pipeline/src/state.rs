use crate::traits::DedupStore;
use crate::types::{ContentKind, ExtractionRecord, PipelineError, Result, SummaryRecord};
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};
use tempfile::NamedTempFile;
use tracing::debug;

/// Logical artifact areas under `<root>/artifacts/`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ArtifactArea {
    Html,
    Videos,
    Summaries,
}

impl ArtifactArea {
    pub fn dir_name(&self) -> &'static str {
        match self {
            ArtifactArea::Html => "html",
            ArtifactArea::Videos => "videos",
            ArtifactArea::Summaries => "summaries",
        }
    }

    pub fn for_kind(kind: ContentKind) -> Self {
        match kind {
            ContentKind::Article => ArtifactArea::Html,
            ContentKind::Video => ArtifactArea::Videos,
        }
    }
}

/// Filesystem-backed artifact storage, one JSON document per content key.
///
/// The summaries area doubles as the dedup store: a key is processed iff
/// `summaries/<key>.json` exists.
#[derive(Debug, Clone)]
pub struct ArtifactStore {
    base: PathBuf,
}

impl ArtifactStore {
    pub fn new(root: impl AsRef<Path>) -> Self {
        Self {
            base: root.as_ref().join("artifacts"),
        }
    }

    pub fn area_dir(&self, area: ArtifactArea) -> PathBuf {
        self.base.join(area.dir_name())
    }

    pub fn artifact_path(&self, area: ArtifactArea, content_key: &str) -> PathBuf {
        self.area_dir(area).join(format!("{}.json", content_key))
    }

    pub fn ensure_area(&self, area: ArtifactArea) -> Result<PathBuf> {
        let dir = self.area_dir(area);
        ensure_dir(&dir)?;
        Ok(dir)
    }

    pub fn ensure_layout(&self) -> Result<()> {
        for area in [ArtifactArea::Html, ArtifactArea::Videos, ArtifactArea::Summaries] {
            self.ensure_area(area)?;
        }
        Ok(())
    }

    pub fn write_extraction(&self, record: &ExtractionRecord) -> Result<PathBuf> {
        let area = ArtifactArea::for_kind(record.content_kind);
        self.write_json(area, &record.content_key, record)
    }

    pub fn write_summary(&self, record: &SummaryRecord) -> Result<PathBuf> {
        self.write_json(ArtifactArea::Summaries, &record.content_key, record)
    }

    pub fn read_extraction(&self, kind: ContentKind, content_key: &str) -> Result<ExtractionRecord> {
        self.read_json(ArtifactArea::for_kind(kind), content_key)
    }

    pub fn read_summary(&self, content_key: &str) -> Result<SummaryRecord> {
        self.read_json(ArtifactArea::Summaries, content_key)
    }

    /// Write via a temp file in the same directory, then rename over the target,
    /// so a half-written file can never be mistaken for a dedup marker.
    fn write_json<T: Serialize>(&self, area: ArtifactArea, content_key: &str, value: &T) -> Result<PathBuf> {
        let dir = self.ensure_area(area)?;
        let target = self.artifact_path(area, content_key);
        let json = serde_json::to_string_pretty(value)?;

        let mut tmp = NamedTempFile::new_in(&dir)?;
        tmp.write_all(json.as_bytes())?;
        tmp.flush()?;
        tmp.as_file_mut().sync_all()?;
        tmp.persist(&target).map_err(|e| PipelineError::Io(e.error))?;

        debug!("Wrote artifact {}", target.display());
        Ok(target)
    }

    fn read_json<T: DeserializeOwned>(&self, area: ArtifactArea, content_key: &str) -> Result<T> {
        let content = fs::read_to_string(self.artifact_path(area, content_key))?;
        Ok(serde_json::from_str(&content)?)
    }
}

impl DedupStore for ArtifactStore {
    fn exists(&self, content_key: &str) -> Result<bool> {
        let path = self.artifact_path(ArtifactArea::Summaries, content_key);
        Ok(path.try_exists()?)
    }
}

fn ensure_dir(dir: &Path) -> Result<()> {
    if dir.exists() {
        if !fs::metadata(dir)?.is_dir() {
            return Err(PipelineError::General(format!(
                "artifact path {} is not a directory",
                dir.display()
            )));
        }
        return Ok(());
    }
    fs::create_dir_all(dir)?;
    Ok(())
}
