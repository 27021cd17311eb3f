//! Raw page artifacts on disk
//!
//! Each saved page becomes `{source}_{item_id}.html` plus
//! `{source}_{item_id}_meta.json`, where `item_id` is a zero-padded,
//! 1-based sequence number shared by every source in one writer.

use crate::output::traits::{ArtifactMeta, ArtifactRecord, ArtifactWriter, OutputResult};
use crate::url::source_label;
use chrono::{DateTime, SecondsFormat, Utc};
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU32, Ordering};

/// Writes artifacts into a single directory
#[derive(Debug)]
pub struct FileArtifactWriter {
    dir: PathBuf,
    next_id: AtomicU32,
}

impl FileArtifactWriter {
    /// Creates the writer, creating `dir` if needed
    pub fn new(dir: impl Into<PathBuf>) -> OutputResult<Self> {
        let dir = dir.into();
        fs::create_dir_all(&dir)?;
        Ok(Self {
            dir,
            next_id: AtomicU32::new(1),
        })
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }
}

impl ArtifactWriter for FileArtifactWriter {
    fn write(
        &self,
        url: &str,
        html: &str,
        crawl_time: DateTime<Utc>,
    ) -> OutputResult<ArtifactRecord> {
        let item_id = self.next_id.fetch_add(1, Ordering::SeqCst);
        let source = source_label(url);
        let stem = format!("{}_{:05}", source, item_id);

        let html_path = self.dir.join(format!("{}.html", stem));
        let meta_path = self.dir.join(format!("{}_meta.json", stem));

        let meta = ArtifactMeta {
            url: url.to_string(),
            crawl_time: crawl_time.to_rfc3339_opts(SecondsFormat::Secs, true),
            source,
        };

        fs::write(&html_path, html)?;
        fs::write(&meta_path, serde_json::to_string_pretty(&meta)?)?;

        tracing::debug!("Saved artifact {} for {}", stem, url);

        Ok(ArtifactRecord {
            item_id,
            html_path,
            meta_path,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use tempfile::TempDir;

    fn crawl_time() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2025, 2, 1, 8, 30, 0).unwrap()
    }

    #[test]
    fn test_writes_html_and_meta() {
        let tmp = TempDir::new().unwrap();
        let writer = FileArtifactWriter::new(tmp.path()).unwrap();

        let record = writer
            .write("https://jobs.example.fi/open/1", "<html>hi</html>", crawl_time())
            .unwrap();

        assert_eq!(record.item_id, 1);
        assert_eq!(
            record.html_path,
            tmp.path().join("jobs-example-fi_00001.html")
        );
        assert_eq!(
            fs::read_to_string(&record.html_path).unwrap(),
            "<html>hi</html>"
        );

        let meta: ArtifactMeta =
            serde_json::from_str(&fs::read_to_string(&record.meta_path).unwrap()).unwrap();
        assert_eq!(
            meta,
            ArtifactMeta {
                url: "https://jobs.example.fi/open/1".to_string(),
                crawl_time: "2025-02-01T08:30:00Z".to_string(),
                source: "jobs-example-fi".to_string(),
            }
        );
    }

    #[test]
    fn test_sequence_shared_across_sources() {
        let tmp = TempDir::new().unwrap();
        let writer = FileArtifactWriter::new(tmp.path().join("nested/raw")).unwrap();

        writer.write("https://a.example/", "a", crawl_time()).unwrap();
        let second = writer.write("https://b.example/", "b", crawl_time()).unwrap();

        assert_eq!(second.item_id, 2);
        assert!(second.meta_path.ends_with("b-example_00002_meta.json"));
        assert!(writer.dir().join("a-example_00001.html").exists());
    }
}
