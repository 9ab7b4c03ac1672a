use async_trait::async_trait;
use sha2::{Digest, Sha256};
use std::path::{Path, PathBuf};

use crate::error::SinkError;
use crate::http::slugify_url;
use crate::types::RecipeRecord;

use super::StagingSink;

const URL_HASH_LEN: usize = 12;

/// One pretty-printed JSON file per record at
/// `<dir>/<slug(source_url)>-<hash>.json`.
///
/// The slug keeps names readable but is lossy (no query string, capped
/// length), so a short SHA-256 of the full `source_url` keeps every upsert
/// key on its own file. Files are written to a temporary name and renamed into place, so readers
/// never see a half-written record.
#[derive(Debug, Clone)]
pub struct FileSink {
    dir: PathBuf,
}

impl FileSink {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    pub fn path_for(&self, source_url: &str) -> PathBuf {
        let digest = hex::encode(Sha256::digest(source_url.as_bytes()));
        self.dir.join(format!(
            "{}-{}.json",
            slugify_url(source_url),
            &digest[..URL_HASH_LEN]
        ))
    }
}

#[async_trait]
impl StagingSink for FileSink {
    async fn upsert(&self, record: &RecipeRecord) -> Result<(), SinkError> {
        let json = serde_json::to_vec_pretty(record)?;
        let path = self.path_for(&record.source_url);
        let tmp = path.with_extension("json.tmp");

        tokio::fs::create_dir_all(&self.dir).await?;
        tokio::fs::write(&tmp, json).await?;
        tokio::fs::rename(&tmp, &path).await?;

        tracing::debug!(path = %path.display(), "record written");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sink::test_support::record;
    use crate::types::ExtractStatus;

    #[tokio::test]
    async fn writes_one_file_per_source_url() {
        let dir = tempfile::tempdir().unwrap();
        let sink = FileSink::new(dir.path().join("staging"));
        let url = "https://cookpad.com/vn/cong-thuc/42";

        sink.upsert(&record(url, ExtractStatus::Fail)).await.unwrap();
        sink.upsert(&record(url, ExtractStatus::Ok)).await.unwrap();

        let path = sink.path_for(url);
        let name = path.file_name().unwrap().to_str().unwrap();
        assert!(name.starts_with("cookpad-com_vn-cong-thuc-42-"));
        assert!(name.ends_with(".json"));
        assert_eq!(name.len(), "cookpad-com_vn-cong-thuc-42-".len() + 12 + ".json".len());
        let stored: RecipeRecord =
            serde_json::from_str(&std::fs::read_to_string(&path).unwrap()).unwrap();
        assert_eq!(stored.extract_status, ExtractStatus::Ok);
        assert_eq!(std::fs::read_dir(sink.dir()).unwrap().count(), 1);
    }

    #[tokio::test]
    async fn urls_sharing_a_slug_keep_separate_files() {
        let dir = tempfile::tempdir().unwrap();
        let sink = FileSink::new(dir.path());
        let plain = "https://cookpad.com/vn/cong-thuc/42";
        let with_query = "https://cookpad.com/vn/cong-thuc/42?lang=en";

        sink.upsert(&record(plain, ExtractStatus::Ok)).await.unwrap();
        sink.upsert(&record(with_query, ExtractStatus::Fail)).await.unwrap();

        assert_ne!(sink.path_for(plain), sink.path_for(with_query));
        assert_eq!(std::fs::read_dir(sink.dir()).unwrap().count(), 2);
        let stored: RecipeRecord =
            serde_json::from_str(&std::fs::read_to_string(sink.path_for(plain)).unwrap())
                .unwrap();
        assert_eq!(stored.extract_status, ExtractStatus::Ok);
    }
}
