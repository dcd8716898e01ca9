//! Samples published by the judge as a zip archive

use async_trait::async_trait;
use std::io::Cursor;
use std::path::Path;
use tracing::{debug, warn};

use super::{scan_dir, validate_problem_id, Origin, Sample, SampleSource, StemFilter};
use crate::core::utils::extract_zip;
use crate::error::{JudgeError, Result};

const SOURCE_NAME: &str = "remote";

#[derive(Debug, Clone)]
pub struct RemoteSource {
    client: reqwest::Client,
    base_url: String,
}

impl RemoteSource {
    pub fn new(client: reqwest::Client, base_url: impl Into<String>) -> Self {
        Self {
            client,
            base_url: base_url.into().trim_end_matches('/').to_string(),
        }
    }

    pub fn archive_url(&self, problem: &str) -> String {
        format!(
            "{}/problems/{}/file/statement/samples.zip",
            self.base_url, problem
        )
    }

    fn fetch_failed(reason: impl ToString) -> JudgeError {
        JudgeError::SampleFetchFailed {
            source_name: SOURCE_NAME.to_string(),
            reason: reason.to_string(),
        }
    }
}

/// Unpack a sample archive and read every `*.in` file in it
pub fn samples_from_archive(archive: &[u8]) -> Result<Vec<Sample>> {
    let dir = tempfile::tempdir()?;
    extract_zip(Cursor::new(archive), dir.path()).map_err(RemoteSource::fetch_failed)?;
    scan_dir(dir.path(), &StemFilter::Any, Origin::Remote)
}

#[async_trait]
impl SampleSource for RemoteSource {
    fn name(&self) -> &str {
        SOURCE_NAME
    }

    async fn find(&self, problem: &str, _dir: &Path) -> Result<Vec<Sample>> {
        validate_problem_id(problem)?;
        let url = self.archive_url(problem);
        debug!("Downloading samples from {}", url);

        let response = self
            .client
            .get(&url)
            .send()
            .await
            .map_err(Self::fetch_failed)?;

        if !response.status().is_success() {
            // No published samples for this problem
            warn!("No remote samples for {} ({})", problem, response.status());
            return Ok(Vec::new());
        }

        let archive = response.bytes().await.map_err(Self::fetch_failed)?;
        tokio::task::spawn_blocking(move || samples_from_archive(&archive))
            .await
            .map_err(Self::fetch_failed)?
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::http_stub::serve_once;
    use crate::samples::fake::sample;
    use std::io::Write;
    use zip::write::SimpleFileOptions;

    fn archive(files: &[(&str, &str)]) -> Vec<u8> {
        let mut buffer = Cursor::new(Vec::new());
        {
            let mut writer = zip::ZipWriter::new(&mut buffer);
            for (name, content) in files {
                writer.start_file(*name, SimpleFileOptions::default()).unwrap();
                writer.write_all(content.as_bytes()).unwrap();
            }
            writer.finish().unwrap();
        }
        buffer.into_inner()
    }

    #[test]
    fn test_archive_samples_are_tagged_remote() {
        let data = archive(&[
            ("2.in", "uuuuuuuuuuuuuu\n"),
            ("2.ans", "14\n"),
            ("1.in", "uuuuu\n"),
            ("1.ans", "5\n"),
        ]);

        let samples = samples_from_archive(&data).unwrap();
        assert_eq!(
            samples,
            [
                sample("1.in", Origin::Remote, "uuuuu\n", Some("5\n")),
                sample("2.in", Origin::Remote, "uuuuuuuuuuuuuu\n", Some("14\n")),
            ]
        );
    }

    #[test]
    fn test_garbage_archive_is_a_fetch_failure() {
        let err = samples_from_archive(b"this is not a zip").unwrap_err();
        assert!(matches!(err, JudgeError::SampleFetchFailed { .. }));
    }

    #[test]
    fn test_archive_url() {
        let source = RemoteSource::new(reqwest::Client::new(), "https://open.kattis.com/");
        assert_eq!(
            source.archive_url("hello"),
            "https://open.kattis.com/problems/hello/file/statement/samples.zip"
        );
    }

    #[tokio::test]
    async fn test_missing_archive_means_no_samples() {
        let base = serve_once("404 Not Found", "no such file").await;
        let source = RemoteSource::new(reqwest::Client::new(), base);

        let samples = source.find("hello", Path::new(".")).await.unwrap();
        assert!(samples.is_empty());
    }

    #[tokio::test]
    async fn test_downloaded_archive_is_extracted() {
        let data = archive(&[("1.in", "3\n"), ("1.ans", "6\n"), ("2.in", "4\n")]);
        let base = serve_once("200 OK", data).await;
        let source = RemoteSource::new(reqwest::Client::new(), base);

        let samples = source.find("hello", Path::new(".")).await.unwrap();
        assert_eq!(
            samples,
            [
                sample("1.in", Origin::Remote, "3\n", Some("6\n")),
                sample("2.in", Origin::Remote, "4\n", None),
            ]
        );
    }

    #[tokio::test]
    async fn test_unreachable_judge_is_a_fetch_failure() {
        // Nothing listens on the discard port
        let source = RemoteSource::new(reqwest::Client::new(), "http://127.0.0.1:9");
        let err = source.find("hello", Path::new(".")).await.unwrap_err();
        assert!(matches!(err, JudgeError::SampleFetchFailed { .. }));
    }
}
