//! JSON output of the response envelope.
//!
//! # Output Structure
//!
//! ```text
//! json_output_dir/
//! └── cluster-1735689600000-k3v9x2a.json
//! ```
//!
//! Failed runs have no cluster id and are written as `failed-<unix millis>.json`.

use std::error::Error;
use std::path::{Path, PathBuf};

use tokio::fs;
use tracing::{error, info, instrument};

use crate::models::ProcessNewsResponse;

/// File name for an envelope: the cluster id, or a timestamped failure name.
///
/// # Arguments
///
/// * `response` - The envelope being written
/// * `now_millis` - Unix time in milliseconds, used only for failed runs
///
/// # Returns
///
/// `<clusterId>.json` with every character outside `[A-Za-z0-9._-]`
/// replaced by `_`, so the name never leaves the output directory, or
/// `failed-<now_millis>.json` when there is no cluster.
pub fn output_filename(response: &ProcessNewsResponse, now_millis: i64) -> String {
    match &response.data {
        Some(cluster) => format!("{}.json", file_stem(&cluster.cluster_id)),
        None => format!("failed-{now_millis}.json"),
    }
}

fn file_stem(cluster_id: &str) -> String {
    cluster_id
        .chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() || matches!(c, '.' | '-' | '_') {
                c
            } else {
                '_'
            }
        })
        .collect()
}

/// Serialize `response` as pretty JSON.
pub fn to_pretty_json(response: &ProcessNewsResponse) -> Result<String, serde_json::Error> {
    serde_json::to_string_pretty(response)
}

/// Write `response` into `json_output_dir`, returning the file path.
#[instrument(level = "info", skip_all, fields(json_output_dir = %json_output_dir))]
pub async fn write_response(
    response: &ProcessNewsResponse,
    json_output_dir: &str,
    now_millis: i64,
) -> Result<PathBuf, Box<dyn Error>> {
    let json = to_pretty_json(response)?;
    let path = Path::new(json_output_dir).join(output_filename(response, now_millis));

    info!(path = %path.display(), "Writing JSON");
    if let Err(e) = fs::write(&path, json).await {
        error!(path = %path.display(), error = %e, "Failed to write JSON");
        return Err(e.into());
    }
    info!(path = %path.display(), "Wrote JSON response file");
    Ok(path)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::Cluster;

    fn cluster() -> Cluster {
        Cluster {
            cluster_id: "cluster-1-abcdefg".to_string(),
            title: "T".to_string(),
            summary: "S".to_string(),
            article_count: 0,
            latest_date: "2025-01-01T00:00:00.000Z".to_string(),
            sources: vec![],
        }
    }

    #[test]
    fn test_output_filename() {
        assert_eq!(
            output_filename(&ProcessNewsResponse::ok(cluster()), 5),
            "cluster-1-abcdefg.json"
        );
        assert_eq!(
            output_filename(&ProcessNewsResponse::failed("x"), 5),
            "failed-5.json"
        );
    }

    #[test]
    fn test_output_filename_stays_in_directory() {
        let mut escaping = cluster();
        escaping.cluster_id = "../../etc/x".to_string();
        let name = output_filename(&ProcessNewsResponse::ok(escaping), 5);
        assert_eq!(name, ".._.._etc_x.json");
        assert!(!name.contains('/'));

        let mut windows = cluster();
        windows.cluster_id = r"..\evil id".to_string();
        assert_eq!(
            output_filename(&ProcessNewsResponse::ok(windows), 5),
            ".._evil_id.json"
        );
    }

    #[tokio::test]
    async fn test_write_response_keeps_raw_id_in_body() {
        let dir = std::env::temp_dir().join(format!("news_cluster_json_sep_{}", std::process::id()));
        std::fs::create_dir_all(&dir).unwrap();
        let mut escaping = cluster();
        escaping.cluster_id = "../outside".to_string();

        let path = write_response(&ProcessNewsResponse::ok(escaping), &dir.to_string_lossy(), 0)
            .await
            .unwrap();

        assert_eq!(path.parent().unwrap(), dir.as_path());
        assert_eq!(path.file_name().unwrap(), ".._outside.json");
        let written: ProcessNewsResponse =
            serde_json::from_str(&std::fs::read_to_string(&path).unwrap()).unwrap();
        assert_eq!(written.data.unwrap().cluster_id, "../outside");
        let _ = std::fs::remove_dir_all(&dir);
    }

    #[tokio::test]
    async fn test_write_response_round_trip() {
        let dir = std::env::temp_dir().join(format!("news_cluster_json_{}", std::process::id()));
        std::fs::create_dir_all(&dir).unwrap();

        let path = write_response(&ProcessNewsResponse::ok(cluster()), &dir.to_string_lossy(), 0)
            .await
            .unwrap();
        let written: ProcessNewsResponse =
            serde_json::from_str(&std::fs::read_to_string(&path).unwrap()).unwrap();

        assert!(written.success);
        assert_eq!(written.data.unwrap().cluster_id, "cluster-1-abcdefg");
        let _ = std::fs::remove_dir_all(&dir);
    }
}
