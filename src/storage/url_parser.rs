//! Storage URL parsing.
//!
//! Turns the user-facing root strings accepted in config into a backend
//! configuration (bucket/container/path plus an optional key prefix).

use object_store::path::Path;
use regex::{Captures, Regex};
use std::sync::LazyLock;

use crate::error::{InvalidUrlSnafu, StorageError};

use super::{AzureConfig, GcsConfig, LocalConfig, S3Config};

const S3_PATH: &str =
    r"^https://s3\.(?P<region>[\w\-]+)\.amazonaws\.com/(?P<bucket>[a-z0-9\-\.]+)(/(?P<key>.+))?$";
const S3_VIRTUAL: &str =
    r"^https://(?P<bucket>[a-z0-9\-\.]+)\.s3\.(?P<region>[\w\-]+)\.amazonaws\.com(/(?P<key>.+))?$";
const S3_URL: &str = r"^[sS]3[aA]?://(?P<bucket>[a-z0-9\-\.]+)(/(?P<key>.+))?$";
const S3_ENDPOINT_URL: &str = r"^[sS]3[aA]?::(?<protocol>https?)://(?P<endpoint>[^:/]+):(?<port>\d+)/(?P<bucket>[a-z0-9\-\.]+)(/(?P<key>.+))?$";

const GCS_VIRTUAL: &str =
    r"^https://(?P<bucket>[a-z0-9\-_\.]+)\.storage\.googleapis\.com(/(?P<key>.+))?$";
const GCS_PATH: &str =
    r"^https://storage\.googleapis\.com/(?P<bucket>[a-z0-9\-_\.]+)(/(?P<key>.+))?$";
const GCS_URL: &str = r"^[gG][sS]://(?P<bucket>[a-z0-9\-\._]+)(/(?P<key>.+))?$";

const ABFS_URL: &str = r"^abfss?://(?P<container>[a-z0-9\-]+)@(?P<account>[a-z0-9]+)\.dfs\.core\.windows\.net(/(?P<key>.+))?$";
const AZURE_HTTPS: &str = r"^https://(?P<account>[a-z0-9]+)\.(blob|dfs)\.core\.windows\.net/(?P<container>[a-z0-9\-]+)(/(?P<key>.+))?$";

const FILE_URI: &str = r"^file://(?P<path>.*)$";
const FILE_URL: &str = r"^file:(?P<path>.*)$";
const FILE_PATH: &str = r"^/(?P<path>.*)$";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Backend {
    S3,
    Gcs,
    Azure,
    Local,
}

/// Patterns in match order; the first hit wins.
static MATCHERS: LazyLock<Vec<(Backend, Regex)>> = LazyLock::new(|| {
    [
        (Backend::S3, S3_PATH),
        (Backend::S3, S3_VIRTUAL),
        (Backend::S3, S3_ENDPOINT_URL),
        (Backend::S3, S3_URL),
        (Backend::Gcs, GCS_PATH),
        (Backend::Gcs, GCS_VIRTUAL),
        (Backend::Gcs, GCS_URL),
        (Backend::Azure, ABFS_URL),
        (Backend::Azure, AZURE_HTTPS),
        (Backend::Local, FILE_URI),
        (Backend::Local, FILE_URL),
        (Backend::Local, FILE_PATH),
    ]
    .into_iter()
    .map(|(backend, pattern)| (backend, Regex::new(pattern).expect("Invalid regex pattern")))
    .collect()
});

/// Backend configuration enum.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BackendConfig {
    S3(S3Config),
    Gcs(GcsConfig),
    Azure(AzureConfig),
    Local(LocalConfig),
}

impl BackendConfig {
    /// Parse a storage root into a backend configuration.
    pub fn parse_url(url: &str) -> Result<Self, StorageError> {
        let url = url.trim();
        let hit = MATCHERS
            .iter()
            .find_map(|(backend, regex)| regex.captures(url).map(|caps| (*backend, caps)));

        match hit {
            Some((Backend::S3, caps)) => Ok(Self::parse_s3(&caps)),
            Some((Backend::Gcs, caps)) => Ok(Self::parse_gcs(&caps)),
            Some((Backend::Azure, caps)) => Ok(Self::parse_azure(&caps)),
            Some((Backend::Local, caps)) => Ok(Self::parse_local(&caps)),
            None => InvalidUrlSnafu { url }.fail(),
        }
    }

    fn parse_s3(caps: &Captures) -> Self {
        let bucket = group(caps, "bucket");

        let region = std::env::var("AWS_DEFAULT_REGION")
            .ok()
            .or_else(|| caps.name("region").map(|m| m.as_str().to_string()));

        let endpoint = std::env::var("AWS_ENDPOINT").ok().or_else(|| {
            caps.name("endpoint").map(|endpoint| {
                let port = caps
                    .name("port")
                    .and_then(|p| p.as_str().parse::<u16>().ok())
                    .unwrap_or(443);
                let protocol = caps.name("protocol").map(|p| p.as_str()).unwrap_or("https");
                format!("{}://{}:{}", protocol, endpoint.as_str(), port)
            })
        });

        BackendConfig::S3(S3Config {
            endpoint,
            region,
            bucket,
            key: key(caps),
        })
    }

    fn parse_gcs(caps: &Captures) -> Self {
        BackendConfig::Gcs(GcsConfig {
            bucket: group(caps, "bucket"),
            key: key(caps),
        })
    }

    fn parse_azure(caps: &Captures) -> Self {
        BackendConfig::Azure(AzureConfig {
            account: group(caps, "account"),
            container: group(caps, "container"),
            key: key(caps),
        })
    }

    fn parse_local(caps: &Captures) -> Self {
        let path = group(caps, "path");
        let path = format!("/{}", path.trim_start_matches('/'));
        let path = match path.trim_end_matches('/') {
            "" => "/".to_string(),
            trimmed => trimmed.to_string(),
        };
        BackendConfig::Local(LocalConfig { path })
    }

    /// Key prefix inside the bucket/container. Local roots carry none: the
    /// whole path becomes the filesystem store's prefix.
    pub(crate) fn key(&self) -> Option<&Path> {
        match self {
            BackendConfig::S3(s3) => s3.key.as_ref(),
            BackendConfig::Gcs(gcs) => gcs.key.as_ref(),
            BackendConfig::Azure(azure) => azure.key.as_ref(),
            BackendConfig::Local(_) => None,
        }
    }
}

fn group(caps: &Captures, name: &str) -> String {
    caps.name(name)
        .map(|m| m.as_str().to_string())
        .unwrap_or_default()
}

/// Optional key group, normalised so "a/b/" and "a/b" are the same prefix.
fn key(caps: &Captures) -> Option<Path> {
    caps.name("key")
        .map(|m| Path::from(m.as_str().trim_matches('/')))
        .filter(|p| p.parts().count() > 0)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_s3_url_parsing() {
        let config = BackendConfig::parse_url("s3a://udacity-dend/").unwrap();
        match config {
            BackendConfig::S3(s3) => {
                assert_eq!(s3.bucket, "udacity-dend");
                assert_eq!(s3.key, None);
            }
            _ => panic!("Expected S3 config"),
        }

        let config = BackendConfig::parse_url("s3://analytics/sparkify/out").unwrap();
        match config {
            BackendConfig::S3(s3) => {
                assert_eq!(s3.bucket, "analytics");
                assert_eq!(s3.key, Some(Path::from("sparkify/out")));
            }
            _ => panic!("Expected S3 config"),
        }
    }

    #[test]
    fn test_s3_https_forms() {
        let config =
            BackendConfig::parse_url("https://s3.eu-west-1.amazonaws.com/bucket/key").unwrap();
        let BackendConfig::S3(path_style) = config else {
            panic!("Expected S3 config");
        };
        assert_eq!(path_style.bucket, "bucket");
        assert_eq!(path_style.key, Some(Path::from("key")));

        let config = BackendConfig::parse_url("https://bucket.s3.us-west-2.amazonaws.com").unwrap();
        assert!(matches!(config, BackendConfig::S3(S3Config { key: None, .. })));
    }

    #[test]
    fn test_s3_custom_endpoint() {
        if std::env::var("AWS_ENDPOINT").is_ok() {
            return;
        }
        let config = BackendConfig::parse_url("s3::http://localhost:9000/bucket/data").unwrap();
        let BackendConfig::S3(s3) = config else {
            panic!("Expected S3 config");
        };
        assert_eq!(s3.endpoint.as_deref(), Some("http://localhost:9000"));
        assert_eq!(s3.bucket, "bucket");
        assert_eq!(s3.key, Some(Path::from("data")));
    }

    #[test]
    fn test_gcs_url_parsing() {
        let config = BackendConfig::parse_url("gs://mybucket/path/to/data").unwrap();
        match config {
            BackendConfig::Gcs(gcs) => {
                assert_eq!(gcs.bucket, "mybucket");
                assert_eq!(gcs.key, Some(Path::from("path/to/data")));
            }
            _ => panic!("Expected Gcs config"),
        }
    }

    #[test]
    fn test_azure_url_parsing() {
        let config = BackendConfig::parse_url(
            "abfss://mycontainer@mystorageaccount.dfs.core.windows.net/path/to/data",
        )
        .unwrap();
        match config {
            BackendConfig::Azure(azure) => {
                assert_eq!(azure.account, "mystorageaccount");
                assert_eq!(azure.container, "mycontainer");
                assert_eq!(azure.key, Some(Path::from("path/to/data")));
            }
            _ => panic!("Expected Azure config"),
        }
    }

    #[test]
    fn test_local_forms() {
        for url in ["/data/sparkify/", "file:///data/sparkify", "file:/data/sparkify"] {
            let config = BackendConfig::parse_url(url).unwrap();
            assert_eq!(
                config,
                BackendConfig::Local(LocalConfig {
                    path: "/data/sparkify".to_string()
                }),
                "{url}"
            );
        }
    }

    #[test]
    fn test_invalid_url() {
        let err = BackendConfig::parse_url("ftp://nowhere/data").unwrap_err();
        assert!(matches!(err, StorageError::InvalidUrl { .. }));
    }
}
