use thiserror::Error;

use crate::util;

pub const DEFAULT_PAGE_SIZE: u32 = 15;
pub const MAX_PAGE_SIZE: u32 = 50;

#[derive(Debug, Error, PartialEq)]
pub enum ConfigError {
    #[error("bucket must not be empty")]
    EmptyBucket,

    #[error("unsupported bucket uri: {0}")]
    InvalidBucketUri(String),

    #[error("invalid pagination: default {default}, max {max}")]
    InvalidPagination { default: u32, max: u32 },
}

#[derive(Clone, Debug)]
pub struct Credentials {
    pub access_key_id: String,
    pub secret_access_key: String,
}

/// What `list` does with a requested size outside `1..=max`.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum OversizePolicy {
    #[default]
    Clamp,
    Reject,
}

#[derive(Clone, Debug)]
pub struct Pagination {
    pub default: u32,
    pub max: u32,
    pub policy: OversizePolicy,
}

impl Default for Pagination {
    fn default() -> Self {
        Self {
            default: DEFAULT_PAGE_SIZE,
            max: MAX_PAGE_SIZE,
            policy: OversizePolicy::Clamp,
        }
    }
}

#[derive(Clone, Debug)]
pub struct StorageConfig {
    pub bucket: String,
    pub region: String,
    /// Key prefix all objects are written under, empty or ending in `/`.
    pub prefix: String,
    /// S3-compatible endpoint; `None` means AWS.
    pub endpoint: Option<String>,
    /// Static credentials; `None` defers to the SDK's default provider chain.
    pub credentials: Option<Credentials>,
    pub pagination: Pagination,
    /// Uploads larger than this many bytes fail; `None` means no limit.
    pub max_upload_size: Option<u64>,
}

impl StorageConfig {
    pub fn new(bucket: impl Into<String>, region: impl Into<String>) -> Self {
        Self {
            bucket: bucket.into(),
            region: region.into(),
            prefix: String::new(),
            endpoint: None,
            credentials: None,
            pagination: Pagination::default(),
            max_upload_size: None,
        }
    }

    /// Builds a config from `s3://bucket/prefix` or a bare bucket name.
    pub fn from_bucket_uri(bucket_uri: &str, region: impl Into<String>) -> Result<Self, ConfigError> {
        let (bucket, prefix) = util::object::parse_bucket_uri(bucket_uri)?;

        Ok(Self {
            prefix,
            ..Self::new(bucket, region)
        })
    }

    pub fn with_prefix(mut self, prefix: &str) -> Self {
        self.prefix = util::object::normalize_prefix(prefix);
        self
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.bucket.is_empty() {
            return Err(ConfigError::EmptyBucket);
        }

        let Pagination { default, max, .. } = self.pagination;
        if default == 0 || max == 0 || default > max {
            return Err(ConfigError::InvalidPagination { default, max });
        }

        Ok(())
    }

    /// Public reference for `key`. Virtual-hosted style on AWS, path style on
    /// custom endpoints. Each key segment is percent-encoded.
    pub fn object_url(&self, key: &str) -> String {
        let path = key
            .split('/')
            .map(urlencoding::encode)
            .collect::<Vec<_>>()
            .join("/");

        match &self.endpoint {
            Some(endpoint) => format!("{}/{}/{}", endpoint.trim_end_matches('/'), self.bucket, path),
            None => format!("https://{}.s3.{}.amazonaws.com/{}", self.bucket, self.region, path),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validate() {
        let cases = vec![
            ("bucket", 15, 50, Ok(())),
            ("bucket", 50, 50, Ok(())),
            ("", 15, 50, Err(ConfigError::EmptyBucket)),
            (
                "bucket",
                0,
                50,
                Err(ConfigError::InvalidPagination { default: 0, max: 50 }),
            ),
            (
                "bucket",
                51,
                50,
                Err(ConfigError::InvalidPagination { default: 51, max: 50 }),
            ),
        ];

        for (bucket, default, max, expected) in cases {
            let mut config = StorageConfig::new(bucket, "us-east-1");
            config.pagination.default = default;
            config.pagination.max = max;

            assert_eq!(
                config.validate(),
                expected,
                "failed for case: {} {} {}",
                bucket,
                default,
                max
            );
        }
    }

    #[test]
    fn test_from_bucket_uri() {
        let config = StorageConfig::from_bucket_uri("s3://media/uploads", "eu-west-1").unwrap();

        assert_eq!(config.bucket, "media");
        assert_eq!(config.prefix, "uploads/");
        assert_eq!(config.region, "eu-west-1");
        assert_eq!(config.pagination.default, DEFAULT_PAGE_SIZE);
        assert_eq!(config.pagination.max, MAX_PAGE_SIZE);
    }

    #[test]
    fn test_object_url() {
        let config = StorageConfig::new("media", "eu-west-1");
        assert_eq!(
            config.object_url("k/one.png"),
            "https://media.s3.eu-west-1.amazonaws.com/k/one.png"
        );

        let config = StorageConfig {
            endpoint: Some("http://127.0.0.1:9000/".to_string()),
            ..StorageConfig::new("media", "us-east-1")
        };
        assert_eq!(
            config.object_url("k/one.png"),
            "http://127.0.0.1:9000/media/k/one.png"
        );
    }

    #[test]
    fn test_object_url_encodes_segments() {
        let config = StorageConfig::new("media", "eu-west-1");

        let cases = vec![
            ("k/my file.png", "k/my%20file.png"),
            ("k/a#b?.png", "k/a%23b%3F.png"),
            ("uploads/k/100%.txt", "uploads/k/100%25.txt"),
            ("k/one.png", "k/one.png"),
        ];

        for (key, path) in cases {
            assert_eq!(
                config.object_url(key),
                format!("https://media.s3.eu-west-1.amazonaws.com/{}", path),
                "failed for case: {}",
                key
            );
        }
    }
}
