use std::path::Path;

use crate::config::ConfigError;

const S3_SCHEME: &str = "s3://";

/// Splits `s3://bucket/some/prefix` into the bucket name and a key prefix
/// normalized to end with `/`. A bare bucket name has an empty prefix.
pub fn parse_bucket_uri(bucket_uri: &str) -> Result<(String, String), ConfigError> {
    let rest = match bucket_uri.split_once("://") {
        Some(_) if !bucket_uri.starts_with(S3_SCHEME) => {
            return Err(ConfigError::InvalidBucketUri(bucket_uri.to_string()));
        }
        Some((_, rest)) => rest,
        None => bucket_uri,
    };

    let (bucket, prefix) = rest.split_once('/').unwrap_or((rest, ""));
    if bucket.is_empty() {
        return Err(ConfigError::InvalidBucketUri(bucket_uri.to_string()));
    }

    Ok((bucket.to_string(), normalize_prefix(prefix)))
}

pub fn normalize_prefix(prefix: &str) -> String {
    let prefix = prefix.trim_matches('/');
    if prefix.is_empty() {
        String::new()
    } else {
        format!("{}/", prefix)
    }
}

/// Derives a fresh storage key: `{prefix}{uuid}/{name}`.
pub fn storage_key(prefix: &str, name: &str) -> String {
    format!("{}{}/{}", prefix, uuid::Uuid::new_v4(), name)
}

pub fn name_from_key(key: &str) -> &str {
    key.rsplit_once('/').map(|(_, name)| name).unwrap_or(key)
}

/// Extension with its leading dot, or empty when the name has none.
pub fn extension(name: &str) -> String {
    Path::new(name)
        .extension()
        .map(|ext| format!(".{}", ext.to_string_lossy()))
        .unwrap_or_default()
}
