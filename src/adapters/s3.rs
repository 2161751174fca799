use aws_sdk_s3::{
    config::{BehaviorVersion, Credentials, Region},
    error::DisplayErrorContext,
    primitives::{ByteStream, DateTime},
    Client,
};
use bytes::Bytes;
use futures::future::BoxFuture;
use time::OffsetDateTime;
use tracing::debug;

use crate::{
    adapters,
    config::StorageConfig,
    model::{
        error::ObjectError,
        object::{ObjectPage, StoredObject},
    },
};

const PROVIDER_NAME: &str = "filestore";

/// Builds an S3 client from explicit configuration. Static credentials win
/// over the default provider chain; a custom endpoint switches to path-style
/// addressing.
pub async fn client_from_config(config: &StorageConfig) -> Client {
    let mut loader =
        aws_config::defaults(BehaviorVersion::latest()).region(Region::new(config.region.clone()));

    if let Some(creds) = &config.credentials {
        loader = loader.credentials_provider(Credentials::new(
            creds.access_key_id.clone(),
            creds.secret_access_key.clone(),
            None,
            None,
            PROVIDER_NAME,
        ));
    }

    let sdk_config = loader.load().await;
    let mut builder = aws_sdk_s3::config::Builder::from(&sdk_config);

    if let Some(endpoint) = &config.endpoint {
        builder = builder.endpoint_url(endpoint).force_path_style(true);
    }

    Client::from_conf(builder.build())
}

fn to_offset_date_time(dt: Option<&DateTime>) -> OffsetDateTime {
    let Some(dt) = dt else {
        return OffsetDateTime::UNIX_EPOCH;
    };

    let nanos = i128::from(dt.secs()) * 1_000_000_000 + i128::from(dt.subsec_nanos());
    OffsetDateTime::from_unix_timestamp_nanos(nanos).unwrap_or(OffsetDateTime::UNIX_EPOCH)
}

fn to_size(size: Option<i64>) -> u64 {
    size.map(|size| size.max(0) as u64).unwrap_or(0)
}

impl adapters::ObjectStore for Client {
    fn put<'a>(
        &'a self,
        bucket: &'a str,
        key: &'a str,
        body: Bytes,
        content_type: Option<&'a str>,
    ) -> BoxFuture<'a, Result<StoredObject, ObjectError>> {
        Box::pin(async move {
            let size = body.len() as u64;
            let req = self
                .put_object()
                .bucket(bucket)
                .key(key)
                .content_length(size as i64)
                .set_content_type(content_type.map(str::to_string))
                .body(ByteStream::from(body));

            let po = req
                .send()
                .await
                .map_err(|err| ObjectError::backend("put_object", key, DisplayErrorContext(&err)))?;
            debug!(key = key, e_tag = po.e_tag().unwrap_or(""), "stored");

            Ok(StoredObject {
                key: key.to_string(),
                size,
                last_modified: OffsetDateTime::now_utc(),
            })
        })
    }

    fn list<'a>(
        &'a self,
        bucket: &'a str,
        prefix: &'a str,
        max_keys: u32,
        continuation_token: Option<String>,
    ) -> BoxFuture<'a, Result<ObjectPage, ObjectError>> {
        Box::pin(async move {
            let mut req = self
                .list_objects_v2()
                .bucket(bucket)
                .prefix(prefix)
                .max_keys(max_keys.min(i32::MAX as u32) as i32);

            if let Some(tok) = continuation_token {
                req = req.continuation_token(tok);
            }

            let lo = req.send().await.map_err(|err| {
                ObjectError::backend("list_objects", prefix, DisplayErrorContext(&err))
            })?;

            let objects = lo
                .contents()
                .iter()
                .map(|o| StoredObject {
                    key: o.key().unwrap_or("").to_string(),
                    size: to_size(o.size()),
                    last_modified: to_offset_date_time(o.last_modified()),
                })
                .collect();

            Ok(ObjectPage {
                objects,
                next_continuation_token: lo.next_continuation_token().map(str::to_string),
            })
        })
    }

    fn head<'a>(
        &'a self,
        bucket: &'a str,
        key: &'a str,
    ) -> BoxFuture<'a, Result<Option<StoredObject>, ObjectError>> {
        Box::pin(async move {
            let ho = match self.head_object().bucket(bucket).key(key).send().await {
                Err(err) => {
                    if let Some(svc_err) = err.as_service_error() {
                        if svc_err.is_not_found() {
                            return Ok(None);
                        }
                    }

                    return Err(ObjectError::backend("head_object", key, DisplayErrorContext(&err)));
                }
                Ok(ho) => ho,
            };

            Ok(Some(StoredObject {
                key: key.to_string(),
                size: to_size(ho.content_length()),
                last_modified: to_offset_date_time(ho.last_modified()),
            }))
        })
    }

    fn get<'a>(
        &'a self,
        bucket: &'a str,
        key: &'a str,
    ) -> BoxFuture<'a, Result<Option<Bytes>, ObjectError>> {
        Box::pin(async move {
            let o = match self.get_object().bucket(bucket).key(key).send().await {
                Err(err) => {
                    if let Some(svc_err) = err.as_service_error() {
                        if svc_err.is_no_such_key() {
                            return Ok(None);
                        }
                    }

                    return Err(ObjectError::backend("get_object", key, DisplayErrorContext(&err)));
                }
                Ok(o) => o,
            };

            let bytes = o
                .body
                .collect()
                .await
                .map_err(|err| ObjectError::backend("collect body", key, err))?;

            Ok(Some(bytes.into_bytes()))
        })
    }

    fn delete<'a>(&'a self, bucket: &'a str, key: &'a str) -> BoxFuture<'a, Result<(), ObjectError>> {
        Box::pin(async move {
            self.delete_object()
                .bucket(bucket)
                .key(key)
                .send()
                .await
                .map_err(|err| ObjectError::backend("delete_object", key, DisplayErrorContext(&err)))?;

            Ok(())
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_to_offset_date_time() {
        let cases = vec![
            (None, OffsetDateTime::UNIX_EPOCH),
            (
                Some(DateTime::from_secs(1_700_000_000)),
                OffsetDateTime::from_unix_timestamp(1_700_000_000).unwrap(),
            ),
            (
                Some(DateTime::from_secs_and_nanos(1_700_000_000, 500)),
                OffsetDateTime::from_unix_timestamp_nanos(1_700_000_000_000_000_500).unwrap(),
            ),
        ];

        for (input, expected) in cases {
            assert_eq!(
                to_offset_date_time(input.as_ref()),
                expected,
                "failed for case: {:?}",
                input
            );
        }
    }

    #[test]
    fn test_to_size() {
        let cases = vec![(None, 0), (Some(-1), 0), (Some(0), 0), (Some(42), 42)];

        for (input, expected) in cases {
            assert_eq!(to_size(input), expected, "failed for case: {:?}", input);
        }
    }

    #[tokio::test]
    async fn test_client_from_config() {
        let mut config = StorageConfig::new("media", "eu-west-1");
        config.endpoint = Some("http://127.0.0.1:9000".to_string());
        config.credentials = Some(crate::config::Credentials {
            access_key_id: "minio".to_string(),
            secret_access_key: "minio123".to_string(),
        });

        let client = client_from_config(&config).await;

        assert_eq!(
            client.config().region().map(|r| r.as_ref()),
            Some("eu-west-1")
        );
    }
}
