use std::sync::Arc;

use bytes::Bytes;
use futures::future::BoxFuture;

use crate::model::{
    error::ObjectError,
    object::{ObjectPage, StoredObject},
};

pub mod mock;
pub mod s3;

/// The primitives a remote object store has to offer. Every call is a
/// single round trip; implementations do not retry.
pub trait ObjectStore: Send + Sync {
    fn put<'a>(
        &'a self,
        bucket: &'a str,
        key: &'a str,
        body: Bytes,
        content_type: Option<&'a str>,
    ) -> BoxFuture<'a, Result<StoredObject, ObjectError>>;

    fn list<'a>(
        &'a self,
        bucket: &'a str,
        prefix: &'a str,
        max_keys: u32,
        continuation_token: Option<String>,
    ) -> BoxFuture<'a, Result<ObjectPage, ObjectError>>;

    /// Metadata only. `Ok(None)` when `key` does not exist.
    fn head<'a>(
        &'a self,
        bucket: &'a str,
        key: &'a str,
    ) -> BoxFuture<'a, Result<Option<StoredObject>, ObjectError>>;

    /// Full content. `Ok(None)` when `key` does not exist.
    fn get<'a>(
        &'a self,
        bucket: &'a str,
        key: &'a str,
    ) -> BoxFuture<'a, Result<Option<Bytes>, ObjectError>>;

    fn delete<'a>(&'a self, bucket: &'a str, key: &'a str) -> BoxFuture<'a, Result<(), ObjectError>>;
}

impl<T: ObjectStore + ?Sized> ObjectStore for Arc<T> {
    fn put<'a>(
        &'a self,
        bucket: &'a str,
        key: &'a str,
        body: Bytes,
        content_type: Option<&'a str>,
    ) -> BoxFuture<'a, Result<StoredObject, ObjectError>> {
        (**self).put(bucket, key, body, content_type)
    }

    fn list<'a>(
        &'a self,
        bucket: &'a str,
        prefix: &'a str,
        max_keys: u32,
        continuation_token: Option<String>,
    ) -> BoxFuture<'a, Result<ObjectPage, ObjectError>> {
        (**self).list(bucket, prefix, max_keys, continuation_token)
    }

    fn head<'a>(
        &'a self,
        bucket: &'a str,
        key: &'a str,
    ) -> BoxFuture<'a, Result<Option<StoredObject>, ObjectError>> {
        (**self).head(bucket, key)
    }

    fn get<'a>(
        &'a self,
        bucket: &'a str,
        key: &'a str,
    ) -> BoxFuture<'a, Result<Option<Bytes>, ObjectError>> {
        (**self).get(bucket, key)
    }

    fn delete<'a>(&'a self, bucket: &'a str, key: &'a str) -> BoxFuture<'a, Result<(), ObjectError>> {
        (**self).delete(bucket, key)
    }
}
