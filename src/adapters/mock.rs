use std::{
    collections::{BTreeMap, HashMap, HashSet},
    ops::Bound,
    sync::{Mutex, PoisonError},
};

use bytes::Bytes;
use futures::future::{self, BoxFuture};
use time::OffsetDateTime;

use crate::{
    adapters,
    model::{
        error::ObjectError,
        object::{ObjectPage, StoredObject},
    },
};

struct MockObject {
    body: Bytes,
    content_type: Option<String>,
    last_modified: OffsetDateTime,
}

impl MockObject {
    fn stored(&self, key: &str) -> StoredObject {
        StoredObject {
            key: key.to_string(),
            size: self.body.len() as u64,
            last_modified: self.last_modified,
        }
    }
}

/// In-memory store. Keys are kept sorted so listings come back in the same
/// lexicographic order S3 uses. Continuation tokens are the last key of the
/// previous page.
#[derive(Default)]
pub struct MockClient {
    buckets: Mutex<HashMap<String, BTreeMap<String, MockObject>>>,
    failing: Mutex<HashSet<&'static str>>,
}

impl MockClient {
    pub fn new() -> Self {
        Self::default()
    }

    /// Makes every later call of `operation` (`put`, `list`, `head`, `get` or
    /// `delete`) fail with a backend error.
    pub fn fail_on(&self, operation: &'static str) {
        self.failing
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(operation);
    }

    pub fn object_count(&self, bucket: &str) -> usize {
        self.buckets
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .get(bucket)
            .map(|objects| objects.len())
            .unwrap_or(0)
    }

    pub fn content_type(&self, bucket: &str, key: &str) -> Option<String> {
        self.buckets
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .get(bucket)
            .and_then(|objects| objects.get(key))
            .and_then(|object| object.content_type.clone())
    }

    fn check(&self, operation: &'static str, key: &str) -> Result<(), ObjectError> {
        let failing = self
            .failing
            .lock()
            .map_err(|err| ObjectError::backend(operation, key, err))?;

        if failing.contains(operation) {
            return Err(ObjectError::backend(operation, key, "injected failure"));
        }

        Ok(())
    }

    fn put_sync(
        &self,
        bucket: &str,
        key: &str,
        body: Bytes,
        content_type: Option<&str>,
    ) -> Result<StoredObject, ObjectError> {
        self.check("put", key)?;

        let mut buckets = self
            .buckets
            .lock()
            .map_err(|err| ObjectError::backend("put", key, err))?;

        let object = MockObject {
            body,
            content_type: content_type.map(str::to_string),
            last_modified: OffsetDateTime::now_utc(),
        };
        let stored = object.stored(key);
        buckets
            .entry(bucket.to_string())
            .or_default()
            .insert(key.to_string(), object);

        Ok(stored)
    }

    fn list_sync(
        &self,
        bucket: &str,
        prefix: &str,
        max_keys: u32,
        continuation_token: Option<String>,
    ) -> Result<ObjectPage, ObjectError> {
        self.check("list", prefix)?;

        let buckets = self
            .buckets
            .lock()
            .map_err(|err| ObjectError::backend("list", prefix, err))?;

        let Some(objects) = buckets.get(bucket) else {
            return Ok(ObjectPage::default());
        };

        let start = match &continuation_token {
            Some(tok) => Bound::Excluded(tok.as_str()),
            None => Bound::Unbounded,
        };

        let mut matching = objects
            .range::<str, _>((start, Bound::Unbounded))
            .filter(|(key, _)| key.starts_with(prefix));

        let page: Vec<StoredObject> = matching
            .by_ref()
            .take(max_keys as usize)
            .map(|(key, object)| object.stored(key))
            .collect();

        let next_continuation_token = match matching.next() {
            Some(_) => page.last().map(|object| object.key.clone()),
            None => None,
        };

        Ok(ObjectPage {
            objects: page,
            next_continuation_token,
        })
    }

    fn head_sync(&self, bucket: &str, key: &str) -> Result<Option<StoredObject>, ObjectError> {
        self.check("head", key)?;

        let buckets = self
            .buckets
            .lock()
            .map_err(|err| ObjectError::backend("head", key, err))?;

        Ok(buckets
            .get(bucket)
            .and_then(|objects| objects.get(key))
            .map(|object| object.stored(key)))
    }

    fn get_sync(&self, bucket: &str, key: &str) -> Result<Option<Bytes>, ObjectError> {
        self.check("get", key)?;

        let buckets = self
            .buckets
            .lock()
            .map_err(|err| ObjectError::backend("get", key, err))?;

        Ok(buckets
            .get(bucket)
            .and_then(|objects| objects.get(key))
            .map(|object| object.body.clone()))
    }

    // Deleting a missing key succeeds, as it does on S3.
    fn delete_sync(&self, bucket: &str, key: &str) -> Result<(), ObjectError> {
        self.check("delete", key)?;

        let mut buckets = self
            .buckets
            .lock()
            .map_err(|err| ObjectError::backend("delete", key, err))?;

        if let Some(objects) = buckets.get_mut(bucket) {
            objects.remove(key);
        }

        Ok(())
    }
}

impl adapters::ObjectStore for MockClient {
    fn put<'a>(
        &'a self,
        bucket: &'a str,
        key: &'a str,
        body: Bytes,
        content_type: Option<&'a str>,
    ) -> BoxFuture<'a, Result<StoredObject, ObjectError>> {
        Box::pin(future::ready(self.put_sync(bucket, key, body, content_type)))
    }

    fn list<'a>(
        &'a self,
        bucket: &'a str,
        prefix: &'a str,
        max_keys: u32,
        continuation_token: Option<String>,
    ) -> BoxFuture<'a, Result<ObjectPage, ObjectError>> {
        Box::pin(future::ready(
            self.list_sync(bucket, prefix, max_keys, continuation_token),
        ))
    }

    fn head<'a>(
        &'a self,
        bucket: &'a str,
        key: &'a str,
    ) -> BoxFuture<'a, Result<Option<StoredObject>, ObjectError>> {
        Box::pin(future::ready(self.head_sync(bucket, key)))
    }

    fn get<'a>(
        &'a self,
        bucket: &'a str,
        key: &'a str,
    ) -> BoxFuture<'a, Result<Option<Bytes>, ObjectError>> {
        Box::pin(future::ready(self.get_sync(bucket, key)))
    }

    fn delete<'a>(&'a self, bucket: &'a str, key: &'a str) -> BoxFuture<'a, Result<(), ObjectError>> {
        Box::pin(future::ready(self.delete_sync(bucket, key)))
    }
}
