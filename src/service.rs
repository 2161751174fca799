use std::io;

use bytes::Bytes;
use tokio::io::AsyncReadExt;
use tracing::{error, info, instrument};

use crate::{
    adapters::{self, ObjectStore},
    config::{ConfigError, OversizePolicy, StorageConfig},
    model::{
        entity::{InputEntity, ListQuery, ListResult, OutputEntity},
        error::{ObjectError, StorageError},
        object::StoredObject,
    },
    util,
};

/// Create/list/get/remove of file entities on top of an [`ObjectStore`].
/// Stateless: one instance can serve any number of concurrent calls.
pub struct Service {
    client: Box<dyn ObjectStore>,
    config: StorageConfig,
}

impl Service {
    pub fn new(client: Box<dyn ObjectStore>, config: StorageConfig) -> Result<Self, ConfigError> {
        config.validate()?;

        Ok(Self { client, config })
    }

    /// Connects to S3 (or the configured S3-compatible endpoint).
    pub async fn connect(config: StorageConfig) -> Result<Self, ConfigError> {
        config.validate()?;
        let client = adapters::s3::client_from_config(&config).await;

        Self::new(Box::new(client), config)
    }

    pub fn config(&self) -> &StorageConfig {
        &self.config
    }

    #[instrument(level = "info", skip_all, fields(context = "create", name = %entity.name))]
    pub async fn create(&self, entity: InputEntity) -> Result<OutputEntity, StorageError> {
        info!("called");

        let InputEntity {
            name,
            mut stream,
            mimetype,
            ..
        } = entity;
        validate_name(&name)?;

        // Drain the stream before talking to the store so a failed read
        // never leaves a partial object behind.
        let mut buf = Vec::new();
        let read = match self.config.max_upload_size {
            Some(limit) => (&mut stream)
                .take(limit.saturating_add(1))
                .read_to_end(&mut buf)
                .await
                .and_then(|read| {
                    if read as u64 > limit {
                        Err(io::Error::new(
                            io::ErrorKind::InvalidData,
                            format!("upload exceeds {} bytes", limit),
                        ))
                    } else {
                        Ok(read)
                    }
                }),
            None => stream.read_to_end(&mut buf).await,
        };
        drop(stream);

        if let Err(err) = read {
            error!(error_message=%err, error_group="read_stream");
            return Err(StorageError::Upload {
                name,
                source: ObjectError::Io(err),
            });
        }

        let key = util::object::storage_key(&self.config.prefix, &name);
        let content_type = Some(mimetype.as_str()).filter(|mimetype| !mimetype.is_empty());

        let object = match self
            .client
            .put(&self.config.bucket, &key, Bytes::from(buf), content_type)
            .await
        {
            Err(err) => {
                error!(error_message=%err, error_group="put_object");
                return Err(StorageError::Upload { name, source: err });
            }
            Ok(object) => object,
        };
        info!(key = %key, size = object.size, "uploaded");

        Ok(self.to_entity(&object))
    }

    #[instrument(level = "info", skip_all, fields(context = "list"))]
    pub async fn list(&self, query: ListQuery) -> Result<ListResult, StorageError> {
        info!("called");

        let size = self.page_size(query.size)?;

        let page = self
            .client
            .list(&self.config.bucket, &self.config.prefix, size, query.page_token)
            .await
            .map_err(|err| {
                error!(error_message=%err, error_group="list_objects");
                StorageError::List { source: err }
            })?;

        // Keys ending in `/` are folder placeholders, not files.
        let items: Vec<OutputEntity> = page
            .objects
            .iter()
            .filter(|object| !object.key.ends_with('/'))
            .take(size as usize)
            .map(|object| self.to_entity(object))
            .collect();
        info!(count = items.len(), "listed");

        Ok(ListResult {
            items,
            size,
            next_page_token: page.next_continuation_token,
        })
    }

    #[instrument(level = "info", skip(self), fields(context = "get"))]
    pub async fn get(&self, id: &str) -> Result<OutputEntity, StorageError> {
        info!("called");
        self.check_id(id)?;

        match self.client.head(&self.config.bucket, id).await {
            Ok(Some(object)) => Ok(self.to_entity(&object)),
            Ok(None) => Err(StorageError::NotFound(id.to_string())),
            Err(err) => {
                error!(error_message=%err, error_group="head_object");
                Err(StorageError::Get {
                    id: id.to_string(),
                    source: err,
                })
            }
        }
    }

    /// Reads the full content of `id`.
    #[instrument(level = "info", skip(self), fields(context = "download"))]
    pub async fn download(&self, id: &str) -> Result<Bytes, StorageError> {
        info!("called");
        self.check_id(id)?;

        match self.client.get(&self.config.bucket, id).await {
            Ok(Some(bytes)) => Ok(bytes),
            Ok(None) => Err(StorageError::NotFound(id.to_string())),
            Err(err) => {
                error!(error_message=%err, error_group="get_object");
                Err(StorageError::Get {
                    id: id.to_string(),
                    source: err,
                })
            }
        }
    }

    /// Deletes `id` and returns the entity as it was. Removing an id that
    /// does not exist fails with [`StorageError::NotFound`].
    ///
    /// The existence check and the delete are two requests. Two concurrent
    /// removes of the same id can both pass the check, and both succeed
    /// because S3 deletes are idempotent. Only sequential removes are
    /// guaranteed to succeed exactly once.
    #[instrument(level = "info", skip(self), fields(context = "remove"))]
    pub async fn remove(&self, id: &str) -> Result<OutputEntity, StorageError> {
        info!("called");

        let entity = self.get(id).await.map_err(|err| match err {
            StorageError::Get { id, source } => StorageError::Remove { id, source },
            err => err,
        })?;

        if let Err(err) = self.client.delete(&self.config.bucket, id).await {
            error!(error_message=%err, error_group="delete_object");
            return Err(StorageError::Remove {
                id: id.to_string(),
                source: err,
            });
        }
        info!(key = id, "removed");

        Ok(entity)
    }

    /// Effective page size for a `list` call.
    pub fn page_size(&self, requested: Option<u32>) -> Result<u32, StorageError> {
        let pagination = &self.config.pagination;

        match requested {
            None => Ok(pagination.default),
            Some(size) if (1..=pagination.max).contains(&size) => Ok(size),
            Some(size) => match pagination.policy {
                OversizePolicy::Clamp => Ok(size.clamp(1, pagination.max)),
                OversizePolicy::Reject => Err(StorageError::InvalidInput(format!(
                    "page size {} outside 1..={}",
                    size, pagination.max
                ))),
            },
        }
    }

    /// Ids this service could have issued: under the configured prefix and
    /// naming a file, not a folder placeholder. Anything else is reported as
    /// missing so no call reaches outside the prefix.
    fn check_id(&self, id: &str) -> Result<(), StorageError> {
        let in_scope = id
            .strip_prefix(self.config.prefix.as_str())
            .is_some_and(|rest| !rest.is_empty() && !rest.ends_with('/'));

        if !in_scope {
            return Err(StorageError::NotFound(id.to_string()));
        }

        Ok(())
    }

    fn to_entity(&self, object: &StoredObject) -> OutputEntity {
        OutputEntity::from_object(object, self.config.object_url(&object.key))
    }
}

fn validate_name(name: &str) -> Result<(), StorageError> {
    if name.is_empty() {
        return Err(StorageError::InvalidInput("name must not be empty".to_string()));
    }

    if name.contains('/') {
        return Err(StorageError::InvalidInput(format!(
            "name must not contain '/': {}",
            name
        )));
    }

    Ok(())
}
