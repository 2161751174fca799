use std::{fmt, path::Path};

use serde::Serialize;
use time::OffsetDateTime;
use tokio::io::AsyncRead;

use crate::{model::object::StoredObject, util};

pub type ByteStream = Box<dyn AsyncRead + Send + Unpin>;

/// An upload request. Mirrors the shape of a multipart form field so it can
/// be fed straight from HTTP upload middleware.
pub struct InputEntity {
    pub name: String,
    pub stream: ByteStream,
    pub fieldname: String,
    pub mimetype: String,
    pub encoding: String,
}

impl InputEntity {
    pub fn new(name: impl Into<String>, stream: impl AsyncRead + Send + Unpin + 'static) -> Self {
        Self {
            name: name.into(),
            stream: Box::new(stream),
            fieldname: "files".to_string(),
            mimetype: String::new(),
            encoding: String::new(),
        }
    }

    pub fn with_mimetype(mut self, mimetype: impl Into<String>) -> Self {
        self.mimetype = mimetype.into();
        self
    }

    /// Opens `path` and names the entity after its file name.
    pub async fn from_path(path: &Path) -> std::io::Result<Self> {
        let name = path
            .file_name()
            .map(|name| name.to_string_lossy().into_owned())
            .unwrap_or_default();
        let file = tokio::fs::File::open(path).await?;

        Ok(Self::new(name, file))
    }
}

impl fmt::Debug for InputEntity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("InputEntity")
            .field("name", &self.name)
            .field("fieldname", &self.fieldname)
            .field("mimetype", &self.mimetype)
            .field("encoding", &self.encoding)
            .finish_non_exhaustive()
    }
}

/// Metadata snapshot of a persisted object. Goes stale once the backing
/// object is removed.
#[derive(Clone, Debug, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct OutputEntity {
    pub id: String,
    pub name: String,
    pub ext: String,
    pub url: String,
    pub size: u64,
    #[serde(with = "time::serde::rfc3339")]
    pub created_at: OffsetDateTime,
}

impl OutputEntity {
    pub fn from_object(object: &StoredObject, url: String) -> Self {
        let name = util::object::name_from_key(&object.key).to_string();
        let ext = util::object::extension(&name);

        Self {
            id: object.key.clone(),
            name,
            ext,
            url,
            size: object.size,
            created_at: object.last_modified,
        }
    }
}

#[derive(Clone, Debug, Default)]
pub struct ListQuery {
    pub size: Option<u32>,
    pub page_token: Option<String>,
}

impl ListQuery {
    pub fn with_size(size: u32) -> Self {
        Self {
            size: Some(size),
            page_token: None,
        }
    }
}

#[derive(Clone, Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ListResult {
    pub items: Vec<OutputEntity>,
    pub size: u32,
    pub next_page_token: Option<String>,
}

#[cfg(test)]
mod tests {
    use tokio::io::AsyncReadExt;

    use super::*;

    #[test]
    fn test_output_entity_from_object() {
        let cases = vec![
            ("3f2a/one.png", "one.png", ".png"),
            ("uploads/3f2a/archive.tar.gz", "archive.tar.gz", ".gz"),
            ("3f2a/README", "README", ""),
            ("3f2a/.env", ".env", ""),
        ];

        for (key, name, ext) in cases {
            let object = StoredObject {
                key: key.to_string(),
                size: 7,
                last_modified: OffsetDateTime::UNIX_EPOCH,
            };
            let entity = OutputEntity::from_object(&object, format!("memory://b/{}", key));

            assert_eq!(entity.id, key, "failed on `id` for case: {}", key);
            assert_eq!(entity.name, name, "failed on `name` for case: {}", key);
            assert_eq!(entity.ext, ext, "failed on `ext` for case: {}", key);
            assert_eq!(entity.size, 7, "failed on `size` for case: {}", key);
        }
    }

    #[test]
    fn test_output_entity_serializes_camel_case() {
        let entity = OutputEntity {
            id: "k/one.png".to_string(),
            name: "one.png".to_string(),
            ext: ".png".to_string(),
            url: "memory://b/k/one.png".to_string(),
            size: 3,
            created_at: OffsetDateTime::UNIX_EPOCH,
        };

        let json = serde_json::to_value(&entity).unwrap();

        assert_eq!(json["createdAt"], "1970-01-01T00:00:00Z");
        assert_eq!(json["ext"], ".png");
        assert_eq!(json["size"], 3);
    }

    #[tokio::test]
    async fn test_input_entity_from_path() {
        let path = std::env::temp_dir().join(format!("filestore-{}.txt", uuid::Uuid::new_v4()));
        tokio::fs::write(&path, b"hello").await.unwrap();

        let mut entity = InputEntity::from_path(&path).await.unwrap();
        let mut buf = Vec::new();
        entity.stream.read_to_end(&mut buf).await.unwrap();

        assert_eq!(entity.name, path.file_name().unwrap().to_string_lossy());
        assert_eq!(entity.fieldname, "files");
        assert_eq!(buf, b"hello");

        tokio::fs::remove_file(&path).await.unwrap();
    }
}
