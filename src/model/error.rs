use thiserror::Error;

/// Failure of a single primitive against the remote store. A missing key is
/// not a failure: `head` and `get` report it as `Ok(None)`.
#[derive(Debug, Error)]
pub enum ObjectError {
    #[error("failed to {operation} at: {key}, {message}")]
    Backend {
        operation: &'static str,
        key: String,
        message: String,
    },

    #[error("failed to read byte stream: {0}")]
    Io(#[from] std::io::Error),
}

impl ObjectError {
    pub fn backend(operation: &'static str, key: &str, err: impl std::fmt::Display) -> Self {
        ObjectError::Backend {
            operation,
            key: key.to_string(),
            message: err.to_string(),
        }
    }
}

/// Errors surfaced by [`crate::service::Service`]. Backend failures are
/// carried as the source, unchanged.
#[derive(Debug, Error)]
pub enum StorageError {
    #[error("invalid input: {0}")]
    InvalidInput(String),

    #[error("failed to upload {name}")]
    Upload {
        name: String,
        #[source]
        source: ObjectError,
    },

    #[error("failed to list objects")]
    List {
        #[source]
        source: ObjectError,
    },

    #[error("no object with id: {0}")]
    NotFound(String),

    #[error("failed to get {id}")]
    Get {
        id: String,
        #[source]
        source: ObjectError,
    },

    #[error("failed to remove {id}")]
    Remove {
        id: String,
        #[source]
        source: ObjectError,
    },
}

impl StorageError {
    pub fn is_not_found(&self) -> bool {
        matches!(self, StorageError::NotFound(_))
    }
}

#[cfg(test)]
mod tests {
    use std::error::Error as _;

    use super::*;

    #[test]
    fn test_object_error_display() {
        let cases = vec![
            (
                ObjectError::backend("put_object", "a/two.png", "access denied"),
                "failed to put_object at: a/two.png, access denied",
            ),
            (
                ObjectError::Io(std::io::Error::other("broken pipe")),
                "broken pipe",
            ),
        ];

        for (err, expected) in cases {
            assert!(
                err.to_string().contains(expected),
                "failed for case: {}",
                expected
            );
        }
    }

    #[test]
    fn test_storage_error_keeps_source() {
        let err = StorageError::Upload {
            name: "one.png".to_string(),
            source: ObjectError::backend("put_object", "k", "quota exceeded"),
        };

        assert_eq!(err.to_string(), "failed to upload one.png");
        let source = err.source().expect("upload error should carry a source");
        assert!(source.to_string().contains("quota exceeded"));
    }

    #[test]
    fn test_is_not_found() {
        assert!(StorageError::NotFound("k".to_string()).is_not_found());
        assert!(!StorageError::InvalidInput("k".to_string()).is_not_found());
    }
}
