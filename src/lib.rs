//! File entities on top of S3-style object storage.
//!
//! [`service::Service`] exposes create/list/get/remove over any
//! [`adapters::ObjectStore`]; `aws_sdk_s3::Client` is the production store
//! and [`adapters::mock::MockClient`] keeps everything in memory.

pub mod adapters;
pub mod config;
pub mod model;
pub mod service;
pub mod util;

pub use config::StorageConfig;
pub use model::entity::{InputEntity, ListQuery, ListResult, OutputEntity};
pub use model::error::StorageError;
pub use service::Service;
