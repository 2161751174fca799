use time::OffsetDateTime;

/// What the remote store reports about a single object.
#[derive(Clone, Debug, PartialEq)]
pub struct StoredObject {
    pub key: String,
    pub size: u64,
    pub last_modified: OffsetDateTime,
}

/// One page of a listing. `next_continuation_token` is opaque and only
/// meaningful to the store that issued it.
#[derive(Clone, Debug, Default)]
pub struct ObjectPage {
    pub objects: Vec<StoredObject>,
    pub next_continuation_token: Option<String>,
}
