use serde::Deserialize;

use crate::domain::cache::ScalarInput;

/// Body of `POST /cache`. Both fields accept a JSON string or number.
///
/// Missing fields deserialize as `None` so validation can report them alongside
/// any other violation instead of failing JSON extraction.
#[derive(Debug, Deserialize)]
pub struct WriteCacheRequest {
    #[serde(default)]
    pub key: Option<ScalarInput>,
    #[serde(default)]
    pub value: Option<ScalarInput>,
}
