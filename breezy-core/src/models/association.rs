use serde::{Deserialize, Serialize};

/// A contact→deal link as returned by the associations endpoint.
/// `id` is the deal id; `kind` is the provider's link-type classifier.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Association {
    #[serde(deserialize_with = "super::id_from_string_or_number")]
    pub id: String,
    #[serde(rename = "type", default, skip_serializing_if = "Option::is_none")]
    pub kind: Option<String>,
}

impl Association {
    pub fn new(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            kind: None,
        }
    }
}
