//! CRM record shapes as they cross the HubSpot and admin-API boundaries.
//!
//! Records keep every property the provider sends. Maps are ordered so that
//! serializing the same record twice yields identical bytes.

pub mod association;
pub mod contact;
pub mod deal;
pub mod list;

use std::collections::BTreeMap;

use serde::de::Error as _;
use serde::{Deserialize, Deserializer};
use serde_json::Value;

pub use association::Association;
pub use contact::Contact;
pub use deal::Deal;
pub use list::ListEnvelope;

/// Free-form CRM property map. Values are usually strings, occasionally null.
pub type Properties = BTreeMap<String, Value>;

/// Accept `"42"` or `42` for a record id; HubSpot sends strings, clients sometimes don't.
pub(crate) fn id_from_string_or_number<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    match Value::deserialize(deserializer)? {
        Value::String(s) => Ok(s),
        Value::Number(n) => Ok(n.to_string()),
        Value::Null => Ok(String::new()),
        other => Err(D::Error::custom(format!(
            "expected string or number id, got {other}"
        ))),
    }
}

/// Read a string property. Blank, null and missing values are all `None`.
pub(crate) fn property_text<'a>(properties: &'a Properties, key: &str) -> Option<&'a str> {
    properties
        .get(key)
        .and_then(Value::as_str)
        .map(str::trim)
        .filter(|v| !v.is_empty())
}
