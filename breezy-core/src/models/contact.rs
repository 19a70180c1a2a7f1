use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use super::{property_text, Properties};

/// A CRM contact. All properties are optional; provider metadata such as
/// `createdAt` or `archived` is kept in `extra` and serialized back unchanged.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct Contact {
    #[serde(
        default,
        deserialize_with = "super::id_from_string_or_number",
        skip_serializing_if = "String::is_empty"
    )]
    pub id: String,
    #[serde(default)]
    pub properties: Properties,
    #[serde(flatten)]
    pub extra: BTreeMap<String, Value>,
}

impl Contact {
    pub fn new(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            ..Self::default()
        }
    }

    pub fn with_property(mut self, key: &str, value: impl Into<String>) -> Self {
        self.properties
            .insert(key.to_string(), Value::String(value.into()));
        self
    }

    pub fn property(&self, key: &str) -> Option<&str> {
        property_text(&self.properties, key)
    }

    pub fn first_name(&self) -> Option<&str> {
        self.property("firstname")
    }

    pub fn last_name(&self) -> Option<&str> {
        self.property("lastname")
    }

    pub fn email(&self) -> Option<&str> {
        self.property("email")
    }

    /// "First Last", else the email, else the id.
    pub fn display_name(&self) -> String {
        let name = [self.first_name(), self.last_name()]
            .into_iter()
            .flatten()
            .collect::<Vec<_>>()
            .join(" ");
        if !name.is_empty() {
            return name;
        }
        self.email().unwrap_or(&self.id).to_string()
    }

    /// Numeric ordering key; HubSpot ids grow with creation time.
    pub fn numeric_id(&self) -> Option<u64> {
        self.id.parse().ok()
    }
}
