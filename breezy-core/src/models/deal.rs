use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use super::{property_text, Properties};

/// A CRM deal: one hardware purchase or one subscription lifecycle event.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct Deal {
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

impl Deal {
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

    pub fn name(&self) -> Option<&str> {
        self.property("dealname")
    }

    pub fn stage(&self) -> Option<&str> {
        self.property("dealstage")
    }

    pub fn pipeline(&self) -> Option<&str> {
        self.property("pipeline")
    }

    pub fn close_date(&self) -> Option<&str> {
        self.property("closedate")
    }

    pub fn create_date(&self) -> Option<&str> {
        self.property("createdate")
    }

    /// Deal amount. HubSpot sends a decimal string; hand-built records may use a number.
    pub fn amount(&self) -> Option<f64> {
        match self.properties.get("amount")? {
            Value::Number(n) => n.as_f64(),
            Value::String(s) => s.trim().parse().ok(),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_accessors_read_hubspot_properties() {
        let deal: Deal = serde_json::from_value(json!({
            "id": "d1",
            "properties": {
                "dealname": "Thermostat 3 pack",
                "amount": "897.00",
                "dealstage": "closedwon",
                "pipeline": "default",
                "closedate": "2024-03-02T00:00:00Z"
            }
        }))
        .unwrap();
        assert_eq!(deal.name(), Some("Thermostat 3 pack"));
        assert_eq!(deal.amount(), Some(897.0));
        assert_eq!(deal.stage(), Some("closedwon"));
        assert_eq!(deal.pipeline(), Some("default"));
        assert_eq!(deal.close_date(), Some("2024-03-02T00:00:00Z"));
        assert_eq!(deal.create_date(), None);
    }

    #[test]
    fn test_amount_accepts_numbers_and_rejects_garbage() {
        let mut deal = Deal::new("d2");
        deal.properties.insert("amount".into(), json!(99));
        assert_eq!(deal.amount(), Some(99.0));

        let deal = Deal::new("d3").with_property("amount", "ninety");
        assert_eq!(deal.amount(), None);
    }

    #[test]
    fn test_missing_id_is_not_serialized() {
        let deal: Deal = serde_json::from_value(json!({ "properties": { "dealname": "1 pack" } })).unwrap();
        let out = serde_json::to_value(&deal).unwrap();
        assert!(out.get("id").is_none());
        assert_eq!(out["properties"]["dealname"], "1 pack");
    }
}
