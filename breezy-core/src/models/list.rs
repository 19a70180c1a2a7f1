use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;

/// Normalized list response: `{ "results": [...], "paging": ... }`.
///
/// The provider (and older admin clients) sometimes answer with a bare JSON
/// array instead of the envelope. Both shapes deserialize into this type, so
/// call sites only ever see `results`.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ListEnvelope<T> {
    pub results: Vec<T>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub paging: Option<Value>,
}

#[derive(Deserialize)]
#[serde(untagged)]
enum ListPayload<T> {
    Envelope {
        results: Vec<T>,
        #[serde(default)]
        paging: Option<Value>,
    },
    Bare(Vec<T>),
}

impl<'de, T> Deserialize<'de> for ListEnvelope<T>
where
    T: Deserialize<'de>,
{
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        Ok(match ListPayload::deserialize(deserializer)? {
            ListPayload::Envelope { results, paging } => Self { results, paging },
            ListPayload::Bare(results) => Self::new(results),
        })
    }
}

impl<T> ListEnvelope<T> {
    pub fn new(results: Vec<T>) -> Self {
        Self {
            results,
            paging: None,
        }
    }

    pub fn empty() -> Self {
        Self::new(Vec::new())
    }

    pub fn len(&self) -> usize {
        self.results.len()
    }

    pub fn is_empty(&self) -> bool {
        self.results.is_empty()
    }

    pub fn into_results(self) -> Vec<T> {
        self.results
    }
}

impl<T> Default for ListEnvelope<T> {
    fn default() -> Self {
        Self::empty()
    }
}
