//! Session-scoped contact store.
//!
//! Holds the contacts fetched during one CLI invocation. It is created by the
//! command that needs it and passed by reference to whatever renders or looks
//! up contacts; nothing outlives the invocation.

use breezy_core::models::{Contact, ListEnvelope};

/// How many contacts the listing shows.
pub const NEWEST_LIMIT: usize = 50;

#[derive(Debug, Default)]
pub struct ContactStore {
    contacts: Vec<Contact>,
}

impl ContactStore {
    /// Build from a list response, newest (highest numeric id) first.
    /// Non-numeric ids sort after numeric ones, keeping their relative order.
    pub fn from_listing(listing: ListEnvelope<Contact>) -> Self {
        let mut contacts = listing.into_results();
        contacts.sort_by(|a, b| b.numeric_id().cmp(&a.numeric_id()));
        Self { contacts }
    }

    pub fn len(&self) -> usize {
        self.contacts.len()
    }

    pub fn is_empty(&self) -> bool {
        self.contacts.is_empty()
    }

    pub fn newest(&self, limit: usize) -> &[Contact] {
        &self.contacts[..self.contacts.len().min(limit)]
    }

    pub fn find(&self, contact_id: &str) -> Option<&Contact> {
        self.contacts.iter().find(|c| c.id == contact_id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn listing(ids: &[&str]) -> ListEnvelope<Contact> {
        ListEnvelope::new(ids.iter().map(|id| Contact::new(*id)).collect())
    }

    fn ids(contacts: &[Contact]) -> Vec<&str> {
        contacts.iter().map(|c| c.id.as_str()).collect()
    }

    #[test]
    fn test_sorted_newest_first_numerically() {
        let store = ContactStore::from_listing(listing(&["9", "101", "12"]));
        assert_eq!(ids(store.newest(10)), ["101", "12", "9"]);
    }

    #[test]
    fn test_newest_caps_at_limit() {
        let all: Vec<String> = (1..=60).map(|i| i.to_string()).collect();
        let refs: Vec<&str> = all.iter().map(String::as_str).collect();
        let store = ContactStore::from_listing(listing(&refs));
        let newest = store.newest(NEWEST_LIMIT);
        assert_eq!(newest.len(), 50);
        assert_eq!(newest[0].id, "60");
        assert_eq!(newest[49].id, "11");
    }

    #[test]
    fn test_find_by_id() {
        let listing: ListEnvelope<Contact> = serde_json::from_value(json!({
            "results": [
                { "id": "1" },
                { "id": 3, "properties": { "firstname": "Cy" } }
            ]
        }))
        .unwrap();
        let store = ContactStore::from_listing(listing);
        assert_eq!(store.len(), 2);
        assert!(store.find("2").is_none());
        assert_eq!(store.find("3").unwrap().first_name(), Some("Cy"));
    }

    #[test]
    fn test_bare_array_listing_is_accepted() {
        let listing: ListEnvelope<Contact> =
            serde_json::from_value(json!([{ "id": "5" }, { "id": "6" }])).unwrap();
        let store = ContactStore::from_listing(listing);
        assert_eq!(ids(store.newest(5)), ["6", "5"]);
    }

    #[test]
    fn test_empty_store() {
        let store = ContactStore::default();
        assert!(store.is_empty());
        assert!(store.newest(NEWEST_LIMIT).is_empty());
    }
}
