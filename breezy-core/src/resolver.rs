//! Contact → deals resolution.
//!
//! Two strictly sequential CRM calls: the contact's deal associations, then a
//! single batch-read of those deal ids. Deals the batch-read leaves out are
//! treated as not currently resolvable and simply absent from the result.

use std::collections::HashSet;

use crate::error::BreezyError;
use crate::hubspot::CrmBackend;
use crate::models::Deal;

/// Reject ids that are empty or could escape the URL path segment.
pub fn validate_contact_id(contact_id: &str) -> Result<&str, BreezyError> {
    let id = contact_id.trim();
    if id.is_empty() {
        return Err(BreezyError::InvalidInput("contactId is required".to_string()));
    }
    if !id
        .chars()
        .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_')
    {
        return Err(BreezyError::InvalidInput(format!(
            "contactId {id:?} is malformed"
        )));
    }
    Ok(id)
}

/// Deals associated with `contact_id`, in the order the batch-read returns them.
pub async fn resolve_deals_for_contact(
    crm: &dyn CrmBackend,
    contact_id: &str,
    properties: &[String],
) -> Result<Vec<Deal>, BreezyError> {
    let contact_id = validate_contact_id(contact_id)?;

    let associations = crm.contact_deal_associations(contact_id).await?;
    if associations.is_empty() {
        tracing::debug!(contact_id, "No deal associations");
        return Ok(Vec::new());
    }

    // Provider order, first occurrence wins.
    let mut seen = HashSet::new();
    let deal_ids: Vec<String> = associations
        .into_iter()
        .map(|a| a.id)
        .filter(|id| seen.insert(id.clone()))
        .collect();

    tracing::debug!(
        contact_id,
        requested = deal_ids.len(),
        backend = crm.name(),
        "Batch-reading associated deals"
    );
    let deals = crm.batch_read_deals(&deal_ids, properties).await?;

    if deals.len() < deal_ids.len() {
        let returned: HashSet<&str> = deals.iter().map(|d| d.id.as_str()).collect();
        let missing: Vec<&str> = deal_ids
            .iter()
            .map(String::as_str)
            .filter(|id| !returned.contains(id))
            .collect();
        tracing::debug!(
            contact_id,
            ?missing,
            "Batch-read omitted deals; treating them as not currently resolvable"
        );
    }

    Ok(deals)
}
