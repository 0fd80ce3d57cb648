//! Query matching for the registry store (`spec.md` §4.E): a query entry
//! matches a stored entry iff every non-empty field of the query equals the
//! corresponding stored field; lists are matched as a subset.

/// A field-by-field matcher. Implemented once per entity type since each
/// has a different field set, but every implementation follows the same
/// rule: empty/absent query fields are wildcards.
pub trait Matches {
    fn matches(&self, stored: &Self) -> bool;
}

impl Matches for crate::registry::model::NetworkService {
    fn matches(&self, stored: &Self) -> bool {
        self.name.is_empty() || self.name == stored.name
    }
}

impl Matches for crate::registry::model::NetworkServiceEndpoint {
    fn matches(&self, stored: &Self) -> bool {
        let name_ok = self.name.is_empty() || self.name == stored.name;
        let manager_ok = self.network_service_manager_name.is_empty()
            || self.network_service_manager_name == stored.network_service_manager_name;
        let services_ok = self.network_service_names.is_empty()
            || self
                .network_service_names
                .iter()
                .all(|wanted| stored.network_service_names.contains(wanted));
        name_ok && manager_ok && services_ok
    }
}
