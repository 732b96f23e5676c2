use std::collections::HashSet;

use crate::db::DatabaseError;
use crate::extract::company_key;

/// Read access to what earlier runs already recorded.
pub trait CompanyHistory {
    /// Whether a message other than `excluding_message_id` recorded
    /// `company`. Names are compared by [`company_key`].
    fn has_company(&self, company: &str, excluding_message_id: &str)
        -> Result<bool, DatabaseError>;

    /// Record id stored for `message_id`, if it was recorded before.
    fn recorded_id(&self, message_id: &str) -> Result<Option<String>, DatabaseError>;
}

/// History with nothing recorded.
#[derive(Debug, Default, Clone, Copy)]
pub struct EmptyHistory;

impl CompanyHistory for EmptyHistory {
    fn has_company(&self, _company: &str, _excluding: &str) -> Result<bool, DatabaseError> {
        Ok(false)
    }

    fn recorded_id(&self, _message_id: &str) -> Result<Option<String>, DatabaseError> {
        Ok(None)
    }
}

/// Stored history plus the companies seen earlier in the current batch.
pub(crate) struct BatchHistory<'a> {
    stored: &'a dyn CompanyHistory,
    seen: HashSet<String>,
}

impl<'a> BatchHistory<'a> {
    pub(crate) fn new(stored: &'a dyn CompanyHistory) -> Self {
        Self {
            stored,
            seen: HashSet::new(),
        }
    }

    pub(crate) fn record(&mut self, company: &str) {
        self.seen.insert(company_key(company));
    }
}

impl CompanyHistory for BatchHistory<'_> {
    fn has_company(
        &self,
        company: &str,
        excluding_message_id: &str,
    ) -> Result<bool, DatabaseError> {
        if self.seen.contains(&company_key(company)) {
            return Ok(true);
        }
        self.stored.has_company(company, excluding_message_id)
    }

    fn recorded_id(&self, message_id: &str) -> Result<Option<String>, DatabaseError> {
        self.stored.recorded_id(message_id)
    }
}
