//! Store-to-timezone resolution.

use std::collections::HashMap;

use chrono_tz::Tz;

use crate::engine::EngineError;
use crate::model::StoreTimezone;

/// Zone applied to stores with no timezone record at all.
pub const DEFAULT_TIMEZONE: Tz = chrono_tz::America::Chicago;

/// Maps store ids to IANA timezones.
///
/// Absence of a mapping is normal and yields [`DEFAULT_TIMEZONE`]; a mapping
/// whose zone name does not parse is a data error and is reported as
/// [`EngineError::MalformedTimezone`] rather than silently defaulted.
pub struct TimeZoneResolver {
    zones: HashMap<String, String>,
}

impl TimeZoneResolver {
    /// Build the resolver. Duplicate records for a store keep the last one.
    pub fn new(records: &[StoreTimezone]) -> Self {
        let mut zones = HashMap::with_capacity(records.len());
        for record in records {
            zones.insert(record.store_id.clone(), record.timezone.clone());
        }
        Self { zones }
    }

    /// Resolve the timezone for a store.
    pub fn resolve(&self, store_id: &str) -> Result<Tz, EngineError> {
        match self.zones.get(store_id) {
            None => Ok(DEFAULT_TIMEZONE),
            Some(name) => name.parse::<Tz>().map_err(|_| EngineError::MalformedTimezone {
                store_id: store_id.to_string(),
                value: name.clone(),
            }),
        }
    }
}
