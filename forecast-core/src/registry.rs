use std::{collections::HashSet, ops::Deref, sync::Arc};

use crate::{config::ConfigError, model::Location};

/// The validated, immutable set of locations to poll.
///
/// Cloning is cheap; every clone shares the same underlying slice, so a tick can
/// take a snapshot without copying location data.
#[derive(Debug, Clone, PartialEq)]
pub struct LocationRegistry {
    locations: Arc<[Location]>,
}

impl LocationRegistry {
    /// Validate `locations` and freeze them in the given order.
    pub fn load(locations: Vec<Location>) -> Result<Self, ConfigError> {
        if locations.is_empty() {
            return Err(ConfigError::NoLocations);
        }

        let mut seen = HashSet::with_capacity(locations.len());
        for (index, location) in locations.iter().enumerate() {
            if location.name.trim().is_empty() {
                return Err(ConfigError::EmptyName { index });
            }
            if !seen.insert(location.name.as_str()) {
                return Err(ConfigError::DuplicateName(location.name.clone()));
            }
            if !(-90.0..=90.0).contains(&location.latitude) {
                return Err(ConfigError::LatitudeOutOfRange {
                    name: location.name.clone(),
                    value: location.latitude,
                });
            }
            if !(-180.0..=180.0).contains(&location.longitude) {
                return Err(ConfigError::LongitudeOutOfRange {
                    name: location.name.clone(),
                    value: location.longitude,
                });
            }
        }

        Ok(Self { locations: locations.into() })
    }

    /// A shared handle to the current location list.
    pub fn snapshot(&self) -> Arc<[Location]> {
        Arc::clone(&self.locations)
    }

    pub fn get(&self, name: &str) -> Option<&Location> {
        self.locations.iter().find(|l| l.name == name)
    }
}

impl Deref for LocationRegistry {
    type Target = [Location];

    fn deref(&self) -> &Self::Target {
        &self.locations
    }
}
