use std::sync::Arc;

use anyhow::Result;

use super::PreferencesRepository;
use crate::diary::DayBounds;
use crate::health::{HealthDataProvider, HealthError, HealthSummary};

/// Why no health numbers are shown.
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize)]
#[serde(rename_all = "snake_case")]
pub enum HealthStatus {
    Available,
    NoProvider,
    Declined,
    Unavailable,
}

#[derive(Clone)]
pub struct HealthRepository {
    provider: Option<Arc<dyn HealthDataProvider>>,
    preferences: PreferencesRepository,
}

impl HealthRepository {
    #[must_use]
    pub fn new(
        provider: Option<Arc<dyn HealthDataProvider>>,
        preferences: PreferencesRepository,
    ) -> Self {
        Self {
            provider,
            preferences,
        }
    }

    #[must_use]
    pub fn has_provider(&self) -> bool {
        self.provider.is_some()
    }

    /// Activity totals over `range`, or `None` when health data cannot be shown.
    ///
    /// Provider failures are logged and reported as `None`. A permission
    /// denial is remembered so later calls skip the provider.
    pub fn summary(&self, range: DayBounds) -> Result<Option<HealthSummary>> {
        Ok(self.query(range)?.1)
    }

    pub fn query(&self, range: DayBounds) -> Result<(HealthStatus, Option<HealthSummary>)> {
        let Some(provider) = &self.provider else {
            return Ok((HealthStatus::NoProvider, None));
        };
        if self.preferences.health_permissions_declined()? {
            return Ok((HealthStatus::Declined, None));
        }
        match provider.summary(range) {
            Ok(summary) => Ok((HealthStatus::Available, Some(summary))),
            Err(HealthError::PermissionDenied) => {
                tracing::warn!("health data permission denied");
                self.preferences.set_health_permissions_declined(true)?;
                Ok((HealthStatus::Declined, None))
            }
            Err(e) => {
                tracing::warn!(error = %e, "health data unavailable");
                Ok((HealthStatus::Unavailable, None))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::Database;
    use crate::events::ChangeBus;
    use crate::repository::shared;

    struct Fixed(fn() -> Result<HealthSummary, HealthError>);

    impl HealthDataProvider for Fixed {
        fn summary(&self, _range: DayBounds) -> Result<HealthSummary, HealthError> {
            (self.0)()
        }
    }

    fn walk() -> Result<HealthSummary, HealthError> {
        Ok(HealthSummary {
            steps: 8_500,
            distance_m: 6_100.0,
            calories_burned: 320.0,
        })
    }

    fn denied() -> Result<HealthSummary, HealthError> {
        Err(HealthError::PermissionDenied)
    }

    fn broken() -> Result<HealthSummary, HealthError> {
        Err(HealthError::Read("bad json".to_string()))
    }

    const RANGE: DayBounds = DayBounds {
        start_millis: 0,
        end_millis: 86_400_000,
    };

    fn prefs() -> PreferencesRepository {
        PreferencesRepository::new(
            shared(Database::open_in_memory().unwrap()),
            ChangeBus::default(),
        )
    }

    #[test]
    fn test_summary_from_provider() {
        let repo = HealthRepository::new(Some(Arc::new(Fixed(walk))), prefs());
        assert_eq!(repo.summary(RANGE).unwrap().unwrap().steps, 8_500);
    }

    #[test]
    fn test_no_provider() {
        let repo = HealthRepository::new(None, prefs());
        assert_eq!(repo.query(RANGE).unwrap(), (HealthStatus::NoProvider, None));
    }

    #[test]
    fn test_declined_preference_skips_provider() {
        let prefs = prefs();
        prefs.set_health_permissions_declined(true).unwrap();
        let repo = HealthRepository::new(Some(Arc::new(Fixed(walk))), prefs);
        assert_eq!(repo.query(RANGE).unwrap().0, HealthStatus::Declined);
    }

    #[test]
    fn test_denial_is_remembered() {
        let prefs = prefs();
        let repo = HealthRepository::new(Some(Arc::new(Fixed(denied))), prefs.clone());
        assert!(repo.summary(RANGE).unwrap().is_none());
        assert!(prefs.health_permissions_declined().unwrap());
    }

    #[test]
    fn test_read_error_is_none() {
        let prefs = prefs();
        let repo = HealthRepository::new(Some(Arc::new(Fixed(broken))), prefs.clone());
        assert_eq!(repo.query(RANGE).unwrap(), (HealthStatus::Unavailable, None));
        assert!(!prefs.health_permissions_declined().unwrap());
    }
}
