use std::path::{Path, PathBuf};

use anyhow::Result;
use serde::Serialize;

use super::{SharedDb, lock};
use crate::db::LogEditError;
use crate::diary::DayBounds;
use crate::events::{ChangeBus, StoreChange};
use crate::images::ImageStore;
use crate::models::{
    FoodLog, FoodLogWithTemplate, FoodTemplate, Macros, NewFoodLog, NewFoodTemplate,
    validate_food_template, validate_grams, validate_macros,
};
use crate::openfoodfacts::{FoodLookupProvider, LookupError};

/// Failure while turning a barcode into a template.
#[derive(Debug, thiserror::Error)]
pub enum ScanError {
    #[error(transparent)]
    Lookup(#[from] LookupError),
    #[error(transparent)]
    Store(#[from] anyhow::Error),
}

#[derive(Debug, Clone, Serialize)]
pub struct DeletedTemplate {
    pub template: FoodTemplate,
    pub logs_removed: i64,
}

#[derive(Clone)]
pub struct FoodRepository {
    db: SharedDb,
    bus: ChangeBus,
    images: Option<ImageStore>,
}

impl FoodRepository {
    #[must_use]
    pub fn new(db: SharedDb, bus: ChangeBus, images: Option<ImageStore>) -> Self {
        Self { db, bus, images }
    }

    // --- Templates ---

    pub fn add_template(&self, food: &NewFoodTemplate) -> Result<FoodTemplate> {
        validate_food_template(food)?;
        let template = lock(&self.db).insert_food_template(food)?;
        self.bus.publish(StoreChange::FoodTemplates);
        Ok(template)
    }

    /// Adds a template with a photo copied into the image store.
    pub fn add_template_with_image(
        &self,
        food: &NewFoodTemplate,
        image: &Path,
    ) -> Result<FoodTemplate> {
        validate_food_template(food)?;
        let stored = self.store_image(image)?;
        let mut food = food.clone();
        food.image_path = Some(stored.display().to_string());
        match lock(&self.db).insert_food_template(&food) {
            Ok(template) => {
                self.bus.publish(StoreChange::FoodTemplates);
                Ok(template)
            }
            Err(e) => {
                self.remove_image(Some(&stored.display().to_string()));
                Err(e)
            }
        }
    }

    /// Store downloaded image bytes for a template, replacing any previous image.
    pub fn attach_image_bytes(
        &self,
        template_id: i64,
        bytes: &[u8],
        extension: &str,
    ) -> Result<FoodTemplate> {
        let Some(store) = &self.images else {
            anyhow::bail!("No image directory configured");
        };
        let previous = self.get_template(template_id)?.image_path;
        let stored = store.save_bytes(bytes, extension)?.display().to_string();
        let updated = {
            let db = lock(&self.db);
            db.set_food_template_image(template_id, Some(&stored))
                .and_then(|_| db.get_food_template(template_id))
        };
        let template = match updated {
            Ok(template) => template,
            Err(e) => {
                self.remove_image(Some(&stored));
                return Err(e);
            }
        };
        self.remove_image(previous.as_deref());
        self.bus.publish(StoreChange::FoodTemplates);
        Ok(template)
    }

    fn store_image(&self, image: &Path) -> Result<PathBuf> {
        let Some(store) = &self.images else {
            anyhow::bail!("No image directory configured");
        };
        store.import(image)
    }

    fn remove_image(&self, path: Option<&str>) {
        if let (Some(store), Some(path)) = (&self.images, path) {
            store.remove(Path::new(path));
        }
    }

    pub fn get_template(&self, id: i64) -> Result<FoodTemplate> {
        lock(&self.db).get_food_template(id)
    }

    pub fn find_by_name(&self, name: &str) -> Result<Option<FoodTemplate>> {
        lock(&self.db).get_food_template_by_name(name)
    }

    pub fn find_by_barcode(&self, barcode: &str) -> Result<Option<FoodTemplate>> {
        lock(&self.db).get_food_template_by_barcode(barcode)
    }

    pub fn list_templates(&self, search: Option<&str>) -> Result<Vec<FoodTemplate>> {
        lock(&self.db).list_food_templates(search)
    }

    pub fn recent_templates(&self, limit: i64) -> Result<Vec<FoodTemplate>> {
        lock(&self.db).get_recent_food_templates(limit)
    }

    /// Deletes the template along with every log and recipe ingredient using it.
    pub fn delete_template(&self, id: i64) -> Result<Option<DeletedTemplate>> {
        let deleted = {
            let db = lock(&self.db);
            let Some(template) = db.find_food_template(id)? else {
                return Ok(None);
            };
            let logs_removed = db.count_food_logs_for_template(id)?;
            db.delete_food_template(id)?;
            DeletedTemplate {
                template,
                logs_removed,
            }
        };
        self.remove_image(deleted.template.image_path.as_deref());
        self.bus.publish(StoreChange::FoodTemplates);
        self.bus.publish(StoreChange::Recipes);
        if deleted.logs_removed > 0 {
            self.bus.publish(StoreChange::FoodLogs);
        }
        tracing::info!(
            id,
            name = %deleted.template.name,
            logs_removed = deleted.logs_removed,
            "food template deleted"
        );
        Ok(Some(deleted))
    }

    /// Cached template for the barcode, else fetch it, store it and return it.
    pub fn resolve_barcode(
        &self,
        provider: &dyn FoodLookupProvider,
        barcode: &str,
    ) -> Result<FoodTemplate, ScanError> {
        let barcode = barcode.trim();
        if let Some(cached) = self.find_by_barcode(barcode)? {
            tracing::debug!(barcode, id = cached.id, "barcode served from cache");
            return Ok(cached);
        }

        let fetched = provider.lookup_barcode(barcode).inspect_err(|e| {
            tracing::warn!(barcode, error = %e, "barcode lookup failed");
        })?;
        let template = lock(&self.db).upsert_food_template_by_barcode(&fetched)?;
        self.bus.publish(StoreChange::FoodTemplates);
        Ok(template)
    }

    // --- Logs ---

    pub fn log_food(&self, template_id: i64, grams: f64, timestamp: i64) -> Result<FoodLog> {
        validate_grams(grams)?;
        let log = lock(&self.db).insert_food_log(&NewFoodLog {
            template_id,
            grams,
            timestamp,
        })?;
        self.bus.publish(StoreChange::FoodLogs);
        Ok(log)
    }

    pub fn get_log(&self, id: i64) -> Result<Option<FoodLogWithTemplate>> {
        lock(&self.db).find_food_log_with_template(id)
    }

    pub fn logs_between(&self, bounds: DayBounds) -> Result<Vec<FoodLogWithTemplate>> {
        lock(&self.db).get_food_logs_between(bounds)
    }

    pub fn update_log_grams(&self, id: i64, grams: f64) -> Result<FoodLog, LogEditError> {
        validate_grams(grams)?;
        let log = lock(&self.db).update_food_log_grams(id, grams)?;
        self.bus.publish(StoreChange::FoodLogs);
        Ok(log)
    }

    pub fn update_log_macros(&self, id: i64, macros: &Macros) -> Result<FoodLog> {
        validate_macros(macros)?;
        let log = lock(&self.db).update_food_log_macros(id, macros)?;
        self.bus.publish(StoreChange::FoodLogs);
        Ok(log)
    }

    pub fn update_log_timestamp(&self, id: i64, timestamp: i64) -> Result<FoodLog> {
        let log = lock(&self.db).update_food_log_timestamp(id, timestamp)?;
        self.bus.publish(StoreChange::FoodLogs);
        Ok(log)
    }

    pub fn delete_log(&self, id: i64) -> Result<bool> {
        let deleted = lock(&self.db).delete_food_log(id)?;
        if deleted {
            self.bus.publish(StoreChange::FoodLogs);
        }
        Ok(deleted)
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicUsize, Ordering};

    use super::*;
    use crate::db::Database;
    use crate::models::FoodSource;
    use crate::repository::shared;

    struct MockProvider {
        calls: AtomicUsize,
        result: fn(&str) -> Result<NewFoodTemplate, LookupError>,
    }

    impl FoodLookupProvider for MockProvider {
        fn lookup_barcode(&self, barcode: &str) -> Result<NewFoodTemplate, LookupError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            (self.result)(barcode)
        }
    }

    fn found(barcode: &str) -> Result<NewFoodTemplate, LookupError> {
        let mut food = sample_food();
        food.name = "Nutella".to_string();
        food.barcode = Some(barcode.to_string());
        food.source = FoodSource::Scanned;
        Ok(food)
    }

    fn offline(_: &str) -> Result<NewFoodTemplate, LookupError> {
        Err(LookupError::Network("connection refused".to_string()))
    }

    fn sample_food() -> NewFoodTemplate {
        NewFoodTemplate {
            name: "Test Food".to_string(),
            brand: Some("Brand".to_string()),
            barcode: None,
            calories_per_100g: 100.0,
            protein_per_100g: 10.0,
            carbs_per_100g: 20.0,
            fat_per_100g: 5.0,
            sugar_per_100g: None,
            salt_per_100g: None,
            image_url: None,
            image_path: None,
            source: FoodSource::Custom,
        }
    }

    fn repo() -> (FoodRepository, ChangeBus) {
        let bus = ChangeBus::default();
        let db = shared(Database::open_in_memory().unwrap());
        (FoodRepository::new(db, bus.clone(), None), bus)
    }

    #[test]
    fn test_resolve_barcode_caches() {
        let (repo, _) = repo();
        let provider = MockProvider {
            calls: AtomicUsize::new(0),
            result: found,
        };
        let first = repo.resolve_barcode(&provider, "3017620422003").unwrap();
        assert_eq!(first.name, "Nutella");
        let second = repo.resolve_barcode(&provider, " 3017620422003 ").unwrap();
        assert_eq!(first.id, second.id);
        assert_eq!(provider.calls.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_resolve_barcode_lookup_failure() {
        let (repo, bus) = repo();
        let mut sub = bus.subscribe(&[]);
        let provider = MockProvider {
            calls: AtomicUsize::new(0),
            result: offline,
        };
        let err = repo.resolve_barcode(&provider, "123").unwrap_err();
        assert!(matches!(err, ScanError::Lookup(LookupError::Network(_))));
        assert!(err.to_string().starts_with("Could not reach the food database"));
        assert!(repo.list_templates(None).unwrap().is_empty());
        assert!(!sub.drain());
    }

    #[test]
    fn test_log_food_publishes() {
        let (repo, bus) = repo();
        let mut logs = bus.subscribe(&[StoreChange::FoodLogs]);
        let food = repo.add_template(&sample_food()).unwrap();
        assert!(!logs.drain());

        let log = repo.log_food(food.id, 250.0, 1_000).unwrap();
        assert_eq!(log.calories, 250);
        assert!(logs.drain());
        assert!(repo.log_food(food.id, 0.0, 1_000).is_err());
    }

    #[test]
    fn test_update_grams_validates() {
        let (repo, _) = repo();
        let food = repo.add_template(&sample_food()).unwrap();
        let log = repo.log_food(food.id, 100.0, 0).unwrap();
        assert!(matches!(
            repo.update_log_grams(log.id, -1.0),
            Err(LogEditError::Store(_))
        ));
        let updated = repo.update_log_grams(log.id, 50.0).unwrap();
        assert_eq!(updated.calories, 50);
    }

    #[test]
    fn test_delete_template_reports_cascade() {
        let (repo, bus) = repo();
        let food = repo.add_template(&sample_food()).unwrap();
        repo.log_food(food.id, 100.0, 0).unwrap();
        repo.log_food(food.id, 100.0, 1).unwrap();
        let mut logs = bus.subscribe(&[StoreChange::FoodLogs]);

        let deleted = repo.delete_template(food.id).unwrap().unwrap();
        assert_eq!(deleted.logs_removed, 2);
        assert!(logs.drain());
        assert!(repo.logs_between(DayBounds { start_millis: 0, end_millis: 10 }).unwrap().is_empty());
        assert!(repo.delete_template(food.id).unwrap().is_none());
    }

    #[test]
    fn test_add_template_with_image() {
        let dir = tempfile::tempdir().unwrap();
        let photo = dir.path().join("plate.jpg");
        std::fs::write(&photo, b"jpeg").unwrap();
        let store = ImageStore::new(dir.path().join("images"));
        let repo = FoodRepository::new(
            shared(Database::open_in_memory().unwrap()),
            ChangeBus::default(),
            Some(store),
        );

        let food = repo.add_template_with_image(&sample_food(), &photo).unwrap();
        let stored = PathBuf::from(food.image_path.clone().unwrap());
        assert!(stored.exists());

        repo.delete_template(food.id).unwrap();
        assert!(!stored.exists());
    }

    #[test]
    fn test_attach_image_bytes_replaces_previous() {
        let dir = tempfile::tempdir().unwrap();
        let repo = FoodRepository::new(
            shared(Database::open_in_memory().unwrap()),
            ChangeBus::default(),
            Some(ImageStore::new(dir.path())),
        );
        let food = repo.add_template(&sample_food()).unwrap();

        let first = repo.attach_image_bytes(food.id, b"one", "png").unwrap();
        let first_path = PathBuf::from(first.image_path.unwrap());
        assert!(first_path.exists());

        let second = repo.attach_image_bytes(food.id, b"two", "png").unwrap();
        let second_path = PathBuf::from(second.image_path.unwrap());
        assert_eq!(std::fs::read(&second_path).unwrap(), b"two");
        assert!(!first_path.exists());
    }

    #[test]
    fn test_attach_image_bytes_cleans_up_when_update_fails() {
        let dir = tempfile::tempdir().unwrap();
        let db = shared(Database::open_in_memory().unwrap());
        let repo = FoodRepository::new(
            db.clone(),
            ChangeBus::default(),
            Some(ImageStore::new(dir.path())),
        );
        let food = repo.add_template(&sample_food()).unwrap();
        lock(&db)
            .execute_batch(
                "CREATE TRIGGER freeze_images BEFORE UPDATE OF image_path ON food_templates
                 BEGIN SELECT RAISE(ABORT, 'read only'); END;",
            )
            .unwrap();

        assert!(repo.attach_image_bytes(food.id, b"one", "png").is_err());
        assert_eq!(std::fs::read_dir(dir.path()).unwrap().count(), 0);
        assert!(repo.get_template(food.id).unwrap().image_path.is_none());
    }

    #[test]
    fn test_image_requires_store() {
        let (repo, _) = repo();
        assert!(
            repo.add_template_with_image(&sample_food(), Path::new("/tmp/none.jpg"))
                .is_err()
        );
    }
}
