use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::Result;
use chrono::{NaiveDate, TimeZone};

use crate::db::Database;
use crate::diary::{build_feed, range_bounds};
use crate::events::ChangeBus;
use crate::export::write_diary_csv;
use crate::health::HealthDataProvider;
use crate::images::ImageStore;
use crate::models::FoodTemplate;
use crate::openfoodfacts::FoodLookupProvider;
use crate::plans::WeekStart;
use crate::repository::{
    FoodRepository, HealthRepository, PreferencesRepository, RecipeRepository, ScanError,
    SharedDb, WeightRepository, WorkoutRepository, lock, shared,
};
use crate::seed::{SeedSummary, seed_defaults};
use crate::view_state::{
    DiaryViewModel, HomeViewModel, NutritionViewModel, WeightViewModel, WorkoutViewModel,
};

/// Owns the store and the change bus, and builds every repository and view model.
///
/// Platform pieces (image directory, health provider, lookup provider) are
/// injected by the caller. Call service methods off the UI thread.
pub struct StrideService {
    db: SharedDb,
    bus: ChangeBus,
    images: Option<ImageStore>,
    health: Option<Arc<dyn HealthDataProvider>>,
    week_start: WeekStart,
    seeded: SeedSummary,
}

impl StrideService {
    pub fn open(db_path: &Path) -> Result<Self> {
        Self::from_database(Database::open(db_path)?)
    }

    pub fn new_in_memory() -> Result<Self> {
        Self::from_database(Database::open_in_memory()?)
    }

    fn from_database(db: Database) -> Result<Self> {
        let seeded = seed_defaults(&db)?;
        Ok(Self {
            db: shared(db),
            bus: ChangeBus::default(),
            images: None,
            health: None,
            week_start: WeekStart::default(),
            seeded,
        })
    }

    #[must_use]
    pub fn with_image_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.images = Some(ImageStore::new(dir));
        self
    }

    #[must_use]
    pub fn with_health_provider(mut self, provider: Arc<dyn HealthDataProvider>) -> Self {
        self.health = Some(provider);
        self
    }

    #[must_use]
    pub fn with_week_start(mut self, week_start: WeekStart) -> Self {
        self.week_start = week_start;
        self
    }

    /// Rows added by seeding when the store was opened.
    #[must_use]
    pub fn seeded(&self) -> SeedSummary {
        self.seeded
    }

    #[must_use]
    pub fn bus(&self) -> &ChangeBus {
        &self.bus
    }

    #[must_use]
    pub fn week_start(&self) -> WeekStart {
        self.week_start
    }

    pub fn schema_version(&self) -> Result<i64> {
        lock(&self.db).schema_version()
    }

    // --- Repositories ---

    #[must_use]
    pub fn foods(&self) -> FoodRepository {
        FoodRepository::new(self.db.clone(), self.bus.clone(), self.images.clone())
    }

    #[must_use]
    pub fn recipes(&self) -> RecipeRepository {
        RecipeRepository::new(self.db.clone(), self.bus.clone())
    }

    #[must_use]
    pub fn workouts(&self) -> WorkoutRepository {
        WorkoutRepository::new(self.db.clone(), self.bus.clone())
    }

    #[must_use]
    pub fn weight(&self) -> WeightRepository {
        WeightRepository::new(self.db.clone(), self.bus.clone())
    }

    #[must_use]
    pub fn preferences(&self) -> PreferencesRepository {
        PreferencesRepository::new(self.db.clone(), self.bus.clone())
    }

    #[must_use]
    pub fn health(&self) -> HealthRepository {
        HealthRepository::new(self.health.clone(), self.preferences())
    }

    // --- View models ---

    #[must_use]
    pub fn diary_view(&self) -> DiaryViewModel {
        DiaryViewModel::new(self.foods(), self.recipes(), self.bus.clone())
    }

    #[must_use]
    pub fn home_view(&self) -> HomeViewModel {
        HomeViewModel::new(
            self.foods(),
            self.recipes(),
            self.workouts(),
            self.weight(),
            self.preferences(),
            self.health(),
            self.bus.clone(),
        )
    }

    #[must_use]
    pub fn nutrition_view(&self) -> NutritionViewModel {
        NutritionViewModel::new(self.foods(), self.recipes(), self.bus.clone())
    }

    #[must_use]
    pub fn workout_view(&self) -> WorkoutViewModel {
        WorkoutViewModel::new(self.workouts(), self.bus.clone(), self.week_start)
    }

    #[must_use]
    pub fn weight_view(&self) -> WeightViewModel {
        WeightViewModel::new(self.weight(), self.bus.clone())
    }

    // --- Orchestrated operations ---

    /// Resolve a scanned barcode through the local cache, then the provider.
    pub fn scan(
        &self,
        provider: &dyn FoodLookupProvider,
        barcode: &str,
    ) -> Result<FoodTemplate, ScanError> {
        self.foods().resolve_barcode(provider, barcode)
    }

    /// CSV of every diary entry in the `days` days ending with `last`. Returns the row count.
    pub fn export_diary_csv<W: Write, Tz: TimeZone>(
        &self,
        writer: W,
        last: NaiveDate,
        days: u32,
        tz: &Tz,
    ) -> Result<usize>
    where
        Tz::Offset: std::fmt::Display,
    {
        let bounds = range_bounds(last, days, tz);
        let mut feed = build_feed(
            self.foods().logs_between(bounds)?,
            self.recipes().logs_between(bounds)?,
        );
        // oldest first reads naturally in a spreadsheet
        feed.reverse();
        write_diary_csv(writer, &feed, tz)
    }
}
