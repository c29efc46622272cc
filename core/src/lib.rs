//! Food, workout and weight tracking core: store, repositories and screen state.

pub mod db;
pub mod diary;
pub mod events;
pub mod export;
pub mod goals;
pub mod health;
pub mod images;
pub mod models;
pub mod openfoodfacts;
pub mod plans;
pub mod repository;
pub mod seed;
pub mod service;
pub mod view_state;
