//! `OpenFoodFacts` product payloads and their mapping to food templates.
//!
//! The HTTP call itself lives behind [`FoodLookupProvider`] so this crate
//! never depends on an HTTP client.

use serde::{Deserialize, Deserializer};

use crate::models::{FoodSource, NewFoodTemplate};

pub const PRODUCT_URL: &str = "https://world.openfoodfacts.org/api/v2/product";

#[must_use]
pub fn product_url(barcode: &str) -> String {
    format!("{PRODUCT_URL}/{barcode}.json")
}

/// Why a barcode lookup failed. `Display` is the message shown to the user.
#[derive(Debug, thiserror::Error)]
pub enum LookupError {
    #[error("Could not reach the food database: {0}")]
    Network(String),
    #[error("The food database answered with HTTP {0}")]
    Status(u16),
    #[error("The food database sent a response that could not be read: {0}")]
    Parse(String),
    #[error("No product found for barcode '{0}'")]
    NotFound(String),
}

/// Platform-native barcode lookup.
///
/// The CLI implements this with reqwest. Called synchronously; async callers
/// should invoke it from a blocking context.
pub trait FoodLookupProvider: Send + Sync {
    fn lookup_barcode(&self, barcode: &str) -> Result<NewFoodTemplate, LookupError>;
}

#[derive(Debug, Deserialize)]
pub struct ProductResponse {
    #[serde(default)]
    pub status: i64,
    pub product: Option<ProductData>,
}

#[derive(Debug, Default, Deserialize)]
pub struct ProductData {
    pub product_name_en: Option<String>,
    pub product_name: Option<String>,
    pub brands: Option<String>,
    pub image_front_url: Option<String>,
    pub nutriments: Option<Nutriments>,
}

// Values arrive as numbers or numeric strings depending on the product.
#[derive(Debug, Default, Deserialize)]
#[allow(clippy::struct_field_names)]
pub struct Nutriments {
    #[serde(rename = "energy-kcal_100g", default, deserialize_with = "lenient_f64")]
    pub energy_kcal_100g: Option<f64>,
    #[serde(default, deserialize_with = "lenient_f64")]
    pub proteins_100g: Option<f64>,
    #[serde(default, deserialize_with = "lenient_f64")]
    pub carbohydrates_100g: Option<f64>,
    #[serde(default, deserialize_with = "lenient_f64")]
    pub fat_100g: Option<f64>,
    #[serde(default, deserialize_with = "lenient_f64")]
    pub sugars_100g: Option<f64>,
    #[serde(default, deserialize_with = "lenient_f64")]
    pub salt_100g: Option<f64>,
}

fn lenient_f64<'de, D>(deserializer: D) -> Result<Option<f64>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Option::<serde_json::Value>::deserialize(deserializer)?;
    Ok(match value {
        Some(serde_json::Value::Number(n)) => n.as_f64(),
        Some(serde_json::Value::String(s)) => s.trim().parse().ok(),
        _ => None,
    })
}

fn non_empty(value: Option<String>) -> Option<String> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

/// Map a product to a scanned template. Missing nutriments count as zero.
#[must_use]
pub fn product_to_template(barcode: &str, p: ProductData) -> NewFoodTemplate {
    let name = non_empty(p.product_name_en)
        .or_else(|| non_empty(p.product_name))
        .unwrap_or_else(|| format!("Product {barcode}"));
    let nutriments = p.nutriments.unwrap_or_default();
    if nutriments.energy_kcal_100g.is_none() {
        tracing::debug!(barcode, "product has no energy value, using 0 kcal");
    }

    NewFoodTemplate {
        name,
        brand: non_empty(p.brands),
        barcode: Some(barcode.to_string()),
        calories_per_100g: nutriments.energy_kcal_100g.unwrap_or(0.0),
        protein_per_100g: nutriments.proteins_100g.unwrap_or(0.0),
        carbs_per_100g: nutriments.carbohydrates_100g.unwrap_or(0.0),
        fat_per_100g: nutriments.fat_100g.unwrap_or(0.0),
        sugar_per_100g: nutriments.sugars_100g,
        salt_per_100g: nutriments.salt_100g,
        image_url: non_empty(p.image_front_url),
        image_path: None,
        source: FoodSource::Scanned,
    }
}

/// Parse a product response body; `status != 1` means the product is unknown.
pub fn parse_product_response(barcode: &str, body: &str) -> Result<NewFoodTemplate, LookupError> {
    let response: ProductResponse =
        serde_json::from_str(body).map_err(|e| LookupError::Parse(e.to_string()))?;
    if response.status != 1 {
        return Err(LookupError::NotFound(barcode.to_string()));
    }
    let product = response
        .product
        .ok_or_else(|| LookupError::NotFound(barcode.to_string()))?;
    Ok(product_to_template(barcode, product))
}

#[cfg(test)]
mod tests {
    use super::*;

    const NUTELLA: &str = r#"{
        "code": "3017620422003",
        "status": 1,
        "status_verbose": "product found",
        "product": {
            "product_name": "Nutella",
            "product_name_en": "Nutella hazelnut spread",
            "brands": "Ferrero",
            "image_front_url": "https://images.openfoodfacts.org/nutella.jpg",
            "nutriments": {
                "energy-kcal_100g": 539,
                "proteins_100g": 6.3,
                "carbohydrates_100g": 57.5,
                "fat_100g": 30.9,
                "sugars_100g": 56.3,
                "salt_100g": "0.107"
            }
        }
    }"#;

    #[test]
    fn test_parse_full_product() {
        let food = parse_product_response("3017620422003", NUTELLA).unwrap();
        assert_eq!(food.name, "Nutella hazelnut spread");
        assert_eq!(food.brand.as_deref(), Some("Ferrero"));
        assert_eq!(food.barcode.as_deref(), Some("3017620422003"));
        assert!((food.calories_per_100g - 539.0).abs() < f64::EPSILON);
        assert!((food.protein_per_100g - 6.3).abs() < f64::EPSILON);
        assert!((food.carbs_per_100g - 57.5).abs() < f64::EPSILON);
        assert_eq!(food.sugar_per_100g, Some(56.3));
        assert_eq!(food.salt_per_100g, Some(0.107));
        assert!(food.image_url.is_some());
        assert_eq!(food.source, FoodSource::Scanned);
    }

    #[test]
    fn test_name_falls_back_to_product_name() {
        let p = ProductData {
            product_name_en: Some("  ".to_string()),
            product_name: Some("Leerdammer".to_string()),
            ..ProductData::default()
        };
        assert_eq!(product_to_template("1", p).name, "Leerdammer");

        let unnamed = product_to_template("42", ProductData::default());
        assert_eq!(unnamed.name, "Product 42");
    }

    #[test]
    fn test_missing_nutriments_default_to_zero() {
        let food = product_to_template("1", ProductData::default());
        assert!(food.calories_per_100g.abs() < f64::EPSILON);
        assert!(food.fat_per_100g.abs() < f64::EPSILON);
        assert!(food.sugar_per_100g.is_none());
    }

    #[test]
    fn test_status_zero_is_not_found() {
        let body = r#"{"code":"0000","status":0,"status_verbose":"product not found"}"#;
        let err = parse_product_response("0000", body).unwrap_err();
        assert!(matches!(err, LookupError::NotFound(ref code) if code == "0000"));
        assert_eq!(err.to_string(), "No product found for barcode '0000'");
    }

    #[test]
    fn test_unparseable_body() {
        let err = parse_product_response("1", "<html>busy</html>").unwrap_err();
        assert!(matches!(err, LookupError::Parse(_)));
    }

    #[test]
    fn test_product_url() {
        assert_eq!(
            product_url("737628064502"),
            "https://world.openfoodfacts.org/api/v2/product/737628064502.json"
        );
    }
}
