use std::time::Duration;

use anyhow::{Context, Result};

use stride_core::models::NewFoodTemplate;
use stride_core::openfoodfacts::{
    FoodLookupProvider, LookupError, parse_product_response, product_url,
};

pub struct OpenFoodFactsClient {
    client: reqwest::Client,
    rt: tokio::runtime::Handle,
}

impl OpenFoodFactsClient {
    pub fn new(timeout: Duration) -> Result<Self> {
        let client = reqwest::Client::builder()
            .user_agent(format!(
                "stride-cli/{} (fitness tracker)",
                env!("CARGO_PKG_VERSION")
            ))
            .timeout(timeout)
            .connect_timeout(Duration::from_secs(5).min(timeout))
            .build()
            .context("Failed to build HTTP client")?;
        Ok(Self {
            client,
            rt: tokio::runtime::Handle::current(),
        })
    }

    pub async fn lookup_barcode_async(
        &self,
        barcode: &str,
    ) -> Result<NewFoodTemplate, LookupError> {
        let url = product_url(barcode);
        tracing::debug!(%url, "looking up barcode");
        let resp = self
            .client
            .get(&url)
            .send()
            .await
            .map_err(|e| LookupError::Network(e.to_string()))?;

        let status = resp.status();
        // unknown products come back as 404 with a status-0 body
        if status == reqwest::StatusCode::NOT_FOUND {
            return Err(LookupError::NotFound(barcode.to_string()));
        }
        if !status.is_success() {
            return Err(LookupError::Status(status.as_u16()));
        }

        let body = resp
            .text()
            .await
            .map_err(|e| LookupError::Network(e.to_string()))?;
        parse_product_response(barcode, &body)
    }

    /// Download a product image; returns the bytes and a file extension.
    pub async fn fetch_image(&self, url: &str) -> Result<(Vec<u8>, String)> {
        let resp = self
            .client
            .get(url)
            .send()
            .await
            .context("Failed to download product image")?
            .error_for_status()
            .context("Product image request failed")?;
        let extension = image_extension(
            resp.headers()
                .get(reqwest::header::CONTENT_TYPE)
                .and_then(|v| v.to_str().ok()),
            url,
        );
        let bytes = resp.bytes().await.context("Failed to read product image")?;
        Ok((bytes.to_vec(), extension))
    }

    pub fn fetch_image_blocking(&self, url: &str) -> Result<(Vec<u8>, String)> {
        tokio::task::block_in_place(|| self.rt.block_on(self.fetch_image(url)))
    }
}

impl FoodLookupProvider for OpenFoodFactsClient {
    fn lookup_barcode(&self, barcode: &str) -> Result<NewFoodTemplate, LookupError> {
        tokio::task::block_in_place(|| self.rt.block_on(self.lookup_barcode_async(barcode)))
    }
}

fn image_extension(content_type: Option<&str>, url: &str) -> String {
    match content_type.map(|c| c.split(';').next().unwrap_or(c).trim()) {
        Some("image/png") => return "png".to_string(),
        Some("image/webp") => return "webp".to_string(),
        Some("image/jpeg") => return "jpg".to_string(),
        _ => {}
    }
    url.rsplit('/')
        .next()
        .and_then(|name| name.rsplit_once('.'))
        .map(|(_, ext)| ext.to_lowercase())
        .filter(|ext| matches!(ext.as_str(), "jpg" | "jpeg" | "png" | "webp"))
        .unwrap_or_else(|| "jpg".to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_image_extension_from_content_type() {
        assert_eq!(image_extension(Some("image/png"), "https://x/a"), "png");
        assert_eq!(
            image_extension(Some("image/jpeg; charset=binary"), "https://x/a.png"),
            "jpg"
        );
    }

    #[test]
    fn test_image_extension_from_url() {
        assert_eq!(
            image_extension(None, "https://images.openfoodfacts.org/front_en.400.webp"),
            "webp"
        );
        assert_eq!(image_extension(Some("application/octet-stream"), "https://x/front"), "jpg");
        assert_eq!(image_extension(None, "https://x/front.svg"), "jpg");
    }

    // --- Integration tests (hit real OpenFoodFacts API) ---

    #[tokio::test(flavor = "multi_thread")]
    #[ignore = "hits OpenFoodFacts API"]
    async fn test_lookup_barcode_known_product() {
        let client = OpenFoodFactsClient::new(Duration::from_secs(10)).unwrap();
        let food = client.lookup_barcode_async("3017620422003").await.unwrap();
        assert!(food.name.to_lowercase().contains("nutella"));
        assert!(food.calories_per_100g > 0.0);
        assert_eq!(food.barcode.as_deref(), Some("3017620422003"));
    }

    #[tokio::test(flavor = "multi_thread")]
    #[ignore = "hits OpenFoodFacts API"]
    async fn test_lookup_barcode_not_found() {
        let client = OpenFoodFactsClient::new(Duration::from_secs(10)).unwrap();
        let result = client.lookup_barcode_async("0000000000000").await;
        assert!(matches!(result, Err(LookupError::NotFound(_))));
    }

    #[tokio::test(flavor = "multi_thread")]
    #[ignore = "hits OpenFoodFacts API"]
    async fn test_blocking_provider_inside_runtime() {
        let client = OpenFoodFactsClient::new(Duration::from_secs(10)).unwrap();
        let food = client.lookup_barcode("3017620422003").unwrap();
        assert!(food.calories_per_100g > 0.0);
    }
}
