//! Unsplash city image lookup

use reqwest::Client;
use serde::Deserialize;
use tracing::warn;

/// Base URL for the Unsplash API
pub const UNSPLASH_BASE_URL: &str = "https://api.unsplash.com";

/// Image shown when no photo can be found
pub const PLACEHOLDER_IMAGE: &str = "/placeholder.svg?height=400&width=600";

#[derive(Debug, Deserialize)]
struct SearchResponse {
    #[serde(default)]
    results: Vec<Photo>,
}

#[derive(Debug, Deserialize)]
struct Photo {
    urls: PhotoUrls,
}

#[derive(Debug, Deserialize)]
struct PhotoUrls {
    regular: String,
}

/// Client for Unsplash photo search
#[derive(Debug, Clone)]
pub struct UnsplashClient {
    client: Client,
    access_key: String,
    base_url: String,
}

impl UnsplashClient {
    pub fn new(access_key: impl Into<String>) -> Self {
        Self {
            client: Client::new(),
            access_key: access_key.into(),
            base_url: UNSPLASH_BASE_URL.to_string(),
        }
    }

    /// Point the client at a different host (used by tests)
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into().trim_end_matches('/').to_string();
        self
    }

    /// URL of a landscape photo of `city`, or [`PLACEHOLDER_IMAGE`]
    pub async fn city_image(&self, city: &str) -> String {
        match self.search(city).await {
            Ok(Some(url)) => url,
            Ok(None) => {
                warn!(city, "no images found");
                PLACEHOLDER_IMAGE.to_string()
            }
            Err(e) => {
                warn!(city, error = %e, "error fetching city image");
                PLACEHOLDER_IMAGE.to_string()
            }
        }
    }

    async fn search(&self, city: &str) -> Result<Option<String>, reqwest::Error> {
        let url = format!("{}/search/photos", self.base_url);
        let response: SearchResponse = self
            .client
            .get(&url)
            .query(&[
                ("query", city),
                ("client_id", self.access_key.as_str()),
                ("orientation", "landscape"),
            ])
            .send()
            .await?
            .error_for_status()?
            .json()
            .await?;

        Ok(response.results.into_iter().next().map(|p| p.urls.regular))
    }
}
