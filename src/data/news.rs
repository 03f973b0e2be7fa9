//! NewsAPI top-headlines client

use reqwest::Client;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::{debug, warn};

use super::FetchError;

/// Base URL for NewsAPI
pub const NEWSAPI_BASE_URL: &str = "https://newsapi.org";

/// Maximum number of headlines returned
pub const MAX_HEADLINES: usize = 5;

/// A headline as exposed to the dashboard
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewsArticle {
    pub title: String,
    pub description: Option<String>,
    pub url: String,
    pub url_to_image: Option<String>,
}

#[derive(Debug, Deserialize)]
struct HeadlinesResponse {
    status: String,
    #[serde(default)]
    code: Option<String>,
    #[serde(default)]
    message: Option<String>,
    /// Mapped one by one after truncation to `MAX_HEADLINES`
    #[serde(default)]
    articles: Vec<Value>,
}

/// Article fields as NewsAPI sends them; any of them may be null or absent
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
struct RawArticle {
    title: Option<String>,
    description: Option<String>,
    url: Option<String>,
    url_to_image: Option<String>,
}

impl From<Value> for NewsArticle {
    fn from(value: Value) -> Self {
        let raw: RawArticle = serde_json::from_value(value).unwrap_or_else(|e| {
            warn!(error = %e, "article has unexpected shape");
            RawArticle::default()
        });
        NewsArticle {
            title: raw.title.unwrap_or_default(),
            description: raw.description,
            url: raw.url.unwrap_or_default(),
            url_to_image: raw.url_to_image,
        }
    }
}

/// Client for the NewsAPI top-headlines endpoint
#[derive(Debug, Clone)]
pub struct NewsClient {
    client: Client,
    api_key: String,
    base_url: String,
    country: String,
}

impl NewsClient {
    pub fn new(api_key: impl Into<String>) -> Self {
        Self {
            client: Client::new(),
            api_key: api_key.into(),
            base_url: NEWSAPI_BASE_URL.to_string(),
            country: "us".to_string(),
        }
    }

    /// Point the client at a different host (used by tests)
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into().trim_end_matches('/').to_string();
        self
    }

    /// Fetch up to five top headlines
    ///
    /// NewsAPI reports failures with `status != "ok"`, sometimes alongside an
    /// error HTTP status; both become a `FetchError`.
    pub async fn top_headlines(&self) -> Result<Vec<NewsArticle>, FetchError> {
        debug!(country = %self.country, "fetching top headlines");
        let url = format!("{}/v2/top-headlines", self.base_url);
        let response = self
            .client
            .get(&url)
            .query(&[("country", self.country.as_str()), ("apiKey", self.api_key.as_str())])
            .send()
            .await?;

        let status = response.status();
        let text = response.text().await?;
        let body: HeadlinesResponse = match serde_json::from_str(&text) {
            Ok(body) => body,
            Err(_) if !status.is_success() => {
                return Err(FetchError::Status {
                    provider: "News",
                    status: status.as_u16(),
                })
            }
            Err(e) => return Err(FetchError::Malformed(format!("News API returned invalid JSON: {}", e))),
        };

        if body.status != "ok" {
            return Err(FetchError::Provider {
                provider: "News",
                code: body.code.unwrap_or_else(|| body.status.clone()),
                message: body.message.unwrap_or_default(),
            });
        }

        Ok(body
            .articles
            .into_iter()
            .take(MAX_HEADLINES)
            .map(NewsArticle::from)
            .collect())
    }
}
