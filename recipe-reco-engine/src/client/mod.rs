//! HTTP client for the recommendation backend.

mod logging;
mod wire;

use crate::enrichment::RecipeDetailSource;
use crate::error::{Error, Result};
use crate::query::{IngredientQuery, KeywordMethod, SearchQuery};
use crate::recipe::RecipeId;
use async_trait::async_trait;
use logging::RequestLogging;
use serde::de::DeserializeOwned;
use serde::Serialize;
use surf::Client;
use wire::{CombinationRequest, DetailRequest, KeywordRequest};

pub use wire::{RawDetail, RawPage};

#[derive(Clone, Debug)]
pub struct ApiConfig {
    pub base_url: String,
    pub combination_path: String,
    pub keyword_path: String,
    pub detail_path: String,
    /// Sent as `Authorization: Bearer <token>` when present
    pub bearer_token: Option<String>,
    pub keyword_page_size: u32,
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            base_url: "http://localhost:8080".to_string(),
            combination_path: "/api/recipes/recommend/combination".to_string(),
            keyword_path: "/api/recipes/search".to_string(),
            detail_path: "/api/recipes/detail".to_string(),
            bearer_token: None,
            keyword_page_size: 20,
        }
    }
}

impl ApiConfig {
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into(),
            ..Default::default()
        }
    }

    pub fn with_token(mut self, token: impl Into<String>) -> Self {
        self.bearer_token = Some(token.into());
        self
    }

    fn url(&self, path: &str) -> String {
        format!(
            "{}/{}",
            self.base_url.trim_end_matches('/'),
            path.trim_start_matches('/')
        )
    }
}

/// Thin wrapper around the two search endpoints and the detail endpoint.
#[derive(Clone)]
pub struct RecipeApiClient {
    http: Client,
    config: ApiConfig,
}

impl RecipeApiClient {
    pub fn new(config: ApiConfig) -> Self {
        Self {
            http: Client::new().with(RequestLogging),
            config,
        }
    }

    pub fn config(&self) -> &ApiConfig {
        &self.config
    }

    pub async fn search_combinations(
        &self,
        ingredients: &[IngredientQuery],
        page: u32,
    ) -> Result<RawPage> {
        let body = CombinationRequest { ingredients, page };
        self.post_json(&self.config.combination_path, &body).await
    }

    pub async fn search_keyword(
        &self,
        keyword: &str,
        method: KeywordMethod,
        page: u32,
    ) -> Result<RawPage> {
        let body = KeywordRequest {
            keyword,
            page,
            size: self.config.keyword_page_size,
            method,
        };
        self.post_json(&self.config.keyword_path, &body).await
    }

    /// Dispatches to the endpoint matching the query's mode. Usable directly
    /// as the page fetcher handed to `PaginationController::resolve_page`.
    pub async fn search(&self, query: &SearchQuery, page: u32) -> Result<RawPage> {
        match query {
            SearchQuery::Ingredients(ingredients) => self.search_combinations(ingredients, page).await,
            SearchQuery::Keyword { keyword, method } => self.search_keyword(keyword, *method, page).await,
        }
    }

    async fn post_json<B, T>(&self, path: &str, body: &B) -> Result<T>
    where
        B: Serialize,
        T: DeserializeOwned,
    {
        let url = self.config.url(path);
        let mut request = self
            .http
            .post(&url)
            .body_json(body)
            .map_err(|e| Error::Parse(e.to_string()))?;
        if let Some(token) = &self.config.bearer_token {
            request = request.header("Authorization", format!("Bearer {}", token));
        }

        let mut response = request
            .await
            .map_err(|e| Error::Transport(e.to_string()))?;
        if !response.status().is_success() {
            return Err(Error::Status {
                endpoint: url,
                status: response.status() as u16,
            });
        }

        response
            .body_json::<T>()
            .await
            .map_err(|e| Error::Parse(e.to_string()))
    }
}

#[async_trait]
impl RecipeDetailSource for RecipeApiClient {
    async fn fetch_detail(&self, id: &RecipeId) -> Result<RawDetail> {
        let body = DetailRequest {
            recipe_id: id.as_str(),
        };
        self.post_json(&self.config.detail_path, &body)
            .await
            .map_err(|e| Error::DetailFetch {
                id: id.clone(),
                reason: e.to_string(),
            })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_url_joining() {
        let config = ApiConfig::new("https://api.example.com/");
        assert_eq!(
            config.url("/api/recipes/search"),
            "https://api.example.com/api/recipes/search"
        );
        assert_eq!(
            ApiConfig::new("http://host").url("detail"),
            "http://host/detail"
        );
    }

    #[test]
    fn test_config_builders() {
        let config = ApiConfig::new("http://host").with_token("secret");
        assert_eq!(config.bearer_token.as_deref(), Some("secret"));
        assert_eq!(config.keyword_page_size, 20);

        let client = RecipeApiClient::new(config);
        assert_eq!(client.config().base_url, "http://host");
    }
}
