//! HTTP client for the Magento REST API.

use std::time::Duration;

use reqwest::{Client, Url};
use serde::de::DeserializeOwned;

use crate::error::SourceError;
use crate::page::{page_is_past_end, PageBody};
use crate::retry::retry_with_backoff;
use crate::types::{MagentoAttribute, MagentoCategory, MagentoProduct};

const CATEGORIES_LIST_PATH: &str = "rest/V1/categories/list";
const CATEGORY_TREE_PATH: &str = "rest/V1/categories";
const PRODUCTS_PATH: &str = "rest/V1/products";
const ATTRIBUTES_PATH: &str = "rest/V1/products/attributes";

/// Client for the catalog endpoints of a single Magento store.
///
/// Non-2xx responses become typed errors. Transient failures (429, 5xx,
/// timeouts) are retried with back-off up to `max_retries` extra attempts.
pub struct MagentoClient {
    client: Client,
    base_url: Url,
    access_token: Option<String>,
    max_retries: u32,
    backoff_base_ms: u64,
}

impl MagentoClient {
    /// Creates a client rooted at `base_url` (e.g. `https://shop.example.com`).
    ///
    /// # Errors
    ///
    /// Returns [`SourceError::InvalidBaseUrl`] if `base_url` does not parse,
    /// or [`SourceError::Http`] if the underlying `reqwest::Client` cannot be
    /// built.
    pub fn new(
        base_url: &str,
        access_token: Option<String>,
        timeout_secs: u64,
        user_agent: &str,
        max_retries: u32,
        backoff_base_ms: u64,
    ) -> Result<Self, SourceError> {
        let base_url = parse_base_url(base_url)?;
        let client = Client::builder()
            .timeout(Duration::from_secs(timeout_secs))
            .connect_timeout(Duration::from_secs(10))
            .user_agent(user_agent)
            .build()?;
        Ok(Self {
            client,
            base_url,
            access_token,
            max_retries,
            backoff_base_ms,
        })
    }

    /// Fetches one page (1-based) of flat category rows.
    ///
    /// # Errors
    ///
    /// See [`Self::fetch_search_page`].
    pub async fn fetch_categories_page(
        &self,
        page: u32,
        page_size: u32,
    ) -> Result<Vec<MagentoCategory>, SourceError> {
        self.fetch_search_page(CATEGORIES_LIST_PATH, page, page_size)
            .await
    }

    /// Fetches one page (1-based) of products.
    ///
    /// # Errors
    ///
    /// See [`Self::fetch_search_page`].
    pub async fn fetch_products_page(
        &self,
        page: u32,
        page_size: u32,
    ) -> Result<Vec<MagentoProduct>, SourceError> {
        self.fetch_search_page(PRODUCTS_PATH, page, page_size).await
    }

    /// Fetches one page (1-based) of product attribute definitions.
    ///
    /// # Errors
    ///
    /// See [`Self::fetch_search_page`].
    pub async fn fetch_attributes_page(
        &self,
        page: u32,
        page_size: u32,
    ) -> Result<Vec<MagentoAttribute>, SourceError> {
        self.fetch_search_page(ATTRIBUTES_PATH, page, page_size)
            .await
    }

    /// Fetches the whole category tree as one nested root.
    ///
    /// # Errors
    ///
    /// Same error conditions as a page fetch.
    pub async fn fetch_category_tree(&self) -> Result<MagentoCategory, SourceError> {
        let url = self.endpoint(CATEGORY_TREE_PATH)?;
        self.get_json(url, "category tree").await
    }

    /// Fetches one page of a search endpoint.
    ///
    /// Pages past `total_count` come back empty, even though Magento itself
    /// repeats the last page for them.
    ///
    /// # Errors
    ///
    /// - [`SourceError::RateLimited`]: HTTP 429 after all retries.
    /// - [`SourceError::Unauthorized`]: HTTP 401/403.
    /// - [`SourceError::UnexpectedStatus`]: any other non-2xx status.
    /// - [`SourceError::Http`]: network or TLS failure after all retries.
    /// - [`SourceError::Deserialize`]: body is neither a bare array nor an
    ///   `items` object.
    pub async fn fetch_search_page<T: DeserializeOwned>(
        &self,
        path: &str,
        page: u32,
        page_size: u32,
    ) -> Result<Vec<T>, SourceError> {
        let mut url = self.endpoint(path)?;
        url.query_pairs_mut()
            .append_pair("searchCriteria[currentPage]", &page.to_string())
            .append_pair("searchCriteria[pageSize]", &page_size.to_string());

        let body: PageBody<T> = self.get_json(url, path).await?;
        if body
            .total_count()
            .is_some_and(|total| page_is_past_end(page, page_size, total))
        {
            tracing::debug!(path, page, "page is past total_count; treating as empty");
            return Ok(Vec::new());
        }
        Ok(body.into_items())
    }

    fn endpoint(&self, path: &str) -> Result<Url, SourceError> {
        self.base_url
            .join(path)
            .map_err(|e| SourceError::InvalidBaseUrl {
                base_url: self.base_url.to_string(),
                reason: e.to_string(),
            })
    }

    async fn get_json<T: DeserializeOwned>(
        &self,
        url: Url,
        context: &str,
    ) -> Result<T, SourceError> {
        retry_with_backoff(self.max_retries, self.backoff_base_ms, || {
            let url = url.clone();
            async move {
                let mut request = self
                    .client
                    .get(url.clone())
                    .header(reqwest::header::ACCEPT, "application/json");
                if let Some(token) = &self.access_token {
                    request = request.bearer_auth(token);
                }

                let response = request.send().await?;
                let status = response.status();
                let url_string = url.to_string();

                if status == reqwest::StatusCode::TOO_MANY_REQUESTS {
                    let retry_after_secs = response
                        .headers()
                        .get(reqwest::header::RETRY_AFTER)
                        .and_then(|v| v.to_str().ok())
                        .and_then(|s| s.parse::<u64>().ok())
                        .unwrap_or(1);
                    return Err(SourceError::RateLimited {
                        url: url_string,
                        retry_after_secs,
                    });
                }

                if status == reqwest::StatusCode::UNAUTHORIZED
                    || status == reqwest::StatusCode::FORBIDDEN
                {
                    return Err(SourceError::Unauthorized {
                        status: status.as_u16(),
                        url: url_string,
                    });
                }

                if !status.is_success() {
                    return Err(SourceError::UnexpectedStatus {
                        status: status.as_u16(),
                        url: url_string,
                    });
                }

                let body = response.text().await?;
                serde_json::from_str::<T>(&body).map_err(|e| SourceError::Deserialize {
                    context: context.to_owned(),
                    source: e,
                })
            }
        })
        .await
    }
}

/// Parses the store base URL, forcing a trailing slash so relative endpoint
/// paths join under any path prefix (`https://host/shop/`).
fn parse_base_url(raw: &str) -> Result<Url, SourceError> {
    let trimmed = raw.trim();
    let with_slash = if trimmed.ends_with('/') {
        trimmed.to_owned()
    } else {
        format!("{trimmed}/")
    };
    let url = Url::parse(&with_slash).map_err(|e| SourceError::InvalidBaseUrl {
        base_url: raw.to_owned(),
        reason: e.to_string(),
    })?;
    if !matches!(url.scheme(), "http" | "https") {
        return Err(SourceError::InvalidBaseUrl {
            base_url: raw.to_owned(),
            reason: format!("unsupported scheme \"{}\"", url.scheme()),
        });
    }
    Ok(url)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn base_url_gets_trailing_slash() {
        let url = parse_base_url("https://shop.example.com/store").expect("valid");
        assert_eq!(url.as_str(), "https://shop.example.com/store/");
        assert_eq!(
            url.join(PRODUCTS_PATH).expect("join").as_str(),
            "https://shop.example.com/store/rest/V1/products"
        );
    }

    #[test]
    fn rejects_non_http_scheme() {
        assert!(matches!(
            parse_base_url("ftp://shop.example.com"),
            Err(SourceError::InvalidBaseUrl { .. })
        ));
    }

    #[test]
    fn rejects_garbage() {
        assert!(matches!(
            parse_base_url("not a url"),
            Err(SourceError::InvalidBaseUrl { .. })
        ));
    }
}
