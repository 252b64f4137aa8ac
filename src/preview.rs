// Copyright 2026 The Callwire Project
// SPDX-License-Identifier: Apache-2.0

// Link preview images
//
// Text cards without an image get one from the linked page's `og:image`
// (or `twitter:image`) meta tag. Lookup failures are logged and yield no
// image; they never fail the card.

use crate::config::PreviewConfig;
use async_trait::async_trait;
use reqwest::Url;
use scraper::{Html, Selector};

/// Resolves a preview image URL for a page.
#[async_trait]
pub trait PreviewImageResolver: Send + Sync {
    async fn resolve(&self, page_url: &str) -> Option<String>;
}

/// Used when preview lookup is disabled.
pub struct NoPreview;

#[async_trait]
impl PreviewImageResolver for NoPreview {
    async fn resolve(&self, _page_url: &str) -> Option<String> {
        None
    }
}

#[derive(Debug, thiserror::Error)]
pub enum PreviewError {
    #[error("invalid page URL {url}: {reason}")]
    InvalidUrl { url: String, reason: String },

    #[error("fetch failed for {url}: {source}")]
    Fetch { url: String, source: reqwest::Error },

    #[error("HTTP {status} for {url}")]
    HttpStatus { url: String, status: u16 },
}

/// Fetches the page and scrapes its meta tags.
pub struct HttpPreviewResolver {
    client: reqwest::Client,
}

impl HttpPreviewResolver {
    pub fn new(config: &PreviewConfig) -> Result<Self, reqwest::Error> {
        let client = reqwest::Client::builder()
            .timeout(config.timeout)
            .redirect(reqwest::redirect::Policy::limited(config.max_redirects))
            .user_agent(config.user_agent.as_str())
            .build()?;
        Ok(Self { client })
    }

    async fn fetch(&self, page_url: &str) -> Result<Option<String>, PreviewError> {
        let page = Url::parse(page_url).map_err(|e| PreviewError::InvalidUrl {
            url: page_url.to_string(),
            reason: e.to_string(),
        })?;

        let response = self
            .client
            .get(page.clone())
            .send()
            .await
            .map_err(|source| PreviewError::Fetch {
                url: page_url.to_string(),
                source,
            })?;

        let status = response.status();
        if !status.is_success() {
            return Err(PreviewError::HttpStatus {
                url: page_url.to_string(),
                status: status.as_u16(),
            });
        }

        // Relative image paths resolve against the final (post-redirect) URL.
        let base = response.url().clone();
        let html = response.text().await.map_err(|source| PreviewError::Fetch {
            url: page_url.to_string(),
            source,
        })?;

        Ok(extract_meta_image(&html).map(|image| absolutize(&base, &image)))
    }
}

#[async_trait]
impl PreviewImageResolver for HttpPreviewResolver {
    async fn resolve(&self, page_url: &str) -> Option<String> {
        match self.fetch(page_url).await {
            Ok(Some(image)) => {
                tracing::debug!(%page_url, %image, "preview image resolved");
                Some(image)
            }
            Ok(None) => {
                tracing::debug!(%page_url, "page has no preview image");
                None
            }
            Err(e) => {
                tracing::warn!(%page_url, error = %e, "preview image lookup failed");
                None
            }
        }
    }
}

// ---------------------------------------------------------------------------
// Meta tag scraping
// ---------------------------------------------------------------------------

/// Meta tags that may carry the preview image, in priority order.
const IMAGE_SELECTORS: [&str; 2] = [r#"meta[property="og:image"]"#, r#"meta[name="twitter:image"]"#];

/// The `og:image` content, else `twitter:image`, from the page's meta tags.
pub fn extract_meta_image(html: &str) -> Option<String> {
    let document = Html::parse_document(html);

    for selector_str in IMAGE_SELECTORS {
        let Ok(selector) = Selector::parse(selector_str) else {
            continue;
        };
        let content = document
            .select(&selector)
            .filter_map(|el| el.value().attr("content"))
            .map(str::trim)
            .find(|content| !content.is_empty());
        if let Some(content) = content {
            return Some(content.to_owned());
        }
    }

    None
}

/// Absolute URLs pass through; `//host/x` takes the page's scheme; `/x`
/// and bare `x` are joined to the page's origin.
pub fn absolutize(page: &Url, image: &str) -> String {
    if image.starts_with("http://") || image.starts_with("https://") {
        return image.to_string();
    }
    if let Some(rest) = image.strip_prefix("//") {
        return format!("{}://{}", page.scheme(), rest);
    }
    let origin = page.origin().ascii_serialization();
    if image.starts_with('/') {
        format!("{origin}{image}")
    } else {
        format!("{origin}/{image}")
    }
}
