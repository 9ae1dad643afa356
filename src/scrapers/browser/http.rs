//! Static HTTP engine: fetches server-rendered HTML without executing scripts.

use async_trait::async_trait;
use reqwest::Client;
use tracing::debug;

use super::{check_wait, BrowserEngineConfig, PageContent, PageRenderer, RenderRequest};
use crate::scrapers::{FetchError, ScrapeError};

pub struct HttpRenderer {
    client: Client,
}

impl HttpRenderer {
    pub fn new(config: &BrowserEngineConfig) -> Result<Self, ScrapeError> {
        let mut builder = Client::builder()
            .user_agent(config.user_agent.clone())
            .gzip(true)
            .brotli(true);

        if let Some(ref proxy) = config.proxy {
            let proxy = reqwest::Proxy::all(proxy)
                .map_err(|e| ScrapeError::Engine(format!("invalid proxy {}: {}", proxy, e)))?;
            builder = builder.proxy(proxy);
        }

        let client = builder
            .build()
            .map_err(|e| ScrapeError::Engine(format!("failed to build HTTP client: {}", e)))?;

        Ok(Self { client })
    }
}

#[async_trait]
impl PageRenderer for HttpRenderer {
    async fn render(&self, request: &RenderRequest) -> Result<PageContent, FetchError> {
        let response = self
            .client
            .get(&request.url)
            .send()
            .await
            .map_err(|e| FetchError::navigation(&request.url, e))?;

        let status = response.status();
        if !status.is_success() {
            return Err(FetchError::navigation(
                &request.url,
                format!("HTTP {}", status.as_u16()),
            ));
        }

        let html = response
            .text()
            .await
            .map_err(|e| FetchError::navigation(&request.url, e))?;
        debug!(url = %request.url, bytes = html.len(), "Fetched page");

        check_wait(&request.url, &html, request.wait_for.as_ref())?;
        Ok(PageContent::new(request.url.clone(), html))
    }

    fn name(&self) -> &'static str {
        "http"
    }
}
