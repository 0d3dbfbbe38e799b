use anyhow::{Context, Result};
use chrono::{DateTime, Duration, Local, Utc};
use futures::future::join_all;
use reqwest::Client;
use serde::Deserialize;
use tracing::{debug, info, warn};

use crate::error::AgentError;
use crate::models::Article;

/// Page size is the article budget spread over this many categories.
const CATEGORY_DIVISOR: usize = 3;
const REQUEST_TIMEOUT_SECS: u64 = 30;

/// Source of articles for one run.
#[async_trait::async_trait]
pub trait ArticleSource: Send + Sync {
    /// Fetch the past week's articles for each category. Fails only when no
    /// category produced any article.
    async fn fetch(&self, categories: &[String]) -> crate::error::Result<Vec<Article>>;
}

/// NewsAPI `/v2/everything` client
pub struct NewsCollector {
    base_url: String,
    api_key: String,
    max_results: usize,
    client: Client,
}

impl NewsCollector {
    pub fn new(
        base_url: impl Into<String>,
        api_key: impl Into<String>,
        max_results: usize,
    ) -> Result<Self> {
        let client = Client::builder()
            .timeout(std::time::Duration::from_secs(REQUEST_TIMEOUT_SECS))
            .user_agent(concat!("technews/", env!("CARGO_PKG_VERSION")))
            .build()
            .context("failed to build reqwest client")?;

        Ok(Self {
            base_url: base_url.into(),
            api_key: api_key.into(),
            max_results,
            client,
        })
    }

    pub fn page_size(&self) -> usize {
        (self.max_results / CATEGORY_DIVISOR).max(1)
    }

    /// Query one category over the trailing seven days.
    pub async fn fetch_category(&self, category: &str) -> Result<Vec<Article>> {
        let to = Local::now().date_naive();
        let from = to - Duration::days(7);

        let page_size = self.page_size().to_string();
        let from = from.format("%Y-%m-%d").to_string();
        let to = to.format("%Y-%m-%d").to_string();
        let url = url::Url::parse_with_params(
            &self.base_url,
            &[
                ("q", category),
                ("from", from.as_str()),
                ("to", to.as_str()),
                ("sortBy", "popularity"),
                ("language", "en"),
                ("pageSize", page_size.as_str()),
            ],
        )
        .context("failed to build NewsAPI URL")?;

        let response = self
            .client
            .get(url)
            .header("X-Api-Key", &self.api_key)
            .send()
            .await
            .context("network error during fetch")?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            anyhow::bail!("NewsAPI returned status {}: {}", status, body);
        }

        let payload: NewsApiResponse = response
            .json()
            .await
            .context("failed to decode NewsAPI response")?;

        if payload.status != "ok" {
            anyhow::bail!(
                "NewsAPI returned status {:?}: {}",
                payload.status,
                payload.message.unwrap_or_default()
            );
        }

        debug!(
            category,
            total_results = payload.total_results.unwrap_or(0),
            returned = payload.articles.len(),
            "NewsAPI page received"
        );
        Ok(payload
            .articles
            .into_iter()
            .map(|item| item.into_article(category))
            .collect())
    }
}

#[async_trait::async_trait]
impl ArticleSource for NewsCollector {
    async fn fetch(&self, categories: &[String]) -> crate::error::Result<Vec<Article>> {
        let results = join_all(categories.iter().map(|c| self.fetch_category(c))).await;

        let mut all_articles = Vec::new();
        let mut failures = Vec::new();
        for (category, result) in categories.iter().zip(results) {
            match result {
                Ok(articles) => {
                    info!("Fetched {} {} articles", articles.len(), category);
                    all_articles.extend(articles);
                }
                Err(e) => {
                    warn!("Error fetching {} news: {:#}", category, e);
                    failures.push(format!("{}: {:#}", category, e));
                }
            }
        }

        if all_articles.is_empty() {
            let reason = if failures.is_empty() {
                "no articles found".to_string()
            } else {
                failures.join("; ")
            };
            return Err(AgentError::Collection(reason));
        }

        Ok(all_articles)
    }
}

// NewsAPI response structures
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct NewsApiResponse {
    status: String,
    #[serde(default)]
    total_results: Option<u64>,
    #[serde(default)]
    articles: Vec<NewsApiArticle>,
    #[serde(default)]
    message: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct NewsApiArticle {
    #[serde(default)]
    source: NewsApiSource,
    #[serde(default)]
    title: Option<String>,
    #[serde(default)]
    description: Option<String>,
    #[serde(default)]
    url: Option<String>,
    #[serde(default)]
    published_at: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
struct NewsApiSource {
    #[serde(default)]
    name: Option<String>,
}

impl NewsApiArticle {
    fn into_article(self, category: &str) -> Article {
        Article {
            title: self.title.unwrap_or_default(),
            description: self.description.filter(|d| !d.trim().is_empty()),
            url: self.url.unwrap_or_default(),
            source: self.source.name.unwrap_or_default(),
            published_at: self.published_at.as_deref().and_then(parse_published_at),
            category: category.to_string(),
        }
    }
}

fn parse_published_at(raw: &str) -> Option<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(raw)
        .ok()
        .map(|dt| dt.with_timezone(&Utc))
}
