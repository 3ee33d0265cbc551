//! PubMed literature API over NCBI E-utilities (JSON mode).

use async_trait::async_trait;
use serde::Deserialize;
use serde_json::Value;

use crate::config::ApiConfig;
use crate::models::{Article, SearchQuery};
use crate::sources::{LiteratureApi, SourceError};
use crate::utils::HttpClient;

/// PubMed E-utilities API base URL
pub const PUBMED_EUTILS_URL: &str = "https://eutils.ncbi.nlm.nih.gov/entrez/eutils";

/// PubMed client
///
/// Uses `esearch.fcgi` for the id list and `esummary.fcgi` for article
/// summaries. Requests are unauthenticated unless an NCBI API key is set.
#[derive(Debug, Clone)]
pub struct PubMedClient {
    client: HttpClient,
    base_url: String,
    tool: Option<String>,
    email: Option<String>,
    api_key: Option<String>,
}

impl PubMedClient {
    /// Create a new client against the public E-utilities endpoint
    pub fn new() -> Result<Self, SourceError> {
        Ok(Self::with_client(HttpClient::new()?, PUBMED_EUTILS_URL))
    }

    /// Create with a custom HTTP client and base URL (for testing)
    pub fn with_client(client: HttpClient, base_url: impl Into<String>) -> Self {
        Self {
            client,
            base_url: base_url.into().trim_end_matches('/').to_string(),
            tool: None,
            email: None,
            api_key: None,
        }
    }

    /// Create from the `[api]` configuration section
    pub fn from_config(config: &ApiConfig) -> Result<Self, SourceError> {
        let client = HttpClient::with_settings(&config.user_agent, config.timeout())?;
        let mut source = Self::with_client(client, &config.base_url);
        source.tool = config.tool.clone();
        source.email = config.email.clone();
        source.api_key = config.api_key.clone();
        Ok(source)
    }

    /// Base URL requests are sent to
    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Etiquette parameters NCBI asks clients to send
    fn identity_params(&self) -> String {
        let mut params = String::new();
        for (key, value) in [
            ("tool", &self.tool),
            ("email", &self.email),
            ("api_key", &self.api_key),
        ] {
            if let Some(value) = value {
                params.push_str(&format!("&{}={}", key, urlencoding::encode(value)));
            }
        }
        params
    }

    /// Build E-utilities search URL
    fn build_search_url(&self, query: &SearchQuery) -> String {
        format!(
            "{}/esearch.fcgi?db=pubmed&term={}&retmode=json&retmax={}&sort={}{}",
            self.base_url,
            urlencoding::encode(&query.term),
            query.max_results,
            query.sort.as_param(),
            self.identity_params()
        )
    }

    /// Build E-utilities summary URL for specific PubMed IDs
    fn build_summary_url(&self, ids: &[String]) -> String {
        format!(
            "{}/esummary.fcgi?db=pubmed&id={}&retmode=json{}",
            self.base_url,
            ids.join(","),
            self.identity_params()
        )
    }

    /// Parse esearch JSON into the id list
    fn parse_search_response(body: &str) -> Result<Vec<String>, SourceError> {
        #[derive(Debug, Deserialize)]
        struct SearchEnvelope {
            esearchresult: Option<SearchResult>,
        }

        #[derive(Debug, Deserialize)]
        struct SearchResult {
            #[serde(default)]
            idlist: Vec<String>,
            #[serde(rename = "ERROR")]
            error: Option<String>,
        }

        let envelope: SearchEnvelope = serde_json::from_str(body)?;

        match envelope.esearchresult {
            Some(SearchResult {
                error: Some(message),
                idlist,
            }) if idlist.is_empty() => Err(SourceError::Api(message)),
            Some(result) => Ok(result.idlist),
            None => Ok(Vec::new()),
        }
    }

    /// Parse esummary JSON into articles, in `uids` order
    fn parse_summary_response(body: &str) -> Result<Vec<Article>, SourceError> {
        let envelope: Value = serde_json::from_str(body)?;

        let result = match envelope.get("result") {
            Some(result) => result,
            None => return Ok(Vec::new()),
        };

        let uids: Vec<String> = match result.get("uids") {
            Some(uids) => serde_json::from_value(uids.clone())?,
            None => Vec::new(),
        };

        let mut articles = Vec::with_capacity(uids.len());
        for uid in uids {
            let Some(item) = result.get(&uid) else {
                tracing::debug!("Summary for {} missing from response", uid);
                continue;
            };
            if let Some(error) = item.get("error").and_then(Value::as_str) {
                tracing::debug!("Summary for {} unavailable: {}", uid, error);
                continue;
            }

            let mut article: Article = serde_json::from_value(item.clone())
                .map_err(|e| SourceError::Parse(format!("Summary for {}: {}", uid, e)))?;
            article.uid = uid;
            articles.push(article);
        }

        Ok(articles)
    }

    async fn get_text(&self, url: &str, action: &str) -> Result<String, SourceError> {
        tracing::debug!("GET {}", url);

        let response = self
            .client
            .get(url)
            .send()
            .await
            .map_err(|e| SourceError::Network(format!("Failed to {}: {}", action, e)))?;

        let status = response.status();
        if status == reqwest::StatusCode::TOO_MANY_REQUESTS {
            return Err(SourceError::RateLimit);
        }
        if !status.is_success() {
            return Err(SourceError::Api(format!(
                "Failed to {}: PubMed returned status {}",
                action, status
            )));
        }

        response
            .text()
            .await
            .map_err(|e| SourceError::Network(format!("Failed to read response: {}", e)))
    }
}

#[async_trait]
impl LiteratureApi for PubMedClient {
    fn id(&self) -> &str {
        "pubmed"
    }

    fn name(&self) -> &str {
        "PubMed"
    }

    async fn search_ids(&self, query: &SearchQuery) -> Result<Vec<String>, SourceError> {
        if query.term.trim().is_empty() {
            return Err(SourceError::InvalidRequest("empty search term".to_string()));
        }

        let body = self
            .get_text(&self.build_search_url(query), "search PubMed")
            .await?;
        Self::parse_search_response(&body)
    }

    async fn summarize(&self, ids: &[String]) -> Result<Vec<Article>, SourceError> {
        if ids.is_empty() {
            return Ok(Vec::new());
        }

        let body = self
            .get_text(&self.build_summary_url(ids), "fetch summaries")
            .await?;
        Self::parse_summary_response(&body)
    }
}
