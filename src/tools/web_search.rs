use super::traits::{Tool, ToolFuture, ToolInputs, required_str};
use anyhow::{Context, bail};
use reqwest::Client;
use serde::Deserialize;
use serde_json::{Value, json};
use std::time::Duration;

/// DuckDuckGo instant-answer API.
pub const DEFAULT_SEARCH_ENDPOINT: &str = "https://api.duckduckgo.com/";

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "PascalCase")]
struct InstantAnswer {
    #[serde(default)]
    heading: String,
    #[serde(default)]
    abstract_text: String,
    #[serde(default, rename = "AbstractURL")]
    abstract_url: String,
    #[serde(default)]
    related_topics: Vec<RelatedTopic>,
}

/// A related topic is either a leaf result or a named group of them.
#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum RelatedTopic {
    Result {
        #[serde(rename = "Text")]
        text: String,
        #[serde(rename = "FirstURL")]
        first_url: String,
    },
    Group {
        #[serde(rename = "Topics")]
        topics: Vec<RelatedTopic>,
    },
    Other(serde::de::IgnoredAny),
}

#[derive(Debug, Clone, PartialEq, Eq)]
struct SearchHit {
    title: String,
    url: String,
    snippet: String,
}

impl SearchHit {
    fn to_value(&self) -> Value {
        json!({"title": self.title, "url": self.url, "snippet": self.snippet})
    }
}

/// Web search over an instant-answer style HTTP API.
pub struct WebSearchTool {
    client: Client,
    endpoint: String,
    api_key: Option<String>,
    default_results: usize,
}

impl WebSearchTool {
    pub fn new(endpoint: impl Into<String>, api_key: Option<String>, default_results: usize) -> Self {
        let client = Client::builder()
            .timeout(Duration::from_secs(30))
            .connect_timeout(Duration::from_secs(10))
            .build()
            .unwrap_or_else(|_| Client::new());
        Self {
            client,
            endpoint: endpoint.into(),
            api_key: api_key.filter(|key| !key.trim().is_empty()),
            default_results,
        }
    }

    async fn search(&self, query: &str) -> anyhow::Result<InstantAnswer> {
        let mut request = self.client.get(&self.endpoint).query(&[
            ("q", query),
            ("format", "json"),
            ("no_html", "1"),
            ("skip_disambig", "1"),
        ]);
        if let Some(key) = &self.api_key {
            request = request.bearer_auth(key);
        }

        let response = request.send().await.context("Search request failed")?;
        let status = response.status();
        if !status.is_success() {
            bail!("Search API returned HTTP {}", status.as_u16());
        }
        response
            .json::<InstantAnswer>()
            .await
            .context("Search API returned malformed JSON")
    }
}

fn collect_hits(answer: &InstantAnswer, limit: usize) -> Vec<SearchHit> {
    fn flatten(topics: &[RelatedTopic], hits: &mut Vec<SearchHit>) {
        for topic in topics {
            match topic {
                RelatedTopic::Result { text, first_url } => {
                    let title = text.split(" - ").next().unwrap_or(text).trim().to_string();
                    hits.push(SearchHit {
                        title,
                        url: first_url.clone(),
                        snippet: text.clone(),
                    });
                }
                RelatedTopic::Group { topics } => flatten(topics, hits),
                RelatedTopic::Other(_) => {}
            }
        }
    }

    let mut hits = Vec::new();
    if !answer.abstract_text.is_empty() {
        hits.push(SearchHit {
            title: answer.heading.clone(),
            url: answer.abstract_url.clone(),
            snippet: answer.abstract_text.clone(),
        });
    }
    flatten(&answer.related_topics, &mut hits);
    hits.truncate(limit);
    hits
}

impl Tool for WebSearchTool {
    fn name(&self) -> &str {
        "web_search"
    }

    fn description(&self) -> &str {
        "Search the web for information"
    }

    fn parameters_schema(&self) -> Value {
        json!({
            "type": "object",
            "properties": {
                "query": {
                    "type": "string",
                    "description": "Search query"
                },
                "num_results": {
                    "type": "integer",
                    "minimum": 1,
                    "default": self.default_results
                }
            },
            "required": ["query"]
        })
    }

    fn invoke<'a>(&'a self, inputs: &'a ToolInputs) -> ToolFuture<'a> {
        Box::pin(async move {
            let query = required_str(inputs, "query")?.trim();
            if query.is_empty() {
                bail!("Search query must not be empty");
            }
            let limit = inputs
                .get("num_results")
                .and_then(Value::as_u64)
                .and_then(|n| usize::try_from(n).ok())
                .unwrap_or(self.default_results)
                .max(1);

            let answer = self.search(query).await?;
            tracing::debug!(query = %query, "web_search.completed");
            let hits = collect_hits(&answer, limit);
            Ok(Value::Array(hits.iter().map(SearchHit::to_value).collect()))
        })
    }
}
