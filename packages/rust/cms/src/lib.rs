//! CMS publishing: the [`CmsPublisher`] seam and a Shopify Admin GraphQL client.

use std::time::Duration;

use async_trait::async_trait;
use chrono::Utc;
use reqwest::Client;
use reqwest::header::{CONTENT_TYPE, HeaderMap, HeaderValue};
use serde::Deserialize;
use tracing::{debug, instrument};

use seoranker_shared::{PublishConfig, Result, SeoRankerError, ShopifyCredentials};

/// An article ready to submit.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ArticleDraft {
    pub title: String,
    pub body_html: String,
    pub summary: String,
}

/// Identity of a created article.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PublishedArticle {
    pub id: String,
    pub title: String,
}

#[async_trait]
pub trait CmsPublisher: Send + Sync {
    /// Create the article. Validation problems reported by the CMS are
    /// returned as [`SeoRankerError::Publish`].
    async fn publish(&self, article: &ArticleDraft) -> Result<PublishedArticle>;
}

// ---------------------------------------------------------------------------
// Shopify
// ---------------------------------------------------------------------------

const ARTICLE_CREATE: &str = r#"mutation CreateArticle($article: ArticleCreateInput!) {
  articleCreate(article: $article) {
    article {
      id
      title
    }
    userErrors {
      field
      message
    }
  }
}"#;

#[derive(Debug, Deserialize)]
struct GraphQlResponse {
    #[serde(default)]
    data: Option<ResponseData>,
    #[serde(default)]
    errors: Option<Vec<GraphQlError>>,
}

#[derive(Debug, Deserialize)]
struct GraphQlError {
    message: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ResponseData {
    article_create: Option<ArticleCreatePayload>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ArticleCreatePayload {
    article: Option<ArticleNode>,
    #[serde(default)]
    user_errors: Vec<UserError>,
}

#[derive(Debug, Deserialize)]
struct ArticleNode {
    id: String,
    #[serde(default)]
    title: String,
}

#[derive(Debug, Deserialize)]
struct UserError {
    #[serde(default)]
    field: Option<Vec<String>>,
    message: String,
}

impl std::fmt::Display for UserError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match &self.field {
            Some(field) if !field.is_empty() => write!(f, "{}: {}", field.join("."), self.message),
            _ => f.write_str(&self.message),
        }
    }
}

/// Shopify Admin GraphQL `articleCreate` client.
pub struct ShopifyClient {
    http: Client,
    endpoint: String,
    access_token: String,
    blog_id: String,
    author: String,
    tags: Vec<String>,
}

impl ShopifyClient {
    pub fn new(credentials: &ShopifyCredentials, config: &PublishConfig) -> Result<Self> {
        if config.blog_id.trim().is_empty() {
            return Err(SeoRankerError::config(
                "publish.blog_id is not set (e.g. gid://shopify/Blog/123456789)",
            ));
        }

        let http = Client::builder()
            .timeout(Duration::from_secs(60))
            .build()
            .map_err(|e| SeoRankerError::Publish(format!("failed to build HTTP client: {e}")))?;

        let store = credentials.store.trim().trim_end_matches('/');
        let base = if store.starts_with("http://") || store.starts_with("https://") {
            store.to_string()
        } else {
            format!("https://{store}")
        };

        Ok(Self {
            http,
            endpoint: format!("{base}/admin/api/{}/graphql.json", config.api_version),
            access_token: credentials.access_token.clone(),
            blog_id: config.blog_id.clone(),
            author: config.author.clone(),
            tags: config.tags.clone(),
        })
    }

    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }

    fn headers(&self) -> Result<HeaderMap> {
        let mut headers = HeaderMap::new();
        headers.insert(
            "X-Shopify-Access-Token",
            HeaderValue::from_str(&self.access_token)
                .map_err(|e| SeoRankerError::config(format!("invalid access token: {e}")))?,
        );
        headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));
        Ok(headers)
    }
}

#[async_trait]
impl CmsPublisher for ShopifyClient {
    #[instrument(skip_all, fields(title = %article.title))]
    async fn publish(&self, article: &ArticleDraft) -> Result<PublishedArticle> {
        let variables = serde_json::json!({
            "article": {
                "blogId": self.blog_id,
                "title": article.title,
                "body": article.body_html,
                "summary": article.summary,
                "tags": self.tags,
                "author": { "name": self.author },
                "isPublished": true,
                "publishedAt": Utc::now().to_rfc3339(),
            }
        });

        let response = self
            .http
            .post(&self.endpoint)
            .headers(self.headers()?)
            .json(&serde_json::json!({ "query": ARTICLE_CREATE, "variables": variables }))
            .send()
            .await
            .map_err(|e| SeoRankerError::Publish(format!("request failed: {e}")))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(SeoRankerError::Publish(format!("HTTP {status}: {body}")));
        }

        let parsed: GraphQlResponse = response
            .json()
            .await
            .map_err(|e| SeoRankerError::Publish(format!("unexpected response: {e}")))?;

        if let Some(errors) = parsed.errors.filter(|e| !e.is_empty()) {
            let messages: Vec<_> = errors.into_iter().map(|e| e.message).collect();
            return Err(SeoRankerError::Publish(messages.join("; ")));
        }

        let payload = parsed
            .data
            .and_then(|d| d.article_create)
            .ok_or_else(|| SeoRankerError::Publish("response missing articleCreate".into()))?;

        if !payload.user_errors.is_empty() {
            let messages: Vec<_> = payload.user_errors.iter().map(|e| e.to_string()).collect();
            return Err(SeoRankerError::Publish(format!(
                "rejected by CMS: {}",
                messages.join("; ")
            )));
        }

        let node = payload
            .article
            .ok_or_else(|| SeoRankerError::Publish("response missing article".into()))?;
        debug!(id = %node.id, "article created");

        Ok(PublishedArticle {
            id: node.id,
            title: node.title,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use wiremock::matchers::{body_partial_json, header, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn client(server: &MockServer) -> ShopifyClient {
        let creds = ShopifyCredentials {
            store: server.uri(),
            access_token: "shpat_test".into(),
        };
        let config = PublishConfig {
            blog_id: "gid://shopify/Blog/1".into(),
            ..Default::default()
        };
        ShopifyClient::new(&creds, &config).unwrap()
    }

    fn draft() -> ArticleDraft {
        ArticleDraft {
            title: "Pour Over Coffee".into(),
            body_html: "<p>Body</p>".into(),
            summary: "Meta".into(),
        }
    }

    #[tokio::test]
    async fn creates_article() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/admin/api/2024-10/graphql.json"))
            .and(header("X-Shopify-Access-Token", "shpat_test"))
            .and(body_partial_json(serde_json::json!({
                "variables": {"article": {"blogId": "gid://shopify/Blog/1", "title": "Pour Over Coffee"}}
            })))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "data": {"articleCreate": {
                    "article": {"id": "gid://shopify/Article/9", "title": "Pour Over Coffee"},
                    "userErrors": []
                }}
            })))
            .mount(&server)
            .await;

        let article = client(&server).publish(&draft()).await.unwrap();
        assert_eq!(article.id, "gid://shopify/Article/9");
    }

    #[tokio::test]
    async fn user_errors_fail_publish() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "data": {"articleCreate": {
                    "article": null,
                    "userErrors": [{"field": ["article", "title"], "message": "can't be blank"}]
                }}
            })))
            .mount(&server)
            .await;

        let err = client(&server).publish(&draft()).await.unwrap_err();
        assert!(matches!(err, SeoRankerError::Publish(ref m) if m.contains("article.title: can't be blank")));
    }

    #[tokio::test]
    async fn top_level_errors_fail_publish() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "errors": [{"message": "Access denied"}]
            })))
            .mount(&server)
            .await;

        let err = client(&server).publish(&draft()).await.unwrap_err();
        assert!(err.to_string().contains("Access denied"));
    }

    #[test]
    fn missing_blog_id_is_config_error() {
        let creds = ShopifyCredentials {
            store: "demo.myshopify.com".into(),
            access_token: "t".into(),
        };
        let err = ShopifyClient::new(&creds, &PublishConfig::default())
            .err()
            .expect("config error");
        assert!(matches!(err, SeoRankerError::Config { .. }));
    }

    #[test]
    fn endpoint_from_store_domain() {
        let creds = ShopifyCredentials {
            store: "demo.myshopify.com".into(),
            access_token: "t".into(),
        };
        let config = PublishConfig {
            blog_id: "gid://shopify/Blog/1".into(),
            ..Default::default()
        };
        let client = ShopifyClient::new(&creds, &config).unwrap();
        assert_eq!(
            client.endpoint(),
            "https://demo.myshopify.com/admin/api/2024-10/graphql.json"
        );
    }
}
