//! Publishing generated articles to the CMS upload endpoint.
//!
//! Each publish attempt gets a fresh slug of the form
//! `auto-<unix seconds>-<100..=999>`. The random suffix keeps two uploads in
//! the same second apart with high probability; it is not a uniqueness
//! guarantee.
//!
//! [`UploadClient`] posts the payload as JSON with a bearer token and treats
//! only HTTP 200 as success. [`DryRun`] logs the payload instead.

use crate::config::UploadConfig;
use crate::error::UploadError;
use crate::models::UploadPayload;
use crate::utils::truncate_for_log;
use chrono::Utc;
use rand::Rng;
use reqwest::{Client, StatusCode};
use std::fmt;
use tracing::{info, instrument};

/// Destination for finished articles.
pub trait Publish {
    async fn upload(&self, payload: &UploadPayload) -> Result<(), UploadError>;
}

/// Build a slug from a Unix timestamp and a random three-digit suffix.
///
/// # Arguments
///
/// * `unix_secs` - Seconds since the Unix epoch
/// * `rng` - Source of the `100..=999` suffix
///
/// # Returns
///
/// A slug such as `auto-1700000000-482`.
pub fn make_slug<R: Rng + ?Sized>(unix_secs: i64, rng: &mut R) -> String {
    let suffix: u16 = rng.random_range(100..=999);
    format!("auto-{unix_secs}-{suffix}")
}

/// Slug for an upload happening now.
pub fn slug_now<R: Rng + ?Sized>(rng: &mut R) -> String {
    make_slug(Utc::now().timestamp(), rng)
}

pub struct UploadClient {
    client: Client,
    url: String,
    token: String,
}

impl fmt::Debug for UploadClient {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("UploadClient")
            .field("url", &self.url)
            .field("token", &"<redacted>")
            .finish()
    }
}

impl UploadClient {
    /// Create a client for the upload endpoint.
    ///
    /// # Arguments
    ///
    /// * `config` - Endpoint URL, bearer token and optional request timeout
    ///
    /// # Returns
    ///
    /// The client, or an error if the underlying HTTP client cannot be built.
    /// Without a configured timeout requests may wait indefinitely.
    pub fn new(config: &UploadConfig) -> Result<Self, reqwest::Error> {
        let mut builder = Client::builder();
        if let Some(timeout) = config.timeout {
            builder = builder.timeout(timeout);
        }
        Ok(Self {
            client: builder.build()?,
            url: config.url.clone(),
            token: config.token.clone(),
        })
    }
}

impl Publish for UploadClient {
    #[instrument(level = "info", skip_all, fields(slug = %payload.slug, menu = %payload.category))]
    async fn upload(&self, payload: &UploadPayload) -> Result<(), UploadError> {
        info!(title = %payload.title, "Uploading article");
        let response = self
            .client
            .post(&self.url)
            .bearer_auth(&self.token)
            .json(payload)
            .send()
            .await?;

        let status = response.status();
        if status != StatusCode::OK {
            let body = response.text().await.unwrap_or_default();
            return Err(UploadError::Status {
                status: status.as_u16(),
                body: truncate_for_log(&body, 300),
            });
        }
        info!("Upload succeeded");
        Ok(())
    }
}

/// Publisher that only logs what would have been uploaded.
#[derive(Debug, Default)]
pub struct DryRun;

impl Publish for DryRun {
    async fn upload(&self, payload: &UploadPayload) -> Result<(), UploadError> {
        let json = serde_json::to_string_pretty(payload).unwrap_or_default();
        info!(
            slug = %payload.slug,
            menu = %payload.category,
            payload = %truncate_for_log(&json, 600),
            "Dry run; skipping upload"
        );
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{Article, Category};
    use crate::test_support::serve_once;
    use rand::SeedableRng;
    use rand::rngs::StdRng;
    use regex::Regex;
    use std::time::Duration;

    #[test]
    fn test_slug_format() {
        let mut rng = StdRng::seed_from_u64(3);
        let re = Regex::new(r"^auto-\d+-\d{3}$").unwrap();
        for _ in 0..200 {
            let slug = slug_now(&mut rng);
            assert!(re.is_match(&slug), "bad slug {slug}");
        }
    }

    #[test]
    fn test_slug_embeds_timestamp_and_suffix_range() {
        let mut rng = StdRng::seed_from_u64(9);
        let slug = make_slug(1_700_000_000, &mut rng);
        let suffix: u16 = slug
            .strip_prefix("auto-1700000000-")
            .unwrap()
            .parse()
            .unwrap();
        assert!((100..=999).contains(&suffix));
    }

    #[test]
    fn test_slugs_in_same_second_differ() {
        let mut rng = StdRng::seed_from_u64(11);
        let slugs: std::collections::HashSet<String> =
            (0..20).map(|_| make_slug(1_700_000_000, &mut rng)).collect();
        assert!(slugs.len() > 1);
    }

    #[test]
    fn test_upload_client_debug_redacts_token() {
        let client = UploadClient::new(&UploadConfig {
            url: "https://cms.example.com/api/upload".to_string(),
            token: "tok-secret".to_string(),
            timeout: Some(Duration::from_secs(5)),
        })
        .unwrap();
        assert!(!format!("{client:?}").contains("tok-secret"));
    }

    fn payload() -> UploadPayload {
        let article = Article {
            title: "标题".to_string(),
            content: "正文".to_string(),
            category: Category::Tech,
            keywords: "科技".to_string(),
            description: "简介".to_string(),
        };
        UploadPayload::new(&article, "auto-1-100".to_string())
    }

    fn upload_client(url: String) -> UploadClient {
        UploadClient::new(&UploadConfig {
            url,
            token: "tok".to_string(),
            timeout: Some(Duration::from_secs(5)),
        })
        .unwrap()
    }

    #[tokio::test]
    async fn test_dry_run_succeeds() {
        assert!(DryRun.upload(&payload()).await.is_ok());
    }

    #[tokio::test]
    async fn test_upload_ok_sends_bearer_and_json() {
        let (base, server) = serve_once(200, "{}").await;
        let client = upload_client(format!("{base}/api/upload"));

        client.upload(&payload()).await.unwrap();
        let request = server.await.unwrap();

        assert!(request.request_line.starts_with("POST /api/upload "));
        assert_eq!(request.header("authorization"), Some("Bearer tok"));
        let json = request.json();
        assert_eq!(json["title"], "标题");
        assert_eq!(json["content"], "正文");
        assert_eq!(json["menu"], "tech");
        assert_eq!(json["slug"], "auto-1-100");
        assert_eq!(json["keywords"], "科技");
        assert_eq!(json["description"], "简介");
    }

    #[tokio::test]
    async fn test_upload_only_200_is_success() {
        let (base, server) = serve_once(201, "{}").await;
        let err = upload_client(base).upload(&payload()).await.unwrap_err();
        server.await.unwrap();
        assert!(matches!(err, UploadError::Status { status: 201, .. }));
    }

    #[tokio::test]
    async fn test_upload_server_error() {
        let (base, server) = serve_once(500, r#"{"error":"db down"}"#).await;
        let err = upload_client(base).upload(&payload()).await.unwrap_err();
        server.await.unwrap();
        match err {
            UploadError::Status { status, body } => {
                assert_eq!(status, 500);
                assert!(body.contains("db down"));
            }
            other => panic!("unexpected error: {other}"),
        }
    }
}
