//! Data models for feed items, generated articles and the upload wire record.
//!
//! - [`NewsItem`]: one `<item>` from the source RSS feed
//! - [`Article`]: a rewritten article ready to publish
//! - [`UploadPayload`]: an [`Article`] plus its slug, as sent to the upload API
//! - [`Category`]: the fixed set of site sections an article can land in

use serde::{Deserialize, Serialize};
use std::fmt;

/// A feed entry as read from `rss.channel.item`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewsItem {
    /// Headline of the entry.
    pub title: String,
    /// Optional summary or HTML teaser. `None` when the feed omitted it or
    /// embedded raw markup instead of text.
    pub description: Option<String>,
}

impl NewsItem {
    /// Description text, or `""` when the feed omitted it.
    pub fn description_text(&self) -> &str {
        self.description.as_deref().unwrap_or("")
    }
}

/// Site section an article is published under.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Category {
    Tech,
    News,
}

impl Category {
    pub fn as_str(&self) -> &'static str {
        match self {
            Category::Tech => "tech",
            Category::News => "news",
        }
    }
}

impl fmt::Display for Category {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A generated article.
///
/// `title` is never empty: when the model gives nothing usable the original
/// feed title is used instead. `content` may be empty if body generation
/// failed; the pipeline refuses to upload such articles.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Article {
    pub title: String,
    /// Markdown body.
    pub content: String,
    pub category: Category,
    /// Comma-separated keyword labels.
    pub keywords: String,
    /// One-line summary.
    pub description: String,
}

/// JSON body accepted by the upload endpoint.
#[derive(Debug, Clone, Serialize)]
pub struct UploadPayload {
    pub title: String,
    pub content: String,
    #[serde(rename = "menu")]
    pub category: Category,
    pub slug: String,
    pub keywords: String,
    pub description: String,
}

impl UploadPayload {
    pub fn new(article: &Article, slug: String) -> Self {
        Self {
            title: article.title.clone(),
            content: article.content.clone(),
            category: article.category,
            slug,
            keywords: article.keywords.clone(),
            description: article.description.clone(),
        }
    }
}
