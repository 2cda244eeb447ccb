//! The end-to-end run: fetch → filter → sample → generate → publish.
//!
//! Two articles are produced per run, one per [`Category`]. With a single
//! matching item both articles are generated from it. The publishes are
//! independent; a failure on the first never prevents the second.

use crate::api::Completion;
use crate::feed::FeedSource;
use crate::generate::generate_article;
use crate::models::{Category, NewsItem, UploadPayload};
use crate::publish::{Publish, slug_now};
use rand::Rng;
use rand::seq::IndexedRandom;
use std::fmt;
use tracing::{error, info, instrument, warn};

/// Result of trying to publish one category's article.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Outcome {
    Published { slug: String },
    Skipped { reason: String },
    Failed { reason: String },
}

impl fmt::Display for Outcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Outcome::Published { slug } => write!(f, "published as {slug}"),
            Outcome::Skipped { reason } => write!(f, "skipped: {reason}"),
            Outcome::Failed { reason } => write!(f, "failed: {reason}"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PublishOutcome {
    pub category: Category,
    /// Feed title the article was generated from.
    pub source_title: String,
    /// Title the article was published under.
    pub title: String,
    pub outcome: Outcome,
}

/// Summary of one run.
#[derive(Debug, Default)]
pub struct RunReport {
    pub fetched: usize,
    pub matched: usize,
    pub outcomes: Vec<PublishOutcome>,
}

impl RunReport {
    pub fn published(&self) -> usize {
        self.outcomes
            .iter()
            .filter(|o| matches!(o.outcome, Outcome::Published { .. }))
            .count()
    }
}

/// Keep items whose title or description contains any keyword.
///
/// Matching is a plain case-sensitive substring test. Input order is kept.
pub fn filter_by_keywords<S: AsRef<str>>(items: Vec<NewsItem>, keywords: &[S]) -> Vec<NewsItem> {
    let filtered: Vec<NewsItem> = items
        .into_iter()
        .filter(|item| {
            keywords.iter().any(|k| {
                let k = k.as_ref();
                item.title.contains(k) || item.description_text().contains(k)
            })
        })
        .collect();
    info!(count = filtered.len(), "Filtered news items by keyword");
    filtered
}

/// Pick the items for the tech and news articles.
///
/// Samples two distinct items without replacement; with only one item it is
/// used for both. Returns `None` when there is nothing to pick from.
pub fn pick_items<'a, R: Rng + ?Sized>(
    items: &'a [NewsItem],
    rng: &mut R,
) -> Option<(&'a NewsItem, &'a NewsItem)> {
    let picked: Vec<&NewsItem> = items.choose_multiple(rng, 2).collect();
    match picked.as_slice() {
        [first, second] => Some((*first, *second)),
        [only] => Some((*only, *only)),
        _ => None,
    }
}

/// Run the whole job once.
#[instrument(level = "info", skip_all)]
pub async fn run<F, C, P, R>(
    feed: &F,
    completion: &C,
    publisher: &P,
    keywords: &[String],
    rng: &mut R,
) -> RunReport
where
    F: FeedSource,
    C: Completion,
    P: Publish,
    R: Rng + ?Sized,
{
    let items = match feed.fetch().await {
        Ok(items) => items,
        Err(e) => {
            error!(error = %e, "RSS fetch failed");
            Vec::new()
        }
    };
    let mut report = RunReport {
        fetched: items.len(),
        ..RunReport::default()
    };

    let filtered = filter_by_keywords(items, keywords);
    report.matched = filtered.len();

    if filtered.len() < 2 {
        warn!(
            count = filtered.len(),
            "Fewer than 2 matching items; cannot use a distinct item per category"
        );
    }
    let Some((tech_item, news_item)) = pick_items(&filtered, rng) else {
        info!("No matching news items; nothing to publish");
        return report;
    };
    if filtered.len() == 1 {
        info!("Reusing the only matching item for the news article");
    }

    for (category, item) in [(Category::Tech, tech_item), (Category::News, news_item)] {
        let outcome = produce(completion, publisher, item, category, rng).await;
        report.outcomes.push(outcome);
    }
    report
}

async fn produce<C, P, R>(
    completion: &C,
    publisher: &P,
    item: &NewsItem,
    category: Category,
    rng: &mut R,
) -> PublishOutcome
where
    C: Completion,
    P: Publish,
    R: Rng + ?Sized,
{
    info!(%category, "=== Generating {category} article ===");
    let article = generate_article(completion, item, category, rng).await;

    let outcome = if article.content.is_empty() {
        warn!(%category, title = %article.title, "Generated content is empty; not uploading");
        Outcome::Skipped {
            reason: "empty content".to_string(),
        }
    } else {
        let payload = UploadPayload::new(&article, slug_now(rng));
        match publisher.upload(&payload).await {
            Ok(()) => Outcome::Published { slug: payload.slug },
            Err(e) => {
                error!(%category, slug = %payload.slug, error = %e, "Upload failed");
                Outcome::Failed {
                    reason: e.to_string(),
                }
            }
        }
    };

    PublishOutcome {
        category,
        source_title: item.title.clone(),
        title: article.title,
        outcome,
    }
}
