//! Two-phase article generation.
//!
//! 1. **Title phase**: ask for three alternative headlines, clean them up and
//!    pick one at random. Falls back to the feed title when nothing usable
//!    comes back.
//! 2. **Body phase**: ask for a long-form Markdown article about the chosen
//!    headline, then strip any code fences the model wrapped it in.

use crate::api::{Completion, complete_logged};
use crate::models::{Article, Category, NewsItem};
use once_cell::sync::Lazy;
use rand::Rng;
use rand::seq::IndexedRandom;
use regex::Regex;
use tracing::{info, instrument, warn};

/// Keyword labels attached to every generated article.
pub const ARTICLE_KEYWORDS: &str = "科技,AI,自动生成";

const MAX_TITLES: usize = 3;

/// Characters stripped from both ends of a candidate title.
const QUOTES: &[char] = &['"', '\'', '“', '”', '‘', '’', '「', '」', '『', '』'];

/// Leading list marker such as `1. `, `2、`, `3）`.
static LIST_MARKER: Lazy<Regex> = Lazy::new(|| Regex::new(r"^\d+[.、．)）\s]+").unwrap());

/// Prompt asking for three alternative headlines for `original_title`.
///
/// The model is told to answer one title per line with no numbering and no
/// quotes; [`clean_titles`] still copes when it ignores that.
///
/// # Arguments
///
/// * `original_title` - Headline of the source feed item
///
/// # Returns
///
/// The prompt text, with the headline embedded in Chinese quotes.
pub fn title_prompt(original_title: &str) -> String {
    format!(
        "请根据原新闻标题“{original_title}”，生成3个吸引人的、科技感强的文章标题。要求：\n1. 严禁使用数字序号（如1. 2. 3.）\n2. 严禁使用引号\n3. 每行一个标题，只返回标题文本"
    )
}

/// Prompt asking for the long-form Markdown article.
///
/// # Arguments
///
/// * `selected_title` - Headline chosen in the title phase
/// * `original_title` - Headline of the source feed item
///
/// # Returns
///
/// A prompt for a ~2000 character in-depth piece in the "ongwu" voice,
/// formatted as Markdown and without images.
pub fn body_prompt(selected_title: &str, original_title: &str) -> String {
    format!(
        "请以 'ongwu' 的口吻，根据标题“{selected_title}”和原新闻“{original_title}”，写一篇2000字左右的深度科技文章。风格要专业、客观且有见地。使用 Markdown 格式。正文中不要包含图片。"
    )
}

/// Turn the model's raw title reply into at most three clean candidates.
pub fn clean_titles(raw: &str) -> Vec<String> {
    raw.lines()
        .map(|line| {
            let line = LIST_MARKER.replace(line.trim(), "");
            line.trim_matches(QUOTES).trim().to_string()
        })
        .filter(|line| !line.is_empty())
        .take(MAX_TITLES)
        .collect()
}

/// Remove Markdown code fences wrapped around the body and trim it.
pub fn clean_body(raw: &str) -> String {
    raw.replace("```markdown", "")
        .replace("```", "")
        .trim()
        .to_string()
}

/// Pick one candidate uniformly at random, or the original title if there
/// are none.
pub fn choose_title<R: Rng + ?Sized>(
    candidates: &[String],
    original_title: &str,
    rng: &mut R,
) -> String {
    candidates
        .choose(rng)
        .cloned()
        .unwrap_or_else(|| original_title.to_string())
}

/// Generate an [`Article`] for `item` under `category`.
///
/// Completion failures never abort generation: a failed title phase uses the
/// feed title, a failed body phase leaves `content` empty.
#[instrument(level = "info", skip_all, fields(%category, original = %item.title))]
pub async fn generate_article<C, R>(
    client: &C,
    item: &NewsItem,
    category: Category,
    rng: &mut R,
) -> Article
where
    C: Completion,
    R: Rng + ?Sized,
{
    let original_title = item.title.as_str();
    info!("Generating article");

    let candidates = match complete_logged(client, "titles", &title_prompt(original_title)).await {
        Ok(raw) => clean_titles(&raw),
        Err(_) => Vec::new(),
    };
    if candidates.is_empty() {
        warn!("No usable titles generated; falling back to the feed title");
    }
    let title = choose_title(&candidates, original_title, rng);
    info!(%title, candidates = candidates.len(), "Selected title");

    let content = match complete_logged(client, "body", &body_prompt(&title, original_title)).await {
        Ok(raw) => clean_body(&raw),
        Err(_) => String::new(),
    };

    Article {
        title,
        content,
        category,
        keywords: ARTICLE_KEYWORDS.to_string(),
        description: format!("关于 {original_title} 的深度解读"),
    }
}
