//! Command-line interface definitions.
//!
//! Every option is backed by an environment variable, so the job runs from a
//! scheduler with no arguments at all. Secrets are taken as `Option` and
//! checked in [`crate::config::Config::from_cli`] so that a blank variable is
//! rejected the same way as an unset one.

use clap::Parser;

pub const DEFAULT_RSS_URL: &str = "https://rss.mydrivers.com/Rss.aspx?Tid=1";
pub const DEFAULT_UPLOAD_API_URL: &str = "https://ongwu-site.vercel.app/api/upload";

/// Command-line arguments for the auto-posting job.
///
/// # Examples
///
/// ```sh
/// # Typical scheduled run, everything from the environment
/// MEITUAN_API_KEY=... UPLOAD_API_TOKEN=... autopost_news
///
/// # Generate without uploading, with a settings override file
/// autopost_news --dry-run -c ./autopost.yaml
/// ```
#[derive(Parser, Debug)]
#[command(author, version, about)]
pub struct Cli {
    /// RSS feed to pull news items from
    #[arg(long, env = "RSS_URL", default_value = DEFAULT_RSS_URL)]
    pub rss_url: String,

    /// Bearer token for the chat-completion API
    #[arg(long, env = "MEITUAN_API_KEY", hide_env_values = true)]
    pub meituan_api_key: Option<String>,

    /// Endpoint receiving generated articles
    #[arg(long, env = "UPLOAD_API_URL", default_value = DEFAULT_UPLOAD_API_URL)]
    pub upload_api_url: String,

    /// Bearer token for the upload endpoint
    #[arg(long, env = "UPLOAD_API_TOKEN", hide_env_values = true)]
    pub upload_api_token: Option<String>,

    /// Optional path to a YAML settings file overriding keywords and API tunables
    #[arg(short, long, env = "AUTOPOST_CONFIG")]
    pub config: Option<String>,

    /// Generate articles but log the upload payload instead of posting it
    #[arg(long, env = "AUTOPOST_DRY_RUN")]
    pub dry_run: bool,
}
