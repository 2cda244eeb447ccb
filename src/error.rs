//! Error types for each external collaborator.
//!
//! Every network call in the pipeline returns one of these instead of
//! swallowing its failure, so the orchestrator decides whether a failed step
//! degrades the run or ends it.

use thiserror::Error;

/// Startup configuration problems. These are the only fatal errors.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("missing required environment variable {0}")]
    MissingVar(&'static str),

    #[error("invalid URL for {name}: {source}")]
    InvalidUrl {
        name: &'static str,
        #[source]
        source: url::ParseError,
    },

    #[error("failed to read settings file {path}: {source}")]
    ReadSettings {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse settings file {path}: {source}")]
    ParseSettings {
        path: String,
        #[source]
        source: serde_yaml::Error,
    },

    #[error("failed to build HTTP client: {0}")]
    HttpClient(#[from] reqwest::Error),
}

/// Failures while retrieving or parsing the RSS feed.
#[derive(Debug, Error)]
pub enum FeedError {
    #[error("feed request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("feed returned HTTP {0}")]
    Status(u16),

    #[error("feed XML could not be parsed: {0}")]
    Parse(#[from] quick_xml::de::DeError),
}

/// Failures from the chat-completion API.
#[derive(Debug, Error)]
pub enum CompletionError {
    #[error("completion request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("completion API returned HTTP {status}: {body}")]
    Status { status: u16, body: String },

    #[error("completion response had an unexpected shape: {0}")]
    Shape(String),
}

/// Failures from the upload API.
#[derive(Debug, Error)]
pub enum UploadError {
    #[error("upload request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("upload API returned HTTP {status}: {body}")]
    Status { status: u16, body: String },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_missing_var_message_names_variable() {
        let err = ConfigError::MissingVar("MEITUAN_API_KEY");
        assert_eq!(
            err.to_string(),
            "missing required environment variable MEITUAN_API_KEY"
        );
    }

    #[test]
    fn test_status_errors_include_body() {
        let err = UploadError::Status {
            status: 500,
            body: "boom".to_string(),
        };
        assert_eq!(err.to_string(), "upload API returned HTTP 500: boom");

        let err = CompletionError::Status {
            status: 429,
            body: "slow down".to_string(),
        };
        assert!(err.to_string().contains("429"));
    }
}
