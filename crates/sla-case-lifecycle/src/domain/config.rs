//! Lifecycle configuration.

use shared_types::{Amount, DEFAULT_CASE_ID_PREFIX};
use std::env;

/// Decision comments are never allowed to be shorter than this.
pub const MIN_COMMENT_FLOOR: usize = 10;

/// Tunables for the case lifecycle.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LifecycleConfig {
    /// Prefix of generated case ids (`<prefix>-<year>-<6 digits>`).
    pub case_id_prefix: String,
    /// Minimum trimmed length of a checker's decision comments.
    pub min_comment_len: usize,
    /// Maximum trimmed length of a checker's decision comments.
    pub max_comment_len: usize,
    /// Largest accepted evidence file.
    pub max_file_size_bytes: u64,
    /// Evidence files a single case may carry.
    pub max_files_per_case: usize,
    /// MIME types accepted as evidence.
    pub allowed_content_types: Vec<String>,
    /// Largest single donation accepted.
    pub max_donation_amount: Amount,
    /// Cap on the number of cases returned by a review queue.
    pub review_queue_limit: usize,
}

impl Default for LifecycleConfig {
    fn default() -> Self {
        Self {
            case_id_prefix: DEFAULT_CASE_ID_PREFIX.to_string(),
            min_comment_len: 10,
            max_comment_len: 1000,
            max_file_size_bytes: 10 * 1024 * 1024, // 10 MiB
            max_files_per_case: 20,
            allowed_content_types: [
                "image/jpeg",
                "image/jpg",
                "image/png",
                "image/gif",
                "application/pdf",
                "application/msword",
                "application/vnd.openxmlformats-officedocument.wordprocessingml.document",
            ]
            .into_iter()
            .map(String::from)
            .collect(),
            max_donation_amount: 1_000_000,
            review_queue_limit: 50,
        }
    }
}

impl LifecycleConfig {
    /// Small limits that make boundary tests cheap.
    #[must_use]
    pub fn for_testing() -> Self {
        Self {
            max_file_size_bytes: 1024,
            max_files_per_case: 3,
            review_queue_limit: 10,
            ..Self::default()
        }
    }

    /// Reads `SLA_*` variables, falling back to defaults for anything unset
    /// or unparsable.
    ///
    /// - `SLA_CASE_ID_PREFIX`
    /// - `SLA_MIN_COMMENT_LEN`, `SLA_MAX_COMMENT_LEN`
    /// - `SLA_MAX_FILE_SIZE_BYTES`, `SLA_MAX_FILES_PER_CASE`
    /// - `SLA_ALLOWED_CONTENT_TYPES` (comma separated)
    /// - `SLA_MAX_DONATION_AMOUNT`
    /// - `SLA_REVIEW_QUEUE_LIMIT`
    pub fn from_env() -> Self {
        let defaults = Self::default();
        let (min_comment_len, max_comment_len) = comment_bounds(
            parse_var("SLA_MIN_COMMENT_LEN"),
            parse_var("SLA_MAX_COMMENT_LEN"),
            &defaults,
        );

        Self {
            case_id_prefix: env::var("SLA_CASE_ID_PREFIX")
                .ok()
                .filter(|p| !p.is_empty() && p.chars().all(|c| c.is_ascii_alphanumeric()))
                .unwrap_or(defaults.case_id_prefix),
            min_comment_len,
            max_comment_len,
            max_file_size_bytes: parse_var("SLA_MAX_FILE_SIZE_BYTES")
                .unwrap_or(defaults.max_file_size_bytes),
            max_files_per_case: parse_var("SLA_MAX_FILES_PER_CASE")
                .unwrap_or(defaults.max_files_per_case),
            allowed_content_types: env::var("SLA_ALLOWED_CONTENT_TYPES")
                .ok()
                .map(|v| {
                    v.split(',')
                        .map(|t| t.trim().to_ascii_lowercase())
                        .filter(|t| !t.is_empty())
                        .collect::<Vec<_>>()
                })
                .filter(|types| !types.is_empty())
                .unwrap_or(defaults.allowed_content_types),
            max_donation_amount: parse_var("SLA_MAX_DONATION_AMOUNT")
                .unwrap_or(defaults.max_donation_amount),
            review_queue_limit: parse_var("SLA_REVIEW_QUEUE_LIMIT")
                .unwrap_or(defaults.review_queue_limit),
        }
    }

    #[must_use]
    pub fn allows_content_type(&self, content_type: &str) -> bool {
        let wanted = content_type.trim().to_ascii_lowercase();
        self.allowed_content_types.iter().any(|t| *t == wanted)
    }
}

/// Both defaults unless `MIN_COMMENT_FLOOR <= min <= max`.
fn comment_bounds(
    min: Option<usize>,
    max: Option<usize>,
    defaults: &LifecycleConfig,
) -> (usize, usize) {
    let min = min.unwrap_or(defaults.min_comment_len);
    let max = max.unwrap_or(defaults.max_comment_len);
    if min < MIN_COMMENT_FLOOR || min > max {
        return (defaults.min_comment_len, defaults.max_comment_len);
    }
    (min, max)
}

fn parse_var<T: std::str::FromStr>(name: &str) -> Option<T> {
    env::var(name).ok().and_then(|v| v.trim().parse().ok())
}
