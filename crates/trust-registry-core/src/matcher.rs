//! Fuzzy matching between artifact identifiers
//!
//! [`IdentifierMatcher::score`] compares a candidate artifact (its name and
//! optional source URL) with one identifier a model expects, returning a
//! similarity in [0,1]. Several weak signals are combined by maximum; the
//! caller applies the linking threshold.

use std::collections::HashSet;
use url::Url;

/// Default score at or above which a candidate is linked
pub const DEFAULT_MATCH_THRESHOLD: f64 = 0.75;

/// Hosts whose URLs are matched on their `org/repo` path
const HOSTED_CODE_HOSTS: [&str; 3] = ["github.com", "gitlab.com", "bitbucket.org"];

/// Weight applied to the containment ratio
const CONTAINMENT_FACTOR: f64 = 0.8;

/// Shortest string that earns a containment boost
const MIN_CONTAINED_LEN: usize = 3;

/// Stateless identifier matcher
#[derive(Debug, Clone, Copy, Default)]
pub struct IdentifierMatcher;

impl IdentifierMatcher {
    pub fn new() -> Self {
        Self
    }

    /// Similarity between a candidate and an expected identifier
    ///
    /// # Arguments
    ///
    /// * `candidate_name` - name of the artifact being ingested
    /// * `candidate_url` - its source URL, if any
    /// * `expected` - a dataset name, keyword or repository URL a model declared
    pub fn score(&self, candidate_name: &str, candidate_url: Option<&str>, expected: &str) -> f64 {
        if is_guaranteed_match(candidate_name, expected) {
            return 1.0;
        }

        if let Some(url) = candidate_url {
            if is_hosted_code_url(url) && is_hosted_code_url(expected) {
                if let (Some(candidate), Some(wanted)) = (repo_path(url), repo_path(expected)) {
                    return candidate.score(&wanted);
                }
            }
        }

        text_similarity(&normalize(candidate_name), &normalize(expected))
    }

    /// Best score of the candidate against any of the expected identifiers
    pub fn best_score<'a, I>(&self, candidate_name: &str, candidate_url: Option<&str>, expected: I) -> f64
    where
        I: IntoIterator<Item = &'a str>,
    {
        expected
            .into_iter()
            .map(|e| self.score(candidate_name, candidate_url, e))
            .fold(0.0, f64::max)
    }
}

/// Lower-case, strip surrounding punctuation, and collapse runs of
/// hyphens, underscores and whitespace into single spaces.
pub fn normalize(s: &str) -> String {
    let lowered = s.to_lowercase();
    let trimmed = lowered.trim_matches(|c: char| !c.is_alphanumeric());

    let mut out = String::with_capacity(trimmed.len());
    let mut pending_space = false;
    for c in trimmed.chars() {
        if c == '-' || c == '_' || c.is_whitespace() {
            pending_space = true;
            continue;
        }
        if pending_space && !out.is_empty() {
            out.push(' ');
        }
        pending_space = false;
        out.push(c);
    }
    out
}

/// Check whether a string is a repository URL on a known code host
///
/// The host must match exactly (a leading `www.` is allowed), so
/// `notgithub.com/org/repo` is not hosted code.
pub fn is_hosted_code_url(s: &str) -> bool {
    let Some(parsed) = parse_with_scheme(s) else {
        return false;
    };
    let Some(host) = parsed.host_str() else {
        return false;
    };
    let host = host.strip_prefix("www.").unwrap_or(host);
    let has_path = parsed
        .path_segments()
        .is_some_and(|mut segments| segments.any(|seg| !seg.is_empty()));
    has_path && HOSTED_CODE_HOSTS.iter().any(|known| host.eq_ignore_ascii_case(known))
}

/// Parse a URL, assuming `https://` when the scheme is missing
fn parse_with_scheme(s: &str) -> Option<Url> {
    let trimmed = s.trim();
    if trimmed.contains("://") {
        Url::parse(trimmed).ok()
    } else {
        Url::parse(&format!("https://{}", trimmed)).ok()
    }
}

fn is_guaranteed_match(candidate: &str, expected: &str) -> bool {
    let candidate_raw = candidate.trim().to_lowercase();
    let expected_raw = expected.trim().to_lowercase();
    if expected_raw.is_empty() {
        return false;
    }
    if candidate_raw == expected_raw {
        return true;
    }

    let expected_norm = normalize(expected);
    if !expected_norm.is_empty() && normalize(candidate) == expected_norm {
        return true;
    }

    candidate_raw.ends_with(&format!("-{}", expected_raw))
        || candidate_raw.ends_with(&format!("_{}", expected_raw))
}

#[derive(Debug, PartialEq, Eq)]
struct RepoPath {
    org: String,
    repo: String,
}

impl RepoPath {
    fn score(&self, expected: &RepoPath) -> f64 {
        if self == expected {
            return 1.0;
        }
        let org_overlap = overlaps(&self.org, &expected.org);
        let repo_overlap = overlaps(&self.repo, &expected.repo);
        if org_overlap && repo_overlap {
            1.0
        } else {
            0.0
        }
    }
}

fn overlaps(a: &str, b: &str) -> bool {
    a.contains(b) || b.contains(a)
}

fn repo_path(s: &str) -> Option<RepoPath> {
    let parsed = parse_with_scheme(s)?;
    let mut segments = parsed.path_segments()?.filter(|seg| !seg.is_empty());
    let org = segments.next()?.to_lowercase();
    let repo = segments.next()?.to_lowercase();
    let repo = repo.strip_suffix(".git").map(str::to_string).unwrap_or(repo);
    if org.is_empty() || repo.is_empty() {
        return None;
    }
    Some(RepoPath { org, repo })
}

fn text_similarity(candidate: &str, expected: &str) -> f64 {
    if candidate.is_empty() || expected.is_empty() {
        return 0.0;
    }
    if candidate == expected {
        return 1.0;
    }

    let jaccard = token_jaccard(candidate, expected);
    let ratio = strsim::normalized_levenshtein(candidate, expected);
    let containment = containment_boost(candidate, expected);

    jaccard.max(ratio).max(containment).clamp(0.0, 1.0)
}

fn token_jaccard(a: &str, b: &str) -> f64 {
    let left: HashSet<&str> = a.split_whitespace().collect();
    let right: HashSet<&str> = b.split_whitespace().collect();
    let union = left.union(&right).count();
    if union == 0 {
        return 0.0;
    }
    left.intersection(&right).count() as f64 / union as f64
}

fn containment_boost(a: &str, b: &str) -> f64 {
    let (short, long) = if a.chars().count() <= b.chars().count() {
        (a, b)
    } else {
        (b, a)
    };
    let short_len = short.chars().count();
    if short_len < MIN_CONTAINED_LEN || !long.contains(short) {
        return 0.0;
    }
    CONTAINMENT_FACTOR * short_len as f64 / long.chars().count() as f64
}
