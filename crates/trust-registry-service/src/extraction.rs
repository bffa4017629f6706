//! Text extraction of dependency and lineage hints
//!
//! The [`HintExtractor`] trait is the seam for the text-extraction
//! collaborator: given a README it returns the datasets and code
//! repositories the text mentions. The resolver treats it as best effort,
//! see [`extract_or_empty`]. [`RuleBasedExtractor`] is the default
//! implementation.
//!
//! Lineage hints are read from the configuration blob and README front
//! matter by [`parent_references`], which needs no collaborator.

use async_trait::async_trait;
use regex::Regex;
use serde_json::Value;
use std::collections::HashSet;
use tracing::warn;
use trust_registry_core::{DependencyExpectation, ExpectedCode, ExpectedDataset, RelationshipType};

use crate::error::{ServiceError, ServiceResult};

/// Words that follow "trained on" without naming a dataset
const STOPWORDS: &[&str] = &[
    "a", "an", "and", "the", "our", "this", "these", "those", "it", "them", "which", "large",
    "several", "multiple", "various", "many", "top", "data", "dataset", "datasets", "custom",
    "private", "internal", "public", "proprietary", "english", "text", "over", "about", "more",
    "millions", "billions",
];

/// Extracts dataset and code mentions from README text
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait HintExtractor: Send + Sync {
    /// Extract expected datasets and code repositories
    ///
    /// # Returns
    /// * `Ok(DependencyExpectation)` - Possibly empty hints
    /// * `Err(ServiceError::Extraction)` - The collaborator failed
    async fn extract(&self, readme: &str) -> ServiceResult<DependencyExpectation>;
}

/// Run an extractor, degrading any failure to an empty hint set
pub async fn extract_or_empty(extractor: &dyn HintExtractor, readme: &str) -> DependencyExpectation {
    if readme.trim().is_empty() {
        return DependencyExpectation::default();
    }
    match extractor.extract(readme).await {
        Ok(hints) => sanitize(hints),
        Err(e) => {
            warn!(error = %e, "Hint extraction failed, continuing without hints");
            DependencyExpectation::default()
        }
    }
}

/// Drop blank names and URLs a collaborator may have returned
fn sanitize(mut hints: DependencyExpectation) -> DependencyExpectation {
    hints.training_datasets.retain(|d| !d.name.trim().is_empty());
    hints.eval_datasets.retain(|d| !d.name.trim().is_empty());
    hints.code_repositories.retain(|c| !c.url.trim().is_empty());
    hints
}

/// Regex-driven [`HintExtractor`]
#[derive(Debug, Clone)]
pub struct RuleBasedExtractor {
    trained_on: Regex,
    evaluated_on: Regex,
    dataset_link: Regex,
    code_url: Regex,
}

impl RuleBasedExtractor {
    /// Compile the extraction patterns
    pub fn new() -> ServiceResult<Self> {
        Ok(Self {
            trained_on: compile(
                r"(?i)\b(?:trained|fine-?tuned|pre-?trained)\s+on\s+(?:the\s+)?([A-Za-z0-9][\w./-]*)",
            )?,
            evaluated_on: compile(
                r"(?i)\b(?:evaluated|benchmarked|tested)\s+on\s+(?:the\s+)?([A-Za-z0-9][\w./-]*)",
            )?,
            dataset_link: compile(r"(?i)huggingface\.co/datasets/([\w.-]+(?:/[\w.-]+)?)")?,
            code_url: compile(
                r"(?i)https?://(?:www\.)?(?:github\.com|gitlab\.com|bitbucket\.org)/[\w.-]+/[\w.-]+",
            )?,
        })
    }

    /// Synchronous extraction used by the trait implementation
    pub fn extract_sync(&self, readme: &str) -> DependencyExpectation {
        let mut seen = HashSet::new();
        let mut training = Vec::new();
        let mut eval = Vec::new();

        for name in front_matter_values(readme, "datasets") {
            push_dataset(&mut training, &mut seen, &name);
        }
        for caps in self.dataset_link.captures_iter(readme) {
            push_dataset(&mut training, &mut seen, &caps[1]);
        }
        for caps in self.trained_on.captures_iter(readme) {
            push_dataset(&mut training, &mut seen, &caps[1]);
        }
        for caps in self.evaluated_on.captures_iter(readme) {
            push_dataset(&mut eval, &mut seen, &caps[1]);
        }

        let mut code = Vec::new();
        let mut seen_urls = HashSet::new();
        for m in self.code_url.find_iter(readme) {
            let url = clean_url(m.as_str());
            if !seen_urls.insert(url.to_lowercase()) {
                continue;
            }
            let repo = url.rsplit('/').next().unwrap_or_default().to_string();
            let mut expected = ExpectedCode::new(url.clone());
            if !repo.is_empty() {
                expected = expected.keyword(repo);
            }
            code.push(expected);
        }

        DependencyExpectation {
            training_datasets: training,
            eval_datasets: eval,
            code_repositories: code,
        }
    }
}

#[async_trait]
impl HintExtractor for RuleBasedExtractor {
    async fn extract(&self, readme: &str) -> ServiceResult<DependencyExpectation> {
        Ok(self.extract_sync(readme))
    }
}

fn compile(pattern: &str) -> ServiceResult<Regex> {
    Regex::new(pattern).map_err(|e| ServiceError::Extraction(format!("bad pattern: {}", e)))
}

fn push_dataset(into: &mut Vec<ExpectedDataset>, seen: &mut HashSet<String>, raw: &str) {
    let name = raw.trim().trim_end_matches(|c: char| matches!(c, '.' | ',' | '/' | ':' | ';'));
    if name.is_empty() || STOPWORDS.contains(&name.to_lowercase().as_str()) {
        return;
    }
    if !seen.insert(name.to_lowercase()) {
        return;
    }

    let mut dataset = ExpectedDataset::new(name);
    if let Some((_, short)) = name.rsplit_once('/') {
        if !short.is_empty() {
            dataset = dataset.keyword(short);
        }
    }
    into.push(dataset);
}

fn clean_url(raw: &str) -> String {
    let trimmed = raw.trim_end_matches(|c: char| matches!(c, '.' | ',' | ')' | ';' | ':'));
    trimmed.strip_suffix(".git").unwrap_or(trimmed).to_string()
}

/// Values of a key in a README's YAML front matter.
///
/// Handles `key: value`, `key: [a, b]` and block lists of `- item` lines.
pub fn front_matter_values(readme: &str, key: &str) -> Vec<String> {
    let mut lines = readme.trim_start().lines();
    if lines.next().map(str::trim) != Some("---") {
        return Vec::new();
    }

    let block: Vec<&str> = lines.take_while(|l| l.trim() != "---").collect();
    let prefix = format!("{}:", key);
    let mut values = Vec::new();

    let mut iter = block.iter().peekable();
    while let Some(line) = iter.next() {
        let Some(rest) = line.trim_start().strip_prefix(&prefix) else {
            continue;
        };
        // Only top-level keys
        if line.starts_with(char::is_whitespace) {
            continue;
        }
        let rest = rest.trim();
        if rest.starts_with('[') {
            values.extend(
                rest.trim_matches(|c| c == '[' || c == ']')
                    .split(',')
                    .map(unquote)
                    .filter(|v| !v.is_empty()),
            );
        } else if !rest.is_empty() {
            values.push(unquote(rest));
        } else {
            while let Some(next) = iter.peek() {
                let Some(item) = next.trim_start().strip_prefix("- ") else {
                    break;
                };
                values.push(unquote(item));
                iter.next();
            }
        }
    }
    values.retain(|v| !v.is_empty());
    values
}

fn unquote(s: &str) -> String {
    s.trim().trim_matches(|c| c == '"' || c == '\'').trim().to_string()
}

/// A parent model named by configuration or front matter
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParentReference {
    pub name: String,
    pub relationship: RelationshipType,
    /// Where the reference was found, e.g. `config.base_model`
    pub source: String,
}

/// Parent references carried by a model's configuration blob and README
pub fn parent_references(config: &Value, readme: &str) -> Vec<ParentReference> {
    let mut refs: Vec<ParentReference> = Vec::new();
    let mut push = |name: String, relationship: RelationshipType, source: String| {
        let name = name.trim().to_string();
        if name.is_empty() || name.starts_with('.') || name.starts_with('/') {
            return;
        }
        let duplicate = refs
            .iter()
            .any(|r| r.relationship == relationship && r.name.eq_ignore_ascii_case(&name));
        if !duplicate {
            refs.push(ParentReference {
                name,
                relationship,
                source,
            });
        }
    };

    let peft_label = config
        .get("peft_type")
        .and_then(Value::as_str)
        .map(|s| RelationshipType::Adapter(s.trim().to_lowercase()));

    let keys: [(&str, RelationshipType); 6] = [
        ("base_model", RelationshipType::BaseModel),
        (
            "base_model_name_or_path",
            peft_label.clone().unwrap_or(RelationshipType::BaseModel),
        ),
        ("parent_model", RelationshipType::DerivedFrom),
        ("derived_from", RelationshipType::DerivedFrom),
        ("fine_tuned_from", RelationshipType::FineTunedFrom),
        ("teacher_model", RelationshipType::TeacherModel),
    ];

    for (key, relationship) in keys {
        for name in string_values(config.get(key)) {
            push(name, relationship.clone(), format!("config.{}", key));
        }
    }

    for name in string_values(config.get("_name_or_path")) {
        push(name, RelationshipType::BaseModel, "config._name_or_path".to_string());
    }

    for name in front_matter_values(readme, "base_model") {
        push(name, RelationshipType::BaseModel, "readme.base_model".to_string());
    }

    refs
}

fn string_values(value: Option<&Value>) -> Vec<String> {
    match value {
        Some(Value::String(s)) => vec![s.clone()],
        Some(Value::Array(items)) => items
            .iter()
            .filter_map(Value::as_str)
            .map(str::to_string)
            .collect(),
        _ => Vec::new(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn extractor() -> RuleBasedExtractor {
        RuleBasedExtractor::new().unwrap()
    }

    #[test]
    fn test_trained_on_phrases() {
        let hints = extractor().extract_sync(
            "This model was fine-tuned on SQuAD. It was evaluated on the GLUE benchmark.",
        );
        let training: Vec<&str> = hints.training_datasets.iter().map(|d| d.name.as_str()).collect();
        let eval: Vec<&str> = hints.eval_datasets.iter().map(|d| d.name.as_str()).collect();
        assert_eq!(training, vec!["SQuAD"]);
        assert_eq!(eval, vec!["GLUE"]);
    }

    #[test]
    fn test_stopwords_are_skipped() {
        let hints = extractor().extract_sync("Trained on a large corpus. Pretrained on data.");
        assert!(hints.training_datasets.is_empty());
    }

    #[test]
    fn test_dataset_links_get_short_keyword() {
        let hints = extractor()
            .extract_sync("See https://huggingface.co/datasets/rajpurkar/squad for details.");
        assert_eq!(hints.training_datasets.len(), 1);
        assert_eq!(hints.training_datasets[0].name, "rajpurkar/squad");
        assert_eq!(hints.training_datasets[0].keywords, vec!["squad"]);
    }

    #[test]
    fn test_front_matter_datasets() {
        let readme = "---\nlicense: mit\ndatasets:\n  - imdb\n  - 'yelp_review_full'\ntags: [a]\n---\n# Model";
        let hints = extractor().extract_sync(readme);
        let names: Vec<&str> = hints.training_datasets.iter().map(|d| d.name.as_str()).collect();
        assert_eq!(names, vec!["imdb", "yelp_review_full"]);
    }

    #[test]
    fn test_inline_front_matter_list() {
        let readme = "---\ndatasets: [\"c4\", wikipedia]\n---\n";
        assert_eq!(front_matter_values(readme, "datasets"), vec!["c4", "wikipedia"]);
        assert!(front_matter_values("no front matter", "datasets").is_empty());
    }

    #[test]
    fn test_code_urls() {
        let hints = extractor().extract_sync(
            "Code: https://github.com/google-research/bert.git (and again https://github.com/google-research/bert).",
        );
        assert_eq!(hints.code_repositories.len(), 1);
        assert_eq!(
            hints.code_repositories[0].url,
            "https://github.com/google-research/bert"
        );
        assert_eq!(hints.code_repositories[0].keywords, vec!["bert"]);
    }

    #[test]
    fn test_parent_references_from_config() {
        let config = json!({
            "base_model": "meta-llama/Llama-2-7b",
            "teacher_model": ["bert-large", "bert-large"],
            "_name_or_path": "./checkpoints/run1",
        });
        let refs = parent_references(&config, "");
        assert_eq!(refs.len(), 2);
        assert_eq!(refs[0].name, "meta-llama/Llama-2-7b");
        assert_eq!(refs[0].relationship, RelationshipType::BaseModel);
        assert_eq!(refs[1].relationship, RelationshipType::TeacherModel);
        assert_eq!(refs[1].source, "config.teacher_model");
    }

    #[test]
    fn test_peft_adapter_label() {
        let config = json!({
            "peft_type": "LORA",
            "base_model_name_or_path": "mistralai/Mistral-7B-v0.1",
        });
        let refs = parent_references(&config, "");
        assert_eq!(refs.len(), 1);
        assert_eq!(refs[0].relationship, RelationshipType::Adapter("lora".into()));
    }

    #[test]
    fn test_front_matter_base_model() {
        let readme = "---\nbase_model: distilbert-base-uncased\n---\n";
        let refs = parent_references(&Value::Null, readme);
        assert_eq!(refs.len(), 1);
        assert_eq!(refs[0].source, "readme.base_model");
    }

    #[tokio::test]
    async fn test_extract_or_empty_degrades_on_failure() {
        let mut mock = MockHintExtractor::new();
        mock.expect_extract()
            .returning(|_| Err(ServiceError::Extraction("unreachable".into())));
        let hints = extract_or_empty(&mock, "Trained on SQuAD").await;
        assert!(hints.is_empty());
    }

    #[tokio::test]
    async fn test_extract_or_empty_sanitizes() {
        let mut mock = MockHintExtractor::new();
        mock.expect_extract().returning(|_| {
            Ok(DependencyExpectation {
                training_datasets: vec![ExpectedDataset::new(" "), ExpectedDataset::new("c4")],
                ..Default::default()
            })
        });
        let hints = extract_or_empty(&mock, "anything").await;
        assert_eq!(hints.training_datasets.len(), 1);
    }

    #[tokio::test]
    async fn test_extract_or_empty_skips_blank_readme() {
        let mut mock = MockHintExtractor::new();
        mock.expect_extract().never();
        assert!(extract_or_empty(&mock, "   ").await.is_empty());
    }
}
