//! Test fixtures
//!
//! Metadata for the artifacts the integration scenarios ingest.

use trust_registry_core::{ArtifactMetadata, DependencyExpectation, ExpectedCode, ExpectedDataset};

/// A model expecting the SQuAD dataset and its training repository
pub fn squad_model(name: &str) -> ArtifactMetadata {
    ArtifactMetadata::builder(format!("org/{}", name), name)
        .license("apache-2.0")
        .readme(format!(
            "# {}\n\nFine-tuned on SQuAD for extractive question answering.\n\n\
             Training code: https://github.com/org/qa-trainer",
            name
        ))
        .build_unchecked()
}

/// A model with explicit expectations, bypassing extraction
pub fn model_expecting(name: &str, datasets: &[&str], code: &[&str]) -> ArtifactMetadata {
    let expectation = DependencyExpectation {
        training_datasets: datasets.iter().map(|d| ExpectedDataset::new(*d)).collect(),
        eval_datasets: Vec::new(),
        code_repositories: code.iter().map(|c| ExpectedCode::new(*c)).collect(),
    };
    ArtifactMetadata::builder(format!("org/{}", name), name)
        .expected_dependencies(expectation)
        .build_unchecked()
}

pub fn dataset(name: &str) -> ArtifactMetadata {
    ArtifactMetadata::new(name, name)
}

/// A code repository whose README names the datasets it trains on
pub fn code_repo(name: &str, readme: &str) -> ArtifactMetadata {
    ArtifactMetadata::builder(format!("org/{}", name), name)
        .source_url(format!("https://github.com/org/{}", name))
        .readme(readme)
        .build_unchecked()
}
