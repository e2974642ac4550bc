use crate::route::SanitationIssue;
use serde::Serialize;

#[derive(Clone, Debug, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BatchFailure {
    pub batch_index: usize,
    pub message: String,
}

/// What happened during one route build, for operators.
#[derive(Clone, Debug, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BuildDiagnostics {
    pub source: String,
    pub started_at: i64,
    pub took_ms: u64,
    pub batches_attempted: usize,
    pub batches_succeeded: usize,
    pub point_count: usize,
    pub sanitation: Vec<SanitationIssue>,
    pub failures: Vec<BatchFailure>,
}

impl BuildDiagnostics {
    pub fn new(source: &str, started_at: i64) -> Self {
        BuildDiagnostics {
            source: source.to_string(),
            started_at,
            took_ms: 0,
            batches_attempted: 0,
            batches_succeeded: 0,
            point_count: 0,
            sanitation: Vec::new(),
            failures: Vec::new(),
        }
    }
}
