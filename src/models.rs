// src/models.rs
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Return code reported for results synthesized from a transport failure.
pub const TRANSPORT_FAILURE_CODE: i32 = 1;

/// One user intent to evaluate. Also the `POST /evaluate` request body.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Submission {
    pub code: String,
    pub language: String,
}

impl Submission {
    pub fn new(code: impl Into<String>, language: impl Into<String>) -> Self {
        Self {
            code: code.into(),
            language: language.into(),
        }
    }
}

/// Auxiliary output attached to an evaluation (assembly, disassembly, hexdump).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CodeOutput {
    #[serde(default)]
    pub language: Option<String>,
    pub content: String,
}

/// Body of a `POST /evaluate` response.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EvaluationResponse {
    #[serde(default)]
    pub stdout: String,
    #[serde(default)]
    pub stderr: String,
    pub return_code: i32,
    #[serde(default)]
    pub code_outputs: Vec<CodeOutput>,
}

impl EvaluationResponse {
    /// Response standing in for a request that never produced one.
    pub fn transport_failure(description: impl Into<String>) -> Self {
        Self {
            stdout: String::new(),
            stderr: description.into(),
            return_code: TRANSPORT_FAILURE_CODE,
            code_outputs: Vec::new(),
        }
    }
}

/// A result as delivered by the coordinator.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct EvaluationResult {
    pub stdout: String,
    pub stderr: String,
    pub return_code: i32,
    pub code_outputs: Vec<CodeOutput>,
    /// True iff no newer submission had been accepted when this result was processed.
    pub is_latest: bool,
    /// Sequence number of the submission this result answers.
    pub sequence: u64,
    pub submission: Submission,
    pub received_at: DateTime<Utc>,
    pub latency_ms: u64,
}

impl EvaluationResult {
    pub fn from_response(
        response: EvaluationResponse,
        submission: Submission,
        sequence: u64,
        is_latest: bool,
        latency_ms: u64,
    ) -> Self {
        Self {
            stdout: response.stdout,
            stderr: response.stderr,
            return_code: response.return_code,
            code_outputs: response.code_outputs,
            is_latest,
            sequence,
            submission,
            received_at: Utc::now(),
            latency_ms,
        }
    }

    pub fn succeeded(&self) -> bool {
        self.return_code == 0
    }
}
