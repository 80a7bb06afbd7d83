// tests/common/mod.rs
#![allow(dead_code)]

use std::collections::{HashMap, HashSet};
use std::sync::{Arc, Mutex};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use tokio::sync::Notify;

use liveeval::errors::{EvalError, Result};
use liveeval::models::{CodeOutput, EvaluationResponse, Submission};
use liveeval::remote::RemoteEvaluator;

/// In-memory evaluator with scripted latency and failures.
///
/// Counts concurrent `evaluate` calls; a call stops counting when its future
/// completes or is dropped.
pub struct ScriptedEvaluator {
    latency: Duration,
    slow: Mutex<HashMap<String, Duration>>,
    failing: Mutex<HashSet<String>>,
    panicking: HashSet<String>,
    gates: Mutex<HashMap<String, Arc<Notify>>>,
    last: Mutex<Option<Submission>>,
    calls: Mutex<Vec<Submission>>,
    outstanding: AtomicUsize,
    peak: AtomicUsize,
    completed: AtomicUsize,
    last_code_reads: AtomicUsize,
    last_code_fails: bool,
}

struct Outstanding<'a>(&'a AtomicUsize);

impl Drop for Outstanding<'_> {
    fn drop(&mut self) {
        self.0.fetch_sub(1, Ordering::SeqCst);
    }
}

impl ScriptedEvaluator {
    pub fn new(latency: Duration) -> Self {
        Self {
            latency,
            slow: Mutex::new(HashMap::new()),
            failing: Mutex::new(HashSet::new()),
            panicking: HashSet::new(),
            gates: Mutex::new(HashMap::new()),
            last: Mutex::new(None),
            calls: Mutex::new(Vec::new()),
            outstanding: AtomicUsize::new(0),
            peak: AtomicUsize::new(0),
            completed: AtomicUsize::new(0),
            last_code_reads: AtomicUsize::new(0),
            last_code_fails: false,
        }
    }

    pub fn with_last(self, submission: Submission) -> Self {
        *self.last.lock().unwrap() = Some(submission);
        self
    }

    pub fn with_broken_last_code(mut self) -> Self {
        self.last_code_fails = true;
        self
    }

    pub fn slow(self, code: &str, latency: Duration) -> Self {
        self.slow.lock().unwrap().insert(code.to_string(), latency);
        self
    }

    pub fn failing(self, code: &str) -> Self {
        self.failing.lock().unwrap().insert(code.to_string());
        self
    }

    /// Panics inside `evaluate` for this code.
    pub fn panicking(mut self, code: &str) -> Self {
        self.panicking.insert(code.to_string());
        self
    }

    /// Holds `evaluate` for this code until `gate` is notified, instead of sleeping.
    pub fn gated(self, code: &str, gate: Arc<Notify>) -> Self {
        self.gates.lock().unwrap().insert(code.to_string(), gate);
        self
    }

    pub fn calls(&self) -> Vec<String> {
        self.calls.lock().unwrap().iter().map(|s| s.code.clone()).collect()
    }

    pub fn peak(&self) -> usize {
        self.peak.load(Ordering::SeqCst)
    }

    pub fn outstanding(&self) -> usize {
        self.outstanding.load(Ordering::SeqCst)
    }

    pub fn completed(&self) -> usize {
        self.completed.load(Ordering::SeqCst)
    }

    pub fn last_code_reads(&self) -> usize {
        self.last_code_reads.load(Ordering::SeqCst)
    }
}

impl RemoteEvaluator for ScriptedEvaluator {
    async fn evaluate(&self, submission: &Submission) -> Result<EvaluationResponse> {
        self.calls.lock().unwrap().push(submission.clone());
        let now = self.outstanding.fetch_add(1, Ordering::SeqCst) + 1;
        self.peak.fetch_max(now, Ordering::SeqCst);
        let _guard = Outstanding(&self.outstanding);

        if self.panicking.contains(&submission.code) {
            panic!("evaluator blew up on {:?}", submission.code);
        }

        let gate = self.gates.lock().unwrap().get(&submission.code).cloned();
        if let Some(gate) = gate {
            gate.notified().await;
            self.completed.fetch_add(1, Ordering::SeqCst);
            return Ok(EvaluationResponse {
                stdout: format!("{}\n", submission.code),
                stderr: String::new(),
                return_code: 0,
                code_outputs: Vec::new(),
            });
        }

        let latency = self
            .slow
            .lock()
            .unwrap()
            .get(&submission.code)
            .copied()
            .unwrap_or(self.latency);
        tokio::time::sleep(latency).await;
        self.completed.fetch_add(1, Ordering::SeqCst);

        if self.failing.lock().unwrap().contains(&submission.code) {
            return Err(EvalError::ApiError {
                status: 503,
                body: "service unavailable".to_string(),
            });
        }

        Ok(EvaluationResponse {
            stdout: format!("{}\n", submission.code),
            stderr: String::new(),
            return_code: 0,
            code_outputs: vec![CodeOutput {
                language: Some("asm-intel".to_string()),
                content: format!("; {}", submission.language),
            }],
        })
    }

    async fn fetch_last_submission(&self) -> Result<Option<Submission>> {
        self.last_code_reads.fetch_add(1, Ordering::SeqCst);
        if self.last_code_fails {
            return Err(EvalError::UnexpectedResponse("not json".to_string()));
        }
        Ok(self.last.lock().unwrap().clone())
    }
}
