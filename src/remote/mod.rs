// src/remote/mod.rs

use crate::errors::Result;
use crate::models::{EvaluationResponse, Submission};

pub mod http;

pub use http::HttpEvaluator;

/// The remote evaluation service as seen by the coordinator.
///
/// `evaluate` must be safe to abandon: the coordinator drops the returned
/// future to cancel a request and may never look at its result.
pub trait RemoteEvaluator: Send + Sync + 'static {
    /// Evaluates one submission.
    ///
    /// # Returns
    /// The service's response, or an error for transport failures and
    /// malformed bodies.
    fn evaluate(&self, submission: &Submission) -> impl std::future::Future<Output = Result<EvaluationResponse>> + Send;

    /// Reads the last submission the service has seen, if any.
    fn fetch_last_submission(&self) -> impl std::future::Future<Output = Result<Option<Submission>>> + Send;
}

impl<T: RemoteEvaluator> RemoteEvaluator for std::sync::Arc<T> {
    fn evaluate(&self, submission: &Submission) -> impl std::future::Future<Output = Result<EvaluationResponse>> + Send {
        (**self).evaluate(submission)
    }

    fn fetch_last_submission(&self) -> impl std::future::Future<Output = Result<Option<Submission>>> + Send {
        (**self).fetch_last_submission()
    }
}
