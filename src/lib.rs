// src/lib.rs
pub mod banner;
pub mod config;
pub mod coordinator;
pub mod errors;
pub mod language;
pub mod models;
pub mod output;
pub mod remote;

pub use coordinator::{Coordinator, Ticket};
pub use errors::{EvalError, Result};
pub use models::{CodeOutput, EvaluationResponse, EvaluationResult, Submission};
pub use remote::{HttpEvaluator, RemoteEvaluator};
