// src/coordinator.rs
//! Coalescing front end for the remote evaluator.
//!
//! Every edit produces a submission, but at most one `evaluate` call is ever
//! outstanding. While a request is in flight, newer submissions overwrite a
//! single pending slot; when the in-flight request concludes the pending one
//! is dispatched immediately. Only the result of the submission that is still
//! current when its response is processed gets delivered.
//!
//! The state lives in a driver task. [`Coordinator`] handles talk to it over
//! a channel, and the sequence counter sits behind one mutex so that
//! numbering and enqueueing happen together.

use std::future::Future;
use std::panic::AssertUnwindSafe;
use std::pin::Pin;
use std::sync::{Arc, Mutex, MutexGuard};
use std::task::{Context, Poll};
use std::time::Instant;

use futures::FutureExt;
use tokio::sync::{mpsc, oneshot, watch};
use tokio_util::sync::CancellationToken;

use crate::config::{CoordinatorConfig, SupersedePolicy};
use crate::errors::{EvalError, Result};
use crate::models::{EvaluationResponse, EvaluationResult, Submission};
use crate::remote::RemoteEvaluator;

type Reply = oneshot::Sender<Option<EvaluationResult>>;

/// Deferred result of one [`Coordinator::submit`] call.
///
/// Resolves to `Some` only for the submission whose result was delivered as
/// the latest one; superseded or cancelled submissions resolve to `None`.
pub struct Ticket {
    sequence: u64,
    rx: Option<oneshot::Receiver<Option<EvaluationResult>>>,
}

impl Ticket {
    /// Sequence number assigned to the submission.
    pub fn sequence(&self) -> u64 {
        self.sequence
    }
}

impl Future for Ticket {
    type Output = Option<EvaluationResult>;

    fn poll(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Self::Output> {
        let this = self.get_mut();
        match this.rx.as_mut() {
            None => Poll::Ready(None),
            Some(rx) => match Pin::new(rx).poll(cx) {
                // A dropped reply means the coordinator shut down.
                Poll::Ready(result) => {
                    this.rx = None;
                    Poll::Ready(result.ok().flatten())
                }
                Poll::Pending => Poll::Pending,
            },
        }
    }
}

enum Command {
    Submit(Request),
    Shutdown(oneshot::Sender<()>),
}

struct Request {
    sequence: u64,
    submission: Submission,
    reply: Reply,
}

impl Request {
    fn resolve_empty(self) {
        let _ = self.reply.send(None);
    }
}

struct InFlight {
    request: Request,
    cancel: CancellationToken,
}

struct Completion {
    sequence: u64,
    outcome: Result<EvaluationResponse>,
    latency_ms: u64,
}

enum State {
    Idle,
    Dispatching(InFlight),
    DispatchingWithPending(InFlight, Request),
}

impl State {
    fn in_flight_sequence(&self) -> Option<u64> {
        match self {
            State::Idle => None,
            State::Dispatching(in_flight) | State::DispatchingWithPending(in_flight, _) => {
                Some(in_flight.request.sequence)
            }
        }
    }
}

struct Shared {
    /// Sequence number of the most recently accepted submission.
    sequence: Mutex<u64>,
    results: watch::Sender<Option<EvaluationResult>>,
}

impl Shared {
    fn sequence(&self) -> MutexGuard<'_, u64> {
        self.sequence.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    fn current(&self) -> u64 {
        *self.sequence()
    }
}

/// Handle to a running coordinator. Cheap to clone.
///
/// The driver stops when [`Coordinator::shutdown`] is called or every handle
/// has been dropped.
pub struct Coordinator<E> {
    shared: Arc<Shared>,
    commands: mpsc::UnboundedSender<Command>,
    evaluator: Arc<E>,
}

impl<E> Clone for Coordinator<E> {
    fn clone(&self) -> Self {
        Self {
            shared: Arc::clone(&self.shared),
            commands: self.commands.clone(),
            evaluator: Arc::clone(&self.evaluator),
        }
    }
}

impl<E: RemoteEvaluator> Coordinator<E> {
    /// Starts the driver on the current tokio runtime.
    pub fn spawn(evaluator: E, config: CoordinatorConfig) -> Self {
        let evaluator = Arc::new(evaluator);
        let (results, _) = watch::channel(None);
        let shared = Arc::new(Shared {
            sequence: Mutex::new(0),
            results,
        });
        let (commands, command_rx) = mpsc::unbounded_channel();
        let (completions, completion_rx) = mpsc::unbounded_channel();

        let driver = Driver {
            evaluator: Arc::clone(&evaluator),
            policy: config.supersede,
            shared: Arc::clone(&shared),
            commands: command_rx,
            completions,
            completion_rx,
            state: State::Idle,
        };
        tokio::spawn(driver.run());

        Self {
            shared,
            commands,
            evaluator,
        }
    }

    /// Accepts a submission and returns its deferred result.
    ///
    /// Never waits: the submission is numbered and handed to the driver
    /// before this returns, so submissions are processed in call order.
    pub fn submit(&self, code: impl Into<String>, language: impl Into<String>) -> Ticket {
        let submission = Submission::new(code, language);
        let (reply, rx) = oneshot::channel();

        let mut sequence = self.shared.sequence();
        *sequence += 1;
        let request = Request {
            sequence: *sequence,
            submission,
            reply,
        };
        let ticket_sequence = request.sequence;
        if self.commands.send(Command::Submit(request)).is_err() {
            log::debug!("submission #{} dropped, coordinator has shut down", ticket_sequence);
            return Ticket {
                sequence: ticket_sequence,
                rx: None,
            };
        }

        Ticket {
            sequence: ticket_sequence,
            rx: Some(rx),
        }
    }

    /// The most recently delivered result, for callers that ignore tickets.
    pub fn results(&self) -> watch::Receiver<Option<EvaluationResult>> {
        self.shared.results.subscribe()
    }

    /// Whether `result` still answers the newest accepted submission.
    pub fn is_current(&self, result: &EvaluationResult) -> bool {
        result.sequence == self.shared.current()
    }

    /// Sequence number of the most recently accepted submission.
    pub fn last_sequence(&self) -> u64 {
        self.shared.current()
    }

    /// Restores the last known submission from the service.
    ///
    /// Does not dispatch anything. Failures are logged and read as "no prior state".
    pub async fn fetch_last_code(&self) -> Option<Submission> {
        match self.evaluator.fetch_last_submission().await {
            Ok(last) => last,
            Err(e) => {
                log::warn!("Failed to load last code: {}", e);
                None
            }
        }
    }

    /// Stops the driver, cancelling the in-flight request.
    ///
    /// Outstanding tickets resolve to `None`; later submissions are ignored.
    pub async fn shutdown(&self) {
        let (done, stopped) = oneshot::channel();
        if self.commands.send(Command::Shutdown(done)).is_ok() {
            let _ = stopped.await;
        }
    }
}

struct Driver<E> {
    evaluator: Arc<E>,
    policy: SupersedePolicy,
    shared: Arc<Shared>,
    commands: mpsc::UnboundedReceiver<Command>,
    completions: mpsc::UnboundedSender<Completion>,
    completion_rx: mpsc::UnboundedReceiver<Completion>,
    state: State,
}

impl<E: RemoteEvaluator> Driver<E> {
    async fn run(mut self) {
        let stopped = loop {
            tokio::select! {
                biased;
                Some(done) = self.completion_rx.recv() => self.complete(done),
                command = self.commands.recv() => match command {
                    Some(Command::Submit(request)) => self.accept(request),
                    Some(Command::Shutdown(done)) => break Some(done),
                    None => break None,
                },
            }
        };

        self.stop();
        if let Some(done) = stopped {
            let _ = done.send(());
        }
    }

    fn accept(&mut self, request: Request) {
        self.state = match std::mem::replace(&mut self.state, State::Idle) {
            State::Idle => State::Dispatching(self.dispatch(request)),
            State::Dispatching(in_flight) => {
                self.supersede(&in_flight);
                State::DispatchingWithPending(in_flight, request)
            }
            State::DispatchingWithPending(in_flight, overwritten) => {
                log::debug!(
                    "submission #{} superseded by #{} before dispatch",
                    overwritten.sequence,
                    request.sequence
                );
                overwritten.resolve_empty();
                State::DispatchingWithPending(in_flight, request)
            }
        };
    }

    fn supersede(&self, in_flight: &InFlight) {
        match self.policy {
            SupersedePolicy::Cancel => {
                log::debug!("cancelling in-flight evaluation #{}", in_flight.request.sequence);
                in_flight.cancel.cancel();
            }
            SupersedePolicy::Finish => {
                log::debug!("letting in-flight evaluation #{} finish", in_flight.request.sequence);
            }
        }
    }

    fn dispatch(&self, request: Request) -> InFlight {
        let cancel = CancellationToken::new();
        let token = cancel.clone();
        let evaluator = Arc::clone(&self.evaluator);
        let submission = request.submission.clone();
        let completions = self.completions.clone();
        let sequence = request.sequence;

        log::debug!("dispatching evaluation #{} ({})", sequence, submission.language);

        tokio::spawn(async move {
            let start = Instant::now();
            let outcome = tokio::select! {
                biased;
                _ = token.cancelled() => Err(EvalError::Cancelled),
                result = AssertUnwindSafe(evaluator.evaluate(&submission)).catch_unwind() => match result {
                    Ok(result) => result,
                    // The driver must still hear back, or it would wait on this request forever.
                    Err(_) => {
                        log::error!("evaluator panicked while handling evaluation #{}", sequence);
                        Err(EvalError::UnexpectedResponse("evaluator task failed".to_string()))
                    }
                },
            };
            let _ = completions.send(Completion {
                sequence,
                outcome,
                latency_ms: start.elapsed().as_millis() as u64,
            });
        });

        InFlight { request, cancel }
    }

    fn complete(&mut self, done: Completion) {
        if self.state.in_flight_sequence() != Some(done.sequence) {
            log::debug!("ignoring completion for evaluation #{} that is no longer in flight", done.sequence);
            return;
        }

        let Completion {
            sequence,
            outcome,
            latency_ms,
        } = done;

        let (in_flight, pending) = match std::mem::replace(&mut self.state, State::Idle) {
            State::Dispatching(in_flight) => (in_flight, None),
            State::DispatchingWithPending(in_flight, pending) => (in_flight, Some(pending)),
            State::Idle => return,
        };

        if let Some(next) = pending {
            match &outcome {
                Ok(_) => log::debug!("discarding superseded result #{}", sequence),
                Err(e) if e.is_cancellation() => log::debug!("evaluation #{} cancelled", sequence),
                Err(e) => log::warn!("superseded evaluation #{} failed: {}", sequence, e),
            }
            in_flight.request.resolve_empty();
            self.state = State::Dispatching(self.dispatch(next));
            return;
        }

        let response = match outcome {
            Ok(response) => response,
            Err(e) if e.is_cancellation() => {
                in_flight.request.resolve_empty();
                return;
            }
            Err(e) => {
                log::warn!("evaluation #{} failed: {}", sequence, e);
                EvaluationResponse::transport_failure(e.to_string())
            }
        };

        // A submission may have been accepted by a handle but not yet reached
        // this loop; it will be dispatched as soon as it does.
        let is_latest = self.shared.current() == sequence;
        let Request {
            submission, reply, ..
        } = in_flight.request;
        if !is_latest {
            log::debug!("result #{} arrived after a newer submission, suppressing", sequence);
            let _ = reply.send(None);
            return;
        }

        log::info!(
            "evaluation #{} finished with code {} in {}ms",
            sequence,
            response.return_code,
            latency_ms
        );
        let result = EvaluationResult::from_response(response, submission, sequence, true, latency_ms);
        self.shared.results.send_replace(Some(result.clone()));
        let _ = reply.send(Some(result));
    }

    fn stop(&mut self) {
        match std::mem::replace(&mut self.state, State::Idle) {
            State::Idle => {}
            State::Dispatching(in_flight) => {
                in_flight.cancel.cancel();
                in_flight.request.resolve_empty();
            }
            State::DispatchingWithPending(in_flight, pending) => {
                in_flight.cancel.cancel();
                in_flight.request.resolve_empty();
                pending.resolve_empty();
            }
        }
        log::debug!("coordinator stopped");
    }
}
