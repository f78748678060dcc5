//! Runs the handler chain for one query.

use std::panic::{self, AssertUnwindSafe};
use std::time::Instant;

use tracing::{debug, error, trace, warn};

use crate::domain::{CaseKind, CaseResult};
use crate::fare::FareTable;
use crate::network::RouteNetworkView;

use super::config::CaseConfig;
use super::handler::{CaseError, CaseHandler, HandlerContext};
use super::rank::finalize;

/// When the transfer handlers run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum TransferPolicy {
    /// Only if no single-route handler found anything
    #[default]
    Fallback,
    /// Always, alongside the single-route handlers
    Always,
}

/// A handler that failed or panicked. Its results were discarded.
#[derive(Debug, Clone, PartialEq)]
pub struct HandlerFailure {
    pub kind: CaseKind,
    pub message: String,
}

/// Output of one dispatch.
#[derive(Debug, Clone, Default)]
pub struct DispatchResult {
    /// Ranked, de-duplicated itineraries. Empty means no route found.
    pub results: Vec<CaseResult>,

    /// Handlers that ran, in order: their precondition held, or they
    /// panicked. Every handler in `failures` is listed here too.
    pub handlers_run: Vec<CaseKind>,

    /// Handlers that failed.
    pub failures: Vec<HandlerFailure>,
}

/// Error from dispatch.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum DispatchError {
    /// The query deadline passed between handlers
    #[error("deadline exceeded after {handlers_run} handlers")]
    DeadlineExceeded { handlers_run: usize },
}

/// Evaluates the ordered handler chain against a route network view.
#[derive(Debug, Clone, Default)]
pub struct Dispatcher {
    config: CaseConfig,
    fares: FareTable,
    policy: TransferPolicy,
}

impl Dispatcher {
    pub fn new(config: CaseConfig, fares: FareTable) -> Self {
        Self {
            config,
            fares,
            policy: TransferPolicy::default(),
        }
    }

    pub fn with_policy(mut self, policy: TransferPolicy) -> Self {
        self.policy = policy;
        self
    }

    pub fn config(&self) -> &CaseConfig {
        &self.config
    }

    pub fn policy(&self) -> TransferPolicy {
        self.policy
    }

    /// Run every applicable handler with no deadline.
    pub fn dispatch(&self, view: &RouteNetworkView) -> DispatchResult {
        let mut out = DispatchResult::default();
        match self.run_chain(view, None, &mut out) {
            Ok(()) => {}
            // Only reachable with a deadline
            Err(DispatchError::DeadlineExceeded { .. }) => {}
        }
        out
    }

    /// Run every applicable handler, checking `deadline` before each one.
    pub fn dispatch_until(
        &self,
        view: &RouteNetworkView,
        deadline: Instant,
    ) -> Result<DispatchResult, DispatchError> {
        let mut out = DispatchResult::default();
        self.run_chain(view, Some(deadline), &mut out)?;
        Ok(out)
    }

    fn run_chain(
        &self,
        view: &RouteNetworkView,
        deadline: Option<Instant>,
        out: &mut DispatchResult,
    ) -> Result<(), DispatchError> {
        let ctx = HandlerContext::new(view, &self.config, &self.fares);
        let mut found = Vec::new();

        for handler in CaseHandler::SINGLE_ROUTE {
            check_deadline(deadline, out)?;
            self.run_handler(handler, &ctx, &mut found, out);
        }

        let run_transfers = match self.policy {
            TransferPolicy::Always => true,
            TransferPolicy::Fallback => found.is_empty(),
        };
        if run_transfers {
            for handler in CaseHandler::TRANSFER {
                check_deadline(deadline, out)?;
                self.run_handler(handler, &ctx, &mut found, out);
            }
        }

        let total = found.len();
        out.results = finalize(found, self.config.max_results);
        debug!(
            found = total,
            returned = out.results.len(),
            handlers = out.handlers_run.len(),
            "dispatch complete"
        );
        Ok(())
    }

    fn run_handler(
        &self,
        handler: CaseHandler,
        ctx: &HandlerContext<'_>,
        found: &mut Vec<CaseResult>,
        out: &mut DispatchResult,
    ) {
        isolate(
            handler.kind(),
            || handler.can_handle(ctx).then(|| handler.calculate(ctx)),
            found,
            out,
        );
    }
}

/// Run one handler body, isolating failures and panics. The body returns
/// `None` when the handler's precondition does not hold; any other outcome,
/// panics included, counts as a handler that ran.
fn isolate<F>(kind: CaseKind, body: F, found: &mut Vec<CaseResult>, out: &mut DispatchResult)
where
    F: FnOnce() -> Option<Result<Vec<CaseResult>, CaseError>>,
{
    match panic::catch_unwind(AssertUnwindSafe(body)) {
        Ok(None) => {
            trace!(case = %kind, "precondition not met");
        }
        Ok(Some(Ok(results))) => {
            debug!(case = %kind, results = results.len(), "handler ran");
            out.handlers_run.push(kind);
            found.extend(results);
        }
        Ok(Some(Err(e))) => {
            warn!(case = %kind, error = %e, "handler failed, skipping");
            out.handlers_run.push(kind);
            out.failures.push(HandlerFailure {
                kind,
                message: e.to_string(),
            });
        }
        Err(payload) => {
            let message = panic_message(payload.as_ref());
            error!(case = %kind, panic = %message, "handler panicked, skipping");
            out.handlers_run.push(kind);
            out.failures.push(HandlerFailure { kind, message });
        }
    }
}

fn check_deadline(deadline: Option<Instant>, out: &DispatchResult) -> Result<(), DispatchError> {
    match deadline {
        Some(d) if Instant::now() >= d => Err(DispatchError::DeadlineExceeded {
            handlers_run: out.handlers_run.len(),
        }),
        _ => Ok(()),
    }
}

fn panic_message(payload: &(dyn std::any::Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        (*s).to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "unknown panic".to_string()
    }
}
