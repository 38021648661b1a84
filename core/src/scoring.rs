//! # AI Risk Scoring
//!
//! [`AiScorer`] turns the live subdomains into [`RiskRecord`]s by asking a
//! [`ScoringProvider`] for scores in batches.
//!
//! 1. Names are split into batches of at most `batch_size`.
//! 2. Batches run under a semaphore (`max_concurrency`) and a `governor`
//!    rate limiter shared by every request.
//! 3. Each call goes through the [`RetryPolicy`] state machine.
//! 4. Replies are parsed and validated; whatever cannot be trusted is given
//!    the fallback score.
//!
//! Every input subdomain leaves with exactly one record, whatever happens to
//! the provider.

use std::sync::{Arc, Mutex, PoisonError};

use subrank_common::cancel::CancelToken;
use subrank_common::config::ScoringSettings;
use subrank_common::error::{ConfigurationError, FatalScoringError, ScoringFailure};
use subrank_common::models::{LiveSubdomain, RiskRecord, RiskScore};
use subrank_common::target::Domain;
use tokio::sync::Semaphore;
use tokio::task::JoinSet;
use tracing::{debug, error, info, warn};

mod cohere;
mod mock;
mod openai;
mod prompt;
mod provider;
mod rate_limit;
mod retry;

pub use cohere::CohereProvider;
pub use mock::{MockProvider, heuristic};
pub use openai::OpenAiProvider;
pub use prompt::{ReplyEntry, build_prompt, parse_reply, validate};
pub use provider::{ProviderError, ScoreRequest, ScoringProvider, create_provider};
pub use rate_limit::RateLimiter;
pub use retry::{RetryPolicy, RetryState};

#[derive(Debug, Default)]
pub struct ScoringOutcome {
    /// One record per input subdomain, in input order.
    pub records: Vec<RiskRecord>,
    pub warnings: Vec<ScoringFailure>,
    pub fatal: Option<FatalScoringError>,
}

pub struct AiScorer {
    provider: Arc<dyn ScoringProvider>,
    limiter: Arc<RateLimiter>,
    retry: RetryPolicy,
    model: String,
    temperature: f32,
    batch_size: usize,
    max_concurrency: usize,
    fallback: RiskScore,
    cancel: CancelToken,
}

impl AiScorer {
    pub fn new(provider: Arc<dyn ScoringProvider>, settings: &ScoringSettings) -> Self {
        Self {
            provider,
            limiter: Arc::new(RateLimiter::new(
                settings.requests_per_window,
                settings.rate_window,
            )),
            retry: RetryPolicy::from_settings(settings),
            model: settings.model_name().to_string(),
            temperature: settings.temperature,
            batch_size: settings.batch_size.max(1),
            max_concurrency: settings.max_concurrency.max(1),
            fallback: settings.fallback(),
            cancel: CancelToken::new(),
        }
    }

    /// Builds the scorer with the provider selected by `settings`.
    pub fn from_settings(settings: &ScoringSettings) -> Result<Self, ConfigurationError> {
        Ok(Self::new(create_provider(settings)?, settings))
    }

    pub fn with_cancel(mut self, cancel: CancelToken) -> Self {
        self.cancel = cancel;
        self
    }

    pub fn provider_name(&self) -> &'static str {
        self.provider.name()
    }

    pub async fn score(&self, domain: &Domain, subdomains: Vec<LiveSubdomain>) -> ScoringOutcome {
        if subdomains.is_empty() {
            return ScoringOutcome::default();
        }

        let batches: Vec<Vec<LiveSubdomain>> = into_batches(subdomains, self.batch_size);
        info!(
            "Scoring with {} ({}) in {} batches",
            self.provider.name(),
            self.model,
            batches.len()
        );

        let context = Arc::new(BatchContext {
            provider: self.provider.clone(),
            limiter: self.limiter.clone(),
            retry: self.retry,
            domain: domain.to_string(),
            model: self.model.clone(),
            temperature: self.temperature,
            fallback: self.fallback,
            cancel: self.cancel.clone(),
            fatal: Mutex::new(None),
        });
        let semaphore = Arc::new(Semaphore::new(self.max_concurrency));

        let mut tasks: JoinSet<(usize, BatchOutcome)> = JoinSet::new();
        let mut pending: Vec<Option<Vec<LiveSubdomain>>> = Vec::with_capacity(batches.len());
        for (index, batch) in batches.into_iter().enumerate() {
            let context = context.clone();
            let semaphore = semaphore.clone();
            pending.push(Some(batch.clone()));
            tasks.spawn(async move {
                let outcome = match semaphore.acquire_owned().await {
                    Ok(_permit) => context.run(batch).await,
                    Err(_) => context.fall_back(batch, ScoringFailure::ProviderUnavailable),
                };
                (index, outcome)
            });
        }

        let mut finished: Vec<Option<BatchOutcome>> = (0..pending.len()).map(|_| None).collect();
        while let Some(joined) = tasks.join_next().await {
            match joined {
                Ok((index, outcome)) => {
                    pending[index] = None;
                    finished[index] = Some(outcome);
                }
                Err(e) => error!("Scoring task failed: {e}"),
            }
        }

        let mut outcome = ScoringOutcome::default();
        for (slot, leftover) in finished.into_iter().zip(pending) {
            let batch = match (slot, leftover) {
                (Some(done), _) => done,
                (None, Some(batch)) => context.fall_back(batch, ScoringFailure::ProviderUnavailable),
                (None, None) => continue,
            };
            outcome.records.extend(batch.records);
            outcome.warnings.extend(batch.failures);
        }

        outcome.fatal = context.take_fatal();
        if let Some(fatal) = &outcome.fatal {
            error!("AI scoring aborted: {fatal}");
        }
        let degraded: usize = outcome.records.iter().filter(|r| r.degraded).count();
        if degraded > 0 {
            warn!(
                "{degraded} of {} subdomains received the fallback score",
                outcome.records.len()
            );
        }
        outcome
    }
}

fn into_batches(subdomains: Vec<LiveSubdomain>, size: usize) -> Vec<Vec<LiveSubdomain>> {
    let mut batches: Vec<Vec<LiveSubdomain>> = Vec::new();
    let mut current: Vec<LiveSubdomain> = Vec::with_capacity(size);
    for subdomain in subdomains {
        current.push(subdomain);
        if current.len() == size {
            batches.push(std::mem::replace(&mut current, Vec::with_capacity(size)));
        }
    }
    if !current.is_empty() {
        batches.push(current);
    }
    batches
}

struct BatchOutcome {
    records: Vec<RiskRecord>,
    failures: Vec<ScoringFailure>,
}

enum CallError {
    Degraded(ScoringFailure),
    Fatal(FatalScoringError),
}

/// State shared by the batches of one `score` call.
struct BatchContext {
    provider: Arc<dyn ScoringProvider>,
    limiter: Arc<RateLimiter>,
    retry: RetryPolicy,
    domain: String,
    model: String,
    temperature: f32,
    fallback: RiskScore,
    cancel: CancelToken,
    fatal: Mutex<Option<FatalScoringError>>,
}

impl BatchContext {
    async fn run(&self, batch: Vec<LiveSubdomain>) -> BatchOutcome {
        if self.cancel.is_cancelled() {
            return self.fall_back(batch, ScoringFailure::Cancelled);
        }
        if let Some(fatal) = self.fatal() {
            return self.fall_back_silently(batch, &fatal);
        }

        let request = ScoreRequest {
            domain: self.domain.clone(),
            names: batch.iter().map(|s| s.name().to_string()).collect(),
            model: self.model.clone(),
            temperature: self.temperature,
        };

        let reply: String = match self.call(&request).await {
            Ok(reply) => reply,
            Err(CallError::Degraded(failure)) => {
                warn!("Batch of {} names degraded: {failure}", batch.len());
                return self.fall_back(batch, failure);
            }
            Err(CallError::Fatal(fatal)) => {
                self.record_fatal(fatal.clone());
                return self.fall_back_silently(batch, &fatal);
            }
        };

        match parse_reply(&reply) {
            Ok(entries) => {
                let validated = validate(batch, entries, self.fallback);
                for failure in &validated.failures {
                    warn!("{failure}");
                }
                BatchOutcome {
                    records: validated.records,
                    failures: validated.failures,
                }
            }
            Err(failure) => {
                warn!("Batch of {} names degraded: {failure}", batch.len());
                self.fall_back(batch, failure)
            }
        }
    }

    async fn call(&self, request: &ScoreRequest) -> Result<String, CallError> {
        let mut state = self.retry.start();
        let mut last_error: Option<ProviderError> = None;

        loop {
            match state {
                RetryState::Attempting { attempt } => {
                    if self.cancel.is_cancelled() {
                        return Err(CallError::Degraded(ScoringFailure::Cancelled));
                    }
                    if self.fatal().is_some() {
                        return Err(CallError::Degraded(ScoringFailure::ProviderUnavailable));
                    }

                    self.limiter.acquire().await;
                    match self.provider.score_batch(request).await {
                        Ok(reply) => return Ok(reply),
                        Err(ProviderError::Unauthorized { status }) => {
                            return Err(CallError::Fatal(FatalScoringError::CredentialRejected {
                                status,
                            }));
                        }
                        Err(e) if e.is_retryable() => {
                            debug!("Attempt {} failed: {e}", attempt + 1);
                            state = self.retry.on_failure(state, e.retry_after());
                            last_error = Some(e);
                        }
                        Err(ProviderError::Decode(reason)) => {
                            return Err(CallError::Degraded(ScoringFailure::MalformedResponse(
                                reason,
                            )));
                        }
                        Err(e) => {
                            return Err(CallError::Degraded(ScoringFailure::RetriesExhausted {
                                attempts: attempt + 1,
                                reason: e.to_string(),
                            }));
                        }
                    }
                }
                RetryState::Backoff { attempt, delay } => {
                    debug!("Backing off {delay:?} before attempt {}", attempt + 2);
                    tokio::time::sleep(delay).await;
                    state = self.retry.on_backoff_elapsed(state);
                }
                RetryState::Exhausted { attempts } => {
                    return Err(match last_error {
                        Some(ProviderError::RateLimited { .. }) => {
                            CallError::Degraded(ScoringFailure::RateLimitExhausted { attempts })
                        }
                        Some(ProviderError::Unreachable(reason)) => {
                            CallError::Fatal(FatalScoringError::ProviderUnreachable {
                                attempts,
                                reason,
                            })
                        }
                        other => CallError::Degraded(ScoringFailure::RetriesExhausted {
                            attempts,
                            reason: other.map(|e| e.to_string()).unwrap_or_default(),
                        }),
                    });
                }
            }
        }
    }

    fn fall_back(&self, batch: Vec<LiveSubdomain>, failure: ScoringFailure) -> BatchOutcome {
        let reason: String = failure.fallback_reason();
        BatchOutcome {
            records: batch
                .into_iter()
                .map(|s| RiskRecord::fallback(s, self.fallback, reason.clone()))
                .collect(),
            failures: vec![failure],
        }
    }

    /// Fallback without a warning; the fatal error is reported once by the caller.
    fn fall_back_silently(&self, batch: Vec<LiveSubdomain>, fatal: &FatalScoringError) -> BatchOutcome {
        let reason: String = format!("scoring unavailable: {fatal}");
        BatchOutcome {
            records: batch
                .into_iter()
                .map(|s| RiskRecord::fallback(s, self.fallback, reason.clone()))
                .collect(),
            failures: Vec::new(),
        }
    }

    fn fatal(&self) -> Option<FatalScoringError> {
        self.fatal.lock().unwrap_or_else(PoisonError::into_inner).clone()
    }

    fn record_fatal(&self, fatal: FatalScoringError) {
        let mut slot = self.fatal.lock().unwrap_or_else(PoisonError::into_inner);
        if slot.is_none() {
            *slot = Some(fatal);
        }
    }

    fn take_fatal(&self) -> Option<FatalScoringError> {
        self.fatal.lock().unwrap_or_else(PoisonError::into_inner).take()
    }
}
