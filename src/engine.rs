//! Execution engine: the request state machine.
//!
//! ```text
//! SelectingTier → AdmissionCheck → CreditCheck → CallingPrimary
//!     → (retry loop) → Succeeded
//!                    | Escalating → CallingThinker → Succeeded
//!                    | FallbackModel → Succeeded | Failed
//!                    | Failed
//! ```
//!
//! Retries are strictly sequential with exponential backoff; non-retryable
//! provider errors (permission, quota) propagate immediately. After primary
//! retries are exhausted the fallback model gets exactly one shot. A
//! successful worker response may be transparently re-served at thinker tier
//! when the analyzer's confidence was low and the response reads uncertain.
//! Exactly one tier is ever charged — the one that produced the returned
//! content — and exactly one usage record is written per terminal outcome.
//!
//! Every provider call carries a deadline (`tokio::time::timeout`); the
//! reference behavior has no timeout primitive, so this is an addition, not
//! compatibility behavior.

use std::sync::Arc;
use std::time::Instant;

use crate::cache::{CacheKey, ContextCache};
use crate::config::RouterConfig;
use crate::credits::CreditGate;
use crate::error::{ProviderError, RouterError};
use crate::ledger::CreditLedger;
use crate::prompt::{DepartmentPrompts, PromptAssembler};
use crate::provider::{ChatTurn, GenerationProvider};
use crate::rate_limit::RateLimiter;
use crate::request::{ExecutionResult, Request, Tier};
use crate::routing;
use crate::usage::{UsageRecorder, UsageSink};

/// Named states of the per-request state machine. Transitions are logged so
/// the two charge paths (worker vs. escalated thinker) are distinguishable in
/// traces.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum EngineState {
    SelectingTier,
    AdmissionCheck,
    CreditCheck,
    CallingPrimary,
    FallbackModel,
    Escalating,
    CallingThinker,
    Succeeded,
    Failed,
}

/// Markers in a worker response that signal a low-confidence answer worth
/// re-serving at thinker tier.
const UNCERTAINTY_MARKERS: &[&str] = &[
    "i'm not sure",
    "i am not sure",
    "i don't know",
    "i do not know",
    "not enough data",
    "insufficient data",
    "too complex",
    "cannot determine",
    "unable to determine",
    "need more information",
    "need more context",
    "hard to say",
];

/// Returns `true` if a successful response reads uncertain enough to warrant
/// escalation. An empty response always does.
fn response_is_uncertain(content: &str) -> bool {
    let trimmed = content.trim();
    if trimmed.is_empty() {
        return true;
    }
    let lower = trimmed.to_lowercase();
    UNCERTAINTY_MARKERS.iter().any(|m| lower.contains(m))
}

/// The router core. Owns the admission gate, credit gate, context cache, and
/// prompt assembler; talks to the provider, ledger, and usage sink through
/// their injected trait objects.
pub struct ExecutionEngine {
    provider: Arc<dyn GenerationProvider>,
    rate_limiter: Arc<RateLimiter>,
    cache: ContextCache,
    credit_gate: CreditGate,
    assembler: PromptAssembler,
    recorder: UsageRecorder,
    config: RouterConfig,
}

impl ExecutionEngine {
    pub fn new(
        provider: Arc<dyn GenerationProvider>,
        ledger: Arc<dyn CreditLedger>,
        usage_sink: Arc<dyn UsageSink>,
        departments: Arc<dyn DepartmentPrompts>,
        config: RouterConfig,
    ) -> Self {
        Self {
            provider,
            rate_limiter: Arc::new(RateLimiter::new(&config.rate_limit)),
            cache: ContextCache::new(&config.cache),
            credit_gate: CreditGate::new(ledger, config.costs.clone()),
            assembler: PromptAssembler::new(departments),
            recorder: UsageRecorder::new(usage_sink),
            config,
        }
    }

    /// The admission gate, exposed so embedders can start its sweep task.
    pub fn rate_limiter(&self) -> &Arc<RateLimiter> {
        &self.rate_limiter
    }

    /// Spawn the rate limiter's background sweep.
    pub fn spawn_rate_limit_sweeper(&self) -> tokio::task::JoinHandle<()> {
        self.rate_limiter.spawn_sweeper()
    }

    /// Drive one request to a terminal outcome.
    pub async fn execute(&self, request: &Request) -> ExecutionResult {
        let started = Instant::now();
        let mut state = EngineState::SelectingTier;

        let decision = routing::select(request);
        tracing::debug!(
            caller = %request.caller_id,
            tier = %decision.tier,
            score = decision.score.score,
            confidence = decision.score.confidence,
            reason = %decision.reason,
            "tier selected"
        );

        advance(&mut state, EngineState::AdmissionCheck);
        let admission = self.rate_limiter.admit(request.caller_id);
        if !admission.allowed {
            advance(&mut state, EngineState::Failed);
            return self.fail(
                request,
                decision.tier,
                RouterError::AdmissionDenied {
                    caller_id: request.caller_id,
                    retry_in: admission.reset_in,
                },
                started,
            );
        }

        advance(&mut state, EngineState::CreditCheck);
        let check = match self.credit_gate.check(request.caller_id, decision.tier).await {
            Ok(check) => check,
            Err(err) => {
                advance(&mut state, EngineState::Failed);
                return self.fail(request, decision.tier, RouterError::Ledger(err), started);
            }
        };
        if !check.has_credits {
            advance(&mut state, EngineState::Failed);
            return self.fail(
                request,
                decision.tier,
                RouterError::InsufficientCredits {
                    required: check.required,
                    available: check.balance,
                },
                started,
            );
        }

        let instruction = self.instruction_for(request, decision.tier);
        let turns = conversation_turns(request);

        advance(&mut state, EngineState::CallingPrimary);
        let models = self.config.models.for_tier(decision.tier);
        let content = match self.call_with_retries(&models.primary, &instruction, &turns).await {
            Ok(content) => content,
            Err(err) if err.is_retryable() => {
                advance(&mut state, EngineState::FallbackModel);
                tracing::warn!(
                    primary = %models.primary,
                    fallback = %models.fallback,
                    error = %err,
                    "primary model exhausted, trying fallback once"
                );
                match self.call_once(&models.fallback, &instruction, &turns).await {
                    Ok(content) => content,
                    Err(fallback_err) => {
                        advance(&mut state, EngineState::Failed);
                        return self.fail(
                            request,
                            decision.tier,
                            RouterError::Exhausted {
                                tier: decision.tier.to_string(),
                                reason: fallback_err.to_string(),
                            },
                            started,
                        );
                    }
                }
            }
            Err(err) => {
                advance(&mut state, EngineState::Failed);
                return self.fail(request, decision.tier, RouterError::Provider(err), started);
            }
        };

        let (final_tier, final_content, escalated) = self
            .maybe_escalate(&mut state, request, &decision, content)
            .await;

        let credits_charged = match self.credit_gate.charge(request.caller_id, final_tier).await {
            Ok(_) => self.credit_gate.cost(final_tier),
            Err(err) => {
                // The caller already has their content; surface the ledger
                // problem in logs rather than failing the served request.
                tracing::warn!(
                    caller = %request.caller_id,
                    tier = %final_tier,
                    error = %err,
                    "charge failed after successful generation"
                );
                0
            }
        };

        advance(&mut state, EngineState::Succeeded);
        self.recorder.record(
            request.caller_id,
            final_tier,
            credits_charged,
            request.kind,
            true,
        );

        ExecutionResult {
            success: true,
            content: Some(final_content),
            tier: final_tier,
            credits_charged,
            error: None,
            escalated,
            elapsed_ms: started.elapsed().as_millis() as u64,
        }
    }

    /// Escalation protocol: a worker-tier success with low analyzer
    /// confidence and an uncertain-sounding response is re-served once at
    /// thinker tier, if the caller can afford it. Any problem on this path
    /// keeps the original worker response.
    async fn maybe_escalate(
        &self,
        state: &mut EngineState,
        request: &Request,
        decision: &routing::RoutingDecision,
        content: String,
    ) -> (Tier, String, bool) {
        let eligible = self.config.escalation.enabled
            && decision.tier == Tier::Worker
            && decision.score.confidence < self.config.escalation.confidence_threshold
            && response_is_uncertain(&content);
        if !eligible {
            return (decision.tier, content, false);
        }

        advance(state, EngineState::Escalating);
        match self.credit_gate.check(request.caller_id, Tier::Thinker).await {
            Ok(check) if check.has_credits => {
                advance(state, EngineState::CallingThinker);
                let instruction = self.instruction_for(request, Tier::Thinker);
                let turns = conversation_turns(request);
                let model = &self.config.models.thinker.primary;
                // Exactly one secondary call; escalation is never retried.
                match self.call_once(model, &instruction, &turns).await {
                    Ok(thinker_content) => {
                        tracing::info!(
                            caller = %request.caller_id,
                            confidence = decision.score.confidence,
                            "escalated worker response to thinker"
                        );
                        (Tier::Thinker, thinker_content, true)
                    }
                    Err(err) => {
                        tracing::warn!(
                            error = %err,
                            "thinker escalation failed, keeping worker response"
                        );
                        (Tier::Worker, content, false)
                    }
                }
            }
            Ok(check) => {
                tracing::debug!(
                    balance = check.balance,
                    required = check.required,
                    "caller cannot afford thinker, keeping worker response"
                );
                (Tier::Worker, content, false)
            }
            Err(err) => {
                tracing::warn!(error = %err, "ledger check failed during escalation");
                (Tier::Worker, content, false)
            }
        }
    }

    /// Call one model with bounded sequential retries and exponential
    /// backoff. Non-retryable errors propagate immediately without consuming
    /// remaining attempts.
    async fn call_with_retries(
        &self,
        model: &str,
        instruction: &str,
        turns: &[ChatTurn],
    ) -> Result<String, ProviderError> {
        let max_attempts = self.config.retry.max_attempts.max(1);
        let mut last_error: Option<ProviderError> = None;

        for attempt in 1..=max_attempts {
            match self.call_once(model, instruction, turns).await {
                Ok(content) => return Ok(content),
                Err(err) if !err.is_retryable() => return Err(err),
                Err(err) => {
                    if attempt < max_attempts {
                        let delay = self.config.retry.backoff_delay(attempt);
                        tracing::warn!(
                            model,
                            attempt,
                            delay_ms = delay.as_millis() as u64,
                            error = %err,
                            "transient provider error, backing off"
                        );
                        tokio::time::sleep(delay).await;
                    }
                    last_error = Some(err);
                }
            }
        }

        // SAFETY: max_attempts >= 1, so at least one iteration ran and
        // `last_error` is `Some`.
        Err(last_error.expect("at least one attempt ran"))
    }

    /// One provider call under the configured deadline.
    async fn call_once(
        &self,
        model: &str,
        instruction: &str,
        turns: &[ChatTurn],
    ) -> Result<String, ProviderError> {
        let deadline = self.config.retry.provider_timeout();
        match tokio::time::timeout(deadline, self.provider.generate(model, instruction, turns))
            .await
        {
            Ok(result) => result,
            Err(_) => Err(ProviderError::Timeout {
                model: model.to_string(),
                timeout: deadline,
            }),
        }
    }

    /// Build (or reuse) the system instruction for a request at a tier.
    fn instruction_for(&self, request: &Request, tier: Tier) -> String {
        let key = CacheKey::new(request.caller_id, request.kind, request.department());
        if let Some(content) = self.cache.get(&key, tier) {
            tracing::debug!(caller = %request.caller_id, kind = %request.kind, "context cache hit");
            return content;
        }
        let built = self
            .assembler
            .build(tier, request.kind, request.context.as_ref());
        self.cache.put(key, built.clone(), tier);
        built
    }

    /// Terminal failure: one zero-cost usage record, then the declined result.
    fn fail(
        &self,
        request: &Request,
        tier: Tier,
        error: RouterError,
        started: Instant,
    ) -> ExecutionResult {
        tracing::debug!(caller = %request.caller_id, tier = %tier, error = %error, "request failed");
        self.recorder
            .record(request.caller_id, tier, 0, request.kind, false);
        ExecutionResult {
            success: false,
            content: None,
            tier,
            credits_charged: 0,
            error: Some(error),
            escalated: false,
            elapsed_ms: started.elapsed().as_millis() as u64,
        }
    }
}

fn advance(state: &mut EngineState, next: EngineState) {
    tracing::trace!(from = ?state, to = ?next, "engine state");
    *state = next;
}

/// Conversation turns sent to the provider: prior history when requested,
/// then the prompt as the final caller turn.
fn conversation_turns(request: &Request) -> Vec<ChatTurn> {
    let mut turns = Vec::new();
    if request.include_history {
        if let Some(ctx) = &request.context {
            turns.extend(ctx.history.iter().cloned());
        }
    }
    turns.push(ChatTurn::caller(request.prompt.clone()));
    turns
}
