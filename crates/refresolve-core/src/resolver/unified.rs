//! Strategy execution and result merging.
//!
//! Runs the chosen [`SearchStrategy`] across the listing and unit resolvers
//! and folds their outcomes into one [`UnifiedResult`]. Waits are bounded by
//! the outer deadline and the caller's cancellation token; neither stops a
//! lookup already handed to the cache.

use super::kind::{cache_key, KindResolver};
use super::slug;
use crate::cache::{DedupCache, EntrySource, SharedLookup};
use crate::cancel::CancellationToken;
use crate::config::{ResolverConfig, ResolverSettings};
use crate::error::{ErrorCategory, ResolveError};
use crate::models::{Alternative, ResolveOptions, ResolvedResource, UnifiedResult};
use crate::network::LookupService;
use crate::reference::{
    classify, normalize, select_strategy, ClassificationResult, Reference, ResourceKind,
    SearchStrategy,
};
use std::sync::Arc;
use std::time::Duration;
use tokio::time::Instant;
use tracing::{debug, info, warn};

const VERIFY_PENDING: &str =
    "Showing a best-effort link; the reference is being verified in the background.";
const FORMAT_HINT: &str =
    "References contain only letters and digits, for example UNIT102 or 203456.";
const NOT_FOUND_HINT: &str = "Check the reference for typos or search by location instead.";
const SERVICE_HINT: &str =
    "The lookup service is unavailable; retry later or use quick_resolve for a best-effort link.";

/// A failed lookup and the kind it was for.
#[derive(Debug, Clone)]
struct Failure {
    kind: ResourceKind,
    error: ResolveError,
    /// The caller stopped waiting; the lookup itself may still succeed.
    interrupted: bool,
}

impl Failure {
    fn settled(kind: ResourceKind, error: ResolveError) -> Self {
        Self {
            kind,
            error,
            interrupted: false,
        }
    }

    fn interrupted(kind: ResourceKind, error: ResolveError) -> Self {
        Self {
            kind,
            error,
            interrupted: true,
        }
    }
}

enum Outcome {
    Found {
        chosen: ResolvedResource,
        alternative: Option<ResolvedResource>,
    },
    Failed(Failure),
}

/// Drives both kind resolvers for one reference.
pub struct UnifiedResolver {
    listing: KindResolver,
    unit: KindResolver,
    cache: Arc<DedupCache<ResolvedResource>>,
    settings: ResolverSettings,
}

impl UnifiedResolver {
    pub fn new(
        lookup: Arc<dyn LookupService>,
        cache: Arc<DedupCache<ResolvedResource>>,
        settings: ResolverSettings,
    ) -> Self {
        Self {
            listing: KindResolver::new(
                ResourceKind::Property,
                Arc::clone(&lookup),
                Arc::clone(&cache),
                &settings,
            ),
            unit: KindResolver::new(ResourceKind::Unit, lookup, Arc::clone(&cache), &settings),
            cache,
            settings,
        }
    }

    pub fn settings(&self) -> &ResolverSettings {
        &self.settings
    }

    pub fn resolver(&self, kind: ResourceKind) -> &KindResolver {
        match kind.or_default() {
            ResourceKind::Unit => &self.unit,
            _ => &self.listing,
        }
    }

    /// Resolve raw input. Always produces a result, never an error.
    pub async fn resolve(&self, input: &str, options: &ResolveOptions) -> UnifiedResult {
        let started = Instant::now();

        let reference = match normalize(input) {
            Ok(reference) => reference,
            Err(e) => {
                debug!("Rejected reference {:?}: {}", input, e);
                return invalid_input(input, e, started);
            }
        };

        let classification = classify(&reference);
        let strategy = options.strategy.unwrap_or_else(|| match options.preferred_kind {
            Some(kind) => SearchStrategy::PrimaryFirst(kind.or_default()),
            None => select_strategy(&classification),
        });
        let preferred = options
            .preferred_kind
            .unwrap_or(classification.kind)
            .or_default();
        let outer = options
            .timeout
            .unwrap_or_else(|| self.settings.outer_timeout());
        let deadline = started + outer;
        let cancel = options.cancel.as_ref();

        debug!(
            "Resolving {} as {} ({:.2}, {}) with {}",
            reference.id(),
            classification.kind,
            classification.confidence,
            classification.reasoning,
            strategy
        );

        if let Err(e) = cancel.map_or(Ok(()), CancellationToken::check) {
            debug!("Resolution of {} cancelled before it started", reference.id());
            let outcome = Outcome::Failed(Failure::interrupted(preferred, e.into()));
            return self.build_result(
                &reference,
                &classification,
                strategy,
                outcome,
                options.include_alternatives,
                started,
            );
        }

        let outcome = match (self.from_cache(&reference, strategy, preferred), strategy) {
            (Some(outcome), _) => outcome,
            (None, SearchStrategy::PrimaryFirst(kind)) => {
                let share = ResolverConfig::PRIMARY_FIRST_SHARE;
                self.run_ordered(&reference, kind, share, outer, deadline, cancel)
                    .await
            }
            (None, SearchStrategy::Sequential(kind)) => {
                let share = ResolverConfig::SEQUENTIAL_SHARE;
                self.run_ordered(&reference, kind, share, outer, deadline, cancel)
                    .await
            }
            (None, SearchStrategy::Parallel) => {
                self.run_parallel(&reference, preferred, outer, deadline, cancel)
                    .await
            }
        };

        let result = self.build_result(
            &reference,
            &classification,
            strategy,
            outcome,
            options.include_alternatives,
            started,
        );
        info!(
            "Reference {} -> {} (valid: {}, source: {:?}, {}ms)",
            result.reference,
            if result.url.is_empty() { "-" } else { result.url.as_str() },
            result.is_valid,
            result.source,
            result.response_time_ms
        );
        result
    }

    /// Fallback-only resolution that never touches the network.
    pub fn quick_resolve(&self, input: &str) -> UnifiedResult {
        let started = Instant::now();
        let reference = match normalize(input) {
            Ok(reference) => reference,
            Err(e) => return invalid_input(input, e, started),
        };

        let classification = classify(&reference);
        let strategy = select_strategy(&classification);
        let kind = classification.kind.or_default();

        UnifiedResult {
            reference: reference.id().to_string(),
            url: slug::fallback_url(kind, reference.id()),
            is_valid: true,
            error_message: None,
            error_category: None,
            suggestion: Some(VERIFY_PENDING.to_string()),
            kind,
            confidence: classification.confidence,
            strategy: Some(strategy),
            source: EntrySource::Fallback,
            response_time_ms: elapsed_ms(started),
            alternatives: Vec::new(),
        }
    }

    /// Live cached results for either kind, without starting a lookup.
    ///
    /// Both kinds are consulted so a reference that fell through to its
    /// secondary kind is not looked up again. Authoritative entries beat
    /// fallbacks.
    fn from_cache(
        &self,
        reference: &Reference,
        strategy: SearchStrategy,
        preferred: ResourceKind,
    ) -> Option<Outcome> {
        let found = |chosen, alternative| Outcome::Found {
            chosen,
            alternative,
        };

        let primary = match strategy {
            SearchStrategy::PrimaryFirst(kind) | SearchStrategy::Sequential(kind) => {
                kind.or_default()
            }
            SearchStrategy::Parallel => {
                let cached = (self.listing.cached(reference), self.unit.cached(reference));
                let outcome = match cached {
                    (Some(listing), Some(unit)) => {
                        if prefer_first(&listing, &unit, preferred) {
                            found(listing, Some(unit))
                        } else {
                            found(unit, Some(listing))
                        }
                    }
                    (Some(one), None) | (None, Some(one)) => found(one, None),
                    (None, None) => return None,
                };
                debug!("Serving {} from cache", reference.id());
                return Some(outcome);
            }
        };

        let first = self.resolver(primary).cached(reference);
        let chosen = match first {
            Some(first) if !first.is_fallback() => first,
            first => match (first, self.resolver(primary.other()).cached(reference)) {
                (_, Some(second)) if !second.is_fallback() => second,
                (Some(first), _) => first,
                (None, second) => second?,
            },
        };
        debug!("Serving {} from cache", reference.id());
        Some(found(chosen, None))
    }

    /// Primary kind first with `share` of the outer budget, the other kind
    /// with whatever remains.
    async fn run_ordered(
        &self,
        reference: &Reference,
        primary: ResourceKind,
        share: f64,
        outer: Duration,
        deadline: Instant,
        cancel: Option<&CancellationToken>,
    ) -> Outcome {
        let primary = primary.or_default();
        let attempt_timeout = self.settings.standalone_attempt_timeout();

        let primary_budget = outer.mul_f64(share);
        let primary_deadline = deadline.min(Instant::now() + primary_budget);
        let first = wait(
            primary,
            self.resolver(primary).start(reference, attempt_timeout),
            primary_deadline,
            primary_budget,
            cancel,
        )
        .await;

        let first_failure = match first {
            Ok(chosen) => {
                return Outcome::Found {
                    chosen,
                    alternative: None,
                }
            }
            Err(failure) => failure,
        };

        if matches!(first_failure.error, ResolveError::Cancelled) {
            return Outcome::Failed(first_failure);
        }

        let now = Instant::now();
        if now >= deadline {
            return Outcome::Failed(first_failure);
        }

        let secondary = primary.other();
        debug!(
            "{} lookup for {} failed ({}), trying {}",
            primary,
            reference.id(),
            first_failure.error,
            secondary
        );

        let second = wait(
            secondary,
            self.resolver(secondary).start(reference, attempt_timeout),
            deadline,
            deadline - now,
            cancel,
        )
        .await;

        match second {
            Ok(chosen) => Outcome::Found {
                chosen,
                alternative: None,
            },
            Err(second_failure) => Outcome::Failed(merge_failures(
                reference,
                primary,
                vec![first_failure, second_failure],
            )),
        }
    }

    /// Both kinds at once under one shared deadline.
    async fn run_parallel(
        &self,
        reference: &Reference,
        preferred: ResourceKind,
        outer: Duration,
        deadline: Instant,
        cancel: Option<&CancellationToken>,
    ) -> Outcome {
        let attempt_timeout = self.settings.parallel_attempt_timeout();
        let (listing, unit) = tokio::join!(
            wait(
                ResourceKind::Property,
                self.listing.start(reference, attempt_timeout),
                deadline,
                outer,
                cancel
            ),
            wait(
                ResourceKind::Unit,
                self.unit.start(reference, attempt_timeout),
                deadline,
                outer,
                cancel
            ),
        );

        match (listing, unit) {
            (Ok(listing), Ok(unit)) => {
                let (chosen, alternative) = if prefer_first(&listing, &unit, preferred) {
                    (listing, unit)
                } else {
                    (unit, listing)
                };
                Outcome::Found {
                    chosen,
                    alternative: Some(alternative),
                }
            }
            (Ok(chosen), Err(_)) | (Err(_), Ok(chosen)) => Outcome::Found {
                chosen,
                alternative: None,
            },
            (Err(listing_failure), Err(unit_failure)) => Outcome::Failed(merge_failures(
                reference,
                preferred,
                vec![listing_failure, unit_failure],
            )),
        }
    }

    fn build_result(
        &self,
        reference: &Reference,
        classification: &ClassificationResult,
        strategy: SearchStrategy,
        outcome: Outcome,
        include_alternatives: bool,
        started: Instant,
    ) -> UnifiedResult {
        let id = reference.id().to_string();

        match outcome {
            Outcome::Found {
                chosen,
                alternative,
            } => UnifiedResult {
                reference: id,
                url: chosen.canonical_url.clone(),
                is_valid: true,
                error_message: None,
                error_category: None,
                suggestion: chosen.is_fallback().then(|| VERIFY_PENDING.to_string()),
                kind: chosen.kind,
                confidence: classification.confidence,
                strategy: Some(strategy),
                source: chosen.source,
                response_time_ms: elapsed_ms(started),
                alternatives: alternative
                    .filter(|_| include_alternatives)
                    .map(|alt| vec![Alternative::from(&alt)])
                    .unwrap_or_default(),
            },
            Outcome::Failed(failure) if failure.interrupted => {
                let url = slug::fallback_url(failure.kind, &id);
                warn!(
                    "Falling back for {} {}: {}",
                    failure.kind, id, failure.error
                );

                // A cancelled wait says nothing about the service.
                if !matches!(failure.error, ResolveError::Cancelled) {
                    let fallback = ResolvedResource {
                        kind: failure.kind,
                        reference: id.clone(),
                        canonical_url: url.clone(),
                        raw_record: None,
                        source: EntrySource::Fallback,
                        response_time_ms: elapsed_ms(started),
                    };
                    self.cache.insert(
                        &cache_key(failure.kind, &id),
                        fallback,
                        self.settings.fallback_ttl(),
                    );
                }

                UnifiedResult {
                    reference: id,
                    url,
                    is_valid: true,
                    error_message: None,
                    error_category: Some(failure.error.category()),
                    suggestion: Some(VERIFY_PENDING.to_string()),
                    kind: failure.kind,
                    confidence: classification.confidence,
                    strategy: Some(strategy),
                    source: EntrySource::Fallback,
                    response_time_ms: elapsed_ms(started),
                    alternatives: Vec::new(),
                }
            }
            Outcome::Failed(failure) => {
                let category = failure.error.category();
                let suggestion = match category {
                    ErrorCategory::NotFound => NOT_FOUND_HINT,
                    ErrorCategory::InvalidFormat => FORMAT_HINT,
                    _ => SERVICE_HINT,
                };
                UnifiedResult {
                    reference: id,
                    url: String::new(),
                    is_valid: false,
                    error_message: Some(failure.error.to_string()),
                    error_category: Some(category),
                    suggestion: Some(suggestion.to_string()),
                    kind: classification.kind,
                    confidence: classification.confidence,
                    strategy: Some(strategy),
                    source: EntrySource::Fallback,
                    response_time_ms: elapsed_ms(started),
                    alternatives: Vec::new(),
                }
            }
        }
    }
}

/// Await a shared lookup for `kind` until it settles, the deadline passes,
/// or the caller cancels. Leaving early never cancels the lookup itself.
async fn wait(
    kind: ResourceKind,
    lookup: SharedLookup<ResolvedResource>,
    deadline: Instant,
    budget: Duration,
    cancel: Option<&CancellationToken>,
) -> Result<ResolvedResource, Failure> {
    let cancelled = async {
        match cancel {
            Some(token) => token.cancelled().await,
            None => std::future::pending().await,
        }
    };

    tokio::select! {
        biased;
        result = lookup => result.map_err(|e| Failure::settled(kind, e)),
        _ = cancelled => Err(Failure::interrupted(kind, ResolveError::Cancelled)),
        _ = tokio::time::sleep_until(deadline) => {
            Err(Failure::interrupted(kind, ResolveError::Timeout(budget)))
        }
    }
}

/// Whether `listing` should be chosen over `unit`.
///
/// Authoritative results beat fallbacks; otherwise the preferred kind wins.
fn prefer_first(
    listing: &ResolvedResource,
    unit: &ResolvedResource,
    preferred: ResourceKind,
) -> bool {
    match (listing.source, unit.source) {
        (EntrySource::Api, EntrySource::Fallback) => true,
        (EntrySource::Fallback, EntrySource::Api) => false,
        _ => preferred != ResourceKind::Unit,
    }
}

/// Pick the single failure to report.
///
/// Format errors win, then interrupted waits (which still yield a fallback
/// URL, preferring `preferred`'s kind), then not-found, then anything else.
fn merge_failures(
    reference: &Reference,
    preferred: ResourceKind,
    failures: Vec<Failure>,
) -> Failure {
    if let Some(f) = failures
        .iter()
        .find(|f| f.error.category() == ErrorCategory::InvalidFormat)
    {
        return f.clone();
    }

    let mut interrupted = failures.iter().filter(|f| f.interrupted);
    if let Some(first) = interrupted.next() {
        let chosen = std::iter::once(first)
            .chain(interrupted)
            .find(|f| f.kind == preferred)
            .unwrap_or(first);
        return chosen.clone();
    }

    let not_found = failures
        .iter()
        .find(|f| f.error.category() == ErrorCategory::NotFound);
    if let Some(not_found) = not_found {
        if failures.len() > 1 {
            return Failure::settled(
                preferred,
                ResolveError::NotFoundInEither {
                    reference: reference.id().to_string(),
                },
            );
        }
        return not_found.clone();
    }

    let fallback_failure = Failure::settled(
        preferred,
        ResolveError::Unknown {
            message: "resolution produced no outcome".to_string(),
        },
    );
    failures
        .iter()
        .find(|f| f.kind == preferred)
        .or_else(|| failures.first())
        .cloned()
        .unwrap_or(fallback_failure)
}

fn invalid_input(input: &str, error: ResolveError, started: Instant) -> UnifiedResult {
    UnifiedResult {
        reference: input.trim().to_string(),
        url: String::new(),
        is_valid: false,
        error_message: Some(error.to_string()),
        error_category: Some(error.category()),
        suggestion: Some(FORMAT_HINT.to_string()),
        kind: ResourceKind::Unknown,
        confidence: 0.0,
        strategy: None,
        source: EntrySource::Fallback,
        response_time_ms: elapsed_ms(started),
        alternatives: Vec::new(),
    }
}

fn elapsed_ms(started: Instant) -> u64 {
    started.elapsed().as_millis() as u64
}
