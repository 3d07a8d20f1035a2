//! Issues fetches and decides which replies are allowed to land.
//!
//! Every issued query gets a fresh [RequestId]. Replies travel back over a
//! channel tagged with that id, and only the reply matching the most recent
//! request is published. Older requests are never cancelled; their replies
//! are dropped on arrival.

use std::{collections::HashMap, time::Duration};

use log::{debug, warn};
use tabula_common::{
    fetch::{DataSource, FetchError, FetchRequest, FetchResult},
    ids::RequestId,
    query::QueryState,
};
use tokio::sync::mpsc;

#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub enum FetchPhase {
    #[default]
    Idle,
    Loading,
    Resolved,
    Failed,
}

/// A finished fetch, successful or not
#[derive(Debug)]
pub struct Completion<R> {
    pub request_id: RequestId,
    pub query: QueryState,
    pub outcome: Result<FetchResult<R>, FetchError>,
}

/// What applying a completion did
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Applied {
    /// The reply was current and is now visible
    Published,
    /// The current request failed
    Failed(FetchError),
    /// The reply belongs to a superseded request and was dropped
    Stale,
}

#[derive(Debug, Clone)]
struct ActiveRequest {
    id: RequestId,
    query: QueryState,
}

pub struct FetchOrchestrator<S: DataSource> {
    source: S,
    timeout: Option<Duration>,

    phase: FetchPhase,
    active: Option<ActiveRequest>,
    result: Option<FetchResult<S::Row>>,
    resolved_page_index: Option<u32>,
    error: Option<FetchError>,

    in_flight: HashMap<RequestId, QueryState>,
    completions_tx: mpsc::UnboundedSender<Completion<S::Row>>,
    completions_rx: mpsc::UnboundedReceiver<Completion<S::Row>>,
}

impl<S: DataSource> std::fmt::Debug for FetchOrchestrator<S> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FetchOrchestrator")
            .field("phase", &self.phase)
            .field("active", &self.active)
            .field("in_flight", &self.in_flight.len())
            .finish()
    }
}

impl<S: DataSource> FetchOrchestrator<S> {
    pub fn new(source: S, timeout: Option<Duration>) -> Self {
        let (completions_tx, completions_rx) = mpsc::unbounded_channel();

        Self {
            source,
            timeout,
            phase: FetchPhase::Idle,
            active: None,
            result: None,
            resolved_page_index: None,
            error: None,
            in_flight: HashMap::new(),
            completions_tx,
            completions_rx,
        }
    }

    pub fn source(&self) -> &S {
        &self.source
    }

    pub fn phase(&self) -> FetchPhase {
        self.phase
    }

    pub fn is_loading(&self) -> bool {
        self.phase == FetchPhase::Loading
    }

    /// The query whose reply will be published next
    pub fn active_query(&self) -> Option<&QueryState> {
        self.active.as_ref().map(|a| &a.query)
    }

    pub fn active_request(&self) -> Option<RequestId> {
        self.active.as_ref().map(|a| a.id)
    }

    /// Page index of the last published result. Survives failures.
    pub fn resolved_page_index(&self) -> Option<u32> {
        self.resolved_page_index
    }

    /// The last published result. Cleared when a fetch fails.
    pub fn result(&self) -> Option<&FetchResult<S::Row>> {
        self.result.as_ref()
    }

    pub fn error(&self) -> Option<&FetchError> {
        self.error.as_ref()
    }

    /// Number of requests issued whose replies have not been applied yet,
    /// superseded ones included
    pub fn in_flight(&self) -> usize {
        self.in_flight.len()
    }

    /// Start fetching `query`, superseding any earlier request.
    ///
    /// Must be called from within a tokio runtime.
    pub fn issue(&mut self, query: QueryState) -> RequestId {
        let id = RequestId::new();

        debug!("Issuing request {id}: {query}");

        if let Some(old) = &self.active {
            if self.in_flight.contains_key(&old.id) {
                debug!("Request {} superseded by {id}", old.id);
            }
        }

        self.active = Some(ActiveRequest {
            id,
            query: query.clone(),
        });
        self.phase = FetchPhase::Loading;
        self.in_flight.insert(id, query.clone());

        let request = FetchRequest {
            request_id: id,
            query: query.clone(),
        };

        let fetch = self.source.fetch(request);
        let timeout = self.timeout;
        let tx = self.completions_tx.clone();

        tokio::spawn(async move {
            let outcome = match timeout {
                Some(t) => tokio::time::timeout(t, fetch)
                    .await
                    .unwrap_or_else(|_| Err(timed_out(t))),
                None => fetch.await,
            };

            // the receiver only goes away with the orchestrator
            let _ = tx.send(Completion {
                request_id: id,
                query,
                outcome,
            });
        });

        id
    }

    /// Re-issue the active query, if there is one
    pub fn retry(&mut self) -> Option<RequestId> {
        let query = self.active.as_ref()?.query.clone();
        Some(self.issue(query))
    }

    /// Apply a completion, publishing it only if it answers the active
    /// request
    pub fn apply(&mut self, completion: Completion<S::Row>) -> Applied {
        self.in_flight.remove(&completion.request_id);

        let current = self
            .active
            .as_ref()
            .is_some_and(|a| a.id == completion.request_id);

        if !current {
            debug!(
                "Discarding stale reply {} for {}",
                completion.request_id, completion.query
            );
            return Applied::Stale;
        }

        match completion.outcome {
            Ok(mut result) => {
                if result.request_id != completion.request_id {
                    warn!(
                        "Data source answered {} with id {}",
                        completion.request_id, result.request_id
                    );
                    result.request_id = completion.request_id;
                }

                debug!(
                    "Request {} resolved: {} items, page {}/{}",
                    completion.request_id,
                    result.items.len(),
                    result.resolved_page_index,
                    result.pages_count
                );

                self.phase = FetchPhase::Resolved;
                self.error = None;
                self.resolved_page_index = Some(result.resolved_page_index);
                self.result = Some(result);
                Applied::Published
            }
            Err(e) => {
                warn!("Request {} failed: {e}", completion.request_id);

                self.phase = FetchPhase::Failed;
                self.result = None;
                self.error = Some(e.clone());
                Applied::Failed(e)
            }
        }
    }

    /// Wait for the next completion, in arrival order
    pub async fn next_completion(&mut self) -> Completion<S::Row> {
        match self.completions_rx.recv().await {
            Some(c) => c,
            // we hold a sender, so this never closes
            None => std::future::pending().await,
        }
    }

    /// Take a completion if one has already arrived
    pub fn try_next_completion(&mut self) -> Option<Completion<S::Row>> {
        self.completions_rx.try_recv().ok()
    }
}

fn timed_out(after: Duration) -> FetchError {
    FetchError::Timeout(u64::try_from(after.as_millis()).unwrap_or(u64::MAX))
}
