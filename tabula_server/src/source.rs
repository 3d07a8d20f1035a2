//! A data source answering from memory after a simulated network delay

use std::{
    collections::VecDeque,
    sync::{Mutex, MutexGuard},
    time::Duration,
};

use log::debug;
use tabula_common::{
    fetch::{DataSource, FetchError, FetchFuture, FetchRequest, FetchResult},
    query::QueryState,
};

use crate::{
    distribution::{generate_distributions, Distribution, Mixer},
    table::{Searchable, TableStore},
};

#[derive(Debug, Clone)]
pub struct MockSourceOptions {
    /// Shortest simulated round trip
    pub latency_min: Duration,
    /// Longest simulated round trip
    pub latency_max: Duration,
    /// Seed for latency jitter
    pub seed: u64,
    /// Fail every n-th request, if set
    pub fail_every: Option<u32>,
}

impl Default for MockSourceOptions {
    fn default() -> Self {
        Self {
            latency_min: Duration::from_millis(150),
            latency_max: Duration::from_millis(600),
            seed: 0,
            fail_every: None,
        }
    }
}

impl MockSourceOptions {
    /// Answer immediately, never fail
    pub fn instant() -> Self {
        Self {
            latency_min: Duration::ZERO,
            latency_max: Duration::ZERO,
            ..Default::default()
        }
    }

    pub fn with_latency(latency: Duration) -> Self {
        Self {
            latency_min: latency,
            latency_max: latency,
            ..Default::default()
        }
    }
}

struct MockState {
    mixer: Mixer,
    served: u64,
    fail_next: u32,
    scripted: VecDeque<Duration>,
    log: Vec<QueryState>,
}

pub struct MockDataSource<R> {
    store: TableStore<R>,
    options: MockSourceOptions,
    state: Mutex<MockState>,
}

impl<R> std::fmt::Debug for MockDataSource<R> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MockDataSource")
            .field("options", &self.options)
            .finish()
    }
}

impl MockDataSource<Distribution> {
    /// A source serving `count` generated distributions
    pub fn distributions(count: usize, options: MockSourceOptions) -> Self {
        let rows = generate_distributions(count, options.seed);
        Self::new(TableStore::new(rows), options)
    }
}

impl<R: Searchable> MockDataSource<R> {
    pub fn new(store: TableStore<R>, options: MockSourceOptions) -> Self {
        Self {
            store,
            state: Mutex::new(MockState {
                mixer: Mixer::new(options.seed),
                served: 0,
                fail_next: 0,
                scripted: VecDeque::new(),
                log: Vec::new(),
            }),
            options,
        }
    }

    pub fn store(&self) -> &TableStore<R> {
        &self.store
    }

    fn state(&self) -> MutexGuard<'_, MockState> {
        self.state.lock().unwrap_or_else(|p| p.into_inner())
    }

    /// Make the next `n` requests fail
    pub fn fail_next(&self, n: u32) {
        self.state().fail_next = n;
    }

    /// Use these latencies, in order, for the next requests
    pub fn script_latencies<I>(&self, latencies: I)
    where
        I: IntoIterator<Item = Duration>,
    {
        self.state().scripted.extend(latencies);
    }

    /// Number of requests received so far
    pub fn request_count(&self) -> u64 {
        self.state().served
    }

    /// Every query received, in order
    pub fn requests(&self) -> Vec<QueryState> {
        self.state().log.clone()
    }

    fn plan(&self, query: &QueryState) -> (Duration, bool) {
        let mut state = self.state();

        state.served += 1;
        state.log.push(query.clone());

        let fail = if state.fail_next > 0 {
            state.fail_next -= 1;
            true
        } else {
            self.options
                .fail_every
                .is_some_and(|n| n > 0 && state.served % u64::from(n) == 0)
        };

        let latency = match state.scripted.pop_front() {
            Some(l) => l,
            None => {
                let min = self.options.latency_min;
                let max = self.options.latency_max.max(min);
                let spread = (max - min).as_millis() as u64;

                if spread == 0 {
                    min
                } else {
                    min + Duration::from_millis(state.mixer.next() % (spread + 1))
                }
            }
        };

        (latency, fail)
    }
}

impl<R: Searchable> DataSource for MockDataSource<R> {
    type Row = R;

    fn fetch(&self, request: FetchRequest) -> FetchFuture<R> {
        let (latency, fail) = self.plan(&request.query);

        debug!(
            "Serving {} in {} ms{}",
            request.query,
            latency.as_millis(),
            if fail { " (failing)" } else { "" }
        );

        // answering is idempotent, so it can happen before the delay
        let page = self.store.page(&request.query);
        let request_id = request.request_id;

        Box::pin(async move {
            if !latency.is_zero() {
                tokio::time::sleep(latency).await;
            }

            if fail {
                return Err(FetchError::Source(
                    "Simulated data source failure".to_string(),
                ));
            }

            Ok(FetchResult {
                items: page.items,
                total_count: page.total_count,
                pages_count: page.pages_count,
                resolved_page_index: page.page_index,
                request_id,
            })
        })
    }
}
