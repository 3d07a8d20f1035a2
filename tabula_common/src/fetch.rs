//! Request and reply types exchanged with a data source

use serde::{Deserialize, Serialize};

use crate::{
    ids::{RequestId, RowId},
    query::QueryState,
};

/// A record that can be shown in a table.
///
/// Identity is by [RowId] only; two rows with the same id are the same row
/// even if their contents differ between fetches.
pub trait Row: Clone + Send + Sync + 'static {
    fn id(&self) -> RowId;
}

/// A request for one page of data
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FetchRequest {
    pub request_id: RequestId,
    pub query: QueryState,
}

/// One page of data, as answered by a data source.
///
/// `resolved_page_index` is the page the source actually served, which can
/// differ from the requested page when the request was out of range.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FetchResult<R> {
    pub items: Vec<R>,
    pub total_count: u64,
    pub pages_count: u32,
    pub resolved_page_index: u32,
    pub request_id: RequestId,
}

impl<R: Row> FetchResult<R> {
    /// Identities of the returned items, in order
    pub fn ids(&self) -> impl Iterator<Item = RowId> + '_ {
        self.items.iter().map(|r| r.id())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum FetchError {
    #[error("Data source error: {0}")]
    Source(String),
    #[error("Fetch timed out after {0} ms")]
    Timeout(u64),
    #[error("Fetch task was dropped while in progress")]
    Dropped,
}

/// Future answered by a [DataSource]
pub type FetchFuture<R> =
    futures_util::future::BoxFuture<'static, Result<FetchResult<R>, FetchError>>;

/// Something that can answer page requests.
///
/// Implementations must be idempotent and free of side effects for identical
/// queries, so the same request can be re-issued safely.
pub trait DataSource: Send + Sync + 'static {
    type Row: Row;

    /// Start fetching a page. The returned future must echo the request id.
    fn fetch(&self, request: FetchRequest) -> FetchFuture<Self::Row>;
}

impl<T: DataSource> DataSource for std::sync::Arc<T> {
    type Row = T::Row;

    fn fetch(&self, request: FetchRequest) -> FetchFuture<Self::Row> {
        (**self).fetch(request)
    }
}
