//! Upstream record sources and pagination.

use crate::error::FetchError;
use crate::ingest::RawRecord;
use crate::region::BoundingBox;
use crate::schema::SourceSchema;
use async_trait::async_trait;

/// Records per page requested from the open-data portal.
pub const DEFAULT_PAGE_SIZE: usize = 1000;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PageRequest {
    pub region: BoundingBox,
    pub offset: usize,
    pub limit: usize,
}

/// A paginated geographic data source.
#[async_trait]
pub trait RecordSource: Send + Sync {
    fn schema(&self) -> &'static SourceSchema;

    /// Fetches one page. A page shorter than `request.limit` means the
    /// source is exhausted.
    async fn fetch_page(&self, request: &PageRequest) -> Result<Vec<RawRecord>, FetchError>;
}

/// Pages through `source` until it is exhausted, or until `max_records`
/// have been collected. Any page failure fails the whole fetch.
pub async fn fetch_all(
    source: &dyn RecordSource,
    region: BoundingBox,
    page_size: usize,
    max_records: Option<usize>,
) -> Result<Vec<RawRecord>, FetchError> {
    let name = source.schema().name;
    let page_size = page_size.max(1);
    let mut records = Vec::new();
    let mut offset = 0;

    loop {
        let request = PageRequest {
            region,
            offset,
            limit: page_size,
        };
        tracing::debug!(source = name, offset, "Fetching page");
        let batch = source.fetch_page(&request).await?;
        let batch_len = batch.len();
        records.extend(batch);
        tracing::debug!(source = name, fetched = batch_len, total = records.len(), "Fetched page");

        if let Some(max) = max_records {
            if records.len() >= max {
                records.truncate(max);
                tracing::info!(source = name, limit = max, "Reached record limit");
                break;
            }
        }
        if batch_len < page_size {
            break;
        }
        offset += page_size;
    }

    tracing::info!(source = name, total = records.len(), "Fetched all records");
    Ok(records)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::BUILDINGS;
    use parking_lot::Mutex;
    use serde_json::json;

    struct Paged {
        total: usize,
        fail_at_offset: Option<usize>,
        requests: Mutex<Vec<PageRequest>>,
    }

    impl Paged {
        fn new(total: usize) -> Self {
            Self {
                total,
                fail_at_offset: None,
                requests: Mutex::new(Vec::new()),
            }
        }
    }

    #[async_trait]
    impl RecordSource for Paged {
        fn schema(&self) -> &'static SourceSchema {
            &BUILDINGS
        }

        async fn fetch_page(&self, request: &PageRequest) -> Result<Vec<RawRecord>, FetchError> {
            self.requests.lock().push(*request);
            if self.fail_at_offset == Some(request.offset) {
                return Err(FetchError::Status {
                    source_name: "buildings",
                    status: 503,
                });
            }
            let end = (request.offset + request.limit).min(self.total);
            Ok((request.offset..end)
                .map(|i| {
                    let mut record = RawRecord::new();
                    record.insert("struct_id".into(), json!(i.to_string()));
                    record
                })
                .collect())
        }
    }

    #[tokio::test]
    async fn pages_until_short_batch() {
        let source = Paged::new(25);
        let records = fetch_all(&source, BoundingBox::default(), 10, None).await.unwrap();
        assert_eq!(records.len(), 25);
        let offsets: Vec<_> = source.requests.lock().iter().map(|r| r.offset).collect();
        assert_eq!(offsets, vec![0, 10, 20]);
    }

    #[tokio::test]
    async fn exact_multiple_ends_on_empty_page() {
        let source = Paged::new(20);
        let records = fetch_all(&source, BoundingBox::default(), 10, None).await.unwrap();
        assert_eq!(records.len(), 20);
        assert_eq!(source.requests.lock().len(), 3);
    }

    #[tokio::test]
    async fn record_limit_truncates() {
        let source = Paged::new(100);
        let records = fetch_all(&source, BoundingBox::default(), 10, Some(15)).await.unwrap();
        assert_eq!(records.len(), 15);
        assert_eq!(source.requests.lock().len(), 2);
    }

    #[tokio::test]
    async fn record_limit_applies_to_a_short_last_page() {
        let source = Paged::new(7);
        let records = fetch_all(&source, BoundingBox::default(), 10, Some(5)).await.unwrap();
        assert_eq!(records.len(), 5);
        assert_eq!(source.requests.lock().len(), 1);

        let source = Paged::new(17);
        let records = fetch_all(&source, BoundingBox::default(), 10, Some(15)).await.unwrap();
        assert_eq!(records.len(), 15);
        assert_eq!(source.requests.lock().len(), 2);
    }

    #[tokio::test]
    async fn any_page_failure_fails_the_fetch() {
        let source = Paged {
            fail_at_offset: Some(10),
            ..Paged::new(100)
        };
        let err = fetch_all(&source, BoundingBox::default(), 10, None).await.unwrap_err();
        assert!(matches!(err, FetchError::Status { status: 503, .. }));
    }
}
