//! Marker-based pagination over bucket listings.
//!
//! A [`ListCursor`] owns the state of one listing chain: the request, the
//! current marker and the number of items handed out so far. Pages come out
//! strictly in order since each marker is derived from the previous page.

use crate::error::{AwsError, ResponseError};
use crate::request::Operation;
use crate::services::ObjectsService;
use crate::types::{ListBucketOutput, ListBucketRequest};
use futures::Stream;
use tracing::debug;

/// Cursor over the pages of a bucket listing.
///
/// Advancing takes `&mut self`, so a cursor has a single writer. Create one
/// with [`ObjectsService::list_pages`].
#[derive(Debug)]
pub struct ListCursor {
    service: ObjectsService,
    initial: ListBucketRequest,
    marker: Option<String>,
    max_items: Option<usize>,
    returned: usize,
    pages: usize,
    exhausted: bool,
}

impl ListCursor {
    /// Create a cursor starting at the marker of `request`.
    pub fn new(service: ObjectsService, request: ListBucketRequest) -> Self {
        Self {
            service,
            marker: request.marker.clone(),
            initial: request,
            max_items: None,
            returned: 0,
            pages: 0,
            exhausted: false,
        }
    }

    /// Stop after `max_items` items (entries plus common prefixes).
    pub fn with_max_items(mut self, max_items: usize) -> Self {
        self.max_items = Some(max_items);
        self
    }

    /// Whether the listing has ended.
    pub fn is_exhausted(&self) -> bool {
        self.exhausted
    }

    /// Items handed out so far.
    pub fn items_returned(&self) -> usize {
        self.returned
    }

    /// Pages fetched so far.
    pub fn pages_fetched(&self) -> usize {
        self.pages
    }

    /// Start over from the initial marker.
    pub fn reset(&mut self) {
        self.marker = self.initial.marker.clone();
        self.returned = 0;
        self.pages = 0;
        self.exhausted = false;
    }

    fn remaining(&self) -> Option<usize> {
        self.max_items.map(|cap| cap.saturating_sub(self.returned))
    }

    fn page_request(&self) -> ListBucketRequest {
        let mut request = self.initial.clone();
        request.marker = self.marker.clone();
        if let Some(remaining) = self.remaining() {
            let remaining = u32::try_from(remaining).unwrap_or(u32::MAX);
            request.max_keys = Some(match request.max_keys.filter(|&n| n > 0) {
                Some(page_size) => page_size.min(remaining),
                None => remaining,
            });
        }
        request
    }

    /// Fetch the next page, or `None` once the listing has ended.
    pub async fn next_page(&mut self) -> Result<Option<ListBucketOutput>, AwsError> {
        if self.exhausted {
            return Ok(None);
        }
        if self.remaining() == Some(0) {
            self.exhausted = true;
            return Ok(None);
        }

        let request = self.page_request();
        let page = self.service.list(&request).await?;
        self.pages += 1;
        self.returned += page.item_count();

        if page.is_truncated {
            let next = next_marker(&page).ok_or(ResponseError::MissingField {
                operation: Operation::ListBucket,
                field: "NextMarker",
            })?;
            if self.marker.as_deref() == Some(next.as_str()) {
                return Err(ResponseError::MissingField {
                    operation: Operation::ListBucket,
                    field: "NextMarker",
                }
                .into());
            }
            self.marker = Some(next);
        } else {
            self.exhausted = true;
        }
        if self.remaining() == Some(0) {
            self.exhausted = true;
        }

        debug!(
            page = self.pages,
            items = page.item_count(),
            marker = ?self.marker,
            exhausted = self.exhausted,
            "Fetched listing page"
        );
        Ok(Some(page))
    }

    /// Turn the cursor into a lazy stream of pages.
    pub fn into_stream(self) -> impl Stream<Item = Result<ListBucketOutput, AwsError>> {
        futures::stream::try_unfold(self, |mut cursor| async move {
            let page = cursor.next_page().await?;
            Ok::<_, AwsError>(page.map(|page| (page, cursor)))
        })
    }

    /// Fetch every remaining page and merge them into one listing.
    ///
    /// The merged result keeps the echo fields of the first page and the
    /// truncation state of the last.
    pub async fn collect_all(mut self) -> Result<ListBucketOutput, AwsError> {
        let mut merged: Option<ListBucketOutput> = None;
        while let Some(page) = self.next_page().await? {
            match merged.as_mut() {
                None => merged = Some(page),
                Some(all) => {
                    all.contents.extend(page.contents);
                    all.common_prefixes.extend(page.common_prefixes);
                    all.is_truncated = page.is_truncated;
                    all.next_marker = page.next_marker;
                    all.request_id = page.request_id;
                    all.host_id = page.host_id;
                    all.date = page.date;
                }
            }
        }
        Ok(merged.unwrap_or_else(|| ListBucketOutput {
            bucket: self.initial.bucket.clone(),
            prefix: self.initial.prefix.clone(),
            marker: self.initial.marker.clone(),
            delimiter: self.initial.delimiter.clone(),
            ..Default::default()
        }))
    }
}

/// The marker that continues after `page`.
///
/// Prefers the service's `NextMarker`. Without one, the greater of the last
/// key and the last common prefix is used, since both sort in key order.
pub fn next_marker(page: &ListBucketOutput) -> Option<String> {
    if let Some(marker) = page.next_marker.as_ref().filter(|m| !m.is_empty()) {
        return Some(marker.clone());
    }
    let last_key = page.contents.last().map(|entry| entry.key.as_str());
    let last_prefix = page.common_prefixes.last().map(String::as_str);
    last_key.max(last_prefix).map(str::to_string)
}
