use futures::stream::{self, StreamExt};
use serde_json::Value;
use tracing::{debug, warn};

use crate::config::MAX_PAGE_SIZE;
use crate::error::SyncError;
use crate::models::SyncStream;

use super::{FetchOptions, InvoiceSource, PageRequest};

/// Fetch every page of one collection.
///
/// Page 1 is fetched first to learn `totalCount`; the remaining pages are
/// requested with at most `options.concurrency` in flight and appended in
/// page order. A failed later page is logged and contributes no records.
/// Collections larger than `options.max_pages` pages are truncated.
/// Draft collections never carry a window.
pub async fn fetch_all_pages<S>(
    source: &S,
    stream: SyncStream,
    options: &FetchOptions,
) -> Result<Vec<Value>, SyncError>
where
    S: InvoiceSource + ?Sized,
{
    let page_size = options.page_size.clamp(1, MAX_PAGE_SIZE);
    let window = if stream.is_dated() { options.window } else { None };
    let request = |page: u32| PageRequest {
        page,
        page_size,
        sort: options.sort.clone(),
        window,
        extra_filters: options.extra_filters.clone(),
    };

    let first = source.fetch_page(stream, &request(1)).await?;
    let total = first.total_count;
    let mut records = first.records;

    let pages = total.div_ceil(u64::from(page_size));
    if pages <= 1 {
        return Ok(records);
    }
    let max_pages = options.max_pages.max(1);
    let last_page = match u32::try_from(pages) {
        Ok(pages) if pages <= max_pages => pages,
        _ => {
            warn!(%stream, total, pages, max_pages, "collection exceeds page limit; truncating");
            max_pages
        }
    };
    if last_page <= 1 {
        return Ok(records);
    }
    debug!(%stream, total, pages = last_page, "fetching remaining pages");

    let mut results = stream::iter(2..=last_page)
        .map(|page| {
            let req = request(page);
            async move { (page, source.fetch_page(stream, &req).await) }
        })
        .buffered(options.concurrency.max(1));

    while let Some((page, result)) = results.next().await {
        match result {
            Ok(page) => records.extend(page.records),
            Err(err) => {
                warn!(%stream, page, error = %err, "page fetch failed; continuing")
            }
        }
    }

    if (records.len() as u64) < total {
        debug!(%stream, total, received = records.len(), "collection fetched partially");
    }
    Ok(records)
}
