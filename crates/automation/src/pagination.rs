//! Generic cursor-pagination collector.
//!
//! Every paginated listing in the remote APIs follows the same protocol:
//! fetch a page for an optional cursor, get back items plus the next cursor
//! and a has-more flag. [`collect_all`] drains such a listing into a single
//! ordered `Vec`, preserving server page order. REST endpoints that paginate
//! by page number reuse the protocol by carrying the page number as the
//! cursor string.

use std::future::Future;

use crate::error::Result;

/// One page of a remote listing.
#[derive(Debug, Clone)]
pub struct Page<T> {
    pub items: Vec<T>,
    pub end_cursor: Option<String>,
    pub has_next_page: bool,
}

impl<T> Page<T> {
    /// A terminal page with no items, for endpoints that return nothing.
    #[must_use]
    pub fn empty() -> Self {
        Self {
            items: Vec::new(),
            end_cursor: None,
            has_next_page: false,
        }
    }
}

/// Drain a cursor-paginated listing into one ordered sequence.
///
/// Starts with no cursor and keeps fetching while the server reports more
/// pages. Any fetch error aborts the whole collection; no partial result is
/// returned. There is no page-count cap here; callers needing one must
/// impose it themselves.
///
/// # Errors
///
/// Propagates the first error returned by `fetch`.
pub async fn collect_all<T, F, Fut>(mut fetch: F) -> Result<Vec<T>>
where
    F: FnMut(Option<String>) -> Fut,
    Fut: Future<Output = Result<Page<T>>>,
{
    let mut items = Vec::new();
    let mut cursor: Option<String> = None;

    loop {
        let page = fetch(cursor.take()).await?;
        items.extend(page.items);

        if !page.has_next_page {
            break;
        }
        cursor = page.end_cursor;
    }

    Ok(items)
}
