//! Paginated fetcher: a sequential, self-throttling `startIndex` cursor walker

use std::iter::FusedIterator;
use std::time::Duration;

use nvdline_core::FetchError;

use crate::api::{Page, PageQuery, PageSource, TimeWindow};
use crate::feed::Feed;

/// Maximum `resultsPerPage` the NVD API accepts
pub const DEFAULT_PAGE_SIZE: u32 = 2000;

/// Fixed delay between two requests (public rate limit with an API key)
pub const DEFAULT_REQUEST_DELAY: Duration = Duration::from_secs(6);

/// Suspends the fetcher between requests
pub trait Pacer {
    fn pause(&mut self, delay: Duration);
}

impl<T: Pacer + ?Sized> Pacer for &mut T {
    fn pause(&mut self, delay: Duration) {
        (**self).pause(delay);
    }
}

/// Wall-clock pacing with `thread::sleep`
#[derive(Debug, Clone, Copy, Default)]
pub struct SleepPacer;

impl Pacer for SleepPacer {
    fn pause(&mut self, delay: Duration) {
        if !delay.is_zero() {
            log::debug!("Sleeping {delay:?} before next request");
            std::thread::sleep(delay);
        }
    }
}

/// Lazy, finite, non-restartable sequence of pages.
///
/// Yields `Err` at most once; the iterator is exhausted afterwards.
pub struct Paginator<S, P> {
    source: S,
    pacer: P,
    feed: Feed,
    page_size: u32,
    delay: Duration,
    window: Option<TimeWindow>,
    cursor: u64,
    requests: usize,
    done: bool,
}

impl<S: PageSource, P: Pacer> Paginator<S, P> {
    pub fn new(
        source: S,
        pacer: P,
        feed: Feed,
        page_size: u32,
        delay: Duration,
        window: Option<TimeWindow>,
    ) -> Self {
        Self {
            source,
            pacer,
            feed,
            page_size: page_size.max(1),
            delay,
            window,
            cursor: 0,
            requests: 0,
            done: false,
        }
    }

    /// Offset of the next request
    pub fn cursor(&self) -> u64 {
        self.cursor
    }

    /// Requests issued so far
    pub fn requests(&self) -> usize {
        self.requests
    }

    fn fetch_next(&mut self) -> Result<Option<Page>, FetchError> {
        if self.requests > 0 {
            self.pacer.pause(self.delay);
        }
        let query = PageQuery {
            start_index: self.cursor,
            results_per_page: self.page_size,
            window: self.window.clone(),
        };
        log::info!(
            "Fetching {} starting at index {}",
            self.feed,
            self.cursor
        );
        self.requests += 1;

        let Some(body) = self.source.fetch(&query)? else {
            log::debug!("Empty response body at index {}, stopping", self.cursor);
            return Ok(None);
        };
        let Some(page) = Page::from_body(self.feed, self.cursor, body) else {
            log::debug!("Empty JSON object at index {}, stopping", self.cursor);
            return Ok(None);
        };

        self.cursor += u64::from(self.page_size);
        if self.cursor >= page.total_results {
            self.done = true;
        }
        Ok(Some(page))
    }
}

impl<S: PageSource, P: Pacer> Iterator for Paginator<S, P> {
    type Item = Result<Page, FetchError>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.done {
            return None;
        }
        match self.fetch_next() {
            Ok(Some(page)) => Some(Ok(page)),
            Ok(None) => {
                self.done = true;
                None
            }
            Err(e) => {
                self.done = true;
                Some(Err(e))
            }
        }
    }
}

impl<S: PageSource, P: Pacer> FusedIterator for Paginator<S, P> {}
