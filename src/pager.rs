use crate::api::Page;
use crate::client::PageSource;
use crate::error::FetchError;
use crate::retry::{RetryPolicy, with_retry};
use std::collections::HashSet;
use std::time::Duration;

/// Lazy sequence of pages, starting at an optional cursor and ending when the
/// service stops handing out cursors.
///
/// The iterator ends after the first error; an empty page also ends it.
pub struct Pages<'a, S: PageSource> {
    source: &'a S,
    retry: RetryPolicy,
    delay: Duration,
    cursor: Option<String>,
    seen: HashSet<String>,
    fetched: usize,
    requested: usize,
    done: bool,
}

impl<'a, S: PageSource> Pages<'a, S> {
    pub fn new(source: &'a S, start: Option<String>, retry: RetryPolicy, delay: Duration) -> Self {
        let mut seen = HashSet::new();
        if let Some(c) = &start {
            seen.insert(c.clone());
        }
        Self {
            source,
            retry,
            delay,
            cursor: start,
            seen,
            fetched: 0,
            requested: 0,
            done: false,
        }
    }

    /// Pages successfully fetched so far.
    pub fn fetched(&self) -> usize {
        self.fetched
    }

    /// Number of the page most recently requested. After an error, the page that failed.
    pub fn requested(&self) -> usize {
        self.requested
    }

    fn advance(&mut self, page: &Page) -> Result<(), FetchError> {
        if page.lifelogs.is_empty() {
            tracing::debug!(page = self.fetched, "Empty page, stopping");
            self.done = true;
            return Ok(());
        }
        match &page.next_cursor {
            None => {
                tracing::debug!(page = self.fetched, "No next cursor, stopping");
                self.done = true;
            }
            Some(next) => {
                if !self.seen.insert(next.clone()) {
                    return Err(FetchError::Malformed {
                        page: self.fetched,
                        detail: format!("cursor {next:?} was already requested earlier in this run"),
                    });
                }
                self.cursor = Some(next.clone());
            }
        }
        Ok(())
    }
}

impl<S: PageSource> Iterator for Pages<'_, S> {
    type Item = Result<Page, FetchError>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.done {
            return None;
        }
        if self.fetched > 0 && !self.delay.is_zero() {
            std::thread::sleep(self.delay);
        }

        let number = self.fetched + 1;
        self.requested = number;
        let source = self.source;
        let cursor = self.cursor.as_deref();
        let result = with_retry(&self.retry, |_| source.fetch_page(number, cursor));

        let page = match result {
            Ok(page) => page,
            Err(e) => {
                self.done = true;
                return Some(Err(e));
            }
        };
        self.fetched = number;

        if let Err(e) = self.advance(&page) {
            self.done = true;
            return Some(Err(e));
        }
        Some(Ok(page))
    }
}
