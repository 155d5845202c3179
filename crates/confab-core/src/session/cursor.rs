//! Backward pagination cursor.

use chrono::{DateTime, Utc};

/// Position of the history pager within the active conversation.
///
/// `oldest` is the creation time of the oldest loaded message and is used as
/// the `before` bound of the next page. It only ever moves backward, and only
/// when a full page came back; a short page ends the history for the current
/// load session.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PaginationCursor {
    oldest: Option<DateTime<Utc>>,
    has_more: bool,
}

impl Default for PaginationCursor {
    fn default() -> Self {
        Self {
            oldest: None,
            has_more: true,
        }
    }
}

impl PaginationCursor {
    pub fn oldest(&self) -> Option<DateTime<Utc>> {
        self.oldest
    }

    /// Whether older history may still exist.
    pub fn has_more(&self) -> bool {
        self.has_more
    }

    /// Clears the cursor for a new load session.
    pub fn reset(&mut self) {
        *self = Self::default();
    }

    /// Applies the outcome of a page fetch.
    ///
    /// # Arguments
    ///
    /// * `page_oldest` - creation time of the oldest message in the page
    /// * `returned` - number of messages the page held
    /// * `page_size` - the requested limit
    pub fn advance(&mut self, page_oldest: Option<DateTime<Utc>>, returned: usize, page_size: usize) {
        if returned < page_size {
            self.has_more = false;
            return;
        }

        if let Some(candidate) = page_oldest {
            match self.oldest {
                Some(current) if candidate >= current => {}
                _ => self.oldest = Some(candidate),
            }
        }
    }
}
