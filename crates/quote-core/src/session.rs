//! Session-scoped memory of the last displayed quote

use std::sync::Arc;

use storage::KvStore;

use crate::error::Result;
use crate::quote::Quote;

/// Session key holding the last displayed quote
pub const LAST_VIEWED_KEY: &str = "lastViewedQuote";

/// Remembers which quote was shown last, for the current session only
///
/// Backed by a session store (see [`KvStore::session`]); nothing here
/// survives a restart.
pub struct LastViewed {
    session: Arc<KvStore>,
}

impl LastViewed {
    /// Create a tracker over a session store
    pub fn new(session: Arc<KvStore>) -> Self {
        Self { session }
    }

    /// Record `quote` as the last one displayed
    pub fn remember(&self, quote: &Quote) -> Result<()> {
        self.session.set(LAST_VIEWED_KEY, quote)?;
        Ok(())
    }

    /// The last displayed quote, if one was recorded and is still readable
    pub fn last_viewed(&self) -> Option<Quote> {
        match self.session.get::<Quote>(LAST_VIEWED_KEY) {
            Ok(quote) => quote.filter(Quote::is_valid),
            Err(e) => {
                tracing::debug!("Ignoring unreadable last viewed quote: {}", e);
                None
            }
        }
    }

    /// Forget the last displayed quote
    pub fn forget(&self) -> Result<()> {
        self.session.remove(LAST_VIEWED_KEY)?;
        Ok(())
    }
}
