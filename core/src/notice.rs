//! Notices raised by the store itself rather than by reducers.
//!
//! Domain event types implement `From<Notice>` so the store can publish
//! lifecycle, history and error notifications on the same bus as region
//! updates.

use crate::reducer::ReduceError;

/// A store-level notification
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Notice {
    /// The store finished booting
    Started,
    /// The store was shut down
    Killed,
    /// A checkpoint pushed a history entry
    Checkpoint {
        /// Kind that created the entry
        kind: String,
    },
    /// The present stepped back one checkpoint
    Undone,
    /// The present stepped forward one checkpoint
    Redone,
    /// A transition failed and was discarded
    ApplyFailed {
        /// Kind whose reducers failed
        kind: String,
        /// Reducer failure
        error: ReduceError,
    },
    /// An error-tagged response was committed without rewinding
    FetchFailed {
        /// Response kind
        kind: String,
        /// Error carried by the response
        message: String,
    },
    /// An error-tagged response rewound the last checkpoint
    Rewound {
        /// Response kind
        kind: String,
        /// Error carried by the response
        message: String,
    },
}
