//! Events published on the storefront bus.

use crate::state::FetchCategory;
use std::borrow::Cow;
use storefront_sync_core::{BusEvent, Notice, ReduceError};

/// Everything observers can subscribe to
///
/// Names are stable strings; use them with `on`, `join_on` and friends.
#[derive(Debug, Clone, PartialEq)]
pub enum StorefrontEvent {
    /// `query_changed`
    QueryChanged,
    /// `navigations_updated`
    NavigationsUpdated,
    /// `products_updated`
    ProductsUpdated,
    /// `more_products_added`
    MoreProductsAdded,
    /// `page_updated`
    PageUpdated,
    /// `sort_updated`
    SortUpdated,
    /// `collection_changed`
    CollectionChanged,
    /// `template_updated`
    TemplateUpdated,
    /// `redirect`, carrying the target
    Redirect(String),
    /// `details_updated`
    DetailsUpdated,
    /// `autocomplete_updated`
    AutocompleteUpdated,
    /// `autocomplete_products_updated`
    AutocompleteProductsUpdated,
    /// `recommendations_updated`
    RecommendationsUpdated,
    /// `past_purchases_updated`
    PastPurchasesUpdated,
    /// `ui_updated`, carrying the component tag
    UiUpdated {
        /// Component tag
        tag: String,
    },
    /// `personalization_updated`
    PersonalizationUpdated,
    /// `session_changed`
    SessionChanged,

    /// `fetch:<category>:start`
    FetchStarted(FetchCategory),
    /// `fetch:<category>:done`
    FetchDone(FetchCategory),

    /// `history_save`
    HistorySaved {
        /// Checkpoint kind
        kind: String,
    },
    /// `history_undo`
    HistoryUndone,
    /// `history_redo`
    HistoryRedone,
    /// `history_rewind`: an error response rolled back the last checkpoint
    HistoryRewound {
        /// Response kind
        kind: String,
        /// Failure message
        message: String,
    },

    /// `app:started`
    Started,
    /// `app:killed`
    Killed,

    /// `error:action`: a transition failed and was discarded
    ActionFailed {
        /// Command kind
        kind: String,
        /// Reducer error
        error: ReduceError,
    },
    /// `error:fetch_action`: an error-tagged response was applied
    FetchActionFailed {
        /// Response kind
        kind: String,
        /// Failure message
        message: String,
    },
    /// `error:bridge`: a service call failed
    BridgeFailed {
        /// Logical request name
        request: String,
        /// Service error
        message: String,
    },
}

impl BusEvent for StorefrontEvent {
    fn name(&self) -> Cow<'static, str> {
        Cow::Borrowed(match self {
            Self::QueryChanged => "query_changed",
            Self::NavigationsUpdated => "navigations_updated",
            Self::ProductsUpdated => "products_updated",
            Self::MoreProductsAdded => "more_products_added",
            Self::PageUpdated => "page_updated",
            Self::SortUpdated => "sort_updated",
            Self::CollectionChanged => "collection_changed",
            Self::TemplateUpdated => "template_updated",
            Self::Redirect(_) => "redirect",
            Self::DetailsUpdated => "details_updated",
            Self::AutocompleteUpdated => "autocomplete_updated",
            Self::AutocompleteProductsUpdated => "autocomplete_products_updated",
            Self::RecommendationsUpdated => "recommendations_updated",
            Self::PastPurchasesUpdated => "past_purchases_updated",
            Self::UiUpdated { .. } => "ui_updated",
            Self::PersonalizationUpdated => "personalization_updated",
            Self::SessionChanged => "session_changed",
            Self::FetchStarted(category) => return Cow::Owned(format!("fetch:{category}:start")),
            Self::FetchDone(category) => return Cow::Owned(format!("fetch:{category}:done")),
            Self::HistorySaved { .. } => "history_save",
            Self::HistoryUndone => "history_undo",
            Self::HistoryRedone => "history_redo",
            Self::HistoryRewound { .. } => "history_rewind",
            Self::Started => "app:started",
            Self::Killed => "app:killed",
            Self::ActionFailed { .. } => "error:action",
            Self::FetchActionFailed { .. } => "error:fetch_action",
            Self::BridgeFailed { .. } => "error:bridge",
        })
    }
}

impl From<Notice> for StorefrontEvent {
    fn from(notice: Notice) -> Self {
        match notice {
            Notice::Started => Self::Started,
            Notice::Killed => Self::Killed,
            Notice::Checkpoint { kind } => Self::HistorySaved { kind },
            Notice::Undone => Self::HistoryUndone,
            Notice::Redone => Self::HistoryRedone,
            Notice::ApplyFailed { kind, error } => Self::ActionFailed { kind, error },
            Notice::FetchFailed { kind, message } => Self::FetchActionFailed { kind, message },
            Notice::Rewound { kind, message } => Self::HistoryRewound { kind, message },
        }
    }
}
