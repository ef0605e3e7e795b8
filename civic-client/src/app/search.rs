use std::sync::Arc;

use parking_lot::Mutex;

use super::state::{DropdownContent, Outcome, ProfileLink, SearchState};
use crate::api::SocialApi;
use crate::config::Timings;
use crate::logging::LogConfig;
use crate::{log_api_call, log_search};

pub const SEARCHING_MESSAGE: &str = "Searching...";
pub const NO_RESULTS_MESSAGE: &str = "No users found";
pub const SEARCH_FAILED_MESSAGE: &str = "Search failed. Please try again.";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SearchView {
    pub input: String,
    /// `None` while the dropdown is hidden
    pub dropdown: Option<DropdownContent>,
}

/// Profile search box with a debounced dropdown of matches.
#[derive(Clone)]
pub struct SearchController {
    api: Arc<dyn SocialApi>,
    timings: Timings,
    log_config: LogConfig,
    state: Arc<Mutex<SearchState>>,
}

impl SearchController {
    pub fn new(api: Arc<dyn SocialApi>, timings: Timings) -> Self {
        Self {
            api,
            timings,
            log_config: LogConfig::default(),
            state: Arc::new(Mutex::new(SearchState::default())),
        }
    }

    pub fn with_log_config(mut self, log_config: LogConfig) -> Self {
        self.log_config = log_config;
        self
    }

    pub fn with_state<R>(&self, f: impl FnOnce(&SearchState) -> R) -> R {
        f(&self.state.lock())
    }

    pub fn is_visible(&self) -> bool {
        self.state.lock().visible
    }

    pub fn content(&self) -> DropdownContent {
        self.state.lock().content.clone()
    }

    pub fn has_pending_search(&self) -> bool {
        self.state.lock().has_pending_search()
    }

    /// Handle one keystroke's worth of input.
    ///
    /// Each call restarts the quiet period; only the text still in the box
    /// when it elapses is searched.
    pub fn input(&self, text: impl Into<String>) {
        let text = text.into();
        let query = text.trim().to_string();

        let mut state = self.state.lock();
        state.input = text;
        state.debounce_gen += 1;
        if let Some(handle) = state.pending.take() {
            handle.abort();
        }

        if query.is_empty() {
            state.visible = false;
            return;
        }

        state.content = DropdownContent::Searching;
        state.visible = true;

        let generation = state.debounce_gen;
        let delay = self.timings.search_debounce();
        let controller = self.clone();
        log_search!(self.log_config, "scheduled search for {:?} (gen {})", query, generation);
        state.pending = Some(tokio::spawn(async move {
            tokio::time::sleep(delay).await;
            {
                let mut state = controller.state.lock();
                if state.debounce_gen != generation {
                    return;
                }
                // Past the timer: from here the request runs to completion
                state.pending = None;
            }
            controller.search(&query).await;
        }));
    }

    /// Search for the current input right away (Enter), skipping the quiet period.
    pub async fn submit(&self) -> Outcome {
        let query = {
            let mut state = self.state.lock();
            state.debounce_gen += 1;
            if let Some(handle) = state.pending.take() {
                handle.abort();
            }
            let query = state.input.trim().to_string();
            if query.is_empty() {
                state.visible = false;
                return Outcome::Skipped;
            }
            state.content = DropdownContent::Searching;
            state.visible = true;
            query
        };
        self.search(&query).await
    }

    /// Send one search and render its result unless a newer one already landed.
    pub async fn search(&self, query: &str) -> Outcome {
        let seq = {
            let mut state = self.state.lock();
            state.issued_seq += 1;
            state.last_query = Some(query.to_string());
            state.issued_seq
        };

        log_api_call!(self.log_config, "search profiles q={:?} seq={}", query, seq);
        let result = self.api.search_profiles(query.to_string()).await;

        let mut state = self.state.lock();
        if seq < state.rendered_seq {
            log_search!(self.log_config, "discarding stale response seq={} (rendered {})", seq, state.rendered_seq);
            return Outcome::Skipped;
        }
        state.rendered_seq = seq;

        match result {
            Ok(response) if response.profiles.is_empty() => {
                state.content = DropdownContent::NoResults;
                Outcome::Applied
            }
            Ok(response) => {
                state.content =
                    DropdownContent::Results(response.profiles.iter().map(ProfileLink::from).collect());
                Outcome::Applied
            }
            Err(e) => {
                log::warn!("Search error: {}", e);
                state.content = DropdownContent::Failed(SEARCH_FAILED_MESSAGE.to_string());
                Outcome::Failed
            }
        }
    }

    /// Hide the dropdown and clear the box. A search already scheduled still
    /// runs; it refreshes the hidden content only.
    pub fn escape(&self) {
        let mut state = self.state.lock();
        state.visible = false;
        state.input.clear();
    }

    pub fn click_outside(&self) {
        self.state.lock().visible = false;
    }

    pub fn view(&self) -> SearchView {
        let state = self.state.lock();
        SearchView {
            input: state.input.clone(),
            dropdown: state.visible.then(|| state.content.clone()),
        }
    }
}
