use std::sync::Arc;

use civic_types::{Post, MAX_POST_CHARS};
use parking_lot::Mutex;
use uuid::Uuid;

use super::state::{ItemState, Notice, Outcome, PostListState, PostSource};
use super::validation::{char_count, validate_post_content};
use crate::api::SocialApi;
use crate::config::Timings;
use crate::logging::LogConfig;
use crate::ui::formatting::format_timestamp;
use crate::{log_api_call, log_posts};

pub const DELETE_PROMPT: &str = "Are you sure you want to delete this post?";
pub const EMPTY_FEED_MESSAGE: &str = "No posts yet. Be the first to share something!";

/// A control bound to one post row
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PostAction {
    Edit(Uuid),
    CancelEdit(Uuid),
    SaveEdit(Uuid),
    Delete(Uuid),
}

impl PostAction {
    pub fn post_id(&self) -> Uuid {
        match self {
            PostAction::Edit(id)
            | PostAction::CancelEdit(id)
            | PostAction::SaveEdit(id)
            | PostAction::Delete(id) => *id,
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            PostAction::Edit(_) => "Edit",
            PostAction::CancelEdit(_) => "Cancel",
            PostAction::SaveEdit(_) => "Save",
            PostAction::Delete(_) => "Delete",
        }
    }
}

/// One rendered post, merged from the fetched record and its row state
#[derive(Debug, Clone)]
pub struct PostRow {
    pub post: Post,
    pub state: ItemState,
    pub owned: bool,
    pub edited: bool,
    pub timestamp: String,
    /// Controls to show for this row; empty while a request is in flight
    pub actions: Vec<PostAction>,
}

#[derive(Debug, Clone)]
pub enum PostListView {
    Loading,
    Error(String),
    Empty(&'static str),
    Rows(Vec<PostRow>),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ComposerView {
    pub draft: String,
    pub counter: String,
    pub submit_enabled: bool,
    pub submit_label: &'static str,
}

/// Keeps one post list (the global feed or one user's posts) in step with the server.
///
/// Cloning is cheap and every clone drives the same list, so the handle can be
/// given to each control that needs it.
#[derive(Clone)]
pub struct PostController {
    api: Arc<dyn SocialApi>,
    source: PostSource,
    viewer_id: String,
    timings: Timings,
    log_config: LogConfig,
    state: Arc<Mutex<PostListState>>,
}

impl PostController {
    pub fn new(
        api: Arc<dyn SocialApi>,
        source: PostSource,
        viewer_id: impl Into<String>,
        timings: Timings,
    ) -> Self {
        Self {
            api,
            source,
            viewer_id: viewer_id.into(),
            timings,
            log_config: LogConfig::default(),
            state: Arc::new(Mutex::new(PostListState::default())),
        }
    }

    pub fn with_log_config(mut self, log_config: LogConfig) -> Self {
        self.log_config = log_config;
        self
    }

    pub fn source(&self) -> &PostSource {
        &self.source
    }

    /// Read the current state without holding the lock past the closure
    pub fn with_state<R>(&self, f: impl FnOnce(&PostListState) -> R) -> R {
        f(&self.state.lock())
    }

    pub fn item_state(&self, post_id: Uuid) -> ItemState {
        self.state.lock().item_state(post_id)
    }

    pub fn notice(&self) -> Option<Notice> {
        self.state.lock().notice.clone()
    }

    /// Fetch the whole list. Successful reloads close open editors; rows
    /// saving or deleting keep their state.
    ///
    /// Overlapping reloads resolve last-issued-wins: a response older than the
    /// one already applied is dropped.
    pub async fn load(&self) -> Outcome {
        let seq = {
            let mut state = self.state.lock();
            state.loading = true;
            state.reload_issued += 1;
            state.reload_issued
        };

        log_api_call!(self.log_config, "load posts: source={:?} seq={}", self.source, seq);
        let result = match &self.source {
            PostSource::Feed => self.api.get_feed().await,
            PostSource::User(user_id) => self.api.get_user_posts(user_id.clone()).await,
        };

        let mut state = self.state.lock();
        if seq < state.reload_applied {
            log_posts!(self.log_config, "dropping stale reload seq={} (applied {})", seq, state.reload_applied);
            return Outcome::Skipped;
        }
        state.reload_applied = seq;
        state.loading = state.reload_applied < state.reload_issued;

        match result {
            Ok(posts) => {
                log_posts!(self.log_config, "reloaded {} posts", posts.len());
                state.replace_posts(posts);
                state.loaded = true;
                state.load_error = None;
                Outcome::Applied
            }
            Err(e) => {
                log::warn!("Failed to load posts: {}", e);
                if state.loaded {
                    state.notice = Some(Notice::Error(e.message()));
                } else {
                    state.load_error = Some(e.message());
                }
                Outcome::Failed
            }
        }
    }

    /// Update the composer text
    pub fn set_draft(&self, text: impl Into<String>) {
        self.state.lock().draft = text.into();
    }

    /// Post whatever is in the composer
    pub async fn submit_draft(&self) -> Outcome {
        let draft = self.state.lock().draft.clone();
        self.create(&draft).await
    }

    /// Create a post, then reload so the server decides where it lands.
    pub async fn create(&self, content: &str) -> Outcome {
        let content = content.trim().to_string();
        {
            let mut state = self.state.lock();
            if state.creating {
                return Outcome::Skipped;
            }
            if let Err(msg) = validate_post_content(&content) {
                state.notice = Some(Notice::Validation(msg));
                return Outcome::Invalid;
            }
            state.creating = true;
            state.notice = None;
        }

        log_api_call!(self.log_config, "create post: {} chars", char_count(&content));
        match self.api.create_post(content).await {
            Ok(post) => {
                {
                    let mut state = self.state.lock();
                    state.creating = false;
                    state.draft.clear();
                }
                log_posts!(self.log_config, "created post {}", post.post_id);
                self.load().await;
                Outcome::Applied
            }
            Err(e) => {
                let mut state = self.state.lock();
                state.creating = false;
                state.notice = Some(Notice::Error(e.message()));
                Outcome::Failed
            }
        }
    }

    /// Open the inline editor for one post
    pub fn edit(&self, post_id: Uuid) -> Outcome {
        let mut state = self.state.lock();
        let Some(content) = state
            .find(post_id)
            .filter(|p| p.user_id == self.viewer_id)
            .map(|p| p.content.clone())
        else {
            return Outcome::Skipped;
        };
        if state.item_state(post_id) != ItemState::Viewing {
            return Outcome::Skipped;
        }
        state.set_item_state(post_id, ItemState::Editing { draft: content });
        log_posts!(self.log_config, "editing {}", post_id);
        Outcome::Applied
    }

    /// Replace the unsaved text of a post being edited
    pub fn update_draft(&self, post_id: Uuid, text: impl Into<String>) {
        let mut state = self.state.lock();
        if let ItemState::Editing { .. } = state.item_state(post_id) {
            state.set_item_state(post_id, ItemState::Editing { draft: text.into() });
        }
    }

    pub fn cancel_edit(&self, post_id: Uuid) -> Outcome {
        let mut state = self.state.lock();
        match state.item_state(post_id) {
            ItemState::Editing { .. } => {
                state.set_item_state(post_id, ItemState::Viewing);
                Outcome::Applied
            }
            _ => Outcome::Skipped,
        }
    }

    /// Save an edit. On failure the row goes back to `Editing` with the text kept.
    pub async fn save_edit(&self, post_id: Uuid, new_content: &str) -> Outcome {
        let content = new_content.trim().to_string();
        {
            let mut state = self.state.lock();
            if !state.contains(post_id) {
                return Outcome::Skipped;
            }
            if !matches!(state.item_state(post_id), ItemState::Editing { .. }) {
                return Outcome::Skipped;
            }
            if let Err(msg) = validate_post_content(&content) {
                state.set_item_state(post_id, ItemState::Editing { draft: new_content.to_string() });
                state.notice = Some(Notice::Validation(msg));
                return Outcome::Invalid;
            }
            state.set_item_state(post_id, ItemState::Saving { draft: new_content.to_string() });
            state.notice = None;
        }

        log_api_call!(self.log_config, "update post {}", post_id);
        match self.api.update_post(post_id, content).await {
            Ok(updated) => {
                {
                    // Patch in place so the row is right even if the reload fails
                    let mut state = self.state.lock();
                    if let Some(post) = state.posts.iter_mut().find(|p| p.post_id == post_id) {
                        *post = updated;
                    }
                    state.set_item_state(post_id, ItemState::Viewing);
                }
                self.load().await;
                Outcome::Applied
            }
            Err(e) => {
                let mut state = self.state.lock();
                if state.contains(post_id) {
                    state.set_item_state(post_id, ItemState::Editing { draft: new_content.to_string() });
                }
                state.notice = Some(Notice::Error(e.message()));
                Outcome::Failed
            }
        }
    }

    /// Delete a post once `confirm` says yes.
    ///
    /// The row is disabled while the request runs. On success it stays visible
    /// for the delete transition, then leaves the list in a single step.
    pub async fn delete(&self, post_id: Uuid, confirm: impl FnOnce(&str) -> bool) -> Outcome {
        let previous = {
            let state = self.state.lock();
            if !state.find(post_id).is_some_and(|p| p.user_id == self.viewer_id) {
                return Outcome::Skipped;
            }
            let current = state.item_state(post_id);
            if current.is_busy() {
                return Outcome::Skipped;
            }
            current
        };

        if !confirm(DELETE_PROMPT) {
            return Outcome::Skipped;
        }

        {
            // Re-check: the list may have changed while the prompt was up
            let mut state = self.state.lock();
            if !state.contains(post_id) || state.item_state(post_id).is_busy() {
                return Outcome::Skipped;
            }
            state.set_item_state(post_id, ItemState::Deleting);
            state.notice = None;
        }

        log_api_call!(self.log_config, "delete post {}", post_id);
        match self.api.delete_post(post_id).await {
            Ok(()) => {
                tokio::time::sleep(self.timings.delete_transition()).await;
                let mut state = self.state.lock();
                state.remove(post_id);
                log_posts!(self.log_config, "removed {}, {} left", post_id, state.posts.len());
                Outcome::Applied
            }
            Err(e) => {
                let mut state = self.state.lock();
                if state.contains(post_id) {
                    state.set_item_state(post_id, previous);
                }
                state.notice = Some(Notice::Error(e.message()));
                Outcome::Failed
            }
        }
    }

    /// Run an action taken from a rendered row
    pub async fn dispatch(&self, action: PostAction, confirm: impl FnOnce(&str) -> bool) -> Outcome {
        match action {
            PostAction::Edit(id) => self.edit(id),
            PostAction::CancelEdit(id) => self.cancel_edit(id),
            PostAction::SaveEdit(id) => {
                let draft = self.item_state(id).draft().map(str::to_string);
                match draft {
                    Some(draft) => self.save_edit(id, &draft).await,
                    None => Outcome::Skipped,
                }
            }
            PostAction::Delete(id) => self.delete(id, confirm).await,
        }
    }

    pub fn view(&self) -> PostListView {
        let state = self.state.lock();

        if !state.loaded {
            return match &state.load_error {
                Some(err) => PostListView::Error(err.clone()),
                None => PostListView::Loading,
            };
        }
        if state.posts.is_empty() {
            return PostListView::Empty(EMPTY_FEED_MESSAGE);
        }

        let rows = state
            .posts
            .iter()
            .map(|post| {
                let item = state.item_state(post.post_id);
                // Ownership is re-derived on every render
                let owned = post.user_id == self.viewer_id;
                let actions = if !owned {
                    Vec::new()
                } else {
                    match item {
                        ItemState::Viewing => vec![PostAction::Edit(post.post_id), PostAction::Delete(post.post_id)],
                        ItemState::Editing { .. } => {
                            vec![PostAction::SaveEdit(post.post_id), PostAction::CancelEdit(post.post_id)]
                        }
                        ItemState::Saving { .. } | ItemState::Deleting => Vec::new(),
                    }
                };
                PostRow {
                    post: post.clone(),
                    edited: post.is_edited(),
                    timestamp: format_timestamp(&post.created_at),
                    state: item,
                    owned,
                    actions,
                }
            })
            .collect();

        PostListView::Rows(rows)
    }

    pub fn composer(&self) -> ComposerView {
        let state = self.state.lock();
        let count = char_count(&state.draft);
        ComposerView {
            draft: state.draft.clone(),
            counter: format!("{}/{}", count, MAX_POST_CHARS),
            submit_enabled: !state.creating && validate_post_content(&state.draft).is_ok(),
            submit_label: if state.creating { "Posting..." } else { "Post" },
        }
    }
}
