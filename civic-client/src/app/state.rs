use std::collections::HashMap;

use civic_types::{PoliticalAlignment, Poll, PollAnswer, PollResults, PollVote, Post, Profile, ProfileSummary};
use tokio::task::JoinHandle;
use uuid::Uuid;

/// What a controller operation ended up doing
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Outcome {
    /// Request sent and accepted, local state reconciled
    Applied,
    /// Rejected before sending; a validation notice explains why
    Invalid,
    /// Request sent and rejected; local state reverted, error notice set
    Failed,
    /// Nothing to do: guard tripped, entity gone, or user backed out
    Skipped,
}

/// Short message shown next to the control that triggered it
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Notice {
    Validation(String),
    Error(String),
    Success(String),
    Info(String),
}

impl Notice {
    pub fn message(&self) -> &str {
        match self {
            Notice::Validation(msg) | Notice::Error(msg) | Notice::Success(msg) | Notice::Info(msg) => msg,
        }
    }

    pub fn is_error(&self) -> bool {
        matches!(self, Notice::Validation(_) | Notice::Error(_))
    }
}

// ============================================================================
// POSTS
// ============================================================================

/// Local lifecycle of one post row. Never sent to the server.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum ItemState {
    #[default]
    Viewing,
    Editing { draft: String },
    Saving { draft: String },
    Deleting,
}

impl ItemState {
    /// A request for this row is in flight
    pub fn is_busy(&self) -> bool {
        matches!(self, ItemState::Saving { .. } | ItemState::Deleting)
    }

    pub fn draft(&self) -> Option<&str> {
        match self {
            ItemState::Editing { draft } | ItemState::Saving { draft } => Some(draft),
            _ => None,
        }
    }
}

/// Which collection a post list mirrors
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PostSource {
    /// Everyone's posts
    Feed,
    /// One user's posts; `None` is the signed-in user
    User(Option<String>),
}

/// Post list state: fetched posts plus per-post UI state keyed by id
#[derive(Debug, Default)]
pub struct PostListState {
    pub posts: Vec<Post>,
    /// Rows missing from the map are `Viewing`
    pub items: HashMap<Uuid, ItemState>,
    pub loaded: bool,
    pub loading: bool,
    /// Initial load failure, shown in place of the list
    pub load_error: Option<String>,
    /// Composer text
    pub draft: String,
    pub creating: bool,
    pub notice: Option<Notice>,
    pub(crate) reload_issued: u64,
    pub(crate) reload_applied: u64,
}

impl PostListState {
    pub fn item_state(&self, post_id: Uuid) -> ItemState {
        self.items.get(&post_id).cloned().unwrap_or_default()
    }

    pub fn find(&self, post_id: Uuid) -> Option<&Post> {
        self.posts.iter().find(|p| p.post_id == post_id)
    }

    pub fn contains(&self, post_id: Uuid) -> bool {
        self.find(post_id).is_some()
    }

    pub(crate) fn set_item_state(&mut self, post_id: Uuid, state: ItemState) {
        if state == ItemState::Viewing {
            self.items.remove(&post_id);
        } else {
            self.items.insert(post_id, state);
        }
    }

    /// Swap in a fresh list. Open editors close, but rows with a request in
    /// flight stay busy as long as the post is still listed.
    pub(crate) fn replace_posts(&mut self, posts: Vec<Post>) {
        self.items
            .retain(|id, state| state.is_busy() && posts.iter().any(|p| p.post_id == *id));
        self.posts = posts;
    }

    /// Drop a post and its row state together
    pub(crate) fn remove(&mut self, post_id: Uuid) -> bool {
        let before = self.posts.len();
        self.posts.retain(|p| p.post_id != post_id);
        self.items.remove(&post_id);
        self.posts.len() != before
    }
}

// ============================================================================
// POLLS
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VoteState {
    Unvoted,
    VotingInFlight,
    Voted,
}

/// Cached results for one poll
#[derive(Debug, Clone, PartialEq)]
pub enum ResultsSlot {
    Loading,
    Ready(PollResults),
    Failed(String),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    Previous,
    Next,
}

impl Direction {
    pub fn offset(&self) -> isize {
        match self {
            Direction::Previous => -1,
            Direction::Next => 1,
        }
    }
}

#[derive(Debug, Default)]
pub struct PollsState {
    /// Fixed for the session once loaded
    pub polls: Vec<Poll>,
    pub index: usize,
    pub votes: HashMap<String, VoteState>,
    pub results: HashMap<String, ResultsSlot>,
    pub loaded: bool,
    pub loading: bool,
    pub load_error: Option<String>,
    /// Vote form of the current poll
    pub selection: Option<PollAnswer>,
    pub reason: String,
    pub notice: Option<Notice>,
    pub(crate) auto_advance: Option<JoinHandle<()>>,
}

impl PollsState {
    pub fn current(&self) -> Option<&Poll> {
        self.polls.get(self.index)
    }

    pub fn vote_state(&self, poll_id: &str) -> Option<VoteState> {
        self.votes.get(poll_id).copied()
    }

    pub fn has_pending_advance(&self) -> bool {
        self.auto_advance.as_ref().is_some_and(|h| !h.is_finished())
    }

    pub(crate) fn reset_form(&mut self) {
        self.selection = None;
        self.reason.clear();
    }
}

#[derive(Debug, Default)]
pub struct PollHistoryState {
    pub votes: Vec<PollVote>,
    pub loaded: bool,
    pub loading: bool,
    pub error: Option<String>,
}

// ============================================================================
// SEARCH
// ============================================================================

/// One dropdown entry
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProfileLink {
    pub user_id: String,
    pub label: String,
    pub href: String,
}

impl From<&ProfileSummary> for ProfileLink {
    fn from(profile: &ProfileSummary) -> Self {
        let label = if profile.profile_private {
            format!("{} 🔒", profile.display_name)
        } else {
            profile.display_name.clone()
        };
        Self {
            user_id: profile.user_id.clone(),
            label,
            href: format!("profile?user_id={}", urlencoding::encode(&profile.user_id)),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum DropdownContent {
    #[default]
    Empty,
    Searching,
    Results(Vec<ProfileLink>),
    NoResults,
    Failed(String),
}

#[derive(Debug, Default)]
pub struct SearchState {
    pub input: String,
    pub visible: bool,
    pub content: DropdownContent,
    pub last_query: Option<String>,
    pub(crate) pending: Option<JoinHandle<()>>,
    pub(crate) debounce_gen: u64,
    pub(crate) issued_seq: u64,
    pub(crate) rendered_seq: u64,
}

impl SearchState {
    pub fn has_pending_search(&self) -> bool {
        self.pending.as_ref().is_some_and(|h| !h.is_finished())
    }
}

// ============================================================================
// PROFILE
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum EditMode {
    #[default]
    Viewing,
    Editing,
}

/// Editable profile fields
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct ProfileForm {
    pub display_name: String,
    pub bio: String,
    pub political_alignment: PoliticalAlignment,
}

impl ProfileForm {
    pub fn from_profile(profile: &Profile) -> Self {
        Self {
            display_name: profile.display_name.clone(),
            bio: profile.bio.clone(),
            political_alignment: profile.political_alignment,
        }
    }

    pub fn differs_from(&self, profile: &Profile) -> bool {
        self.display_name != profile.display_name
            || self.bio != profile.bio
            || self.political_alignment != profile.political_alignment
    }
}

#[derive(Debug, Default)]
pub struct ProfileState {
    pub mode: EditMode,
    /// Last profile the server confirmed; what `cancel` rolls back to
    pub shadow: Option<Profile>,
    pub form: ProfileForm,
    pub saving: bool,
    pub loaded: bool,
    pub loading: bool,
    pub load_error: Option<String>,
    /// Signed-in user has no profile yet
    pub needs_onboarding: bool,
    pub notice: Option<Notice>,
    pub(crate) return_task: Option<JoinHandle<()>>,
}
