use std::sync::Arc;

use super::polls::{PollCarousel, PollHistory};
use super::posts::PostController;
use super::profile::{ProfileController, ProfileLoad};
use super::search::SearchController;
use super::state::PostSource;
use crate::api::SocialApi;
use crate::config::Timings;
use crate::logging::LogConfig;
use crate::log_debug;

/// Where a page ends up after its initial loads
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PageStatus {
    Ready,
    /// Signed-in user must create a profile first
    Onboarding,
    /// The page's primary data could not be loaded
    Failed(String),
}

/// Feed, poll carousel and search box, built once per visit
#[derive(Clone)]
pub struct HomePage {
    api: Arc<dyn SocialApi>,
    log_config: LogConfig,
    pub feed: PostController,
    pub polls: PollCarousel,
    pub search: SearchController,
}

impl HomePage {
    pub fn new(api: Arc<dyn SocialApi>, viewer_id: impl Into<String>, timings: Timings, log_config: LogConfig) -> Self {
        Self {
            feed: PostController::new(api.clone(), PostSource::Feed, viewer_id, timings.clone())
                .with_log_config(log_config.clone()),
            polls: PollCarousel::new(api.clone(), timings.clone()).with_log_config(log_config.clone()),
            search: SearchController::new(api.clone(), timings).with_log_config(log_config.clone()),
            api,
            log_config,
        }
    }

    /// Check the viewer has a profile, then load feed and polls side by side.
    ///
    /// A failed profile check does not block the page; only a missing profile does.
    pub async fn load(&self) -> PageStatus {
        match self.api.get_profile(None).await {
            Ok(None) => return PageStatus::Onboarding,
            Ok(Some(_)) => {}
            Err(e) => log::warn!("Error checking profile: {}", e),
        }

        let (feed, polls) = tokio::join!(self.feed.load(), self.polls.load());
        log_debug!(self.log_config, "home page loaded: feed={:?} polls={:?}", feed, polls);
        PageStatus::Ready
    }
}

/// A user's profile with their posts and poll votes
#[derive(Clone)]
pub struct ProfilePage {
    log_config: LogConfig,
    pub profile: ProfileController,
    pub posts: PostController,
    pub votes: PollHistory,
    pub search: SearchController,
}

impl ProfilePage {
    /// `user_id` of `None` opens the viewer's own profile
    pub fn new(
        api: Arc<dyn SocialApi>,
        viewer_id: impl Into<String>,
        user_id: Option<String>,
        timings: Timings,
        log_config: LogConfig,
    ) -> Self {
        let viewer_id = viewer_id.into();
        Self {
            profile: ProfileController::new(api.clone(), viewer_id.clone(), user_id.clone(), timings.clone())
                .with_log_config(log_config.clone()),
            posts: PostController::new(api.clone(), PostSource::User(user_id.clone()), viewer_id, timings.clone())
                .with_log_config(log_config.clone()),
            votes: PollHistory::new(api.clone(), user_id).with_log_config(log_config.clone()),
            search: SearchController::new(api, timings).with_log_config(log_config.clone()),
            log_config,
        }
    }

    /// Load the profile, then its posts and votes together.
    pub async fn load(&self) -> PageStatus {
        match self.profile.load().await {
            ProfileLoad::Ready(_) => {}
            ProfileLoad::Onboarding => return PageStatus::Onboarding,
            ProfileLoad::Failed(msg) => return PageStatus::Failed(msg),
        }

        let (posts, votes) = tokio::join!(self.posts.load(), self.votes.load());
        log_debug!(self.log_config, "profile page loaded: posts={:?} votes={:?}", posts, votes);
        PageStatus::Ready
    }
}
