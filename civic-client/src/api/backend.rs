use async_trait::async_trait;
use civic_types::*;
use uuid::Uuid;

use super::ApiResult;

/// The remote operations the controllers depend on.
///
/// `ApiClient` talks to the real server; tests swap in an in-memory double.
/// Implementations do not retry; a rejected call is reported once.
#[async_trait]
pub trait SocialApi: Send + Sync {
    // Posts

    async fn create_post(&self, content: String) -> ApiResult<Post>;

    /// Global feed, newest first
    async fn get_feed(&self) -> ApiResult<Vec<Post>>;

    /// Posts by one user; `None` means the signed-in user
    async fn get_user_posts(&self, user_id: Option<String>) -> ApiResult<Vec<Post>>;

    async fn update_post(&self, post_id: Uuid, content: String) -> ApiResult<Post>;

    async fn delete_post(&self, post_id: Uuid) -> ApiResult<()>;

    // Polls

    async fn get_polls(&self) -> ApiResult<Vec<Poll>>;

    async fn vote_poll(
        &self,
        poll_id: String,
        answer: PollAnswer,
        reason: Option<String>,
    ) -> ApiResult<PollVote>;

    async fn get_poll_results(&self, poll_id: String) -> ApiResult<PollResults>;

    async fn get_user_poll_votes(&self, user_id: Option<String>) -> ApiResult<Vec<PollVote>>;

    // Profiles

    /// `Ok(None)` when the user has no profile yet
    async fn get_profile(&self, user_id: Option<String>) -> ApiResult<Option<Profile>>;

    async fn update_profile(&self, request: UpdateProfileRequest) -> ApiResult<Profile>;

    async fn search_profiles(&self, query: String) -> ApiResult<SearchProfilesResponse>;
}
