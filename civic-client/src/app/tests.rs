use super::*;
use crate::api::{ApiError, ApiResult, SocialApi};
use crate::config::Timings;
use async_trait::async_trait;
use chrono::{Duration as ChronoDuration, Utc};
use civic_types::*;
use parking_lot::Mutex;
use std::collections::{HashMap, HashSet, VecDeque};
use std::sync::Arc;
use std::time::Duration;
use tokio::time::sleep;
use uuid::Uuid;

const VIEWER: &str = "user-aroha";
const OTHER: &str = "user-tama";

/// In-memory backend that records every call and can be told to fail or stall.
#[derive(Default)]
struct MockApi {
    data: Mutex<MockData>,
    calls: Mutex<Vec<String>>,
    failures: Mutex<HashSet<&'static str>>,
    delays: Mutex<HashMap<&'static str, VecDeque<Duration>>>,
}

#[derive(Default)]
struct MockData {
    posts: Vec<Post>,
    polls: Vec<Poll>,
    results: HashMap<String, PollResults>,
    last_reason: Option<Option<String>>,
    profiles: HashMap<String, Profile>,
    directory: Vec<ProfileSummary>,
}

impl MockApi {
    fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    fn calls_to(&self, method: &str) -> usize {
        self.calls
            .lock()
            .iter()
            .filter(|c| c.split(':').next() == Some(method))
            .count()
    }

    fn calls(&self) -> Vec<String> {
        self.calls.lock().clone()
    }

    fn fail(&self, method: &'static str) {
        self.failures.lock().insert(method);
    }

    fn recover(&self, method: &'static str) {
        self.failures.lock().remove(method);
    }

    /// Stall the next call to `method` for `delay`
    fn delay_next(&self, method: &'static str, delay: Duration) {
        self.delays.lock().entry(method).or_default().push_back(delay);
    }

    async fn enter(&self, method: &'static str, detail: &str) -> ApiResult<()> {
        if detail.is_empty() {
            self.calls.lock().push(method.to_string());
        } else {
            self.calls.lock().push(format!("{}:{}", method, detail));
        }
        let delay = self.delays.lock().get_mut(method).and_then(|q| q.pop_front());
        if let Some(delay) = delay {
            sleep(delay).await;
        }
        if self.failures.lock().contains(method) {
            return Err(ApiError::Api(format!("{} is unavailable", method)));
        }
        Ok(())
    }
}

#[async_trait]
impl SocialApi for MockApi {
    async fn create_post(&self, content: String) -> ApiResult<Post> {
        self.enter("create_post", &content).await?;
        let created = post(VIEWER, &content);
        self.data.lock().posts.insert(0, created.clone());
        Ok(created)
    }

    async fn get_feed(&self) -> ApiResult<Vec<Post>> {
        self.enter("get_feed", "").await?;
        Ok(self.data.lock().posts.clone())
    }

    async fn get_user_posts(&self, user_id: Option<String>) -> ApiResult<Vec<Post>> {
        self.enter("get_user_posts", "").await?;
        let user_id = user_id.unwrap_or_else(|| VIEWER.to_string());
        Ok(self
            .data
            .lock()
            .posts
            .iter()
            .filter(|p| p.user_id == user_id)
            .cloned()
            .collect())
    }

    async fn update_post(&self, post_id: Uuid, content: String) -> ApiResult<Post> {
        self.enter("update_post", &content).await?;
        let mut data = self.data.lock();
        let post = data
            .posts
            .iter_mut()
            .find(|p| p.post_id == post_id)
            .ok_or_else(|| ApiError::NotFound("Post not found".to_string()))?;
        post.content = content;
        post.updated_at = post.created_at + ChronoDuration::seconds(1);
        Ok(post.clone())
    }

    async fn delete_post(&self, post_id: Uuid) -> ApiResult<()> {
        self.enter("delete_post", "").await?;
        self.data.lock().posts.retain(|p| p.post_id != post_id);
        Ok(())
    }

    async fn get_polls(&self) -> ApiResult<Vec<Poll>> {
        self.enter("get_polls", "").await?;
        Ok(self.data.lock().polls.clone())
    }

    async fn vote_poll(&self, poll_id: String, answer: PollAnswer, reason: Option<String>) -> ApiResult<PollVote> {
        self.enter("vote_poll", &poll_id).await?;
        let mut data = self.data.lock();
        data.last_reason = Some(reason.clone());

        let tally = data.results.entry(poll_id.clone()).or_insert(PollResults {
            poll_id: Some(poll_id.clone()),
            total_votes: 0,
            yes_votes: 0,
            no_votes: 0,
            yes_percentage: 0.0,
            no_percentage: 0.0,
        });
        tally.total_votes += 1;
        match answer {
            PollAnswer::Yes => tally.yes_votes += 1,
            PollAnswer::No => tally.no_votes += 1,
        }
        tally.yes_percentage = tally.yes_votes as f64 * 100.0 / tally.total_votes as f64;
        tally.no_percentage = tally.no_votes as f64 * 100.0 / tally.total_votes as f64;

        Ok(PollVote {
            poll_id,
            user_id: VIEWER.to_string(),
            display_name: "Aroha".to_string(),
            answer,
            reason,
            voted_at: Some(Utc::now()),
            question: None,
            info_text: None,
        })
    }

    async fn get_poll_results(&self, poll_id: String) -> ApiResult<PollResults> {
        self.enter("get_poll_results", &poll_id).await?;
        self.data
            .lock()
            .results
            .get(&poll_id)
            .cloned()
            .ok_or_else(|| ApiError::Forbidden("You must vote before viewing results".to_string()))
    }

    async fn get_user_poll_votes(&self, _user_id: Option<String>) -> ApiResult<Vec<PollVote>> {
        self.enter("get_user_poll_votes", "").await?;
        Ok(Vec::new())
    }

    async fn get_profile(&self, user_id: Option<String>) -> ApiResult<Option<Profile>> {
        self.enter("get_profile", "").await?;
        let user_id = user_id.unwrap_or_else(|| VIEWER.to_string());
        Ok(self.data.lock().profiles.get(&user_id).cloned())
    }

    async fn update_profile(&self, request: UpdateProfileRequest) -> ApiResult<Profile> {
        self.enter("update_profile", &request.display_name).await?;
        let mut data = self.data.lock();
        let profile = data
            .profiles
            .get_mut(VIEWER)
            .ok_or_else(|| ApiError::NotFound("Profile not found".to_string()))?;
        profile.display_name = request.display_name;
        profile.bio = request.bio;
        profile.political_alignment = request.political_alignment;
        profile.updated_at = Utc::now();
        Ok(profile.clone())
    }

    async fn search_profiles(&self, query: String) -> ApiResult<SearchProfilesResponse> {
        self.enter("search_profiles", &query).await?;
        let needle = query.to_lowercase();
        let profiles: Vec<ProfileSummary> = self
            .data
            .lock()
            .directory
            .iter()
            .filter(|p| p.display_name.to_lowercase().contains(&needle))
            .cloned()
            .collect();
        Ok(SearchProfilesResponse {
            count: Some(profiles.len()),
            profiles,
        })
    }
}

// ============================================================================
// FIXTURES
// ============================================================================

fn post(user_id: &str, content: &str) -> Post {
    let now = Utc::now();
    Post {
        post_id: Uuid::new_v4(),
        user_id: user_id.to_string(),
        display_name: user_id.trim_start_matches("user-").to_string(),
        content: content.to_string(),
        created_at: now,
        updated_at: now,
    }
}

fn poll(id: &str, has_voted: bool) -> Poll {
    Poll {
        poll_id: id.to_string(),
        question: format!("Question {}?", id),
        info_text: String::new(),
        options: vec!["Yes".to_string(), "No".to_string()],
        has_voted,
        user_vote: None,
    }
}

fn profile(user_id: &str, display_name: &str) -> Profile {
    let now = Utc::now();
    Profile {
        user_id: user_id.to_string(),
        display_name: display_name.to_string(),
        bio: "Kia ora".to_string(),
        political_alignment: PoliticalAlignment::Independent,
        profile_private: false,
        created_at: now,
        updated_at: now,
    }
}

fn feed_with(api: &Arc<MockApi>, posts: Vec<Post>) -> PostController {
    api.data.lock().posts = posts;
    PostController::new(api.clone(), PostSource::Feed, VIEWER, Timings::default())
}

fn carousel_with(api: &Arc<MockApi>, polls: Vec<Poll>, timings: Timings) -> PollCarousel {
    api.data.lock().polls = polls;
    PollCarousel::new(api.clone(), timings)
}

fn rows(controller: &PostController) -> Vec<PostRow> {
    match controller.view() {
        PostListView::Rows(rows) => rows,
        other => panic!("expected rows, got {:?}", other),
    }
}

// ============================================================================
// POSTS
// ============================================================================

#[tokio::test(start_paused = true)]
async fn test_create_rejects_empty_and_oversized_content() {
    let api = MockApi::new();
    let feed = feed_with(&api, Vec::new());
    feed.load().await;

    assert_eq!(feed.create("   ").await, Outcome::Invalid);
    assert!(matches!(feed.notice(), Some(Notice::Validation(_))));

    assert_eq!(feed.create(&"x".repeat(281)).await, Outcome::Invalid);
    assert_eq!(
        feed.notice().map(|n| n.message().to_string()),
        Some("Post exceeds 280 characters (current: 281)".to_string())
    );

    assert_eq!(api.calls_to("create_post"), 0, "No request for invalid content");
}

#[tokio::test(start_paused = true)]
async fn test_create_clears_draft_and_reloads() {
    let api = MockApi::new();
    let feed = feed_with(&api, vec![post(OTHER, "older")]);
    feed.load().await;

    feed.set_draft("  Hello world  ");
    assert!(feed.composer().submit_enabled);
    assert_eq!(feed.submit_draft().await, Outcome::Applied);

    assert_eq!(api.calls(), vec!["get_feed", "create_post:Hello world", "get_feed"]);
    assert_eq!(feed.composer().draft, "");
    let rows = rows(&feed);
    assert_eq!(rows[0].post.content, "Hello world");
    assert_eq!(rows[0].state, ItemState::Viewing);
}

#[tokio::test(start_paused = true)]
async fn test_create_failure_keeps_draft_and_reports() {
    let api = MockApi::new();
    let feed = feed_with(&api, Vec::new());
    feed.load().await;
    api.fail("create_post");

    feed.set_draft("Hello");
    assert_eq!(feed.submit_draft().await, Outcome::Failed);

    assert_eq!(feed.composer().draft, "Hello");
    assert!(feed.composer().submit_enabled, "Submit re-enabled after failure");
    assert_eq!(
        feed.notice(),
        Some(Notice::Error("create_post is unavailable".to_string()))
    );
    assert_eq!(api.calls_to("get_feed"), 1, "No reload after a failed create");
}

#[tokio::test(start_paused = true)]
async fn test_create_refuses_reentry_while_in_flight() {
    let api = MockApi::new();
    let feed = feed_with(&api, Vec::new());
    feed.load().await;
    api.delay_next("create_post", Duration::from_millis(200));

    let (first, second) = tokio::join!(feed.create("one"), feed.create("two"));

    assert_eq!(first, Outcome::Applied);
    assert_eq!(second, Outcome::Skipped);
    assert_eq!(api.calls_to("create_post"), 1);
}

#[tokio::test(start_paused = true)]
async fn test_edit_only_touches_target_post() {
    let api = MockApi::new();
    let a = post(VIEWER, "first");
    let b = post(VIEWER, "second");
    let feed = feed_with(&api, vec![a.clone(), b.clone()]);
    feed.load().await;

    assert_eq!(feed.edit(a.post_id), Outcome::Applied);

    assert_eq!(feed.item_state(a.post_id), ItemState::Editing { draft: "first".to_string() });
    assert_eq!(feed.item_state(b.post_id), ItemState::Viewing);

    feed.update_draft(a.post_id, "changed");
    assert_eq!(feed.cancel_edit(a.post_id), Outcome::Applied);
    assert_eq!(feed.item_state(a.post_id), ItemState::Viewing);
    assert_eq!(rows(&feed)[0].post.content, "first", "Cancel leaves content alone");
}

#[tokio::test(start_paused = true)]
async fn test_edit_unknown_post_is_silent() {
    let api = MockApi::new();
    let feed = feed_with(&api, Vec::new());
    feed.load().await;

    assert_eq!(feed.edit(Uuid::new_v4()), Outcome::Skipped);
    assert_eq!(feed.save_edit(Uuid::new_v4(), "text").await, Outcome::Skipped);
    assert_eq!(feed.notice(), None);
}

#[tokio::test(start_paused = true)]
async fn test_save_edit_invalid_keeps_editing_without_request() {
    let api = MockApi::new();
    let p = post(VIEWER, "original");
    let feed = feed_with(&api, vec![p.clone()]);
    feed.load().await;
    feed.edit(p.post_id);

    assert_eq!(feed.save_edit(p.post_id, "").await, Outcome::Invalid);

    assert_eq!(api.calls_to("update_post"), 0);
    assert!(matches!(feed.item_state(p.post_id), ItemState::Editing { .. }));
}

#[tokio::test(start_paused = true)]
async fn test_save_edit_success_marks_edited_and_resets() {
    let api = MockApi::new();
    let p = post(VIEWER, "Hello world");
    let feed = feed_with(&api, vec![p.clone()]);
    feed.load().await;
    feed.edit(p.post_id);
    feed.update_draft(p.post_id, "Hello world!");

    let outcome = feed
        .dispatch(PostAction::SaveEdit(p.post_id), |_| unreachable!("no prompt for save"))
        .await;

    assert_eq!(outcome, Outcome::Applied);
    assert_eq!(api.calls_to("update_post"), 1);
    let row = &rows(&feed)[0];
    assert_eq!(row.state, ItemState::Viewing);
    assert_eq!(row.post.content, "Hello world!");
    assert!(row.edited);
}

#[tokio::test(start_paused = true)]
async fn test_save_edit_failure_returns_to_editing_with_text() {
    let api = MockApi::new();
    let p = post(VIEWER, "before");
    let feed = feed_with(&api, vec![p.clone()]);
    feed.load().await;
    feed.edit(p.post_id);
    api.fail("update_post");

    assert_eq!(feed.save_edit(p.post_id, "after").await, Outcome::Failed);

    assert_eq!(feed.item_state(p.post_id), ItemState::Editing { draft: "after".to_string() });
    assert!(feed.notice().is_some_and(|n| n.is_error()));
}

#[tokio::test(start_paused = true)]
async fn test_saving_row_has_no_actions() {
    let api = MockApi::new();
    let p = post(VIEWER, "before");
    let feed = feed_with(&api, vec![p.clone()]);
    feed.load().await;
    feed.edit(p.post_id);
    api.delay_next("update_post", Duration::from_millis(500));

    let saving = feed.clone();
    let id = p.post_id;
    let task = tokio::spawn(async move { saving.save_edit(id, "after").await });
    sleep(Duration::from_millis(100)).await;

    let row = &rows(&feed)[0];
    assert!(matches!(row.state, ItemState::Saving { .. }));
    assert!(row.actions.is_empty(), "Controls disabled while saving");

    assert_eq!(task.await.unwrap(), Outcome::Applied);
}

#[tokio::test(start_paused = true)]
async fn test_delete_declined_sends_nothing() {
    let api = MockApi::new();
    let p = post(VIEWER, "keep me");
    let feed = feed_with(&api, vec![p.clone()]);
    feed.load().await;

    let mut prompt = String::new();
    let outcome = feed
        .delete(p.post_id, |msg| {
            prompt = msg.to_string();
            false
        })
        .await;

    assert_eq!(outcome, Outcome::Skipped);
    assert_eq!(prompt, "Are you sure you want to delete this post?");
    assert_eq!(api.calls_to("delete_post"), 0);
    assert!(feed.with_state(|s| s.contains(p.post_id)));
}

#[tokio::test(start_paused = true)]
async fn test_delete_removes_after_transition() {
    let api = MockApi::new();
    let p = post(VIEWER, "bye");
    let feed = feed_with(&api, vec![p.clone()]);
    feed.load().await;

    let deleting = feed.clone();
    let id = p.post_id;
    let task = tokio::spawn(async move { deleting.delete(id, |_| true).await });
    sleep(Duration::from_millis(100)).await;

    // Still visible, but disabled
    assert_eq!(feed.item_state(id), ItemState::Deleting);
    assert!(rows(&feed)[0].actions.is_empty());

    assert_eq!(task.await.unwrap(), Outcome::Applied);
    assert!(!feed.with_state(|s| s.contains(id)));
    assert!(matches!(feed.view(), PostListView::Empty(_)));
}

#[tokio::test(start_paused = true)]
async fn test_delete_failure_keeps_post_enabled() {
    let api = MockApi::new();
    let p = post(VIEWER, "stubborn");
    let feed = feed_with(&api, vec![p.clone()]);
    feed.load().await;
    api.fail("delete_post");

    assert_eq!(feed.delete(p.post_id, |_| true).await, Outcome::Failed);

    let row = &rows(&feed)[0];
    assert_eq!(row.state, ItemState::Viewing);
    assert_eq!(row.actions, vec![PostAction::Edit(p.post_id), PostAction::Delete(p.post_id)]);
}

#[tokio::test(start_paused = true)]
async fn test_only_own_posts_get_controls() {
    let api = MockApi::new();
    let mine = post(VIEWER, "mine");
    let theirs = post(OTHER, "theirs");
    let feed = feed_with(&api, vec![mine.clone(), theirs.clone()]);
    feed.load().await;

    let rows = rows(&feed);
    assert!(rows[0].owned);
    assert_eq!(rows[0].actions.len(), 2);
    assert!(!rows[1].owned);
    assert!(rows[1].actions.is_empty());
}

#[tokio::test(start_paused = true)]
async fn test_reload_resets_item_states() {
    let api = MockApi::new();
    let p = post(VIEWER, "text");
    let feed = feed_with(&api, vec![p.clone()]);
    feed.load().await;
    feed.edit(p.post_id);

    feed.load().await;

    assert_eq!(feed.item_state(p.post_id), ItemState::Viewing);
}

#[tokio::test(start_paused = true)]
async fn test_reload_keeps_deleting_row_busy() {
    let api = MockApi::new();
    let p = post(VIEWER, "bye");
    let feed = feed_with(&api, vec![p.clone()]);
    feed.load().await;
    api.delay_next("delete_post", Duration::from_secs(1));

    let deleting = feed.clone();
    let id = p.post_id;
    let task = tokio::spawn(async move { deleting.delete(id, |_| true).await });
    sleep(Duration::from_millis(100)).await;

    // A reload lands while the delete is still waiting on the server
    assert_eq!(feed.load().await, Outcome::Applied);
    let row = &rows(&feed)[0];
    assert_eq!(row.state, ItemState::Deleting);
    assert!(row.actions.is_empty(), "Reload must not re-enable a deleting row");

    assert_eq!(feed.delete(id, |_| true).await, Outcome::Skipped);
    assert_eq!(task.await.unwrap(), Outcome::Applied);
    assert_eq!(api.calls_to("delete_post"), 1);
}

#[tokio::test(start_paused = true)]
async fn test_reload_keeps_saving_row_busy() {
    let api = MockApi::new();
    let p = post(VIEWER, "before");
    let feed = feed_with(&api, vec![p.clone()]);
    feed.load().await;
    feed.edit(p.post_id);
    api.delay_next("update_post", Duration::from_secs(1));

    let saving = feed.clone();
    let id = p.post_id;
    let task = tokio::spawn(async move { saving.save_edit(id, "after").await });
    sleep(Duration::from_millis(100)).await;

    assert_eq!(feed.load().await, Outcome::Applied);
    let row = &rows(&feed)[0];
    assert_eq!(row.state, ItemState::Saving { draft: "after".to_string() });
    assert!(row.actions.is_empty(), "Reload must not re-enable a saving row");

    assert_eq!(feed.edit(id), Outcome::Skipped);
    assert_eq!(feed.dispatch(PostAction::SaveEdit(id), |_| true).await, Outcome::Skipped);
    assert_eq!(task.await.unwrap(), Outcome::Applied);
    assert_eq!(api.calls_to("update_post"), 1);
    assert_eq!(feed.item_state(id), ItemState::Viewing);
}

#[tokio::test(start_paused = true)]
async fn test_other_users_post_cannot_be_changed() {
    let api = MockApi::new();
    let theirs = post(OTHER, "theirs");
    let feed = feed_with(&api, vec![theirs.clone()]);
    feed.load().await;
    let id = theirs.post_id;

    assert_eq!(feed.edit(id), Outcome::Skipped);
    assert_eq!(feed.delete(id, |_| true).await, Outcome::Skipped);
    assert_eq!(feed.dispatch(PostAction::Delete(id), |_| true).await, Outcome::Skipped);

    assert_eq!(feed.item_state(id), ItemState::Viewing);
    assert_eq!(api.calls_to("delete_post"), 0);
    assert_eq!(api.calls_to("update_post"), 0);
}

#[tokio::test(start_paused = true)]
async fn test_stale_reload_is_dropped() {
    let api = MockApi::new();
    let feed = feed_with(&api, vec![post(OTHER, "old")]);
    api.delay_next("get_feed", Duration::from_millis(500));

    let slow = feed.clone();
    let task = tokio::spawn(async move { slow.load().await });
    sleep(Duration::from_millis(10)).await;

    api.data.lock().posts.insert(0, post(OTHER, "new"));
    assert_eq!(feed.load().await, Outcome::Applied);

    assert_eq!(task.await.unwrap(), Outcome::Skipped);
    assert_eq!(rows(&feed).len(), 2, "Older response must not overwrite newer");
}

#[tokio::test(start_paused = true)]
async fn test_initial_load_failure_is_page_level() {
    let api = MockApi::new();
    let feed = feed_with(&api, Vec::new());
    api.fail("get_feed");

    assert_eq!(feed.load().await, Outcome::Failed);
    assert!(matches!(feed.view(), PostListView::Error(_)));

    api.recover("get_feed");
    feed.load().await;
    api.fail("get_feed");
    feed.load().await;
    assert!(matches!(feed.view(), PostListView::Empty(_)), "Later failures keep the list");
    assert!(feed.notice().is_some());
}

// ============================================================================
// POLLS
// ============================================================================

fn card(carousel: &PollCarousel) -> PollCard {
    match carousel.view() {
        PollsView::Card(card) => card,
        other => panic!("expected a poll card, got {:?}", other),
    }
}

#[tokio::test(start_paused = true)]
async fn test_vote_requires_answer() {
    let api = MockApi::new();
    let carousel = carousel_with(&api, vec![poll("p1", false)], Timings::default());
    carousel.load().await;

    assert_eq!(carousel.submit().await, Outcome::Invalid);
    assert_eq!(
        carousel.notice(),
        Some(Notice::Validation("Please select an answer".to_string()))
    );
    assert_eq!(api.calls_to("vote_poll"), 0);
    assert!(matches!(card(&carousel).body, PollBody::VoteForm { submit_enabled: false, .. }));
}

#[tokio::test(start_paused = true)]
async fn test_vote_shows_results() {
    let api = MockApi::new();
    let carousel = carousel_with(&api, vec![poll("p1", false)], Timings::default());
    carousel.load().await;

    carousel.select_answer(PollAnswer::Yes);
    carousel.set_reason("   ");
    assert_eq!(carousel.submit().await, Outcome::Applied);

    assert_eq!(carousel.vote_state("p1"), Some(VoteState::Voted));
    assert_eq!(api.data.lock().last_reason, Some(None), "Blank reason is omitted");
    match card(&carousel).body {
        PollBody::Results(results) => {
            assert_eq!(results.yes, "100%");
            assert_eq!(results.no, "0%");
            assert_eq!(results.total, "1 vote");
        }
        other => panic!("expected results, got {:?}", other),
    }
}

#[tokio::test(start_paused = true)]
async fn test_vote_reason_limit() {
    let api = MockApi::new();
    let carousel = carousel_with(&api, vec![poll("p1", false)], Timings::default());
    carousel.load().await;

    let outcome = carousel.vote("p1", Some(PollAnswer::No), Some(&"r".repeat(281))).await;

    assert_eq!(outcome, Outcome::Invalid);
    assert_eq!(carousel.vote_state("p1"), Some(VoteState::Unvoted));
    assert_eq!(api.calls_to("vote_poll"), 0);
}

#[tokio::test(start_paused = true)]
async fn test_vote_failure_returns_to_unvoted() {
    let api = MockApi::new();
    let carousel = carousel_with(&api, vec![poll("p1", false)], Timings::default());
    carousel.load().await;
    api.fail("vote_poll");

    assert_eq!(carousel.vote("p1", Some(PollAnswer::Yes), None).await, Outcome::Failed);

    assert_eq!(carousel.vote_state("p1"), Some(VoteState::Unvoted));
    assert_eq!(
        carousel.notice(),
        Some(Notice::Error("Failed to submit vote: vote_poll is unavailable".to_string()))
    );
}

#[tokio::test(start_paused = true)]
async fn test_vote_in_flight_relabels_and_blocks_second_vote() {
    let api = MockApi::new();
    let carousel = carousel_with(&api, vec![poll("p1", false)], Timings::default());
    carousel.load().await;
    carousel.select_answer(PollAnswer::Yes);
    api.delay_next("vote_poll", Duration::from_millis(300));

    let voting = carousel.clone();
    let task = tokio::spawn(async move { voting.submit().await });
    sleep(Duration::from_millis(50)).await;

    assert_eq!(carousel.vote_state("p1"), Some(VoteState::VotingInFlight));
    assert!(matches!(
        card(&carousel).body,
        PollBody::VoteForm { submit_enabled: false, submit_label: "Voting...", .. }
    ));
    assert_eq!(carousel.vote("p1", Some(PollAnswer::No), None).await, Outcome::Skipped);

    assert_eq!(task.await.unwrap(), Outcome::Applied);
    assert_eq!(api.calls_to("vote_poll"), 1);
}

#[tokio::test(start_paused = true)]
async fn test_voted_poll_never_regresses() {
    let api = MockApi::new();
    let carousel = carousel_with(&api, vec![poll("p1", false)], Timings::default());
    carousel.load().await;
    carousel.vote("p1", Some(PollAnswer::Yes), None).await;

    assert_eq!(carousel.vote("p1", Some(PollAnswer::No), None).await, Outcome::Skipped);

    // Server lagging behind still reports has_voted=false
    carousel.load().await;
    assert_eq!(carousel.vote_state("p1"), Some(VoteState::Voted));
}

#[tokio::test(start_paused = true)]
async fn test_results_fetched_once_per_poll() {
    let api = MockApi::new();
    api.data.lock().results.insert(
        "p1".to_string(),
        PollResults {
            poll_id: Some("p1".to_string()),
            total_votes: 3,
            yes_votes: 2,
            no_votes: 1,
            yes_percentage: 66.7,
            no_percentage: 33.3,
        },
    );
    let carousel = carousel_with(&api, vec![poll("p1", true), poll("p2", false)], Timings::default());
    carousel.load().await;

    carousel.navigate(Direction::Next).await;
    carousel.navigate(Direction::Previous).await;
    carousel.navigate(Direction::Next).await;
    carousel.navigate(Direction::Previous).await;

    assert_eq!(api.calls_to("get_poll_results"), 1);
    assert!(matches!(card(&carousel).body, PollBody::Results(_)));
}

#[tokio::test(start_paused = true)]
async fn test_failed_results_retry_without_double_fetch() {
    let api = MockApi::new();
    let carousel = carousel_with(&api, vec![poll("p1", true)], Timings::default());
    api.fail("get_poll_results");
    carousel.load().await;

    assert!(matches!(card(&carousel).body, PollBody::ResultsFailed(_)));
    assert_eq!(carousel.vote_state("p1"), Some(VoteState::Voted));

    api.recover("get_poll_results");
    api.data.lock().results.insert(
        "p1".to_string(),
        PollResults {
            poll_id: None,
            total_votes: 2,
            yes_votes: 1,
            no_votes: 1,
            yes_percentage: 50.0,
            no_percentage: 50.0,
        },
    );
    api.delay_next("get_poll_results", Duration::from_millis(200));
    let (first, second) = tokio::join!(carousel.fetch_results("p1"), carousel.fetch_results("p1"));

    assert_eq!(first, Outcome::Applied);
    assert_eq!(second, Outcome::Skipped, "Loading slot blocks a second fetch");
    assert_eq!(api.calls_to("get_poll_results"), 2);
}

#[tokio::test(start_paused = true)]
async fn test_results_not_fetched_for_unvoted() {
    let api = MockApi::new();
    let carousel = carousel_with(&api, vec![poll("p1", false)], Timings::default());
    carousel.load().await;

    assert_eq!(carousel.fetch_results("p1").await, Outcome::Skipped);
    assert_eq!(api.calls_to("get_poll_results"), 0);
}

#[tokio::test(start_paused = true)]
async fn test_navigation_bounds() {
    let api = MockApi::new();
    let carousel = carousel_with(&api, vec![poll("p1", false), poll("p2", false)], Timings::default());
    carousel.load().await;

    let first = card(&carousel);
    assert!(!first.can_go_previous);
    assert!(first.can_go_next);
    assert_eq!(carousel.navigate(Direction::Previous).await, Outcome::Skipped);

    carousel.navigate(Direction::Next).await;
    let last = card(&carousel);
    assert_eq!((last.position, last.total), (2, 2));
    assert!(!last.can_go_next);
    assert_eq!(carousel.navigate(Direction::Next).await, Outcome::Skipped);
    assert_eq!(carousel.index(), 1);
}

#[tokio::test(start_paused = true)]
async fn test_navigation_resets_vote_form() {
    let api = MockApi::new();
    let carousel = carousel_with(&api, vec![poll("p1", false), poll("p2", false)], Timings::default());
    carousel.load().await;
    carousel.select_answer(PollAnswer::No);
    carousel.set_reason("because");

    carousel.navigate(Direction::Next).await;

    match card(&carousel).body {
        PollBody::VoteForm { selection, reason, .. } => {
            assert_eq!(selection, None);
            assert_eq!(reason, "");
        }
        other => panic!("expected vote form, got {:?}", other),
    }
}

#[tokio::test(start_paused = true)]
async fn test_auto_advance_after_vote() {
    let api = MockApi::new();
    let carousel = carousel_with(&api, vec![poll("p1", false), poll("p2", false)], Timings::default());
    carousel.load().await;

    carousel.vote("p1", Some(PollAnswer::Yes), None).await;
    assert!(carousel.has_pending_advance());
    assert_eq!(carousel.index(), 0, "Results stay up before advancing");

    sleep(Duration::from_millis(2100)).await;
    assert_eq!(carousel.index(), 1);
}

#[tokio::test(start_paused = true)]
async fn test_no_auto_advance_from_last_poll() {
    let api = MockApi::new();
    let carousel = carousel_with(&api, vec![poll("p1", false)], Timings::default());
    carousel.load().await;

    carousel.vote("p1", Some(PollAnswer::No), None).await;

    assert!(!carousel.has_pending_advance());
}

#[tokio::test(start_paused = true)]
async fn test_manual_navigation_cancels_auto_advance() {
    let api = MockApi::new();
    let polls = vec![poll("p1", false), poll("p2", false), poll("p3", false)];
    let carousel = carousel_with(&api, polls, Timings::default());
    carousel.load().await;

    carousel.vote("p1", Some(PollAnswer::Yes), None).await;
    carousel.navigate(Direction::Next).await;
    carousel.navigate(Direction::Previous).await;
    sleep(Duration::from_millis(3000)).await;

    assert_eq!(carousel.index(), 0, "User stays where they navigated to");
    assert!(!carousel.has_pending_advance());
}

#[tokio::test(start_paused = true)]
async fn test_legacy_auto_advance_fires_after_navigation() {
    let api = MockApi::new();
    let polls = vec![poll("p1", false), poll("p2", false), poll("p3", false)];
    let timings = Timings {
        cancel_advance_on_navigate: false,
        ..Timings::default()
    };
    let carousel = carousel_with(&api, polls, timings);
    carousel.load().await;

    carousel.vote("p1", Some(PollAnswer::Yes), None).await;
    carousel.navigate(Direction::Next).await;
    sleep(Duration::from_millis(3000)).await;

    assert_eq!(carousel.index(), 2, "Old behaviour steps on from wherever the user is");
}

#[tokio::test(start_paused = true)]
async fn test_empty_poll_list() {
    let api = MockApi::new();
    let carousel = carousel_with(&api, Vec::new(), Timings::default());
    carousel.load().await;

    assert_eq!(carousel.view(), PollsView::Empty("No polls available at this time."));
    assert_eq!(carousel.submit().await, Outcome::Skipped);
}

// ============================================================================
// SEARCH
// ============================================================================

fn search_with(api: &Arc<MockApi>) -> SearchController {
    api.data.lock().directory = vec![
        ProfileSummary {
            user_id: "u-alice".to_string(),
            display_name: "Alice".to_string(),
            profile_private: false,
        },
        ProfileSummary {
            user_id: "u-alicia".to_string(),
            display_name: "Alicia".to_string(),
            profile_private: true,
        },
    ];
    SearchController::new(api.clone(), Timings::default())
}

#[tokio::test(start_paused = true)]
async fn test_typing_burst_sends_one_search() {
    let api = MockApi::new();
    let search = search_with(&api);

    search.input("a");
    sleep(Duration::from_millis(100)).await;
    search.input("ab");
    sleep(Duration::from_millis(100)).await;
    search.input("abc");

    assert_eq!(search.view().dropdown, Some(DropdownContent::Searching));
    sleep(Duration::from_millis(400)).await;

    assert_eq!(api.calls(), vec!["search_profiles:abc"]);
    assert_eq!(search.view().dropdown, Some(DropdownContent::NoResults));
}

#[tokio::test(start_paused = true)]
async fn test_blank_input_hides_and_cancels() {
    let api = MockApi::new();
    let search = search_with(&api);

    search.input("ali");
    search.input("   ");
    sleep(Duration::from_millis(400)).await;

    assert_eq!(api.calls_to("search_profiles"), 0);
    assert!(!search.is_visible());
}

#[tokio::test(start_paused = true)]
async fn test_results_render_as_profile_links() {
    let api = MockApi::new();
    let search = search_with(&api);

    search.input("ali");
    sleep(Duration::from_millis(400)).await;

    match search.content() {
        DropdownContent::Results(links) => {
            assert_eq!(links.len(), 2);
            assert_eq!(links[0].label, "Alice");
            assert_eq!(links[1].label, "Alicia 🔒");
            assert_eq!(links[1].href, "profile?user_id=u-alicia");
        }
        other => panic!("expected results, got {:?}", other),
    }
}

#[tokio::test(start_paused = true)]
async fn test_out_of_order_response_is_discarded() {
    let api = MockApi::new();
    let search = search_with(&api);
    api.delay_next("search_profiles", Duration::from_millis(500));

    let (slow, fast) = tokio::join!(search.search("ali"), search.search("alice"));

    assert_eq!(fast, Outcome::Applied);
    assert_eq!(slow, Outcome::Skipped);
    match search.content() {
        DropdownContent::Results(links) => assert_eq!(links.len(), 1),
        other => panic!("expected newest results, got {:?}", other),
    }
}

#[tokio::test(start_paused = true)]
async fn test_escape_hides_but_search_still_lands() {
    let api = MockApi::new();
    let search = search_with(&api);

    search.input("alice");
    search.escape();
    assert_eq!(search.view().input, "");
    assert_eq!(search.view().dropdown, None);

    sleep(Duration::from_millis(400)).await;
    assert_eq!(api.calls_to("search_profiles"), 1);
    assert!(matches!(search.content(), DropdownContent::Results(_)));
    assert!(!search.is_visible(), "A late result does not reopen the dropdown");
}

#[tokio::test(start_paused = true)]
async fn test_search_failure_is_inline() {
    let api = MockApi::new();
    let search = search_with(&api);
    api.fail("search_profiles");

    search.input("ali");
    sleep(Duration::from_millis(400)).await;

    assert_eq!(
        search.view().dropdown,
        Some(DropdownContent::Failed("Search failed. Please try again.".to_string()))
    );
}

#[tokio::test(start_paused = true)]
async fn test_submit_skips_the_quiet_period() {
    let api = MockApi::new();
    let search = search_with(&api);

    search.input("alicia");
    assert_eq!(search.submit().await, Outcome::Applied);
    sleep(Duration::from_millis(400)).await;

    assert_eq!(api.calls(), vec!["search_profiles:alicia"], "Debounced search was replaced");
    assert!(search.is_visible());
}

#[tokio::test(start_paused = true)]
async fn test_click_outside_keeps_input() {
    let api = MockApi::new();
    let search = search_with(&api);

    search.input("ali");
    search.click_outside();

    assert!(!search.is_visible());
    assert_eq!(search.view().input, "ali");
}

// ============================================================================
// PROFILE
// ============================================================================

async fn own_profile(api: &Arc<MockApi>) -> ProfileController {
    api.data
        .lock()
        .profiles
        .insert(VIEWER.to_string(), profile(VIEWER, "Aroha"));
    let controller = ProfileController::new(api.clone(), VIEWER, None, Timings::default());
    controller.load().await;
    controller
}

#[tokio::test(start_paused = true)]
async fn test_unchanged_submit_sends_nothing() {
    let api = MockApi::new();
    let controller = own_profile(&api).await;
    controller.enter_edit();

    let outcome = controller
        .submit(" Aroha ", "Kia ora", PoliticalAlignment::Independent)
        .await;

    assert_eq!(outcome, Outcome::Skipped);
    assert_eq!(controller.notice(), Some(Notice::Info("No changes to save".to_string())));
    assert_eq!(api.calls_to("update_profile"), 0);
}

#[tokio::test(start_paused = true)]
async fn test_invalid_profile_sends_nothing() {
    let api = MockApi::new();
    let controller = own_profile(&api).await;
    controller.enter_edit();

    let outcome = controller.submit("A", "", PoliticalAlignment::Labour).await;

    assert_eq!(outcome, Outcome::Invalid);
    assert!(matches!(controller.notice(), Some(Notice::Validation(_))));
    assert_eq!(controller.mode(), EditMode::Editing);
    assert_eq!(api.calls_to("update_profile"), 0);
}

#[tokio::test(start_paused = true)]
async fn test_profile_save_returns_to_viewing() {
    let api = MockApi::new();
    let controller = own_profile(&api).await;
    let before = controller.profile().unwrap();
    controller.enter_edit();

    let outcome = controller
        .submit("Aroha T", "Kia ora koutou", PoliticalAlignment::Labour)
        .await;

    assert_eq!(outcome, Outcome::Applied);
    assert_eq!(
        controller.notice(),
        Some(Notice::Success("Profile updated successfully!".to_string()))
    );
    let after = controller.profile().unwrap();
    assert_eq!(after.display_name, "Aroha T");
    assert!(after.updated_at >= before.updated_at);
    assert_eq!(controller.mode(), EditMode::Editing, "Success message shows first");

    sleep(Duration::from_millis(1600)).await;
    assert_eq!(controller.mode(), EditMode::Viewing);
}

#[tokio::test(start_paused = true)]
async fn test_edit_again_cancels_return_to_viewing() {
    let api = MockApi::new();
    let controller = own_profile(&api).await;
    controller.enter_edit();
    controller.submit("Aroha T", "Kia ora", PoliticalAlignment::Independent).await;

    assert_eq!(controller.enter_edit(), Outcome::Applied);
    sleep(Duration::from_millis(2000)).await;

    assert_eq!(controller.mode(), EditMode::Editing);
    assert_eq!(controller.notice(), None);
}

#[tokio::test(start_paused = true)]
async fn test_profile_save_failure_stays_editing() {
    let api = MockApi::new();
    let controller = own_profile(&api).await;
    controller.enter_edit();
    api.fail("update_profile");

    let outcome = controller.submit("Aroha T", "new bio", PoliticalAlignment::National).await;

    assert_eq!(outcome, Outcome::Failed);
    assert_eq!(controller.mode(), EditMode::Editing);
    assert_eq!(controller.form().display_name, "Aroha T");
    assert_eq!(controller.profile().unwrap().display_name, "Aroha");
}

#[tokio::test(start_paused = true)]
async fn test_cancel_restores_shadow_copy() {
    let api = MockApi::new();
    let controller = own_profile(&api).await;
    controller.enter_edit();
    controller.set_form(ProfileForm {
        display_name: "Someone else".to_string(),
        bio: String::new(),
        political_alignment: PoliticalAlignment::National,
    });

    assert_eq!(controller.cancel(), Outcome::Applied);

    assert_eq!(controller.mode(), EditMode::Viewing);
    assert_eq!(controller.form().display_name, "Aroha");
    assert_eq!(api.calls_to("update_profile"), 0);
}

#[tokio::test(start_paused = true)]
async fn test_other_profile_is_read_only() {
    let api = MockApi::new();
    api.data
        .lock()
        .profiles
        .insert(OTHER.to_string(), profile(OTHER, "Tama"));
    let controller = ProfileController::new(api.clone(), VIEWER, Some(OTHER.to_string()), Timings::default());

    assert!(matches!(controller.load().await, ProfileLoad::Ready(_)));
    assert_eq!(controller.enter_edit(), Outcome::Skipped);
    assert!(matches!(controller.view(), ProfileView::Viewing { editable: false, .. }));
}

#[tokio::test(start_paused = true)]
async fn test_missing_profile_means_onboarding() {
    let api = MockApi::new();
    let controller = ProfileController::new(api.clone(), VIEWER, None, Timings::default());

    assert_eq!(controller.load().await, ProfileLoad::Onboarding);
    assert_eq!(controller.view(), ProfileView::Onboarding);
}

#[tokio::test(start_paused = true)]
async fn test_missing_other_profile_is_not_found() {
    let api = MockApi::new();
    api.data
        .lock()
        .profiles
        .insert(VIEWER.to_string(), profile(VIEWER, "Aroha"));
    let controller = ProfileController::new(api.clone(), VIEWER, Some("user-ghost".to_string()), Timings::default());

    assert_eq!(controller.load().await, ProfileLoad::Failed("Profile not found".to_string()));
    assert_eq!(controller.view(), ProfileView::Error("Profile not found".to_string()));
}

// ============================================================================
// PAGES
// ============================================================================

#[tokio::test(start_paused = true)]
async fn test_home_page_sends_new_users_to_onboarding() {
    let api = MockApi::new();
    let page = HomePage::new(api.clone(), VIEWER, Timings::default(), Default::default());

    assert_eq!(page.load().await, PageStatus::Onboarding);
    assert_eq!(api.calls_to("get_feed"), 0);
}

#[tokio::test(start_paused = true)]
async fn test_profile_page_loads_posts_and_votes() {
    let api = MockApi::new();
    api.data
        .lock()
        .profiles
        .insert(VIEWER.to_string(), profile(VIEWER, "Aroha"));
    api.data.lock().posts = vec![post(VIEWER, "mine"), post(OTHER, "theirs")];
    let page = ProfilePage::new(api.clone(), VIEWER, None, Timings::default(), Default::default());

    assert_eq!(page.load().await, PageStatus::Ready);
    assert_eq!(rows(&page.posts).len(), 1);
    assert!(page.votes.is_loaded());
}

#[tokio::test(start_paused = true)]
async fn test_profile_page_for_unknown_user_fails() {
    let api = MockApi::new();
    api.data
        .lock()
        .profiles
        .insert(VIEWER.to_string(), profile(VIEWER, "Aroha"));
    let page = ProfilePage::new(
        api.clone(),
        VIEWER,
        Some("user-ghost".to_string()),
        Timings::default(),
        Default::default(),
    );

    assert_eq!(page.load().await, PageStatus::Failed("Profile not found".to_string()));
    assert_eq!(api.calls_to("get_user_posts"), 0);
}
