use std::sync::Arc;

use civic_types::{Poll, PollAnswer, PollResults, PollVote, MAX_REASON_CHARS};
use parking_lot::Mutex;

use super::state::{Direction, Notice, Outcome, PollHistoryState, PollsState, ResultsSlot, VoteState};
use super::validation::{char_count, validate_reason};
use crate::api::SocialApi;
use crate::config::Timings;
use crate::logging::LogConfig;
use crate::ui::formatting::{format_percentage, format_vote_count};
use crate::{log_api_call, log_polls};

pub const NO_POLLS_MESSAGE: &str = "No polls available at this time.";
pub const SELECT_ANSWER_MESSAGE: &str = "Please select an answer";

#[derive(Debug, Clone, PartialEq)]
pub enum PollsView {
    Loading,
    Error(String),
    Empty(&'static str),
    Card(PollCard),
}

/// The poll under the carousel cursor
#[derive(Debug, Clone, PartialEq)]
pub struct PollCard {
    pub poll: Poll,
    /// 1-based, for "Poll 2 of 5"
    pub position: usize,
    pub total: usize,
    pub can_go_previous: bool,
    pub can_go_next: bool,
    pub body: PollBody,
}

#[derive(Debug, Clone, PartialEq)]
pub enum PollBody {
    VoteForm {
        selection: Option<PollAnswer>,
        reason: String,
        reason_counter: String,
        submit_enabled: bool,
        submit_label: &'static str,
    },
    ResultsLoading,
    Results(ResultsView),
    ResultsFailed(String),
}

#[derive(Debug, Clone, PartialEq)]
pub struct ResultsView {
    pub yes: String,
    pub no: String,
    pub total: String,
    pub results: PollResults,
}

impl From<&PollResults> for ResultsView {
    fn from(results: &PollResults) -> Self {
        Self {
            yes: format_percentage(results.yes_percentage),
            no: format_percentage(results.no_percentage),
            total: format_vote_count(results.total_votes),
            results: results.clone(),
        }
    }
}

/// Carousel over the session's polls: one poll visible at a time, vote form
/// until voted, cached results afterwards.
#[derive(Clone)]
pub struct PollCarousel {
    api: Arc<dyn SocialApi>,
    timings: Timings,
    log_config: LogConfig,
    state: Arc<Mutex<PollsState>>,
}

impl PollCarousel {
    pub fn new(api: Arc<dyn SocialApi>, timings: Timings) -> Self {
        Self {
            api,
            timings,
            log_config: LogConfig::default(),
            state: Arc::new(Mutex::new(PollsState::default())),
        }
    }

    pub fn with_log_config(mut self, log_config: LogConfig) -> Self {
        self.log_config = log_config;
        self
    }

    pub fn with_state<R>(&self, f: impl FnOnce(&PollsState) -> R) -> R {
        f(&self.state.lock())
    }

    pub fn index(&self) -> usize {
        self.state.lock().index
    }

    pub fn vote_state(&self, poll_id: &str) -> Option<VoteState> {
        self.state.lock().vote_state(poll_id)
    }

    pub fn results(&self, poll_id: &str) -> Option<ResultsSlot> {
        self.state.lock().results.get(poll_id).cloned()
    }

    pub fn notice(&self) -> Option<Notice> {
        self.state.lock().notice.clone()
    }

    pub fn has_pending_advance(&self) -> bool {
        self.state.lock().has_pending_advance()
    }

    /// Fetch the poll list and open the carousel on the first poll.
    pub async fn load(&self) -> Outcome {
        self.state.lock().loading = true;

        log_api_call!(self.log_config, "load polls");
        let result = self.api.get_polls().await;

        let outcome = {
            let mut state = self.state.lock();
            state.loading = false;
            match result {
                Ok(polls) => {
                    let mut votes = std::collections::HashMap::with_capacity(polls.len());
                    for poll in &polls {
                        // Votes cast earlier this session stand even if the list lags behind
                        let vote = match state.votes.get(&poll.poll_id) {
                            Some(VoteState::Voted) => VoteState::Voted,
                            Some(VoteState::VotingInFlight) => VoteState::VotingInFlight,
                            _ if poll.has_voted => VoteState::Voted,
                            _ => VoteState::Unvoted,
                        };
                        votes.insert(poll.poll_id.clone(), vote);
                    }
                    log_polls!(self.log_config, "loaded {} polls", polls.len());
                    state.polls = polls;
                    state.votes = votes;
                    state.index = 0;
                    state.loaded = true;
                    state.load_error = None;
                    state.reset_form();
                    Outcome::Applied
                }
                Err(e) => {
                    log::warn!("Failed to load polls: {}", e);
                    state.load_error = Some(e.message());
                    Outcome::Failed
                }
            }
        };

        if outcome == Outcome::Applied {
            self.ensure_results_for_current().await;
        }
        outcome
    }

    /// Step one poll left or right. Steps off either end do nothing.
    pub async fn navigate(&self, direction: Direction) -> Outcome {
        {
            let mut state = self.state.lock();
            let target = state.index as isize + direction.offset();
            if target < 0 || target as usize >= state.polls.len() {
                return Outcome::Skipped;
            }
            if self.timings.cancel_advance_on_navigate {
                if let Some(handle) = state.auto_advance.take() {
                    handle.abort();
                    log_polls!(self.log_config, "manual navigation cancelled auto-advance");
                }
            }
            state.index = target as usize;
            state.reset_form();
            state.notice = None;
        }
        self.ensure_results_for_current().await;
        Outcome::Applied
    }

    pub fn select_answer(&self, answer: PollAnswer) {
        self.state.lock().selection = Some(answer);
    }

    pub fn set_reason(&self, reason: impl Into<String>) {
        self.state.lock().reason = reason.into();
    }

    /// Vote on the current poll with whatever the form holds
    pub async fn submit(&self) -> Outcome {
        let (poll_id, selection, reason) = {
            let state = self.state.lock();
            match state.current() {
                Some(poll) => (poll.poll_id.clone(), state.selection, state.reason.clone()),
                None => return Outcome::Skipped,
            }
        };
        self.vote(&poll_id, selection, Some(&reason)).await
    }

    /// Cast a vote. Only an `Unvoted` poll accepts one.
    pub async fn vote(&self, poll_id: &str, answer: Option<PollAnswer>, reason: Option<&str>) -> Outcome {
        let reason = reason.map(str::trim).filter(|r| !r.is_empty()).map(str::to_string);

        let answer = {
            let mut state = self.state.lock();
            if state.vote_state(poll_id) != Some(VoteState::Unvoted) {
                return Outcome::Skipped;
            }
            let Some(answer) = answer else {
                state.notice = Some(Notice::Validation(SELECT_ANSWER_MESSAGE.to_string()));
                return Outcome::Invalid;
            };
            if let Some(reason) = &reason {
                if let Err(msg) = validate_reason(reason) {
                    state.notice = Some(Notice::Validation(msg));
                    return Outcome::Invalid;
                }
            }
            state.votes.insert(poll_id.to_string(), VoteState::VotingInFlight);
            state.notice = None;
            answer
        };

        log_api_call!(self.log_config, "vote poll {}: {}", poll_id, answer.as_str());
        match self.api.vote_poll(poll_id.to_string(), answer, reason).await {
            Ok(_) => {
                {
                    let mut state = self.state.lock();
                    state.votes.insert(poll_id.to_string(), VoteState::Voted);
                    state.reset_form();
                    self.schedule_advance(&mut state, poll_id);
                }
                self.fetch_results(poll_id).await;
                Outcome::Applied
            }
            Err(e) => {
                let mut state = self.state.lock();
                state.votes.insert(poll_id.to_string(), VoteState::Unvoted);
                state.notice = Some(Notice::Error(format!("Failed to submit vote: {}", e.message())));
                Outcome::Failed
            }
        }
    }

    /// Queue the move to the poll after `poll_id`, replacing any queued move.
    fn schedule_advance(&self, state: &mut PollsState, poll_id: &str) {
        let Some(position) = state.polls.iter().position(|p| p.poll_id == poll_id) else {
            return;
        };
        let target = position + 1;
        if target >= state.polls.len() {
            return;
        }
        if let Some(previous) = state.auto_advance.take() {
            previous.abort();
        }

        let carousel = self.clone();
        let delay = self.timings.auto_advance();
        log_polls!(self.log_config, "auto-advance to {} in {:?}", target, delay);
        state.auto_advance = Some(tokio::spawn(async move {
            tokio::time::sleep(delay).await;
            carousel.advance_to(target).await;
        }));
    }

    /// Fired by the auto-advance task. Unlike `navigate` it must not abort
    /// the task it runs on.
    async fn advance_to(&self, target: usize) {
        {
            let mut state = self.state.lock();
            let target = if self.timings.cancel_advance_on_navigate {
                target
            } else {
                // Legacy: a relative step from wherever the user is now
                state.index + 1
            };
            if target >= state.polls.len() || target == state.index {
                state.auto_advance = None;
                return;
            }
            state.index = target;
            state.auto_advance = None;
            state.reset_form();
            state.notice = None;
        }
        self.ensure_results_for_current().await;
    }

    async fn ensure_results_for_current(&self) {
        let poll_id = {
            let state = self.state.lock();
            match state.current() {
                Some(poll) => poll.poll_id.clone(),
                None => return,
            }
        };
        self.fetch_results(&poll_id).await;
    }

    /// Load results for a voted poll unless they are cached or on their way.
    pub async fn fetch_results(&self, poll_id: &str) -> Outcome {
        {
            let mut state = self.state.lock();
            if state.vote_state(poll_id) != Some(VoteState::Voted) {
                return Outcome::Skipped;
            }
            match state.results.get(poll_id) {
                Some(ResultsSlot::Ready(_)) | Some(ResultsSlot::Loading) => return Outcome::Skipped,
                Some(ResultsSlot::Failed(_)) | None => {}
            }
            state.results.insert(poll_id.to_string(), ResultsSlot::Loading);
        }

        log_api_call!(self.log_config, "fetch results for poll {}", poll_id);
        let result = self.api.get_poll_results(poll_id.to_string()).await;

        let mut state = self.state.lock();
        match result {
            Ok(results) => {
                state.results.insert(poll_id.to_string(), ResultsSlot::Ready(results));
                Outcome::Applied
            }
            Err(e) => {
                log::warn!("Failed to load results for poll {}: {}", poll_id, e);
                state
                    .results
                    .insert(poll_id.to_string(), ResultsSlot::Failed(e.message()));
                Outcome::Failed
            }
        }
    }

    pub fn view(&self) -> PollsView {
        let state = self.state.lock();

        if !state.loaded {
            return match &state.load_error {
                Some(err) => PollsView::Error(err.clone()),
                None => PollsView::Loading,
            };
        }
        let Some(poll) = state.current() else {
            return PollsView::Empty(NO_POLLS_MESSAGE);
        };

        let body = match state.vote_state(&poll.poll_id).unwrap_or(VoteState::Unvoted) {
            vote @ (VoteState::Unvoted | VoteState::VotingInFlight) => {
                let in_flight = vote == VoteState::VotingInFlight;
                PollBody::VoteForm {
                    selection: state.selection,
                    reason: state.reason.clone(),
                    reason_counter: format!("{}/{}", char_count(&state.reason), MAX_REASON_CHARS),
                    submit_enabled: !in_flight && state.selection.is_some(),
                    submit_label: if in_flight { "Voting..." } else { "Vote" },
                }
            }
            VoteState::Voted => match state.results.get(&poll.poll_id) {
                Some(ResultsSlot::Ready(results)) => PollBody::Results(results.into()),
                Some(ResultsSlot::Failed(msg)) => PollBody::ResultsFailed(msg.clone()),
                Some(ResultsSlot::Loading) | None => PollBody::ResultsLoading,
            },
        };

        PollsView::Card(PollCard {
            poll: poll.clone(),
            position: state.index + 1,
            total: state.polls.len(),
            can_go_previous: state.index > 0,
            can_go_next: state.index + 1 < state.polls.len(),
            body,
        })
    }
}

/// A user's past votes, listed on their profile page
#[derive(Clone)]
pub struct PollHistory {
    api: Arc<dyn SocialApi>,
    user_id: Option<String>,
    log_config: LogConfig,
    state: Arc<Mutex<PollHistoryState>>,
}

impl PollHistory {
    pub fn new(api: Arc<dyn SocialApi>, user_id: Option<String>) -> Self {
        Self {
            api,
            user_id,
            log_config: LogConfig::default(),
            state: Arc::new(Mutex::new(PollHistoryState::default())),
        }
    }

    pub fn with_log_config(mut self, log_config: LogConfig) -> Self {
        self.log_config = log_config;
        self
    }

    pub async fn load(&self) -> Outcome {
        self.state.lock().loading = true;

        log_api_call!(self.log_config, "load poll votes for {:?}", self.user_id);
        let result = self.api.get_user_poll_votes(self.user_id.clone()).await;

        let mut state = self.state.lock();
        state.loading = false;
        match result {
            Ok(votes) => {
                state.votes = votes;
                state.loaded = true;
                state.error = None;
                Outcome::Applied
            }
            Err(e) => {
                state.error = Some(e.message());
                Outcome::Failed
            }
        }
    }

    pub fn votes(&self) -> Vec<PollVote> {
        self.state.lock().votes.clone()
    }

    pub fn error(&self) -> Option<String> {
        self.state.lock().error.clone()
    }

    pub fn is_loaded(&self) -> bool {
        self.state.lock().loaded
    }
}
