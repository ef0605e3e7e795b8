use std::sync::Arc;

use civic_types::{PoliticalAlignment, Profile, UpdateProfileRequest, MAX_BIO_CHARS};
use parking_lot::Mutex;

use super::state::{EditMode, Notice, Outcome, ProfileForm, ProfileState};
use super::validation::{char_count, validate_profile};
use crate::api::SocialApi;
use crate::config::Timings;
use crate::logging::LogConfig;
use crate::{log_api_call, log_profile};

pub const NO_CHANGES_MESSAGE: &str = "No changes to save";
pub const UPDATED_MESSAGE: &str = "Profile updated successfully!";
pub const NOT_FOUND_MESSAGE: &str = "Profile not found";

/// How the initial profile fetch ended
#[derive(Debug, Clone, PartialEq)]
pub enum ProfileLoad {
    Ready(Profile),
    /// Signed-in user has no profile yet; the front end sends them to set one up.
    /// Someone else's missing profile is `Failed` instead.
    Onboarding,
    Failed(String),
}

#[derive(Debug, Clone, PartialEq)]
pub enum ProfileView {
    Loading,
    Error(String),
    Onboarding,
    Viewing {
        profile: Profile,
        editable: bool,
        notice: Option<Notice>,
    },
    Editing {
        form: ProfileForm,
        bio_counter: String,
        saving: bool,
        notice: Option<Notice>,
    },
}

/// One profile page's header: read-only display, plus an inline editor when
/// it is the viewer's own profile.
#[derive(Clone)]
pub struct ProfileController {
    api: Arc<dyn SocialApi>,
    viewer_id: String,
    /// `None` is the viewer's own profile
    user_id: Option<String>,
    timings: Timings,
    log_config: LogConfig,
    state: Arc<Mutex<ProfileState>>,
}

impl ProfileController {
    pub fn new(
        api: Arc<dyn SocialApi>,
        viewer_id: impl Into<String>,
        user_id: Option<String>,
        timings: Timings,
    ) -> Self {
        Self {
            api,
            viewer_id: viewer_id.into(),
            user_id,
            timings,
            log_config: LogConfig::default(),
            state: Arc::new(Mutex::new(ProfileState::default())),
        }
    }

    pub fn with_log_config(mut self, log_config: LogConfig) -> Self {
        self.log_config = log_config;
        self
    }

    pub fn with_state<R>(&self, f: impl FnOnce(&ProfileState) -> R) -> R {
        f(&self.state.lock())
    }

    /// Whether this page shows the signed-in user's own profile
    pub fn is_own(&self) -> bool {
        match &self.user_id {
            None => true,
            Some(id) => *id == self.viewer_id,
        }
    }

    pub fn user_id(&self) -> Option<&str> {
        self.user_id.as_deref()
    }

    pub fn mode(&self) -> EditMode {
        self.state.lock().mode
    }

    pub fn form(&self) -> ProfileForm {
        self.state.lock().form.clone()
    }

    pub fn profile(&self) -> Option<Profile> {
        self.state.lock().shadow.clone()
    }

    pub fn notice(&self) -> Option<Notice> {
        self.state.lock().notice.clone()
    }

    pub async fn load(&self) -> ProfileLoad {
        self.state.lock().loading = true;

        log_api_call!(self.log_config, "load profile {:?}", self.user_id);
        let result = self.api.get_profile(self.user_id.clone()).await;

        let mut state = self.state.lock();
        state.loading = false;
        match result {
            Ok(Some(profile)) => {
                state.form = ProfileForm::from_profile(&profile);
                state.shadow = Some(profile.clone());
                state.loaded = true;
                state.load_error = None;
                state.needs_onboarding = false;
                ProfileLoad::Ready(profile)
            }
            Ok(None) if !self.is_own() => {
                log::warn!("Profile {:?} not found", self.user_id);
                state.load_error = Some(NOT_FOUND_MESSAGE.to_string());
                ProfileLoad::Failed(NOT_FOUND_MESSAGE.to_string())
            }
            Ok(None) => {
                log_profile!(self.log_config, "no profile yet, onboarding");
                state.needs_onboarding = true;
                ProfileLoad::Onboarding
            }
            Err(e) => {
                log::warn!("Failed to load profile: {}", e);
                state.load_error = Some(e.message());
                ProfileLoad::Failed(e.message())
            }
        }
    }

    pub fn enter_edit(&self) -> Outcome {
        if !self.is_own() {
            return Outcome::Skipped;
        }
        let mut state = self.state.lock();
        let Some(shadow) = state.shadow.clone() else {
            return Outcome::Skipped;
        };
        // Editing again while the success message is up keeps the form open
        let returning = state.return_task.take().map(|task| task.abort()).is_some();
        if state.mode == EditMode::Editing && !returning {
            return Outcome::Skipped;
        }
        state.form = ProfileForm::from_profile(&shadow);
        state.mode = EditMode::Editing;
        state.notice = None;
        log_profile!(self.log_config, "entered edit mode");
        Outcome::Applied
    }

    /// Throw away the form and go back to the last confirmed profile
    pub fn cancel(&self) -> Outcome {
        let mut state = self.state.lock();
        if state.saving {
            return Outcome::Skipped;
        }
        if let Some(task) = state.return_task.take() {
            task.abort();
        }
        if state.mode != EditMode::Editing {
            return Outcome::Skipped;
        }
        if let Some(shadow) = state.shadow.clone() {
            state.form = ProfileForm::from_profile(&shadow);
        }
        state.mode = EditMode::Viewing;
        state.notice = None;
        Outcome::Applied
    }

    /// Replace the form fields as typed
    pub fn set_form(&self, form: ProfileForm) {
        let mut state = self.state.lock();
        if state.mode == EditMode::Editing && !state.saving {
            state.form = form;
        }
    }

    /// Submit whatever the form holds
    pub async fn submit_form(&self) -> Outcome {
        let form = self.state.lock().form.clone();
        self.submit(&form.display_name, &form.bio, form.political_alignment).await
    }

    /// Validate, diff against the confirmed profile, then save.
    pub async fn submit(&self, display_name: &str, bio: &str, political_alignment: PoliticalAlignment) -> Outcome {
        if !self.is_own() {
            return Outcome::Skipped;
        }
        let form = ProfileForm {
            display_name: display_name.trim().to_string(),
            bio: bio.trim().to_string(),
            political_alignment,
        };

        {
            let mut state = self.state.lock();
            if state.mode != EditMode::Editing || state.saving {
                return Outcome::Skipped;
            }
            let Some(shadow) = state.shadow.clone() else {
                return Outcome::Skipped;
            };
            state.form = form.clone();

            if let Err(msg) = validate_profile(&form) {
                state.notice = Some(Notice::Validation(msg));
                return Outcome::Invalid;
            }
            if !form.differs_from(&shadow) {
                state.notice = Some(Notice::Info(NO_CHANGES_MESSAGE.to_string()));
                return Outcome::Skipped;
            }
            state.saving = true;
            state.notice = None;
        }

        let request = UpdateProfileRequest {
            display_name: form.display_name.clone(),
            bio: form.bio.clone(),
            political_alignment: form.political_alignment,
        };
        log_api_call!(self.log_config, "update profile");
        let result = self.api.update_profile(request).await;

        let mut state = self.state.lock();
        state.saving = false;
        match result {
            Ok(profile) => {
                state.form = ProfileForm::from_profile(&profile);
                state.shadow = Some(profile);
                state.notice = Some(Notice::Success(UPDATED_MESSAGE.to_string()));

                let controller = self.clone();
                let delay = self.timings.edit_return();
                if let Some(task) = state.return_task.take() {
                    task.abort();
                }
                state.return_task = Some(tokio::spawn(async move {
                    tokio::time::sleep(delay).await;
                    let mut state = controller.state.lock();
                    state.mode = EditMode::Viewing;
                    state.return_task = None;
                }));
                log_profile!(self.log_config, "profile saved, returning to view in {:?}", delay);
                Outcome::Applied
            }
            Err(e) => {
                state.notice = Some(Notice::Error(e.message()));
                Outcome::Failed
            }
        }
    }

    pub fn view(&self) -> ProfileView {
        let state = self.state.lock();

        if state.needs_onboarding {
            return ProfileView::Onboarding;
        }
        let Some(profile) = state.shadow.clone() else {
            return match &state.load_error {
                Some(err) => ProfileView::Error(err.clone()),
                None => ProfileView::Loading,
            };
        };

        match state.mode {
            EditMode::Viewing => ProfileView::Viewing {
                profile,
                editable: self.is_own(),
                notice: state.notice.clone(),
            },
            EditMode::Editing => ProfileView::Editing {
                bio_counter: format!("{}/{}", char_count(&state.form.bio), MAX_BIO_CHARS),
                form: state.form.clone(),
                saving: state.saving,
                notice: state.notice.clone(),
            },
        }
    }
}
