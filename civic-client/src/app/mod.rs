//! Controllers that keep page state in step with the server.
//!
//! Each controller owns its state behind a lock, talks to the backend only
//! through [`SocialApi`](crate::api::SocialApi), and reports every operation
//! as an [`Outcome`] with any user-facing message left in its [`Notice`].

pub mod pages;
pub mod polls;
pub mod posts;
pub mod profile;
pub mod search;
pub mod state;
pub mod validation;

pub use pages::{HomePage, PageStatus, ProfilePage};
pub use polls::{PollBody, PollCard, PollCarousel, PollHistory, PollsView, ResultsView};
pub use posts::{ComposerView, PostAction, PostController, PostListView, PostRow};
pub use profile::{ProfileController, ProfileLoad, ProfileView};
pub use search::{SearchController, SearchView};
pub use state::*;

#[cfg(test)]
mod tests;
