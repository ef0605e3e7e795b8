// Plain-text rendering of controller views, split into cohesive submodules
pub mod formatting;
mod render;

pub use self::render::{
    render_composer, render_history, render_polls, render_post_list, render_profile, render_search,
};
