mod backend;
mod client;
mod error;

pub use backend::SocialApi;
pub use client::ApiClient;
pub use error::{ApiError, ApiResult};
