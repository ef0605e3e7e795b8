use async_trait::async_trait;
use reqwest::{Client, StatusCode};
use serde::de::DeserializeOwned;
use uuid::Uuid;

use super::{ApiError, ApiResult, SocialApi};
use civic_types::*;

/// API client for communicating with the Civic server
#[derive(Clone)]
pub struct ApiClient {
    client: Client,
    base_url: String,
    bearer_token: Option<String>,
}

impl ApiClient {
    /// Create a new API client
    pub fn new(base_url: impl Into<String>) -> Self {
        let base_url: String = base_url.into();
        Self {
            client: Client::new(),
            base_url: base_url.trim_end_matches('/').to_string(),
            bearer_token: None,
        }
    }

    /// Set the bearer token for authenticated requests
    pub fn set_bearer_token(&mut self, token: Option<String>) {
        self.bearer_token = token;
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Helper to add the bearer token to a request if available
    fn add_auth_header(&self, req: reqwest::RequestBuilder) -> reqwest::RequestBuilder {
        if let Some(token) = &self.bearer_token {
            req.bearer_auth(token)
        } else {
            req
        }
    }

    fn url(&self, path: &str, params: &[(&str, Option<&str>)]) -> String {
        let mut url = format!("{}{}", self.base_url, path);
        let query: Vec<String> = params
            .iter()
            .filter_map(|(key, value)| {
                value.map(|v| format!("{}={}", key, urlencoding::encode(v)))
            })
            .collect();

        if !query.is_empty() {
            url.push('?');
            url.push_str(&query.join("&"));
        }
        url
    }

    /// Turn a non-success response into the matching error variant
    async fn error_from(&self, response: reqwest::Response) -> ApiError {
        let status = response.status();
        let error_text = response
            .text()
            .await
            .unwrap_or_else(|_| "Unknown error".to_string());

        // Clean up HTML error messages (e.g., from nginx 404 pages)
        let clean_error = if error_text.contains("<html>") || error_text.contains("<!DOCTYPE") {
            format!("Server returned {} error. Please check the server URL.", status.as_u16())
        } else if let Ok(body) = serde_json::from_str::<ErrorResponse>(&error_text) {
            body.error
        } else if error_text.trim().is_empty() {
            format!("Server returned {} error", status.as_u16())
        } else {
            error_text
        };

        match status.as_u16() {
            404 => ApiError::NotFound(clean_error),
            401 => ApiError::Unauthorized(clean_error),
            403 => ApiError::Forbidden(clean_error),
            400 => ApiError::BadRequest(clean_error),
            _ => ApiError::Api(clean_error),
        }
    }

    /// Helper to handle API responses
    async fn handle_response<T: DeserializeOwned>(&self, response: reqwest::Response) -> ApiResult<T> {
        if response.status().is_success() {
            let body = response.text().await?;
            Ok(serde_json::from_str(&body)?)
        } else {
            Err(self.error_from(response).await)
        }
    }

    /// Like `handle_response`, for endpoints that answer with no content
    async fn handle_empty_response(&self, response: reqwest::Response) -> ApiResult<()> {
        if response.status().is_success() {
            Ok(())
        } else {
            Err(self.error_from(response).await)
        }
    }
}

#[async_trait]
impl SocialApi for ApiClient {
    // Post endpoints

    async fn create_post(&self, content: String) -> ApiResult<Post> {
        let url = self.url("/posts", &[]);
        let request = CreatePostRequest { content };
        let req = self.add_auth_header(self.client.post(&url).json(&request));
        let response = req.send().await?;
        self.handle_response(response).await
    }

    async fn get_feed(&self) -> ApiResult<Vec<Post>> {
        let url = self.url("/posts", &[]);
        let req = self.add_auth_header(self.client.get(&url));
        let response = req.send().await?;
        self.handle_response(response).await
    }

    async fn get_user_posts(&self, user_id: Option<String>) -> ApiResult<Vec<Post>> {
        let url = self.url("/posts/user", &[("user_id", user_id.as_deref())]);
        let req = self.add_auth_header(self.client.get(&url));
        let response = req.send().await?;
        self.handle_response(response).await
    }

    async fn update_post(&self, post_id: Uuid, content: String) -> ApiResult<Post> {
        let url = self.url(&format!("/posts/{}", post_id), &[]);
        let request = UpdatePostRequest { content };
        let req = self.add_auth_header(self.client.put(&url).json(&request));
        let response = req.send().await?;
        self.handle_response(response).await
    }

    async fn delete_post(&self, post_id: Uuid) -> ApiResult<()> {
        let url = self.url(&format!("/posts/{}", post_id), &[]);
        let req = self.add_auth_header(self.client.delete(&url));
        let response = req.send().await?;
        self.handle_empty_response(response).await
    }

    // Poll endpoints

    async fn get_polls(&self) -> ApiResult<Vec<Poll>> {
        let url = self.url("/polls", &[]);
        let req = self.add_auth_header(self.client.get(&url));
        let response = req.send().await?;
        self.handle_response(response).await
    }

    async fn vote_poll(
        &self,
        poll_id: String,
        answer: PollAnswer,
        reason: Option<String>,
    ) -> ApiResult<PollVote> {
        let url = self.url(&format!("/polls/{}/vote", urlencoding::encode(&poll_id)), &[]);
        let request = VotePollRequest { answer, reason };
        let req = self.add_auth_header(self.client.post(&url).json(&request));
        let response = req.send().await?;
        self.handle_response(response).await
    }

    async fn get_poll_results(&self, poll_id: String) -> ApiResult<PollResults> {
        let url = self.url(&format!("/polls/{}/results", urlencoding::encode(&poll_id)), &[]);
        let req = self.add_auth_header(self.client.get(&url));
        let response = req.send().await?;
        self.handle_response(response).await
    }

    async fn get_user_poll_votes(&self, user_id: Option<String>) -> ApiResult<Vec<PollVote>> {
        let url = self.url("/polls/user/votes", &[("user_id", user_id.as_deref())]);
        let req = self.add_auth_header(self.client.get(&url));
        let response = req.send().await?;
        self.handle_response(response).await
    }

    // Profile endpoints

    async fn get_profile(&self, user_id: Option<String>) -> ApiResult<Option<Profile>> {
        let url = self.url("/profile", &[("user_id", user_id.as_deref())]);
        let req = self.add_auth_header(self.client.get(&url));
        let response = req.send().await?;

        // A missing profile is not an error: it sends the user to onboarding
        if response.status() == StatusCode::NOT_FOUND {
            return Ok(None);
        }
        self.handle_response(response).await
    }

    async fn update_profile(&self, request: UpdateProfileRequest) -> ApiResult<Profile> {
        let url = self.url("/profile", &[]);
        let req = self.add_auth_header(self.client.put(&url).json(&request));
        let response = req.send().await?;
        self.handle_response(response).await
    }

    async fn search_profiles(&self, query: String) -> ApiResult<SearchProfilesResponse> {
        let url = self.url("/search/profiles", &[("q", Some(query.as_str()))]);
        let req = self.add_auth_header(self.client.get(&url));
        let response = req.send().await?;
        self.handle_response(response).await
    }
}
