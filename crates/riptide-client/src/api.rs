//! REST API surface used by the reconciliation layer.
//!
//! [`ServerApi`] is the seam the dispatcher talks through; [`HttpApi`] is
//! the real implementation. Tests substitute their own.

use std::collections::HashMap;

use async_trait::async_trait;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};

use riptide_shared::constants::API_PATH;
use riptide_shared::models::{
    Channel, ChannelMember, ChannelStats, Post, Status, Team, User,
};
use riptide_shared::types::{ChannelId, PostId, TeamId, UserId};

use crate::error::ApiError;

#[async_trait]
pub trait ServerApi: Send + Sync {
    async fn me(&self) -> Result<User, ApiError>;
    async fn user(&self, user_id: &UserId) -> Result<User, ApiError>;
    async fn statuses_by_ids(&self, user_ids: &[UserId]) -> Result<Vec<Status>, ApiError>;

    async fn my_teams(&self) -> Result<Vec<Team>, ApiError>;
    async fn team(&self, team_id: &TeamId) -> Result<Team, ApiError>;

    async fn my_channels(&self, team_id: &TeamId) -> Result<Vec<Channel>, ApiError>;
    async fn my_channel_members(&self, team_id: &TeamId)
        -> Result<Vec<ChannelMember>, ApiError>;
    async fn channel(&self, channel_id: &ChannelId) -> Result<Channel, ApiError>;
    async fn my_channel_member(
        &self,
        channel_id: &ChannelId,
    ) -> Result<ChannelMember, ApiError>;
    async fn channel_stats(&self, channel_id: &ChannelId) -> Result<ChannelStats, ApiError>;

    async fn posts(&self, channel_id: &ChannelId) -> Result<Vec<Post>, ApiError>;
    async fn posts_since(
        &self,
        channel_id: &ChannelId,
        since: i64,
    ) -> Result<Vec<Post>, ApiError>;

    async fn client_config(&self) -> Result<HashMap<String, String>, ApiError>;
}

// ---------------------------------------------------------------------------
// HTTP implementation
// ---------------------------------------------------------------------------

/// Post listings come back as an ordered ID list over an ID-keyed map.
#[derive(Debug, Deserialize)]
struct PostList {
    #[serde(default)]
    order: Vec<PostId>,
    #[serde(default)]
    posts: HashMap<PostId, Post>,
}

impl PostList {
    fn into_posts(mut self) -> Vec<Post> {
        let mut posts: Vec<Post> = self
            .order
            .iter()
            .filter_map(|id| self.posts.remove(id))
            .collect();
        // Anything the order list missed still counts.
        posts.extend(self.posts.into_values());
        posts
    }
}

pub struct HttpApi {
    client: reqwest::Client,
    base: String,
    token: Option<String>,
}

impl HttpApi {
    pub fn new(site_url: &str, token: Option<String>) -> Self {
        Self {
            client: reqwest::Client::new(),
            base: format!("{}{}", site_url.trim_end_matches('/'), API_PATH),
            token,
        }
    }

    fn request(&self, method: reqwest::Method, path: &str) -> reqwest::RequestBuilder {
        let mut builder = self.client.request(method, format!("{}{}", self.base, path));
        if let Some(token) = &self.token {
            builder = builder.bearer_auth(token);
        }
        builder
    }

    async fn get<T: DeserializeOwned>(&self, path: &str) -> Result<T, ApiError> {
        let response = self.request(reqwest::Method::GET, path).send().await?;
        Self::decode(path, response).await
    }

    async fn post<B: Serialize + ?Sized, T: DeserializeOwned>(
        &self,
        path: &str,
        body: &B,
    ) -> Result<T, ApiError> {
        let response = self
            .request(reqwest::Method::POST, path)
            .json(body)
            .send()
            .await?;
        Self::decode(path, response).await
    }

    async fn decode<T: DeserializeOwned>(
        path: &str,
        response: reqwest::Response,
    ) -> Result<T, ApiError> {
        let status = response.status();
        if !status.is_success() {
            return Err(ApiError::Status {
                status: status.as_u16(),
                path: path.to_string(),
            });
        }
        Ok(response.json().await?)
    }
}

#[async_trait]
impl ServerApi for HttpApi {
    async fn me(&self) -> Result<User, ApiError> {
        self.get("/users/me").await
    }

    async fn user(&self, user_id: &UserId) -> Result<User, ApiError> {
        self.get(&format!("/users/{user_id}")).await
    }

    async fn statuses_by_ids(&self, user_ids: &[UserId]) -> Result<Vec<Status>, ApiError> {
        self.post("/users/status/ids", user_ids).await
    }

    async fn my_teams(&self) -> Result<Vec<Team>, ApiError> {
        self.get("/users/me/teams").await
    }

    async fn team(&self, team_id: &TeamId) -> Result<Team, ApiError> {
        self.get(&format!("/teams/{team_id}")).await
    }

    async fn my_channels(&self, team_id: &TeamId) -> Result<Vec<Channel>, ApiError> {
        self.get(&format!("/users/me/teams/{team_id}/channels")).await
    }

    async fn my_channel_members(
        &self,
        team_id: &TeamId,
    ) -> Result<Vec<ChannelMember>, ApiError> {
        self.get(&format!("/users/me/teams/{team_id}/channels/members"))
            .await
    }

    async fn channel(&self, channel_id: &ChannelId) -> Result<Channel, ApiError> {
        self.get(&format!("/channels/{channel_id}")).await
    }

    async fn my_channel_member(
        &self,
        channel_id: &ChannelId,
    ) -> Result<ChannelMember, ApiError> {
        self.get(&format!("/channels/{channel_id}/members/me")).await
    }

    async fn channel_stats(&self, channel_id: &ChannelId) -> Result<ChannelStats, ApiError> {
        self.get(&format!("/channels/{channel_id}/stats")).await
    }

    async fn posts(&self, channel_id: &ChannelId) -> Result<Vec<Post>, ApiError> {
        let list: PostList = self.get(&format!("/channels/{channel_id}/posts")).await?;
        Ok(list.into_posts())
    }

    async fn posts_since(
        &self,
        channel_id: &ChannelId,
        since: i64,
    ) -> Result<Vec<Post>, ApiError> {
        let list: PostList = self
            .get(&format!("/channels/{channel_id}/posts?since={since}"))
            .await?;
        Ok(list.into_posts())
    }

    async fn client_config(&self) -> Result<HashMap<String, String>, ApiError> {
        self.get("/config/client?format=old").await
    }
}
