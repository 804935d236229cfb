//! Typed backend endpoints.
//!
//! Every authenticated call takes the bearer token explicitly: the client
//! holds no session state of its own.

use std::sync::Arc;

use serde::de::DeserializeOwned;
use serde_json::{json, Value};

use matcha_shared::identity::{Credentials, LoginResponse};
use matcha_shared::models::{
    BrowseQuery, BrowseResult, ChatMessage, Conversation, DateProposal, DateResponse,
    MessagePage, UserProfileView,
};
use matcha_shared::notification::Notification;
use matcha_shared::profile::{Location, ProfileSnapshot, Tag};
use matcha_shared::types::{ImageId, NotificationId, ProposalId, TagId, UserId};

use crate::error::ApiError;
use crate::transport::{ApiRequest, HttpTransport};

#[derive(Clone)]
pub struct ApiClient {
    transport: Arc<dyn HttpTransport>,
}

impl ApiClient {
    pub fn new(transport: Arc<dyn HttpTransport>) -> Self {
        Self { transport }
    }

    async fn call(&self, request: ApiRequest) -> Result<Value, ApiError> {
        self.transport.send(request).await
    }

    async fn call_as<T: DeserializeOwned>(&self, request: ApiRequest) -> Result<T, ApiError> {
        let value = self.call(request).await?;
        decode(value)
    }

    /// Decode `body[field]` instead of the whole body.
    async fn call_field<T: DeserializeOwned>(
        &self,
        request: ApiRequest,
        field: &str,
    ) -> Result<T, ApiError> {
        let mut value = self.call(request).await?;
        let inner = value
            .get_mut(field)
            .map(Value::take)
            .ok_or_else(|| ApiError::Decode(format!("missing field `{field}`")))?;
        decode(inner)
    }

    // -- auth ---------------------------------------------------------------

    pub async fn login(&self, credentials: &Credentials) -> Result<LoginResponse, ApiError> {
        let body = json!({
            "username": credentials.username,
            "password": credentials.password,
        });
        self.call_as(ApiRequest::post("auth/login").json(body)).await
    }

    pub async fn logout(&self, token: &str) -> Result<(), ApiError> {
        self.call(ApiRequest::post("auth/logout").bearer(token))
            .await
            .map(drop)
    }

    // -- own profile --------------------------------------------------------

    pub async fn fetch_profile(&self, token: &str) -> Result<ProfileSnapshot, ApiError> {
        self.call_as(ApiRequest::get("profile/me").bearer(token))
            .await
    }

    pub async fn update_profile(&self, token: &str, body: Value) -> Result<(), ApiError> {
        self.call(ApiRequest::put("profile/update").bearer(token).json(body))
            .await
            .map(drop)
    }

    pub async fn update_location(&self, token: &str, location: Location) -> Result<(), ApiError> {
        let body = json!({
            "latitude": location.latitude,
            "longitude": location.longitude,
        });
        self.call(ApiRequest::put("profile/location").bearer(token).json(body))
            .await
            .map(drop)
    }

    pub async fn upload_image(
        &self,
        token: &str,
        file_name: &str,
        mime: &str,
        bytes: Vec<u8>,
    ) -> Result<(), ApiError> {
        let request = ApiRequest::post("profile/images")
            .bearer(token)
            .multipart("image", file_name, mime, bytes);
        self.call(request).await.map(drop)
    }

    pub async fn delete_image(&self, token: &str, id: ImageId) -> Result<(), ApiError> {
        self.call(ApiRequest::delete(format!("profile/images/{id}")).bearer(token))
            .await
            .map(drop)
    }

    pub async fn set_primary_image(&self, token: &str, id: ImageId) -> Result<(), ApiError> {
        self.call(ApiRequest::put(format!("profile/images/{id}/primary")).bearer(token))
            .await
            .map(drop)
    }

    // -- tags ---------------------------------------------------------------

    pub async fn add_tags(&self, token: &str, tags: &[String]) -> Result<(), ApiError> {
        self.call(
            ApiRequest::post("tags")
                .bearer(token)
                .json(json!({ "tags": tags })),
        )
        .await
        .map(drop)
    }

    pub async fn remove_tag(&self, token: &str, id: TagId) -> Result<(), ApiError> {
        self.call(ApiRequest::delete(format!("tags/{id}")).bearer(token))
            .await
            .map(drop)
    }

    /// Public tag catalogue, optionally filtered by a substring.
    pub async fn search_tags(&self, query: Option<&str>) -> Result<Vec<Tag>, ApiError> {
        let mut request = ApiRequest::get("tags");
        if let Some(q) = query.map(str::trim).filter(|q| !q.is_empty()) {
            request = request.query("q", q);
        }
        self.call_field(request, "tags").await
    }

    // -- notifications ------------------------------------------------------

    pub async fn notifications(&self, token: &str) -> Result<Vec<Notification>, ApiError> {
        self.call_field(ApiRequest::get("notifications").bearer(token), "notifications")
            .await
    }

    pub async fn unread_count(&self, token: &str) -> Result<u32, ApiError> {
        self.call_field(
            ApiRequest::get("notifications/unread/count").bearer(token),
            "unread_count",
        )
        .await
    }

    pub async fn mark_notification_read(
        &self,
        token: &str,
        id: NotificationId,
    ) -> Result<(), ApiError> {
        self.call(ApiRequest::put(format!("notifications/{id}/read")).bearer(token))
            .await
            .map(drop)
    }

    // -- chat ---------------------------------------------------------------

    pub async fn conversations(&self, token: &str) -> Result<Vec<Conversation>, ApiError> {
        self.call_field(
            ApiRequest::get("chat/conversations").bearer(token),
            "conversations",
        )
        .await
    }

    pub async fn messages(
        &self,
        token: &str,
        user: UserId,
        limit: u32,
        before: Option<i64>,
    ) -> Result<MessagePage, ApiError> {
        let mut request = ApiRequest::get(format!("chat/messages/{user}"))
            .bearer(token)
            .query("limit", limit);
        if let Some(before) = before {
            request = request.query("before_id", before);
        }
        self.call_as(request).await
    }

    pub async fn send_message(
        &self,
        token: &str,
        user: UserId,
        content: &str,
    ) -> Result<ChatMessage, ApiError> {
        let request = ApiRequest::post(format!("chat/messages/{user}"))
            .bearer(token)
            .json(json!({ "content": content }));
        self.call_field(request, "data").await
    }

    pub async fn mark_messages_read(&self, token: &str, user: UserId) -> Result<(), ApiError> {
        self.call(ApiRequest::put(format!("chat/messages/{user}/read")).bearer(token))
            .await
            .map(drop)
    }

    // -- dates --------------------------------------------------------------

    pub async fn propose_date(
        &self,
        token: &str,
        user: UserId,
        body: Value,
    ) -> Result<DateProposal, ApiError> {
        let request = ApiRequest::post(format!("dates/{user}")).bearer(token).json(body);
        self.call_field(request, "data").await
    }

    pub async fn respond_to_date(
        &self,
        token: &str,
        id: ProposalId,
        response: DateResponse,
    ) -> Result<(), ApiError> {
        let request = ApiRequest::put(format!("dates/{id}/respond"))
            .bearer(token)
            .json(json!({ "status": response }));
        self.call(request).await.map(drop)
    }

    pub async fn date_proposals(
        &self,
        token: &str,
        user: UserId,
    ) -> Result<Vec<DateProposal>, ApiError> {
        self.call_field(
            ApiRequest::get(format!("dates/conversation/{user}")).bearer(token),
            "proposals",
        )
        .await
    }

    // -- browsing -----------------------------------------------------------

    pub async fn suggestions(
        &self,
        token: &str,
        query: &BrowseQuery,
    ) -> Result<BrowseResult, ApiError> {
        let request = ApiRequest::get("browsing")
            .bearer(token)
            .queries(query.to_query());
        self.call_as(request).await
    }

    pub async fn user_profile(
        &self,
        token: &str,
        user: UserId,
    ) -> Result<UserProfileView, ApiError> {
        self.call_as(ApiRequest::get(format!("users/{user}")).bearer(token))
            .await
    }
}

fn decode<T: DeserializeOwned>(value: Value) -> Result<T, ApiError> {
    serde_json::from_value(value).map_err(|e| ApiError::Decode(e.to_string()))
}
