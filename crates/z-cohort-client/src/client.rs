//! Z-Cohort HTTP client implementation.

use reqwest::{Client, RequestBuilder};
use std::time::Duration;

use crate::error::ClientError;
use crate::types::{
    ApiErrorResponse, CreateSegmentRequest, CreateUserRequest, DeleteResponse,
    DistributeSegmentRequest, DistributionReport, DistributionRequest, HealthResponse,
    MembershipInfo, MembershipRequest, SegmentInfo, UpdateSegmentRequest, UpdateUserRequest,
    UserInfo, UserStats, UserWithSegments,
};

/// Z-Cohort API client.
///
/// Covers user and segment management, direct assignment and distribution.
#[derive(Debug, Clone)]
pub struct CohortClient {
    client: Client,
    base_url: String,
    service_name: String,
}

impl CohortClient {
    /// Create a new z-cohort client.
    ///
    /// # Arguments
    ///
    /// * `base_url` - Base URL of the z-cohort service (e.g., `"http://z-cohort:8080"`)
    ///
    /// # Errors
    ///
    /// Returns `ClientError::Configuration` if the HTTP client cannot be built.
    pub fn new(base_url: impl Into<String>) -> Result<Self, ClientError> {
        Self::with_options(base_url, ClientOptions::default())
    }

    /// Create a new z-cohort client with custom options.
    ///
    /// # Errors
    ///
    /// Returns `ClientError::Configuration` if the HTTP client cannot be built.
    pub fn with_options(
        base_url: impl Into<String>,
        options: ClientOptions,
    ) -> Result<Self, ClientError> {
        let client = Client::builder()
            .timeout(Duration::from_secs(options.timeout_seconds))
            .build()
            .map_err(|e| ClientError::Configuration(format!("failed to build HTTP client: {e}")))?;

        Ok(Self {
            client,
            base_url: base_url.into().trim_end_matches('/').to_string(),
            service_name: options.service_name,
        })
    }

    /// Check service health.
    ///
    /// # Errors
    ///
    /// Returns an error if the request fails or the server returns an error.
    pub async fn health(&self) -> Result<HealthResponse, ClientError> {
        let url = format!("{}/health", self.base_url);
        self.send(self.client.get(&url)).await
    }

    // =========================================================================
    // Users
    // =========================================================================

    /// Create a user.
    ///
    /// # Errors
    ///
    /// Returns `ClientError::AlreadyExists` if the requested ID is taken.
    pub async fn create_user(&self, request: CreateUserRequest) -> Result<UserInfo, ClientError> {
        let url = format!("{}/v1/users", self.base_url);
        self.send(self.client.post(&url).json(&request)).await
    }

    /// List users ordered by ID.
    ///
    /// # Errors
    ///
    /// Returns an error if the request fails or the server returns an error.
    pub async fn list_users(&self, active_only: bool) -> Result<Vec<UserInfo>, ClientError> {
        let url = format!("{}/v1/users", self.base_url);
        self.send(
            self.client
                .get(&url)
                .query(&[("active_only", active_only)]),
        )
        .await
    }

    /// Get a user with its segments.
    ///
    /// # Errors
    ///
    /// Returns `ClientError::NotFound` if the user doesn't exist.
    pub async fn get_user(&self, user_id: u64) -> Result<UserWithSegments, ClientError> {
        let url = format!("{}/v1/users/{user_id}", self.base_url);
        self.send(self.client.get(&url)).await
    }

    /// Update a user's name or activity flag.
    ///
    /// # Errors
    ///
    /// Returns `ClientError::NotFound` if the user doesn't exist.
    pub async fn update_user(
        &self,
        user_id: u64,
        request: UpdateUserRequest,
    ) -> Result<UserInfo, ClientError> {
        let url = format!("{}/v1/users/{user_id}", self.base_url);
        self.send(self.client.patch(&url).json(&request)).await
    }

    /// Delete a user and its memberships.
    ///
    /// # Errors
    ///
    /// Returns `ClientError::NotFound` if the user doesn't exist.
    pub async fn delete_user(&self, user_id: u64) -> Result<DeleteResponse, ClientError> {
        let url = format!("{}/v1/users/{user_id}", self.base_url);
        self.send(self.client.delete(&url)).await
    }

    /// Slugs of the segments a user belongs to.
    ///
    /// # Errors
    ///
    /// Returns `ClientError::NotFound` if the user doesn't exist.
    pub async fn user_segments(&self, user_id: u64) -> Result<Vec<String>, ClientError> {
        let url = format!("{}/v1/users/{user_id}/segments", self.base_url);
        self.send(self.client.get(&url)).await
    }

    /// Membership summary for a user.
    ///
    /// # Errors
    ///
    /// Returns `ClientError::NotFound` if the user doesn't exist.
    pub async fn user_stats(&self, user_id: u64) -> Result<UserStats, ClientError> {
        let url = format!("{}/v1/users/{user_id}/stats", self.base_url);
        self.send(self.client.get(&url)).await
    }

    /// Assign a user to a segment.
    ///
    /// # Errors
    ///
    /// Returns `ClientError::AlreadyAssigned` if the user is already a member.
    pub async fn assign(
        &self,
        user_id: u64,
        segment_id: u64,
    ) -> Result<MembershipInfo, ClientError> {
        let url = format!("{}/v1/users/assign", self.base_url);
        let request = MembershipRequest {
            user_id,
            segment_id,
        };
        self.send(self.client.post(&url).json(&request)).await
    }

    /// Remove a user from a segment.
    ///
    /// # Errors
    ///
    /// Returns `ClientError::NotFound` if the user is not a member.
    pub async fn unassign(&self, user_id: u64, segment_id: u64) -> Result<(), ClientError> {
        let url = format!("{}/v1/users/unassign", self.base_url);
        let request = MembershipRequest {
            user_id,
            segment_id,
        };
        let _: serde_json::Value = self.send(self.client.delete(&url).json(&request)).await?;
        Ok(())
    }

    // =========================================================================
    // Segments
    // =========================================================================

    /// Create a segment.
    ///
    /// # Errors
    ///
    /// - `ClientError::InvalidArgument` for a malformed slug, name or description.
    /// - `ClientError::AlreadyExists` if the slug or name is taken.
    pub async fn create_segment(
        &self,
        request: CreateSegmentRequest,
    ) -> Result<SegmentInfo, ClientError> {
        let url = format!("{}/v1/segments", self.base_url);
        self.send(self.client.post(&url).json(&request)).await
    }

    /// List segments ordered by ID.
    ///
    /// # Errors
    ///
    /// Returns an error if the request fails or the server returns an error.
    pub async fn list_segments(&self) -> Result<Vec<SegmentInfo>, ClientError> {
        let url = format!("{}/v1/segments", self.base_url);
        self.send(self.client.get(&url)).await
    }

    /// Get a segment by ID.
    ///
    /// # Errors
    ///
    /// Returns `ClientError::NotFound` if the segment doesn't exist.
    pub async fn get_segment(&self, segment_id: u64) -> Result<SegmentInfo, ClientError> {
        let url = format!("{}/v1/segments/{segment_id}", self.base_url);
        self.send(self.client.get(&url)).await
    }

    /// Get a segment by slug.
    ///
    /// # Errors
    ///
    /// Returns `ClientError::NotFound` if no segment has this slug.
    pub async fn get_segment_by_slug(&self, slug: &str) -> Result<SegmentInfo, ClientError> {
        let url = format!("{}/v1/segments/by-slug/{slug}", self.base_url);
        self.send(self.client.get(&url)).await
    }

    /// Update a segment's name or description.
    ///
    /// # Errors
    ///
    /// Returns `ClientError::NotFound` if the segment doesn't exist.
    pub async fn update_segment(
        &self,
        segment_id: u64,
        request: UpdateSegmentRequest,
    ) -> Result<SegmentInfo, ClientError> {
        let url = format!("{}/v1/segments/{segment_id}", self.base_url);
        self.send(self.client.patch(&url).json(&request)).await
    }

    /// Delete a segment and its memberships.
    ///
    /// # Errors
    ///
    /// Returns `ClientError::NotFound` if the segment doesn't exist.
    pub async fn delete_segment(&self, segment_id: u64) -> Result<DeleteResponse, ClientError> {
        let url = format!("{}/v1/segments/{segment_id}", self.base_url);
        self.send(self.client.delete(&url)).await
    }

    /// IDs of a segment's members.
    ///
    /// # Errors
    ///
    /// Returns `ClientError::NotFound` if the segment doesn't exist.
    pub async fn segment_users(&self, segment_id: u64) -> Result<Vec<u64>, ClientError> {
        let url = format!("{}/v1/segments/{segment_id}/users", self.base_url);
        self.send(self.client.get(&url)).await
    }

    // =========================================================================
    // Distribution
    // =========================================================================

    /// Randomly assign a percentage of users to a segment.
    ///
    /// # Errors
    ///
    /// - `ClientError::NotFound` if the segment doesn't exist.
    /// - `ClientError::InvalidArgument` if the percent is outside `[0, 100]`.
    pub async fn distribute(
        &self,
        request: &DistributionRequest,
    ) -> Result<DistributionReport, ClientError> {
        let url = format!("{}/v1/distribute", self.base_url);
        self.send(self.client.post(&url).json(request)).await
    }

    /// Same as [`CohortClient::distribute`], addressed through the segment path.
    ///
    /// # Errors
    ///
    /// - `ClientError::NotFound` if the segment doesn't exist.
    /// - `ClientError::InvalidArgument` if the percent is outside `[0, 100]`.
    pub async fn distribute_segment(
        &self,
        segment_id: u64,
        percent: f64,
        overwrite_existing: bool,
        active_only: bool,
    ) -> Result<DistributionReport, ClientError> {
        let url = format!("{}/v1/segments/{segment_id}/distribute", self.base_url);
        let request = DistributeSegmentRequest {
            percent,
            overwrite_existing,
            active_only,
        };
        self.send(self.client.post(&url).json(&request)).await
    }

    /// Send a request with the common headers and decode the response.
    async fn send<T: serde::de::DeserializeOwned>(
        &self,
        request: RequestBuilder,
    ) -> Result<T, ClientError> {
        let response = request
            .header("x-service-name", &self.service_name)
            .send()
            .await?;

        self.handle_response(response).await
    }

    /// Handle API response and convert errors.
    async fn handle_response<T: serde::de::DeserializeOwned>(
        &self,
        response: reqwest::Response,
    ) -> Result<T, ClientError> {
        let status = response.status();

        if status.is_success() {
            return Ok(response.json().await?);
        }

        // Try to parse error response
        let error_body: Result<ApiErrorResponse, _> = response.json().await;

        match error_body {
            Ok(api_error) => {
                let message = api_error.error.message;

                tracing::debug!(
                    status = status.as_u16(),
                    code = %api_error.error.code,
                    "z-cohort request failed"
                );

                // Map specific error codes to typed errors
                match api_error.error.code.as_str() {
                    "not_found" => Err(ClientError::NotFound(message)),
                    "conflict" => Err(ClientError::AlreadyAssigned(message)),
                    "already_exists" => Err(ClientError::AlreadyExists(message)),
                    "invalid_argument" => Err(ClientError::InvalidArgument(message)),
                    code => Err(ClientError::Api {
                        code: code.to_string(),
                        message,
                        status: status.as_u16(),
                    }),
                }
            }
            Err(_) => Err(ClientError::Api {
                code: "unknown".to_string(),
                message: format!("HTTP {status}"),
                status: status.as_u16(),
            }),
        }
    }
}

/// Client options for customization.
#[derive(Debug, Clone)]
pub struct ClientOptions {
    /// Request timeout in seconds (default: 30).
    pub timeout_seconds: u64,
    /// Service name sent as `x-service-name`.
    pub service_name: String,
}

impl Default for ClientOptions {
    fn default() -> Self {
        Self {
            timeout_seconds: 30,
            service_name: "unknown".to_string(),
        }
    }
}

impl ClientOptions {
    /// Create options with a service name.
    #[must_use]
    pub fn with_service_name(name: impl Into<String>) -> Self {
        Self {
            service_name: name.into(),
            ..Self::default()
        }
    }
}
