use std::time::Duration;

use reqwest::Client;
use serde_json::Value;
use tracing::{debug, info};
use url::{Url, form_urlencoded};

use crate::{
    schemas::{AppTokenRequest, AppTokenResponse, RealmTokenResponse},
    utilities::{
        config::{ClusterConfig, TokenFlow},
        errors::AppError,
    },
};

/// Raw status and body of a control-plane call. Classification is left to the caller.
#[derive(Clone, Debug)]
pub struct ApiResponse {
    pub status: u16,
    pub body: String,
}

impl ApiResponse {
    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }

    pub fn json(&self) -> Result<Value, AppError> {
        if self.body.trim().is_empty() {
            return Ok(Value::Null);
        }
        Ok(serde_json::from_str(&self.body)?)
    }
}

/// Authenticated HTTP client for one deployment of the control plane.
#[derive(Clone, Debug)]
pub struct ControlPlaneClient {
    base_url: Url,
    client: Client,
    token: String,
}

impl ControlPlaneClient {
    pub async fn connect(cluster: &ClusterConfig, timeout: Duration) -> Result<Self, AppError> {
        let client = Client::builder().timeout(timeout).build()?;
        let token = fetch_token(&client, cluster).await?;
        info!("🔐 Authenticated against {}", cluster.base_url);

        Ok(Self {
            base_url: cluster.base_url.clone(),
            client,
            token,
        })
    }

    pub fn base_url(&self) -> &Url {
        &self.base_url
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url.as_str().trim_end_matches('/'), path)
    }

    pub async fn get(&self, path: &str) -> Result<ApiResponse, AppError> {
        let res = self
            .client
            .get(self.url(path))
            .bearer_auth(&self.token)
            .header("accept", "application/json")
            .send()
            .await?;

        let status = res.status().as_u16();
        let body = res.text().await?;
        debug!("GET {} -> {}", path, status);

        Ok(ApiResponse { status, body })
    }

    pub async fn post(&self, path: &str, payload: &Value) -> Result<ApiResponse, AppError> {
        let res = self
            .client
            .post(self.url(path))
            .bearer_auth(&self.token)
            .header("accept", "application/json")
            .json(payload)
            .send()
            .await?;

        let status = res.status().as_u16();
        let body = res.text().await?;
        debug!("POST {} -> {}", path, status);
        debug!("response body: {}", body);

        Ok(ApiResponse { status, body })
    }
}

async fn fetch_token(client: &Client, cluster: &ClusterConfig) -> Result<String, AppError> {
    let base = cluster.base_url.as_str().trim_end_matches('/');
    let auth_failure = |reason: String| AppError::AuthFailure {
        base_url: base.to_string(),
        reason,
    };

    let request = match &cluster.token_flow {
        TokenFlow::AppToken => client
            .post(format!("{base}/api/v1/token"))
            .header("content-type", "application/json")
            .json(&AppTokenRequest {
                grant_type: "app_token",
                app_id: &cluster.client_id,
                app_secret: &cluster.client_secret,
            }),
        TokenFlow::Realm(realm) => {
            let form = form_urlencoded::Serializer::new(String::new())
                .append_pair("grant_type", "client_credentials")
                .append_pair("client_id", &cluster.client_id)
                .append_pair("client_secret", &cluster.client_secret)
                .finish();
            client
                .post(format!(
                    "{base}/auth/realms/{realm}/protocol/openid-connect/token"
                ))
                .header("content-type", "application/x-www-form-urlencoded")
                .body(form)
        }
    };

    let res = request
        .send()
        .await
        .map_err(|e| auth_failure(format!("token request failed: {e}")))?;
    let status = res.status();
    let text = res
        .text()
        .await
        .map_err(|e| auth_failure(format!("failed to read token response: {e}")))?;

    debug!("token response status: {}", status);

    if !status.is_success() {
        return Err(auth_failure(format!("status {status}, body {text}")));
    }

    let token = match &cluster.token_flow {
        TokenFlow::AppToken => serde_json::from_str::<AppTokenResponse>(&text)
            .map_err(|e| auth_failure(format!("failed to decode token response: {e}")))?
            .access_token,
        TokenFlow::Realm(_) => serde_json::from_str::<RealmTokenResponse>(&text)
            .map_err(|e| auth_failure(format!("failed to decode token response: {e}")))?
            .access_token,
    };

    token
        .filter(|t| !t.is_empty())
        .ok_or_else(|| auth_failure(format!("no access token in response body {text}")))
}
