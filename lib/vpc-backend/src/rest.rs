//! REST implementation of [`BackendClient`] over the backend's policy API

use async_trait::async_trait;
use reqwest::{Method, RequestBuilder, Response, StatusCode};
use serde::de::DeserializeOwned;
use serde::Deserialize;
use std::time::Duration;
use tracing::{debug, warn};
use vpc_api::backend::realization::RealizedEntityList;
use vpc_api::backend::{
    ConnectivityProfile, LbService, NatRule, OrgRoot, RealizedEntity, SearchPage, Vpc, VpcInfo,
};

use crate::{BackendClient, BackendError, Result};

/// Prefix of every policy API path
pub const API_PREFIX: &str = "/policy/api/v1";

/// Connection settings for the backend
#[derive(Clone, Debug)]
pub struct RestConfig {
    /// Scheme and authority, e.g. `https://backend.example.com`
    pub base_url: String,
    pub username: Option<String>,
    pub password: Option<String>,
    /// Accept self-signed certificates
    pub insecure: bool,
    pub timeout: Duration,
}

impl RestConfig {
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into(),
            username: None,
            password: None,
            insecure: false,
            timeout: Duration::from_secs(30),
        }
    }

    pub fn with_basic_auth(mut self, username: impl Into<String>, password: impl Into<String>) -> Self {
        self.username = Some(username.into());
        self.password = Some(password.into());
        self
    }

    pub fn with_insecure(mut self, insecure: bool) -> Self {
        self.insecure = insecure;
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }
}

#[derive(Deserialize)]
struct ListResult<T> {
    #[serde(default = "Vec::new")]
    results: Vec<T>,
}

/// RestClient talks JSON over HTTPS to the backend
pub struct RestClient {
    http: reqwest::Client,
    config: RestConfig,
}

impl RestClient {
    pub fn new(config: RestConfig) -> Result<Self> {
        if config.base_url.is_empty() {
            return Err(BackendError::InvalidConfiguration(
                "base URL is empty".to_string(),
            ));
        }
        let http = reqwest::Client::builder()
            .danger_accept_invalid_certs(config.insecure)
            .timeout(config.timeout)
            .build()?;
        Ok(Self { http, config })
    }

    fn url(&self, path: &str) -> String {
        format!(
            "{}{}{}",
            self.config.base_url.trim_end_matches('/'),
            API_PREFIX,
            path
        )
    }

    fn request(&self, method: Method, path: &str) -> RequestBuilder {
        let builder = self.http.request(method, self.url(path));
        match &self.config.username {
            Some(user) => builder.basic_auth(user, self.config.password.as_deref()),
            None => builder,
        }
    }

    /// Send and turn non-success statuses into errors
    async fn send(&self, method: Method, path: &str, builder: RequestBuilder) -> Result<Response> {
        debug!(%method, path, "backend request");
        let response = builder.send().await?;
        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }
        if status == StatusCode::NOT_FOUND {
            return Err(BackendError::NotFound(path.to_string()));
        }
        let message = response.text().await.unwrap_or_default();
        warn!(%method, path, status = status.as_u16(), "backend request failed");
        Err(BackendError::Status {
            method: method.to_string(),
            path: path.to_string(),
            status: status.as_u16(),
            message,
        })
    }

    async fn get_json<T: DeserializeOwned>(&self, path: &str) -> Result<T> {
        let builder = self.request(Method::GET, path);
        let response = self.send(Method::GET, path, builder).await?;
        let bytes = response.bytes().await?;
        Ok(serde_json::from_slice(&bytes)?)
    }

    async fn delete(&self, path: &str, builder: RequestBuilder) -> Result<()> {
        match self.send(Method::DELETE, path, builder).await {
            Ok(_) => Ok(()),
            Err(e) if e.is_not_found() => {
                debug!(path, "delete target already absent");
                Ok(())
            }
            Err(e) => Err(e),
        }
    }
}

#[async_trait]
impl BackendClient for RestClient {
    async fn get_vpc(&self, info: &VpcInfo) -> Result<Vpc> {
        self.get_json(&info.path()).await
    }

    async fn delete_vpc(&self, info: &VpcInfo, recursive: bool) -> Result<()> {
        let path = info.path();
        let mut builder = self.request(Method::DELETE, &path);
        if recursive {
            builder = builder.query(&[("is_recursive", "true")]);
        }
        self.delete(&path, builder).await
    }

    async fn get_lb_service(&self, info: &VpcInfo, id: &str) -> Result<LbService> {
        self.get_json(&format!("{}/vpc-lbs/{}", info.path(), id)).await
    }

    async fn patch_org_root(&self, root: &OrgRoot) -> Result<()> {
        let path = "/org-root";
        let builder = self.request(Method::PATCH, path).json(root);
        self.send(Method::PATCH, path, builder).await?;
        Ok(())
    }

    async fn search(&self, query: &str, cursor: Option<String>) -> Result<SearchPage> {
        let path = "/search/query";
        let mut builder = self.request(Method::GET, path).query(&[("query", query)]);
        if let Some(cursor) = cursor.as_deref() {
            builder = builder.query(&[("cursor", cursor)]);
        }
        let response = self.send(Method::GET, path, builder).await?;
        let bytes = response.bytes().await?;
        Ok(serde_json::from_slice(&bytes)?)
    }

    async fn realized_entities(&self, intent_path: &str) -> Result<Vec<RealizedEntity>> {
        let path = "/infra/realized-state/realized-entities";
        let builder = self
            .request(Method::GET, path)
            .query(&[("intent_path", intent_path)]);
        let response = self.send(Method::GET, path, builder).await?;
        let bytes = response.bytes().await?;
        let list: RealizedEntityList = serde_json::from_slice(&bytes)?;
        Ok(list.results)
    }

    async fn get_connectivity_profile(&self, path: &str) -> Result<ConnectivityProfile> {
        self.get_json(path).await
    }

    async fn probe(&self, endpoint: &str) -> Result<()> {
        let builder = self.request(Method::GET, endpoint);
        self.send(Method::GET, endpoint, builder).await?;
        Ok(())
    }

    async fn delete_by_path(&self, path: &str) -> Result<()> {
        let builder = self.request(Method::DELETE, path);
        self.delete(path, builder).await
    }

    async fn list_nat_rules(&self, info: &VpcInfo) -> Result<Vec<NatRule>> {
        let list: ListResult<NatRule> = self
            .get_json(&format!("{}/nat/USER/nat-rules", info.path()))
            .await?;
        Ok(list.results)
    }
}
