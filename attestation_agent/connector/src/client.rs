/*
 * Copyright (c) Huawei Technologies Co., Ltd. 2025. All rights reserved.
 * Global Trust Authority is licensed under the Mulan PSL v2.
 * You can use this software according to the terms and conditions of the Mulan PSL v2.
 * You may obtain a copy of Mulan PSL v2 at:
 *     http://license.coscl.org.cn/MulanPSL2
 * THIS SOFTWARE IS PROVIDED ON AN "AS IS" BASIS, WITHOUT WARRANTIES OF ANY KIND, EITHER EXPRESS OR
 * IMPLIED, INCLUDING BUT NOT LIMITED TO NON-INFRINGEMENT, MERCHANTABILITY OR FIT FOR A PARTICULAR
 * PURPOSE.
 * See the Mulan PSL v2 for more details.
 */

use crate::attest::TokenRequest;
use crate::connector_error::ConnectorError;
use crate::nonce::Nonce;
use log::{debug, error, info};
use reqwest::header::{HeaderMap, HeaderValue, ACCEPT};
use reqwest::{Client as ReqwestClient, Response};
use serde::Deserialize;
use std::time::Duration;
use validator::Validate;

pub const HEADER_API_KEY: &str = "x-api-key";
pub const HEADER_REQUEST_ID: &str = "request-id";

const NONCE_PATH: &str = "appraisal/v1/nonce";
const ATTEST_PATH: &str = "appraisal/v1/attest";
const CERTS_PATH: &str = "certs";

/// Verification service endpoints and credentials.
#[derive(Clone, Debug, Validate)]
pub struct ConnectorConfig {
    #[validate(url)]
    base_url: String,
    #[validate(url)]
    api_url: String,
    #[validate(length(min = 1))]
    api_key: String,
    ca_cert_pem: Option<Vec<u8>>,
    timeout: Option<Duration>,
}

impl Default for ConnectorConfig {
    fn default() -> Self {
        Self {
            base_url: String::new(),
            api_url: String::new(),
            api_key: String::new(),
            ca_cert_pem: None,
            timeout: None,
        }
    }
}

impl ConnectorConfig {
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the portal URL. The API URL follows it unless set explicitly.
    pub fn with_base_url<S: Into<String>>(mut self, base_url: S) -> Self {
        let base_url = base_url.into();
        if self.api_url.is_empty() {
            self.api_url = base_url.clone();
        }
        self.base_url = base_url;
        self
    }

    pub fn with_api_url<S: Into<String>>(mut self, api_url: S) -> Self {
        self.api_url = api_url.into();
        self
    }

    pub fn with_api_key<S: Into<String>>(mut self, api_key: S) -> Self {
        self.api_key = api_key.into();
        self
    }

    pub fn with_ca_cert_pem(mut self, pem: Option<Vec<u8>>) -> Self {
        self.ca_cert_pem = pem;
        self
    }

    /// Bounds every request to the service. Without it requests wait until
    /// the caller's own cancellation fires.
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    pub fn api_url(&self) -> &str {
        &self.api_url
    }

    pub fn timeout(&self) -> Option<Duration> {
        self.timeout
    }

    pub fn validate_config(&self) -> Result<(), ConnectorError> {
        self.validate().map_err(|err| ConnectorError::Configuration(format!("Validation failed: {}", err)))?;
        if self.timeout.is_some_and(|timeout| timeout.is_zero()) {
            return Err(ConnectorError::Configuration("Request timeout must be greater than zero".to_string()));
        }
        Ok(())
    }
}

#[derive(Deserialize)]
struct TokenResponse {
    token: String,
}

/// HTTP client for the verification service.
pub struct Connector {
    config: ConnectorConfig,
    client: ReqwestClient,
}

impl Connector {
    pub fn new(config: ConnectorConfig) -> Result<Self, ConnectorError> {
        if let Err(err) = config.validate_config() {
            error!("Connector configuration validation failed: {}", err);
            return Err(err);
        }
        let client = Self::create_client(&config)?;
        debug!("Connector initialized with api_url: {}", config.api_url);
        Ok(Self { config, client })
    }

    fn create_client(config: &ConnectorConfig) -> Result<ReqwestClient, ConnectorError> {
        let mut builder = ReqwestClient::builder();
        if let Some(timeout) = config.timeout {
            builder = builder.timeout(timeout);
        }
        if let Some(pem) = &config.ca_cert_pem {
            let ca_cert = reqwest::Certificate::from_pem(pem)
                .map_err(|e| ConnectorError::Configuration(format!("Failed to create CA certificate: {}", e)))?;
            builder = builder.add_root_certificate(ca_cert);
        }
        builder
            .build()
            .map_err(|e| ConnectorError::Configuration(format!("Failed to create HTTP client: {}", e)))
    }

    pub fn config(&self) -> &ConnectorConfig {
        &self.config
    }

    fn endpoint(root: &str, path: &str) -> String {
        format!("{}/{}", root.trim_end_matches('/'), path)
    }

    fn headers(&self, request_id: Option<&str>) -> Result<HeaderMap, ConnectorError> {
        let mut headers = HeaderMap::new();
        headers.insert(ACCEPT, HeaderValue::from_static("application/json"));
        let api_key = HeaderValue::from_str(&self.config.api_key)
            .map_err(|_| ConnectorError::Configuration("API key is not a valid header value".to_string()))?;
        headers.insert(HEADER_API_KEY, api_key);
        if let Some(request_id) = request_id {
            let value = HeaderValue::from_str(request_id)
                .map_err(|_| ConnectorError::Configuration("Request id is not a valid header value".to_string()))?;
            headers.insert(HEADER_REQUEST_ID, value);
        }
        Ok(headers)
    }

    /// Request a fresh nonce.
    pub async fn get_nonce(&self, request_id: Option<&str>) -> Result<Nonce, ConnectorError> {
        let url = Self::endpoint(&self.config.api_url, NONCE_PATH);
        info!("Requesting nonce from {}", url);

        let mut request = self.client.get(&url).headers(self.headers(request_id)?);
        if let Some(request_id) = request_id {
            request = request.query(&[("request_id", request_id)]);
        }
        let response = request.send().await.map_err(|e| {
            error!("Nonce request failed: {}", e);
            ConnectorError::NonceFetch(e.to_string())
        })?;
        let body = Self::success_body(response).await.map_err(ConnectorError::NonceFetch)?;
        Nonce::from_json_slice(&body)
    }

    /// Submit evidence and return the token with the response headers.
    pub async fn get_token(
        &self,
        request: &TokenRequest,
        request_id: Option<&str>,
    ) -> Result<(String, HeaderMap), ConnectorError> {
        let url = Self::endpoint(&self.config.api_url, ATTEST_PATH);
        info!("Submitting evidence to {}", url);

        let response = self
            .client
            .post(&url)
            .headers(self.headers(request_id)?)
            .json(request)
            .send()
            .await
            .map_err(|e| {
                error!("Token request failed: {}", e);
                ConnectorError::TokenSubmission(e.to_string())
            })?;
        let headers = response.headers().clone();
        let body = Self::success_body(response).await.map_err(ConnectorError::TokenSubmission)?;

        let token_response: TokenResponse = serde_json::from_slice(&body).map_err(|e| {
            error!("Failed to parse token response: {}", e);
            ConnectorError::TokenParse(e.to_string())
        })?;
        if token_response.token.is_empty() {
            return Err(ConnectorError::TokenParse("Token is empty".to_string()));
        }
        Ok((token_response.token, headers))
    }

    /// Fetch the token signing certificates (JWKS) as returned by the service.
    pub async fn get_token_signing_certificates(&self) -> Result<String, ConnectorError> {
        let url = Self::endpoint(&self.config.base_url, CERTS_PATH);
        debug!("Fetching token signing certificates from {}", url);

        let mut headers = HeaderMap::new();
        headers.insert(ACCEPT, HeaderValue::from_static("application/json"));
        let response = self.client.get(&url).headers(headers).send().await.map_err(|e| {
            error!("Certificate request failed: {}", e);
            ConnectorError::CertificateFetch(e.to_string())
        })?;
        let body = Self::success_body(response).await.map_err(ConnectorError::CertificateFetch)?;
        String::from_utf8(body).map_err(|e| ConnectorError::CertificateFetch(e.to_string()))
    }

    async fn success_body(response: Response) -> Result<Vec<u8>, String> {
        let status = response.status();
        let body = response.bytes().await.map_err(|e| format!("Failed to read response body: {}", e))?;
        if !status.is_success() {
            error!("Verification service returned status {}", status);
            return Err(format!("status {}: {}", status, String::from_utf8_lossy(&body)));
        }
        Ok(body.to_vec())
    }
}
