//! HTTP adapter for the remote invoice-calling API
//!
//! Implements the domain gateway ports over reqwest. Every endpoint is
//! JSON over HTTP except the spreadsheet upload, which is multipart.

use crate::config::ApiConfig;
use crate::domain::call_status::PhoneCallStatus;
use crate::domain::gateway::{CallStatusGateway, InvoiceCallApi};
use crate::domain::patient::{BatchCallOutcome, CallAttempt, Patient, UploadSummary};
use crate::domain::shared::error::DomainError;
use crate::domain::shared::result::Result;
use crate::infrastructure::api::dto::{
    BatchCallResponse, CallStatusResponse, PatientsResponse, SingleCallResponse,
    UploadHistoryResponse, UploadResponse,
};
use async_trait::async_trait;
use chrono::NaiveDate;
use reqwest::multipart::{Form, Part};
use serde::de::DeserializeOwned;
use serde_json::json;
use std::time::Duration;
use tracing::debug;

pub struct ApiClient {
    http: reqwest::Client,
    base_url: String,
}

impl ApiClient {
    pub fn new(config: &ApiConfig) -> Result<Self> {
        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .map_err(|e| DomainError::Api(format!("Failed to build HTTP client: {}", e)))?;
        Ok(Self {
            http,
            base_url: config.base_url.trim_end_matches('/').to_string(),
        })
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    async fn get_json<T: DeserializeOwned>(&self, path: &str) -> Result<T> {
        let response = self
            .http
            .get(self.url(path))
            .send()
            .await
            .map_err(|e| DomainError::Api(format!("GET {} failed: {}", path, e)))?;
        Self::decode(path, response).await
    }

    async fn post_json<T: DeserializeOwned>(
        &self,
        path: &str,
        body: serde_json::Value,
    ) -> Result<T> {
        let response = self
            .http
            .post(self.url(path))
            .json(&body)
            .send()
            .await
            .map_err(|e| DomainError::Api(format!("POST {} failed: {}", path, e)))?;
        Self::decode(path, response).await
    }

    async fn decode<T: DeserializeOwned>(path: &str, response: reqwest::Response) -> Result<T> {
        let status = response.status();
        if !status.is_success() {
            return Err(DomainError::Api(format!("{} returned {}", path, status)));
        }
        response
            .json()
            .await
            .map_err(|e| DomainError::Api(format!("Invalid response from {}: {}", path, e)))
    }
}

#[async_trait]
impl InvoiceCallApi for ApiClient {
    async fn upload_spreadsheet(&self, filename: &str, bytes: Vec<u8>) -> Result<UploadSummary> {
        let part = Part::bytes(bytes).file_name(filename.to_string());
        let form = Form::new().part("file", part);
        let response = self
            .http
            .post(self.url("/api/upload"))
            .multipart(form)
            .send()
            .await
            .map_err(|e| DomainError::Api(format!("Upload failed: {}", e)))?;

        let body: UploadResponse = Self::decode("/api/upload", response).await?;
        if !body.success {
            return Err(DomainError::Rejected(
                body.message.unwrap_or_else(|| "upload rejected".to_string()),
            ));
        }
        body.upload
            .ok_or_else(|| DomainError::Api("Upload response missing summary".to_string()))
    }

    async fn fetch_patients(&self) -> Result<Vec<Patient>> {
        let body: PatientsResponse = self.get_json("/api/patients").await?;
        Ok(body.patients)
    }

    async fn fetch_patients_by_upload(&self, upload_id: i64) -> Result<Vec<Patient>> {
        let path = format!("/api/patients/upload/{}", upload_id);
        let body: PatientsResponse = self.get_json(&path).await?;
        Ok(body.patients)
    }

    async fn fetch_patients_by_date(&self, date: NaiveDate) -> Result<Vec<Patient>> {
        let path = format!("/api/patients/by-date/{}", date.format("%Y-%m-%d"));
        let body: PatientsResponse = self.get_json(&path).await?;
        Ok(body.patients)
    }

    async fn fetch_upload_history(&self) -> Result<Vec<UploadSummary>> {
        let body: UploadHistoryResponse = self.get_json("/api/uploads/history").await?;
        Ok(body.history)
    }

    async fn start_batch_call(&self, upload_id: Option<i64>) -> Result<BatchCallOutcome> {
        let body: BatchCallResponse = self
            .post_json("/api/batch-call", json!({ "upload_id": upload_id }))
            .await?;
        if !body.success {
            return Err(DomainError::Rejected(
                body.message
                    .unwrap_or_else(|| "batch call rejected".to_string()),
            ));
        }
        body.results
            .ok_or_else(|| DomainError::Api("Batch call response missing results".to_string()))
    }

    async fn start_single_call(&self, phone_number: &str) -> Result<CallAttempt> {
        let body: SingleCallResponse = self
            .post_json("/api/call", json!({ "phone_number": phone_number }))
            .await?;
        if !body.success {
            return Err(DomainError::Rejected(
                body.message.unwrap_or_else(|| "call rejected".to_string()),
            ));
        }
        body.call
            .ok_or_else(|| DomainError::Api("Call response missing attempt record".to_string()))
    }

    async fn query_call_status(&self, phone_numbers: Vec<String>) -> Result<Vec<PhoneCallStatus>> {
        debug!("Querying call status for {} phones", phone_numbers.len());
        let response = self
            .http
            .post(self.url("/api/call-status"))
            .json(&json!({ "phone_numbers": phone_numbers }))
            .send()
            .await
            .map_err(|e| DomainError::StatusQuery(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            return Err(DomainError::StatusQuery(format!(
                "/api/call-status returned {}",
                status
            )));
        }
        let body: CallStatusResponse = response
            .json()
            .await
            .map_err(|e| DomainError::StatusQuery(format!("invalid response: {}", e)))?;
        if !body.success {
            return Err(DomainError::StatusQuery(
                "remote reported failure".to_string(),
            ));
        }
        Ok(body.statuses)
    }
}

#[async_trait]
impl CallStatusGateway for ApiClient {
    async fn query_call_status(&self, phone_numbers: Vec<String>) -> Result<Vec<PhoneCallStatus>> {
        InvoiceCallApi::query_call_status(self, phone_numbers).await
    }
}
