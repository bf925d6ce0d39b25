//! Artifact Store — S3 upload, signed retrieval URLs, probes and cleanup.
//!
//! Objects live under `resumes/{YYYYMMDD}/{resume_id}.pdf`. The SDK's own
//! retry layer is disabled: a failed call fails the request.

use std::time::Duration;

use anyhow::Context;
use async_trait::async_trait;
use aws_config::{Region, SdkConfig};
use aws_credential_types::provider::ProvideCredentials;
use aws_sdk_s3::config::retry::RetryConfig;
use aws_sdk_s3::config::Credentials;
use aws_sdk_s3::error::{DisplayErrorContext, ProvideErrorMetadata, SdkError};
use aws_sdk_s3::presigning::PresigningConfig;
use aws_sdk_s3::primitives::ByteStream;
use aws_sdk_s3::types::{Delete, ObjectIdentifier};
use aws_sdk_s3::Client as S3Client;
use chrono::{DateTime, NaiveDate, Utc};
use serde::Serialize;
use thiserror::Error;
use tracing::{error, info, warn};
use uuid::Uuid;

use crate::config::Config;
use crate::render::compiler::CompiledDocument;

pub const KEY_PREFIX: &str = "resumes/";
/// Lifetime of every signed URL.
pub const SIGNED_URL_TTL: Duration = Duration::from_secs(24 * 60 * 60);
/// S3 accepts at most this many keys per DeleteObjects call.
pub const MAX_DELETE_BATCH: usize = 1000;

// ────────────────────────────────────────────────────────────────────────────
// Data models
// ────────────────────────────────────────────────────────────────────────────

/// Where an uploaded document lives and how to fetch it.
#[derive(Debug, Clone)]
pub struct StoredArtifact {
    pub resume_id: Uuid,
    pub key: String,
    pub url: String,
    pub expires_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize)]
pub struct BucketInfo {
    pub name: String,
    pub accessible: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub region: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub has_policy: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

#[derive(Debug, Error)]
pub enum StorageError {
    #[error("S3 credentials not configured")]
    CredentialsMissing,

    #[error("Failed to upload to S3: {0}")]
    Upload(String),

    #[error("Failed to sign S3 download URL: {0}")]
    Presign(String),
}

// ────────────────────────────────────────────────────────────────────────────
// Trait definition
// ────────────────────────────────────────────────────────────────────────────

/// The storage stage. Carried in the pipeline as `Arc<dyn ArtifactStore>`.
#[async_trait]
pub trait ArtifactStore: Send + Sync {
    /// Uploads `document`, minting an identifier when `resume_id` is `None`.
    async fn upload(
        &self,
        document: CompiledDocument,
        resume_id: Option<Uuid>,
    ) -> Result<StoredArtifact, StorageError>;

    /// Existence/permission probe against the configured bucket. Never raises.
    async fn validate_access(&self) -> bool;

    /// Deletes objects older than `days_old` days. Failures are logged and
    /// reported as zero.
    async fn cleanup_older_than(&self, days_old: u32) -> usize;

    async fn bucket_info(&self) -> BucketInfo;
}

// ────────────────────────────────────────────────────────────────────────────
// S3ArtifactStore — production implementation
// ────────────────────────────────────────────────────────────────────────────

pub struct S3ArtifactStore {
    client: S3Client,
    bucket: String,
}

impl S3ArtifactStore {
    pub fn new(client: S3Client, bucket: impl Into<String>) -> Self {
        Self {
            client,
            bucket: bucket.into(),
        }
    }

    /// Builds a client for AWS, or for MinIO when `S3_ENDPOINT` is set.
    ///
    /// Static keys are used when configured; otherwise the default provider
    /// chain (env, profile, IMDS). Credentials that cannot be resolved are a
    /// construction error.
    pub async fn connect(config: &Config) -> Result<Self, StorageError> {
        let mut loader = aws_config::defaults(aws_config::BehaviorVersion::latest())
            .region(Region::new(config.aws_region.clone()));

        if let (Some(key_id), Some(secret)) =
            (&config.aws_access_key_id, &config.aws_secret_access_key)
        {
            loader = loader.credentials_provider(Credentials::new(
                key_id,
                secret,
                None,
                None,
                "resume-api-static",
            ));
        }
        if let Some(endpoint) = &config.s3_endpoint {
            loader = loader.endpoint_url(endpoint);
        }

        let sdk_config = loader.load().await;
        ensure_credentials(&sdk_config).await?;

        let s3_config = aws_sdk_s3::config::Builder::from(&sdk_config)
            .retry_config(RetryConfig::disabled())
            .force_path_style(config.s3_endpoint.is_some())
            .build();

        Ok(Self::new(S3Client::from_conf(s3_config), &config.s3_bucket))
    }

    pub fn bucket(&self) -> &str {
        &self.bucket
    }

    async fn sign_download(&self, key: &str) -> Result<String, StorageError> {
        let presigning = PresigningConfig::expires_in(SIGNED_URL_TTL)
            .map_err(|e| StorageError::Presign(e.to_string()))?;

        let request = self
            .client
            .get_object()
            .bucket(&self.bucket)
            .key(key)
            .presigned(presigning)
            .await
            .map_err(|e| StorageError::Presign(sdk_error_message(&e)))?;

        Ok(request.uri().to_string())
    }

    async fn collect_expired_keys(&self, cutoff: DateTime<Utc>) -> anyhow::Result<Vec<String>> {
        let mut pages = self
            .client
            .list_objects_v2()
            .bucket(&self.bucket)
            .prefix(KEY_PREFIX)
            .into_paginator()
            .send();

        let mut expired = Vec::new();
        while let Some(page) = pages.next().await {
            let page = page.context("ListObjectsV2 failed")?;
            expired.extend(select_expired(
                page.contents()
                    .iter()
                    .filter_map(|o| Some((o.key()?, o.last_modified()?.secs()))),
                cutoff,
            ));
        }
        Ok(expired)
    }

    async fn delete_batch(&self, keys: &[String]) -> anyhow::Result<usize> {
        let objects = keys
            .iter()
            .map(|key| ObjectIdentifier::builder().key(key).build())
            .collect::<Result<Vec<_>, _>>()?;
        let delete = Delete::builder().set_objects(Some(objects)).build()?;

        let response = self
            .client
            .delete_objects()
            .bucket(&self.bucket)
            .delete(delete)
            .send()
            .await
            .context("DeleteObjects failed")?;

        for failure in response.errors() {
            warn!(
                "Could not delete {}: {}",
                failure.key().unwrap_or("<unknown>"),
                failure.message().unwrap_or("no message")
            );
        }
        Ok(response.deleted().len())
    }

    async fn cleanup(&self, days_old: u32) -> anyhow::Result<usize> {
        let cutoff = Utc::now() - chrono::Duration::days(i64::from(days_old));
        let expired = self.collect_expired_keys(cutoff).await?;

        let mut deleted = 0;
        for batch in expired.chunks(MAX_DELETE_BATCH) {
            deleted += self.delete_batch(batch).await?;
        }
        Ok(deleted)
    }

    async fn describe_bucket(&self) -> anyhow::Result<BucketInfo> {
        let location = self
            .client
            .get_bucket_location()
            .bucket(&self.bucket)
            .send()
            .await
            .context("GetBucketLocation failed")?;

        // An empty constraint is how S3 spells us-east-1.
        let region = location
            .location_constraint()
            .map(|c| c.as_str().to_string())
            .filter(|r| !r.is_empty())
            .unwrap_or_else(|| "us-east-1".to_string());

        let has_policy = self
            .client
            .get_bucket_policy()
            .bucket(&self.bucket)
            .send()
            .await
            .is_ok();

        Ok(BucketInfo {
            name: self.bucket.clone(),
            accessible: true,
            region: Some(region),
            has_policy: Some(has_policy),
            error: None,
        })
    }
}

#[async_trait]
impl ArtifactStore for S3ArtifactStore {
    async fn upload(
        &self,
        document: CompiledDocument,
        resume_id: Option<Uuid>,
    ) -> Result<StoredArtifact, StorageError> {
        let resume_id = resume_id.unwrap_or_else(Uuid::new_v4);
        let now = Utc::now();
        let key = object_key(now.date_naive(), resume_id);
        let file_size = document.len();

        self.client
            .put_object()
            .bucket(&self.bucket)
            .key(&key)
            .body(ByteStream::from(document.into_bytes()))
            .content_type("application/pdf")
            .content_disposition("inline")
            .metadata("resume_id", resume_id.to_string())
            .metadata("generated_at", now.to_rfc3339())
            .metadata("file_size", file_size.to_string())
            .send()
            .await
            .map_err(|e| {
                let message = sdk_error_message(&e);
                error!("S3 upload failed: {message}");
                StorageError::Upload(message)
            })?;

        let url = self.sign_download(&key).await?;

        info!("Successfully uploaded resume {resume_id} to s3://{}/{key}", self.bucket);

        Ok(StoredArtifact {
            resume_id,
            key,
            url,
            expires_at: now + chrono::Duration::seconds(SIGNED_URL_TTL.as_secs() as i64),
        })
    }

    async fn validate_access(&self) -> bool {
        match self.client.head_bucket().bucket(&self.bucket).send().await {
            Ok(_) => true,
            Err(e) => {
                match e.raw_response().map(|r| r.status().as_u16()) {
                    Some(404) => error!("S3 bucket {} does not exist", self.bucket),
                    Some(403) => error!("Access denied to S3 bucket {}", self.bucket),
                    _ => error!("S3 bucket validation failed: {}", DisplayErrorContext(&e)),
                }
                false
            }
        }
    }

    async fn cleanup_older_than(&self, days_old: u32) -> usize {
        match self.cleanup(days_old).await {
            Ok(deleted) => {
                info!("Cleaned up {deleted} old resume files");
                deleted
            }
            Err(e) => {
                error!("Failed to cleanup old resumes: {e:#}");
                0
            }
        }
    }

    async fn bucket_info(&self) -> BucketInfo {
        match self.describe_bucket().await {
            Ok(info) => info,
            Err(e) => {
                error!("Failed to get bucket info: {e:#}");
                BucketInfo {
                    name: self.bucket.clone(),
                    accessible: false,
                    region: None,
                    has_policy: None,
                    error: Some(format!("{e:#}")),
                }
            }
        }
    }
}

// ────────────────────────────────────────────────────────────────────────────
// Helpers
// ────────────────────────────────────────────────────────────────────────────

/// Resolves credentials once so a missing provider chain fails start-up
/// instead of the first upload.
pub async fn ensure_credentials(sdk_config: &SdkConfig) -> Result<(), StorageError> {
    let Some(provider) = sdk_config.credentials_provider() else {
        error!("AWS credentials not found");
        return Err(StorageError::CredentialsMissing);
    };
    match provider.provide_credentials().await {
        Ok(_) => Ok(()),
        Err(e) => {
            error!("AWS credentials not found: {}", DisplayErrorContext(&e));
            Err(StorageError::CredentialsMissing)
        }
    }
}

/// `resumes/{YYYYMMDD}/{resume_id}.pdf`
pub fn object_key(date: NaiveDate, resume_id: Uuid) -> String {
    format!("{KEY_PREFIX}{}/{resume_id}.pdf", date.format("%Y%m%d"))
}

/// Keys whose last-modified time (epoch seconds) is strictly before `cutoff`.
pub fn select_expired<'a>(
    objects: impl IntoIterator<Item = (&'a str, i64)>,
    cutoff: DateTime<Utc>,
) -> Vec<String> {
    let cutoff = cutoff.timestamp();
    objects
        .into_iter()
        .filter(|(_, modified)| *modified < cutoff)
        .map(|(key, _)| key.to_string())
        .collect()
}

/// Prefers the service's own message over the SDK's transport wording.
fn sdk_error_message<E, R>(err: &SdkError<E, R>) -> String
where
    E: ProvideErrorMetadata + std::error::Error + 'static,
    R: std::fmt::Debug,
{
    err.as_service_error()
        .and_then(|e| e.message().map(str::to_string))
        .unwrap_or_else(|| DisplayErrorContext(err).to_string())
}

// ────────────────────────────────────────────────────────────────────────────
// Tests
// ────────────────────────────────────────────────────────────────────────────
