use std::path::Path;
use std::sync::Arc;

use object_store::aws::AmazonS3Builder;
use object_store::local::LocalFileSystem;
use object_store::memory::InMemory;
use object_store::ObjectStore;
use tracing::info;

use feedstore_core::config::AwsConfig;

use crate::error::StoreError;

/// An object store plus the key prefix every document path starts with.
pub struct StorageBackend {
    store: Arc<dyn ObjectStore>,
    prefix: String,
}

impl StorageBackend {
    /// S3 when AWS credentials and a bucket are configured, otherwise `DATA_DIR`.
    pub fn from_config(config: &feedstore_core::Config) -> Result<Self, StoreError> {
        if config.aws.is_configured() {
            Self::s3(&config.aws)
        } else {
            Self::local(&config.storage.data_dir)
        }
    }

    /// Directory-backed store; the directory is created if missing.
    pub fn local(dir: &Path) -> Result<Self, StoreError> {
        std::fs::create_dir_all(dir)?;
        let store = LocalFileSystem::new_with_prefix(dir)?;
        info!(dir = %dir.display(), "document store on local filesystem");
        Ok(Self {
            store: Arc::new(store),
            prefix: String::new(),
        })
    }

    /// Bucket-backed store. A bare `AWS_ENDPOINT_URL` host is treated as https.
    pub fn s3(aws: &AwsConfig) -> Result<Self, StoreError> {
        let bucket = aws
            .s3_bucket
            .as_deref()
            .ok_or_else(|| StoreError::NotConfigured("S3_BUCKET not set".into()))?;

        let mut builder = AmazonS3Builder::new()
            .with_region(&aws.region)
            .with_bucket_name(bucket);
        if let Some(key) = &aws.access_key_id {
            builder = builder.with_access_key_id(key);
        }
        if let Some(secret) = &aws.secret_access_key {
            builder = builder.with_secret_access_key(secret);
        }
        if let Some(token) = &aws.session_token {
            builder = builder.with_token(token);
        }
        if let Some(endpoint) = aws.endpoint_url.as_deref().filter(|e| !e.is_empty()) {
            let endpoint = if endpoint.contains("://") {
                endpoint.to_string()
            } else {
                format!("https://{endpoint}")
            };
            builder = builder
                .with_allow_http(endpoint.starts_with("http://"))
                .with_endpoint(endpoint);
        }

        let prefix = aws.s3_prefix.as_deref().unwrap_or("").trim_matches('/').to_string();
        info!(bucket, prefix = %prefix, region = %aws.region, "document store on S3");
        Ok(Self {
            store: Arc::new(builder.build()?),
            prefix,
        })
    }

    pub fn memory() -> Self {
        Self {
            store: Arc::new(InMemory::new()),
            prefix: String::new(),
        }
    }

    pub fn store(&self) -> Arc<dyn ObjectStore> {
        self.store.clone()
    }

    pub fn prefix(&self) -> &str {
        &self.prefix
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn aws(bucket: Option<&str>, prefix: Option<&str>) -> AwsConfig {
        AwsConfig {
            region: "us-west-2".into(),
            access_key_id: Some("key".into()),
            secret_access_key: Some("secret".into()),
            session_token: None,
            s3_bucket: bucket.map(Into::into),
            s3_prefix: prefix.map(Into::into),
            endpoint_url: Some("localhost:9000".into()),
        }
    }

    #[test]
    fn local_creates_missing_directory() {
        let tmp = tempfile::tempdir().unwrap();
        let dir = tmp.path().join("nested").join("data");
        let backend = StorageBackend::local(&dir).unwrap();
        assert!(dir.is_dir());
        assert_eq!(backend.prefix(), "");
    }

    #[test]
    fn s3_requires_bucket() {
        assert!(matches!(
            StorageBackend::s3(&aws(None, None)),
            Err(StoreError::NotConfigured(_))
        ));
    }

    #[test]
    fn s3_prefix_is_trimmed() {
        let backend = StorageBackend::s3(&aws(Some("feeds"), Some("/prod/"))).unwrap();
        assert_eq!(backend.prefix(), "prod");
    }
}
