//! S3 client configuration and the [`ObjectStore`] implementation backed by it.

use async_trait::async_trait;
use aws_config::{BehaviorVersion, Region};
use aws_sdk_s3::error::DisplayErrorContext;
use aws_sdk_s3::primitives::{ByteStream, Length};
use aws_sdk_s3::Client;
use s3mover_core::{ObjectStore, PayloadBody, StoreError};
use tracing::debug;

/// Connection settings for S3 or an S3-compatible service.
///
/// Credentials always come from the default AWS provider chain.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct S3Settings {
    /// AWS region; the provider chain decides when unset.
    pub region: Option<String>,
    /// Custom endpoint (MinIO, LocalStack). Enables path-style addressing.
    pub endpoint_url: Option<String>,
}

/// Create an S3 client from settings.
pub async fn create_s3_client(settings: &S3Settings) -> Client {
    let mut loader = aws_config::defaults(BehaviorVersion::latest());

    if let Some(region) = &settings.region {
        loader = loader.region(Region::new(region.clone()));
    }
    if let Some(endpoint) = &settings.endpoint_url {
        loader = loader.endpoint_url(endpoint);
    }

    let aws_config = loader.load().await;
    let builder = aws_sdk_s3::config::Builder::from(&aws_config);
    let s3_config = if settings.endpoint_url.is_some() {
        builder.force_path_style(true).build()
    } else {
        builder.build()
    };

    Client::from_conf(s3_config)
}

/// [`ObjectStore`] writing through the AWS SDK.
#[derive(Debug, Clone)]
pub struct S3ObjectStore {
    client: Client,
}

impl S3ObjectStore {
    pub fn new(client: Client) -> Self {
        Self { client }
    }

    pub async fn connect(settings: &S3Settings) -> Self {
        Self::new(create_s3_client(settings).await)
    }
}

#[async_trait]
impl ObjectStore for S3ObjectStore {
    async fn put_object(
        &self,
        bucket: &str,
        key: &str,
        body: PayloadBody,
        length: u64,
    ) -> Result<(), StoreError> {
        let stream = match body {
            PayloadBody::File(file) => {
                ByteStream::read_from()
                    .file(tokio::fs::File::from_std(file))
                    .length(Length::Exact(length))
                    .build()
                    .await?
            }
            PayloadBody::Bytes(bytes) => ByteStream::from(bytes),
        };

        let output = self
            .client
            .put_object()
            .bucket(bucket)
            .key(key)
            .content_length(length as i64)
            .body(stream)
            .send()
            .await
            .map_err(|e| DisplayErrorContext(e).to_string())?;
        debug!(bucket, key, etag = ?output.e_tag(), "put_object returned");
        Ok(())
    }
}
