//! HTTP client for the image builder API.

use bytes::Bytes;
use fctl_api::{ImageBuild, ImageExport, List};
use reqwest::header::ACCEPT;
use reqwest::StatusCode;
use serde::{de::DeserializeOwned, Serialize};
use tracing::debug;

use crate::client::{build_http_client, error_from_response, json_response, paths};
use crate::config::HarnessConfig;
use crate::error::Result;

/// Client for image builds and image exports.
#[derive(Debug, Clone)]
pub struct ImageBuilderClient {
    client: reqwest::Client,
    base_url: String,
}

impl ImageBuilderClient {
    pub fn new(base_url: &str, token: Option<&str>, insecure_tls: bool) -> Result<Self> {
        Ok(Self {
            client: build_http_client(token, insecure_tls)?,
            base_url: base_url.trim_end_matches('/').to_string(),
        })
    }

    pub fn from_config(config: &HarnessConfig) -> Result<Self> {
        Self::new(
            config.imagebuilder_endpoint()?,
            config.api_token.as_deref(),
            config.insecure_tls,
        )
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    async fn create<T: DeserializeOwned, B: Serialize>(&self, collection: &str, body: &B) -> Result<T> {
        let response = self.client.post(self.url(collection)).json(body).send().await?;
        if response.status() != StatusCode::CREATED {
            return Err(error_from_response(response).await.into());
        }
        Ok(response.json().await?)
    }

    async fn get<T: DeserializeOwned>(&self, collection: &str, name: &str) -> Result<T> {
        let response = self
            .client
            .get(self.url(&format!("{collection}/{name}")))
            .send()
            .await?;
        json_response(response).await
    }

    async fn list<T: DeserializeOwned>(
        &self,
        collection: &str,
        label_selector: Option<&str>,
        limit: Option<u32>,
    ) -> Result<List<T>> {
        let mut request = self.client.get(self.url(collection));
        if let Some(selector) = label_selector {
            request = request.query(&[("labelSelector", selector)]);
        }
        if let Some(limit) = limit {
            request = request.query(&[("limit", limit)]);
        }
        json_response(request.send().await?).await
    }

    async fn delete(&self, collection: &str, name: &str) -> Result<()> {
        let response = self
            .client
            .delete(self.url(&format!("{collection}/{name}")))
            .send()
            .await?;
        let status = response.status();
        if status == StatusCode::OK || status == StatusCode::NOT_FOUND {
            debug!(collection, name, "deleted");
            Ok(())
        } else {
            Err(error_from_response(response).await.into())
        }
    }

    async fn cancel(&self, collection: &str, name: &str) -> Result<()> {
        let response = self
            .client
            .post(self.url(&format!("{collection}/{name}/cancel")))
            .send()
            .await?;
        if response.status() == StatusCode::OK {
            debug!(collection, name, "canceled");
            Ok(())
        } else {
            Err(error_from_response(response).await.into())
        }
    }

    /// Open `.../{name}/log`. With `follow` the server keeps the stream open
    /// until the build finishes.
    async fn log(&self, collection: &str, name: &str, follow: bool) -> Result<reqwest::Response> {
        let mut request = self
            .client
            .get(self.url(&format!("{collection}/{name}/log")))
            .query(&[("follow", follow)]);
        if follow {
            request = request.header(ACCEPT, "text/event-stream, text/plain");
        }
        let response = request.send().await?;
        if response.status() == StatusCode::OK {
            Ok(response)
        } else {
            Err(error_from_response(response).await.into())
        }
    }

    pub async fn create_image_build(&self, build: &ImageBuild) -> Result<ImageBuild> {
        self.create(paths::IMAGE_BUILDS, build).await
    }

    pub async fn get_image_build(&self, name: &str) -> Result<ImageBuild> {
        self.get(paths::IMAGE_BUILDS, name).await
    }

    pub async fn list_image_builds(
        &self,
        label_selector: Option<&str>,
        limit: Option<u32>,
    ) -> Result<List<ImageBuild>> {
        self.list(paths::IMAGE_BUILDS, label_selector, limit).await
    }

    pub async fn delete_image_build(&self, name: &str) -> Result<()> {
        self.delete(paths::IMAGE_BUILDS, name).await
    }

    pub async fn cancel_image_build(&self, name: &str) -> Result<()> {
        self.cancel(paths::IMAGE_BUILDS, name).await
    }

    pub async fn image_build_log(&self, name: &str, follow: bool) -> Result<reqwest::Response> {
        self.log(paths::IMAGE_BUILDS, name, follow).await
    }

    pub async fn create_image_export(&self, export: &ImageExport) -> Result<ImageExport> {
        self.create(paths::IMAGE_EXPORTS, export).await
    }

    pub async fn get_image_export(&self, name: &str) -> Result<ImageExport> {
        self.get(paths::IMAGE_EXPORTS, name).await
    }

    pub async fn list_image_exports(
        &self,
        label_selector: Option<&str>,
        limit: Option<u32>,
    ) -> Result<List<ImageExport>> {
        self.list(paths::IMAGE_EXPORTS, label_selector, limit).await
    }

    pub async fn delete_image_export(&self, name: &str) -> Result<()> {
        self.delete(paths::IMAGE_EXPORTS, name).await
    }

    pub async fn cancel_image_export(&self, name: &str) -> Result<()> {
        self.cancel(paths::IMAGE_EXPORTS, name).await
    }

    pub async fn image_export_log(&self, name: &str, follow: bool) -> Result<reqwest::Response> {
        self.log(paths::IMAGE_EXPORTS, name, follow).await
    }

    /// Download an export artifact. Returns the body and the advertised
    /// content length.
    pub async fn download_image_export(&self, name: &str) -> Result<(Bytes, Option<u64>)> {
        let response = self
            .client
            .get(self.url(&format!("{}/{name}/download", paths::IMAGE_EXPORTS)))
            .send()
            .await?;
        if response.status() != StatusCode::OK {
            return Err(error_from_response(response).await.into());
        }

        let length = response.content_length();
        debug!(name, content_length = ?length, "downloading image export");
        Ok((response.bytes().await?, length))
    }
}
