//! Registry client for publishing, querying and downloading extensions

use crate::core::registry::{
    decode_as, CheckedResponse, Extension, RegistryConfig, RegistryError, RegistryResponse,
};
use reqwest::header::{HeaderMap, HeaderValue, CONTENT_LENGTH, CONTENT_TYPE};
use reqwest::{Body, Client, RequestBuilder};
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::path::Path;
use tokio::io::{AsyncWrite, AsyncWriteExt};
use tokio_util::io::ReaderStream;
use tracing::debug;
use url::Url;

/// Prefix of the temporary file a download is staged in
const DOWNLOAD_PREFIX: &str = ".vsxpub-download-";

/// Registry client speaking the Open VSX HTTP protocol
pub struct RegistryClient {
    config: RegistryConfig,
    base: Url,
    client: Client,
}

impl RegistryClient {
    /// Create a new registry client
    pub fn new(config: RegistryConfig) -> Result<Self, RegistryError> {
        // Validate the base URL up front so every endpoint can be derived from it
        let base = Url::parse(&config.url)
            .map_err(|e| RegistryError::InvalidUrl(format!("{}: {}", config.url, e)))?;

        let client = Client::builder()
            .user_agent(config.user_agent.clone())
            .build()
            .map_err(|e| RegistryError::Transport(format!("Failed to create HTTP client: {}", e)))?;

        Ok(Self {
            config,
            base,
            client,
        })
    }

    pub fn config(&self) -> &RegistryConfig {
        &self.config
    }

    pub fn requires_license(&self) -> bool {
        self.config.requires_license
    }

    /// Create a namespace owned by the token's user
    pub async fn create_namespace(
        &self,
        name: &str,
        token: &str,
    ) -> Result<RegistryResponse, RegistryError> {
        let url = self.endpoint(&["api", "-", "namespace", "create"], Some(token))?;
        let body = serde_json::json!({ "name": name });
        let response: RegistryResponse = self.post_json(&body, url, HeaderMap::new()).await?;
        response.check()
    }

    /// Upload a packaged extension; the body is streamed from disk.
    ///
    /// A returned extension may still carry an `error` field, see
    /// [`CheckedResponse::check`].
    pub async fn publish(&self, file: &Path, token: &str) -> Result<Extension, RegistryError> {
        let url = self.endpoint(&["api", "-", "publish"], Some(token))?;
        let mut headers = HeaderMap::new();
        headers.insert(
            CONTENT_TYPE,
            HeaderValue::from_static("application/octet-stream"),
        );
        self.post_file(file, url, headers).await
    }

    /// Check that `token` may publish to `namespace`
    pub async fn verify_pat(&self, namespace: &str, token: &str) -> Result<(), RegistryError> {
        let url = self.endpoint(&["api", namespace, "verify-pat"], Some(token))?;
        let response: RegistryResponse = self.get_json(url).await?;
        response.check().map(|_| ())
    }

    /// Fetch extension metadata, optionally for a specific target and version
    pub async fn get_metadata(
        &self,
        namespace: &str,
        extension: &str,
        target: Option<&str>,
        version: Option<&str>,
    ) -> Result<Extension, RegistryError> {
        let mut segments = vec!["api", namespace, extension];
        segments.extend(target);
        segments.extend(version);
        let url = self.endpoint(&segments, None)?;
        self.get_json(url).await
    }

    /// Stream `url` into `dest`.
    ///
    /// The body is written to a temporary file next to `dest` and only moved
    /// into place once complete. Any failure drops the response, closing the
    /// connection, and removes the partial file.
    pub async fn download(&self, dest: &Path, url: &str) -> Result<(), RegistryError> {
        self.download_via(dest, url, |file| file).await
    }

    /// [`download`](Self::download) with the temporary file wrapped by `wrap`
    async fn download_via<W, F>(&self, dest: &Path, url: &str, wrap: F) -> Result<(), RegistryError>
    where
        W: AsyncWrite + Unpin,
        F: FnOnce(tokio::fs::File) -> W,
    {
        let url = Url::parse(url).map_err(|e| RegistryError::InvalidUrl(format!("{}: {}", url, e)))?;
        debug!("Downloading {}", redacted(&url));

        let mut response = self
            .authorize(self.client.get(url.clone()), &url)
            .send()
            .await
            .map_err(RegistryError::transport)?;

        let status = response.status();
        if !status.is_success() {
            return Err(RegistryError::Status {
                status: status.as_u16(),
                reason: status.canonical_reason().map(str::to_string),
            });
        }

        let dir = dest
            .parent()
            .filter(|p| !p.as_os_str().is_empty())
            .unwrap_or_else(|| Path::new("."));
        let (std_file, partial) = tempfile::Builder::new()
            .prefix(DOWNLOAD_PREFIX)
            .tempfile_in(dir)?
            .into_parts();
        let sync_handle = tokio::fs::File::from_std(std_file.try_clone()?);
        let mut writer = wrap(tokio::fs::File::from_std(std_file));

        while let Some(chunk) = response.chunk().await.map_err(RegistryError::transport)? {
            writer.write_all(&chunk).await?;
        }
        writer.shutdown().await?;
        drop(writer);
        sync_handle.sync_all().await?;

        partial.persist(dest).map_err(|e| RegistryError::Io(e.error))?;
        Ok(())
    }

    /// GET a JSON document
    pub async fn get_json<T: DeserializeOwned>(&self, url: Url) -> Result<T, RegistryError> {
        debug!("GET {}", redacted(&url));
        let request = self.client.get(url.clone());
        self.send(request, &url).await
    }

    /// POST a JSON body and decode the JSON reply
    pub async fn post_json<T: DeserializeOwned, B: Serialize + ?Sized>(
        &self,
        body: &B,
        url: Url,
        headers: HeaderMap,
    ) -> Result<T, RegistryError> {
        debug!("POST {}", redacted(&url));
        let request = self.client.post(url.clone()).headers(headers).json(body);
        self.send(request, &url).await
    }

    /// POST the raw contents of a file and decode the JSON reply.
    ///
    /// A read error while streaming aborts the request.
    pub async fn post_file<T: DeserializeOwned>(
        &self,
        path: &Path,
        url: Url,
        headers: HeaderMap,
    ) -> Result<T, RegistryError> {
        let file = tokio::fs::File::open(path).await?;
        let length = file.metadata().await?.len();
        debug!("POST {} ({} bytes from {})", redacted(&url), length, path.display());

        let request = self
            .client
            .post(url.clone())
            .headers(headers)
            .header(CONTENT_LENGTH, length)
            .body(Body::wrap_stream(ReaderStream::new(file)));
        self.send(request, &url).await
    }

    async fn send<T: DeserializeOwned>(
        &self,
        request: RequestBuilder,
        url: &Url,
    ) -> Result<T, RegistryError> {
        let response = self
            .authorize(request, url)
            .send()
            .await
            .map_err(RegistryError::transport)?;

        let status = response.status();
        let body = response.text().await.map_err(RegistryError::transport)?;
        decode_as(status.as_u16(), status.canonical_reason(), &body)
    }

    /// Attach basic auth, but only for requests to the configured registry
    fn authorize(&self, request: RequestBuilder, url: &Url) -> RequestBuilder {
        match &self.config.username {
            Some(username) if self.is_registry_url(url) => {
                request.basic_auth(username, self.config.password.as_ref())
            }
            _ => request,
        }
    }

    /// Same scheme, host and port as the base URL, under its path
    fn is_registry_url(&self, url: &Url) -> bool {
        if url.origin() != self.base.origin() {
            return false;
        }
        let base_path = self.base.path().trim_end_matches('/');
        let path = url.path();
        base_path.is_empty()
            || path == base_path
            || path
                .strip_prefix(base_path)
                .is_some_and(|rest| rest.starts_with('/'))
    }

    /// Build `<base>/<segments...>`, percent-encoding every segment on its own
    pub(crate) fn endpoint(&self, segments: &[&str], token: Option<&str>) -> Result<Url, RegistryError> {
        let mut url = self.base.clone();
        {
            let mut path = url
                .path_segments_mut()
                .map_err(|_| RegistryError::InvalidUrl(self.config.url.clone()))?;
            path.pop_if_empty();
            path.extend(segments);
        }
        if let Some(token) = token {
            url.query_pairs_mut().append_pair("token", token);
        }
        Ok(url)
    }
}

/// URL without its query string, safe to log
fn redacted(url: &Url) -> String {
    let mut url = url.clone();
    url.set_query(None);
    url.to_string()
}
