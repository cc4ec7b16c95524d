//! Shared plumbing for requests against the hosted services.

use reqwest::{Client, Method, RequestBuilder};
use serde::{de::DeserializeOwned, Serialize};
use url::Url;

use crate::{
    credentials::Credentials,
    error::Error,
    retry::{send_request_with_decay, Decay},
};

#[derive(Debug, Clone)]
pub(crate) struct Transport {
    client: Client,
    base_url: Url,
    credentials: Credentials,
    decay: Decay,
}

impl Transport {
    pub fn new(base_url: &str, credentials: Credentials) -> Result<Self, Error> {
        let base_url = Url::parse(base_url).map_err(|e| Error::InvalidUrl(e.to_string()))?;
        if base_url.cannot_be_a_base() {
            return Err(Error::InvalidUrl(base_url.to_string()));
        }
        Ok(Self {
            client: Client::new(),
            base_url,
            credentials,
            decay: Decay::default(),
        })
    }

    pub fn with_decay(mut self, decay: Decay) -> Self {
        self.decay = decay;
        self
    }

    pub fn username(&self) -> &str {
        &self.credentials.username
    }

    /// The base url with `segments` appended, each percent-encoded on its own.
    pub fn url<'a>(&self, segments: impl IntoIterator<Item = &'a str>) -> Result<Url, Error> {
        let mut url = self.base_url.clone();
        url.path_segments_mut()
            .map_err(|()| Error::InvalidUrl(self.base_url.to_string()))?
            .pop_if_empty()
            .extend(segments);
        Ok(url)
    }

    fn request(&self, method: Method, url: Url) -> RequestBuilder {
        self.client
            .request(method, url)
            .basic_auth(
                &self.credentials.username,
                Some(self.credentials.access_key.expose()),
            )
            .header("User-Agent", format!("apix/{}", apix_utils::VERSION))
    }

    pub async fn get<T: DeserializeOwned>(&self, url: Url) -> Result<T, Error> {
        let build_request = || self.request(Method::GET, url.clone());
        let response = send_request_with_decay(build_request, self.decay).await?;
        Self::decode(response).await
    }

    pub async fn post<B: Serialize, T: DeserializeOwned>(
        &self,
        url: Url,
        body: &B,
    ) -> Result<T, Error> {
        let build_request = || self.request(Method::POST, url.clone()).json(body);
        let response = send_request_with_decay(build_request, self.decay).await?;
        Self::decode(response).await
    }

    async fn decode<T: DeserializeOwned>(response: reqwest::Response) -> Result<T, Error> {
        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(Error::from_status(status, body));
        }
        let bytes = response.bytes().await?;
        serde_json::from_slice(&bytes).map_err(|e| Error::SchemaError(e.to_string()))
    }
}
