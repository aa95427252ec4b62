use std::time::Duration;

use async_trait::async_trait;
use parking_lot::Mutex;
use reqwest::redirect::Policy;
use reqwest::{RequestBuilder, Response};
use serde_json::Value;
use tracing::{debug, trace};

use crate::api::NexiaApi;
use crate::logger::{MessageLogMode, MessageLogger};
use crate::protocol::{DEFAULT_BASE_URL, HEADER_API_KEY, HEADER_MOBILE_ID, WriteTarget, house_path};
use crate::{Error, Result};

pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(20);

pub struct HttpApiBuilder {
    house_id: u64,
    mobile_id: String,
    api_key: String,
    base_url: String,
    timeout: Duration,
    log_mode: Option<MessageLogMode>,
    log_path: Option<String>,
}

impl HttpApiBuilder {
    /// Credentials come from a prior sign-in; this client does not log in.
    pub fn new(house_id: u64, mobile_id: impl Into<String>, api_key: impl Into<String>) -> Self {
        Self {
            house_id,
            mobile_id: mobile_id.into(),
            api_key: api_key.into(),
            base_url: DEFAULT_BASE_URL.to_string(),
            timeout: DEFAULT_TIMEOUT,
            log_mode: None,
            log_path: None,
        }
    }

    pub fn base_url(mut self, url: impl Into<String>) -> Self {
        self.base_url = url.into().trim_end_matches('/').to_string();
        self
    }

    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn message_log(mut self, mode: MessageLogMode, path: impl Into<String>) -> Self {
        self.log_mode = Some(mode);
        self.log_path = Some(path.into());
        self
    }

    pub fn build(self) -> Result<HttpApi> {
        // A redirect means the session expired; following it would land on
        // the HTML login page.
        let http = reqwest::Client::builder()
            .timeout(self.timeout)
            .redirect(Policy::none())
            .build()?;

        let logger = match (self.log_mode, self.log_path) {
            (Some(mode), Some(path)) => Some(Mutex::new(MessageLogger::new(mode, &path)?)),
            _ => None,
        };

        Ok(HttpApi {
            http,
            base_url: self.base_url,
            house_id: self.house_id,
            mobile_id: self.mobile_id,
            api_key: self.api_key,
            logger,
        })
    }
}

/// [`NexiaApi`] over the vendor's mobile HTTP API.
pub struct HttpApi {
    http: reqwest::Client,
    base_url: String,
    house_id: u64,
    mobile_id: String,
    api_key: String,
    logger: Option<Mutex<MessageLogger>>,
}

impl HttpApi {
    pub fn builder(house_id: u64, mobile_id: impl Into<String>, api_key: impl Into<String>) -> HttpApiBuilder {
        HttpApiBuilder::new(house_id, mobile_id, api_key)
    }

    pub fn house_id(&self) -> u64 {
        self.house_id
    }

    fn authorized(&self, request: RequestBuilder) -> RequestBuilder {
        request
            .header(HEADER_MOBILE_ID, &self.mobile_id)
            .header(HEADER_API_KEY, &self.api_key)
    }

    fn with_logger(&self, f: impl FnOnce(&mut MessageLogger)) {
        if let Some(logger) = &self.logger {
            f(&mut logger.lock());
        }
    }

    fn check(response: Response) -> Result<Response> {
        if response.status().is_redirection() {
            return Err(Error::SessionExpired);
        }
        Ok(response.error_for_status()?)
    }
}

#[async_trait]
impl NexiaApi for HttpApi {
    async fn fetch_house(&self) -> Result<Value> {
        let path = house_path(self.house_id);
        let url = format!("{}{path}", self.base_url);
        debug!(url = %url, "fetching house");
        self.with_logger(|l| l.log_request("GET", &path));

        let response = Self::check(self.authorized(self.http.get(&url)).send().await?)?;
        let status = response.status().as_u16();
        let body = response.text().await?;
        let house: Value = serde_json::from_str(&body)?;
        trace!(bytes = body.len(), "house fetched");

        self.with_logger(|l| l.log_house(status, &house));
        Ok(house)
    }

    async fn post(&self, target: WriteTarget, endpoint: &str, data: Value) -> Result<()> {
        let url = format!("{}{}", self.base_url, target.path(endpoint));
        debug!(url = %url, body = %data, "posting");
        self.with_logger(|l| l.log_command(endpoint, target, &data));

        Self::check(self.authorized(self.http.post(&url)).json(&data).send().await?)?;
        Ok(())
    }
}
