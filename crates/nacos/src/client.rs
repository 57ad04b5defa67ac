use crate::{
    properties::{property_key, ConfigServiceProperties},
    types::{ConfigType, NacosError},
};
use async_trait::async_trait;
use reqwest::{header::ACCEPT_CHARSET, RequestBuilder, Response, StatusCode};
use serde::Deserialize;
use std::{
    fmt,
    sync::atomic::{AtomicUsize, Ordering},
    time::{Duration, Instant},
};
use tokio::sync::RwLock;
use tracing::{debug, info, warn};
use url::Url;

const CONFIG_PATH: &str = "nacos/v1/cs/configs";
const LOGIN_PATH: &str = "nacos/v1/auth/login";
const DEFAULT_MAX_RETRY: usize = 3;
const DEFAULT_RETRY_TIME_MS: u64 = 2000;
const POST_TIMEOUT_MS: u64 = 3000;
const DEFAULT_TOKEN_TTL_SECS: u64 = 18000;
const MAX_TOKEN_TTL_SECS: u64 = 7 * 24 * 3600;

/// Access to a remote configuration store.
#[async_trait]
pub trait ConfigService: Send + Sync {
    /// Read the content stored under `data_id` in `group`.
    ///
    /// Returns `None` when nothing is stored.
    async fn get_config(
        &self,
        data_id: &str,
        group: &str,
        timeout_ms: u64,
    ) -> Result<Option<String>, NacosError>;

    /// Store `content` under `data_id` in `group`, replacing any previous value.
    ///
    /// Returns `false` when the store refused the write.
    async fn publish_config(
        &self,
        data_id: &str,
        group: &str,
        content: &str,
        config_type: ConfigType,
    ) -> Result<bool, NacosError>;
}

/// Endpoints of one Nacos server.
#[derive(Debug, Clone)]
struct NacosServer {
    config_url: Url,
    login_url: Url,
}

impl NacosServer {
    fn parse(addr: &str) -> Result<Self, NacosError> {
        let addr = if addr.contains("://") { addr.to_string() } else { format!("http://{addr}") };
        let mut base = Url::parse(&addr)
            .map_err(|e| NacosError::ClientInit(format!("invalid server address {addr}: {e}")))?;
        if !base.path().ends_with('/') {
            let path = format!("{}/", base.path());
            base.set_path(&path);
        }
        let join = |path: &str| {
            base.join(path).map_err(|e| {
                NacosError::ClientInit(format!("invalid server address {addr}: {e}"))
            })
        };
        Ok(Self { config_url: join(CONFIG_PATH)?, login_url: join(LOGIN_PATH)? })
    }
}

struct Credentials {
    username: String,
    password: String,
}

#[derive(Debug)]
struct AccessToken {
    value: String,
    refresh_at: Instant,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct LoginResponse {
    access_token: String,
    #[serde(default = "default_token_ttl")]
    token_ttl: u64,
}

const fn default_token_ttl() -> u64 {
    DEFAULT_TOKEN_TTL_SECS
}

/// Nacos config service client speaking the v1 open API.
pub struct NacosConfigClient {
    http: reqwest::Client,
    servers: Vec<NacosServer>,
    namespace: Option<String>,
    encode: Option<String>,
    credentials: Option<Credentials>,
    max_retry: usize,
    retry_time: Duration,
    /// Index of the server that answered last.
    preferred: AtomicUsize,
    token: RwLock<Option<AccessToken>>,
}

impl fmt::Debug for NacosConfigClient {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("NacosConfigClient")
            .field("servers", &self.servers)
            .field("namespace", &self.namespace)
            .field("encode", &self.encode)
            .field("username", &self.credentials.as_ref().map(|c| c.username.as_str()))
            .field("max_retry", &self.max_retry)
            .field("retry_time", &self.retry_time)
            .field("preferred", &self.preferred)
            .field("token", &"<locked>")
            .finish()
    }
}

impl NacosConfigClient {
    /// Build a client from an assembled property set.
    pub fn from_properties(properties: &ConfigServiceProperties) -> Result<Self, NacosError> {
        let server_addr = properties
            .get_non_empty(property_key::SERVER_ADDR)
            .ok_or_else(|| NacosError::ClientInit("serverAddr is required".to_string()))?;

        let servers = server_addr
            .split(',')
            .map(str::trim)
            .filter(|addr| !addr.is_empty())
            .map(NacosServer::parse)
            .collect::<Result<Vec<_>, _>>()?;
        if servers.is_empty() {
            return Err(NacosError::ClientInit(format!("no usable address in {server_addr}")));
        }

        let max_retry = parse_number(properties, property_key::MAX_RETRY)?
            .map_or(DEFAULT_MAX_RETRY, |retry: usize| retry.max(1));
        let retry_time = parse_number(properties, property_key::CONFIG_RETRY_TIME)?
            .map_or(Duration::from_millis(DEFAULT_RETRY_TIME_MS), Duration::from_millis);

        let credentials = properties.get_non_empty(property_key::USERNAME).map(|username| {
            Credentials {
                username: username.to_string(),
                password: properties.get(property_key::PASSWORD).unwrap_or_default().to_string(),
            }
        });

        if properties.get_non_empty(property_key::ACCESS_KEY).is_some() {
            warn!(target: "sentinel::nacos", "[Nacos] accessKey/secretKey signing is not supported, requests are sent unsigned");
        }

        let http = reqwest::Client::builder().build().map_err(|e| {
            NacosError::ClientInit(format!("Failed to build HTTP client: {}", e))
        })?;

        let client = Self {
            http,
            servers,
            namespace: properties.get_non_empty(property_key::NAMESPACE).map(str::to_string),
            encode: properties.get_non_empty(property_key::ENCODE).map(str::to_string),
            credentials,
            max_retry,
            retry_time,
            preferred: AtomicUsize::new(0),
            token: RwLock::new(None),
        };
        info!(target: "sentinel::nacos", "[Nacos] Config client created: {:?}", client);
        Ok(client)
    }

    /// Send a request, failing over across servers on transport errors.
    ///
    /// Starts at the server that answered last.
    async fn execute<F>(&self, build: F) -> Result<Response, NacosError>
    where
        F: Fn(&NacosServer) -> RequestBuilder,
    {
        let mut last_error = None;
        let start = self.preferred.load(Ordering::Relaxed);
        for attempt in 0..self.max_retry {
            if attempt > 0 {
                tokio::time::sleep(self.retry_time).await;
            }
            let index = (start + attempt) % self.servers.len();
            let server = &self.servers[index];
            let mut request = build(server);
            if let Some(encode) = &self.encode {
                request = request.header(ACCEPT_CHARSET, encode);
            }
            match request.send().await {
                Ok(response) => {
                    if index != start {
                        debug!(target: "sentinel::nacos", "[Nacos] Switched to server {}", server.config_url);
                        self.preferred.store(index, Ordering::Relaxed);
                    }
                    return Ok(response);
                }
                Err(e) => {
                    warn!(target: "sentinel::nacos", "[Nacos] Request to {} failed (attempt {}/{}): {}", server.config_url, attempt + 1, self.max_retry, e);
                    last_error = Some(e);
                }
            }
        }
        match last_error {
            Some(e) => Err(NacosError::Transport(e)),
            None => Err(NacosError::ClientInit("no request attempted".to_string())),
        }
    }

    /// Current access token, logging in when missing or about to expire.
    async fn access_token(&self) -> Result<Option<String>, NacosError> {
        let Some(credentials) = &self.credentials else {
            return Ok(None);
        };

        if let Some(token) = self.token.read().await.as_ref() {
            if Instant::now() < token.refresh_at {
                return Ok(Some(token.value.clone()));
            }
        }

        let mut token = self.token.write().await;
        if let Some(token) = token.as_ref() {
            if Instant::now() < token.refresh_at {
                return Ok(Some(token.value.clone()));
            }
        }

        debug!(target: "sentinel::nacos", "[Nacos] Logging in as {}", credentials.username);
        let form = [
            ("username", credentials.username.as_str()),
            ("password", credentials.password.as_str()),
        ];
        let response = self
            .execute(|server| {
                self.http
                    .post(server.login_url.clone())
                    .form(&form)
                    .timeout(Duration::from_millis(POST_TIMEOUT_MS))
            })
            .await?;

        let status = response.status();
        let body = response.text().await?;
        if !status.is_success() {
            return Err(NacosError::Remote { status: status.as_u16(), message: body });
        }
        let login: LoginResponse = serde_json::from_str(&body)?;
        *token = Some(AccessToken {
            value: login.access_token.clone(),
            refresh_at: token_refresh_at(Instant::now(), login.token_ttl),
        });
        debug!(target: "sentinel::nacos", "[Nacos] Access token refreshed, ttl {}s", login.token_ttl);
        Ok(Some(login.access_token))
    }

    fn common_params<'a>(
        &'a self,
        data_id: &'a str,
        group: &'a str,
        token: Option<&'a str>,
    ) -> Vec<(&'static str, &'a str)> {
        let mut params = vec![("dataId", data_id), ("group", group)];
        if let Some(namespace) = &self.namespace {
            params.push(("tenant", namespace.as_str()));
        }
        if let Some(token) = token {
            params.push(("accessToken", token));
        }
        params
    }
}

#[async_trait]
impl ConfigService for NacosConfigClient {
    async fn get_config(
        &self,
        data_id: &str,
        group: &str,
        timeout_ms: u64,
    ) -> Result<Option<String>, NacosError> {
        let token = self.access_token().await?;
        let params = self.common_params(data_id, group, token.as_deref());

        let response = self
            .execute(|server| {
                let request = self.http.get(server.config_url.clone()).query(&params);
                if timeout_ms > 0 {
                    request.timeout(Duration::from_millis(timeout_ms))
                } else {
                    request
                }
            })
            .await?;

        let status = response.status();
        let body = response.text().await?;
        match status {
            StatusCode::OK if body.is_empty() => Ok(None),
            StatusCode::OK => Ok(Some(body)),
            StatusCode::NOT_FOUND => {
                debug!(target: "sentinel::nacos", "[Nacos] No config found for data_id={} group={}", data_id, group);
                Ok(None)
            }
            _ => Err(NacosError::Remote { status: status.as_u16(), message: body }),
        }
    }

    async fn publish_config(
        &self,
        data_id: &str,
        group: &str,
        content: &str,
        config_type: ConfigType,
    ) -> Result<bool, NacosError> {
        let token = self.access_token().await?;
        let mut form = self.common_params(data_id, group, None);
        form.push(("content", content));
        form.push(("type", config_type.as_str()));

        let response = self
            .execute(|server| {
                let mut request = self
                    .http
                    .post(server.config_url.clone())
                    .form(&form)
                    .timeout(Duration::from_millis(POST_TIMEOUT_MS));
                if let Some(token) = &token {
                    request = request.query(&[("accessToken", token.as_str())]);
                }
                request
            })
            .await?;

        let status = response.status();
        let body = response.text().await?;
        if !status.is_success() {
            return Err(NacosError::Remote { status: status.as_u16(), message: body });
        }
        Ok(body.trim() == "true")
    }
}

/// When a token issued at `now` with `ttl_secs` to live should be renewed.
///
/// The server supplied ttl is capped to [`MAX_TOKEN_TTL_SECS`].
fn token_refresh_at(now: Instant, ttl_secs: u64) -> Instant {
    let ttl = Duration::from_secs(ttl_secs.min(MAX_TOKEN_TTL_SECS));
    now.checked_add(ttl - ttl / 10).unwrap_or(now)
}

fn parse_number<T: std::str::FromStr>(
    properties: &ConfigServiceProperties,
    key: &str,
) -> Result<Option<T>, NacosError> {
    properties
        .get_non_empty(key)
        .map(|value| {
            value.trim().parse().map_err(|_| {
                NacosError::ClientInit(format!("{key} must be a number, got {value:?}"))
            })
        })
        .transpose()
}
