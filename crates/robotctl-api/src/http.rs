//! `reqwest`-backed implementation of [`RobotClient`].
//!
//! The webservice speaks form-encoded requests, JSON responses wrapped in a
//! single-key envelope (`{"server": {...}}`), and HTTP basic auth.

use std::net::IpAddr;
use std::time::Duration;

use async_trait::async_trait;
use reqwest::header::{HeaderMap, HeaderValue};
use reqwest::{Client, Method, StatusCode, Url};
use serde::Deserialize;
use serde::de::DeserializeOwned;
use tokio::net::TcpStream;
use tracing::debug;

use crate::client::RobotClient;
use crate::error::{RobotError, RobotResult};
use crate::model::{
    AdminAccount, FailoverIp, RebootMethod, RescueCredentials, ReverseDns, Server, ServerId,
    Vswitch,
};

/// Production endpoint of the Robot webservice.
pub const DEFAULT_BASE_URL: &str = "https://robot-ws.your-server.de";

const HEADER_REQUEST_ID: &str = "x-request-id";
const DEFAULT_TIMEOUT_SECS: u64 = 30;
const RESCUE_OS: &str = "linux";
const SSH_PORT: u16 = 22;
const SSH_CONNECT_TIMEOUT: Duration = Duration::from_secs(3);

/// Transport options for [`HttpRobotClient`].
#[derive(Debug, Clone)]
pub struct HttpRobotClientOptions {
    /// Per-request timeout.
    pub timeout: Duration,
    /// Trace identifier sent as `x-request-id` on every request.
    pub request_id: Option<String>,
}

impl Default for HttpRobotClientOptions {
    fn default() -> Self {
        Self {
            timeout: Duration::from_secs(DEFAULT_TIMEOUT_SECS),
            request_id: None,
        }
    }
}

/// Robot webservice client authenticated with account credentials.
#[derive(Clone)]
pub struct HttpRobotClient {
    client: Client,
    base_url: Url,
    username: String,
    password: String,
}

impl HttpRobotClient {
    /// Build a client for `base_url` authenticating as `username`.
    ///
    /// # Errors
    ///
    /// Returns [`RobotError::Build`] when the underlying HTTP client cannot be
    /// constructed.
    pub fn new(
        base_url: Url,
        username: impl Into<String>,
        password: impl Into<String>,
        options: &HttpRobotClientOptions,
    ) -> RobotResult<Self> {
        let mut default_headers = HeaderMap::new();
        if let Some(request_id) = options.request_id.as_deref()
            && let Ok(value) = HeaderValue::from_str(request_id)
        {
            default_headers.insert(HEADER_REQUEST_ID, value);
        }

        let client = Client::builder()
            .timeout(options.timeout)
            .default_headers(default_headers)
            .user_agent(concat!("robotctl/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(|source| RobotError::Build { source })?;

        Ok(Self {
            client,
            base_url,
            username: username.into(),
            password: password.into(),
        })
    }

    async fn send(
        &self,
        method: Method,
        path: &str,
        form: Option<&[(&str, String)]>,
    ) -> RobotResult<Vec<u8>> {
        let url = self
            .base_url
            .join(path)
            .map_err(|source| RobotError::InvalidUrl {
                path: path.to_string(),
                source,
            })?;
        debug!(method = %method, path, "robot request");

        let mut request = self
            .client
            .request(method, url)
            .basic_auth(&self.username, Some(&self.password));
        if let Some(form) = form {
            request = request.form(form);
        }

        let response = request
            .send()
            .await
            .map_err(|source| RobotError::Transport {
                path: path.to_string(),
                source,
            })?;
        let status = response.status();
        let body = response
            .bytes()
            .await
            .map_err(|source| RobotError::Transport {
                path: path.to_string(),
                source,
            })?;

        if status.is_success() {
            Ok(body.to_vec())
        } else {
            debug!(%status, path, "robot request rejected");
            Err(classify_problem(status, &body))
        }
    }

    async fn get_json<T: DeserializeOwned>(&self, path: &str) -> RobotResult<T> {
        let body = self.send(Method::GET, path, None).await?;
        decode(path, &body)
    }

    async fn post_json<T: DeserializeOwned>(
        &self,
        path: &str,
        form: &[(&str, String)],
    ) -> RobotResult<T> {
        let body = self.send(Method::POST, path, Some(form)).await?;
        decode(path, &body)
    }

    async fn delete(&self, path: &str) -> RobotResult<()> {
        self.send(Method::DELETE, path, None).await.map(|_| ())
    }
}

#[async_trait]
impl RobotClient for HttpRobotClient {
    async fn find_server(&self, address: IpAddr) -> RobotResult<Server> {
        let record: IpEnvelope = self.get_json(&format!("/ip/{address}")).await?;
        let envelope: ServerEnvelope = self
            .get_json(&format!("/server/{}", record.ip.server_number))
            .await?;
        Ok(envelope.server)
    }

    async fn list_servers(&self) -> RobotResult<Vec<Server>> {
        let envelopes: Vec<ServerEnvelope> = self.get_json("/server").await?;
        Ok(envelopes.into_iter().map(|entry| entry.server).collect())
    }

    async fn reboot_server(&self, id: ServerId, method: RebootMethod) -> RobotResult<()> {
        self.send(
            Method::POST,
            &format!("/reset/{id}"),
            Some(&[("type", method.as_api_str().to_string())]),
        )
        .await
        .map(|_| ())
    }

    async fn set_server_name(&self, id: ServerId, name: &str) -> RobotResult<Server> {
        let envelope: ServerEnvelope = self
            .post_json(
                &format!("/server/{id}"),
                &[("server_name", name.to_string())],
            )
            .await?;
        Ok(envelope.server)
    }

    async fn get_reverse_dns(&self, ip: IpAddr) -> RobotResult<ReverseDns> {
        let envelope: RdnsEnvelope = self.get_json(&format!("/rdns/{ip}")).await?;
        Ok(envelope.rdns)
    }

    async fn set_reverse_dns(&self, ip: IpAddr, ptr: &str) -> RobotResult<ReverseDns> {
        let envelope: RdnsEnvelope = self
            .post_json(&format!("/rdns/{ip}"), &[("ptr", ptr.to_string())])
            .await?;
        Ok(envelope.rdns)
    }

    async fn delete_reverse_dns(&self, ip: IpAddr) -> RobotResult<()> {
        self.delete(&format!("/rdns/{ip}")).await
    }

    async fn list_failover_ips(&self) -> RobotResult<Vec<FailoverIp>> {
        let envelopes: Vec<FailoverEnvelope> = self.get_json("/failover").await?;
        Ok(envelopes.into_iter().map(|entry| entry.failover).collect())
    }

    async fn set_failover_destination(
        &self,
        ip: IpAddr,
        destination: IpAddr,
    ) -> RobotResult<FailoverIp> {
        let envelope: FailoverEnvelope = self
            .post_json(
                &format!("/failover/{ip}"),
                &[("active_server_ip", destination.to_string())],
            )
            .await?;
        Ok(envelope.failover)
    }

    async fn list_vswitches(&self) -> RobotResult<Vec<Vswitch>> {
        let summaries: Vec<Vswitch> = self.get_json("/vswitch").await?;
        let mut detailed = Vec::with_capacity(summaries.len());
        for summary in summaries {
            let detail: Vswitch = self.get_json(&format!("/vswitch/{}", summary.id)).await?;
            detailed.push(detail);
        }
        Ok(detailed)
    }

    async fn create_admin_account(
        &self,
        id: ServerId,
        password: Option<&str>,
    ) -> RobotResult<AdminAccount> {
        let form: Vec<(&str, String)> = password
            .map(|value| vec![("password", value.to_string())])
            .unwrap_or_default();
        let envelope: AdminEnvelope = self.post_json(&format!("/admin/{id}"), &form).await?;
        Ok(envelope.admin)
    }

    async fn delete_admin_account(&self, id: ServerId) -> RobotResult<()> {
        self.delete(&format!("/admin/{id}")).await
    }

    async fn get_admin_account(&self, id: ServerId) -> RobotResult<AdminAccount> {
        let envelope: AdminEnvelope = self.get_json(&format!("/admin/{id}")).await?;
        Ok(envelope.admin)
    }

    async fn activate_rescue(
        &self,
        id: ServerId,
        authorized_keys: &[String],
    ) -> RobotResult<RescueCredentials> {
        let mut form = vec![("os", RESCUE_OS.to_string())];
        form.extend(
            authorized_keys
                .iter()
                .map(|fingerprint| ("authorized_key[]", fingerprint.clone())),
        );
        let envelope: RescueEnvelope = self
            .post_json(&format!("/boot/{id}/rescue"), &form)
            .await?;
        Ok(envelope.rescue)
    }

    async fn poll_rescue_ready(&self, id: ServerId) -> RobotResult<bool> {
        let envelope: RescueStatusEnvelope =
            self.get_json(&format!("/boot/{id}/rescue")).await?;
        if envelope.rescue.active {
            return Ok(false);
        }

        let Some(address) = envelope
            .rescue
            .server_ip
            .as_deref()
            .and_then(|ip| ip.parse::<IpAddr>().ok())
        else {
            return Ok(true);
        };
        Ok(ssh_port_open(address).await)
    }
}

async fn ssh_port_open(address: IpAddr) -> bool {
    matches!(
        tokio::time::timeout(SSH_CONNECT_TIMEOUT, TcpStream::connect((address, SSH_PORT))).await,
        Ok(Ok(_))
    )
}

fn decode<T: DeserializeOwned>(path: &str, body: &[u8]) -> RobotResult<T> {
    serde_json::from_slice(body).map_err(|source| RobotError::Decode {
        path: path.to_string(),
        source,
    })
}

/// Classify a non-success response into a [`RobotError`].
fn classify_problem(status: StatusCode, body: &[u8]) -> RobotError {
    let detail = serde_json::from_slice::<ErrorEnvelope>(body)
        .ok()
        .map(|envelope| envelope.error);
    let code = detail
        .as_ref()
        .map(|detail| detail.code.clone())
        .filter(|code| !code.is_empty())
        .unwrap_or_else(|| status.as_str().to_string());
    let body_text = String::from_utf8_lossy(body).trim().to_string();
    let message = detail
        .as_ref()
        .map(|detail| detail.message.clone())
        .filter(|message| !message.is_empty())
        .or_else(|| (!body_text.is_empty()).then_some(body_text))
        .unwrap_or_else(|| format!("request failed with status {status}"));

    match status {
        StatusCode::UNAUTHORIZED => RobotError::Unauthorized,
        StatusCode::NOT_FOUND => RobotError::NotFound { code, message },
        StatusCode::BAD_REQUEST => RobotError::InvalidInput {
            code,
            message,
            invalid: detail.map(|detail| detail.invalid).unwrap_or_default(),
        },
        StatusCode::CONFLICT => RobotError::Conflict { code, message },
        _ if status.is_server_error() || code == "RATE_LIMIT_EXCEEDED" => {
            RobotError::Unavailable {
                status: status.as_u16(),
                message,
            }
        }
        _ => RobotError::Rejected {
            status: status.as_u16(),
            code,
            message,
        },
    }
}

#[derive(Deserialize)]
struct ServerEnvelope {
    server: Server,
}

#[derive(Deserialize)]
struct IpEnvelope {
    ip: IpRecord,
}

#[derive(Deserialize)]
struct IpRecord {
    server_number: ServerId,
}

#[derive(Deserialize)]
struct RdnsEnvelope {
    rdns: ReverseDns,
}

#[derive(Deserialize)]
struct FailoverEnvelope {
    failover: FailoverIp,
}

#[derive(Deserialize)]
struct AdminEnvelope {
    admin: AdminAccount,
}

#[derive(Deserialize)]
struct RescueEnvelope {
    rescue: RescueCredentials,
}

#[derive(Deserialize)]
struct RescueStatusEnvelope {
    rescue: RescueStatus,
}

#[derive(Deserialize)]
struct RescueStatus {
    #[serde(default)]
    active: bool,
    #[serde(default)]
    server_ip: Option<String>,
}

#[derive(Deserialize)]
struct ErrorEnvelope {
    error: ErrorDetail,
}

#[derive(Deserialize)]
struct ErrorDetail {
    #[serde(default)]
    code: String,
    #[serde(default)]
    message: String,
    #[serde(default)]
    invalid: Vec<String>,
}
