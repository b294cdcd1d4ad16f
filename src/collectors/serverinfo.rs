use super::Snapshot;
use reqwest::header::ACCEPT;
use reqwest::{Client, StatusCode};
use serde::{Deserialize, Deserializer};
use std::time::Duration;
use thiserror::Error;
use tracing::{debug, warn};

pub const INFO_PATH: &str = "/ocs/v2.php/apps/serverinfo/api/v1/info";
const INFO_QUERY: &str = "format=json&skipApps=false&skipUpdate=false";
const TOKEN_HEADER: &str = "NC-Token";

#[derive(Debug, Error)]
pub enum FetchError {
    #[error("Failed to create request: {0}")]
    RequestConstruction(#[source] reqwest::Error),
    #[error("API request failed: {0}")]
    Transport(#[source] reqwest::Error),
    #[error("Unauthorized access (401)")]
    Unauthorized,
    #[error("Failed to read API response: {0}")]
    BodyRead(#[source] reqwest::Error),
    #[error("Failed to parse API response: {0}")]
    Decode(#[source] serde_json::Error),
}

pub fn build_client(timeout: Duration) -> Result<Client, FetchError> {
    Client::builder()
        .user_agent(concat!("check-nextcloud/", env!("CARGO_PKG_VERSION")))
        .timeout(timeout)
        .build()
        .map_err(FetchError::RequestConstruction)
}

pub fn info_url(server_url: &str) -> String {
    format!("{server_url}{INFO_PATH}?{INFO_QUERY}")
}

pub async fn fetch_snapshot(
    client: &Client,
    server_url: &str,
    token: &str,
) -> Result<Snapshot, FetchError> {
    let url = info_url(server_url);
    let request = client
        .get(&url)
        .header(TOKEN_HEADER, token)
        .header(ACCEPT, "application/json")
        .build()
        .map_err(FetchError::RequestConstruction)?;

    let response = client.execute(request).await.map_err(|err| {
        warn!(url = %url, error = %err, "serverinfo request failed");
        FetchError::Transport(err)
    })?;

    let status = response.status();
    if status == StatusCode::UNAUTHORIZED {
        warn!(url = %url, "serverinfo rejected the token");
        return Err(FetchError::Unauthorized);
    }
    if !status.is_success() {
        debug!(url = %url, status = %status, "unexpected serverinfo status, decoding anyway");
    }

    let body = response.bytes().await.map_err(FetchError::BodyRead)?;
    decode_snapshot(&body)
}

pub fn decode_snapshot(body: &[u8]) -> Result<Snapshot, FetchError> {
    let resp: OcsResponse = serde_json::from_slice(body).map_err(FetchError::Decode)?;
    Ok(resp.into())
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct OcsResponse {
    #[serde(deserialize_with = "null_as_default")]
    ocs: Ocs,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct Ocs {
    #[serde(deserialize_with = "null_as_default")]
    data: OcsData,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct OcsData {
    #[serde(deserialize_with = "null_as_default")]
    nextcloud: NextcloudInfo,
    #[serde(deserialize_with = "null_as_default")]
    server: ServerInfo,
    #[serde(rename = "activeUsers", deserialize_with = "null_as_default")]
    active_users: ActiveUsers,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct NextcloudInfo {
    #[serde(deserialize_with = "null_as_default")]
    system: SystemInfo,
    #[serde(deserialize_with = "null_as_default")]
    storage: StorageInfo,
    #[serde(deserialize_with = "null_as_default")]
    shares: SharesInfo,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct SystemInfo {
    #[serde(deserialize_with = "null_as_default")]
    version: String,
    #[serde(deserialize_with = "load_samples")]
    cpuload: Vec<f64>,
    #[serde(deserialize_with = "null_as_default")]
    mem_total: u64,
    #[serde(deserialize_with = "null_as_default")]
    mem_free: u64,
    #[serde(deserialize_with = "null_as_default")]
    swap_total: u64,
    #[serde(deserialize_with = "null_as_default")]
    swap_free: u64,
    #[serde(deserialize_with = "null_as_default")]
    apps: AppsInfo,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct AppsInfo {
    #[serde(deserialize_with = "null_as_default")]
    num_installed: u64,
    #[serde(deserialize_with = "null_as_default")]
    num_updates_available: u64,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct StorageInfo {
    #[serde(deserialize_with = "null_as_default")]
    num_users: u64,
    #[serde(deserialize_with = "null_as_default")]
    num_files: u64,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct SharesInfo {
    #[serde(deserialize_with = "null_as_default")]
    num_shares: u64,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct ServerInfo {
    #[serde(deserialize_with = "null_as_default")]
    php: PhpInfo,
    #[serde(deserialize_with = "null_as_default")]
    database: DatabaseInfo,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct PhpInfo {
    #[serde(deserialize_with = "null_as_default")]
    version: String,
    #[serde(deserialize_with = "null_as_default")]
    opcache: OpcacheInfo,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct OpcacheInfo {
    #[serde(deserialize_with = "null_as_default")]
    opcache_statistics: OpcacheStatistics,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct OpcacheStatistics {
    #[serde(deserialize_with = "null_as_default")]
    opcache_hit_rate: f64,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct DatabaseInfo {
    #[serde(deserialize_with = "null_as_default")]
    version: String,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct ActiveUsers {
    #[serde(deserialize_with = "null_as_default")]
    last5minutes: u64,
}

impl From<OcsResponse> for Snapshot {
    fn from(value: OcsResponse) -> Self {
        let data = value.ocs.data;
        let system = data.nextcloud.system;
        Self {
            version: system.version,
            cpu_load: system.cpuload,
            mem_total: system.mem_total,
            mem_free: system.mem_free,
            swap_total: system.swap_total,
            swap_free: system.swap_free,
            apps_installed: system.apps.num_installed,
            apps_updates_available: system.apps.num_updates_available,
            users: data.nextcloud.storage.num_users,
            files: data.nextcloud.storage.num_files,
            shares: data.nextcloud.shares.num_shares,
            php_version: data.server.php.version,
            db_version: data.server.database.version,
            active_users_5m: data.active_users.last5minutes,
            opcache_hit_rate: data.server.php.opcache.opcache_statistics.opcache_hit_rate,
        }
    }
}

fn null_as_default<'de, D, T>(deserializer: D) -> Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: Deserialize<'de> + Default,
{
    Ok(Option::<T>::deserialize(deserializer)?.unwrap_or_default())
}

// Hosts without load averages report `false` instead of an array.
fn load_samples<'de, D>(deserializer: D) -> Result<Vec<f64>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = serde_json::Value::deserialize(deserializer)?;
    let samples = match value {
        serde_json::Value::Array(items) => items
            .iter()
            .map(serde_json::Value::as_f64)
            .collect::<Option<Vec<_>>>()
            .unwrap_or_default(),
        _ => Vec::new(),
    };
    Ok(samples)
}
