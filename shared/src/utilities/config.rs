use std::{
    path::{Path, PathBuf},
    str::FromStr,
};

use tokio::fs;
use tracing::Level;
use url::Url;
use uuid::Uuid;

use crate::{schemas::SchemaVersion, utilities::errors::AppError};

/// How a bearer token is obtained from a deployment.
#[derive(Clone, PartialEq, Eq, Debug)]
pub enum TokenFlow {
    /// `POST /api/v1/token` with an application id and secret.
    AppToken,
    /// Keycloak client-credentials grant against the given realm.
    Realm(String),
}

#[derive(Clone, Debug)]
pub struct ClusterConfig {
    pub base_url: Url,
    pub client_id: String,
    pub client_secret: String,
    pub cluster_id: Option<Uuid>,
    pub token_flow: TokenFlow,
}

/// Values given explicitly on the command line. They win over secrets and env vars.
#[derive(Clone, Default, Debug)]
pub struct ConfigOverrides {
    pub source_url: Option<String>,
    pub source_client_id: Option<String>,
    pub source_client_secret: Option<String>,
    pub source_cluster_id: Option<String>,
    pub source_realm: Option<String>,
    pub destination_url: Option<String>,
    pub destination_client_id: Option<String>,
    pub destination_client_secret: Option<String>,
    pub destination_cluster_id: Option<String>,
    pub destination_realm: Option<String>,
    pub tracing_level: Option<Level>,
    pub snapshot_dir: Option<PathBuf>,
    pub source_version: Option<String>,
    pub target_schema: Option<SchemaVersion>,
    pub convert_storage: Option<bool>,
    pub report_path: Option<PathBuf>,
    pub request_timeout_secs: Option<u64>,
}

#[derive(Clone, Debug)]
pub struct Config {
    pub tracing_level: Level,

    // SOURCE
    pub source: Option<ClusterConfig>,
    pub source_cluster_id: Option<Uuid>,
    pub source_version: String,
    pub snapshot_dir: PathBuf,

    // DESTINATION
    pub destination: Option<ClusterConfig>,
    pub target_schema: SchemaVersion,
    pub convert_storage: bool,

    pub report_path: Option<PathBuf>,
    pub request_timeout_secs: u64,
}

impl Config {
    pub async fn init(overrides: ConfigOverrides) -> Result<Self, AppError> {
        dotenvy::dotenv().ok();

        let tracing_level = pick(
            overrides.tracing_level,
            "TRACING_LEVEL",
            Some("TRACING_LEVEL"),
            Some(Level::INFO),
        )
        .await?
        .unwrap_or(Level::INFO);

        let source = cluster_config(
            "SOURCE",
            ClusterOverrides {
                url: overrides.source_url,
                client_id: overrides.source_client_id,
                client_secret: overrides.source_client_secret,
                cluster_id: overrides.source_cluster_id.clone(),
                realm: overrides.source_realm,
            },
        )
        .await?;

        // Known even without a live source, snapshots carry the source cluster in access rules.
        let source_cluster_id = match source.as_ref().and_then(|s| s.cluster_id) {
            Some(id) => Some(id),
            None => pick(
                overrides.source_cluster_id,
                "source_cluster_id",
                Some("SOURCE_CLUSTER_ID"),
                None,
            )
            .await?
            .map(|raw: String| Uuid::parse_str(raw.trim()))
            .transpose()?,
        };

        let destination = cluster_config(
            "DESTINATION",
            ClusterOverrides {
                url: overrides.destination_url,
                client_id: overrides.destination_client_id,
                client_secret: overrides.destination_client_secret,
                cluster_id: overrides.destination_cluster_id,
                realm: overrides.destination_realm,
            },
        )
        .await?;

        let source_version = pick(
            overrides.source_version,
            "source_version",
            Some("SOURCE_VERSION"),
            Some("source".to_string()),
        )
        .await?
        .unwrap_or_else(|| "source".to_string());

        let snapshot_dir = match overrides.snapshot_dir {
            Some(dir) => dir,
            None => get_config_value::<String>("snapshot_dir", Some("SNAPSHOT_DIR"), None, None)
                .await?
                .map(PathBuf::from)
                .unwrap_or_else(|| PathBuf::from(format!("{source_version}_cluster_json"))),
        };

        let target_schema = pick(
            overrides.target_schema,
            "target_schema",
            Some("TARGET_SCHEMA"),
            Some(SchemaVersion::default()),
        )
        .await?
        .unwrap_or_default();

        let convert_storage = pick(
            overrides.convert_storage,
            "convert_storage",
            Some("CONVERT_STORAGE"),
            Some(false),
        )
        .await?
        .unwrap_or(false);

        let report_path = match overrides.report_path {
            Some(path) => Some(path),
            None => get_config_value::<String>("report_path", Some("REPORT_PATH"), None, None)
                .await?
                .map(PathBuf::from),
        };

        let request_timeout_secs = pick(
            overrides.request_timeout_secs,
            "request_timeout_secs",
            Some("REQUEST_TIMEOUT_SECS"),
            Some(60),
        )
        .await?
        .unwrap_or(60);

        Ok(Config {
            tracing_level,
            source,
            source_cluster_id,
            source_version,
            snapshot_dir,
            destination,
            target_schema,
            convert_storage,
            report_path,
            request_timeout_secs,
        })
    }

    pub fn require_source(&self) -> Result<&ClusterConfig, AppError> {
        self.source
            .as_ref()
            .ok_or_else(|| AppError::EnvironmentVariableNotSetError("SOURCE_BASE_URL".to_string()))
    }

    pub fn require_destination(&self) -> Result<&ClusterConfig, AppError> {
        self.destination.as_ref().ok_or_else(|| {
            AppError::EnvironmentVariableNotSetError("DESTINATION_BASE_URL".to_string())
        })
    }
}

struct ClusterOverrides {
    url: Option<String>,
    client_id: Option<String>,
    client_secret: Option<String>,
    cluster_id: Option<String>,
    realm: Option<String>,
}

/// Builds one side of the migration. Returns `None` when no base url is configured for it.
async fn cluster_config(
    prefix: &str,
    overrides: ClusterOverrides,
) -> Result<Option<ClusterConfig>, AppError> {
    let lower = prefix.to_ascii_lowercase();

    let Some(base_url) = pick(
        overrides.url,
        &format!("{lower}_base_url"),
        Some(format!("{prefix}_BASE_URL").as_str()),
        None,
    )
    .await?
    else {
        return Ok(None);
    };
    let base_url = Url::parse(base_url.trim_end_matches('/'))?;

    let client_id = pick(
        overrides.client_id,
        &format!("{lower}_client_id"),
        Some(format!("{prefix}_CLIENT_ID").as_str()),
        None,
    )
    .await?
    .ok_or_else(|| AppError::EnvironmentVariableNotSetError(format!("{prefix}_CLIENT_ID")))?;

    let client_secret = pick(
        overrides.client_secret,
        &format!("{lower}_client_secret"),
        Some(format!("{prefix}_CLIENT_SECRET").as_str()),
        None,
    )
    .await?
    .ok_or_else(|| AppError::EnvironmentVariableNotSetError(format!("{prefix}_CLIENT_SECRET")))?;

    let cluster_id = pick(
        overrides.cluster_id,
        &format!("{lower}_cluster_id"),
        Some(format!("{prefix}_CLUSTER_ID").as_str()),
        None,
    )
    .await?
    .map(|raw| Uuid::parse_str(raw.trim()))
    .transpose()?;

    let token_flow = pick(
        overrides.realm,
        &format!("{lower}_realm"),
        Some(format!("{prefix}_REALM").as_str()),
        None,
    )
    .await?
    .filter(|realm| !realm.is_empty())
    .map(TokenFlow::Realm)
    .unwrap_or(TokenFlow::AppToken);

    Ok(Some(ClusterConfig {
        base_url,
        client_id,
        client_secret,
        cluster_id,
        token_flow,
    }))
}

/// An explicit value short-circuits the lookup chain of [`get_config_value`].
async fn pick<T>(
    explicit: Option<T>,
    secret_name: &str,
    env_name: Option<&str>,
    fallback: Option<T>,
) -> Result<Option<T>, AppError>
where
    T: FromStr,
{
    match explicit {
        Some(value) => Ok(Some(value)),
        None => get_config_value(secret_name, env_name, None, fallback).await,
    }
}

/// Try to resolve config value from Docker secrets, file path, or env var.
/// - `secret_name` → filename inside `/run/secrets/`
/// - `env_name` → optional environment variable key
/// - `fallback_path` → fallback file path (checked if exists)
///
/// Returns parsed `T` if found and successfully parsed.
pub async fn get_config_value<T>(
    secret_name: &str,
    env_name: Option<&str>,
    fallback_path: Option<&PathBuf>,
    fallback: Option<T>,
) -> Result<Option<T>, AppError>
where
    T: FromStr,
{
    // 1. Docker secrets
    let docker_secret = Path::new("/run/secrets").join(secret_name);
    if docker_secret.exists() {
        match fs::read_to_string(&docker_secret).await {
            Ok(content) => {
                if let Ok(parsed) = T::from_str(content.trim()) {
                    return Ok(Some(parsed));
                }
            }
            Err(e) => {
                return Err(AppError::FileReadError(format!(
                    "Failed to read docker secret at {0}, {e}",
                    docker_secret.display()
                )));
            }
        }
    }

    // 2. Env var
    if let Some(env_key) = env_name
        && let Ok(val) = std::env::var(env_key)
        && let Ok(parsed) = T::from_str(val.trim())
    {
        return Ok(Some(parsed));
    }

    // 3. Fallback file path
    if let Some(path) = fallback_path
        && path.exists()
    {
        match fs::read_to_string(path).await {
            Ok(content) => {
                if let Ok(parsed) = T::from_str(content.trim()) {
                    return Ok(Some(parsed));
                }
            }
            Err(e) => {
                return Err(AppError::FileReadError(format!(
                    "Failed to read fallback file at {}, {}",
                    path.display(),
                    e
                )));
            }
        }
    }

    // 4. Final fallback
    Ok(fallback)
}
