use crate::collectors::serverinfo::{self, FetchError};
use crate::config::{ConfigError, ProbeSettings, Thresholds};
use crate::evaluate::{evaluate, EvaluateError, Verdict};
use thiserror::Error;
use tracing::debug;

#[derive(Debug, Error)]
pub enum ProbeError {
    #[error(transparent)]
    Config(#[from] ConfigError),
    #[error(transparent)]
    Fetch(#[from] FetchError),
    #[error(transparent)]
    Evaluate(#[from] EvaluateError),
}

pub async fn run_check(
    settings: &ProbeSettings,
    thresholds: &Thresholds,
) -> Result<Verdict, ProbeError> {
    let client = serverinfo::build_client(settings.timeout)?;
    let snapshot =
        serverinfo::fetch_snapshot(&client, &settings.server_url, &settings.token).await?;
    debug!(
        version = %snapshot.version,
        cpu_samples = snapshot.cpu_load.len(),
        "serverinfo snapshot decoded"
    );

    let verdict = evaluate(&snapshot, thresholds)?;
    debug!(
        severity = %verdict.severity,
        reason = ?verdict.reason,
        metrics = verdict.metrics.len(),
        "snapshot evaluated"
    );
    Ok(verdict)
}
