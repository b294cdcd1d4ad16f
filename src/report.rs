use crate::evaluate::Verdict;
use crate::probe::ProbeError;

pub const FATAL_EXIT_CODE: u8 = 2;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Report {
    pub line: String,
    pub exit_code: u8,
}

impl Report {
    pub fn from_outcome(outcome: &Result<Verdict, ProbeError>) -> Self {
        match outcome {
            Ok(verdict) => Self::from_verdict(verdict),
            Err(err) => Self::fatal(err),
        }
    }

    pub fn from_verdict(verdict: &Verdict) -> Self {
        let status = match verdict.label() {
            Some(label) => format!("{} - {label}", verdict.severity),
            None => verdict.severity.to_string(),
        };
        let mut line = format!("{status} - Nextcloud {} running.", verdict.version);
        if !verdict.metrics.is_empty() {
            line.push_str(" | ");
            line.push_str(&verdict.metrics.to_perfdata());
        }
        Self {
            line,
            exit_code: verdict.severity.exit_code(),
        }
    }

    pub fn fatal(err: &ProbeError) -> Self {
        Self {
            line: format!("CRITICAL - {err}"),
            exit_code: FATAL_EXIT_CODE,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::collectors::serverinfo::FetchError;
    use crate::collectors::Snapshot;
    use crate::config::{ConfigError, Thresholds};
    use crate::evaluate::{evaluate, EvaluateError};

    fn snapshot() -> Snapshot {
        Snapshot {
            version: "28.0.4.1".to_string(),
            cpu_load: vec![0.5, 0.4, 0.3],
            mem_total: 1000,
            mem_free: 900,
            apps_installed: 53,
            users: 12,
            files: 34567,
            shares: 89,
            php_version: "8.2.17".to_string(),
            db_version: "10.11.6".to_string(),
            active_users_5m: 3,
            opcache_hit_rate: 98.76,
            ..Snapshot::default()
        }
    }

    fn report_for(snapshot: &Snapshot) -> Report {
        Report::from_verdict(&evaluate(snapshot, &Thresholds::default()).unwrap())
    }

    #[test]
    fn ok_line_carries_all_metrics() {
        let report = report_for(&snapshot());
        assert_eq!(report.exit_code, 0);
        assert_eq!(
            report.line,
            "OK - Nextcloud 28.0.4.1 running. | version=28.0.4.1 num_users=12 num_files=34567 \
             cpu_load_1m=0.5 cpu_load_5m=0.4 cpu_load_15m=0.3 memory_total=1000 memory_free=900 \
             memory_usage_percent=10 swap_total=0 swap_free=0 swap_usage_percent=0 \
             num_apps_installed=53 num_apps_update_available=0 num_shares=89 php_version=8.2.17 \
             db_version=10.11.6 active_users_5m=3 opcache_hit_rate=98.76"
        );
    }

    #[test]
    fn warning_line_names_the_reason() {
        let mut s = snapshot();
        s.cpu_load = vec![6.0, 1.0, 1.0];
        let report = report_for(&s);
        assert_eq!(report.exit_code, 1);
        assert!(report
            .line
            .starts_with("WARNING - High CPU Load - Nextcloud 28.0.4.1 running. | "));
    }

    #[test]
    fn critical_line_keeps_last_reason() {
        let mut s = snapshot();
        s.mem_free = 10;
        s.apps_updates_available = 3;
        let report = report_for(&s);
        assert_eq!(report.exit_code, 2);
        assert!(report
            .line
            .starts_with("CRITICAL - App Updates Available - Nextcloud 28.0.4.1 running. | "));
    }

    #[test]
    fn short_load_omits_cpu_metrics_from_line() {
        let mut s = snapshot();
        s.cpu_load = vec![0.1];
        let report = report_for(&s);
        assert!(!report.line.contains("cpu_load_"));
    }

    #[test]
    fn fatal_lines_are_distinguishable() {
        let cases = [
            (
                ProbeError::Config(ConfigError::MissingArguments),
                "CRITICAL - Missing required arguments",
            ),
            (
                ProbeError::Fetch(FetchError::Unauthorized),
                "CRITICAL - Unauthorized access (401)",
            ),
            (
                ProbeError::Evaluate(EvaluateError::InvalidSnapshot),
                "CRITICAL - Invalid API response",
            ),
            (
                ProbeError::Config(ConfigError::Validation("timeout_secs must be >= 1".into())),
                "CRITICAL - Invalid configuration: timeout_secs must be >= 1",
            ),
        ];
        for (err, expected) in cases {
            let report = Report::from_outcome(&Err(err));
            assert_eq!(report.line, expected);
            assert_eq!(report.exit_code, FATAL_EXIT_CODE);
        }
    }
}
