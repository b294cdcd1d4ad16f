use crate::collectors::Snapshot;
use crate::config::Thresholds;
use crate::metrics::MetricSet;
use std::fmt;
use thiserror::Error;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Severity {
    Ok,
    Warning,
    Critical,
}

impl Severity {
    pub const fn exit_code(self) -> u8 {
        match self {
            Self::Ok => 0,
            Self::Warning => 1,
            Self::Critical => 2,
        }
    }

    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Ok => "OK",
            Self::Warning => "WARNING",
            Self::Critical => "CRITICAL",
        }
    }
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Rule {
    CpuLoad,
    MemoryUsage,
    SwapUsage,
    AppUpdates,
}

impl Rule {
    pub const fn label(self) -> &'static str {
        match self {
            Self::CpuLoad => "High CPU Load",
            Self::MemoryUsage => "High Memory Usage",
            Self::SwapUsage => "High Swap Usage",
            Self::AppUpdates => "App Updates Available",
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Verdict {
    pub severity: Severity,
    /// Rule that fired last, which is not necessarily the one that set `severity`.
    pub reason: Option<Rule>,
    pub version: String,
    pub metrics: MetricSet,
}

impl Verdict {
    pub fn label(&self) -> Option<&'static str> {
        self.reason.map(Rule::label)
    }
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum EvaluateError {
    #[error("Invalid API response")]
    InvalidSnapshot,
}

#[derive(Debug)]
struct Accumulator {
    severity: Severity,
    reason: Option<Rule>,
}

impl Accumulator {
    // Severity only ever rises; the reason is overwritten by every firing rule.
    fn fire(&mut self, rule: Rule, severity: Severity) {
        self.severity = self.severity.max(severity);
        self.reason = Some(rule);
    }
}

pub fn evaluate(snapshot: &Snapshot, thresholds: &Thresholds) -> Result<Verdict, EvaluateError> {
    if snapshot.version.is_empty() {
        return Err(EvaluateError::InvalidSnapshot);
    }

    let mut acc = Accumulator {
        severity: Severity::Ok,
        reason: None,
    };

    let load = load_windows(&snapshot.cpu_load);
    if let Some([load_1m, load_5m, load_15m]) = load {
        if load_1m > thresholds.cpu_load_1m
            || load_5m > thresholds.cpu_load_5m
            || load_15m > thresholds.cpu_load_15m
        {
            acc.fire(Rule::CpuLoad, Severity::Warning);
        }
    }

    let memory_usage = usage_percent(snapshot.mem_total, snapshot.mem_free);
    if let Some(severity) = usage_severity(
        memory_usage,
        thresholds.memory_warning_percent,
        thresholds.memory_critical_percent,
    ) {
        acc.fire(Rule::MemoryUsage, severity);
    }

    let swap_usage = usage_percent(snapshot.swap_total, snapshot.swap_free);
    if let Some(severity) = usage_severity(
        swap_usage,
        thresholds.swap_warning_percent,
        thresholds.swap_critical_percent,
    ) {
        acc.fire(Rule::SwapUsage, severity);
    }

    if snapshot.apps_updates_available > 0 {
        acc.fire(Rule::AppUpdates, Severity::Warning);
    }

    let mut metrics = MetricSet::new();
    metrics.text("version", snapshot.version.as_str());
    metrics.count("num_users", snapshot.users);
    metrics.count("num_files", snapshot.files);
    if let Some([load_1m, load_5m, load_15m]) = load {
        metrics.gauge("cpu_load_1m", load_1m);
        metrics.gauge("cpu_load_5m", load_5m);
        metrics.gauge("cpu_load_15m", load_15m);
    }
    metrics.count("memory_total", snapshot.mem_total);
    metrics.count("memory_free", snapshot.mem_free);
    metrics.gauge("memory_usage_percent", round2(memory_usage));
    metrics.count("swap_total", snapshot.swap_total);
    metrics.count("swap_free", snapshot.swap_free);
    metrics.gauge("swap_usage_percent", round2(swap_usage));
    metrics.count("num_apps_installed", snapshot.apps_installed);
    metrics.count("num_apps_update_available", snapshot.apps_updates_available);
    metrics.count("num_shares", snapshot.shares);
    metrics.text("php_version", snapshot.php_version.as_str());
    metrics.text("db_version", snapshot.db_version.as_str());
    metrics.count("active_users_5m", snapshot.active_users_5m);
    metrics.gauge("opcache_hit_rate", snapshot.opcache_hit_rate);

    Ok(Verdict {
        severity: acc.severity,
        reason: acc.reason,
        version: snapshot.version.clone(),
        metrics,
    })
}

pub fn usage_percent(total: u64, free: u64) -> f64 {
    if total == 0 {
        return 0.0;
    }
    (total as f64 - free as f64) / total as f64 * 100.0
}

fn usage_severity(usage: f64, warning: f64, critical: f64) -> Option<Severity> {
    if usage > critical {
        Some(Severity::Critical)
    } else if usage > warning {
        Some(Severity::Warning)
    } else {
        None
    }
}

// Extra samples beyond the first three are ignored.
fn load_windows(samples: &[f64]) -> Option<[f64; 3]> {
    match samples {
        [a, b, c, ..] => Some([*a, *b, *c]),
        _ => None,
    }
}

fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}
