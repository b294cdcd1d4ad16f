use std::fmt;

#[derive(Debug, Clone, PartialEq)]
pub enum MetricValue {
    Count(u64),
    Gauge(f64),
    Text(String),
}

impl fmt::Display for MetricValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Count(v) => write!(f, "{v}"),
            Self::Gauge(v) => write!(f, "{v}"),
            Self::Text(v) if v.contains(|c: char| c.is_whitespace() || c == '=') => {
                write!(f, "'{}'", v.replace('\'', "''"))
            }
            Self::Text(v) => f.write_str(v),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct MetricSet {
    entries: Vec<(&'static str, MetricValue)>,
}

impl MetricSet {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, name: &'static str, value: MetricValue) {
        self.entries.push((name, value));
    }

    pub fn count(&mut self, name: &'static str, value: u64) {
        self.push(name, MetricValue::Count(value));
    }

    pub fn gauge(&mut self, name: &'static str, value: f64) {
        self.push(name, MetricValue::Gauge(value));
    }

    pub fn text(&mut self, name: &'static str, value: impl Into<String>) {
        self.push(name, MetricValue::Text(value.into()));
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn to_perfdata(&self) -> String {
        self.entries
            .iter()
            .map(|(name, value)| format!("{name}={value}"))
            .collect::<Vec<_>>()
            .join(" ")
    }
}

#[cfg(test)]
impl MetricSet {
    pub fn get(&self, name: &str) -> Option<&MetricValue> {
        self.entries
            .iter()
            .find(|(key, _)| *key == name)
            .map(|(_, value)| value)
    }

    pub fn names(&self) -> impl Iterator<Item = &'static str> + '_ {
        self.entries.iter().map(|(name, _)| *name)
    }
}
