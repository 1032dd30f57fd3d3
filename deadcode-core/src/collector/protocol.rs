//! Statsd-style line parser
//!
//! Accepts lines shaped `name[,tag=value]*:increment|kind`, one per line.

use std::collections::BTreeMap;

use crate::error::{Error, Result};

/// One parsed metric line
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Metric {
    pub name: String,
    pub tags: BTreeMap<String, String>,
    pub increment: i64,
    /// Metric type, `c` for counters
    pub kind: String,
}

impl Metric {
    /// Class name carried by an `autoloaded` metric, with `\` separators restored
    pub fn class_name(&self) -> Option<String> {
        if self.name != crate::emitter::METRIC_NAME {
            return None;
        }
        self.tags.get("class").map(|class| class.replace('/', "\\"))
    }
}

/// Parse a single metric line
pub fn parse_metric(line: &str) -> Result<Metric> {
    let (head, value) = match line.split(':').collect::<Vec<_>>().as_slice() {
        [head, value] => (*head, *value),
        _ => return Err(Error::parse(line, "expected exactly one ':'")),
    };

    let mut parts = head.split(',');
    let name = parts.next().unwrap_or_default();
    if name.is_empty() {
        return Err(Error::parse(line, "metric name is empty"));
    }

    let mut tags = BTreeMap::new();
    for tag in parts {
        let (key, val) = tag
            .split_once('=')
            .ok_or_else(|| Error::parse(line, format!("tag {:?} has no '='", tag)))?;
        tags.insert(key.to_string(), val.to_string());
    }

    let (increment, kind) = match value.split('|').collect::<Vec<_>>().as_slice() {
        [increment, kind] => (*increment, *kind),
        _ => return Err(Error::parse(line, "expected exactly one '|'")),
    };
    let increment = increment
        .parse::<i64>()
        .map_err(|e| Error::parse(line, format!("invalid increment: {}", e)))?;

    Ok(Metric {
        name: name.to_string(),
        tags,
        increment,
        kind: kind.to_string(),
    })
}

/// Parse a newline separated payload, skipping lines that do not parse
pub fn parse_metrics(input: &str) -> Vec<Metric> {
    input
        .split('\n')
        .filter_map(|line| match parse_metric(line) {
            Ok(metric) => Some(metric),
            Err(e) => {
                if !line.is_empty() {
                    tracing::debug!(error = %e, "Skipping metric line");
                }
                None
            }
        })
        .collect()
}
