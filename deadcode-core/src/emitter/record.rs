//! Class filtering and metric record serialization

use std::fmt;

/// Metric name every class load is reported under
pub const METRIC_NAME: &str = "autoloaded";

/// Counter suffix appended to each record on the wire
pub const COUNTER_SUFFIX: &str = ":1|c";

/// Namespace allow-list
///
/// An empty list lets every class through. Otherwise a class is allowed when
/// any entry occurs anywhere in its name (case-sensitive substring, not prefix).
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ClassFilter {
    allowed: Vec<String>,
}

impl ClassFilter {
    pub fn new(allowed: Vec<String>) -> Self {
        Self { allowed }
    }

    pub fn is_allowed(&self, class: &str) -> bool {
        self.allowed.is_empty() || self.allowed.iter().any(|ns| class.contains(ns.as_str()))
    }

    pub fn namespaces(&self) -> &[String] {
        &self.allowed
    }
}

/// One serialized class load: `autoloaded,class=App/Service/Foo`
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct MetricRecord(String);

impl MetricRecord {
    /// Serialize a fully-qualified class name, normalizing `\` to `/`
    pub fn from_class(class: &str) -> Self {
        Self(format!("{},class={}", METRIC_NAME, class.replace('\\', "/")))
    }

    /// Byte length of the serialized record (without the counter suffix)
    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// The statsd counter line for this record, `<record>:1|c`
    pub fn counter_line(&self) -> String {
        format!("{}{}", self.0, COUNTER_SUFFIX)
    }
}

impl fmt::Display for MetricRecord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}
