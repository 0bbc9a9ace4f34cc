use std::collections::BTreeMap;

use serde::{Deserialize, Deserializer, Serialize};

use crate::types::string_or_number;

/// Backend a set of log statistics comes from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum LogSource {
    /// Authentication/security backend, `GET /logs/stats`.
    Security,
    /// Rate-limit backend, `GET /rate/logs/stats`.
    RateLimit,
}

impl LogSource {
    pub(crate) fn stats_path(self) -> &'static str {
        match self {
            Self::Security => "/logs/stats",
            Self::RateLimit => "/rate/logs/stats",
        }
    }

    #[must_use]
    pub fn label(self) -> &'static str {
        match self {
            Self::Security => "security",
            Self::RateLimit => "rate-limit",
        }
    }
}

/// One aggregated row from a `/logs/stats` endpoint.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[non_exhaustive]
pub struct LogStatRecord {
    pub status_code: u16,
    #[serde(deserialize_with = "count_from_string_or_number")]
    pub count: u64,
    #[serde(default)]
    pub date: Option<String>,
    #[serde(default)]
    pub method: Option<String>,
    #[serde(default)]
    pub route: Option<String>,
    /// Rate-limit backend spelling of `route`.
    #[serde(default)]
    pub path: Option<String>,
}

impl LogStatRecord {
    #[must_use]
    pub fn new(status_code: u16, count: u64) -> Self {
        Self {
            status_code,
            count,
            date: None,
            method: None,
            route: None,
            path: None,
        }
    }

    #[must_use]
    pub fn with_method(mut self, method: impl Into<String>) -> Self {
        self.method = Some(method.into());
        self
    }

    #[must_use]
    pub fn with_route(mut self, route: impl Into<String>) -> Self {
        self.route = Some(route.into());
        self
    }

    #[must_use]
    pub fn with_path(mut self, path: impl Into<String>) -> Self {
        self.path = Some(path.into());
        self
    }

    /// Chart bucket for the record's route: its first path segment, or the
    /// whole route when that segment is empty.
    #[must_use]
    pub fn route_name(&self) -> Option<&str> {
        let route = self
            .route
            .as_deref()
            .filter(|r| !r.is_empty())
            .or_else(|| self.path.as_deref().filter(|p| !p.is_empty()))?;
        match route.split('/').nth(1) {
            Some(segment) if !segment.is_empty() => Some(segment),
            _ => Some(route),
        }
    }

    #[must_use]
    pub fn is_error(&self) -> bool {
        self.status_code >= 400
    }
}

fn count_from_string_or_number<'de, D>(deserializer: D) -> Result<u64, D::Error>
where
    D: Deserializer<'de>,
{
    let raw = string_or_number(deserializer)?;
    raw.trim()
        .parse::<u64>()
        .map_err(|_| serde::de::Error::custom(format!("invalid count: {raw:?}")))
}

/// Log statistics grouped for charting.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct LogStats {
    pub by_status_code: BTreeMap<u16, u64>,
    pub by_method: BTreeMap<String, u64>,
    pub by_route: BTreeMap<String, u64>,
    /// Requests with status below 400.
    pub success_count: u64,
    /// Requests with status 400 and above.
    pub error_count: u64,
}

impl LogStats {
    #[must_use]
    pub fn total(&self) -> u64 {
        self.success_count.saturating_add(self.error_count)
    }
}

/// Groups flat stat rows into per-status, per-method and per-route counts.
///
/// Rows sharing a status code (one per date) are summed rather than letting
/// the last row replace earlier ones, so `by_status_code` always agrees with
/// `success_count` and `error_count`. Sums saturate at `u64::MAX`.
#[must_use]
pub fn group_log_stats(records: &[LogStatRecord]) -> LogStats {
    fn add(slot: &mut u64, count: u64) {
        *slot = slot.saturating_add(count);
    }

    let mut stats = LogStats::default();
    for record in records {
        add(stats.by_status_code.entry(record.status_code).or_default(), record.count);

        if let Some(method) = record.method.as_deref().filter(|m| !m.is_empty()) {
            add(stats.by_method.entry(method.to_owned()).or_default(), record.count);
        }
        if let Some(route) = record.route_name() {
            add(stats.by_route.entry(route.to_owned()).or_default(), record.count);
        }

        if record.is_error() {
            add(&mut stats.error_count, record.count);
        } else {
            add(&mut stats.success_count, record.count);
        }
    }
    stats
}

/// Raw record from `GET /logs/all`.
///
/// Common fields are typed; anything else the backend sends is kept in `extra`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[non_exhaustive]
pub struct LogRecord {
    #[serde(default)]
    pub id: Option<i64>,
    #[serde(default)]
    pub method: Option<String>,
    #[serde(default)]
    pub path: Option<String>,
    #[serde(default)]
    pub status_code: Option<u16>,
    #[serde(default)]
    pub timestamp: Option<String>,
    #[serde(flatten)]
    pub extra: serde_json::Map<String, serde_json::Value>,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(json: &str) -> Vec<LogStatRecord> {
        serde_json::from_str(json).unwrap()
    }

    #[test]
    fn groups_success_and_error_counts() {
        let records = parse(r#"[{"status_code":200,"count":"5"},{"status_code":500,"count":"2"}]"#);
        let stats = group_log_stats(&records);

        assert_eq!(stats.success_count, 5);
        assert_eq!(stats.error_count, 2);
        assert_eq!(stats.by_status_code, BTreeMap::from([(200, 5), (500, 2)]));
        assert!(stats.by_method.is_empty());
        assert!(stats.by_route.is_empty());
        assert_eq!(stats.total(), 7);
    }

    #[test]
    fn status_400_counts_as_error() {
        let stats = group_log_stats(&[LogStatRecord::new(399, 1), LogStatRecord::new(400, 3)]);
        assert_eq!(stats.success_count, 1);
        assert_eq!(stats.error_count, 3);
    }

    #[test]
    fn sums_rows_sharing_a_status_code() {
        let records = parse(
            r#"[{"status_code":200,"count":"5","date":"2024-11-01"},
                {"status_code":200,"count":4,"date":"2024-11-02"}]"#,
        );
        let stats = group_log_stats(&records);
        assert_eq!(stats.by_status_code, BTreeMap::from([(200, 9)]));
    }

    #[test]
    fn groups_by_method_and_route() {
        let records = vec![
            LogStatRecord::new(200, 3).with_method("GET").with_route("/logs/stats"),
            LogStatRecord::new(201, 2).with_method("POST").with_route("/login"),
            LogStatRecord::new(429, 4).with_method("GET").with_path("/logs/all"),
        ];
        let stats = group_log_stats(&records);

        assert_eq!(
            stats.by_method,
            BTreeMap::from([("GET".to_owned(), 7), ("POST".to_owned(), 2)])
        );
        assert_eq!(
            stats.by_route,
            BTreeMap::from([("logs".to_owned(), 7), ("login".to_owned(), 2)])
        );
    }

    #[test]
    fn oversized_counts_saturate() {
        let records = parse(
            r#"[{"status_code":200,"count":"18446744073709551615","method":"GET","route":"/login"},
                {"status_code":200,"count":"1","method":"GET","route":"/login"},
                {"status_code":500,"count":"3"}]"#,
        );
        let stats = group_log_stats(&records);

        assert_eq!(stats.by_status_code[&200], u64::MAX);
        assert_eq!(stats.by_method["GET"], u64::MAX);
        assert_eq!(stats.by_route["login"], u64::MAX);
        assert_eq!(stats.success_count, u64::MAX);
        assert_eq!(stats.error_count, 3);
        assert_eq!(stats.total(), u64::MAX);
    }

    #[test]
    fn route_name_fallbacks() {
        assert_eq!(LogStatRecord::new(200, 1).with_route("login").route_name(), Some("login"));
        assert_eq!(LogStatRecord::new(200, 1).with_route("/").route_name(), Some("/"));
        assert_eq!(LogStatRecord::new(200, 1).with_route("/a/b").route_name(), Some("a"));
        assert_eq!(
            LogStatRecord::new(200, 1).with_route("").with_path("/rate").route_name(),
            Some("rate")
        );
        assert_eq!(LogStatRecord::new(200, 1).route_name(), None);
    }

    #[test]
    fn rejects_non_numeric_count() {
        let result = serde_json::from_str::<Vec<LogStatRecord>>(r#"[{"status_code":200,"count":"many"}]"#);
        assert!(result.is_err());
    }

    #[test]
    fn empty_input_yields_empty_stats() {
        assert_eq!(group_log_stats(&[]), LogStats::default());
    }

    #[test]
    fn log_record_keeps_unknown_fields() {
        let record: LogRecord = serde_json::from_str(
            r#"{"id":1,"method":"POST","path":"/login","status_code":401,"response_time":"12ms"}"#,
        )
        .unwrap();
        assert_eq!(record.status_code, Some(401));
        assert_eq!(record.extra.get("response_time"), Some(&serde_json::json!("12ms")));
    }
}
