//! Settings loading with deep merge and environment variable overrides.
//!
//! Loading flow:
//! 1. Start with compiled [`TetherSettings::default()`]
//! 2. If the settings file exists, deep-merge its values over defaults
//! 3. Apply `TETHER_*` environment overrides (highest priority)
//! 4. [`TetherSettings::validate`]

use std::path::{Path, PathBuf};

use serde_json::Value;
use tracing::debug;

use crate::errors::{Result, SettingsError};
use crate::types::TetherSettings;

/// Data directory (`~/.tether`).
pub fn data_dir() -> PathBuf {
    let home = std::env::var("HOME").unwrap_or_else(|_| "/tmp".to_string());
    PathBuf::from(home).join(".tether")
}

/// Default settings file path (`~/.tether/settings.json`).
pub fn settings_path() -> PathBuf {
    data_dir().join("settings.json")
}

/// Load settings from the default path.
pub fn load_settings() -> Result<TetherSettings> {
    load_settings_from_path(&settings_path())
}

/// Load settings from a specific path with env var overrides.
///
/// A missing file yields defaults. Invalid JSON is an error.
pub fn load_settings_from_path(path: &Path) -> Result<TetherSettings> {
    let defaults = serde_json::to_value(TetherSettings::default())?;

    let merged = if path.exists() {
        debug!(?path, "loading settings from file");
        let content = std::fs::read_to_string(path).map_err(|source| SettingsError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        let user: Value = serde_json::from_str(&content)?;
        deep_merge(defaults, user)
    } else {
        debug!(?path, "settings file not found, using defaults");
        defaults
    };

    let mut settings: TetherSettings = serde_json::from_value(merged)?;
    apply_env_overrides(&mut settings);
    settings.validate()?;
    Ok(settings)
}

/// Recursive deep merge of two JSON values.
///
/// Objects merge per key; arrays and primitives in `source` replace
/// `target`; nulls in `source` are skipped.
pub fn deep_merge(target: Value, source: Value) -> Value {
    match (target, source) {
        (Value::Object(mut target_map), Value::Object(source_map)) => {
            for (key, source_val) in source_map {
                if source_val.is_null() {
                    continue;
                }
                let merged = if let Some(target_val) = target_map.remove(&key) {
                    deep_merge(target_val, source_val)
                } else {
                    source_val
                };
                let _ = target_map.insert(key, merged);
            }
            Value::Object(target_map)
        }
        (_, source) => source,
    }
}

/// Apply overrides from the process environment.
pub fn apply_env_overrides(settings: &mut TetherSettings) {
    apply_overrides_from(settings, |name| std::env::var(name).ok());
}

/// Apply overrides from an arbitrary variable source.
///
/// Invalid values are logged and ignored.
pub fn apply_overrides_from<F>(settings: &mut TetherSettings, lookup: F)
where
    F: Fn(&str) -> Option<String>,
{
    let env = EnvReader { lookup };

    // ── Server ──────────────────────────────────────────────────────
    if let Some(v) = env.string("TETHER_HOST") {
        settings.server.host = v;
    }
    if let Some(v) = env.u64_in("TETHER_PORT", 1, 65_535) {
        settings.server.port = u16::try_from(v).unwrap_or(settings.server.port);
    }
    if let Some(v) = env.string("TETHER_DB_PATH") {
        settings.server.db_path = v;
    }

    // ── Logging ─────────────────────────────────────────────────────
    if let Some(v) = env.string("TETHER_LOG_LEVEL") {
        settings.logging.level = v;
    }
    if let Some(v) = env.bool("TETHER_LOG_JSON") {
        settings.logging.json = v;
    }

    // ── Stream ──────────────────────────────────────────────────────
    if let Some(v) = env.u64_in("TETHER_STREAM_POLL_MS", 10, 60_000) {
        settings.stream.poll_interval_ms = v;
    }
    if let Some(v) = env.u64_in("TETHER_STREAM_MAX_TAIL_MS", 1_000, 86_400_000) {
        settings.stream.max_tail_duration_ms = v;
    }

    // ── Copilot ─────────────────────────────────────────────────────
    if let Some(v) = env.string("TETHER_MODEL_ENDPOINT") {
        settings.copilot.model_endpoint = Some(v);
    }
    if let Some(v) = env.u64_in("TETHER_DECISION_WAIT_MS", 1_000, 3_600_000) {
        settings.copilot.decision_wait_ms = v;
    }
    if let Some(v) = env.u64_in("TETHER_DECISION_TTL_MS", 1_000, 86_400_000) {
        settings.copilot.decision_ttl_ms = v;
    }
    if let Some(v) = env.u64_in("TETHER_MAX_STEPS", 1, 1_000) {
        settings.copilot.max_steps = u32::try_from(v).unwrap_or(settings.copilot.max_steps);
    }
    if let Some(v) = env.u64_in("TETHER_MAX_SESSIONS", 1, 10_000) {
        settings.copilot.max_concurrent_sessions =
            usize::try_from(v).unwrap_or(settings.copilot.max_concurrent_sessions);
    }
}

// ── Pure parsing functions ──────────────────────────────────────────────────

/// Parse a string as a boolean.
///
/// Accepts (case-insensitive): `true`/`1`/`yes`/`on` or `false`/`0`/`no`/`off`.
pub fn parse_bool(val: &str) -> Option<bool> {
    match val.to_lowercase().as_str() {
        "true" | "1" | "yes" | "on" => Some(true),
        "false" | "0" | "no" | "off" => Some(false),
        _ => None,
    }
}

/// Parse a string as a `u64` within an inclusive range.
pub fn parse_u64_range(val: &str, min: u64, max: u64) -> Option<u64> {
    let n: u64 = val.parse().ok()?;
    (n >= min && n <= max).then_some(n)
}

struct EnvReader<F> {
    lookup: F,
}

impl<F> EnvReader<F>
where
    F: Fn(&str) -> Option<String>,
{
    fn string(&self, name: &str) -> Option<String> {
        (self.lookup)(name).filter(|v| !v.is_empty())
    }

    fn bool(&self, name: &str) -> Option<bool> {
        let val = (self.lookup)(name)?;
        let result = parse_bool(&val);
        if result.is_none() {
            tracing::warn!(key = name, value = %val, "invalid boolean env var, ignoring");
        }
        result
    }

    fn u64_in(&self, name: &str, min: u64, max: u64) -> Option<u64> {
        let val = (self.lookup)(name)?;
        let result = parse_u64_range(&val, min, max);
        if result.is_none() {
            tracing::warn!(key = name, value = %val, min, max, "invalid integer env var, ignoring");
        }
        result
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;
    use tether_core::logging::capture_logs;

    fn vars(pairs: &[(&str, &str)]) -> HashMap<String, String> {
        pairs
            .iter()
            .map(|(k, v)| ((*k).to_string(), (*v).to_string()))
            .collect()
    }

    // ── deep_merge ──────────────────────────────────────────────────

    #[test]
    fn merge_nested_override() {
        let target = serde_json::json!({"server": {"port": 8080, "host": "localhost"}});
        let source = serde_json::json!({"server": {"port": 9090}});
        let merged = deep_merge(target, source);
        assert_eq!(merged["server"]["port"], 9090);
        assert_eq!(merged["server"]["host"], "localhost");
    }

    #[test]
    fn merge_array_replace() {
        let target = serde_json::json!({"items": [1, 2, 3]});
        let source = serde_json::json!({"items": [4]});
        assert_eq!(deep_merge(target, source)["items"], serde_json::json!([4]));
    }

    #[test]
    fn merge_null_preserves_target() {
        let target = serde_json::json!({"a": 1});
        let source = serde_json::json!({"a": null});
        assert_eq!(deep_merge(target, source)["a"], 1);
    }

    // ── load_settings_from_path ─────────────────────────────────────

    #[test]
    fn load_missing_file_returns_defaults() {
        let settings = load_settings_from_path(Path::new("/nonexistent/settings.json")).unwrap();
        assert_eq!(settings.server.port, 3100);
    }

    #[test]
    fn load_partial_json_overrides() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("settings.json");
        std::fs::write(
            &path,
            r#"{"copilot": {"maxSteps": 5}, "workflow": {"knownBlockTypes": ["agent"]}}"#,
        )
        .unwrap();

        let settings = load_settings_from_path(&path).unwrap();
        assert_eq!(settings.copilot.max_steps, 5);
        assert_eq!(settings.copilot.decision_wait_ms, 120_000);
        assert_eq!(settings.workflow.known_block_types, vec!["agent".to_string()]);
    }

    #[test]
    fn load_invalid_json_returns_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("settings.json");
        std::fs::write(&path, "not valid json").unwrap();
        assert!(matches!(
            load_settings_from_path(&path).unwrap_err(),
            SettingsError::Json(_)
        ));
    }

    #[test]
    fn unreadable_path_is_a_read_error() {
        let dir = tempfile::tempdir().unwrap();
        assert!(matches!(
            load_settings_from_path(dir.path()).unwrap_err(),
            SettingsError::Read { .. }
        ));
    }

    #[test]
    fn load_inconsistent_file_fails_validation() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("settings.json");
        std::fs::write(
            &path,
            r#"{"copilot": {"decisionWaitMs": 10000, "decisionTtlMs": 5000}}"#,
        )
        .unwrap();
        assert!(matches!(
            load_settings_from_path(&path).unwrap_err(),
            SettingsError::Invalid { .. }
        ));
    }

    // ── env overrides ───────────────────────────────────────────────

    #[test]
    fn overrides_apply() {
        let env = vars(&[
            ("TETHER_PORT", "4000"),
            ("TETHER_LOG_JSON", "yes"),
            ("TETHER_MODEL_ENDPOINT", "http://model.local/step"),
            ("TETHER_MAX_STEPS", "7"),
        ]);
        let mut s = TetherSettings::default();
        apply_overrides_from(&mut s, |k| env.get(k).cloned());
        assert_eq!(s.server.port, 4000);
        assert!(s.logging.json);
        assert_eq!(s.copilot.model_endpoint.as_deref(), Some("http://model.local/step"));
        assert_eq!(s.copilot.max_steps, 7);
    }

    #[test]
    fn invalid_override_is_ignored_with_warning() {
        let (logs, _guard) = capture_logs();
        let env = vars(&[("TETHER_PORT", "99999"), ("TETHER_LOG_JSON", "maybe")]);
        let mut s = TetherSettings::default();
        apply_overrides_from(&mut s, |k| env.get(k).cloned());
        assert_eq!(s.server.port, 3100);
        assert!(!s.logging.json);
        assert_eq!(logs.count_at_level(tracing::Level::WARN), 2);
    }

    #[test]
    fn empty_string_override_is_ignored() {
        let env = vars(&[("TETHER_HOST", "")]);
        let mut s = TetherSettings::default();
        apply_overrides_from(&mut s, |k| env.get(k).cloned());
        assert_eq!(s.server.host, "127.0.0.1");
    }

    // ── parsing ─────────────────────────────────────────────────────

    #[test]
    fn parse_bool_variants() {
        assert_eq!(parse_bool("ON"), Some(true));
        assert_eq!(parse_bool("0"), Some(false));
        assert_eq!(parse_bool("maybe"), None);
    }

    #[test]
    fn parse_range_bounds() {
        assert_eq!(parse_u64_range("10", 10, 20), Some(10));
        assert_eq!(parse_u64_range("21", 10, 20), None);
        assert_eq!(parse_u64_range("-1", 0, 20), None);
    }
}
