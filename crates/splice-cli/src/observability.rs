use std::path::PathBuf;

use once_cell::sync::OnceCell;
use tracing_subscriber::layer::SubscriberExt as _;
use tracing_subscriber::util::SubscriberInitExt as _;

static INIT: OnceCell<()> = OnceCell::new();

const DEFAULT_FILTER: &str = "warn";
const DEFAULT_LOG_FILE: &str = "think-splice.logs.jsonl";

fn parse_bool_env(value: &str) -> Option<bool> {
    match value.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" | "enabled" => Some(true),
        "0" | "false" | "no" | "off" | "disabled" => Some(false),
        _ => None,
    }
}

/// Where log records go. Stdout is reserved for generated text.
#[derive(Debug, PartialEq, Eq)]
enum LogTarget {
    Disabled,
    Stderr,
    JsonFile { dir: PathBuf, file_name: String },
}

impl LogTarget {
    fn resolve(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let enabled = lookup("SPLICE_OBSERVABILITY")
            .map(|value| parse_bool_env(&value).unwrap_or(true))
            .unwrap_or(true);
        if !enabled {
            return Self::Disabled;
        }
        let Some(raw) = lookup("SPLICE_JSON_LOG_PATH").filter(|p| !p.trim().is_empty()) else {
            return Self::Stderr;
        };
        let path = PathBuf::from(raw);
        let dir = path
            .parent()
            .filter(|p| !p.as_os_str().is_empty())
            .map(PathBuf::from)
            .unwrap_or_else(|| PathBuf::from("."));
        let file_name = path
            .file_name()
            .and_then(|n| n.to_str())
            .unwrap_or(DEFAULT_LOG_FILE)
            .to_string();
        Self::JsonFile { dir, file_name }
    }
}

/// `SPLICE_LOG_LEVEL` wins over `RUST_LOG`; unparsable directives fall through.
fn resolve_env_filter(lookup: impl Fn(&str) -> Option<String>) -> tracing_subscriber::EnvFilter {
    ["SPLICE_LOG_LEVEL", "RUST_LOG"]
        .into_iter()
        .filter_map(|key| lookup(key))
        .find_map(|directive| tracing_subscriber::EnvFilter::try_new(directive).ok())
        .unwrap_or_else(|| tracing_subscriber::EnvFilter::new(DEFAULT_FILTER))
}

/// Initialize logging once per process.
///
/// Environment variables:
/// - `SPLICE_OBSERVABILITY`: optional enable/disable flag (default enabled).
/// - `SPLICE_LOG_LEVEL`: optional level/filter override (`info`, `splice_harness=debug`, ...).
/// - `SPLICE_JSON_LOG_PATH`: optional log file path. If set, logs are JSONL in that file.
/// - `RUST_LOG`: fallback filter.
pub fn init_observability() {
    INIT.get_or_init(|| {
        let lookup = |key: &str| std::env::var(key).ok();
        match LogTarget::resolve(lookup) {
            LogTarget::Disabled => {}
            LogTarget::Stderr => {
                let console_layer = tracing_subscriber::fmt::layer()
                    .compact()
                    .with_target(false)
                    .with_writer(std::io::stderr);
                let _ = tracing_subscriber::registry()
                    .with(resolve_env_filter(lookup))
                    .with(console_layer)
                    .try_init();
            }
            LogTarget::JsonFile { dir, file_name } => {
                let _ = std::fs::create_dir_all(&dir);
                let writer = tracing_appender::rolling::never(&dir, &file_name);
                let json_layer = tracing_subscriber::fmt::layer()
                    .json()
                    .with_current_span(true)
                    .with_span_list(true)
                    .with_target(false)
                    .with_writer(writer);
                let _ = tracing_subscriber::registry()
                    .with(resolve_env_filter(lookup))
                    .with(json_layer)
                    .try_init();
            }
        }
    });
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn env(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key: &str| map.get(key).cloned()
    }

    #[test]
    fn parse_bool_env_accepts_common_spellings() {
        assert_eq!(parse_bool_env(" ON "), Some(true));
        assert_eq!(parse_bool_env("disabled"), Some(false));
        assert_eq!(parse_bool_env("maybe"), None);
    }

    #[test]
    fn observability_flag_disables_logging() {
        let lookup = env(&[
            ("SPLICE_OBSERVABILITY", "0"),
            ("SPLICE_JSON_LOG_PATH", "logs/run.jsonl"),
        ]);
        assert_eq!(LogTarget::resolve(lookup), LogTarget::Disabled);
        assert_eq!(
            LogTarget::resolve(env(&[("SPLICE_OBSERVABILITY", "off")])),
            LogTarget::Disabled
        );
    }

    #[test]
    fn unrecognized_flag_keeps_logging_on_stderr() {
        assert_eq!(LogTarget::resolve(env(&[])), LogTarget::Stderr);
        assert_eq!(
            LogTarget::resolve(env(&[("SPLICE_OBSERVABILITY", "maybe")])),
            LogTarget::Stderr
        );
        assert_eq!(
            LogTarget::resolve(env(&[("SPLICE_JSON_LOG_PATH", "  ")])),
            LogTarget::Stderr
        );
    }

    #[test]
    fn json_log_path_splits_into_dir_and_file() {
        assert_eq!(
            LogTarget::resolve(env(&[("SPLICE_JSON_LOG_PATH", "logs/run.jsonl")])),
            LogTarget::JsonFile {
                dir: PathBuf::from("logs"),
                file_name: "run.jsonl".into(),
            }
        );
        assert_eq!(
            LogTarget::resolve(env(&[("SPLICE_JSON_LOG_PATH", "run.jsonl")])),
            LogTarget::JsonFile {
                dir: PathBuf::from("."),
                file_name: "run.jsonl".into(),
            }
        );
    }

    #[test]
    fn log_level_overrides_rust_log() {
        let filter = resolve_env_filter(env(&[
            ("SPLICE_LOG_LEVEL", "debug"),
            ("RUST_LOG", "error"),
        ]));
        assert_eq!(filter.to_string(), "debug");

        let filter = resolve_env_filter(env(&[("RUST_LOG", "error")]));
        assert_eq!(filter.to_string(), "error");

        assert_eq!(resolve_env_filter(env(&[])).to_string(), DEFAULT_FILTER);
    }
}
