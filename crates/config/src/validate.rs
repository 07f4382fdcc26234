//! Configuration validation.
//!
//! [`validate`] checks a parsed config for settings that load fine but will
//! not behave as intended. [`validate_toml_str`] additionally reports syntax
//! errors and unknown (usually misspelled) keys in raw TOML.

use std::{
    collections::HashMap,
    fmt,
    path::{Path, PathBuf},
};

use crate::{
    gating::{DmPolicy, GroupPolicy},
    loader::find_config_file,
    schema::TeamwireConfig,
};

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum Severity {
    Error,
    Warning,
    Info,
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Error => write!(f, "error"),
            Self::Warning => write!(f, "warning"),
            Self::Info => write!(f, "info"),
        }
    }
}

/// A single validation diagnostic.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Diagnostic {
    pub severity: Severity,
    /// "syntax", "unknown-field", "type-error", "credentials", "server" or
    /// "access"
    pub category: &'static str,
    /// Dotted path, e.g. "bot.app_id"
    pub path: String,
    pub message: String,
}

impl Diagnostic {
    fn new(
        severity: Severity,
        category: &'static str,
        path: impl Into<String>,
        message: impl Into<String>,
    ) -> Self {
        Self {
            severity,
            category,
            path: path.into(),
            message: message.into(),
        }
    }
}

impl fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.path.is_empty() {
            write!(f, "{} [{}] {}", self.severity, self.category, self.message)
        } else {
            write!(
                f,
                "{} [{}] {}: {}",
                self.severity, self.category, self.path, self.message
            )
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct ValidationResult {
    pub diagnostics: Vec<Diagnostic>,
    pub config_path: Option<PathBuf>,
}

impl ValidationResult {
    #[must_use]
    pub fn has_errors(&self) -> bool {
        self.diagnostics
            .iter()
            .any(|d| d.severity == Severity::Error)
    }

    #[must_use]
    pub fn count(&self, severity: Severity) -> usize {
        self.diagnostics
            .iter()
            .filter(|d| d.severity == severity)
            .count()
    }
}

/// Semantic checks on a loaded config.
#[must_use]
pub fn validate(config: &TeamwireConfig) -> ValidationResult {
    let mut diagnostics = Vec::new();
    check_semantics(config, &mut diagnostics);
    ValidationResult {
        diagnostics,
        config_path: None,
    }
}

fn check_semantics(config: &TeamwireConfig, diagnostics: &mut Vec<Diagnostic>) {
    let bot = &config.bot;
    if bot.app_password.is_some() && bot.app_id.as_deref().is_none_or(str::is_empty) {
        diagnostics.push(Diagnostic::new(
            Severity::Error,
            "credentials",
            "bot.app_id",
            "app_password is set but app_id is missing",
        ));
    }

    let server = &config.server;
    if !server.messages_path.starts_with('/') {
        diagnostics.push(Diagnostic::new(
            Severity::Warning,
            "server",
            "server.messages_path",
            format!("\"{}\" does not start with '/'", server.messages_path),
        ));
    }
    if server.port == 0 {
        diagnostics.push(Diagnostic::new(
            Severity::Warning,
            "server",
            "server.port",
            "port 0 binds a random port the channel cannot be pointed at",
        ));
    }

    if bot.dm_policy == DmPolicy::Allowlist && bot.allowlist.is_empty() {
        diagnostics.push(Diagnostic::new(
            Severity::Warning,
            "access",
            "bot.allowlist",
            "dm_policy is \"allowlist\" but the allowlist is empty; every sender is admitted",
        ));
    }
    if bot.group_policy == GroupPolicy::Allowlist && bot.group_allowlist.is_empty() {
        diagnostics.push(Diagnostic::new(
            Severity::Warning,
            "access",
            "bot.group_allowlist",
            "group_policy is \"allowlist\" but group_allowlist is empty; every group is admitted",
        ));
    }
}

/// Validate the config file at `path`, or the one discovery would load.
#[must_use]
pub fn validate_file(path: Option<&Path>) -> ValidationResult {
    let Some(path) = path.map(Path::to_path_buf).or_else(find_config_file) else {
        return ValidationResult {
            diagnostics: vec![Diagnostic::new(
                Severity::Info,
                "syntax",
                "",
                "no config file found; using defaults",
            )],
            config_path: None,
        };
    };

    let mut result = match std::fs::read_to_string(&path) {
        Ok(content) if path.extension().is_some_and(|e| e == "toml") => {
            validate_toml_str(&crate::env_subst::substitute_env(&content))
        },
        Ok(_) => match crate::loader::load_config(&path) {
            Ok(config) => validate(&config),
            Err(e) => ValidationResult {
                diagnostics: vec![Diagnostic::new(
                    Severity::Error,
                    "type-error",
                    "",
                    e.to_string(),
                )],
                config_path: None,
            },
        },
        Err(e) => ValidationResult {
            diagnostics: vec![Diagnostic::new(
                Severity::Error,
                "syntax",
                "",
                format!("failed to read config file: {e}"),
            )],
            config_path: None,
        },
    };
    result.config_path = Some(path);
    result
}

/// Validate TOML text: syntax, unknown keys, types, then semantics.
#[must_use]
pub fn validate_toml_str(toml_str: &str) -> ValidationResult {
    let mut diagnostics = Vec::new();

    let value: toml::Value = match toml::from_str(toml_str) {
        Ok(v) => v,
        Err(e) => {
            diagnostics.push(Diagnostic::new(
                Severity::Error,
                "syntax",
                "",
                format!("TOML syntax error: {e}"),
            ));
            return ValidationResult {
                diagnostics,
                config_path: None,
            };
        },
    };

    check_unknown_fields(&value, &schema(), "", &mut diagnostics);

    match value.try_into::<TeamwireConfig>() {
        Ok(config) => check_semantics(&config, &mut diagnostics),
        Err(e) => diagnostics.push(Diagnostic::new(
            Severity::Error,
            "type-error",
            "",
            format!("type error: {e}"),
        )),
    }

    ValidationResult {
        diagnostics,
        config_path: None,
    }
}

// ── Unknown-key detection ──────────────────────────────────────────────────

enum KnownKeys {
    Struct(HashMap<&'static str, KnownKeys>),
    Leaf,
}

fn fields(names: &[&'static str]) -> KnownKeys {
    KnownKeys::Struct(names.iter().map(|n| (*n, KnownKeys::Leaf)).collect())
}

fn schema() -> KnownKeys {
    KnownKeys::Struct(HashMap::from([
        ("server", fields(&["bind", "port", "messages_path"])),
        (
            "bot",
            fields(&[
                "app_id",
                "app_password",
                "tenant_id",
                "oauth_connection_name",
                "dm_policy",
                "group_policy",
                "mention_mode",
                "allowlist",
                "group_allowlist",
            ]),
        ),
    ]))
}

fn check_unknown_fields(
    value: &toml::Value,
    schema: &KnownKeys,
    prefix: &str,
    diagnostics: &mut Vec<Diagnostic>,
) {
    let (toml::Value::Table(table), KnownKeys::Struct(known)) = (value, schema) else {
        return;
    };
    let candidates: Vec<&str> = known.keys().copied().collect();
    for (key, child) in table {
        let path = if prefix.is_empty() {
            key.clone()
        } else {
            format!("{prefix}.{key}")
        };
        match known.get(key.as_str()) {
            Some(child_schema) => check_unknown_fields(child, child_schema, &path, diagnostics),
            None => {
                let message = match suggest(key, &candidates, 3) {
                    Some(s) => format!("unknown field (did you mean \"{s}\"?)"),
                    None => "unknown field".to_string(),
                };
                diagnostics.push(Diagnostic::new(
                    Severity::Error,
                    "unknown-field",
                    path,
                    message,
                ));
            },
        }
    }
}

fn levenshtein(a: &str, b: &str) -> usize {
    let b: Vec<char> = b.chars().collect();
    let mut row: Vec<usize> = (0..=b.len()).collect();
    for (i, ca) in a.chars().enumerate() {
        let mut diagonal = row[0];
        row[0] = i + 1;
        for (j, cb) in b.iter().enumerate() {
            let above = row[j + 1];
            let substitute = diagonal + usize::from(ca != *cb);
            row[j + 1] = substitute.min(above + 1).min(row[j] + 1);
            diagonal = above;
        }
    }
    row[b.len()]
}

/// Closest candidate within `max_distance` edits, if any.
fn suggest<'a>(needle: &str, candidates: &[&'a str], max_distance: usize) -> Option<&'a str> {
    candidates
        .iter()
        .map(|c| (*c, levenshtein(needle, c)))
        .filter(|(_, d)| (1..=max_distance).contains(d))
        .min_by_key(|(c, d)| (*d, *c))
        .map(|(c, _)| c)
}

#[allow(clippy::unwrap_used, clippy::expect_used)]
#[cfg(test)]
mod tests {
    use {super::*, rstest::rstest, std::io::Write};

    fn categories(result: &ValidationResult) -> Vec<(&'static str, &str)> {
        result
            .diagnostics
            .iter()
            .map(|d| (d.category, d.path.as_str()))
            .collect()
    }

    #[rstest]
    #[case("kitten", "sitting", 3)]
    #[case("port", "prt", 1)]
    #[case("", "abc", 3)]
    #[case("same", "same", 0)]
    fn edit_distance(#[case] a: &str, #[case] b: &str, #[case] expected: usize) {
        assert_eq!(levenshtein(a, b), expected);
    }

    #[test]
    fn default_config_only_warns_about_open_allowlist() {
        let result = validate(&TeamwireConfig::default());
        assert!(!result.has_errors());
        assert_eq!(categories(&result), vec![("access", "bot.allowlist")]);
    }

    #[test]
    fn password_without_app_id_is_an_error() {
        let result = validate_toml_str(
            "[bot]\napp_password = \"secret\"\nallowlist = [\"29:alice\"]\n",
        );
        assert!(result.has_errors());
        assert_eq!(categories(&result), vec![("credentials", "bot.app_id")]);
    }

    #[test]
    fn server_warnings() {
        let result = validate_toml_str(
            "[server]\nport = 0\nmessages_path = \"api/messages\"\n[bot]\nallowlist = [\"x\"]\n",
        );
        assert!(!result.has_errors());
        assert_eq!(result.count(Severity::Warning), 2);
    }

    #[test]
    fn empty_group_allowlist_warns() {
        let result = validate_toml_str(
            "[bot]\ndm_policy = \"open\"\ngroup_policy = \"allowlist\"\n",
        );
        assert_eq!(categories(&result), vec![("access", "bot.group_allowlist")]);
    }

    #[test]
    fn misspelled_key_gets_a_suggestion() {
        let result = validate_toml_str("[server]\nprot = 3978\n[bot]\nallowlist = [\"x\"]\n");
        let diagnostic = &result.diagnostics[0];
        assert_eq!(diagnostic.category, "unknown-field");
        assert_eq!(diagnostic.path, "server.prot");
        assert!(diagnostic.message.contains("\"port\""), "{}", diagnostic.message);
    }

    #[test]
    fn syntax_and_type_errors() {
        let syntax = validate_toml_str("[server\nport = 1");
        assert_eq!(syntax.diagnostics[0].category, "syntax");

        let typed = validate_toml_str("[server]\nport = \"high\"\n");
        assert!(
            typed
                .diagnostics
                .iter()
                .any(|d| d.category == "type-error")
        );
    }

    #[test]
    fn validates_a_file_on_disk() {
        let mut file = tempfile::Builder::new().suffix(".toml").tempfile().unwrap();
        file.write_all(b"[bot]\napp_id = \"app\"\nallowlist = [\"29:a\"]\n")
            .unwrap();
        let result = validate_file(Some(file.path()));
        assert!(result.diagnostics.is_empty(), "{:?}", result.diagnostics);
        assert_eq!(result.config_path.as_deref(), Some(file.path()));
    }
}
