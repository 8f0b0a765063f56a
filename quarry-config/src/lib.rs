//! Loader for Quarry configuration with YAML + environment overlays.
//!
//! Precedence, lowest first:
//!
//! 1. built-in defaults ([`DEFAULTS_YAML`])
//! 2. YAML files/snippets, in the order they were added
//! 3. `QUARRY__`-prefixed environment variables, `__` between path
//!    segments (`QUARRY__LLM__PROVIDER=openai`, `QUARRY__LLM__MODELS=a,b`)
//!
//! After merging, `${VAR}` placeholders in any string are expanded from the
//! process environment, recursively up to a fixed depth. A placeholder
//! whose variable is unset stays literal; secret accessors on the schema
//! treat it as missing so a run fails at first use instead of at startup.
use config::{Config, ConfigError, Environment, File, FileFormat};
use serde_json::Value;
use std::path::{Path, PathBuf};

mod schema;

pub use schema::{
    ExportSettings, LlmSettings, LoggingSettings, QuarryConfig, ResearchSettings,
    ScraperSettings, SearchSettings, provider_key_var, resolved_secret,
};

const MAXIMUM_ENV_EXPANSION_DEPTH: usize = 8;
pub const CONFIG_FILE_NAME: &str = "quarry.yaml";

pub const DEFAULTS_YAML: &str = r#"
search:
  endpoint: "https://google.serper.dev/"
  api_key: "${SERPER_API_KEY}"
  num_results: 5
  timeout_secs: 15
llm:
  provider: gemini
  models:
    - gemini-1.5-pro
    - gemini-1.5-flash
  timeout_secs: 60
scraper:
  timeout_secs: 5
research:
  max_sources: 3
  content_prefix_chars: 3000
  followup_max_words: 12
logging:
  level: info
  format: text
export:
  dir: "."
"#;

fn expand_env_in_value(v: &mut Value) {
    match v {
        Value::String(s) => {
            if s.contains('$') {
                let mut cur = std::mem::take(s);
                for _ in 0..MAXIMUM_ENV_EXPANSION_DEPTH {
                    let expanded = match shellexpand::env(&cur) {
                        Ok(cow) => cow.into_owned(),
                        Err(_) => cur.clone(),
                    };
                    if expanded == cur {
                        break;
                    }
                    cur = expanded;
                }
                *s = cur;
            }
        }
        Value::Array(arr) => arr.iter_mut().for_each(expand_env_in_value),
        Value::Object(obj) => obj.values_mut().for_each(expand_env_in_value),
        _ => {}
    }
}

/// Where to look for `quarry.yaml` when no path was given: the working
/// directory first, then the per-user config directory.
pub fn discover_config_file() -> Option<PathBuf> {
    let local = PathBuf::from(CONFIG_FILE_NAME);
    if local.is_file() {
        return Some(local);
    }
    let user = dirs::config_dir()?.join("quarry").join(CONFIG_FILE_NAME);
    user.is_file().then_some(user)
}

/// Builder hides the `config` crate wiring (defaults + YAML + env overrides).
pub struct QuarryConfigLoader {
    builder: config::ConfigBuilder<config::builder::DefaultState>,
    env_prefix: Option<&'static str>,
}

impl Default for QuarryConfigLoader {
    fn default() -> Self {
        Self::new()
    }
}

impl QuarryConfigLoader {
    /// Start with the built-in defaults and `QUARRY__` env overrides.
    ///
    /// ```
    /// use quarry_config::QuarryConfigLoader;
    ///
    /// let config = QuarryConfigLoader::new()
    ///     .without_env()
    ///     .load()
    ///     .expect("defaults are valid");
    ///
    /// assert_eq!(config.search.num_results, 5);
    /// assert_eq!(config.research.max_sources, 3);
    /// assert_eq!(config.llm.selected_model(), Some("gemini-1.5-pro"));
    /// ```
    pub fn new() -> Self {
        let builder =
            Config::builder().add_source(File::from_str(DEFAULTS_YAML, FileFormat::Yaml));
        Self {
            builder,
            env_prefix: Some("QUARRY"),
        }
    }

    /// Ignore the process environment for overrides (placeholders are still
    /// expanded).
    pub fn without_env(mut self) -> Self {
        self.env_prefix = None;
        self
    }

    /// Attach a YAML/TOML/JSON file that must exist; the `config` crate
    /// infers format by suffix.
    pub fn with_file<P: AsRef<Path>>(mut self, path: P) -> Self {
        self.builder = self
            .builder
            .add_source(File::from(path.as_ref()).required(true));
        self
    }

    /// Attach a file if it exists.
    pub fn with_optional_file<P: AsRef<Path>>(mut self, path: P) -> Self {
        self.builder = self
            .builder
            .add_source(File::from(path.as_ref()).required(false));
        self
    }

    /// Use `explicit` if given, otherwise whatever [`discover_config_file`]
    /// finds. Returns the file that will be read, if any.
    pub fn with_discovered_file(self, explicit: Option<&Path>) -> (Self, Option<PathBuf>) {
        match explicit {
            Some(path) => (self.with_file(path), Some(path.to_path_buf())),
            None => match discover_config_file() {
                Some(found) => (self.with_file(&found), Some(found)),
                None => (self, None),
            },
        }
    }

    /// Allow tests/CLI to merge inline YAML snippets.
    ///
    /// ```
    /// use quarry_common::Provider;
    /// use quarry_config::QuarryConfigLoader;
    ///
    /// let cfg = QuarryConfigLoader::new()
    ///     .without_env()
    ///     .with_yaml_str(
    ///         r#"
    /// llm:
    ///   provider: openai
    ///   models: [gpt-4o-mini, gpt-4o]
    /// research:
    ///   max_sources: 2
    /// "#,
    ///     )
    ///     .load()
    ///     .unwrap();
    ///
    /// assert_eq!(cfg.llm.provider, Provider::OpenAi);
    /// assert_eq!(cfg.llm.selected_model(), Some("gpt-4o-mini"));
    /// assert_eq!(cfg.research.max_sources, 2);
    /// assert_eq!(cfg.research.content_prefix_chars, 3000);
    /// ```
    pub fn with_yaml_str(mut self, yaml: &str) -> Self {
        self.builder = self
            .builder
            .add_source(File::from_str(yaml, FileFormat::Yaml));
        self
    }

    /// Consume the builder and deserialize the merged sources into strongly typed config.
    pub fn load(self) -> Result<QuarryConfig, ConfigError> {
        let mut builder = self.builder;
        if let Some(prefix) = self.env_prefix {
            builder = builder.add_source(
                Environment::with_prefix(prefix)
                    .separator("__")
                    .try_parsing(true)
                    .list_separator(",")
                    .with_list_parse_key("llm.models"),
            );
        }
        let cfg = builder.build()?;

        let mut v: Value = cfg.try_deserialize()?;
        expand_env_in_value(&mut v);

        let typed: QuarryConfig =
            serde_json::from_value(v).map_err(|e| ConfigError::Message(e.to_string()))?;
        validate(&typed)?;
        Ok(typed)
    }
}

fn validate(cfg: &QuarryConfig) -> Result<(), ConfigError> {
    if cfg.llm.models.is_empty() {
        return Err(ConfigError::Message("llm.models must list at least one model".into()));
    }
    if let Some(model) = &cfg.llm.default_model {
        if !cfg.llm.models.contains(model) {
            return Err(ConfigError::Message(format!(
                "llm.default_model `{model}` is not in llm.models"
            )));
        }
    }
    if cfg.research.max_sources == 0 {
        return Err(ConfigError::Message("research.max_sources must be at least 1".into()));
    }
    Ok(())
}

impl QuarryConfig {
    /// Effective configuration as YAML with secrets masked.
    pub fn redacted_yaml(&self) -> Result<String, serde_yaml::Error> {
        let mut copy = self.clone();
        copy.search.api_key = copy.search.api_key().map(|_| "<redacted>".to_string());
        copy.llm.api_key = copy.llm.api_key().map(|_| "<redacted>".to_string());
        serde_yaml::to_string(&copy)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use temp_env;

    #[test]
    fn expands_simple_string() {
        temp_env::with_var("FOO", Some("bar"), || {
            let mut v = json!("prefix-${FOO}-suffix");
            expand_env_in_value(&mut v);
            assert_eq!(v, json!("prefix-bar-suffix"));
        });
    }

    #[test]
    fn expands_in_array_and_object() {
        temp_env::with_vars([("CITY", Some("Winston")), ("STATE", Some("NC"))], || {
            let mut v = json!([
                "hello-$CITY",
                { "loc": "${CITY}-${STATE}" },
                42,
                true,
                null
            ]);
            expand_env_in_value(&mut v);
            assert_eq!(
                v,
                json!(["hello-Winston", { "loc": "Winston-NC" }, 42, true, null])
            );
        });
    }

    #[test]
    fn expands_recursively_across_env_values() {
        temp_env::with_vars(
            [
                ("BAZ", Some("qux")),
                ("BAR", Some("mid-${BAZ}")),
                ("FOO", Some("start-${BAR}-end")),
            ],
            || {
                let mut v = json!("X=${FOO}");
                expand_env_in_value(&mut v);
                assert_eq!(v, json!("X=start-mid-qux-end"));
            },
        );
    }

    #[test]
    fn stops_on_cycles() {
        temp_env::with_vars([("A", Some("${B}")), ("B", Some("${A}"))], || {
            let mut v = json!("x=${A}-y");
            expand_env_in_value(&mut v);
            let s = v.as_str().unwrap();
            assert!(s.starts_with("x=") && s.ends_with("-y"));
            assert!(s.contains("${"));
        });
    }

    #[test]
    fn unknown_vars_are_left_as_is() {
        let mut v = json!("hi-${QUARRY_TEST_DOES_NOT_EXIST}");
        expand_env_in_value(&mut v);
        assert_eq!(v, json!("hi-${QUARRY_TEST_DOES_NOT_EXIST}"));
    }

    #[test]
    fn default_model_must_be_offered() {
        let err = QuarryConfigLoader::new()
            .without_env()
            .with_yaml_str("llm:\n  default_model: gpt-9\n")
            .load()
            .unwrap_err();
        assert!(err.to_string().contains("gpt-9"));
    }

    #[test]
    fn zero_sources_is_rejected() {
        let err = QuarryConfigLoader::new()
            .without_env()
            .with_yaml_str("research:\n  max_sources: 0\n")
            .load()
            .unwrap_err();
        assert!(err.to_string().contains("max_sources"));
    }
}
