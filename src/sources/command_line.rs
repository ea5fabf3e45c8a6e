//! Command-line argument configuration source.

use super::{BuildContext, ConfigurationProvider, ConfigurationSource, ProviderData};
use crate::core::path;
use crate::error::{ConfigError, Result};
use crate::notify::ReloadToken;
use std::sync::Arc;

/// Configuration source over command-line arguments.
///
/// Recognized forms:
/// - `--key=value`, `/key=value` and `key=value`
/// - `--key value` and `/key value`
/// - `-k value` and `-k=value` when `-k` has a switch mapping
///
/// Anything else is skipped. Switch mappings translate a switch (`-p`,
/// `--port`) into a configuration key (`Server:Port`).
///
/// # Examples
///
/// ```rust
/// use layered_config::sources::CommandLineSource;
///
/// let source = CommandLineSource::new(["--Server:Port=8080", "-v", "debug"])
///     .with_switch_mappings([("-v", "Logging:Level")]);
/// ```
#[derive(Debug, Clone, Default)]
pub struct CommandLineSource {
    args: Vec<String>,
    switch_mappings: Vec<(String, String)>,
}

impl CommandLineSource {
    /// Create a source over `args` (without the program name).
    pub fn new<I, S>(args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            args: args.into_iter().map(Into::into).collect(),
            switch_mappings: Vec::new(),
        }
    }

    /// Create a source over the process arguments.
    pub fn from_env() -> Self {
        Self::new(std::env::args().skip(1))
    }

    /// Map switches onto configuration keys.
    pub fn with_switch_mappings<I, K, V>(mut self, mappings: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        self.switch_mappings
            .extend(mappings.into_iter().map(|(k, v)| (k.into(), v.into())));
        self
    }

    /// The raw arguments.
    pub fn args(&self) -> &[String] {
        &self.args
    }

    fn validated_mappings(&self) -> Result<Vec<(String, String)>> {
        let mut validated: Vec<(String, String)> = Vec::with_capacity(self.switch_mappings.len());
        for (switch, key) in &self.switch_mappings {
            if !switch.starts_with('-') {
                return Err(ConfigError::ParseError(format!(
                    "The switch mapping '{}' is invalid. A switch must start with '--' or '-'.",
                    switch
                )));
            }
            if validated.iter().any(|(seen, _)| path::keys_equal(seen, switch)) {
                return Err(ConfigError::ParseError(format!(
                    "Keys in switch mappings are case-insensitive. A duplicated key '{}' was found.",
                    switch
                )));
            }
            validated.push((switch.clone(), key.clone()));
        }
        Ok(validated)
    }
}

impl ConfigurationSource for CommandLineSource {
    fn build(&self, _context: &BuildContext<'_>) -> Result<Arc<dyn ConfigurationProvider>> {
        let switch_mappings = self.validated_mappings()?;
        Ok(Arc::new(CommandLineProvider {
            args: self.args.clone(),
            switch_mappings,
            data: ProviderData::new(),
        }))
    }

    fn name(&self) -> String {
        format!("command-line:{} args", self.args.len())
    }
}

/// Provider parsing command-line arguments on every load.
pub struct CommandLineProvider {
    args: Vec<String>,
    switch_mappings: Vec<(String, String)>,
    data: ProviderData,
}

impl CommandLineProvider {
    fn mapped(&self, switch: &str) -> Option<&str> {
        self.switch_mappings
            .iter()
            .find(|(candidate, _)| path::keys_equal(candidate, switch))
            .map(|(_, key)| key.as_str())
    }

    fn parse(&self) -> Result<Vec<(String, String)>> {
        let mut entries = Vec::new();
        let mut args = self.args.iter();

        while let Some(raw) = args.next() {
            // '/key' is an alias for '--key'
            let arg = match raw.strip_prefix('/') {
                Some(rest) => format!("--{}", rest),
                None => raw.clone(),
            };
            let key_start = if arg.starts_with("--") {
                2
            } else if arg.starts_with('-') {
                1
            } else {
                0
            };

            let (key, value) = match arg.find('=') {
                None => {
                    if key_start == 0 {
                        continue;
                    }
                    let key = match self.mapped(&arg) {
                        Some(key) => key.to_string(),
                        None if key_start == 1 => continue,
                        None => arg[key_start..].to_string(),
                    };
                    match args.next() {
                        Some(value) => (key, value.clone()),
                        None => continue,
                    }
                }
                Some(separator) => {
                    let key = match self.mapped(&arg[..separator]) {
                        Some(key) => key.to_string(),
                        None if key_start == 1 => {
                            return Err(ConfigError::ParseError(format!(
                                "The short switch '{}' is not defined in the switch mappings.",
                                raw
                            )));
                        }
                        None => arg[key_start..separator].to_string(),
                    };
                    (key, arg[separator + 1..].to_string())
                }
            };

            entries.push((key, value));
        }

        Ok(entries)
    }
}

impl ConfigurationProvider for CommandLineProvider {
    fn load(&self) -> Result<()> {
        let entries = self.parse()?;
        self.data.replace(entries);
        Ok(())
    }

    fn try_get(&self, key: &str) -> Option<String> {
        self.data.try_get(key)
    }

    fn set(&self, key: &str, value: &str) -> Result<()> {
        self.data.set(key, value);
        Ok(())
    }

    fn child_keys(&self, earlier_keys: Vec<String>, parent_path: Option<&str>) -> Vec<String> {
        self.data.child_keys(earlier_keys, parent_path)
    }

    fn reload_token(&self) -> Option<ReloadToken> {
        Some(self.data.reload_token())
    }

    fn name(&self) -> String {
        "command-line".to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::BTreeMap;

    fn load(source: CommandLineSource) -> Result<Arc<dyn ConfigurationProvider>> {
        let properties = BTreeMap::new();
        let provider = source.build(&BuildContext::new(&properties))?;
        provider.load()?;
        Ok(provider)
    }

    #[test]
    fn test_supported_forms() {
        let provider = load(CommandLineSource::new([
            "Key1=Value1",
            "--Key2=Value2",
            "/Key3=Value3",
            "--Key4",
            "Value4",
            "/Key5",
            "Value5",
        ]))
        .unwrap();

        for i in 1..=5 {
            assert_eq!(
                provider.try_get(&format!("key{}", i)),
                Some(format!("Value{}", i))
            );
        }
    }

    #[test]
    fn test_unrecognized_and_dangling_args_are_skipped() {
        let provider = load(CommandLineSource::new(["plain", "-x", "value", "--last"])).unwrap();
        assert!(provider.child_keys(Vec::new(), None).is_empty());
    }

    #[test]
    fn test_switch_mappings() {
        let provider = load(
            CommandLineSource::new(["-p", "8080", "--verbosity=debug", "-H=localhost"])
                .with_switch_mappings([
                    ("-p", "Server:Port"),
                    ("--verbosity", "Logging:Level"),
                    ("-h", "Server:Host"),
                ]),
        )
        .unwrap();

        assert_eq!(provider.try_get("server:port").as_deref(), Some("8080"));
        assert_eq!(provider.try_get("logging:level").as_deref(), Some("debug"));
        assert_eq!(provider.try_get("server:host").as_deref(), Some("localhost"));
    }

    #[test]
    fn test_unmapped_short_switch_with_value_fails() {
        let result = load(CommandLineSource::new(["-k=v"]));
        assert!(matches!(result, Err(ConfigError::ParseError(_))));
    }

    #[test]
    fn test_invalid_switch_mappings() {
        let properties = BTreeMap::new();
        let context = BuildContext::new(&properties);

        let no_dash = CommandLineSource::new(Vec::<String>::new())
            .with_switch_mappings([("port", "Server:Port")]);
        assert!(matches!(no_dash.build(&context), Err(ConfigError::ParseError(_))));

        let duplicated = CommandLineSource::new(Vec::<String>::new())
            .with_switch_mappings([("-P", "a"), ("-p", "b")]);
        assert!(matches!(duplicated.build(&context), Err(ConfigError::ParseError(_))));
    }

    #[test]
    fn test_later_duplicate_wins() {
        let provider = load(CommandLineSource::new(["--key=first", "--KEY=second"])).unwrap();
        assert_eq!(provider.try_get("key").as_deref(), Some("second"));
    }
}
