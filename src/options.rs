//! Link attribute options.
//!
//! Options are validated once, when they are built. A value outside an
//! option's valid set or an unknown option name is rejected with
//! [`ConfigError`], so a renderer never sees a half-valid configuration.

use crate::error::ConfigError;
use std::collections::BTreeMap;
use std::fmt;
use std::path::Path;

const POLICY_VALUES: &str = "on, external_only, off";
const TOGGLE_VALUES: &str = "on, off";

/// Key prefix addressing one custom attribute in key/value form.
const CUSTOM_ATTR_PREFIX: &str = "custom_attrs.";

/// Which links a link policy applies to.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub enum Policy {
    /// Every eligible link.
    On,
    /// Eligible links with an `http://` or `https://` URL.
    ExternalOnly,
    /// No links.
    #[default]
    Off,
}

impl Policy {
    /// Returns the canonical option value.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::On => "on",
            Self::ExternalOnly => "external_only",
            Self::Off => "off",
        }
    }

    /// Returns whether the policy covers a link of given locality.
    pub fn applies(self, is_external: bool) -> bool {
        match self {
            Self::On => true,
            Self::ExternalOnly => is_external,
            Self::Off => false,
        }
    }

    fn parse(key: &str, value: &str) -> Result<Self, ConfigError> {
        match value {
            "on" => Ok(Self::On),
            "external_only" | "external-only" => Ok(Self::ExternalOnly),
            "off" => Ok(Self::Off),
            _ => Err(invalid_value(key, value, POLICY_VALUES)),
        }
    }
}

impl fmt::Display for Policy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Two state option.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub enum Toggle {
    On,
    #[default]
    Off,
}

impl Toggle {
    /// Returns the canonical option value.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::On => "on",
            Self::Off => "off",
        }
    }

    pub fn is_on(self) -> bool {
        self == Self::On
    }

    fn parse(key: &str, value: &str) -> Result<Self, ConfigError> {
        match value {
            "on" => Ok(Self::On),
            "off" => Ok(Self::Off),
            _ => Err(invalid_value(key, value, TOGGLE_VALUES)),
        }
    }
}

impl fmt::Display for Toggle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Validated configuration for link attribute rewriting.
///
/// Defaults leave every link untouched: both policies `off`, automatic
/// titles `off` and no custom attributes.
///
/// # Examples
///
/// ```
/// use mdlinkattr::{LinkAttrOptions, Policy};
///
/// let options = LinkAttrOptions::from_pairs([
///     ("new_tab", "external_only"),
///     ("custom_attrs.class", "external"),
/// ])
/// .unwrap();
///
/// assert_eq!(options.new_tab(), Policy::ExternalOnly);
/// assert!(LinkAttrOptions::from_pairs([("new_tab", "sometimes")]).is_err());
/// ```
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LinkAttrOptions {
    new_tab: Policy,
    no_referrer: Policy,
    auto_title: Toggle,
    custom_attrs: BTreeMap<String, String>,
}

impl LinkAttrOptions {
    /// Builds options from key/value pairs on top of the defaults.
    ///
    /// Recognized keys are `new_tab`, `no_referrer`, `auto_title` and
    /// `custom_attrs.<name>`. Later pairs override earlier ones.
    ///
    /// # Errors
    ///
    /// Returns error on the first unknown key, invalid value or invalid
    /// custom attribute name.
    pub fn from_pairs<I, K, V>(pairs: I) -> Result<Self, ConfigError>
    where
        I: IntoIterator<Item = (K, V)>,
        K: AsRef<str>,
        V: AsRef<str>,
    {
        Self::default().apply_pairs(pairs)
    }

    /// Returns options with key/value pairs applied over these ones.
    ///
    /// # Errors
    ///
    /// Returns error on the first unknown key, invalid value or invalid
    /// custom attribute name. The original options are consumed either way.
    pub fn apply_pairs<I, K, V>(mut self, pairs: I) -> Result<Self, ConfigError>
    where
        I: IntoIterator<Item = (K, V)>,
        K: AsRef<str>,
        V: AsRef<str>,
    {
        for (key, value) in pairs {
            self.set(key.as_ref(), value.as_ref())?;
        }
        Ok(self)
    }

    /// Parses options from a TOML document.
    ///
    /// ```toml
    /// new_tab = "external_only"
    /// no_referrer = "on"
    /// auto_title = "off"
    ///
    /// [custom_attrs]
    /// class = "external"
    /// ```
    ///
    /// # Errors
    ///
    /// Returns error if the document is not valid TOML, contains an unknown
    /// key, a value of the wrong type or a value outside an option's set.
    pub fn from_toml_str(source: &str) -> Result<Self, ConfigError> {
        let table: toml::Table = source
            .parse()
            .map_err(|e: toml::de::Error| ConfigError::Parse(e.message().to_string()))?;

        let mut options = Self::default();
        for (key, value) in &table {
            if key == "custom_attrs" {
                let attrs = value.as_table().ok_or_else(|| ConfigError::InvalidType {
                    key: key.clone(),
                    expected: "a table of strings",
                })?;
                for (name, attr_value) in attrs {
                    let attr_value = attr_value.as_str().ok_or_else(|| ConfigError::InvalidType {
                        key: format!("{CUSTOM_ATTR_PREFIX}{name}"),
                        expected: "a string",
                    })?;
                    options.insert_custom_attr(name, attr_value)?;
                }
                continue;
            }

            let value = value.as_str().ok_or_else(|| ConfigError::InvalidType {
                key: key.clone(),
                expected: "a string",
            })?;
            options.set(key, value)?;
        }

        Ok(options)
    }

    /// Reads options from a TOML file.
    ///
    /// # Errors
    ///
    /// Returns error if the file cannot be read or its content is rejected
    /// by [`LinkAttrOptions::from_toml_str`].
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let source = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_toml_str(&source)
    }

    pub fn with_new_tab(mut self, policy: Policy) -> Self {
        self.new_tab = policy;
        self
    }

    pub fn with_no_referrer(mut self, policy: Policy) -> Self {
        self.no_referrer = policy;
        self
    }

    pub fn with_auto_title(mut self, toggle: Toggle) -> Self {
        self.auto_title = toggle;
        self
    }

    /// Adds a custom attribute forced onto every link.
    ///
    /// # Errors
    ///
    /// Returns error if `name` is not a valid HTML attribute name.
    pub fn with_custom_attr(
        mut self,
        name: impl AsRef<str>,
        value: impl Into<String>,
    ) -> Result<Self, ConfigError> {
        self.insert_custom_attr(name.as_ref(), value)?;
        Ok(self)
    }

    pub fn new_tab(&self) -> Policy {
        self.new_tab
    }

    pub fn no_referrer(&self) -> Policy {
        self.no_referrer
    }

    pub fn auto_title(&self) -> Toggle {
        self.auto_title
    }

    /// Custom attributes in application order.
    pub fn custom_attrs(&self) -> impl Iterator<Item = (&str, &str)> {
        self.custom_attrs
            .iter()
            .map(|(name, value)| (name.as_str(), value.as_str()))
    }

    /// Returns whether these options can change any link.
    pub fn is_noop(&self) -> bool {
        self.new_tab == Policy::Off
            && self.no_referrer == Policy::Off
            && !self.auto_title.is_on()
            && self.custom_attrs.is_empty()
    }

    fn set(&mut self, key: &str, value: &str) -> Result<(), ConfigError> {
        match key {
            "new_tab" => self.new_tab = Policy::parse(key, value)?,
            "no_referrer" => self.no_referrer = Policy::parse(key, value)?,
            "auto_title" => self.auto_title = Toggle::parse(key, value)?,
            _ => match key.strip_prefix(CUSTOM_ATTR_PREFIX) {
                Some(name) => self.insert_custom_attr(name, value)?,
                None => return Err(ConfigError::UnknownOption(key.to_string())),
            },
        }
        Ok(())
    }

    fn insert_custom_attr(
        &mut self,
        name: &str,
        value: impl Into<String>,
    ) -> Result<(), ConfigError> {
        if !is_valid_attr_name(name) {
            return Err(ConfigError::InvalidAttributeName(name.to_string()));
        }
        self.custom_attrs.insert(name.to_string(), value.into());
        Ok(())
    }
}

fn invalid_value(key: &str, value: &str, expected: &'static str) -> ConfigError {
    ConfigError::InvalidValue {
        key: key.to_string(),
        value: value.to_string(),
        expected,
    }
}

/// Checks an attribute name against the HTML attribute name syntax.
fn is_valid_attr_name(name: &str) -> bool {
    !name.is_empty()
        && name.chars().all(|c| {
            !c.is_whitespace()
                && !c.is_control()
                && !matches!(c, '"' | '\'' | '>' | '<' | '/' | '=')
        })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_are_off() {
        // Arrange & Act
        let options = LinkAttrOptions::default();

        // Assert
        assert_eq!(options.new_tab(), Policy::Off);
        assert_eq!(options.no_referrer(), Policy::Off);
        assert_eq!(options.auto_title(), Toggle::Off);
        assert_eq!(options.custom_attrs().count(), 0);
        assert!(options.is_noop(), "Default options should change nothing");
    }

    #[test]
    fn test_from_pairs_parses_every_option() {
        // Arrange
        let pairs = [
            ("new_tab", "on"),
            ("no_referrer", "external_only"),
            ("auto_title", "on"),
            ("custom_attrs.class", "ext"),
        ];

        // Act
        let options = LinkAttrOptions::from_pairs(pairs).expect("Should accept valid pairs");

        // Assert
        assert_eq!(options.new_tab(), Policy::On);
        assert_eq!(options.no_referrer(), Policy::ExternalOnly);
        assert_eq!(options.auto_title(), Toggle::On);
        assert_eq!(
            options.custom_attrs().collect::<Vec<_>>(),
            vec![("class", "ext")]
        );
        assert!(!options.is_noop());
    }

    #[test]
    fn test_from_pairs_accepts_hyphenated_external_only() {
        // Act
        let options = LinkAttrOptions::from_pairs([("new_tab", "external-only")])
            .expect("Should accept hyphenated spelling");

        // Assert
        assert_eq!(options.new_tab(), Policy::ExternalOnly);
    }

    #[test]
    fn test_reject_invalid_policy_value() {
        // Act
        let result = LinkAttrOptions::from_pairs([("new_tab", "xxxyyy")]);

        // Assert
        match result {
            Err(ConfigError::InvalidValue { key, value, .. }) => {
                assert_eq!(key, "new_tab");
                assert_eq!(value, "xxxyyy");
            }
            other => panic!("Expected InvalidValue, got {:?}", other),
        }
    }

    #[test]
    fn test_reject_external_only_for_auto_title() {
        // Act
        let result = LinkAttrOptions::from_pairs([("auto_title", "external_only")]);

        // Assert
        assert!(
            matches!(result, Err(ConfigError::InvalidValue { .. })),
            "auto_title only accepts on/off: {:?}",
            result
        );
    }

    #[test]
    fn test_reject_unknown_key() {
        // Act
        let result = LinkAttrOptions::from_pairs([("xxxyyy", "on")]);

        // Assert
        assert!(
            matches!(result, Err(ConfigError::UnknownOption(ref key)) if key == "xxxyyy"),
            "Unknown key should be rejected: {:?}",
            result
        );
    }

    #[test]
    fn test_policy_values_are_case_sensitive() {
        // Act
        let result = LinkAttrOptions::from_pairs([("no_referrer", "ON")]);

        // Assert
        assert!(result.is_err(), "Only lowercase values are valid");
    }

    #[test]
    fn test_reject_invalid_attribute_name() {
        // Act
        let empty = LinkAttrOptions::from_pairs([("custom_attrs.", "x")]);
        let spaced = LinkAttrOptions::default().with_custom_attr("data x", "y");
        let quoted = LinkAttrOptions::default().with_custom_attr("a\"b", "y");

        // Assert
        assert!(matches!(empty, Err(ConfigError::InvalidAttributeName(_))));
        assert!(matches!(spaced, Err(ConfigError::InvalidAttributeName(_))));
        assert!(matches!(quoted, Err(ConfigError::InvalidAttributeName(_))));
    }

    #[test]
    fn test_apply_pairs_overrides_previous_values() {
        // Arrange
        let base = LinkAttrOptions::default()
            .with_new_tab(Policy::On)
            .with_custom_attr("rel", "nofollow")
            .expect("Should accept rel");

        // Act
        let options = base
            .apply_pairs([("new_tab", "off"), ("custom_attrs.rel", "ugc")])
            .expect("Should apply overrides");

        // Assert
        assert_eq!(options.new_tab(), Policy::Off);
        assert_eq!(options.custom_attrs().collect::<Vec<_>>(), vec![("rel", "ugc")]);
    }

    #[test]
    fn test_from_toml_str() {
        // Arrange
        let source = r#"
new_tab = "external_only"
no_referrer = "on"

[custom_attrs]
class = "external"
data-kind = "link"
"#;

        // Act
        let options = LinkAttrOptions::from_toml_str(source).expect("Should parse TOML");

        // Assert
        assert_eq!(options.new_tab(), Policy::ExternalOnly);
        assert_eq!(options.no_referrer(), Policy::On);
        assert_eq!(options.auto_title(), Toggle::Off);
        assert_eq!(
            options.custom_attrs().collect::<Vec<_>>(),
            vec![("class", "external"), ("data-kind", "link")]
        );
    }

    #[test]
    fn test_from_toml_str_rejects_unknown_key() {
        // Act
        let result = LinkAttrOptions::from_toml_str("xxxyyy = \"on\"");

        // Assert
        assert!(matches!(result, Err(ConfigError::UnknownOption(_))));
    }

    #[test]
    fn test_from_toml_str_rejects_wrong_types() {
        // Act
        let boolean = LinkAttrOptions::from_toml_str("new_tab = true");
        let attrs = LinkAttrOptions::from_toml_str("custom_attrs = \"class\"");
        let attr_value = LinkAttrOptions::from_toml_str("[custom_attrs]\nwidth = 3");

        // Assert
        assert!(matches!(boolean, Err(ConfigError::InvalidType { .. })));
        assert!(matches!(attrs, Err(ConfigError::InvalidType { .. })));
        assert!(
            matches!(attr_value, Err(ConfigError::InvalidType { ref key, .. }) if key == "custom_attrs.width"),
            "Should name the offending attribute: {:?}",
            attr_value
        );
    }

    #[test]
    fn test_from_toml_str_rejects_syntax_errors() {
        // Act
        let result = LinkAttrOptions::from_toml_str("new_tab = ");

        // Assert
        assert!(matches!(result, Err(ConfigError::Parse(_))));
    }

    #[test]
    fn test_from_file_missing() {
        // Act
        let result = LinkAttrOptions::from_file("does/not/exist.toml");

        // Assert
        let err = result.expect_err("Missing file should fail");
        assert!(err.to_string().contains("exist.toml"), "{}", err);
    }

    #[test]
    fn test_policy_applies() {
        // Assert
        assert!(Policy::On.applies(false));
        assert!(Policy::On.applies(true));
        assert!(!Policy::ExternalOnly.applies(false));
        assert!(Policy::ExternalOnly.applies(true));
        assert!(!Policy::Off.applies(true));
    }

    #[test]
    fn test_display_uses_option_values() {
        // Assert
        assert_eq!(Policy::ExternalOnly.to_string(), "external_only");
        assert_eq!(Toggle::On.to_string(), "on");
    }
}
