//! Command line configuration.

use crate::error::ConfigError;
use crate::options::LinkAttrOptions;
use anyhow::{Result, bail};
use clap::{ArgAction, Parser};
use std::path::{Path, PathBuf};

/// Input path meaning standard input.
const STDIN_PATH: &str = "-";

/// Command line configuration for mdlinkattr.
#[derive(Debug, Clone, Default, Parser)]
#[command(name = "mdlinkattr", version, about, long_about = None)]
pub struct Config {
    /// Markdown file to render ("-" reads standard input)
    #[arg(default_value = STDIN_PATH)]
    pub input: PathBuf,

    /// Output HTML file (standard output when omitted)
    #[arg(short, long)]
    pub output: Option<PathBuf>,

    /// TOML file with link options
    #[arg(short, long, value_name = "FILE")]
    pub config: Option<PathBuf>,

    /// Open links in a new tab (on, external_only, off)
    #[arg(long, value_name = "MODE")]
    pub new_tab: Option<String>,

    /// Strip referrer from links (on, external_only, off)
    #[arg(long, value_name = "MODE")]
    pub no_referrer: Option<String>,

    /// Set missing link titles from link text (on, off)
    #[arg(long, value_name = "MODE")]
    pub auto_title: Option<String>,

    /// Custom attribute forced onto every link, repeatable
    #[arg(short = 'a', long = "attr", value_name = "NAME=VALUE")]
    pub attrs: Vec<String>,

    /// Wrap output in a complete HTML document
    #[arg(long)]
    pub standalone: bool,

    /// Document title for standalone output
    #[arg(long, requires = "standalone")]
    pub title: Option<String>,

    /// Increase log verbosity (-v, -vv, -vvv)
    #[arg(short, long, action = ArgAction::Count)]
    pub verbose: u8,
}

impl Config {
    /// Parses configuration from command line arguments.
    pub fn parse() -> Self {
        <Self as Parser>::parse()
    }

    /// Validates configuration.
    ///
    /// # Errors
    ///
    /// Returns error if the input file does not exist.
    pub fn validate(&self) -> Result<()> {
        if !self.reads_stdin() && !self.input.exists() {
            bail!("Input file does not exist: {}", self.input.display());
        }

        Ok(())
    }

    /// Returns whether markdown is read from standard input.
    pub fn reads_stdin(&self) -> bool {
        self.input.as_os_str() == STDIN_PATH
    }

    /// Builds link options from the options file and command line flags.
    ///
    /// Flags override values from the file.
    ///
    /// # Errors
    ///
    /// Returns error if the options file is unreadable or any option is
    /// rejected.
    pub fn link_options(&self) -> Result<LinkAttrOptions, ConfigError> {
        let base = match &self.config {
            Some(path) => LinkAttrOptions::from_file(path)?,
            None => LinkAttrOptions::default(),
        };

        let mut pairs: Vec<(String, String)> = [
            ("new_tab", &self.new_tab),
            ("no_referrer", &self.no_referrer),
            ("auto_title", &self.auto_title),
        ]
        .into_iter()
        .filter_map(|(key, value)| value.as_ref().map(|v| (key.to_string(), v.clone())))
        .collect();

        for attr in &self.attrs {
            let Some((name, value)) = attr.split_once('=') else {
                return Err(ConfigError::InvalidValue {
                    key: "attr".to_string(),
                    value: attr.clone(),
                    expected: "NAME=VALUE",
                });
            };
            pairs.push((format!("custom_attrs.{name}"), value.to_string()));
        }

        base.apply_pairs(pairs)
    }

    /// Returns title for standalone output.
    ///
    /// Falls back to the input file stem, then to "Document".
    pub fn document_title(&self) -> String {
        if let Some(title) = &self.title {
            return title.clone();
        }

        if self.reads_stdin() {
            return "Document".to_string();
        }

        Path::new(&self.input)
            .file_stem()
            .and_then(|s| s.to_str())
            .map_or_else(|| "Document".to_string(), String::from)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::options::{Policy, Toggle};
    use std::io::Write;

    fn config_for(input: &str) -> Config {
        Config {
            input: PathBuf::from(input),
            ..Config::default()
        }
    }

    #[test]
    fn test_parse_arguments() {
        // Act
        let config = Config::try_parse_from([
            "mdlinkattr",
            "README.md",
            "-o",
            "out.html",
            "--new-tab",
            "external_only",
            "--attr",
            "class=ext",
            "-a",
            "data-x=1",
            "-vv",
        ])
        .expect("Should parse arguments");

        // Assert
        assert_eq!(config.input, PathBuf::from("README.md"));
        assert_eq!(config.output, Some(PathBuf::from("out.html")));
        assert_eq!(config.new_tab.as_deref(), Some("external_only"));
        assert_eq!(config.attrs, vec!["class=ext", "data-x=1"]);
        assert_eq!(config.verbose, 2);
        assert!(!config.standalone);
    }

    #[test]
    fn test_title_requires_standalone() {
        // Act
        let result = Config::try_parse_from(["mdlinkattr", "--title", "Doc"]);

        // Assert
        assert!(result.is_err(), "--title without --standalone should fail");
    }

    #[test]
    fn test_default_input_is_stdin() {
        // Act
        let config = Config::try_parse_from(["mdlinkattr"]).expect("Should parse");

        // Assert
        assert!(config.reads_stdin());
        assert!(config.validate().is_ok(), "Stdin needs no file");
    }

    #[test]
    fn test_validate_missing_input() {
        // Arrange
        let config = config_for("does/not/exist.md");

        // Act
        let result = config.validate();

        // Assert
        assert!(result.is_err(), "Missing input file should be rejected");
    }

    #[test]
    fn test_validate_existing_input() {
        // Arrange
        let config = config_for("Cargo.toml");

        // Act
        let result = config.validate();

        // Assert
        assert!(result.is_ok(), "Existing file should be valid");
    }

    #[test]
    fn test_link_options_from_flags() {
        // Arrange
        let config = Config {
            new_tab: Some("on".to_string()),
            auto_title: Some("on".to_string()),
            attrs: vec!["class=a=b".to_string()],
            ..config_for("-")
        };

        // Act
        let options = config.link_options().expect("Should build options");

        // Assert
        assert_eq!(options.new_tab(), Policy::On);
        assert_eq!(options.no_referrer(), Policy::Off);
        assert_eq!(options.auto_title(), Toggle::On);
        assert_eq!(
            options.custom_attrs().collect::<Vec<_>>(),
            vec![("class", "a=b")],
            "Only the first '=' separates name from value"
        );
    }

    #[test]
    fn test_link_options_rejects_invalid_flag() {
        // Arrange
        let config = Config {
            no_referrer: Some("xxxyyy".to_string()),
            ..config_for("-")
        };

        // Act
        let result = config.link_options();

        // Assert
        assert!(matches!(result, Err(ConfigError::InvalidValue { .. })));
    }

    #[test]
    fn test_link_options_rejects_attr_without_value() {
        // Arrange
        let config = Config {
            attrs: vec!["class".to_string()],
            ..config_for("-")
        };

        // Act
        let result = config.link_options();

        // Assert
        assert!(matches!(result, Err(ConfigError::InvalidValue { ref key, .. }) if key == "attr"));
    }

    #[test]
    fn test_flags_override_options_file() {
        // Arrange
        let mut file = tempfile::NamedTempFile::new().expect("Should create temp file");
        writeln!(file, "new_tab = \"on\"\nno_referrer = \"on\"").expect("Should write");
        let config = Config {
            config: Some(file.path().to_path_buf()),
            new_tab: Some("off".to_string()),
            ..config_for("-")
        };

        // Act
        let options = config.link_options().expect("Should build options");

        // Assert
        assert_eq!(options.new_tab(), Policy::Off, "Flag should win");
        assert_eq!(options.no_referrer(), Policy::On, "File value should stay");
    }

    #[test]
    fn test_document_title() {
        // Arrange
        let explicit = Config {
            title: Some("Explicit".to_string()),
            ..config_for("docs/guide.md")
        };

        // Assert
        assert_eq!(explicit.document_title(), "Explicit");
        assert_eq!(config_for("docs/guide.md").document_title(), "guide");
        assert_eq!(config_for("-").document_title(), "Document");
    }
}
