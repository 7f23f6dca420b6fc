use crate::scramble::{Color, VariableRegistry};
use serde::Deserialize;
use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};
use strum::{Display, EnumString};
use tracing::debug;

const DEFAULT_DURATION_MS: u64 = 600;
const DEFAULT_INTENSITY: f64 = 0.28;
const DEFAULT_SETTLE_DELAY_MS: u64 = 1000;

/// Prefix declared attributes may carry, e.g. `scramble-duration`.
const ATTRIBUTE_PREFIX: &str = "scramble-";

/// How a continuous engine restarts once it settles.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize, EnumString, Display)]
#[serde(rename_all = "kebab-case")]
#[strum(serialize_all = "kebab-case", ascii_case_insensitive)]
pub enum RepeatMode {
    /// Wait for the settle delay before restarting.
    #[default]
    Delayed,

    /// Restart on the next frame.
    Immediate,
}

/// The options an engine is built with.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(try_from = "HashMap<String, serde_yaml::Value>")]
pub struct ScrambleOptions {
    /// Total animation duration, in milliseconds.
    pub duration: u64,

    /// The charset reference used for every position without a mapping.
    pub chars: Option<String>,

    /// The per character mapping spec.
    pub mappings: Option<String>,

    /// The color hint for in flight glyphs.
    pub color: Color,

    /// Restart the animation every time it settles.
    pub continuous: bool,

    /// Pass spaces and non breaking spaces through instead of scrambling them.
    pub preserve_whitespace: bool,

    /// Register mappings under both cases of their target character.
    pub case_insensitive: bool,

    /// Fold the target character's case when a mapping lookup misses.
    pub fold_lookups: bool,

    /// Don't scramble when the pointer enters the element.
    pub no_hover: bool,

    /// Only scramble while the element is the active member of its group.
    pub active_only: bool,

    /// Probability a scrambling position draws a new glyph on a given tick.
    pub intensity: f64,

    /// The pause between two runs in continuous mode, in milliseconds.
    pub settle_delay: u64,

    pub repeat: RepeatMode,
}

impl Default for ScrambleOptions {
    fn default() -> Self {
        Self {
            duration: DEFAULT_DURATION_MS,
            chars: None,
            mappings: None,
            color: Color::WHITE,
            continuous: false,
            preserve_whitespace: true,
            case_insensitive: false,
            fold_lookups: false,
            no_hover: false,
            active_only: false,
            intensity: DEFAULT_INTENSITY,
            settle_delay: DEFAULT_SETTLE_DELAY_MS,
            repeat: RepeatMode::default(),
        }
    }
}

impl ScrambleOptions {
    /// Build options out of an element's declared attributes.
    ///
    /// Attribute names may carry a `scramble-` prefix, which wins over the bare name when both are
    /// declared. Flags are enabled by being present unless their value is `false`, `0`, `no` or
    /// `off`. Values that don't parse fall back to defaults.
    pub fn from_attributes(attributes: &HashMap<String, String>) -> Self {
        let mut options = Self::default();
        for (name, value) in by_precedence(attributes.iter().map(|(name, value)| (name.as_str(), value.clone()))) {
            if !options.apply(&name, &value) {
                debug!("ignoring unknown attribute '{name}'");
            }
        }
        options
    }

    /// Apply a single named option, returning whether the name is known.
    fn apply(&mut self, name: &str, value: &str) -> bool {
        let name = name.strip_prefix(ATTRIBUTE_PREFIX).unwrap_or(name);
        match name {
            "duration" => self.duration = parse_or(name, value, DEFAULT_DURATION_MS),
            "settle-delay" => self.settle_delay = parse_or(name, value, DEFAULT_SETTLE_DELAY_MS),
            "intensity" => {
                self.intensity = match value.parse::<f64>() {
                    Ok(intensity) if (0.0..=1.0).contains(&intensity) => intensity,
                    _ => {
                        debug!("ignoring invalid intensity '{value}'");
                        DEFAULT_INTENSITY
                    }
                }
            }
            "chars" => self.chars = Some(value.to_string()).filter(|v| !v.is_empty()),
            "mappings" => self.mappings = Some(value.to_string()).filter(|v| !v.is_empty()),
            "color" => self.color = parse_or(name, value, Color::WHITE),
            "repeat" => self.repeat = parse_or(name, value, RepeatMode::default()),
            "continuous" => self.continuous = flag(value),
            "preserve-whitespace" => self.preserve_whitespace = flag(value),
            "case-insensitive" => self.case_insensitive = flag(value),
            "fold-lookups" => self.fold_lookups = flag(value),
            "no-hover" => self.no_hover = flag(value),
            "active-only" => self.active_only = flag(value),
            _ => return false,
        }
        true
    }

    /// The number of frames a run lasts.
    pub fn total_ticks(&self) -> u32 {
        crate::scramble::frames_for_millis(self.duration)
    }

    /// The number of frames to wait between two continuous runs.
    pub fn settle_frames(&self) -> u32 {
        match self.repeat {
            RepeatMode::Delayed => crate::scramble::frames_for_millis(self.settle_delay),
            RepeatMode::Immediate => 0,
        }
    }
}

fn parse_or<T: std::str::FromStr>(name: &str, value: &str, default: T) -> T {
    value.parse().unwrap_or_else(|_| {
        debug!("ignoring invalid value '{value}' for '{name}'");
        default
    })
}

/// Normalizes names and orders them so prefixed names are applied after their bare form.
fn by_precedence<'a>(pairs: impl IntoIterator<Item = (&'a str, String)>) -> Vec<(String, String)> {
    let mut pairs: Vec<_> = pairs
        .into_iter()
        .map(|(name, value)| (name.trim().to_ascii_lowercase(), value.trim().to_string()))
        .collect();
    pairs.sort_by_cached_key(|(name, value)| (name.starts_with(ATTRIBUTE_PREFIX), name.clone(), value.clone()));
    pairs
}

fn scalar(value: &serde_yaml::Value) -> Option<String> {
    match value {
        serde_yaml::Value::Null => Some(String::new()),
        serde_yaml::Value::Bool(b) => Some(b.to_string()),
        serde_yaml::Value::Number(n) => Some(n.to_string()),
        serde_yaml::Value::String(s) => Some(s.clone()),
        _ => None,
    }
}

/// Options in a config file follow the same rules as declared attributes, except that unknown
/// names are rejected.
impl TryFrom<HashMap<String, serde_yaml::Value>> for ScrambleOptions {
    type Error = ConfigError;

    fn try_from(values: HashMap<String, serde_yaml::Value>) -> Result<Self, Self::Error> {
        let mut pairs = Vec::new();
        for (name, value) in &values {
            match scalar(value) {
                Some(value) => pairs.push((name.as_str(), value)),
                None if Self::default().apply(&name.trim().to_ascii_lowercase(), "") => {
                    debug!("ignoring non scalar value for '{name}'")
                }
                None => return Err(ConfigError::UnknownOption(name.clone())),
            }
        }
        let mut options = Self::default();
        for (name, value) in by_precedence(pairs) {
            if !options.apply(&name, &value) {
                return Err(ConfigError::UnknownOption(name));
            }
        }
        Ok(options)
    }
}

fn flag(value: &str) -> bool {
    !matches!(value.to_ascii_lowercase().as_str(), "false" | "0" | "no" | "off")
}

/// The configuration file.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct Config {
    /// The options every engine starts from.
    pub defaults: ScrambleOptions,

    /// Named variables charsets and mappings can refer to.
    pub variables: VariableRegistry,
}

impl Config {
    /// Load the configuration from a YAML file.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let contents = match fs::read_to_string(path) {
            Ok(contents) => contents,
            Err(e) => return Err(ConfigError::Io(path.to_path_buf(), e)),
        };
        // An empty file is a valid, empty config.
        if contents.trim().is_empty() {
            return Ok(Self::default());
        }
        let config = serde_yaml::from_str(&contents)?;
        Ok(config)
    }

    /// Load the configuration from its default location, if there's one there.
    pub fn load_default() -> Result<Self, ConfigError> {
        match Self::default_path() {
            Some(path) if path.exists() => Self::load(&path),
            _ => Ok(Self::default()),
        }
    }

    pub fn default_path() -> Option<PathBuf> {
        let dirs = directories::ProjectDirs::from("", "", "glyphscramble")?;
        Some(dirs.config_dir().join("config.yaml"))
    }
}

#[derive(thiserror::Error, Debug)]
pub enum ConfigError {
    #[error("failed to read config file {0:?}: {1}")]
    Io(PathBuf, std::io::Error),

    #[error("invalid configuration: {0}")]
    Invalid(#[from] serde_yaml::Error),

    #[error("unknown option '{0}'")]
    UnknownOption(String),
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::scramble::{Scope, Variable};
    use rstest::rstest;
    use std::io::Write;

    fn attributes(pairs: &[(&str, &str)]) -> HashMap<String, String> {
        pairs.iter().map(|(k, v)| (k.to_string(), v.to_string())).collect()
    }

    #[test]
    fn defaults() {
        let options = ScrambleOptions::default();
        assert_eq!(options.duration, 600);
        assert_eq!(options.total_ticks(), 36);
        assert_eq!(options.settle_frames(), 60);
        assert!(options.preserve_whitespace);
        assert_eq!(options.color, Color::WHITE);
        assert_eq!(options.intensity, 0.28);
    }

    #[test]
    fn attributes_are_parsed() {
        let options = ScrambleOptions::from_attributes(&attributes(&[
            ("scramble-duration", "1200"),
            ("chars", "$blocks"),
            ("mappings", "a:AB"),
            ("color", "#ff0000"),
            ("continuous", ""),
            ("case-insensitive", "true"),
            ("no-hover", ""),
            ("active-only", "yes"),
            ("intensity", "0.5"),
            ("repeat", "immediate"),
        ]));
        assert_eq!(options.duration, 1200);
        assert_eq!(options.chars.as_deref(), Some("$blocks"));
        assert_eq!(options.mappings.as_deref(), Some("a:AB"));
        assert_eq!(options.color, Color::new(0xff, 0, 0));
        assert!(options.continuous);
        assert!(options.case_insensitive);
        assert!(options.no_hover);
        assert!(options.active_only);
        assert_eq!(options.intensity, 0.5);
        assert_eq!(options.settle_frames(), 0);
    }

    #[rstest]
    #[case::duration("duration", "fast")]
    #[case::negative_duration("duration", "-5")]
    #[case::intensity("intensity", "lots")]
    #[case::intensity_out_of_range("intensity", "4")]
    #[case::color("color", "blue-ish")]
    #[case::repeat("repeat", "sometimes")]
    fn malformed_values_fall_back(#[case] name: &str, #[case] value: &str) {
        let options = ScrambleOptions::from_attributes(&attributes(&[(name, value)]));
        assert_eq!(options, ScrambleOptions::default());
    }

    #[rstest]
    #[case::prefixed_last(&[("duration", "100"), ("scramble-duration", "1200")])]
    #[case::prefixed_first(&[("scramble-duration", "1200"), ("duration", "100")])]
    #[case::mixed_case(&[("Scramble-Duration", "1200"), ("DURATION", "100")])]
    fn prefixed_attributes_win(#[case] pairs: &[(&str, &str)]) {
        for _ in 0..16 {
            let options = ScrambleOptions::from_attributes(&attributes(pairs));
            assert_eq!(options.duration, 1200);
        }
    }

    #[rstest]
    #[case("false")]
    #[case("0")]
    #[case("NO")]
    #[case("off")]
    fn disabling_whitespace_preservation(#[case] value: &str) {
        let options = ScrambleOptions::from_attributes(&attributes(&[("preserve-whitespace", value)]));
        assert!(!options.preserve_whitespace);
    }

    #[test]
    fn load_config_file() {
        let mut file = tempfile::NamedTempFile::new().expect("failed to create file");
        writeln!(
            file,
            r##"
defaults:
  duration: 900
  continuous: true
  color: "#00ff00"
variables:
  page:
    blocks: "█▓▒"
  process:
    vowels:
      a: "4"
      e: "3"
"##
        )
        .expect("failed to write");
        let config = Config::load(file.path()).expect("failed to load");
        assert_eq!(config.defaults.duration, 900);
        assert!(config.defaults.continuous);
        assert_eq!(config.defaults.color, Color::new(0, 0xff, 0));
        assert_eq!(config.variables.lookup("blocks"), Some(&Variable::Text("█▓▒".into())));
        let expected = Variable::Mapping(HashMap::from([('a', "4".to_string()), ('e', "3".to_string())]));
        assert_eq!(config.variables.lookup("vowels"), Some(&expected));
        assert_eq!(
            config.variables,
            VariableRegistry::new()
                .with(Scope::Page, "blocks", Variable::Text("█▓▒".into()))
                .with(Scope::Process, "vowels", expected)
        );
    }

    fn load_yaml(contents: &str) -> Result<Config, ConfigError> {
        let mut file = tempfile::NamedTempFile::new().expect("failed to create file");
        write!(file, "{contents}").expect("failed to write");
        Config::load(file.path())
    }

    #[rstest]
    #[case::duration("duration: fast")]
    #[case::negative_duration("duration: -5")]
    #[case::intensity_out_of_range("intensity: 4.0")]
    #[case::intensity("intensity: lots")]
    #[case::color("color: blue-ish")]
    #[case::repeat("repeat: sometimes")]
    #[case::non_scalar("chars: [a, b]")]
    fn malformed_config_values_fall_back(#[case] option: &str) {
        let config = load_yaml(&format!("defaults:\n  {option}\n")).expect("failed to load");
        assert_eq!(config.defaults, ScrambleOptions::default());
    }

    #[test]
    fn config_options_match_attributes() {
        let config = load_yaml(
            "defaults:\n  duration: 1200\n  intensity: 0.5\n  continuous: true\n  preserve-whitespace: off\n  \
             repeat: immediate\n  settle-delay: 50\n",
        )
        .expect("failed to load");
        let expected = ScrambleOptions::from_attributes(&attributes(&[
            ("duration", "1200"),
            ("intensity", "0.5"),
            ("continuous", "true"),
            ("preserve-whitespace", "off"),
            ("repeat", "immediate"),
            ("settle-delay", "50"),
        ]));
        assert_eq!(config.defaults, expected);
        assert_eq!(config.defaults.duration, 1200);
        assert!(!config.defaults.preserve_whitespace);
    }

    #[test]
    fn empty_config_file() {
        let file = tempfile::NamedTempFile::new().expect("failed to create file");
        let config = Config::load(file.path()).expect("failed to load");
        assert_eq!(config.defaults, ScrambleOptions::default());
    }

    #[test]
    fn unknown_fields_are_rejected() {
        let mut file = tempfile::NamedTempFile::new().expect("failed to create file");
        writeln!(file, "defaults:\n  speed: 3").expect("failed to write");
        assert!(matches!(Config::load(file.path()), Err(ConfigError::Invalid(_))));
        assert!(matches!(load_yaml("defaults:\n  speed: [1]\n"), Err(ConfigError::Invalid(_))));
        assert!(matches!(load_yaml("colors: {}\n"), Err(ConfigError::Invalid(_))));
    }

    #[test]
    fn missing_config_file() {
        let result = Config::load(Path::new("/definitely/not/here.yaml"));
        assert!(matches!(result, Err(ConfigError::Io(..))));
    }
}
