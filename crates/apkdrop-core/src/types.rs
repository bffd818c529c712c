//! Core types for apkdrop

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::SelectionError;

/// Named build variant of the target application (e.g. "dev", "raf")
///
/// Treated as an opaque identifier: it is passed to the build tool verbatim
/// and matched against artifact file names.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Flavor(String);

impl Flavor {
    /// Parse a flavor name, rejecting empty names and characters that would
    /// break the build tool arguments or the archive file name
    pub fn parse(name: &str) -> std::result::Result<Self, SelectionError> {
        let name = name.trim();
        let valid = !name.is_empty()
            && name
                .chars()
                .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_');

        if valid {
            Ok(Self(name.to_string()))
        } else {
            Err(SelectionError::InvalidFlavor(name.to_string()))
        }
    }

    /// Returns the flavor name
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Flavor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl FromStr for Flavor {
    type Err = SelectionError;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl TryFrom<String> for Flavor {
    type Error = SelectionError;

    fn try_from(value: String) -> std::result::Result<Self, Self::Error> {
        Self::parse(&value)
    }
}

impl From<Flavor> for String {
    fn from(flavor: Flavor) -> Self {
        flavor.0
    }
}

/// Build configuration requested from the build tool
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BuildMode {
    /// Optimized build, split per ABI
    #[default]
    Release,
    /// Debug build
    Debug,
}

impl BuildMode {
    /// All modes in the order they are offered to the user
    pub const ALL: [BuildMode; 2] = [BuildMode::Release, BuildMode::Debug];

    /// Returns the string representation of the mode
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Release => "release",
            Self::Debug => "debug",
        }
    }
}

impl fmt::Display for BuildMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for BuildMode {
    type Err = SelectionError;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "release" => Ok(Self::Release),
            "debug" => Ok(Self::Debug),
            _ => Err(SelectionError::InvalidMode(s.to_string())),
        }
    }
}

/// A confirmed flavor and build mode pair
///
/// Created by the selection front-end once both questions are answered and
/// never modified afterwards.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BuildSelection {
    pub flavor: Flavor,
    pub mode: BuildMode,
}

impl BuildSelection {
    pub fn new(flavor: Flavor, mode: BuildMode) -> Self {
        Self { flavor, mode }
    }

    /// Build a selection from the two raw answers
    pub fn from_answers(flavor: &str, mode: &str) -> std::result::Result<Self, SelectionError> {
        Ok(Self::new(Flavor::parse(flavor)?, mode.parse()?))
    }
}

impl fmt::Display for BuildSelection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ({})", self.flavor, self.mode)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_flavor_parse() {
        assert_eq!(Flavor::parse(" dev ").unwrap().as_str(), "dev");
        assert_eq!(Flavor::parse("well_care-2").unwrap().as_str(), "well_care-2");
    }

    #[test]
    fn test_flavor_rejects_invalid_names() {
        assert!(Flavor::parse("").is_err());
        assert!(Flavor::parse("raf + wellcare").is_err());
        assert!(Flavor::parse("../dev").is_err());
    }

    #[test]
    fn test_build_mode_from_str() {
        assert_eq!("Release".parse::<BuildMode>().unwrap(), BuildMode::Release);
        assert_eq!("debug".parse::<BuildMode>().unwrap(), BuildMode::Debug);
        assert_eq!(
            "profile".parse::<BuildMode>(),
            Err(SelectionError::InvalidMode("profile".to_string()))
        );
    }

    #[test]
    fn test_selection_from_answers() {
        let selection = BuildSelection::from_answers("raf", "debug").unwrap();
        assert_eq!(selection.flavor.as_str(), "raf");
        assert_eq!(selection.mode, BuildMode::Debug);
        assert_eq!(selection.to_string(), "raf (debug)");
    }

    #[test]
    fn test_flavor_serde_validates() {
        let flavor: Flavor = serde_yaml::from_str("wellcare").unwrap();
        assert_eq!(flavor.as_str(), "wellcare");
        assert!(serde_yaml::from_str::<Flavor>("\"not valid\"").is_err());
    }
}
