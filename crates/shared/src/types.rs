//! Common types used across Teamloom

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

// =============================================================================
// Enums
// =============================================================================

/// Kind of shared resource stored for a team
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "TEXT", rename_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum FileType {
    Document,
    Image,
    Codesnippet,
    Link,
}

impl FileType {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Document => "document",
            Self::Image => "image",
            Self::Codesnippet => "codesnippet",
            Self::Link => "link",
        }
    }
}

impl fmt::Display for FileType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for FileType {
    type Err = UnknownFileType;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "document" => Ok(Self::Document),
            "image" => Ok(Self::Image),
            "codesnippet" => Ok(Self::Codesnippet),
            "link" => Ok(Self::Link),
            other => Err(UnknownFileType(other.to_string())),
        }
    }
}

#[derive(Debug, thiserror::Error)]
#[error("unknown file type: {0}")]
pub struct UnknownFileType(pub String);

/// Member role within a team
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "TEXT", rename_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum TeamRole {
    Owner,
    Member,
}

impl Default for TeamRole {
    fn default() -> Self {
        Self::Member
    }
}

impl TeamRole {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Owner => "owner",
            Self::Member => "member",
        }
    }
}

// =============================================================================
// Profile Types
// =============================================================================

/// Social profile links attached to a user account
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SocialLinks {
    #[serde(default)]
    pub github: String,
    #[serde(default)]
    pub linkedin: String,
    #[serde(default)]
    pub facebook: String,
    #[serde(default)]
    pub behance: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_filetype_round_trip() {
        for (s, ft) in [
            ("document", FileType::Document),
            ("image", FileType::Image),
            ("codesnippet", FileType::Codesnippet),
            ("link", FileType::Link),
        ] {
            assert_eq!(s.parse::<FileType>().unwrap(), ft);
            assert_eq!(ft.to_string(), s);
        }
        assert!("binary".parse::<FileType>().is_err());
    }

    #[test]
    fn test_filetype_serde_lowercase() {
        let json = serde_json::to_string(&FileType::Codesnippet).unwrap();
        assert_eq!(json, "\"codesnippet\"");
        let back: FileType = serde_json::from_str("\"image\"").unwrap();
        assert_eq!(back, FileType::Image);
    }

    #[test]
    fn test_social_links_default_empty() {
        let links: SocialLinks = serde_json::from_str("{}").unwrap();
        assert_eq!(links, SocialLinks::default());
        assert!(links.github.is_empty());
    }
}
