//! Profile records and tool families

use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

/// A grouping of profiles sharing one activation mechanism
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ToolFamily {
    /// Claude Code: credentials live in the user's persistent environment store
    Claude,
    /// Codex CLI: credentials live in `~/.codex/auth.json`
    Codex,
    /// Gemini CLI: credentials live in `~/.gemini/credentials.json`
    Gemini,
}

/// Per-family constants: where the credential and endpoint fields land on the
/// real surface and in the merged router document
pub struct FamilyKeys {
    /// Section name in the merged router document
    pub section: &'static str,
    /// Key (or environment variable) holding the credential
    pub secret_key: &'static str,
    /// Key (or environment variable) holding the endpoint override
    pub endpoint_key: &'static str,
}

const CLAUDE_KEYS: FamilyKeys = FamilyKeys {
    section: "claude",
    secret_key: "ANTHROPIC_AUTH_TOKEN",
    endpoint_key: "ANTHROPIC_BASE_URL",
};

const CODEX_KEYS: FamilyKeys = FamilyKeys {
    section: "codex",
    secret_key: "OPENAI_API_KEY",
    endpoint_key: "OPENAI_BASE_URL",
};

const GEMINI_KEYS: FamilyKeys = FamilyKeys {
    section: "gemini",
    secret_key: "GEMINI_API_KEY",
    endpoint_key: "GEMINI_BASE_URL",
};

impl ToolFamily {
    /// Every family, in declaration order
    pub const ALL: [ToolFamily; 3] = [ToolFamily::Claude, ToolFamily::Codex, ToolFamily::Gemini];

    /// Field names for this family's surfaces (a lookup table, so per-family
    /// differences stay data rather than dispatch)
    #[must_use]
    pub fn keys(self) -> &'static FamilyKeys {
        match self {
            ToolFamily::Claude => &CLAUDE_KEYS,
            ToolFamily::Codex => &CODEX_KEYS,
            ToolFamily::Gemini => &GEMINI_KEYS,
        }
    }
}

impl fmt::Display for ToolFamily {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ToolFamily::Claude => write!(f, "claude"),
            ToolFamily::Codex => write!(f, "codex"),
            ToolFamily::Gemini => write!(f, "gemini"),
        }
    }
}

impl std::str::FromStr for ToolFamily {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "claude" => Ok(ToolFamily::Claude),
            "codex" => Ok(ToolFamily::Codex),
            "gemini" => Ok(ToolFamily::Gemini),
            other => Err(format!("unknown tool family: {other}")),
        }
    }
}

/// One named credential/endpoint pair for one tool family
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProfileRecord {
    /// Unique identifier, assigned at creation
    pub id: Uuid,
    /// User-facing label; free text, not required unique
    pub name: String,
    /// Activation mechanism grouping; immutable after creation
    pub family: ToolFamily,
    /// Opaque credential pushed to the family's surface
    pub secret: String,
    /// Service address override; `None` means the tool default
    pub endpoint: Option<String>,
    /// True for at most one record per family
    #[serde(default)]
    pub active: bool,
}

impl ProfileRecord {
    pub(crate) fn new(
        name: String,
        family: ToolFamily,
        secret: String,
        endpoint: Option<String>,
    ) -> Self {
        Self {
            id: Uuid::new_v4(),
            name,
            family,
            secret,
            endpoint,
            active: false,
        }
    }
}

// The credential must never reach logs or error messages through `{:?}`.
impl fmt::Debug for ProfileRecord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ProfileRecord")
            .field("id", &self.id)
            .field("name", &self.name)
            .field("family", &self.family)
            .field("secret", &"<redacted>")
            .field("endpoint", &self.endpoint)
            .field("active", &self.active)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_family_serializes_lowercase() {
        assert_eq!(
            serde_json::to_string(&ToolFamily::Claude).unwrap(),
            "\"claude\""
        );
        assert_eq!(
            serde_json::to_string(&ToolFamily::Codex).unwrap(),
            "\"codex\""
        );
        assert_eq!(
            serde_json::to_string(&ToolFamily::Gemini).unwrap(),
            "\"gemini\""
        );
    }

    #[test]
    fn test_family_parse_roundtrip() {
        for family in ToolFamily::ALL {
            let parsed: ToolFamily = family.to_string().parse().unwrap();
            assert_eq!(parsed, family);
        }
        assert!("cursor".parse::<ToolFamily>().is_err());
    }

    #[test]
    fn test_debug_redacts_secret() {
        let record = ProfileRecord::new(
            "work".to_string(),
            ToolFamily::Claude,
            "sk-very-secret".to_string(),
            None,
        );

        let rendered = format!("{record:?}");
        assert!(!rendered.contains("sk-very-secret"));
        assert!(rendered.contains("<redacted>"));
    }
}
