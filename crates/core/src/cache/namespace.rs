//! Versioned namespace names: `<app>-v<version>`.

use std::fmt;

use crate::Error;

/// One versioned store namespace.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Namespace {
    app: String,
    version: String,
}

impl Namespace {
    /// Build a namespace, validating both parts.
    ///
    /// `app` may contain ASCII alphanumerics, `.`, `_` and `-`; `version`
    /// the same minus `-`, so the `-v` separator stays unambiguous.
    pub fn new(app: impl Into<String>, version: impl Into<String>) -> Result<Self, Error> {
        let app = app.into();
        let version = version.into();

        if app.is_empty() || !app.chars().all(|c| c.is_ascii_alphanumeric() || matches!(c, '.' | '_' | '-')) {
            return Err(Error::InvalidNamespace(format!("app namespace {app:?}")));
        }
        if version.is_empty() || !version.chars().all(|c| c.is_ascii_alphanumeric() || matches!(c, '.' | '_')) {
            return Err(Error::InvalidNamespace(format!("version {version:?}")));
        }

        Ok(Self { app, version })
    }

    /// Parse a stored namespace name back into its parts.
    pub fn parse(name: &str) -> Result<Self, Error> {
        let (app, version) = name
            .rsplit_once("-v")
            .ok_or_else(|| Error::InvalidNamespace(name.to_string()))?;
        Self::new(app, version)
    }

    pub fn app(&self) -> &str {
        &self.app
    }

    pub fn version(&self) -> &str {
        &self.version
    }

    pub fn name(&self) -> String {
        format!("{}-v{}", self.app, self.version)
    }

    /// Prefix shared by every version of this application.
    pub fn family_prefix(&self) -> String {
        format!("{}-v", self.app)
    }

    /// Whether `name` is another version of the same application.
    pub fn is_stale_sibling(&self, name: &str) -> bool {
        name != self.name()
            && Namespace::parse(name).is_ok_and(|other| other.app == self.app)
    }
}

impl fmt::Display for Namespace {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}-v{}", self.app, self.version)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_name_format() {
        let ns = Namespace::new("study-notes-current", "2").unwrap();
        assert_eq!(ns.name(), "study-notes-current-v2");
        assert_eq!(ns.family_prefix(), "study-notes-current-v");
        assert_eq!(ns.to_string(), ns.name());
    }

    #[test]
    fn test_parse_round_trip() {
        let ns = Namespace::parse("study-notes-current-v2").unwrap();
        assert_eq!(ns.app(), "study-notes-current");
        assert_eq!(ns.version(), "2");
    }

    #[test]
    fn test_rejects_bad_parts() {
        assert!(Namespace::new("", "1").is_err());
        assert!(Namespace::new("my app", "1").is_err());
        assert!(Namespace::new("app", "").is_err());
        assert!(Namespace::new("app", "1-beta").is_err());
        assert!(Namespace::parse("no-version-marker").is_err());
    }

    #[test]
    fn test_stale_sibling() {
        let ns = Namespace::new("shelf", "3").unwrap();
        assert!(ns.is_stale_sibling("shelf-v1"));
        assert!(ns.is_stale_sibling("shelf-v2.1"));
        assert!(!ns.is_stale_sibling("shelf-v3"));
        assert!(!ns.is_stale_sibling("shelf-admin-v1"));
        assert!(!ns.is_stale_sibling("other-v1"));
    }
}
