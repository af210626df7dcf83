//! Project credentials and environment configuration.

use std::env;

use crate::error::PostageError;

/// Default API host.
pub const DEFAULT_BASE_URL: &str = "https://api.postageapp.com";

/// API version segment used in every endpoint path.
pub const API_VERSION: &str = "v.1.0";

/// Project name used when only `POSTAGEAPP_API_KEY` is set.
pub const DEFAULT_PROJECT: &str = "default";

/// Ordered table of project name → API key.
///
/// Names keep their insertion order so [`names`](Projects::names) is stable.
///
/// ```
/// use postageapp::Projects;
///
/// let projects = Projects::new()
///     .with("newsletters", "key-1")
///     .with("receipts", "key-2");
///
/// assert_eq!(projects.names(), vec!["newsletters", "receipts"]);
/// assert_eq!(projects.get("receipts"), Some("key-2"));
/// ```
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Projects {
    entries: Vec<(String, String)>,
}

impl Projects {
    /// Create an empty table.
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a project, replacing the key of an existing one with the same name.
    pub fn with(mut self, name: impl Into<String>, api_key: impl Into<String>) -> Self {
        self.insert(name, api_key);
        self
    }

    /// Add a project in place.
    pub fn insert(&mut self, name: impl Into<String>, api_key: impl Into<String>) {
        let name = name.into();
        let api_key = api_key.into();
        match self.entries.iter_mut().find(|(n, _)| *n == name) {
            Some(entry) => entry.1 = api_key,
            None => self.entries.push((name, api_key)),
        }
    }

    /// Look up the API key for a project.
    pub fn get(&self, name: &str) -> Option<&str> {
        self.entries
            .iter()
            .find(|(n, _)| n == name)
            .map(|(_, key)| key.as_str())
    }

    /// Configured project names, in insertion order.
    pub fn names(&self) -> Vec<&str> {
        self.entries.iter().map(|(n, _)| n.as_str()).collect()
    }

    /// Number of configured projects.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// True when no project is configured.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Parse `name=key` pairs separated by commas.
    ///
    /// Whitespace around names and keys is ignored, as are empty segments.
    pub fn parse(input: &str) -> Result<Self, PostageError> {
        let mut projects = Self::new();
        for pair in input.split(',').map(str::trim).filter(|p| !p.is_empty()) {
            let (name, key) = pair.split_once('=').ok_or_else(|| {
                PostageError::Configuration(format!("expected name=key, got '{}'", pair))
            })?;
            let (name, key) = (name.trim(), key.trim());
            if name.is_empty() || key.is_empty() {
                return Err(PostageError::Configuration(format!(
                    "empty project name or key in '{}'",
                    pair
                )));
            }
            projects.insert(name, key);
        }
        Ok(projects)
    }

    /// Load projects from `POSTAGEAPP_PROJECTS` and/or `POSTAGEAPP_API_KEY`.
    ///
    /// `POSTAGEAPP_API_KEY` is registered under the `default` project.
    pub fn from_env() -> Result<Self, PostageError> {
        let mut projects = match env::var("POSTAGEAPP_PROJECTS") {
            Ok(list) => Self::parse(&list)?,
            Err(_) => Self::new(),
        };
        if let Ok(key) = env::var("POSTAGEAPP_API_KEY") {
            if !key.trim().is_empty() {
                projects.insert(DEFAULT_PROJECT, key.trim());
            }
        }

        if projects.is_empty() {
            return Err(PostageError::Configuration(
                "neither POSTAGEAPP_PROJECTS nor POSTAGEAPP_API_KEY is set".into(),
            ));
        }
        Ok(projects)
    }
}

impl<N: Into<String>, K: Into<String>> FromIterator<(N, K)> for Projects {
    fn from_iter<I: IntoIterator<Item = (N, K)>>(iter: I) -> Self {
        let mut projects = Self::new();
        for (name, key) in iter {
            projects.insert(name, key);
        }
        projects
    }
}
