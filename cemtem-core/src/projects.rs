//! Registered construction projects, searched by the sales-record flow.

use async_trait::async_trait;
use thiserror::Error;

use crate::config::ProjectEntry;

/// Maximum number of hits offered for selection.
pub const MAX_RESULTS: usize = 5;

/// A registered project.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Project {
    /// Project name.
    pub name: String,
    /// Locality / address, if known.
    pub location: Option<String>,
    /// Registry (RERA) id, if known.
    pub rera_id: Option<String>,
}

impl Project {
    /// One-line description used in selection lists.
    pub fn summary(&self) -> String {
        let mut line = self.name.clone();
        if let Some(location) = &self.location {
            line.push_str(&format!(" ({})", location));
        }
        if let Some(rera_id) = &self.rera_id {
            line.push_str(&format!(" [{}]", rera_id));
        }
        line
    }
}

impl From<&ProjectEntry> for Project {
    fn from(entry: &ProjectEntry) -> Self {
        Self {
            name: entry.name.clone(),
            location: entry.location.clone(),
            rera_id: entry.rera_id.clone(),
        }
    }
}

/// Errors from a project directory.
#[derive(Debug, Error)]
pub enum DirectoryError {
    /// The directory backend could not be queried.
    #[error("project directory unavailable: {0}")]
    Unavailable(String),
}

/// Port for project lookup.
#[async_trait]
pub trait ProjectDirectory: Send + Sync {
    /// Projects matching `query`, at most [`MAX_RESULTS`].
    async fn search(&self, query: &str) -> Result<Vec<Project>, DirectoryError>;
}

/// Directory over a fixed list, usually the `[[projects]]` config entries.
#[derive(Debug, Clone, Default)]
pub struct StaticProjectDirectory {
    projects: Vec<Project>,
}

impl StaticProjectDirectory {
    /// Directory over `projects`.
    pub fn new(projects: Vec<Project>) -> Self {
        Self { projects }
    }

    /// Directory seeded from config entries.
    pub fn from_config(entries: &[ProjectEntry]) -> Self {
        Self::new(entries.iter().map(Project::from).collect())
    }
}

#[async_trait]
impl ProjectDirectory for StaticProjectDirectory {
    async fn search(&self, query: &str) -> Result<Vec<Project>, DirectoryError> {
        let needle = query.trim().to_lowercase();
        if needle.is_empty() {
            return Ok(Vec::new());
        }
        let contains = |field: &Option<String>| {
            field
                .as_deref()
                .is_some_and(|v| v.to_lowercase().contains(&needle))
        };
        Ok(self
            .projects
            .iter()
            .filter(|p| {
                p.name.to_lowercase().contains(&needle) || contains(&p.location) || contains(&p.rera_id)
            })
            .take(MAX_RESULTS)
            .cloned()
            .collect())
    }
}
