//! Student environmental project tracker.

use std::fmt;

use serde::{Deserialize, Serialize};
use tracing::{debug, info};
use uuid::Uuid;

/// Lifecycle of a project, derived from its progress.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ProjectStatus {
    #[default]
    Planned,
    Active,
    Completed,
}

impl ProjectStatus {
    /// Status for a progress percentage.
    #[must_use]
    pub fn for_progress(progress: u8) -> Self {
        match progress {
            0 => Self::Planned,
            100..=u8::MAX => Self::Completed,
            _ => Self::Active,
        }
    }

    /// Arabic display label.
    #[must_use]
    pub fn label(self) -> &'static str {
        match self {
            Self::Planned => "مخطط",
            Self::Active => "قيد التنفيذ",
            Self::Completed => "مكتمل",
        }
    }
}

impl fmt::Display for ProjectStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EcoProject {
    pub id: String,
    pub title: String,
    pub description: String,
    /// Percent complete, `0..=100`.
    pub progress: u8,
    pub status: ProjectStatus,
}

/// The user's projects, in creation order.
#[derive(Debug, Clone, Default)]
pub struct ProjectBoard {
    projects: Vec<EcoProject>,
}

impl ProjectBoard {
    /// An empty board.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// A board holding the three sample projects.
    #[must_use]
    pub fn seeded() -> Self {
        let sample = |id: &str, title: &str, description: &str, progress: u8| EcoProject {
            id: id.to_owned(),
            title: title.to_owned(),
            description: description.to_owned(),
            progress,
            status: ProjectStatus::for_progress(progress),
        };
        Self {
            projects: vec![
                sample(
                    "1",
                    "حملة تشجير المدرسة",
                    "زراعة 50 شجرة في فناء المدرسة الخلفي.",
                    75,
                ),
                sample(
                    "2",
                    "إعادة تدوير الورق",
                    "جمع الأوراق المستعملة من الفصول وإرسالها للمصنع.",
                    30,
                ),
                sample(
                    "3",
                    "توفير الطاقة",
                    "تركيب حساسات حركة للإضاءة في الممرات.",
                    100,
                ),
            ],
        }
    }

    pub fn projects(&self) -> &[EcoProject] {
        &self.projects
    }

    pub fn get(&self, id: &str) -> Option<&EcoProject> {
        self.projects.iter().find(|p| p.id == id)
    }

    /// Add a planned project. Returns `None` when the title is blank.
    pub fn add(&mut self, title: &str, description: &str) -> Option<&EcoProject> {
        let title = title.trim();
        if title.is_empty() {
            return None;
        }
        let project = EcoProject {
            id: Uuid::new_v4().to_string(),
            title: title.to_owned(),
            description: description.trim().to_owned(),
            progress: 0,
            status: ProjectStatus::Planned,
        };
        info!(id = %project.id, "project added");
        self.projects.push(project);
        self.projects.last()
    }

    /// Record progress (clamped to 100) and update the status.
    ///
    /// Returns `None` when no project has `id`.
    pub fn set_progress(&mut self, id: &str, progress: u8) -> Option<&EcoProject> {
        let project = self.projects.iter_mut().find(|p| p.id == id)?;
        project.progress = progress.min(100);
        project.status = ProjectStatus::for_progress(project.progress);
        debug!(id, progress = project.progress, status = ?project.status, "project progress updated");
        Some(project)
    }
}
