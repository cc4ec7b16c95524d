//! Fills in the hook of every suite that only names its project.

use std::collections::HashMap;

use thiserror::Error;
use tracing::debug;

use crate::{
    api::{ApiError, ApiTester, Hook, ProjectMeta},
    config::Suite,
};

#[derive(Debug, Error)]
pub enum HookError {
    #[error("failed to list projects: {0}")]
    ListProjects(ApiError),
    #[error("suite {suite:?}: could not find project named {project:?}")]
    ProjectNotFound { suite: String, project: String },
    #[error("suite {suite:?}: failed to list hooks of project {project:?}: {source}")]
    ListHooks {
        suite: String,
        project: String,
        source: ApiError,
    },
    #[error("suite {suite:?}: project {project:?} has no hooks; create one in the web app first")]
    NoHooks { suite: String, project: String },
}

/// Resolves the hook id of every suite that has none, using the first hook of the project the
/// suite names.
///
/// Every suite is attempted. All failures are returned together.
pub async fn resolve_hook_ids(
    api: &dyn ApiTester,
    suites: &mut [Suite],
) -> Result<(), Vec<HookError>> {
    if suites.iter().all(|s| !s.hook_id.is_empty()) {
        return Ok(());
    }

    let projects = api
        .get_projects()
        .await
        .map_err(|e| vec![HookError::ListProjects(e)])?;

    let mut hooks_by_project: HashMap<String, Vec<Hook>> = HashMap::new();
    let mut errors = vec![];

    for suite in suites.iter_mut().filter(|s| s.hook_id.is_empty()) {
        let project = match find_project(&projects, &suite.project_name) {
            Some(project) => project,
            None => {
                errors.push(HookError::ProjectNotFound {
                    suite: suite.name.clone(),
                    project: suite.project_name.clone(),
                });
                continue;
            }
        };

        if !hooks_by_project.contains_key(&project.id) {
            match api.get_hooks(&project.id).await {
                Ok(hooks) => {
                    hooks_by_project.insert(project.id.clone(), hooks);
                }
                Err(source) => {
                    errors.push(HookError::ListHooks {
                        suite: suite.name.clone(),
                        project: suite.project_name.clone(),
                        source,
                    });
                    continue;
                }
            }
        }

        let first_hook = hooks_by_project
            .get(&project.id)
            .and_then(|hooks| hooks.first());
        match first_hook {
            Some(hook) => {
                debug!(suite = %suite.name, hook = %hook.name, "resolved hook");
                suite.hook_id = hook.identifier.clone();
                if suite.project_id.is_empty() {
                    suite.project_id = project.id.clone();
                }
            }
            None => errors.push(HookError::NoHooks {
                suite: suite.name.clone(),
                project: suite.project_name.clone(),
            }),
        }
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}

fn find_project<'a>(projects: &'a [ProjectMeta], name: &str) -> Option<&'a ProjectMeta> {
    projects.iter().find(|p| p.name == name)
}
