//! Joins between the entity lists of a [`ClientState`].
//!
//! The client reports projects, results, work units, apps and app versions as
//! flat lists that refer to each other by name. [`Resolver`] indexes one
//! snapshot once so the formatter can follow those references cheaply. When a
//! key occurs more than once, the first entry in reply order wins.

use std::collections::HashMap;

use crate::app::{App, AppVersion};
use crate::projects::Project;
use crate::state::ClientState;
use crate::workunit::Workunit;

/// Work unit name a result belongs to: the result name up to its last underscore.
///
/// `h1_0730.60_O3aC01Cl1In0_2` belongs to `h1_0730.60_O3aC01Cl1In0`.
/// A name without an underscore is its own key.
pub fn work_unit_key(task_name: &str) -> &str {
    match task_name.rfind('_') {
        Some(i) => &task_name[..i],
        None => task_name,
    }
}

fn index_first<'a, T, F>(items: &'a [T], key: F) -> HashMap<&'a str, &'a T>
where
    F: Fn(&'a T) -> &'a str,
{
    let mut out = HashMap::with_capacity(items.len());
    for item in items {
        out.entry(key(item)).or_insert(item);
    }
    out
}

#[derive(Clone, Copy, Debug, Default, PartialEq)]
struct ActiveCount {
    all: usize,
    gpu: usize,
}

pub struct Resolver<'a> {
    projects: HashMap<&'a str, &'a Project>,
    workunits: HashMap<&'a str, &'a Workunit>,
    app_versions: HashMap<&'a str, &'a AppVersion>,
    apps: HashMap<&'a str, &'a App>,
    active: HashMap<&'a str, ActiveCount>,
}

impl<'a> Resolver<'a> {
    pub fn new(state: &'a ClientState) -> Resolver<'a> {
        let mut active: HashMap<&'a str, ActiveCount> = HashMap::new();
        for task in state.results.iter().filter(|t| t.active_task.is_executing()) {
            let count = active.entry(task.project_url.as_str()).or_default();
            count.all += 1;
            if task.uses_gpu() {
                count.gpu += 1;
            }
        }

        Resolver {
            projects: index_first(&state.projects, |p| p.master_url.as_str()),
            workunits: index_first(&state.workunits, |wu| wu.name.as_str()),
            app_versions: index_first(&state.app_versions, |v| v.app_name.as_str()),
            apps: index_first(&state.apps, |a| a.name.as_str()),
            active,
        }
    }

    pub fn project_by_url(&self, url: &str) -> Option<&'a Project> {
        self.projects.get(url).copied()
    }

    /// Display name of the project at `url`, empty if the client does not know it.
    pub fn project_name_by_url(&self, url: &str) -> &'a str {
        self.project_by_url(url)
            .map(|p| p.project_name.as_str())
            .unwrap_or("")
    }

    pub fn work_unit_for_task(&self, task_name: &str) -> Option<&'a Workunit> {
        self.workunits.get(work_unit_key(task_name)).copied()
    }

    /// "<version> <user friendly app name>" for the app behind work unit `wu_name`.
    ///
    /// Either half is left empty when it cannot be resolved.
    pub fn application_label(&self, wu_name: &str) -> String {
        let app_name = self
            .workunits
            .get(wu_name)
            .map(|wu| wu.app_name.as_str())
            .unwrap_or("");

        let mut label = self
            .app_versions
            .get(app_name)
            .map(|v| v.version_string())
            .unwrap_or_default();
        if let Some(app) = self.apps.get(app_name) {
            label.push(' ');
            label.push_str(&app.user_friendly_name);
        }
        label
    }

    /// Number of executing tasks of `project`; with `gpu_only`, only those using a GPU.
    pub fn active_task_count(&self, project: &Project, gpu_only: bool) -> usize {
        let count = self
            .active
            .get(project.master_url.as_str())
            .copied()
            .unwrap_or_default();
        if gpu_only {
            count.gpu
        } else {
            count.all
        }
    }
}
