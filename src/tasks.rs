use std::convert::TryFrom;

use crate::errors;
use crate::util;

/// `active_task_state` of a task whose process is running.
pub const PROCESS_EXECUTING: i32 = 1;

/// Runtime record of a task, present in a `<result>` only while the task has a process.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct ActiveTask {
    pub active_task_state: i32,
    pub checkpoint_cpu_time: f64,
    pub elapsed_time: f64,
    pub working_set_size: f64,
    pub progress_rate: f64,
    pub fraction_done: f64,
}

impl ActiveTask {
    pub fn is_executing(&self) -> bool {
        self.active_task_state == PROCESS_EXECUTING
    }
}

impl<'a> From<&'a ActiveTask> for treexml::Element {
    fn from(v: &ActiveTask) -> treexml::Element {
        util::make_tree_element(
            "active_task",
            vec![
                util::make_text_element("active_task_state", v.active_task_state),
                util::make_text_element("checkpoint_cpu_time", v.checkpoint_cpu_time),
                util::make_text_element("elapsed_time", v.elapsed_time),
                util::make_text_element("working_set_size", v.working_set_size),
                util::make_text_element("progress_rate", v.progress_rate),
                util::make_text_element("fraction_done", v.fraction_done),
            ],
        )
    }
}

impl<'a> TryFrom<&'a treexml::Element> for ActiveTask {
    type Error = errors::Error;

    fn try_from(node: &treexml::Element) -> errors::Result<ActiveTask> {
        let mut e = ActiveTask::default();
        for n in &node.children {
            util::deserialize_node("active_task_state", n, &mut e.active_task_state)?;
            util::deserialize_node("checkpoint_cpu_time", n, &mut e.checkpoint_cpu_time)?;
            util::deserialize_node("elapsed_time", n, &mut e.elapsed_time)?;
            util::deserialize_node("working_set_size", n, &mut e.working_set_size)?;
            util::deserialize_node("progress_rate", n, &mut e.progress_rate)?;
            util::deserialize_node("fraction_done", n, &mut e.fraction_done)?;
        }
        Ok(e)
    }
}

/// One task instance, reported by the client as `<result>`.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct Task {
    pub name: String,
    pub wu_name: String,
    pub project_url: String,
    pub platform: String,
    pub resources: String,
    pub state: i32,

    pub estimated_cpu_time_remaining: f64,
    pub final_cpu_time: f64,
    pub final_elapsed_time: f64,

    /// Zero-valued when the reply has no `<active_task>`.
    pub active_task: ActiveTask,
    /// Set by the mere presence of `<ready_to_report/>`.
    pub ready_to_report: bool,
}

impl Task {
    pub fn uses_gpu(&self) -> bool {
        self.resources.contains(crate::constants::GPU_RESOURCE_MARKER)
    }
}

impl<'a> From<&'a Task> for treexml::Element {
    fn from(v: &Task) -> treexml::Element {
        let mut children = vec![
            util::make_text_element("name", &v.name),
            util::make_text_element("wu_name", &v.wu_name),
            util::make_text_element("project_url", &v.project_url),
            util::make_text_element("platform", &v.platform),
            util::make_text_element("resources", &v.resources),
            util::make_text_element("state", v.state),
            util::make_text_element(
                "estimated_cpu_time_remaining",
                v.estimated_cpu_time_remaining,
            ),
            util::make_text_element("final_cpu_time", v.final_cpu_time),
            util::make_text_element("final_elapsed_time", v.final_elapsed_time),
        ];
        if v.active_task != ActiveTask::default() {
            children.push((&v.active_task).into());
        }
        if v.ready_to_report {
            children.push(treexml::Element::new("ready_to_report"));
        }
        util::make_tree_element("result", children)
    }
}

impl<'a> TryFrom<&'a treexml::Element> for Task {
    type Error = errors::Error;

    fn try_from(node: &treexml::Element) -> errors::Result<Task> {
        let mut e = Task::default();
        for n in &node.children {
            match n.name.as_str() {
                "active_task" => e.active_task = ActiveTask::try_from(n)?,
                "ready_to_report" => e.ready_to_report = true,
                _ => {
                    util::deserialize_node("name", n, &mut e.name)?;
                    util::deserialize_node("wu_name", n, &mut e.wu_name)?;
                    util::deserialize_node("project_url", n, &mut e.project_url)?;
                    util::deserialize_node("platform", n, &mut e.platform)?;
                    util::deserialize_node("resources", n, &mut e.resources)?;
                    util::deserialize_node("state", n, &mut e.state)?;
                    util::deserialize_node(
                        "estimated_cpu_time_remaining",
                        n,
                        &mut e.estimated_cpu_time_remaining,
                    )?;
                    util::deserialize_node("final_cpu_time", n, &mut e.final_cpu_time)?;
                    util::deserialize_node("final_elapsed_time", n, &mut e.final_elapsed_time)?;
                }
            }
        }
        Ok(e)
    }
}
