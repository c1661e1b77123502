use std::convert::TryFrom;

use crate::errors;
use crate::util;

/// A project the client is attached to, as reported in `<project>`.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct Project {
    pub master_url: String,
    pub project_name: String,

    pub user_total_credit: f64,
    pub user_expavg_credit: f64,
    pub host_total_credit: f64,
    pub host_expavg_credit: f64,

    pub njobs_success: i64,
    pub njobs_error: i64,
    pub elapsed_time: f64,
}

impl<'a> From<&'a Project> for treexml::Element {
    fn from(v: &Project) -> treexml::Element {
        util::make_tree_element(
            "project",
            vec![
                util::make_text_element("master_url", &v.master_url),
                util::make_text_element("project_name", &v.project_name),
                util::make_text_element("user_total_credit", v.user_total_credit),
                util::make_text_element("user_expavg_credit", v.user_expavg_credit),
                util::make_text_element("host_total_credit", v.host_total_credit),
                util::make_text_element("host_expavg_credit", v.host_expavg_credit),
                util::make_text_element("njobs_success", v.njobs_success),
                util::make_text_element("njobs_error", v.njobs_error),
                util::make_text_element("elapsed_time", v.elapsed_time),
            ],
        )
    }
}

impl<'a> TryFrom<&'a treexml::Element> for Project {
    type Error = errors::Error;

    fn try_from(node: &treexml::Element) -> errors::Result<Project> {
        let mut e = Project::default();
        for n in &node.children {
            util::deserialize_node("master_url", n, &mut e.master_url)?;
            util::deserialize_node("project_name", n, &mut e.project_name)?;
            util::deserialize_node("user_total_credit", n, &mut e.user_total_credit)?;
            util::deserialize_node("user_expavg_credit", n, &mut e.user_expavg_credit)?;
            util::deserialize_node("host_total_credit", n, &mut e.host_total_credit)?;
            util::deserialize_node("host_expavg_credit", n, &mut e.host_expavg_credit)?;
            util::deserialize_node("njobs_success", n, &mut e.njobs_success)?;
            util::deserialize_node("njobs_error", n, &mut e.njobs_error)?;
            util::deserialize_node("elapsed_time", n, &mut e.elapsed_time)?;
        }
        Ok(e)
    }
}
