use std::convert::TryFrom;

use crate::app;
use crate::errors;
use crate::projects;
use crate::tasks;
use crate::util;
use crate::workunit;

/// Everything one `get_state` reply says about the client, in reply order.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct ClientState {
    pub projects: Vec<projects::Project>,
    pub results: Vec<tasks::Task>,
    pub apps: Vec<app::App>,
    pub app_versions: Vec<app::AppVersion>,
    pub workunits: Vec<workunit::Workunit>,
}

impl<'a> From<&'a ClientState> for treexml::Element {
    fn from(v: &ClientState) -> treexml::Element {
        let mut children = Vec::new();
        children.extend(v.projects.iter().map(treexml::Element::from));
        children.extend(v.apps.iter().map(treexml::Element::from));
        children.extend(v.app_versions.iter().map(treexml::Element::from));
        children.extend(v.workunits.iter().map(treexml::Element::from));
        children.extend(v.results.iter().map(treexml::Element::from));
        util::make_tree_element("client_state", children)
    }
}

impl<'a> TryFrom<&'a treexml::Element> for ClientState {
    type Error = errors::Error;

    fn try_from(node: &treexml::Element) -> errors::Result<ClientState> {
        let mut e = ClientState::default();
        for n in &node.children {
            match n.name.as_str() {
                "project" => e.projects.push(projects::Project::try_from(n)?),
                "result" => e.results.push(tasks::Task::try_from(n)?),
                "app" => e.apps.push(app::App::try_from(n)?),
                "app_version" => e.app_versions.push(app::AppVersion::try_from(n)?),
                "workunit" => e.workunits.push(workunit::Workunit::try_from(n)?),
                _ => {}
            }
        }
        Ok(e)
    }
}

impl ClientState {
    /// Decodes a `<boinc_gui_rpc_reply>`. A reply without `<client_state>` is an empty state.
    pub fn from_reply(reply: &treexml::Element) -> errors::Result<ClientState> {
        match util::find_child(reply, "client_state") {
            Some(node) => ClientState::try_from(node),
            None => Ok(ClientState::default()),
        }
    }
}
