use std::convert::TryFrom;

use crate::errors;
use crate::util;

#[derive(Clone, Debug, Default, PartialEq)]
pub struct Workunit {
    pub name: String,
    pub app_name: String,
    pub rsc_fpops_est: f64,
    pub rsc_fpops_bound: f64,
    pub rsc_memory_bound: f64,
    pub rsc_disk_bound: f64,
}

impl<'a> From<&'a Workunit> for treexml::Element {
    fn from(v: &Workunit) -> treexml::Element {
        util::make_tree_element(
            "workunit",
            vec![
                util::make_text_element("name", &v.name),
                util::make_text_element("app_name", &v.app_name),
                util::make_text_element("rsc_fpops_est", v.rsc_fpops_est),
                util::make_text_element("rsc_fpops_bound", v.rsc_fpops_bound),
                util::make_text_element("rsc_memory_bound", v.rsc_memory_bound),
                util::make_text_element("rsc_disk_bound", v.rsc_disk_bound),
            ],
        )
    }
}

impl<'a> TryFrom<&'a treexml::Element> for Workunit {
    type Error = errors::Error;

    fn try_from(node: &treexml::Element) -> errors::Result<Workunit> {
        let mut e = Workunit::default();
        for n in &node.children {
            util::deserialize_node("name", n, &mut e.name)?;
            util::deserialize_node("app_name", n, &mut e.app_name)?;
            util::deserialize_node("rsc_fpops_est", n, &mut e.rsc_fpops_est)?;
            util::deserialize_node("rsc_fpops_bound", n, &mut e.rsc_fpops_bound)?;
            util::deserialize_node("rsc_memory_bound", n, &mut e.rsc_memory_bound)?;
            util::deserialize_node("rsc_disk_bound", n, &mut e.rsc_disk_bound)?;
        }
        Ok(e)
    }
}
