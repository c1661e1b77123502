use std::convert::TryFrom;

use crate::errors;
use crate::util;

#[derive(Clone, Debug, Default, PartialEq)]
pub struct AppVersion {
    pub app_name: String,
    pub version_num: i32,
    pub platform: String,
}

impl AppVersion {
    /// `version_num` is hundredths: 712 reads as "7.12".
    pub fn version_string(&self) -> String {
        format!("{:.2}", f64::from(self.version_num) / 100.0)
    }
}

impl<'a> From<&'a AppVersion> for treexml::Element {
    fn from(v: &AppVersion) -> treexml::Element {
        util::make_tree_element(
            "app_version",
            vec![
                util::make_text_element("app_name", &v.app_name),
                util::make_text_element("version_num", v.version_num),
                util::make_text_element("platform", &v.platform),
            ],
        )
    }
}

impl<'a> TryFrom<&'a treexml::Element> for AppVersion {
    type Error = errors::Error;

    fn try_from(node: &treexml::Element) -> errors::Result<AppVersion> {
        let mut e = AppVersion::default();
        for n in &node.children {
            util::deserialize_node("app_name", n, &mut e.app_name)?;
            util::deserialize_node("version_num", n, &mut e.version_num)?;
            util::deserialize_node("platform", n, &mut e.platform)?;
        }
        Ok(e)
    }
}

#[derive(Clone, Debug, Default, PartialEq)]
pub struct App {
    pub name: String,
    pub user_friendly_name: String,
    pub non_cpu_intensive: bool,
}

impl<'a> From<&'a App> for treexml::Element {
    fn from(v: &App) -> treexml::Element {
        util::make_tree_element(
            "app",
            vec![
                util::make_text_element("name", &v.name),
                util::make_text_element("user_friendly_name", &v.user_friendly_name),
                util::make_text_element("non_cpu_intensive", u8::from(v.non_cpu_intensive)),
            ],
        )
    }
}

impl<'a> TryFrom<&'a treexml::Element> for App {
    type Error = errors::Error;

    fn try_from(node: &treexml::Element) -> errors::Result<App> {
        let mut e = App::default();
        for n in &node.children {
            util::deserialize_node("name", n, &mut e.name)?;
            util::deserialize_node("user_friendly_name", n, &mut e.user_friendly_name)?;
            util::deserialize_flag("non_cpu_intensive", n, &mut e.non_cpu_intensive)?;
        }
        Ok(e)
    }
}
