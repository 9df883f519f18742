//! `.node` container reader (spec §6): the whole file is one node's body,
//! implicitly titled `"Start"`.

use super::NodeInfo;

pub fn parse(source: &str) -> NodeInfo {
    let body = source.lines().map(str::to_string).collect();
    NodeInfo::new("Start", body)
}
