//! `.yarn.txt` container reader (spec §6).
//!
//! A document is a sequence of nodes, each a header block terminated by a
//! bare `---` line, followed by a body block terminated by a bare `===`
//! line. Header fields are `field: value`, one per line. Unlike the
//! original's reflection-driven dispatch onto `NodeInfo` properties, field
//! names are matched through an explicit, closed `match` (Design Notes §9)
//! so an unrecognised field is a deliberate, reviewable decision (logged
//! and skipped) rather than a silent reflection miss.

use super::NodeInfo;
use crate::error::LoadError;

pub fn parse(file: &str, source: &str) -> Result<Vec<NodeInfo>, LoadError> {
    let all_lines: Vec<&str> = source.lines().collect();
    let mut nodes = Vec::new();
    let mut cursor = 0usize;

    while cursor < all_lines.len() {
        while cursor < all_lines.len() && all_lines[cursor].trim().is_empty() {
            cursor += 1;
        }
        if cursor >= all_lines.len() {
            break;
        }

        let mut info = NodeInfo::new(String::new(), Vec::new());
        let mut title_seen = false;
        let mut found_header_sentinel = false;

        while cursor < all_lines.len() {
            let line = all_lines[cursor];
            cursor += 1;
            if line.trim() == "---" {
                found_header_sentinel = true;
                break;
            }
            let (field, value) = line
                .split_once(':')
                .ok_or_else(|| LoadError::MalformedHeaderLine { file: file.to_string(), line: cursor, text: line.to_string() })?;
            let field = field.trim();
            let value = value.trim();
            match field {
                "title" => {
                    info.title = value.to_string();
                    title_seen = true;
                }
                "tags" => info.tags = value.split_whitespace().map(str::to_string).collect(),
                "colorID" => info.color_id = value.parse().ok(),
                "position" => {
                    if let Some((x, y)) = value.split_once(',') {
                        if let (Ok(x), Ok(y)) = (x.trim().parse(), y.trim().parse()) {
                            info.position = Some((x, y));
                        }
                    }
                }
                other => log::warn!("{file}: unknown header field {other:?}, skipping"),
            }
        }

        if !found_header_sentinel {
            return Err(LoadError::MissingHeaderSentinel { file: file.to_string() });
        }
        if !title_seen {
            return Err(LoadError::MissingTitle { file: file.to_string() });
        }

        let mut found_body_sentinel = false;
        while cursor < all_lines.len() {
            let line = all_lines[cursor];
            cursor += 1;
            if line.trim() == "===" {
                found_body_sentinel = true;
                break;
            }
            info.body.push(line.to_string());
        }
        if !found_body_sentinel {
            return Err(LoadError::MissingBodySentinel { file: file.to_string() });
        }

        nodes.push(info);
    }

    Ok(nodes)
}
