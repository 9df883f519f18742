//! `.json` container reader (spec §6): an array of `NodeInfo` records with
//! the same field semantics as the text container's header block.

use serde::Deserialize;

use super::NodeInfo;
use crate::error::LoadError;

#[derive(Debug, Deserialize)]
struct JsonNode {
    title: String,
    #[serde(default)]
    body: Vec<String>,
    #[serde(default)]
    tags: Vec<String>,
    #[serde(default, rename = "colorID")]
    color_id: Option<i32>,
    #[serde(default)]
    position: Option<JsonPosition>,
}

#[derive(Debug, Deserialize)]
struct JsonPosition {
    x: f32,
    y: f32,
}

pub fn parse(file: &str, source: &str) -> Result<Vec<NodeInfo>, LoadError> {
    let raw: Vec<JsonNode> = serde_json::from_str(source).map_err(|e| LoadError::Json { file: file.to_string(), source: e.to_string() })?;

    Ok(raw
        .into_iter()
        .map(|n| NodeInfo {
            title: n.title,
            body: n.body,
            tags: n.tags,
            color_id: n.color_id,
            position: n.position.map(|p| (p.x, p.y)),
        })
        .collect())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn array_of_node_records_parses_into_node_infos() {
        let source = r#"[{"title":"Start","body":["Hello"],"tags":["rawText"]}]"#;
        let nodes = parse("test.json", source).unwrap();
        assert_eq!(nodes.len(), 1);
        assert_eq!(nodes[0].title, "Start");
        assert_eq!(nodes[0].body, vec!["Hello".to_string()]);
        assert_eq!(nodes[0].tags, vec!["rawText".to_string()]);
    }

    #[test]
    fn malformed_json_is_a_load_error() {
        let err = parse("test.json", "not json").unwrap_err();
        assert!(matches!(err, LoadError::Json { .. }));
    }

    #[test]
    fn missing_optional_fields_default_sensibly() {
        let source = r#"[{"title":"Start"}]"#;
        let nodes = parse("test.json", source).unwrap();
        assert!(nodes[0].body.is_empty());
        assert!(nodes[0].tags.is_empty());
        assert_eq!(nodes[0].color_id, None);
    }
}
