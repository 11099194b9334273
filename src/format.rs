//! JSON export of the analyzed model.
//!
//! The block graph serializes naturally because every cross-reference is an
//! index pair, never a pointer. The export carries block kinds, line kinds
//! with their original text (or the `(file, line, column)` triple for
//! enriched location lines), and both directions of every edge.

use serde::Serialize;

use crate::{AnalyzeError, AsmBlock, AsmEdge, AsmLine, AsmLineKind, AsmToken, Dialect};

#[derive(Serialize)]
struct ListingJson<'a> {
    dialect: Dialect,
    blocks: Vec<BlockJson<'a>>,
}

#[derive(Serialize)]
struct BlockJson<'a> {
    index: usize,
    kind: crate::AsmBlockKind,
    first_line: u32,
    line_count: u32,
    lines: Vec<LineJson<'a>>,
    edges: Vec<EdgeJson>,
}

#[derive(Serialize)]
struct LineJson<'a> {
    kind: AsmLineKind,
    #[serde(skip_serializing_if = "Option::is_none")]
    text: Option<&'a str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    location: Option<[u32; 3]>,
}

#[derive(Serialize)]
struct EdgeJson {
    kind: crate::AsmEdgeKind,
    origin: [u32; 2],
    target: [u32; 2],
}

impl From<&AsmEdge> for EdgeJson {
    fn from(edge: &AsmEdge) -> Self {
        EdgeJson {
            kind: edge.kind,
            origin: [edge.origin_ref.block_index, edge.origin_ref.line_index],
            target: [edge.line_ref.block_index, edge.line_ref.line_index],
        }
    }
}

/// Serialize the model to pretty-printed JSON.
pub(crate) fn to_json(
    input: &str,
    dialect: Dialect,
    tokens: &[AsmToken],
    lines: &[AsmLine],
    blocks: &[AsmBlock],
) -> Result<String, AnalyzeError> {
    let blocks_json = blocks
        .iter()
        .enumerate()
        .map(|(index, block)| BlockJson {
            index,
            kind: block.kind,
            first_line: block.line_index,
            line_count: block.length,
            lines: lines[block.line_range()]
                .iter()
                .map(|line| line_to_json(input, tokens, line))
                .collect(),
            edges: block.edges.iter().map(EdgeJson::from).collect(),
        })
        .collect();

    let listing = ListingJson {
        dialect,
        blocks: blocks_json,
    };
    Ok(serde_json::to_string_pretty(&listing)?)
}

fn line_to_json<'a>(input: &'a str, tokens: &[AsmToken], line: &AsmLine) -> LineJson<'a> {
    match line {
        AsmLine::Tokens { .. } => {
            let range = line.token_range().unwrap_or(0..0);
            let text = if range.is_empty() {
                ""
            } else {
                let first = &tokens[range.start];
                let last = &tokens[range.end - 1];
                input[first.offset as usize..(last.offset + last.length) as usize]
                    .trim_end_matches(['\n', '\r'])
            };
            LineJson {
                kind: line.kind(),
                text: Some(text),
                location: None,
            }
        }
        AsmLine::SourceLoc { file, line, column } => LineJson {
            kind: AsmLineKind::SourceFileLocation,
            text: None,
            location: Some([*file, *line, *column]),
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parser::parse_listing;
    use crate::source::NullSourceReader;

    #[test]
    fn test_json_structure() {
        let input = "banner\nL1:\n  jmp L2\nL2:\n  ret\n";
        let out = parse_listing(input, Dialect::Intel, &NullSourceReader).unwrap();
        let json = to_json(input, Dialect::Intel, &out.tokens, &out.lines, &out.blocks).unwrap();

        let value: serde_json::Value = serde_json::from_str(&json).unwrap();
        assert_eq!(value["dialect"], "Intel");

        let blocks = value["blocks"].as_array().unwrap();
        assert_eq!(blocks.len(), 2);
        assert_eq!(blocks[0]["kind"], "Code");
        assert_eq!(blocks[0]["lines"][0]["text"], "L1:");
        assert_eq!(blocks[0]["lines"][1]["text"], "  jmp L2");

        // The jump edge appears outbound on block 0 and inbound on block 1.
        assert_eq!(blocks[0]["edges"][0]["kind"], "OutBound");
        assert_eq!(blocks[0]["edges"][0]["target"], serde_json::json!([1, 0]));
        assert_eq!(blocks[1]["edges"][0]["kind"], "InBound");
    }

    #[test]
    fn test_enriched_lines_serialize_their_location() {
        let input = "banner\n\t.file\t1 \"/tmp/x.c\"\n\t.loc\t1 42 7\n  ret\n";
        let out = parse_listing(input, Dialect::Intel, &NullSourceReader).unwrap();
        let json = to_json(input, Dialect::Intel, &out.tokens, &out.lines, &out.blocks).unwrap();

        let value: serde_json::Value = serde_json::from_str(&json).unwrap();
        let lines = value["blocks"][0]["lines"].as_array().unwrap();
        assert_eq!(lines[0]["kind"], "SourceFileLocation");
        assert_eq!(lines[0]["location"], serde_json::json!([1, 42, 7]));
    }
}
