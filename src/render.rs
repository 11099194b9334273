//! Per-block text rendering.
//!
//! Rendering walks a block's lines and appends each token's original text to
//! an output buffer, optionally wrapped in `<color=#RRGGBB>...</color>` tags
//! chosen from a dark or light palette. Enriched source-location lines are
//! rendered as a `=== file(line, col)` header quoting the referenced source
//! line instead of their original directive text.
//!
//! While rendering, a 0-based visible-character column is tracked per line
//! (color tags contribute nothing) so that a rendered text position can be
//! mapped back to the token that produced it.

use crate::source::FileTable;
use crate::{AsmBlock, AsmLine, AsmToken, AsmTokenKind, Dialect};

/// Column instructions are padded to on Intel.
const INSTRUCTION_COLUMN: u32 = 10;

/// Color table for one theme, as `RRGGBB` hex without the `#`.
pub struct Palette {
    /// Rendered source-location headers.
    pub loc_header: &'static str,
    /// Directives, data directives, function markers.
    pub directive: &'static str,
    /// Identifiers and labels.
    pub identifier: &'static str,
    /// Operand qualifiers.
    pub qualifier: &'static str,
    /// Scalar instructions and control transfers.
    pub instruction: &'static str,
    /// SIMD instructions.
    pub simd: &'static str,
    /// Registers.
    pub register: &'static str,
    /// Numeric literals.
    pub number: &'static str,
    /// String literals.
    pub string: &'static str,
    /// Comments.
    pub comment: &'static str,
}

/// Dark-theme palette.
pub static DARK: Palette = Palette {
    loc_header: "FFFF00",
    directive: "CCCCCC",
    identifier: "d4d4d4",
    qualifier: "DCDCAA",
    instruction: "4EC9B0",
    simd: "C586C0",
    register: "d7ba7d",
    number: "9cdcfe",
    string: "ce9178",
    comment: "6A9955",
};

/// Light-theme palette.
pub static LIGHT: Palette = Palette {
    loc_header: "888800",
    directive: "444444",
    identifier: "1c1c1c",
    qualifier: "267f99",
    instruction: "0451a5",
    simd: "0000ff",
    register: "811f3f",
    number: "007ACC",
    string: "a31515",
    comment: "008000",
};

/// Select the palette for a theme.
pub fn palette(dark_theme: bool) -> &'static Palette {
    if dark_theme {
        &DARK
    } else {
        &LIGHT
    }
}

impl Palette {
    /// Color for a token kind, or `None` for untagged kinds.
    pub fn for_token(&self, kind: AsmTokenKind) -> Option<&'static str> {
        match kind {
            AsmTokenKind::Directive
            | AsmTokenKind::DataDirective
            | AsmTokenKind::FunctionBegin
            | AsmTokenKind::FunctionEnd => Some(self.directive),
            AsmTokenKind::Identifier | AsmTokenKind::Label => Some(self.identifier),
            AsmTokenKind::Qualifier => Some(self.qualifier),
            AsmTokenKind::Instruction
            | AsmTokenKind::BranchInstruction
            | AsmTokenKind::JumpInstruction
            | AsmTokenKind::CallInstruction
            | AsmTokenKind::ReturnInstruction => Some(self.instruction),
            AsmTokenKind::InstructionSimd => Some(self.simd),
            AsmTokenKind::Register => Some(self.register),
            AsmTokenKind::Number => Some(self.number),
            AsmTokenKind::String => Some(self.string),
            AsmTokenKind::Comment => Some(self.comment),
            AsmTokenKind::NewLine
            | AsmTokenKind::Misc
            | AsmTokenKind::SourceFile
            | AsmTokenKind::SourceLocation => None,
        }
    }
}

/// Borrowed view of everything a block render needs.
pub(crate) struct RenderContext<'a> {
    pub input: &'a str,
    pub tokens: &'a [AsmToken],
    pub lines: &'a [AsmLine],
    pub blocks: &'a [AsmBlock],
    pub files: &'a FileTable,
    pub dialect: Dialect,
    pub colored: bool,
    pub palette: &'static Palette,
}

/// The outcome of rendering one block.
pub(crate) struct BlockRender {
    /// Rendered text, one output line per block line.
    pub text: String,
    /// Per line: the starting column of every token after the first.
    pub line_columns: Vec<Vec<u32>>,
}

/// Render one block to text, tracking token columns as a side product.
pub(crate) fn render_block(ctx: &RenderContext<'_>, block_index: usize) -> BlockRender {
    let block = &ctx.blocks[block_index];
    let mut text = String::new();
    let mut line_columns = Vec::with_capacity(block.length as usize);

    for line in &ctx.lines[block.line_range()] {
        match line {
            AsmLine::SourceLoc { file, line, column } => {
                render_location(ctx, *file, *line, *column, &mut text);
                line_columns.push(Vec::new());
            }
            AsmLine::Tokens {
                token_index,
                token_count,
                ..
            } => {
                let tokens =
                    &ctx.tokens[*token_index as usize..(*token_index + *token_count) as usize];
                line_columns.push(render_tokens(ctx, tokens, &mut text));
            }
        }
    }

    BlockRender { text, line_columns }
}

/// Render one line's tokens; returns the start column of each token after
/// the first.
fn render_tokens(ctx: &RenderContext<'_>, tokens: &[AsmToken], out: &mut String) -> Vec<u32> {
    let mut columns = Vec::with_capacity(tokens.len().saturating_sub(1));
    let mut column = 0u32;

    for (i, token) in tokens.iter().enumerate() {
        if i > 0 {
            columns.push(column);
        }

        if token.kind == AsmTokenKind::NewLine {
            out.push('\n');
            continue;
        }

        let piece = token.text(ctx.input);
        match ctx.palette.for_token(token.kind) {
            Some(color) if ctx.colored => {
                out.push_str("<color=#");
                out.push_str(color);
                out.push('>');
                out.push_str(piece);
                out.push_str("</color>");
            }
            _ => out.push_str(piece),
        }
        column += piece.chars().count() as u32;

        // Intel listings align operands to a fixed column, unless the
        // mnemonic is the last thing on the line.
        if ctx.dialect == Dialect::Intel
            && token.kind.is_instruction()
            && i + 2 < tokens.len()
        {
            while column < INSTRUCTION_COLUMN {
                out.push(' ');
                column += 1;
            }
        }
    }

    columns
}

/// Render a `=== file(line, col)` header for an enriched location line.
///
/// A zero file number (or one that was never registered) suppresses the
/// header; a zero line number renders the file indicator alone.
fn render_location(ctx: &RenderContext<'_>, file: u32, line: u32, column: u32, out: &mut String) {
    let entry = if file == 0 { None } else { ctx.files.get(file) };
    let Some(entry) = entry else {
        out.push('\n');
        return;
    };

    let mut header = String::new();
    header.push_str("=== ");
    header.push_str(entry.basename());
    if line > 0 {
        header.push_str(&format!("({}, {})", line, column + 1));
        if let Some(text) = entry
            .lines
            .as_ref()
            .and_then(|lines| lines.get(line as usize - 1))
        {
            header.push_str(text);
        }
    }

    if ctx.colored {
        out.push_str("<color=#");
        out.push_str(ctx.palette.loc_header);
        out.push('>');
        out.push_str(&header);
        out.push_str("</color>");
    } else {
        out.push_str(&header);
    }
    out.push('\n');
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parser::parse_listing;
    use crate::source::NullSourceReader;

    fn render(input: &str, dialect: Dialect, colored: bool) -> String {
        let out = parse_listing(input, dialect, &NullSourceReader).expect("parse failed");
        let ctx = RenderContext {
            input,
            tokens: &out.tokens,
            lines: &out.lines,
            blocks: &out.blocks,
            files: &out.files,
            dialect,
            colored,
            palette: palette(true),
        };
        (0..out.blocks.len())
            .map(|i| render_block(&ctx, i).text)
            .collect()
    }

    #[test]
    fn test_plain_render_reproduces_the_listing() {
        // ARM has no alignment column, so plain rendering is byte-identical
        // to the input minus the banner line.
        let input = "banner\nf:\n  mov x0, #0\n  ret\n";
        assert_eq!(render(input, Dialect::Arm, false), "f:\n  mov x0, #0\n  ret\n");
    }

    #[test]
    fn test_intel_alignment_pads_to_column_ten() {
        let rendered = render("banner\n  mulps x,x,x\n", Dialect::Intel, false);
        // `  mulps` ends at column 7; three pad spaces reach column 10, the
        // original separator space follows.
        assert_eq!(rendered, "  mulps    x,x,x\n");

        let rendered = render("banner\nshufps x,x,x\n", Dialect::Intel, false);
        // `shufps` ends at column 6; four pad spaces reach column 10.
        assert_eq!(rendered, "shufps     x,x,x\n");
    }

    #[test]
    fn test_no_alignment_when_mnemonic_ends_the_line() {
        let rendered = render("banner\n  ret\n", Dialect::Intel, false);
        assert_eq!(rendered, "  ret\n");
    }

    #[test]
    fn test_colored_tokens_are_wrapped() {
        let rendered = render("banner\n  ret\n", Dialect::Intel, true);
        assert_eq!(rendered, "  <color=#4EC9B0>ret</color>\n");
    }

    #[test]
    fn test_newline_tokens_are_never_wrapped() {
        let rendered = render("banner\n  ret\n\n", Dialect::Intel, true);
        assert!(rendered.ends_with("</color>\n\n"));
    }

    #[test]
    fn test_palette_covers_the_kind_table() {
        assert_eq!(DARK.for_token(AsmTokenKind::Instruction), Some("4EC9B0"));
        assert_eq!(DARK.for_token(AsmTokenKind::InstructionSimd), Some("C586C0"));
        assert_eq!(DARK.for_token(AsmTokenKind::Register), Some("d7ba7d"));
        assert_eq!(LIGHT.for_token(AsmTokenKind::Number), Some("007ACC"));
        assert_eq!(LIGHT.for_token(AsmTokenKind::Comment), Some("008000"));
        assert_eq!(DARK.for_token(AsmTokenKind::NewLine), None);
        assert_eq!(DARK.for_token(AsmTokenKind::Misc), None);
    }

    #[test]
    fn test_columns_ignore_color_tags() {
        let input = "banner\n  mov eax, 1\n";
        let out = parse_listing(input, Dialect::Intel, &NullSourceReader).unwrap();
        let plain_ctx = RenderContext {
            input,
            tokens: &out.tokens,
            lines: &out.lines,
            blocks: &out.blocks,
            files: &out.files,
            dialect: Dialect::Intel,
            colored: false,
            palette: palette(true),
        };
        let colored_ctx = RenderContext {
            input,
            tokens: &out.tokens,
            lines: &out.lines,
            blocks: &out.blocks,
            files: &out.files,
            dialect: Dialect::Intel,
            colored: true,
            palette: palette(true),
        };

        let plain = render_block(&plain_ctx, 0);
        let colored = render_block(&colored_ctx, 0);
        assert_eq!(plain.line_columns, colored.line_columns);
    }
}
