//! Single-pass block-graph construction.
//!
//! The parser consumes the token stream once, grouping tokens into lines and
//! lines into basic blocks as it goes. Block boundaries are implicit in the
//! listing: a conditional branch ends its block, a label declaration starts
//! a new one. Label declarations and branch targets are recorded during the
//! pass and resolved afterwards, when every block is known, into mirrored
//! inbound/outbound edge pairs.
//!
//! Labels come in two levels. A name without the `.L` prefix is a global
//! label and opens a scope; `.L`-prefixed names are local to the most recent
//! global label. Targets that resolve to neither table (runtime helpers such
//! as `__divsi3`) are skipped silently.

use std::collections::HashMap;

use crate::source::{FileTable, SourceReader};
use crate::tokenizer::Tokenizer;
use crate::{
    AnalyzeError, AsmBlock, AsmBlockKind, AsmEdge, AsmEdgeKind, AsmLine, AsmLineKind, AsmLineRef,
    AsmToken, AsmTokenKind, Dialect, COLUMN_UNSET,
};

/// Pre-sizing heuristic for the token array: one token per seven input bytes
/// bounds worst-case reallocation on large listings.
const BYTES_PER_TOKEN: usize = 7;

/// Everything the parse pass produces.
pub(crate) struct ParseOutput {
    pub tokens: Vec<AsmToken>,
    pub lines: Vec<AsmLine>,
    pub blocks: Vec<AsmBlock>,
    pub files: FileTable,
}

/// Parse `input` into tokens, lines, blocks, and resolved edges.
///
/// The first physical line of the input is a compiler banner and is
/// discarded wholesale; its tokens do not appear in the output.
pub(crate) fn parse_listing(
    input: &str,
    dialect: Dialect,
    reader: &dyn SourceReader,
) -> Result<ParseOutput, AnalyzeError> {
    if input.len() > u32::MAX as usize {
        return Err(AnalyzeError::Malformed {
            line: 1,
            reason: format!(
                "listing of {} bytes exceeds the 4 GiB model limit",
                input.len()
            ),
        });
    }

    let mut tokenizer = Tokenizer::new(input, dialect);
    let mut parser = Parser::new(input, dialect, reader);

    // Drop the banner line, up to and including its newline.
    loop {
        match tokenizer.try_next()? {
            Some(t) if t.kind == AsmTokenKind::NewLine => break,
            Some(_) => {}
            None => break,
        }
    }

    while let Some(token) = tokenizer.try_next()? {
        parser.push_token(token);
    }
    Ok(parser.finish())
}

/// A global label and the local labels scoped beneath it.
struct GlobalLabel<'a> {
    global_ref: AsmLineRef,
    locals: HashMap<&'a str, AsmLineRef>,
}

/// A branch/jump/call target waiting for the post-parse resolution pass.
struct Deferred<'a> {
    name: &'a str,
    origin: AsmLineRef,
    is_branch: bool,
    /// Global label scope in effect at the branch site.
    global: Option<&'a str>,
}

struct Parser<'a> {
    input: &'a str,
    dialect: Dialect,
    reader: &'a dyn SourceReader,

    tokens: Vec<AsmToken>,
    lines: Vec<AsmLine>,
    blocks: Vec<AsmBlock>,
    files: FileTable,

    /// Index of the current line's first token.
    line_first_token: usize,
    /// Kind decided by the line's first meaningful token.
    line_kind: AsmLineKind,
    /// Index of the current block's first line.
    block_first_line: usize,
    block_kind: AsmBlockKind,

    current_global: Option<&'a str>,
    labels: HashMap<&'a str, GlobalLabel<'a>>,
    deferred: Vec<Deferred<'a>>,
}

impl<'a> Parser<'a> {
    fn new(input: &'a str, dialect: Dialect, reader: &'a dyn SourceReader) -> Self {
        Parser {
            input,
            dialect,
            reader,
            tokens: Vec::with_capacity((input.len() / BYTES_PER_TOKEN).max(64)),
            lines: Vec::new(),
            blocks: Vec::new(),
            files: FileTable::default(),
            line_first_token: 0,
            line_kind: AsmLineKind::None,
            block_first_line: 0,
            block_kind: AsmBlockKind::None,
            current_global: None,
            labels: HashMap::new(),
            deferred: Vec::new(),
        }
    }

    fn push_token(&mut self, token: AsmToken) {
        let meaningful = !matches!(token.kind, AsmTokenKind::Misc | AsmTokenKind::NewLine);
        if meaningful && self.line_kind == AsmLineKind::None {
            let kind = line_kind_of(token.kind);
            // A label declaration opens a fresh block.
            if kind == AsmLineKind::LabelDeclaration {
                self.close_block();
            }
            self.line_kind = kind;
        }

        self.tokens.push(token);
        if token.kind == AsmTokenKind::NewLine {
            self.commit_line();
        }
    }

    /// The position the line being committed will occupy.
    fn next_line_ref(&self) -> AsmLineRef {
        AsmLineRef::new(
            self.blocks.len() as u32,
            (self.lines.len() - self.block_first_line) as u32,
        )
    }

    fn commit_line(&mut self) {
        let first = self.line_first_token;
        let count = self.tokens.len() - first;
        if count == 0 {
            return;
        }
        let mut kind = self.line_kind;
        self.line_first_token = self.tokens.len();
        self.line_kind = AsmLineKind::None;

        // LLVM IR spells most instructions as `%name = op ...`; the mnemonic
        // hides behind the leading value name.
        if kind == AsmLineKind::None
            && self.dialect == Dialect::LlvmIr
            && self.is_value_assignment(first)
        {
            kind = AsmLineKind::Code;
        }

        match kind {
            // File registrations are consumed here; the line is dropped.
            AsmLineKind::SourceFile => {
                self.files
                    .register_from_directive(self.input, &self.tokens[first..], self.reader);
                return;
            }
            AsmLineKind::SourceLocation => {
                let (file, line, column) =
                    crate::source::parse_location(self.input, &self.tokens[first..]);
                self.lines.push(AsmLine::SourceLoc { file, line, column });
                self.apply_block_flag(AsmBlockKind::Code);
                return;
            }
            AsmLineKind::LabelDeclaration => {
                self.register_label(first);
            }
            AsmLineKind::CodeBranch | AsmLineKind::CodeJump | AsmLineKind::CodeCall => {
                self.defer_target(first, kind);
            }
            _ => {}
        }

        self.lines.push(AsmLine::Tokens {
            kind,
            token_index: first as u32,
            token_count: count as u32,
            column_index: COLUMN_UNSET,
        });

        match kind {
            AsmLineKind::Code
            | AsmLineKind::CodeBranch
            | AsmLineKind::CodeJump
            | AsmLineKind::CodeCall
            | AsmLineKind::CodeReturn => self.apply_block_flag(AsmBlockKind::Code),
            AsmLineKind::Data => self.apply_block_flag(AsmBlockKind::Data),
            AsmLineKind::Directive => self.apply_block_flag(AsmBlockKind::Directive),
            _ => {}
        }

        // A conditional branch is the other implicit block boundary.
        if kind == AsmLineKind::CodeBranch {
            self.close_block();
        }
    }

    /// Code wins over any earlier classification; otherwise the first one
    /// seen sticks.
    fn apply_block_flag(&mut self, flag: AsmBlockKind) {
        if flag == AsmBlockKind::Code {
            self.block_kind = AsmBlockKind::Code;
        } else if self.block_kind == AsmBlockKind::None {
            self.block_kind = flag;
        }
    }

    fn close_block(&mut self) {
        let length = self.lines.len() - self.block_first_line;
        if length == 0 {
            return;
        }
        self.blocks.push(AsmBlock {
            kind: self.block_kind,
            line_index: self.block_first_line as u32,
            length: length as u32,
            edges: Vec::new(),
        });
        self.block_first_line = self.lines.len();
        self.block_kind = AsmBlockKind::None;
    }

    fn first_meaningful(&self, first: usize) -> Option<usize> {
        self.tokens[first..]
            .iter()
            .position(|t| !matches!(t.kind, AsmTokenKind::Misc | AsmTokenKind::NewLine))
            .map(|i| first + i)
    }

    /// Is this line an SSA assignment, `%name = <instruction> ...`?
    fn is_value_assignment(&self, first: usize) -> bool {
        let Some(index) = self.first_meaningful(first) else {
            return false;
        };
        if self.tokens[index].kind != AsmTokenKind::Identifier {
            return false;
        }

        let mut saw_equals = false;
        for token in &self.tokens[index + 1..] {
            match token.kind {
                AsmTokenKind::Misc if token.text(self.input) == "=" => saw_equals = true,
                kind if saw_equals && kind.is_instruction() => return true,
                _ => {}
            }
        }
        false
    }

    fn register_label(&mut self, first: usize) {
        let Some(index) = self.first_meaningful(first) else {
            return;
        };
        let name = label_name(self.input, &self.tokens[index]);
        let line_ref = self.next_line_ref();

        if name.starts_with(".L") {
            match self.current_global {
                Some(global) => {
                    if let Some(entry) = self.labels.get_mut(global) {
                        entry.locals.insert(name, line_ref);
                    }
                }
                None => log::debug!("local label `{}` outside any global label scope", name),
            }
            return;
        }

        let entry = self.labels.entry(name).or_insert_with(|| GlobalLabel {
            global_ref: line_ref,
            locals: HashMap::new(),
        });
        entry.global_ref = line_ref;
        self.current_global = Some(name);
    }

    /// Record the first operand of a branch/jump/call for edge resolution,
    /// upgrading it to a label token in place.
    fn defer_target(&mut self, first: usize, kind: AsmLineKind) {
        let Some(mnemonic) = self.first_meaningful(first) else {
            return;
        };
        let operand = self.tokens[mnemonic + 1..]
            .iter()
            .position(|t| t.kind != AsmTokenKind::Misc)
            .map(|i| mnemonic + 1 + i);
        let Some(index) = operand else { return };

        let token = self.tokens[index];
        if token.kind == AsmTokenKind::NewLine || !token.kind.is_label_candidate() {
            return;
        }
        self.tokens[index].kind = AsmTokenKind::Label;

        self.deferred.push(Deferred {
            name: label_name(self.input, &token),
            origin: self.next_line_ref(),
            is_branch: kind == AsmLineKind::CodeBranch,
            global: self.current_global,
        });
    }

    fn finish(mut self) -> ParseOutput {
        self.commit_line();
        self.close_block();
        self.resolve_edges();

        ParseOutput {
            tokens: self.tokens,
            lines: self.lines,
            blocks: self.blocks,
            files: self.files,
        }
    }

    /// Resolve every deferred target and install mirrored edge pairs.
    fn resolve_edges(&mut self) {
        for deferred in std::mem::take(&mut self.deferred) {
            let target = if deferred.name.starts_with(".L") {
                deferred
                    .global
                    .and_then(|g| self.labels.get(g))
                    .and_then(|g| g.locals.get(deferred.name))
                    .copied()
            } else {
                self.labels.get(deferred.name).map(|g| g.global_ref)
            };

            match target {
                Some(target) => add_edge_pair(&mut self.blocks, deferred.origin, target),
                // Runtime helpers and external symbols stay edge-less.
                None => log::debug!("unresolved branch target `{}`", deferred.name),
            }

            if deferred.is_branch {
                let fall_through = deferred.origin.block_index + 1;
                if (fall_through as usize) < self.blocks.len() {
                    add_edge_pair(
                        &mut self.blocks,
                        deferred.origin,
                        AsmLineRef::new(fall_through, 0),
                    );
                } else {
                    log::debug!(
                        "conditional branch in final block {} has no fall-through",
                        deferred.origin.block_index
                    );
                }
            }
        }

        for block in &mut self.blocks {
            block.edges.sort_by_key(|e| {
                (
                    e.kind,
                    e.line_ref.block_index,
                    e.line_ref.line_index,
                    e.origin_ref.block_index,
                    e.origin_ref.line_index,
                )
            });
        }
    }
}

fn add_edge_pair(blocks: &mut [AsmBlock], origin: AsmLineRef, target: AsmLineRef) {
    blocks[origin.block_index as usize].edges.push(AsmEdge {
        kind: AsmEdgeKind::OutBound,
        origin_ref: origin,
        line_ref: target,
    });
    blocks[target.block_index as usize].edges.push(AsmEdge {
        kind: AsmEdgeKind::InBound,
        origin_ref: origin,
        line_ref: target,
    });
}

/// Map the first meaningful token of a line to the line's kind.
fn line_kind_of(kind: AsmTokenKind) -> AsmLineKind {
    match kind {
        AsmTokenKind::Directive => AsmLineKind::Directive,
        AsmTokenKind::SourceFile => AsmLineKind::SourceFile,
        AsmTokenKind::SourceLocation => AsmLineKind::SourceLocation,
        AsmTokenKind::DataDirective => AsmLineKind::Data,
        AsmTokenKind::Instruction | AsmTokenKind::InstructionSimd => AsmLineKind::Code,
        AsmTokenKind::BranchInstruction => AsmLineKind::CodeBranch,
        AsmTokenKind::JumpInstruction => AsmLineKind::CodeJump,
        AsmTokenKind::CallInstruction => AsmLineKind::CodeCall,
        AsmTokenKind::ReturnInstruction => AsmLineKind::CodeReturn,
        AsmTokenKind::Label => AsmLineKind::LabelDeclaration,
        AsmTokenKind::Comment => AsmLineKind::Comment,
        AsmTokenKind::FunctionBegin => AsmLineKind::FunctionBegin,
        AsmTokenKind::FunctionEnd => AsmLineKind::FunctionEnd,
        _ => AsmLineKind::None,
    }
}

/// A label's map key: the lexeme without a trailing colon or quotes.
fn label_name<'a>(input: &'a str, token: &AsmToken) -> &'a str {
    let text = token.text(input);
    let text = text.strip_suffix(':').unwrap_or(text);
    text.strip_prefix('"')
        .and_then(|t| t.strip_suffix('"'))
        .unwrap_or(text)
}
