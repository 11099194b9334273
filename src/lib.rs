//! Core model, traits, and dispatch for the asmgraph listing analyzer.
//!
//! This library turns a textual assembly listing (as emitted by a backend
//! compiler in Intel x86, AArch64, WebAssembly text, or LLVM IR syntax) into
//! a structured, queryable model: tokens, lines, basic blocks, and a
//! control-flow edge graph resolved from branch/jump targets and labels. The
//! same model drives a pretty-printer that can substitute `.loc`/`.cv_loc`
//! directives with the quoted source line they point at, optionally wrapping
//! every token in a color tag.
//!
//! # Basic Usage
//!
//! ```rust
//! use asmgraph::{Disassembler, Dialect, RenderOptions};
//!
//! let listing = "\
//! ; While compiling job: example
//! main:
//!   ret
//! ";
//!
//! let mut disasm = Disassembler::new();
//! assert!(disasm.initialize(listing, Dialect::Intel, RenderOptions::plain()));
//!
//! // One block of straight-line code, ending in a return.
//! assert_eq!(disasm.blocks().len(), 1);
//! let text = disasm.render_full_text();
//! assert!(text.contains("ret"));
//! ```
//!
//! All cross-references in the model are indices into flat arrays owned by
//! the [`Disassembler`]; no entity holds a pointer to another. Tokens are
//! `(offset, length)` views into the input buffer and no substring is copied
//! until rendering.

pub mod dialect;
pub mod format;
pub mod parser;
pub mod render;
pub mod source;
pub mod tokenizer;

mod disassembler;
mod listing_tests;

pub use dialect::DialectClassifier;
pub use disassembler::{ColumnHit, Disassembler, RenderOptions};
pub use source::{FsSourceReader, SourceReader};

use std::fmt;

use clap::ValueEnum;
use serde::Serialize;

/// Sentinel for an [`AsmLine`] whose column indices have not been populated
/// yet (they are filled in as a side effect of the first render).
pub const COLUMN_UNSET: u32 = u32::MAX;

/// The four assembly/IR dialects the analyzer understands.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, ValueEnum, Serialize)]
pub enum Dialect {
    /// x86 / x86-64, Intel syntax.
    Intel,
    /// AArch64 ARM assembly.
    Arm,
    /// WebAssembly text format.
    Wasm,
    /// LLVM intermediate representation.
    LlvmIr,
}

impl fmt::Display for Dialect {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Dialect::Intel => write!(f, "x86 Intel"),
            Dialect::Arm => write!(f, "AArch64"),
            Dialect::Wasm => write!(f, "WebAssembly"),
            Dialect::LlvmIr => write!(f, "LLVM IR"),
        }
    }
}

/// Classification of a lexed token.
///
/// The tokenizer produces the structural kinds (`NewLine`, `Misc`, `Comment`,
/// `Number`, `String`, `Label`, `Directive`) directly; identifier-shaped
/// lexemes are refined into the semantic kinds by the per-dialect
/// [`DialectClassifier`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum AsmTokenKind {
    /// Line terminator (LF or CRLF).
    NewLine,
    /// Insignificant whitespace or punctuation; callers skip these.
    Misc,
    /// Comment from the dialect's comment prefix to end of line.
    Comment,
    /// Numeric literal (decimal, hex, or float).
    Number,
    /// Double-quoted string literal, escapes included verbatim.
    String,
    /// Unclassified identifier (symbol reference, local-label reference).
    Identifier,
    /// Label declaration (`name:`, colon included in the slice) or a
    /// branch/jump operand upgraded during edge resolution.
    Label,
    /// Assembler directive (leading `.`) with no special meaning here.
    Directive,
    /// Directive that introduces data (`.byte`, `.quad`, `.asciz`, ...).
    DataDirective,
    /// `.file` / `.cv_file` directive token.
    SourceFile,
    /// `.loc` / `.cv_loc` directive token.
    SourceLocation,
    /// Scalar instruction mnemonic.
    Instruction,
    /// SIMD/vector instruction mnemonic.
    InstructionSimd,
    /// Register name.
    Register,
    /// Conditional branch mnemonic.
    BranchInstruction,
    /// Unconditional jump mnemonic.
    JumpInstruction,
    /// Call mnemonic.
    CallInstruction,
    /// Return mnemonic.
    ReturnInstruction,
    /// Operand qualifier (`dword ptr`, `lsl`, `i32`, ...).
    Qualifier,
    /// Function-begin marker (`.Lfunc_begin*`, `define`).
    FunctionBegin,
    /// Function-end marker (`.Lfunc_end*`).
    FunctionEnd,
}

impl AsmTokenKind {
    /// True for every mnemonic-like kind, including branches and calls.
    pub fn is_instruction(self) -> bool {
        matches!(
            self,
            AsmTokenKind::Instruction
                | AsmTokenKind::InstructionSimd
                | AsmTokenKind::BranchInstruction
                | AsmTokenKind::JumpInstruction
                | AsmTokenKind::CallInstruction
                | AsmTokenKind::ReturnInstruction
        )
    }

    /// True for kinds a branch/jump operand may be upgraded from.
    pub fn is_label_candidate(self) -> bool {
        matches!(
            self,
            AsmTokenKind::String | AsmTokenKind::Identifier | AsmTokenKind::Label
        )
    }
}

/// One lexed token: a `(kind, offset, length)` view into the input buffer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct AsmToken {
    /// Token classification.
    pub kind: AsmTokenKind,
    /// Byte offset of the token in the input.
    pub offset: u32,
    /// Byte length of the token.
    pub length: u32,
}

impl AsmToken {
    /// The byte range of this token within the input buffer.
    pub fn range(&self) -> std::ops::Range<usize> {
        self.offset as usize..(self.offset + self.length) as usize
    }

    /// The token's text, borrowed from the input buffer.
    pub fn text<'a>(&self, input: &'a str) -> &'a str {
        &input[self.range()]
    }
}

/// Classification of a committed line.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum AsmLineKind {
    /// Empty line, or a line whose first token carries no line semantics.
    None,
    /// Assembler directive line.
    Directive,
    /// `.file` / `.cv_file` line (consumed during parsing, never stored).
    SourceFile,
    /// `.loc` / `.cv_loc` line before enrichment.
    SourceLocation,
    /// Enriched source-location line carrying `(file, line, column)`.
    SourceFileLocation,
    /// Data-introducing directive line.
    Data,
    /// Straight-line instruction.
    Code,
    /// Conditional branch; closes the enclosing block.
    CodeBranch,
    /// Unconditional jump.
    CodeJump,
    /// Call.
    CodeCall,
    /// Return.
    CodeReturn,
    /// `name:` label declaration.
    LabelDeclaration,
    /// Comment-only line.
    Comment,
    /// Function-begin marker line.
    FunctionBegin,
    /// Function-end marker line.
    FunctionEnd,
}

/// One committed line.
///
/// This is a tagged union sharing a fixed footprint: the common variant is a
/// token run, while enriched `.loc` lines overlay the same storage with the
/// `(file, line, column)` triple and consume no tokens at render time.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum AsmLine {
    /// A run of consecutive tokens, normally ending with a `NewLine` token.
    Tokens {
        /// Line classification.
        kind: AsmLineKind,
        /// Index of the first token in the disassembler's token array.
        token_index: u32,
        /// Number of tokens on this line (at least 1).
        token_count: u32,
        /// Offset into the column-indices array, or [`COLUMN_UNSET`] until
        /// the enclosing block has been rendered once.
        column_index: u32,
    },
    /// An enriched source-location line; `kind()` reports
    /// [`AsmLineKind::SourceFileLocation`].
    SourceLoc {
        /// File number as registered by `.file`/`.cv_file`.
        file: u32,
        /// 1-based source line, 0 meaning "file indicator only".
        line: u32,
        /// 0-based source column.
        column: u32,
    },
}

impl AsmLine {
    /// Line classification, uniform over both variants.
    pub fn kind(&self) -> AsmLineKind {
        match self {
            AsmLine::Tokens { kind, .. } => *kind,
            AsmLine::SourceLoc { .. } => AsmLineKind::SourceFileLocation,
        }
    }

    /// The token range of this line, or `None` for enriched lines.
    pub fn token_range(&self) -> Option<std::ops::Range<usize>> {
        match self {
            AsmLine::Tokens {
                token_index,
                token_count,
                ..
            } => Some(*token_index as usize..(*token_index + *token_count) as usize),
            AsmLine::SourceLoc { .. } => None,
        }
    }
}

/// Classification of a basic block.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum AsmBlockKind {
    /// No classifying line seen (labels and comments only).
    None,
    /// Generic grouping; reserved, never produced by the current classifier.
    Block,
    /// Only assembler directives.
    Directive,
    /// At least one instruction line.
    Code,
    /// Data definitions, no instructions.
    Data,
}

/// Direction of a control-flow edge, relative to the block storing it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize)]
pub enum AsmEdgeKind {
    /// Control arrives here from `origin_ref`.
    InBound,
    /// Control leaves from `origin_ref` towards `line_ref`.
    OutBound,
}

/// A `(block, line)` position; the line index is relative to the block.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct AsmLineRef {
    /// Index into the disassembler's block array.
    pub block_index: u32,
    /// Line index relative to the block start.
    pub line_index: u32,
}

impl AsmLineRef {
    /// Create a new line reference.
    pub fn new(block_index: u32, line_index: u32) -> Self {
        AsmLineRef {
            block_index,
            line_index,
        }
    }
}

/// A directed control-flow relation between two `(block, line)` positions.
///
/// Every `OutBound` edge stored on the source block is mirrored by an
/// `InBound` edge with identical payload stored on the destination block, so
/// the graph can be walked in either direction without a lookup table.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct AsmEdge {
    /// Direction relative to the block holding this edge.
    pub kind: AsmEdgeKind,
    /// The branch/jump line the control transfer originates from.
    pub origin_ref: AsmLineRef,
    /// The destination line of the control transfer.
    pub line_ref: AsmLineRef,
}

/// One basic block: a contiguous, non-overlapping run of lines.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AsmBlock {
    /// Block classification.
    pub kind: AsmBlockKind,
    /// Index of the block's first line in the disassembler's line array.
    pub line_index: u32,
    /// Number of lines in the block (at least 1).
    pub length: u32,
    /// Control-flow edges touching this block, sorted: inbound before
    /// outbound, then by destination block and line.
    pub edges: Vec<AsmEdge>,
}

impl AsmBlock {
    /// The line range of this block.
    pub fn line_range(&self) -> std::ops::Range<usize> {
        self.line_index as usize..(self.line_index + self.length) as usize
    }

    /// Iterate the block's outbound edges.
    pub fn outbound_edges(&self) -> impl Iterator<Item = &AsmEdge> {
        self.edges
            .iter()
            .filter(|e| e.kind == AsmEdgeKind::OutBound)
    }

    /// Iterate the block's inbound edges.
    pub fn inbound_edges(&self) -> impl Iterator<Item = &AsmEdge> {
        self.edges.iter().filter(|e| e.kind == AsmEdgeKind::InBound)
    }
}

/// Error type for listing analysis.
#[derive(Debug, thiserror::Error)]
pub enum AnalyzeError {
    /// A string literal ran off the end of its line.
    #[error("unterminated string literal at byte offset {offset}")]
    UnterminatedString {
        /// Byte offset of the opening quote.
        offset: usize,
    },

    /// The listing structure could not be followed.
    #[error("malformed listing near line {line}: {reason}")]
    Malformed {
        /// 1-based physical line of the problem.
        line: usize,
        /// Human-readable description.
        reason: String,
    },

    /// JSON export failed.
    #[error("JSON serialization error: {0}")]
    Serialize(#[from] serde_json::Error),
}
