//! The analyzer facade: owns the flat arrays and exposes the query API.

use rayon::prelude::*;

use crate::parser::{parse_listing, ParseOutput};
use crate::render::{palette, render_block, BlockRender, RenderContext};
use crate::source::{FileTable, FsSourceReader, SourceReader};
use crate::{
    AnalyzeError, AsmBlock, AsmLine, AsmToken, Dialect, COLUMN_UNSET,
};

/// Theme and coloring switches for rendering.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RenderOptions {
    /// Pick colors from the dark palette (the default) or the light one.
    pub dark_theme: bool,
    /// Wrap tokens in `<color=#RRGGBB>` tags.
    pub colored: bool,
}

impl Default for RenderOptions {
    fn default() -> Self {
        RenderOptions {
            dark_theme: true,
            colored: true,
        }
    }
}

impl RenderOptions {
    /// Colored output on the chosen theme.
    pub fn colored(dark_theme: bool) -> Self {
        RenderOptions {
            dark_theme,
            colored: true,
        }
    }

    /// Plain text output, no color tags.
    pub fn plain() -> Self {
        RenderOptions {
            dark_theme: true,
            colored: false,
        }
    }
}

/// Result of mapping a rendered column back to a token.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ColumnHit {
    /// Index into the token array.
    pub token_index: usize,
    /// Absolute index into the line array.
    pub line_index: usize,
}

/// A parsed assembly listing and its lazily rendered text.
///
/// The instance starts empty; [`initialize`](Disassembler::initialize) parses
/// a listing and replaces all previous state. After a successful
/// initialization the token/line/block/edge arrays never change again; only
/// the per-block rendered strings and the column-indices array are filled in
/// on demand. [`render_all_blocks`](Disassembler::render_all_blocks) runs
/// that fill eagerly (and in parallel), after which the instance is fully
/// immutable.
pub struct Disassembler {
    input: String,
    dialect: Dialect,
    options: RenderOptions,
    initialized: bool,

    tokens: Vec<AsmToken>,
    lines: Vec<AsmLine>,
    blocks: Vec<AsmBlock>,
    files: FileTable,

    /// Memoized per-block renderings.
    rendered: Vec<Option<String>>,
    /// Flat column-indices array; lines point into it via `column_index`.
    columns: Vec<u32>,

    reader: Box<dyn SourceReader>,
}

impl Default for Disassembler {
    fn default() -> Self {
        Self::new()
    }
}

impl Disassembler {
    /// An empty analyzer reading source files from the filesystem.
    pub fn new() -> Self {
        Self::with_reader(Box::new(FsSourceReader))
    }

    /// An empty analyzer with a custom source-file reader.
    pub fn with_reader(reader: Box<dyn SourceReader>) -> Self {
        Disassembler {
            input: String::new(),
            dialect: Dialect::Intel,
            options: RenderOptions::default(),
            initialized: false,
            tokens: Vec::new(),
            lines: Vec::new(),
            blocks: Vec::new(),
            files: FileTable::default(),
            rendered: Vec::new(),
            columns: Vec::new(),
            reader,
        }
    }

    /// Parse `input` and build the block graph.
    ///
    /// Returns `false` on a parse error, in which case the failure is logged
    /// and the instance is reset; no partially initialized state is ever
    /// observable. Re-initialization with a different listing, dialect, or
    /// options is permitted at any time.
    pub fn initialize(
        &mut self,
        input: impl Into<String>,
        dialect: Dialect,
        options: RenderOptions,
    ) -> bool {
        self.reset();
        self.input = input.into();
        self.dialect = dialect;
        self.options = options;

        match parse_listing(&self.input, dialect, self.reader.as_ref()) {
            Ok(ParseOutput {
                tokens,
                lines,
                blocks,
                files,
            }) => {
                log::debug!(
                    "parsed {} listing: {} tokens, {} lines, {} blocks",
                    dialect,
                    tokens.len(),
                    lines.len(),
                    blocks.len()
                );
                self.rendered = vec![None; blocks.len()];
                self.tokens = tokens;
                self.lines = lines;
                self.blocks = blocks;
                self.files = files;
                self.initialized = true;
                true
            }
            Err(err) => {
                log::warn!("failed to analyze {} listing: {}", dialect, err);
                self.reset();
                false
            }
        }
    }

    /// Drop all state from a previous initialization.
    pub fn reset(&mut self) {
        self.input.clear();
        self.initialized = false;
        self.tokens.clear();
        self.lines.clear();
        self.blocks.clear();
        self.files = FileTable::default();
        self.rendered.clear();
        self.columns.clear();
    }

    /// Has the last `initialize` call succeeded?
    pub fn is_initialized(&self) -> bool {
        self.initialized
    }

    /// Dialect of the current listing.
    pub fn dialect(&self) -> Dialect {
        self.dialect
    }

    /// Is color tagging enabled?
    pub fn is_colored(&self) -> bool {
        self.options.colored
    }

    /// All blocks, in listing order.
    pub fn blocks(&self) -> &[AsmBlock] {
        &self.blocks
    }

    /// All lines, in listing order.
    pub fn lines(&self) -> &[AsmLine] {
        &self.lines
    }

    /// All tokens, in listing order.
    pub fn tokens(&self) -> &[AsmToken] {
        &self.tokens
    }

    /// The registered source-file table.
    pub fn files(&self) -> &FileTable {
        &self.files
    }

    /// One token by index.
    pub fn token(&self, index: usize) -> &AsmToken {
        &self.tokens[index]
    }

    /// A token's text, borrowed from the input buffer.
    pub fn token_text(&self, index: usize) -> &str {
        self.tokens[index].text(&self.input)
    }

    /// The tokens of one line; empty for enriched location lines.
    pub fn line_tokens(&self, line: &AsmLine) -> &[AsmToken] {
        match line.token_range() {
            Some(range) => &self.tokens[range],
            None => &[],
        }
    }

    /// Rendered text of one block, memoized on first request.
    pub fn block_text(&mut self, index: usize) -> &str {
        self.ensure_rendered(index);
        self.rendered[index].as_deref().unwrap_or("")
    }

    /// Rendered text of one block if it has been rendered already.
    pub fn rendered_block(&self, index: usize) -> Option<&str> {
        self.rendered.get(index).and_then(|r| r.as_deref())
    }

    /// Render every block and concatenate the results.
    pub fn render_full_text(&mut self) -> String {
        let mut out = String::with_capacity(self.input.len());
        for index in 0..self.blocks.len() {
            out.push_str(self.block_text(index));
        }
        out
    }

    /// Eagerly render every block, fanning the per-block work out across
    /// threads. Afterwards all queries work on shared references.
    pub fn render_all_blocks(&mut self) {
        let pending: Vec<Option<BlockRender>> = {
            let ctx = self.render_context();
            let rendered = &self.rendered;
            (0..self.blocks.len())
                .into_par_iter()
                .map(|index| {
                    if rendered[index].is_some() {
                        None
                    } else {
                        Some(render_block(&ctx, index))
                    }
                })
                .collect()
        };

        for (index, render) in pending.into_iter().enumerate() {
            if let Some(render) = render {
                self.commit_render(index, render);
            }
        }
    }

    /// Map a rendered text position back to the token covering it.
    ///
    /// `column` is a 0-based visible-character column; color tags do not
    /// count. Returns `None` when the position is past the line's last
    /// token, the line carries no tokens, or the indices are out of range.
    /// Renders the block first if needed.
    pub fn token_index_from_column(
        &mut self,
        block_index: usize,
        line_in_block: usize,
        column: usize,
    ) -> Option<ColumnHit> {
        let (first_line, length) = {
            let block = self.blocks.get(block_index)?;
            (block.line_index as usize, block.length as usize)
        };
        if line_in_block >= length {
            return None;
        }
        self.ensure_rendered(block_index);

        let line_index = first_line + line_in_block;
        let AsmLine::Tokens {
            token_index,
            token_count,
            column_index,
            ..
        } = self.lines[line_index]
        else {
            return None;
        };

        let count = token_count as usize;
        let column = column as u32;
        let start = |i: usize| -> u32 {
            if i == 0 {
                0
            } else {
                self.columns[column_index as usize + i - 1]
            }
        };

        if count == 1 || column_index == COLUMN_UNSET {
            // A lone newline token covers column 0 only.
            return (column == 0).then_some(ColumnHit {
                token_index: token_index as usize,
                line_index,
            });
        }

        let mut i = count - 1;
        while i > 0 && start(i) > column {
            i -= 1;
        }
        let end = if i == count - 1 {
            // The last token is the newline; it is one column wide.
            start(i) + 1
        } else {
            start(i + 1)
        };

        (column < end).then_some(ColumnHit {
            token_index: token_index as usize + i,
            line_index,
        })
    }

    /// Serialize the analyzed model (blocks, lines, edges) to JSON.
    pub fn to_json(&self) -> Result<String, AnalyzeError> {
        crate::format::to_json(&self.input, self.dialect, &self.tokens, &self.lines, &self.blocks)
    }

    fn render_context(&self) -> RenderContext<'_> {
        RenderContext {
            input: &self.input,
            tokens: &self.tokens,
            lines: &self.lines,
            blocks: &self.blocks,
            files: &self.files,
            dialect: self.dialect,
            colored: self.options.colored,
            palette: palette(self.options.dark_theme),
        }
    }

    fn ensure_rendered(&mut self, index: usize) {
        if index >= self.rendered.len() || self.rendered[index].is_some() {
            return;
        }
        let render = {
            let ctx = self.render_context();
            render_block(&ctx, index)
        };
        self.commit_render(index, render);
    }

    /// Store a finished block render: the text is memoized and the per-line
    /// column runs are appended to the flat column-indices array.
    fn commit_render(&mut self, index: usize, render: BlockRender) {
        let first_line = self.blocks[index].line_index as usize;
        for (offset, columns) in render.line_columns.into_iter().enumerate() {
            if columns.is_empty() {
                continue;
            }
            if let AsmLine::Tokens { column_index, .. } = &mut self.lines[first_line + offset] {
                if *column_index == COLUMN_UNSET {
                    *column_index = self.columns.len() as u32;
                    self.columns.extend(columns);
                }
            }
        }
        self.rendered[index] = Some(render.text);
    }
}
