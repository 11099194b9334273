//! Pull-based lexer for assembly listings.
//!
//! The tokenizer walks the input buffer once and hands out [`AsmToken`]s
//! whose byte ranges concatenate back to the input exactly. Nothing is
//! copied: every token is an `(offset, length)` view. Whitespace and
//! punctuation come out as `Misc` tokens so that renderers can reproduce the
//! listing byte for byte, while consumers that only care about structure
//! skip them.

use crate::dialect::DialectClassifier;
use crate::{AnalyzeError, AsmToken, AsmTokenKind, Dialect};

/// Streaming tokenizer over one input buffer.
pub struct Tokenizer<'a> {
    input: &'a str,
    bytes: &'a [u8],
    pos: usize,
    classifier: &'static DialectClassifier,
}

impl<'a> Tokenizer<'a> {
    /// Create a tokenizer for `input` in the given dialect.
    pub fn new(input: &'a str, dialect: Dialect) -> Self {
        Tokenizer {
            input,
            bytes: input.as_bytes(),
            pos: 0,
            classifier: DialectClassifier::of(dialect),
        }
    }

    /// Produce the next token, or `Ok(None)` at end of input.
    ///
    /// The only lexical error is a string literal that runs off its line.
    pub fn try_next(&mut self) -> Result<Option<AsmToken>, AnalyzeError> {
        let start = self.pos;
        let Some(&byte) = self.bytes.get(self.pos) else {
            return Ok(None);
        };

        let kind = match byte {
            b'\n' => {
                self.pos += 1;
                AsmTokenKind::NewLine
            }
            b'\r' => {
                self.pos += 1;
                if self.bytes.get(self.pos) == Some(&b'\n') {
                    self.pos += 1;
                }
                AsmTokenKind::NewLine
            }
            b' ' | b'\t' => {
                while matches!(self.bytes.get(self.pos), Some(b' ' | b'\t')) {
                    self.pos += 1;
                }
                AsmTokenKind::Misc
            }
            b'"' => {
                self.scan_string(start)?;
                AsmTokenKind::String
            }
            b'0'..=b'9' => {
                self.scan_number();
                AsmTokenKind::Number
            }
            _ if self.at_comment_start(start) => {
                self.scan_to_line_end();
                AsmTokenKind::Comment
            }
            _ if self.classifier.is_ident_start(byte) => self.scan_identifier(start),
            _ => {
                // Operand punctuation (commas, brackets, arithmetic) and any
                // byte nothing else claims.
                self.pos += 1;
                while self.pos < self.bytes.len() && !self.is_token_start(self.pos) {
                    self.pos += 1;
                }
                AsmTokenKind::Misc
            }
        };

        Ok(Some(AsmToken {
            kind,
            offset: start as u32,
            length: (self.pos - start) as u32,
        }))
    }

    /// Would the byte at `pos` start a token other than a punctuation run?
    ///
    /// Byte-based on purpose: a multi-byte character's continuation bytes
    /// match nothing here, so punctuation runs never split a character.
    fn is_token_start(&self, pos: usize) -> bool {
        let byte = self.bytes[pos];
        matches!(byte, b'\n' | b'\r' | b' ' | b'\t' | b'"')
            || byte.is_ascii_digit()
            || self.classifier.is_ident_start(byte)
            || self.at_comment_start(pos)
    }

    fn at_comment_start(&self, pos: usize) -> bool {
        self.classifier
            .comment_prefixes()
            .iter()
            .any(|p| self.bytes[pos..].starts_with(p.as_bytes()))
    }

    fn scan_to_line_end(&mut self) {
        while !matches!(self.bytes.get(self.pos), None | Some(b'\n' | b'\r')) {
            self.pos += 1;
        }
    }

    fn scan_string(&mut self, start: usize) -> Result<(), AnalyzeError> {
        self.pos += 1;
        loop {
            match self.bytes.get(self.pos) {
                Some(b'"') => {
                    self.pos += 1;
                    return Ok(());
                }
                Some(b'\\') => {
                    // Escapes stay verbatim in the slice; skip the escaped
                    // byte so an escaped quote does not close the literal.
                    self.pos += 2.min(self.bytes.len() - self.pos);
                }
                None | Some(b'\n' | b'\r') => {
                    return Err(AnalyzeError::UnterminatedString { offset: start });
                }
                Some(_) => self.pos += 1,
            }
        }
    }

    fn scan_number(&mut self) {
        // Decimal, hex (0x...), and float forms; the exact value is never
        // needed during lexing so digits and letters are taken greedily.
        while let Some(&b) = self.bytes.get(self.pos) {
            if b.is_ascii_alphanumeric() || b == b'.' || b == b'_' {
                self.pos += 1;
            } else {
                break;
            }
        }
    }

    fn scan_identifier(&mut self, start: usize) -> AsmTokenKind {
        self.pos += 1;
        while let Some(&b) = self.bytes.get(self.pos) {
            if self.classifier.is_ident_continue(b) {
                self.pos += 1;
            } else {
                break;
            }
        }

        // `name:` in declaration position lexes as a label, colon included.
        if self.bytes.get(self.pos) == Some(&b':') {
            self.pos += 1;
            return AsmTokenKind::Label;
        }

        self.classifier.classify(&self.input[start..self.pos])
    }
}

impl<'a> Iterator for Tokenizer<'a> {
    type Item = Result<AsmToken, AnalyzeError>;

    fn next(&mut self) -> Option<Self::Item> {
        self.try_next().transpose()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn lex(input: &str, dialect: Dialect) -> Vec<AsmToken> {
        Tokenizer::new(input, dialect)
            .collect::<Result<Vec<_>, _>>()
            .expect("lexing failed")
    }

    fn kinds(tokens: &[AsmToken]) -> Vec<AsmTokenKind> {
        tokens.iter().map(|t| t.kind).collect()
    }

    #[test]
    fn test_tokens_cover_the_input_exactly() {
        let input = "main:\n  mov eax, dword ptr [rbp - 8]\n  jmp .LBB0_2 # tail\n";
        let tokens = lex(input, Dialect::Intel);

        let mut rebuilt = String::new();
        for t in &tokens {
            rebuilt.push_str(t.text(input));
        }
        assert_eq!(rebuilt, input);

        // Adjacent ranges concatenate with no gaps.
        let mut expected = 0u32;
        for t in &tokens {
            assert_eq!(t.offset, expected);
            expected += t.length;
        }
        assert_eq!(expected as usize, input.len());
    }

    #[test]
    fn test_label_declaration_includes_colon() {
        let tokens = lex("main:\n", Dialect::Intel);
        assert_eq!(tokens[0].kind, AsmTokenKind::Label);
        assert_eq!(tokens[0].text("main:\n"), "main:");
        assert_eq!(tokens[1].kind, AsmTokenKind::NewLine);
    }

    #[test]
    fn test_instruction_line_kinds() {
        let input = "  mov eax, 1\n";
        let tokens = lex(input, Dialect::Intel);
        assert_eq!(
            kinds(&tokens),
            vec![
                AsmTokenKind::Misc,
                AsmTokenKind::Instruction,
                AsmTokenKind::Misc,
                AsmTokenKind::Register,
                AsmTokenKind::Misc,
                AsmTokenKind::Number,
                AsmTokenKind::NewLine,
            ]
        );
    }

    #[test]
    fn test_comment_prefixes_per_dialect() {
        let intel = lex("# note\n", Dialect::Intel);
        assert_eq!(intel[0].kind, AsmTokenKind::Comment);

        let arm = lex("// note\n", Dialect::Arm);
        assert_eq!(arm[0].kind, AsmTokenKind::Comment);

        // `#` is an immediate marker on ARM, not a comment.
        let arm_imm = lex("#42\n", Dialect::Arm);
        assert_eq!(arm_imm[0].kind, AsmTokenKind::Misc);
        assert_eq!(arm_imm[1].kind, AsmTokenKind::Number);

        let llvm = lex("; note\n", Dialect::LlvmIr);
        assert_eq!(llvm[0].kind, AsmTokenKind::Comment);
    }

    #[test]
    fn test_string_with_escaped_quote() {
        let input = r#".asciz "a\"b""#;
        let tokens = lex(input, Dialect::Intel);
        assert_eq!(tokens[0].kind, AsmTokenKind::DataDirective);
        assert_eq!(tokens[2].kind, AsmTokenKind::String);
        assert_eq!(tokens[2].text(input), r#""a\"b""#);
    }

    #[test]
    fn test_unterminated_string_is_an_error() {
        let mut tz = Tokenizer::new("\"oops\n", Dialect::Intel);
        match tz.try_next() {
            Err(AnalyzeError::UnterminatedString { offset: 0 }) => {}
            other => panic!("expected unterminated string error, got {:?}", other),
        }
    }

    #[test]
    fn test_numbers() {
        let input = "42 0x7f 1.5\n";
        let tokens = lex(input, Dialect::Intel);
        let numbers: Vec<&str> = tokens
            .iter()
            .filter(|t| t.kind == AsmTokenKind::Number)
            .map(|t| t.text(input))
            .collect();
        assert_eq!(numbers, vec!["42", "0x7f", "1.5"]);
    }

    #[test]
    fn test_crlf_is_one_newline_token() {
        let tokens = lex("nop\r\nnop\n", Dialect::Intel);
        let newlines: Vec<_> = tokens
            .iter()
            .filter(|t| t.kind == AsmTokenKind::NewLine)
            .collect();
        assert_eq!(newlines.len(), 2);
        assert_eq!(newlines[0].length, 2);
        assert_eq!(newlines[1].length, 1);
    }

    #[test]
    fn test_llvm_value_names() {
        let input = "  %sum = add i32 %a, %b\n";
        let tokens = lex(input, Dialect::LlvmIr);
        let texts: Vec<(&str, AsmTokenKind)> = tokens
            .iter()
            .filter(|t| !matches!(t.kind, AsmTokenKind::Misc | AsmTokenKind::NewLine))
            .map(|t| (t.text(input), t.kind))
            .collect();
        assert_eq!(
            texts,
            vec![
                ("%sum", AsmTokenKind::Identifier),
                ("add", AsmTokenKind::Instruction),
                ("i32", AsmTokenKind::Qualifier),
                ("%a", AsmTokenKind::Identifier),
                ("%b", AsmTokenKind::Identifier),
            ]
        );
    }
}
