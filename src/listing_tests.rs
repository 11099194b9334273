#[cfg(test)]
mod tests {
    use crate::source::testing::MapSourceReader;
    use crate::{
        AsmBlockKind, AsmLine, AsmLineKind, Dialect, Disassembler, RenderOptions,
    };

    fn initialized(input: &str, dialect: Dialect, options: RenderOptions) -> Disassembler {
        let mut disasm = Disassembler::new();
        assert!(disasm.initialize(input, dialect, options), "initialize failed");
        disasm
    }

    /// A file whose 42nd line reads `return 0;`.
    fn x_c_reader() -> MapSourceReader {
        let mut text = "\n".repeat(41);
        text.push_str("return 0;\n");
        MapSourceReader::new(&[("/tmp/x.c", &text)])
    }

    #[test]
    fn test_token_coverage_modulo_banner() {
        let input = "While compiling job: demo\nmain:\n  mov eax, 1\n  je done\n  nop\ndone:\n  ret\n";
        let disasm = initialized(input, Dialect::Intel, RenderOptions::plain());

        let rebuilt: String = disasm
            .tokens()
            .iter()
            .map(|t| t.text(input))
            .collect();
        let after_banner = &input[input.find('\n').unwrap() + 1..];
        assert_eq!(rebuilt, after_banner);
    }

    #[test]
    fn test_every_line_belongs_to_exactly_one_block() {
        let input = "banner\n\t.text\nmain:\n  je out\n  nop\nout:\n  ret\n\ntable:\n\t.byte 7\n";
        let disasm = initialized(input, Dialect::Intel, RenderOptions::plain());

        let mut owners = vec![0usize; disasm.lines().len()];
        for block in disasm.blocks() {
            for line in block.line_range() {
                owners[line] += 1;
            }
        }
        assert!(owners.iter().all(|&n| n == 1));
    }

    #[test]
    fn test_none_blocks_hold_only_inert_lines() {
        let input = "banner\n# comment\nhelper:\nmain:\n  ret\n";
        let disasm = initialized(input, Dialect::Intel, RenderOptions::plain());

        for block in disasm.blocks() {
            if block.kind != AsmBlockKind::None {
                continue;
            }
            for line in &disasm.lines()[block.line_range()] {
                assert!(matches!(
                    line.kind(),
                    AsmLineKind::None
                        | AsmLineKind::LabelDeclaration
                        | AsmLineKind::Comment
                        | AsmLineKind::FunctionBegin
                        | AsmLineKind::FunctionEnd
                ));
            }
        }
    }

    #[test]
    fn test_plain_round_trip_on_arm() {
        // No Intel alignment and no location directives: plain rendering is
        // the input minus the dropped banner line.
        let input = "banner\nfib:\n  cmp x0, #2\n  b.lt .LBB0_2\n  sub x0, x0, #1\n.LBB0_2:\n  ret\n";
        let mut disasm = initialized(input, Dialect::Arm, RenderOptions::plain());
        assert_eq!(disasm.render_full_text(), &input["banner\n".len()..]);
    }

    #[test]
    fn test_rendering_is_idempotent() {
        let input = "banner\nmain:\n  mulps xmm0, xmm1\n  ret\n";
        let mut disasm = initialized(input, Dialect::Intel, RenderOptions::colored(true));
        let first = disasm.render_full_text();
        let second = disasm.render_full_text();
        assert_eq!(first, second);
    }

    #[test]
    fn test_source_location_enrichment_scenario() {
        let input = "banner\n\t.file\t1 \"/tmp/x.c\"\n\t.loc\t1 42 7\n  ret\n";
        let mut disasm = Disassembler::with_reader(Box::new(x_c_reader()));
        assert!(disasm.initialize(input, Dialect::Intel, RenderOptions::plain()));

        // The .file line is consumed; the .loc line is enriched in place.
        assert_eq!(disasm.lines().len(), 2);
        assert_eq!(
            disasm.lines()[0],
            AsmLine::SourceLoc {
                file: 1,
                line: 42,
                column: 7
            }
        );

        let text = disasm.render_full_text();
        assert_eq!(text, "=== x.c(42, 8)return 0;\n  ret\n");
    }

    #[test]
    fn test_missing_source_file_renders_header_only() {
        let input = "banner\n\t.file\t1 \"/gone/y.c\"\n\t.loc\t1 9 0\n  ret\n";
        let mut disasm = initialized(input, Dialect::Intel, RenderOptions::plain());
        assert_eq!(disasm.render_full_text(), "=== y.c(9, 1)\n  ret\n");
    }

    #[test]
    fn test_zero_line_location_shows_file_indicator() {
        let input = "banner\n\t.file\t2 \"/tmp/x.c\"\n\t.loc\t2 0\n  ret\n";
        let mut disasm = Disassembler::with_reader(Box::new(x_c_reader()));
        assert!(disasm.initialize(input, Dialect::Intel, RenderOptions::plain()));
        assert_eq!(disasm.render_full_text(), "=== x.c\n  ret\n");
    }

    #[test]
    fn test_zero_file_location_is_suppressed() {
        let input = "banner\n\t.loc\t0 3 1\n  ret\n";
        let mut disasm = initialized(input, Dialect::Intel, RenderOptions::plain());
        assert_eq!(disasm.render_full_text(), "\n  ret\n");
    }

    #[test]
    fn test_colored_location_header_uses_the_theme_color() {
        let input = "banner\n\t.file\t1 \"/tmp/x.c\"\n\t.loc\t1 42 7\n  ret\n";

        let mut dark = Disassembler::with_reader(Box::new(x_c_reader()));
        assert!(dark.initialize(input, Dialect::Intel, RenderOptions::colored(true)));
        assert!(dark
            .render_full_text()
            .contains("<color=#FFFF00>=== x.c(42, 8)return 0;</color>\n"));

        let mut light = Disassembler::with_reader(Box::new(x_c_reader()));
        assert!(light.initialize(input, Dialect::Intel, RenderOptions::colored(false)));
        assert!(light.render_full_text().contains("<color=#888800>"));
    }

    #[test]
    fn test_theme_palettes_differ_on_instructions() {
        let input = "banner\nmain:\n  ret\n";
        let mut dark = initialized(input, Dialect::Intel, RenderOptions::colored(true));
        assert!(dark.render_full_text().contains("<color=#4EC9B0>ret</color>"));

        let mut light = initialized(input, Dialect::Intel, RenderOptions::colored(false));
        assert!(light.render_full_text().contains("<color=#0451a5>ret</color>"));
    }

    #[test]
    fn test_plain_mode_emits_no_color_tags() {
        let input = "banner\nmain:\n  mulps xmm0, xmm1\n  je main\n";
        let mut disasm = initialized(input, Dialect::Intel, RenderOptions::plain());
        assert!(!disasm.render_full_text().contains("<color"));
    }

    #[test]
    fn test_wasm_listing_smoke() {
        let input = "banner\n\
                     \t.functype\tadd_one (i32) -> (i32)\n\
                     add_one:\n\
                     \tlocal.get\t0\n\
                     \ti32.const\t1\n\
                     \ti32.add\n\
                     \tend_function\n";
        let mut disasm = initialized(input, Dialect::Wasm, RenderOptions::plain());

        let kinds: Vec<AsmLineKind> = disasm.lines().iter().map(|l| l.kind()).collect();
        assert_eq!(kinds[0], AsmLineKind::Directive);
        assert_eq!(kinds[1], AsmLineKind::LabelDeclaration);
        assert_eq!(kinds[2], AsmLineKind::Code);
        // Wasm has no alignment column: plain render round-trips.
        assert_eq!(disasm.render_full_text(), &input["banner\n".len()..]);
    }

    #[test]
    fn test_llvm_ir_listing_smoke() {
        let input = "banner\n\
                     define i32 @square(i32 %x) {\n\
                     entry:\n\
                     \t%r = mul i32 %x, %x\n\
                     \tret i32 %r\n\
                     }\n";
        let disasm = initialized(input, Dialect::LlvmIr, RenderOptions::plain());

        let kinds: Vec<AsmLineKind> = disasm.lines().iter().map(|l| l.kind()).collect();
        assert_eq!(kinds[0], AsmLineKind::FunctionBegin);
        assert_eq!(kinds[1], AsmLineKind::LabelDeclaration);
        assert_eq!(kinds[2], AsmLineKind::Code);
        assert_eq!(kinds[3], AsmLineKind::CodeReturn);

        // The entry block is code even though `%r = mul ...` hides its
        // mnemonic behind the value name.
        let entry = &disasm.blocks()[1];
        assert_eq!(entry.kind, AsmBlockKind::Code);
    }

    #[test]
    fn test_eager_rendering_allows_shared_reads() {
        let input = "banner\nL1:\n  je L3\n  nop\nL3:\n  ret\n";
        let mut disasm = initialized(input, Dialect::Intel, RenderOptions::colored(true));
        disasm.render_all_blocks();

        // All queries now take &self.
        let disasm = &disasm;
        for index in 0..disasm.blocks().len() {
            assert!(disasm.rendered_block(index).is_some());
        }
    }

    #[test]
    fn test_conditional_branch_fall_through_count() {
        let input = "banner\nL1:\n  je L3\n  nop\nL3:\n  ret\n";
        let disasm = initialized(input, Dialect::Intel, RenderOptions::plain());

        // The branch block has exactly two outbound edges: resolved target
        // plus implicit fall-through.
        assert_eq!(disasm.blocks()[0].outbound_edges().count(), 2);
        // And an unresolved target leaves exactly the fall-through.
        let input = "banner\nL1:\n  je nowhere\n  nop\n";
        let disasm = initialized(input, Dialect::Intel, RenderOptions::plain());
        assert_eq!(disasm.blocks()[0].outbound_edges().count(), 1);
    }
}
