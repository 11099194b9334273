//! Per-dialect token classifiers.
//!
//! Each [`DialectClassifier`] is a pure lookup from a lexeme to an
//! [`AsmTokenKind`]. The four instances are process-wide immutable tables;
//! there is no state to share or guard. x86 Intel mnemonics are matched
//! case-insensitively, the other three dialects are case-sensitive.

use std::collections::HashMap;

use once_cell::sync::Lazy;

use crate::{AsmTokenKind, Dialect};

/// A dialect's keyword table plus the lexical quirks that go with it.
pub struct DialectClassifier {
    dialect: Dialect,
    case_insensitive: bool,
    comment_prefixes: &'static [&'static str],
    table: HashMap<&'static str, AsmTokenKind>,
}

static INTEL: Lazy<DialectClassifier> = Lazy::new(build_intel);
static ARM: Lazy<DialectClassifier> = Lazy::new(build_arm);
static WASM: Lazy<DialectClassifier> = Lazy::new(build_wasm);
static LLVM_IR: Lazy<DialectClassifier> = Lazy::new(build_llvm_ir);

impl DialectClassifier {
    /// The shared classifier instance for `dialect`.
    pub fn of(dialect: Dialect) -> &'static DialectClassifier {
        match dialect {
            Dialect::Intel => &INTEL,
            Dialect::Arm => &ARM,
            Dialect::Wasm => &WASM,
            Dialect::LlvmIr => &LLVM_IR,
        }
    }

    /// The dialect this classifier belongs to.
    pub fn dialect(&self) -> Dialect {
        self.dialect
    }

    /// Comment prefixes recognized by this dialect, longest first.
    pub fn comment_prefixes(&self) -> &'static [&'static str] {
        self.comment_prefixes
    }

    /// Classify an identifier-shaped lexeme.
    ///
    /// Returns [`AsmTokenKind::Identifier`] when the lexeme is not a known
    /// keyword of the dialect. Directive-shaped lexemes (leading `.`) are
    /// refined here as well: function markers, local-label references, data
    /// directives, and source-location directives each get their own kind,
    /// anything else with a leading `.` stays a plain [`AsmTokenKind::Directive`].
    pub fn classify(&self, lexeme: &str) -> AsmTokenKind {
        if let Some(rest) = lexeme.strip_prefix('.') {
            if rest.starts_with("Lfunc_begin") {
                return AsmTokenKind::FunctionBegin;
            }
            if rest.starts_with("Lfunc_end") {
                return AsmTokenKind::FunctionEnd;
            }
            // `.L`-prefixed names are local-label references, not directives.
            if rest.starts_with('L') {
                return AsmTokenKind::Identifier;
            }
            return match self.lookup(lexeme) {
                Some(kind) => kind,
                None => AsmTokenKind::Directive,
            };
        }

        match self.lookup(lexeme) {
            Some(kind) => kind,
            None if self.is_register_shaped(lexeme) => AsmTokenKind::Register,
            None => AsmTokenKind::Identifier,
        }
    }

    /// May `byte` start an identifier-shaped token in this dialect?
    pub(crate) fn is_ident_start(&self, byte: u8) -> bool {
        if byte.is_ascii_alphabetic() || byte == b'_' || byte == b'.' {
            return true;
        }
        match self.dialect {
            // LLVM IR names values `%n`/`@f`; Wasm names locals `$x`.
            Dialect::LlvmIr => matches!(byte, b'%' | b'@' | b'$'),
            Dialect::Wasm => byte == b'$',
            _ => false,
        }
    }

    /// May `byte` continue an identifier-shaped token in this dialect?
    pub(crate) fn is_ident_continue(&self, byte: u8) -> bool {
        byte.is_ascii_digit() || self.is_ident_start(byte)
    }

    fn lookup(&self, lexeme: &str) -> Option<AsmTokenKind> {
        if self.case_insensitive && lexeme.bytes().any(|b| b.is_ascii_uppercase()) {
            let folded = lexeme.to_ascii_lowercase();
            return self.table.get(folded.as_str()).copied();
        }
        self.table.get(lexeme).copied()
    }

    /// Numbered register names (`xmm7`, `r10d`, `x3`, `v31`, ...) are matched
    /// by shape rather than enumerated in the table.
    fn is_register_shaped(&self, lexeme: &str) -> bool {
        match self.dialect {
            Dialect::Intel => {
                let folded;
                let l: &str = if lexeme.bytes().any(|b| b.is_ascii_uppercase()) {
                    folded = lexeme.to_ascii_lowercase();
                    &folded
                } else {
                    lexeme
                };
                for prefix in ["xmm", "ymm", "zmm", "st", "mm", "k"] {
                    if let Some(digits) = l.strip_prefix(prefix) {
                        if !digits.is_empty() && digits.bytes().all(|b| b.is_ascii_digit()) {
                            return true;
                        }
                    }
                }
                // r8..r15 and their d/w/b sub-registers.
                if let Some(rest) = l.strip_prefix('r') {
                    let digits = rest.trim_end_matches(['b', 'w', 'd']);
                    return !digits.is_empty()
                        && digits.bytes().all(|b| b.is_ascii_digit())
                        && rest.len() - digits.len() <= 1;
                }
                false
            }
            Dialect::Arm => match lexeme.as_bytes().first() {
                Some(b'x' | b'w' | b'v' | b'q' | b'd' | b's' | b'h' | b'b') => {
                    let digits = &lexeme[1..];
                    !digits.is_empty() && digits.bytes().all(|b| b.is_ascii_digit())
                }
                _ => false,
            },
            // Wasm and LLVM IR have no bare register names.
            Dialect::Wasm | Dialect::LlvmIr => false,
        }
    }
}

fn insert_all(
    table: &mut HashMap<&'static str, AsmTokenKind>,
    kind: AsmTokenKind,
    words: &[&'static str],
) {
    for word in words {
        table.insert(word, kind);
    }
}

/// GNU-assembler data directives shared by the native dialects.
const GAS_DATA_DIRECTIVES: &[&str] = &[
    ".byte", ".short", ".word", ".hword", ".long", ".int", ".quad", ".xword", ".dword", ".octa",
    ".ascii", ".asciz", ".string", ".zero", ".space", ".skip", ".float", ".double", ".value",
];

fn insert_common_directives(table: &mut HashMap<&'static str, AsmTokenKind>) {
    insert_all(table, AsmTokenKind::DataDirective, GAS_DATA_DIRECTIVES);
    insert_all(table, AsmTokenKind::SourceFile, &[".file", ".cv_file"]);
    insert_all(table, AsmTokenKind::SourceLocation, &[".loc", ".cv_loc"]);
}

fn build_intel() -> DialectClassifier {
    let mut t = HashMap::new();
    insert_common_directives(&mut t);

    insert_all(
        &mut t,
        AsmTokenKind::Instruction,
        &[
            "mov", "movzx", "movsx", "movsxd", "movabs", "lea", "add", "adc", "sub", "sbb", "imul",
            "mul", "idiv", "div", "inc", "dec", "neg", "not", "and", "or", "xor", "shl", "shr",
            "sar", "sal", "rol", "ror", "cmp", "test", "push", "pop", "nop", "cdq", "cdqe", "cqo",
            "cwd", "xchg", "bswap", "bt", "bts", "btr", "tzcnt", "lzcnt", "popcnt", "sete",
            "setne", "setl", "setle", "setg", "setge", "seta", "setae", "setb", "setbe", "cmove",
            "cmovne", "cmovl", "cmovle", "cmovg", "cmovge", "cmova", "cmovb", "leave", "int3",
            "ud2", "endbr64", "lock", "rep", "repe", "repne", "movbe", "xadd", "cpuid",
        ],
    );
    insert_all(
        &mut t,
        AsmTokenKind::InstructionSimd,
        &[
            "movaps", "movups", "movapd", "movupd", "movss", "movsd", "movd", "movq", "movdqa",
            "movdqu", "addps", "addpd", "addss", "addsd", "subps", "subpd", "subss", "subsd",
            "mulps", "mulpd", "mulss", "mulsd", "divps", "divpd", "divss", "divsd", "sqrtps",
            "sqrtss", "sqrtsd", "rsqrtps", "maxps", "maxss", "minps", "minss", "shufps", "shufpd",
            "unpcklps", "unpckhps", "andps", "andpd", "orps", "orpd", "xorps", "xorpd", "cmpps",
            "cmpss", "comiss", "comisd", "ucomiss", "ucomisd", "cvtsi2ss", "cvtsi2sd",
            "cvttss2si", "cvttsd2si", "cvtss2sd", "cvtsd2ss", "pxor", "por", "pand", "pandn",
            "paddb", "paddw", "paddd", "paddq", "psubd", "psubq", "pmulld", "pmullw", "pshufd",
            "pshufb", "punpckldq", "punpcklqdq", "pcmpeqd", "pcmpgtd", "pextrd", "pinsrd",
            "insertps", "blendps", "roundps", "vmovaps", "vmovups", "vaddps", "vsubps", "vmulps",
            "vdivps", "vxorps", "vbroadcastss", "vfmadd213ps", "vfmadd231ps", "vpermilps",
            "vinsertf128", "vextractf128", "vzeroupper",
        ],
    );
    insert_all(
        &mut t,
        AsmTokenKind::Register,
        &[
            "rax", "rbx", "rcx", "rdx", "rsi", "rdi", "rbp", "rsp", "eax", "ebx", "ecx", "edx",
            "esi", "edi", "ebp", "esp", "ax", "bx", "cx", "dx", "si", "di", "bp", "sp", "al",
            "bl", "cl", "dl", "ah", "bh", "ch", "dh", "sil", "dil", "bpl", "spl", "rip", "eip",
            "cs", "ds", "es", "fs", "gs", "ss",
        ],
    );
    insert_all(
        &mut t,
        AsmTokenKind::BranchInstruction,
        &[
            "ja", "jae", "jb", "jbe", "jc", "jcxz", "jecxz", "jrcxz", "je", "jg", "jge", "jl",
            "jle", "jna", "jnae", "jnb", "jnbe", "jnc", "jne", "jng", "jnge", "jnl", "jnle",
            "jno", "jnp", "jns", "jnz", "jo", "jp", "jpe", "jpo", "js", "jz", "loop", "loope",
            "loopne",
        ],
    );
    insert_all(&mut t, AsmTokenKind::JumpInstruction, &["jmp"]);
    insert_all(&mut t, AsmTokenKind::CallInstruction, &["call"]);
    insert_all(
        &mut t,
        AsmTokenKind::ReturnInstruction,
        &["ret", "retn", "retf", "iret", "iretq"],
    );
    insert_all(
        &mut t,
        AsmTokenKind::Qualifier,
        &[
            "byte", "word", "dword", "qword", "xmmword", "ymmword", "zmmword", "tbyte", "ptr",
            "offset", "short", "near", "far", "rel",
        ],
    );

    DialectClassifier {
        dialect: Dialect::Intel,
        case_insensitive: true,
        comment_prefixes: &["#", ";"],
        table: t,
    }
}

fn build_arm() -> DialectClassifier {
    let mut t = HashMap::new();
    insert_common_directives(&mut t);

    insert_all(
        &mut t,
        AsmTokenKind::Instruction,
        &[
            "mov", "movz", "movk", "movn", "add", "adds", "adc", "sub", "subs", "sbc", "mul",
            "madd", "msub", "smull", "umull", "sdiv", "udiv", "and", "ands", "orr", "orn", "eor",
            "eon", "bic", "cmp", "cmn", "tst", "neg", "mvn", "ldr", "ldrb", "ldrh", "ldrsb",
            "ldrsh", "ldrsw", "ldur", "ldp", "str", "strb", "strh", "stur", "stp", "adrp", "adr",
            "csel", "csinc", "csinv", "csneg", "cset", "csetm", "cinc", "sbfx", "ubfx", "sbfiz",
            "ubfiz", "bfi", "bfxil", "extr", "clz", "rbit", "rev", "rev16", "rev32", "nop", "mrs",
            "msr", "dmb", "dsb", "isb", "ccmp", "ngc", "mneg",
        ],
    );
    insert_all(
        &mut t,
        AsmTokenKind::InstructionSimd,
        &[
            "fmov", "fadd", "fsub", "fmul", "fdiv", "fmadd", "fmsub", "fnmadd", "fnmsub", "fcmp",
            "fccmp", "fneg", "fabs", "fsqrt", "fmin", "fmax", "fminnm", "fmaxnm", "frinta",
            "frintm", "frintp", "frintz", "fcvt", "fcvtzs", "fcvtzu", "fcvtas", "fcvtms",
            "scvtf", "ucvtf", "fcsel", "dup", "ins", "ext", "ld1", "ld2", "ld3", "ld4", "st1",
            "st2", "st3", "st4", "tbl", "tbx", "zip1", "zip2", "uzp1", "uzp2", "trn1", "trn2",
            "addv", "smin", "smax", "umin", "umax", "saddlv", "uaddlv", "bit", "bif", "bsl",
            "movi", "mvni", "shrn", "sshr", "ushr", "shl", "sli", "xtn", "xtn2",
        ],
    );
    insert_all(
        &mut t,
        AsmTokenKind::Register,
        &["sp", "lr", "fp", "pc", "xzr", "wzr", "fpsr", "fpcr", "nzcv"],
    );
    insert_all(
        &mut t,
        AsmTokenKind::BranchInstruction,
        &[
            "b.eq", "b.ne", "b.cs", "b.hs", "b.cc", "b.lo", "b.mi", "b.pl", "b.vs", "b.vc",
            "b.hi", "b.ls", "b.ge", "b.lt", "b.gt", "b.le", "b.al", "cbz", "cbnz", "tbz", "tbnz",
        ],
    );
    insert_all(&mut t, AsmTokenKind::JumpInstruction, &["b", "br"]);
    insert_all(&mut t, AsmTokenKind::CallInstruction, &["bl", "blr"]);
    insert_all(&mut t, AsmTokenKind::ReturnInstruction, &["ret", "eret"]);
    insert_all(
        &mut t,
        AsmTokenKind::Qualifier,
        &[
            "lsl", "lsr", "asr", "ror", "msl", "uxtb", "uxth", "uxtw", "uxtx", "sxtb", "sxth",
            "sxtw", "sxtx",
        ],
    );

    DialectClassifier {
        dialect: Dialect::Arm,
        case_insensitive: false,
        comment_prefixes: &["//", ";"],
        table: t,
    }
}

fn build_wasm() -> DialectClassifier {
    let mut t = HashMap::new();
    insert_common_directives(&mut t);
    insert_all(
        &mut t,
        AsmTokenKind::DataDirective,
        &[".int8", ".int16", ".int32", ".int64"],
    );

    insert_all(
        &mut t,
        AsmTokenKind::Instruction,
        &[
            "local.get", "local.set", "local.tee", "global.get", "global.set", "i32.const",
            "i64.const", "f32.const", "f64.const", "i32.add", "i32.sub", "i32.mul", "i32.div_s",
            "i32.div_u", "i32.rem_s", "i32.rem_u", "i32.and", "i32.or", "i32.xor", "i32.shl",
            "i32.shr_s", "i32.shr_u", "i32.rotl", "i32.rotr", "i32.clz", "i32.ctz", "i32.popcnt",
            "i32.eq", "i32.ne", "i32.eqz", "i32.lt_s", "i32.lt_u", "i32.gt_s", "i32.gt_u",
            "i32.le_s", "i32.le_u", "i32.ge_s", "i32.ge_u", "i32.load", "i32.load8_s",
            "i32.load8_u", "i32.load16_s", "i32.load16_u", "i32.store", "i32.store8",
            "i32.store16", "i32.wrap_i64", "i64.add", "i64.sub", "i64.mul", "i64.load",
            "i64.store", "i64.extend_i32_s", "i64.extend_i32_u", "f32.add", "f32.sub", "f32.mul",
            "f32.div", "f32.sqrt", "f32.neg", "f32.abs", "f32.min", "f32.max", "f64.add",
            "f64.sub", "f64.mul", "f64.div", "f64.sqrt", "drop", "select", "unreachable", "nop",
            "memory.grow", "memory.size", "memory.copy", "memory.fill", "block", "loop", "end",
            "if", "else", "func", "param", "result", "local", "export", "import", "module",
            "table", "memory", "data", "elem", "type", "end_function",
        ],
    );
    insert_all(
        &mut t,
        AsmTokenKind::InstructionSimd,
        &[
            "v128.load", "v128.store", "v128.const", "i8x16.add", "i8x16.sub", "i8x16.splat",
            "i16x8.add", "i16x8.mul", "i32x4.add", "i32x4.sub", "i32x4.mul", "i32x4.splat",
            "f32x4.add", "f32x4.sub", "f32x4.mul", "f32x4.div", "f32x4.sqrt", "f32x4.splat",
            "f64x2.add", "f64x2.mul", "i8x16.shuffle",
        ],
    );
    insert_all(&mut t, AsmTokenKind::BranchInstruction, &["br_if", "br_table"]);
    insert_all(&mut t, AsmTokenKind::JumpInstruction, &["br"]);
    insert_all(
        &mut t,
        AsmTokenKind::CallInstruction,
        &["call", "call_indirect"],
    );
    insert_all(&mut t, AsmTokenKind::ReturnInstruction, &["return"]);
    insert_all(&mut t, AsmTokenKind::Qualifier, &["offset", "align"]);

    DialectClassifier {
        dialect: Dialect::Wasm,
        case_insensitive: false,
        comment_prefixes: &[";;", ";"],
        table: t,
    }
}

fn build_llvm_ir() -> DialectClassifier {
    let mut t = HashMap::new();
    insert_common_directives(&mut t);

    insert_all(
        &mut t,
        AsmTokenKind::Instruction,
        &[
            "add", "sub", "mul", "sdiv", "udiv", "srem", "urem", "fadd", "fsub", "fmul", "fdiv",
            "frem", "fneg", "shl", "lshr", "ashr", "and", "or", "xor", "icmp", "fcmp", "load",
            "store", "alloca", "getelementptr", "zext", "sext", "trunc", "fptrunc", "fpext",
            "fptosi", "fptoui", "sitofp", "uitofp", "bitcast", "inttoptr", "ptrtoint",
            "addrspacecast", "select", "phi", "extractvalue", "insertvalue", "extractelement",
            "insertelement", "shufflevector", "atomicrmw", "cmpxchg", "fence", "freeze",
            "switch", "unreachable", "landingpad", "resume", "va_arg",
        ],
    );
    // `br` covers both forms; operand shapes decide whether an edge appears.
    insert_all(&mut t, AsmTokenKind::JumpInstruction, &["br"]);
    insert_all(&mut t, AsmTokenKind::CallInstruction, &["call", "invoke"]);
    insert_all(&mut t, AsmTokenKind::ReturnInstruction, &["ret"]);
    insert_all(&mut t, AsmTokenKind::FunctionBegin, &["define", "declare"]);
    insert_all(
        &mut t,
        AsmTokenKind::Qualifier,
        &[
            "i1", "i8", "i16", "i32", "i64", "i128", "half", "float", "double", "ptr", "void",
            "label", "align", "nsw", "nuw", "exact", "inbounds", "volatile", "atomic", "seq_cst",
            "acquire", "release", "monotonic", "acq_rel", "fast", "nnan", "ninf", "nsz",
            "noundef", "nonnull", "dereferenceable", "eq", "ne", "slt", "sle", "sgt", "sge",
            "ult", "ule", "ugt", "uge", "oeq", "one", "olt", "ole", "ogt", "oge", "to",
        ],
    );

    DialectClassifier {
        dialect: Dialect::LlvmIr,
        case_insensitive: false,
        comment_prefixes: &[";"],
        table: t,
    }
}
