//! Interface scanner for GLSL 330 sources.
//!
//! Not a compiler: it checks the few things that make a stage obviously
//! invalid (no `main`, unbalanced braces, `#error`) and extracts the global
//! declarations a linker would see. A declaration counts as active when its
//! name appears anywhere besides the declaration itself.

use std::collections::HashMap;

/// Storage qualifier of a global declaration.
#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub(crate) enum Storage {
    In,
    Out,
    Uniform,
}

#[derive(Debug, Clone, PartialEq)]
pub(crate) struct Decl {
    pub storage: Storage,
    pub ty: String,
    pub name: String,
    pub array_len: Option<u32>,
    pub location: Option<u32>,
    pub active: bool,
}

#[derive(Debug, Clone, PartialEq)]
pub(crate) struct BlockDecl {
    pub name: String,
    pub members: Vec<Decl>,
    pub binding: Option<u32>,
    pub active: bool,
}

/// Globals of one compiled stage.
#[derive(Debug, Clone, Default, PartialEq)]
pub(crate) struct Interface {
    pub globals: Vec<Decl>,
    pub blocks: Vec<BlockDecl>,
}

impl Interface {
    pub fn with_storage(&self, storage: Storage) -> impl Iterator<Item = &Decl> {
        self.globals.iter().filter(move |d| d.storage == storage)
    }
}

/// Native type tag for a GLSL type name.
pub(crate) fn type_tag(ty: &str) -> Option<u32> {
    let tag = match ty {
        "float" => glow::FLOAT,
        "vec2" => glow::FLOAT_VEC2,
        "vec3" => glow::FLOAT_VEC3,
        "vec4" => glow::FLOAT_VEC4,
        "int" => glow::INT,
        "ivec2" => glow::INT_VEC2,
        "ivec3" => glow::INT_VEC3,
        "ivec4" => glow::INT_VEC4,
        "uint" => glow::UNSIGNED_INT,
        "bool" => glow::BOOL,
        "mat2" => glow::FLOAT_MAT2,
        "mat3" => glow::FLOAT_MAT3,
        "mat4" => glow::FLOAT_MAT4,
        "sampler2D" => glow::SAMPLER_2D,
        "sampler3D" => glow::SAMPLER_3D,
        "samplerCube" => glow::SAMPLER_CUBE,
        _ => return None,
    };
    Some(tag)
}

/// std140 (base alignment, size) of a non-array member.
fn std140_layout(ty: &str) -> (usize, usize) {
    match ty {
        "float" | "int" | "uint" | "bool" => (4, 4),
        "vec2" | "ivec2" => (8, 8),
        "vec3" | "ivec3" => (16, 12),
        "vec4" | "ivec4" => (16, 16),
        "mat2" => (16, 32),
        "mat3" => (16, 48),
        "mat4" => (16, 64),
        _ => (16, 16),
    }
}

fn align_up(value: usize, align: usize) -> usize {
    value.div_ceil(align) * align
}

/// Byte size of a uniform block under std140 rules.
pub(crate) fn std140_block_size(members: &[Decl]) -> usize {
    let mut offset = 0;
    for member in members {
        let (align, size) = std140_layout(&member.ty);
        match member.array_len {
            Some(len) => {
                let stride = align_up(size, 16);
                offset = align_up(offset, 16) + stride * len as usize;
            }
            None => offset = align_up(offset, align) + size,
        }
    }
    align_up(offset, 16)
}

/// Scans one stage. On failure returns a driver-style info log.
pub(crate) fn scan(source: &str) -> Result<Interface, String> {
    let clean = strip_comments(source);

    for (line_no, line) in clean.lines().enumerate() {
        let line = line.trim_start();
        if let Some(rest) = line.strip_prefix("#error") {
            return Err(format!("ERROR: 0:{}: '#error' : {}", line_no + 1, rest.trim()));
        }
    }

    let code: String = clean
        .lines()
        .map(|l| if l.trim_start().starts_with('#') { "" } else { l })
        .collect::<Vec<_>>()
        .join("\n");

    check_braces(&code)?;

    if !has_main(&code) {
        return Err("ERROR: 0:1: 'main' : function not defined".to_string());
    }

    let counts = identifier_counts(&code);
    let mut interface = Interface::default();

    for statement in top_level_statements(&code) {
        match statement {
            Statement::Plain(text) => {
                for decl in parse_declaration(&text)? {
                    let active = counts.get(decl.name.as_str()).copied().unwrap_or(0) > 1;
                    interface.globals.push(Decl { active, ..decl });
                }
            }
            Statement::Block { head, body, tail } => {
                if let Some(block) = parse_block(&head, &body, &tail, &counts)? {
                    interface.blocks.push(block);
                }
            }
        }
    }

    Ok(interface)
}

fn strip_comments(source: &str) -> String {
    let mut out = String::with_capacity(source.len());
    let mut chars = source.chars().peekable();
    while let Some(c) = chars.next() {
        match (c, chars.peek()) {
            ('/', Some('/')) => {
                for c in chars.by_ref() {
                    if c == '\n' {
                        out.push('\n');
                        break;
                    }
                }
            }
            ('/', Some('*')) => {
                chars.next();
                let mut prev = '\0';
                for c in chars.by_ref() {
                    if c == '\n' {
                        out.push('\n');
                    }
                    if prev == '*' && c == '/' {
                        break;
                    }
                    prev = c;
                }
                out.push(' ');
            }
            _ => out.push(c),
        }
    }
    out
}

fn check_braces(code: &str) -> Result<(), String> {
    let mut depth = 0i32;
    for (line_no, line) in code.lines().enumerate() {
        for c in line.chars() {
            match c {
                '{' => depth += 1,
                '}' => {
                    depth -= 1;
                    if depth < 0 {
                        return Err(format!(
                            "ERROR: 0:{}: '}}' : syntax error, unexpected RIGHT_BRACE",
                            line_no + 1
                        ));
                    }
                }
                _ => {}
            }
        }
    }
    if depth != 0 {
        return Err(format!(
            "ERROR: 0:{}: '' : syntax error, unexpected end of file",
            code.lines().count()
        ));
    }
    Ok(())
}

fn has_main(code: &str) -> bool {
    let tokens: Vec<&str> = code
        .split(|c: char| !(c.is_alphanumeric() || c == '_'))
        .filter(|t| !t.is_empty())
        .collect();
    tokens.windows(2).any(|w| w == ["void", "main"])
}

fn identifier_counts(code: &str) -> HashMap<&str, usize> {
    let mut counts = HashMap::new();
    for token in code.split(|c: char| !(c.is_alphanumeric() || c == '_')) {
        if token.is_empty() || token.starts_with(|c: char| c.is_ascii_digit()) {
            continue;
        }
        *counts.entry(token).or_insert(0) += 1;
    }
    counts
}

enum Statement {
    Plain(String),
    Block {
        head: String,
        body: String,
        tail: String,
    },
}

/// Splits depth-0 text into `;`-terminated declarations and `{}` groups.
///
/// Function definitions come out as blocks too; `parse_block` discards
/// anything that is not a `uniform` interface block.
fn top_level_statements(code: &str) -> Vec<Statement> {
    let mut statements = Vec::new();
    let mut current = String::new();
    let mut chars = code.chars();

    while let Some(c) = chars.next() {
        match c {
            ';' => {
                let text = current.trim().to_string();
                if !text.is_empty() {
                    statements.push(Statement::Plain(text));
                }
                current.clear();
            }
            '{' => {
                let head = current.trim().to_string();
                current.clear();

                let mut body = String::new();
                let mut depth = 1;
                for c in chars.by_ref() {
                    match c {
                        '{' => depth += 1,
                        '}' => {
                            depth -= 1;
                            if depth == 0 {
                                break;
                            }
                        }
                        _ => {}
                    }
                    body.push(c);
                }

                // A function body ends at its brace; a block runs to the `;`.
                let is_function = head.ends_with(')');
                let mut tail = String::new();
                if !is_function {
                    for c in chars.by_ref() {
                        if c == ';' {
                            break;
                        }
                        tail.push(c);
                    }
                }

                statements.push(Statement::Block {
                    head,
                    body,
                    tail: tail.trim().to_string(),
                });
            }
            _ => current.push(c),
        }
    }

    statements
}

#[derive(Default)]
struct Layout {
    location: Option<u32>,
    binding: Option<u32>,
}

/// Splits a leading `layout(...)` qualifier off `text`.
fn take_layout(text: &str) -> Result<(Layout, &str), String> {
    let trimmed = text.trim_start();
    let Some(rest) = trimmed.strip_prefix("layout") else {
        return Ok((Layout::default(), trimmed));
    };
    let rest = rest.trim_start();
    let open = rest
        .strip_prefix('(')
        .ok_or_else(|| "ERROR: 0:1: 'layout' : syntax error, expected '('".to_string())?;
    let close = open
        .find(')')
        .ok_or_else(|| "ERROR: 0:1: 'layout' : syntax error, missing ')'".to_string())?;

    let mut layout = Layout::default();
    for qualifier in open[..close].split(',') {
        let mut parts = qualifier.splitn(2, '=');
        let key = parts.next().unwrap_or("").trim();
        let value = parts.next().map(str::trim).and_then(|v| v.parse::<u32>().ok());
        match key {
            "location" => layout.location = value,
            "binding" => layout.binding = value,
            _ => {}
        }
    }

    Ok((layout, &open[close + 1..]))
}

const IGNORED_QUALIFIERS: &[&str] = &[
    "flat",
    "smooth",
    "noperspective",
    "centroid",
    "highp",
    "mediump",
    "lowp",
    "invariant",
];

fn split_array(declarator: &str) -> Result<(String, Option<u32>), String> {
    match declarator.split_once('[') {
        None => Ok((declarator.trim().to_string(), None)),
        Some((name, rest)) => {
            let len = rest
                .trim_end()
                .trim_end_matches(']')
                .trim()
                .parse::<u32>()
                .map_err(|_| {
                    format!("ERROR: 0:1: '{}' : array size must be a constant integer", name.trim())
                })?;
            Ok((name.trim().to_string(), Some(len)))
        }
    }
}

fn parse_declaration(text: &str) -> Result<Vec<Decl>, String> {
    let (layout, rest) = take_layout(text)?;
    let mut tokens = rest
        .split_whitespace()
        .filter(|t| !IGNORED_QUALIFIERS.contains(t))
        .peekable();

    let storage = match tokens.peek().copied() {
        Some("in") | Some("attribute") => Storage::In,
        Some("out") | Some("varying") => Storage::Out,
        Some("uniform") => Storage::Uniform,
        // precision statements, constants, struct-free locals at file scope
        _ => return Ok(Vec::new()),
    };
    tokens.next();

    let Some(ty) = tokens.next() else {
        return Err("ERROR: 0:1: '' : syntax error, missing type".to_string());
    };
    if type_tag(ty).is_none() {
        return Err(format!("ERROR: 0:1: '{ty}' : syntax error, unknown type"));
    }

    let declarators: String = tokens.collect::<Vec<_>>().join(" ");
    let mut decls = Vec::new();
    for (i, declarator) in declarators.split(',').enumerate() {
        let declarator = declarator.split('=').next().unwrap_or("").trim();
        if declarator.is_empty() {
            return Err(format!("ERROR: 0:1: '{ty}' : syntax error, missing identifier"));
        }
        let (name, array_len) = split_array(declarator)?;
        decls.push(Decl {
            storage,
            ty: ty.to_string(),
            name,
            array_len,
            location: layout.location.map(|l| l + i as u32),
            active: false,
        });
    }
    Ok(decls)
}

fn parse_block(
    head: &str,
    body: &str,
    tail: &str,
    counts: &HashMap<&str, usize>,
) -> Result<Option<BlockDecl>, String> {
    if head.ends_with(')') {
        return Ok(None);
    }
    let (layout, rest) = take_layout(head)?;
    let mut tokens = rest.split_whitespace();
    if tokens.next() != Some("uniform") {
        return Ok(None);
    }
    let Some(name) = tokens.next() else {
        return Err("ERROR: 0:1: 'uniform' : syntax error, missing block name".to_string());
    };

    let mut members = Vec::new();
    for member in body.split(';').map(str::trim).filter(|m| !m.is_empty()) {
        let mut parts = member.split_whitespace();
        let (Some(ty), Some(declarator)) = (parts.next(), parts.next()) else {
            return Err(format!("ERROR: 0:1: '{member}' : syntax error in block '{name}'"));
        };
        if type_tag(ty).is_none() {
            return Err(format!("ERROR: 0:1: '{ty}' : syntax error, unknown type"));
        }
        let (member_name, array_len) = split_array(declarator)?;
        let active = counts.get(member_name.as_str()).copied().unwrap_or(0) > 1;
        members.push(Decl {
            storage: Storage::Uniform,
            ty: ty.to_string(),
            name: member_name,
            array_len,
            location: None,
            active,
        });
    }

    let instance_used = !tail.is_empty() && counts.get(tail).copied().unwrap_or(0) > 1;
    let active = instance_used || members.iter().any(|m| m.active);

    Ok(Some(BlockDecl {
        name: name.to_string(),
        members,
        binding: layout.binding,
        active,
    }))
}
