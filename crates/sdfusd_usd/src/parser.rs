//! USDA (ASCII) file parser.
//!
//! Statements are read line by line; a statement that opens a bracket or a
//! triple-quoted string keeps consuming lines until it is balanced again.
//! The parser fills a [`Stage`] arena directly.
//!
//! # Supported Syntax
//!
//! - `#usda 1.0` header with `( upAxis = "Z" metersPerUnit = 0.01 defaultPrim = "World" )`
//! - `def|over|class [Type] "Name" ( metadata ) { ... }`, also on one line
//! - prim metadata: `apiSchemas`, `references`, `payload`, `kind` (with list ops)
//! - `[custom] [uniform] type name = value [( metadata )]`
//! - `type name.connect = </Path.outputs:rgb>`
//! - `[custom] rel name = </Target>` / `rel name = [</A>, </B>]`
//!
//! `.timeSamples`, variant sets and `reorder` statements are skipped.

use std::collections::VecDeque;

use thiserror::Error;

use crate::stage::Stage;
use crate::text::{bracket_balance, leading_expression_len, split_top_level, strip_enclosing, unquote};
use crate::types::{Attribute, Reference, ReferenceKind, Relationship, Specifier};
use crate::value::Value;

/// Errors that can occur during USDA parsing.
#[derive(Error, Debug)]
pub enum ParseError {
    #[error("Parse error at line {line}: {message}")]
    Parse { line: usize, message: String },

    #[error("Unexpected end of file in statement starting at line {0}")]
    UnexpectedEof(usize),

    #[error("Unclosed block starting at line {0}")]
    UnclosedBlock(usize),
}

/// Result type for parsing operations.
pub type ParseResult<T> = Result<T, ParseError>;

/// Parsed `def Type "Name" (...)` line.
struct PrimHeader {
    specifier: Specifier,
    type_name: String,
    name: String,
    metadata: Option<String>,
    /// Content of a one-line body, `Some("")` for `{}`.
    inline_body: Option<String>,
    /// The opening brace was on the header line.
    opened: bool,
}

/// USDA file parser.
pub struct UsdaParser {
    lines: VecDeque<(usize, String)>,
    current_line: usize,
}

impl UsdaParser {
    /// Create a new parser from file contents.
    pub fn new(content: &str) -> Self {
        let lines: VecDeque<_> = content
            .lines()
            .enumerate()
            .map(|(i, s)| (i + 1, s.to_string()))
            .collect();

        Self {
            lines,
            current_line: 0,
        }
    }

    /// Parse the USDA content into a stage.
    pub fn parse(&mut self) -> ParseResult<Stage> {
        let mut stage = Stage::create_in_memory();

        // Skip blank lines up to the `#usda` magic, if present
        while let Some((_, line)) = self.lines.front() {
            let trimmed = line.trim();
            if trimmed.is_empty() {
                self.lines.pop_front();
            } else {
                if trimmed.starts_with("#usda") {
                    self.lines.pop_front();
                }
                break;
            }
        }

        while let Some((line_num, statement)) = self.next_statement()? {
            if statement.starts_with('(') {
                self.parse_stage_metadata(&mut stage, &statement);
            } else if is_prim_header(&statement) {
                self.parse_prim(&mut stage, 0, &statement, line_num)?;
            } else {
                log::debug!("Skipping top-level statement at line {}", line_num);
            }
        }

        Ok(stage)
    }

    /// Pop the next complete statement, joining continuation lines.
    fn next_statement(&mut self) -> ParseResult<Option<(usize, String)>> {
        let (line_num, first) = loop {
            match self.lines.pop_front() {
                Some((num, line)) => {
                    let trimmed = line.trim();
                    if !trimmed.is_empty() && !trimmed.starts_with('#') {
                        break (num, trimmed.to_string());
                    }
                }
                None => return Ok(None),
            }
        };
        self.current_line = line_num;

        let mut statement = first;
        loop {
            let (round, curly) = bracket_balance(&statement);
            let open_doc_string = statement.matches("\"\"\"").count() % 2 == 1;
            // A prim header legitimately leaves its body brace open.
            let open_block = curly > 0 && !is_prim_header(&statement);
            if round <= 0 && !open_doc_string && !open_block {
                break;
            }
            match self.lines.pop_front() {
                Some((_, line)) => {
                    statement.push('\n');
                    statement.push_str(line.trim());
                }
                None => return Err(ParseError::UnexpectedEof(line_num)),
            }
        }

        Ok(Some((line_num, statement)))
    }

    /// Parse a prim block and its children under `parent`.
    fn parse_prim(
        &mut self,
        stage: &mut Stage,
        parent: usize,
        statement: &str,
        start_line: usize,
    ) -> ParseResult<()> {
        let header = self.parse_prim_header(statement)?;
        let index = stage.insert_child(parent, header.name.clone());
        {
            let prim = stage.prim_at_mut(index);
            prim.specifier = header.specifier;
            if !header.type_name.is_empty() {
                prim.type_name = header.type_name.clone();
            }
            if let Some(metadata) = &header.metadata {
                apply_prim_metadata(prim, metadata);
            }
        }

        if let Some(content) = header.inline_body {
            // Feed the one-line body back through the regular block reader
            self.lines.push_front((start_line, "}".to_string()));
            if !content.is_empty() {
                self.lines.push_front((start_line, content));
            }
        } else if !header.opened {
            self.expect_opening_brace(start_line)?;
        }

        self.parse_body(stage, index, start_line)
    }

    fn parse_prim_header(&self, statement: &str) -> ParseResult<PrimHeader> {
        let error = |message: &str| ParseError::Parse {
            line: self.current_line,
            message: format!("{}: {}", message, statement),
        };

        let (keyword, rest) = statement
            .split_once(char::is_whitespace)
            .ok_or_else(|| error("Incomplete prim definition"))?;
        let specifier = match keyword {
            "def" => Specifier::Def,
            "over" => Specifier::Over,
            "class" => Specifier::Class,
            _ => return Err(error("Unknown specifier")),
        };

        let mut rest = rest.trim_start();
        let mut type_name = String::new();
        if !rest.starts_with('"') {
            let end = rest.find(char::is_whitespace).unwrap_or(rest.len());
            type_name = rest[..end].to_string();
            rest = rest[end..].trim_start();
        }

        if !rest.starts_with('"') {
            return Err(error("Expected quoted prim name"));
        }
        let name_len = leading_expression_len(rest);
        let name = unquote(&rest[..name_len]);
        rest = rest[name_len..].trim_start();

        let mut metadata = None;
        if rest.starts_with('(') {
            let len = leading_expression_len(rest);
            metadata = strip_enclosing(&rest[..len], '(', ')').map(str::to_string);
            rest = rest[len..].trim_start();
        }

        let mut inline_body = None;
        let mut opened = false;
        if let Some(body) = rest.strip_prefix('{') {
            match body.trim_end().strip_suffix('}') {
                Some(content) => inline_body = Some(content.trim().to_string()),
                None => opened = true,
            }
        }

        Ok(PrimHeader {
            specifier,
            type_name,
            name,
            metadata,
            inline_body,
            opened,
        })
    }

    /// Expect and consume an opening brace.
    fn expect_opening_brace(&mut self, start_line: usize) -> ParseResult<()> {
        while let Some((_, line)) = self.lines.front() {
            let trimmed = line.trim();
            if trimmed.is_empty() || trimmed.starts_with('#') {
                self.lines.pop_front();
                continue;
            }
            if trimmed == "{" {
                self.lines.pop_front();
                return Ok(());
            }
            if let Some(rest) = trimmed.strip_prefix('{') {
                let rest = rest.trim().to_string();
                if let Some((num, _)) = self.lines.pop_front() {
                    self.lines.push_front((num, rest));
                }
                return Ok(());
            }
            break;
        }

        Err(ParseError::Parse {
            line: start_line,
            message: "Expected opening brace".to_string(),
        })
    }

    /// Parse properties and child prims until the closing brace.
    fn parse_body(&mut self, stage: &mut Stage, index: usize, start_line: usize) -> ParseResult<()> {
        loop {
            let (line_num, statement) = match self.next_statement()? {
                Some(s) => s,
                None => return Err(ParseError::UnclosedBlock(start_line)),
            };

            if statement == "}" {
                return Ok(());
            }
            if let Some(rest) = statement.strip_suffix('}') {
                // `value }` closing a block on the same line
                if bracket_balance(&statement).1 < 0 {
                    self.parse_property(stage, index, rest.trim(), line_num);
                    return Ok(());
                }
            }

            if is_prim_header(&statement) {
                self.parse_prim(stage, index, &statement, line_num)?;
            } else {
                self.parse_property(stage, index, &statement, line_num);
            }
        }
    }

    /// Parse an attribute or relationship statement into the prim.
    fn parse_property(&self, stage: &mut Stage, index: usize, statement: &str, line_num: usize) {
        let mut rest = statement;
        let mut list_op = None;
        for op in ["prepend ", "append ", "add ", "delete ", "reorder "] {
            if let Some(r) = rest.strip_prefix(op) {
                list_op = Some(op.trim());
                rest = r.trim_start();
                break;
            }
        }
        if matches!(list_op, Some("delete") | Some("reorder")) {
            log::debug!("Ignoring '{}' statement at line {}", statement, line_num);
            return;
        }
        if rest.starts_with("variantSet") || rest.starts_with("variants") {
            log::debug!("Skipping variant block at line {}", line_num);
            return;
        }

        let (lhs, rhs) = match rest.find('=') {
            Some(i) => (rest[..i].trim(), Some(rest[i + 1..].trim())),
            None => (rest.trim(), None),
        };
        let words: Vec<&str> = lhs.split_whitespace().collect();
        let prim = stage.prim_at_mut(index);

        // Relationships
        if let Some(pos) = words.iter().position(|w| *w == "rel") {
            let Some(name) = words.get(pos + 1) else {
                log::warn!("Relationship without a name at line {}", line_num);
                return;
            };
            let targets = rhs.map(parse_targets).unwrap_or_default();
            let custom = words[..pos].contains(&"custom");
            match prim.relationships.iter_mut().find(|r| r.name == *name) {
                Some(existing) => existing.targets.extend(targets),
                None => prim.relationships.push(Relationship {
                    name: name.to_string(),
                    targets,
                    custom,
                }),
            }
            return;
        }

        if words.len() < 2 {
            log::debug!("Skipping statement at line {}: {}", line_num, statement);
            return;
        }

        let full_name = words[words.len() - 1];
        let type_name = words[words.len() - 2];
        let qualifiers = &words[..words.len() - 2];

        if full_name.ends_with(".timeSamples") || full_name.ends_with(".spline") {
            log::debug!("Skipping animated attribute {} at line {}", full_name, line_num);
            return;
        }

        let (name, is_connection) = match full_name.strip_suffix(".connect") {
            Some(base) => (base, true),
            None => (full_name, false),
        };

        let attribute = match prim.attributes.iter_mut().position(|a| a.name == name) {
            Some(i) => &mut prim.attributes[i],
            None => {
                prim.attributes.push(Attribute {
                    name: name.to_string(),
                    type_name: type_name.to_string(),
                    ..Default::default()
                });
                let last = prim.attributes.len() - 1;
                &mut prim.attributes[last]
            }
        };
        attribute.uniform |= qualifiers.contains(&"uniform");
        attribute.custom |= qualifiers.contains(&"custom");

        let Some(rhs) = rhs else {
            return;
        };
        if is_connection {
            attribute.connections = parse_targets(rhs);
        } else {
            let len = leading_expression_len(rhs);
            attribute.value = Value::parse(type_name, &rhs[..len]);
        }
    }

    fn parse_stage_metadata(&self, stage: &mut Stage, statement: &str) {
        let Some(inner) = strip_enclosing(statement, '(', ')') else {
            return;
        };
        for (_, key, value) in metadata_entries(inner) {
            match key {
                "upAxis" => match unquote(value).parse() {
                    Ok(axis) => stage.up_axis = axis,
                    Err(e) => log::warn!("{} in stage metadata", e),
                },
                "metersPerUnit" => match value.parse::<f64>() {
                    Ok(mpu) => stage.meters_per_unit = mpu,
                    Err(_) => log::warn!("Invalid metersPerUnit '{}'", value),
                },
                "defaultPrim" => stage.default_prim = Some(unquote(value)),
                "doc" => stage.doc = Some(unquote(value)),
                _ => log::debug!("Ignoring stage metadata '{}'", key),
            }
        }
    }
}

fn is_prim_header(statement: &str) -> bool {
    ["def ", "over ", "class "]
        .iter()
        .any(|kw| statement.starts_with(kw))
        && statement.contains('"')
}

/// Split a metadata block into `(list_op, key, value)` entries.
fn metadata_entries(text: &str) -> Vec<(Option<&str>, &str, &str)> {
    let mut entries = Vec::new();
    let mut rest = text;

    loop {
        rest = rest.trim_start_matches(|c: char| c.is_whitespace() || c == ';');
        if rest.is_empty() {
            break;
        }
        if !rest.starts_with(|c: char| c.is_alphanumeric() || c == '_') {
            // Bare doc strings and stray tokens
            let len = leading_expression_len(rest).max(1);
            rest = rest.get(len..).unwrap_or("");
            continue;
        }

        let word_len = |s: &str| s.find(|c: char| c.is_whitespace() || c == '=').unwrap_or(s.len());
        let mut len = word_len(rest);
        let mut list_op = None;
        if matches!(&rest[..len], "prepend" | "append" | "add" | "delete" | "reorder") {
            list_op = Some(&rest[..len]);
            rest = rest[len..].trim_start();
            len = word_len(rest);
        }
        let key = &rest[..len];
        rest = rest[len..].trim_start();

        match rest.strip_prefix('=') {
            Some(after) => {
                let after = after.trim_start();
                let len = leading_expression_len(after);
                entries.push((list_op, key, &after[..len]));
                rest = &after[len..];
            }
            None if key.is_empty() => {
                rest = rest.get(1..).unwrap_or("");
            }
            None => {}
        }
    }

    entries
}

fn apply_prim_metadata(prim: &mut crate::types::Prim, metadata: &str) {
    for (list_op, key, value) in metadata_entries(metadata) {
        if list_op == Some("delete") {
            continue;
        }
        match key {
            "apiSchemas" => {
                if let Some(Value::TokenArray(apis)) = Value::parse("token[]", value) {
                    for api in apis {
                        prim.apply_api(&api);
                    }
                }
            }
            "references" => prim
                .references
                .extend(parse_references(value, ReferenceKind::Reference)),
            "payload" => prim
                .references
                .extend(parse_references(value, ReferenceKind::Payload)),
            "kind" => prim.kind = Some(unquote(value)),
            _ => log::debug!("Ignoring prim metadata '{}' on {}", key, prim.path),
        }
    }
}

/// Parse `@a.usda@</P>`, `</P>` or a bracketed list of those.
fn parse_references(value: &str, kind: ReferenceKind) -> Vec<Reference> {
    let items = match strip_enclosing(value, '[', ']') {
        Some(inner) => split_top_level(inner, ','),
        None => vec![value.trim()],
    };

    items
        .into_iter()
        .filter_map(|item| {
            if item == "None" || item.is_empty() {
                return None;
            }
            let mut asset_path = String::new();
            let mut rest = item;
            if let Some(after) = item.strip_prefix('@') {
                let end = after.find('@')?;
                asset_path = after[..end].to_string();
                rest = &after[end + 1..];
            }
            let prim_path = rest
                .trim_start()
                .strip_prefix('<')
                .and_then(|r| r.find('>').map(|end| r[..end].to_string()))
                .filter(|p| !p.is_empty());
            if asset_path.is_empty() && prim_path.is_none() {
                return None;
            }
            Some(Reference {
                kind,
                asset_path,
                prim_path,
            })
        })
        .collect()
}

/// Extract every `<path>` target from a relationship or connection value.
fn parse_targets(value: &str) -> Vec<String> {
    let mut targets = Vec::new();
    let mut rest = value;
    while let Some(start) = rest.find('<') {
        let after = &rest[start + 1..];
        match after.find('>') {
            Some(end) => {
                if end > 0 {
                    targets.push(after[..end].to_string());
                }
                rest = &after[end + 1..];
            }
            None => break,
        }
    }
    targets
}

/// Parse a USDA string into a stage.
pub fn parse_usda(content: &str) -> ParseResult<Stage> {
    let mut parser = UsdaParser::new(content);
    parser.parse()
}
