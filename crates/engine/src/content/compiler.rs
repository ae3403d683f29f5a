use std::collections::{BTreeMap, HashSet};
use std::fmt;
use std::fs;
use std::path::Path;

use roxmltree::{Document, Node};

use super::database::{DefDatabase, ThingDef, ThingDefId, ThingDefKind};
use super::hashing::sha256_hex;

const BUILTIN_DEFS_XML: &str = include_str!("../../assets/things.xml");
const BUILTIN_SOURCE_NAME: &str = "<builtin>/things.xml";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SourceLocation {
    pub line: usize,
    pub column: usize,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DefErrorCode {
    ReadFile,
    XmlMalformed,
    InvalidRoot,
    UnknownDefType,
    UnknownField,
    DuplicateField,
    MissingField,
    InvalidValue,
    DuplicateDef,
}

#[derive(Debug, Clone)]
pub struct DefCompileError {
    pub code: DefErrorCode,
    pub message: String,
    pub source_name: String,
    pub location: Option<SourceLocation>,
}

impl fmt::Display for DefCompileError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.location {
            Some(loc) => write!(
                f,
                "{:?}: {} (source={}, line={}, column={})",
                self.code, self.message, self.source_name, loc.line, loc.column
            ),
            None => write!(
                f,
                "{:?}: {} (source={})",
                self.code, self.message, self.source_name
            ),
        }
    }
}

impl std::error::Error for DefCompileError {}

#[derive(Debug, Clone)]
struct PendingThingDef {
    def_name: String,
    label: String,
    kind: ThingDefKind,
    blocks_standing: bool,
}

impl DefDatabase {
    /// Definitions shipped with the engine.
    pub fn builtin() -> Result<Self, DefCompileError> {
        compile_thing_defs(BUILTIN_SOURCE_NAME, BUILTIN_DEFS_XML)
    }
}

pub fn compile_thing_defs_file(path: &Path) -> Result<DefDatabase, DefCompileError> {
    let source_name = path.display().to_string();
    let raw = fs::read_to_string(path).map_err(|error| DefCompileError {
        code: DefErrorCode::ReadFile,
        message: format!("failed to read XML file: {error}"),
        source_name: source_name.clone(),
        location: None,
    })?;
    compile_thing_defs(&source_name, &raw)
}

pub fn compile_thing_defs(source_name: &str, raw: &str) -> Result<DefDatabase, DefCompileError> {
    let doc = Document::parse(raw).map_err(|error| DefCompileError {
        code: DefErrorCode::XmlMalformed,
        message: format!("malformed XML: {error}"),
        source_name: source_name.to_string(),
        location: Some(SourceLocation {
            line: error.pos().row as usize,
            column: error.pos().col as usize,
        }),
    })?;

    let root = doc.root_element();
    if root.tag_name().name() != "Defs" {
        return Err(error_at_node(
            DefErrorCode::InvalidRoot,
            "root element must be <Defs>".to_string(),
            source_name,
            &doc,
            root,
        ));
    }

    // Sorted by def name so ids are stable regardless of document order.
    let mut merged = BTreeMap::<String, PendingThingDef>::new();
    for child in root.children().filter(|node| node.is_element()) {
        if child.tag_name().name() != "ThingDef" {
            return Err(error_at_node(
                DefErrorCode::UnknownDefType,
                format!(
                    "unsupported def type <{}>; only <ThingDef> is supported",
                    child.tag_name().name()
                ),
                source_name,
                &doc,
                child,
            ));
        }
        let def = parse_thing_def(source_name, &doc, child)?;
        if merged.contains_key(&def.def_name) {
            return Err(error_at_node(
                DefErrorCode::DuplicateDef,
                format!("duplicate ThingDef '{}'", def.def_name),
                source_name,
                &doc,
                child,
            ));
        }
        merged.insert(def.def_name.clone(), def);
    }

    let thing_defs = merged
        .into_values()
        .map(|def| ThingDef {
            id: ThingDefId(0),
            def_name: def.def_name,
            label: def.label,
            kind: def.kind,
            blocks_standing: def.blocks_standing,
        })
        .collect::<Vec<_>>();

    Ok(DefDatabase::from_thing_defs(
        thing_defs,
        sha256_hex(raw.as_bytes()),
    ))
}

fn parse_thing_def(
    source_name: &str,
    doc: &Document<'_>,
    node: Node<'_, '_>,
) -> Result<PendingThingDef, DefCompileError> {
    let mut seen_fields = HashSet::<String>::new();
    let mut def_name: Option<String> = None;
    let mut label: Option<String> = None;
    let mut kind: Option<ThingDefKind> = None;
    let mut blocks_standing: Option<bool> = None;

    for field in node.children().filter(|child| child.is_element()) {
        let field_name = field.tag_name().name().to_string();
        if !seen_fields.insert(field_name.clone()) {
            return Err(error_at_node(
                DefErrorCode::DuplicateField,
                format!("duplicate field <{}> in <ThingDef>", field_name),
                source_name,
                doc,
                field,
            ));
        }

        match field_name.as_str() {
            "defName" => {
                def_name = Some(required_text(source_name, doc, field, "defName")?);
            }
            "label" => {
                label = Some(required_text(source_name, doc, field, "label")?);
            }
            "kind" => {
                let value = required_text(source_name, doc, field, "kind")?;
                let parsed = match value.as_str() {
                    "Placeholder" => ThingDefKind::Placeholder,
                    "Wrapper" => ThingDefKind::Wrapper,
                    _ => {
                        return Err(error_at_node(
                            DefErrorCode::InvalidValue,
                            format!(
                                "invalid kind '{}'; allowed values: Placeholder, Wrapper",
                                value
                            ),
                            source_name,
                            doc,
                            field,
                        ))
                    }
                };
                kind = Some(parsed);
            }
            "blocksStanding" => {
                let value = required_text(source_name, doc, field, "blocksStanding")?;
                let parsed = value.parse::<bool>().map_err(|_| {
                    error_at_node(
                        DefErrorCode::InvalidValue,
                        format!("blocksStanding '{}' must be true or false", value),
                        source_name,
                        doc,
                        field,
                    )
                })?;
                blocks_standing = Some(parsed);
            }
            _ => {
                return Err(error_at_node(
                    DefErrorCode::UnknownField,
                    format!("unknown field <{}> in <ThingDef>", field_name),
                    source_name,
                    doc,
                    field,
                ))
            }
        }
    }

    let Some(def_name) = def_name else {
        return Err(missing_field(source_name, doc, node, "defName"));
    };
    let Some(label) = label else {
        return Err(missing_field(source_name, doc, node, "label"));
    };
    let Some(kind) = kind else {
        return Err(missing_field(source_name, doc, node, "kind"));
    };

    Ok(PendingThingDef {
        def_name,
        label,
        kind,
        blocks_standing: blocks_standing.unwrap_or(false),
    })
}

fn required_text(
    source_name: &str,
    doc: &Document<'_>,
    node: Node<'_, '_>,
    field_name: &str,
) -> Result<String, DefCompileError> {
    let value = node.text().map(str::trim).unwrap_or_default().to_string();
    if value.is_empty() {
        return Err(error_at_node(
            DefErrorCode::MissingField,
            format!("field <{}> must not be empty", field_name),
            source_name,
            doc,
            node,
        ));
    }
    Ok(value)
}

fn missing_field(
    source_name: &str,
    doc: &Document<'_>,
    node: Node<'_, '_>,
    field_name: &str,
) -> DefCompileError {
    error_at_node(
        DefErrorCode::MissingField,
        format!("missing required field <{}> in <ThingDef>", field_name),
        source_name,
        doc,
        node,
    )
}

fn error_at_node(
    code: DefErrorCode,
    message: String,
    source_name: &str,
    doc: &Document<'_>,
    node: Node<'_, '_>,
) -> DefCompileError {
    let pos = doc.text_pos_at(node.range().start);
    DefCompileError {
        code,
        message,
        source_name: source_name.to_string(),
        location: Some(SourceLocation {
            line: pos.row as usize,
            column: pos.col as usize,
        }),
    }
}
