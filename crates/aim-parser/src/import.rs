//! Import extraction from parsed source using tree-sitter queries.
//!
//! Extraction runs in two passes. The first walks every query match and
//! records candidates, learning along the way which local names are bound to
//! `importSync`. The second turns candidates into [`ImportSyntax`] in source
//! order, dropping identifier calls that turned out not to be `importSync`.

use aim_core::{FxHashSet, ImportSyntax, LiteralSyntax, SourceLocation, TemplateSyntax};
use smallvec::SmallVec;
use streaming_iterator::StreamingIterator;
use tree_sitter::{Node, QueryCursor, QueryMatch, Tree};

use crate::cook::cook;
use crate::error::ParseError;
use crate::queries::{ImportQuery, PATTERN_CALL, PATTERN_DYNAMIC, PATTERN_EXPORT, PATTERN_IMPORT};

/// The module that provides the synchronous import helper.
pub const MACROS_MODULE: &str = "@embroider/macros";

/// The synchronous import helper's exported name.
pub const IMPORT_SYNC: &str = "importSync";

/// A match worth looking at once all bindings are known.
#[derive(Debug, Clone, Copy)]
enum Candidate<'tree> {
    Static {
        statement: Node<'tree>,
        source: Node<'tree>,
    },
    Dynamic {
        call: Node<'tree>,
        arguments: Node<'tree>,
    },
    Call {
        call: Node<'tree>,
        callee: Node<'tree>,
        arguments: Node<'tree>,
    },
}

impl Candidate<'_> {
    fn start_byte(&self) -> usize {
        match self {
            Self::Static { statement, .. } => statement.start_byte(),
            Self::Dynamic { call, .. } | Self::Call { call, .. } => call.start_byte(),
        }
    }
}

/// Extracts all imports from a parsed syntax tree.
///
/// # Errors
///
/// - Returns [`ParseError::Syntax`] if the tree contains error or missing nodes
/// - Returns [`ParseError::UnsupportedDynamicImport`] for an `import()` or
///   `importSync()` whose argument is not a string or template literal
pub fn extract_imports(
    tree: &Tree,
    source: &str,
    compiled: &ImportQuery,
) -> Result<SmallVec<[ImportSyntax; 8]>, ParseError> {
    let root = tree.root_node();
    if root.has_error() {
        let location = first_error(root).map_or_else(|| node_to_location(root), node_to_location);
        return Err(ParseError::Syntax { location });
    }

    let bytes = source.as_bytes();
    let mut cursor = QueryCursor::new();
    let mut matches = cursor.matches(&compiled.query, root, bytes);

    let mut candidates: Vec<Candidate<'_>> = Vec::new();
    let mut sync_bindings: FxHashSet<String> = FxHashSet::default();

    while let Some(m) = matches.next() {
        match m.pattern_index {
            PATTERN_IMPORT | PATTERN_EXPORT => {
                let (Some(statement), Some(source_node)) = (
                    capture(m, compiled.static_statement),
                    capture(m, compiled.static_source),
                ) else {
                    continue;
                };
                if is_type_only(statement) {
                    continue;
                }
                if m.pattern_index == PATTERN_IMPORT
                    && string_value(source_node, bytes).as_deref() == Some(MACROS_MODULE)
                {
                    collect_sync_bindings(statement, bytes, &mut sync_bindings);
                }
                candidates.push(Candidate::Static {
                    statement,
                    source: source_node,
                });
            }
            PATTERN_DYNAMIC => {
                if let (Some(call), Some(arguments)) = (
                    capture(m, compiled.dynamic_call),
                    capture(m, compiled.dynamic_arguments),
                ) {
                    // `typeof import('x')` and `import('x').T` name types only.
                    if !in_type_context(call) {
                        candidates.push(Candidate::Dynamic { call, arguments });
                    }
                }
            }
            PATTERN_CALL => {
                if let (Some(call), Some(callee), Some(arguments)) = (
                    capture(m, compiled.call_expression),
                    capture(m, compiled.call_callee),
                    capture(m, compiled.call_arguments),
                ) {
                    candidates.push(Candidate::Call {
                        call,
                        callee,
                        arguments,
                    });
                }
            }
            _ => {}
        }
    }

    candidates.sort_by_key(Candidate::start_byte);

    let mut imports = SmallVec::new();
    for candidate in candidates {
        match candidate {
            Candidate::Static {
                statement,
                source: source_node,
            } => {
                if let Some(specifier) = string_value(source_node, bytes) {
                    imports.push(ImportSyntax::Literal(LiteralSyntax::new(
                        specifier,
                        false,
                        node_to_location(statement),
                    )));
                }
            }
            Candidate::Dynamic { call, arguments } => {
                imports.push(call_argument(call, arguments, "import", true, bytes)?);
            }
            Candidate::Call {
                call,
                callee,
                arguments,
            } => {
                let Some(name) = node_text(callee, bytes) else {
                    continue;
                };
                if sync_bindings.contains(name) {
                    imports.push(call_argument(call, arguments, name, false, bytes)?);
                }
            }
        }
    }

    Ok(imports)
}

/// Returns the capture with the given index from a match.
fn capture<'tree>(m: &QueryMatch<'_, 'tree>, index: u32) -> Option<Node<'tree>> {
    m.captures
        .iter()
        .find(|capture| capture.index == index)
        .map(|capture| capture.node)
}

/// Checks if an import or export statement is type-only.
///
/// Type-only statements carry an anonymous `type` token right after the
/// leading keyword: `import type { X } from '…'`, `export type { X } from '…'`.
fn is_type_only(statement: Node<'_>) -> bool {
    let mut cursor = statement.walk();
    statement
        .children(&mut cursor)
        .any(|child| !child.is_named() && matches!(child.kind(), "type" | "typeof"))
}

/// Whether `node` sits inside a type annotation, alias or query.
fn in_type_context(node: Node<'_>) -> bool {
    let mut current = node.parent();
    while let Some(parent) = current {
        let kind = parent.kind();
        if kind.ends_with("_type")
            || matches!(
                kind,
                "type_query"
                    | "type_annotation"
                    | "type_alias_declaration"
                    | "type_arguments"
                    | "type_parameters"
                    | "interface_declaration"
                    | "implements_clause"
                    | "extends_type_clause"
            )
        {
            return true;
        }
        current = parent.parent();
    }
    false
}

/// Records the local names `importSync` is bound to by an import statement.
fn collect_sync_bindings(statement: Node<'_>, bytes: &[u8], bindings: &mut FxHashSet<String>) {
    let mut stack = vec![statement];
    while let Some(node) = stack.pop() {
        if node.kind() == "import_specifier" {
            let imported = node
                .child_by_field_name("name")
                .and_then(|name| node_text(name, bytes));
            if imported == Some(IMPORT_SYNC) {
                let local = node
                    .child_by_field_name("alias")
                    .and_then(|alias| node_text(alias, bytes))
                    .unwrap_or(IMPORT_SYNC);
                bindings.insert(local.to_owned());
            }
            continue;
        }
        let mut cursor = node.walk();
        stack.extend(node.named_children(&mut cursor));
    }
}

/// Turns the argument of an import-like call into [`ImportSyntax`].
fn call_argument(
    call: Node<'_>,
    arguments: Node<'_>,
    callee: &str,
    is_dynamic: bool,
    bytes: &[u8],
) -> Result<ImportSyntax, ParseError> {
    let location = node_to_location(call);
    let unsupported = || ParseError::UnsupportedDynamicImport {
        callee: callee.to_owned(),
        location,
    };

    let mut cursor = arguments.walk();
    let argument = arguments
        .named_children(&mut cursor)
        .find(|child| child.kind() != "comment")
        .ok_or_else(unsupported)?;

    match argument.kind() {
        "string" => {
            let specifier = string_value(argument, bytes).ok_or_else(unsupported)?;
            Ok(ImportSyntax::Literal(LiteralSyntax::new(
                specifier, is_dynamic, location,
            )))
        }
        "template_string" => {
            let (quasis, hints) = template_parts(argument, bytes).ok_or_else(unsupported)?;
            if hints.is_empty() {
                let specifier = quasis.into_iter().next().unwrap_or_default();
                return Ok(ImportSyntax::Literal(LiteralSyntax::new(
                    specifier, is_dynamic, location,
                )));
            }
            TemplateSyntax::new(quasis, hints, is_dynamic, location)
                .map(ImportSyntax::Template)
                .ok_or_else(unsupported)
        }
        _ => Err(unsupported()),
    }
}

/// Returns the cooked value of a `string` node.
fn string_value(node: Node<'_>, bytes: &[u8]) -> Option<String> {
    let raw = delimited_text(node, bytes)?;
    Some(cook(raw, false))
}

/// Splits a `template_string` node into cooked quasis and name hints.
///
/// The quasis are the raw byte ranges between substitutions, so the result
/// does not depend on how the grammar chunks literal text into children.
fn template_parts(node: Node<'_>, bytes: &[u8]) -> Option<(Vec<String>, Vec<Option<String>>)> {
    let body_end = node.end_byte().checked_sub(1)?;
    let mut offset = node.start_byte() + 1;
    let mut quasis = Vec::new();
    let mut hints = Vec::new();

    let mut cursor = node.walk();
    for substitution in node
        .named_children(&mut cursor)
        .filter(|child| child.kind() == "template_substitution")
    {
        let raw = std::str::from_utf8(bytes.get(offset..substitution.start_byte())?).ok()?;
        quasis.push(cook(raw, true));
        hints.push(name_hint(substitution, bytes));
        offset = substitution.end_byte();
    }

    let raw = std::str::from_utf8(bytes.get(offset..body_end)?).ok()?;
    quasis.push(cook(raw, true));
    Some((quasis, hints))
}

/// The identifier inside `${…}`, if the expression is a bare identifier.
fn name_hint(substitution: Node<'_>, bytes: &[u8]) -> Option<String> {
    let mut cursor = substitution.walk();
    let expression = substitution
        .named_children(&mut cursor)
        .find(|child| child.kind() != "comment")?;
    if expression.kind() != "identifier" {
        return None;
    }
    node_text(expression, bytes).map(str::to_owned)
}

/// Finds the first error or missing node, in document order.
fn first_error<'tree>(node: Node<'tree>) -> Option<Node<'tree>> {
    if node.is_error() || node.is_missing() {
        return Some(node);
    }
    if !node.has_error() {
        return None;
    }
    let mut cursor = node.walk();
    let children: Vec<Node<'tree>> = node.children(&mut cursor).collect();
    children.into_iter().find_map(first_error)
}

/// Text of a node with its first and last byte (the delimiters) removed.
fn delimited_text<'a>(node: Node<'_>, bytes: &'a [u8]) -> Option<&'a str> {
    let start = node.start_byte() + 1;
    let end = node.end_byte().checked_sub(1)?;
    std::str::from_utf8(bytes.get(start..end)?).ok()
}

/// Extracts text from a node.
fn node_text<'a>(node: Node<'_>, bytes: &'a [u8]) -> Option<&'a str> {
    std::str::from_utf8(bytes.get(node.start_byte()..node.end_byte())?).ok()
}

/// Converts a node's position to a [`SourceLocation`].
///
/// # Note
///
/// The casts from `usize` to `u32` are safe because source files
/// are limited to 4GB, which fits in `u32`.
#[allow(clippy::cast_possible_truncation)]
fn node_to_location(node: Node<'_>) -> SourceLocation {
    let start = node.start_position();
    SourceLocation::new(
        start.row as u32 + 1, // Convert 0-indexed to 1-indexed
        start.column as u32,
        node.start_byte() as u32,
    )
}
