use std::cmp::Ordering;
use std::collections::{BTreeMap, BTreeSet};
use std::sync::OnceLock;

use crate::ast::{rule, AstNode};
use crate::candidate::{parse_candidate, Candidate, CandidateModifier};
use crate::theme::Theme;
use crate::utility::{UtilityKind, UtilityOutput, UtilityRegistry};
use crate::variant::{apply_variant, VariantRegistry};
use crate::DesignSystem;

const SORT_SENTINEL: &str = "--tw-sort";

static PROPERTY_ORDER: &[&str] = &[
    "container-type",
    "pointer-events",
    "visibility",
    "position",
    "inset",
    "inset-inline",
    "inset-block",
    "top",
    "right",
    "bottom",
    "left",
    "isolation",
    "z-index",
    "order",
    "grid-column",
    "grid-column-start",
    "grid-column-end",
    "grid-row",
    "grid-row-start",
    "grid-row-end",
    "float",
    "clear",
    "margin",
    "margin-inline",
    "margin-block",
    "margin-top",
    "margin-right",
    "margin-bottom",
    "margin-left",
    "box-sizing",
    "display",
    "field-sizing",
    "aspect-ratio",
    "height",
    "max-height",
    "min-height",
    "width",
    "max-width",
    "min-width",
    "flex",
    "flex-shrink",
    "flex-grow",
    "flex-basis",
    "table-layout",
    "caption-side",
    "border-collapse",
    "border-spacing",
    "transform-origin",
    "translate",
    "scale",
    "rotate",
    "transform",
    "animation",
    "cursor",
    "touch-action",
    "resize",
    "scroll-snap-type",
    "scroll-snap-align",
    "scroll-snap-stop",
    "scroll-margin",
    "scroll-padding",
    "list-style-position",
    "list-style-type",
    "list-style-image",
    "appearance",
    "columns",
    "break-before",
    "break-inside",
    "break-after",
    "grid-auto-columns",
    "grid-auto-flow",
    "grid-auto-rows",
    "grid-template-columns",
    "grid-template-rows",
    "flex-direction",
    "flex-wrap",
    "place-content",
    "place-items",
    "align-content",
    "align-items",
    "justify-content",
    "justify-items",
    "gap",
    "column-gap",
    "row-gap",
    "place-self",
    "align-self",
    "justify-self",
    "overflow",
    "overflow-x",
    "overflow-y",
    "overscroll-behavior",
    "scroll-behavior",
    "border-radius",
    "border-width",
    "border-style",
    "border-color",
    "background-color",
    "background-image",
    "background-position",
    "background-size",
    "background-repeat",
    "background-attachment",
    "background-clip",
    "background-origin",
    "fill",
    "stroke",
    "stroke-width",
    "object-fit",
    "object-position",
    "padding",
    "padding-inline",
    "padding-block",
    "padding-top",
    "padding-right",
    "padding-bottom",
    "padding-left",
    "text-align",
    "text-indent",
    "vertical-align",
    "font-family",
    "font-size",
    "line-height",
    "font-weight",
    "letter-spacing",
    "color",
    "text-transform",
    "font-style",
    "text-decoration-line",
    "text-decoration-color",
    "text-decoration-style",
    "text-decoration-thickness",
    "text-underline-offset",
    "accent-color",
    "caret-color",
    "opacity",
    "box-shadow",
    "outline",
    "outline-width",
    "outline-style",
    "outline-color",
    "outline-offset",
    "transition-property",
    "transition-behavior",
    "transition-duration",
    "transition-timing-function",
    "transition-delay",
    "will-change",
    "contain",
    "content",
    "filter",
    "backdrop-filter",
];

pub fn property_index(property: &str) -> Option<u16> {
    static INDEX: OnceLock<BTreeMap<&'static str, u16>> = OnceLock::new();
    let index = INDEX.get_or_init(|| {
        PROPERTY_ORDER
            .iter()
            .enumerate()
            .map(|(idx, name)| (*name, idx as u16))
            .collect()
    });
    index.get(property.trim()).copied()
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SortKey {
    pub variant_positions: Vec<u32>,
    pub property_signature: Vec<u16>,
    pub declaration_count: usize,
    pub raw: String,
}

pub fn compare_sort_keys(left: &SortKey, right: &SortKey) -> Ordering {
    // Positions are stored high-to-low, so the lexicographic Vec compare
    // orders exactly like an OR'd bitmask with no word-size cap.
    left.variant_positions
        .cmp(&right.variant_positions)
        .then_with(|| compare_signatures(&left.property_signature, &right.property_signature))
        .then_with(|| right.declaration_count.cmp(&left.declaration_count))
        .then_with(|| left.raw.cmp(&right.raw))
}

fn compare_signatures(left: &[u16], right: &[u16]) -> Ordering {
    let len = left.len().max(right.len());
    for idx in 0..len {
        match (left.get(idx), right.get(idx)) {
            (Some(a), Some(b)) if a != b => return a.cmp(b),
            (Some(_), Some(_)) => continue,
            // A missing position is larger than any real index.
            (Some(_), None) => return Ordering::Less,
            (None, Some(_)) => return Ordering::Greater,
            (None, None) => break,
        }
    }
    Ordering::Equal
}

pub fn compile_base_utility(
    candidate: &Candidate,
    utilities: &UtilityRegistry,
    theme: &Theme,
) -> Vec<Vec<AstNode>> {
    match candidate {
        Candidate::Arbitrary {
            property,
            value,
            modifier,
            ..
        } => {
            let value = match modifier {
                Some(modifier) => match apply_alpha(value, modifier) {
                    Some(value) => value,
                    None => return Vec::new(),
                },
                None => value.clone(),
            };
            vec![vec![crate::ast::decl(property, &value)]]
        }
        Candidate::Static { root, .. } | Candidate::Functional { root, .. } => {
            let wanted = match candidate {
                Candidate::Static { .. } => UtilityKind::Static,
                _ => UtilityKind::Functional,
            };
            let defs: Vec<_> = utilities
                .get(root)
                .iter()
                .filter(|def| def.kind == wanted)
                .collect();

            let mut collected = Vec::new();
            for def in defs.iter().filter(|def| !def.fallback) {
                match (def.compile)(candidate, theme) {
                    UtilityOutput::Abort => return Vec::new(),
                    UtilityOutput::Skip => continue,
                    UtilityOutput::Nodes(nodes) => collected.push(nodes),
                }
            }
            if collected.is_empty() {
                for def in defs.iter().filter(|def| def.fallback) {
                    match (def.compile)(candidate, theme) {
                        UtilityOutput::Abort => return Vec::new(),
                        UtilityOutput::Skip => continue,
                        UtilityOutput::Nodes(nodes) => collected.push(nodes),
                    }
                }
            }
            collected
        }
    }
}

pub(crate) fn apply_alpha(value: &str, modifier: &CandidateModifier) -> Option<String> {
    let alpha = match modifier {
        CandidateModifier::Named { value: modifier } => {
            if modifier.parse::<f64>().is_err() {
                return None;
            }
            format!("{}%", modifier)
        }
        CandidateModifier::Arbitrary { value: modifier } => modifier.clone(),
    };
    Some(format!("color-mix(in oklab,{} {},transparent)", value, alpha))
}

pub struct CompiledNode {
    pub node: AstNode,
    pub sort: SortKey,
}

pub fn compile_ast_nodes(
    candidate: &Candidate,
    theme: &Theme,
    utilities: &UtilityRegistry,
    variants: &VariantRegistry,
    respect_important: bool,
    design_important: bool,
) -> Vec<CompiledNode> {
    let lists = compile_base_utility(candidate, utilities, theme);
    if lists.is_empty() {
        return Vec::new();
    }

    let force_important = candidate.important() || (design_important && respect_important);
    let selector = format!(".{}", escape_selector(candidate.raw()));
    let mut variant_positions: Vec<u32> = candidate
        .variants()
        .iter()
        .map(|variant| variants.bit_position(variant))
        .collect();
    variant_positions.sort_unstable_by(|a, b| b.cmp(a));
    variant_positions.dedup();

    let mut out = Vec::new();
    for mut list in lists {
        // Signature and count come from the declarations before any variant
        // wrapping, so ordering reflects the base utility.
        let property_signature = property_signature(&list);
        let declaration_count = declaration_count(&list);
        if force_important {
            force_important_nodes(&mut list);
        }
        let mut node = rule(&selector, list);
        for variant in candidate.variants() {
            if !apply_variant(&mut node, variant, variants, 0) {
                return Vec::new();
            }
        }
        out.push(CompiledNode {
            node,
            sort: SortKey {
                variant_positions: variant_positions.clone(),
                property_signature,
                declaration_count,
                raw: candidate.raw().to_string(),
            },
        });
    }
    out
}

fn property_signature(nodes: &[AstNode]) -> Vec<u16> {
    let mut signature = Vec::new();
    collect_signature(nodes, &mut signature);
    signature
}

fn collect_signature(nodes: &[AstNode], signature: &mut Vec<u16>) -> bool {
    for node in nodes {
        match node {
            AstNode::Declaration {
                property, value, ..
            } => {
                if property == SORT_SENTINEL {
                    if let Some(idx) = property_index(value) {
                        if !signature.contains(&idx) {
                            signature.push(idx);
                        }
                    }
                    return false;
                }
                if let Some(idx) = property_index(property) {
                    if !signature.contains(&idx) {
                        signature.push(idx);
                    }
                }
            }
            AstNode::Rule { children, .. } | AstNode::AtRule { children, .. } => {
                if !collect_signature(children, signature) {
                    return false;
                }
            }
            AstNode::Placeholder => {}
        }
    }
    true
}

fn declaration_count(nodes: &[AstNode]) -> usize {
    let mut count = 0usize;
    for node in nodes {
        match node {
            AstNode::Declaration { .. } => count += 1,
            AstNode::Rule { children, .. } | AstNode::AtRule { children, .. } => {
                count += declaration_count(children);
            }
            AstNode::Placeholder => {}
        }
    }
    count
}

fn force_important_nodes(nodes: &mut [AstNode]) {
    for node in nodes {
        match node {
            AstNode::Declaration { important, .. } => *important = true,
            AstNode::Rule { children, .. } | AstNode::AtRule { children, .. } => {
                force_important_nodes(children);
            }
            AstNode::Placeholder => {}
        }
    }
}

pub fn escape_selector(class: &str) -> String {
    let mut escaped = String::with_capacity(class.len() * 2);
    for (idx, ch) in class.chars().enumerate() {
        // CSS identifiers cannot start with a digit; escape it as a code
        // point so selectors like `.2xl\:flex` stay parseable.
        if idx == 0 && ch.is_ascii_digit() {
            escaped.push_str(&format!("\\{:x} ", ch as u32));
            continue;
        }
        if matches!(
            ch,
            '\\' | ':'
                | '/'
                | '['
                | ']'
                | '('
                | ')'
                | '{'
                | '}'
                | '&'
                | '>'
                | '+'
                | '~'
                | ','
                | '%'
                | '='
                | '!'
                | '*'
                | '@'
                | '#'
                | '\''
                | '"'
                | '.'
        ) {
            escaped.push('\\');
        }
        escaped.push(ch);
    }
    escaped
}

pub struct CompileOptions<'a> {
    pub respect_important: bool,
    pub on_invalid_candidate: Option<&'a mut dyn FnMut(&str)>,
}

impl Default for CompileOptions<'_> {
    fn default() -> Self {
        Self {
            respect_important: true,
            on_invalid_candidate: None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CompileOutput {
    pub ast_nodes: Vec<AstNode>,
    pub node_sorting: BTreeMap<usize, SortKey>,
}

pub fn compile_candidates(
    raw_candidates: &[String],
    design: &mut DesignSystem,
    mut options: CompileOptions,
) -> CompileOutput {
    let DesignSystem {
        theme,
        utilities,
        variants,
        prefix,
        important,
        invalid_candidates,
    } = design;

    let mut pooled: Vec<(usize, SortKey, AstNode)> = Vec::new();
    // A raw string is reported at most once per call, even when it repeats
    // in the batch or already sits in the memo.
    let mut reported: BTreeSet<&str> = BTreeSet::new();
    for raw in raw_candidates {
        if invalid_candidates.contains(raw) {
            if reported.insert(raw.as_str()) {
                if let Some(report) = options.on_invalid_candidate.as_mut() {
                    report(raw);
                }
            }
            continue;
        }

        let mut produced = false;
        for candidate in parse_candidate(raw, utilities, variants, prefix.as_deref()) {
            for compiled in compile_ast_nodes(
                &candidate,
                theme,
                utilities,
                variants,
                options.respect_important,
                *important,
            ) {
                produced = true;
                let id = pooled.len();
                pooled.push((id, compiled.sort, compiled.node));
            }
        }

        if !produced {
            invalid_candidates.insert(raw.clone());
            if reported.insert(raw.as_str()) {
                if let Some(report) = options.on_invalid_candidate.as_mut() {
                    report(raw);
                }
            }
        }
    }

    pooled.sort_by(|(_, left, _), (_, right, _)| compare_sort_keys(left, right));

    let mut ast_nodes = Vec::with_capacity(pooled.len());
    let mut node_sorting = BTreeMap::new();
    for (id, sort, node) in pooled {
        node_sorting.insert(id, sort);
        ast_nodes.push(node);
    }
    CompileOutput {
        ast_nodes,
        node_sorting,
    }
}
