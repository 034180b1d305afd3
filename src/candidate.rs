use crate::utility::UtilityRegistry;
use crate::variant::{VariantKind, VariantRegistry};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Candidate {
    Static {
        root: String,
        variants: Vec<Variant>,
        important: bool,
        raw: String,
    },
    Functional {
        root: String,
        value: Option<CandidateValue>,
        modifier: Option<CandidateModifier>,
        variants: Vec<Variant>,
        important: bool,
        raw: String,
    },
    Arbitrary {
        property: String,
        value: String,
        modifier: Option<CandidateModifier>,
        variants: Vec<Variant>,
        important: bool,
        raw: String,
    },
}

impl Candidate {
    pub fn raw(&self) -> &str {
        match self {
            Candidate::Static { raw, .. }
            | Candidate::Functional { raw, .. }
            | Candidate::Arbitrary { raw, .. } => raw,
        }
    }

    pub fn variants(&self) -> &[Variant] {
        match self {
            Candidate::Static { variants, .. }
            | Candidate::Functional { variants, .. }
            | Candidate::Arbitrary { variants, .. } => variants,
        }
    }

    pub fn important(&self) -> bool {
        match self {
            Candidate::Static { important, .. }
            | Candidate::Functional { important, .. }
            | Candidate::Arbitrary { important, .. } => *important,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CandidateValue {
    Named {
        value: String,
        fraction: Option<String>,
    },
    Arbitrary {
        value: String,
        data_type: Option<String>,
    },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CandidateModifier {
    Named { value: String },
    Arbitrary { value: String },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum VariantValue {
    Named(String),
    Arbitrary(String),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Variant {
    Static {
        root: String,
    },
    Functional {
        root: String,
        value: VariantValue,
    },
    Arbitrary {
        selector: String,
        relative: bool,
    },
    Compound {
        root: String,
        variant: Box<Variant>,
        modifier: Option<CandidateModifier>,
    },
}

pub fn parse_candidate(
    raw: &str,
    utilities: &UtilityRegistry,
    variant_registry: &VariantRegistry,
    prefix: Option<&str>,
) -> Vec<Candidate> {
    let mut input = raw;
    if let Some(prefix) = prefix {
        let needle = format!("{}:", prefix);
        match input.strip_prefix(needle.as_str()) {
            Some(rest) if !rest.is_empty() => input = rest,
            _ => return Vec::new(),
        }
    }
    if input.is_empty() {
        return Vec::new();
    }

    let segments = segment(input, ':');
    let base_segment = match segments.last() {
        Some(base) if !base.is_empty() => *base,
        _ => return Vec::new(),
    };

    let mut variants = Vec::with_capacity(segments.len() - 1);
    for part in segments[..segments.len() - 1].iter().rev() {
        match parse_variant(part, variant_registry) {
            Some(variant) => variants.push(variant),
            None => return Vec::new(),
        }
    }

    let mut base = base_segment;
    let mut important = false;
    if base.ends_with('!') && !base.ends_with("\\!") {
        base = &base[..base.len() - 1];
        important = true;
    }
    if base.is_empty() {
        return Vec::new();
    }

    if base.starts_with('[') {
        return match parse_arbitrary_property(base, raw, &variants, important) {
            Some(candidate) => vec![candidate],
            None => Vec::new(),
        };
    }

    if utilities.has_static(base) {
        return vec![Candidate::Static {
            root: base.to_string(),
            variants,
            important,
            raw: raw.to_string(),
        }];
    }

    let parts = segment(base, '/');
    if parts.len() > 2 {
        return Vec::new();
    }
    let modifier = match parts.get(1) {
        Some(part) => match parse_modifier(part) {
            Some(modifier) => Some(modifier),
            None => return Vec::new(),
        },
        None => None,
    };

    let mut candidates = Vec::new();
    for (root, rest) in find_roots(parts[0], |root| utilities.has_functional(root)) {
        let mut value = match rest {
            None => None,
            Some(rest) => match parse_value(&rest) {
                Some(value) => Some(value),
                None => continue,
            },
        };
        if let (
            Some(CandidateValue::Named { value, fraction }),
            Some(CandidateModifier::Named { value: modifier }),
        ) = (value.as_mut(), modifier.as_ref())
        {
            *fraction = Some(format!("{}/{}", value, modifier));
        }
        candidates.push(Candidate::Functional {
            root,
            value,
            modifier: modifier.clone(),
            variants: variants.clone(),
            important,
            raw: raw.to_string(),
        });
    }
    candidates
}

fn parse_arbitrary_property(
    base: &str,
    raw: &str,
    variants: &[Variant],
    important: bool,
) -> Option<Candidate> {
    let parts = segment(base, '/');
    if parts.len() > 2 {
        return None;
    }
    let modifier = match parts.get(1) {
        Some(part) => Some(parse_modifier(part)?),
        None => None,
    };

    let body = parts[0]
        .strip_prefix('[')
        .and_then(|body| body.strip_suffix(']'))?;
    let colon = body.find(':')?;
    let property = &body[..colon];
    if property.is_empty() || !is_valid_property_name(property) {
        return None;
    }
    if property
        .chars()
        .next()
        .is_some_and(|ch| ch.is_ascii_uppercase())
    {
        return None;
    }
    let value = decode_arbitrary_value(&body[colon + 1..])?;

    Some(Candidate::Arbitrary {
        property: property.to_string(),
        value,
        modifier,
        variants: variants.to_vec(),
        important,
        raw: raw.to_string(),
    })
}

pub fn find_roots(input: &str, is_root: impl Fn(&str) -> bool) -> Vec<(String, Option<String>)> {
    let mut roots = Vec::new();
    if is_root(input) {
        roots.push((input.to_string(), None));
    }
    let mut idx = input.len();
    while let Some(pos) = input[..idx].rfind('-') {
        idx = pos;
        if pos == 0 {
            break;
        }
        let rest = &input[pos + 1..];
        if rest.is_empty() {
            continue;
        }
        let root = &input[..pos];
        if is_root(root) {
            roots.push((root.to_string(), Some(rest.to_string())));
        }
    }
    roots
}

pub fn parse_variant(part: &str, registry: &VariantRegistry) -> Option<Variant> {
    if part.is_empty() {
        return None;
    }

    if part.starts_with('[') {
        let body = part.strip_prefix('[')?.strip_suffix(']')?;
        let selector = decode_arbitrary_value(body)?;
        if selector.starts_with('@') && selector.contains('{') {
            return None;
        }
        let relative = matches!(selector.chars().next(), Some('>' | '+' | '~'));
        return Some(Variant::Arbitrary { selector, relative });
    }

    let pieces = segment(part, '/');
    if pieces.len() > 2 {
        return None;
    }
    let name = pieces[0];
    if name.is_empty() {
        return None;
    }
    let modifier = match pieces.get(1) {
        Some(piece) => Some(parse_modifier(piece)?),
        None => None,
    };

    if modifier.is_none() && registry.kind_of(name) == Some(VariantKind::Static) {
        return Some(Variant::Static {
            root: name.to_string(),
        });
    }

    for (root, rest) in find_roots(name, |root| {
        matches!(
            registry.kind_of(root),
            Some(VariantKind::Functional | VariantKind::Compound)
        )
    }) {
        let Some(rest) = rest else { continue };
        match registry.kind_of(&root) {
            Some(VariantKind::Functional) => {
                if modifier.is_some() {
                    continue;
                }
                let value = if rest.starts_with('[') {
                    let body = rest.strip_prefix('[')?.strip_suffix(']')?;
                    VariantValue::Arbitrary(decode_arbitrary_value(body)?)
                } else {
                    if !is_valid_named_value(&rest) {
                        continue;
                    }
                    VariantValue::Named(rest)
                };
                return Some(Variant::Functional { root, value });
            }
            Some(VariantKind::Compound) => {
                let Some(inner) = parse_variant(&rest, registry) else {
                    continue;
                };
                if registry.compounds_mask(&inner) & registry.compounds_with(&root) == 0 {
                    continue;
                }
                return Some(Variant::Compound {
                    root,
                    variant: Box::new(inner),
                    modifier,
                });
            }
            _ => continue,
        }
    }

    None
}

fn parse_value(rest: &str) -> Option<CandidateValue> {
    if rest.starts_with('[') {
        let body = rest.strip_prefix('[')?.strip_suffix(']')?;
        let (data_type, body) = split_data_type(body);
        let value = decode_arbitrary_value(body)?;
        return Some(CandidateValue::Arbitrary {
            value,
            data_type: data_type.map(str::to_string),
        });
    }
    if rest.starts_with('(') {
        let body = rest.strip_prefix('(')?.strip_suffix(')')?;
        let (data_type, body) = split_data_type(body);
        if !body.starts_with("--") || body.len() <= 2 {
            return None;
        }
        let value = decode_arbitrary_value(&format!("var({})", body))?;
        return Some(CandidateValue::Arbitrary {
            value,
            data_type: data_type.map(str::to_string),
        });
    }
    if !is_valid_named_value(rest) {
        return None;
    }
    Some(CandidateValue::Named {
        value: rest.to_string(),
        fraction: None,
    })
}

fn parse_modifier(part: &str) -> Option<CandidateModifier> {
    if part.starts_with('[') {
        let body = part.strip_prefix('[')?.strip_suffix(']')?;
        let value = decode_arbitrary_value(body)?;
        return Some(CandidateModifier::Arbitrary { value });
    }
    if part.starts_with('(') {
        let body = part.strip_prefix('(')?.strip_suffix(')')?;
        if !body.starts_with("--") || body.len() <= 2 {
            return None;
        }
        let value = decode_arbitrary_value(&format!("var({})", body))?;
        return Some(CandidateModifier::Arbitrary { value });
    }
    if !is_valid_named_value(part) {
        return None;
    }
    Some(CandidateModifier::Named {
        value: part.to_string(),
    })
}

fn split_data_type(body: &str) -> (Option<&str>, &str) {
    if let Some(colon) = body.find(':') {
        let hint = &body[..colon];
        let mut chars = hint.chars();
        let head_ok = chars.next().is_some_and(|ch| ch.is_ascii_lowercase());
        if head_ok && hint.chars().all(|ch| ch.is_ascii_lowercase() || ch == '-') {
            return (Some(hint), &body[colon + 1..]);
        }
    }
    (None, body)
}

pub fn segment(input: &str, separator: char) -> Vec<&str> {
    let mut parts = Vec::new();
    let mut round = 0usize;
    let mut square = 0usize;
    let mut curly = 0usize;
    let mut start = 0usize;
    let mut escaped = false;

    for (idx, ch) in input.char_indices() {
        if escaped {
            escaped = false;
            continue;
        }
        match ch {
            '\\' => escaped = true,
            '(' => round += 1,
            ')' => round = round.saturating_sub(1),
            '[' => square += 1,
            ']' => square = square.saturating_sub(1),
            '{' => curly += 1,
            '}' => curly = curly.saturating_sub(1),
            _ if ch == separator && round == 0 && square == 0 && curly == 0 => {
                parts.push(&input[start..idx]);
                start = idx + separator.len_utf8();
            }
            _ => {}
        }
    }
    parts.push(&input[start..]);
    parts
}

pub fn decode_arbitrary_value(body: &str) -> Option<String> {
    let chars: Vec<char> = body.chars().collect();
    let mut out = String::with_capacity(body.len());
    let mut stack: Vec<(String, bool)> = Vec::new();
    let mut idx = 0usize;

    while idx < chars.len() {
        let ch = chars[idx];
        match ch {
            '\\' if idx + 1 < chars.len() && chars[idx + 1] == '_' => {
                out.push('_');
                idx += 2;
            }
            '\\' if idx + 1 < chars.len() => {
                out.push('\\');
                out.push(chars[idx + 1]);
                idx += 2;
            }
            '(' => {
                stack.push((trailing_function_name(&out), false));
                out.push('(');
                idx += 1;
            }
            ')' => {
                stack.pop();
                out.push(')');
                idx += 1;
            }
            ',' => {
                if let Some(frame) = stack.last_mut() {
                    frame.1 = true;
                }
                out.push(',');
                idx += 1;
            }
            '_' => {
                let in_url = stack.iter().any(|(name, _)| name == "url");
                let in_var_head = stack
                    .last()
                    .is_some_and(|(name, seen_comma)| name == "var" && !seen_comma);
                out.push(if in_url || in_var_head { '_' } else { ' ' });
                idx += 1;
            }
            _ => {
                out.push(ch);
                idx += 1;
            }
        }
    }

    let trimmed = out.trim();
    if trimmed.is_empty() {
        return None;
    }
    Some(trimmed.to_string())
}

fn trailing_function_name(out: &str) -> String {
    let tail: String = out
        .chars()
        .rev()
        .take_while(|ch| ch.is_ascii_alphanumeric() || *ch == '-')
        .collect();
    tail.chars().rev().collect::<String>().to_ascii_lowercase()
}

fn is_valid_named_value(value: &str) -> bool {
    !value.is_empty()
        && value
            .chars()
            .all(|ch| ch.is_ascii_alphanumeric() || matches!(ch, '-' | '_' | '.' | '%'))
}

fn is_valid_property_name(property: &str) -> bool {
    if let Some(rest) = property.strip_prefix("--") {
        return !rest.is_empty();
    }
    property
        .chars()
        .all(|ch| ch.is_ascii_alphanumeric() || ch == '-')
}

#[cfg(test)]
mod tests {
    use super::{
        decode_arbitrary_value, find_roots, parse_candidate, segment, Candidate,
        CandidateModifier, CandidateValue, Variant, VariantValue,
    };
    use crate::ast::AstNode;
    use crate::utility::{UtilityOutput, UtilityRegistry};
    use crate::variant::{VariantRegistry, COMPOUNDS_STYLE_RULES};

    fn test_registries() -> (UtilityRegistry, VariantRegistry) {
        let mut utilities = UtilityRegistry::new();
        utilities.register_static("flex", vec![crate::ast::decl("display", "flex")]);
        for root in ["bg", "bg-red", "w", "z", "p", "text", "open"] {
            utilities.register_functional(root, |_, _| UtilityOutput::Skip);
        }

        let mut variants = VariantRegistry::new();
        variants.register_static_selector("hover", "&:hover");
        variants.register_static_selector("focus", "&:focus");
        variants.register_functional("data", COMPOUNDS_STYLE_RULES, |_, _| true);
        variants.register_compound(
            "group",
            COMPOUNDS_STYLE_RULES,
            COMPOUNDS_STYLE_RULES,
            |node, _| matches!(node, AstNode::Rule { .. }),
        );
        (utilities, variants)
    }

    fn parse(raw: &str) -> Vec<Candidate> {
        let (utilities, variants) = test_registries();
        parse_candidate(raw, &utilities, &variants, None)
    }

    #[test]
    fn parses_static_utility() {
        assert_eq!(
            parse("flex"),
            vec![Candidate::Static {
                root: "flex".to_string(),
                variants: Vec::new(),
                important: false,
                raw: "flex".to_string(),
            }]
        );
    }

    #[test]
    fn yields_one_candidate_per_valid_root_split() {
        let candidates = parse("bg-red-500");
        let roots: Vec<&str> = candidates
            .iter()
            .map(|candidate| match candidate {
                Candidate::Functional { root, .. } => root.as_str(),
                _ => "",
            })
            .collect();
        assert_eq!(roots, vec!["bg-red", "bg"]);
        match &candidates[0] {
            Candidate::Functional { value, .. } => assert_eq!(
                value,
                &Some(CandidateValue::Named {
                    value: "500".to_string(),
                    fraction: None,
                })
            ),
            other => panic!("unexpected candidate {:?}", other),
        }
    }

    #[test]
    fn find_roots_is_longest_first() {
        let roots = find_roots("bg-red-500", |root| root == "bg" || root == "bg-red");
        assert_eq!(
            roots,
            vec![
                ("bg-red".to_string(), Some("500".to_string())),
                ("bg".to_string(), Some("red-500".to_string())),
            ]
        );
    }

    #[test]
    fn variants_are_stored_nearest_first() {
        let candidates = parse("focus:hover:flex");
        assert_eq!(candidates.len(), 1);
        assert_eq!(
            candidates[0].variants(),
            &[
                Variant::Static {
                    root: "hover".to_string()
                },
                Variant::Static {
                    root: "focus".to_string()
                },
            ]
        );
    }

    #[test]
    fn trailing_important_is_consumed() {
        let candidates = parse("z-10!");
        assert_eq!(candidates.len(), 1);
        assert!(candidates[0].important());
        match &candidates[0] {
            Candidate::Functional { value, .. } => assert_eq!(
                value,
                &Some(CandidateValue::Named {
                    value: "10".to_string(),
                    fraction: None,
                })
            ),
            other => panic!("unexpected candidate {:?}", other),
        }
    }

    #[test]
    fn modifier_and_fraction_are_recorded() {
        let candidates = parse("w-1/2");
        assert_eq!(candidates.len(), 1);
        match &candidates[0] {
            Candidate::Functional {
                value, modifier, ..
            } => {
                assert_eq!(
                    value,
                    &Some(CandidateValue::Named {
                        value: "1".to_string(),
                        fraction: Some("1/2".to_string()),
                    })
                );
                assert_eq!(
                    modifier,
                    &Some(CandidateModifier::Named {
                        value: "2".to_string()
                    })
                );
            }
            other => panic!("unexpected candidate {:?}", other),
        }
    }

    #[test]
    fn arbitrary_value_and_paren_shorthand() {
        let candidates = parse("bg-[#0088cc]");
        match &candidates[0] {
            Candidate::Functional { value, .. } => assert_eq!(
                value,
                &Some(CandidateValue::Arbitrary {
                    value: "#0088cc".to_string(),
                    data_type: None,
                })
            ),
            other => panic!("unexpected candidate {:?}", other),
        }

        let candidates = parse("bg-(--brand)");
        match &candidates[0] {
            Candidate::Functional { value, .. } => assert_eq!(
                value,
                &Some(CandidateValue::Arbitrary {
                    value: "var(--brand)".to_string(),
                    data_type: None,
                })
            ),
            other => panic!("unexpected candidate {:?}", other),
        }

        let candidates = parse("bg-[color:var(--brand)]");
        match &candidates[0] {
            Candidate::Functional { value, .. } => assert_eq!(
                value,
                &Some(CandidateValue::Arbitrary {
                    value: "var(--brand)".to_string(),
                    data_type: Some("color".to_string()),
                })
            ),
            other => panic!("unexpected candidate {:?}", other),
        }
    }

    #[test]
    fn invalid_grammar_yields_nothing() {
        for raw in [
            "",
            "bg-",
            "bg-red-500/50/50",
            "bg-[#fff",
            "bg-[]",
            "bg-[_]",
            "bg-()",
            "bg-(color:)",
            "open-:flex",
            "data-:flex",
            "hover:",
            ":flex",
            "bg-red-500/",
            "[color:red",
            "[:red]",
            "[color:]",
            "[Color:red]",
        ] {
            assert!(parse(raw).is_empty(), "{:?} should not parse", raw);
        }
    }

    #[test]
    fn arbitrary_property_candidate() {
        let candidates = parse("[color:red]/50!");
        assert_eq!(
            candidates,
            vec![Candidate::Arbitrary {
                property: "color".to_string(),
                value: "red".to_string(),
                modifier: Some(CandidateModifier::Named {
                    value: "50".to_string()
                }),
                variants: Vec::new(),
                important: true,
                raw: "[color:red]/50!".to_string(),
            }]
        );
    }

    #[test]
    fn compound_variant_chain_with_modifier() {
        let candidates = parse("group-group-group-hover/parent-name:flex");
        assert_eq!(candidates.len(), 1);
        let variants = candidates[0].variants();
        assert_eq!(variants.len(), 1);
        match &variants[0] {
            Variant::Compound {
                root,
                variant,
                modifier,
            } => {
                assert_eq!(root, "group");
                assert_eq!(
                    modifier,
                    &Some(CandidateModifier::Named {
                        value: "parent-name".to_string()
                    })
                );
                match variant.as_ref() {
                    Variant::Compound {
                        root,
                        variant,
                        modifier,
                    } => {
                        assert_eq!(root, "group");
                        assert_eq!(modifier, &None);
                        match variant.as_ref() {
                            Variant::Compound {
                                root,
                                variant,
                                modifier,
                            } => {
                                assert_eq!(root, "group");
                                assert_eq!(modifier, &None);
                                assert_eq!(
                                    variant.as_ref(),
                                    &Variant::Static {
                                        root: "hover".to_string()
                                    }
                                );
                            }
                            other => panic!("unexpected inner variant {:?}", other),
                        }
                    }
                    other => panic!("unexpected inner variant {:?}", other),
                }
            }
            other => panic!("unexpected variant {:?}", other),
        }
    }

    #[test]
    fn mixed_at_rule_and_nested_selector_is_invalid() {
        assert!(parse("[@media(width>=123px){&:hover}]:flex").is_empty());
    }

    #[test]
    fn arbitrary_variant_relative_flag() {
        let candidates = parse("[>img]:flex");
        assert_eq!(
            candidates[0].variants(),
            &[Variant::Arbitrary {
                selector: ">img".to_string(),
                relative: true,
            }]
        );
        let candidates = parse("[&_p]:flex");
        assert_eq!(
            candidates[0].variants(),
            &[Variant::Arbitrary {
                selector: "& p".to_string(),
                relative: false,
            }]
        );
    }

    #[test]
    fn functional_variant_values() {
        let candidates = parse("data-open:flex");
        assert_eq!(
            candidates[0].variants(),
            &[Variant::Functional {
                root: "data".to_string(),
                value: VariantValue::Named("open".to_string()),
            }]
        );
        let candidates = parse("data-[state=open]:flex");
        assert_eq!(
            candidates[0].variants(),
            &[Variant::Functional {
                root: "data".to_string(),
                value: VariantValue::Arbitrary("state=open".to_string()),
            }]
        );
    }

    #[test]
    fn compound_with_arbitrary_inner_selector() {
        let candidates = parse("group-[&_p]/name:flex");
        assert_eq!(candidates.len(), 1);
        assert_eq!(
            candidates[0].variants(),
            &[Variant::Compound {
                root: "group".to_string(),
                variant: Box::new(Variant::Arbitrary {
                    selector: "& p".to_string(),
                    relative: false,
                }),
                modifier: Some(CandidateModifier::Named {
                    value: "name".to_string()
                }),
            }]
        );
    }

    #[test]
    fn prefix_is_required_and_stripped() {
        let (utilities, variants) = test_registries();
        assert!(parse_candidate("flex", &utilities, &variants, Some("tw")).is_empty());
        let candidates = parse_candidate("tw:hover:flex", &utilities, &variants, Some("tw"));
        assert_eq!(candidates.len(), 1);
        assert_eq!(candidates[0].raw(), "tw:hover:flex");
        assert_eq!(
            candidates[0].variants(),
            &[Variant::Static {
                root: "hover".to_string()
            }]
        );
    }

    #[test]
    fn underscore_decoding_rules() {
        assert_eq!(
            decode_arbitrary_value("a_b").as_deref(),
            Some("a b")
        );
        assert_eq!(
            decode_arbitrary_value("url(a_b)").as_deref(),
            Some("url(a_b)")
        );
        assert_eq!(
            decode_arbitrary_value("var(--a_b,c_d)").as_deref(),
            Some("var(--a_b,c d)")
        );
        assert_eq!(
            decode_arbitrary_value("a\\_b").as_deref(),
            Some("a_b")
        );
        assert_eq!(decode_arbitrary_value("_"), None);
        assert_eq!(decode_arbitrary_value(""), None);
    }

    #[test]
    fn segment_honors_brackets_and_escapes() {
        assert_eq!(segment("a:b:c", ':'), vec!["a", "b", "c"]);
        assert_eq!(segment("a[b:c]:d", ':'), vec!["a[b:c]", "d"]);
        assert_eq!(segment("a(b:c):d", ':'), vec!["a(b:c)", "d"]);
        assert_eq!(segment("a\\:b:c", ':'), vec!["a\\:b", "c"]);
        assert_eq!(segment("a", ':'), vec!["a"]);
    }

    #[test]
    fn cloned_candidates_are_independent() {
        let candidates = parse("group-hover/name:bg-red-500/50");
        let original = candidates[0].clone();
        let mut cloned = original.clone();
        if let Candidate::Functional {
            root,
            variants,
            value,
            ..
        } = &mut cloned
        {
            root.push_str("-mutated");
            variants.clear();
            *value = None;
        }
        assert_eq!(candidates[0], original);
        assert_ne!(candidates[0], cloned);
    }
}
