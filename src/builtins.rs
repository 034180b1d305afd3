use crate::ast::{at_rule, decl, rule, AstNode};
use crate::candidate::{Candidate, CandidateModifier, CandidateValue, Variant, VariantValue};
use crate::compile::apply_alpha;
use crate::theme::Theme;
use crate::utility::{UtilityOutput, UtilityRegistry};
use crate::variant::{
    wrap_children, VariantRegistry, COMPOUNDS_AT_RULES, COMPOUNDS_STYLE_RULES,
};

pub fn register(utilities: &mut UtilityRegistry, variants: &mut VariantRegistry, theme: &Theme) {
    register_utilities(utilities);
    register_variants(variants, theme);
}

fn register_utilities(utilities: &mut UtilityRegistry) {
    let statics: &[(&str, &str, &str)] = &[
        ("block", "display", "block"),
        ("inline-block", "display", "inline-block"),
        ("inline", "display", "inline"),
        ("flex", "display", "flex"),
        ("inline-flex", "display", "inline-flex"),
        ("grid", "display", "grid"),
        ("inline-grid", "display", "inline-grid"),
        ("hidden", "display", "none"),
        ("static", "position", "static"),
        ("relative", "position", "relative"),
        ("absolute", "position", "absolute"),
        ("fixed", "position", "fixed"),
        ("sticky", "position", "sticky"),
        ("underline", "text-decoration-line", "underline"),
        ("overline", "text-decoration-line", "overline"),
        ("line-through", "text-decoration-line", "line-through"),
        ("no-underline", "text-decoration-line", "none"),
        ("italic", "font-style", "italic"),
        ("not-italic", "font-style", "normal"),
    ];
    for &(name, property, value) in statics {
        utilities.register_static(name, vec![decl(property, value)]);
    }

    let spacing: &[(&str, &[&str])] = &[
        ("p", &["padding"]),
        ("px", &["padding-inline"]),
        ("py", &["padding-block"]),
        ("pt", &["padding-top"]),
        ("pr", &["padding-right"]),
        ("pb", &["padding-bottom"]),
        ("pl", &["padding-left"]),
        ("m", &["margin"]),
        ("mx", &["margin-inline"]),
        ("my", &["margin-block"]),
        ("mt", &["margin-top"]),
        ("mr", &["margin-right"]),
        ("mb", &["margin-bottom"]),
        ("ml", &["margin-left"]),
        ("gap", &["gap"]),
        ("gap-x", &["column-gap"]),
        ("gap-y", &["row-gap"]),
    ];
    for &(root, properties) in spacing {
        utilities.register_functional(root, move |candidate, _| {
            spacing_utility(candidate, properties)
        });
    }

    let colors: &[(&str, &str)] = &[
        ("text", "color"),
        ("bg", "background-color"),
        ("border", "border-color"),
        ("decoration", "text-decoration-color"),
        ("accent", "accent-color"),
        ("caret", "caret-color"),
        ("fill", "fill"),
        ("stroke", "stroke"),
    ];
    for &(root, property) in colors {
        if root == "text" {
            // Font sizes shadow colors on the shared root; the fallback
            // catches untyped arbitrary values neither recognizes.
            utilities.register_functional("text", font_size_utility);
            utilities.register_functional("text", move |candidate, theme| {
                color_utility(candidate, theme, property)
            });
            utilities.register_fallback("text", |candidate, _| {
                match functional_value(candidate) {
                    Some(CandidateValue::Arbitrary { value, .. }) => {
                        UtilityOutput::Nodes(vec![decl("font-size", value)])
                    }
                    _ => UtilityOutput::Skip,
                }
            });
        } else {
            utilities.register_functional(root, move |candidate, theme| {
                color_utility(candidate, theme, property)
            });
        }
    }
    utilities.register_fallback("bg", |candidate, _| match functional_value(candidate) {
        Some(CandidateValue::Arbitrary { value, data_type }) => {
            let property = if value.starts_with("url(")
                || matches!(data_type.as_deref(), Some("image") | Some("url"))
            {
                "background-image"
            } else {
                "background-color"
            };
            UtilityOutput::Nodes(vec![decl(property, value)])
        }
        _ => UtilityOutput::Skip,
    });

    utilities.register_functional("w", |candidate, _| {
        size_utility(candidate, "width", "100vw")
    });
    utilities.register_functional("h", |candidate, _| {
        size_utility(candidate, "height", "100vh")
    });

    utilities.register_functional("z", |candidate, _| {
        if functional_modifier(candidate).is_some() {
            return UtilityOutput::Abort;
        }
        match functional_value(candidate) {
            Some(CandidateValue::Named { value, .. }) => {
                if value == "auto" || value.parse::<i32>().is_ok() {
                    UtilityOutput::Nodes(vec![decl("z-index", value)])
                } else {
                    UtilityOutput::Skip
                }
            }
            Some(CandidateValue::Arbitrary { value, .. }) => {
                UtilityOutput::Nodes(vec![decl("z-index", value)])
            }
            None => UtilityOutput::Skip,
        }
    });

    utilities.register_functional("opacity", |candidate, _| {
        match functional_value(candidate) {
            Some(CandidateValue::Named { value, .. }) => {
                if value.parse::<f64>().is_ok() {
                    UtilityOutput::Nodes(vec![decl("opacity", &format!("{}%", value))])
                } else {
                    UtilityOutput::Skip
                }
            }
            Some(CandidateValue::Arbitrary { value, .. }) => {
                UtilityOutput::Nodes(vec![decl("opacity", value)])
            }
            None => UtilityOutput::Skip,
        }
    });
}

fn functional_value(candidate: &Candidate) -> Option<&CandidateValue> {
    match candidate {
        Candidate::Functional { value, .. } => value.as_ref(),
        _ => None,
    }
}

fn functional_modifier(candidate: &Candidate) -> Option<&CandidateModifier> {
    match candidate {
        Candidate::Functional { modifier, .. } => modifier.as_ref(),
        _ => None,
    }
}

fn spacing_utility(candidate: &Candidate, properties: &[&str]) -> UtilityOutput {
    if functional_modifier(candidate).is_some() {
        return UtilityOutput::Skip;
    }
    let resolved = match functional_value(candidate) {
        Some(CandidateValue::Named { value, .. }) => {
            if value.parse::<f64>().is_err() {
                return UtilityOutput::Skip;
            }
            format!("calc(var(--spacing) * {})", value)
        }
        Some(CandidateValue::Arbitrary { value, data_type }) => {
            if data_type.as_deref().is_some_and(|hint| hint != "length") {
                return UtilityOutput::Skip;
            }
            value.clone()
        }
        None => return UtilityOutput::Skip,
    };
    UtilityOutput::Nodes(
        properties
            .iter()
            .map(|property| decl(property, &resolved))
            .collect(),
    )
}

fn color_utility(candidate: &Candidate, theme: &Theme, property: &str) -> UtilityOutput {
    let mut resolved = match functional_value(candidate) {
        Some(CandidateValue::Named { value, .. }) => {
            match theme.resolve_var(value, &["color"]) {
                Some(reference) => reference,
                None => return UtilityOutput::Skip,
            }
        }
        Some(CandidateValue::Arbitrary { value, data_type }) => match data_type.as_deref() {
            Some("color") => value.clone(),
            Some(_) => return UtilityOutput::Skip,
            None => {
                if !looks_like_color(value) {
                    return UtilityOutput::Skip;
                }
                value.clone()
            }
        },
        None => return UtilityOutput::Skip,
    };
    if let Some(modifier) = functional_modifier(candidate) {
        match apply_alpha(&resolved, modifier) {
            Some(mixed) => resolved = mixed,
            None => return UtilityOutput::Skip,
        }
    }
    UtilityOutput::Nodes(vec![decl(property, &resolved)])
}

fn font_size_utility(candidate: &Candidate, theme: &Theme) -> UtilityOutput {
    let size = match functional_value(candidate) {
        Some(CandidateValue::Named { value, .. }) => {
            match theme.resolve_var(value, &["text"]) {
                Some(reference) => {
                    let mut nodes = vec![decl("font-size", &reference)];
                    let leading = format!("{}--line-height", theme.key_name("text", value));
                    if theme.get(&leading).is_some() {
                        nodes.push(decl("line-height", &format!("var({})", leading)));
                    }
                    return with_line_height_modifier(candidate, nodes);
                }
                None => return UtilityOutput::Skip,
            }
        }
        Some(CandidateValue::Arbitrary { value, data_type }) => match data_type.as_deref() {
            Some("length") => value.clone(),
            Some(_) => return UtilityOutput::Skip,
            None => {
                if !looks_like_length(value) {
                    return UtilityOutput::Skip;
                }
                value.clone()
            }
        },
        None => return UtilityOutput::Skip,
    };
    with_line_height_modifier(candidate, vec![decl("font-size", &size)])
}

fn with_line_height_modifier(candidate: &Candidate, mut nodes: Vec<AstNode>) -> UtilityOutput {
    match functional_modifier(candidate) {
        None => UtilityOutput::Nodes(nodes),
        Some(CandidateModifier::Named { value }) => {
            if value.parse::<f64>().is_err() {
                return UtilityOutput::Skip;
            }
            nodes.retain(|node| !matches!(node, AstNode::Declaration { property, .. } if property == "line-height"));
            nodes.push(decl(
                "line-height",
                &format!("calc(var(--spacing) * {})", value),
            ));
            UtilityOutput::Nodes(nodes)
        }
        Some(CandidateModifier::Arbitrary { value }) => {
            nodes.retain(|node| !matches!(node, AstNode::Declaration { property, .. } if property == "line-height"));
            nodes.push(decl("line-height", value));
            UtilityOutput::Nodes(nodes)
        }
    }
}

fn size_utility(candidate: &Candidate, property: &str, screen: &str) -> UtilityOutput {
    let resolved = match functional_value(candidate) {
        Some(CandidateValue::Named { value, fraction }) => {
            if let Some(fraction) = fraction {
                match valid_fraction(fraction) {
                    Some(fraction) => format!("calc({} * 100%)", fraction),
                    None => return UtilityOutput::Skip,
                }
            } else if functional_modifier(candidate).is_some() {
                return UtilityOutput::Skip;
            } else {
                match value.as_str() {
                    "full" => "100%".to_string(),
                    "auto" => "auto".to_string(),
                    "screen" => screen.to_string(),
                    "min" => "min-content".to_string(),
                    "max" => "max-content".to_string(),
                    "fit" => "fit-content".to_string(),
                    _ => {
                        if value.parse::<f64>().is_err() {
                            return UtilityOutput::Skip;
                        }
                        format!("calc(var(--spacing) * {})", value)
                    }
                }
            }
        }
        Some(CandidateValue::Arbitrary { value, .. }) => value.clone(),
        None => return UtilityOutput::Skip,
    };
    UtilityOutput::Nodes(vec![decl(property, &resolved)])
}

fn valid_fraction(fraction: &str) -> Option<&str> {
    let (numerator, denominator) = fraction.split_once('/')?;
    let numerator: u32 = numerator.parse().ok()?;
    let denominator: u32 = denominator.parse().ok()?;
    if denominator == 0 || numerator == 0 {
        return None;
    }
    Some(fraction)
}

fn looks_like_color(value: &str) -> bool {
    value.starts_with('#')
        || value.starts_with("rgb(")
        || value.starts_with("rgba(")
        || value.starts_with("hsl(")
        || value.starts_with("hsla(")
        || value.starts_with("oklch(")
        || value.starts_with("oklab(")
        || value.starts_with("color(")
        || value.starts_with("color-mix(")
        || value.starts_with("var(")
        || matches!(value, "transparent" | "currentColor" | "currentcolor" | "inherit")
}

fn looks_like_length(value: &str) -> bool {
    if value.starts_with("calc(") || value.starts_with("clamp(") || value.starts_with("min(")
        || value.starts_with("max(")
    {
        return true;
    }
    let units = [
        "px", "rem", "em", "vh", "vw", "vmin", "vmax", "ch", "ex", "pt", "%",
    ];
    units.iter().any(|unit| {
        value
            .strip_suffix(unit)
            .is_some_and(|number| number.parse::<f64>().is_ok())
    })
}

fn register_variants(variants: &mut VariantRegistry, theme: &Theme) {
    variants.register_compound(
        "group",
        COMPOUNDS_STYLE_RULES,
        COMPOUNDS_STYLE_RULES,
        |node, variant| sibling_scope_apply(node, variant, "group", "*"),
    );
    variants.register_compound(
        "peer",
        COMPOUNDS_STYLE_RULES,
        COMPOUNDS_STYLE_RULES,
        |node, variant| sibling_scope_apply(node, variant, "peer", "~ *"),
    );
    variants.register_compound(
        "has",
        COMPOUNDS_STYLE_RULES,
        COMPOUNDS_STYLE_RULES,
        |node, _| match node {
            AstNode::Rule { selector, .. } => {
                *selector = format!("&:has({})", selector.replace('&', "*"));
                true
            }
            _ => false,
        },
    );
    variants.register_compound(
        "not",
        COMPOUNDS_STYLE_RULES | COMPOUNDS_AT_RULES,
        COMPOUNDS_STYLE_RULES,
        |node, _| match node {
            AstNode::Rule { selector, .. } => match selector.strip_prefix('&') {
                Some(rest) if !rest.is_empty() => {
                    *selector = format!("&:not({})", rest);
                    true
                }
                _ => false,
            },
            AstNode::AtRule { params, .. } => {
                *params = format!("not {}", params);
                true
            }
            _ => false,
        },
    );

    variants.register_functional("data", COMPOUNDS_STYLE_RULES, |node, variant| {
        let Variant::Functional { value, .. } = variant else {
            return false;
        };
        let attribute = match value {
            VariantValue::Named(value) | VariantValue::Arbitrary(value) => {
                if value.is_empty() {
                    return false;
                }
                format!("data-{}", value)
            }
        };
        wrap_children(node, rule(&format!("&[{}]", attribute), Vec::new()))
    });

    variants.register_functional("aria", COMPOUNDS_STYLE_RULES, |node, variant| {
        let Variant::Functional { value, .. } = variant else {
            return false;
        };
        let selector = match value {
            VariantValue::Named(value) => {
                if value.is_empty() {
                    return false;
                }
                format!("&[aria-{}=\"true\"]", value)
            }
            VariantValue::Arbitrary(value) => {
                if value.is_empty() {
                    return false;
                }
                format!("&[aria-{}]", value)
            }
        };
        wrap_children(node, rule(&selector, Vec::new()))
    });

    variants.register_functional("supports", COMPOUNDS_AT_RULES, |node, variant| {
        let Variant::Functional { value, .. } = variant else {
            return false;
        };
        let params = match value {
            VariantValue::Named(value) => format!("({}: initial)", value),
            VariantValue::Arbitrary(value) => {
                if value.starts_with('(') {
                    value.clone()
                } else if value.contains(':') {
                    format!("({})", value)
                } else {
                    format!("({}: initial)", value)
                }
            }
        };
        wrap_children(node, at_rule("@supports", &params, Vec::new()))
    });

    let pseudo_classes: &[(&str, &str)] = &[
        ("first", "&:first-child"),
        ("last", "&:last-child"),
        ("odd", "&:nth-child(odd)"),
        ("even", "&:nth-child(even)"),
        ("visited", "&:visited"),
        ("checked", "&:checked"),
        ("required", "&:required"),
        ("disabled", "&:disabled"),
        ("hover", "&:hover"),
        ("focus", "&:focus"),
        ("focus-within", "&:focus-within"),
        ("focus-visible", "&:focus-visible"),
        ("active", "&:active"),
        ("before", "&::before"),
        ("after", "&::after"),
    ];
    for &(name, selector) in pseudo_classes {
        variants.register_static_selector(name, selector);
    }

    variants.register_static_at_rule("dark", "@media", "(prefers-color-scheme: dark)");

    for name in ["sm", "md", "lg", "xl", "2xl"] {
        if let Some(width) = theme.get(&format!("--breakpoint-{}", name)) {
            variants.register_static_at_rule(name, "@media", &format!("(width >= {})", width));
        }
    }
}

fn sibling_scope_apply(node: &mut AstNode, variant: &Variant, class: &str, suffix: &str) -> bool {
    let marker = match variant {
        Variant::Compound { modifier, .. } => match modifier {
            None => format!(":where(.{})", class),
            Some(CandidateModifier::Named { value }) => {
                format!(":where(.{}\\/{})", class, value)
            }
            Some(CandidateModifier::Arbitrary { .. }) => return false,
        },
        _ => format!(":where(.{})", class),
    };
    match node {
        AstNode::Rule { selector, .. } => {
            if !selector.contains('&') {
                return false;
            }
            *selector = format!("&:is({} {})", selector.replace('&', &marker), suffix);
            true
        }
        _ => false,
    }
}
