use std::collections::BTreeMap;

use crate::ast::{at_rule, rule, walk, AstNode, WalkAction};
use crate::candidate::Variant;

pub const COMPOUNDS_STYLE_RULES: u8 = 1 << 0;
pub const COMPOUNDS_AT_RULES: u8 = 1 << 1;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VariantKind {
    Static,
    Functional,
    Compound,
}

pub type VariantApplyFn = Box<dyn Fn(&mut AstNode, &Variant) -> bool>;

pub struct VariantDef {
    pub kind: VariantKind,
    pub compounds_with: u8,
    pub compounds: u8,
    pub apply: VariantApplyFn,
}

#[derive(Default)]
pub struct VariantRegistry {
    defs: BTreeMap<String, VariantDef>,
    order: BTreeMap<String, u32>,
}

impl VariantRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(&mut self, name: &str, def: VariantDef) {
        let position = self.order.len() as u32;
        self.order.entry(name.to_string()).or_insert(position);
        self.defs.insert(name.to_string(), def);
    }

    pub fn register_static_selector(&mut self, name: &str, selector: &str) {
        let selector = selector.to_string();
        self.register(
            name,
            VariantDef {
                kind: VariantKind::Static,
                compounds_with: 0,
                compounds: COMPOUNDS_STYLE_RULES,
                apply: Box::new(move |node, _| wrap_children(node, rule(&selector, Vec::new()))),
            },
        );
    }

    pub fn register_static_at_rule(&mut self, name: &str, at_name: &str, params: &str) {
        let at_name = at_name.to_string();
        let params = params.to_string();
        self.register(
            name,
            VariantDef {
                kind: VariantKind::Static,
                compounds_with: 0,
                compounds: COMPOUNDS_AT_RULES,
                apply: Box::new(move |node, _| {
                    wrap_children(node, at_rule(&at_name, &params, Vec::new()))
                }),
            },
        );
    }

    pub fn register_functional(
        &mut self,
        name: &str,
        compounds: u8,
        apply: impl Fn(&mut AstNode, &Variant) -> bool + 'static,
    ) {
        self.register(
            name,
            VariantDef {
                kind: VariantKind::Functional,
                compounds_with: 0,
                compounds,
                apply: Box::new(apply),
            },
        );
    }

    pub fn register_compound(
        &mut self,
        name: &str,
        compounds_with: u8,
        compounds: u8,
        apply: impl Fn(&mut AstNode, &Variant) -> bool + 'static,
    ) {
        self.register(
            name,
            VariantDef {
                kind: VariantKind::Compound,
                compounds_with,
                compounds,
                apply: Box::new(apply),
            },
        );
    }

    pub fn get(&self, root: &str) -> Option<&VariantDef> {
        self.defs.get(root)
    }

    pub fn kind_of(&self, root: &str) -> Option<VariantKind> {
        self.defs.get(root).map(|def| def.kind)
    }

    pub fn compounds_with(&self, root: &str) -> u8 {
        self.defs.get(root).map(|def| def.compounds_with).unwrap_or(0)
    }

    pub fn compounds_mask(&self, variant: &Variant) -> u8 {
        match variant {
            Variant::Arbitrary { selector, .. } => {
                if selector.starts_with('@') {
                    COMPOUNDS_AT_RULES
                } else {
                    COMPOUNDS_STYLE_RULES
                }
            }
            Variant::Static { root }
            | Variant::Functional { root, .. }
            | Variant::Compound { root, .. } => {
                self.defs.get(root).map(|def| def.compounds).unwrap_or(0)
            }
        }
    }

    pub fn variant_order(&self) -> &BTreeMap<String, u32> {
        &self.order
    }

    pub fn bit_position(&self, variant: &Variant) -> u32 {
        let overflow = self.order.len() as u32;
        match variant {
            Variant::Arbitrary { .. } => overflow,
            Variant::Static { root }
            | Variant::Functional { root, .. }
            | Variant::Compound { root, .. } => {
                self.order.get(root).copied().unwrap_or(overflow)
            }
        }
    }
}

pub fn apply_variant(
    node: &mut AstNode,
    variant: &Variant,
    registry: &VariantRegistry,
    depth: usize,
) -> bool {
    match variant {
        Variant::Arbitrary { selector, relative } => {
            if *relative && depth == 0 {
                return false;
            }
            let wrapper = if selector.starts_with('@') {
                let (name, params) = split_at_rule(selector);
                at_rule(&name, &params, Vec::new())
            } else {
                rule(selector, Vec::new())
            };
            wrap_children(node, wrapper)
        }
        Variant::Static { root } | Variant::Functional { root, .. } => match registry.get(root) {
            Some(def) => (def.apply)(node, variant),
            None => false,
        },
        Variant::Compound {
            root,
            variant: inner,
            ..
        } => {
            let def = match registry.get(root) {
                Some(def) if def.kind == VariantKind::Compound => def,
                _ => return false,
            };

            let mut isolated = rule("@slot", vec![AstNode::Placeholder]);
            if !apply_variant(&mut isolated, inner, registry, depth + 1) {
                return false;
            }

            if let Some(children) = isolated.children_mut() {
                if root == "not" && children.len() > 1 {
                    return false;
                }
                for child in children.iter_mut() {
                    if !child.is_container() {
                        return false;
                    }
                    if !(def.apply)(child, variant) {
                        return false;
                    }
                }
            } else {
                return false;
            }

            let original = match node.children_mut() {
                Some(children) => std::mem::take(children),
                None => return false,
            };
            let mut content = Some(original);
            let mut spliced = false;
            if let Some(children) = isolated.children_mut() {
                walk(children, &mut |child| {
                    if matches!(child, AstNode::Placeholder) {
                        spliced = true;
                        return WalkAction::ReplaceStop(content.take().unwrap_or_default());
                    }
                    WalkAction::Continue
                });
            }
            if !spliced {
                // The isolated subtree dropped the slot, so the original
                // content has nowhere to go; restore it and fail.
                if let (Some(children), Some(original)) = (node.children_mut(), content.take()) {
                    *children = original;
                }
                return false;
            }

            match isolated {
                AstNode::Rule { children, .. } => match node.children_mut() {
                    Some(slot) => {
                        *slot = children;
                        true
                    }
                    None => false,
                },
                _ => false,
            }
        }
    }
}

pub fn wrap_children(node: &mut AstNode, mut wrapper: AstNode) -> bool {
    match node.children_mut() {
        Some(children) => {
            let taken = std::mem::take(children);
            match wrapper.children_mut() {
                Some(slot) => *slot = taken,
                None => return false,
            }
            children.push(wrapper);
            true
        }
        None => false,
    }
}

pub(crate) fn split_at_rule(selector: &str) -> (String, String) {
    match selector.find(|ch: char| ch == ' ' || ch == '(') {
        Some(idx) => (
            selector[..idx].to_string(),
            selector[idx..].trim().to_string(),
        ),
        None => (selector.to_string(), String::new()),
    }
}

#[cfg(test)]
mod tests {
    use super::{
        apply_variant, VariantRegistry, COMPOUNDS_AT_RULES, COMPOUNDS_STYLE_RULES,
    };
    use crate::ast::{decl, rule, AstNode};
    use crate::candidate::Variant;

    fn test_registry() -> VariantRegistry {
        let mut registry = VariantRegistry::new();
        registry.register_static_selector("hover", "&:hover");
        registry.register_static_selector("focus", "&:focus");
        registry.register_static_at_rule("md", "@media", "(width >= 48rem)");
        registry.register_compound(
            "group",
            COMPOUNDS_STYLE_RULES,
            COMPOUNDS_STYLE_RULES,
            |node, _| match node {
                AstNode::Rule { selector, .. } => {
                    *selector = format!("&:is({} *)", selector.replace('&', ":where(.group)"));
                    true
                }
                _ => false,
            },
        );
        registry.register_compound(
            "not",
            COMPOUNDS_STYLE_RULES | COMPOUNDS_AT_RULES,
            COMPOUNDS_STYLE_RULES,
            |node, _| match node {
                AstNode::Rule { selector, .. } => {
                    *selector = format!("&:not({})", selector.trim_start_matches('&'));
                    true
                }
                _ => false,
            },
        );
        registry
    }

    fn base_node() -> AstNode {
        rule(".x", vec![decl("display", "flex")])
    }

    #[test]
    fn static_variant_wraps_children() {
        let registry = test_registry();
        let mut node = base_node();
        let variant = Variant::Static {
            root: "hover".to_string(),
        };
        assert!(apply_variant(&mut node, &variant, &registry, 0));
        assert_eq!(
            node,
            rule(".x", vec![rule("&:hover", vec![decl("display", "flex")])])
        );
    }

    #[test]
    fn nearest_variant_ends_up_innermost() {
        let registry = test_registry();
        let mut node = base_node();
        for variant in [
            Variant::Static {
                root: "hover".to_string(),
            },
            Variant::Static {
                root: "focus".to_string(),
            },
        ] {
            assert!(apply_variant(&mut node, &variant, &registry, 0));
        }
        assert_eq!(
            node,
            rule(
                ".x",
                vec![rule(
                    "&:focus",
                    vec![rule("&:hover", vec![decl("display", "flex")])]
                )]
            )
        );
    }

    #[test]
    fn relative_arbitrary_fails_at_depth_zero() {
        let registry = test_registry();
        let mut node = base_node();
        let variant = Variant::Arbitrary {
            selector: "> img".to_string(),
            relative: true,
        };
        assert!(!apply_variant(&mut node, &variant, &registry, 0));
        assert!(apply_variant(&mut node, &variant, &registry, 1));
    }

    #[test]
    fn arbitrary_at_rule_wraps_in_at_rule() {
        let registry = test_registry();
        let mut node = base_node();
        let variant = Variant::Arbitrary {
            selector: "@media (hover: hover)".to_string(),
            relative: false,
        };
        assert!(apply_variant(&mut node, &variant, &registry, 0));
        assert_eq!(
            node,
            rule(
                ".x",
                vec![crate::ast::at_rule(
                    "@media",
                    "(hover: hover)",
                    vec![decl("display", "flex")]
                )]
            )
        );
    }

    #[test]
    fn compound_splices_original_content_at_the_slot() {
        let registry = test_registry();
        let mut node = base_node();
        let variant = Variant::Compound {
            root: "group".to_string(),
            variant: Box::new(Variant::Static {
                root: "hover".to_string(),
            }),
            modifier: None,
        };
        assert!(apply_variant(&mut node, &variant, &registry, 0));
        assert_eq!(
            node,
            rule(
                ".x",
                vec![rule(
                    "&:is(:where(.group):hover *)",
                    vec![decl("display", "flex")]
                )]
            )
        );
    }

    #[test]
    fn nested_compounds_wrap_outside_in() {
        let registry = test_registry();
        let mut node = base_node();
        let variant = Variant::Compound {
            root: "group".to_string(),
            variant: Box::new(Variant::Compound {
                root: "group".to_string(),
                variant: Box::new(Variant::Static {
                    root: "hover".to_string(),
                }),
                modifier: None,
            }),
            modifier: None,
        };
        assert!(apply_variant(&mut node, &variant, &registry, 0));
        assert_eq!(
            node,
            rule(
                ".x",
                vec![rule(
                    "&:is(:where(.group):is(:where(.group):hover *) *)",
                    vec![decl("display", "flex")]
                )]
            )
        );
    }

    #[test]
    fn relative_selector_is_allowed_inside_a_compound() {
        let registry = test_registry();
        let mut node = base_node();
        let variant = Variant::Compound {
            root: "group".to_string(),
            variant: Box::new(Variant::Arbitrary {
                selector: "> p".to_string(),
                relative: true,
            }),
            modifier: None,
        };
        assert!(apply_variant(&mut node, &variant, &registry, 0));
    }

    #[test]
    fn compound_fails_when_inner_variant_is_unknown() {
        let registry = test_registry();
        let mut node = base_node();
        let variant = Variant::Compound {
            root: "group".to_string(),
            variant: Box::new(Variant::Static {
                root: "unknown".to_string(),
            }),
            modifier: None,
        };
        assert!(!apply_variant(&mut node, &variant, &registry, 0));
        assert_eq!(node, base_node());
    }

    #[test]
    fn compound_over_at_rule_child_fails_for_style_only_compound() {
        let registry = test_registry();
        let mut node = base_node();
        let variant = Variant::Compound {
            root: "group".to_string(),
            variant: Box::new(Variant::Static {
                root: "md".to_string(),
            }),
            modifier: None,
        };
        assert!(!apply_variant(&mut node, &variant, &registry, 0));
    }

    #[test]
    fn variant_order_table_follows_registration() {
        let registry = test_registry();
        let order = registry.variant_order();
        assert_eq!(order.get("hover"), Some(&0));
        assert_eq!(order.get("focus"), Some(&1));
        assert_eq!(order.get("md"), Some(&2));
        let arbitrary = Variant::Arbitrary {
            selector: "&:hover".to_string(),
            relative: false,
        };
        assert_eq!(registry.bit_position(&arbitrary), order.len() as u32);
    }
}
