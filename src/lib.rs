pub mod ast;
pub mod builtins;
pub mod candidate;
pub mod compile;
pub mod config;
pub mod theme;
pub mod utility;
pub mod variant;

use std::collections::BTreeSet;

pub use ast::{at_rule, decl, rule, to_css, walk, AstNode, WalkAction};
pub use candidate::{
    parse_candidate, Candidate, CandidateModifier, CandidateValue, Variant, VariantValue,
};
pub use compile::{
    compile_candidates, escape_selector, CompileOptions, CompileOutput, SortKey,
};
pub use config::{load, resolve_theme, Config, ConfigError, ThemeConfig};
pub use theme::Theme;
pub use utility::{Utility, UtilityKind, UtilityOutput, UtilityRegistry};
pub use variant::{
    apply_variant, VariantDef, VariantKind, VariantRegistry, COMPOUNDS_AT_RULES,
    COMPOUNDS_STYLE_RULES,
};

pub struct DesignSystem {
    pub theme: Theme,
    pub utilities: UtilityRegistry,
    pub variants: VariantRegistry,
    pub(crate) prefix: Option<String>,
    pub(crate) important: bool,
    pub(crate) invalid_candidates: BTreeSet<String>,
}

impl DesignSystem {
    pub fn new(theme: Theme) -> Self {
        Self {
            theme,
            utilities: UtilityRegistry::new(),
            variants: VariantRegistry::new(),
            prefix: None,
            important: false,
            invalid_candidates: BTreeSet::new(),
        }
    }

    pub fn with_defaults() -> Self {
        let theme = Theme::default_theme();
        let mut utilities = UtilityRegistry::new();
        let mut variants = VariantRegistry::new();
        builtins::register(&mut utilities, &mut variants, &theme);
        Self {
            theme,
            utilities,
            variants,
            prefix: None,
            important: false,
            invalid_candidates: BTreeSet::new(),
        }
    }

    pub fn from_config(config: &Config) -> Self {
        let theme = config::resolve_theme(config);
        let mut utilities = UtilityRegistry::new();
        let mut variants = VariantRegistry::new();
        builtins::register(&mut utilities, &mut variants, &theme);
        Self {
            theme,
            utilities,
            variants,
            prefix: config.prefix.clone(),
            important: config.important,
            invalid_candidates: BTreeSet::new(),
        }
    }

    pub fn set_prefix(&mut self, prefix: Option<String>) {
        self.prefix = prefix.filter(|p| !p.is_empty());
    }

    pub fn prefix(&self) -> Option<&str> {
        self.prefix.as_deref()
    }

    pub fn set_important(&mut self, important: bool) {
        self.important = important;
    }

    pub fn is_important(&self) -> bool {
        self.important
    }

    pub fn parse_candidate(&self, raw: &str) -> Vec<Candidate> {
        parse_candidate(raw, &self.utilities, &self.variants, self.prefix.as_deref())
    }

    pub fn has_invalid_candidate(&self, raw: &str) -> bool {
        self.invalid_candidates.contains(raw)
    }

    pub fn add_invalid_candidate(&mut self, raw: &str) {
        self.invalid_candidates.insert(raw.to_string());
    }

    pub fn build(&mut self, classes: &[String], minify: bool) -> String {
        let output = compile_candidates(classes, self, CompileOptions::default());
        to_css(&output.ast_nodes, minify)
    }
}
