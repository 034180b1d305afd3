use std::collections::BTreeMap;

use crate::ast::AstNode;
use crate::candidate::Candidate;
use crate::theme::Theme;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UtilityKind {
    Static,
    Functional,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum UtilityOutput {
    Abort,
    Skip,
    Nodes(Vec<AstNode>),
}

pub type UtilityCompileFn = Box<dyn Fn(&Candidate, &Theme) -> UtilityOutput>;

pub struct Utility {
    pub kind: UtilityKind,
    pub fallback: bool,
    pub compile: UtilityCompileFn,
}

#[derive(Default)]
pub struct UtilityRegistry {
    entries: BTreeMap<String, Vec<Utility>>,
}

impl UtilityRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(&mut self, root: &str, utility: Utility) {
        self.entries.entry(root.to_string()).or_default().push(utility);
    }

    pub fn register_static(&mut self, name: &str, declarations: Vec<AstNode>) {
        self.register(
            name,
            Utility {
                kind: UtilityKind::Static,
                fallback: false,
                compile: Box::new(move |_, _| UtilityOutput::Nodes(declarations.clone())),
            },
        );
    }

    pub fn register_functional(
        &mut self,
        root: &str,
        compile: impl Fn(&Candidate, &Theme) -> UtilityOutput + 'static,
    ) {
        self.register(
            root,
            Utility {
                kind: UtilityKind::Functional,
                fallback: false,
                compile: Box::new(compile),
            },
        );
    }

    pub fn register_fallback(
        &mut self,
        root: &str,
        compile: impl Fn(&Candidate, &Theme) -> UtilityOutput + 'static,
    ) {
        self.register(
            root,
            Utility {
                kind: UtilityKind::Functional,
                fallback: true,
                compile: Box::new(compile),
            },
        );
    }

    pub fn get(&self, root: &str) -> &[Utility] {
        self.entries.get(root).map(Vec::as_slice).unwrap_or(&[])
    }

    pub fn has_static(&self, name: &str) -> bool {
        self.get(name)
            .iter()
            .any(|utility| utility.kind == UtilityKind::Static)
    }

    pub fn has_functional(&self, root: &str) -> bool {
        self.get(root)
            .iter()
            .any(|utility| utility.kind == UtilityKind::Functional)
    }
}
