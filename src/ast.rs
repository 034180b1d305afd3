#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AstNode {
    Rule {
        selector: String,
        children: Vec<AstNode>,
    },
    AtRule {
        name: String,
        params: String,
        children: Vec<AstNode>,
    },
    Declaration {
        property: String,
        value: String,
        important: bool,
    },
    Placeholder,
}

pub fn rule(selector: &str, children: Vec<AstNode>) -> AstNode {
    AstNode::Rule {
        selector: selector.to_string(),
        children,
    }
}

pub fn at_rule(name: &str, params: &str, children: Vec<AstNode>) -> AstNode {
    AstNode::AtRule {
        name: name.to_string(),
        params: params.to_string(),
        children,
    }
}

pub fn decl(property: &str, value: &str) -> AstNode {
    AstNode::Declaration {
        property: property.to_string(),
        value: value.to_string(),
        important: false,
    }
}

impl AstNode {
    pub fn children(&self) -> Option<&[AstNode]> {
        match self {
            AstNode::Rule { children, .. } | AstNode::AtRule { children, .. } => Some(children),
            _ => None,
        }
    }

    pub fn children_mut(&mut self) -> Option<&mut Vec<AstNode>> {
        match self {
            AstNode::Rule { children, .. } | AstNode::AtRule { children, .. } => Some(children),
            _ => None,
        }
    }

    pub fn is_container(&self) -> bool {
        matches!(self, AstNode::Rule { .. } | AstNode::AtRule { .. })
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WalkAction {
    Continue,
    Skip,
    Stop,
    Replace(Vec<AstNode>),
    ReplaceSkip(Vec<AstNode>),
    ReplaceStop(Vec<AstNode>),
}

pub fn walk(nodes: &mut Vec<AstNode>, visit: &mut dyn FnMut(&mut AstNode) -> WalkAction) -> bool {
    let mut idx = 0usize;
    while idx < nodes.len() {
        match visit(&mut nodes[idx]) {
            WalkAction::Continue => {
                if let Some(children) = nodes[idx].children_mut() {
                    if !walk(children, visit) {
                        return false;
                    }
                }
                idx += 1;
            }
            WalkAction::Skip => {
                idx += 1;
            }
            WalkAction::Stop => return false,
            WalkAction::Replace(replacement) => {
                nodes.splice(idx..idx + 1, replacement);
            }
            WalkAction::ReplaceSkip(replacement) => {
                let count = replacement.len();
                nodes.splice(idx..idx + 1, replacement);
                idx += count;
            }
            WalkAction::ReplaceStop(replacement) => {
                nodes.splice(idx..idx + 1, replacement);
                return false;
            }
        }
    }
    true
}

pub fn to_css(nodes: &[AstNode], minify: bool) -> String {
    let mut out = String::new();
    for node in nodes {
        write_node(node, 0, minify, &mut out);
    }
    out
}

fn write_node(node: &AstNode, depth: usize, minify: bool, out: &mut String) {
    match node {
        AstNode::Rule { selector, children } => {
            write_block(selector, children, depth, minify, out);
        }
        AstNode::AtRule {
            name,
            params,
            children,
        } => {
            let header = if params.is_empty() {
                name.clone()
            } else {
                format!("{} {}", name, params)
            };
            write_block(&header, children, depth, minify, out);
        }
        AstNode::Declaration {
            property,
            value,
            important,
        } => {
            let bang = if *important { " !important" } else { "" };
            if minify {
                out.push_str(&format!("{}:{}{};", property, value, bang));
            } else {
                out.push_str(&"  ".repeat(depth));
                out.push_str(&format!("{}: {}{};\n", property, value, bang));
            }
        }
        AstNode::Placeholder => {}
    }
}

fn write_block(header: &str, children: &[AstNode], depth: usize, minify: bool, out: &mut String) {
    if minify {
        out.push_str(header);
        out.push('{');
        for child in children {
            write_node(child, depth + 1, minify, out);
        }
        if out.ends_with(';') {
            out.pop();
        }
        out.push('}');
    } else {
        out.push_str(&"  ".repeat(depth));
        out.push_str(header);
        out.push_str(" {\n");
        for child in children {
            write_node(child, depth + 1, minify, out);
        }
        out.push_str(&"  ".repeat(depth));
        out.push_str("}\n");
    }
}
