use std::collections::BTreeMap;

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Theme {
    values: BTreeMap<String, String>,
    prefix: Option<String>,
}

impl Theme {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_prefix(prefix: &str) -> Self {
        Self {
            values: BTreeMap::new(),
            prefix: if prefix.is_empty() {
                None
            } else {
                Some(prefix.to_string())
            },
        }
    }

    pub fn insert(&mut self, key: &str, value: &str) {
        self.values.insert(key.to_string(), value.to_string());
    }

    pub fn get(&self, key: &str) -> Option<&str> {
        self.values.get(key).map(String::as_str)
    }

    pub fn key_name(&self, namespace: &str, name: &str) -> String {
        let body = if namespace.is_empty() {
            name.to_string()
        } else if name.is_empty() {
            namespace.to_string()
        } else {
            format!("{}-{}", namespace, name)
        };
        match &self.prefix {
            Some(prefix) => format!("--{}-{}", prefix, body),
            None => format!("--{}", body),
        }
    }

    pub fn resolve(&self, name: &str, namespaces: &[&str]) -> Option<String> {
        for namespace in namespaces {
            let key = self.key_name(namespace, name);
            if let Some(value) = self.values.get(&key) {
                return Some(value.clone());
            }
        }
        None
    }

    pub fn resolve_var(&self, name: &str, namespaces: &[&str]) -> Option<String> {
        for namespace in namespaces {
            let key = self.key_name(namespace, name);
            if self.values.contains_key(&key) {
                return Some(format!("var({})", key));
            }
        }
        None
    }

    pub fn extend(&mut self, values: &BTreeMap<String, String>) {
        for (key, value) in values {
            self.values.insert(key.clone(), value.clone());
        }
    }

    pub fn default_theme() -> Self {
        let mut theme = Theme::new();
        theme.insert("--spacing", "0.25rem");

        theme.insert("--breakpoint-sm", "40rem");
        theme.insert("--breakpoint-md", "48rem");
        theme.insert("--breakpoint-lg", "64rem");
        theme.insert("--breakpoint-xl", "80rem");
        theme.insert("--breakpoint-2xl", "96rem");

        theme.insert("--color-white", "#fff");
        theme.insert("--color-black", "#000");
        theme.insert("--color-red-100", "oklch(0.936 0.032 17.717)");
        theme.insert("--color-red-500", "oklch(0.637 0.237 25.331)");
        theme.insert("--color-red-900", "oklch(0.396 0.141 25.723)");
        theme.insert("--color-blue-100", "oklch(0.932 0.032 255.585)");
        theme.insert("--color-blue-500", "oklch(0.623 0.214 259.815)");
        theme.insert("--color-blue-900", "oklch(0.379 0.146 265.522)");
        theme.insert("--color-gray-100", "oklch(0.967 0.003 264.542)");
        theme.insert("--color-gray-500", "oklch(0.551 0.027 264.364)");
        theme.insert("--color-gray-900", "oklch(0.21 0.034 264.665)");

        theme.insert("--text-sm", "0.875rem");
        theme.insert("--text-sm--line-height", "calc(1.25 / 0.875)");
        theme.insert("--text-base", "1rem");
        theme.insert("--text-base--line-height", "1.5");
        theme.insert("--text-lg", "1.125rem");
        theme.insert("--text-lg--line-height", "calc(1.75 / 1.125)");
        theme.insert("--text-xl", "1.25rem");
        theme.insert("--text-xl--line-height", "calc(1.75 / 1.25)");

        theme
    }
}

#[cfg(test)]
mod tests {
    use super::Theme;

    #[test]
    fn resolves_namespaced_values() {
        let theme = Theme::default_theme();
        assert_eq!(
            theme.resolve("red-500", &["color"]),
            Some("oklch(0.637 0.237 25.331)".to_string())
        );
        assert_eq!(theme.resolve("red-500", &["text"]), None);
    }

    #[test]
    fn resolves_first_matching_namespace() {
        let mut theme = Theme::new();
        theme.insert("--text-sm", "0.875rem");
        theme.insert("--color-sm", "#123");
        assert_eq!(
            theme.resolve_var("sm", &["text", "color"]),
            Some("var(--text-sm)".to_string())
        );
    }

    #[test]
    fn prefixed_keys_resolve_with_prefix() {
        let mut theme = Theme::with_prefix("tw");
        theme.insert("--tw-color-red-500", "#f00");
        assert_eq!(
            theme.resolve_var("red-500", &["color"]),
            Some("var(--tw-color-red-500)".to_string())
        );
        assert_eq!(theme.resolve("red-500", &["color"]), Some("#f00".to_string()));
    }

    #[test]
    fn extend_overrides_existing_values() {
        let mut theme = Theme::default_theme();
        let mut overrides = std::collections::BTreeMap::new();
        overrides.insert("--spacing".to_string(), "0.5rem".to_string());
        theme.extend(&overrides);
        assert_eq!(theme.get("--spacing"), Some("0.5rem"));
    }
}
