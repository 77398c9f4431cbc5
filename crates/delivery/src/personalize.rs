//! Message personalization by literal `[placeholder]` substitution.

use std::collections::HashMap;

/// Substitutes named `[placeholder]` tokens in a campaign body. Placeholders
/// with no supplied value are left untouched rather than erroring.
#[derive(Debug, Clone, Default)]
pub struct Personalizer {
    vars: HashMap<String, String>,
}

impl Personalizer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn var(mut self, name: &str, value: &str) -> Self {
        self.vars.insert(name.to_string(), value.to_string());
        self
    }

    pub fn render(&self, template: &str) -> String {
        let mut out = template.to_string();
        for (name, value) in &self.vars {
            out = out.replace(&format!("[{name}]"), value);
        }
        out
    }
}
