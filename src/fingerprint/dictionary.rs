//! The translator dictionary (`dictionary.json`): maps a fingerprint file's
//! basename to a display `name` and, for CMSes, the tools known to work
//! with it.

use std::collections::HashMap;

use serde::Deserialize;

#[derive(Debug, Clone, Deserialize)]
pub struct ToolEntry {
    pub name: String,
    pub link: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct DictionaryEntry {
    pub name: String,
    #[serde(default)]
    pub tool: Vec<ToolEntry>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct Dictionary(pub HashMap<String, DictionaryEntry>);

impl Dictionary {
    #[must_use]
    pub fn name_for(&self, basename: &str) -> Option<&str> {
        self.0.get(basename).map(|e| e.name.as_str())
    }

    #[must_use]
    pub fn tools_for(&self, cms_name: &str) -> Vec<&ToolEntry> {
        self.0
            .values()
            .filter(|e| e.name == cms_name)
            .flat_map(|e| e.tool.iter())
            .collect()
    }
}
