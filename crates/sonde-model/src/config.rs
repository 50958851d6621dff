use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use crate::module::Module;

/// Root of the declarative configuration file.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    /// Modules indexed by the name used in `/probe?module=<name>`.
    #[serde(default)]
    pub modules: HashMap<String, Module>,
}

impl Config {
    /// Look up a module by its probe name.
    pub fn module(&self, name: &str) -> Option<&Module> {
        self.modules.get(name)
    }
}
