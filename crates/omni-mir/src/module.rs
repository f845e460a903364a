//! Modules: an ordered list of functions plus a name index rebuilt on demand.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use crate::function::Function;

/// A module: an ordered list of functions. The name→function index is not
/// persisted -- it is rebuilt on demand by [`Module::index`], so a pass that
/// mutates `functions` in place never has a stale index to worry about.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Module {
    pub functions: Vec<Function>,
}

impl Module {
    pub fn new(functions: Vec<Function>) -> Self {
        Module { functions }
    }

    /// Rebuilds a name→index map over the current function list.
    ///
    /// Callers that need this more than once per mutation (e.g. the
    /// evaluator resolving many `call`s against a stable module) should
    /// cache the result themselves; this does no caching on the `Module`
    /// itself so the verifier's "no stale index" guarantee holds trivially.
    pub fn index(&self) -> HashMap<&str, usize> {
        self.functions
            .iter()
            .enumerate()
            .map(|(i, f)| (f.name.as_str(), i))
            .collect()
    }

    /// Finds a function by name.
    pub fn function(&self, name: &str) -> Option<&Function> {
        self.functions.iter().find(|f| f.name == name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::TypeTag;

    #[test]
    fn index_maps_names_to_positions() {
        let module = Module::new(vec![
            Function::new("main", vec![], TypeTag::Int),
            Function::new("helper", vec![], TypeTag::Void),
        ]);
        let idx = module.index();
        assert_eq!(idx.get("main"), Some(&0));
        assert_eq!(idx.get("helper"), Some(&1));
        assert_eq!(idx.get("missing"), None);
    }

    #[test]
    fn function_lookup_by_name() {
        let module = Module::new(vec![Function::new("main", vec![], TypeTag::Int)]);
        assert!(module.function("main").is_some());
        assert!(module.function("nope").is_none());
    }
}
