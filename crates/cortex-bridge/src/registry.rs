//! Module/parameter registry cache
//!
//! The engine announces its modules and their parameters on two reserved
//! addresses. The registry keeps the last announcement for each module and
//! each (module, parameter) pair so late-joining clients can query them.

use cortex_core::{Arg, Message, ModuleDescriptor, ParamDescriptor, DEFAULT_REGISTRY_NAMESPACE};
use parking_lot::RwLock;
use std::collections::HashMap;

/// The two reserved announcement addresses
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RegistryAddresses {
    pub module: String,
    pub param: String,
}

impl RegistryAddresses {
    pub fn new(namespace: &str) -> Self {
        let ns = namespace.trim_end_matches('/');
        Self {
            module: format!("{}/module", ns),
            param: format!("{}/param", ns),
        }
    }
}

impl Default for RegistryAddresses {
    fn default() -> Self {
        Self::new(DEFAULT_REGISTRY_NAMESPACE)
    }
}

/// What a message did to the registry
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Observation {
    Module(String),
    Param { module: String, param: String },
}

/// Registry cache
#[derive(Default)]
pub struct Registry {
    modules: RwLock<HashMap<String, ModuleDescriptor>>,
    params: RwLock<HashMap<String, Vec<ParamDescriptor>>>,
}

impl Registry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert or fully replace a module. Returns false if the name is empty.
    pub fn observe_module(&self, descriptor: ModuleDescriptor) -> bool {
        if descriptor.name.is_empty() {
            return false;
        }
        self.modules
            .write()
            .insert(descriptor.name.clone(), descriptor);
        true
    }

    /// Append a parameter, or update it in place if the module already has one
    /// with the same name. Returns false if either name is empty.
    pub fn observe_param(&self, module: &str, descriptor: ParamDescriptor) -> bool {
        if module.is_empty() || descriptor.name.is_empty() {
            return false;
        }

        let mut params = self.params.write();
        let list = params.entry(module.to_string()).or_default();
        match list.iter_mut().find(|p| p.name == descriptor.name) {
            Some(existing) => *existing = descriptor,
            None => list.push(descriptor),
        }
        true
    }

    /// Apply a message if it is addressed to one of the reserved addresses
    pub fn observe(&self, msg: &Message, addrs: &RegistryAddresses) -> Option<Observation> {
        if msg.address == addrs.module {
            let descriptor = module_from_message(msg);
            let name = descriptor.name.clone();
            self.observe_module(descriptor)
                .then_some(Observation::Module(name))
        } else if msg.address == addrs.param {
            let (module, descriptor) = param_from_message(msg);
            let param = descriptor.name.clone();
            self.observe_param(&module, descriptor)
                .then_some(Observation::Param { module, param })
        } else {
            None
        }
    }

    /// All modules, sorted by name
    pub fn list_modules(&self) -> Vec<ModuleDescriptor> {
        let mut modules: Vec<_> = self.modules.read().values().cloned().collect();
        modules.sort_by(|a, b| a.name.cmp(&b.name));
        modules
    }

    /// Parameters of a module in announcement order
    pub fn params_for(&self, module: &str) -> Vec<ParamDescriptor> {
        self.params.read().get(module).cloned().unwrap_or_default()
    }

    pub fn module(&self, name: &str) -> Option<ModuleDescriptor> {
        self.modules.read().get(name).cloned()
    }

    pub fn module_count(&self) -> usize {
        self.modules.read().len()
    }
}

fn text(msg: &Message, index: usize) -> String {
    msg.get(index)
        .and_then(Arg::as_str)
        .unwrap_or_default()
        .to_string()
}

fn int(msg: &Message, index: usize) -> i32 {
    msg.get(index).and_then(Arg::as_i32).unwrap_or(0)
}

fn float(msg: &Message, index: usize, default: f32) -> f32 {
    msg.get(index).and_then(Arg::as_f32).unwrap_or(default)
}

/// Read `[name, category, synthDef, numParams, numInstances, description]`.
///
/// Missing or mistyped fields take their defaults.
pub fn module_from_message(msg: &Message) -> ModuleDescriptor {
    ModuleDescriptor {
        name: text(msg, 0),
        category: text(msg, 1),
        synth_def: text(msg, 2),
        num_params: int(msg, 3),
        num_instances: int(msg, 4),
        description: text(msg, 5),
    }
}

/// Read `[moduleName, paramName, default, min, max, units, desc]`.
///
/// Missing or mistyped fields take their defaults (`max` defaults to 1).
pub fn param_from_message(msg: &Message) -> (String, ParamDescriptor) {
    let descriptor = ParamDescriptor {
        name: text(msg, 1),
        default_value: float(msg, 2, 0.0),
        min: float(msg, 3, 0.0),
        max: float(msg, 4, 1.0),
        units: text(msg, 5),
        desc: text(msg, 6),
    };
    (text(msg, 0), descriptor)
}
