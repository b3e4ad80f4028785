//! Message and registry types

use serde::{Deserialize, Serialize};
use std::fmt;

/// A single typed message argument.
///
/// Serializes as `{"type": "i", "value": 42}` so browser clients can tell an
/// integer from a float that happens to be whole.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", content = "value")]
pub enum Arg {
    /// 32-bit integer (`i`)
    #[serde(rename = "i")]
    Int(i32),
    /// 32-bit float (`f`)
    #[serde(rename = "f")]
    Float(f32),
    /// 64-bit float (`d`)
    #[serde(rename = "d")]
    Double(f64),
    /// UTF-8 string (`s`)
    #[serde(rename = "s")]
    String(String),
}

impl Arg {
    /// OSC type tag for this argument
    pub fn type_tag(&self) -> char {
        match self {
            Arg::Int(_) => 'i',
            Arg::Float(_) => 'f',
            Arg::Double(_) => 'd',
            Arg::String(_) => 's',
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Arg::String(s) => Some(s),
            _ => None,
        }
    }

    /// Numeric value as i32. Floats are truncated toward zero.
    pub fn as_i32(&self) -> Option<i32> {
        match self {
            Arg::Int(i) => Some(*i),
            Arg::Float(f) => Some(*f as i32),
            Arg::Double(d) => Some(*d as i32),
            Arg::String(_) => None,
        }
    }

    /// Numeric value as f32
    pub fn as_f32(&self) -> Option<f32> {
        match self {
            Arg::Int(i) => Some(*i as f32),
            Arg::Float(f) => Some(*f),
            Arg::Double(d) => Some(*d as f32),
            Arg::String(_) => None,
        }
    }

    pub fn is_numeric(&self) -> bool {
        !matches!(self, Arg::String(_))
    }
}

impl From<i32> for Arg {
    fn from(v: i32) -> Self {
        Arg::Int(v)
    }
}

impl From<f32> for Arg {
    fn from(v: f32) -> Self {
        Arg::Float(v)
    }
}

impl From<f64> for Arg {
    fn from(v: f64) -> Self {
        Arg::Double(v)
    }
}

impl From<&str> for Arg {
    fn from(v: &str) -> Self {
        Arg::String(v.to_string())
    }
}

impl From<String> for Arg {
    fn from(v: String) -> Self {
        Arg::String(v)
    }
}

impl fmt::Display for Arg {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Arg::Int(i) => write!(f, "{}", i),
            Arg::Float(v) => write!(f, "{}f", v),
            Arg::Double(v) => write!(f, "{}d", v),
            Arg::String(s) => write!(f, "{:?}", s),
        }
    }
}

/// An addressed message with an ordered list of typed arguments.
///
/// The same value is used on both sides of the bridge: it is decoded from OSC
/// datagrams and JSON frames, and encoded back into either.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Message {
    pub address: String,
    #[serde(default)]
    pub args: Vec<Arg>,
}

impl Message {
    pub fn new(address: impl Into<String>) -> Self {
        Self {
            address: address.into(),
            args: Vec::new(),
        }
    }

    pub fn with_args(address: impl Into<String>, args: Vec<Arg>) -> Self {
        Self {
            address: address.into(),
            args,
        }
    }

    /// Append an argument (builder style)
    pub fn arg(mut self, arg: impl Into<Arg>) -> Self {
        self.args.push(arg.into());
        self
    }

    /// Argument at `index`, if present
    pub fn get(&self, index: usize) -> Option<&Arg> {
        self.args.get(index)
    }

    /// Type tags of all arguments, e.g. `"sii"`
    pub fn type_tags(&self) -> String {
        self.args.iter().map(Arg::type_tag).collect()
    }
}

impl fmt::Display for Message {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.address)?;
        for arg in &self.args {
            write!(f, " {}", arg)?;
        }
        Ok(())
    }
}

/// Last-known metadata of an engine module, keyed by `name`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ModuleDescriptor {
    pub name: String,
    pub category: String,
    pub synth_def: String,
    pub num_params: i32,
    pub num_instances: i32,
    pub description: String,
}

/// Last-known metadata of one module parameter, keyed by `name` within its module
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ParamDescriptor {
    pub name: String,
    #[serde(rename = "default")]
    pub default_value: f32,
    pub min: f32,
    pub max: f32,
    pub units: String,
    pub desc: String,
}
