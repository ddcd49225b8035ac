use std::collections::HashMap;
use std::fmt;

use serde_json::Value;

use crate::error::AdapterError;
use crate::handle::EngineHandle;
use crate::translate;
use crate::types::EngineMode;

/// Option names every facade routes to the engine instead of its own storage.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EngineOption {
    Engine,
    Charset,
    Path,
    Extension,
    Version,
}

impl EngineOption {
    pub const ALL: [EngineOption; 5] = [
        EngineOption::Engine,
        EngineOption::Charset,
        EngineOption::Path,
        EngineOption::Extension,
        EngineOption::Version,
    ];

    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            EngineOption::Engine => "engine",
            EngineOption::Charset => "charset",
            EngineOption::Path => "path",
            EngineOption::Extension => "extension",
            EngineOption::Version => "version",
        }
    }

    /// Case-insensitive lookup; `None` for names the engine does not own.
    #[must_use]
    pub fn parse(name: &str) -> Option<Self> {
        let name = name.trim();
        Self::ALL
            .into_iter()
            .find(|opt| opt.as_str().eq_ignore_ascii_case(name))
    }
}

impl fmt::Display for EngineOption {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Where an option name resolves to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum OptionTarget {
    Engine(EngineOption),
    Generic(String),
}

impl OptionTarget {
    #[must_use]
    pub fn resolve(name: &str) -> Self {
        EngineOption::parse(name).map_or_else(|| OptionTarget::Generic(name.to_owned()), OptionTarget::Engine)
    }
}

fn text_of(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

/// Reads an engine-owned option.
///
/// # Errors
/// `ConnectionFailure` when the handle is not connected.
pub fn get_engine_option(handle: &EngineHandle, option: EngineOption) -> Result<Value, AdapterError> {
    let engine = handle.engine()?;
    Ok(match option {
        EngineOption::Engine => Value::String(engine.engine_mode().as_str().to_owned()),
        EngineOption::Charset => Value::String(engine.charset()),
        EngineOption::Path => engine.path().map_or(Value::Null, Value::String),
        EngineOption::Extension => Value::String(engine.extension()),
        EngineOption::Version => Value::String(engine.version()),
    })
}

/// Writes an engine-owned option.
///
/// # Errors
/// `ConnectionFailure` when not connected; `UnsupportedFeature` for the
/// read-only version or an unknown engine mode.
pub fn set_engine_option(
    handle: &mut EngineHandle,
    option: EngineOption,
    value: &Value,
) -> Result<(), AdapterError> {
    let engine = handle.engine_mut()?;
    let text = text_of(value);
    match option {
        EngineOption::Engine => {
            let mode = EngineMode::parse(&text).ok_or_else(|| {
                AdapterError::UnsupportedFeature(format!("unknown engine mode '{text}'"))
            })?;
            engine.set_engine_mode(mode);
        }
        EngineOption::Charset => engine.set_charset(&text),
        EngineOption::Path => engine.set_path(&text),
        EngineOption::Extension => engine.set_extension(&text),
        EngineOption::Version => {
            return Err(AdapterError::UnsupportedFeature("version is read-only".into()));
        }
    }
    translate::check(engine)
}

/// Per-facade option storage with engine routing.
///
/// Recognised names go to the engine; anything else lives in the facade's
/// own key/value map.
#[derive(Debug, Clone, Default)]
pub struct OptionBag {
    generic: HashMap<String, Value>,
}

impl OptionBag {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// # Errors
    /// See [`get_engine_option`]; generic names never fail.
    pub fn get(&self, handle: &EngineHandle, name: &str) -> Result<Option<Value>, AdapterError> {
        match OptionTarget::resolve(name) {
            OptionTarget::Engine(option) => get_engine_option(handle, option).map(Some),
            OptionTarget::Generic(key) => Ok(self.generic.get(&key).cloned()),
        }
    }

    /// # Errors
    /// See [`set_engine_option`]; generic names never fail.
    pub fn set(&mut self, handle: &mut EngineHandle, name: &str, value: Value) -> Result<(), AdapterError> {
        match OptionTarget::resolve(name) {
            OptionTarget::Engine(option) => set_engine_option(handle, option, &value),
            OptionTarget::Generic(key) => {
                self.generic.insert(key, value);
                Ok(())
            }
        }
    }

    /// A generic option, without engine routing.
    #[must_use]
    pub fn generic(&self, name: &str) -> Option<&Value> {
        self.generic.get(name)
    }
}
