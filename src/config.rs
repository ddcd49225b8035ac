use serde::{Deserialize, Serialize};

use crate::types::EngineMode;

fn default_charset() -> String {
    "UTF-8".into()
}

fn default_extension() -> String {
    "db".into()
}

/// Options for connecting a facade to the engine.
///
/// Deserializable so host applications can keep it in their own config files.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConnectOptions {
    /// Database file. A bare name gets `extension` appended by the engine.
    pub path: String,
    #[serde(default = "default_charset")]
    pub charset: String,
    #[serde(default)]
    pub engine_mode: EngineMode,
    #[serde(default = "default_extension")]
    pub extension: String,
    /// Keep the engine bound across `disconnect` calls.
    #[serde(default)]
    pub persistent: bool,
}

impl ConnectOptions {
    #[must_use]
    pub fn new(path: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            charset: default_charset(),
            engine_mode: EngineMode::default(),
            extension: default_extension(),
            persistent: false,
        }
    }

    #[must_use]
    pub fn with_charset(mut self, charset: impl Into<String>) -> Self {
        self.charset = charset.into();
        self
    }

    #[must_use]
    pub fn builder(path: impl Into<String>) -> ConnectOptionsBuilder {
        ConnectOptionsBuilder::new(path)
    }
}

/// Fluent builder for [`ConnectOptions`].
#[derive(Debug, Clone)]
pub struct ConnectOptionsBuilder {
    opts: ConnectOptions,
}

impl ConnectOptionsBuilder {
    #[must_use]
    pub fn new(path: impl Into<String>) -> Self {
        Self {
            opts: ConnectOptions::new(path),
        }
    }

    #[must_use]
    pub fn charset(mut self, charset: impl Into<String>) -> Self {
        self.opts.charset = charset.into();
        self
    }

    #[must_use]
    pub fn engine_mode(mut self, mode: EngineMode) -> Self {
        self.opts.engine_mode = mode;
        self
    }

    #[must_use]
    pub fn extension(mut self, extension: impl Into<String>) -> Self {
        self.opts.extension = extension.into();
        self
    }

    #[must_use]
    pub fn persistent(mut self, persistent: bool) -> Self {
        self.opts.persistent = persistent;
        self
    }

    #[must_use]
    pub fn finish(self) -> ConnectOptions {
        self.opts
    }
}

impl From<&str> for ConnectOptions {
    fn from(path: &str) -> Self {
        ConnectOptions::new(path)
    }
}

impl From<String> for ConnectOptions {
    fn from(path: String) -> Self {
        ConnectOptions::new(path)
    }
}
