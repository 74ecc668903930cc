//! Catalogue of recognized blocking primitives
//!
//! Each [`Primitive`] describes one blocking call: how many arguments it
//! needs, where its wait handle comes from, the non-blocking function that
//! starts the operation, and the code templates that register the wait and
//! test whether it is still pending.
//!
//! Templates are plain C text with two kinds of placeholders:
//! - `{handle}`: the wait handle
//! - `{N}`: the rendered text of call argument `N`
//!
//! The built-in catalogue covers the `papi_*` plugin family and `wait_op`.
//! Other catalogues are loaded from TOML files with one `[[primitive]]` table
//! per entry.

use rustc_hash::FxHashMap;
use serde::Deserialize;
use std::fs;
use std::path::{Path, PathBuf};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum CatalogError {
    #[error("failed to read catalogue {path}: {error}")]
    Io {
        path: PathBuf,
        error: std::io::Error,
    },

    #[error("invalid catalogue: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("primitive `{0}` is listed more than once")]
    Duplicate(String),

    #[error("primitive `{name}`: {message}")]
    Template { name: String, message: String },
}

/// Where a primitive finds its wait handle
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(untagged)]
pub enum WaitHandle {
    /// Call argument at this position
    Argument(usize),
    /// Parameter of the enclosing function whose type mentions this name
    Parameter(String),
}

/// One recognized blocking primitive
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct Primitive {
    pub name: String,
    pub min_args: usize,
    pub wait_handle: WaitHandle,
    /// Non-blocking counterpart; when absent the call is removed entirely
    #[serde(default)]
    pub start: Option<String>,
    #[serde(default)]
    pub register: Option<String>,
    pub pending: String,
}

/// A placeholder found in a template
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Placeholder {
    Handle,
    Argument(usize),
}

impl Primitive {
    fn new(
        name: &str,
        min_args: usize,
        wait_handle: WaitHandle,
        start: Option<&str>,
        register: Option<&str>,
        pending: &str,
    ) -> Self {
        Self {
            name: name.to_string(),
            min_args,
            wait_handle,
            start: start.map(str::to_string),
            register: register.map(str::to_string),
            pending: pending.to_string(),
        }
    }

    /// Call arguments the completion check reads after resuming
    pub fn pending_arguments(&self) -> Vec<usize> {
        let mut indices: Vec<usize> = placeholders(&self.pending)
            .into_iter()
            .filter_map(|placeholder| match placeholder {
                Placeholder::Argument(index) => Some(index),
                Placeholder::Handle => match self.wait_handle {
                    WaitHandle::Argument(index) => Some(index),
                    WaitHandle::Parameter(_) => None,
                },
            })
            .collect();
        indices.sort_unstable();
        indices.dedup();
        indices
    }

    fn validate(&self) -> Result<(), CatalogError> {
        let invalid = |message: String| CatalogError::Template {
            name: self.name.clone(),
            message,
        };

        if let WaitHandle::Argument(index) = self.wait_handle {
            if index >= self.min_args {
                return Err(invalid(format!(
                    "wait handle argument {} is not covered by min_args = {}",
                    index, self.min_args
                )));
            }
        }

        for template in self.register.iter().chain(std::iter::once(&self.pending)) {
            check_template(template, self.min_args).map_err(invalid)?;
        }

        Ok(())
    }
}

/// Set of recognized primitives, indexed by name
#[derive(Debug, Clone)]
pub struct Catalog {
    primitives: Vec<Primitive>,
    index: FxHashMap<String, usize>,
}

#[derive(Deserialize)]
struct RawCatalog {
    #[serde(default, rename = "primitive")]
    primitives: Vec<Primitive>,
}

impl Catalog {
    pub fn new(primitives: Vec<Primitive>) -> Result<Self, CatalogError> {
        let mut index = FxHashMap::default();
        for (position, primitive) in primitives.iter().enumerate() {
            primitive.validate()?;
            if index.insert(primitive.name.clone(), position).is_some() {
                return Err(CatalogError::Duplicate(primitive.name.clone()));
            }
        }
        Ok(Self { primitives, index })
    }

    /// The `papi_*` plugin primitives plus the generic `wait_op`
    pub fn builtin() -> Self {
        let waiting_for = || WaitHandle::Parameter("waiting_for".to_string());
        let mut primitives = vec![Primitive::new(
            "papi_sleep",
            1,
            waiting_for(),
            None,
            Some("papi_wait_handler_add_wait_for_timeout({handle}, {0})"),
            "papi_wait_handler_is_waiting_for_timeout(0, {handle})",
        )];

        for (channel, start) in [
            ("spi_send", "papi_start_sending_spi_command_16"),
            ("i2c_send", "papi_start_sending_i2c_command_16"),
            ("spi_receive", "papi_start_receiving_spi_data_16"),
            ("i2c_receive", "papi_start_receiving_i2c_data_16"),
        ] {
            primitives.push(Primitive {
                name: format!("papi_wait_for_{}", channel),
                min_args: 1,
                wait_handle: waiting_for(),
                start: Some(start.to_string()),
                register: Some(format!("papi_wait_handler_add_wait_for_{}({{handle}}, {{0}})", channel)),
                pending: format!("papi_wait_handler_is_waiting_for_{}({{handle}}, {{0}})", channel),
            });
        }

        primitives.push(Primitive::new(
            "wait_op",
            2,
            WaitHandle::Argument(0),
            Some("wait_op_start"),
            None,
            "wait_op_pending({handle})",
        ));

        let index = primitives
            .iter()
            .enumerate()
            .map(|(position, primitive)| (primitive.name.clone(), position))
            .collect();
        Self { primitives, index }
    }

    pub fn from_toml_str(content: &str) -> Result<Self, CatalogError> {
        let raw: RawCatalog = toml::from_str(content)?;
        Self::new(raw.primitives)
    }

    pub fn load(path: &Path) -> Result<Self, CatalogError> {
        let content = fs::read_to_string(path).map_err(|error| CatalogError::Io {
            path: path.to_path_buf(),
            error,
        })?;
        Self::from_toml_str(&content)
    }

    pub fn lookup(&self, name: &str) -> Option<&Primitive> {
        self.index.get(name).map(|&position| &self.primitives[position])
    }

    pub fn contains(&self, name: &str) -> bool {
        self.index.contains_key(name)
    }

    pub fn primitives(&self) -> &[Primitive] {
        &self.primitives
    }
}

impl Default for Catalog {
    fn default() -> Self {
        Self::builtin()
    }
}

/// Placeholders of a template in order of appearance; malformed ones are skipped
pub fn placeholders(template: &str) -> Vec<Placeholder> {
    let mut found = Vec::new();
    let mut rest = template;
    while let Some(open) = rest.find('{') {
        let after = &rest[open + 1..];
        let Some(close) = after.find('}') else {
            break;
        };
        if let Some(placeholder) = parse_placeholder(&after[..close]) {
            found.push(placeholder);
        }
        rest = &after[close + 1..];
    }
    found
}

fn parse_placeholder(name: &str) -> Option<Placeholder> {
    if name == "handle" {
        Some(Placeholder::Handle)
    } else {
        name.parse().ok().map(Placeholder::Argument)
    }
}

fn check_template(template: &str, min_args: usize) -> Result<(), String> {
    let mut rest = template;
    while let Some(open) = rest.find('{') {
        let after = &rest[open + 1..];
        let close = after
            .find('}')
            .ok_or_else(|| format!("unterminated placeholder in `{}`", template))?;
        match parse_placeholder(&after[..close]) {
            Some(Placeholder::Argument(index)) if index >= min_args => {
                return Err(format!(
                    "placeholder {{{}}} is not covered by min_args = {}",
                    index, min_args
                ))
            }
            Some(_) => {}
            None => return Err(format!("unknown placeholder {{{}}}", &after[..close])),
        }
        rest = &after[close + 1..];
    }
    Ok(())
}

/// Substitute the handle and argument texts into a validated template
pub fn render_template(template: &str, handle: &str, args: &[String]) -> String {
    let mut out = String::with_capacity(template.len());
    let mut rest = template;
    while let Some(open) = rest.find('{') {
        out.push_str(&rest[..open]);
        let after = &rest[open + 1..];
        let Some(close) = after.find('}') else {
            out.push_str(&rest[open..]);
            return out;
        };
        match parse_placeholder(&after[..close]) {
            Some(Placeholder::Handle) => out.push_str(handle),
            Some(Placeholder::Argument(index)) if index < args.len() => out.push_str(&args[index]),
            _ => out.push_str(&rest[open..open + close + 2]),
        }
        rest = &after[close + 1..];
    }
    out.push_str(rest);
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_builtin_lookup() {
        let catalog = Catalog::builtin();
        let sleep = catalog.lookup("papi_sleep").unwrap();
        assert_eq!(sleep.start, None);
        assert_eq!(sleep.wait_handle, WaitHandle::Parameter("waiting_for".to_string()));

        let send = catalog.lookup("papi_wait_for_spi_send").unwrap();
        assert_eq!(send.start.as_deref(), Some("papi_start_sending_spi_command_16"));
        assert!(catalog.contains("wait_op"));
        assert!(!catalog.contains("printf"));
    }

    #[test]
    fn test_load_from_toml() {
        let content = r#"
            [[primitive]]
            name = "uart_read"
            min_args = 2
            wait_handle = 0
            start = "uart_start_read"
            register = "uart_register({handle}, {1})"
            pending = "uart_busy({handle})"

            [[primitive]]
            name = "delay"
            min_args = 1
            wait_handle = "timer_ctx"
            pending = "timer_running({handle}, {0})"
        "#;
        let catalog = Catalog::from_toml_str(content).unwrap();
        assert_eq!(catalog.primitives().len(), 2);
        assert_eq!(catalog.lookup("uart_read").unwrap().wait_handle, WaitHandle::Argument(0));
        assert_eq!(
            catalog.lookup("delay").unwrap().wait_handle,
            WaitHandle::Parameter("timer_ctx".to_string())
        );
        assert_eq!(catalog.lookup("delay").unwrap().start, None);
    }

    #[test]
    fn test_rejects_uncovered_placeholder() {
        let content = r#"
            [[primitive]]
            name = "op"
            min_args = 1
            wait_handle = 0
            pending = "busy({2})"
        "#;
        assert!(matches!(
            Catalog::from_toml_str(content),
            Err(CatalogError::Template { .. })
        ));
    }

    #[test]
    fn test_rejects_duplicates() {
        let entry = Primitive::new("op", 1, WaitHandle::Argument(0), None, None, "busy({handle})");
        assert!(matches!(
            Catalog::new(vec![entry.clone(), entry]),
            Err(CatalogError::Duplicate(name)) if name == "op"
        ));
    }

    #[test]
    fn test_render_template() {
        let args = vec!["pc->spi_id".to_string(), "0x08".to_string()];
        assert_eq!(
            render_template("papi_wait_handler_add_wait_for_spi_send({handle}, {0})", "wf", &args),
            "papi_wait_handler_add_wait_for_spi_send(wf, pc->spi_id)"
        );
        assert_eq!(render_template("f({1}, {handle})", "h", &args), "f(0x08, h)");
    }

    #[test]
    fn test_pending_arguments() {
        let catalog = Catalog::builtin();
        assert_eq!(catalog.lookup("wait_op").unwrap().pending_arguments(), vec![0]);
        assert_eq!(
            catalog.lookup("papi_wait_for_i2c_receive").unwrap().pending_arguments(),
            vec![0]
        );
        assert!(catalog.lookup("papi_sleep").unwrap().pending_arguments().is_empty());
    }
}
