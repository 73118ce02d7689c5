//! # Stub Rendering
//!
//! Generated source is laid out by handlebars stubs. A [`StubRenderer`]
//! owns its compiled stubs; there is no process-wide template cache, so
//! two renderers with different overrides never interfere.
//!
//! Built-in stubs:
//!
//! - `declaration`: one struct with its `impl` block.
//! - `file`: the module header, imports, and rendered declarations.
//!
//! Helpers available to every stub: `doc` (render text as doc-comment
//! lines, with optional `indent` and `marker` hash arguments), `pascal`,
//! `snake`, and `plural` (`{{plural "type" count}}`).

use handlebars::Handlebars;
use serde_json::Value;

use crate::error::GenerationError;
use crate::naming::{pluralize, to_pascal_case, to_snake_case};

pub const DECLARATION_STUB: &str = "declaration";
pub const FILE_STUB: &str = "file";

const BUILTIN_STUBS: &[(&str, &str)] = &[
    (DECLARATION_STUB, include_str!("stubs/declaration.hbs")),
    (FILE_STUB, include_str!("stubs/file.hbs")),
];

/// Compiled stubs plus the helpers they use.
pub struct StubRenderer {
    handlebars: Handlebars<'static>,
}

impl StubRenderer {
    /// A renderer with the built-in stubs.
    ///
    /// # Errors
    ///
    /// [`GenerationError::Render`] if a built-in stub fails to compile.
    pub fn new() -> Result<Self, GenerationError> {
        let mut handlebars = Handlebars::new();
        handlebars.register_escape_fn(handlebars::no_escape);

        handlebars.register_helper("doc", Box::new(doc_helper));
        handlebars.register_helper("pascal", Box::new(pascal_helper));
        handlebars.register_helper("snake", Box::new(snake_helper));
        handlebars.register_helper("plural", Box::new(plural_helper));

        let mut renderer = Self { handlebars };
        for (name, source) in BUILTIN_STUBS {
            renderer.register_stub(name, source)?;
        }
        Ok(renderer)
    }

    /// Compile `source` under `name`, replacing any stub of that name.
    ///
    /// # Errors
    ///
    /// [`GenerationError::Render`] if the source does not compile.
    pub fn register_stub(&mut self, name: &str, source: &str) -> Result<(), GenerationError> {
        self.handlebars
            .register_template_string(name, source)
            .map_err(|e| GenerationError::Render(format!("stub '{name}': {e}")))?;
        tracing::debug!(stub = name, "registered stub");
        Ok(())
    }

    pub fn has_stub(&self, name: &str) -> bool {
        self.handlebars.has_template(name)
    }

    /// Render the stub `name` with `data`.
    ///
    /// # Errors
    ///
    /// [`GenerationError::Render`] if the stub is unknown or rendering fails.
    pub fn render(&self, name: &str, data: &Value) -> Result<String, GenerationError> {
        self.handlebars
            .render(name, data)
            .map_err(|e| GenerationError::Render(format!("stub '{name}': {e}")))
    }
}

impl std::fmt::Debug for StubRenderer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let mut stubs: Vec<&String> = self.handlebars.get_templates().keys().collect();
        stubs.sort();
        f.debug_struct("StubRenderer").field("stubs", &stubs).finish()
    }
}

/// Render text as comment lines: `{{doc text indent="    " marker="///"}}`.
/// Every line ends in a newline; absent or empty text renders nothing.
fn doc_helper(
    h: &handlebars::Helper,
    _: &Handlebars,
    _: &handlebars::Context,
    _: &mut handlebars::RenderContext,
    out: &mut dyn handlebars::Output,
) -> handlebars::HelperResult {
    let text = h.param(0).and_then(|v| v.value().as_str()).unwrap_or("");
    let indent = h.hash_get("indent").and_then(|v| v.value().as_str()).unwrap_or("");
    let marker = h.hash_get("marker").and_then(|v| v.value().as_str()).unwrap_or("///");
    if text.trim().is_empty() {
        return Ok(());
    }
    for line in text.trim_end().lines() {
        let line = line.trim_end();
        if line.is_empty() {
            out.write(&format!("{indent}{marker}\n"))?;
        } else {
            out.write(&format!("{indent}{marker} {line}\n"))?;
        }
    }
    Ok(())
}

fn pascal_helper(
    h: &handlebars::Helper,
    _: &Handlebars,
    _: &handlebars::Context,
    _: &mut handlebars::RenderContext,
    out: &mut dyn handlebars::Output,
) -> handlebars::HelperResult {
    let param = h.param(0).and_then(|v| v.value().as_str()).unwrap_or("");
    out.write(&to_pascal_case(param))?;
    Ok(())
}

fn snake_helper(
    h: &handlebars::Helper,
    _: &Handlebars,
    _: &handlebars::Context,
    _: &mut handlebars::RenderContext,
    out: &mut dyn handlebars::Output,
) -> handlebars::HelperResult {
    let param = h.param(0).and_then(|v| v.value().as_str()).unwrap_or("");
    out.write(&to_snake_case(param))?;
    Ok(())
}

/// `{{plural word count}}`: the word as is when count is 1.
fn plural_helper(
    h: &handlebars::Helper,
    _: &Handlebars,
    _: &handlebars::Context,
    _: &mut handlebars::RenderContext,
    out: &mut dyn handlebars::Output,
) -> handlebars::HelperResult {
    let word = h.param(0).and_then(|v| v.value().as_str()).unwrap_or("");
    let count = h.param(1).and_then(|v| v.value().as_u64());
    if count == Some(1) {
        out.write(word)?;
    } else {
        out.write(&pluralize(word))?;
    }
    Ok(())
}
