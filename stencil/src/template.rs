//! Compiled templates and the engine registry

use crate::compiler::FragmentCompiler;
use crate::config::TemplateConfig;
use crate::error::{CompileError, RenderError, TemplateSource};
use crate::expr::TypeStack;
use crate::fragment::Fragment;
use crate::parser::Parser;
use crate::runtime::CallStack;
use crate::types::ObjectType;
use crate::value::Value;
use std::collections::HashMap;
use std::sync::Arc;

/// A compiled template ready for rendering
///
/// Compiled once, then rendered any number of times, from any number of
/// threads at once.
#[derive(Debug, Clone)]
pub struct Template {
    source: TemplateSource,
    context_type: Arc<ObjectType>,
    root: Fragment,
}

/// Compile a template with the default config.
pub fn compile(
    name: &str,
    text: &str,
    context_type: Arc<ObjectType>,
) -> Result<Template, CompileError> {
    compile_with(name, text, context_type, &TemplateConfig::default())
}

/// Compile a template: parse the markup, then type-check and lower it
/// against `context_type`.
pub fn compile_with(
    name: &str,
    text: &str,
    context_type: Arc<ObjectType>,
    config: &TemplateConfig,
) -> Result<Template, CompileError> {
    tracing::debug!(template = name, context_type = context_type.name(), "compiling template");

    let source = TemplateSource::new(name, text);
    let document = Parser::new(&source, config).parse()?;
    let types = TypeStack::new(context_type.clone());
    let root = FragmentCompiler::new(&source, config, &document, types).compile()?;

    tracing::debug!(template = name, "compiled template");
    Ok(Template {
        source,
        context_type,
        root,
    })
}

impl Template {
    pub fn name(&self) -> &str {
        self.source.name()
    }

    pub fn source(&self) -> &str {
        self.source.text()
    }

    /// The declared type of the context object
    pub fn context_type(&self) -> &Arc<ObjectType> {
        &self.context_type
    }

    /// The compiled fragment tree
    pub fn fragment(&self) -> &Fragment {
        &self.root
    }

    /// Render with `context` as the root object.
    pub fn render(&self, context: &Value) -> Result<String, RenderError> {
        let mut out = String::new();
        self.render_to(&mut out, context)?;
        Ok(out)
    }

    /// Render, appending to `out`. On error `out` may hold partial output.
    pub fn render_to(&self, out: &mut String, context: &Value) -> Result<(), RenderError> {
        let mut stack = CallStack::new(self.source.name(), context);
        self.root.render(out, &mut stack)
    }
}

/// A registry of compiled templates, keyed by name
///
/// Every template is compiled when it is added, so a broken template is
/// reported at startup instead of on first request.
#[derive(Debug, Clone, Default)]
pub struct Engine {
    config: TemplateConfig,
    templates: HashMap<String, Template>,
}

impl Engine {
    pub fn new() -> Self {
        Self::default()
    }

    /// Create an engine that compiles every template with `config`.
    pub fn with_config(config: TemplateConfig) -> Self {
        Self {
            config,
            templates: HashMap::new(),
        }
    }

    pub fn config(&self) -> &TemplateConfig {
        &self.config
    }

    /// Compile and register a template, replacing any previous template of
    /// the same name. On error the registry is left unchanged.
    pub fn add(
        &mut self,
        name: impl Into<String>,
        text: &str,
        context_type: Arc<ObjectType>,
    ) -> Result<(), CompileError> {
        let name = name.into();
        let template = compile_with(&name, text, context_type, &self.config)?;
        tracing::debug!(template = %name, "registered template");
        self.templates.insert(name, template);
        Ok(())
    }

    pub fn get(&self, name: &str) -> Option<&Template> {
        self.templates.get(name)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.templates.contains_key(name)
    }

    /// Names of all registered templates, in no particular order
    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.templates.keys().map(String::as_str)
    }

    /// Render a registered template to bytes.
    pub fn render(&self, name: &str, context: &Value) -> Result<Vec<u8>, RenderError> {
        let template = self.get(name).ok_or_else(|| RenderError::NotFound {
            name: name.to_string(),
        })?;
        template.render(context).map(String::into_bytes)
    }
}
