//! Compile-time options

/// Output-escaping policy for interpolated values.
///
/// Static template text is never escaped regardless of the policy.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Escape {
    /// HTML-escape `&`, `<`, `>`, `"` and `'` in interpolated values.
    #[default]
    Html,
    /// Write interpolated values verbatim.
    Disabled,
}

/// Options applied when compiling a template.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TemplateConfig {
    /// Attribute-name prefix that marks a dynamic attribute (`c:` by default).
    pub dynamic_prefix: String,
    /// Reject templates that reach end of input with elements still open.
    ///
    /// Off by default: templates may omit trailing closing tags.
    pub strict_end_tags: bool,
    /// Drop `<!-- -->` comments from the output.
    pub strip_comments: bool,
    /// Escaping applied to `#{}` interpolation, `c:text` and dynamic attributes.
    pub escape: Escape,
}

impl Default for TemplateConfig {
    fn default() -> Self {
        Self {
            dynamic_prefix: "c:".to_string(),
            strict_end_tags: false,
            strip_comments: false,
            escape: Escape::Html,
        }
    }
}

impl TemplateConfig {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_dynamic_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.dynamic_prefix = prefix.into();
        self
    }

    pub fn with_strict_end_tags(mut self, strict: bool) -> Self {
        self.strict_end_tags = strict;
        self
    }

    pub fn with_strip_comments(mut self, strip: bool) -> Self {
        self.strip_comments = strip;
        self
    }

    pub fn with_escape(mut self, escape: Escape) -> Self {
        self.escape = escape;
        self
    }

    /// The directive name of a dynamic attribute (`c:for` -> `for`), if it is one.
    pub(crate) fn directive<'a>(&self, attribute: &'a str) -> Option<&'a str> {
        attribute
            .strip_prefix(self.dynamic_prefix.as_str())
            .filter(|rest| !rest.is_empty())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn directive_strips_prefix() {
        let config = TemplateConfig::default();
        assert_eq!(config.directive("c:for"), Some("for"));
        assert_eq!(config.directive("c:"), None);
        assert_eq!(config.directive("class"), None);

        let config = config.with_dynamic_prefix("data-t-");
        assert_eq!(config.directive("data-t-text"), Some("text"));
        assert_eq!(config.directive("c:text"), None);
    }
}
