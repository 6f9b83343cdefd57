//! Site entry page templates.
//!
//! The site's `index.html` is produced by a [`SiteTemplate`]. The built-in
//! [`DocsifyTemplate`] is always available; `site.template` may instead name
//! another registered template or point to a minijinja template file that
//! receives the [`DocsifyOptions`] as `options`. A template that cannot be
//! loaded or rendered falls back to the built-in one.

use std::collections::BTreeMap;
use std::fmt::Write;
use std::fs;
use std::path::{Path, PathBuf};

use minijinja::{Environment, UndefinedBehavior, Value};
use serde::Serialize;

/// Name of the built-in template.
pub const DOCSIFY_TEMPLATE: &str = "docsify";

/// Error produced while loading or rendering a site template.
#[derive(Debug, thiserror::Error)]
pub enum TemplateError {
    #[error("failed to load template {}: {source}", path.display())]
    Load {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("invalid template {name}: {message}")]
    Invalid { name: String, message: String },
}

/// Settings handed to the docsify runtime (`window.$docsify`).
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DocsifyOptions {
    pub name: String,
    pub repo: String,
    pub load_sidebar: bool,
    pub auto2top: bool,
    /// Page shown at `/`, relative to the site root.
    pub homepage: String,
    pub stylesheet: String,
    pub support_search: bool,
}

/// Renders the site's `index.html`.
pub trait SiteTemplate {
    fn render(&self, options: &DocsifyOptions) -> Result<String, TemplateError>;
}

/// Built-in docsify page with Mermaid, zoom and (optionally) search plugins.
#[derive(Debug, Default, Clone, Copy)]
pub struct DocsifyTemplate;

impl SiteTemplate for DocsifyTemplate {
    fn render(&self, options: &DocsifyOptions) -> Result<String, TemplateError> {
        let json = serde_json::to_string_pretty(options).map_err(|e| TemplateError::Invalid {
            name: DOCSIFY_TEMPLATE.to_owned(),
            message: e.to_string(),
        })?;
        // Keep the inline script from being closed by a value.
        let json = json.replace("</", "<\\/");

        let mut html = String::with_capacity(2048);
        html.push_str("<!DOCTYPE html>\n<html lang=\"en\">\n\n<head>\n");
        html.push_str("    <meta charset=\"UTF-8\">\n");
        let _ = writeln!(html, "    <title>{}</title>", escape(&options.name));
        html.push_str("    <meta http-equiv=\"X-UA-Compatible\" content=\"IE=edge,chrome=1\" />\n");
        html.push_str("    <meta name=\"description\" content=\"Description\">\n");
        html.push_str(
            "    <meta name=\"viewport\" content=\"width=device-width, user-scalable=no, \
             initial-scale=1.0, maximum-scale=1.0, minimum-scale=1.0\">\n",
        );
        let _ = writeln!(
            html,
            "    <link rel=\"stylesheet\" href=\"{}\">",
            escape(&options.stylesheet)
        );
        html.push_str("</head>\n\n<body>\n");
        html.push_str("    <div id=\"app\"></div>\n");
        let _ = writeln!(html, "    <script>\n    window.$docsify = {json};\n    </script>");
        html.push_str("    <script src=\"//unpkg.com/docsify/lib/docsify.min.js\"></script>\n");
        html.push_str("    <script type=\"module\">\n");
        html.push_str(
            "        import mermaid from \"https://cdn.jsdelivr.net/npm/mermaid@10/dist/mermaid.esm.min.mjs\";\n",
        );
        html.push_str("        mermaid.initialize({ startOnLoad: true });\n");
        html.push_str("        window.mermaid = mermaid;\n");
        html.push_str("    </script>\n");
        html.push_str(
            "    <script src=\"//unpkg.com/docsify-mermaid@2.0.1/dist/docsify-mermaid.js\"></script>\n",
        );
        html.push_str(
            "    <script src=\"//cdn.jsdelivr.net/npm/docsify/lib/plugins/zoom-image.min.js\"></script>\n",
        );
        if options.support_search {
            html.push_str(
                "    <script src=\"//cdn.jsdelivr.net/npm/docsify/lib/plugins/search.min.js\"></script>\n",
            );
        }
        html.push_str("</body>\n\n</html>\n");
        Ok(html)
    }
}

/// Template read from a minijinja file.
///
/// Undefined variables are errors, so a template expecting values other
/// than `options` fails to render instead of producing a broken page.
#[derive(Debug)]
pub struct FileTemplate {
    name: String,
    source: String,
}

impl FileTemplate {
    /// Read and compile the template at `path`.
    pub fn load(path: &Path) -> Result<Self, TemplateError> {
        let source = fs::read_to_string(path).map_err(|source| TemplateError::Load {
            path: path.to_path_buf(),
            source,
        })?;
        let template = Self {
            name: path.display().to_string(),
            source,
        };
        template
            .environment()
            .template_from_str(&template.source)
            .map_err(|e| template.invalid(&e))?;
        Ok(template)
    }

    fn environment(&self) -> Environment<'static> {
        let mut env = Environment::new();
        env.set_undefined_behavior(UndefinedBehavior::Strict);
        env
    }

    fn invalid(&self, error: &minijinja::Error) -> TemplateError {
        TemplateError::Invalid {
            name: self.name.clone(),
            message: error.to_string(),
        }
    }
}

impl SiteTemplate for FileTemplate {
    fn render(&self, options: &DocsifyOptions) -> Result<String, TemplateError> {
        self.environment()
            .render_str(
                &self.source,
                minijinja::context! { options => Value::from_serialize(options) },
            )
            .map_err(|e| self.invalid(&e))
    }
}

/// Named site templates with the built-in docsify template as fallback.
pub struct TemplateRegistry {
    templates: BTreeMap<String, Box<dyn SiteTemplate>>,
}

impl Default for TemplateRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl TemplateRegistry {
    /// Registry holding the built-in `docsify` template.
    #[must_use]
    pub fn new() -> Self {
        let mut registry = Self {
            templates: BTreeMap::new(),
        };
        registry.register(DOCSIFY_TEMPLATE, Box::new(DocsifyTemplate));
        registry
    }

    /// Register (or replace) a template under `name`.
    pub fn register(&mut self, name: impl Into<String>, template: Box<dyn SiteTemplate>) {
        self.templates.insert(name.into(), template);
    }

    /// Whether a template is registered under `name`.
    #[must_use]
    pub fn contains(&self, name: &str) -> bool {
        self.templates.contains_key(name)
    }

    /// Render with the template selected by `selection`.
    ///
    /// `selection` is a registered name or a template file path, relative
    /// paths being resolved against `base_dir`. Falls back to the built-in
    /// template when the selection cannot be loaded or rendered.
    pub fn render(
        &self,
        selection: &str,
        base_dir: &Path,
        options: &DocsifyOptions,
    ) -> Result<String, TemplateError> {
        let rendered = if let Some(template) = self.templates.get(selection) {
            template.render(options)
        } else {
            let path = base_dir.join(selection);
            match FileTemplate::load(&path) {
                Ok(template) => template.render(options),
                Err(e @ TemplateError::Load { .. }) => {
                    tracing::error!(path = %path.display(), error = %e, "Site template failed to load; using the built-in template");
                    return DocsifyTemplate.render(options);
                }
                Err(e) => Err(e),
            }
        };

        match rendered {
            Ok(html) => Ok(html),
            Err(e) => {
                tracing::warn!(template = selection, error = %e, "Site template is invalid; using the built-in template");
                DocsifyTemplate.render(options)
            }
        }
    }
}

/// Escape HTML special characters.
fn escape(s: &str) -> String {
    s.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('"', "&quot;")
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn options(search: bool) -> DocsifyOptions {
        DocsifyOptions {
            name: "Demo Project".to_owned(),
            repo: "acme/demo".to_owned(),
            load_sidebar: true,
            auto2top: true,
            homepage: "Overview.md".to_owned(),
            stylesheet: "//unpkg.com/docsify/lib/themes/vue.css".to_owned(),
            support_search: search,
        }
    }

    struct Failing;

    impl SiteTemplate for Failing {
        fn render(&self, _options: &DocsifyOptions) -> Result<String, TemplateError> {
            Err(TemplateError::Invalid {
                name: "failing".to_owned(),
                message: "boom".to_owned(),
            })
        }
    }

    #[test]
    fn test_options_serialize_camel_case() {
        let json: serde_json::Value = serde_json::to_value(options(true)).unwrap();

        assert_eq!(
            json,
            serde_json::json!({
                "name": "Demo Project",
                "repo": "acme/demo",
                "loadSidebar": true,
                "auto2top": true,
                "homepage": "Overview.md",
                "stylesheet": "//unpkg.com/docsify/lib/themes/vue.css",
                "supportSearch": true,
            })
        );
    }

    #[test]
    fn test_docsify_template_contents() {
        let html = DocsifyTemplate.render(&options(true)).unwrap();

        assert!(html.contains("<title>Demo Project</title>"));
        assert!(html.contains("<link rel=\"stylesheet\" href=\"//unpkg.com/docsify/lib/themes/vue.css\">"));
        assert!(html.contains("\"loadSidebar\": true"));
        assert!(html.contains("docsify-mermaid@2.0.1"));
        assert!(html.contains("mermaid.initialize({ startOnLoad: true });"));
        assert!(html.contains("plugins/search.min.js"));
    }

    #[test]
    fn test_docsify_template_without_search() {
        let html = DocsifyTemplate.render(&options(false)).unwrap();
        assert!(!html.contains("search.min.js"));
        assert!(html.contains("zoom-image.min.js"));
    }

    #[test]
    fn test_docsify_template_escapes_values() {
        let mut opts = options(false);
        opts.name = "A & B</script>".to_owned();

        let html = DocsifyTemplate.render(&opts).unwrap();

        assert!(html.contains("<title>A &amp; B&lt;/script&gt;</title>"));
        assert!(html.contains("\"name\": \"A & B<\\/script>\""));
    }

    #[test]
    fn test_registry_renders_registered_template() {
        let registry = TemplateRegistry::new();
        let html = registry
            .render("docsify", Path::new("."), &options(false))
            .unwrap();
        assert_eq!(html, DocsifyTemplate.render(&options(false)).unwrap());
    }

    #[test]
    fn test_registry_renders_file_template() {
        let tmp = tempfile::tempdir().unwrap();
        fs::write(
            tmp.path().join("site.html.j2"),
            "<h1>{{ options.name }}</h1>{% if options.supportSearch %}search{% endif %}",
        )
        .unwrap();
        let registry = TemplateRegistry::new();

        let html = registry
            .render("site.html.j2", tmp.path(), &options(true))
            .unwrap();

        assert_eq!(html, "<h1>Demo Project</h1>search");
    }

    #[test]
    fn test_registry_falls_back_when_file_is_missing() {
        let tmp = tempfile::tempdir().unwrap();
        let registry = TemplateRegistry::new();

        let html = registry
            .render("missing.html", tmp.path(), &options(false))
            .unwrap();

        assert_eq!(html, DocsifyTemplate.render(&options(false)).unwrap());
    }

    #[test]
    fn test_registry_falls_back_on_undefined_variable() {
        let tmp = tempfile::tempdir().unwrap();
        fs::write(tmp.path().join("site.html"), "{{ site_title }}").unwrap();
        let registry = TemplateRegistry::new();

        let html = registry
            .render("site.html", tmp.path(), &options(false))
            .unwrap();

        assert_eq!(html, DocsifyTemplate.render(&options(false)).unwrap());
    }

    #[test]
    fn test_registry_falls_back_on_syntax_error() {
        let tmp = tempfile::tempdir().unwrap();
        fs::write(tmp.path().join("site.html"), "{% if %}").unwrap();

        assert!(matches!(
            FileTemplate::load(&tmp.path().join("site.html")),
            Err(TemplateError::Invalid { .. })
        ));
        let html = TemplateRegistry::new()
            .render("site.html", tmp.path(), &options(false))
            .unwrap();
        assert!(html.contains("window.$docsify"));
    }

    #[test]
    fn test_registry_falls_back_when_registered_template_fails() {
        let mut registry = TemplateRegistry::new();
        registry.register("failing", Box::new(Failing));
        assert!(registry.contains("failing"));

        let html = registry
            .render("failing", Path::new("."), &options(false))
            .unwrap();

        assert!(html.contains("window.$docsify"));
    }
}
