//! Docsify site output.
//!
//! Layout of the destination folder:
//!
//! ```text
//! index.html              docsify entry page (site template)
//! .nojekyll               keeps GitHub Pages from ignoring `_sidebar.md`
//! _sidebar.md             navigation
//! Overview.md             root directory page (homepage)
//! backend/backend.md      one page per directory
//! backend/api/api.md
//! ```
//!
//! Directories whose sources are unchanged since the last build are skipped.
//! Shared files are only rewritten when their contents differ, so a rebuild
//! without source changes leaves the destination untouched.

use std::fs;
use std::path::{Path, PathBuf};

use c4b_cache::{ContentCache, FileContentCache, NullContentCache};
use c4b_config::Config;
use c4b_diagrams::DiagramRenderer;
use c4b_markdown::{MarkdownTransformer, OutputTarget, TransformConfig, encode_uri};
use c4b_tree::{SourceTree, TreeNode};

use crate::document::{node_content, slash_path};
use crate::template::{DocsifyOptions, TemplateRegistry};
use crate::{BuildError, BuildReport, OutputAssembler, write_if_changed};

/// Writes a docsify site, reusing pages of unchanged directories.
pub struct SiteAssembler<'r> {
    renderer: &'r dyn DiagramRenderer,
    templates: TemplateRegistry,
    clean: bool,
}

impl<'r> SiteAssembler<'r> {
    #[must_use]
    pub fn new(renderer: &'r dyn DiagramRenderer) -> Self {
        Self {
            renderer,
            templates: TemplateRegistry::new(),
            clean: false,
        }
    }

    /// Use `templates` to resolve `site.template`.
    #[must_use]
    pub fn with_templates(mut self, templates: TemplateRegistry) -> Self {
        self.templates = templates;
        self
    }

    /// Treat every directory as changed.
    ///
    /// Hashes are still recorded, so the next incremental build starts from
    /// this one.
    #[must_use]
    pub fn clean(mut self, clean: bool) -> Self {
        self.clean = clean;
        self
    }

    fn write_index(&self, config: &Config, dist: &Path) -> Result<PathBuf, BuildError> {
        let options = DocsifyOptions {
            name: config.project.name.clone(),
            repo: config.project.repo_name.clone(),
            load_sidebar: true,
            auto2top: true,
            homepage: format!("{}.md", config.project.homepage_name),
            stylesheet: config.site.theme.clone(),
            support_search: config.site.search,
        };
        let html = self.templates.render(
            &config.site.template,
            &config.paths_resolved.project_dir,
            &options,
        )?;

        let path = dist.join("index.html");
        write_if_changed(&path, &html)?;
        Ok(path)
    }
}

impl OutputAssembler for SiteAssembler<'_> {
    fn kind(&self) -> &'static str {
        "site"
    }

    fn assemble(&mut self, tree: &SourceTree, config: &Config) -> Result<BuildReport, BuildError> {
        let dist = &config.paths_resolved.dist_folder;
        if config.markdown.embed_mermaid_diagrams {
            tracing::debug!("Diagram embedding is not used for sites; rendering diagrams to SVG");
        }
        let transform_config = TransformConfig {
            root_folder: config.paths_resolved.root_folder.clone(),
            dist_folder: dist.clone(),
            embed_mermaid_diagrams: false,
            target: OutputTarget::Site,
        };
        let transformer = MarkdownTransformer::new(self.renderer);

        let mut cache = FileContentCache::open(config.cache_path());
        let fresh = self.clean || !config.site.cache_enabled;
        let mut report = BuildReport::default();

        for node in tree.root_first() {
            let page = page_path(dist, node);
            let changed = if fresh {
                node_changed(&NullContentCache, node)
            } else {
                node_changed(&cache, node)
            };

            if !changed && page.exists() {
                tracing::debug!(dir = %node.dir.display(), "Unchanged, skipping");
                report.skipped += 1;
                report.outputs.push(page);
                continue;
            }

            if let Some(dir) = page.parent() {
                fs::create_dir_all(dir)?;
            }
            let content = node_content(node, &transformer, &transform_config, &mut report.warnings);
            let text = if content.is_empty() {
                format!("# {}\n", node.name)
            } else {
                format!("# {}\n\n{content}\n", node.name)
            };
            write_if_changed(&page, &text)?;
            tracing::debug!(path = %page.display(), "Wrote page");

            for source in node.source_paths() {
                cache.mark_processed(&source);
            }
            report.outputs.push(page);
        }

        let sidebar = dist.join("_sidebar.md");
        write_if_changed(&sidebar, &sidebar_markdown(tree))?;
        report.outputs.push(sidebar);

        report.outputs.push(self.write_index(config, dist)?);

        let nojekyll = dist.join(".nojekyll");
        write_if_changed(&nojekyll, "")?;
        report.outputs.push(nojekyll);

        cache.persist();
        tracing::info!(
            pages = tree.len(),
            skipped = report.skipped,
            dist = %dist.display(),
            "Wrote site"
        );
        Ok(report)
    }
}

fn node_changed(cache: &dyn ContentCache, node: &TreeNode) -> bool {
    node.source_paths().any(|path| cache.has_changed(&path))
}

/// `<dist>/<rel>/<name>.md`
fn page_path(dist: &Path, node: &TreeNode) -> PathBuf {
    dist.join(&node.rel_dir).join(format!("{}.md", node.name))
}

/// Site-relative page URL, percent-encoded.
fn page_url(node: &TreeNode) -> String {
    let rel = slash_path(&node.rel_dir);
    if rel.is_empty() {
        encode_uri(&format!("{}.md", node.name))
    } else {
        encode_uri(&format!("{rel}/{}.md", node.name))
    }
}

fn sidebar_markdown(tree: &SourceTree) -> String {
    let mut out = String::new();
    for node in tree.root_first() {
        out.push_str(&"    ".repeat(node.level));
        out.push_str(&format!("* [{}]({})\n", node.name, page_url(node)));
    }
    out
}

#[cfg(test)]
mod tests {
    use std::collections::BTreeMap;
    use std::time::SystemTime;

    use super::*;
    use crate::run;
    use crate::template::{SiteTemplate, TemplateError};
    use crate::test_support::{FakeRenderer, project};
    use pretty_assertions::assert_eq;

    type Snapshot = BTreeMap<PathBuf, (Vec<u8>, SystemTime)>;

    fn snapshot(dir: &Path) -> Snapshot {
        let mut files = Snapshot::new();
        let mut pending = vec![dir.to_path_buf()];
        while let Some(current) = pending.pop() {
            for entry in fs::read_dir(&current).unwrap() {
                let path = entry.unwrap().path();
                if path.is_dir() {
                    pending.push(path);
                } else {
                    let modified = fs::metadata(&path).unwrap().modified().unwrap();
                    files.insert(path.clone(), (fs::read(&path).unwrap(), modified));
                }
            }
        }
        files
    }

    #[test]
    fn test_site_layout() {
        let (tmp, config) = project();
        let renderer = FakeRenderer::default();

        let report = run(&mut SiteAssembler::new(&renderer), &config, false).unwrap();
        assert!(report.warnings.is_empty(), "{:?}", report.warnings);
        assert_eq!(report.skipped, 0);

        let docs = tmp.path().join("docs");
        assert_eq!(
            fs::read_to_string(docs.join("_sidebar.md")).unwrap(),
            "* [Overview](Overview.md)\n\
             \x20   * [backend](backend/backend.md)\n\
             \x20       * [api](backend/api/api.md)\n"
        );
        assert_eq!(
            fs::read_to_string(docs.join("Overview.md")).unwrap(),
            "# Overview\n\nWelcome.\n"
        );
        let api = fs::read_to_string(docs.join("backend/api/api.md")).unwrap();
        assert!(api.starts_with("# api\n\nThe API."));
        assert!(api.contains("](context.svg"));
        assert!(docs.join("backend/api/context.svg").exists());

        let index = fs::read_to_string(docs.join("index.html")).unwrap();
        assert!(index.contains("<title>Demo Project</title>"));
        assert!(index.contains("\"homepage\": \"Overview.md\""));
        assert_eq!(fs::read_to_string(docs.join(".nojekyll")).unwrap(), "");
    }

    #[test]
    fn test_site_ignores_embed_setting() {
        let (tmp, mut config) = project();
        config.markdown.embed_mermaid_diagrams = true;
        let renderer = FakeRenderer::default();

        run(&mut SiteAssembler::new(&renderer), &config, false).unwrap();

        assert_eq!(renderer.calls.borrow().len(), 1);
        let api = fs::read_to_string(tmp.path().join("docs/backend/api/api.md")).unwrap();
        assert!(!api.contains("graph TD"));
    }

    #[test]
    fn test_sidebar_encodes_names() {
        let tmp = tempfile::tempdir().unwrap();
        let src = tmp.path().join("src");
        fs::create_dir_all(src.join("Payment Service")).unwrap();
        fs::write(src.join("Payment Service/README.md"), "Pay.\n").unwrap();
        let mut config = c4b_config::Config::with_base(tmp.path());
        config.project.homepage_name = "Home Page".to_owned();
        let renderer = FakeRenderer::default();

        run(&mut SiteAssembler::new(&renderer), &config, false).unwrap();

        let docs = tmp.path().join("docs");
        assert_eq!(
            fs::read_to_string(docs.join("_sidebar.md")).unwrap(),
            "* [Home Page](Home%20Page.md)\n\
             \x20   * [Payment Service](Payment%20Service/Payment%20Service.md)\n"
        );
        assert!(docs.join("Payment Service/Payment Service.md").exists());
        assert!(docs.join("Home Page.md").exists());
    }

    #[test]
    fn test_second_build_without_changes_alters_nothing() {
        let (tmp, config) = project();
        let renderer = FakeRenderer::default();
        run(&mut SiteAssembler::new(&renderer), &config, false).unwrap();
        let docs = tmp.path().join("docs");
        let before = snapshot(&docs);

        let report = run(&mut SiteAssembler::new(&renderer), &config, false).unwrap();

        assert_eq!(report.skipped, 3);
        assert_eq!(renderer.calls.borrow().len(), 1);
        assert_eq!(snapshot(&docs), before);
    }

    #[test]
    fn test_changed_directory_is_rebuilt_alone() {
        let (tmp, config) = project();
        let renderer = FakeRenderer::default();
        run(&mut SiteAssembler::new(&renderer), &config, false).unwrap();

        fs::write(tmp.path().join("src/backend/README.md"), "Backend, revised.\n").unwrap();
        let report = run(&mut SiteAssembler::new(&renderer), &config, false).unwrap();

        assert_eq!(report.skipped, 2);
        assert_eq!(renderer.calls.borrow().len(), 1);
        assert_eq!(
            fs::read_to_string(tmp.path().join("docs/backend/backend.md")).unwrap(),
            "# backend\n\nBackend, revised.\n"
        );
    }

    #[test]
    fn test_changed_diagram_rebuilds_its_directory() {
        let (tmp, config) = project();
        let renderer = FakeRenderer::default();
        run(&mut SiteAssembler::new(&renderer), &config, false).unwrap();

        fs::write(tmp.path().join("src/backend/api/context.mmd"), "graph LR; X-->Y").unwrap();
        let report = run(&mut SiteAssembler::new(&renderer), &config, false).unwrap();

        assert_eq!(report.skipped, 2);
        assert_eq!(renderer.calls.borrow().len(), 2);
    }

    #[test]
    fn test_missing_page_is_rebuilt() {
        let (tmp, config) = project();
        let renderer = FakeRenderer::default();
        run(&mut SiteAssembler::new(&renderer), &config, false).unwrap();

        fs::remove_file(tmp.path().join("docs/Overview.md")).unwrap();
        let report = run(&mut SiteAssembler::new(&renderer), &config, false).unwrap();

        assert_eq!(report.skipped, 2);
        assert!(tmp.path().join("docs/Overview.md").exists());
    }

    #[test]
    fn test_clean_build_processes_everything_and_records_hashes() {
        let (_tmp, config) = project();
        let renderer = FakeRenderer::default();

        let report = run(&mut SiteAssembler::new(&renderer).clean(true), &config, false).unwrap();
        assert_eq!(report.skipped, 0);
        let report = run(&mut SiteAssembler::new(&renderer).clean(true), &config, false).unwrap();
        assert_eq!(report.skipped, 0);
        assert_eq!(renderer.calls.borrow().len(), 2);

        let report = run(&mut SiteAssembler::new(&renderer), &config, false).unwrap();
        assert_eq!(report.skipped, 3);
    }

    #[test]
    fn test_disabled_cache_processes_everything() {
        let (tmp, mut config) = project();
        config.site.cache_enabled = false;
        let renderer = FakeRenderer::default();

        run(&mut SiteAssembler::new(&renderer), &config, false).unwrap();
        let report = run(&mut SiteAssembler::new(&renderer), &config, false).unwrap();

        assert_eq!(report.skipped, 0);
        assert!(config.cache_path().exists());
        assert!(config.cache_path().starts_with(tmp.path()));
    }

    #[test]
    fn test_file_template_is_used() {
        let (tmp, mut config) = project();
        fs::write(tmp.path().join("site.j2"), "<h1>{{ options.name }}</h1>").unwrap();
        config.site.template = "site.j2".to_owned();
        let renderer = FakeRenderer::default();

        run(&mut SiteAssembler::new(&renderer), &config, false).unwrap();

        assert_eq!(
            fs::read_to_string(tmp.path().join("docs/index.html")).unwrap(),
            "<h1>Demo Project</h1>"
        );
    }

    struct Minimal;

    impl SiteTemplate for Minimal {
        fn render(&self, options: &DocsifyOptions) -> Result<String, TemplateError> {
            Ok(format!("{} -> {}", options.name, options.homepage))
        }
    }

    #[test]
    fn test_registered_template_is_used() {
        let (tmp, mut config) = project();
        config.site.template = "minimal".to_owned();
        let mut templates = TemplateRegistry::new();
        templates.register("minimal", Box::new(Minimal));
        let renderer = FakeRenderer::default();

        let mut assembler = SiteAssembler::new(&renderer).with_templates(templates);
        run(&mut assembler, &config, false).unwrap();

        assert_eq!(
            fs::read_to_string(tmp.path().join("docs/index.html")).unwrap(),
            "Demo Project -> Overview.md"
        );
    }

    #[test]
    fn test_page_url_for_root_and_nested_nodes() {
        let (_tmp, config) = project();
        let tree = c4b_tree::SourceTreeBuilder::new(&config.paths_resolved.root_folder)
            .homepage_name("Overview")
            .build();
        let urls: Vec<String> = tree.root_first().into_iter().map(page_url).collect();

        assert_eq!(urls, vec!["Overview.md", "backend/backend.md", "backend/api/api.md"]);
    }
}
