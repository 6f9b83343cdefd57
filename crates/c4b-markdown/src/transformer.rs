//! Document transformation pipeline.
//!
//! [`MarkdownTransformer::transform`] runs a fixed sequence of rewrite
//! stages over one document:
//!
//! 1. parse into owned events
//! 2. copy linked assets into the destination tree and rewrite their URLs
//! 3. embed `.mmd` links as `mermaid` code blocks, or render every diagram to SVG
//! 4. serialize back to CommonMark
//!
//! Failures never abort a document: each one leaves the affected link or
//! block untouched and is reported in [`Transformed::warnings`].

use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use c4b_diagrams::DiagramRenderer;
use pulldown_cmark::{CowStr, Event, LinkType, Tag, TagEnd};

use crate::document::{
    self, Events, image, is_mermaid_block, matching_end, mermaid_block, paragraph, text_of,
};
use crate::paths::{is_external, mirror_path, normalize, relative_url, split_target};

/// Docsify title that stops the router from handling a link.
const DOCSIFY_IGNORE: &str = ":ignore";

/// Shape of the artifact a transformed document ends up in.
///
/// Decides what rewritten URLs are relative to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputTarget {
    /// One concatenated document at the destination root.
    Bundle,
    /// Docsify site: assets from the destination root, diagrams from the page's directory.
    Site,
    /// One document per directory: everything relative to the page's directory.
    PerDirectory,
}

/// Inputs of a transformation that do not change between documents.
#[derive(Debug, Clone)]
pub struct TransformConfig {
    /// Root of the source tree.
    pub root_folder: PathBuf,
    /// Root of the destination tree.
    pub dist_folder: PathBuf,
    /// Splice `.mmd` links in as code blocks instead of rendering diagrams.
    pub embed_mermaid_diagrams: bool,
    /// Artifact shape.
    pub target: OutputTarget,
}

/// Result of transforming one document.
#[derive(Debug, Clone, Default)]
pub struct Transformed {
    /// Rewritten Markdown.
    pub markdown: String,
    /// Problems that left parts of the document untouched.
    pub warnings: Vec<String>,
}

/// Rewrites Markdown documents for publication.
pub struct MarkdownTransformer<'r> {
    renderer: &'r dyn DiagramRenderer,
}

impl<'r> MarkdownTransformer<'r> {
    /// Create a transformer rendering diagrams with `renderer`.
    #[must_use]
    pub fn new(renderer: &'r dyn DiagramRenderer) -> Self {
        Self { renderer }
    }

    /// Transform one document located in `source_dir`.
    pub fn transform(
        &self,
        markdown: &str,
        document_name: &str,
        source_dir: &Path,
        config: &TransformConfig,
    ) -> Transformed {
        let mut pass = Pass::new(self.renderer, document_name, source_dir, config);

        let events = document::parse(markdown);
        tracing::debug!(document = document_name, dir = %source_dir.display(), "Copying linked files");
        let events = pass.copy_linked_assets(events);

        let events = if config.embed_mermaid_diagrams {
            tracing::debug!(document = document_name, "Embedding linked Mermaid files");
            pass.embed_diagrams(&events)
        } else {
            tracing::debug!(document = document_name, "Converting Mermaid diagrams to SVG");
            pass.convert_diagrams(&events)
        };

        let markdown = match document::serialize(&events) {
            Ok(out) => out,
            Err(e) => {
                pass.warn(format!("Failed to serialize {document_name}: {e:?}"));
                markdown.to_owned()
            }
        };

        Transformed {
            markdown,
            warnings: pass.warnings,
        }
    }
}

/// State of one transformation.
struct Pass<'a> {
    renderer: &'a dyn DiagramRenderer,
    document_name: &'a str,
    target: OutputTarget,
    source_dir: PathBuf,
    root: PathBuf,
    dist: PathBuf,
    /// Mirror of `source_dir` in the destination tree.
    node_out_dir: Option<PathBuf>,
    warnings: Vec<String>,
}

/// An asset copied into the destination tree.
struct CopiedAsset {
    url: String,
    stem: String,
}

impl<'a> Pass<'a> {
    fn new(
        renderer: &'a dyn DiagramRenderer,
        document_name: &'a str,
        source_dir: &Path,
        config: &TransformConfig,
    ) -> Self {
        let root = normalize(&config.root_folder);
        let dist = normalize(&config.dist_folder);
        let source_dir = normalize(source_dir);
        let node_out_dir = mirror_path(&source_dir, &root, &dist);
        Self {
            renderer,
            document_name,
            target: config.target,
            source_dir,
            root,
            dist,
            node_out_dir,
            warnings: Vec::new(),
        }
    }

    fn warn(&mut self, message: String) {
        tracing::warn!(document = self.document_name, "{message}");
        self.warnings.push(message);
    }

    /// Directory that URLs of page-relative targets start from.
    fn page_dir(&self) -> &Path {
        self.node_out_dir.as_deref().unwrap_or(&self.dist)
    }

    fn asset_url(&self, dest: &Path) -> String {
        match self.target {
            OutputTarget::Bundle | OutputTarget::Site => relative_url(&self.dist, dest),
            OutputTarget::PerDirectory => relative_url(self.page_dir(), dest),
        }
    }

    fn diagram_url(&self, dest: &Path) -> String {
        match self.target {
            OutputTarget::Bundle => relative_url(&self.dist, dest),
            OutputTarget::Site | OutputTarget::PerDirectory => relative_url(self.page_dir(), dest),
        }
    }

    // Stage: linked assets

    fn copy_linked_assets(&mut self, events: Events) -> Events {
        let mut out = Vec::with_capacity(events.len());
        let mut events = events.into_iter().peekable();

        while let Some(event) = events.next() {
            match event {
                Event::Start(Tag::Image {
                    link_type,
                    dest_url,
                    title,
                    id,
                }) => match self.copy_asset(&dest_url, link_type) {
                    Some(asset) => {
                        out.push(Event::Start(Tag::Image {
                            link_type: LinkType::Inline,
                            dest_url: CowStr::from(asset.url),
                            title,
                            id: CowStr::Borrowed(""),
                        }));
                        if matches!(events.peek(), Some(Event::End(TagEnd::Image))) {
                            out.push(Event::Text(CowStr::from(asset.stem)));
                        }
                    }
                    None => out.push(Event::Start(Tag::Image {
                        link_type,
                        dest_url,
                        title,
                        id,
                    })),
                },
                Event::Start(Tag::Link {
                    link_type,
                    dest_url,
                    title,
                    id,
                }) if !is_diagram_target(&dest_url) => match self.copy_asset(&dest_url, link_type) {
                    Some(asset) => {
                        let (url, title) = if self.target == OutputTarget::Site {
                            (asset.url, CowStr::Borrowed(DOCSIFY_IGNORE))
                        } else {
                            (asset.url, title)
                        };
                        out.push(Event::Start(Tag::Link {
                            link_type: LinkType::Inline,
                            dest_url: CowStr::from(url),
                            title,
                            id: CowStr::Borrowed(""),
                        }));
                    }
                    None => out.push(Event::Start(Tag::Link {
                        link_type,
                        dest_url,
                        title,
                        id,
                    })),
                },
                other => out.push(other),
            }
        }

        out
    }

    fn copy_asset(&mut self, dest_url: &str, link_type: LinkType) -> Option<CopiedAsset> {
        if matches!(link_type, LinkType::Autolink | LinkType::Email) || is_external(dest_url) {
            return None;
        }
        let (path, suffix) = split_target(dest_url);
        if path.is_empty() {
            return None;
        }

        let source = normalize(&self.source_dir.join(&path));
        let Some(dest) = mirror_path(&source, &self.root, &self.dist) else {
            self.warn(format!(
                "Linked file is outside {}: {}",
                self.root.display(),
                source.display()
            ));
            return None;
        };
        if !source.exists() {
            self.warn(format!("Linked file not found: {}", source.display()));
            return None;
        }

        if source != dest {
            if let Err(e) = copy_file(&source, &dest) {
                self.warn(format!(
                    "Failed to copy linked file {}: {e}",
                    source.display()
                ));
                return None;
            }
            tracing::debug!(from = %source.display(), to = %dest.display(), "Copied linked file");
        }

        Some(CopiedAsset {
            url: format!("{}{suffix}", self.asset_url(&dest)),
            stem: source
                .file_stem()
                .map(|stem| stem.to_string_lossy().into_owned())
                .unwrap_or_default(),
        })
    }

    // Stage: embed diagrams

    fn embed_diagrams(&mut self, events: &[Event<'static>]) -> Events {
        let mut out = Vec::with_capacity(events.len());
        let mut idx = 0;

        while idx < events.len() {
            match &events[idx] {
                Event::Start(Tag::Paragraph) => {
                    let end = matching_end(events, idx);
                    let inner = &events[idx + 1..end];
                    out.extend(self.embed_inline(inner, true));
                    idx = end + 1;
                }
                Event::Start(Tag::Item) => {
                    let end = matching_end(events, idx);
                    out.push(events[idx].clone());
                    out.extend(self.embed_in_item(&events[idx + 1..end]));
                    out.push(events[end].clone());
                    idx = end + 1;
                }
                Event::Start(Tag::Link { dest_url, .. }) if is_diagram_target(dest_url) => {
                    self.warn_unembeddable(dest_url);
                    out.push(events[idx].clone());
                    idx += 1;
                }
                event => {
                    out.push(event.clone());
                    idx += 1;
                }
            }
        }

        out
    }

    /// Tight list items hold their text without a paragraph: treat each run
    /// of inline events like one, and recurse into nested blocks.
    fn embed_in_item(&mut self, inner: &[Event<'static>]) -> Events {
        let mut out = Vec::with_capacity(inner.len());
        let mut idx = 0;

        while idx < inner.len() {
            let run_end = inner[idx..]
                .iter()
                .position(starts_block)
                .map_or(inner.len(), |offset| idx + offset);
            if run_end > idx {
                out.extend(self.embed_inline(&inner[idx..run_end], false));
                idx = run_end;
            } else {
                let end = matching_end(inner, idx);
                out.extend(self.embed_diagrams(&inner[idx..=end]));
                idx = end + 1;
            }
        }

        out
    }

    /// Replace diagram links sitting directly in a paragraph (or a tight list
    /// item) by code blocks. Text around a replaced link becomes paragraphs.
    fn embed_inline(&mut self, inner: &[Event<'static>], in_paragraph: bool) -> Events {
        let mut out = Vec::new();
        let mut segment: Events = Vec::new();
        let mut split = false;
        let mut depth = 0usize;
        let mut idx = 0;

        while idx < inner.len() {
            let event = &inner[idx];
            if let Event::Start(Tag::Link { dest_url, .. }) = event
                && is_diagram_target(dest_url)
            {
                if depth == 0 {
                    let end = matching_end(inner, idx);
                    if let Some((source, text)) = self.load_diagram(dest_url) {
                        push_trimmed_paragraph(&mut out, std::mem::take(&mut segment));
                        out.extend(mermaid_block(&text));
                        split = true;
                        tracing::debug!(path = %source.display(), "Embedded Mermaid source");
                    } else {
                        segment.extend_from_slice(&inner[idx..=end]);
                    }
                    idx = end + 1;
                    continue;
                }
                self.warn_unembeddable(dest_url);
            }

            match event {
                Event::Start(_) => depth += 1,
                Event::End(_) => depth = depth.saturating_sub(1),
                _ => {}
            }
            segment.push(event.clone());
            idx += 1;
        }

        if split {
            push_trimmed_paragraph(&mut out, segment);
        } else if in_paragraph {
            out.extend(paragraph(segment));
        } else {
            out.extend(segment);
        }
        out
    }

    fn warn_unembeddable(&mut self, dest_url: &str) {
        self.warn(format!(
            "Cannot embed diagram {dest_url}: only links directly inside a paragraph or list item can become code blocks"
        ));
    }

    /// Resolve and read a linked diagram. Missing or blank files are reported.
    fn load_diagram(&mut self, dest_url: &str) -> Option<(PathBuf, String)> {
        let (path, _) = split_target(dest_url);
        let source = normalize(&self.source_dir.join(path));
        let text = match fs::read_to_string(&source) {
            Ok(text) => text,
            Err(e) if e.kind() == io::ErrorKind::NotFound => {
                self.warn(format!("Linked mermaid file not found: {}", source.display()));
                return None;
            }
            Err(e) => {
                self.warn(format!(
                    "Failed to read mermaid file {}: {e}",
                    source.display()
                ));
                return None;
            }
        };
        if text.trim().is_empty() {
            self.warn(format!("Mermaid content empty at {}", source.display()));
            return None;
        }
        Some((source, text))
    }

    // Stage: convert diagrams

    fn convert_diagrams(&mut self, events: &[Event<'static>]) -> Events {
        let mut out = Vec::with_capacity(events.len());
        let mut idx = 0;

        while idx < events.len() {
            match &events[idx] {
                Event::Start(Tag::Link { dest_url, .. }) if is_diagram_target(dest_url) => {
                    let end = matching_end(events, idx);
                    match self.render_linked(dest_url) {
                        Some(img) => out.extend(img),
                        None => out.extend_from_slice(&events[idx..=end]),
                    }
                    idx = end + 1;
                }
                Event::Start(Tag::CodeBlock(kind)) if is_mermaid_block(kind) => {
                    let end = matching_end(events, idx);
                    let text = text_of(&events[idx + 1..end]);
                    match self.render_inline(&text) {
                        Some(img) => out.extend(paragraph(img)),
                        None => out.extend_from_slice(&events[idx..=end]),
                    }
                    idx = end + 1;
                }
                event => {
                    out.push(event.clone());
                    idx += 1;
                }
            }
        }

        out
    }

    fn render_linked(&mut self, dest_url: &str) -> Option<Events> {
        let (source, text) = self.load_diagram(dest_url)?;
        let Some(target) = mirror_path(&source, &self.root, &self.dist) else {
            self.warn(format!(
                "Linked mermaid file is outside {}: {}",
                self.root.display(),
                source.display()
            ));
            return None;
        };
        let origin = source.display().to_string();
        self.render_to(&text, &target.with_extension("svg"), &origin)
    }

    fn render_inline(&mut self, text: &str) -> Option<Events> {
        if text.trim().is_empty() {
            self.warn(format!(
                "Mermaid content empty in code block of {}",
                self.document_name
            ));
            return None;
        }
        let Some(dir) = self.node_out_dir.clone() else {
            self.warn(format!(
                "Cannot render code block of {}: {} is outside {}",
                self.document_name,
                self.source_dir.display(),
                self.root.display()
            ));
            return None;
        };
        let target = dir.join(self.renderer.unique_filename(&dir));
        let origin = format!("code block in {}", self.document_name);
        self.render_to(text, &target, &origin)
    }

    fn render_to(&mut self, text: &str, target: &Path, origin: &str) -> Option<Events> {
        if !self.renderer.render(text, target) {
            self.warn(format!("Failed to render diagram from {origin}"));
            return None;
        }
        let alt = target
            .file_name()
            .map(|name| name.to_string_lossy().into_owned())
            .unwrap_or_default();
        tracing::debug!(path = %target.display(), "Rendered diagram");
        Some(image(self.diagram_url(target), alt))
    }
}

/// Whether a link destination is a local `.mmd` file.
fn is_diagram_target(dest_url: &str) -> bool {
    !is_external(dest_url)
        && split_target(dest_url)
            .0
            .to_ascii_lowercase()
            .ends_with(".mmd")
}

fn copy_file(source: &Path, dest: &Path) -> io::Result<()> {
    if let Some(parent) = dest.parent() {
        fs::create_dir_all(parent)?;
    }
    fs::copy(source, dest)?;
    Ok(())
}

fn is_blank(event: &Event<'_>) -> bool {
    match event {
        Event::SoftBreak | Event::HardBreak => true,
        Event::Text(text) => text.trim().is_empty(),
        _ => false,
    }
}

/// Close a split paragraph piece, dropping it when nothing visible remains.
fn starts_block(event: &Event<'_>) -> bool {
    matches!(
        event,
        Event::Start(
            Tag::Paragraph
                | Tag::Heading { .. }
                | Tag::BlockQuote(_)
                | Tag::CodeBlock(_)
                | Tag::HtmlBlock
                | Tag::List(_)
                | Tag::Item
                | Tag::Table(_)
                | Tag::FootnoteDefinition(_)
        )
    )
}

fn push_trimmed_paragraph(out: &mut Events, mut segment: Events) {
    while segment.first().is_some_and(is_blank) {
        segment.remove(0);
    }
    while segment.last().is_some_and(is_blank) {
        segment.pop();
    }
    if segment.is_empty() {
        return;
    }
    if let Some(Event::Text(text)) = segment.first_mut() {
        *text = CowStr::from(text.trim_start().to_owned());
    }
    if let Some(Event::Text(text)) = segment.last_mut() {
        *text = CowStr::from(text.trim_end().to_owned());
    }
    out.extend(paragraph(segment));
}
