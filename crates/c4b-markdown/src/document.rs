//! Owned Markdown event streams.
//!
//! A document is parsed once into `'static` events; every rewrite stage
//! consumes one stream and produces the next.

use pulldown_cmark::{CodeBlockKind, CowStr, Event, LinkType, Options, Parser, Tag, TagEnd};

/// Parsed document.
pub(crate) type Events = Vec<Event<'static>>;

fn parser_options() -> Options {
    Options::ENABLE_TABLES | Options::ENABLE_STRIKETHROUGH | Options::ENABLE_TASKLISTS
}

/// Parse Markdown into owned events.
///
/// Reference-style links and images are turned into inline ones: link
/// definitions are not part of the event stream and would be lost on
/// serialization.
pub(crate) fn parse(markdown: &str) -> Events {
    Parser::new_ext(markdown, parser_options())
        .map(|event| inline_references(event.into_static()))
        .collect()
}

fn inline_references(event: Event<'static>) -> Event<'static> {
    match event {
        Event::Start(Tag::Link {
            link_type,
            dest_url,
            title,
            ..
        }) if is_reference(link_type) => Event::Start(Tag::Link {
            link_type: LinkType::Inline,
            dest_url,
            title,
            id: CowStr::Borrowed(""),
        }),
        Event::Start(Tag::Image {
            link_type,
            dest_url,
            title,
            ..
        }) if is_reference(link_type) => Event::Start(Tag::Image {
            link_type: LinkType::Inline,
            dest_url,
            title,
            id: CowStr::Borrowed(""),
        }),
        other => other,
    }
}

fn is_reference(link_type: LinkType) -> bool {
    matches!(
        link_type,
        LinkType::Reference
            | LinkType::ReferenceUnknown
            | LinkType::Collapsed
            | LinkType::CollapsedUnknown
            | LinkType::Shortcut
            | LinkType::ShortcutUnknown
    )
}

/// Serialize events back to CommonMark, with three-backtick fences.
pub(crate) fn serialize(events: &[Event<'static>]) -> Result<String, pulldown_cmark_to_cmark::Error> {
    let options = pulldown_cmark_to_cmark::Options {
        code_block_token_count: 3,
        ..pulldown_cmark_to_cmark::Options::default()
    };
    let mut out = String::new();
    pulldown_cmark_to_cmark::cmark_with_options(events.iter(), &mut out, options)?;
    // A leading block is preceded by a blank line
    Ok(out.trim_start_matches('\n').to_owned())
}

/// Index of the event closing the tag opened at `start`.
///
/// Events are balanced, so the scan always terminates inside the slice;
/// the last index is returned for a malformed stream.
pub(crate) fn matching_end(events: &[Event<'_>], start: usize) -> usize {
    let mut depth = 0usize;
    for (idx, event) in events.iter().enumerate().skip(start) {
        match event {
            Event::Start(_) => depth += 1,
            Event::End(_) => {
                depth -= 1;
                if depth == 0 {
                    return idx;
                }
            }
            _ => {}
        }
    }
    events.len().saturating_sub(1)
}

/// Concatenated text of a span (code block content, link text).
pub(crate) fn text_of(events: &[Event<'_>]) -> String {
    events
        .iter()
        .filter_map(|event| match event {
            Event::Text(text) | Event::Code(text) => Some(text.as_ref()),
            _ => None,
        })
        .collect()
}

/// Whether a fenced code block is tagged as Mermaid.
pub(crate) fn is_mermaid_block(kind: &CodeBlockKind<'_>) -> bool {
    matches!(kind, CodeBlockKind::Fenced(info)
        if info.split_whitespace().next() == Some("mermaid"))
}

/// Fenced `mermaid` code block holding `source`.
pub(crate) fn mermaid_block(source: &str) -> Events {
    let mut body = source.to_owned();
    if !body.ends_with('\n') {
        body.push('\n');
    }
    vec![
        Event::Start(Tag::CodeBlock(CodeBlockKind::Fenced(CowStr::Borrowed("mermaid")))),
        Event::Text(CowStr::from(body)),
        Event::End(TagEnd::CodeBlock),
    ]
}

/// Inline image with `alt` text.
pub(crate) fn image(url: String, alt: String) -> Events {
    vec![
        Event::Start(Tag::Image {
            link_type: LinkType::Inline,
            dest_url: CowStr::from(url),
            title: CowStr::Borrowed(""),
            id: CowStr::Borrowed(""),
        }),
        Event::Text(CowStr::from(alt)),
        Event::End(TagEnd::Image),
    ]
}

/// Wrap inline events in a paragraph.
pub(crate) fn paragraph(inline: Events) -> Events {
    let mut events = Vec::with_capacity(inline.len() + 2);
    events.push(Event::Start(Tag::Paragraph));
    events.extend(inline);
    events.push(Event::End(TagEnd::Paragraph));
    events
}
