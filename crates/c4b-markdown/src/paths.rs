//! Path and URL helpers shared by the rewrite stages and the output strategies.

use std::path::{Component, Path, PathBuf};

use percent_encoding::{
    AsciiSet, CONTROLS, NON_ALPHANUMERIC, percent_decode_str, utf8_percent_encode,
};

/// Characters JavaScript's `encodeURI` leaves alone.
const URI: &AsciiSet = &NON_ALPHANUMERIC
    .remove(b';')
    .remove(b',')
    .remove(b'/')
    .remove(b'?')
    .remove(b':')
    .remove(b'@')
    .remove(b'&')
    .remove(b'=')
    .remove(b'+')
    .remove(b'$')
    .remove(b'-')
    .remove(b'_')
    .remove(b'.')
    .remove(b'!')
    .remove(b'~')
    .remove(b'*')
    .remove(b'\'')
    .remove(b'(')
    .remove(b')')
    .remove(b'#');

/// Characters that cannot appear raw in a Markdown link destination segment.
const PATH_SEGMENT: &AsciiSet = &CONTROLS
    .add(b' ')
    .add(b'"')
    .add(b'#')
    .add(b'%')
    .add(b'<')
    .add(b'>')
    .add(b'?')
    .add(b'`')
    .add(b'(')
    .add(b')')
    .add(b'[')
    .add(b']');

/// Encode a string the way JavaScript's `encodeURI` does.
///
/// ```
/// assert_eq!(c4b_markdown::encode_uri("My Project/a b.md"), "My%20Project/a%20b.md");
/// ```
#[must_use]
pub fn encode_uri(value: &str) -> String {
    utf8_percent_encode(value, URI).to_string()
}

/// In-document anchor for a heading: `encodeURI(name)` with `%20` as `-`.
///
/// ```
/// assert_eq!(c4b_markdown::anchor("Payment Service"), "Payment-Service");
/// ```
#[must_use]
pub fn anchor(name: &str) -> String {
    encode_uri(name).replace("%20", "-")
}

/// Relative URL from directory `from_dir` to path `to`, `/`-separated.
///
/// Both paths are normalized first. Each segment is percent-encoded so the
/// result can be used as a Markdown link destination.
#[must_use]
pub fn relative_url(from_dir: &Path, to: &Path) -> String {
    let from_dir = normalize(from_dir);
    let to = normalize(to);
    let from: Vec<Component<'_>> = from_dir.components().collect();
    let target: Vec<Component<'_>> = to.components().collect();

    let common = from
        .iter()
        .zip(&target)
        .take_while(|(a, b)| a == b)
        .count();

    let mut segments: Vec<String> = std::iter::repeat_n("..".to_owned(), from.len() - common)
        .collect();
    segments.extend(target[common..].iter().map(|c| {
        utf8_percent_encode(&c.as_os_str().to_string_lossy(), PATH_SEGMENT).to_string()
    }));

    if segments.is_empty() {
        "./".to_owned()
    } else {
        segments.join("/")
    }
}

/// Absolute, lexically normalized form of `path` (`.` and `..` resolved).
#[must_use]
pub fn normalize(path: &Path) -> PathBuf {
    let absolute = std::path::absolute(path).unwrap_or_else(|_| path.to_path_buf());
    let mut normalized = PathBuf::new();
    for component in absolute.components() {
        match component {
            Component::CurDir => {}
            Component::ParentDir => {
                normalized.pop();
            }
            other => normalized.push(other),
        }
    }
    normalized
}

/// Swap the `root` prefix of `path` for `dist`.
///
/// Returns `None` when `path` is not inside `root`.
#[must_use]
pub fn mirror_path(path: &Path, root: &Path, dist: &Path) -> Option<PathBuf> {
    let rel = normalize(path).strip_prefix(normalize(root)).ok()?.to_path_buf();
    Some(normalize(dist).join(rel))
}

/// Whether a link destination points outside the source tree.
///
/// URLs with a scheme (`https:`, `mailto:`, ...), protocol-relative URLs and
/// fragment-only references are external. Empty destinations are treated the
/// same way so they are left alone.
pub(crate) fn is_external(url: &str) -> bool {
    if url.is_empty() || url.starts_with('#') || url.starts_with("//") {
        return true;
    }
    url.split_once(':').is_some_and(|(scheme, _)| {
        scheme.len() > 1
            && scheme.starts_with(|c: char| c.is_ascii_alphabetic())
            && scheme
                .chars()
                .all(|c| c.is_ascii_alphanumeric() || matches!(c, '+' | '-' | '.'))
    })
}

/// Split a local link destination into its decoded path and `?query`/`#fragment` suffix.
pub(crate) fn split_target(url: &str) -> (String, &str) {
    let split = url.find(['?', '#']).unwrap_or(url.len());
    let (path, suffix) = url.split_at(split);
    (percent_decode_str(path).decode_utf8_lossy().into_owned(), suffix)
}
