//! Build progress on stderr.
//!
//! Lines are composed as `(Tone, String)` pairs first and styled only when
//! written, so the wording of each report can be checked without a terminal.

use c4b_build::BuildReport;
use c4b_config::Config;
use console::{Style, Term};

/// Rendering of a reported line.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Tone {
    Plain,
    Dim,
    Done,
    Warn,
    Fail,
}

impl Tone {
    fn style(self) -> Style {
        match self {
            Self::Plain => Style::new(),
            Self::Dim => Style::new().dim(),
            Self::Done => Style::new().green(),
            Self::Warn => Style::new().yellow(),
            Self::Fail => Style::new().red(),
        }
    }
}

type Line = (Tone, String);

/// Reporter for the build commands.
pub(crate) struct Output {
    term: Term,
}

impl Output {
    #[must_use]
    pub(crate) fn new() -> Self {
        Self {
            term: Term::stderr(),
        }
    }

    fn write(&self, lines: impl IntoIterator<Item = Line>) {
        for (tone, text) in lines {
            let _ = self.term.write_line(&tone.style().apply_to(text).to_string());
        }
    }

    /// Where a `kind` build reads from and writes to.
    pub(crate) fn announce(&self, kind: &str, config: &Config) {
        self.write(announcement(kind, config));
    }

    /// Warnings and skipped folders of a finished build.
    pub(crate) fn report(&self, report: &BuildReport) {
        self.write(report_lines(report));
    }

    pub(crate) fn done(&self, msg: String) {
        self.write([(Tone::Done, msg)]);
    }

    pub(crate) fn failed(&self, err: &dyn std::error::Error) {
        self.write([(Tone::Fail, format!("Error: {err}"))]);
    }
}

fn announcement(kind: &str, config: &Config) -> Vec<Line> {
    let paths = &config.paths_resolved;
    vec![
        (
            Tone::Plain,
            format!("Building {} documentation", kind.to_uppercase()),
        ),
        (Tone::Dim, format!("Source: {}", paths.root_folder.display())),
        (Tone::Dim, format!("Output: {}", paths.dist_folder.display())),
    ]
}

fn report_lines(report: &BuildReport) -> Vec<Line> {
    let mut lines: Vec<Line> = report
        .warnings
        .iter()
        .map(|warning| (Tone::Warn, format!("Warning: {warning}")))
        .collect();
    if report.skipped > 0 {
        lines.push((
            Tone::Dim,
            format!("{} unchanged folder(s) skipped", report.skipped),
        ));
    }
    lines
}
