//! Rendering for `--output`: tables for people, JSON or YAML for scripts,
//! and tab-separated plain lines for `cut` and `grep`.

use std::io::{self, IsTerminal, Write};

use owo_colors::OwoColorize;
use tabled::{Table, Tabled, settings::Style};
use tracing::warn;

use crate::cli::{ColorMode, OutputFormat};

// ── Color helpers ────────────────────────────────────────────────────

/// Determine whether color output should be enabled.
pub fn should_color(mode: &ColorMode) -> bool {
    match mode {
        ColorMode::Always => true,
        ColorMode::Never => false,
        ColorMode::Auto => io::stdout().is_terminal() && std::env::var("NO_COLOR").is_err(),
    }
}

/// Severity of a cell, used to pick a color.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Tone {
    Good,
    Warn,
    Bad,
    Muted,
}

/// Paint `text` when color is enabled.
pub fn paint(text: &str, tone: Tone, color: bool) -> String {
    if !color {
        return text.to_owned();
    }
    match tone {
        Tone::Good => text.green().to_string(),
        Tone::Warn => text.yellow().to_string(),
        Tone::Bad => text.red().to_string(),
        Tone::Muted => text.dimmed().to_string(),
    }
}

// ── Render dispatchers ───────────────────────────────────────────────

/// Render rows of readings, pools or migrations.
///
/// Table mode goes through `to_row`; plain mode emits one tab-separated
/// line per item via `line_fn`. Structured formats serialize `data` as is.
pub fn render_list<T, R>(
    format: &OutputFormat,
    data: &[T],
    to_row: impl Fn(&T) -> R,
    line_fn: impl Fn(&T) -> String,
) -> String
where
    T: serde::Serialize,
    R: Tabled,
{
    match format {
        OutputFormat::Table => {
            let rows: Vec<R> = data.iter().map(to_row).collect();
            Table::new(rows).with(Style::rounded()).to_string()
        }
        OutputFormat::Plain => data.iter().map(&line_fn).collect::<Vec<_>>().join("\n"),
        structured => render_structured(structured, data),
    }
}

/// Render a key/value report (share resolution, diagnostics).
///
/// Table mode prints the indented text from `text_fn`.
pub fn render_report<T>(
    format: &OutputFormat,
    data: &T,
    text_fn: impl Fn(&T) -> String,
    line_fn: impl Fn(&T) -> String,
) -> String
where
    T: serde::Serialize,
{
    match format {
        OutputFormat::Table => text_fn(data),
        OutputFormat::Plain => line_fn(data),
        structured => render_structured(structured, data),
    }
}

/// Print to stdout unless quiet. Empty output prints nothing.
pub fn print_output(output: &str, quiet: bool) {
    if quiet || output.is_empty() {
        return;
    }
    let mut stdout = io::stdout().lock();
    let _ = writeln!(stdout, "{output}");
}

/// Progress and hints go to stderr so stdout stays parseable.
pub fn status(message: &str, quiet: bool) {
    if !quiet {
        eprintln!("{message}");
    }
}

fn render_structured<T: serde::Serialize + ?Sized>(format: &OutputFormat, data: &T) -> String {
    let rendered = match format {
        OutputFormat::JsonCompact => serde_json::to_string(data).map_err(|e| e.to_string()),
        OutputFormat::Yaml => serde_yaml::to_string(data).map_err(|e| e.to_string()),
        _ => serde_json::to_string_pretty(data).map_err(|e| e.to_string()),
    };
    rendered.unwrap_or_else(|e| {
        warn!(error = %e, "cannot serialize output");
        String::new()
    })
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use serde::Serialize;

    use super::*;

    #[derive(Serialize, Tabled)]
    struct Row {
        pool: &'static str,
        fc: f64,
    }

    fn rows() -> Vec<Row> {
        vec![
            Row { pool: "backyard", fc: 3.5 },
            Row { pool: "spa", fc: 4.0 },
        ]
    }

    fn line(r: &Row) -> String {
        format!("{}\t{}", r.pool, r.fc)
    }

    #[test]
    fn plain_is_one_line_per_item() {
        let out = render_list(&OutputFormat::Plain, &rows(), |_| Row { pool: "", fc: 0.0 }, line);
        assert_eq!(out, "backyard\t3.5\nspa\t4");
    }

    #[test]
    fn structured_formats_serialize_the_data() {
        let compact = render_list(&OutputFormat::JsonCompact, &rows(), |_| Row { pool: "", fc: 0.0 }, line);
        assert_eq!(compact, r#"[{"pool":"backyard","fc":3.5},{"pool":"spa","fc":4.0}]"#);

        let yaml = render_report(&OutputFormat::Yaml, &rows()[0], |_| String::new(), line);
        assert!(yaml.contains("pool: backyard"), "{yaml}");
    }

    #[test]
    fn report_table_uses_text() {
        let out = render_report(&OutputFormat::Table, &rows()[1], |r| format!("pool: {}", r.pool), line);
        assert_eq!(out, "pool: spa");
    }

    #[test]
    fn paint_without_color_is_identity() {
        assert_eq!(paint("ok", Tone::Good, false), "ok");
    }
}
