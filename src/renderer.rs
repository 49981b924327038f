//! The renderer: sole owner of the output stream.
//!
//! Every scheduler funnels messages here. The renderer composes the preamble
//! (level number, optional thread name, separator, indentation), wraps text
//! to the window width, and keeps the stack of held lines drawn on the last
//! terminal row, redrawing it after every permanent line.

use std::fmt::Write as _;
use std::io::{self, Write};
use std::sync::LazyLock;
use std::thread;
use std::time::Duration;

use regex::Regex;

use crate::cells::{cell_len, chop_cells_progressive, truncate_cells};
use crate::config::{LoggerConfiguration, ThreadNamePolicy};
use crate::held::HeldLineStack;
use crate::highlight::highlight;
use crate::message::{MessageKind, RawMessage};
use crate::output::OutputSink;
use crate::terminal;

const SEPARATOR: &str = "|";
const MULTILINE_SEPARATOR: &str = "·";
const AT: &str = "@";
const ELLIPSIS: &str = "..";

/// Upper bound of the shift in the post-hold settle delay (`10µs << level`).
const MAX_SETTLE_SHIFT: u32 = 10;

/// Scheduler-provided facts needed to lay out a line.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct RenderContext {
    /// Whether the scheduler tracks thread names at all.
    pub thread_names: bool,
    /// Cell width of the longest registered thread name.
    pub name_width: usize,
}

impl RenderContext {
    /// Context for schedulers without thread names.
    #[must_use]
    pub const fn anonymous() -> Self {
        Self {
            thread_names: false,
            name_width: 0,
        }
    }

    #[must_use]
    pub const fn named(name_width: usize) -> Self {
        Self {
            thread_names: true,
            name_width,
        }
    }
}

fn digits(level: u32) -> usize {
    level.to_string().len()
}

fn push_spaces(out: &mut String, count: usize) {
    out.extend(std::iter::repeat_n(' ', count));
}

fn discard_newlines_and_indentation(text: &str) -> String {
    static NEWLINE_INDENT: LazyLock<Regex> =
        LazyLock::new(|| Regex::new(r"\n +|\n").expect("valid regex"));
    NEWLINE_INDENT.replace_all(text, "").into_owned()
}

/// Renders raw messages onto an [`OutputSink`].
#[derive(Debug)]
pub struct Renderer {
    config: LoggerConfiguration,
    held: HeldLineStack,
    sink: OutputSink,
    window_columns: Option<usize>,
    last_level: u32,
    last_thread_name: String,
    /// Columns occupied by the held line on the current terminal row.
    held_columns: usize,
}

impl Default for Renderer {
    fn default() -> Self {
        Self::new(LoggerConfiguration::default())
    }
}

impl Renderer {
    #[must_use]
    pub fn new(config: LoggerConfiguration) -> Self {
        Self {
            config,
            held: HeldLineStack::new(),
            sink: OutputSink::Stderr,
            window_columns: None,
            last_level: 0,
            last_thread_name: String::new(),
            held_columns: 0,
        }
    }

    #[must_use]
    pub const fn config(&self) -> &LoggerConfiguration {
        &self.config
    }

    pub fn config_mut(&mut self) -> &mut LoggerConfiguration {
        &mut self.config
    }

    /// Install `sink`, flushing and returning the previous one.
    pub fn replace_sink(&mut self, sink: OutputSink) -> OutputSink {
        if let Err(err) = self.sink.flush() {
            tracing::warn!(target: "conclog::output", %err, "failed to flush previous sink");
        }
        std::mem::replace(&mut self.sink, sink)
    }

    #[must_use]
    pub const fn sink(&self) -> &OutputSink {
        &self.sink
    }

    /// Flush buffered output of the current sink.
    ///
    /// # Errors
    ///
    /// Propagates the sink's flush error.
    pub fn flush(&mut self) -> io::Result<()> {
        self.sink.flush()
    }

    /// Override the detected window width (`None` restores detection).
    pub fn set_window_columns(&mut self, columns: Option<usize>) {
        self.window_columns = columns.map(|c| c.max(1));
    }

    /// Wrapping width: the override if set, the terminal's width when writing
    /// to an interactive console, [`terminal::DEFAULT_COLUMNS`] otherwise.
    #[must_use]
    pub fn window_columns(&self) -> usize {
        match self.window_columns {
            Some(columns) => columns,
            None if self.sink.is_console() && terminal::is_stderr_terminal() => {
                terminal::window_columns()
            }
            None => terminal::DEFAULT_COLUMNS,
        }
    }

    #[must_use]
    pub const fn held(&self) -> &HeldLineStack {
        &self.held
    }

    #[must_use]
    pub fn last_printed_thread_name(&self) -> &str {
        &self.last_thread_name
    }

    #[must_use]
    pub const fn last_printed_level(&self) -> u32 {
        self.last_level
    }

    /// Forget held lines and the cached last-printed state.
    pub fn reset_state(&mut self) {
        self.held.clear();
        self.last_level = 0;
        self.last_thread_name.clear();
        self.held_columns = 0;
    }

    /// Render `msg`, reporting write failures as diagnostics.
    pub fn submit(&mut self, msg: &RawMessage, ctx: RenderContext) {
        if let Err(err) = self.render(msg, ctx) {
            tracing::warn!(target: "conclog::render", %err, "failed to write log output");
        }
    }

    /// Render `msg` according to its kind.
    ///
    /// Lines and holds above the configured verbosity produce no output and
    /// leave the renderer state untouched. Releases are never filtered.
    ///
    /// # Errors
    ///
    /// Propagates write errors from the sink.
    pub fn render(&mut self, msg: &RawMessage, ctx: RenderContext) -> io::Result<()> {
        match msg.kind() {
            MessageKind::Println if self.is_visible(msg.level()) => self.println(msg, ctx),
            MessageKind::Hold if self.is_visible(msg.level()) => self.hold(msg.clone()),
            MessageKind::Release => self.release(msg.scope()),
            MessageKind::Println | MessageKind::Hold => Ok(()),
        }
    }

    fn is_visible(&self, level: u32) -> bool {
        level <= self.config.verbosity()
    }

    fn prints_thread_names(&self, ctx: RenderContext) -> bool {
        ctx.thread_names && self.config.thread_name_policy() != ThreadNamePolicy::Never
    }

    fn indentation(&self, level: u32) -> usize {
        if self.config.indents_based_on_level() {
            level as usize
        } else {
            0
        }
    }

    /// Width of the preamble of a line at `level`.
    #[must_use]
    pub fn preamble_width(&self, level: u32, ctx: RenderContext) -> usize {
        let names = if self.prints_thread_names(ctx) {
            ctx.name_width + 1
        } else {
            0
        };
        digits(level) + SEPARATOR.len() + names + self.indentation(level)
    }

    fn apply_theme(&self, text: &str) -> String {
        highlight(text, self.config.theme(), self.config.custom_keywords())
    }

    fn push_first_line_preamble(&self, out: &mut String, msg: &RawMessage, ctx: RenderContext) {
        let theme = self.config.theme();
        let level = msg.level();
        let name = msg.thread_name();
        let policy = if self.prints_thread_names(ctx) {
            self.config.thread_name_policy()
        } else {
            ThreadNamePolicy::Never
        };
        let name_changed = self.last_thread_name != name;
        let level_changed = self.last_level != level;
        let on_change_only = self.config.prints_level_on_change_only();
        let name_padding = ctx.name_width.saturating_sub(cell_len(name));

        if policy == ThreadNamePolicy::Before {
            if name_changed {
                push_spaces(out, name_padding);
                out.push_str(name);
                out.push_str(&theme.at.paint(AT));
            } else {
                push_spaces(out, ctx.name_width + 1);
            }
        }

        if (policy != ThreadNamePolicy::Never && name_changed) || !on_change_only || level_changed {
            out.push_str(&theme.level_number.paint(&level.to_string()));
        } else {
            push_spaces(out, digits(level));
        }

        if policy == ThreadNamePolicy::After {
            if name_changed {
                out.push_str(&theme.at.paint(AT));
                out.push_str(name);
                push_spaces(out, name_padding);
            } else {
                push_spaces(out, ctx.name_width + 1);
            }
        }

        let separator = if on_change_only && !level_changed {
            theme.level_hidden_separator
        } else {
            theme.level_shown_separator
        };
        out.push_str(&separator.paint(SEPARATOR));
        push_spaces(out, self.indentation(level));
    }

    fn push_extra_line_preamble(&self, out: &mut String, level: u32, ctx: RenderContext) {
        push_spaces(out, digits(level));
        if self.prints_thread_names(ctx) {
            push_spaces(out, ctx.name_width + 1);
        }
        out.push_str(&self.config.theme().multiline_separator.paint(MULTILINE_SEPARATOR));
        push_spaces(out, self.indentation(level));
    }

    /// Blank out what is left of a held line that was longer than the
    /// permanent line now written over it.
    fn cover_held_columns(&self, out: &mut String, printed_columns: usize) {
        if !self.held.is_empty() && self.held_columns > printed_columns {
            push_spaces(out, self.held_columns - printed_columns);
        }
    }

    fn println(&mut self, msg: &RawMessage, ctx: RenderContext) -> io::Result<()> {
        let level = msg.level();
        let preamble = self.preamble_width(level, ctx);
        let mut out = String::new();

        if !self.held.is_empty() {
            out.push('\r');
        }
        self.push_first_line_preamble(&mut out, msg, ctx);

        let text = if self.config.discards_newlines_and_indentation() {
            discard_newlines_and_indentation(msg.text())
        } else {
            msg.text().to_string()
        };

        if self.config.handles_multiline_output() && !text.is_empty() {
            let available = self.window_columns().saturating_sub(preamble).max(1);
            let mut rest = text.as_str();
            loop {
                let (chunk, remainder) = chop_cells_progressive(rest, available);
                let (line, next, more) = match chunk.find('\n') {
                    Some(nl) => (&chunk[..nl], &rest[nl + 1..], true),
                    None => (chunk, remainder, !remainder.is_empty()),
                };
                out.push_str(&self.apply_theme(line));
                self.cover_held_columns(&mut out, preamble + cell_len(line));
                self.end_row(&mut out)?;
                if !more {
                    break;
                }
                if !self.held.is_empty() {
                    out.push('\r');
                }
                self.push_extra_line_preamble(&mut out, level, ctx);
                rest = next;
            }
        } else {
            out.push_str(&self.apply_theme(&text));
            self.cover_held_columns(&mut out, preamble + cell_len(&text));
            self.end_row(&mut out)?;
        }

        self.last_level = level;
        msg.thread_name().clone_into(&mut self.last_thread_name);
        self.write_out(&out)
    }

    /// Terminate the current row and redraw the held line below it.
    fn end_row(&mut self, out: &mut String) -> io::Result<()> {
        out.push('\n');
        self.held_columns = 0;
        if !self.held.is_empty() {
            self.draw_held_line(out)?;
        }
        Ok(())
    }

    fn hold(&mut self, msg: RawMessage) -> io::Result<()> {
        self.held.hold(msg);
        let mut out = String::new();
        self.draw_held_line(&mut out)
    }

    fn release(&mut self, scope: &str) -> io::Result<()> {
        if self.held.release(scope).is_none() {
            return Ok(());
        }
        let mut out = String::new();
        self.draw_held_line(&mut out)?;
        if self.held.is_empty() {
            out.push('\r');
        }
        self.write_out(&out)
    }

    fn push_held_entry(&self, out: &mut String, entry: &RawMessage, text: &str) {
        let theme = self.config.theme();
        out.push_str(&theme.level_number.paint(&entry.level().to_string()));
        out.push_str(&theme.level_shown_separator.paint(SEPARATOR));
        out.push(' ');
        out.push_str(&self.apply_theme(text));
    }

    /// Append the held line to `out`, write everything and let the terminal
    /// settle.
    fn draw_held_line(&mut self, out: &mut String) -> io::Result<()> {
        let max_columns = self.window_columns();
        let previous_columns = self.held_columns;
        let mut columns = 0;

        out.push('\r');
        for entry in self.held.iter() {
            let prefix = digits(entry.level()) + SEPARATOR.len() + 1;
            let text_columns = cell_len(entry.text());
            let entry_columns = prefix + text_columns + 1;

            if columns + entry_columns <= max_columns {
                self.push_held_entry(out, entry, entry.text());
                out.push(' ');
                columns += entry_columns;
            } else if columns + entry_columns - 1 <= max_columns {
                self.push_held_entry(out, entry, entry.text());
                columns += entry_columns - 1;
                break;
            } else {
                let remaining = max_columns.saturating_sub(columns);
                if remaining >= prefix + ELLIPSIS.len() {
                    let cut = truncate_cells(entry.text(), remaining - prefix - ELLIPSIS.len());
                    self.push_held_entry(out, entry, cut);
                    out.push_str(ELLIPSIS);
                    columns += prefix + cell_len(cut) + ELLIPSIS.len();
                } else if remaining >= ELLIPSIS.len() {
                    out.push_str(ELLIPSIS);
                    columns += ELLIPSIS.len();
                }
                break;
            }
        }

        if previous_columns > columns {
            push_spaces(out, previous_columns - columns);
        }
        self.held_columns = columns;

        self.write_out(out)?;
        out.clear();
        thread::sleep(Duration::from_micros(
            10 << self.last_level.min(MAX_SETTLE_SHIFT),
        ));
        Ok(())
    }

    fn write_out(&mut self, out: &str) -> io::Result<()> {
        if out.is_empty() {
            return Ok(());
        }
        self.sink.write_all(out.as_bytes())?;
        self.sink.flush()
    }
}

impl Drop for Renderer {
    fn drop(&mut self) {
        let _ = self.sink.flush();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::output::CaptureBuffer;
    use crate::style::palette::{BRIGHT_ORANGE, DARK_GREY};
    use crate::theme::Theme;

    fn capturing(config: LoggerConfiguration, columns: usize) -> (Renderer, CaptureBuffer) {
        let buffer = CaptureBuffer::new();
        let mut renderer = Renderer::new(config);
        renderer.replace_sink(OutputSink::Capture(buffer.clone()));
        renderer.set_window_columns(Some(columns));
        (renderer, buffer)
    }

    fn verbose() -> LoggerConfiguration {
        LoggerConfiguration::default().with_verbosity(5)
    }

    fn line(level: u32, text: &str) -> RawMessage {
        RawMessage::println("main", level, text)
    }

    const ANON: RenderContext = RenderContext::anonymous();

    #[test]
    fn test_level_printed_only_on_change() {
        let (mut r, buf) = capturing(verbose(), 80);
        r.render(&line(1, "first"), ANON).unwrap();
        r.render(&line(1, "second"), ANON).unwrap();
        r.render(&line(2, "nested"), ANON).unwrap();
        assert_eq!(buf.contents(), "1| first\n | second\n2|  nested\n");
    }

    #[test]
    fn test_level_always_printed() {
        let config = verbose().with_prints_level_on_change_only(false);
        let (mut r, buf) = capturing(config, 80);
        r.render(&line(1, "a"), ANON).unwrap();
        r.render(&line(1, "b"), ANON).unwrap();
        assert_eq!(buf.contents(), "1| a\n1| b\n");
    }

    #[test]
    fn test_without_indentation() {
        let config = verbose().with_indents_based_on_level(false);
        let (mut r, buf) = capturing(config, 80);
        r.render(&line(3, "flat"), ANON).unwrap();
        assert_eq!(buf.contents(), "3|flat\n");
    }

    #[test]
    fn test_verbosity_gates_without_state_change() {
        let config = LoggerConfiguration::default().with_verbosity(1);
        let (mut r, buf) = capturing(config, 80);
        r.render(&line(2, "hidden"), ANON).unwrap();
        r.render(&RawMessage::hold("main", "s", 2, "hidden"), ANON).unwrap();
        assert_eq!(buf.contents(), "");
        assert_eq!(r.last_printed_level(), 0);
        assert!(r.held().is_empty());
    }

    #[test]
    fn test_wraps_one_past_available_width() {
        let (mut r, buf) = capturing(verbose(), 20);
        let preamble = r.preamble_width(1, ANON);
        assert_eq!(preamble, 3);
        let text = "abcdefghijklmnopqr";
        assert_eq!(text.len(), 20 - preamble + 1);
        r.render(&line(1, text), ANON).unwrap();
        assert_eq!(buf.contents(), "1| abcdefghijklmnopq\n · r\n");
    }

    #[test]
    fn test_newline_breaks_line() {
        let (mut r, buf) = capturing(verbose(), 80);
        r.render(&line(1, "top\nbottom"), ANON).unwrap();
        assert_eq!(buf.contents(), "1| top\n · bottom\n");
    }

    #[test]
    fn test_no_multiline_handling_prints_raw() {
        let config = verbose().with_handles_multiline_output(false);
        let (mut r, buf) = capturing(config, 10);
        r.render(&line(1, "a long line that is not wrapped"), ANON).unwrap();
        assert_eq!(buf.contents(), "1| a long line that is not wrapped\n");
    }

    #[test]
    fn test_discards_newlines_and_indentation() {
        let config = verbose().with_discards_newlines_and_indentation(true);
        let (mut r, buf) = capturing(config, 80);
        r.render(&line(1, "fn(\n    x,\n    y)"), ANON).unwrap();
        assert_eq!(buf.contents(), "1| fn(x,y)\n");
    }

    #[test]
    fn test_thread_name_before_and_after() {
        let config = verbose().with_thread_name_policy(ThreadNamePolicy::Before);
        let (mut r, buf) = capturing(config, 80);
        let ctx = RenderContext::named(6);
        r.render(&RawMessage::println("main", 1, "a"), ctx).unwrap();
        r.render(&RawMessage::println("main", 1, "b"), ctx).unwrap();
        r.render(&RawMessage::println("worker", 1, "c"), ctx).unwrap();
        assert_eq!(
            buf.contents(),
            "  main@1| a\n        | b\nworker@1| c\n"
        );

        let config = verbose().with_thread_name_policy(ThreadNamePolicy::After);
        let (mut r, buf) = capturing(config, 80);
        r.render(&RawMessage::println("main", 1, "a"), ctx).unwrap();
        r.render(&RawMessage::println("main", 1, "b"), ctx).unwrap();
        assert_eq!(buf.contents(), "1@main  | a\n        | b\n");
    }

    #[test]
    fn test_thread_names_ignored_without_support() {
        let config = verbose().with_thread_name_policy(ThreadNamePolicy::Before);
        let (mut r, buf) = capturing(config, 80);
        r.render(&line(1, "a"), ANON).unwrap();
        assert_eq!(buf.contents(), "1| a\n");
    }

    #[test]
    fn test_hold_println_release() {
        let (mut r, buf) = capturing(verbose(), 80);
        r.render(&RawMessage::hold("main", "solve", 1, "50%"), ANON).unwrap();
        assert_eq!(buf.take(), "\r1| 50% ");
        r.render(&line(1, "done"), ANON).unwrap();
        assert_eq!(buf.take(), "\r1| done\n\r1| 50% ");
        r.render(&RawMessage::release("main", "solve", 1), ANON).unwrap();
        assert_eq!(buf.take(), "\r       \r");
        assert!(r.held().is_empty());
    }

    #[test]
    fn test_println_covers_longer_held_line() {
        let (mut r, buf) = capturing(verbose(), 80);
        r.render(&RawMessage::hold("main", "s", 1, "a long held line"), ANON).unwrap();
        buf.clear();
        r.render(&line(1, "x"), ANON).unwrap();
        let held = "1| a long held line ";
        let expected = format!("\r1| x{}\n\r{held}", " ".repeat(held.len() - 4));
        assert_eq!(buf.contents(), expected);
    }

    #[test]
    fn test_held_lines_concatenate_and_truncate() {
        let (mut r, buf) = capturing(verbose(), 16);
        r.render(&RawMessage::hold("main", "a", 1, "one"), ANON).unwrap();
        r.render(&RawMessage::hold("main", "b", 2, "abcdefghij"), ANON).unwrap();
        let last = buf.take().rsplit('\r').next().map(str::to_string).unwrap();
        assert_eq!(last, "1| one 2| abcd..");
        assert_eq!(cell_len(&last), 16);
    }

    #[test]
    fn test_held_line_exact_fit_drops_trailing_space() {
        let (mut r, buf) = capturing(verbose(), 6);
        r.render(&RawMessage::hold("main", "a", 1, "abc"), ANON).unwrap();
        assert_eq!(buf.contents(), "\r1| abc");
    }

    #[test]
    fn test_release_unknown_scope_writes_nothing() {
        let (mut r, buf) = capturing(verbose(), 80);
        r.render(&RawMessage::release("main", "nothing", 1), ANON).unwrap();
        assert_eq!(buf.contents(), "");
    }

    #[test]
    fn test_release_keeps_outer_scope() {
        let (mut r, buf) = capturing(verbose(), 80);
        r.render(&RawMessage::hold("main", "outer", 1, "o"), ANON).unwrap();
        r.render(&RawMessage::hold("main", "inner", 2, "i"), ANON).unwrap();
        buf.clear();
        r.render(&RawMessage::release("main", "inner", 2), ANON).unwrap();
        assert_eq!(buf.contents(), format!("\r1| o {}", " ".repeat(5)));
        assert_eq!(r.held().len(), 1);
    }

    #[test]
    fn test_dark_theme_preamble() {
        let config = verbose().with_theme(Theme::dark());
        let (mut r, buf) = capturing(config, 80);
        r.render(&line(1, "a"), ANON).unwrap();
        r.render(&line(1, "b"), ANON).unwrap();
        let shown = format!("\x1b[38;5;{BRIGHT_ORANGE}m");
        let hidden = format!("\x1b[38;5;{DARK_GREY}m");
        assert_eq!(
            buf.contents(),
            format!("{shown}1\x1b[0m{shown}|\x1b[0m a\n {hidden}|\x1b[0m b\n")
        );
    }

    #[test]
    fn test_wide_characters_wrap_by_cells() {
        let (mut r, buf) = capturing(verbose(), 8);
        r.render(&line(1, "日本語です"), ANON).unwrap();
        assert_eq!(buf.contents(), "1| 日本\n · 語で\n · す\n");
    }

    #[test]
    fn test_narrow_window_still_progresses() {
        let (mut r, buf) = capturing(verbose(), 2);
        r.render(&line(1, "ab"), ANON).unwrap();
        assert_eq!(buf.contents(), "1| a\n · b\n");
    }
}
