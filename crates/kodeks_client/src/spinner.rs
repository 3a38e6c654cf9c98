//! Braille busy indicator drawn right after the streamed text.
//!
//! Animation and suspension come from an `indicatif` spinner. Its draw target
//! is [`InlineTerm`], which erases a frame by backspacing over it rather than
//! clearing the whole line, so text already on the line is left alone.

use std::fmt;
use std::io::{self, IsTerminal, Write};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use indicatif::{ProgressBar, ProgressDrawTarget, ProgressStyle, TermLike};

const TICK_CHARS: &str = "⠋⠙⠹⠸⠼⠴⠦⠧⠇⠏";
const FRAME_INTERVAL: Duration = Duration::from_millis(80);

struct Inline<W> {
    out: W,
    /// Characters drawn since the last clear.
    drawn: usize,
}

/// Single-cell terminal over any writer.
struct InlineTerm<W> {
    inner: Arc<Mutex<Inline<W>>>,
}

impl<W> Clone for InlineTerm<W> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

impl<W> fmt::Debug for InlineTerm<W> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("InlineTerm").finish_non_exhaustive()
    }
}

impl<W> InlineTerm<W> {
    fn lock(&self) -> MutexGuard<'_, Inline<W>> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl<W: Write + Send + 'static> TermLike for InlineTerm<W> {
    fn width(&self) -> u16 {
        1
    }

    fn move_cursor_up(&self, _n: usize) -> io::Result<()> {
        Ok(())
    }

    fn move_cursor_down(&self, _n: usize) -> io::Result<()> {
        Ok(())
    }

    fn move_cursor_right(&self, _n: usize) -> io::Result<()> {
        Ok(())
    }

    fn move_cursor_left(&self, _n: usize) -> io::Result<()> {
        Ok(())
    }

    fn write_line(&self, s: &str) -> io::Result<()> {
        let mut term = self.lock();
        term.drawn = 0;
        writeln!(term.out, "{}", s)
    }

    fn write_str(&self, s: &str) -> io::Result<()> {
        let mut term = self.lock();
        term.drawn += s.chars().count();
        term.out.write_all(s.as_bytes())
    }

    fn clear_line(&self) -> io::Result<()> {
        let mut term = self.lock();
        let n = std::mem::take(&mut term.drawn);
        if n == 0 {
            return Ok(());
        }
        let back = "\x08".repeat(n);
        write!(term.out, "{}{}{}", back, " ".repeat(n), back)
    }

    fn flush(&self) -> io::Result<()> {
        self.lock().out.flush()
    }
}

fn style() -> ProgressStyle {
    ProgressStyle::with_template("{spinner}")
        .unwrap_or_else(|_| ProgressStyle::default_spinner())
        .tick_chars(TICK_CHARS)
}

pub struct Spinner<W: Write + Send + 'static = io::Stdout> {
    term: InlineTerm<W>,
    bar: Option<ProgressBar>,
    enabled: bool,
}

impl Spinner<io::Stdout> {
    /// Spinner on stdout; inert when stdout is not a terminal.
    pub fn stdout() -> Self {
        let enabled = io::stdout().is_terminal();
        Self::with_output(io::stdout(), enabled)
    }
}

impl<W: Write + Send + 'static> Spinner<W> {
    pub fn with_output(out: W, enabled: bool) -> Self {
        Self {
            term: InlineTerm {
                inner: Arc::new(Mutex::new(Inline { out, drawn: 0 })),
            },
            bar: None,
            enabled,
        }
    }

    pub fn is_running(&self) -> bool {
        self.bar.is_some()
    }

    /// Draw the first frame and start animating. No-op if already running.
    pub fn start(&mut self) {
        if !self.enabled || self.bar.is_some() {
            return;
        }
        let target = ProgressDrawTarget::term_like(Box::new(self.term.clone()));
        let bar = ProgressBar::with_draw_target(None, target);
        bar.set_style(style());
        bar.tick();
        bar.enable_steady_tick(FRAME_INTERVAL);
        self.bar = Some(bar);
    }

    /// Erase the frame, run `f`, then draw again after whatever `f` wrote.
    pub fn suspend<F: FnOnce() -> R, R>(&self, f: F) -> R {
        match &self.bar {
            Some(bar) => bar.suspend(f),
            None => f(),
        }
    }

    /// Stop animating and erase the frame.
    pub fn stop(&mut self) {
        if let Some(bar) = self.bar.take() {
            bar.finish_and_clear();
        }
    }
}

impl<W: Write + Send + 'static> Drop for Spinner<W> {
    fn drop(&mut self) {
        self.stop();
    }
}
