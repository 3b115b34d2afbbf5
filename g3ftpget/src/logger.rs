/*
 * SPDX-License-Identifier: Apache-2.0
 * Copyright 2025 ByteDance and/or its affiliates.
 */

use std::io::{self, IsTerminal, Write};

use anstyle::{AnsiColor, Color, Style};
use chrono::Local;
use log::{Level, LevelFilter, Log, Metadata, Record, SetLoggerError};

const COLOR_RED: Style = Style::new().fg_color(Some(Color::Ansi(AnsiColor::Red)));
const COLOR_YELLOW: Style = Style::new().fg_color(Some(Color::Ansi(AnsiColor::Yellow)));
const COLOR_GREEN: Style = Style::new().fg_color(Some(Color::Ansi(AnsiColor::Green)));
const COLOR_CYAN: Style = Style::new().fg_color(Some(Color::Ansi(AnsiColor::Cyan)));
const COLOR_BLUE: Style = Style::new().fg_color(Some(Color::Ansi(AnsiColor::Blue)));
const STYLE_ITALIC: Style = Style::new().italic();

pub(crate) struct SyncLogger {
    level: LevelFilter,
    console: bool,
}

impl SyncLogger {
    pub(crate) fn new(verbose_level: u8) -> Self {
        let level = match verbose_level {
            0 => LevelFilter::Info,
            1 => LevelFilter::Debug,
            _ => LevelFilter::Trace,
        };
        SyncLogger {
            level,
            console: io::stderr().is_terminal(),
        }
    }

    pub(crate) fn into_global_logger(self) -> Result<(), SetLoggerError> {
        let level = self.level;
        log::set_boxed_logger(Box::new(self))?;
        log::set_max_level(level);
        Ok(())
    }

    fn write_plain<IO: Write>(&self, io: &mut IO, record: &Record) -> io::Result<()> {
        let datetime = Local::now().format("%Y-%m-%d %H:%M:%S%.6f");
        write!(io, "{datetime} {}", record.level())?;
        if self.level >= LevelFilter::Debug {
            write!(io, " [{}]", record.target())?;
        }
        writeln!(io, " {}", record.args())
    }

    fn write_console<IO: Write>(&self, io: &mut IO, record: &Record) -> io::Result<()> {
        let datetime = Local::now().format("%Y-%m-%d %H:%M:%S%.6f");
        let level_color = match record.level() {
            Level::Error => COLOR_RED,
            Level::Warn => COLOR_YELLOW,
            Level::Info => COLOR_GREEN,
            Level::Debug => COLOR_CYAN,
            Level::Trace => COLOR_BLUE,
        };
        write!(
            io,
            "{datetime} {}{}{}",
            level_color.render(),
            record.level(),
            level_color.render_reset()
        )?;
        if self.level >= LevelFilter::Debug {
            write!(
                io,
                " [{}{}{}]",
                STYLE_ITALIC.render(),
                record.target(),
                STYLE_ITALIC.render_reset()
            )?;
        }
        writeln!(io, " {}", record.args())
    }
}

impl Log for SyncLogger {
    fn enabled(&self, metadata: &Metadata) -> bool {
        metadata.level() <= self.level
    }

    fn log(&self, record: &Record) {
        if !self.enabled(record.metadata()) {
            return;
        }

        let mut buf = Vec::with_capacity(256);
        let r = if self.console {
            self.write_console(&mut buf, record)
        } else {
            self.write_plain(&mut buf, record)
        };
        if r.is_ok() {
            let mut stderr = io::stderr().lock();
            let _ = stderr.write_all(&buf);
        }
    }

    fn flush(&self) {
        let _ = io::stderr().flush();
    }
}
