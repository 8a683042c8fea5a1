//! Raw channel input to submitted lines.
//!
//! Bytes arrive one at a time from a client that is in raw mode, so the editor
//! does its own echo and destructive backspace. It knows nothing about
//! commands.

use std::io;

use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt};
use unicode_segmentation::UnicodeSegmentation;
use unicode_width::UnicodeWidthStr;

/// Echoed when a line is submitted.
pub const LINE_TERMINATOR: &str = "\r\n";
/// Longest line the editor buffers; further input is dropped.
pub const MAX_LINE_BYTES: usize = 4096;

const ERASE_CELL: &str = "\x08 \x08";
const MAX_UTF8_LEN: usize = 4;

#[derive(Debug)]
pub enum ReadOutcome {
    /// A submitted line, without its terminator. May be empty.
    Line(String),
    /// End of stream, or the echo could not be written.
    Disconnected,
    /// The channel reported an error while reading.
    ReadFailed(io::Error),
}

/// Result of feeding one byte.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EditStep {
    Ignored,
    Echo(String),
    Submit(String),
}

#[derive(Debug)]
pub struct LineEditor {
    buffer: String,
    pending: Vec<u8>,
    echo: bool,
    after_cr: bool,
}

impl Default for LineEditor {
    fn default() -> Self {
        Self::new()
    }
}

impl LineEditor {
    pub fn new() -> Self {
        Self {
            buffer: String::new(),
            pending: Vec::with_capacity(MAX_UTF8_LEN),
            echo: true,
            after_cr: false,
        }
    }

    /// Editor for secrets: typed characters and erasures are not echoed,
    /// only the terminator is.
    pub fn without_echo() -> Self {
        Self {
            echo: false,
            ..Self::new()
        }
    }

    pub fn set_echo(&mut self, echo: bool) {
        self.echo = echo;
    }

    pub fn buffer(&self) -> &str {
        &self.buffer
    }

    pub fn feed(&mut self, byte: u8) -> EditStep {
        let after_cr = std::mem::replace(&mut self.after_cr, false);

        match byte {
            b'\n' if after_cr => EditStep::Ignored,
            b'\r' | b'\n' => {
                self.after_cr = byte == b'\r';
                self.pending.clear();
                EditStep::Submit(std::mem::take(&mut self.buffer))
            }
            0x7f | 0x08 => {
                self.pending.clear();
                self.erase_last()
            }
            b'\t' => self.insert("\t"),
            0x00..=0x1f => {
                self.pending.clear();
                EditStep::Ignored
            }
            0x20..=0x7e => {
                self.pending.clear();
                let mut utf8 = [0u8; MAX_UTF8_LEN];
                self.insert(char::from(byte).encode_utf8(&mut utf8))
            }
            _ => self.feed_multibyte(byte),
        }
    }

    /// Reads until a line is submitted or the channel goes away.
    pub async fn read_line<R, W>(&mut self, reader: &mut R, writer: &mut W) -> ReadOutcome
    where
        R: AsyncRead + Unpin,
        W: AsyncWrite + Unpin,
    {
        let mut byte = [0u8; 1];
        loop {
            match reader.read(&mut byte).await {
                Ok(0) => return ReadOutcome::Disconnected,
                Ok(_) => {}
                Err(error) => return ReadOutcome::ReadFailed(error),
            }

            match self.feed(byte[0]) {
                EditStep::Ignored => {}
                EditStep::Echo(echo) => {
                    if write_flush(writer, echo.as_bytes()).await.is_err() {
                        return ReadOutcome::Disconnected;
                    }
                }
                EditStep::Submit(line) => {
                    if write_flush(writer, LINE_TERMINATOR.as_bytes()).await.is_err() {
                        return ReadOutcome::Disconnected;
                    }
                    return ReadOutcome::Line(line);
                }
            }
        }
    }

    fn feed_multibyte(&mut self, byte: u8) -> EditStep {
        self.pending.push(byte);
        match std::str::from_utf8(&self.pending) {
            Ok(decoded) => {
                let decoded = decoded.to_string();
                self.pending.clear();
                if decoded.chars().any(char::is_control) {
                    return EditStep::Ignored;
                }
                self.insert(&decoded)
            }
            Err(error) if error.error_len().is_some() => {
                self.pending.clear();
                if (0xc2..=0xf4).contains(&byte) {
                    self.pending.push(byte);
                }
                EditStep::Ignored
            }
            Err(_) => {
                if self.pending.len() >= MAX_UTF8_LEN {
                    self.pending.clear();
                }
                EditStep::Ignored
            }
        }
    }

    fn insert(&mut self, text: &str) -> EditStep {
        if self.buffer.len() + text.len() > MAX_LINE_BYTES {
            return EditStep::Ignored;
        }
        self.buffer.push_str(text);
        if self.echo {
            EditStep::Echo(text.to_string())
        } else {
            EditStep::Ignored
        }
    }

    fn erase_last(&mut self) -> EditStep {
        let Some((index, cells)) = self
            .buffer
            .grapheme_indices(true)
            .next_back()
            .map(|(index, grapheme)| (index, grapheme.width().max(1)))
        else {
            return EditStep::Ignored;
        };

        self.buffer.truncate(index);
        if self.echo {
            EditStep::Echo(ERASE_CELL.repeat(cells))
        } else {
            EditStep::Ignored
        }
    }
}

async fn write_flush<W>(writer: &mut W, bytes: &[u8]) -> io::Result<()>
where
    W: AsyncWrite + Unpin,
{
    writer.write_all(bytes).await?;
    writer.flush().await
}
