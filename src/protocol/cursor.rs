//! Sticky-failure cursor over a message payload
//!
//! The cursor is a two-state machine: it stays `Live` while reads succeed and
//! moves to `Failed` on the first read that runs past the buffer or misses a
//! NUL terminator. `Failed` is absorbing: every later read is a no-op that
//! returns a zero value and touches no memory. Callers can therefore issue a
//! run of reads and check [`Cursor::is_failed`] once per checkpoint.

use log::trace;

/// Cursor state
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum State {
    Live,
    Failed,
}

/// Sequential reader over a borrowed byte buffer
#[derive(Debug, Clone)]
pub struct Cursor<'a> {
    buf: &'a [u8],
    offset: usize,
    state: State,
    last_string_start: usize,
}

impl<'a> Cursor<'a> {
    /// Wrap `buf` with the read position at 0
    pub fn new(buf: &'a [u8]) -> Self {
        Self {
            buf,
            offset: 0,
            state: State::Live,
            last_string_start: 0,
        }
    }

    /// Read a big-endian `u32`
    ///
    /// Fails the cursor and returns 0 if fewer than 4 bytes remain.
    pub fn read_u32(&mut self) -> u32 {
        if self.is_failed() {
            return 0;
        }

        match self.buf.get(self.offset..self.offset + 4) {
            Some(&[a, b, c, d]) => {
                self.offset += 4;
                u32::from_be_bytes([a, b, c, d])
            }
            _ => {
                trace!("read_u32 at offset {} past end of {} bytes", self.offset, self.buf.len());
                self.fail();
                0
            }
        }
    }

    /// Read a NUL-terminated byte string, without the terminator
    ///
    /// Reading exactly at the end of the buffer yields an empty slice and
    /// does not fail. A string missing its terminator fails the cursor,
    /// returns the partial bytes and leaves the offset at the end.
    pub fn read_cstr(&mut self) -> &'a [u8] {
        if self.is_failed() {
            return &[];
        }

        self.last_string_start = self.offset;
        let start = self.offset;
        let len = self.buf.len();

        if start == len {
            return &[];
        }
        if start > len {
            self.fail();
            return &[];
        }

        let rest = &self.buf[start..];
        match rest.iter().position(|&b| b == 0) {
            Some(nul) => {
                self.offset = start + nul + 1;
                &rest[..nul]
            }
            None => {
                trace!("read_cstr at offset {}: missing NUL terminator", start);
                self.fail();
                self.offset = len;
                rest
            }
        }
    }

    /// Whether the last string read consumed exactly one NUL byte
    ///
    /// That is how the empty string terminating a parameter list shows up.
    pub fn consumed_terminator(&self) -> bool {
        self.offset > 0
            && self.offset - 1 == self.last_string_start
            && self.buf.get(self.offset - 1) == Some(&0)
    }

    /// Current read position
    pub fn offset(&self) -> usize {
        self.offset
    }

    /// Bytes left after the read position
    pub fn remaining(&self) -> usize {
        self.buf.len().saturating_sub(self.offset)
    }

    /// Start offset of the most recent string read
    pub fn last_string_start(&self) -> usize {
        self.last_string_start
    }

    /// Whether the cursor has entered the failed state
    pub fn is_failed(&self) -> bool {
        self.state == State::Failed
    }

    /// Whether the read position sits exactly at the end of the buffer
    pub fn at_end(&self) -> bool {
        self.offset == self.buf.len()
    }

    fn fail(&mut self) {
        self.state = State::Failed;
    }
}
