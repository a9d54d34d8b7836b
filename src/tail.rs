//! Tail reader: last non-empty, ANSI-stripped line of a file (spec.md §4.6).
//!
//! Scans backwards from end-of-file one byte at a time, bounded by a byte
//! budget, so very large logs stay cheap to tail. Never raises: any I/O or
//! decode failure yields an empty string.

use std::fs::File;
use std::io::{Read, Seek, SeekFrom};

/// Default byte budget for a backwards scan (spec.md §4.6).
pub const DEFAULT_MAX_BYTES: u64 = 1000;

/// Read the last non-empty, ANSI-stripped line from an open file handle.
///
/// `file` is repositioned as a side effect; callers that need to keep
/// reading forward afterwards should reopen or re-seek.
pub fn last_line(file: &mut File, max_bytes: u64) -> String {
    last_line_inner(file, max_bytes).unwrap_or_default()
}

fn last_line_inner(file: &mut File, max_bytes: u64) -> Option<String> {
    let end = file.seek(SeekFrom::End(0)).ok()?;
    if end == 0 {
        return Some(String::new());
    }

    let mut pos = end;
    let mut scanned: u64 = 0;
    let mut buf = [0u8; 1];

    // Walk backwards over trailing line terminators first, so a file ending
    // in "...line\n\n" still returns "line", not "".
    loop {
        if pos == 0 || scanned >= max_bytes {
            break;
        }
        pos -= 1;
        scanned += 1;
        file.seek(SeekFrom::Start(pos)).ok()?;
        file.read_exact(&mut buf).ok()?;
        if buf[0] != b'\n' && buf[0] != b'\r' {
            pos += 1; // step back onto the non-terminator byte
            break;
        }
    }
    let line_end = pos;

    // Now walk backwards over the line's content until a terminator or BOF.
    loop {
        if pos == 0 || scanned >= max_bytes {
            break;
        }
        pos -= 1;
        scanned += 1;
        file.seek(SeekFrom::Start(pos)).ok()?;
        file.read_exact(&mut buf).ok()?;
        if buf[0] == b'\n' || buf[0] == b'\r' {
            pos += 1;
            break;
        }
    }
    let line_start = pos;

    if line_start >= line_end {
        return Some(String::new());
    }

    file.seek(SeekFrom::Start(line_start)).ok()?;
    let mut raw = vec![0u8; (line_end - line_start) as usize];
    file.read_exact(&mut raw).ok()?;

    let stripped = strip_ansi(&raw);
    Some(String::from_utf8_lossy(&stripped).trim().to_string())
}

/// Strip ANSI CSI sequences (cursor movement, color, erase) from a byte
/// slice with a manual byte scanner, so this crate does not need a regex
/// dependency for one helper.
pub fn strip_ansi(input: &[u8]) -> Vec<u8> {
    let mut out = Vec::with_capacity(input.len());
    let mut i = 0;
    while i < input.len() {
        if input[i] == 0x1B && i + 1 < input.len() && input[i + 1] == b'[' {
            let mut j = i + 2;
            while j < input.len() && !input[j].is_ascii_alphabetic() {
                j += 1;
            }
            if j < input.len() {
                j += 1; // consume the final letter (m, K, H, G, F, l, h, ...)
            }
            i = j;
        } else {
            out.push(input[i]);
            i += 1;
        }
    }
    out
}
