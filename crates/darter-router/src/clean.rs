//! Lexical path cleaning.
//!
//! [`clean_path`] is the URL-path analogue of a filesystem `canonicalize`
//! without ever touching a filesystem: a single forward scan that collapses
//! `//`, resolves `.` and `..` elements, guarantees a leading `/` and keeps
//! a trailing `/` iff the input had one. The cleaned path is what the
//! router's fixed-path redirect feeds into the case-insensitive lookup.

use std::borrow::Cow;

/// Lexically canonicalize a URL path.
///
/// Applied rules, in order:
///
/// 1. Empty input becomes `"/"`.
/// 2. The output always begins with `/`.
/// 3. `//` collapses to `/`.
/// 4. `.` elements are dropped; a trailing `/.` keeps the trailing slash.
/// 5. `..` elements remove the previously written segment; `..` at the
///    root is dropped.
/// 6. A trailing `/` is preserved iff the input had one.
///
/// Already-clean input is returned borrowed; the output buffer is
/// materialized lazily on the first divergence, so the common case does
/// not allocate.
#[must_use]
pub fn clean_path(p: &str) -> Cow<'_, str> {
    if p.is_empty() {
        return Cow::Borrowed("/");
    }

    let s = p.as_bytes();
    let n = s.len();

    // While `buf` is None the output so far equals p[..w]; the first byte
    // that diverges copies that prefix and switches writes to the buffer.
    // Invariant: buf.len() == w whenever buf is Some.
    let mut buf: Option<Vec<u8>> = None;

    let mut r = 1; // next byte to read
    let mut w = 1; // next byte to write

    if s[0] != b'/' {
        r = 0;
        let mut b = Vec::with_capacity(n + 1);
        b.push(b'/');
        buf = Some(b);
    }

    let mut trailing = n > 1 && s[n - 1] == b'/';

    while r < n {
        if s[r] == b'/' {
            // Empty path element; a trailing slash is added at the end.
            r += 1;
        } else if s[r] == b'.' && r + 1 == n {
            trailing = true;
            r += 1;
        } else if s[r] == b'.' && s[r + 1] == b'/' {
            // "." element
            r += 2;
        } else if s[r] == b'.' && s[r + 1] == b'.' && (r + 2 == n || s[r + 2] == b'/') {
            // ".." element: remove up to the last '/'
            r += 3;
            if w > 1 {
                w -= 1;
                match &buf {
                    None => {
                        while w > 1 && s[w] != b'/' {
                            w -= 1;
                        }
                    }
                    Some(b) => {
                        while w > 1 && b[w] != b'/' {
                            w -= 1;
                        }
                    }
                }
                if let Some(b) = &mut buf {
                    b.truncate(w);
                }
            }
        } else {
            // Real path element: add a slash if this is not the first one.
            if w > 1 {
                buf_app(&mut buf, s, w, b'/');
                w += 1;
            }
            while r < n && s[r] != b'/' {
                buf_app(&mut buf, s, w, s[r]);
                w += 1;
                r += 1;
            }
        }
    }

    // Re-append the trailing slash.
    if trailing && w > 1 {
        buf_app(&mut buf, s, w, b'/');
        w += 1;
    }

    match buf {
        None => Cow::Borrowed(&p[..w]),
        // The buffer only ever holds bytes copied from the UTF-8 input
        // plus ASCII slashes, so this conversion cannot fail.
        Some(b) => Cow::Owned(String::from_utf8(b).unwrap_or_default()),
    }
}

/// Write byte `c` at output position `w`. While the output still mirrors
/// the input the write is a no-op; the first differing byte copies the
/// shared prefix into a fresh buffer.
fn buf_app(buf: &mut Option<Vec<u8>>, s: &[u8], w: usize, c: u8) {
    match buf {
        Some(b) => b.push(c),
        None => {
            if s[w] == c {
                return;
            }
            let mut b = Vec::with_capacity(s.len() + 1);
            b.extend_from_slice(&s[..w]);
            b.push(c);
            *buf = Some(b);
        }
    }
}
