//! Compressed radix trie.
//!
//! One trie per HTTP method indexes every registered pattern. Edges carry
//! byte strings, not single characters; static edges are dispatched through
//! a parallel `indices` byte list while wildcard edges (`:name`, `*name`)
//! hang off their parent as its only child. Sibling order encodes priority
//! (the number of handlers in each subtree) so the hottest branches are
//! probed first.
//!
//! Node paths are raw bytes: splitting an edge at the divergence point of
//! two patterns may cut a multi-byte UTF-8 sequence in half, and only a
//! full root-to-leaf walk is guaranteed to reassemble valid UTF-8.

use darter_core::Params;

use crate::error::RouteError;

/// Number of wildcard segments (`:` and `*`) in a pattern.
pub(crate) fn count_params(path: &str) -> usize {
    path.bytes().filter(|&b| b == b':' || b == b'*').count()
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum NodeKind {
    Static,
    Root,
    Param,
    CatchAll,
}

/// Result of a route lookup.
#[derive(Debug)]
pub struct Lookup<'n, T> {
    /// The matched handler, if any.
    pub handler: Option<&'n T>,
    /// Captured parameters; present iff the caller asked for capture and
    /// the walk reached at least one wildcard segment.
    pub params: Option<Params>,
    /// Trailing-slash recommendation: no handler matched, but one would if
    /// a single trailing `/` were added to or removed from the path.
    pub tsr: bool,
}

pub(crate) struct Node<T> {
    path: Vec<u8>,
    wild_child: bool,
    kind: NodeKind,
    indices: Vec<u8>,
    children: Vec<Node<T>>,
    handler: Option<T>,
    priority: u32,
    full_path: String,
}

impl<T> Default for Node<T> {
    fn default() -> Self {
        Self {
            path: Vec::new(),
            wild_child: false,
            kind: NodeKind::Static,
            indices: Vec::new(),
            children: Vec::new(),
            handler: None,
            priority: 0,
            full_path: String::new(),
        }
    }
}

fn longest_common_prefix(a: &[u8], b: &[u8]) -> usize {
    let max = a.len().min(b.len());
    let mut i = 0;
    while i < max && a[i] == b[i] {
        i += 1;
    }
    i
}

/// Locate the next wildcard segment. Returns its start offset, the segment
/// itself, and whether it is valid (exactly one `:`/`*` in the segment).
fn find_wildcard(path: &[u8]) -> Option<(usize, &[u8], bool)> {
    for (start, &c) in path.iter().enumerate() {
        if c != b':' && c != b'*' {
            continue;
        }
        let mut valid = true;
        for (off, &c2) in path[start + 1..].iter().enumerate() {
            match c2 {
                b'/' => return Some((start, &path[start..start + 1 + off], valid)),
                b':' | b'*' => valid = false,
                _ => {}
            }
        }
        return Some((start, &path[start..], valid));
    }
    None
}

impl<T> Node<T> {
    /// Bump the priority of the child at `pos` and bubble it towards the
    /// front of the sibling list while it outranks its left neighbor.
    /// Returns the child's new position.
    fn increment_child_prio(&mut self, pos: usize) -> usize {
        self.children[pos].priority += 1;
        let priority = self.children[pos].priority;

        let mut new_pos = pos;
        while new_pos > 0 && self.children[new_pos - 1].priority < priority {
            self.children.swap(new_pos - 1, new_pos);
            self.indices.swap(new_pos - 1, new_pos);
            new_pos -= 1;
        }
        new_pos
    }

    /// Register a handler for `path`, creating, splitting and re-ranking
    /// nodes as needed.
    pub(crate) fn add_route(&mut self, path: &str, handler: T) -> Result<(), RouteError> {
        let full_path = path;
        self.priority += 1;

        // Empty tree
        if self.path.is_empty() && self.indices.is_empty() {
            self.insert_child(path.as_bytes(), full_path, handler)?;
            self.kind = NodeKind::Root;
            return Ok(());
        }

        let mut remaining: &[u8] = path.as_bytes();
        let mut n: &mut Node<T> = self;

        'walk: loop {
            let lcp = longest_common_prefix(remaining, &n.path);

            // Split the edge at the divergence point. The old suffix keeps
            // the node's children and handler; the shared prefix stays.
            if lcp < n.path.len() {
                let split_byte = n.path[lcp];
                let child = Node {
                    path: n.path[lcp..].to_vec(),
                    wild_child: n.wild_child,
                    kind: NodeKind::Static,
                    indices: std::mem::take(&mut n.indices),
                    children: std::mem::take(&mut n.children),
                    handler: n.handler.take(),
                    priority: n.priority - 1,
                    full_path: std::mem::take(&mut n.full_path),
                };
                n.children = vec![child];
                n.indices = vec![split_byte];
                n.path.truncate(lcp);
                n.wild_child = false;
            }

            // Descend with what is left of the pattern.
            if lcp < remaining.len() {
                remaining = &remaining[lcp..];

                if n.wild_child {
                    n = &mut n.children[0];
                    n.priority += 1;

                    // The existing wildcard must cover the next segment of
                    // the new pattern exactly.
                    if remaining.len() >= n.path.len()
                        && n.path.as_slice() == &remaining[..n.path.len()]
                        && n.kind != NodeKind::CatchAll
                        && (n.path.len() >= remaining.len() || remaining[n.path.len()] == b'/')
                    {
                        continue 'walk;
                    }

                    let path_seg = if n.kind == NodeKind::CatchAll {
                        remaining
                    } else {
                        let end = remaining
                            .iter()
                            .position(|&c| c == b'/')
                            .unwrap_or(remaining.len());
                        &remaining[..end]
                    };
                    let seg = String::from_utf8_lossy(path_seg).into_owned();
                    let wildcard = String::from_utf8_lossy(&n.path).into_owned();
                    let prefix = full_path.find(&seg).map_or_else(
                        || wildcard.clone(),
                        |pos| format!("{}{}", &full_path[..pos], wildcard),
                    );
                    return Err(RouteError::conflict(
                        full_path,
                        format!(
                            "'{seg}' conflicts with existing wildcard '{wildcard}' in existing prefix '{prefix}'"
                        ),
                    ));
                }

                let idxc = remaining[0];

                // '/' after a parameter: descend into the only child.
                if n.kind == NodeKind::Param && idxc == b'/' && n.children.len() == 1 {
                    n = &mut n.children[0];
                    n.priority += 1;
                    continue 'walk;
                }

                // Static child with a matching first byte?
                if let Some(pos) = n.indices.iter().position(|&c| c == idxc) {
                    let pos = n.increment_child_prio(pos);
                    n = &mut n.children[pos];
                    continue 'walk;
                }

                // Append a new static leaf for everything but wildcards.
                if idxc != b':' && idxc != b'*' {
                    n.indices.push(idxc);
                    n.children.push(Node {
                        full_path: full_path.to_string(),
                        ..Node::default()
                    });
                    let pos = n.increment_child_prio(n.indices.len() - 1);
                    n = &mut n.children[pos];
                }
                return n.insert_child(remaining, full_path, handler);
            }

            // The pattern ends at this node.
            if n.handler.is_some() {
                return Err(RouteError::conflict(
                    full_path,
                    "a handler is already registered for this path",
                ));
            }
            n.handler = Some(handler);
            n.full_path = full_path.to_string();
            return Ok(());
        }
    }

    /// Write the remaining pattern below this node, materializing wildcard
    /// nodes along the way.
    fn insert_child(&mut self, path: &[u8], full_path: &str, handler: T) -> Result<(), RouteError> {
        let mut path = path;
        let mut n: &mut Node<T> = self;

        loop {
            let Some((start, wildcard, valid)) = find_wildcard(path) else {
                break;
            };

            if !valid {
                return Err(RouteError::bad_pattern(
                    full_path,
                    format!(
                        "only one wildcard per path segment is allowed, has: '{}'",
                        String::from_utf8_lossy(wildcard)
                    ),
                ));
            }
            if wildcard.len() < 2 {
                return Err(RouteError::bad_pattern(
                    full_path,
                    "wildcards must be named with a non-empty name",
                ));
            }
            if !n.children.is_empty() {
                return Err(RouteError::conflict(
                    full_path,
                    format!(
                        "wildcard segment '{}' conflicts with existing children",
                        String::from_utf8_lossy(wildcard)
                    ),
                ));
            }

            if wildcard[0] == b':' {
                // Named parameter
                if start > 0 {
                    n.path = path[..start].to_vec();
                    path = &path[start..];
                }

                n.wild_child = true;
                n.children = vec![Node {
                    path: wildcard.to_vec(),
                    kind: NodeKind::Param,
                    full_path: full_path.to_string(),
                    ..Node::default()
                }];
                n = &mut n.children[0];
                n.priority += 1;

                // The pattern continues past this parameter: chain another
                // node for the rest and keep scanning for wildcards.
                if wildcard.len() < path.len() {
                    path = &path[wildcard.len()..];
                    n.children = vec![Node {
                        priority: 1,
                        full_path: full_path.to_string(),
                        ..Node::default()
                    }];
                    n = &mut n.children[0];
                    continue;
                }

                n.handler = Some(handler);
                n.full_path = full_path.to_string();
                return Ok(());
            }

            // Catch-all
            if start + wildcard.len() != path.len() {
                return Err(RouteError::bad_pattern(
                    full_path,
                    "catch-all routes are only allowed at the end of the path",
                ));
            }
            if !n.path.is_empty() && n.path.last() == Some(&b'/') {
                return Err(RouteError::conflict(
                    full_path,
                    "catch-all conflicts with existing handler for the path segment root",
                ));
            }
            if start == 0 || path[start - 1] != b'/' {
                return Err(RouteError::bad_pattern(full_path, "no / before catch-all"));
            }

            let slash = start - 1;
            n.path = path[..slash].to_vec();

            // First node: empty-path catch-all marker below the '/'.
            n.indices = vec![b'/'];
            n.children = vec![Node {
                wild_child: true,
                kind: NodeKind::CatchAll,
                full_path: full_path.to_string(),
                ..Node::default()
            }];
            n = &mut n.children[0];
            n.priority += 1;

            // Second node: holds the variable and the handler.
            n.children = vec![Node {
                path: path[slash..].to_vec(),
                kind: NodeKind::CatchAll,
                handler: Some(handler),
                priority: 1,
                full_path: full_path.to_string(),
                ..Node::default()
            }];
            return Ok(());
        }

        // No wildcard left: store the remaining path and the handler.
        n.path = path.to_vec();
        n.handler = Some(handler);
        n.full_path = full_path.to_string();
        Ok(())
    }

    /// Walk the trie with a request path.
    ///
    /// The parameter buffer is acquired lazily through `get_params`, only
    /// when the walk reaches its first wildcard segment; passing `None`
    /// skips capture entirely (used for `Allow` probing).
    pub(crate) fn get_value<'n>(
        &'n self,
        path: &str,
        get_params: Option<&dyn Fn() -> Params>,
    ) -> Lookup<'n, T> {
        let mut n = self;
        let mut path: &[u8] = path.as_bytes();
        let mut params: Option<Params> = None;

        'walk: loop {
            let prefix: &[u8] = &n.path;
            if path.len() > prefix.len() && &path[..prefix.len()] == prefix {
                path = &path[prefix.len()..];

                // No wildcard below: dispatch on the next byte.
                if !n.wild_child {
                    let idxc = path[0];
                    if let Some(pos) = n.indices.iter().position(|&c| c == idxc) {
                        n = &n.children[pos];
                        continue 'walk;
                    }

                    // Nothing found. Recommend the same URL without the
                    // trailing slash if a leaf exists for that path.
                    let tsr = path == &b"/"[..] && n.handler.is_some();
                    return Lookup {
                        handler: None,
                        params,
                        tsr,
                    };
                }

                n = &n.children[0];
                match n.kind {
                    NodeKind::Param => {
                        let end = path.iter().position(|&c| c == b'/').unwrap_or(path.len());

                        if let Some(get) = get_params {
                            let buf = params.get_or_insert_with(get);
                            buf.push(
                                &String::from_utf8_lossy(&n.path[1..]),
                                &String::from_utf8_lossy(&path[..end]),
                            );
                        }

                        if end < path.len() {
                            if !n.children.is_empty() {
                                path = &path[end..];
                                n = &n.children[0];
                                continue 'walk;
                            }

                            // ... but we can't go deeper.
                            let tsr = path.len() == end + 1;
                            return Lookup {
                                handler: None,
                                params,
                                tsr,
                            };
                        }

                        if n.handler.is_some() {
                            return Lookup {
                                handler: n.handler.as_ref(),
                                params,
                                tsr: false,
                            };
                        }
                        if n.children.len() == 1 {
                            // No handler here; a trailing-slash variant may
                            // exist one level down.
                            let child = &n.children[0];
                            let tsr = (child.path == b"/" && child.handler.is_some())
                                || (child.path.is_empty() && child.indices == [b'/']);
                            return Lookup {
                                handler: None,
                                params,
                                tsr,
                            };
                        }
                        return Lookup {
                            handler: None,
                            params,
                            tsr: false,
                        };
                    }
                    NodeKind::CatchAll => {
                        if let Some(get) = get_params {
                            let buf = params.get_or_insert_with(get);
                            buf.push(
                                &String::from_utf8_lossy(&n.path[2..]),
                                &String::from_utf8_lossy(path),
                            );
                        }
                        return Lookup {
                            handler: n.handler.as_ref(),
                            params,
                            tsr: false,
                        };
                    }
                    NodeKind::Static | NodeKind::Root => {
                        debug_assert!(false, "wildcard child with a non-wildcard kind");
                        return Lookup {
                            handler: None,
                            params,
                            tsr: false,
                        };
                    }
                }
            } else if path == prefix {
                // The walk consumed the path exactly at this node.
                if n.handler.is_some() {
                    return Lookup {
                        handler: n.handler.as_ref(),
                        params,
                        tsr: false,
                    };
                }

                // No handler, but a wildcard child means a handler exists
                // for this path with an extra trailing slash.
                if path == &b"/"[..] && n.wild_child && n.kind != NodeKind::Root {
                    return Lookup {
                        handler: None,
                        params,
                        tsr: true,
                    };
                }
                if path == &b"/"[..] && n.kind == NodeKind::Static {
                    return Lookup {
                        handler: None,
                        params,
                        tsr: true,
                    };
                }

                if let Some(pos) = n.indices.iter().position(|&c| c == b'/') {
                    let child = &n.children[pos];
                    let tsr = (child.path.len() == 1 && child.handler.is_some())
                        || (child.kind == NodeKind::CatchAll
                            && child.children.first().is_some_and(|c| c.handler.is_some()));
                    return Lookup {
                        handler: None,
                        params,
                        tsr,
                    };
                }

                return Lookup {
                    handler: None,
                    params,
                    tsr: false,
                };
            }

            // Nothing matches. Recommend the same URL with an extra
            // trailing slash if a leaf exists for that path.
            let tsr = path == &b"/"[..]
                || (prefix.len() == path.len() + 1
                    && prefix[path.len()] == b'/'
                    && path == &prefix[..prefix.len() - 1]
                    && n.handler.is_some());
            return Lookup {
                handler: None,
                params,
                tsr,
            };
        }
    }

    /// Reconstruct a registered pattern that matches `path` under Unicode
    /// simple case folding, taking the canonical case from the registered
    /// patterns. Parameter and catch-all captures are copied verbatim,
    /// never folded. With `fix_trailing_slash` the match may also add or
    /// drop a single trailing `/`.
    pub(crate) fn find_case_insensitive(
        &self,
        path: &str,
        fix_trailing_slash: bool,
    ) -> Option<String> {
        let mut out = Vec::with_capacity(path.len() + 1);
        if self.find_ci_rec(path, FoldCursor::new(), fix_trailing_slash, &mut out) {
            String::from_utf8(out).ok()
        } else {
            None
        }
    }

    fn find_ci_rec(
        &self,
        input: &str,
        cursor: FoldCursor,
        fix_trailing_slash: bool,
        out: &mut Vec<u8>,
    ) -> bool {
        let checkpoint = out.len();
        let before = cursor;
        let mut cursor = cursor;

        if !cursor.feed(input, &self.path) {
            // The node's fragment does not fold-match the remaining input.
            if fix_trailing_slash && before.pending_len == 0 {
                let rest = before.remaining(input);
                // Recommend dropping a lone trailing slash; only a node
                // that continues below the '/' qualifies.
                if rest == "/" && self.path.first() == Some(&b'/') {
                    return true;
                }
                // Recommend adding one when the node continues with
                // exactly `rest` plus '/' and carries a handler.
                if self.handler.is_some() && self.path.last() == Some(&b'/') {
                    if let Ok(frag) = std::str::from_utf8(&self.path) {
                        if eq_fold(&frag[..frag.len() - 1], rest) {
                            out.extend_from_slice(&self.path);
                            return true;
                        }
                    }
                }
            }
            out.truncate(checkpoint);
            return false;
        }

        out.extend_from_slice(&self.path);

        if cursor.pending_len == 0 && cursor.remaining(input).is_empty() {
            // Input exhausted at this node.
            if self.handler.is_some() {
                return true;
            }
            // Recommend the same path with a trailing slash appended.
            if fix_trailing_slash {
                if let Some(pos) = self.indices.iter().position(|&c| c == b'/') {
                    let child = &self.children[pos];
                    if (child.path == b"/" && child.handler.is_some())
                        || (child.kind == NodeKind::CatchAll
                            && child.children.first().is_some_and(|c| c.handler.is_some()))
                    {
                        out.push(b'/');
                        return true;
                    }
                }
            }
            out.truncate(checkpoint);
            return false;
        }

        if self.wild_child {
            let child = &self.children[0];
            match child.kind {
                NodeKind::Param => {
                    let rest = cursor.remaining(input);
                    let end = rest.find('/').unwrap_or(rest.len());

                    // Copy the captured value verbatim.
                    out.extend_from_slice(rest[..end].as_bytes());

                    if end < rest.len() {
                        if let Some(grandchild) = child.children.first() {
                            let mut next = cursor;
                            next.pos += end;
                            if grandchild.find_ci_rec(input, next, fix_trailing_slash, out) {
                                return true;
                            }
                        } else if fix_trailing_slash && rest.len() == end + 1 {
                            // Only a lone trailing slash is left over.
                            return true;
                        }
                        out.truncate(checkpoint);
                        return false;
                    }

                    if child.handler.is_some() {
                        return true;
                    }
                    if fix_trailing_slash && child.children.len() == 1 {
                        let grandchild = &child.children[0];
                        if grandchild.path == b"/" && grandchild.handler.is_some() {
                            out.push(b'/');
                            return true;
                        }
                    }
                    out.truncate(checkpoint);
                    false
                }
                NodeKind::CatchAll => {
                    out.extend_from_slice(cursor.remaining(input).as_bytes());
                    true
                }
                NodeKind::Static | NodeKind::Root => {
                    debug_assert!(false, "wildcard child with a non-wildcard kind");
                    out.truncate(checkpoint);
                    false
                }
            }
        } else {
            // Both case variants of the next character may exist as
            // children, so every candidate is probed.
            for child in &self.children {
                if child.find_ci_rec(input, cursor, fix_trailing_slash, out) {
                    return true;
                }
            }

            // No child continues the walk. Recommend dropping the trailing
            // slash if this node itself holds a handler.
            if fix_trailing_slash && cursor.remaining(input) == "/" && self.handler.is_some() {
                return true;
            }
            out.truncate(checkpoint);
            false
        }
    }
}

// ----------------------------------------------------------------------
// Case folding
// ----------------------------------------------------------------------

/// Unicode simple lowercase mapping: one char in, one char out.
/// Multi-char expansions (e.g. `İ`) are left unmapped.
fn to_lower_simple(c: char) -> char {
    let mut lower = c.to_lowercase();
    match (lower.next(), lower.next()) {
        (Some(l), None) => l,
        _ => c,
    }
}

/// Unicode simple uppercase mapping, same contract as [`to_lower_simple`].
fn to_upper_simple(c: char) -> char {
    let mut upper = c.to_uppercase();
    match (upper.next(), upper.next()) {
        (Some(u), None) => u,
        _ => c,
    }
}

fn fold_eq(a: char, b: char) -> bool {
    a == b || to_lower_simple(a) == to_lower_simple(b) || to_upper_simple(a) == to_upper_simple(b)
}

fn eq_fold(a: &str, b: &str) -> bool {
    let mut a = a.chars();
    let mut b = b.chars();
    loop {
        match (a.next(), b.next()) {
            (None, None) => return true,
            (Some(x), Some(y)) if fold_eq(x, y) => {}
            _ => return false,
        }
    }
}

/// Streaming fold-comparator between the input path and trie fragments.
///
/// Trie edges may split a multi-byte sequence, so fragment bytes are
/// collected in `pending` until a full character is available, which is
/// then fold-compared against the next input character. The state is
/// `Copy`, letting the case-insensitive walk branch cheaply.
#[derive(Clone, Copy)]
struct FoldCursor {
    /// Byte offset into the input path; always on a char boundary.
    pos: usize,
    /// Bytes of a partially consumed trie-side character.
    pending: [u8; 4],
    pending_len: u8,
}

impl FoldCursor {
    fn new() -> Self {
        Self {
            pos: 0,
            pending: [0; 4],
            pending_len: 0,
        }
    }

    fn remaining<'a>(&self, input: &'a str) -> &'a str {
        &input[self.pos..]
    }

    /// Consume a trie fragment, fold-comparing completed characters
    /// against the input. Returns false on the first mismatch.
    fn feed(&mut self, input: &str, fragment: &[u8]) -> bool {
        for &byte in fragment {
            if usize::from(self.pending_len) >= self.pending.len() {
                return false;
            }
            self.pending[usize::from(self.pending_len)] = byte;
            self.pending_len += 1;

            match std::str::from_utf8(&self.pending[..usize::from(self.pending_len)]) {
                Ok(s) => {
                    let Some(trie_char) = s.chars().next() else {
                        return false;
                    };
                    let Some(input_char) = input[self.pos..].chars().next() else {
                        return false;
                    };
                    if !fold_eq(trie_char, input_char) {
                        return false;
                    }
                    self.pos += input_char.len_utf8();
                    self.pending_len = 0;
                }
                // Incomplete sequence: wait for the next byte.
                Err(e) if e.error_len().is_none() => {}
                Err(_) => return false,
            }
        }
        true
    }
}
