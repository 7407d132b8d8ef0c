//! Merging injected directives into an ingress-nginx configuration snippet.
//!
//! The snippet annotation may already hold content written by operators or
//! other controllers, so merging is append-only: foreign content is kept
//! verbatim and injected directives follow it. The block appended by the
//! previous reconcile is recorded in a separate annotation so that it can be
//! replaced rather than appended a second time.

use crate::Directive;

pub const SNIPPET_ANNOTATION: &str = "nginx.ingress.kubernetes.io/configuration-snippet";

/// Records the exact block most recently appended to the snippet.
pub const INJECTED_ANNOTATION: &str = "digitalist.cloud/injected-snippet";

/// The desired values of the snippet and injected-block annotations.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Merged {
    pub snippet: String,
    pub injected: String,
}

// === impl Merged ===

impl Merged {
    /// Combines `directives` with the `current` snippet.
    ///
    /// `previous` is the block recorded by the last write, if any. When it is
    /// found in `current` it is removed before the new block is appended;
    /// everything else in `current` is preserved. Directives that already
    /// occupy a whole line of the foreign content are not repeated.
    pub fn new(current: Option<&str>, previous: Option<&str>, directives: &[Directive]) -> Self {
        let current = current.unwrap_or_default();
        let foreign = match previous.filter(|p| !p.is_empty()) {
            Some(block) => strip_last(current, block),
            None => current.to_string(),
        };
        let foreign = foreign.trim_end_matches('\n');

        let mut injected = String::new();
        for directive in directives {
            if foreign
                .lines()
                .any(|line| line.trim() == directive.as_str())
            {
                continue;
            }
            injected.push_str(directive.as_str());
            injected.push('\n');
        }

        let mut snippet = String::with_capacity(foreign.len() + injected.len() + 1);
        if !foreign.is_empty() {
            snippet.push_str(foreign);
            snippet.push('\n');
        }
        snippet.push_str(&injected);

        Self { snippet, injected }
    }

    /// Returns true if the annotations already hold these values.
    pub fn is_current(&self, snippet: Option<&str>, injected: Option<&str>) -> bool {
        snippet == Some(self.snippet.as_str())
            && injected.unwrap_or_default() == self.injected.as_str()
    }
}

fn strip_last(haystack: &str, block: &str) -> String {
    match haystack.rfind(block) {
        Some(idx) => {
            let mut out = String::with_capacity(haystack.len() - block.len());
            out.push_str(&haystack[..idx]);
            out.push_str(&haystack[idx + block.len()..]);
            out
        }
        None => haystack.to_string(),
    }
}
