use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

/// Reply generator: receives the 1-based call count of its stub.
pub type ReplyFn = dyn Fn(u64) -> Vec<u8> + Send + Sync;

enum Reply {
    Fixed(Vec<u8>),
    Computed(Box<ReplyFn>),
}

/// A shared stub; the endpoint and the test hold the same counter.
pub type StubHandle = Arc<Stub>;

/// Maps a byte prefix to a reply.
///
/// An empty reply still counts as a match: the matched bytes are consumed
/// and nothing is written back.
pub struct Stub {
    prefix: Vec<u8>,
    reply: Reply,
    calls: AtomicU64,
}

impl Stub {
    /// Answer `prefix` with the same bytes every time.
    pub fn fixed(prefix: impl Into<Vec<u8>>, reply: impl Into<Vec<u8>>) -> Self {
        Self {
            prefix: prefix.into(),
            reply: Reply::Fixed(reply.into()),
            calls: AtomicU64::new(0),
        }
    }

    /// Answer `prefix` with whatever `reply` returns for the current call count.
    pub fn with_fn(
        prefix: impl Into<Vec<u8>>,
        reply: impl Fn(u64) -> Vec<u8> + Send + Sync + 'static,
    ) -> Self {
        Self {
            prefix: prefix.into(),
            reply: Reply::Computed(Box::new(reply)),
            calls: AtomicU64::new(0),
        }
    }

    /// Consume `prefix` silently.
    pub fn silent(prefix: impl Into<Vec<u8>>) -> Self {
        Self::fixed(prefix, Vec::new())
    }

    pub fn prefix(&self) -> &[u8] {
        &self.prefix
    }

    /// True if `buffer` starts with this stub's prefix. An empty prefix never matches.
    pub fn matches(&self, buffer: &[u8]) -> bool {
        !self.prefix.is_empty() && buffer.starts_with(&self.prefix)
    }

    /// Count a match and produce its reply.
    pub fn call(&self) -> Vec<u8> {
        let calls = self.calls.fetch_add(1, Ordering::AcqRel) + 1;
        match &self.reply {
            Reply::Fixed(bytes) => bytes.clone(),
            Reply::Computed(reply) => reply(calls),
        }
    }

    pub fn calls(&self) -> u64 {
        self.calls.load(Ordering::Acquire)
    }

    pub fn called(&self) -> bool {
        self.calls() > 0
    }
}

impl fmt::Display for Stub {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} => ", self.prefix.escape_ascii())?;
        match &self.reply {
            Reply::Fixed(bytes) => write!(f, "{}", bytes.escape_ascii()),
            Reply::Computed(_) => f.write_str("fn()"),
        }
    }
}

impl fmt::Debug for Stub {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Stub")
            .field("stub", &format_args!("{self}"))
            .field("calls", &self.calls())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fixed_reply_counts_calls() {
        let stub = Stub::fixed(*b"[ver]", *b"[v\x00\x65]");
        assert!(!stub.called());

        assert_eq!(stub.call(), b"[v\x00\x65]");
        assert_eq!(stub.call(), b"[v\x00\x65]");
        assert_eq!(stub.calls(), 2);
        assert!(stub.called());
    }

    #[test]
    fn computed_reply_sees_call_count() {
        let stub = Stub::with_fn(*b"[rdA]", |calls| vec![b'[', b'A', 0, calls as u8, b']']);

        assert_eq!(stub.call(), b"[A\x00\x01]");
        assert_eq!(stub.call(), b"[A\x00\x02]");
    }

    #[test]
    fn matching_is_by_prefix() {
        let stub = Stub::silent(*b"[A");
        assert!(stub.matches(b"[A\x00\x00]"));
        assert!(!stub.matches(b"["));
        assert!(!stub.matches(b"x[A"));
        assert!(!Stub::silent(Vec::new()).matches(b"anything"));
    }

    #[test]
    fn display_shows_prefix_and_reply() {
        let fixed = Stub::fixed(*b"[ver]", *b"[v\x00e]");
        assert_eq!(fixed.to_string(), "[ver] => [v\\x00e]");

        let computed = Stub::with_fn(*b"[rdv]", |_| Vec::new());
        assert_eq!(computed.to_string(), "[rdv] => fn()");
    }
}
