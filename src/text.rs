//! Plain-text protocol
//!
//! Plain-text messages may carry a `UPPER:` or `REVERSE:` prefix selecting a
//! transform of the remainder. Independently of the prefix, every non-empty
//! plain-text reply is decorated with the next value of the shared
//! [`MessageCounter`]: `"[Msg #<n>] <text>"`.

use std::borrow::Cow;
use std::sync::atomic::{ AtomicU64, Ordering };

/// Prefix selecting the uppercase transform
pub const UPPER_PREFIX: &str = "UPPER:";
/// Prefix selecting the reverse transform
pub const REVERSE_PREFIX: &str = "REVERSE:";

/// Process-wide message counter shared by every session
#[derive(Debug, Default)]
pub struct MessageCounter {
    value: AtomicU64,
}

impl MessageCounter {
    /// Create a counter starting at zero; the first call to [`next`](Self::next) yields 1
    pub fn new() -> Self {
        Self::default()
    }

    /// Atomically increment and return the post-increment value
    pub fn next(&self) -> u64 {
        self.value.fetch_add(1, Ordering::SeqCst) + 1
    }

    /// The last value handed out
    pub fn current(&self) -> u64 {
        self.value.load(Ordering::SeqCst)
    }
}

/// Reverse a string by code point
pub fn reverse_chars(s: &str) -> String {
    s.chars().rev().collect()
}

/// Apply the prefix transform selected by the message, if any
pub fn apply_prefix(message: &str) -> Cow<'_, str> {
    if let Some(rest) = message.strip_prefix(UPPER_PREFIX) {
        return Cow::Owned(rest.to_uppercase());
    }
    if let Some(rest) = message.strip_prefix(REVERSE_PREFIX) {
        return Cow::Owned(reverse_chars(rest));
    }
    Cow::Borrowed(message)
}

/// Build the reply for a plain-text message
///
/// The empty message is echoed back as-is and does not consume a counter value.
pub fn transform_text(message: &str, counter: &MessageCounter) -> String {
    let text = apply_prefix(message);

    if message.is_empty() {
        return text.into_owned();
    }

    format!("[Msg #{}] {}", counter.next(), text)
}
