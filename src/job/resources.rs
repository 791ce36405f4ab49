use std::path::Path;

use crate::error::{Result, RotorError};

/// Markup fragments stripped from every rendered message unless configured otherwise.
pub const DEFAULT_DISALLOWED_FRAGMENTS: &[&str] = &["<b>", "</b>", ">/<B>"];

/// The three cyclic lists a job rotates through, plus the optional
/// prefix/suffix wrapped around every message.
///
/// Immutable once built. Credential invalidation is tracked by
/// [`CredentialPool`](super::CredentialPool), never by editing these lists.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResourceSet {
    credentials: Vec<String>,
    messages: Vec<String>,
    targets: Vec<String>,
    prefix: Option<String>,
    suffix: Option<String>,
}

impl ResourceSet {
    /// Build a resource set from already-split lists.
    ///
    /// Entries are trimmed and blank ones dropped; fails with
    /// [`RotorError::InvalidResources`] if any list ends up empty.
    pub fn new(
        credentials: Vec<String>,
        messages: Vec<String>,
        targets: Vec<String>,
        prefix: Option<String>,
        suffix: Option<String>,
    ) -> Result<Self> {
        let credentials = non_empty("credentials", clean(credentials))?;
        let messages = non_empty("messages", clean(messages))?;
        let targets = non_empty("targets", clean(targets))?;

        Ok(Self {
            credentials,
            messages,
            targets,
            prefix: trimmed(prefix),
            suffix: trimmed(suffix),
        })
    }

    /// Parse line-oriented text blobs. Targets additionally accept
    /// comma-separated ids on a single line.
    pub fn from_text(
        credentials: &str,
        messages: &str,
        targets: &str,
        prefix: Option<String>,
        suffix: Option<String>,
    ) -> Result<Self> {
        Self::new(
            split_lines(credentials),
            split_lines(messages),
            split_targets(targets),
            prefix,
            suffix,
        )
    }

    /// Read credentials and messages from files. `targets` is either a
    /// path to a file or an inline comma-separated list.
    pub fn from_files(
        credentials: &Path,
        messages: &Path,
        targets: &str,
        prefix: Option<String>,
        suffix: Option<String>,
    ) -> Result<Self> {
        let credentials = std::fs::read_to_string(credentials)?;
        let messages = std::fs::read_to_string(messages)?;
        let target_path = Path::new(targets);
        let targets = if target_path.is_file() {
            std::fs::read_to_string(target_path)?
        } else {
            targets.to_string()
        };

        Self::from_text(&credentials, &messages, &targets, prefix, suffix)
    }

    pub fn credentials(&self) -> &[String] {
        &self.credentials
    }

    pub fn messages(&self) -> &[String] {
        &self.messages
    }

    pub fn targets(&self) -> &[String] {
        &self.targets
    }

    /// Message for the given rotation sequence number.
    pub fn message_at(&self, sequence: u64) -> &str {
        at(&self.messages, sequence)
    }

    /// Target for the given rotation sequence number.
    pub fn target_at(&self, sequence: u64) -> &str {
        at(&self.targets, sequence)
    }

    /// Join `[prefix, message, suffix]` with single spaces, skipping empty
    /// parts, then strip every disallowed fragment.
    pub fn render<S: AsRef<str>>(&self, message: &str, disallowed: &[S]) -> String {
        let joined = [
            self.prefix.as_deref().unwrap_or(""),
            message.trim(),
            self.suffix.as_deref().unwrap_or(""),
        ]
        .iter()
        .filter(|part| !part.is_empty())
        .copied()
        .collect::<Vec<_>>()
        .join(" ");

        sanitize(&joined, disallowed)
    }
}

/// Remove each disallowed fragment from `text` and trim the result.
pub fn sanitize<S: AsRef<str>>(text: &str, disallowed: &[S]) -> String {
    let mut out = text.to_string();
    for fragment in disallowed {
        let fragment = fragment.as_ref();
        if !fragment.is_empty() {
            out = out.replace(fragment, "");
        }
    }
    out.trim().to_string()
}

fn at(list: &[String], index: u64) -> &str {
    // Lists are non-empty by construction.
    &list[(index % list.len() as u64) as usize]
}

fn split_lines(text: &str) -> Vec<String> {
    text.lines().map(str::to_string).collect()
}

fn split_targets(text: &str) -> Vec<String> {
    text.lines()
        .flat_map(|line| line.split(','))
        .map(str::to_string)
        .collect()
}

fn clean(list: Vec<String>) -> Vec<String> {
    list.into_iter()
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())
        .collect()
}

fn non_empty(name: &str, list: Vec<String>) -> Result<Vec<String>> {
    if list.is_empty() {
        return Err(RotorError::InvalidResources(format!("{name} list is empty")));
    }
    Ok(list)
}

fn trimmed(value: Option<String>) -> Option<String> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn set(prefix: Option<&str>, suffix: Option<&str>) -> ResourceSet {
        ResourceSet::from_text(
            "tok-a\ntok-b\n",
            "hello\nworld",
            "t1",
            prefix.map(String::from),
            suffix.map(String::from),
        )
        .unwrap()
    }

    #[test]
    fn blank_lines_are_dropped() {
        let set = ResourceSet::from_text("  a \n\n   \nb\n", "m", "t", None, None).unwrap();
        assert_eq!(set.credentials(), &["a".to_string(), "b".to_string()]);
    }

    #[test]
    fn empty_list_is_rejected() {
        let err = ResourceSet::from_text("a", "\n  \n", "t", None, None).unwrap_err();
        assert!(matches!(err, RotorError::InvalidResources(ref m) if m.contains("messages")));

        let err = ResourceSet::from_text("", "m", "t", None, None).unwrap_err();
        assert!(matches!(err, RotorError::InvalidResources(ref m) if m.contains("credentials")));

        let err = ResourceSet::from_text("a", "m", " , ,", None, None).unwrap_err();
        assert!(matches!(err, RotorError::InvalidResources(ref m) if m.contains("targets")));
    }

    #[test]
    fn targets_accept_commas_and_lines() {
        let set = ResourceSet::from_text("a", "m", "t1, t2\nt3,", None, None).unwrap();
        assert_eq!(set.targets(), &["t1", "t2", "t3"]);
    }

    #[test]
    fn lists_cycle_independently() {
        let set = ResourceSet::from_text("a", "m1\nm2", "t1\nt2\nt3", None, None).unwrap();
        let pairs: Vec<_> = (0..6)
            .map(|i| (set.message_at(i), set.target_at(i)))
            .collect();
        assert_eq!(
            pairs,
            vec![
                ("m1", "t1"),
                ("m2", "t2"),
                ("m1", "t3"),
                ("m2", "t1"),
                ("m1", "t2"),
                ("m2", "t3"),
            ]
        );
    }

    #[test]
    fn render_joins_present_parts() {
        let none: &[&str] = &[];
        assert_eq!(set(None, None).render("hello", none), "hello");
        assert_eq!(set(Some(" Hi "), None).render("hello", none), "Hi hello");
        assert_eq!(set(Some(""), Some("bye")).render("hello", none), "hello bye");
        assert_eq!(set(Some("A"), Some("Z")).render("hello", none), "A hello Z");
    }

    #[test]
    fn render_strips_markup() {
        let out = set(Some("<b>Hey</b>"), None).render("there>/<B>", DEFAULT_DISALLOWED_FRAGMENTS);
        assert_eq!(out, "Hey there");
    }

    #[test]
    fn from_files_reads_inline_targets() {
        let dir = tempfile::tempdir().unwrap();
        let creds = dir.path().join("tokens.txt");
        let msgs = dir.path().join("messages.txt");
        std::fs::write(&creds, "tok1\ntok2\n").unwrap();
        std::fs::write(&msgs, "first\n").unwrap();

        let set = ResourceSet::from_files(&creds, &msgs, "100,200", None, None).unwrap();
        assert_eq!(set.credentials().len(), 2);
        assert_eq!(set.targets(), &["100", "200"]);

        let targets = dir.path().join("targets.txt");
        std::fs::write(&targets, "300\n").unwrap();
        let set =
            ResourceSet::from_files(&creds, &msgs, targets.to_str().unwrap(), None, None).unwrap();
        assert_eq!(set.targets(), &["300"]);
    }
}
