//! JSON pointer paths (RFC 6901).
//!
//! Patch operations address locations with slash-delimited tokens, where
//! `~` is escaped as `~0` and `/` as `~1`. The empty string addresses the
//! document root. Object members are addressed by name, so a path never
//! depends on the ordering of keys within an object.

use crate::error::PatchError;

/// Escape a single reference token.
pub fn escape(token: &str) -> String {
    if token.contains(['~', '/']) {
        token.replace('~', "~0").replace('/', "~1")
    } else {
        token.to_owned()
    }
}

/// Unescape a single reference token.
pub fn unescape(token: &str) -> String {
    if token.contains('~') {
        token.replace("~1", "/").replace("~0", "~")
    } else {
        token.to_owned()
    }
}

/// Append a token to a pointer.
pub fn push(base: &str, token: &str) -> String {
    let mut path = String::with_capacity(base.len() + token.len() + 1);
    path.push_str(base);
    path.push('/');
    path.push_str(&escape(token));
    path
}

/// Split a pointer into its unescaped reference tokens.
///
/// The root pointer `""` yields no tokens.
pub fn parse(pointer: &str) -> Result<Vec<String>, PatchError> {
    if pointer.is_empty() {
        return Ok(Vec::new());
    }
    let rest = pointer
        .strip_prefix('/')
        .ok_or_else(|| PatchError::InvalidPointer(pointer.to_owned()))?;
    Ok(rest.split('/').map(unescape).collect())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_root() {
        assert!(parse("").unwrap().is_empty());
    }

    #[test]
    fn test_parse_nested() {
        assert_eq!(parse("/items/0/name").unwrap(), vec!["items", "0", "name"]);
    }

    #[test]
    fn test_parse_rejects_relative() {
        assert_eq!(
            parse("count"),
            Err(PatchError::InvalidPointer("count".into()))
        );
    }

    #[test]
    fn test_escaping() {
        let path = push("", "a/b~c");
        assert_eq!(path, "/a~1b~0c");
        assert_eq!(parse(&path).unwrap(), vec!["a/b~c"]);
    }

    #[test]
    fn test_empty_token() {
        assert_eq!(parse("/").unwrap(), vec![""]);
    }
}
