//! Event log path handling

use crate::error::{LogError, Result};

/// Characters the realtime database refuses in keys
const FORBIDDEN: [char; 5] = ['.', '#', '$', '[', ']'];

/// Split a `/`-separated path into validated segments
///
/// Leading, trailing and doubled separators are ignored; the root is the
/// empty segment list.
pub fn segments(path: &str) -> Result<Vec<String>> {
    path.split('/')
        .filter(|s| !s.is_empty())
        .map(|s| {
            if s.contains(&FORBIDDEN[..]) {
                Err(LogError::InvalidPath(path.to_string()))
            } else {
                Ok(s.to_string())
            }
        })
        .collect()
}

/// Join segments back into a relative frame path (`/a/b`, or `/` for root)
pub fn relative(segments: &[String]) -> String {
    format!("/{}", segments.join("/"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_segments() {
        assert_eq!(segments("rooms/abc/host").unwrap(), vec!["rooms", "abc", "host"]);
        assert_eq!(segments("/rooms//abc/").unwrap(), vec!["rooms", "abc"]);
        assert!(segments("").unwrap().is_empty());
    }

    #[test]
    fn test_forbidden_characters() {
        assert!(segments("rooms/a.b").is_err());
        assert!(segments("rooms/$x").is_err());
    }

    #[test]
    fn test_relative() {
        assert_eq!(relative(&[]), "/");
        assert_eq!(relative(&["q1".to_string(), "answered".to_string()]), "/q1/answered");
    }
}
