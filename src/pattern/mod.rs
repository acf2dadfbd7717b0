//! Path pattern tokenization and variable binding.
//!
//! A route pattern is an ordered sequence of `/`-separated segments, each
//! either a literal (`users`) or a named variable marked with a leading `:`
//! (`:id`). Matching walks the pattern and the request path in lockstep:
//!
//! | Pattern          | Path          | Result                 |
//! |------------------|---------------|------------------------|
//! | `/things/:id`    | `/things/42`  | match, `id → "42"`     |
//! | `/things/:id`    | `/things`     | no match (short)       |
//! | `/things/:id`    | `/posts/42`   | no match (literal)     |
//! | `/a/b`           | `/a/b/`       | no match (trailing)    |
//!
//! Trailing slashes are significant: tokenization follows `str::split`
//! semantics, so a trailing delimiter produces a trailing empty token and
//! `/a/b/` has one more segment than `/a/b`. Variable segments accept any
//! non-empty request token.

/// Marker character identifying a variable segment in a pattern.
pub const VARIABLE_SENTINEL: char = ':';

/// Segment delimiter for URL paths.
pub const PATH_DELIMITER: char = '/';

/// A restartable iterator over delimiter-bounded tokens of a borrowed string.
///
/// Tokens are slices of the input — no allocation happens during iteration.
/// Empty tokens between consecutive delimiters (and after a trailing
/// delimiter) are real tokens; an empty input yields zero tokens.
///
/// # Examples
///
/// ```
/// use microroute::pattern::Tokenizer;
///
/// let mut tokens = Tokenizer::new("/things/42", '/');
/// assert_eq!(tokens.next_token(), Some(""));
/// assert_eq!(tokens.next_token(), Some("things"));
/// assert_eq!(tokens.next_token(), Some("42"));
/// assert!(!tokens.has_next());
///
/// tokens.reset();
/// assert!(tokens.has_next());
/// ```
#[derive(Debug, Clone)]
pub struct Tokenizer<'a> {
    input: &'a str,
    delimiter: char,
    cursor: usize,
    exhausted: bool,
}

impl<'a> Tokenizer<'a> {
    /// Creates a tokenizer over `input`, splitting on `delimiter`.
    pub fn new(input: &'a str, delimiter: char) -> Self {
        Self {
            input,
            delimiter,
            cursor: 0,
            exhausted: input.is_empty(),
        }
    }

    /// Returns `true` while unconsumed tokens remain.
    pub fn has_next(&self) -> bool {
        !self.exhausted
    }

    /// Returns the next token and advances the cursor, or `None` when the
    /// input is exhausted.
    pub fn next_token(&mut self) -> Option<&'a str> {
        if self.exhausted {
            return None;
        }

        let rest = &self.input[self.cursor..];
        match rest.find(self.delimiter) {
            Some(pos) => {
                self.cursor += pos + self.delimiter.len_utf8();
                Some(&rest[..pos])
            }
            None => {
                self.exhausted = true;
                Some(rest)
            }
        }
    }

    /// Rewinds the cursor to the start of the input without reallocating.
    pub fn reset(&mut self) {
        self.cursor = 0;
        self.exhausted = self.input.is_empty();
    }
}

impl<'a> Iterator for Tokenizer<'a> {
    type Item = &'a str;

    fn next(&mut self) -> Option<&'a str> {
        self.next_token()
    }
}

/// Variable bindings extracted from a matched request path.
///
/// Built once per request by [`bind`], read-only afterwards. Entries preserve
/// the order in which variables appear in the pattern; lookup is a linear
/// scan, which is fine at URL path depths.
#[derive(Debug, Clone, Default)]
pub struct Bindings {
    entries: Vec<(String, String)>,
}

impl Bindings {
    /// Creates an empty binding table.
    pub fn new() -> Self {
        Self::default()
    }

    /// Records a variable name → value pair.
    pub fn insert(&mut self, name: impl Into<String>, value: impl Into<String>) {
        self.entries.push((name.into(), value.into()));
    }

    /// Looks up the value bound to `name`, or `None` if the matched pattern
    /// has no such variable.
    pub fn get(&self, name: &str) -> Option<&str> {
        self.entries
            .iter()
            .find(|(k, _)| k == name)
            .map(|(_, v)| v.as_str())
    }

    /// Returns the number of bound variables.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Returns `true` if no variables were bound.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Iterates over `(name, value)` pairs in pattern order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.entries.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }
}

/// Returns `true` if `path` matches `pattern` segment-for-segment.
///
/// Literal segments must compare equal (case-sensitive); variable segments
/// accept any non-empty request token. The walk exits early on the first
/// mismatch and fails whenever one side runs out of segments before the
/// other, so non-matching routes cost no allocation at dispatch time.
///
/// # Examples
///
/// ```
/// use microroute::pattern::matches;
///
/// assert!(matches("/things/:id", "/things/42"));
/// assert!(!matches("/things/:id", "/things/42/sub"));
/// assert!(!matches("/a/b", "/a/b/"));
/// ```
pub fn matches(pattern: &str, path: &str) -> bool {
    let mut pattern_tokens = Tokenizer::new(pattern, PATH_DELIMITER);
    let mut request_tokens = Tokenizer::new(path, PATH_DELIMITER);

    loop {
        match (pattern_tokens.next_token(), request_tokens.next_token()) {
            (None, None) => return true,
            (Some(pattern_token), Some(request_token)) => {
                if pattern_token.starts_with(VARIABLE_SENTINEL) {
                    if request_token.is_empty() {
                        return false;
                    }
                } else if pattern_token != request_token {
                    return false;
                }
            }
            // One side exhausted before the other: segment counts differ.
            _ => return false,
        }
    }
}

/// Re-walks a pattern and a path known to match, collecting variable values.
///
/// For each variable position the binding is `name → request token`, where
/// `name` is the pattern segment without its leading sentinel. Call only
/// after [`matches`] has succeeded; on a non-matching path the table contents
/// are unspecified.
///
/// # Examples
///
/// ```
/// use microroute::pattern::bind;
///
/// let bindings = bind("/things/:id/parts/:part", "/things/42/parts/7");
/// assert_eq!(bindings.get("id"), Some("42"));
/// assert_eq!(bindings.get("part"), Some("7"));
/// ```
pub fn bind(pattern: &str, path: &str) -> Bindings {
    let mut bindings = Bindings::new();
    let mut pattern_tokens = Tokenizer::new(pattern, PATH_DELIMITER);
    let mut request_tokens = Tokenizer::new(path, PATH_DELIMITER);

    while let (Some(pattern_token), Some(request_token)) =
        (pattern_tokens.next_token(), request_tokens.next_token())
    {
        if let Some(name) = pattern_token.strip_prefix(VARIABLE_SENTINEL) {
            bindings.insert(name, request_token);
        }
    }

    bindings
}

#[cfg(test)]
mod tests {
    use super::*;

    // ── Tokenizer ─────────────────────────────────────────────────────────────

    #[test]
    fn tokenizer_empty_input_has_no_tokens() {
        let mut tokens = Tokenizer::new("", '/');
        assert!(!tokens.has_next());
        assert_eq!(tokens.next_token(), None);
    }

    #[test]
    fn tokenizer_no_delimiter_is_single_token() {
        let mut tokens = Tokenizer::new("abc", '/');
        assert_eq!(tokens.next_token(), Some("abc"));
        assert!(!tokens.has_next());
        assert_eq!(tokens.next_token(), None);
    }

    #[test]
    fn tokenizer_splits_on_delimiter() {
        let tokens: Vec<_> = Tokenizer::new("a/b/c", '/').collect();
        assert_eq!(tokens, vec!["a", "b", "c"]);
    }

    #[test]
    fn tokenizer_leading_delimiter_yields_empty_token() {
        let tokens: Vec<_> = Tokenizer::new("/a/b", '/').collect();
        assert_eq!(tokens, vec!["", "a", "b"]);
    }

    #[test]
    fn tokenizer_trailing_delimiter_yields_empty_token() {
        let tokens: Vec<_> = Tokenizer::new("a/b/", '/').collect();
        assert_eq!(tokens, vec!["a", "b", ""]);
    }

    #[test]
    fn tokenizer_consecutive_delimiters_yield_empty_token() {
        let tokens: Vec<_> = Tokenizer::new("a//b", '/').collect();
        assert_eq!(tokens, vec!["a", "", "b"]);
    }

    #[test]
    fn tokenizer_reset_restarts_from_beginning() {
        let mut tokens = Tokenizer::new("a/b", '/');
        assert_eq!(tokens.next_token(), Some("a"));
        assert_eq!(tokens.next_token(), Some("b"));
        assert!(!tokens.has_next());

        tokens.reset();
        assert!(tokens.has_next());
        assert_eq!(tokens.next_token(), Some("a"));
    }

    // ── matches ───────────────────────────────────────────────────────────────

    #[test]
    fn literal_pattern_matches_itself() {
        assert!(matches("/things", "/things"));
        assert!(matches("/a/b/c", "/a/b/c"));
    }

    #[test]
    fn literal_pattern_is_case_sensitive() {
        assert!(!matches("/things", "/Things"));
    }

    #[test]
    fn variable_segment_matches_any_nonempty_value() {
        assert!(matches("/things/:id", "/things/42"));
        assert!(matches("/things/:id", "/things/abc-def"));
        assert!(matches("/:a/:b", "/x/y"));
    }

    #[test]
    fn variable_segment_rejects_empty_value() {
        // "/things//sub" has an empty middle segment
        assert!(!matches("/things/:id/sub", "/things//sub"));
    }

    #[test]
    fn differing_segment_counts_never_match() {
        assert!(!matches("/things/:id", "/things"));
        assert!(!matches("/things/:id", "/things/42/sub"));
        assert!(!matches("/things", "/things/42"));
    }

    #[test]
    fn trailing_slash_is_a_distinct_segment() {
        assert!(!matches("/a/b", "/a/b/"));
        assert!(!matches("/a/b/", "/a/b"));
        assert!(matches("/a/b/", "/a/b/"));
    }

    #[test]
    fn root_matches_root() {
        assert!(matches("/", "/"));
        assert!(!matches("/", "/things"));
    }

    #[test]
    fn literal_mismatch_fails_regardless_of_variables() {
        assert!(!matches("/things/:id", "/posts/42"));
    }

    // ── bind ──────────────────────────────────────────────────────────────────

    #[test]
    fn bind_extracts_single_variable() {
        let bindings = bind("/things/:id", "/things/42");
        assert_eq!(bindings.get("id"), Some("42"));
        assert_eq!(bindings.len(), 1);
    }

    #[test]
    fn bind_extracts_variables_in_pattern_order() {
        let bindings = bind("/a/:first/b/:second", "/a/1/b/2");
        let pairs: Vec<_> = bindings.iter().collect();
        assert_eq!(pairs, vec![("first", "1"), ("second", "2")]);
    }

    #[test]
    fn bind_without_variables_is_empty() {
        let bindings = bind("/things", "/things");
        assert!(bindings.is_empty());
    }

    #[test]
    fn bindings_missing_name_is_none() {
        let bindings = bind("/things/:id", "/things/42");
        assert_eq!(bindings.get("nope"), None);
    }
}
