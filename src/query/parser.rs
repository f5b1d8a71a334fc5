//! Query Parser
//!
//! Splits a pipe-separated query string into an ordered [`Command`]
//! pipeline.
//!
//! # Supported Syntax
//!
//! ```text
//! search status=200 | stats count by method | sort -count | head 5
//! ```
//!
//! A `|` separates stages only at the top level: pipes inside quoted
//! strings or unmatched parentheses are literal. Each segment's leading
//! word selects the command; a segment whose leading word is not a known
//! command becomes a search condition in its entirety, so bare filters
//! like `status=200 | head 5` work without the `search` keyword.

/// One pipeline stage, carrying its unparsed argument string.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    /// Filter records by a condition (`search` / `where`, or implicit)
    Search(String),
    /// Collapsing aggregation
    Stats(String),
    /// Enriching aggregation
    Eventstats(String),
    /// Keep or drop fields
    Fields(String),
    /// Rename fields
    Rename(String),
    /// Compute a new field from an expression
    Eval(String),
    /// Order records
    Sort(String),
    /// First N records
    Head(String),
    /// Last N records
    Tail(String),
    /// Column projection (same transform as `fields`)
    Table(String),
}

impl Command {
    /// Build a command from a keyword, if the keyword is recognized.
    fn from_keyword(keyword: &str, args: &str) -> Option<Command> {
        let args = args.trim().to_string();
        match keyword.to_ascii_lowercase().as_str() {
            "search" | "where" => Some(Command::Search(args)),
            "stats" => Some(Command::Stats(args)),
            "eventstats" => Some(Command::Eventstats(args)),
            "fields" => Some(Command::Fields(args)),
            "rename" => Some(Command::Rename(args)),
            "eval" => Some(Command::Eval(args)),
            "sort" => Some(Command::Sort(args)),
            "head" => Some(Command::Head(args)),
            "tail" => Some(Command::Tail(args)),
            "table" => Some(Command::Table(args)),
            _ => None,
        }
    }

    /// The stage keyword, for logging.
    pub fn name(&self) -> &'static str {
        match self {
            Command::Search(_) => "search",
            Command::Stats(_) => "stats",
            Command::Eventstats(_) => "eventstats",
            Command::Fields(_) => "fields",
            Command::Rename(_) => "rename",
            Command::Eval(_) => "eval",
            Command::Sort(_) => "sort",
            Command::Head(_) => "head",
            Command::Tail(_) => "tail",
            Command::Table(_) => "table",
        }
    }
}

/// Parse a query string into an ordered pipeline of commands.
///
/// An empty query yields an empty pipeline (the identity transform).
/// If the pipeline is non-empty and does not begin with a filter, an
/// implicit `search *` is prepended so that execution always starts
/// from an explicit filter stage.
pub fn parse_pipeline(query: &str) -> Vec<Command> {
    let query = query.trim();
    if query.is_empty() {
        return Vec::new();
    }

    let mut commands = Vec::new();

    for segment in split_pipes(query) {
        let segment = segment.trim();
        if segment.is_empty() {
            continue;
        }

        let word_end = segment
            .find(|c: char| !(c.is_alphanumeric() || c == '_'))
            .unwrap_or(segment.len());
        let keyword = &segment[..word_end];
        let args = &segment[word_end..];

        match Command::from_keyword(keyword, args) {
            Some(command) => commands.push(command),
            // Unknown leading word: the whole segment is a condition
            None => commands.push(Command::Search(segment.to_string())),
        }
    }

    if !commands.is_empty() && !matches!(commands[0], Command::Search(_)) {
        commands.insert(0, Command::Search("*".to_string()));
    }

    commands
}

/// Split a query at top-level `|` characters.
///
/// Quote state toggles on `"` and `'` unless the single immediately
/// preceding character is a backslash. That check is deliberately
/// narrow: a literal backslash before a quote is indistinguishable from
/// an escape, and downstream behavior depends on keeping it that way.
pub fn split_pipes(query: &str) -> Vec<String> {
    let mut parts = Vec::new();
    let mut current = String::new();
    let mut in_quotes = false;
    let mut quote_char = '\0';
    let mut paren_depth: i32 = 0;
    let mut prev: Option<char> = None;

    for c in query.chars() {
        if (c == '"' || c == '\'') && prev != Some('\\') {
            if !in_quotes {
                in_quotes = true;
                quote_char = c;
            } else if c == quote_char {
                in_quotes = false;
            }
        } else if c == '(' && !in_quotes {
            paren_depth += 1;
        } else if c == ')' && !in_quotes {
            paren_depth -= 1;
        } else if c == '|' && !in_quotes && paren_depth == 0 {
            parts.push(std::mem::take(&mut current));
            prev = Some(c);
            continue;
        }

        current.push(c);
        prev = Some(c);
    }

    if !current.is_empty() {
        parts.push(current);
    }

    parts
}
