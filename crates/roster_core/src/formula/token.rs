//! Lossless tokenizer shared by the translator and the parser.
//!
//! The tokenizer never fails: characters outside the language become
//! [`TokenKind::Other`] tokens so the translator can pass them through and the
//! parser can reject them with a position.

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TokenKind {
    Number,
    Str,
    Ident,
    /// Backtick-quoted identifier for names that are not plain words.
    QuotedIdent,
    LParen,
    RParen,
    Comma,
    Operator,
    Other,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Token {
    pub kind: TokenKind,
    /// Exact source text, quotes included.
    pub text: String,
    /// Whether whitespace preceded the token in the source.
    pub space_before: bool,
    /// Byte offset in the source.
    pub offset: usize,
}

impl Token {
    pub fn new(kind: TokenKind, text: impl Into<String>, space_before: bool) -> Self {
        Self { kind, text: text.into(), space_before, offset: 0 }
    }

    pub fn is_ident(&self, name: &str) -> bool {
        self.kind == TokenKind::Ident && self.text == name
    }

    pub fn is_operator(&self, op: &str) -> bool {
        self.kind == TokenKind::Operator && self.text == op
    }

    /// Identifier name with backticks removed.
    pub fn ident_name(&self) -> Option<&str> {
        match self.kind {
            TokenKind::Ident => Some(&self.text),
            TokenKind::QuotedIdent => {
                Some(self.text.trim_start_matches('`').trim_end_matches('`'))
            }
            _ => None,
        }
    }

    /// Whether a string token has its closing quote.
    pub fn is_terminated_string(&self) -> bool {
        self.kind == TokenKind::Str && self.text.len() >= 2 && self.text.ends_with('"')
    }

    /// Content of a string literal, `""` unescaped to `"`.
    pub fn string_value(&self) -> String {
        let inner = self.text.strip_prefix('"').unwrap_or(&self.text);
        let inner = inner.strip_suffix('"').unwrap_or(inner);
        inner.replace("\"\"", "\"")
    }
}

pub fn is_plain_identifier(name: &str) -> bool {
    let mut chars = name.chars();
    match chars.next() {
        Some(c) if c.is_ascii_alphabetic() || c == '_' => {}
        _ => return false,
    }
    chars.all(|c| c.is_ascii_alphanumeric() || c == '_')
}

const TWO_CHAR_OPERATORS: [&str; 5] = ["==", "!=", "<>", "<=", ">="];

pub fn tokenize(source: &str) -> Vec<Token> {
    let bytes = source.as_bytes();
    let mut tokens = Vec::new();
    let mut pos = 0usize;
    let mut space_before = false;

    while pos < bytes.len() {
        let c = bytes[pos];

        if c.is_ascii_whitespace() {
            space_before = true;
            pos += 1;
            continue;
        }

        let start = pos;
        let kind = if c.is_ascii_digit() || (c == b'.' && next_is_digit(bytes, pos)) {
            while pos < bytes.len() && bytes[pos].is_ascii_digit() {
                pos += 1;
            }
            if pos < bytes.len() && bytes[pos] == b'.' {
                pos += 1;
                while pos < bytes.len() && bytes[pos].is_ascii_digit() {
                    pos += 1;
                }
            }
            TokenKind::Number
        } else if c.is_ascii_alphabetic() || c == b'_' {
            while pos < bytes.len() && (bytes[pos].is_ascii_alphanumeric() || bytes[pos] == b'_') {
                pos += 1;
            }
            TokenKind::Ident
        } else if c == b'"' {
            pos += 1;
            loop {
                match bytes.get(pos) {
                    None => break,
                    Some(b'"') if bytes.get(pos + 1) == Some(&b'"') => pos += 2,
                    Some(b'"') => {
                        pos += 1;
                        break;
                    }
                    Some(_) => pos += 1,
                }
            }
            TokenKind::Str
        } else if c == b'`' {
            match source[pos + 1..].find('`') {
                Some(end) => {
                    pos += end + 2;
                    TokenKind::QuotedIdent
                }
                None => {
                    pos += 1;
                    TokenKind::Other
                }
            }
        } else if c == b'(' {
            pos += 1;
            TokenKind::LParen
        } else if c == b')' {
            pos += 1;
            TokenKind::RParen
        } else if c == b',' {
            pos += 1;
            TokenKind::Comma
        } else if TWO_CHAR_OPERATORS.iter().any(|op| source[pos..].starts_with(op)) {
            pos += 2;
            TokenKind::Operator
        } else if matches!(c, b'+' | b'-' | b'*' | b'/' | b'=' | b'<' | b'>') {
            pos += 1;
            TokenKind::Operator
        } else {
            // Advance by a whole UTF-8 character.
            let ch_len = source[pos..].chars().next().map(char::len_utf8).unwrap_or(1);
            pos += ch_len;
            TokenKind::Other
        };

        tokens.push(Token {
            kind,
            text: source[start..pos].to_string(),
            space_before,
            offset: start,
        });
        space_before = false;
    }

    tokens
}

fn next_is_digit(bytes: &[u8], pos: usize) -> bool {
    bytes.get(pos + 1).map(u8::is_ascii_digit).unwrap_or(false)
}

/// Render tokens back to text, collapsing any whitespace run to one space.
pub fn render(tokens: &[Token]) -> String {
    let mut out = String::new();
    for (i, token) in tokens.iter().enumerate() {
        if i > 0 && token.space_before {
            out.push(' ');
        }
        out.push_str(&token.text);
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    fn kinds(source: &str) -> Vec<TokenKind> {
        tokenize(source).into_iter().map(|t| t.kind).collect()
    }

    #[test]
    fn test_tokenize_spreadsheet_formula() {
        let tokens = tokenize("=IF(SPD12>90, 99,50)");
        let texts: Vec<_> = tokens.iter().map(|t| t.text.as_str()).collect();
        assert_eq!(texts, ["=", "IF", "(", "SPD12", ">", "90", ",", "99", ",", "50", ")"]);
        assert!(tokens[7].space_before);
        assert!(!tokens[9].space_before);
    }

    #[test]
    fn test_tokenize_operators_and_literals() {
        use TokenKind::*;
        assert_eq!(
            kinds(r#"a <> "x""y" >= .5 `Throw Power` & b"#),
            [Ident, Operator, Str, Operator, Number, QuotedIdent, Other, Ident]
        );
    }

    #[test]
    fn test_string_value_unescapes() {
        let tokens = tokenize(r#""say ""hi""""#);
        assert_eq!(tokens.len(), 1);
        assert!(tokens[0].is_terminated_string());
        assert_eq!(tokens[0].string_value(), r#"say "hi""#);
    }

    #[test]
    fn test_unterminated_string_is_flagged() {
        let tokens = tokenize(r#"C = "QB_"#);
        assert_eq!(tokens[2].kind, TokenKind::Str);
        assert!(!tokens[2].is_terminated_string());
    }

    #[test]
    fn test_render_collapses_whitespace() {
        assert_eq!(render(&tokenize("MIN( Speed ,\t 80 )")), "MIN( Speed , 80 )");
    }

    #[test]
    fn test_plain_identifier() {
        assert!(is_plain_identifier("Speed"));
        assert!(is_plain_identifier("_x1"));
        assert!(!is_plain_identifier("Throw Power"));
        assert!(!is_plain_identifier("1st"));
    }
}
