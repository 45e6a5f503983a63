//! Spreadsheet formula → normalized expression translation.
//!
//! Rules run in a fixed order over the token stream; later rules assume the
//! earlier ones already ran:
//!
//! 1. strip row digits from cell references (`AB12` → `AB`)
//! 2. bare `C` → `Archetype`
//! 3. short attribute codes → readable names
//! 4. unwrap a whole-formula `PRODUCT(...)`
//! 5. `IF(c, t, e)` → `(t if c else e)` (flat only)
//! 6. `OR(...)` / `AND(...)` → `(a or b ...)` / `(a and b ...)`
//! 7. `x = "text"` → `x == "text"`
//! 8. strip the leading `=`

use crate::attributes::{AttributeNameMap, ARCHETYPE_KEY};
use crate::formula::token::{is_plain_identifier, render, tokenize, Token, TokenKind};

/// Words the translator never substitutes.
const RESERVED: [&str; 11] =
    ["if", "else", "and", "or", "not", "IF", "OR", "AND", "MIN", "MAX", "PRODUCT"];

/// Output of a single translation.
#[derive(Debug, Clone, PartialEq)]
pub struct Translation {
    pub expression: String,
    /// Constructs that were left untranslated, in encounter order.
    pub diagnostics: Vec<String>,
}

pub struct FormulaTranslator<'a> {
    names: &'a AttributeNameMap,
}

impl<'a> FormulaTranslator<'a> {
    pub fn new(names: &'a AttributeNameMap) -> Self {
        Self { names }
    }

    pub fn translate(&self, raw: &str) -> Translation {
        let mut diagnostics = Vec::new();

        let tokens: Vec<Token> = tokenize(raw).into_iter().map(|t| self.rewrite_token(t)).collect();
        let tokens = unwrap_product(tokens);
        let tokens = rewrite_if(&tokens, &mut diagnostics);
        let tokens = rewrite_logical(&tokens, &mut diagnostics);
        let tokens = rewrite_string_equality(tokens);
        let tokens = strip_leading_equals(tokens);

        Translation { expression: render(&tokens), diagnostics }
    }

    /// Rules 1-3, which only look at one identifier at a time.
    fn rewrite_token(&self, mut token: Token) -> Token {
        if token.kind != TokenKind::Ident {
            return token;
        }

        token.text = strip_cell_row(&token.text);

        if token.text == "C" {
            token.text = ARCHETYPE_KEY.to_string();
            return token;
        }

        if RESERVED.contains(&token.text.as_str()) {
            return token;
        }

        if let Some(readable) = self.names.to_readable(&token.text) {
            if is_plain_identifier(readable) {
                token.text = readable.to_string();
            } else {
                token.kind = TokenKind::QuotedIdent;
                token.text = format!("`{}`", readable);
            }
        }
        token
    }
}

/// Drop a digit run that directly follows an uppercase letter.
pub fn strip_cell_row(ident: &str) -> String {
    let mut out = String::with_capacity(ident.len());
    let mut prev_upper = false;
    let mut skipping = false;

    for c in ident.chars() {
        if c.is_ascii_digit() {
            if prev_upper || skipping {
                skipping = true;
                prev_upper = false;
                continue;
            }
        } else {
            skipping = false;
        }
        prev_upper = c.is_ascii_uppercase();
        out.push(c);
    }
    out
}

/// Index of the parenthesis closing the one at `open`.
fn matching_paren(tokens: &[Token], open: usize) -> Option<usize> {
    let mut depth = 0usize;
    for (i, token) in tokens.iter().enumerate().skip(open) {
        match token.kind {
            TokenKind::LParen => depth += 1,
            TokenKind::RParen => {
                depth -= 1;
                if depth == 0 {
                    return Some(i);
                }
            }
            _ => {}
        }
    }
    None
}

/// Split call arguments on commas outside nested parentheses.
fn split_args(tokens: &[Token]) -> Vec<&[Token]> {
    let mut args = Vec::new();
    let mut depth = 0usize;
    let mut start = 0usize;
    for (i, token) in tokens.iter().enumerate() {
        match token.kind {
            TokenKind::LParen => depth += 1,
            TokenKind::RParen => depth = depth.saturating_sub(1),
            TokenKind::Comma if depth == 0 => {
                args.push(&tokens[start..i]);
                start = i + 1;
            }
            _ => {}
        }
    }
    args.push(&tokens[start..]);
    args
}

/// Position of a call `NAME(` starting at `i`, with its closing parenthesis.
fn call_at(tokens: &[Token], i: usize, name: &str) -> Option<usize> {
    if tokens[i].is_ident(name) && tokens.get(i + 1).map(|t| t.kind) == Some(TokenKind::LParen) {
        matching_paren(tokens, i + 1)
    } else {
        None
    }
}

fn push_segment(out: &mut Vec<Token>, segment: &[Token], space_before: bool) {
    for (i, token) in segment.iter().enumerate() {
        let mut token = token.clone();
        if i == 0 {
            token.space_before = space_before;
        }
        out.push(token);
    }
}

fn unwrap_product(mut tokens: Vec<Token>) -> Vec<Token> {
    let body_start = usize::from(tokens.first().map(|t| t.is_operator("=")).unwrap_or(false));

    while tokens.len() > body_start + 2 {
        let close = match call_at(&tokens, body_start, "PRODUCT") {
            Some(close) if close == tokens.len() - 1 => close,
            _ => break,
        };

        let inner = tokens[body_start + 2..close].to_vec();
        let mut unwrapped: Vec<Token> = tokens[..body_start].to_vec();
        for (i, arg) in split_args(&inner).into_iter().enumerate() {
            if i > 0 {
                unwrapped.push(Token::new(TokenKind::Operator, "*", true));
            }
            push_segment(&mut unwrapped, arg, i > 0);
        }
        tokens = unwrapped;
    }
    tokens
}

fn contains_if_call(tokens: &[Token]) -> bool {
    (0..tokens.len()).any(|i| call_at(tokens, i, "IF").is_some())
}

fn rewrite_if(tokens: &[Token], diagnostics: &mut Vec<String>) -> Vec<Token> {
    let mut out = Vec::with_capacity(tokens.len());
    let mut i = 0;

    while i < tokens.len() {
        let Some(close) = call_at(tokens, i, "IF") else {
            out.push(tokens[i].clone());
            i += 1;
            continue;
        };

        let call = &tokens[i..=close];
        let args = split_args(&tokens[i + 2..close]);

        let rejected = if args.len() != 3 {
            Some("IF needs exactly three arguments")
        } else if args.iter().any(|arg| contains_if_call(arg)) {
            Some("nested IF is not supported")
        } else {
            None
        };

        match rejected {
            Some(reason) => {
                diagnostics.push(format!("{}: {}", reason, render(call)));
                out.extend_from_slice(call);
            }
            None => {
                let (cond, then, otherwise) = (args[0], args[1], args[2]);

                out.push(Token::new(TokenKind::LParen, "(", tokens[i].space_before));
                push_segment(&mut out, then, false);
                out.push(Token::new(TokenKind::Ident, "if", true));
                push_segment(&mut out, cond, true);
                out.push(Token::new(TokenKind::Ident, "else", true));
                push_segment(&mut out, otherwise, true);
                out.push(Token::new(TokenKind::RParen, ")", false));
            }
        }
        i = close + 1;
    }
    out
}

fn rewrite_logical(tokens: &[Token], diagnostics: &mut Vec<String>) -> Vec<Token> {
    let mut out = Vec::with_capacity(tokens.len());
    let mut i = 0;

    while i < tokens.len() {
        let call = [("OR", "or"), ("AND", "and")]
            .into_iter()
            .find_map(|(name, keyword)| call_at(tokens, i, name).map(|close| (keyword, close)));

        let Some((keyword, close)) = call else {
            out.push(tokens[i].clone());
            i += 1;
            continue;
        };

        let inner = &tokens[i + 2..close];
        if inner.is_empty() {
            diagnostics.push(format!("{} without arguments", tokens[i].text));
            out.extend_from_slice(&tokens[i..=close]);
            i = close + 1;
            continue;
        }

        out.push(Token::new(TokenKind::LParen, "(", tokens[i].space_before));
        for (n, arg) in split_args(inner).into_iter().enumerate() {
            let arg = rewrite_logical(arg, diagnostics);
            if n > 0 {
                out.push(Token::new(TokenKind::Ident, keyword, true));
            }
            push_segment(&mut out, &arg, n > 0);
        }
        out.push(Token::new(TokenKind::RParen, ")", false));
        i = close + 1;
    }
    out
}

fn rewrite_string_equality(mut tokens: Vec<Token>) -> Vec<Token> {
    for i in 1..tokens.len().saturating_sub(1) {
        let word_before = matches!(
            tokens[i - 1].kind,
            TokenKind::Ident | TokenKind::QuotedIdent | TokenKind::Number
        );
        if word_before && tokens[i].is_operator("=") && tokens[i + 1].kind == TokenKind::Str {
            tokens[i].text = "==".to_string();
            tokens[i].space_before = true;
            tokens[i + 1].space_before = true;
        }
    }
    tokens
}

fn strip_leading_equals(tokens: Vec<Token>) -> Vec<Token> {
    let skip = tokens
        .iter()
        .take_while(|t| t.kind == TokenKind::Operator && t.text.chars().all(|c| c == '='))
        .count();
    tokens.into_iter().skip(skip).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn names() -> AttributeNameMap {
        AttributeNameMap::from_pairs([
            ("SPD", "Speed"),
            ("AGI", "Agility"),
            ("AWR", "Awareness"),
            ("THP", "Throw Power"),
        ])
    }

    fn translate(raw: &str) -> String {
        FormulaTranslator::new(&names()).translate(raw).expression
    }

    #[test]
    fn test_if_with_substitution() {
        assert_eq!(translate("=IF(SPD>90,99,50)"), "(99 if Speed>90 else 50)");
    }

    #[test]
    fn test_cell_references_lose_row_digits() {
        assert_eq!(strip_cell_row("AB12"), "AB");
        assert_eq!(strip_cell_row("X1Y22"), "XY");
        assert_eq!(strip_cell_row("Speed2"), "Speed2");
        assert_eq!(translate("=AB12+C3"), "AB+Archetype");
        assert_eq!(translate("=SPD4*0.5+AGI4*0.5"), "Speed*0.5+Agility*0.5");
    }

    #[test]
    fn test_substitution_respects_token_boundaries() {
        assert_eq!(translate("=SPDX+XSPD+SPD"), "SPDX+XSPD+Speed");
    }

    #[test]
    fn test_multi_word_names_are_quoted() {
        assert_eq!(translate("=THP*2"), "`Throw Power`*2");
    }

    #[test]
    fn test_product_unwrap() {
        assert_eq!(translate("=PRODUCT(SPD*0.5+AGI*0.5)"), "Speed*0.5+Agility*0.5");
        assert_eq!(translate("PRODUCT(SPD, 2)"), "Speed * 2");
        assert_eq!(translate("=PRODUCT(SPD)+1"), "PRODUCT(Speed)+1");
    }

    #[test]
    fn test_or_and_and_rewrites() {
        assert_eq!(
            translate(r#"=IF(OR(C="QB_Scrambler", C="QB_Improviser"), SPD, AWR)"#),
            r#"(Speed if (Archetype == "QB_Scrambler" or Archetype == "QB_Improviser") else Awareness)"#
        );
        assert_eq!(translate("=AND(SPD>80,AGI>80)"), "(Speed>80 and Agility>80)");
    }

    #[test]
    fn test_if_arguments_split_on_top_level_commas() {
        assert_eq!(
            translate("=IF(SPD>90, MAX(SPD, AGI), MIN(AWR, 70))"),
            "(MAX(Speed, Agility) if Speed>90 else MIN(Awareness, 70))"
        );
    }

    #[test]
    fn test_nested_if_is_left_verbatim_with_diagnostic() {
        let translation =
            FormulaTranslator::new(&names()).translate("=IF(SPD>90,99,IF(SPD>80,85,70))");
        assert_eq!(translation.expression, "IF(Speed>90,99,IF(Speed>80,85,70))");
        assert_eq!(translation.diagnostics.len(), 1);
        assert!(translation.diagnostics[0].starts_with("nested IF"));
    }

    #[test]
    fn test_sibling_ifs_are_both_rewritten() {
        assert_eq!(
            translate("=IF(SPD>90,10,0)+IF(AGI>90,5,0)"),
            "(10 if Speed>90 else 0)+(5 if Agility>90 else 0)"
        );
    }

    #[test]
    fn test_wrong_arity_if_is_reported() {
        let translation = FormulaTranslator::new(&names()).translate("=IF(SPD>90,99)");
        assert_eq!(translation.expression, "IF(Speed>90,99)");
        assert_eq!(translation.diagnostics.len(), 1);
    }

    #[test]
    fn test_string_equality_only() {
        assert_eq!(translate(r#"C="QB_Scrambler""#), r#"Archetype == "QB_Scrambler""#);
        assert_eq!(translate("SPD=90"), "Speed=90");
    }

    #[test]
    fn test_translation_is_idempotent() {
        let map = names();
        let translator = FormulaTranslator::new(&map);
        for raw in [
            "=IF(SPD>90,99,50)",
            r#"=IF(OR(C="QB_Scrambler",C="QB_Improviser"),SPD*0.7+AGI*0.3,AWR)"#,
            "=PRODUCT(THP*0.6+AWR4*0.4)",
            "=IF(SPD>90,99,IF(SPD>80,85,70))",
        ] {
            let once = translator.translate(raw).expression;
            let twice = translator.translate(&once).expression;
            assert_eq!(once, twice, "re-translating {raw} changed the output");
        }
    }
}
