use chumsky::{prelude::*, text};

use crate::diagnostic::Span;
use crate::token::Token;

/// Builds the token-level parser. The lexer is total: any character that no
/// rule matches becomes `Token::Unknown`, so bad input surfaces as parser
/// diagnostics instead of a lexing failure.
pub fn lexer<'a>()
-> impl Parser<'a, &'a str, Vec<(Token, SimpleSpan)>, extra::Err<Simple<'a, char>>> {
    let number = text::digits(10)
        .then(just('.').then(text::digits(10)).or_not())
        .to_slice()
        .map(|s: &str| {
            if s.contains('.') {
                Token::Decimal(s.parse().unwrap())
            } else {
                Token::Integer(s.parse().unwrap())
            }
        });

    let ident = text::ident().map(|s: &str| match s {
        "var" => Token::Var,
        "if" => Token::If,
        "else" => Token::Else,
        "while" => Token::While,
        "break" => Token::Break,
        "fn" => Token::Fn,
        "return" => Token::Return,
        "true" => Token::True,
        "false" => Token::False,
        _ => Token::Ident(s.to_string()),
    });

    let multi_char_operators = choice((
        just("==").to(Token::Eq),
        just("!=").to(Token::NotEq),
        just(">=").to(Token::GreaterEq),
        just("<=").to(Token::LessEq),
        just("&&").to(Token::And),
        just("||").to(Token::Or),
        just("++").to(Token::Inc),
        just("--").to(Token::Dec),
    ));

    let single_char_operators = choice((
        just('+').to(Token::Plus),
        just('-').to(Token::Minus),
        just('*').to(Token::Star),
        just('/').to(Token::Slash),
        just('>').to(Token::Greater),
        just('<').to(Token::Less),
        just('!').to(Token::Bang),
        just('=').to(Token::Assign),
        just(';').to(Token::Semicolon),
        just(',').to(Token::Comma),
        just('(').to(Token::LParen),
        just(')').to(Token::RParen),
        just('{').to(Token::LBrace),
        just('}').to(Token::RBrace),
        just('[').to(Token::LBracket),
        just(']').to(Token::RBracket),
    ));

    let operators = multi_char_operators.or(single_char_operators);

    let token = choice((number, ident, operators))
        .or(any().map(Token::Unknown))
        .map_with(|tok, e| (tok, e.span()))
        .padded();

    token.repeated().collect().padded().then_ignore(end())
}

/// Lexes a whole source string into tokens carrying crate-local byte spans.
pub fn tokenize(source: &str) -> Vec<(Token, Span)> {
    lexer()
        .parse(source)
        .into_output()
        .map(|tokens| {
            tokens
                .into_iter()
                .map(|(tok, span)| (tok, Span::new(span.start, span.end)))
                .collect()
        })
        .unwrap_or_default()
}

#[cfg(test)]
mod tests {
    use super::*;
    use num_bigint::BigInt;

    fn lex(source: &str) -> Vec<Token> {
        tokenize(source).into_iter().map(|(tok, _)| tok).collect()
    }

    #[test]
    fn test_keywords() {
        assert_eq!(lex("var"), vec![Token::Var]);
        assert_eq!(lex("if"), vec![Token::If]);
        assert_eq!(lex("else"), vec![Token::Else]);
        assert_eq!(lex("while"), vec![Token::While]);
        assert_eq!(lex("break"), vec![Token::Break]);
        assert_eq!(lex("fn"), vec![Token::Fn]);
        assert_eq!(lex("return"), vec![Token::Return]);
        assert_eq!(lex("true"), vec![Token::True]);
        assert_eq!(lex("false"), vec![Token::False]);
    }

    #[test]
    fn test_identifiers() {
        assert_eq!(lex("foo"), vec![Token::Ident("foo".to_string())]);
        assert_eq!(lex("bar123"), vec![Token::Ident("bar123".to_string())]);
        assert_eq!(lex("entry"), vec![Token::Ident("entry".to_string())]);
        assert_eq!(
            lex("snake_case"),
            vec![Token::Ident("snake_case".to_string())]
        );
    }

    #[test]
    fn test_keyword_prefix_is_identifier() {
        assert_eq!(lex("variable"), vec![Token::Ident("variable".to_string())]);
        assert_eq!(lex("iffy"), vec![Token::Ident("iffy".to_string())]);
        assert_eq!(lex("fnord"), vec![Token::Ident("fnord".to_string())]);
    }

    #[test]
    fn test_integers() {
        assert_eq!(lex("42"), vec![Token::Integer(BigInt::from(42))]);
        assert_eq!(lex("0"), vec![Token::Integer(BigInt::from(0))]);
        assert_eq!(lex("007"), vec![Token::Integer(BigInt::from(7))]);
        assert_eq!(
            lex("123456789012345678901234567890"),
            vec![Token::Integer(
                "123456789012345678901234567890".parse().unwrap()
            )]
        );
    }

    #[test]
    fn test_decimals() {
        assert_eq!(lex("3.14"), vec![Token::Decimal("3.14".parse().unwrap())]);
        assert_eq!(lex("0.5"), vec![Token::Decimal("0.5".parse().unwrap())]);
        assert_eq!(
            lex("123.456"),
            vec![Token::Decimal("123.456".parse().unwrap())]
        );
    }

    #[test]
    fn test_arithmetic_operators() {
        assert_eq!(
            lex("+ - * /"),
            vec![Token::Plus, Token::Minus, Token::Star, Token::Slash]
        );
    }

    #[test]
    fn test_reserved_inc_dec() {
        assert_eq!(lex("++"), vec![Token::Inc]);
        assert_eq!(lex("--"), vec![Token::Dec]);
        assert_eq!(lex("+ +"), vec![Token::Plus, Token::Plus]);
    }

    #[test]
    fn test_comparison_operators() {
        assert_eq!(
            lex("== != > < >= <="),
            vec![
                Token::Eq,
                Token::NotEq,
                Token::Greater,
                Token::Less,
                Token::GreaterEq,
                Token::LessEq
            ]
        );
    }

    #[test]
    fn test_logical_operators() {
        assert_eq!(lex("&& || !"), vec![Token::And, Token::Or, Token::Bang]);
    }

    #[test]
    fn test_assign_vs_eq() {
        assert_eq!(
            lex("x = y == z"),
            vec![
                Token::Ident("x".to_string()),
                Token::Assign,
                Token::Ident("y".to_string()),
                Token::Eq,
                Token::Ident("z".to_string())
            ]
        );
    }

    #[test]
    fn test_delimiters() {
        assert_eq!(
            lex("( ) [ ] { } ; ,"),
            vec![
                Token::LParen,
                Token::RParen,
                Token::LBracket,
                Token::RBracket,
                Token::LBrace,
                Token::RBrace,
                Token::Semicolon,
                Token::Comma
            ]
        );
    }

    #[test]
    fn test_unknown_character() {
        assert_eq!(
            lex("x @ y"),
            vec![
                Token::Ident("x".to_string()),
                Token::Unknown('@'),
                Token::Ident("y".to_string())
            ]
        );
    }

    #[test]
    fn test_whitespace_handling() {
        assert_eq!(
            lex("  var\n\tx  "),
            vec![Token::Var, Token::Ident("x".to_string())]
        );
        assert_eq!(lex("   \r\n  "), vec![]);
        assert_eq!(lex(""), vec![]);
    }

    #[test]
    fn test_variable_declaration() {
        assert_eq!(
            lex("var x = 5;"),
            vec![
                Token::Var,
                Token::Ident("x".to_string()),
                Token::Assign,
                Token::Integer(BigInt::from(5)),
                Token::Semicolon
            ]
        );
    }

    #[test]
    fn test_lambda_with_captures() {
        assert_eq!(
            lex("fn[x](y) { return x; }"),
            vec![
                Token::Fn,
                Token::LBracket,
                Token::Ident("x".to_string()),
                Token::RBracket,
                Token::LParen,
                Token::Ident("y".to_string()),
                Token::RParen,
                Token::LBrace,
                Token::Return,
                Token::Ident("x".to_string()),
                Token::Semicolon,
                Token::RBrace
            ]
        );
    }

    #[test]
    fn test_token_spans() {
        let tokens = tokenize("var x");
        assert_eq!(tokens.len(), 2);
        assert_eq!(tokens[0].1, Span::new(0, 3));
        assert_eq!(tokens[1].1, Span::new(4, 5));
    }

    #[test]
    fn test_decimal_needs_trailing_digits() {
        // `1.` is an integer followed by a stray dot, not a decimal literal
        assert_eq!(
            lex("1."),
            vec![Token::Integer(BigInt::from(1)), Token::Unknown('.')]
        );
    }
}
