use super::*;

fn kinds(body: &[&str]) -> Vec<TokenKind> {
    let body: Vec<String> = body.iter().map(|s| s.to_string()).collect();
    let result = tokenize("Test", &body);
    assert!(result.errors.is_empty(), "unexpected lex errors: {:?}", result.errors);
    result.tokens.into_iter().map(|t| t.kind).collect()
}

#[test]
fn plain_text_line_is_a_single_text_token() {
    let kinds = kinds(&["Hello, world!"]);
    assert_eq!(kinds, vec![TokenKind::Text("Hello, world!".into()), TokenKind::Eof]);
}

#[test]
fn blank_and_comment_lines_produce_no_tokens() {
    let kinds = kinds(&["", "// a comment", "   "]);
    assert_eq!(kinds, vec![TokenKind::Eof]);
}

#[test]
fn hashtag_is_split_from_preceding_text() {
    let kinds = kinds(&["Hi there #line:abc123"]);
    assert_eq!(
        kinds,
        vec![
            TokenKind::Text("Hi there ".into()),
            TokenKind::HashTag("line:abc123".into()),
            TokenKind::Eof,
        ]
    );
}

#[test]
fn option_with_label_and_destination() {
    let kinds = kinds(&["[[Go north|North]]"]);
    assert_eq!(
        kinds,
        vec![
            TokenKind::OptionOpen,
            TokenKind::Text("Go north".into()),
            TokenKind::Pipe,
            TokenKind::Text("North".into()),
            TokenKind::OptionClose,
            TokenKind::Eof,
        ]
    );
}

#[test]
fn bare_shortcut_option_destination() {
    let kinds = kinds(&["[[North]]"]);
    assert_eq!(
        kinds,
        vec![TokenKind::OptionOpen, TokenKind::Text("North".into()), TokenKind::OptionClose, TokenKind::Eof]
    );
}

#[test]
fn shortcut_line_emits_arrow_token() {
    let kinds = kinds(&["-> Go north"]);
    assert_eq!(kinds, vec![TokenKind::Arrow, TokenKind::Text(" Go north".into()), TokenKind::Eof]);
}

#[test]
fn set_command_lexes_keyword_then_expression() {
    let kinds = kinds(&["<<set $gold to $gold + 10>>"]);
    assert_eq!(
        kinds,
        vec![
            TokenKind::CommandOpen,
            TokenKind::KwSet,
            TokenKind::Variable("gold".into()),
            TokenKind::KwTo,
            TokenKind::Variable("gold".into()),
            TokenKind::Op(Operator::Add),
            TokenKind::Number(10.0),
            TokenKind::CommandClose,
            TokenKind::Eof,
        ]
    );
}

#[test]
fn if_command_lexes_comparison_expression() {
    let kinds = kinds(&["<<if $gold >= 10>>"]);
    assert_eq!(
        kinds,
        vec![
            TokenKind::CommandOpen,
            TokenKind::KwIf,
            TokenKind::Variable("gold".into()),
            TokenKind::Op(Operator::GreaterThanOrEqualTo),
            TokenKind::Number(10.0),
            TokenKind::CommandClose,
            TokenKind::Eof,
        ]
    );
}

#[test]
fn generic_command_is_captured_as_raw_text() {
    let kinds = kinds(&["<<wait 2.5>>"]);
    assert_eq!(
        kinds,
        vec![TokenKind::CommandOpen, TokenKind::Text("wait 2.5".into()), TokenKind::CommandClose, TokenKind::Eof]
    );
}

#[test]
fn string_literal_handles_escaped_quote() {
    let kinds = kinds(&["<<set $name to \"Jo \\\"Blow\\\"\">>"]);
    assert_eq!(
        kinds,
        vec![
            TokenKind::CommandOpen,
            TokenKind::KwSet,
            TokenKind::Variable("name".into()),
            TokenKind::KwTo,
            TokenKind::Str("Jo \"Blow\"".into()),
            TokenKind::CommandClose,
            TokenKind::Eof,
        ]
    );
}

#[test]
fn unterminated_command_reports_an_error() {
    let body = vec!["<<set $x to 1".to_string()];
    let result = tokenize("Test", &body);
    assert!(!result.errors.is_empty());
}

#[test]
fn unterminated_option_reports_an_error() {
    let body = vec!["[[North".to_string()];
    let result = tokenize("Test", &body);
    assert!(!result.errors.is_empty());
}

#[test]
fn braces_are_grouping_punctuation_in_expression_mode() {
    let kinds = kinds(&["<<if ($gold + 1) * 2 == 4>>"]);
    assert!(kinds.contains(&TokenKind::LParen));
    assert!(kinds.contains(&TokenKind::RParen));
}
