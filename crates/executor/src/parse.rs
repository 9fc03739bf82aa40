//! Script grammar
//!
//! One statement per line: `name = expression` or a bare expression. An
//! expression is a literal, a variable reference, or a call on a dotted
//! path. Blank lines and `#` comments are skipped. There is no control
//! flow, no operators and no user-defined functions; anything else is a
//! syntax error with the offending line number.

use nom::{
    IResult,
    branch::alt,
    bytes::complete::{tag, take_while, take_while1},
    character::complete::{char, digit1, multispace0},
    combinator::{all_consuming, map, opt, recognize},
    multi::{separated_list0, separated_list1},
    sequence::{delimited, pair, terminated, tuple},
};

/// Expression node
#[derive(Debug, Clone, PartialEq)]
pub enum Expr {
    Int(i64),
    Float(f64),
    Str(String),
    Bool(bool),
    /// Variable reference
    Ident(String),
    /// Call on a dotted path, e.g. `ta.rsi(series, 14)`
    Call { path: Vec<String>, args: Vec<Expr> },
}

/// One executable statement with its 1-based source line
#[derive(Debug, Clone, PartialEq)]
pub struct Stmt {
    pub line: usize,
    /// Binding target; None for a bare expression
    pub target: Option<String>,
    pub expr: Expr,
}

/// Parse failure with the offending 1-based line
#[derive(Debug, Clone, PartialEq)]
pub struct ParseFailure {
    pub line: usize,
    pub message: String,
}

fn ws<'a, O>(
    inner: impl FnMut(&'a str) -> IResult<&'a str, O>,
) -> impl FnMut(&'a str) -> IResult<&'a str, O> {
    delimited(multispace0, inner, multispace0)
}

fn identifier(input: &str) -> IResult<&str, &str> {
    recognize(pair(
        take_while1(|c: char| c.is_ascii_alphabetic() || c == '_'),
        take_while(|c: char| c.is_ascii_alphanumeric() || c == '_'),
    ))(input)
}

fn string_literal(input: &str) -> IResult<&str, Expr> {
    let double = delimited(char('"'), take_while(|c| c != '"'), char('"'));
    let single = delimited(char('\''), take_while(|c| c != '\''), char('\''));
    map(alt((double, single)), |s: &str| Expr::Str(s.to_string()))(input)
}

fn number_literal(input: &str) -> IResult<&str, Expr> {
    let (rest, text) = recognize(tuple((
        opt(char('-')),
        digit1,
        opt(pair(char('.'), digit1)),
    )))(input)?;
    let expr = if text.contains('.') {
        Expr::Float(text.parse().unwrap_or(f64::NAN))
    } else {
        match text.parse::<i64>() {
            Ok(i) => Expr::Int(i),
            Err(_) => Expr::Float(text.parse().unwrap_or(f64::NAN)),
        }
    };
    Ok((rest, expr))
}

fn call(input: &str) -> IResult<&str, Expr> {
    let (rest, (path, args)) = pair(
        separated_list1(char('.'), identifier),
        delimited(
            ws(char('(')),
            separated_list0(ws(char(',')), expr),
            char(')'),
        ),
    )(input)?;
    Ok((
        rest,
        Expr::Call {
            path: path.into_iter().map(str::to_string).collect(),
            args,
        },
    ))
}

fn ident_or_keyword(input: &str) -> IResult<&str, Expr> {
    map(identifier, |name| match name {
        "true" | "True" => Expr::Bool(true),
        "false" | "False" => Expr::Bool(false),
        _ => Expr::Ident(name.to_string()),
    })(input)
}

pub fn expr(input: &str) -> IResult<&str, Expr> {
    alt((string_literal, number_literal, call, ident_or_keyword))(input)
}

fn statement(input: &str) -> IResult<&str, (Option<String>, Expr)> {
    let assignment = map(
        tuple((
            terminated(identifier, ws(tag("="))),
            expr,
        )),
        |(name, value)| (Some(name.to_string()), value),
    );
    alt((assignment, map(expr, |e| (None, e))))(input)
}

/// Parse a whole script into statements, skipping blanks and comments
pub fn parse_script(source: &str) -> Result<Vec<Stmt>, ParseFailure> {
    let mut statements = Vec::new();
    for (index, raw) in source.lines().enumerate() {
        let line = index + 1;
        let trimmed = raw.trim();
        if trimmed.is_empty() || trimmed.starts_with('#') {
            continue;
        }
        match all_consuming(ws(statement))(trimmed) {
            Ok((_, (target, expr))) => statements.push(Stmt { line, target, expr }),
            Err(_) => {
                return Err(ParseFailure {
                    line,
                    message: format!("cannot parse statement: {trimmed}"),
                });
            }
        }
    }
    Ok(statements)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn assignment_with_call() {
        let script = "bars = copy_rates_from_pos(\"EURUSD\", \"H1\", 0, 100)";
        let parsed = parse_script(script).unwrap();
        assert_eq!(parsed.len(), 1);
        assert_eq!(parsed[0].target.as_deref(), Some("bars"));
        match &parsed[0].expr {
            Expr::Call { path, args } => {
                assert_eq!(path, &["copy_rates_from_pos"]);
                assert_eq!(args.len(), 4);
                assert_eq!(args[0], Expr::Str("EURUSD".to_string()));
                assert_eq!(args[2], Expr::Int(0));
            }
            other => panic!("expected call, got {other:?}"),
        }
    }

    #[test]
    fn dotted_path_and_nesting() {
        let parsed = parse_script("result = ta.rsi(column(bars, \"close\"), 14)").unwrap();
        match &parsed[0].expr {
            Expr::Call { path, args } => {
                assert_eq!(path, &["ta", "rsi"]);
                assert!(matches!(args[0], Expr::Call { .. }));
                assert_eq!(args[1], Expr::Int(14));
            }
            other => panic!("expected call, got {other:?}"),
        }
    }

    #[test]
    fn comments_and_blank_lines_are_skipped() {
        let script = "# fetch\n\nbars = version()\n# done\nresult = bars\n";
        let parsed = parse_script(script).unwrap();
        assert_eq!(parsed.len(), 2);
        assert_eq!(parsed[1].line, 5);
    }

    #[test]
    fn negative_and_float_literals() {
        let parsed = parse_script("x = -3\ny = 1.5").unwrap();
        assert_eq!(parsed[0].expr, Expr::Int(-3));
        assert_eq!(parsed[1].expr, Expr::Float(1.5));
    }

    #[test]
    fn garbage_reports_line_number() {
        let err = parse_script("bars = version()\nif x > 2:").unwrap_err();
        assert_eq!(err.line, 2);
    }

    #[test]
    fn single_quoted_strings_are_accepted() {
        let parsed = parse_script("s = 'EURUSD'").unwrap();
        assert_eq!(parsed[0].expr, Expr::Str("EURUSD".to_string()));
    }
}
