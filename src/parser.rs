//! Formula grammar. Names are left unresolved here; the normalizer maps them through the
//! symbol table.

use crate::error::{CasError, Result};
use crate::expr::{Expr, Rational};
use nom::IResult;
use nom::branch::alt;
use nom::bytes::complete::tag;
use nom::character::complete::{alpha1, alphanumeric1, char, digit0, digit1, multispace0, one_of};
use nom::combinator::{all_consuming, map, opt, recognize, value};
use nom::error::{ErrorKind, ParseError, VerboseError, convert_error};
use nom::multi::{fold_many0, many0, separated_list1};
use nom::sequence::{delimited, pair, preceded, tuple};
use num_bigint::BigInt;
use num_traits::{Num, One};

type PResult<'a, O> = IResult<&'a str, O, VerboseError<&'a str>>;

/// Deepest bracket nesting accepted before any recursive descent starts.
const MAX_NESTING: usize = 64;
/// Longest token stream accepted; bounds operator chains that nest without brackets.
const MAX_TOKENS: usize = 400;

pub fn parse_expr(input: &str) -> Result<Expr> {
    if input.trim().is_empty() {
        return Err(CasError::Parse("empty expression".into()));
    }
    check_complexity(input)?;
    match all_consuming(ws(parse_add_sub))(input) {
        Ok((_, expr)) => Ok(expr),
        Err(nom::Err::Error(e)) | Err(nom::Err::Failure(e)) => {
            Err(CasError::Parse(convert_error(input, e)))
        }
        Err(nom::Err::Incomplete(_)) => Err(CasError::Parse("incomplete input".into())),
    }
}

/// Flat scan that rejects inputs whose parse tree would be too deep to walk recursively.
fn check_complexity(input: &str) -> Result<()> {
    let mut depth = 0usize;
    let mut tokens = 0usize;
    let mut in_word = false;
    for c in input.chars() {
        let word_char = c.is_alphanumeric() || c == '_' || c == '.';
        if word_char {
            if !in_word {
                tokens += 1;
            }
        } else if !c.is_whitespace() {
            tokens += 1;
        }
        in_word = word_char;
        match c {
            '(' | '[' => {
                depth += 1;
                if depth > MAX_NESTING {
                    return Err(CasError::Parse("expression nested too deeply".into()));
                }
            }
            ')' | ']' => depth = depth.saturating_sub(1),
            _ => {}
        }
        if tokens > MAX_TOKENS {
            return Err(CasError::Parse("expression too long".into()));
        }
    }
    Ok(())
}

fn parse_add_sub(input: &str) -> PResult<'_, Expr> {
    let (rest, init) = parse_mul_div(input)?;
    fold_many0(
        pair(ws(one_of("+-")), parse_mul_div),
        move || init.clone(),
        |acc, (op, rhs)| match op {
            '+' => Expr::Add(acc.boxed(), rhs.boxed()),
            _ => Expr::Sub(acc.boxed(), rhs.boxed()),
        },
    )(rest)
}

fn parse_mul_div(input: &str) -> PResult<'_, Expr> {
    let (rest, init) = parse_unary(input)?;
    fold_many0(
        alt((
            pair(ws(one_of("*/")), parse_unary),
            // juxtaposition: `2x`, `2(x+1)`, `x sin(x)`
            map(parse_pow, |rhs| ('*', rhs)),
        )),
        move || init.clone(),
        |acc, (op, rhs)| match op {
            '*' => Expr::Mul(acc.boxed(), rhs.boxed()),
            _ => Expr::Div(acc.boxed(), rhs.boxed()),
        },
    )(rest)
}

fn parse_unary(input: &str) -> PResult<'_, Expr> {
    alt((
        map(preceded(ws(char('-')), parse_unary), |e| Expr::Neg(e.boxed())),
        preceded(ws(char('+')), parse_unary),
        parse_pow,
    ))(input)
}

fn parse_pow(input: &str) -> PResult<'_, Expr> {
    let (rest, base) = parse_primary(input)?;
    match preceded(ws(alt((tag("**"), tag("^")))), parse_unary)(rest) {
        Ok((next, exp)) => Ok((next, Expr::Pow(base.boxed(), exp.boxed()))),
        Err(nom::Err::Failure(e)) => Err(nom::Err::Failure(e)),
        Err(_) => Ok((rest, base)),
    }
}

fn parse_primary(input: &str) -> PResult<'_, Expr> {
    alt((
        parse_parens,
        parse_integral,
        parse_function,
        parse_number,
        value(Expr::Pi, ws(char('π'))),
        map(ws(identifier), |s: &str| Expr::Variable(s.to_string())),
    ))(input)
}

fn parse_parens(input: &str) -> PResult<'_, Expr> {
    delimited(ws(char('(')), parse_add_sub, ws(char(')')))(input)
}

/// `Integral(f, x)` or `Integral(f, (x, a, b))`.
fn parse_integral(input: &str) -> PResult<'_, Expr> {
    let (rest, _) = ws(tag("Integral"))(input)?;
    let (rest, _) = ws(char('('))(rest)?;
    let (rest, integrand) = parse_add_sub(rest)?;
    let (rest, _) = ws(char(','))(rest)?;
    let bounded = map(
        delimited(
            ws(char('(')),
            tuple((
                ws(identifier),
                preceded(ws(char(',')), parse_add_sub),
                preceded(ws(char(',')), parse_add_sub),
            )),
            ws(char(')')),
        ),
        |(var, lower, upper)| (var, Some((lower, upper))),
    );
    let bare = map(ws(identifier), |var| (var, None));
    let (rest, (var, bounds)) = alt((bounded, bare))(rest)?;
    let (rest, _) = ws(char(')'))(rest)?;
    Ok((rest, Expr::integral(integrand, var, bounds)))
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum Function {
    Sin,
    Cos,
    Tan,
    Cot,
    Sec,
    Csc,
    Asin,
    Acos,
    Atan,
    Exp,
    Log,
    Sqrt,
    Abs,
}

fn function_kind(name: &str) -> Option<Function> {
    Some(match name {
        "sin" => Function::Sin,
        "cos" => Function::Cos,
        "tan" => Function::Tan,
        "cot" => Function::Cot,
        "sec" => Function::Sec,
        "csc" => Function::Csc,
        "asin" | "arcsin" => Function::Asin,
        "acos" | "arccos" => Function::Acos,
        "atan" | "arctan" => Function::Atan,
        "exp" => Function::Exp,
        "log" | "ln" => Function::Log,
        "sqrt" => Function::Sqrt,
        "abs" | "Abs" => Function::Abs,
        _ => return None,
    })
}

fn parse_function(input: &str) -> PResult<'_, Expr> {
    let (rest, name) = ws(identifier)(input)?;
    let func = match function_kind(name) {
        Some(f) => f,
        None => return Err(nom::Err::Error(VerboseError::from_error_kind(input, ErrorKind::Tag))),
    };
    let call_args = delimited(
        ws(char('(')),
        separated_list1(ws(char(',')), parse_add_sub),
        ws(char(')')),
    );
    let (rest, args) = alt((call_args, map(parse_pow, |arg| vec![arg])))(rest)?;
    match build_function(func, args) {
        Some(expr) => Ok((rest, expr)),
        None => Err(nom::Err::Failure(VerboseError::from_error_kind(
            input,
            ErrorKind::Verify,
        ))),
    }
}

fn build_function(func: Function, mut args: Vec<Expr>) -> Option<Expr> {
    let arity = args.len();
    if func == Function::Log && arity == 2 {
        let base = args.pop()?;
        let arg = args.pop()?;
        return Some(Expr::Div(
            Expr::Log(arg.boxed()).boxed(),
            Expr::Log(base.boxed()).boxed(),
        ));
    }
    if arity != 1 {
        return None;
    }
    let arg = args.pop()?.boxed();
    let one = || Expr::Constant(Rational::one()).boxed();
    Some(match func {
        Function::Sin => Expr::Sin(arg),
        Function::Cos => Expr::Cos(arg),
        Function::Tan => Expr::Tan(arg),
        Function::Cot => Expr::Div(Expr::Cos(arg.clone()).boxed(), Expr::Sin(arg).boxed()),
        Function::Sec => Expr::Div(one(), Expr::Cos(arg).boxed()),
        Function::Csc => Expr::Div(one(), Expr::Sin(arg).boxed()),
        Function::Asin => Expr::Asin(arg),
        Function::Acos => Expr::Acos(arg),
        Function::Atan => Expr::Atan(arg),
        Function::Exp => Expr::Exp(arg),
        Function::Log => Expr::Log(arg),
        Function::Sqrt => Expr::Pow(
            arg,
            Expr::Constant(Rational::new(1.into(), 2.into())).boxed(),
        ),
        Function::Abs => Expr::Abs(arg),
    })
}

fn parse_number(input: &str) -> PResult<'_, Expr> {
    let (rest, text) = ws(recognize(pair(digit1, opt(pair(char('.'), digit0)))))(input)?;
    match decimal_to_rational(text) {
        Some(r) => Ok((rest, Expr::Constant(r))),
        None => Err(nom::Err::Failure(VerboseError::from_error_kind(
            input,
            ErrorKind::Digit,
        ))),
    }
}

fn decimal_to_rational(text: &str) -> Option<Rational> {
    let (int_part, frac_part) = match text.split_once('.') {
        Some((i, f)) => (i, f),
        None => (text, ""),
    };
    let digits = format!("{int_part}{frac_part}");
    let numer = BigInt::from_str_radix(&digits, 10).ok()?;
    let denom = num_traits::pow(BigInt::from(10), frac_part.len());
    Some(Rational::new(numer, denom))
}

fn identifier(input: &str) -> PResult<'_, &str> {
    recognize(pair(
        alt((alpha1, tag("_"))),
        many0(alt((alphanumeric1, tag("_")))),
    ))(input)
}

fn ws<'a, F, O>(inner: F) -> impl FnMut(&'a str) -> PResult<'a, O>
where
    F: FnMut(&'a str) -> PResult<'a, O>,
{
    delimited(multispace0, inner, multispace0)
}
