use crate::expr::Expr;
use num_rational::BigRational;
use num_traits::One;

pub fn pretty(expr: &Expr) -> String {
    fn pp(ctx: u8, expr: &Expr) -> String {
        match expr {
            Expr::Variable(v) => v.clone(),
            Expr::Constant(r) => {
                let body = show_rational(r);
                // a fraction or negative literal is a product/sum in disguise
                if r.is_integer() && r >= &BigRational::from_integer(0.into()) {
                    body
                } else {
                    bracket(ctx, 2, body)
                }
            }
            Expr::Pi => "pi".to_string(),
            Expr::Infinity => "oo".to_string(),

            Expr::Add(a, b) => {
                let s_a = pp(1, a);
                let (neg_b, b_inner) = split_neg(b);
                let s_b = pp(2, &b_inner);
                let body = format!("{s_a} {} {s_b}", if neg_b { "-" } else { "+" });
                bracket(ctx, 1, body)
            }

            Expr::Sub(a, b) => {
                let s_a = pp(1, a);
                let (neg_b, b_inner) = split_neg(b);
                let s_b = pp(2, &b_inner);
                let body = format!("{s_a} {} {s_b}", if neg_b { "+" } else { "-" });
                bracket(ctx, 1, body)
            }

            Expr::Mul(a, b) => {
                let (na, a_inner) = split_neg(a);
                let (nb, b_inner) = split_neg(b);
                let body = if a_inner.is_one() {
                    pp(2, &b_inner)
                } else {
                    format!("{}*{}", pp(2, &a_inner), pp(3, &b_inner))
                };
                if na ^ nb {
                    bracket(ctx, 2, format!("-{body}"))
                } else {
                    bracket(ctx, 2, body)
                }
            }

            Expr::Div(a, b) => {
                let (na, a_inner) = split_neg(a);
                let (nb, b_inner) = split_neg(b);
                let body = format!("{}/{}", pp(2, &a_inner), pp(3, &b_inner));
                if na ^ nb {
                    bracket(ctx, 2, format!("-{body}"))
                } else {
                    bracket(ctx, 2, body)
                }
            }

            Expr::Pow(a, b) => bracket(ctx, 3, format!("{}^{}", pp(4, a), pp(4, b))),

            Expr::Neg(a) => {
                let (is_neg, inner) = split_neg(a);
                if is_neg {
                    pp(ctx, &inner)
                } else {
                    bracket(ctx, 2, format!("-{}", pp(3, &inner)))
                }
            }

            Expr::Exp(a) if a.is_one() => "E".to_string(),
            Expr::Sin(a) => format!("sin({})", pp(0, a)),
            Expr::Cos(a) => format!("cos({})", pp(0, a)),
            Expr::Tan(a) => format!("tan({})", pp(0, a)),
            Expr::Asin(a) => format!("asin({})", pp(0, a)),
            Expr::Acos(a) => format!("acos({})", pp(0, a)),
            Expr::Atan(a) => format!("atan({})", pp(0, a)),
            Expr::Exp(a) => format!("exp({})", pp(0, a)),
            Expr::Log(a) => format!("log({})", pp(0, a)),
            Expr::Abs(a) => format!("Abs({})", pp(0, a)),

            Expr::Integral {
                integrand,
                var,
                bounds,
            } => match bounds {
                Some(b) => format!(
                    "Integral({}, ({var}, {}, {}))",
                    pp(0, integrand),
                    pp(0, &b.0),
                    pp(0, &b.1)
                ),
                None => format!("Integral({}, {var})", pp(0, integrand)),
            },
        }
    }

    pp(0, expr)
}

fn split_neg(expr: &Expr) -> (bool, Expr) {
    match expr {
        Expr::Neg(inner) => (true, *inner.clone()),
        Expr::Constant(r) if r < &BigRational::from_integer(0.into()) => (true, Expr::Constant(-r)),
        Expr::Mul(a, b) => match &**a {
            Expr::Constant(r) if r < &BigRational::from_integer(0.into()) => {
                let magnitude = Expr::Constant(-r);
                if magnitude.is_one() {
                    (true, *b.clone())
                } else {
                    (true, Expr::Mul(magnitude.boxed(), b.clone()))
                }
            }
            _ => (false, expr.clone()),
        },
        other => (false, other.clone()),
    }
}

fn bracket(ctx: u8, prec: u8, body: String) -> String {
    if prec < ctx {
        format!("({body})")
    } else {
        body
    }
}

fn show_rational(r: &BigRational) -> String {
    let n = r.numer().clone();
    let d = r.denom().clone();
    if d.is_one() {
        format!("{n}")
    } else if n < 0.into() {
        format!("-{}/{}", -n, d)
    } else {
        format!("{}/{}", n, d)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::expr::{add, div, mul, neg, pow, sub};

    fn x() -> Expr {
        Expr::var("x")
    }

    #[test]
    fn renders_sums_and_products() {
        assert_eq!(pretty(&sub(Expr::Pi, Expr::integer(1))), "pi - 1");
        assert_eq!(pretty(&mul(Expr::integer(2), x())), "2*x");
        assert_eq!(
            pretty(&add(mul(Expr::integer(-3), x()), Expr::integer(1))),
            "-3*x + 1"
        );
        assert_eq!(
            pretty(&add(x(), mul(Expr::integer(-3), x()))),
            "x - 3*x"
        );
    }

    #[test]
    fn brackets_follow_precedence() {
        assert_eq!(pretty(&pow(add(x(), Expr::integer(1)), Expr::integer(2))), "(x + 1)^2");
        assert_eq!(pretty(&div(Expr::integer(1), mul(Expr::integer(2), x()))), "1/(2*x)");
        assert_eq!(pretty(&mul(Expr::constant(1, 2), x())), "1/2*x");
        assert_eq!(pretty(&pow(x(), Expr::constant(1, 2))), "x^(1/2)");
        assert_eq!(pretty(&neg(pow(x(), Expr::integer(2)))), "-x^2");
        assert_eq!(pretty(&pow(neg(x()), Expr::integer(2))), "(-x)^2");
    }

    #[test]
    fn renders_constants_and_integrals() {
        assert_eq!(pretty(&Expr::e()), "E");
        assert_eq!(
            pretty(&Expr::integral(x(), "x", Some((Expr::integer(0), Expr::Infinity)))),
            "Integral(x, (x, 0, oo))"
        );
    }
}
