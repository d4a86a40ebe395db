//! Final-answer extraction from free-form solution text, plus LaTeX cleanup.

use std::sync::OnceLock;

use regex::Regex;

const AFTER_EQUALS: &str = r"=\s*([^。，,\s]+)";
const CHOICE_LETTER: &str = r"(?:答案|answer)\s*(?:为|是|：|:|is|equals)*\s*([A-D])(?:[^A-Za-z]|$)";
const TRAILING_TOKEN: &str =
    r"((?:pi|π|[\d.+\-/*^()])(?:\s*(?:pi|π|[\d.+\-/*^()]))*)\s*[。，,]?\s*$";
const FRACTION_MACROS: &[&str] = &[r"\dfrac", r"\tfrac", r"\frac"];

/// Literal rewrites applied after fractions. Longer macros precede their prefixes.
const LATEX_TABLE: &[(&str, &str)] = &[
    (r"\mathrm{d}", ""),
    (r"\,", " "),
    (r"\;", " "),
    (r"\!", ""),
    (r"\quad", " "),
    (r"\cdot", "*"),
    (r"\times", "*"),
    (r"\arcsin", "asin"),
    (r"\arccos", "acos"),
    (r"\arctan", "atan"),
    (r"\sin", "sin"),
    (r"\cos", "cos"),
    (r"\tan", "tan"),
    (r"\cot", "cot"),
    (r"\ln", "log"),
    (r"\log", "log"),
    (r"\exp", "exp"),
    (r"\sqrt", "sqrt"),
    (r"\pi", "pi"),
    ("π", "pi"),
    (r"\infty", "oo"),
    (r"\left", ""),
    (r"\right", ""),
    (r"\Bigg", ""),
    (r"\bigg", ""),
    (r"\Big", ""),
    (r"\big", ""),
    ("{", "("),
    ("}", ")"),
];

fn cached(cell: &'static OnceLock<Option<Regex>>, pattern: &str) -> Option<&'static Regex> {
    cell.get_or_init(|| Regex::new(pattern).ok()).as_ref()
}

fn after_equals() -> Option<&'static Regex> {
    static RE: OnceLock<Option<Regex>> = OnceLock::new();
    cached(&RE, AFTER_EQUALS)
}

fn choice_letter() -> Option<&'static Regex> {
    static RE: OnceLock<Option<Regex>> = OnceLock::new();
    cached(&RE, CHOICE_LETTER)
}

fn trailing_token() -> Option<&'static Regex> {
    static RE: OnceLock<Option<Regex>> = OnceLock::new();
    cached(&RE, TRAILING_TOKEN)
}

fn first_group(re: Option<&Regex>, text: &str) -> Option<String> {
    re?.captures(text)?
        .get(1)
        .map(|m| m.as_str().to_string())
}

/// Pull the final-answer token out of `text`.
///
/// Tries, in order: the text after the first `=`, an explicit choice letter after
/// "答案"/"answer", and a trailing numeric or `π` expression. Falls back to the whole
/// trimmed input.
pub fn extract_answer(text: &str) -> String {
    if let Some(token) = first_group(after_equals(), text) {
        return token;
    }
    if let Some(letter) = first_group(choice_letter(), text) {
        return letter;
    }
    if let Some(token) = first_group(trailing_token(), text) {
        let token = token.trim().trim_end_matches('.').trim_end();
        if !token.is_empty() {
            return token.to_string();
        }
    }
    text.trim().to_string()
}

/// Rewrite the fixed LaTeX macro table into parser syntax. Idempotent.
pub fn clean_latex(input: &str) -> String {
    let mut current = clean_once(input);
    loop {
        let next = clean_once(&current);
        if next == current {
            return current;
        }
        current = next;
    }
}

fn clean_once(input: &str) -> String {
    let mut s = rewrite_fractions(&input.replace('$', ""));
    for (from, to) in LATEX_TABLE {
        s = s.replace(from, to);
    }
    s.trim().to_string()
}

#[derive(Clone, Copy)]
enum BraceAction {
    /// Closes a numerator; resume scanning just inside the denominator.
    Numerator { resume: usize },
    Denominator,
}

/// `\frac{a}{b}` becomes `((a)/(b))` for any balanced `a` and `b`, nested fractions
/// included. Fractions without two balanced groups are left untouched.
fn rewrite_fractions(input: &str) -> String {
    let chars: Vec<char> = input.chars().collect();
    let closing = matching_braces(&chars);
    let mut actions: Vec<Option<BraceAction>> = vec![None; chars.len()];
    let mut out = String::with_capacity(input.len());

    let mut i = 0;
    while i < chars.len() {
        if let Some(action) = actions[i] {
            match action {
                BraceAction::Numerator { resume } => {
                    out.push_str(")/(");
                    i = resume;
                }
                BraceAction::Denominator => {
                    out.push_str("))");
                    i += 1;
                }
            }
            continue;
        }
        if chars[i] == '\\' {
            if let Some((num_open, den_open)) = fraction_groups(&chars, &closing, i) {
                if let (Some(num_close), Some(den_close)) = (closing[num_open], closing[den_open]) {
                    actions[num_close] = Some(BraceAction::Numerator { resume: den_open + 1 });
                    actions[den_close] = Some(BraceAction::Denominator);
                    out.push_str("((");
                    i = num_open + 1;
                    continue;
                }
            }
        }
        out.push(chars[i]);
        i += 1;
    }
    out
}

/// Index of the matching `}` for every balanced `{`.
fn matching_braces(chars: &[char]) -> Vec<Option<usize>> {
    let mut closing = vec![None; chars.len()];
    let mut open = Vec::new();
    for (i, &c) in chars.iter().enumerate() {
        match c {
            '{' => open.push(i),
            '}' => {
                if let Some(start) = open.pop() {
                    closing[start] = Some(i);
                }
            }
            _ => {}
        }
    }
    closing
}

/// Opening braces of the numerator and denominator of a fraction macro at `at`.
fn fraction_groups(chars: &[char], closing: &[Option<usize>], at: usize) -> Option<(usize, usize)> {
    let macro_len = FRACTION_MACROS
        .iter()
        .map(|m| m.chars().collect::<Vec<_>>())
        .find(|m| chars[at..].starts_with(m))?
        .len();
    let num_open = skip_spaces(chars, at + macro_len);
    if chars.get(num_open) != Some(&'{') {
        return None;
    }
    let den_open = skip_spaces(chars, closing[num_open]? + 1);
    if chars.get(den_open) != Some(&'{') {
        return None;
    }
    closing[den_open]?;
    Some((num_open, den_open))
}

fn skip_spaces(chars: &[char], mut i: usize) -> usize {
    while chars.get(i).is_some_and(|c| c.is_whitespace()) {
        i += 1;
    }
    i
}

/// Extract then clean: the string handed to the normalizer for a candidate answer.
pub fn candidate_token(text: &str) -> String {
    clean_latex(&extract_answer(text))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn equals_sign_wins() {
        assert_eq!(extract_answer("所以 f'(x) = 2x，证毕"), "2x");
        assert_eq!(extract_answer("I = \\frac{1}{2}."), "\\frac{1}{2}.");
    }

    #[test]
    fn choice_letters() {
        assert_eq!(extract_answer("综上，答案为 C。"), "C");
        assert_eq!(extract_answer("The answer is B"), "B");
        assert_eq!(extract_answer("answer: Apple"), "answer: Apple");
    }

    #[test]
    fn trailing_tokens() {
        assert_eq!(extract_answer("...因此答案为 π - 1。"), "π - 1");
        assert_eq!(extract_answer("the value is 3/4."), "3/4");
        assert_eq!(extract_answer("  no token here  "), "no token here");
    }

    #[test]
    fn cleans_fixed_macros() {
        assert_eq!(clean_latex("$\\frac{\\pi}{2}$"), "((pi)/(2))");
        assert_eq!(clean_latex("\\sin^{2} x \\cdot \\ln x"), "sin^(2) x * log x");
        assert_eq!(clean_latex("\\left( x + 1 \\right)\\mathrm{d}x"), "( x + 1 )x");
        assert_eq!(clean_latex("\\Bigg( \\infty \\Bigg)"), "( oo )");
        assert_eq!(clean_latex("\\unknown{x}"), "\\unknown(x)");
    }

    #[test]
    fn cleaning_is_idempotent() {
        let samples = [
            "",
            "  $x$ ",
            "\\\\sin x",
            "\\dfrac{\\frac{1}{x}}{2}",
            "π - 1",
            "\\sqrt{x^{2} + 1}",
            "{{}}",
            "\\big\\Big\\bigg",
        ];
        for s in samples {
            let once = clean_latex(s);
            assert_eq!(clean_latex(&once), once, "input {s:?}");
        }
    }

    #[test]
    fn nested_fractions_flatten_inside_out() {
        assert_eq!(clean_latex("\\frac{\\frac{1}{x}}{2}"), "((((1)/(x)))/(2))");
    }

    #[test]
    fn fractions_with_braced_arguments() {
        assert_eq!(
            clean_latex("\\frac{x}{\\sqrt{x^2+1}}"),
            "((x)/(sqrt(x^2+1)))"
        );
        assert_eq!(clean_latex("\\frac{x^{2}}{2}"), "((x^(2))/(2))");
        assert_eq!(
            clean_latex("\\dfrac {e^{x}} {1 + \\frac{1}{x}}"),
            "((e^(x))/(1 + ((1)/(x))))"
        );
    }

    #[test]
    fn malformed_fractions_are_left_alone() {
        assert_eq!(clean_latex("\\frac{1}"), "\\frac(1)");
        assert_eq!(clean_latex("\\frac{1}{2"), "\\frac(1)(2");
        assert_eq!(clean_latex("\\frac 12"), "\\frac 12");
    }

    /// Deterministic mixes of macros, braces, and dollar signs.
    fn generated_inputs(count: usize) -> Vec<String> {
        const FRAGMENTS: &[&str] = &[
            "$", "{", "}", "\\frac", "\\dfrac", "\\tfrac", "\\sqrt", "\\sin", "x", "^",
            "\\left(", "\\right)", "\\,", "π", "\\pi", "2", "\\", "\\mathrm{d}", " ",
            "\\Big", "=", "答案", "\\cdot", "1",
        ];
        let mut state: u64 = 0x9e37_79b9_7f4a_7c15;
        let mut next = move || {
            state = state
                .wrapping_mul(6_364_136_223_846_793_005)
                .wrapping_add(1_442_695_040_888_963_407);
            (state >> 33) as usize
        };
        (0..count)
            .map(|_| {
                let len = 1 + next() % 24;
                (0..len).map(|_| FRAGMENTS[next() % FRAGMENTS.len()]).collect()
            })
            .collect()
    }

    #[test]
    fn cleaning_is_idempotent_on_generated_inputs() {
        for s in generated_inputs(2_000) {
            let once = clean_latex(&s);
            assert_eq!(clean_latex(&once), once, "input {s:?}");
            assert!(!once.contains('$'), "input {s:?}");
            assert!(!once.contains('{') && !once.contains('}'), "input {s:?}");
        }
    }

    #[test]
    fn candidate_token_for_pi_minus_one() {
        assert_eq!(candidate_token("...因此答案为 π - 1。"), "pi - 1");
    }
}
