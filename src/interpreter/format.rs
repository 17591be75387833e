//! Format-spec mini-language for f-strings and `str.format`
//!
//! `[[fill]align][sign][#][0][width][,|_][.precision][type]`

use crate::interpreter::engine::Interpreter;
use crate::interpreter::errors::{ResourceKind, TraceError};
use crate::memory::value::{format_float, Value};

/// Why a value could not be formatted
#[derive(Debug, PartialEq)]
pub enum FormatError {
    /// Malformed spec, or a spec the value's type does not accept
    Invalid(String),
    /// Width or precision asks for more characters than the limit allows
    TooWide { requested: usize },
}

#[derive(Debug, Default, PartialEq)]
struct FormatSpec {
    fill: Option<char>,
    align: Option<char>,
    sign: Option<char>,
    alternate: bool,
    zero: bool,
    width: usize,
    grouping: Option<char>,
    precision: Option<usize>,
    kind: Option<char>,
}

fn parse_spec(spec: &str) -> Result<FormatSpec, String> {
    let chars: Vec<char> = spec.chars().collect();
    let mut out = FormatSpec::default();
    let mut i = 0;

    let is_align = |c: char| matches!(c, '<' | '>' | '^' | '=');
    if chars.len() >= 2 && is_align(chars[1]) {
        out.fill = Some(chars[0]);
        out.align = Some(chars[1]);
        i = 2;
    } else if chars.first().copied().is_some_and(is_align) {
        out.align = Some(chars[0]);
        i = 1;
    }
    if let Some(&c @ ('+' | '-' | ' ')) = chars.get(i) {
        out.sign = Some(c);
        i += 1;
    }
    if chars.get(i) == Some(&'#') {
        out.alternate = true;
        i += 1;
    }
    if chars.get(i) == Some(&'0') {
        out.zero = true;
        i += 1;
    }
    let start = i;
    while chars.get(i).is_some_and(char::is_ascii_digit) {
        i += 1;
    }
    if i > start {
        let digits: String = chars[start..i].iter().collect();
        out.width = digits.parse().map_err(|_| "Too many decimal digits in format string".to_string())?;
    }
    if let Some(&c @ (',' | '_')) = chars.get(i) {
        out.grouping = Some(c);
        i += 1;
    }
    if chars.get(i) == Some(&'.') {
        i += 1;
        let start = i;
        while chars.get(i).is_some_and(char::is_ascii_digit) {
            i += 1;
        }
        if i == start {
            return Err("Format specifier missing precision".to_string());
        }
        let digits: String = chars[start..i].iter().collect();
        out.precision = Some(digits.parse().map_err(|_| "Too many decimal digits in format string".to_string())?);
    }
    match &chars[i..] {
        [] => {}
        [c] => out.kind = Some(*c),
        _ => return Err("Invalid format specifier".to_string()),
    }
    Ok(out)
}

/// Insert a separator every `every` digits from the right
fn group_digits(digits: &str, sep: char, every: usize) -> String {
    let count = digits.chars().count();
    let mut out = String::with_capacity(digits.len() + count / every);
    for (i, c) in digits.chars().enumerate() {
        if i > 0 && (count - i) % every == 0 {
            out.push(sep);
        }
        out.push(c);
    }
    out
}

/// Scientific notation with a signed two-digit exponent
fn scientific(x: f64, precision: usize, upper: bool) -> String {
    let raw = format!("{:.*e}", precision, x);
    let (mantissa, exponent) = raw.split_once('e').unwrap_or((raw.as_str(), "0"));
    let exponent: i32 = exponent.parse().unwrap_or(0);
    let sign = if exponent < 0 { '-' } else { '+' };
    let e = if upper { 'E' } else { 'e' };
    format!("{}{}{}{:02}", mantissa, e, sign, exponent.abs())
}

fn strip_fraction_zeros(text: &str) -> String {
    if !text.contains('.') {
        return text.to_string();
    }
    text.trim_end_matches('0').trim_end_matches('.').to_string()
}

/// General format: fixed or scientific depending on the exponent
fn general(x: f64, precision: usize, upper: bool, alternate: bool) -> String {
    let p = precision.max(1);
    if x == 0.0 {
        return if alternate { format!("{:.*}", p - 1, 0.0) } else { "0".to_string() };
    }
    let exponent = x.abs().log10().floor() as i64;
    if exponent >= -4 && exponent < p as i64 {
        let decimals = (p as i64 - 1 - exponent).max(0) as usize;
        let fixed = format!("{:.*}", decimals, x);
        if alternate { fixed } else { strip_fraction_zeros(&fixed) }
    } else {
        let sci = scientific(x, p - 1, upper);
        if alternate {
            return sci;
        }
        match sci.split_once(if upper { 'E' } else { 'e' }) {
            Some((mantissa, exp)) => {
                format!("{}{}{}", strip_fraction_zeros(mantissa), if upper { 'E' } else { 'e' }, exp)
            }
            None => sci,
        }
    }
}

fn non_finite(x: f64, upper: bool) -> Option<String> {
    let text = if x.is_nan() {
        "nan"
    } else if x.is_infinite() {
        "inf"
    } else {
        return None;
    };
    Some(if upper { text.to_uppercase() } else { text.to_string() })
}

/// Render the magnitude of a float according to `kind`
fn float_body(x: f64, spec: &FormatSpec) -> Result<String, String> {
    let magnitude = x.abs();
    let upper = matches!(spec.kind, Some('F' | 'E' | 'G'));
    if let Some(text) = non_finite(magnitude, upper) {
        return Ok(match spec.kind {
            Some('%') => format!("{}%", text),
            _ => text,
        });
    }
    Ok(match spec.kind {
        Some('f' | 'F') => format!("{:.*}", spec.precision.unwrap_or(6), magnitude),
        Some('e' | 'E') => scientific(magnitude, spec.precision.unwrap_or(6), upper),
        Some('g' | 'G') => general(magnitude, spec.precision.unwrap_or(6), upper, spec.alternate),
        Some('%') => format!("{:.*}%", spec.precision.unwrap_or(6), magnitude * 100.0),
        None => match spec.precision {
            Some(p) => general(magnitude, p, false, spec.alternate),
            None => format_float(magnitude),
        },
        Some(other) => return Err(format!("Unknown format code '{}' for object of type 'float'", other)),
    })
}

fn int_body(n: i64, spec: &FormatSpec) -> Result<String, String> {
    let magnitude = n.unsigned_abs();
    let (digits, prefix) = match spec.kind {
        None | Some('d' | 'n') => (magnitude.to_string(), ""),
        Some('x') => (format!("{:x}", magnitude), "0x"),
        Some('X') => (format!("{:X}", magnitude), "0X"),
        Some('o') => (format!("{:o}", magnitude), "0o"),
        Some('b') => (format!("{:b}", magnitude), "0b"),
        Some('c') => {
            let c = u32::try_from(n)
                .ok()
                .and_then(char::from_u32)
                .ok_or_else(|| "%c arg not in range(0x110000)".to_string())?;
            return Ok(c.to_string());
        }
        Some(other) => return Err(format!("Unknown format code '{}' for object of type 'int'", other)),
    };
    let every = if matches!(spec.kind, Some('x' | 'X' | 'o' | 'b')) { 4 } else { 3 };
    let digits = match spec.grouping {
        Some(sep) => group_digits(&digits, sep, every),
        None => digits,
    };
    Ok(if spec.alternate { format!("{}{}", prefix, digits) } else { digits })
}

fn with_float_grouping(body: String, sep: Option<char>) -> String {
    let Some(sep) = sep else {
        return body;
    };
    let split = body.find(|c: char| !c.is_ascii_digit()).unwrap_or(body.len());
    let (int_part, rest) = body.split_at(split);
    format!("{}{}", group_digits(int_part, sep, 3), rest)
}

/// Pad `body` (already signed) to the requested width
fn align(sign: &str, body: &str, spec: &FormatSpec, default_align: char) -> String {
    let zero_pad = spec.zero && spec.align.is_none();
    let fill = spec.fill.unwrap_or(if zero_pad { '0' } else { ' ' });
    let align = spec.align.unwrap_or(if zero_pad { '=' } else { default_align });
    let len = sign.chars().count() + body.chars().count();
    let pad = spec.width.saturating_sub(len);
    let padding = |n: usize| std::iter::repeat(fill).take(n).collect::<String>();
    match align {
        '<' => format!("{}{}{}", sign, body, padding(pad)),
        '^' => format!("{}{}{}{}", padding(pad / 2), sign, body, padding(pad - pad / 2)),
        '=' => format!("{}{}{}", sign, padding(pad), body),
        _ => format!("{}{}{}", padding(pad), sign, body),
    }
}

fn sign_text(negative: bool, spec: &FormatSpec) -> &'static str {
    match (negative, spec.sign) {
        (true, _) => "-",
        (false, Some('+')) => "+",
        (false, Some(' ')) => " ",
        _ => "",
    }
}

/// Format `value` with a format spec, as `format(value, spec)` would.
///
/// `limit` caps the padded width and the numeric precision before any
/// text is built.
pub fn format_value(value: &Value, spec: &str, limit: usize) -> Result<String, FormatError> {
    if spec.is_empty() {
        return Ok(value.py_str());
    }
    let parsed = parse_spec(spec).map_err(FormatError::Invalid)?;
    let precision = match value {
        Value::Str(_) => 0,
        _ => parsed.precision.unwrap_or(0),
    };
    let requested = parsed.width.max(precision);
    if requested > limit {
        return Err(FormatError::TooWide { requested });
    }
    render(value, &parsed).map_err(FormatError::Invalid)
}

fn render(value: &Value, parsed: &FormatSpec) -> Result<String, String> {
    match value {
        Value::Str(s) => {
            if !matches!(parsed.kind, None | Some('s')) {
                return Err(format!(
                    "Unknown format code '{}' for object of type 'str'",
                    parsed.kind.unwrap_or('s')
                ));
            }
            if parsed.sign.is_some() {
                return Err("Sign not allowed in string format specifier".to_string());
            }
            let body: String = match parsed.precision {
                Some(p) => s.chars().take(p).collect(),
                None => s.to_string(),
            };
            Ok(align("", &body, parsed, '<'))
        }
        Value::Int(_) | Value::Bool(_) => {
            let n = value.as_int().unwrap_or(0);
            if matches!(parsed.kind, Some('f' | 'F' | 'e' | 'E' | 'g' | 'G' | '%')) {
                let body = with_float_grouping(float_body(n as f64, parsed)?, parsed.grouping);
                return Ok(align(sign_text(n < 0, parsed), &body, parsed, '>'));
            }
            let body = int_body(n, parsed)?;
            Ok(align(sign_text(n < 0, parsed), &body, parsed, '>'))
        }
        Value::Float(x) => {
            if matches!(parsed.kind, Some('d' | 'x' | 'X' | 'o' | 'b' | 'c' | 'n')) {
                return Err(format!(
                    "Unknown format code '{}' for object of type 'float'",
                    parsed.kind.unwrap_or('d')
                ));
            }
            let body = with_float_grouping(float_body(*x, parsed)?, parsed.grouping);
            let negative = x.is_sign_negative() && !x.is_nan();
            Ok(align(sign_text(negative, parsed), &body, parsed, '>'))
        }
        other => Err(format!(
            "unsupported format string passed to {}.__format__",
            other.type_name()
        )),
    }
}

impl Interpreter {
    /// Apply a format spec, turning an oversized width into a memory fault
    pub(crate) fn format_with_spec(&self, value: &Value, spec: &str) -> Result<String, TraceError> {
        let limit = self.ctx.config.max_memory_bytes();
        format_value(value, spec, limit).map_err(|err| match err {
            FormatError::Invalid(message) => self.fault("ValueError", message),
            FormatError::TooWide { requested } => TraceError::Resource {
                resource: ResourceKind::Memory,
                limit: limit as u64,
                message: format!(
                    "format spec asks for {} characters at line {}",
                    requested, self.ctx.line
                ),
            },
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const LIMIT: usize = 1 << 20;

    fn fmt(value: Value, spec: &str) -> String {
        format_value(&value, spec, LIMIT).unwrap()
    }

    #[test]
    fn test_parse_spec_fields() {
        let spec = parse_spec("*^+#010,.3f").unwrap();
        assert_eq!(spec.fill, Some('*'));
        assert_eq!(spec.align, Some('^'));
        assert_eq!(spec.sign, Some('+'));
        assert!(spec.alternate);
        assert!(spec.zero);
        assert_eq!(spec.width, 10);
        assert_eq!(spec.grouping, Some(','));
        assert_eq!(spec.precision, Some(3));
        assert_eq!(spec.kind, Some('f'));
        assert!(parse_spec(".f").is_err());
        assert!(parse_spec("dd").is_err());
    }

    #[test]
    fn test_float_formats() {
        assert_eq!(fmt(Value::Float(3.14159), ".2f"), "3.14");
        assert_eq!(fmt(Value::Float(-2.5), "8.1f"), "    -2.5");
        assert_eq!(fmt(Value::Float(0.25), ".0%"), "25%");
        assert_eq!(fmt(Value::Float(12345.678), "e"), "1.234568e+04");
        assert_eq!(fmt(Value::Float(1234567.0), ",.1f"), "1,234,567.0");
        assert_eq!(fmt(Value::Float(0.0001), "g"), "0.0001");
        assert_eq!(fmt(Value::Float(f64::INFINITY), "f"), "inf");
    }

    #[test]
    fn test_int_formats() {
        assert_eq!(fmt(Value::Int(42), "05d"), "00042");
        assert_eq!(fmt(Value::Int(-42), "05d"), "-0042");
        assert_eq!(fmt(Value::Int(255), "#x"), "0xff");
        assert_eq!(fmt(Value::Int(5), "b"), "101");
        assert_eq!(fmt(Value::Int(1000000), ","), "1,000,000");
        assert_eq!(fmt(Value::Int(7), "+"), "+7");
        assert_eq!(fmt(Value::Int(3), ".2f"), "3.00");
    }

    #[test]
    fn test_string_alignment() {
        assert_eq!(fmt(Value::str("ab"), ">5"), "   ab");
        assert_eq!(fmt(Value::str("ab"), "^6"), "  ab  ");
        assert_eq!(fmt(Value::str("ab"), "-<4"), "ab--");
        assert_eq!(fmt(Value::str("abcdef"), ".3"), "abc");
        assert!(format_value(&Value::str("x"), "d", LIMIT).is_err());
    }

    #[test]
    fn test_unsupported_value() {
        assert!(format_value(&Value::None, ">4", LIMIT).is_err());
        assert_eq!(format_value(&Value::None, "", LIMIT).unwrap(), "None");
    }

    #[test]
    fn test_oversized_width_is_refused_before_padding() {
        assert_eq!(
            format_value(&Value::Int(1), ">99999999999", LIMIT),
            Err(FormatError::TooWide { requested: 99_999_999_999 })
        );
        assert_eq!(
            format_value(&Value::Float(1.0), ".5000000f", LIMIT),
            Err(FormatError::TooWide { requested: 5_000_000 })
        );
        // Precision only truncates strings
        assert_eq!(format_value(&Value::str("abc"), ".5000000", LIMIT).unwrap(), "abc");
        assert_eq!(fmt(Value::Int(1), ">4"), "   1");
    }
}
