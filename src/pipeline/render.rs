//! Response rendering: body bytes → JSON value → indented text.
//!
//! serde_json is built with `preserve_order`, so objects keep the key
//! order the server sent. The indent width is configurable; the default of
//! two spaces matches `JSON.stringify(value, null, 2)`.
//!
//! Floating-point numbers are written the way a browser prints them:
//! `1.0` renders as `1`, `1e2` as `100`, and exponent notation is used only
//! below `1e-6` or from `1e21` up.

use serde::Serialize;
use serde_json::ser::{CompactFormatter, Formatter, PrettyFormatter};
use serde_json::Value;
use std::io;

/// Parse a response body as JSON.
pub fn parse_body(body: &[u8]) -> Result<Value, serde_json::Error> {
    serde_json::from_slice(body)
}

/// Render a JSON value with `indent` spaces per level.
///
/// `indent == 0` yields compact single-line JSON, like `JSON.stringify`
/// with an indent of zero.
pub fn render_json(value: &Value, indent: usize) -> String {
    let pad = vec![b' '; indent];
    let written = if indent == 0 {
        write_with(value, CompactFormatter)
    } else {
        write_with(value, PrettyFormatter::with_indent(&pad))
    };
    // Serialising a `Value` into a Vec cannot fail.
    written.unwrap_or_else(|| value.to_string())
}

fn write_with<F: Formatter>(value: &Value, formatter: F) -> Option<String> {
    let mut buf = Vec::new();
    let mut ser = serde_json::Serializer::with_formatter(&mut buf, JsNumbers(formatter));
    value.serialize(&mut ser).ok()?;
    String::from_utf8(buf).ok()
}

/// Wraps a formatter, replacing its float output with [`js_number`].
struct JsNumbers<F>(F);

impl<F: Formatter> Formatter for JsNumbers<F> {
    fn write_f64<W: ?Sized + io::Write>(&mut self, writer: &mut W, value: f64) -> io::Result<()> {
        writer.write_all(js_number(value).as_bytes())
    }

    fn begin_array<W: ?Sized + io::Write>(&mut self, writer: &mut W) -> io::Result<()> {
        self.0.begin_array(writer)
    }

    fn end_array<W: ?Sized + io::Write>(&mut self, writer: &mut W) -> io::Result<()> {
        self.0.end_array(writer)
    }

    fn begin_array_value<W: ?Sized + io::Write>(
        &mut self,
        writer: &mut W,
        first: bool,
    ) -> io::Result<()> {
        self.0.begin_array_value(writer, first)
    }

    fn end_array_value<W: ?Sized + io::Write>(&mut self, writer: &mut W) -> io::Result<()> {
        self.0.end_array_value(writer)
    }

    fn begin_object<W: ?Sized + io::Write>(&mut self, writer: &mut W) -> io::Result<()> {
        self.0.begin_object(writer)
    }

    fn end_object<W: ?Sized + io::Write>(&mut self, writer: &mut W) -> io::Result<()> {
        self.0.end_object(writer)
    }

    fn begin_object_key<W: ?Sized + io::Write>(
        &mut self,
        writer: &mut W,
        first: bool,
    ) -> io::Result<()> {
        self.0.begin_object_key(writer, first)
    }

    fn end_object_key<W: ?Sized + io::Write>(&mut self, writer: &mut W) -> io::Result<()> {
        self.0.end_object_key(writer)
    }

    fn begin_object_value<W: ?Sized + io::Write>(&mut self, writer: &mut W) -> io::Result<()> {
        self.0.begin_object_value(writer)
    }

    fn end_object_value<W: ?Sized + io::Write>(&mut self, writer: &mut W) -> io::Result<()> {
        self.0.end_object_value(writer)
    }
}

/// Format a float the way JavaScript's `Number.prototype.toString` does.
fn js_number(value: f64) -> String {
    if !value.is_finite() {
        return "null".to_string();
    }
    // Also catches -0.
    if value == 0.0 {
        return "0".to_string();
    }

    // `{:e}` yields the shortest round-trip digits, e.g. "1.2345e-7".
    let sci = format!("{:e}", value.abs());
    let (mantissa, exp) = sci.split_once('e').unwrap_or((sci.as_str(), "0"));
    let digits: String = mantissa.chars().filter(|c| *c != '.').collect();
    let k = digits.len() as i32;
    let n = exp.parse::<i32>().unwrap_or(0) + 1;

    let body = if k <= n && n <= 21 {
        format!("{digits}{}", "0".repeat((n - k) as usize))
    } else if 0 < n && n <= 21 {
        let (int, frac) = digits.split_at(n as usize);
        format!("{int}.{frac}")
    } else if -6 < n && n <= 0 {
        format!("0.{}{digits}", "0".repeat(n.unsigned_abs() as usize))
    } else {
        let e = n - 1;
        let sign = if e < 0 { '-' } else { '+' };
        match digits.split_at(1) {
            (head, "") => format!("{head}e{sign}{}", e.abs()),
            (head, tail) => format!("{head}.{tail}e{sign}{}", e.abs()),
        }
    };

    if value < 0.0 {
        format!("-{body}")
    } else {
        body
    }
}
