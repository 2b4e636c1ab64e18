//! Simple TOML parser for POST code configuration
//!
//! This is a minimal TOML parser that handles only the subset needed for
//! the monitor. It does NOT support the full TOML spec.
//!
//! Supported features:
//! - Key = value pairs (string, integer)
//! - [section] headers: `uart`, `sensor`, `timing`
//! - [[code]] array-of-tables entries with `hexcode` and `desc`
//! - Root `ignore = [0x00, 0xFF]` integer array, on one line or spread
//!   over several
//! - Integers in decimal or `0x` hex
//! - Basic strings with escapes and `'literal'` strings
//! - Comments (# ...)
//!
//! NOT supported:
//! - Multi-line strings
//! - Inline tables
//! - Dotted keys

use heapless::String as HString;

use bpc_hal::{DataBits, Parity, StopBits};

use crate::classifier::TextFormat;
use crate::event::PostCode;

use super::types::{CodeDescription, MonitorConfig, MAX_DESC_LEN};

/// Parse error
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum ParseError {
    /// Invalid or unknown section header
    InvalidSection,
    /// Invalid value type
    InvalidValue,
    /// Hexcode outside 0..=255
    CodeOutOfRange,
    /// Description longer than `MAX_DESC_LEN`
    DescriptionTooLong,
    /// Too many items (exceeded heapless capacity)
    TooManyItems,
    /// `[[code]]` entry without `hexcode` or `desc`
    MissingField,
}

/// A [`ParseError`] with the 1-based line it was raised on
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct LocatedError {
    pub line: usize,
    pub error: ParseError,
}

/// Current parsing context
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Section {
    Root,
    Uart,
    Sensor,
    Timing,
    Code,
}

/// `[[code]]` entry being built
#[derive(Debug, Default)]
struct PendingCode {
    line: usize,
    code: Option<PostCode>,
    desc: Option<HString<MAX_DESC_LEN>>,
}

/// Longest enum-like string value (`"code_and_description"`)
const MAX_KEYWORD_LEN: usize = 24;

/// Parse TOML configuration into MonitorConfig
pub fn parse_config(input: &str) -> Result<MonitorConfig, ParseError> {
    parse_config_located(input).map_err(|e| e.error)
}

/// Parse TOML configuration, reporting the line an error was found on
///
/// Errors for an incomplete `[[code]]` entry point at its header and an
/// unterminated `ignore` array points at the line it opened on.
pub fn parse_config_located(input: &str) -> Result<MonitorConfig, LocatedError> {
    let mut config = MonitorConfig::new();
    let mut section = Section::Root;
    let mut current_code: Option<PendingCode> = None;
    // Line an `ignore` array spanning several lines was opened on
    let mut open_array: Option<usize> = None;

    for (index, raw) in input.lines().enumerate() {
        let line_no = index + 1;
        let at = |error| LocatedError { line: line_no, error };
        let line = strip_comment(raw).trim();

        if line.is_empty() {
            continue;
        }

        if open_array.is_some() {
            if push_ignore_items(line, &mut config).map_err(at)? {
                open_array = None;
            }
            continue;
        }

        if let Some(header) = line.strip_prefix("[[").and_then(|l| l.strip_suffix("]]")) {
            save_code(&mut config, &mut current_code)?;
            if header.trim() != "code" {
                return Err(at(ParseError::InvalidSection));
            }
            section = Section::Code;
            current_code = Some(PendingCode {
                line: line_no,
                ..Default::default()
            });
            continue;
        }

        if line.starts_with('[') && line.ends_with(']') {
            save_code(&mut config, &mut current_code)?;
            section = parse_section_header(&line[1..line.len() - 1]).map_err(at)?;
            continue;
        }

        if let Some((key, value)) = parse_key_value(line) {
            if section == Section::Root && key == "ignore" {
                let body = value.strip_prefix('[').ok_or(at(ParseError::InvalidValue))?;
                if !push_ignore_items(body, &mut config).map_err(at)? {
                    open_array = Some(line_no);
                }
                continue;
            }
            apply_value(section, key, value, &mut config, &mut current_code).map_err(at)?;
        }
    }

    if let Some(line) = open_array {
        return Err(LocatedError {
            line,
            error: ParseError::InvalidValue,
        });
    }

    save_code(&mut config, &mut current_code)?;

    Ok(config)
}

fn parse_section_header(header: &str) -> Result<Section, ParseError> {
    match header.trim() {
        "uart" => Ok(Section::Uart),
        "sensor" => Ok(Section::Sensor),
        "timing" => Ok(Section::Timing),
        _ => Err(ParseError::InvalidSection),
    }
}

/// Cut a trailing `# comment`, ignoring `#` inside either kind of string
fn strip_comment(line: &str) -> &str {
    let mut quote: Option<char> = None;
    let mut escaped = false;

    for (i, c) in line.char_indices() {
        match quote {
            // Only basic strings have escapes
            Some('"') if escaped => escaped = false,
            Some('"') if c == '\\' => escaped = true,
            Some(q) if c == q => quote = None,
            Some(_) => {}
            None if c == '"' || c == '\'' => quote = Some(c),
            None if c == '#' => return &line[..i],
            None => {}
        }
    }
    line
}

fn parse_key_value(line: &str) -> Option<(&str, &str)> {
    let eq_pos = line.find('=')?;
    let key = line[..eq_pos].trim();
    let value = line[eq_pos + 1..].trim();

    if key.is_empty() || value.is_empty() {
        return None;
    }

    Some((key, value))
}

/// Decode a `"basic"` or `'literal'` string into a fixed-capacity buffer
///
/// `overflow` is returned when the decoded text does not fit.
fn parse_string<const N: usize>(
    value: &str,
    overflow: ParseError,
) -> Result<HString<N>, ParseError> {
    let mut out = HString::new();

    if let Some(literal) = value.strip_prefix('\'').and_then(|v| v.strip_suffix('\'')) {
        if literal.contains('\'') {
            return Err(ParseError::InvalidValue);
        }
        out.push_str(literal).map_err(|_| overflow)?;
        return Ok(out);
    }

    let body = value
        .strip_prefix('"')
        .and_then(|v| v.strip_suffix('"'))
        .ok_or(ParseError::InvalidValue)?;

    let mut chars = body.chars();
    while let Some(c) = chars.next() {
        let c = match c {
            '\\' => match chars.next() {
                Some('"') => '"',
                Some('\\') => '\\',
                Some('n') => '\n',
                Some('t') => '\t',
                Some('r') => '\r',
                Some('b') => '\u{8}',
                Some('f') => '\u{c}',
                Some('u') => parse_unicode_escape(&mut chars, 4)?,
                Some('U') => parse_unicode_escape(&mut chars, 8)?,
                _ => return Err(ParseError::InvalidValue),
            },
            '"' => return Err(ParseError::InvalidValue),
            c => c,
        };
        out.push(c).map_err(|_| overflow)?;
    }
    Ok(out)
}

/// `\uXXXX` / `\UXXXXXXXX`: exactly `digits` hex digits naming a scalar value
fn parse_unicode_escape(chars: &mut core::str::Chars<'_>, digits: usize) -> Result<char, ParseError> {
    let mut scalar = 0u32;
    for _ in 0..digits {
        let digit = chars
            .next()
            .and_then(|c| c.to_digit(16))
            .ok_or(ParseError::InvalidValue)?;
        scalar = scalar * 16 + digit;
    }
    char::from_u32(scalar).ok_or(ParseError::InvalidValue)
}

fn parse_int<T: core::str::FromStr>(value: &str) -> Result<T, ParseError> {
    value.parse().map_err(|_| ParseError::InvalidValue)
}

fn parse_code(value: &str) -> Result<PostCode, ParseError> {
    let value = value.trim();
    let number = match value.strip_prefix("0x").or_else(|| value.strip_prefix("0X")) {
        Some(hex) => i64::from_str_radix(hex, 16),
        None => value.parse::<i64>(),
    }
    .map_err(|_| ParseError::InvalidValue)?;

    u8::try_from(number)
        .map(PostCode)
        .map_err(|_| ParseError::CodeOutOfRange)
}

/// Add the codes of one line of an `ignore` array
///
/// `line` is the array text after `[` (or a continuation line). Returns
/// whether the closing `]` was on this line.
fn push_ignore_items(line: &str, config: &mut MonitorConfig) -> Result<bool, ParseError> {
    let (items, closed) = match line.find(']') {
        Some(end) if line[end + 1..].trim().is_empty() => (&line[..end], true),
        Some(_) => return Err(ParseError::InvalidValue),
        None => (line, false),
    };

    for item in items.split(',').map(str::trim).filter(|s| !s.is_empty()) {
        config.add_ignore(parse_code(item)?)?;
    }
    Ok(closed)
}

fn parse_data_bits(value: &str) -> Result<DataBits, ParseError> {
    match parse_int::<u8>(value)? {
        7 => Ok(DataBits::Seven),
        8 => Ok(DataBits::Eight),
        _ => Err(ParseError::InvalidValue),
    }
}

fn parse_parity(value: &str) -> Result<Parity, ParseError> {
    match parse_string::<MAX_KEYWORD_LEN>(value, ParseError::InvalidValue)?.as_str() {
        "none" => Ok(Parity::None),
        "even" => Ok(Parity::Even),
        "odd" => Ok(Parity::Odd),
        _ => Err(ParseError::InvalidValue),
    }
}

fn parse_stop_bits(value: &str) -> Result<StopBits, ParseError> {
    match parse_int::<u8>(value)? {
        1 => Ok(StopBits::One),
        2 => Ok(StopBits::Two),
        _ => Err(ParseError::InvalidValue),
    }
}

fn parse_text_format(value: &str) -> Result<TextFormat, ParseError> {
    match parse_string::<MAX_KEYWORD_LEN>(value, ParseError::InvalidValue)?.as_str() {
        "description" => Ok(TextFormat::Description),
        "code" => Ok(TextFormat::CodeWithDelta),
        "code_and_description" => Ok(TextFormat::CodeAndDescription),
        _ => Err(ParseError::InvalidValue),
    }
}

fn apply_value(
    section: Section,
    key: &str,
    value: &str,
    config: &mut MonitorConfig,
    current_code: &mut Option<PendingCode>,
) -> Result<(), ParseError> {
    match section {
        // `ignore` is handled by the line loop; other root keys are unused
        Section::Root => {}
        Section::Uart => match key {
            "baudrate" | "baud_rate" => config.uart.baudrate = parse_int(value)?,
            "data_bits" => config.uart.data_bits = parse_data_bits(value)?,
            "parity" => config.uart.parity = parse_parity(value)?,
            "stop_bits" => config.uart.stop_bits = parse_stop_bits(value)?,
            _ => {} // Ignore unknown keys
        },
        Section::Sensor => {
            if key == "text_format" {
                config.text_format = parse_text_format(value)?;
            }
        }
        Section::Timing => {
            let s = &mut config.settings;
            match key {
                "slice_ms" => s.slice_ms = parse_int(value)?,
                "max_codes_per_poll" => s.max_codes_per_poll = parse_int(value)?,
                "burst_hold_ms" => s.burst_hold_ms = parse_int(value)?,
                "burst_interval_ms" => s.burst_interval_ms = parse_int(value)?,
                "idle_interval_ms" => s.idle_interval_ms = parse_int(value)?,
                _ => {}
            }
        }
        Section::Code => {
            let entry = current_code.as_mut().ok_or(ParseError::InvalidSection)?;
            match key {
                "hexcode" => entry.code = Some(parse_code(value)?),
                "desc" => entry.desc = Some(parse_string(value, ParseError::DescriptionTooLong)?),
                _ => {}
            }
        }
    }
    Ok(())
}

/// Finish the pending `[[code]]` entry; a repeated code keeps its first
/// position and takes the newer description
fn save_code(
    config: &mut MonitorConfig,
    current_code: &mut Option<PendingCode>,
) -> Result<(), LocatedError> {
    let Some(entry) = current_code.take() else {
        return Ok(());
    };
    let at = |error| LocatedError {
        line: entry.line,
        error,
    };

    let (Some(code), Some(text)) = (entry.code, entry.desc) else {
        return Err(at(ParseError::MissingField));
    };

    config.add_code(CodeDescription { code, text }).map_err(at)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{MAX_DESCRIPTIONS, MAX_IGNORED};
    use crate::code_table::CODE_SPACE;

    const SAMPLE: &str = r#"
# Codes seen on the test board
ignore = [0x00, 0xFF]  # idle line noise

[uart]
baudrate = 115200
parity = "none"

[sensor]
text_format = "code_and_description"

[timing]
burst_hold_ms = 250

[[code]]
hexcode = 0x01
desc = "Power On"

[[code]]
hexcode = 25
desc = "Memory Init # stage 2"
"#;

    #[test]
    fn test_parse_sample() {
        let config = parse_config(SAMPLE).unwrap();

        assert_eq!(config.ignore.as_slice(), &[PostCode(0x00), PostCode(0xFF)]);
        assert_eq!(config.uart.baudrate, 115200);
        assert_eq!(config.uart.parity, Parity::None);
        assert_eq!(config.text_format, TextFormat::CodeAndDescription);
        assert_eq!(config.settings.burst_hold_ms, 250);
        assert_eq!(config.settings.slice_ms, 100);

        assert_eq!(config.codes.len(), 2);
        assert_eq!(config.codes[0].code, PostCode(0x01));
        assert_eq!(config.codes[0].text.as_str(), "Power On");
        assert_eq!(config.codes[1].code, PostCode(0x19));
        assert_eq!(config.codes[1].text.as_str(), "Memory Init # stage 2");
    }

    #[test]
    fn test_empty_config() {
        let config = parse_config("").unwrap();
        assert!(config.codes.is_empty());
        assert!(config.ignore.is_empty());
        assert_eq!(config.text_format, TextFormat::Description);
    }

    #[test]
    fn test_parse_code() {
        assert_eq!(parse_code("0x19"), Ok(PostCode(0x19)));
        assert_eq!(parse_code("0XfF"), Ok(PostCode(0xFF)));
        assert_eq!(parse_code("0"), Ok(PostCode(0)));
        assert_eq!(parse_code("256"), Err(ParseError::CodeOutOfRange));
        assert_eq!(parse_code("0x100"), Err(ParseError::CodeOutOfRange));
        assert_eq!(parse_code("-1"), Err(ParseError::CodeOutOfRange));
        assert_eq!(parse_code("nope"), Err(ParseError::InvalidValue));
    }

    #[test]
    fn test_incomplete_code_entry() {
        let input = "[[code]]\nhexcode = 0x10\n\n[[code]]\nhexcode = 0x11\ndesc = \"x\"\n";
        assert_eq!(parse_config(input).err(), Some(ParseError::MissingField));

        let input = "[[code]]\ndesc = \"x\"\n";
        assert_eq!(parse_config(input).err(), Some(ParseError::MissingField));
    }

    #[test]
    fn test_description_too_long() {
        let desc = "d".repeat(MAX_DESC_LEN + 1);
        let input = format!("[[code]]\nhexcode = 1\ndesc = \"{}\"\n", desc);
        assert_eq!(parse_config(&input).err(), Some(ParseError::DescriptionTooLong));
    }

    #[test]
    fn test_unknown_section() {
        assert_eq!(parse_config("[wifi]\n").err(), Some(ParseError::InvalidSection));
        assert_eq!(parse_config("[[codes]]\n").err(), Some(ParseError::InvalidSection));
    }

    #[test]
    fn test_every_code_described() {
        let mut input = String::new();
        for i in 0..CODE_SPACE {
            input.push_str(&format!("[[code]]\nhexcode = {}\ndesc = \"c{}\"\n", i, i));
        }
        let config = parse_config(&input).unwrap();
        assert_eq!(config.codes.len(), MAX_DESCRIPTIONS);

        let table = config.code_table().unwrap();
        assert_eq!(table.lookup(PostCode(0x00)), Some("c0"));
        assert_eq!(table.lookup(PostCode(0xFF)), Some("c255"));
    }

    #[test]
    fn test_ignore_repeats_do_not_count() {
        // Every code twice: twice the capacity, half of it repeats
        let codes: Vec<String> = (0..2 * MAX_IGNORED).map(|i| format!("{}", i % 256)).collect();
        let input = format!("ignore = [{}]\n", codes.join(", "));
        let config = parse_config(&input).unwrap();
        assert_eq!(config.ignore.len(), MAX_IGNORED);
        assert_eq!(config.ignore_set().len(), CODE_SPACE);
    }

    #[test]
    fn test_duplicate_codes_last_wins() {
        let input = "[[code]]\nhexcode = 0x10\ndesc = \"A\"\n[[code]]\nhexcode = 0x20\ndesc = \"C\"\n[[code]]\nhexcode = 0x10\ndesc = \"B\"\n";
        let config = parse_config(input).unwrap();
        assert_eq!(config.codes.len(), 2);
        assert_eq!(config.codes[0].code, PostCode(0x10));
        assert_eq!(config.codes[0].text.as_str(), "B");
        assert_eq!(config.code_table().unwrap().lookup(PostCode(0x10)), Some("B"));
    }

    #[test]
    fn test_multiline_ignore() {
        let input = "ignore = [\n    0x00,  # idle\n    0xFF,\n]\n\n[[code]]\nhexcode = 1\ndesc = \"x\"\n";
        let config = parse_config(input).unwrap();
        assert_eq!(config.ignore.as_slice(), &[PostCode(0x00), PostCode(0xFF)]);
        assert_eq!(config.codes.len(), 1);

        let config = parse_config("ignore = [0x01,\n 0x02]\n").unwrap();
        assert_eq!(config.ignore.as_slice(), &[PostCode(0x01), PostCode(0x02)]);
    }

    #[test]
    fn test_unterminated_ignore() {
        let input = "\nignore = [\n  0x00,\n";
        assert_eq!(
            parse_config_located(input).err(),
            Some(LocatedError {
                line: 2,
                error: ParseError::InvalidValue
            })
        );
        assert_eq!(
            parse_config("ignore = [0x00] 0x01\n").err(),
            Some(ParseError::InvalidValue)
        );
    }

    #[test]
    fn test_literal_string() {
        let input = "[[code]]\nhexcode = 1\ndesc = 'Power On # \\d'\n[sensor]\ntext_format = 'code'\n";
        let config = parse_config(input).unwrap();
        assert_eq!(config.codes[0].text.as_str(), "Power On # \\d");
        assert_eq!(config.text_format, TextFormat::CodeWithDelta);
    }

    #[test]
    fn test_string_escapes() {
        let input = "[[code]]\nhexcode = 1\ndesc = \"Init \\\"PCH\\\" # \\\\ \\u00e9\"  # trailing\n";
        let config = parse_config(input).unwrap();
        assert_eq!(config.codes[0].text.as_str(), "Init \"PCH\" # \\ \u{e9}");

        for bad in ["\"a\\q\"", "\"a\\\"", "\"a\"b\"", "\"\\u12\"", "'a'b'"] {
            let input = format!("[[code]]\nhexcode = 1\ndesc = {}\n", bad);
            assert_eq!(parse_config(&input).err(), Some(ParseError::InvalidValue), "{}", bad);
        }
    }

    #[test]
    fn test_escaped_description_length() {
        // Escapes count once decoded
        let desc = "\\\"".repeat(MAX_DESC_LEN);
        let input = format!("[[code]]\nhexcode = 1\ndesc = \"{}\"\n", desc);
        let config = parse_config(&input).unwrap();
        assert_eq!(config.codes[0].text.len(), MAX_DESC_LEN);
    }

    #[test]
    fn test_error_lines() {
        let input = "[uart]\nbaudrate = 9600\n\n[[code]]\nhexcode = 0x10\n\n[sensor]\n";
        assert_eq!(
            parse_config_located(input).err(),
            Some(LocatedError {
                line: 4,
                error: ParseError::MissingField
            })
        );
        assert_eq!(
            parse_config_located("\n[uart]\nparity = \"mark\"\n").err(),
            Some(LocatedError {
                line: 3,
                error: ParseError::InvalidValue
            })
        );
    }

    #[test]
    fn test_invalid_uart_values() {
        assert_eq!(
            parse_config("[uart]\ndata_bits = 9\n").err(),
            Some(ParseError::InvalidValue)
        );
        assert_eq!(
            parse_config("[uart]\nparity = \"mark\"\n").err(),
            Some(ParseError::InvalidValue)
        );
        let config = parse_config("[uart]\ndata_bits = 7\nstop_bits = 2\nparity = \"even\"\n").unwrap();
        assert_eq!(config.uart.data_bits, DataBits::Seven);
        assert_eq!(config.uart.stop_bits, StopBits::Two);
        assert_eq!(config.uart.parity, Parity::Even);
    }
}
