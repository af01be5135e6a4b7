//! Line parsers for the individual UCD files
use unidata_compact::{Field, FlagBits};
use unidata_logging::{LogCategory, log_warning};
use unidata_parser_utils::ucd::{parse_codepoint, split_fields, strip_comment, CodepointRange};

use crate::collector::{Collector, LineResult, Malformed};

const LOG_CAT : LogCategory = LogCategory::new_with_sub("UCD", "Parse");

const TOO_FEW_FIELDS : Malformed = Malformed("too few fields");
const BAD_CODEPOINT  : Malformed = Malformed("invalid codepoint");
const BAD_RANGE      : Malformed = Malformed("invalid codepoint range");
const EMPTY_VALUE    : Malformed = Malformed("empty value");

/// Split a data line, dropping its comment, requiring at least `count` fields
fn fields(line: &str, separator: char, count: usize) -> Result<Vec<&str>, Malformed> {
    let fields = split_fields(strip_comment(line), separator);
    if fields.len() < count {
        return Err(TOO_FEW_FIELDS);
    }
    Ok(fields)
}

fn non_empty(value: &str) -> Result<&str, Malformed> {
    if value.is_empty() { Err(EMPTY_VALUE) } else { Ok(value) }
}

/// `gc ; <short> ; <long> [; <alias>...]`, other properties are ignored
pub(crate) fn property_value_alias(collector: &mut Collector, line: &str) -> LineResult {
    let fields = fields(line, ';', 1)?;
    if fields[0] != "gc" {
        return Ok(());
    }
    if fields.len() < 3 {
        return Err(TOO_FEW_FIELDS);
    }

    let short = non_empty(fields[1])?;
    let long = non_empty(fields[2])?;
    collector.gc_names.insert(short.to_string(), long.replace('_', " "));
    Ok(())
}

/// `<cp>;<name>;<gc>;...`
///
/// `<..., First>` and `<..., Last>` lines describe a range that shares the category of the first line. A `First`
/// while another range is still open drops both ranges.
pub(crate) fn unicode_data(collector: &mut Collector, line: &str) -> LineResult {
    let fields = split_fields(line, ';');
    if fields.len() < 3 {
        return Err(TOO_FEW_FIELDS);
    }
    let codepoint = parse_codepoint(fields[0]).ok_or(BAD_CODEPOINT)?;
    let name = fields[1];
    let short = non_empty(fields[2])?;

    let gc = match collector.gc_names.get(short) {
        Some(long) => collector.interner.intern(&format!("{long} ({short})")),
        None => {
            if !collector.state.unknown_gc.iter().any(|code| code == short) {
                log_warning!(LOG_CAT, "No long name for general category '{short}', using the short code");
                collector.state.unknown_gc.push(short.to_string());
            }
            collector.interner.intern(short)
        },
    };

    let mut flags = FlagBits::none();
    if short == "Zs" {
        flags |= FlagBits::SpaceSeparator;
    }
    if short.starts_with('M') {
        flags |= FlagBits::AnyMark;
    }

    let range = if name.starts_with('<') && name.ends_with(", First>") {
        if let Some(start) = collector.state.range_start.take() {
            log_warning!(LOG_CAT, "Range starting at U+{start:04X} is interrupted by another range at U+{codepoint:04X}");
            return Err(Malformed("range start inside an open range"));
        }
        collector.state.range_start = Some(codepoint);
        CodepointRange::Single(codepoint)
    } else if name.starts_with('<') && name.ends_with(", Last>") {
        match collector.state.range_start.take() {
            Some(start) if start <= codepoint => CodepointRange::Range(start, codepoint),
            _ => return Err(Malformed("range end without a matching start")),
        }
    } else {
        CodepointRange::Single(codepoint)
    };

    let name = (!name.starts_with('<')).then(|| collector.interner.intern(name));
    for cp in range.iter() {
        if let Some(record) = collector.records.get_mut(cp) {
            record.set(Field::GeneralCategory, Some(gc.clone()));
            record.flags |= flags;
            if let Some(name) = &name {
                record.set(Field::Name, Some(name.clone()));
            }
        }
    }
    Ok(())
}

/// Assign an interned value to every codepoint of a range
fn set_range(collector: &mut Collector, range: CodepointRange, field: Field, value: &str) {
    let value = collector.interner.intern(value);
    for cp in range.iter() {
        collector.records.set(cp, field, value.clone());
    }
}

/// `<start>..<end>; <block name>`
pub(crate) fn block(collector: &mut Collector, line: &str) -> LineResult {
    let fields = fields(line, ';', 2)?;
    let range = CodepointRange::parse(fields[0]).ok_or(BAD_RANGE)?;
    let name = non_empty(fields[1])?;
    set_range(collector, range, Field::Block, name);
    Ok(())
}

/// `<cp or range> ; <version>`
pub(crate) fn derived_age(collector: &mut Collector, line: &str) -> LineResult {
    let fields = fields(line, ';', 2)?;
    let range = CodepointRange::parse(fields[0]).ok_or(BAD_RANGE)?;
    let version = non_empty(fields[1])?;
    set_range(collector, range, Field::Age, &format!("Unicode {version}"));
    Ok(())
}

/// `<cp>;<alias>;<type>`, only `control` and `correction` aliases replace the name
pub(crate) fn name_alias(collector: &mut Collector, line: &str) -> LineResult {
    let fields = fields(line, ';', 3)?;
    let codepoint = parse_codepoint(fields[0]).ok_or(BAD_CODEPOINT)?;
    let alias = non_empty(fields[1])?;

    if matches!(fields[2], "control" | "correction") {
        let alias = collector.interner.intern(alias);
        collector.records.set(codepoint, Field::Name, alias);
    }
    Ok(())
}

/// `U+<cp>\t<key>\t<value>`, only `kMandarin` and `kDefinition` are used
pub(crate) fn unihan_reading(collector: &mut Collector, line: &str) -> LineResult {
    let mut fields = line.splitn(3, '\t');
    let (Some(codepoint), Some(key), Some(value)) = (fields.next(), fields.next(), fields.next()) else {
        return Err(TOO_FEW_FIELDS);
    };
    let codepoint = codepoint.strip_prefix("U+")
        .and_then(parse_codepoint)
        .ok_or(BAD_CODEPOINT)?;
    let value = non_empty(value.trim())?;

    match key {
        "kMandarin" => {
            let value = collector.interner.intern(value);
            collector.records.set(codepoint, Field::MandarinReading, value);
        },
        "kDefinition" => {
            let value = collector.interner.intern(value);
            collector.records.set(codepoint, Field::Name, value);
            collector.records.enable_flag(codepoint, FlagBits::KDefinitionExists);
        },
        _ => {},
    }
    Ok(())
}

/// `<cp or range> ; <property>`, only `Emoji_Presentation` is used
pub(crate) fn emoji_data(collector: &mut Collector, line: &str) -> LineResult {
    let fields = fields(line, ';', 2)?;
    let range = CodepointRange::parse(fields[0]).ok_or(BAD_RANGE)?;
    if fields[1] == "Emoji_Presentation" {
        for cp in range.iter() {
            collector.records.enable_flag(cp, FlagBits::EmojiPresentation);
        }
    }
    Ok(())
}
