use anyhow::{Context, Result};
use chrono::{DateTime, Local, NaiveDateTime, TimeZone};
use exif::{Exif, In, Reader, Tag, Value};
use std::fs::File;
use std::io::BufReader;
use std::path::Path;

const EXIF_DATE_FORMAT: &str = "%Y:%m:%d %H:%M:%S";

pub fn read_exif_date(path: &Path) -> Result<Option<DateTime<Local>>> {
    let file = File::open(path)
        .with_context(|| format!("could not open file for EXIF: {}", path.display()))?;
    let mut buf = BufReader::new(file);
    let exif = Reader::new()
        .read_from_container(&mut buf)
        .with_context(|| format!("could not parse EXIF: {}", path.display()))?;

    Ok([Tag::DateTimeOriginal, Tag::DateTime]
        .into_iter()
        .find_map(|tag| ascii_field(&exif, tag).and_then(|raw| parse_exif_date(&raw))))
}

fn ascii_field(exif: &Exif, tag: Tag) -> Option<String> {
    let field = exif.get_field(tag, In::PRIMARY)?;
    // display_value() reformats dates, so read the raw ASCII payload instead
    match &field.value {
        Value::Ascii(values) => values
            .first()
            .and_then(|bytes| String::from_utf8(bytes.clone()).ok()),
        _ => None,
    }
}

pub(crate) fn parse_exif_date(input: &str) -> Option<DateTime<Local>> {
    let normalized = input.trim_matches(|c: char| c == '\0' || c.is_whitespace());
    let naive = NaiveDateTime::parse_from_str(normalized, EXIF_DATE_FORMAT).ok()?;
    Local.from_local_datetime(&naive).earliest()
}
