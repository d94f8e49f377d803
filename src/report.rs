//! Report writer.
//!
//! Text layout, one block per community followed by a blank line:
//!
//! ```text
//! Server : <community>
//!   User : <author>
//!     Instagram:
//!       <url>
//! ```
//!
//! Authors without links are left out, platforms without links are left out,
//! platforms follow table order and URLs are sorted.

use std::fs::File;
use std::io::{self, BufWriter, Write};
use std::path::Path;
use tracing::info;

use crate::config::ReportFormat;
use crate::model::ScanAggregate;
use crate::scan::PlatformTable;
use crate::traits::ScanError;

pub fn write_text<W: Write>(
    out: &mut W,
    aggregate: &ScanAggregate,
    table: &PlatformTable,
) -> io::Result<()> {
    for (community, result) in &aggregate.communities {
        writeln!(out, "Server : {}", community)?;
        for (author, links) in result.authors().filter(|(_, links)| links.has_links()) {
            writeln!(out, "  User : {}", author)?;
            for spec in table.iter() {
                let Some(urls) = links.get(spec.name()).filter(|urls| !urls.is_empty()) else {
                    continue;
                };
                writeln!(out, "    {}:", spec.display_name())?;
                for url in urls {
                    writeln!(out, "      {}", url)?;
                }
            }
        }
        writeln!(out)?;
    }
    Ok(())
}

pub fn write_json<W: Write>(out: &mut W, aggregate: &ScanAggregate) -> Result<(), ScanError> {
    serde_json::to_writer_pretty(&mut *out, aggregate)?;
    writeln!(out)?;
    Ok(())
}

/// Writes the report to `path` in UTF-8, replacing any existing file.
pub fn write_report(
    path: &Path,
    aggregate: &ScanAggregate,
    table: &PlatformTable,
    format: ReportFormat,
) -> Result<(), ScanError> {
    let mut out = BufWriter::new(File::create(path)?);
    match format {
        ReportFormat::Text => write_text(&mut out, aggregate, table)?,
        ReportFormat::Json => write_json(&mut out, aggregate)?,
    }
    out.flush()?;

    info!(path = %path.display(), ?format, "Report written");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{Community, CommunityResult};

    fn render(aggregate: &ScanAggregate, table: &PlatformTable) -> String {
        let mut buf = Vec::new();
        write_text(&mut buf, aggregate, table).unwrap();
        String::from_utf8(buf).unwrap()
    }

    #[test]
    fn test_text_layout() {
        let table = PlatformTable::builtin().unwrap();
        let mut result = CommunityResult::default();
        result.ensure_author("alice", &table).extend(
            "instagram",
            [
                "https://www.instagram.com/z".to_string(),
                "https://www.instagram.com/a".to_string(),
            ],
        );
        result
            .ensure_author("alice", &table)
            .extend("facebook", ["https://facebook.com/x?mibextid=1".to_string()]);
        result.ensure_author("bob", &table);

        let community = Community {
            id: 1,
            name: "Test".to_string(),
        };
        let aggregate = ScanAggregate::build(vec![(community, result, vec![])], &table, false);

        let expected = "Server : Test\n\
                        \x20 User : alice\n\
                        \x20   Instagram:\n\
                        \x20     https://www.instagram.com/a\n\
                        \x20     https://www.instagram.com/z\n\
                        \x20   Facebook:\n\
                        \x20     https://facebook.com/x?mibextid=1\n\
                        \n";
        assert_eq!(render(&aggregate, &table), expected);
    }

    #[test]
    fn test_empty_aggregate_renders_nothing() {
        let table = PlatformTable::builtin().unwrap();
        let aggregate = ScanAggregate::build(vec![], &table, false);
        assert!(render(&aggregate, &table).is_empty());
    }

    #[test]
    fn test_json_report_contains_stats() {
        let table = PlatformTable::builtin().unwrap();
        let aggregate = ScanAggregate::build(vec![], &table, false);
        let mut buf = Vec::new();
        write_json(&mut buf, &aggregate).unwrap();

        let value: serde_json::Value = serde_json::from_slice(&buf).unwrap();
        assert_eq!(value["stats"]["users_found"], 0);
        assert_eq!(value["cancelled"], false);
    }
}
