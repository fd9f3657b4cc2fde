//! CSV output

use super::tally::FileTally;
use std::collections::BTreeSet;
use std::io::Write;

const FIXED_COLUMNS: [&str; 5] = ["slicer", "printer", "file", "total_gcodes", "total_mcodes"];

/// Write one row per file, with a column for every command seen in any file
///
/// Command columns are sorted lexically; a file that never uses a command gets `0`.
pub fn write_csv<W: Write>(tallies: &[FileTally], writer: &mut W) -> std::io::Result<()> {
    let commands: BTreeSet<&str> = tallies
        .iter()
        .flat_map(|t| t.gcodes.keys().chain(t.mcodes.keys()))
        .map(String::as_str)
        .collect();

    let header: Vec<&str> = FIXED_COLUMNS
        .iter()
        .copied()
        .chain(commands.iter().copied())
        .collect();
    write_record(writer, &header)?;

    for tally in tallies {
        let mut row = vec![
            tally.slicer.clone(),
            tally.printer.clone(),
            tally.file.clone(),
            tally.total_gcodes().to_string(),
            tally.total_mcodes().to_string(),
        ];
        row.extend(commands.iter().map(|c| tally.count(c).to_string()));
        write_record(writer, &row)?;
    }
    Ok(())
}

fn write_record<W: Write, S: AsRef<str>>(writer: &mut W, fields: &[S]) -> std::io::Result<()> {
    let line = fields
        .iter()
        .map(|f| escape(f.as_ref()))
        .collect::<Vec<_>>()
        .join(",");
    writer.write_all(line.as_bytes())?;
    writer.write_all(b"\r\n")
}

fn escape(field: &str) -> String {
    if field.contains([',', '"', '\n', '\r']) {
        format!("\"{}\"", field.replace('"', "\"\""))
    } else {
        field.to_string()
    }
}

// unwrap/expect are acceptable in tests for concise failure-on-error assertions
#[allow(clippy::unwrap_used, clippy::expect_used)]
#[cfg(test)]
mod tests {
    use super::*;
    use crate::report::tally::CommandCounts;

    fn counts(pairs: &[(&str, u64)]) -> CommandCounts {
        pairs.iter().map(|(k, v)| (k.to_string(), *v)).collect()
    }

    #[test]
    fn union_of_commands_with_zero_fill() {
        let tallies = vec![
            FileTally {
                slicer: "cura".into(),
                printer: "p1".into(),
                file: "a.gcode".into(),
                gcodes: counts(&[("G1", 5), ("G28", 1)]),
                mcodes: counts(&[("M104", 2)]),
            },
            FileTally {
                slicer: "prusaslicer".into(),
                printer: "p2".into(),
                file: "b.gcode".into(),
                gcodes: counts(&[("G0", 3)]),
                mcodes: CommandCounts::new(),
            },
        ];

        let mut out = Vec::new();
        write_csv(&tallies, &mut out).unwrap();
        let text = String::from_utf8(out).unwrap();

        assert_eq!(
            text,
            "slicer,printer,file,total_gcodes,total_mcodes,G0,G1,G28,M104\r\n\
             cura,p1,a.gcode,6,2,0,5,1,2\r\n\
             prusaslicer,p2,b.gcode,3,0,3,0,0,0\r\n"
        );
    }

    #[test]
    fn empty_input_writes_header_only() {
        let mut out = Vec::new();
        write_csv(&[], &mut out).unwrap();
        assert_eq!(
            String::from_utf8(out).unwrap(),
            "slicer,printer,file,total_gcodes,total_mcodes\r\n"
        );
    }

    #[test]
    fn fields_with_separators_are_quoted() {
        assert_eq!(escape("plain"), "plain");
        assert_eq!(escape("a,b"), "\"a,b\"");
        assert_eq!(escape("say \"hi\""), "\"say \"\"hi\"\"\"");
        assert_eq!(escape("two\nlines"), "\"two\nlines\"");
    }
}
