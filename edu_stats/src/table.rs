use log::debug;
use std::collections::HashMap;

use crate::config::ParseError;

/// A CSV text read as a header row plus data rows.
///
/// Every row holds exactly one value per header: short rows are padded with
/// empty strings and surplus trailing fields are dropped.
#[derive(Eq, PartialEq, Debug, Clone)]
pub struct RawTable {
    headers: Vec<String>,
    // Header name -> column position. With repeated header names, the last
    // column wins.
    index: HashMap<String, usize>,
    rows: Vec<Vec<String>>,
}

/// A borrowed view on one row, looked up by header name.
#[derive(Debug, Clone, Copy)]
pub struct RowView<'a> {
    table: &'a RawTable,
    cells: &'a [String],
}

impl<'a> RowView<'a> {
    /// The raw value for a column, or None if the column does not exist.
    pub fn get(&self, column: &str) -> Option<&'a str> {
        self.table
            .index
            .get(column)
            .and_then(|idx| self.cells.get(*idx))
            .map(|s| s.as_str())
    }

    /// The values in header order.
    pub fn values(&self) -> &'a [String] {
        self.cells
    }
}

impl RawTable {
    /// Builds a table from already split rows, normalizing the row widths.
    pub fn new(headers: Vec<String>, rows: Vec<Vec<String>>) -> RawTable {
        let width = headers.len();
        let index: HashMap<String, usize> = headers
            .iter()
            .enumerate()
            .map(|(idx, h)| (h.clone(), idx))
            .collect();
        let rows = rows
            .into_iter()
            .map(|mut cells| {
                cells.resize(width, String::new());
                cells
            })
            .collect();
        RawTable {
            headers,
            index,
            rows,
        }
    }

    pub fn headers(&self) -> &[String] {
        &self.headers
    }

    pub fn has_column(&self, column: &str) -> bool {
        self.index.contains_key(column)
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn rows(&self) -> impl Iterator<Item = RowView<'_>> {
        self.rows.iter().map(move |cells| RowView {
            table: self,
            cells: cells.as_slice(),
        })
    }

    /// All the values of one column, in row order. None if the column is absent.
    pub fn column(&self, column: &str) -> Option<Vec<&str>> {
        let idx = *self.index.get(column)?;
        Some(self.rows.iter().map(|cells| cells[idx].as_str()).collect())
    }

    /// Writes the table back as CSV text, with `\n` line endings.
    ///
    /// Fields are only quoted when they need to be.
    pub fn to_csv_string(&self) -> Result<String, ParseError> {
        let mut wtr = csv::WriterBuilder::new()
            .terminator(csv::Terminator::Any(b'\n'))
            .from_writer(vec![]);
        wtr.write_record(&self.headers).map_err(serialize_error)?;
        for cells in self.rows.iter() {
            wtr.write_record(cells).map_err(serialize_error)?;
        }
        let bytes = wtr.into_inner().map_err(|e| ParseError::Serialize {
            message: e.to_string(),
        })?;
        String::from_utf8(bytes).map_err(|e| ParseError::Serialize {
            message: e.to_string(),
        })
    }
}

fn serialize_error(e: csv::Error) -> ParseError {
    ParseError::Serialize {
        message: e.to_string(),
    }
}

/// Splits one line into trimmed fields.
///
/// Each unescaped `"` toggles the quoted state, wherever it is in the field;
/// inside quotes, `""` stands for one quote. Commas only separate fields
/// outside quotes. An unclosed quote runs to the end of the line.
fn split_line(line: &str) -> Vec<String> {
    let mut fields: Vec<String> = Vec::new();
    let mut current = String::new();
    let mut in_quotes = false;
    let mut chars = line.chars().peekable();
    while let Some(c) = chars.next() {
        match c {
            '"' if in_quotes && chars.peek() == Some(&'"') => {
                current.push('"');
                chars.next();
            }
            '"' => in_quotes = !in_quotes,
            ',' if !in_quotes => {
                fields.push(current.trim().to_string());
                current.clear();
            }
            _ => current.push(c),
        }
    }
    fields.push(current.trim().to_string());
    fields
}

/// Reads a CSV text whose first line is the header.
///
/// Every other line is one row: a quote never spans lines. The reader is
/// lenient: quoted fields may hold commas and `""` escapes, every field is
/// trimmed, blank lines are skipped and rows of any width are accepted. The
/// only failure is a text without any header line.
pub fn parse(text: &str) -> Result<RawTable, ParseError> {
    let content = text.trim();
    if content.is_empty() {
        return Err(ParseError::EmptyInput);
    }

    // `lines` also strips the `\r` of `\r\n` endings.
    let mut lines = content.lines();
    let headers: Vec<String> = match lines.next() {
        Some(line) => split_line(line),
        None => return Err(ParseError::EmptyInput),
    };
    debug!("parse: headers: {:?}", headers);

    let mut rows: Vec<Vec<String>> = Vec::new();
    for (idx, line) in lines.enumerate() {
        // The header is line 1.
        let lineno = idx + 2;
        if line.trim().is_empty() {
            debug!("parse: skipping blank line {}", lineno);
            continue;
        }
        let fields = split_line(line);
        if fields.len() != headers.len() {
            debug!(
                "parse: line {} has {} fields, expected {}",
                lineno,
                fields.len(),
                headers.len()
            );
        }
        rows.push(fields);
    }

    Ok(RawTable::new(headers, rows))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn row_values(table: &RawTable) -> Vec<Vec<String>> {
        table.rows().map(|r| r.values().to_vec()).collect()
    }

    #[test]
    fn empty_input_is_an_error() {
        assert_eq!(parse(""), Err(ParseError::EmptyInput));
        assert_eq!(parse("  \r\n\n "), Err(ParseError::EmptyInput));
    }

    #[test]
    fn header_only() {
        let t = parse("country,math_score\n").unwrap();
        assert_eq!(t.headers(), &["country", "math_score"]);
        assert!(t.is_empty());
    }

    #[test]
    fn crlf_and_lf_lines() {
        let t = parse("a,b\r\n1,2\r\n3,4\n5,6").unwrap();
        assert_eq!(
            row_values(&t),
            vec![
                vec!["1".to_string(), "2".to_string()],
                vec!["3".to_string(), "4".to_string()],
                vec!["5".to_string(), "6".to_string()],
            ]
        );
    }

    #[test]
    fn quoted_field_keeps_the_delimiter() {
        let t = parse("country,fact1\n\"Korea, Republic of\",x").unwrap();
        let row = t.rows().next().unwrap();
        assert_eq!(row.get("country"), Some("Korea, Republic of"));
        assert_eq!(row.get("fact1"), Some("x"));
    }

    #[test]
    fn doubled_quote_is_a_literal_quote() {
        let t = parse("country,fact1\nFinland,\"The \"\"sauna\"\" nation\"").unwrap();
        let row = t.rows().next().unwrap();
        assert_eq!(row.get("fact1"), Some("The \"sauna\" nation"));
    }

    #[test]
    fn short_rows_are_padded() {
        let t = parse("a,b,c\n1\n1,2,3,4").unwrap();
        assert_eq!(
            row_values(&t),
            vec![
                vec!["1".to_string(), "".to_string(), "".to_string()],
                vec!["1".to_string(), "2".to_string(), "3".to_string()],
            ]
        );
        let first = t.rows().next().unwrap();
        assert_eq!(first.get("c"), Some(""));
        assert_eq!(first.get("missing"), None);
    }

    #[test]
    fn fields_are_trimmed_and_blank_lines_skipped() {
        let t = parse(" country , math_score \n\n  Japan ,  536 \n\n").unwrap();
        assert_eq!(t.headers(), &["country", "math_score"]);
        assert_eq!(t.len(), 1);
        let row = t.rows().next().unwrap();
        assert_eq!(row.get("country"), Some("Japan"));
        assert_eq!(row.get("math_score"), Some("536"));
    }

    #[test]
    fn unclosed_quote_stays_on_its_line() {
        let t = parse("country,x\n\"Finland,1\nJapan,2\nChile,3").unwrap();
        assert_eq!(
            row_values(&t),
            vec![
                vec!["Finland,1".to_string(), "".to_string()],
                vec!["Japan".to_string(), "2".to_string()],
                vec!["Chile".to_string(), "3".to_string()],
            ]
        );
    }

    #[test]
    fn quote_after_a_space_opens_a_quoted_field() {
        let t = parse("country,fact1\nKorea, \"Seoul, Busan\"").unwrap();
        let row = t.rows().next().unwrap();
        assert_eq!(row.get("country"), Some("Korea"));
        assert_eq!(row.get("fact1"), Some("Seoul, Busan"));
    }

    #[test]
    fn quote_inside_a_field_toggles() {
        let t = parse("a,b\nx\"y,z\"w,k").unwrap();
        let row = t.rows().next().unwrap();
        assert_eq!(row.get("a"), Some("xy,zw"));
        assert_eq!(row.get("b"), Some("k"));
    }

    #[test]
    fn empty_quoted_field() {
        let t = parse("a,b,c\n\"\",\" \",x").unwrap();
        assert_eq!(
            row_values(&t),
            vec![vec!["".to_string(), "".to_string(), "x".to_string()]]
        );
    }

    #[test]
    fn column_values() {
        let t = parse("country,ranking\nFinland,2\nJapan,1").unwrap();
        assert_eq!(t.column("ranking"), Some(vec!["2", "1"]));
        assert_eq!(t.column("nope"), None);
        assert!(t.has_column("country"));
    }

    #[test]
    fn unquoted_text_round_trips() {
        let text = "country,math_score,bullying\nFinland,520,-0.4\nUSA,,-0.3\n";
        let t = parse(text).unwrap();
        assert_eq!(t.to_csv_string().unwrap(), text);
        assert_eq!(parse(&t.to_csv_string().unwrap()).unwrap(), t);
    }

    #[test]
    fn writing_quotes_fields_with_commas() {
        let t = parse("country,fact1\n\"Korea, Republic of\",x").unwrap();
        let out = t.to_csv_string().unwrap();
        assert_eq!(out, "country,fact1\n\"Korea, Republic of\",x\n");
    }

    #[test]
    fn parsing_is_a_pure_function() {
        let text = "a,b\n\"1,5\",2\n3";
        assert_eq!(parse(text).unwrap(), parse(text).unwrap());
    }
}
