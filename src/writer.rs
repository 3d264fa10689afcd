use std::io::Write;

use crate::database::QueryResult;
use crate::error::Result;
use crate::value::Value;

/// Renders query results to an output stream, one CSV block per result.
///
/// The first line of each block is the header (column names), followed by
/// the data rows: fields are comma-separated, TEXT values double-quoted,
/// numeric values bare. Consecutive blocks in the same destination are
/// separated by a line containing exactly `---`.
///
/// The writer is an explicit collaborator owned by the driver for the
/// duration of one script run; nothing in the engine holds onto it.
pub struct ResultWriter<W: Write> {
    out: W,
    wrote_any: bool,
}

impl<W: Write> ResultWriter<W> {
    pub fn new(out: W) -> Self {
        Self {
            out,
            wrote_any: false,
        }
    }

    /// Writes one result block, preceded by the `---` separator when a
    /// block has already been written.
    pub fn write_result(&mut self, result: &QueryResult) -> Result<()> {
        if self.wrote_any {
            writeln!(self.out, "---")?;
        }

        writeln!(self.out, "{}", result.columns.join(","))?;
        for row in &result.rows {
            let mut line = String::new();
            for (index, value) in row.iter().enumerate() {
                if index > 0 {
                    line.push(',');
                }
                match value {
                    Value::Text(s) => {
                        line.push('"');
                        line.push_str(s);
                        line.push('"');
                    }
                    numeric => line.push_str(&numeric.to_string()),
                }
            }
            writeln!(self.out, "{}", line)?;
        }

        self.wrote_any = true;
        Ok(())
    }

    /// Flushes and returns the underlying stream.
    pub fn into_inner(mut self) -> Result<W> {
        self.out.flush()?;
        Ok(self.out)
    }
}
