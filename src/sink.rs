use std::io::Write;

use crate::error::Result;

/// Destination for generated statements.
pub trait Sink {
    fn emit(&mut self, statement: &str) -> Result<()>;
}

/// Writes one statement per line and flushes after each, so a downstream reader
/// sees every statement as soon as it is produced.
pub struct WriteSink<W: Write> {
    writer: W,
}

impl<W: Write> WriteSink<W> {
    pub fn new(writer: W) -> Self {
        WriteSink { writer }
    }

    pub fn into_inner(self) -> W {
        self.writer
    }
}

impl<W: Write> Sink for WriteSink<W> {
    fn emit(&mut self, statement: &str) -> Result<()> {
        writeln!(self.writer, "{statement}")?;
        self.writer.flush()?;
        Ok(())
    }
}

impl Sink for Vec<String> {
    fn emit(&mut self, statement: &str) -> Result<()> {
        self.push(statement.to_string());
        Ok(())
    }
}

impl<S: Sink + ?Sized> Sink for &mut S {
    fn emit(&mut self, statement: &str) -> Result<()> {
        (**self).emit(statement)
    }
}
