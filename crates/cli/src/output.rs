use crate::error::CliError;
use model::records::record::ChangeRecord;
use std::io::Write;

/// Writes records as one JSON object per line.
pub struct RecordWriter<W: Write> {
    out: W,
    written: u64,
}

impl<W: Write> RecordWriter<W> {
    pub fn new(out: W) -> Self {
        Self { out, written: 0 }
    }

    pub fn write(&mut self, record: &ChangeRecord) -> Result<(), CliError> {
        serde_json::to_writer(&mut self.out, &record.view()).map_err(CliError::JsonSerialize)?;
        self.out.write_all(b"\n")?;
        self.out.flush()?;
        self.written += 1;
        Ok(())
    }

    pub fn written(&self) -> u64 {
        self.written
    }
}

pub fn print_json<T: serde::Serialize + ?Sized>(value: &T) -> Result<(), CliError> {
    let json = serde_json::to_string_pretty(value).map_err(CliError::JsonSerialize)?;
    println!("{json}");
    Ok(())
}
