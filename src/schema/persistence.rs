//! # Checkpoint Image
//!
//! A checkpoint captures the committed tables of a catalog (definitions and
//! committed rows) as one self-contained byte image. Uncommitted entries,
//! uncommitted rows and extension objects are never part of it: functions
//! and collations are registered again by their extensions at attach.
//!
//! ## Image Format
//!
//! ```text
//! Offset  Size  Description
//! 0       16    Magic: "KeelDB ckpt v1\x00\x00"
//! 16      4     Version: 1 (u32 little-endian)
//! 20      4     Table count (u32 little-endian)
//! 24      ...   Tables
//! end-8   8     CRC-64/ECMA-182 over every preceding byte
//! ```
//!
//! Each table:
//!
//! ```text
//!   - name_len: u16, name: UTF-8 bytes
//!   - column_count: u32
//!   - For each column:
//!       - name_len: u16, name: UTF-8 bytes
//!       - data_type: u8 (matches DataType repr)
//!   - row_count: u64
//!   - For each row, one value per column:
//!       - tag: u8 (0=NULL, 1=BOOL, 2=INT, 3=FLOAT, 4=TEXT)
//!       - payload: u8 | i64 | f64 bits | u32 len + UTF-8 bytes
//! ```
//!
//! ## Error Handling
//!
//! Decoding checks every length against the remaining input and the
//! trailer against the content, so a truncated or corrupted file fails with
//! a descriptive report instead of loading partial state.

use super::{Catalog, ColumnDef};
use crate::config::{CHECKPOINT_MAGIC, CHECKPOINT_VERSION};
use crate::types::{DataType, OwnedValue};
use crc::{Crc, CRC_64_ECMA_182};
use eyre::{bail, ensure, Result, WrapErr};

const CRC64: Crc<u64> = Crc::<u64>::new(&CRC_64_ECMA_182);
const TRAILER_SIZE: usize = 8;

const TAG_NULL: u8 = 0;
const TAG_BOOL: u8 = 1;
const TAG_INT: u8 = 2;
const TAG_FLOAT: u8 = 3;
const TAG_TEXT: u8 = 4;

#[derive(Debug, Clone, PartialEq)]
pub struct TableImage {
    pub name: String,
    pub columns: Vec<ColumnDef>,
    pub rows: Vec<Vec<OwnedValue>>,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct CheckpointImage {
    pub tables: Vec<TableImage>,
}

impl CheckpointImage {
    /// Captures the committed tables of `catalog`.
    pub fn capture(catalog: &Catalog) -> Self {
        let tables = catalog
            .committed_tables()
            .iter()
            .filter_map(|entry| {
                let table = entry.as_table()?;
                Some(TableImage {
                    name: entry.name().to_string(),
                    columns: table.columns().to_vec(),
                    rows: table.committed_rows(),
                })
            })
            .collect();
        Self { tables }
    }

    /// Registers every table of the image as committed base state.
    pub fn load_into(self, catalog: &Catalog) -> Result<()> {
        for table in self.tables {
            let name = table.name.clone();
            catalog
                .load_table(&table.name, table.columns, table.rows)
                .wrap_err_with(|| format!("failed to load table '{}' from checkpoint", name))?;
        }
        Ok(())
    }

    pub fn is_empty(&self) -> bool {
        self.tables.is_empty()
    }

    pub fn encode(&self) -> Result<Vec<u8>> {
        let mut buf = Vec::with_capacity(64);
        buf.extend_from_slice(CHECKPOINT_MAGIC);
        buf.extend(CHECKPOINT_VERSION.to_le_bytes());
        ensure!(
            self.tables.len() <= u32::MAX as usize,
            "too many tables in checkpoint ({})",
            self.tables.len()
        );
        buf.extend((self.tables.len() as u32).to_le_bytes());

        for table in &self.tables {
            Self::encode_table(table, &mut buf)?;
        }

        let checksum = CRC64.checksum(&buf);
        buf.extend(checksum.to_le_bytes());
        Ok(buf)
    }

    fn encode_table(table: &TableImage, buf: &mut Vec<u8>) -> Result<()> {
        encode_name(&table.name, "table", buf)?;
        buf.extend((table.columns.len() as u32).to_le_bytes());
        for column in &table.columns {
            encode_name(column.name(), "column", buf)?;
            buf.push(column.data_type() as u8);
        }

        buf.extend((table.rows.len() as u64).to_le_bytes());
        for row in &table.rows {
            ensure!(
                row.len() == table.columns.len(),
                "row of table '{}' has {} values but the table has {} columns",
                table.name,
                row.len(),
                table.columns.len()
            );
            for value in row {
                encode_value(value, buf)?;
            }
        }
        Ok(())
    }

    pub fn decode(bytes: &[u8]) -> Result<Self> {
        ensure!(
            bytes.len() >= CHECKPOINT_MAGIC.len() + 8 + TRAILER_SIZE,
            "checkpoint image is truncated ({} bytes)",
            bytes.len()
        );
        ensure!(
            &bytes[..CHECKPOINT_MAGIC.len()] == CHECKPOINT_MAGIC,
            "not a checkpoint image (bad magic)"
        );

        let (content, trailer) = bytes.split_at(bytes.len() - TRAILER_SIZE);
        let stored = u64::from_le_bytes(
            trailer
                .try_into()
                .wrap_err("checkpoint trailer has wrong size")?,
        );
        let computed = CRC64.checksum(content);
        ensure!(
            stored == computed,
            "checkpoint checksum mismatch: stored {:#018x}, computed {:#018x}",
            stored,
            computed
        );

        let mut reader = Reader {
            bytes: content,
            pos: CHECKPOINT_MAGIC.len(),
        };
        let version = reader.u32("version")?;
        ensure!(
            version == CHECKPOINT_VERSION,
            "unsupported checkpoint version {} (expected {})",
            version,
            CHECKPOINT_VERSION
        );

        let table_count = reader.u32("table count")? as usize;
        let mut tables = Vec::with_capacity(table_count.min(1024));
        for _ in 0..table_count {
            tables.push(Self::decode_table(&mut reader)?);
        }
        ensure!(
            reader.pos == content.len(),
            "{} trailing bytes after last table",
            content.len() - reader.pos
        );
        Ok(Self { tables })
    }

    fn decode_table(reader: &mut Reader<'_>) -> Result<TableImage> {
        let name = reader.name("table name")?;
        let column_count = reader.u32("column count")? as usize;
        let mut columns = Vec::with_capacity(column_count.min(1024));
        for _ in 0..column_count {
            let column_name = reader.name("column name")?;
            let tag = reader.u8("data type")?;
            let Some(data_type) = DataType::from_u8(tag) else {
                bail!("unknown data type byte {} for column '{}'", tag, column_name);
            };
            columns.push(ColumnDef::new(column_name, data_type));
        }

        let row_count = reader.u64("row count")? as usize;
        let mut rows = Vec::with_capacity(row_count.min(4096));
        for _ in 0..row_count {
            let mut row = Vec::with_capacity(column_count);
            for _ in 0..column_count {
                row.push(reader.value()?);
            }
            rows.push(row);
        }
        Ok(TableImage {
            name,
            columns,
            rows,
        })
    }
}

fn encode_name(name: &str, what: &str, buf: &mut Vec<u8>) -> Result<()> {
    let bytes = name.as_bytes();
    ensure!(
        bytes.len() <= u16::MAX as usize,
        "{} name '{}' is too long (max {} bytes)",
        what,
        name,
        u16::MAX
    );
    buf.extend((bytes.len() as u16).to_le_bytes());
    buf.extend_from_slice(bytes);
    Ok(())
}

fn encode_value(value: &OwnedValue, buf: &mut Vec<u8>) -> Result<()> {
    match value {
        OwnedValue::Null => buf.push(TAG_NULL),
        OwnedValue::Bool(b) => {
            buf.push(TAG_BOOL);
            buf.push(u8::from(*b));
        }
        OwnedValue::Int(i) => {
            buf.push(TAG_INT);
            buf.extend(i.to_le_bytes());
        }
        OwnedValue::Float(f) => {
            buf.push(TAG_FLOAT);
            buf.extend(f.to_bits().to_le_bytes());
        }
        OwnedValue::Text(s) => {
            ensure!(
                s.len() <= u32::MAX as usize,
                "text value too long for checkpoint ({} bytes)",
                s.len()
            );
            buf.push(TAG_TEXT);
            buf.extend((s.len() as u32).to_le_bytes());
            buf.extend_from_slice(s.as_bytes());
        }
    }
    Ok(())
}

struct Reader<'a> {
    bytes: &'a [u8],
    pos: usize,
}

impl<'a> Reader<'a> {
    fn take(&mut self, n: usize, what: &str) -> Result<&'a [u8]> {
        ensure!(
            self.pos + n <= self.bytes.len(),
            "unexpected end of data reading {} at offset {}",
            what,
            self.pos
        );
        let slice = &self.bytes[self.pos..self.pos + n];
        self.pos += n;
        Ok(slice)
    }

    fn u8(&mut self, what: &str) -> Result<u8> {
        Ok(self.take(1, what)?[0])
    }

    fn u32(&mut self, what: &str) -> Result<u32> {
        let mut raw = [0u8; 4];
        raw.copy_from_slice(self.take(4, what)?);
        Ok(u32::from_le_bytes(raw))
    }

    fn u64(&mut self, what: &str) -> Result<u64> {
        let mut raw = [0u8; 8];
        raw.copy_from_slice(self.take(8, what)?);
        Ok(u64::from_le_bytes(raw))
    }

    fn name(&mut self, what: &str) -> Result<String> {
        let mut raw = [0u8; 2];
        raw.copy_from_slice(self.take(2, what)?);
        let len = u16::from_le_bytes(raw) as usize;
        let bytes = self.take(len, what)?;
        String::from_utf8(bytes.to_vec()).wrap_err_with(|| format!("{} is not valid UTF-8", what))
    }

    fn value(&mut self) -> Result<OwnedValue> {
        let value = match self.u8("value tag")? {
            TAG_NULL => OwnedValue::Null,
            TAG_BOOL => OwnedValue::Bool(self.u8("bool value")? != 0),
            TAG_INT => OwnedValue::Int(self.u64("integer value")? as i64),
            TAG_FLOAT => OwnedValue::Float(f64::from_bits(self.u64("float value")?)),
            TAG_TEXT => {
                let len = self.u32("text length")? as usize;
                let bytes = self.take(len, "text value")?;
                OwnedValue::Text(
                    String::from_utf8(bytes.to_vec()).wrap_err("text value is not valid UTF-8")?,
                )
            }
            other => bail!("unknown value tag {}", other),
        };
        Ok(value)
    }
}
