// Streamable-list archive: length-delimited records in writer order, no
// index. Accepts keys in any order and writes to non-seekable sinks;
// reading is a sequential scan.
//
// Layout: magic (i32), then per record a length-prefixed key, the FST byte
// length (i64), and the FST bytes.

use std::fs::File;
use std::io::{BufWriter, Write};
use std::marker::PhantomData;
use std::path::Path;
use std::sync::Arc as SharedPtr;

use verkko_fst::compactor::PodWeight;
use verkko_fst::io::{ByteReader, FstWriteOptions, write_i32, write_i64, write_string};
use verkko_fst::mapped::{LoadMode, MappedRegion};
use verkko_fst::variant::FstVariant;

use crate::{FarError, Result, STLIST_MAGIC};

/// Appends keyed FSTs in any order.
#[derive(Debug)]
pub struct STListWriter<W: PodWeight, S: Write> {
    sink: S,
    _weight: PhantomData<W>,
}

impl<W: PodWeight> STListWriter<W, BufWriter<File>> {
    pub fn create(path: impl AsRef<Path>) -> Result<Self> {
        Self::new(BufWriter::new(File::create(path)?))
    }
}

impl<W: PodWeight, S: Write> STListWriter<W, S> {
    pub fn new(mut sink: S) -> Result<Self> {
        write_i32(&mut sink, STLIST_MAGIC)?;
        Ok(Self {
            sink,
            _weight: PhantomData,
        })
    }

    pub fn add(&mut self, key: &str, fst: &FstVariant<W>) -> Result<()> {
        if key.is_empty() {
            return Err(FarError::EmptyKey);
        }
        // Buffer the FST so the record carries its byte length.
        let mut body = Vec::new();
        fst.write(&mut body, &FstWriteOptions::default())?;
        write_string(&mut self.sink, key)?;
        write_i64(&mut self.sink, body.len() as i64)?;
        self.sink.write_all(&body)?;
        Ok(())
    }

    pub fn close(mut self) -> Result<S> {
        self.sink.flush()?;
        Ok(self.sink)
    }
}

/// Sequential reader over one streamable-list archive.
#[derive(Debug)]
pub struct STListReader<W: PodWeight> {
    region: SharedPtr<MappedRegion>,
    /// Offset of the record under the cursor.
    pos: usize,
    next_pos: usize,
    current_key: String,
    current_fst_offset: usize,
    done: bool,
    fst: Option<FstVariant<W>>,
}

impl<W: PodWeight> STListReader<W> {
    pub fn open(path: impl AsRef<Path>, mode: LoadMode) -> Result<Self> {
        Self::from_region(SharedPtr::new(MappedRegion::open(path, mode)?))
    }

    pub fn from_region(region: SharedPtr<MappedRegion>) -> Result<Self> {
        let magic = ByteReader::new(region.data())
            .read_i32()
            .map_err(FarError::from)?;
        if magic != STLIST_MAGIC {
            return Err(FarError::BadMagic(magic));
        }
        let mut reader = Self {
            region,
            pos: 4,
            next_pos: 4,
            current_key: String::new(),
            current_fst_offset: 0,
            done: false,
            fst: None,
        };
        reader.sync()?;
        Ok(reader)
    }

    /// Parse the record header at the cursor.
    fn sync(&mut self) -> Result<()> {
        self.fst = None;
        self.current_key.clear();
        let data = self.region.data();
        if self.pos >= data.len() {
            self.done = true;
            return Ok(());
        }
        let mut r = ByteReader::new(&data[self.pos..]);
        let key = r.read_string().map_err(FarError::from)?;
        let len = r.read_i64().map_err(FarError::from)?;
        if len < 0 {
            return Err(FarError::Format(format!("negative record length {len}")));
        }
        let fst_offset = self.pos + r.pos();
        let next = fst_offset + len as usize;
        if next > data.len() {
            return Err(FarError::Format("truncated record".to_string()));
        }
        self.current_key = key;
        self.current_fst_offset = fst_offset;
        self.next_pos = next;
        self.done = false;
        Ok(())
    }

    pub fn done(&self) -> bool {
        self.done
    }

    pub fn next(&mut self) -> Result<()> {
        self.pos = self.next_pos;
        self.sync()
    }

    pub fn reset(&mut self) -> Result<()> {
        self.pos = 4;
        self.done = false;
        self.sync()
    }

    /// Linear scan from the beginning; true iff the key occurs, leaving the
    /// reader on its first occurrence.
    pub fn find(&mut self, key: &str) -> Result<bool> {
        self.reset()?;
        while !self.done {
            if self.current_key == key {
                return Ok(true);
            }
            self.next()?;
        }
        Ok(false)
    }

    pub fn get_key(&self) -> &str {
        &self.current_key
    }

    pub fn get_fst(&mut self) -> Result<&FstVariant<W>> {
        if self.done {
            return Err(FarError::Format("read past the end of the archive".to_string()));
        }
        if self.fst.is_none() {
            self.fst = Some(FstVariant::read_region(
                &self.region,
                self.current_fst_offset,
            )?);
        }
        Ok(self.fst.as_ref().expect("just parsed"))
    }
}
