// Sorted-table archive: records in strictly increasing key order, closed by
// an offset index so lookup is a binary search over record offsets.
//
// Layout: magic (i32), then per record a length-prefixed key followed by the
// FST bytes, then each record's offset (i64), then the record count (i64).

use std::fs::File;
use std::io::{BufWriter, Write};
use std::marker::PhantomData;
use std::path::Path;
use std::sync::Arc as SharedPtr;

use verkko_fst::compactor::PodWeight;
use verkko_fst::io::{ByteReader, CountingWriter, FstWriteOptions, write_i32, write_i64};
use verkko_fst::mapped::{LoadMode, MappedRegion};
use verkko_fst::variant::FstVariant;

use crate::{FarError, Result, STTABLE_MAGIC};

/// Appends keyed FSTs in strictly increasing key order; `close` writes the
/// index. Keys compare as raw bytes.
#[derive(Debug)]
pub struct STTableWriter<W: PodWeight, S: Write> {
    sink: CountingWriter<S>,
    positions: Vec<i64>,
    last_key: String,
    _weight: PhantomData<W>,
}

impl<W: PodWeight> STTableWriter<W, BufWriter<File>> {
    pub fn create(path: impl AsRef<Path>) -> Result<Self> {
        Self::new(BufWriter::new(File::create(path)?))
    }
}

impl<W: PodWeight, S: Write> STTableWriter<W, S> {
    pub fn new(sink: S) -> Result<Self> {
        let mut sink = CountingWriter::new(sink);
        write_i32(&mut sink, STTABLE_MAGIC)?;
        Ok(Self {
            sink,
            positions: Vec::new(),
            last_key: String::new(),
            _weight: PhantomData,
        })
    }

    /// Append one entry; the key must exceed every key added so far.
    pub fn add(&mut self, key: &str, fst: &FstVariant<W>) -> Result<()> {
        if key.is_empty() {
            return Err(FarError::EmptyKey);
        }
        if key.as_bytes() <= self.last_key.as_bytes() {
            return Err(FarError::OutOfOrderKey {
                key: key.to_string(),
                last: self.last_key.clone(),
            });
        }
        self.last_key.clear();
        self.last_key.push_str(key);
        self.positions.push(self.sink.position() as i64);
        verkko_fst::io::write_string(&mut self.sink, key)?;
        fst.write(&mut self.sink, &FstWriteOptions::default())?;
        Ok(())
    }

    /// Finalize the archive by writing the offset index and record count;
    /// returns the underlying sink.
    pub fn close(mut self) -> Result<S> {
        for position in &self.positions {
            write_i64(&mut self.sink, *position)?;
        }
        write_i64(&mut self.sink, self.positions.len() as i64)?;
        self.sink.flush()?;
        Ok(self.sink.into_inner())
    }
}

/// Random-access reader over one sorted-table archive.
#[derive(Debug)]
pub struct STTableReader<W: PodWeight> {
    region: SharedPtr<MappedRegion>,
    positions: Vec<u64>,
    cur: usize,
    current_key: String,
    /// Byte offset of the current record's FST, valid with `current_key`.
    current_fst_offset: usize,
    fst: Option<FstVariant<W>>,
}

impl<W: PodWeight> STTableReader<W> {
    pub fn open(path: impl AsRef<Path>, mode: LoadMode) -> Result<Self> {
        Self::from_region(SharedPtr::new(MappedRegion::open(path, mode)?))
    }

    pub fn from_region(region: SharedPtr<MappedRegion>) -> Result<Self> {
        let data = region.data();
        let magic = ByteReader::new(data)
            .read_i32()
            .map_err(FarError::from)?;
        if magic != STTABLE_MAGIC {
            return Err(FarError::BadMagic(magic));
        }
        if data.len() < 12 {
            return Err(FarError::Format("missing index trailer".to_string()));
        }
        let mut tail = ByteReader::new(&data[data.len() - 8..]);
        let count = tail.read_i64().map_err(FarError::from)?;
        if count < 0 {
            return Err(FarError::Format(format!("negative record count {count}")));
        }
        let count = count as usize;
        let index_bytes = count
            .checked_mul(8)
            .and_then(|b| b.checked_add(8))
            .ok_or_else(|| FarError::Format("index overflow".to_string()))?;
        if data.len() < 4 + index_bytes {
            return Err(FarError::Format("truncated index".to_string()));
        }
        let mut index = ByteReader::new(&data[data.len() - index_bytes..]);
        let mut positions = Vec::with_capacity(count);
        for _ in 0..count {
            let position = index.read_i64().map_err(FarError::from)?;
            if position < 4 || position as usize >= data.len() {
                return Err(FarError::Format(format!("record offset {position} out of range")));
            }
            positions.push(position as u64);
        }
        let mut reader = Self {
            region,
            positions,
            cur: 0,
            current_key: String::new(),
            current_fst_offset: 0,
            fst: None,
        };
        reader.sync()?;
        Ok(reader)
    }

    /// Parse the key at the current position and remember where its FST
    /// starts.
    fn sync(&mut self) -> Result<()> {
        self.fst = None;
        self.current_key.clear();
        if self.done() {
            return Ok(());
        }
        let (key, offset) = self.entry(self.cur)?;
        self.current_key = key;
        self.current_fst_offset = offset;
        Ok(())
    }

    fn entry(&self, i: usize) -> Result<(String, usize)> {
        let position = self.positions[i] as usize;
        let mut r = ByteReader::new(&self.region.data()[position..]);
        let key = r.read_string().map_err(FarError::from)?;
        Ok((key, position + r.pos()))
    }

    pub fn num_entries(&self) -> usize {
        self.positions.len()
    }

    pub fn done(&self) -> bool {
        self.cur >= self.positions.len()
    }

    pub fn next(&mut self) -> Result<()> {
        self.cur += 1;
        self.sync()
    }

    pub fn reset(&mut self) -> Result<()> {
        self.cur = 0;
        self.sync()
    }

    /// Binary search; true iff the exact key exists, leaving the reader
    /// positioned on it (or on the first greater key otherwise).
    pub fn find(&mut self, key: &str) -> Result<bool> {
        let mut lo = 0usize;
        let mut hi = self.positions.len();
        while lo < hi {
            let mid = lo + (hi - lo) / 2;
            let (mid_key, _) = self.entry(mid)?;
            if mid_key.as_bytes() < key.as_bytes() {
                lo = mid + 1;
            } else {
                hi = mid;
            }
        }
        self.cur = lo;
        self.sync()?;
        Ok(!self.done() && self.current_key == key)
    }

    /// Key of the current record; empty past the end.
    pub fn get_key(&self) -> &str {
        &self.current_key
    }

    /// Parse (and memoize) the current record's FST.
    pub fn get_fst(&mut self) -> Result<&FstVariant<W>> {
        if self.done() {
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

#[cfg(test)]
mod tests {
    use super::*;
    use verkko_fst::compact_fst::CompactStringFst;
    use verkko_fst::compactor::StringCompactor;
    use verkko_fst::float_weight::TropicalWeight;
    use verkko_fst::fst::ExpandedFst;

    type W = TropicalWeight;

    fn string_fst(labels: &[i32]) -> FstVariant<W> {
        FstVariant::from(CompactStringFst::<W>::from_elements(
            labels.to_vec(),
            StringCompactor::default(),
        ))
    }

    fn sample_table() -> Vec<u8> {
        let mut writer = STTableWriter::<W, _>::new(Vec::new()).unwrap();
        writer.add("ant", &string_fst(&[1])).unwrap();
        writer.add("bee", &string_fst(&[2, 3])).unwrap();
        writer.add("cow", &string_fst(&[4])).unwrap();
        writer.close().unwrap()
    }

    #[test]
    fn iterates_in_key_order() {
        let bytes = sample_table();
        let mut reader =
            STTableReader::<W>::from_region(SharedPtr::new(MappedRegion::from_vec(bytes)))
                .unwrap();
        let mut keys = Vec::new();
        while !reader.done() {
            keys.push(reader.get_key().to_string());
            reader.next().unwrap();
        }
        assert_eq!(keys, ["ant", "bee", "cow"]);
    }

    #[test]
    fn rejects_out_of_order_keys() {
        let mut writer = STTableWriter::<W, _>::new(Vec::new()).unwrap();
        writer.add("a", &string_fst(&[1])).unwrap();
        writer.add("c", &string_fst(&[2])).unwrap();
        let err = writer.add("b", &string_fst(&[3])).unwrap_err();
        assert!(matches!(err, FarError::OutOfOrderKey { .. }));
        // Duplicate keys are out of order too.
        let err = writer.add("c", &string_fst(&[3])).unwrap_err();
        assert!(matches!(err, FarError::OutOfOrderKey { .. }));
    }

    #[test]
    fn find_positions_reader() {
        let bytes = sample_table();
        let mut reader =
            STTableReader::<W>::from_region(SharedPtr::new(MappedRegion::from_vec(bytes)))
                .unwrap();
        assert!(reader.find("bee").unwrap());
        assert_eq!(reader.get_key(), "bee");
        let fst = reader.get_fst().unwrap();
        assert_eq!(fst.num_states(), 3);

        reader.next().unwrap();
        assert_eq!(reader.get_key(), "cow");
        reader.next().unwrap();
        assert!(reader.done());

        assert!(!reader.find("bat").unwrap());
        // Positioned at the first greater key.
        assert_eq!(reader.get_key(), "bee");
    }

    #[test]
    fn rejects_bad_magic() {
        let mut bytes = Vec::new();
        write_i32(&mut bytes, 0x1111).unwrap();
        write_i64(&mut bytes, 0).unwrap();
        let err =
            STTableReader::<W>::from_region(SharedPtr::new(MappedRegion::from_vec(bytes)))
                .unwrap_err();
        assert!(matches!(err, FarError::BadMagic(_)));
    }
}
