// Keyed archive interfaces over the concrete containers: writer and reader
// dispatch by archive type, and a reader can span a concatenation of
// archives, visiting each in turn.

use std::fs::File;
use std::io::BufWriter;
use std::path::{Path, PathBuf};

use verkko_fst::compactor::PodWeight;
use verkko_fst::io::{ByteReader, FST_MAGIC, FstWriteOptions};
use verkko_fst::mapped::LoadMode;
use verkko_fst::variant::FstVariant;

use crate::stlist::{STListReader, STListWriter};
use crate::sttable::{STTableReader, STTableWriter};
use crate::{FarError, FarType, Result, STLIST_MAGIC, STTABLE_MAGIC};

/// Identify a container by its leading magic number.
pub fn detect_far_type(path: impl AsRef<Path>) -> Result<FarType> {
    let mut head = [0u8; 4];
    use std::io::Read;
    File::open(path)?.read_exact(&mut head)?;
    let magic = ByteReader::new(&head).read_i32().map_err(FarError::from)?;
    if magic == STTABLE_MAGIC {
        Ok(FarType::STTable)
    } else if magic == STLIST_MAGIC {
        Ok(FarType::STList)
    } else if magic == FST_MAGIC {
        Ok(FarType::Fst)
    } else {
        Err(FarError::BadMagic(magic))
    }
}

/// Degenerate archive holding exactly one FST as a plain FST file; its key
/// is the file's stem.
#[derive(Debug)]
pub struct FstFarWriter<W: PodWeight> {
    path: PathBuf,
    written: bool,
    _weight: std::marker::PhantomData<W>,
}

impl<W: PodWeight> FstFarWriter<W> {
    pub fn create(path: impl AsRef<Path>) -> Self {
        Self {
            path: path.as_ref().to_path_buf(),
            written: false,
            _weight: std::marker::PhantomData,
        }
    }

    pub fn add(&mut self, _key: &str, fst: &FstVariant<W>) -> Result<()> {
        if self.written {
            return Err(FarError::SingleFstOccupied);
        }
        fst.write_file(&self.path, &FstWriteOptions::default())?;
        self.written = true;
        Ok(())
    }
}

/// Reader over a single-FST archive.
#[derive(Debug)]
pub struct FstFarReader<W: PodWeight> {
    key: String,
    fst: FstVariant<W>,
    done: bool,
}

impl<W: PodWeight> FstFarReader<W> {
    pub fn open(path: impl AsRef<Path>, mode: LoadMode) -> Result<Self> {
        let path = path.as_ref();
        let key = path
            .file_stem()
            .map(|stem| stem.to_string_lossy().into_owned())
            .unwrap_or_default();
        Ok(Self {
            key,
            fst: FstVariant::read_file(path, mode)?,
            done: false,
        })
    }

    pub fn done(&self) -> bool {
        self.done
    }

    pub fn next(&mut self) {
        self.done = true;
    }

    pub fn reset(&mut self) {
        self.done = false;
    }

    pub fn find(&mut self, key: &str) -> bool {
        if key == self.key {
            self.done = false;
            true
        } else {
            false
        }
    }

    pub fn get_key(&self) -> &str {
        if self.done { "" } else { &self.key }
    }

    pub fn get_fst(&self) -> &FstVariant<W> {
        &self.fst
    }
}

/// Writer over any archive type.
#[derive(Debug)]
pub enum FarWriter<W: PodWeight> {
    STTable(STTableWriter<W, BufWriter<File>>),
    STList(STListWriter<W, BufWriter<File>>),
    Fst(FstFarWriter<W>),
}

impl<W: PodWeight> FarWriter<W> {
    /// Open a new archive of the given type (`Default` resolves to the
    /// sorted table).
    pub fn create(path: impl AsRef<Path>, far_type: FarType) -> Result<Self> {
        match far_type.resolve() {
            FarType::STTable => Ok(Self::STTable(STTableWriter::create(path)?)),
            FarType::STList => Ok(Self::STList(STListWriter::create(path)?)),
            FarType::Fst => Ok(Self::Fst(FstFarWriter::create(path))),
            FarType::Default => unreachable!("resolved above"),
        }
    }

    /// Append one keyed FST. Sorted tables enforce strictly increasing
    /// keys; the single-FST container accepts exactly one entry.
    pub fn add(&mut self, key: &str, fst: &FstVariant<W>) -> Result<()> {
        match self {
            Self::STTable(w) => w.add(key, fst),
            Self::STList(w) => w.add(key, fst),
            Self::Fst(w) => w.add(key, fst),
        }
    }

    /// Finalize the archive (the sorted table writes its index here).
    pub fn close(self) -> Result<()> {
        match self {
            Self::STTable(w) => {
                w.close()?;
                Ok(())
            }
            Self::STList(w) => {
                w.close()?;
                Ok(())
            }
            Self::Fst(_) => Ok(()),
        }
    }

    pub fn far_type(&self) -> FarType {
        match self {
            Self::STTable(_) => FarType::STTable,
            Self::STList(_) => FarType::STList,
            Self::Fst(_) => FarType::Fst,
        }
    }
}

#[derive(Debug)]
enum FarSource<W: PodWeight> {
    STTable(STTableReader<W>),
    STList(STListReader<W>),
    Fst(FstFarReader<W>),
}

impl<W: PodWeight> FarSource<W> {
    fn open(path: &Path, mode: LoadMode) -> Result<Self> {
        match detect_far_type(path)? {
            FarType::STTable => Ok(Self::STTable(STTableReader::open(path, mode)?)),
            FarType::STList => Ok(Self::STList(STListReader::open(path, mode)?)),
            FarType::Fst => Ok(Self::Fst(FstFarReader::open(path, mode)?)),
            FarType::Default => unreachable!("detection never yields default"),
        }
    }

    fn done(&self) -> bool {
        match self {
            Self::STTable(r) => r.done(),
            Self::STList(r) => r.done(),
            Self::Fst(r) => r.done(),
        }
    }

    fn next(&mut self) -> Result<()> {
        match self {
            Self::STTable(r) => r.next(),
            Self::STList(r) => r.next(),
            Self::Fst(r) => {
                r.next();
                Ok(())
            }
        }
    }

    fn reset(&mut self) -> Result<()> {
        match self {
            Self::STTable(r) => r.reset(),
            Self::STList(r) => r.reset(),
            Self::Fst(r) => {
                r.reset();
                Ok(())
            }
        }
    }

    fn find(&mut self, key: &str) -> Result<bool> {
        match self {
            Self::STTable(r) => r.find(key),
            Self::STList(r) => r.find(key),
            Self::Fst(r) => Ok(r.find(key)),
        }
    }

    fn get_key(&self) -> &str {
        match self {
            Self::STTable(r) => r.get_key(),
            Self::STList(r) => r.get_key(),
            Self::Fst(r) => r.get_key(),
        }
    }

    fn get_fst(&mut self) -> Result<&FstVariant<W>> {
        match self {
            Self::STTable(r) => r.get_fst(),
            Self::STList(r) => r.get_fst(),
            Self::Fst(r) => Ok(r.get_fst()),
        }
    }

    fn far_type(&self) -> FarType {
        match self {
            Self::STTable(_) => FarType::STTable,
            Self::STList(_) => FarType::STList,
            Self::Fst(_) => FarType::Fst,
        }
    }
}

/// Reader over one archive or a logical concatenation of several: iteration
/// visits each archive in turn, and lookup tries each archive's own find.
#[derive(Debug)]
pub struct FarReader<W: PodWeight> {
    sources: Vec<FarSource<W>>,
    cur: usize,
}

impl<W: PodWeight> FarReader<W> {
    pub fn open(path: impl AsRef<Path>, mode: LoadMode) -> Result<Self> {
        Self::open_files(&[path.as_ref().to_path_buf()], mode)
    }

    pub fn open_files(paths: &[PathBuf], mode: LoadMode) -> Result<Self> {
        let mut sources = Vec::with_capacity(paths.len());
        for path in paths {
            sources.push(FarSource::open(path, mode)?);
        }
        let mut reader = Self { sources, cur: 0 };
        reader.skip_exhausted();
        Ok(reader)
    }

    fn skip_exhausted(&mut self) {
        while self.cur < self.sources.len() && self.sources[self.cur].done() {
            self.cur += 1;
        }
    }

    pub fn done(&self) -> bool {
        self.cur >= self.sources.len()
    }

    pub fn next(&mut self) -> Result<()> {
        if !self.done() {
            self.sources[self.cur].next()?;
            self.skip_exhausted();
        }
        Ok(())
    }

    pub fn reset(&mut self) -> Result<()> {
        for source in &mut self.sources {
            source.reset()?;
        }
        self.cur = 0;
        self.skip_exhausted();
        Ok(())
    }

    pub fn get_key(&self) -> &str {
        if self.done() {
            ""
        } else {
            self.sources[self.cur].get_key()
        }
    }

    pub fn get_fst(&mut self) -> Result<&FstVariant<W>> {
        if self.done() {
            return Err(FarError::Format("read past the end of the archive".to_string()));
        }
        self.sources[self.cur].get_fst()
    }

    /// Try each archive's lookup in turn; positions the reader at the first
    /// archive holding the key.
    pub fn find(&mut self, key: &str) -> Result<bool> {
        for i in 0..self.sources.len() {
            if self.sources[i].find(key)? {
                self.cur = i;
                return Ok(true);
            }
        }
        Ok(false)
    }

    /// Container type of the first archive.
    pub fn far_type(&self) -> Option<FarType> {
        self.sources.first().map(FarSource::far_type)
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

    fn write_far(path: &Path, far_type: FarType, entries: &[(&str, &[i32])]) {
        let mut writer = FarWriter::<W>::create(path, far_type).unwrap();
        for (key, labels) in entries {
            writer.add(key, &string_fst(labels)).unwrap();
        }
        writer.close().unwrap();
    }

    #[test]
    fn sttable_far_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("letters.far");
        write_far(&path, FarType::STTable, &[("a", &[1]), ("b", &[2])]);

        assert_eq!(detect_far_type(&path).unwrap(), FarType::STTable);
        let mut reader = FarReader::<W>::open(&path, LoadMode::Read).unwrap();
        assert_eq!(reader.far_type(), Some(FarType::STTable));
        assert_eq!(reader.get_key(), "a");
        assert_eq!(reader.get_fst().unwrap().num_states(), 2);
        reader.next().unwrap();
        assert_eq!(reader.get_key(), "b");
        reader.next().unwrap();
        assert!(reader.done());
    }

    #[test]
    fn default_type_writes_sttable() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("default.far");
        write_far(&path, FarType::Default, &[("k", &[1])]);
        assert_eq!(detect_far_type(&path).unwrap(), FarType::STTable);
    }

    #[test]
    fn fst_far_key_is_file_stem() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("single.far");
        let mut writer = FarWriter::<W>::create(&path, FarType::Fst).unwrap();
        writer.add("ignored", &string_fst(&[3])).unwrap();
        assert!(matches!(
            writer.add("again", &string_fst(&[4])).unwrap_err(),
            FarError::SingleFstOccupied
        ));
        writer.close().unwrap();

        assert_eq!(detect_far_type(&path).unwrap(), FarType::Fst);
        let mut reader = FarReader::<W>::open(&path, LoadMode::Read).unwrap();
        assert_eq!(reader.get_key(), "single");
        assert!(reader.find("single").unwrap());
        assert!(!reader.find("other").unwrap());
        reader.reset().unwrap();
        reader.next().unwrap();
        assert!(reader.done());
    }

    #[test]
    fn concatenation_visits_each_archive_in_turn() {
        let dir = tempfile::tempdir().unwrap();
        let first = dir.path().join("first.far");
        let second = dir.path().join("second.far");
        write_far(&first, FarType::STTable, &[("a", &[1]), ("c", &[2])]);
        write_far(&second, FarType::STList, &[("b", &[3])]);

        let mut reader =
            FarReader::<W>::open_files(&[first.clone(), second.clone()], LoadMode::Read)
                .unwrap();
        let mut keys = Vec::new();
        while !reader.done() {
            keys.push(reader.get_key().to_string());
            reader.next().unwrap();
        }
        // Concatenation order, not globally sorted.
        assert_eq!(keys, ["a", "c", "b"]);

        // Lookup tries each archive in turn.
        assert!(reader.find("b").unwrap());
        assert_eq!(reader.get_key(), "b");
        assert!(reader.find("a").unwrap());
        assert_eq!(reader.get_key(), "a");
        assert!(!reader.find("z").unwrap());
    }

    #[test]
    fn mapped_archive_reads_identically() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("mapped.far");
        write_far(&path, FarType::STTable, &[("x", &[7, 8])]);

        let mut heap = FarReader::<W>::open(&path, LoadMode::Read).unwrap();
        let mut mapped = FarReader::<W>::open(&path, LoadMode::Map).unwrap();
        assert!(heap.find("x").unwrap());
        assert!(mapped.find("x").unwrap());
        let a = heap.get_fst().unwrap();
        let b = mapped.get_fst().unwrap();
        assert_eq!(a.num_states(), b.num_states());
        use verkko_fst::Fst;
        for s in a.states() {
            let lhs: Vec<_> = a.transitions(s).collect();
            let rhs: Vec<_> = b.transitions(s).collect();
            assert_eq!(lhs, rhs);
        }
    }
}
