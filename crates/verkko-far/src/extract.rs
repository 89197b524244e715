// Extraction of component FSTs from an archive, by explicit keys, key
// ranges, or wholesale, writing one FST file per selected entry.

use std::path::PathBuf;

use verkko_fst::compactor::PodWeight;
use verkko_fst::io::FstWriteOptions;
use verkko_fst::variant::FstVariant;

use crate::far::FarReader;
use crate::{FarError, Result};

/// Naming scheme for the extracted files.
#[derive(Debug, Clone, Default)]
pub struct ExtractNaming {
    /// Prepended to every generated file name (may carry a directory).
    pub source_prefix: String,
    /// Appended to every generated file name.
    pub source_suffix: String,
    /// When positive, name files by a zero-padded counter of this width
    /// instead of their keys.
    pub generate_sources: usize,
}

impl ExtractNaming {
    fn path(&self, key: &str, okey: &mut String, nrep: &mut usize, i: usize) -> PathBuf {
        if key == okey {
            *nrep += 1;
        } else {
            *nrep = 0;
        }
        okey.clear();
        okey.push_str(key);
        let mut name = String::new();
        name.push_str(&self.source_prefix);
        if self.generate_sources > 0 {
            name.push_str(&format!("{i:0width$}", width = self.generate_sources));
        } else {
            name.push_str(key);
            if *nrep > 0 {
                name.push_str(&format!(".{nrep}"));
            }
        }
        name.push_str(&self.source_suffix);
        PathBuf::from(name)
    }
}

fn write_entry<W: PodWeight>(
    fst: &FstVariant<W>,
    key: &str,
    naming: &ExtractNaming,
    okey: &mut String,
    nrep: &mut usize,
    i: usize,
    extracted: &mut Vec<String>,
) -> Result<()> {
    let path = naming.path(key, okey, nrep, i);
    fst.write_file(&path, &FstWriteOptions::default())?;
    extracted.push(key.to_string());
    Ok(())
}

/// Extract entries selected by `keys`: a `key_separator`-joined list of
/// single keys and `begin<range_delimiter>end` ranges (both bounds
/// inclusive). An empty `keys` extracts everything. Returns the extracted
/// keys in visit order; one FST file is written per entry.
pub fn far_extract<W: PodWeight>(
    reader: &mut FarReader<W>,
    keys: &str,
    key_separator: &str,
    range_delimiter: &str,
    naming: &ExtractNaming,
) -> Result<Vec<String>> {
    let mut extracted = Vec::new();
    let mut okey = String::new();
    let mut nrep = 0usize;
    let mut i = 0usize;

    if keys.is_empty() {
        reader.reset()?;
        while !reader.done() {
            let key = reader.get_key().to_string();
            let fst = reader.get_fst()?.clone();
            write_entry(&fst, &key, naming, &mut okey, &mut nrep, i, &mut extracted)?;
            reader.next()?;
            i += 1;
        }
        return Ok(extracted);
    }

    for spec in keys.split(key_separator).filter(|s| !s.is_empty()) {
        let bounds: Vec<&str> = spec.split(range_delimiter).collect();
        match bounds.as_slice() {
            [key] => {
                if !reader.find(key)? {
                    return Err(FarError::Format(format!("cannot find key '{key}'")));
                }
                let fst = reader.get_fst()?.clone();
                write_entry(&fst, key, naming, &mut okey, &mut nrep, i, &mut extracted)?;
                i += 1;
            }
            [begin, end] if !begin.is_empty() && !end.is_empty() => {
                if !reader.find(begin)? {
                    return Err(FarError::Format(format!("cannot find key '{begin}'")));
                }
                while !reader.done() {
                    let key = reader.get_key().to_string();
                    if end.as_bytes() < key.as_bytes() {
                        break;
                    }
                    let fst = reader.get_fst()?.clone();
                    write_entry(&fst, &key, naming, &mut okey, &mut nrep, i, &mut extracted)?;
                    reader.next()?;
                    i += 1;
                }
            }
            _ => {
                return Err(FarError::Format(format!(
                    "illegal range specification '{spec}'"
                )));
            }
        }
    }
    Ok(extracted)
}
