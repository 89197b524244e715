// Byte regions with heap or memory-mapped provenance, and typed views into
// them. Compact stores expose their state and element arrays through these
// without copying when alignment allows.

use std::fs::File;
use std::io;
use std::path::Path;
use std::sync::Arc as SharedPtr;

use bytemuck::Pod;
use memmap2::Mmap;

/// How file-backed data is brought into memory.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LoadMode {
    /// Read the whole file onto the heap.
    #[default]
    Read,
    /// Memory-map the file read-only; the OS pages data in on demand and
    /// the mapping is shareable across processes.
    Map,
}

#[derive(Debug)]
enum Backing {
    Heap(Vec<u8>),
    Mmap(Mmap),
}

/// An immutable byte range whose address is stable for its whole lifetime.
///
/// Shared through [`SharedPtr`]; views and typed slices borrow from the
/// region, and dropping the last handle releases the heap buffer or OS
/// mapping.
#[derive(Debug)]
pub struct MappedRegion {
    backing: Backing,
}

impl MappedRegion {
    pub fn from_vec(bytes: Vec<u8>) -> Self {
        Self {
            backing: Backing::Heap(bytes),
        }
    }

    /// Map an open file read-only.
    pub fn map_file(file: &File) -> io::Result<Self> {
        // Soundness relies on the file not being truncated while mapped,
        // the usual contract for read-only dictionary-style data.
        let mmap = unsafe { Mmap::map(file)? };
        Ok(Self {
            backing: Backing::Mmap(mmap),
        })
    }

    /// Bring a file into memory with the chosen provenance.
    pub fn open(path: impl AsRef<Path>, mode: LoadMode) -> io::Result<Self> {
        match mode {
            LoadMode::Read => Ok(Self::from_vec(std::fs::read(path)?)),
            LoadMode::Map => Self::map_file(&File::open(path)?),
        }
    }

    pub fn data(&self) -> &[u8] {
        match &self.backing {
            Backing::Heap(v) => v,
            Backing::Mmap(m) => m,
        }
    }

    pub fn len(&self) -> usize {
        self.data().len()
    }

    pub fn is_empty(&self) -> bool {
        self.data().is_empty()
    }

    pub fn is_mapped(&self) -> bool {
        matches!(self.backing, Backing::Mmap(_))
    }
}

/// A `[T]` view that either borrows a shared region or owns a copy.
///
/// Construction validates alignment: when the region slice is properly
/// aligned for `T` the view is zero-copy; otherwise the elements are copied
/// into an owned, aligned buffer (a region embedded mid-file, e.g. inside an
/// archive, may start at any offset).
#[derive(Debug)]
pub enum TypedSlice<T: Pod> {
    Owned(Vec<T>),
    Mapped {
        region: SharedPtr<MappedRegion>,
        offset: usize,
        len: usize,
    },
}

impl<T: Pod> TypedSlice<T> {
    /// View `len` elements starting at byte `offset` of `region`.
    pub fn from_region(
        region: &SharedPtr<MappedRegion>,
        offset: usize,
        len: usize,
    ) -> Result<Self, crate::FstError> {
        let nbytes = len * size_of::<T>();
        let data = region.data();
        if offset + nbytes > data.len() {
            return Err(crate::FstError::Truncated {
                expected: offset + nbytes,
                actual: data.len(),
            });
        }
        let bytes = &data[offset..offset + nbytes];
        if bytemuck::try_cast_slice::<u8, T>(bytes).is_ok() {
            Ok(Self::Mapped {
                region: SharedPtr::clone(region),
                offset,
                len,
            })
        } else {
            // Misaligned source: copy into an owned, aligned buffer.
            let mut owned = vec![T::zeroed(); len];
            bytemuck::cast_slice_mut::<T, u8>(&mut owned).copy_from_slice(bytes);
            Ok(Self::Owned(owned))
        }
    }

    pub fn from_vec(v: Vec<T>) -> Self {
        Self::Owned(v)
    }

    pub fn as_slice(&self) -> &[T] {
        match self {
            Self::Owned(v) => v,
            Self::Mapped {
                region,
                offset,
                len,
            } => {
                let bytes = &region.data()[*offset..*offset + *len * size_of::<T>()];
                bytemuck::cast_slice(bytes)
            }
        }
    }

    pub fn len(&self) -> usize {
        match self {
            Self::Owned(v) => v.len(),
            Self::Mapped { len, .. } => *len,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn is_mapped(&self) -> bool {
        matches!(self, Self::Mapped { .. })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn heap_region() {
        let region = MappedRegion::from_vec(vec![1, 2, 3]);
        assert_eq!(region.data(), &[1, 2, 3]);
        assert!(!region.is_mapped());
    }

    #[test]
    fn mapped_region_matches_heap_read() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(&[9u8, 8, 7, 6]).unwrap();
        file.flush().unwrap();

        let read = MappedRegion::open(file.path(), LoadMode::Read).unwrap();
        let mapped = MappedRegion::open(file.path(), LoadMode::Map).unwrap();
        assert_eq!(read.data(), mapped.data());
        assert!(mapped.is_mapped());
    }

    #[test]
    fn typed_slice_aligned_is_zero_copy() {
        let mut bytes = Vec::new();
        for v in [1u32, 2, 3] {
            bytes.extend_from_slice(&v.to_le_bytes());
        }
        let region = SharedPtr::new(MappedRegion::from_vec(bytes));
        let slice = TypedSlice::<u32>::from_region(&region, 0, 3).unwrap();
        assert_eq!(slice.as_slice(), &[1, 2, 3]);
    }

    #[test]
    fn typed_slice_misaligned_copies() {
        let mut bytes = vec![0u8];
        for v in [4u32, 5] {
            bytes.extend_from_slice(&v.to_le_bytes());
        }
        let region = SharedPtr::new(MappedRegion::from_vec(bytes));
        let slice = TypedSlice::<u32>::from_region(&region, 1, 2).unwrap();
        assert_eq!(slice.as_slice(), &[4, 5]);
        assert!(!slice.is_mapped());
    }

    #[test]
    fn typed_slice_bounds_check() {
        let region = SharedPtr::new(MappedRegion::from_vec(vec![0u8; 4]));
        assert!(TypedSlice::<u32>::from_region(&region, 0, 2).is_err());
    }
}
