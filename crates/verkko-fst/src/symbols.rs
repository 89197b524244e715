// Symbol table: bidirectional label-to-symbol mapping with binary
// serialization. Textual symbol I/O belongs to external tooling.

use std::io::{self, Write};

use hashbrown::HashMap;

use crate::io::ByteReader;
use crate::{FstError, Result};

/// Magic number opening a serialized symbol table.
pub const SYMBOL_TABLE_MAGIC: i32 = 0x7eb2fd74;

/// A mapping between symbol strings and integer keys.
///
/// Keys need not be dense; insertion order is preserved for iteration and
/// round-trips. Label 0 is conventionally the epsilon symbol, but the table
/// itself imposes no convention.
#[derive(Debug, Clone, Default)]
pub struct SymbolTable {
    name: String,
    available_key: i64,
    entries: Vec<(i64, String)>,
    by_symbol: HashMap<String, i64>,
    by_key: HashMap<i64, usize>,
}

impl SymbolTable {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Self::default()
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn num_symbols(&self) -> usize {
        self.entries.len()
    }

    /// Add a symbol under the next free key, or return its existing key.
    pub fn add_symbol(&mut self, symbol: impl Into<String>) -> i64 {
        let symbol = symbol.into();
        if let Some(&key) = self.by_symbol.get(&symbol) {
            return key;
        }
        let key = self.available_key;
        self.insert(symbol, key);
        key
    }

    /// Add a symbol under an explicit key; returns the key actually mapped
    /// (the existing one when the symbol is already present).
    pub fn add_symbol_key(&mut self, symbol: impl Into<String>, key: i64) -> i64 {
        let symbol = symbol.into();
        if let Some(&existing) = self.by_symbol.get(&symbol) {
            return existing;
        }
        self.insert(symbol, key);
        key
    }

    fn insert(&mut self, symbol: String, key: i64) {
        self.by_symbol.insert(symbol.clone(), key);
        self.by_key.insert(key, self.entries.len());
        self.entries.push((key, symbol));
        if key >= self.available_key {
            self.available_key = key + 1;
        }
    }

    pub fn find_symbol(&self, key: i64) -> Option<&str> {
        self.by_key
            .get(&key)
            .map(|&i| self.entries[i].1.as_str())
    }

    pub fn find_key(&self, symbol: &str) -> Option<i64> {
        self.by_symbol.get(symbol).copied()
    }

    /// (key, symbol) pairs in insertion order.
    pub fn iter(&self) -> impl Iterator<Item = (i64, &str)> {
        self.entries.iter().map(|(k, s)| (*k, s.as_str()))
    }

    pub fn write<W: Write>(&self, w: &mut W) -> io::Result<()> {
        crate::io::write_i32(w, SYMBOL_TABLE_MAGIC)?;
        crate::io::write_string(w, &self.name)?;
        crate::io::write_i64(w, self.available_key)?;
        crate::io::write_i64(w, self.entries.len() as i64)?;
        for (key, symbol) in &self.entries {
            crate::io::write_string(w, symbol)?;
            crate::io::write_i64(w, *key)?;
        }
        Ok(())
    }

    pub fn read(r: &mut ByteReader<'_>) -> Result<Self> {
        let magic = r.read_i32()?;
        if magic != SYMBOL_TABLE_MAGIC {
            return Err(FstError::BadMagic {
                expected: SYMBOL_TABLE_MAGIC,
                found: magic,
            });
        }
        let name = r.read_string()?;
        let available_key = r.read_i64()?;
        let count = r.read_i64()?;
        if count < 0 {
            return Err(FstError::BadSymbolTable(format!(
                "negative symbol count {count}"
            )));
        }
        let mut table = Self::new(name);
        for _ in 0..count {
            let symbol = r.read_string()?;
            let key = r.read_i64()?;
            table.add_symbol_key(symbol, key);
        }
        table.available_key = available_key.max(table.available_key);
        Ok(table)
    }
}
