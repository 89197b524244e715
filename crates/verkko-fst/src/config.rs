// Library configuration knobs, threaded explicitly through constructors.
//
// The field names preserve the flag vocabulary that command-line drivers
// expose (`--fst_error_fatal`, `--fst_weight_separator`, ...); the library
// itself takes no global state.

/// Configuration for FST construction and I/O.
#[derive(Debug, Clone)]
pub struct FstConfig {
    /// When set, drivers treat errors as fatal and exit; the library always
    /// surfaces them as error values or the sticky error property.
    pub error_fatal: bool,
    /// Separator between the printed components of a composite weight.
    pub weight_separator: char,
    /// Open/close bracket pair enclosing printed composite weights. Required
    /// for unambiguous nesting; `None` prints components unbracketed.
    pub weight_parentheses: Option<(char, char)>,
    /// Whether lazy-state caches garbage collect by default.
    pub default_cache_gc: bool,
    /// Default byte budget for lazy-state caches.
    pub default_cache_gc_limit: usize,
}

impl Default for FstConfig {
    fn default() -> Self {
        Self {
            error_fatal: false,
            weight_separator: ',',
            weight_parentheses: None,
            default_cache_gc: true,
            default_cache_gc_limit: 1 << 20,
        }
    }
}

impl FstConfig {
    /// Composite-weight text writer honoring this configuration.
    pub fn composite_writer<'a, S: std::fmt::Write>(
        &self,
        out: &'a mut S,
    ) -> crate::weight::CompositeWeightWriter<'a, S> {
        crate::weight::CompositeWeightWriter::new(
            out,
            self.weight_separator,
            self.weight_parentheses,
        )
    }

    /// Composite-weight text reader honoring this configuration.
    pub fn composite_reader(&self, input: &str) -> crate::weight::CompositeWeightReader {
        crate::weight::CompositeWeightReader::new(
            input,
            self.weight_separator,
            self.weight_parentheses,
        )
    }

    /// Render a weight in this configuration's text form.
    pub fn format_weight<W: crate::weight::Weight>(&self, w: &W) -> String {
        let mut out = String::new();
        let _ = w.write_text(&mut out, self.weight_separator, self.weight_parentheses);
        out
    }

    /// Parse a weight from this configuration's text form.
    pub fn parse_weight<W: crate::weight::Weight>(&self, s: &str) -> crate::Result<W> {
        W::parse_text(s, self.weight_separator, self.weight_parentheses)
    }
}
