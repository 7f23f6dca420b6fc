use super::charset::{Charset, CharsetResolver, Reference, Variable, VariableRegistry};
use std::collections::HashMap;
use tracing::debug;

/// Per character charset overrides.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MappingTable {
    entries: HashMap<char, Charset>,
    fold_lookups: bool,
}

impl MappingTable {
    /// Parse a mapping spec.
    ///
    /// The spec is either a `$name` reference to a variable (a mapping variable is used as is, a
    /// string variable is parsed as a spec) or a comma separated list of `char:charset` pairs. Each
    /// pair's charset is resolved right away so later registry changes don't leak into the table.
    /// Malformed pairs are skipped.
    pub fn parse(spec: Option<&str>, registry: &VariableRegistry, case_insensitive: bool) -> Self {
        let Some(spec) = spec.map(str::trim).filter(|s| !s.is_empty()) else {
            return Self::default();
        };
        let mut table = Self::default();
        if let Some(Reference::Variable { name, .. }) = Reference::parse(spec) {
            match registry.lookup(name) {
                Some(Variable::Mapping(prebuilt)) => {
                    for (target, glyphs) in prebuilt {
                        table.insert(*target, Charset::from(glyphs.as_str()), case_insensitive);
                    }
                    return table;
                }
                Some(Variable::Text(text)) => {
                    table.parse_pairs(text, registry, case_insensitive);
                    return table;
                }
                None => debug!("mapping variable '{name}' not found, parsing '{spec}' directly"),
            }
        }
        table.parse_pairs(spec, registry, case_insensitive);
        table
    }

    /// Enable case folded lookups at use time, on top of any duplication done while parsing.
    pub fn with_folded_lookups(mut self, fold: bool) -> Self {
        self.fold_lookups = fold;
        self
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Find the charset for a target character: exact match first, then its folded case.
    pub fn lookup(&self, target: char) -> Option<&Charset> {
        if let Some(charset) = self.entries.get(&target) {
            return Some(charset);
        }
        if !self.fold_lookups {
            return None;
        }
        other_cases(target).into_iter().find_map(|c| self.entries.get(&c))
    }

    /// Find the charset for a target character, falling back to `global`.
    pub fn charset_for<'a>(&'a self, target: char, global: &'a Charset) -> &'a Charset {
        self.lookup(target).unwrap_or(global)
    }

    fn parse_pairs(&mut self, spec: &str, registry: &VariableRegistry, case_insensitive: bool) {
        let resolver = CharsetResolver::new(registry);
        for pair in spec.split(',') {
            let Some((target, reference)) = pair.split_once(':') else {
                debug!("ignoring mapping pair without separator: '{pair}'");
                continue;
            };
            let mut chars = target.trim().chars();
            let (Some(target), None) = (chars.next(), chars.next()) else {
                debug!("ignoring mapping pair with invalid target: '{pair}'");
                continue;
            };
            let reference = reference.trim();
            if reference.is_empty() {
                debug!("ignoring mapping pair with empty charset: '{pair}'");
                continue;
            }
            let charset = resolver.resolve(Some(reference), &Charset::default());
            self.insert(target, charset, case_insensitive);
        }
    }

    fn insert(&mut self, target: char, charset: Charset, case_insensitive: bool) {
        if case_insensitive {
            // Folded entries never override an explicitly declared one.
            for folded in other_cases(target) {
                self.entries.entry(folded).or_insert_with(|| charset.clone());
            }
        }
        self.entries.insert(target, charset);
    }
}

/// The single character upper and lower case forms of `c`, excluding `c` itself.
fn other_cases(c: char) -> Vec<char> {
    let mut cases = Vec::with_capacity(2);
    for candidate in [single(c.to_lowercase()), single(c.to_uppercase())].into_iter().flatten() {
        if candidate != c && !cases.contains(&candidate) {
            cases.push(candidate);
        }
    }
    cases
}

fn single<I: Iterator<Item = char>>(mut chars: I) -> Option<char> {
    match (chars.next(), chars.next()) {
        (Some(c), None) => Some(c),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::scramble::charset::Scope;
    use rstest::rstest;

    fn registry() -> VariableRegistry {
        VariableRegistry::new()
            .with(Scope::Process, "digits", Variable::Text("0123456789".into()))
            .with(Scope::Page, "pairs", Variable::Text("a:AB,b:$digits".into()))
            .with(Scope::Page, "prebuilt", Variable::Mapping(HashMap::from([('q', "$digits".to_string())])))
    }

    #[rstest]
    #[case::absent(None)]
    #[case::empty(Some(""))]
    #[case::blank(Some("   "))]
    fn empty_input_yields_empty_table(#[case] spec: Option<&str>) {
        let table = MappingTable::parse(spec, &registry(), false);
        assert!(table.is_empty());
    }

    #[test]
    fn direct_pairs() {
        let table = MappingTable::parse(Some("x:AB, y : digits"), &registry(), false);
        assert_eq!(table.lookup('x'), Some(&Charset::from("AB")));
        assert_eq!(table.lookup('y'), Some(&Charset::from("0123456789")));
        assert_eq!(table.lookup('z'), None);
    }

    #[test]
    fn malformed_pairs_are_skipped() {
        let table = MappingTable::parse(Some("x:AB,nocolon,xy:CD,:EF,z:"), &registry(), false);
        assert_eq!(table.len(), 1);
        assert_eq!(table.lookup('x'), Some(&Charset::from("AB")));
    }

    #[test]
    fn string_variable_is_parsed_as_spec() {
        let table = MappingTable::parse(Some("$pairs"), &registry(), false);
        assert_eq!(table.lookup('a'), Some(&Charset::from("AB")));
        assert_eq!(table.lookup('b'), Some(&Charset::from("0123456789")));
    }

    #[test]
    fn mapping_variable_is_used_directly() {
        let table = MappingTable::parse(Some("$prebuilt"), &registry(), false);
        assert_eq!(table.lookup('q'), Some(&Charset::from("$digits")));
    }

    #[test]
    fn charsets_are_resolved_at_parse_time() {
        let mut registry = registry();
        let table = MappingTable::parse(Some("x:digits"), &registry, false);
        registry.insert(Scope::Page, "digits", Variable::Text("changed".into()));
        assert_eq!(table.lookup('x'), Some(&Charset::from("0123456789")));
    }

    #[test]
    fn case_insensitive_duplicates_entries() {
        let table = MappingTable::parse(Some("a:X"), &registry(), true);
        assert_eq!(table.lookup('a'), Some(&Charset::from("X")));
        assert_eq!(table.lookup('A'), Some(&Charset::from("X")));
    }

    #[test]
    fn declared_case_keeps_priority() {
        let table = MappingTable::parse(Some("É:1,é:2"), &registry(), true);
        assert_eq!(table.lookup('É'), Some(&Charset::from("1")));
        assert_eq!(table.lookup('é'), Some(&Charset::from("2")));

        let table = MappingTable::parse(Some("é:2,É:1"), &registry(), true);
        assert_eq!(table.lookup('É'), Some(&Charset::from("1")));
        assert_eq!(table.lookup('é'), Some(&Charset::from("2")));
    }

    #[test]
    fn case_sensitive_by_default() {
        let table = MappingTable::parse(Some("a:X"), &registry(), false);
        assert_eq!(table.lookup('A'), None);
    }

    #[test]
    fn folded_lookups_cover_prebuilt_tables() {
        let table = MappingTable::parse(Some("$prebuilt"), &registry(), false).with_folded_lookups(true);
        assert_eq!(table.lookup('Q'), Some(&Charset::from("$digits")));
    }

    #[test]
    fn global_fallback() {
        let table = MappingTable::parse(Some("x:AB"), &registry(), false);
        let global = Charset::from("CD");
        assert_eq!(table.charset_for('x', &global), &Charset::from("AB"));
        assert_eq!(table.charset_for('y', &global), &global);
    }

    #[test]
    fn uncased_characters_have_no_other_cases() {
        assert!(other_cases('1').is_empty());
        assert_eq!(other_cases('a'), vec!['A']);
        // 'ß' uppercases to "SS", which isn't a single character.
        assert!(other_cases('ß').is_empty());
    }
}
