//! String atomization and qualified-name interning.
//!
//! Streaming readers compare names constantly. Interning every
//! (local, namespace-uri, prefix) triple into a shared [`QNameTable`] turns
//! those comparisons into pointer checks: two names with equal components are
//! guaranteed to be the same `Arc<QName>` for the lifetime of the table.

use std::collections::{HashMap, HashSet};
use std::fmt;
use std::sync::{Arc, Mutex, MutexGuard};

/// The `xml:` namespace, predeclared in every document.
pub const NS_XML: &str = "http://www.w3.org/XML/1998/namespace";
/// The namespace of namespace-declaration attributes themselves.
pub const NS_XMLNS: &str = "http://www.w3.org/2000/xmlns/";

/// A thread-safe string atomizer.
///
/// `intern` returns the canonical `Arc<str>` for a given content; equal
/// contents always come back pointer-identical within one table's lifetime.
#[derive(Debug, Default)]
pub struct NameTable {
    atoms: Mutex<HashSet<Arc<str>>>,
}

impl NameTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the canonical instance for `s`, inserting it if unseen.
    pub fn intern(&self, s: &str) -> Arc<str> {
        let mut atoms = lock(&self.atoms);
        if let Some(atom) = atoms.get(s) {
            return Arc::clone(atom);
        }
        let atom: Arc<str> = Arc::from(s);
        atoms.insert(Arc::clone(&atom));
        atom
    }

    /// Lookup-only probe: the canonical instance if `s` was ever interned.
    pub fn get(&self, s: &str) -> Option<Arc<str>> {
        lock(&self.atoms).get(s).map(Arc::clone)
    }
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

/// An immutable namespace-qualified name.
///
/// All three components are atomized against the owning [`QNameTable`], so
/// `Arc::ptr_eq` on any component (or on the `Arc<QName>` itself) is
/// equivalent to content equality.
#[derive(Debug)]
pub struct QName {
    pub local: Arc<str>,
    pub ns_uri: Arc<str>,
    pub prefix: Arc<str>,
}

impl fmt::Display for QName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.prefix.is_empty() {
            f.write_str(&self.local)
        } else {
            write!(f, "{}:{}", self.prefix, self.local)
        }
    }
}

/// Interner from (local, namespace-uri, prefix) triples to `Arc<QName>`.
///
/// Candidates are kept per local name; a candidate matches when its already
/// atomized uri and prefix are pointer-identical to the atomized inputs.
/// One table is shared between the producer-side writer and the consumer-side
/// reader of a single transformation pipeline; it is not meant to be shared
/// across pipelines.
#[derive(Debug)]
pub struct QNameTable {
    names: NameTable,
    qnames: Mutex<HashMap<Arc<str>, Vec<Arc<QName>>>>,
    empty_str: Arc<str>,
    empty: Arc<QName>,
    xml_lang: Arc<QName>,
    xml_space: Arc<QName>,
    xmlns: Arc<QName>,
}

impl QNameTable {
    pub fn new() -> Self {
        let names = NameTable::new();
        let empty_str = names.intern("");
        let mut map = HashMap::new();
        let empty = Self::intern_into(&names, &mut map, "", "", "");
        let xml_lang = Self::intern_into(&names, &mut map, "lang", NS_XML, "xml");
        let xml_space = Self::intern_into(&names, &mut map, "space", NS_XML, "xml");
        let xmlns = Self::intern_into(&names, &mut map, "xmlns", NS_XMLNS, "");
        Self {
            names,
            qnames: Mutex::new(map),
            empty_str,
            empty,
            xml_lang,
            xml_space,
            xmlns,
        }
    }

    fn intern_into(
        names: &NameTable,
        map: &mut HashMap<Arc<str>, Vec<Arc<QName>>>,
        local: &str,
        ns_uri: &str,
        prefix: &str,
    ) -> Arc<QName> {
        let ns_uri = names.intern(ns_uri);
        let prefix = names.intern(prefix);
        let local = names.intern(local);
        let list = map.entry(Arc::clone(&local)).or_default();
        for candidate in list.iter() {
            if Arc::ptr_eq(&candidate.ns_uri, &ns_uri) && Arc::ptr_eq(&candidate.prefix, &prefix) {
                return Arc::clone(candidate);
            }
        }
        let qname = Arc::new(QName {
            local,
            ns_uri,
            prefix,
        });
        list.push(Arc::clone(&qname));
        qname
    }

    /// Atomizes a bare string against the backing [`NameTable`].
    pub fn intern(&self, s: &str) -> Arc<str> {
        self.names.intern(s)
    }

    /// Lookup-only probe of the backing [`NameTable`].
    pub fn get(&self, s: &str) -> Option<Arc<str>> {
        self.names.get(s)
    }

    /// Returns the canonical `Arc<QName>` for the given triple.
    pub fn qname(&self, local: &str, ns_uri: &str, prefix: &str) -> Arc<QName> {
        let mut map = lock(&self.qnames);
        Self::intern_into(&self.names, &mut map, local, ns_uri, prefix)
    }

    /// The interned empty string.
    pub fn empty_str(&self) -> Arc<str> {
        Arc::clone(&self.empty_str)
    }

    /// The empty qualified name, used for text, comment and PI tokens.
    pub fn empty(&self) -> Arc<QName> {
        Arc::clone(&self.empty)
    }

    /// `xml:lang`
    pub fn xml_lang(&self) -> Arc<QName> {
        Arc::clone(&self.xml_lang)
    }

    /// `xml:space`
    pub fn xml_space(&self) -> Arc<QName> {
        Arc::clone(&self.xml_space)
    }

    /// The default-namespace declaration attribute, `xmlns=""`.
    pub fn xmlns(&self) -> Arc<QName> {
        Arc::clone(&self.xmlns)
    }
}

impl Default for QNameTable {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn intern_returns_identical_instance() {
        let table = NameTable::new();
        let a = table.intern("urn:example");
        let b = table.intern(&String::from("urn:example"));
        assert!(Arc::ptr_eq(&a, &b));
    }

    #[test]
    fn get_does_not_insert() {
        let table = NameTable::new();
        assert!(table.get("never-seen").is_none());
        let a = table.intern("seen");
        assert!(Arc::ptr_eq(&a, &table.get("seen").unwrap()));
    }

    #[test]
    fn equal_triples_intern_to_same_qname() {
        let table = QNameTable::new();
        let a = table.qname("item", "urn:catalog", "c");
        let b = table.qname(&"item".to_string(), &"urn:catalog".to_string(), "c");
        assert!(Arc::ptr_eq(&a, &b));
        assert!(Arc::ptr_eq(&a.local, &b.local));
        assert!(Arc::ptr_eq(&a.ns_uri, &b.ns_uri));
    }

    #[test]
    fn distinct_triples_never_collide() {
        let table = QNameTable::new();
        let a = table.qname("item", "urn:catalog", "c");
        let b = table.qname("item", "urn:catalog", "d");
        let c = table.qname("item", "urn:other", "c");
        assert!(!Arc::ptr_eq(&a, &b));
        assert!(!Arc::ptr_eq(&a, &c));
        assert!(!Arc::ptr_eq(&b, &c));
    }

    #[test]
    fn well_known_names_are_interned() {
        let table = QNameTable::new();
        assert!(Arc::ptr_eq(
            &table.xml_lang(),
            &table.qname("lang", NS_XML, "xml")
        ));
        assert!(Arc::ptr_eq(
            &table.xml_space(),
            &table.qname("space", NS_XML, "xml")
        ));
        assert!(Arc::ptr_eq(&table.xmlns(), &table.qname("xmlns", NS_XMLNS, "")));
        assert!(Arc::ptr_eq(&table.empty(), &table.qname("", "", "")));
    }

    #[test]
    fn display_uses_prefix_when_present() {
        let table = QNameTable::new();
        assert_eq!(table.qname("item", "urn:catalog", "c").to_string(), "c:item");
        assert_eq!(table.qname("item", "", "").to_string(), "item");
    }
}
