//! Element/namespace scope tracking for the pull reader.
//!
//! The reader has no tree to consult: end tags carry no name on the wire and
//! namespace context exists only as the history of xmlns attributes seen so
//! far. One growable vec of scope entries covers both: element markers give
//! `EndElement` its qualified name back, binding entries give
//! `lookup_namespace`, `xml:lang` and `xml:space` their in-scope values.

use std::mem;
use std::sync::Arc;

use xslpull_qname::{NS_XML, QName, QNameTable};

use crate::error::ReaderError;

/// The effective `xml:space` value.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum XmlSpace {
    /// No `xml:space` attribute in scope.
    #[default]
    None,
    Default,
    Preserve,
}

impl XmlSpace {
    fn parse(value: &str) -> Option<Self> {
        match value {
            "default" => Some(XmlSpace::Default),
            "preserve" => Some(XmlSpace::Preserve),
            _ => None,
        }
    }
}

/// One record on the scope stack.
///
/// An element's binding entries are pushed while its attribute run is being
/// drained, the marker last, so the marker sits on top for the matching end
/// tag. Lang/space entries store the value to restore when the scope ends.
#[derive(Debug)]
enum ScopeEntry {
    Element(Arc<QName>),
    Namespace { prefix: Arc<str>, uri: Arc<str> },
    PrevLang(Arc<str>),
    PrevSpace(XmlSpace),
}

pub struct ScopeManager {
    names: Arc<QNameTable>,
    entries: Vec<ScopeEntry>,
    lang: Arc<str>,
    space: XmlSpace,
}

impl ScopeManager {
    pub fn new(names: Arc<QNameTable>) -> Self {
        let lang = names.empty_str();
        let mut scope = Self {
            names,
            entries: Vec::with_capacity(32),
            lang,
            space: XmlSpace::None,
        };
        scope.reset();
        scope
    }

    pub fn reset(&mut self) {
        self.entries.clear();
        // Predeclared bindings: xmlns:xml and the empty default namespace.
        self.entries.push(ScopeEntry::Namespace {
            prefix: self.names.intern("xml"),
            uri: self.names.intern(NS_XML),
        });
        self.entries.push(ScopeEntry::Namespace {
            prefix: self.names.empty_str(),
            uri: self.names.empty_str(),
        });
        // Barrier marker: pop_scope of the document element stops here,
        // leaving the predeclared bindings in place.
        self.entries.push(ScopeEntry::Element(self.names.empty()));
        self.lang = self.names.empty_str();
        self.space = XmlSpace::None;
    }

    /// Pushes the element marker. All of the element's bindings must already
    /// have been registered.
    pub fn push_scope(&mut self, qname: Arc<QName>) {
        self.entries.push(ScopeEntry::Element(qname));
    }

    /// Leaves the current element scope, restoring the lang/space values
    /// that its bindings shadowed.
    pub fn pop_scope(&mut self) {
        debug_assert!(
            matches!(self.entries.last(), Some(ScopeEntry::Element(_))),
            "pop_scope with no element marker on top"
        );
        self.entries.pop();
        while let Some(entry) = self.entries.last() {
            match entry {
                ScopeEntry::Element(_) => break,
                ScopeEntry::Namespace { .. } => {}
                ScopeEntry::PrevLang(lang) => self.lang = Arc::clone(lang),
                ScopeEntry::PrevSpace(space) => self.space = *space,
            }
            self.entries.pop();
        }
    }

    /// Registers a namespace binding for the element about to be pushed.
    /// The prefix arrives already atomized from the attribute's name.
    pub fn add_namespace(&mut self, prefix: Arc<str>, uri: &str) {
        let uri = self.names.intern(uri);
        self.entries.push(ScopeEntry::Namespace { prefix, uri });
    }

    /// Registers an `xml:lang` binding, remembering the shadowed value.
    pub fn add_lang(&mut self, lang: &str) {
        let lang = self.names.intern(lang);
        if Arc::ptr_eq(&lang, &self.lang) {
            return;
        }
        let previous = mem::replace(&mut self.lang, lang);
        self.entries.push(ScopeEntry::PrevLang(previous));
    }

    /// Registers an `xml:space` binding. Values outside
    /// {"default", "preserve"} are malformed input.
    pub fn add_space(&mut self, space: &str) -> Result<(), ReaderError> {
        let parsed = XmlSpace::parse(space)
            .ok_or_else(|| ReaderError::InvalidXmlSpace(space.to_string()))?;
        if parsed == self.space {
            return Ok(());
        }
        let previous = mem::replace(&mut self.space, parsed);
        self.entries.push(ScopeEntry::PrevSpace(previous));
        Ok(())
    }

    /// The first in-scope binding for `prefix`, scanning innermost-first.
    /// The empty prefix resolves the default namespace.
    pub fn lookup_namespace(&self, prefix: &str) -> Option<Arc<str>> {
        for entry in self.entries.iter().rev() {
            if let ScopeEntry::Namespace { prefix: bound, uri } = entry {
                if &**bound == prefix {
                    return Some(Arc::clone(uri));
                }
            }
        }
        None
    }

    /// The current element's name. Only meaningful between a `push_scope`
    /// and its matching `pop_scope`.
    pub fn name(&self) -> Option<Arc<QName>> {
        match self.entries.last() {
            Some(ScopeEntry::Element(qname)) => Some(Arc::clone(qname)),
            _ => None,
        }
    }

    pub fn lang(&self) -> &str {
        &self.lang
    }

    pub fn space(&self) -> XmlSpace {
        self.space
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn scope() -> ScopeManager {
        ScopeManager::new(Arc::new(QNameTable::new()))
    }

    #[test]
    fn predeclared_bindings_resolve() {
        let scope = scope();
        assert_eq!(scope.lookup_namespace("xml").as_deref(), Some(NS_XML));
        assert_eq!(scope.lookup_namespace(""), Some(Arc::from("")));
        assert_eq!(scope.lookup_namespace("undeclared"), None);
    }

    #[test]
    fn inner_binding_shadows_outer_and_is_restored() {
        let mut scope = scope();
        let names = Arc::clone(&scope.names);
        let outer = names.qname("outer", "", "");
        let inner = names.qname("inner", "", "");

        scope.add_namespace(names.intern("p"), "urn:outer");
        scope.push_scope(outer);
        assert_eq!(scope.lookup_namespace("p").as_deref(), Some("urn:outer"));

        scope.add_namespace(names.intern("p"), "urn:inner");
        scope.push_scope(inner);
        assert_eq!(scope.lookup_namespace("p").as_deref(), Some("urn:inner"));

        scope.pop_scope();
        assert_eq!(scope.lookup_namespace("p").as_deref(), Some("urn:outer"));
    }

    #[test]
    fn lang_and_space_round_trip_through_nesting() {
        let mut scope = scope();
        let names = Arc::clone(&scope.names);

        scope.add_lang("en");
        scope.add_space("default").unwrap();
        scope.push_scope(names.qname("outer", "", ""));
        assert_eq!(scope.lang(), "en");
        assert_eq!(scope.space(), XmlSpace::Default);

        scope.add_lang("de");
        scope.add_space("preserve").unwrap();
        scope.push_scope(names.qname("inner", "", ""));
        assert_eq!(scope.lang(), "de");
        assert_eq!(scope.space(), XmlSpace::Preserve);

        scope.pop_scope();
        assert_eq!(scope.lang(), "en");
        assert_eq!(scope.space(), XmlSpace::Default);

        scope.pop_scope();
        assert_eq!(scope.lang(), "");
        assert_eq!(scope.space(), XmlSpace::None);
    }

    #[test]
    fn redundant_lang_binding_pushes_no_entry() {
        let mut scope = scope();
        let names = Arc::clone(&scope.names);
        scope.add_lang("en");
        scope.push_scope(names.qname("outer", "", ""));
        scope.add_lang("en");
        scope.push_scope(names.qname("inner", "", ""));
        scope.pop_scope();
        // The inner scope didn't change the value, so nothing was shadowed.
        assert_eq!(scope.lang(), "en");
    }

    #[test]
    fn invalid_space_value_is_rejected() {
        let mut scope = scope();
        let err = scope.add_space("keep").unwrap_err();
        assert!(matches!(err, ReaderError::InvalidXmlSpace(v) if v == "keep"));
    }

    #[test]
    fn name_reports_the_element_marker_on_top() {
        let mut scope = scope();
        let names = Arc::clone(&scope.names);
        let qname = names.qname("root", "urn:x", "");
        scope.add_namespace(names.intern("p"), "urn:p");
        scope.push_scope(Arc::clone(&qname));
        assert!(Arc::ptr_eq(&scope.name().unwrap(), &qname));
        scope.pop_scope();
        // Back at the barrier: the empty marker.
        assert!(Arc::ptr_eq(&scope.name().unwrap(), &names.empty()));
    }
}
