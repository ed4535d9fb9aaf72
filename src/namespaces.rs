//! Vocabulary used by the catalog graph and the registered prefix table.
//!
//! Predicates are addressed by full IRI inside the store; the prefix table
//! converts between `prefix:local` names and IRIs at the API boundary.

use crate::errors::{CatalogError, Result};

pub const RDF: &str = "http://www.w3.org/1999/02/22-rdf-syntax-ns#";
pub const RDFS: &str = "http://www.w3.org/2000/01/rdf-schema#";
pub const XSD: &str = "http://www.w3.org/2001/XMLSchema#";
pub const DC: &str = "http://purl.org/dc/elements/1.1/";
pub const DCTERMS: &str = "http://purl.org/dc/terms/";
pub const DCMITYPE: &str = "http://purl.org/dc/dcmitype/";
pub const FOAF: &str = "http://xmlns.com/foaf/0.1/";
pub const PROV: &str = "http://www.w3.org/ns/prov#";
pub const DADA: &str = "http://purl.org/dada/schema/0.2#";
pub const AUSNC: &str = "http://ns.ausnc.org.au/schemas/ausnc_md_model/";
pub const OLAC: &str = "http://www.language-archives.org/OLAC/1.1/";
pub const ALVEO: &str = "http://alveo.edu.au/vocabulary/";
pub const COOEE: &str = "http://ns.ausnc.org.au/schemas/cooee/";
pub const LOCALTERMS: &str = "http://alveo.edu.au/localterms#";

/// Full IRIs of the terms the engine navigates by.
pub mod terms {
    pub const RDF_TYPE: &str = "http://www.w3.org/1999/02/22-rdf-syntax-ns#type";
    pub const RDFS_LABEL: &str = "http://www.w3.org/2000/01/rdf-schema#label";

    pub const XSD_STRING: &str = "http://www.w3.org/2001/XMLSchema#string";
    pub const XSD_INTEGER: &str = "http://www.w3.org/2001/XMLSchema#integer";
    pub const XSD_DOUBLE: &str = "http://www.w3.org/2001/XMLSchema#double";
    pub const XSD_DATE_TIME: &str = "http://www.w3.org/2001/XMLSchema#dateTime";

    pub const DCTERMS_IS_PART_OF: &str = "http://purl.org/dc/terms/isPartOf";
    pub const DCTERMS_SOURCE: &str = "http://purl.org/dc/terms/source";
    pub const DCTERMS_ALTERNATIVE: &str = "http://purl.org/dc/terms/alternative";
    pub const DCTERMS_IDENTIFIER: &str = "http://purl.org/dc/terms/identifier";
    pub const DCMITYPE_COLLECTION: &str = "http://purl.org/dc/dcmitype/Collection";
    pub const FOAF_DOCUMENT: &str = "http://xmlns.com/foaf/0.1/Document";
    pub const FOAF_NAME: &str = "http://xmlns.com/foaf/0.1/name";

    pub const AUSNC_DOCUMENT: &str = "http://ns.ausnc.org.au/schemas/ausnc_md_model/document";
    pub const ALVEO_INDEXABLE_DOCUMENT: &str = "http://alveo.edu.au/vocabulary/indexable_document";

    pub const DADA_ANNOTATION: &str = "http://purl.org/dada/schema/0.2#Annotation";
    pub const DADA_ANNOTATION_COLLECTION: &str =
        "http://purl.org/dada/schema/0.2#AnnotationCollection";
    pub const DADA_ANNOTATES: &str = "http://purl.org/dada/schema/0.2#annotates";
    pub const DADA_PART_OF: &str = "http://purl.org/dada/schema/0.2#partof";
    pub const DADA_TARGETS: &str = "http://purl.org/dada/schema/0.2#targets";
    pub const DADA_LABEL: &str = "http://purl.org/dada/schema/0.2#label";
    pub const DADA_TYPE: &str = "http://purl.org/dada/schema/0.2#type";
    pub const DADA_START: &str = "http://purl.org/dada/schema/0.2#start";
    pub const DADA_END: &str = "http://purl.org/dada/schema/0.2#end";
    pub const DADA_UTF8_REGION: &str = "http://purl.org/dada/schema/0.2#UTF8Region";
    pub const DADA_SECOND_REGION: &str = "http://purl.org/dada/schema/0.2#SecondRegion";

    pub const PROV_ACTIVITY: &str = "http://www.w3.org/ns/prov#Activity";
    pub const PROV_SOFTWARE_AGENT: &str = "http://www.w3.org/ns/prov#SoftwareAgent";
    pub const PROV_PERSON: &str = "http://www.w3.org/ns/prov#Person";
    pub const PROV_GENERATED_AT_TIME: &str = "http://www.w3.org/ns/prov#generatedAtTime";
    pub const PROV_STARTED_AT_TIME: &str = "http://www.w3.org/ns/prov#startedAtTime";
    pub const PROV_WAS_GENERATED_BY: &str = "http://www.w3.org/ns/prov#wasGeneratedBy";
    pub const PROV_WAS_ASSOCIATED_WITH: &str = "http://www.w3.org/ns/prov#wasAssociatedWith";

    pub const LOCALTERMS_ITEM_LIST: &str = "http://alveo.edu.au/localterms#itemList";
    pub const LOCALTERMS_ITEM_LIST_NAME: &str = "http://alveo.edu.au/localterms#itemListName";
    pub const LOCALTERMS_SHARED_STATUS: &str = "http://alveo.edu.au/localterms#sharedStatus";
    pub const LOCALTERMS_LAST_ANNOTATION_ID: &str = "http://alveo.edu.au/localterms#lastAnnotationId";
}

/// Ordered prefix registry used for `prefix:local` <-> IRI conversion.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct PrefixTable {
    entries: Vec<(String, String)>,
}

impl Default for PrefixTable {
    fn default() -> Self {
        let mut table = Self {
            entries: Vec::new(),
        };
        for (prefix, namespace) in [
            ("rdf", RDF),
            ("rdfs", RDFS),
            ("xsd", XSD),
            ("dc", DC),
            ("dcterms", DCTERMS),
            ("dcmitype", DCMITYPE),
            ("foaf", FOAF),
            ("prov", PROV),
            ("dada", DADA),
            ("ausnc", AUSNC),
            ("olac", OLAC),
            ("alveo", ALVEO),
            ("cooee", COOEE),
            ("localterms", LOCALTERMS),
        ] {
            table.register(prefix, namespace);
        }
        table
    }
}

impl PrefixTable {
    pub fn empty() -> Self {
        Self {
            entries: Vec::new(),
        }
    }

    /// Binds `prefix` to `namespace`, replacing an earlier binding of the same prefix.
    pub fn register(&mut self, prefix: &str, namespace: &str) {
        if let Some(entry) = self.entries.iter_mut().find(|(p, _)| p == prefix) {
            entry.1 = namespace.to_string();
        } else {
            self.entries.push((prefix.to_string(), namespace.to_string()));
        }
    }

    pub fn namespace(&self, prefix: &str) -> Option<&str> {
        self.entries
            .iter()
            .find(|(p, _)| p == prefix)
            .map(|(_, ns)| ns.as_str())
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.entries.iter().map(|(p, ns)| (p.as_str(), ns.as_str()))
    }

    /// Expands a qualified name to a full IRI.
    ///
    /// Full IRIs (`scheme://...` or `<...>`) pass through unchanged. A name with an
    /// unregistered prefix is malformed input.
    pub fn expand(&self, name: &str) -> Result<String> {
        let name = name.trim();
        if let Some(inner) = name.strip_prefix('<').and_then(|n| n.strip_suffix('>')) {
            return Ok(inner.to_string());
        }
        if name.contains("://") || name.starts_with("urn:") || name.starts_with("mailto:") {
            return Ok(name.to_string());
        }
        let Some((prefix, local)) = name.split_once(':') else {
            return Err(CatalogError::malformed(format!(
                "'{name}' is neither a qualified name nor an IRI"
            )));
        };
        self.namespace(prefix)
            .map(|ns| format!("{ns}{local}"))
            .ok_or_else(|| CatalogError::malformed(format!("unknown namespace prefix '{prefix}'")))
    }

    /// Like [`PrefixTable::expand`] but leaves names without a colon untouched.
    pub fn expand_lenient(&self, name: &str) -> Result<String> {
        if name.contains(':') {
            self.expand(name)
        } else {
            Ok(name.to_string())
        }
    }

    /// Compacts an IRI to `prefix:local` using the longest matching namespace.
    /// IRIs outside every registered namespace are returned unchanged.
    pub fn compact(&self, iri: &str) -> String {
        let best = self
            .entries
            .iter()
            .filter(|(_, ns)| iri.starts_with(ns.as_str()) && iri.len() > ns.len())
            .max_by_key(|(_, ns)| ns.len());
        match best {
            Some((prefix, ns)) => format!("{prefix}:{}", &iri[ns.len()..]),
            None => iri.to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn expand_and_compact_are_inverse_for_registered_prefixes() {
        let table = PrefixTable::default();
        let iri = table.expand("dc:created").unwrap();
        assert_eq!(iri, "http://purl.org/dc/elements/1.1/created");
        assert_eq!(table.compact(&iri), "dc:created");
    }

    #[test]
    fn unknown_prefix_is_malformed() {
        let table = PrefixTable::default();
        let err = table.expand("nope:thing").unwrap_err();
        assert!(matches!(err, CatalogError::MalformedInput(_)));
    }

    #[test]
    fn full_iris_pass_through() {
        let table = PrefixTable::default();
        assert_eq!(
            table.expand("<http://example.org/x>").unwrap(),
            "http://example.org/x"
        );
        assert_eq!(
            table.expand("http://example.org/y").unwrap(),
            "http://example.org/y"
        );
        assert_eq!(table.compact("http://example.org/y"), "http://example.org/y");
    }

    #[test]
    fn register_overrides_existing_binding() {
        let mut table = PrefixTable::default();
        table.register("cooee", "http://example.org/cooee#");
        assert_eq!(table.expand("cooee:texttype").unwrap(), "http://example.org/cooee#texttype");
    }
}
