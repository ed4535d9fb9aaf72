//! Annotation filters.
//!
//! Every supplied criterion must hold for an annotation to be returned; an
//! empty filter returns everything. `type` and `label` test the annotation
//! itself, `user` and `prior_to` test the provenance of the batch (annotation
//! collection) it belongs to.

use chrono::{DateTime, NaiveDateTime, Utc};

use crate::errors::{CatalogError, Result};
use crate::namespaces::{PrefixTable, terms};
use crate::provenance::IdentityRegistry;
use crate::store::{Term, TripleStore};

#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct AnnotationFilter {
    /// Qualified name or IRI of the annotation type.
    pub annotation_type: Option<String>,
    pub label: Option<String>,
    /// Identifier handed to the identity registry, e.g. an email address.
    pub user: Option<String>,
    /// Only batches generated strictly before this instant.
    pub prior_to: Option<DateTime<Utc>>,
}

impl AnnotationFilter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_type(mut self, annotation_type: impl Into<String>) -> Self {
        self.annotation_type = Some(annotation_type.into());
        self
    }

    pub fn with_label(mut self, label: impl Into<String>) -> Self {
        self.label = Some(label.into());
        self
    }

    pub fn by_user(mut self, user: impl Into<String>) -> Self {
        self.user = Some(user.into());
        self
    }

    pub fn prior_to(mut self, instant: DateTime<Utc>) -> Self {
        self.prior_to = Some(instant);
        self
    }

    pub fn is_empty(&self) -> bool {
        self.annotation_type.is_none()
            && self.label.is_none()
            && self.user.is_none()
            && self.prior_to.is_none()
    }

    /// Builds a filter from request parameters: `type`, `label`, `user` and
    /// `priorTo` (RFC 3339, or a naive `YYYY-MM-DDTHH:MM:SS` read as UTC).
    pub fn from_params<'p, I>(params: I) -> Result<Self>
    where
        I: IntoIterator<Item = (&'p str, &'p str)>,
    {
        let mut filter = Self::new();
        for (key, value) in params {
            match key {
                "type" => filter.annotation_type = Some(value.to_string()),
                "label" => filter.label = Some(value.to_string()),
                "user" => filter.user = Some(value.to_string()),
                "priorTo" | "prior_to" => {
                    let instant = parse_timestamp(value).ok_or_else(|| {
                        CatalogError::malformed(format!("priorTo: '{value}' is not a timestamp"))
                    })?;
                    filter.prior_to = Some(instant);
                }
                other => {
                    return Err(CatalogError::malformed(format!(
                        "unknown annotation filter '{other}'"
                    )));
                }
            }
        }
        Ok(filter)
    }

    /// Resolves names against the prefix table and the registry once per query.
    pub(crate) fn compile(
        &self,
        prefixes: &PrefixTable,
        registry: &dyn IdentityRegistry,
    ) -> Result<CompiledFilter> {
        let annotation_type = match &self.annotation_type {
            Some(name) => Some(prefixes.expand_lenient(name)?),
            None => None,
        };
        let user_id = match &self.user {
            Some(user) => Some(registry.lookup_user(user)?.id),
            None => None,
        };
        Ok(CompiledFilter {
            annotation_type,
            label: self.label.clone(),
            user_id,
            prior_to: self.prior_to,
        })
    }
}

#[derive(Clone, Debug)]
pub(crate) struct CompiledFilter {
    annotation_type: Option<String>,
    label: Option<String>,
    user_id: Option<String>,
    prior_to: Option<DateTime<Utc>>,
}

impl CompiledFilter {
    pub(crate) fn needs_provenance(&self) -> bool {
        self.user_id.is_some() || self.prior_to.is_some()
    }

    pub(crate) fn accepts_batch(&self, provenance: &BatchProvenance) -> bool {
        let user_ok = self
            .user_id
            .as_ref()
            .is_none_or(|id| provenance.agents.iter().any(|agent| agent == id));
        let time_ok = self.prior_to.is_none_or(|threshold| {
            provenance
                .generated_at
                .is_some_and(|generated| generated < threshold)
        });
        user_ok && time_ok
    }

    pub(crate) fn accepts(&self, annotation_type: &str, label: Option<&str>) -> bool {
        self.annotation_type
            .as_deref()
            .is_none_or(|wanted| wanted == annotation_type)
            && self
                .label
                .as_deref()
                .is_none_or(|wanted| Some(wanted) == label)
    }
}

/// Generation time and associated agents of one annotation collection.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct BatchProvenance {
    pub generated_at: Option<DateTime<Utc>>,
    pub agents: Vec<String>,
}

impl BatchProvenance {
    /// Follows `prov:wasGeneratedBy` to the activity and collects every agent
    /// associated with it. The timestamp comes from the collection, falling
    /// back to the activity's start time.
    pub fn lookup<S: TripleStore + ?Sized>(store: &S, collection: &Term) -> Result<Self> {
        let mut provenance = BatchProvenance {
            generated_at: store
                .value(collection, terms::PROV_GENERATED_AT_TIME)?
                .and_then(|t| parse_timestamp(t.value())),
            agents: Vec::new(),
        };
        for activity in store.objects(collection, terms::PROV_WAS_GENERATED_BY)? {
            if matches!(activity, Term::Literal(_)) {
                continue;
            }
            if provenance.generated_at.is_none() {
                provenance.generated_at = store
                    .value(&activity, terms::PROV_STARTED_AT_TIME)?
                    .and_then(|t| parse_timestamp(t.value()));
            }
            for agent in store.objects(&activity, terms::PROV_WAS_ASSOCIATED_WITH)? {
                provenance.agents.push(agent.to_plain_string());
            }
        }
        Ok(provenance)
    }
}

pub(crate) fn parse_timestamp(text: &str) -> Option<DateTime<Utc>> {
    let text = text.trim();
    if let Ok(instant) = DateTime::parse_from_rfc3339(text) {
        return Some(instant.with_timezone(&Utc));
    }
    NaiveDateTime::parse_from_str(text, "%Y-%m-%dT%H:%M:%S")
        .ok()
        .map(|naive| naive.and_utc())
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn params_build_composed_filter() {
        let filter = AnnotationFilter::from_params([
            ("type", "cooee:pageno"),
            ("label", "1"),
            ("priorTo", "2013-12-20T12:20:00"),
        ])
        .unwrap();
        assert_eq!(filter.annotation_type.as_deref(), Some("cooee:pageno"));
        assert_eq!(filter.label.as_deref(), Some("1"));
        assert_eq!(
            filter.prior_to,
            Some(Utc.with_ymd_and_hms(2013, 12, 20, 12, 20, 0).unwrap())
        );
    }

    #[test]
    fn unknown_param_and_bad_timestamp_are_malformed() {
        assert!(matches!(
            AnnotationFilter::from_params([("colour", "red")]).unwrap_err(),
            CatalogError::MalformedInput(_)
        ));
        assert!(matches!(
            AnnotationFilter::from_params([("priorTo", "yesterday")]).unwrap_err(),
            CatalogError::MalformedInput(_)
        ));
    }

    #[test]
    fn timestamps_with_offset_normalize_to_utc() {
        assert_eq!(
            parse_timestamp("2013-12-20T22:20:00+10:00"),
            Some(Utc.with_ymd_and_hms(2013, 12, 20, 12, 20, 0).unwrap())
        );
        assert_eq!(parse_timestamp("not a date"), None);
    }

    #[test]
    fn batch_checks_require_provenance() {
        let compiled = CompiledFilter {
            annotation_type: None,
            label: None,
            user_id: Some("http://x/users/a".into()),
            prior_to: Some(Utc.with_ymd_and_hms(2014, 1, 1, 0, 0, 0).unwrap()),
        };
        let mut provenance = BatchProvenance {
            generated_at: Some(Utc.with_ymd_and_hms(2013, 6, 1, 0, 0, 0).unwrap()),
            agents: vec!["http://x/users/a".into()],
        };
        assert!(compiled.accepts_batch(&provenance));
        provenance.generated_at = None;
        assert!(!compiled.accepts_batch(&provenance));
    }
}
