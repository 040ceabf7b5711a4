//! Permission catalog and permission-name helpers
//!
//! Permission names are dot-namespaced (`document.edit`). Three derived forms
//! take part in evaluation:
//!
//! - the `.others` variant (`document.edit.others`) required by non-owners,
//! - the namespaced wildcard (`document.*`, `document.*.others`),
//! - the global wildcard `*`.

use crate::error::Result;
use crate::types::Permission;
use async_trait::async_trait;

/// Global wildcard permission name
pub const GLOBAL_WILDCARD: &str = "*";

/// Suffix marking a permission on resources the caller does not own
pub const OTHERS_SUFFIX: &str = ".others";

/// Lookup of permissions by name
#[async_trait]
pub trait PermissionCatalog: Send + Sync {
    /// Resolve a permission name to its record
    async fn find_by_name(&self, name: &str) -> Result<Option<Permission>>;
}

/// `document.edit` -> `document.edit.others`
pub fn others_variant(name: &str) -> String {
    format!("{}{}", name, OTHERS_SUFFIX)
}

/// Whether the name carries the `.others` suffix
pub fn is_others(name: &str) -> bool {
    name.len() > OTHERS_SUFFIX.len() && name.ends_with(OTHERS_SUFFIX)
}

/// Whether the name is the global wildcard or ends in a wildcard segment
pub fn is_wildcard(name: &str) -> bool {
    let base = name.strip_suffix(OTHERS_SUFFIX).unwrap_or(name);
    base == GLOBAL_WILDCARD || base.ends_with(".*")
}

/// Namespaced wildcard form of a concrete permission name
///
/// The last concrete segment is replaced by `*`, keeping a trailing
/// `.others` suffix in place:
///
/// ```
/// use warden_authz::permission::wildcard_form;
///
/// assert_eq!(wildcard_form("document.edit").as_deref(), Some("document.*"));
/// assert_eq!(wildcard_form("document.edit.others").as_deref(), Some("document.*.others"));
/// assert_eq!(wildcard_form("document"), None);
/// ```
pub fn wildcard_form(name: &str) -> Option<String> {
    if name == GLOBAL_WILDCARD {
        return None;
    }

    let (base, suffix) = match name.strip_suffix(OTHERS_SUFFIX) {
        Some(base) if !base.is_empty() => (base, OTHERS_SUFFIX),
        _ => (name, ""),
    };

    let (namespace, leaf) = base.rsplit_once('.')?;
    if namespace.is_empty() || leaf == "*" {
        return None;
    }

    Some(format!("{}.*{}", namespace, suffix))
}

/// Names tried, in order, when resolving role grants for `name`
///
/// `[name, namespaced wildcard, "*"]` without duplicates.
pub fn fallback_chain(name: &str) -> Vec<String> {
    let mut chain = vec![name.to_string()];

    if let Some(wildcard) = wildcard_form(name) {
        chain.push(wildcard);
    }

    if name != GLOBAL_WILDCARD {
        chain.push(GLOBAL_WILDCARD.to_string());
    }

    chain
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn test_others_variant() {
        assert_eq!(others_variant("doc.edit"), "doc.edit.others");
        assert!(is_others("doc.edit.others"));
        assert!(!is_others("doc.edit"));
        assert!(!is_others(".others"));
    }

    #[test]
    fn test_wildcard_detection() {
        assert!(is_wildcard("*"));
        assert!(is_wildcard("doc.*"));
        assert!(is_wildcard("doc.*.others"));
        assert!(!is_wildcard("doc.edit"));
        assert!(!is_wildcard("doc.edit.others"));
    }

    #[test]
    fn test_wildcard_form() {
        assert_eq!(wildcard_form("doc.edit").as_deref(), Some("doc.*"));
        assert_eq!(wildcard_form("doc.edit.others").as_deref(), Some("doc.*.others"));
        assert_eq!(wildcard_form("org.doc.edit").as_deref(), Some("org.doc.*"));
        assert_eq!(wildcard_form("doc"), None);
        assert_eq!(wildcard_form("doc.*"), None);
        assert_eq!(wildcard_form("doc.*.others"), None);
        assert_eq!(wildcard_form("*"), None);
    }

    #[test]
    fn test_fallback_chain() {
        assert_eq!(fallback_chain("doc.edit"), vec!["doc.edit", "doc.*", "*"]);
        assert_eq!(
            fallback_chain("doc.edit.others"),
            vec!["doc.edit.others", "doc.*.others", "*"]
        );
        assert_eq!(fallback_chain("doc"), vec!["doc", "*"]);
        assert_eq!(fallback_chain("doc.*"), vec!["doc.*", "*"]);
        assert_eq!(fallback_chain("*"), vec!["*"]);
    }

    proptest! {
        #[test]
        fn prop_fallback_chain_shape(
            segments in prop::collection::vec("[a-z]{1,8}", 1..4),
            others in any::<bool>(),
        ) {
            let mut name = segments.join(".");
            if others {
                name = others_variant(&name);
            }

            let chain = fallback_chain(&name);

            prop_assert_eq!(&chain[0], &name);
            prop_assert_eq!(chain.last().map(String::as_str), Some(GLOBAL_WILDCARD));
            prop_assert!(chain.len() <= 3);

            let mut deduped = chain.clone();
            deduped.dedup();
            prop_assert_eq!(deduped.len(), chain.len());

            if chain.len() == 3 {
                prop_assert!(is_wildcard(&chain[1]));
                prop_assert_eq!(is_others(&chain[1]), is_others(&name));
            }
        }
    }
}
