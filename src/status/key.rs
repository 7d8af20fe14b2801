//! Status key grammar
//!
//! Keys are `<prefix><namespace>/<name>:<version>`, where the prefix is a
//! single component ending in `/` (`status/` by default). A well-formed key
//! therefore splits on `/` into exactly three parts.
//!
//! Parsing is best-effort: the store may hold foreign keys under the same
//! prefix, and those are reported as `None` rather than as errors.

use crate::constants::keys;

/// A status key split back into its parts
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParsedStatusKey<'a> {
    pub namespace: &'a str,
    /// `name:version`
    pub service_id: &'a str,
}

/// Build the key a service's status is cached under
pub fn encode_key(prefix: &str, namespace: &str, name: &str, version: &str) -> String {
    format!(
        "{prefix}{namespace}{}{name}{}{version}",
        keys::COMPONENT_SEPARATOR,
        keys::VERSION_SEPARATOR
    )
}

/// Prefix covering every status cached for `namespace`
pub fn namespace_prefix(prefix: &str, namespace: &str) -> String {
    format!("{prefix}{namespace}{}", keys::COMPONENT_SEPARATOR)
}

/// Split a key into namespace and `name:version`
///
/// Returns `None` for any key that does not split on `/` into exactly
/// three components.
pub fn parse_key(key: &str) -> Option<ParsedStatusKey<'_>> {
    let components: Vec<&str> = key.split(keys::COMPONENT_SEPARATOR).collect();
    if components.len() != keys::KEY_COMPONENTS {
        return None;
    }
    Some(ParsedStatusKey {
        namespace: components[1],
        service_id: components[2],
    })
}

/// Whether a namespace can appear in a key without breaking the grammar
pub fn is_valid_namespace(namespace: &str) -> bool {
    !namespace.is_empty() && !namespace.contains(keys::COMPONENT_SEPARATOR)
}

/// Whether a name/version pair can appear in a key without breaking the grammar
pub fn is_valid_service(name: &str, version: &str) -> bool {
    !name.contains(keys::COMPONENT_SEPARATOR)
        && !name.contains(keys::VERSION_SEPARATOR)
        && !version.contains(keys::COMPONENT_SEPARATOR)
        && !version.contains(keys::VERSION_SEPARATOR)
}
