//! Collision-safe names for links, joints and mesh files

use std::collections::HashMap;

use crate::design::EntityToken;

/// Name of the grounded link
pub const BASE_LINK: &str = "base_link";
/// Massless root frame prepended to every description
pub const DUMMY_LINK: &str = "dummy_link";
/// Fixed joint between the root frame and the grounded link
pub const DUMMY_JOINT: &str = "dummy_link_joint";

/// Spell out German umlauts and sharp s
pub fn transliterate(name: &str) -> String {
    let mut out = String::with_capacity(name.len());
    for c in name.chars() {
        match c {
            'ä' => out.push_str("ae"),
            'ö' => out.push_str("oe"),
            'ü' => out.push_str("ue"),
            'Ä' => out.push_str("Ae"),
            'Ö' => out.push_str("Oe"),
            'Ü' => out.push_str("Ue"),
            'ß' => out.push_str("ss"),
            _ => out.push(c),
        }
    }
    out
}

/// Make a name identifier-safe: ASCII alphanumerics and `_` only
pub fn format_name(name: &str) -> String {
    let formatted: String = transliterate(name.trim())
        .chars()
        .map(|c| if c.is_ascii_alphanumeric() || c == '_' { c } else { '_' })
        .collect();
    if formatted.is_empty() {
        "unnamed".to_string()
    } else {
        formatted
    }
}

/// `candidate` if `taken` rejects it, else `candidate_N` for the first
/// unused N starting at 1
pub fn unique_name(candidate: &str, taken: impl Fn(&str) -> bool) -> String {
    if !taken(candidate) {
        return candidate.to_string();
    }
    (1..)
        .map(|n| format!("{candidate}_{n}"))
        .find(|name| !taken(name))
        .unwrap_or_else(|| candidate.to_string())
}

/// Bidirectional token <-> name table
#[derive(Debug, Clone, Default)]
pub struct NameRegistry {
    by_token: HashMap<EntityToken, String>,
    /// Reverse map; `None` for reserved and token-less names
    by_name: HashMap<String, Option<EntityToken>>,
    name_map: HashMap<String, String>,
}

impl NameRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registry with names that can never be handed out
    pub fn with_reserved(reserved: &[&str]) -> Self {
        let mut registry = Self::default();
        for name in reserved {
            registry.by_name.insert(name.to_string(), None);
        }
        registry
    }

    /// Remap display names before they are formatted
    pub fn with_name_map(mut self, name_map: HashMap<String, String>) -> Self {
        self.name_map = name_map;
        self
    }

    /// Name for an entity, derived from its display name on first sight
    pub fn resolve(&mut self, token: &EntityToken, display_name: &str) -> String {
        if let Some(name) = self.by_token.get(token) {
            return name.clone();
        }
        let display_name = self
            .name_map
            .get(display_name)
            .map(String::as_str)
            .unwrap_or(display_name);
        let name = unique_name(&format_name(display_name), |n| self.by_name.contains_key(n));
        self.insert(token, name.clone());
        name
    }

    /// Bind an entity to an exact name, taking it over if it was reserved
    pub fn assign(&mut self, token: &EntityToken, name: &str) {
        if let Some(old) = self.by_token.remove(token) {
            self.by_name.remove(&old);
        }
        self.insert(token, name.to_string());
    }

    fn insert(&mut self, token: &EntityToken, name: String) {
        self.by_name.insert(name.clone(), Some(token.clone()));
        self.by_token.insert(token.clone(), name);
    }

    /// Take a unique name that has no entity behind it
    pub fn claim(&mut self, candidate: &str) -> String {
        let name = unique_name(&format_name(candidate), |n| self.by_name.contains_key(n));
        self.by_name.insert(name.clone(), None);
        name
    }

    pub fn contains_name(&self, name: &str) -> bool {
        self.by_name.contains_key(name)
    }
}

/// Mesh file names: `{link}_{body}_{n}` with a running counter per body
/// name, unique across the run
#[derive(Debug, Clone, Default)]
pub struct MeshNames {
    registry: NameRegistry,
    counts: HashMap<String, usize>,
}

impl MeshNames {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn next(&mut self, link: &str, body: &str) -> String {
        let body = format_name(body);
        let count = self.counts.entry(body.clone()).or_insert(0);
        let candidate = format!("{link}_{body}_{count}");
        *count += 1;
        self.registry.claim(&candidate)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_format_name() {
        assert_eq!(format_name("arm:1"), "arm_1");
        assert_eq!(format_name("Motor Mount (v2)"), "Motor_Mount__v2_");
        assert_eq!(format_name("Gehäuse"), "Gehaeuse");
        assert_eq!(format_name("Straße"), "Strasse");
        assert_eq!(format_name("日本"), "__");
        assert_eq!(format_name(""), "unnamed");
    }

    #[test]
    fn test_transliterate_upper_case() {
        assert_eq!(transliterate("ÄÖÜ"), "AeOeUe");
    }

    #[test]
    fn test_resolve_is_idempotent() {
        let mut registry = NameRegistry::new();
        let token = EntityToken::from("t1");
        let first = registry.resolve(&token, "arm:1");
        let second = registry.resolve(&token, "renamed:1");
        assert_eq!(first, "arm_1");
        assert_eq!(first, second);
    }

    #[test]
    fn test_collision_gets_first_unused_suffix() {
        let mut registry = NameRegistry::new();
        let a = registry.resolve(&EntityToken::from("a"), "part");
        let b = registry.resolve(&EntityToken::from("b"), "part");
        let c = registry.resolve(&EntityToken::from("c"), "part");
        let d = registry.resolve(&EntityToken::from("d"), "part_1");
        assert_eq!(a, "part");
        assert_eq!(b, "part_1");
        assert_eq!(c, "part_2");
        assert_eq!(d, "part_1_1");
        assert_eq!(registry.resolve(&EntityToken::from("c"), "other"), "part_2");
    }

    #[test]
    fn test_reserved_names() {
        let mut registry = NameRegistry::with_reserved(&[BASE_LINK, DUMMY_LINK]);
        let name = registry.resolve(&EntityToken::from("x"), "base_link");
        assert_eq!(name, "base_link_1");

        let ground = EntityToken::from("g");
        registry.assign(&ground, BASE_LINK);
        assert_eq!(registry.resolve(&ground, "ground:1"), BASE_LINK);
    }

    #[test]
    fn test_name_map_applies_before_formatting() {
        let map = HashMap::from([("arm:1".to_string(), "upper arm".to_string())]);
        let mut registry = NameRegistry::new().with_name_map(map);
        assert_eq!(registry.resolve(&EntityToken::from("a"), "arm:1"), "upper_arm");
        assert_eq!(registry.resolve(&EntityToken::from("b"), "arm:2"), "arm_2");
    }

    #[test]
    fn test_claim_without_token() {
        let mut registry = NameRegistry::new();
        assert_eq!(registry.claim("Rigid 1"), "Rigid_1");
        assert_eq!(registry.claim("Rigid 1"), "Rigid_1_1");
        assert!(registry.contains_name("Rigid_1"));
    }

    #[test]
    fn test_mesh_names_count_per_body_name() {
        let mut meshes = MeshNames::new();
        assert_eq!(meshes.next("arm_1", "Body1"), "arm_1_Body1_0");
        assert_eq!(meshes.next("arm_2", "Body1"), "arm_2_Body1_1");
        assert_eq!(meshes.next("arm_1", "Body2"), "arm_1_Body2_0");
        assert_eq!(meshes.next("arm_1", "Body1"), "arm_1_Body1_2");
    }

    #[test]
    fn test_mesh_names_never_collide() {
        let mut meshes = MeshNames::new();
        let a = meshes.next("a_b", "c");
        let b = meshes.next("a", "b_c");
        assert_eq!(a, "a_b_c_0");
        assert_eq!(b, "a_b_c_0_1");
    }
}
