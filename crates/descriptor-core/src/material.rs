//! Appearance to material color mapping

use crate::design::{Appearance, Color, Occurrence};
use crate::naming::format_name;

/// Material used when no appearance resolves
pub const DEFAULT_MATERIAL: &str = "silver_default";
const DEFAULT_RGBA: &str = "0.700 0.700 0.700 1.000";

/// Ordered material name -> "r g b a" table
#[derive(Debug, Clone, PartialEq)]
pub struct ColorTable {
    entries: Vec<(String, String)>,
}

impl Default for ColorTable {
    fn default() -> Self {
        Self {
            entries: vec![(DEFAULT_MATERIAL.to_string(), DEFAULT_RGBA.to_string())],
        }
    }
}

impl ColorTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a color under a name; a repeated name keeps its position and
    /// takes the latest value
    pub fn insert(&mut self, name: &str, rgba: String) {
        match self.entries.iter_mut().find(|(n, _)| n == name) {
            Some(entry) => entry.1 = rgba,
            None => self.entries.push((name.to_string(), rgba)),
        }
    }

    pub fn get(&self, name: &str) -> Option<&str> {
        self.entries
            .iter()
            .find(|(n, _)| n == name)
            .map(|(_, rgba)| rgba.as_str())
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.entries.iter().map(|(n, c)| (n.as_str(), c.as_str()))
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Resolve the material of an occurrence, registering its color.
    /// Returns the material name.
    pub fn resolve(&mut self, occurrence: &Occurrence) -> String {
        match resolve_appearance(occurrence) {
            Some((appearance, color)) => {
                let name = format_name(&appearance.name);
                self.insert(&name, rgba(&color));
                name
            }
            None => DEFAULT_MATERIAL.to_string(),
        }
    }
}

/// First appearance with a color: the occurrence's own, then its first
/// body with one, then its component material
pub fn resolve_appearance(occurrence: &Occurrence) -> Option<(&Appearance, Color)> {
    with_color(&occurrence.appearance)
        .or_else(|| {
            occurrence
                .bodies
                .iter()
                .find(|b| b.appearance.is_some())
                .and_then(|b| with_color(&b.appearance))
        })
        .or_else(|| {
            occurrence
                .material
                .as_ref()
                .and_then(|m| with_color(&m.appearance))
        })
}

fn with_color(appearance: &Option<Appearance>) -> Option<(&Appearance, Color)> {
    appearance
        .as_ref()
        .and_then(|a| a.color.map(|color| (a, color)))
}

/// Color as "r g b a", channels in [0, 1]
pub fn rgba(color: &Color) -> String {
    format!(
        "{:.3} {:.3} {:.3} {:.3}",
        color.red as f64 / 255.0,
        color.green as f64 / 255.0,
        color.blue as f64 / 255.0,
        color.opacity as f64 / 255.0
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::design::{Body, Material};

    fn appearance(name: &str, color: Option<Color>) -> Appearance {
        Appearance {
            name: name.to_string(),
            color,
        }
    }

    #[test]
    fn test_default_entry_present() {
        let table = ColorTable::new();
        assert_eq!(table.get(DEFAULT_MATERIAL), Some("0.700 0.700 0.700 1.000"));
        assert_eq!(table.len(), 1);
    }

    #[test]
    fn test_rgba_channels() {
        assert_eq!(rgba(&Color::new(255, 0, 51, 255)), "1.000 0.000 0.200 1.000");
    }

    #[test]
    fn test_own_appearance_wins() {
        let mut body = Body::new("b", 1.0);
        body.appearance = Some(appearance("Blue", Some(Color::new(0, 0, 255, 255))));
        let occ = Occurrence::new("o", "o:1")
            .with_appearance(appearance("Red", Some(Color::new(255, 0, 0, 255))))
            .with_body(body);
        let mut table = ColorTable::new();
        assert_eq!(table.resolve(&occ), "Red");
        assert_eq!(table.get("Red"), Some("1.000 0.000 0.000 1.000"));
    }

    #[test]
    fn test_body_then_material() {
        let mut body = Body::new("b", 1.0);
        body.appearance = Some(appearance("Stahl gebürstet", Some(Color::new(128, 128, 128, 255))));
        let occ = Occurrence::new("o", "o:1")
            .with_body(Body::new("plain", 1.0))
            .with_body(body);
        let mut table = ColorTable::new();
        assert_eq!(table.resolve(&occ), "Stahl_gebuerstet");

        let mut occ = Occurrence::new("p", "p:1").with_body(Body::new("plain", 1.0));
        occ.material = Some(Material {
            name: "Aluminum".to_string(),
            appearance: Some(appearance("Aluminum - Satin", Some(Color::new(200, 200, 200, 255)))),
        });
        assert_eq!(table.resolve(&occ), "Aluminum___Satin");
        assert_eq!(table.len(), 3);
    }

    #[test]
    fn test_colorless_appearance_falls_through() {
        let mut occ = Occurrence::new("o", "o:1")
            .with_appearance(appearance("Glass", None));
        occ.material = Some(Material {
            name: "Steel".to_string(),
            appearance: Some(appearance("Steel", Some(Color::new(10, 10, 10, 255)))),
        });
        let mut table = ColorTable::new();
        assert_eq!(table.resolve(&occ), "Steel");
    }

    #[test]
    fn test_no_appearance_uses_default() {
        let occ = Occurrence::new("o", "o:1");
        let mut table = ColorTable::new();
        assert_eq!(table.resolve(&occ), DEFAULT_MATERIAL);
        assert_eq!(table.len(), 1);
    }

    #[test]
    fn test_duplicate_name_last_write_wins() {
        let mut table = ColorTable::new();
        table.insert("Paint", "0.000 0.000 0.000 1.000".to_string());
        table.insert("Paint", "1.000 1.000 1.000 1.000".to_string());
        assert_eq!(table.len(), 2);
        assert_eq!(table.get("Paint"), Some("1.000 1.000 1.000 1.000"));
    }
}
