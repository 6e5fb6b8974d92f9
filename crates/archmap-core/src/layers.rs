//! Layer (protocol) visibility filtering.
//!
//! A connection is visible iff every tag it carries is active. A hover preview temporarily
//! overrides that rule without touching the persistent active set.

use crate::model::{Connection, Layer};
use indexmap::IndexSet;
use rustc_hash::FxHashSet;

#[derive(Debug, Clone, PartialEq)]
pub struct LayerFilter {
    universe: IndexSet<String>,
    active: FxHashSet<String>,
    preview: Option<String>,
}

impl LayerFilter {
    /// Builds the filter from declared layers, honoring each layer's initial `active` flag.
    pub fn new(layers: &[Layer]) -> Self {
        let universe: IndexSet<String> = layers.iter().map(|l| l.id.clone()).collect();
        let active = layers
            .iter()
            .filter(|l| l.active)
            .map(|l| l.id.clone())
            .collect();
        Self {
            universe,
            active,
            preview: None,
        }
    }

    pub fn is_declared(&self, id: &str) -> bool {
        self.universe.contains(id)
    }

    pub fn is_active(&self, id: &str) -> bool {
        self.active.contains(id)
    }

    /// Active layer ids in declaration order.
    pub fn active_layers(&self) -> impl Iterator<Item = &str> {
        self.universe
            .iter()
            .filter(|id| self.active.contains(id.as_str()))
            .map(String::as_str)
    }

    /// Flips membership of `id`. Returns the new state, or `None` for undeclared ids.
    pub fn toggle(&mut self, id: &str) -> Option<bool> {
        if !self.is_declared(id) {
            tracing::debug!(layer = %id, "toggle of undeclared layer ignored");
            return None;
        }
        if self.active.remove(id) {
            Some(false)
        } else {
            self.active.insert(id.to_string());
            Some(true)
        }
    }

    /// Sets membership explicitly. Returns `None` for undeclared ids.
    pub fn set_active(&mut self, id: &str, on: bool) -> Option<bool> {
        if !self.is_declared(id) {
            return None;
        }
        if on {
            self.active.insert(id.to_string());
        } else {
            self.active.remove(id);
        }
        Some(on)
    }

    pub fn reset_all(&mut self) {
        self.active = self.universe.iter().cloned().collect();
    }

    pub fn preview(&self) -> Option<&str> {
        self.preview.as_deref()
    }

    /// Force-shows only connections carrying `tag` until [`LayerFilter::clear_preview`].
    pub fn set_preview(&mut self, tag: &str) {
        self.preview = Some(tag.to_string());
    }

    pub fn clear_preview(&mut self) {
        self.preview = None;
    }

    /// Persistent rule only: every tag must be active.
    pub fn passes(&self, conn: &Connection) -> bool {
        conn.tags().all(|t| self.active.contains(t))
    }

    pub fn is_visible(&self, conn: &Connection) -> bool {
        match self.preview.as_deref() {
            Some(tag) => conn.has_tag(tag),
            None => self.passes(conn),
        }
    }

    /// Visibility of every connection, indexed like `connections`.
    pub fn evaluate(&self, connections: &[Connection]) -> Vec<bool> {
        connections.iter().map(|c| self.is_visible(c)).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn layer(id: &str, active: bool) -> Layer {
        Layer {
            id: id.to_string(),
            label: id.to_uppercase(),
            color: "#000".to_string(),
            active,
            group: None,
        }
    }

    fn conn(layer: &str, wan: bool) -> Connection {
        Connection {
            index: 0,
            from: "a".to_string(),
            to: "b".to_string(),
            layer: layer.to_string(),
            wan,
            curve: None,
            color: None,
            dash: false,
            label: String::new(),
            detail: String::new(),
        }
    }

    #[test]
    fn wan_connection_needs_both_tags() {
        let mut f = LayerFilter::new(&[layer("sip", true), layer("wan", false)]);
        let c = conn("sip", true);
        assert!(!f.is_visible(&c));
        assert_eq!(f.toggle("wan"), Some(true));
        assert!(f.is_visible(&c));
        assert_eq!(f.toggle("sip"), Some(false));
        assert!(!f.is_visible(&c));
    }

    #[test]
    fn toggle_is_an_involution() {
        let mut f = LayerFilter::new(&[layer("sip", true)]);
        let before = f.clone();
        f.toggle("sip");
        f.toggle("sip");
        assert_eq!(f, before);
    }

    #[test]
    fn undeclared_layers_are_never_activated() {
        let mut f = LayerFilter::new(&[layer("sip", true)]);
        assert_eq!(f.toggle("ghost"), None);
        assert!(!f.is_active("ghost"));
        assert!(!f.is_visible(&conn("ghost", false)));
    }

    #[test]
    fn reset_activates_everything() {
        let mut f = LayerFilter::new(&[layer("sip", false), layer("rtp", false)]);
        f.reset_all();
        let active: Vec<&str> = f.active_layers().collect();
        assert_eq!(active, vec!["sip", "rtp"]);
    }

    #[test]
    fn preview_overrides_without_mutating_active_set() {
        let mut f = LayerFilter::new(&[layer("sip", false), layer("rtp", true), layer("wan", true)]);
        let sip = conn("sip", false);
        let rtp = conn("rtp", true);
        f.set_preview("sip");
        assert!(f.is_visible(&sip));
        assert!(!f.is_visible(&rtp));
        f.set_preview("wan");
        assert!(!f.is_visible(&sip));
        assert!(f.is_visible(&rtp));
        f.clear_preview();
        assert!(!f.is_visible(&sip));
        assert!(f.is_visible(&rtp));
        assert!(!f.is_active("sip"));
    }
}
