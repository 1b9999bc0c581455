use scraper::{ElementRef, Html, Selector};
use std::collections::{BTreeMap, BTreeSet};

/// Default similarity cutoff for the adaptive fallback.
pub const SIMILARITY_THRESHOLD: f64 = 0.7;

/// Find elements structurally similar to a reference element.
///
/// Candidates share the reference's tag name and are scored on class
/// overlap, attribute names, parent tag, tree depth, and the shape of their
/// direct children. Elements scoring at or above `threshold` are returned in
/// document order. The reference scores 1.0 against itself, so it is part of
/// the returned set.
pub fn find_similar<'a>(
    document: &'a Html,
    reference: ElementRef<'a>,
    threshold: f64,
) -> Vec<ElementRef<'a>> {
    let target = Fingerprint::of(&reference);

    let Ok(any_element) = Selector::parse("*") else {
        return Vec::new();
    };

    document
        .select(&any_element)
        .filter(|el| el.value().name() == target.tag)
        .filter(|el| target.similarity(&Fingerprint::of(el)) >= threshold)
        .collect()
}

/// Structural features of one element, cheap to compare.
#[derive(Debug, Clone, PartialEq, Eq)]
struct Fingerprint {
    tag: String,
    classes: BTreeSet<String>,
    attr_names: BTreeSet<String>,
    parent_tag: Option<String>,
    depth: usize,
    child_tags: BTreeMap<String, usize>,
}

impl Fingerprint {
    fn of(element: &ElementRef<'_>) -> Self {
        let value = element.value();

        let mut child_tags = BTreeMap::new();
        for child in element.children().filter_map(|c| c.value().as_element()) {
            *child_tags.entry(child.name().to_string()).or_insert(0) += 1;
        }

        Self {
            tag: value.name().to_string(),
            classes: value.classes().map(str::to_string).collect(),
            attr_names: value.attrs().map(|(name, _)| name.to_string()).collect(),
            parent_tag: element
                .parent()
                .and_then(|p| p.value().as_element())
                .map(|e| e.name().to_string()),
            depth: element.ancestors().count(),
            child_tags,
        }
    }

    /// Weighted score in [0, 1]. Tag mismatch is an immediate zero; the
    /// remaining features contribute their weight scaled by overlap.
    fn similarity(&self, other: &Fingerprint) -> f64 {
        if self.tag != other.tag {
            return 0.0;
        }

        let mut score = 0.0;
        score += 0.35 * jaccard(&self.classes, &other.classes);
        score += 0.15 * jaccard(&self.attr_names, &other.attr_names);
        score += 0.25 * count_overlap(&self.child_tags, &other.child_tags);
        if self.parent_tag == other.parent_tag {
            score += 0.15;
        }
        let depth_gap = self.depth.abs_diff(other.depth).min(4);
        score += 0.10 * (1.0 - depth_gap as f64 / 4.0);
        score
    }
}

fn jaccard(a: &BTreeSet<String>, b: &BTreeSet<String>) -> f64 {
    if a.is_empty() && b.is_empty() {
        return 1.0;
    }
    let intersection = a.intersection(b).count() as f64;
    let union = a.union(b).count() as f64;
    intersection / union
}

/// Jaccard over multisets: sum of per-key min counts over sum of max counts.
fn count_overlap(a: &BTreeMap<String, usize>, b: &BTreeMap<String, usize>) -> f64 {
    if a.is_empty() && b.is_empty() {
        return 1.0;
    }
    let keys: BTreeSet<&String> = a.keys().chain(b.keys()).collect();
    let mut intersection = 0usize;
    let mut union = 0usize;
    for key in keys {
        let in_a = a.get(key).copied().unwrap_or(0);
        let in_b = b.get(key).copied().unwrap_or(0);
        intersection += in_a.min(in_b);
        union += in_a.max(in_b);
    }
    intersection as f64 / union as f64
}
