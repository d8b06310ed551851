//! Tag weight resolution.
//!
//! Tags encode their weight as `<label>-<integer>`, e.g. `weight-3` or
//! `tag:weight-3`. Anything unparsable resolves to [`DEFAULT_WEIGHT`] so a
//! misconfigured tag still receives traffic.

/// Weight used when a tag carries no usable weight.
pub const DEFAULT_WEIGHT: u32 = 1;

/// Resolve the locality weight encoded in `tag`.
pub fn resolve_weight(tag: &str) -> u32 {
    let Some(suffix) = tag.split('-').nth(1) else {
        tracing::debug!(tag = %tag, "Tag has no weight suffix, using default weight");
        return DEFAULT_WEIGHT;
    };

    match suffix.parse::<u32>() {
        Ok(weight) if weight >= 1 => weight,
        _ => {
            tracing::debug!(tag = %tag, suffix = %suffix, "Unusable tag weight, using default weight");
            DEFAULT_WEIGHT
        }
    }
}
