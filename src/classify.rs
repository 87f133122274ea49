use crate::models::{Classification, ImageReference, ResolvedTarget, SkipReason, TargetKind};

/// Literal, case-sensitive prefix; `https` and `http:` both match, `HTTP` does not.
const REMOTE_PREFIX: &str = "http";

pub fn is_remote(raw_target: &str) -> bool {
    raw_target.starts_with(REMOTE_PREFIX)
}

pub fn is_missing_alt_text(reference: &ImageReference) -> bool {
    reference.raw_alt_text.trim().is_empty()
}

/// Remote targets are never resolved. Local targets are `base_path` and
/// `raw_target` concatenated as strings: no separator handling, no `./` or
/// `../` normalisation, no existence check.
pub fn resolve_target(raw_target: &str, base_path: &str) -> ResolvedTarget {
    if is_remote(raw_target) {
        return ResolvedTarget {
            kind: TargetKind::Remote,
            local_path: None,
        };
    }
    ResolvedTarget {
        kind: TargetKind::Local,
        local_path: Some(format!("{}{}", base_path, raw_target)),
    }
}

/// Remote check first, then alt text, then resolution.
pub fn classify(reference: &ImageReference, base_path: &str) -> Classification {
    if is_remote(&reference.raw_target) {
        return Classification::Skip(SkipReason::Remote);
    }
    if !is_missing_alt_text(reference) {
        return Classification::Skip(SkipReason::HasAltText);
    }
    Classification::NeedsCaption(resolve_target(&reference.raw_target, base_path))
}
