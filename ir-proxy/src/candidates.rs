use log::debug;
use std::collections::BTreeMap;

use crate::imagestream::ImageStream;
use crate::reference::ImageReference;

/// Remote repositories to search, keyed by canonical repository name.
pub type CandidateSet = BTreeMap<String, ImageReference>;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Candidates
{
    /// The newest event of every tag.
    Primary,
    /// Every older event of every tag.
    Secondary,
}

/// Collects the remote repositories referenced by the tag history of `is`,
/// skipping references into `local_registry`.
pub fn identify(is: &ImageStream, local_registry: &str, mode: Candidates) -> CandidateSet
{
    let mut search = CandidateSet::new();

    for (tag, history) in &is.status.tags {
        let events = match mode {
            Candidates::Primary => &history.items[..history.items.len().min(1)],
            Candidates::Secondary if history.items.len() > 1 => &history.items[1..],
            Candidates::Secondary => &[],
        };

        for event in events {
            let Ok(reference) = ImageReference::parse(&event.docker_image_reference) else {
                debug!(
                    "Skipping unparsable reference \"{}\" of tag \"{}\"",
                    event.docker_image_reference, tag
                );
                continue;
            };

            if !local_registry.is_empty() && reference.registry == local_registry {
                continue;
            }

            let reference = reference.docker_client_defaults();
            search.insert(reference.as_repository().exact(), reference);
        }
    }

    search
}

/// Removes from `secondary` every repository already present in `primary`.
pub fn without(mut secondary: CandidateSet, primary: &CandidateSet) -> CandidateSet
{
    secondary.retain(|key, _| !primary.contains_key(key));
    secondary
}
