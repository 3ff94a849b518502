use crate::root::{RootDescriptor, comparison_form, strip_www};
use tracing::debug;

/// Site membership verdict for a discovered link.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Classification {
    Internal,
    External,
}

/// Decide whether `candidate` belongs to the site described by `root`.
///
/// Matching is substring containment on `<host><path>` forms, retried without
/// a leading `www.`, and finally against the root rewritten between its
/// `sub.domain.tld` and `domain.tld/sub` shapes. Containment means an
/// unrelated URL whose path embeds the root form (`other.com/example.com`)
/// classifies as internal.
pub fn classify(root: &RootDescriptor, candidate: &str) -> Classification {
    let root_form = root.comparison_form();
    let candidate_form = comparison_form(candidate);

    if candidate_form.contains(&root_form) {
        return Classification::Internal;
    }

    let bare_root = strip_www(&root_form);
    let bare_candidate = strip_www(&candidate_form);

    if bare_candidate.contains(bare_root) {
        return Classification::Internal;
    }

    let host = root.host();
    if !root.has_path() && !host.starts_with("www.") && host.matches('.').count() > 1 {
        // sub.domain.tld -> domain.tld/sub, for one- and two-label TLDs
        let labels: Vec<&str> = host.split('.').collect();
        for tld_labels in [1, 2] {
            if let Some(rewritten) = subdomain_to_folders(&labels, tld_labels + 1)
                && bare_candidate.contains(&rewritten)
            {
                debug!("{} matched root {} as {}", candidate, root, rewritten);
                return Classification::Internal;
            }
        }
    } else if root.has_path() {
        let rewritten = folders_to_subdomain(root);
        if bare_candidate.contains(&rewritten) {
            debug!("{} matched root {} as {}", candidate, root, rewritten);
            return Classification::Internal;
        }
    }

    Classification::External
}

/// `a.b.example.com` with `domain_labels = 2` -> `example.com/a/b`.
fn subdomain_to_folders(labels: &[&str], domain_labels: usize) -> Option<String> {
    if labels.len() < domain_labels {
        return None;
    }
    let split = labels.len() - domain_labels;
    Some(format!(
        "{}/{}",
        labels[split..].join("."),
        labels[..split].join("/")
    ))
}

/// `www.example.com/a/b` -> `a.b.example.com`.
fn folders_to_subdomain(root: &RootDescriptor) -> String {
    let labels: Vec<&str> = root
        .path()
        .split('/')
        .filter(|segment| !segment.is_empty())
        .collect();
    format!("{}.{}", labels.join("."), strip_www(root.host()))
}
