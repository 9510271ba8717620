//! Domain availability batching.
//!
//! A batch checks one label against many TLDs. TLDs outside the supported
//! registry suffix are answered locally as `UnsupportedTld`; the rest are
//! split into chunks of at most `MAX_CHECK_CHUNK` names, one check command
//! per chunk. A failed chunk marks its own names as `Error` and leaves the
//! other chunks alone.

use crate::error::RegistryError;
use crate::protocols::DomainCheck;
use crate::types::{Availability, CheckItem, CheckReport, CheckResult};
use crate::utils::{is_supported_tld, normalize_tld, to_ascii_name};
use futures_util::stream::{self, StreamExt};
use std::collections::HashMap;
use std::future::Future;

/// Most names the registry accepts in one check command.
pub const MAX_CHECK_CHUNK: usize = 20;

/// Work left after classification.
#[derive(Debug, Clone, Default)]
pub struct CheckPlan {
    /// Results already known without a network call
    pub report: CheckReport,
    pub chunks: Vec<Vec<CheckItem>>,
}

impl CheckPlan {
    /// Names that still need a registry check.
    pub fn pending(&self) -> usize {
        self.chunks.iter().map(Vec::len).sum()
    }
}

/// Classify and chunk the names for one label.
///
/// The label is lowercased and IDNA-encoded. Duplicate TLDs are kept: each
/// occurrence is sent and the later result replaces the earlier one.
pub fn plan(label: &str, tlds: &[String], supported_suffix: &str) -> CheckPlan {
    let raw_label = label.trim().to_lowercase();
    let ascii_label = to_ascii_name("label", &raw_label);

    let mut report = CheckReport::default();
    let mut pending = Vec::new();

    for tld in tlds {
        let tld = normalize_tld(tld);
        let shown_label = ascii_label.as_deref().unwrap_or(&raw_label);

        if !is_supported_tld(&tld, supported_suffix) {
            report.insert(CheckResult::unsupported(format!("{}{}", shown_label, tld), tld));
            continue;
        }

        let item = ascii_label.clone().and_then(|label| {
            Ok(CheckItem {
                second_level_label: label,
                top_level_domain: format!(".{}", to_ascii_name("tld", &tld[1..])?),
            })
        });
        match item {
            Ok(item) => pending.push(item),
            Err(e) => report.insert(CheckResult::failed(
                format!("{}{}", shown_label, tld),
                tld,
                e.user_message(),
                None,
            )),
        }
    }

    let chunks = pending
        .chunks(MAX_CHECK_CHUNK)
        .map(<[CheckItem]>::to_vec)
        .collect();

    CheckPlan { report, chunks }
}

/// Fold one chunk's outcome into the report.
///
/// On success every name of the chunk gets the registry's answer; a name
/// the registry left out becomes `Error`. On failure every name of the
/// chunk becomes `Error` with the failure's message and code.
pub fn merge_chunk(
    report: &mut CheckReport,
    chunk: &[CheckItem],
    outcome: Result<Vec<DomainCheck>, RegistryError>,
) {
    let checks = match outcome {
        Ok(checks) => checks,
        Err(e) => {
            tracing::warn!(names = chunk.len(), "domain check chunk failed: {}", e);
            for item in chunk {
                report.insert(CheckResult::failed(
                    item.domain_name(),
                    item.top_level_domain.clone(),
                    e.user_message(),
                    e.code(),
                ));
            }
            return;
        }
    };

    let by_name: HashMap<&str, &DomainCheck> =
        checks.iter().map(|c| (c.name.as_str(), c)).collect();

    for item in chunk {
        let key = item.domain_name();
        let result = match by_name.get(key.as_str()) {
            Some(check) => CheckResult {
                availability: if check.available() {
                    Availability::Available
                } else {
                    Availability::Registered
                },
                registry_reason_code: check.reason_code,
                error_message: None,
                tld: item.top_level_domain.clone(),
                key,
            },
            None => CheckResult::failed(
                key.clone(),
                item.top_level_domain.clone(),
                format!("{} missing from check response", key),
                None,
            ),
        };
        report.insert(result);
    }
}

/// Run every chunk through `dispatch` and merge the outcomes.
///
/// At most `concurrency` chunks are in flight at once; 1 keeps the
/// dispatch strictly sequential. Failed chunks are not retried.
pub async fn run<F, Fut>(plan: CheckPlan, concurrency: usize, mut dispatch: F) -> CheckReport
where
    F: FnMut(Vec<String>) -> Fut,
    Fut: Future<Output = Result<Vec<DomainCheck>, RegistryError>>,
{
    let CheckPlan { mut report, chunks } = plan;

    let mut outcomes = stream::iter(chunks)
        .map(|chunk| {
            let names = chunk.iter().map(CheckItem::domain_name).collect();
            tracing::debug!(names = chunk.len(), "dispatching domain check chunk");
            let pending = dispatch(names);
            async move { (chunk, pending.await) }
        })
        .buffer_unordered(concurrency.max(1));

    while let Some((chunk, outcome)) = outcomes.next().await {
        merge_chunk(&mut report, &chunk, outcome);
    }

    report
}
