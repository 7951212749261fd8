//! Target record-type classification.
//!
//! Part Results records should carry one documented type code, but the
//! producing toolchains are not consistent: several alternate codes have
//! been observed on real tester output labeling the same logical record.
//! Classification is therefore membership in a configurable code set
//! rather than a single equality check.

use std::collections::HashMap;
use tracing::{info, trace};

/// Documented type code for Part Results records
pub const PART_RESULTS_TYPE: u8 = 5;

/// Alternate codes observed on production tester output for the same record
pub const PART_RESULTS_ALIASES: [u8; 2] = [25, 185];

/// How many classifications between diagnostic frequency reports
const REPORT_INTERVAL: u64 = 1000;

/// Minimum observation count before a code is worth reporting
const REPORT_FLOOR: u64 = 100;

/// Decides whether a record's type code denotes a Part Results record.
#[derive(Debug, Clone)]
pub struct TypeClassifier {
    targets: Vec<u8>,
}

impl Default for TypeClassifier {
    fn default() -> Self {
        Self::new()
    }
}

impl TypeClassifier {
    /// Creates a classifier accepting the canonical code plus the known aliases.
    pub fn new() -> Self {
        let mut targets = vec![PART_RESULTS_TYPE];
        targets.extend_from_slice(&PART_RESULTS_ALIASES);
        Self { targets }
    }

    /// Creates a classifier accepting exactly the given codes.
    pub fn with_targets(targets: impl Into<Vec<u8>>) -> Self {
        Self {
            targets: targets.into(),
        }
    }

    /// Whether `typ` denotes the target record kind.
    pub fn is_target(&self, typ: u8) -> bool {
        let hit = self.targets.contains(&typ);
        if hit {
            trace!("type {} classified as part results", typ);
        }
        hit
    }

    /// The accepted code set.
    pub fn targets(&self) -> &[u8] {
        &self.targets
    }
}

/// Diagnostic-only frequency table over unrecognized type codes.
///
/// Surfaces candidate alias codes from real data without ever influencing
/// the classification decision or the scan outcome. Injected explicitly
/// into a scan call by whoever wants the visibility; scans run the same
/// with or without it.
#[derive(Debug, Default)]
pub struct TypeDiagnostics {
    counts: HashMap<u8, u64>,
    checks: u64,
}

impl TypeDiagnostics {
    /// Creates an empty frequency table.
    pub fn new() -> Self {
        Self::default()
    }

    /// Records one unrecognized code.
    ///
    /// Every 1000 observations, logs the most common code once it has been
    /// seen more than 100 times; a frequent unknown code is usually an
    /// undiscovered alias.
    pub fn observe(&mut self, typ: u8) {
        *self.counts.entry(typ).or_insert(0) += 1;
        self.checks += 1;

        if self.checks % REPORT_INTERVAL == 0 {
            if let Some((&typ, &count)) = self.counts.iter().max_by_key(|&(_, &count)| count) {
                if count > REPORT_FLOOR {
                    info!(
                        "most common unrecognized record type: {} (seen {} times)",
                        typ, count
                    );
                }
            }
        }
    }

    /// How often `typ` has been observed.
    pub fn count(&self, typ: u8) -> u64 {
        self.counts.get(&typ).copied().unwrap_or(0)
    }

    /// Total observations recorded.
    pub fn checks(&self) -> u64 {
        self.checks
    }
}
