//! Serverless compute cost estimation
//!
//! Prices the compute share of a deployment from request counts and
//! GB-seconds. Historically the gcp compute layer has been priced with the
//! aws formula. Whether that was an approximation or an oversight is not
//! known, so the substitution is kept as an explicit, named policy:
//! [`ComputeFormulaPolicy::Substitute`]. Callers that want each provider's
//! own formula select [`ComputeFormulaPolicy::Native`].

use crate::provider::Provider;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Monthly function usage
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ComputeUsage {
    pub invocations: u64,
    pub avg_duration_ms: f64,
    pub memory_mb: u32,
}

impl ComputeUsage {
    pub fn gb_seconds(&self) -> f64 {
        self.invocations as f64 * (self.avg_duration_ms / 1000.0) * (self.memory_mb as f64 / 1024.0)
    }
}

/// Price sheet for one provider's function hosting
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ComputePricing {
    pub per_million_requests: f64,
    pub per_gb_second: f64,
    pub free_requests: u64,
    pub free_gb_seconds: f64,
}

impl ComputePricing {
    pub fn aws() -> Self {
        Self {
            per_million_requests: 0.20,
            per_gb_second: 0.000_016_666_7,
            free_requests: 1_000_000,
            free_gb_seconds: 400_000.0,
        }
    }

    pub fn azure() -> Self {
        Self {
            per_million_requests: 0.20,
            per_gb_second: 0.000_016,
            free_requests: 1_000_000,
            free_gb_seconds: 400_000.0,
        }
    }

    pub fn gcp() -> Self {
        Self {
            per_million_requests: 0.40,
            per_gb_second: 0.000_002_5,
            free_requests: 2_000_000,
            free_gb_seconds: 400_000.0,
        }
    }

    fn monthly_cost(&self, usage: &ComputeUsage) -> f64 {
        let billable_requests = usage.invocations.saturating_sub(self.free_requests) as f64;
        let billable_gb_seconds = (usage.gb_seconds() - self.free_gb_seconds).max(0.0);
        billable_requests / 1_000_000.0 * self.per_million_requests
            + billable_gb_seconds * self.per_gb_second
    }
}

/// Which formula prices a provider's compute
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case", tag = "policy")]
pub enum ComputeFormulaPolicy {
    /// Every provider is priced with its own sheet
    Native,
    /// `target` is priced with `source`'s sheet
    Substitute { target: Provider, source: Provider },
}

impl Default for ComputeFormulaPolicy {
    fn default() -> Self {
        ComputeFormulaPolicy::Substitute {
            target: Provider::Gcp,
            source: Provider::Aws,
        }
    }
}

/// Compute cost estimator
#[derive(Debug, Clone)]
pub struct ComputeCostEstimator {
    pricing: BTreeMap<Provider, ComputePricing>,
    policy: ComputeFormulaPolicy,
}

impl ComputeCostEstimator {
    pub fn new(policy: ComputeFormulaPolicy) -> Self {
        let pricing = BTreeMap::from([
            (Provider::Aws, ComputePricing::aws()),
            (Provider::Azure, ComputePricing::azure()),
            (Provider::Gcp, ComputePricing::gcp()),
        ]);
        Self { pricing, policy }
    }

    pub fn with_pricing(mut self, provider: Provider, pricing: ComputePricing) -> Self {
        self.pricing.insert(provider, pricing);
        self
    }

    pub fn policy(&self) -> ComputeFormulaPolicy {
        self.policy
    }

    /// Provider whose formula is applied to `provider`
    pub fn formula_provider(&self, provider: Provider) -> Provider {
        match self.policy {
            ComputeFormulaPolicy::Substitute { target, source } if target == provider => source,
            _ => provider,
        }
    }

    /// Estimated monthly compute cost in USD
    pub fn monthly_cost(&self, provider: Provider, usage: &ComputeUsage) -> f64 {
        let formula = self.formula_provider(provider);
        self.pricing
            .get(&formula)
            .map(|pricing| pricing.monthly_cost(usage))
            .unwrap_or_default()
    }
}

impl Default for ComputeCostEstimator {
    fn default() -> Self {
        Self::new(ComputeFormulaPolicy::default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn heavy_usage() -> ComputeUsage {
        ComputeUsage {
            invocations: 50_000_000,
            avg_duration_ms: 200.0,
            memory_mb: 256,
        }
    }

    #[test]
    fn test_default_policy_substitutes_gcp_with_aws() {
        let estimator = ComputeCostEstimator::default();
        assert_eq!(estimator.formula_provider(Provider::Gcp), Provider::Aws);
        assert_eq!(estimator.formula_provider(Provider::Azure), Provider::Azure);

        let usage = heavy_usage();
        let gcp = estimator.monthly_cost(Provider::Gcp, &usage);
        let aws = estimator.monthly_cost(Provider::Aws, &usage);
        assert!((gcp - aws).abs() < f64::EPSILON);
    }

    #[test]
    fn test_native_policy_uses_own_sheet() {
        let estimator = ComputeCostEstimator::new(ComputeFormulaPolicy::Native);
        let usage = heavy_usage();
        let gcp = estimator.monthly_cost(Provider::Gcp, &usage);
        let aws = estimator.monthly_cost(Provider::Aws, &usage);
        assert!(gcp != aws);
    }

    #[test]
    fn test_free_tier_costs_nothing() {
        let estimator = ComputeCostEstimator::new(ComputeFormulaPolicy::Native);
        let usage = ComputeUsage {
            invocations: 1_000,
            avg_duration_ms: 100.0,
            memory_mb: 128,
        };
        for provider in Provider::ALL {
            assert_eq!(estimator.monthly_cost(provider, &usage), 0.0);
        }
    }
}
