//! Twinforge Resilience - Retrying against eventually-consistent control planes
//!
//! Cloud control planes acknowledge a role or identity before every region
//! can see it. The next call then fails with an error that is really a
//! propagation delay. [`ResilientExecutor`] retries such calls under a bounded
//! [`RetryPolicy`], asking an injected [`TransientClassifier`] whether each
//! failure is worth another attempt. Anything the classifier does not
//! recognise propagates after the first attempt.

#![deny(unsafe_code)]
#![cfg_attr(feature = "strict-docs", warn(missing_docs))]
#![cfg_attr(not(feature = "strict-docs"), allow(missing_docs))]

pub mod backoff;
pub mod classifier;
pub mod executor;

pub use backoff::{BackoffSchedule, RetryPolicy};
pub use classifier::{MessageClassifier, NeverTransient, TransientClassifier};
pub use executor::{wait_for_propagation, wait_for_warmup, ResilientExecutor, RetryError};
