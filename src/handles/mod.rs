//! The public cache handles.
//!
//! Both handles are thin clones of one `Arc<BankShared>`; converting
//! between the sync and async views is zero-cost. All state sits behind a
//! single mutex, so every operation observes a consistent store, reporter,
//! and configuration.

use parking_lot::Mutex;

use crate::config::BankConfig;
use crate::reporter::UsageReporter;
use crate::store::Bank;

#[cfg(feature = "tokio")]
pub mod futures;
pub mod sync;

#[derive(Debug)]
pub(crate) struct BankShared {
  pub(crate) inner: Mutex<BankInner>,
}

#[derive(Debug)]
pub(crate) struct BankInner {
  pub(crate) bank: Bank,
  pub(crate) reporter: UsageReporter,
  pub(crate) config: BankConfig,
}

impl BankShared {
  pub(crate) fn with_config(config: BankConfig) -> Self {
    BankShared {
      inner: Mutex::new(BankInner {
        bank: Bank::new(),
        reporter: UsageReporter::default(),
        config,
      }),
    }
  }
}
