use cucumber::World;
use settlement_engine::{settlement_objects::SettlementResult, SettlementError};

use crate::support::TestSystem;

#[derive(Default, Debug, World)]
pub struct SettlementWorld {
    pub system: Option<TestSystem>,
    pub last_result: Option<Result<SettlementResult, SettlementError>>,
}

impl SettlementWorld {
    pub fn system(&self) -> &TestSystem {
        self.system.as_ref().expect("Settlement engine not initialised")
    }

    pub fn last_result(&self) -> &Result<SettlementResult, SettlementError> {
        self.last_result.as_ref().expect("No settlement has been attempted")
    }
}
