use mockall::mock;
use settlement_engine::{CheckoutDetails, CheckoutLookup, LookupError};

mock! {
    pub Lookup {}
    impl CheckoutLookup for Lookup {
        async fn fetch_customer_email(&self, customer_ref: &str) -> Result<Option<String>, LookupError>;
        async fn find_customer_refs(&self, email: &str) -> Result<Vec<String>, LookupError>;
        async fn fetch_checkout(&self, checkout_id: &str) -> Result<Option<CheckoutDetails>, LookupError>;
    }
}
