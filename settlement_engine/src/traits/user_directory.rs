use crate::{
    db_types::{NewUser, User, UserId},
    traits::StoreError,
};

/// Platform users and their links to payment provider customers.
#[allow(async_fn_in_trait)]
pub trait UserDirectory {
    async fn fetch_user(&self, id: &UserId) -> Result<Option<User>, StoreError>;

    /// Emails are matched case-insensitively.
    async fn fetch_user_by_email(&self, email: &str) -> Result<Option<User>, StoreError>;

    /// Fetch the user previously linked to the provider's customer reference.
    async fn fetch_user_for_customer_ref(&self, customer_ref: &str) -> Result<Option<User>, StoreError>;

    /// Record that `customer_ref` belongs to `user_id`. An existing link for the same reference is left untouched.
    async fn link_customer_ref(&self, customer_ref: &str, user_id: &UserId) -> Result<(), StoreError>;

    async fn insert_user(&self, user: NewUser) -> Result<User, StoreError>;
}
