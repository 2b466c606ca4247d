use anyhow::Result;

use parley_db::Database;
use parley_types::models::{PublicProfile, UserId};

/// Read access to the external user directory.
pub trait UserDirectory: Send + Sync {
    fn exists(&self, id: UserId) -> Result<bool>;

    fn public_profile(&self, id: UserId) -> Result<Option<PublicProfile>>;
}

impl UserDirectory for Database {
    fn exists(&self, id: UserId) -> Result<bool> {
        self.user_exists(id)
    }

    fn public_profile(&self, id: UserId) -> Result<Option<PublicProfile>> {
        Ok(self.get_user_by_id(id)?.map(PublicProfile::from))
    }
}
