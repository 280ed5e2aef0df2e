use std::path::{Path, PathBuf};

use anyhow::{bail, Context, Result};
use tokio::fs;

use crate::models::{Customer, Id, User, UserInvoiceLedger};

use super::{merge_membership, Storage};

/// JSON file-based storage implementation.
///
/// Directory structure:
/// ```text
/// data/
///   users/
///     {id}/
///       user.json
///       ledger.json
///   customers/
///     {id}/
///       customer.json
/// ```
pub struct JsonFileStorage {
    base_path: PathBuf,
}

impl JsonFileStorage {
    pub fn new(base_path: impl AsRef<Path>) -> Self {
        Self {
            base_path: base_path.as_ref().to_path_buf(),
        }
    }

    pub fn base_path(&self) -> &Path {
        &self.base_path
    }

    fn users_dir(&self) -> PathBuf {
        self.base_path.join("users")
    }

    fn customers_dir(&self) -> PathBuf {
        self.base_path.join("customers")
    }

    fn user_dir(&self, id: &Id) -> Result<PathBuf> {
        Ok(self.users_dir().join(Self::segment(id)?))
    }

    fn user_file(&self, id: &Id) -> Result<PathBuf> {
        Ok(self.user_dir(id)?.join("user.json"))
    }

    fn ledger_file(&self, user_id: &Id) -> Result<PathBuf> {
        Ok(self.user_dir(user_id)?.join("ledger.json"))
    }

    fn customer_file(&self, id: &Id) -> Result<PathBuf> {
        Ok(self
            .customers_dir()
            .join(Self::segment(id)?)
            .join("customer.json"))
    }

    fn segment(id: &Id) -> Result<&str> {
        if !Id::is_path_safe(id.as_str()) {
            bail!("Refusing unsafe id as path segment: {:?}", id.as_str());
        }
        Ok(id.as_str())
    }

    async fn ensure_dir(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)
                .await
                .with_context(|| format!("Failed to create directory {}", parent.display()))?;
        }
        Ok(())
    }

    async fn read_json<T: for<'de> serde::Deserialize<'de>>(&self, path: &Path) -> Result<Option<T>> {
        match fs::read_to_string(path).await {
            Ok(content) => {
                let value = serde_json::from_str(&content)
                    .with_context(|| format!("Failed to parse JSON from {}", path.display()))?;
                Ok(Some(value))
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(e).with_context(|| format!("Failed to read {}", path.display())),
        }
    }

    /// Write through a sibling temp file and rename, so readers never see a
    /// half-written document.
    async fn write_json<T: serde::Serialize>(&self, path: &Path, value: &T) -> Result<()> {
        self.ensure_dir(path).await?;
        let content = serde_json::to_string_pretty(value).context("Failed to serialize JSON")?;

        let tmp = path.with_extension("json.tmp");
        fs::write(&tmp, content)
            .await
            .with_context(|| format!("Failed to write {}", tmp.display()))?;
        fs::rename(&tmp, path)
            .await
            .with_context(|| format!("Failed to move {} into place", path.display()))?;
        Ok(())
    }
}

#[async_trait::async_trait]
impl Storage for JsonFileStorage {
    async fn get_user(&self, id: &Id) -> Result<Option<User>> {
        self.read_json(&self.user_file(id)?).await
    }

    async fn save_user(&self, user: &User) -> Result<()> {
        self.write_json(&self.user_file(&user.id)?, user).await
    }

    async fn append_customers_to_user(&self, user_id: &Id, customer_ids: &[Id]) -> Result<()> {
        let Some(mut user) = self.get_user(user_id).await? else {
            bail!("User not found: {user_id}");
        };
        if merge_membership(&mut user.customers, customer_ids) == 0 {
            return Ok(());
        }
        self.save_user(&user).await
    }

    async fn get_ledger(&self, user_id: &Id) -> Result<Option<UserInvoiceLedger>> {
        self.read_json(&self.ledger_file(user_id)?).await
    }

    async fn save_ledger(&self, ledger: &mut UserInvoiceLedger) -> Result<()> {
        ledger.recompute_total();
        let path = self.ledger_file(&ledger.user_id)?;
        self.write_json(&path, &*ledger).await
    }

    async fn get_customer(&self, id: &Id) -> Result<Option<Customer>> {
        self.read_json(&self.customer_file(id)?).await
    }

    async fn save_customer(&self, customer: &Customer) -> Result<()> {
        self.write_json(&self.customer_file(&customer.id)?, customer)
            .await
    }

    async fn list_customers(&self, ids: &[Id]) -> Result<Vec<Customer>> {
        let mut customers = Vec::with_capacity(ids.len());
        for id in ids {
            if let Some(customer) = self.get_customer(id).await? {
                customers.push(customer);
            }
        }
        Ok(customers)
    }
}
