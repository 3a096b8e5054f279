//! Document handles.
//!
//! A [`Document`] names one `(tenant, name)` slot. Obtaining a handle never
//! touches storage; every operation validates the address, consults the
//! [`PermissionEngine`] for the acting identity and only then performs I/O.
//!
//! Mutations hold the document's key lock for their whole duration. Reads
//! take no lock and rely on the backend's atomic replace.

use std::sync::Arc;

use bytes::Bytes;
use tracing::{debug, info, instrument};

use crate::attributes::Attributes;
use crate::core::{DocumentKey, KeyLocks, StorageBackend};
use crate::error::{AccessError, StoreError, StoreResult};
use crate::identity::Identity;
use crate::permissions::{Action, PermissionDecision, PermissionEngine};
use crate::transfer::{RangeRequest, RangeSlice};

/// Handle to a single document in a tenant's collection.
///
/// The owner of the document is the tenant whose collection holds it.
#[derive(Debug, Clone)]
pub struct Document {
    owner: Identity,
    name: String,
    backend: Arc<dyn StorageBackend>,
    locks: Arc<KeyLocks>,
}

impl Document {
    pub(crate) fn new(
        owner: Identity,
        name: String,
        backend: Arc<dyn StorageBackend>,
        locks: Arc<KeyLocks>,
    ) -> Self {
        Self {
            owner,
            name,
            backend,
            locks,
        }
    }

    /// Returns the document name.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Returns the owning identity.
    pub fn owner(&self) -> &Identity {
        &self.owner
    }

    /// Returns `true` if the document has content.
    pub async fn exists(&self) -> StoreResult<bool> {
        let key = self.key()?;
        self.backend.exists(&key).await
    }

    /// Computes the decision for `acting` without touching content.
    pub async fn authorize(&self, acting: &Identity, action: Action) -> StoreResult<PermissionDecision> {
        let key = self.key()?;
        self.decide(&key, acting, action).await
    }

    /// Reads the whole content.
    ///
    /// Authorization is checked before existence, so a caller without READ
    /// access gets `PermissionDenied` whether or not the document exists.
    ///
    /// # Errors
    ///
    /// * `Access(PermissionDenied)` - if `acting` may not read
    /// * `Document(NotFound)` - if there is no content
    #[instrument(skip(self), fields(tenant = %self.owner, name = %self.name))]
    pub async fn read(&self, acting: &Identity) -> StoreResult<Bytes> {
        let key = self.key()?;
        self.require(&key, acting, Action::Read).await?;
        self.backend.read(&key).await
    }

    /// Reads a window of the content.
    ///
    /// Backends that can seek serve the window without reading the rest.
    #[instrument(skip(self), fields(tenant = %self.owner, name = %self.name))]
    pub async fn read_range(&self, acting: &Identity, request: RangeRequest) -> StoreResult<RangeSlice> {
        let key = self.key()?;
        self.require(&key, acting, Action::Read).await?;

        let total = self.backend.size(&key).await?;
        let range = request.resolve(total)?;
        let offset = range.start;
        let bytes = self.backend.read_range(&key, range).await?;

        Ok(RangeSlice {
            offset,
            total,
            bytes,
        })
    }

    /// Returns the content length in bytes.
    pub async fn size(&self, acting: &Identity) -> StoreResult<u64> {
        let key = self.key()?;
        self.require(&key, acting, Action::Read).await?;
        self.backend.size(&key).await
    }

    /// Replaces the content, creating the document if absent.
    #[instrument(skip(self, content), fields(tenant = %self.owner, name = %self.name, size = content.len()))]
    pub async fn write(&self, acting: &Identity, content: Bytes) -> StoreResult<()> {
        let key = self.key()?;
        self.require(&key, acting, Action::Write).await?;

        let _guard = self.locks.lock(&key).await?;
        self.backend.write(&key, content).await?;
        debug!("Document written");
        Ok(())
    }

    /// Removes content and attributes.
    ///
    /// Content goes first; once it is gone the document no longer exists even
    /// if removing the attributes fails afterwards.
    ///
    /// # Errors
    ///
    /// * `Document(NotFound)` - if there is no content
    #[instrument(skip(self), fields(tenant = %self.owner, name = %self.name))]
    pub async fn delete(&self, acting: &Identity) -> StoreResult<()> {
        let key = self.key()?;
        self.require(&key, acting, Action::Write).await?;

        let _guard = self.locks.lock(&key).await?;
        self.backend.delete(&key).await?;
        self.backend.delete_metadata(&key).await?;
        info!("Document deleted");
        Ok(())
    }

    /// Grants `friend` read access. Adding an existing friend, or the owner,
    /// changes nothing.
    #[instrument(skip(self), fields(tenant = %self.owner, name = %self.name))]
    pub async fn add_friend(&self, acting: &Identity, friend: Identity) -> StoreResult<()> {
        let owner = self.owner.clone();
        self.manage(acting, move |attrs| {
            if friend != owner {
                attrs.add_friend(friend);
            }
        })
        .await
    }

    /// Revokes `friend`'s read access. Ejecting a non-friend changes nothing.
    #[instrument(skip(self), fields(tenant = %self.owner, name = %self.name))]
    pub async fn eject_friend(&self, acting: &Identity, friend: &Identity) -> StoreResult<()> {
        self.manage(acting, |attrs| {
            attrs.eject_friend(friend);
        })
        .await
    }

    /// Sets the visibility flag.
    #[instrument(skip(self), fields(tenant = %self.owner, name = %self.name))]
    pub async fn set_visibility(&self, acting: &Identity, visible: bool) -> StoreResult<()> {
        self.manage(acting, |attrs| attrs.show(visible)).await
    }

    /// Returns the current attributes. Requires MANAGE.
    pub async fn attributes(&self, acting: &Identity) -> StoreResult<Attributes> {
        let key = self.key()?;
        self.require(&key, acting, Action::Manage).await?;
        Ok(self.backend.get_metadata(&key).await?.unwrap_or_default())
    }

    /// Read-modify-write of the attributes under the key lock.
    async fn manage<F>(&self, acting: &Identity, update: F) -> StoreResult<()>
    where
        F: FnOnce(&mut Attributes),
    {
        let key = self.key()?;
        self.require(&key, acting, Action::Manage).await?;

        let _guard = self.locks.lock(&key).await?;
        let mut attrs = self.backend.get_metadata(&key).await?.unwrap_or_default();
        update(&mut attrs);
        self.backend.set_metadata(&key, &attrs).await?;
        debug!(
            visible = attrs.visible(),
            friends = attrs.friends().len(),
            "Attributes updated"
        );
        Ok(())
    }

    async fn require(&self, key: &DocumentKey, acting: &Identity, action: Action) -> StoreResult<()> {
        let decision = self.decide(key, acting, action).await?;
        if decision.allowed {
            return Ok(());
        }

        debug!(identity = %acting, %action, reason = ?decision.reason, "Access denied");
        Err(StoreError::Access(AccessError::PermissionDenied {
            identity: acting.clone(),
            action,
            tenant: self.owner.clone(),
            name: self.name.clone(),
        }))
    }

    async fn decide(
        &self,
        key: &DocumentKey,
        acting: &Identity,
        action: Action,
    ) -> StoreResult<PermissionDecision> {
        // Only non-owner reads depend on the attributes.
        let attrs = if acting != &self.owner && action == Action::Read {
            self.backend.get_metadata(key).await?
        } else {
            None
        };
        Ok(PermissionEngine::authorize(
            acting,
            attrs.as_ref(),
            &self.owner,
            action,
        ))
    }

    fn key(&self) -> StoreResult<DocumentKey> {
        Ok(DocumentKey::new(self.owner.clone(), self.name.clone())?)
    }
}
