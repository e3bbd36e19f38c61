//! Unit-of-work: one storage transaction per use-case invocation.
//!
//! The transaction is an explicit scope value returned by
//! [`UnitOfWork::begin`] and passed by `&mut` to every repository call that
//! must take part in it. Dropping a scope without committing rolls it back,
//! which is how a cancelled use-case future aborts its transaction.
//!
//! Scopes do not nest. Calling [`run_in_scope`] from inside another scope
//! opens a second, independent transaction; doing so is a programming error.

use async_trait::async_trait;
use futures::future::BoxFuture;

use crate::error::DomainError;

/// Future returned by the body of a [`run_in_scope`] call.
pub type ScopeFuture<'s, T> = BoxFuture<'s, Result<T, DomainError>>;

/// A source of transactional scopes.
#[async_trait]
pub trait UnitOfWork: Send + Sync {
    /// The transaction handle threaded through repository calls.
    type Scope: Send;

    /// Opens a new transaction.
    async fn begin(&self) -> Result<Self::Scope, DomainError>;

    /// Makes every write performed through `scope` durable and visible.
    async fn commit(&self, scope: Self::Scope) -> Result<(), DomainError>;

    /// Discards every write performed through `scope`.
    async fn rollback(&self, scope: Self::Scope) -> Result<(), DomainError>;
}

/// Runs `work` inside a fresh transaction.
///
/// Commits if `work` succeeds. Otherwise rolls back and returns `work`'s
/// error unchanged; a failing rollback is logged, never substituted for the
/// original error.
///
/// # Errors
///
/// Returns the error from `begin`, from `work`, or from `commit`.
pub async fn run_in_scope<U, T, F>(uow: &U, work: F) -> Result<T, DomainError>
where
    U: UnitOfWork + ?Sized,
    T: Send,
    F: for<'s> FnOnce(&'s mut U::Scope) -> ScopeFuture<'s, T> + Send,
{
    let mut scope = uow.begin().await?;

    match work(&mut scope).await {
        Ok(value) => {
            uow.commit(scope).await?;
            Ok(value)
        }
        Err(err) => {
            if let Err(rollback_err) = uow.rollback(scope).await {
                tracing::warn!(error = %rollback_err, "rollback failed after scope error");
            }
            Err(err)
        }
    }
}
