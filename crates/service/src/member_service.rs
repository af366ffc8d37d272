//! Member registration and lookup.

use tracing::{info, instrument, warn};

use bookstore_core::{DomainError, MemberId};
use bookstore_infra::{MemberRepository, StoreError, Transaction, UnitOfWork};
use bookstore_members::Member;

use crate::error::{ServiceError, ServiceResult};
use crate::unit_of_work::finish;

pub struct MemberService<U> {
    uow: U,
}

impl<U: UnitOfWork> MemberService<U> {
    pub fn new(uow: U) -> Self {
        Self { uow }
    }

    /// Register `member`. Ids and names are unique across the registry, and
    /// a registered member is never replaced.
    #[instrument(skip(self, member), fields(member_id = %member.id_typed(), name = %member.name()))]
    pub async fn join(&self, member: Member) -> ServiceResult<MemberId> {
        let mut tx = self.uow.begin().await?;
        let outcome = join_in(&mut tx, &member).await;
        let mut outcome = finish(tx, outcome).await;

        // A concurrent join of the same member surfaces as a store conflict
        // (unique constraint or lost commit race).
        if let Err(ServiceError::Store(StoreError::Conflict(_))) = &outcome {
            if self.is_registered(&member).await? {
                outcome = Err(duplicate(&member));
            }
        }

        match &outcome {
            Ok(_) => info!("member joined"),
            Err(err) => warn!(error = %err, "member rejected"),
        }
        outcome
    }

    pub async fn find_members(&self) -> ServiceResult<Vec<Member>> {
        let mut tx = self.uow.begin().await?;
        let outcome = tx.members().find_all().await.map_err(Into::into);
        finish(tx, outcome).await
    }

    pub async fn find_one(&self, member_id: MemberId) -> ServiceResult<Option<Member>> {
        let mut tx = self.uow.begin().await?;
        let outcome = tx.members().find_one(member_id).await.map_err(Into::into);
        finish(tx, outcome).await
    }

    /// Whether a member with `member`'s id or name is already committed.
    async fn is_registered(&self, member: &Member) -> ServiceResult<bool> {
        let mut tx = self.uow.begin().await?;
        let outcome = find_clash(&mut tx, member).await;
        finish(tx, outcome).await.map(|clash| clash.is_some())
    }
}

async fn join_in<Tx: Transaction>(tx: &mut Tx, member: &Member) -> ServiceResult<MemberId> {
    if find_clash(tx, member).await?.is_some() {
        return Err(duplicate(member));
    }

    tx.members().save(member).await?;
    Ok(member.id_typed())
}

/// A stored member sharing `member`'s id or name.
async fn find_clash<Tx: Transaction>(tx: &mut Tx, member: &Member) -> ServiceResult<Option<Member>> {
    if let Some(existing) = tx.members().find_one(member.id_typed()).await? {
        return Ok(Some(existing));
    }
    let mut same_name = tx.members().find_by_name(member.name()).await?;
    Ok(same_name.pop())
}

fn duplicate(member: &Member) -> ServiceError {
    DomainError::conflict(format!(
        "member already exists: {} ({})",
        member.name(),
        member.id_typed()
    ))
    .into()
}
