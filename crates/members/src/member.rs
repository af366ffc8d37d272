use serde::{Deserialize, Serialize};

use bookstore_core::{DomainError, DomainResult, Entity, MemberId, ValueObject};

/// Postal address of a member, also copied onto deliveries.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Address {
    pub city: String,
    pub street: String,
    pub zipcode: String,
}

impl Address {
    pub fn new(
        city: impl Into<String>,
        street: impl Into<String>,
        zipcode: impl Into<String>,
    ) -> Self {
        Self {
            city: city.into(),
            street: street.into(),
            zipcode: zipcode.into(),
        }
    }
}

impl ValueObject for Address {}

/// A registered member (customer) of the bookstore.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Member {
    id: MemberId,
    name: String,
    address: Option<Address>,
}

impl Member {
    /// Build a new, not-yet-joined member with a freshly generated id.
    pub fn new(name: impl Into<String>, address: Option<Address>) -> DomainResult<Self> {
        let name = name.into();
        if name.trim().is_empty() {
            return Err(DomainError::validation("member name cannot be empty"));
        }
        Ok(Self {
            id: MemberId::new(),
            name,
            address,
        })
    }

    /// Rehydrate a member loaded from storage.
    pub fn from_parts(id: MemberId, name: String, address: Option<Address>) -> Self {
        Self { id, name, address }
    }

    pub fn id_typed(&self) -> MemberId {
        self.id
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn address(&self) -> Option<&Address> {
        self.address.as_ref()
    }
}

impl Entity for Member {
    type Id = MemberId;

    fn id(&self) -> &Self::Id {
        &self.id
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn new_member_keeps_name_and_address() {
        let address = Address::new("Seoul", "Gangga", "123-123");
        let member = Member::new("member1", Some(address.clone())).unwrap();

        assert_eq!(member.name(), "member1");
        assert_eq!(member.address(), Some(&address));
    }

    #[test]
    fn blank_name_is_rejected() {
        let err = Member::new("   ", None).unwrap_err();
        match err {
            DomainError::Validation(msg) if msg.contains("name cannot be empty") => {}
            other => panic!("expected Validation error, got {other:?}"),
        }
    }

    #[test]
    fn each_member_gets_its_own_id() {
        let a = Member::new("memberA", None).unwrap();
        let b = Member::new("memberA", None).unwrap();
        assert_ne!(a.id_typed(), b.id_typed());
    }

    #[test]
    fn from_parts_preserves_identity() {
        let original = Member::new("memberB", None).unwrap();
        let restored = Member::from_parts(
            original.id_typed(),
            original.name().to_string(),
            original.address().cloned(),
        );
        assert_eq!(restored, original);
    }

    proptest! {
        #[test]
        fn any_non_blank_name_is_accepted(name in "[A-Za-z][A-Za-z0-9 ]{0,40}") {
            let member = Member::new(name.clone(), None).unwrap();
            prop_assert_eq!(member.name(), name.as_str());
        }
    }
}
