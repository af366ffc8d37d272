use serde::{Deserialize, Serialize};

use bookstore_core::{DomainError, DomainResult, Entity, ItemId};

/// Kind-specific attributes of a catalogue item.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "lowercase")]
pub enum ItemDetails {
    Book { author: String, isbn: String },
    Album { artist: String, etc: String },
    Movie { director: String, actor: String },
}

impl ItemDetails {
    /// Stable discriminator, also used as the storage column value.
    pub fn kind(&self) -> &'static str {
        match self {
            ItemDetails::Book { .. } => "book",
            ItemDetails::Album { .. } => "album",
            ItemDetails::Movie { .. } => "movie",
        }
    }
}

/// A sellable catalogue item with a stock level.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Item {
    id: ItemId,
    name: String,
    /// Price in smallest currency unit.
    price: u64,
    stock_quantity: i64,
    details: ItemDetails,
}

impl Item {
    /// Build a new item with a freshly generated id.
    pub fn new(
        name: impl Into<String>,
        price: u64,
        stock_quantity: i64,
        details: ItemDetails,
    ) -> DomainResult<Self> {
        let name = name.into();
        validate_name(&name)?;
        validate_stock(stock_quantity)?;

        Ok(Self {
            id: ItemId::new(),
            name,
            price,
            stock_quantity,
            details,
        })
    }

    /// Convenience constructor for the common case.
    pub fn book(
        name: impl Into<String>,
        price: u64,
        stock_quantity: i64,
        author: impl Into<String>,
        isbn: impl Into<String>,
    ) -> DomainResult<Self> {
        Self::new(
            name,
            price,
            stock_quantity,
            ItemDetails::Book {
                author: author.into(),
                isbn: isbn.into(),
            },
        )
    }

    /// Rehydrate an item loaded from storage.
    pub fn from_parts(
        id: ItemId,
        name: String,
        price: u64,
        stock_quantity: i64,
        details: ItemDetails,
    ) -> Self {
        Self {
            id,
            name,
            price,
            stock_quantity,
            details,
        }
    }

    pub fn id_typed(&self) -> ItemId {
        self.id
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn price(&self) -> u64 {
        self.price
    }

    pub fn stock_quantity(&self) -> i64 {
        self.stock_quantity
    }

    pub fn details(&self) -> &ItemDetails {
        &self.details
    }

    /// Increase stock by `quantity`.
    pub fn add_stock(&mut self, quantity: i64) -> DomainResult<()> {
        validate_quantity(quantity)?;
        self.stock_quantity = self
            .stock_quantity
            .checked_add(quantity)
            .ok_or_else(|| DomainError::invariant("stock quantity overflow"))?;
        Ok(())
    }

    /// Decrease stock by `quantity`; fails without touching stock when short.
    pub fn remove_stock(&mut self, quantity: i64) -> DomainResult<()> {
        validate_quantity(quantity)?;
        if quantity > self.stock_quantity {
            return Err(DomainError::not_enough_stock(quantity, self.stock_quantity));
        }
        self.stock_quantity -= quantity;
        Ok(())
    }

    /// Replace the editable catalogue fields. Kind-specific details are kept.
    pub fn update(
        &mut self,
        name: impl Into<String>,
        price: u64,
        stock_quantity: i64,
    ) -> DomainResult<()> {
        let name = name.into();
        validate_name(&name)?;
        validate_stock(stock_quantity)?;

        self.name = name;
        self.price = price;
        self.stock_quantity = stock_quantity;
        Ok(())
    }
}

impl Entity for Item {
    type Id = ItemId;

    fn id(&self) -> &Self::Id {
        &self.id
    }
}

fn validate_name(name: &str) -> DomainResult<()> {
    if name.trim().is_empty() {
        return Err(DomainError::validation("item name cannot be empty"));
    }
    Ok(())
}

fn validate_stock(stock_quantity: i64) -> DomainResult<()> {
    if stock_quantity < 0 {
        return Err(DomainError::validation("stock quantity cannot be negative"));
    }
    Ok(())
}

fn validate_quantity(quantity: i64) -> DomainResult<()> {
    if quantity <= 0 {
        return Err(DomainError::validation("quantity must be positive"));
    }
    Ok(())
}
