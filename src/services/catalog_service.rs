use std::collections::HashMap;

use async_trait::async_trait;
use mongodb::{
    bson::{doc, oid::ObjectId},
    Client, Collection,
};
use rust_decimal::Decimal;
use serde::Deserialize;

use crate::errors::BookingError;
use crate::models::bookings::SubjectKind;
use crate::models::catalog::CatalogItem;

/// Read-only view of the tour/destination catalog.
#[async_trait]
pub trait CatalogLookup: Send + Sync {
    async fn get_by_id(
        &self,
        kind: SubjectKind,
        id: &str,
    ) -> Result<Option<CatalogItem>, BookingError>;
}

#[derive(Debug, Deserialize)]
struct CatalogDocument {
    #[serde(rename = "_id")]
    id: ObjectId,
    #[serde(alias = "trip_name", alias = "name")]
    title: String,
    #[serde(alias = "person_cost", alias = "price")]
    unit_price: Decimal,
    #[serde(default, alias = "length_days", alias = "duration")]
    duration_days: Option<i64>,
}

pub struct MongoCatalog {
    tours: Collection<CatalogDocument>,
    destinations: Collection<CatalogDocument>,
}

impl MongoCatalog {
    pub fn new(client: &Client, database: &str) -> Self {
        let db = client.database(database);
        Self {
            tours: db.collection("Tours"),
            destinations: db.collection("Destinations"),
        }
    }
}

#[async_trait]
impl CatalogLookup for MongoCatalog {
    async fn get_by_id(
        &self,
        kind: SubjectKind,
        id: &str,
    ) -> Result<Option<CatalogItem>, BookingError> {
        // Ids that are not ObjectIds cannot exist in the catalog.
        let object_id = match ObjectId::parse_str(id) {
            Ok(oid) => oid,
            Err(_) => return Ok(None),
        };

        let collection = match kind {
            SubjectKind::Tour => &self.tours,
            SubjectKind::Destination => &self.destinations,
        };

        let found = collection.find_one(doc! { "_id": object_id }).await?;
        Ok(found.map(|d| CatalogItem {
            id: d.id.to_hex(),
            kind,
            title: d.title,
            unit_price: d.unit_price,
            duration_days: d.duration_days,
        }))
    }
}

#[derive(Default)]
pub struct InMemoryCatalog {
    items: HashMap<(SubjectKind, String), CatalogItem>,
}

impl InMemoryCatalog {
    pub fn with_item(mut self, item: CatalogItem) -> Self {
        self.items.insert((item.kind, item.id.clone()), item);
        self
    }

    pub fn with_tour(self, id: &str, title: &str, unit_price: Decimal, duration_days: Option<i64>) -> Self {
        self.with_item(CatalogItem {
            id: id.to_string(),
            kind: SubjectKind::Tour,
            title: title.to_string(),
            unit_price,
            duration_days,
        })
    }

    pub fn with_destination(
        self,
        id: &str,
        title: &str,
        unit_price: Decimal,
        duration_days: Option<i64>,
    ) -> Self {
        self.with_item(CatalogItem {
            id: id.to_string(),
            kind: SubjectKind::Destination,
            title: title.to_string(),
            unit_price,
            duration_days,
        })
    }
}

#[async_trait]
impl CatalogLookup for InMemoryCatalog {
    async fn get_by_id(
        &self,
        kind: SubjectKind,
        id: &str,
    ) -> Result<Option<CatalogItem>, BookingError> {
        Ok(self.items.get(&(kind, id.to_string())).cloned())
    }
}
