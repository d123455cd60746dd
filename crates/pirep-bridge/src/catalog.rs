//! Selectable airlines and aircraft, rendered as uniform list items.

use crate::api::{Aircraft, Airline};

/// An entry in a selection list.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CatalogItem {
    /// A single airframe.
    Aircraft(Aircraft),
    /// An airline.
    Airline(Airline),
}

impl CatalogItem {
    /// Identifier used when selecting the item.
    #[must_use]
    pub fn id(&self) -> i64 {
        match self {
            Self::Aircraft(a) => a.id,
            Self::Airline(a) => a.id,
        }
    }

    /// Primary label.
    #[must_use]
    pub fn title(&self) -> String {
        match self {
            Self::Aircraft(a) => a.registration.clone(),
            Self::Airline(a) if !a.icao.is_empty() => a.icao.clone(),
            Self::Airline(a) => a.name.clone(),
        }
    }

    /// Secondary label.
    #[must_use]
    pub fn description(&self) -> String {
        match self {
            Self::Aircraft(a) => format!("{} - {}", a.icao, a.name),
            Self::Airline(a) => a.name.clone(),
        }
    }

    /// Text matched by list filters.
    #[must_use]
    pub fn filter_key(&self) -> String {
        match self {
            Self::Aircraft(a) => format!("{} {} {}", a.registration, a.icao, a.name),
            Self::Airline(a) => format!("{} {} {}", a.icao, a.iata, a.name),
        }
    }

    /// Case-insensitive substring match against [`filter_key`](Self::filter_key).
    #[must_use]
    pub fn matches(&self, query: &str) -> bool {
        let query = query.trim().to_lowercase();
        query.is_empty() || self.filter_key().to_lowercase().contains(&query)
    }
}

/// Aircraft as list items, sorted by registration.
#[must_use]
pub fn aircraft_items(aircraft: Vec<Aircraft>) -> Vec<CatalogItem> {
    let mut items: Vec<_> = aircraft.into_iter().map(CatalogItem::Aircraft).collect();
    items.sort_by_key(CatalogItem::title);
    items
}

/// Airlines as list items, in server order.
#[must_use]
pub fn airline_items(airlines: Vec<Airline>) -> Vec<CatalogItem> {
    airlines.into_iter().map(CatalogItem::Airline).collect()
}

/// Items matching `query`; all items when `query` is `None`.
#[must_use]
pub fn filter(items: Vec<CatalogItem>, query: Option<&str>) -> Vec<CatalogItem> {
    match query {
        Some(query) => items.into_iter().filter(|i| i.matches(query)).collect(),
        None => items,
    }
}
