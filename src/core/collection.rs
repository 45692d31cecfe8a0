//! Keyed collection of series sharing one configuration.

use crate::error::{ForecastError, Result};
use std::collections::btree_map;
use std::collections::BTreeMap;

/// Identifier under which a lone unnamed series is stored.
pub const SINGLE_SERIES_ID: &str = "";

/// Several series identified by name, or a single unnamed one.
///
/// A lone series is wrapped as a one-element collection under
/// [`SINGLE_SERIES_ID`] and collapsed back with [`into_single`](Self::into_single).
#[derive(Debug, Clone, PartialEq)]
pub struct SeriesCollection<T = crate::core::SeriesTable> {
    series: BTreeMap<String, T>,
    unnamed: bool,
}

impl<T> Default for SeriesCollection<T> {
    fn default() -> Self {
        Self {
            series: BTreeMap::new(),
            unnamed: false,
        }
    }
}

impl<T> SeriesCollection<T> {
    pub fn new() -> Self {
        Self::default()
    }

    /// Wrap a lone unnamed series.
    pub fn single(series: T) -> Self {
        let mut map = BTreeMap::new();
        map.insert(SINGLE_SERIES_ID.to_string(), series);
        Self {
            series: map,
            unnamed: true,
        }
    }

    /// Add a named series.
    pub fn with_series(mut self, id: impl Into<String>, series: T) -> Self {
        self.insert(id, series);
        self
    }

    pub fn insert(&mut self, id: impl Into<String>, series: T) {
        let id = id.into();
        if id != SINGLE_SERIES_ID {
            self.unnamed = false;
        }
        self.series.insert(id, series);
    }

    pub fn get(&self, id: &str) -> Option<&T> {
        self.series.get(id)
    }

    pub fn len(&self) -> usize {
        self.series.len()
    }

    pub fn is_empty(&self) -> bool {
        self.series.is_empty()
    }

    /// Whether this collection wraps a single unnamed series.
    pub fn is_unnamed(&self) -> bool {
        self.unnamed
    }

    pub fn ids(&self) -> impl Iterator<Item = &str> {
        self.series.keys().map(|k| k.as_str())
    }

    pub fn iter(&self) -> btree_map::Iter<'_, String, T> {
        self.series.iter()
    }

    pub fn values(&self) -> impl Iterator<Item = &T> {
        self.series.values()
    }

    pub fn as_map(&self) -> &BTreeMap<String, T> {
        &self.series
    }

    pub fn into_inner(self) -> BTreeMap<String, T> {
        self.series
    }

    /// Collapse a one-element collection to its series.
    pub fn into_single(self) -> Result<T> {
        if self.series.len() != 1 {
            return Err(ForecastError::Data(format!(
                "expected a single series, found {}",
                self.series.len()
            )));
        }
        self.series
            .into_values()
            .next()
            .ok_or(ForecastError::EmptyData)
    }

    /// Apply a fallible transformation to every series, keeping the ids.
    pub fn try_map<U, F>(self, mut f: F) -> Result<SeriesCollection<U>>
    where
        F: FnMut(&str, T) -> Result<U>,
    {
        let unnamed = self.unnamed;
        let mut series = BTreeMap::new();
        for (id, value) in self.series {
            let mapped = f(&id, value)?;
            series.insert(id, mapped);
        }
        Ok(SeriesCollection { series, unnamed })
    }
}

impl From<crate::core::SeriesTable> for SeriesCollection {
    fn from(table: crate::core::SeriesTable) -> Self {
        Self::single(table)
    }
}

impl<T> FromIterator<(String, T)> for SeriesCollection<T> {
    fn from_iter<I: IntoIterator<Item = (String, T)>>(iter: I) -> Self {
        let mut collection = Self::new();
        for (id, series) in iter {
            collection.insert(id, series);
        }
        collection
    }
}

impl<T> IntoIterator for SeriesCollection<T> {
    type Item = (String, T);
    type IntoIter = btree_map::IntoIter<String, T>;

    fn into_iter(self) -> Self::IntoIter {
        self.series.into_iter()
    }
}

impl<'a, T> IntoIterator for &'a SeriesCollection<T> {
    type Item = (&'a String, &'a T);
    type IntoIter = btree_map::Iter<'a, String, T>;

    fn into_iter(self) -> Self::IntoIter {
        self.series.iter()
    }
}
