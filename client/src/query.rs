// Copyright (c) 2022 Espresso Systems (espressosys.com)
// This file is part of the Configurable Asset Privacy for Ethereum (CAPE) library.
//
// This program is free software: you can redistribute it and/or modify it under the terms of the GNU General Public License as published by the Free Software Foundation, either version 3 of the License, or (at your option) any later version.
// This program is distributed in the hope that it will be useful, but WITHOUT ANY WARRANTY; without even the implied warranty of MERCHANTABILITY or FITNESS FOR A PARTICULAR PURPOSE. See the GNU General Public License for more details.
// You should have received a copy of the GNU General Public License along with this program. If not, see <https://www.gnu.org/licenses/>.

//! A small query cache for data fetched from the chain or from services.
//!
//! Results are stored as JSON values under a [QueryKey]. [QueryClient::fetch_query] returns the
//! cached value while it is fresh and otherwise runs the fetcher and caches what it returns.
//! Failed fetches are never cached.
//!
//! One client is created by the startup routine and shared by `Arc` with everything below the
//! composition root. It lives as long as the last handle to it.

use async_std::sync::RwLock;
use serde::{de::DeserializeOwned, Deserialize, Serialize};
use snafu::{ResultExt, Snafu};
use std::collections::HashMap;
use std::fmt;
use std::future::Future;
use std::time::{Duration, Instant};
use tracing::{event, Level};

#[derive(Clone, Debug, Default, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct QueryKey(Vec<String>);

impl QueryKey {
    pub fn new<I, S>(parts: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self(parts.into_iter().map(Into::into).collect())
    }

    pub fn parts(&self) -> &[String] {
        &self.0
    }

    /// Whether `prefix` matches the leading parts of this key. The empty key matches everything.
    pub fn starts_with(&self, prefix: &QueryKey) -> bool {
        self.0.starts_with(&prefix.0)
    }
}

impl<S: Into<String>, const N: usize> From<[S; N]> for QueryKey {
    fn from(parts: [S; N]) -> Self {
        Self::new(parts)
    }
}

impl fmt::Display for QueryKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}]", self.0.join(", "))
    }
}

#[derive(Debug, Snafu)]
#[snafu(visibility(pub(crate)))]
pub enum QueryError {
    #[snafu(display("query {} failed: {}", key, msg))]
    Fetch { key: QueryKey, msg: String },

    #[snafu(display("cached data for {} has an unexpected shape: {}", key, source))]
    Decode {
        key: QueryKey,
        source: serde_json::Error,
    },

    #[snafu(display("unable to cache data for {}: {}", key, source))]
    Encode {
        key: QueryKey,
        source: serde_json::Error,
    },
}

#[derive(Debug)]
struct CacheEntry {
    data: serde_json::Value,
    updated_at: Instant,
    invalidated: bool,
}

impl CacheEntry {
    fn is_fresh(&self, stale_time: Duration) -> bool {
        !self.invalidated && self.updated_at.elapsed() < stale_time
    }
}

#[derive(Debug, Default)]
pub struct QueryClient {
    entries: RwLock<HashMap<QueryKey, CacheEntry>>,
    stale_time: Duration,
}

impl QueryClient {
    /// A client whose data is stale as soon as it is stored.
    pub fn new() -> Self {
        Self::default()
    }

    /// A client that serves cached data for `stale_time` before fetching again.
    pub fn with_stale_time(stale_time: Duration) -> Self {
        Self {
            entries: Default::default(),
            stale_time,
        }
    }

    pub fn stale_time(&self) -> Duration {
        self.stale_time
    }

    /// Return fresh cached data for `key`, or fetch, cache and return it.
    pub async fn fetch_query<T, E, F, Fut>(
        &self,
        key: QueryKey,
        fetcher: F,
    ) -> Result<T, QueryError>
    where
        T: Serialize + DeserializeOwned,
        E: fmt::Display,
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<T, E>>,
    {
        if let Some(data) = self.fresh_data(&key).await? {
            event!(Level::DEBUG, "cache hit for {}", key);
            return Ok(data);
        }

        event!(Level::DEBUG, "fetching {}", key);
        let data = fetcher().await.map_err(|err| QueryError::Fetch {
            key: key.clone(),
            msg: err.to_string(),
        })?;
        self.set_query_data(key, &data).await?;
        Ok(data)
    }

    async fn fresh_data<T: DeserializeOwned>(
        &self,
        key: &QueryKey,
    ) -> Result<Option<T>, QueryError> {
        let entries = self.entries.read().await;
        match entries.get(key) {
            Some(entry) if entry.is_fresh(self.stale_time) => decode(key, &entry.data).map(Some),
            _ => Ok(None),
        }
    }

    /// Cached data for `key`, fresh or not.
    pub async fn get_query_data<T: DeserializeOwned>(
        &self,
        key: &QueryKey,
    ) -> Result<Option<T>, QueryError> {
        let entries = self.entries.read().await;
        entries
            .get(key)
            .map(|entry| decode(key, &entry.data))
            .transpose()
    }

    pub async fn set_query_data<T: Serialize>(
        &self,
        key: QueryKey,
        data: &T,
    ) -> Result<(), QueryError> {
        let data = serde_json::to_value(data).context(EncodeSnafu { key: key.clone() })?;
        self.entries.write().await.insert(
            key,
            CacheEntry {
                data,
                updated_at: Instant::now(),
                invalidated: false,
            },
        );
        Ok(())
    }

    /// Mark every entry under `prefix` stale so the next fetch goes to the source. Returns the
    /// number of entries marked.
    pub async fn invalidate_queries(&self, prefix: &QueryKey) -> usize {
        let mut entries = self.entries.write().await;
        let mut count = 0;
        for (_, entry) in entries.iter_mut().filter(|(key, _)| key.starts_with(prefix)) {
            entry.invalidated = true;
            count += 1;
        }
        event!(Level::DEBUG, "invalidated {} queries under {}", count, prefix);
        count
    }

    /// Drop every entry under `prefix`. Returns the number of entries dropped.
    pub async fn remove_queries(&self, prefix: &QueryKey) -> usize {
        let mut entries = self.entries.write().await;
        let before = entries.len();
        entries.retain(|key, _| !key.starts_with(prefix));
        before - entries.len()
    }

    pub async fn clear(&self) {
        self.entries.write().await.clear();
    }

    pub async fn len(&self) -> usize {
        self.entries.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.entries.read().await.is_empty()
    }
}

fn decode<T: DeserializeOwned>(
    key: &QueryKey,
    data: &serde_json::Value,
) -> Result<T, QueryError> {
    T::deserialize(data).context(DecodeSnafu { key: key.clone() })
}
