use std::fmt::{self, Display};

use url::Url;

/// Ordered set of query parameters. Setting a key that is already present
/// overwrites its value in place.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct QueryParams {
    pairs: Vec<(String, String)>,
}

impl QueryParams {
    pub fn new() -> Self {
        Self::default()
    }

    /// Set `key` to `value`, replacing any earlier value for the same key.
    pub fn set(&mut self, key: impl Into<String>, value: impl Display) -> &mut Self {
        let key = key.into();
        let value = value.to_string();
        match self.pairs.iter_mut().find(|pair| pair.0 == key) {
            Some(pair) => pair.1 = value,
            None => self.pairs.push((key, value)),
        }
        self
    }

    /// Chainable form of [`set`](Self::set).
    pub fn with(mut self, key: impl Into<String>, value: impl Display) -> Self {
        self.set(key, value);
        self
    }

    /// Apply every pair of `other` on top of `self`.
    pub fn merge(&mut self, other: &QueryParams) -> &mut Self {
        for (k, v) in &other.pairs {
            self.set(k.as_str(), v);
        }
        self
    }

    pub fn get(&self, key: &str) -> Option<&str> {
        self.pairs
            .iter()
            .find(|pair| pair.0 == key)
            .map(|pair| pair.1.as_str())
    }

    pub fn len(&self) -> usize {
        self.pairs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.pairs.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.pairs.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }

    /// Set `nzo_ids` to the comma-joined list, or leave it out when `ids` is
    /// empty so the server returns everything.
    pub(crate) fn set_id_filter<S: AsRef<str>>(&mut self, ids: &[S]) -> &mut Self {
        if !ids.is_empty() {
            let joined = ids.iter().map(AsRef::as_ref).collect::<Vec<_>>().join(",");
            self.set("nzo_ids", joined);
        }
        self
    }
}

/// The resolved API endpoint of one SABnzbd instance: `.../sabnzbd/api`
/// plus the key every request carries.
#[derive(Clone)]
pub struct Endpoint {
    base: Url,
    api_key: String,
}

impl fmt::Debug for Endpoint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Endpoint")
            .field("base", &self.base.as_str())
            .field("api_key", &"<redacted>")
            .finish()
    }
}

impl Endpoint {
    pub(crate) fn new(base: Url, api_key: String) -> Self {
        Self { base, api_key }
    }

    /// The base URL without any query string.
    pub fn base(&self) -> &Url {
        &self.base
    }

    /// Build the request URL for `mode`. The query carries `apikey`,
    /// `output=json` and `mode`, followed by `params`; later values win.
    pub fn url_for(&self, mode: &str, params: &QueryParams) -> Url {
        let mut query = QueryParams::new()
            .with("apikey", &self.api_key)
            .with("output", "json")
            .with("mode", mode);
        query.merge(params);

        let mut url = self.base.clone();
        url.set_query(None);
        url.query_pairs_mut().extend_pairs(query.iter());
        url
    }
}

/// Job priority as understood by `addurl`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Priority {
    /// Use the category's priority.
    Default,
    Duplicate,
    Paused,
    Low,
    Normal,
    High,
    Force,
}

impl From<Priority> for i32 {
    fn from(p: Priority) -> i32 {
        match p {
            Priority::Default => -100,
            Priority::Duplicate => -3,
            Priority::Paused => -2,
            Priority::Low => -1,
            Priority::Normal => 0,
            Priority::High => 1,
            Priority::Force => 2,
        }
    }
}

/// Post-processing level as understood by `addurl`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PostProcessing {
    /// Use the category's setting.
    Default,
    None,
    Repair,
    RepairUnpack,
    RepairUnpackDelete,
}

impl From<PostProcessing> for i32 {
    fn from(pp: PostProcessing) -> i32 {
        match pp {
            PostProcessing::Default => -1,
            PostProcessing::None => 0,
            PostProcessing::Repair => 1,
            PostProcessing::RepairUnpack => 2,
            PostProcessing::RepairUnpackDelete => 3,
        }
    }
}

/// Optional settings for [`Client::add_url`](crate::Client::add_url).
///
/// Values are sent as-is; the server decides what to do with out-of-range
/// integers.
///
/// ```
/// use sabnzbd::{AddUrlOptions, Priority};
///
/// let opts = AddUrlOptions::new().category("movies").priority(Priority::High);
/// assert_eq!(opts.priority, Some(1));
/// ```
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AddUrlOptions {
    /// Job name; the NZB filename is used when absent.
    pub nzbname: Option<String>,
    /// Password used when unpacking.
    pub password: Option<String>,
    /// Category, `*` for the default one.
    pub cat: Option<String>,
    /// Post-processing script name.
    pub script: Option<String>,
    /// See [`Priority`].
    pub priority: Option<i32>,
    /// See [`PostProcessing`].
    pub pp: Option<i32>,
}

impl AddUrlOptions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn name(mut self, name: impl Into<String>) -> Self {
        self.nzbname = Some(name.into());
        self
    }

    pub fn password(mut self, password: impl Into<String>) -> Self {
        self.password = Some(password.into());
        self
    }

    pub fn category(mut self, cat: impl Into<String>) -> Self {
        self.cat = Some(cat.into());
        self
    }

    pub fn script(mut self, script: impl Into<String>) -> Self {
        self.script = Some(script.into());
        self
    }

    pub fn priority(mut self, priority: impl Into<i32>) -> Self {
        self.priority = Some(priority.into());
        self
    }

    pub fn post_processing(mut self, pp: impl Into<i32>) -> Self {
        self.pp = Some(pp.into());
        self
    }

    /// Write every present option onto `params`.
    pub(crate) fn apply(&self, params: &mut QueryParams) {
        if let Some(ref v) = self.nzbname {
            params.set("nzbname", v);
        }
        if let Some(ref v) = self.password {
            params.set("password", v);
        }
        if let Some(ref v) = self.cat {
            params.set("cat", v);
        }
        if let Some(ref v) = self.script {
            params.set("script", v);
        }
        if let Some(v) = self.priority {
            params.set("priority", v);
        }
        if let Some(v) = self.pp {
            params.set("pp", v);
        }
    }
}
