/// Cross-source identity matching for play records and favorites.
///
/// The same film is often saved from several API sites under different
/// `source+id` keys. Each record gets a set of identity keys (Douban id,
/// IMDb id, title+year, title+cover); records whose key sets overlap,
/// directly or through a chain of other records, describe the same title.
use std::collections::{BTreeSet, HashMap};

use once_cell::sync::Lazy;
use regex::Regex;

use crate::models::{Favorite, PlayRecord};

/// Fields needed to derive identity keys.
pub trait Identified {
    fn title(&self) -> &str;
    fn search_title(&self) -> &str;
    fn year(&self) -> &str;
    fn cover(&self) -> &str;
    fn douban_id(&self) -> Option<&str>;
    fn imdb_id(&self) -> Option<&str>;
    fn save_time(&self) -> i64;
}

macro_rules! impl_identified {
    ($ty:ty) => {
        impl Identified for $ty {
            fn title(&self) -> &str {
                &self.title
            }
            fn search_title(&self) -> &str {
                &self.search_title
            }
            fn year(&self) -> &str {
                &self.year
            }
            fn cover(&self) -> &str {
                &self.cover
            }
            fn douban_id(&self) -> Option<&str> {
                self.douban_id.as_deref()
            }
            fn imdb_id(&self) -> Option<&str> {
                self.imdb_id.as_deref()
            }
            fn save_time(&self) -> i64 {
                self.save_time
            }
        }
    };
}

impl_identified!(PlayRecord);
impl_identified!(Favorite);

static RE_IMDB: Lazy<Regex> = Lazy::new(|| Regex::new(r"tt\d+").unwrap());
static RE_YEAR: Lazy<Regex> = Lazy::new(|| Regex::new(r"^\d{4}$").unwrap());

/// Normalise an IMDb id or URL to `tt1234567`.
///
/// Accepts `tt0111161`, `TT0111161 `, `0111161`, and
/// `https://www.imdb.com/title/tt0111161/`.
pub fn normalize_imdb_id(raw: &str) -> Option<String> {
    let s = raw.trim().to_lowercase();
    if s.is_empty() {
        return None;
    }
    if s.chars().all(|c| c.is_ascii_digit()) {
        return Some(format!("tt{s}"));
    }
    RE_IMDB.find(&s).map(|m| m.as_str().to_string())
}

/// Lowercase, alphanumerics only. Keeps CJK characters.
pub fn normalize_title(title: &str) -> String {
    title
        .chars()
        .filter(|c| c.is_alphanumeric())
        .flat_map(|c| c.to_lowercase())
        .collect()
}

pub fn identity_keys<T: Identified + ?Sized>(record: &T) -> BTreeSet<String> {
    let mut keys = BTreeSet::new();

    if let Some(id) = record.douban_id().map(str::trim) {
        if !id.is_empty() && id != "0" && id.chars().all(|c| c.is_ascii_digit()) {
            keys.insert(format!("douban:{id}"));
        }
    }

    if let Some(imdb) = record.imdb_id().and_then(normalize_imdb_id) {
        keys.insert(format!("imdb:{imdb}"));
    }

    let title = if record.search_title().trim().is_empty() {
        normalize_title(record.title())
    } else {
        normalize_title(record.search_title())
    };

    if !title.is_empty() {
        let year = record.year().trim();
        if RE_YEAR.is_match(year) {
            keys.insert(format!("title_year:{title}|{year}"));
        }
        let cover = record.cover().trim();
        if !cover.is_empty() {
            keys.insert(format!("title_cover:{title}|{cover}"));
        }
    }

    keys
}

pub fn overlaps<A: Identified + ?Sized, B: Identified + ?Sized>(a: &A, b: &B) -> bool {
    let ka = identity_keys(a);
    let kb = identity_keys(b);
    !ka.is_disjoint(&kb)
}

/// Result of [`dedupe`]: survivors and the storage keys to delete.
#[derive(Debug)]
pub struct Deduped<T> {
    pub kept: Vec<(String, T)>,
    pub removed: Vec<String>,
}

/// Group records by overlapping identity and keep the newest of each group.
///
/// Ties on `save_time` go to the lexicographically smallest storage key so
/// the outcome does not depend on input order.
pub fn dedupe<T: Identified>(records: Vec<(String, T)>) -> Deduped<T> {
    let n = records.len();
    let mut parent: Vec<usize> = (0..n).collect();

    fn find(parent: &mut [usize], mut i: usize) -> usize {
        while parent[i] != i {
            parent[i] = parent[parent[i]];
            i = parent[i];
        }
        i
    }

    // Union every pair of records that share an identity key.
    let mut owner: HashMap<String, usize> = HashMap::new();
    for (i, (_, rec)) in records.iter().enumerate() {
        for key in identity_keys(rec) {
            match owner.get(&key) {
                Some(&j) => {
                    let (a, b) = (find(&mut parent, i), find(&mut parent, j));
                    if a != b {
                        parent[a] = b;
                    }
                }
                None => {
                    owner.insert(key, i);
                }
            }
        }
    }

    // Pick a winner per group.
    let mut winner: HashMap<usize, usize> = HashMap::new();
    for i in 0..n {
        let root = find(&mut parent, i);
        match winner.get(&root) {
            Some(&w) if !beats(&records[i], &records[w]) => {}
            _ => {
                winner.insert(root, i);
            }
        }
    }

    let mut kept = Vec::new();
    let mut removed = Vec::new();
    for (i, entry) in records.into_iter().enumerate() {
        let root = find(&mut parent, i);
        if winner.get(&root) == Some(&i) {
            kept.push(entry);
        } else {
            removed.push(entry.0);
        }
    }

    Deduped { kept, removed }
}

fn beats<T: Identified>(a: &(String, T), b: &(String, T)) -> bool {
    match a.1.save_time().cmp(&b.1.save_time()) {
        std::cmp::Ordering::Greater => true,
        std::cmp::Ordering::Less => false,
        std::cmp::Ordering::Equal => a.0 < b.0,
    }
}
