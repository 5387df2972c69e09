use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum MappingBehavior {
    /// Pair each data file with the metadata file of the same stem.
    #[default]
    OneToOne,
    /// Pair each data file with every metadata file.
    OneToMany,
}

/// Data file → associated metadata files.
pub type FileMap = BTreeMap<PathBuf, Vec<PathBuf>>;

fn stem(p: &Path) -> Option<&std::ffi::OsStr> {
    p.file_stem()
}

/// Empty when `behavior` cannot be carried out on the given lists.
pub fn filemap(behavior: MappingBehavior, data: &[PathBuf], meta: &[PathBuf]) -> FileMap {
    let mut result = FileMap::new();
    match behavior {
        MappingBehavior::OneToOne => {
            if data.len() != meta.len() {
                return result;
            }
            for d in data {
                let Some(m) = meta.iter().find(|m| stem(m) == stem(d)) else {
                    // all or nothing
                    return FileMap::new();
                };
                result.insert(d.clone(), vec![m.clone()]);
            }
        }
        MappingBehavior::OneToMany => {
            for d in data {
                result.insert(d.clone(), meta.to_vec());
            }
        }
    }
    result
}

/// One-to-one when it pairs every data file, otherwise one-to-many.
pub fn filemap_with_fallback(data: &[PathBuf], meta: &[PathBuf]) -> FileMap {
    let map = filemap(MappingBehavior::OneToOne, data, meta);
    if map.is_empty() && !data.is_empty() {
        return filemap(MappingBehavior::OneToMany, data, meta);
    }
    map
}

#[cfg(test)]
mod tests {
    use super::*;

    fn paths(names: &[&str]) -> Vec<PathBuf> {
        names.iter().map(|n| PathBuf::from("/in").join(n)).collect()
    }

    #[test]
    fn one_to_one_pairs_by_stem() {
        let data = paths(&["a.csv", "b.csv", "c.csv"]);
        let meta = paths(&["c.meta", "a.meta", "b.meta"]);
        let map = filemap(MappingBehavior::OneToOne, &data, &meta);
        assert_eq!(map.len(), 3);
        assert_eq!(map[&data[0]], vec![PathBuf::from("/in/a.meta")]);
        assert_eq!(map[&data[2]], vec![PathBuf::from("/in/c.meta")]);
    }

    #[test]
    fn one_to_one_is_all_or_nothing() {
        let data = paths(&["a.csv", "b.csv"]);
        let meta = paths(&["a.meta", "x.meta"]);
        assert!(filemap(MappingBehavior::OneToOne, &data, &meta).is_empty());
        assert!(filemap(MappingBehavior::OneToOne, &data, &paths(&["a.meta"])).is_empty());
    }

    #[test]
    fn one_to_many_is_cartesian() {
        let data = paths(&["a.csv", "b.csv"]);
        let meta = paths(&["m1.csv", "m2.csv", "m3.csv"]);
        let map = filemap(MappingBehavior::OneToMany, &data, &meta);
        assert_eq!(map.len(), 2);
        assert!(map.values().all(|v| *v == meta));

        let map = filemap(MappingBehavior::OneToMany, &data, &[]);
        assert!(map.values().all(Vec::is_empty));
    }

    #[test]
    fn fallback_when_counts_differ() {
        let data = paths(&["a.csv", "b.csv", "c.csv"]);
        let meta = paths(&["a.meta", "b.meta"]);
        let map = filemap_with_fallback(&data, &meta);
        assert_eq!(map.len(), 3);
        assert!(map.values().all(|v| *v == meta));
    }

    #[test]
    fn fallback_keeps_complete_one_to_one() {
        let data = paths(&["a.csv", "b.csv", "c.csv"]);
        let meta = paths(&["a.meta", "b.meta", "c.meta"]);
        let map = filemap_with_fallback(&data, &meta);
        assert_eq!(map[&data[1]], vec![meta[1].clone()]);
    }
}
