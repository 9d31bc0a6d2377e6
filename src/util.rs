/// Strips the leading `<hash>-` from a store name.
///
/// Names without a `-` have nothing left after the hash and come back empty.
pub fn remove_nix_hash(name: &str) -> String {
    name.split('-').skip(1).collect::<Vec<_>>().join("-")
}

pub fn store_basename(path: &str) -> &str {
    path.rsplit('/').next().unwrap_or(path)
}

pub fn package_name(raw: &str) -> String {
    remove_nix_hash(store_basename(raw))
}

pub fn clamp(value: f64, max_abs: f64) -> f64 {
    value.min(max_abs).max(-max_abs)
}
