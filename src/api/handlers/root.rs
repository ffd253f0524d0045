//! Undocumented root route: name and version, nothing else.

pub async fn root() -> String {
    format!("{} {}", env!("CARGO_PKG_NAME"), env!("CARGO_PKG_VERSION"))
}
